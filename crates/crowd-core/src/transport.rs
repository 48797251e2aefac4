//! Transport seam between the request pipeline and the network.
//!
//! The pipeline only needs something that sends a method, URL, headers and optional body and
//! hands back a status code and body. [`ReqwestTransport`] is the pooled default.

use crate::client::ClientConfig;
use crate::{Error, Result};
use async_trait::async_trait;
use reqwest::header::HeaderMap;
use reqwest::{Client, ClientBuilder, Method, StatusCode};
use std::sync::Arc;
use tokio::sync::Semaphore;
use tracing::warn;
use url::Url;

/// A fully built request ready to hand to a [`Transport`].
#[derive(Debug, Clone)]
pub struct WireRequest {
    /// HTTP method.
    pub method: Method,
    /// Absolute request URL.
    pub url: Url,
    /// Request headers.
    pub headers: HeaderMap,
    /// Optional request body.
    pub body: Option<Vec<u8>>,
}

/// Raw response returned by a [`Transport`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WireResponse {
    /// HTTP status code.
    pub status: StatusCode,
    /// Response body, possibly empty.
    pub body: Vec<u8>,
}

impl WireResponse {
    /// Create a response from a status and body.
    #[must_use]
    pub fn new(status: StatusCode, body: impl Into<Vec<u8>>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }
}

/// Sends requests on behalf of the pipeline.
///
/// Implementations own connection pooling and per-request timeouts. A failure to obtain a
/// response must be reported as [`Error::HttpError`] or [`Error::Timeout`].
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Transport: Send + Sync {
    /// Send a request and buffer the full response.
    ///
    /// # Errors
    ///
    /// Returns a transport error if no response could be obtained.
    async fn send(&self, request: WireRequest) -> Result<WireResponse>;
}

/// [`Transport`] backed by a pooled `reqwest` client.
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    http: Client,
    permits: Arc<Semaphore>,
}

impl ReqwestTransport {
    /// Build a transport from HTTP settings.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ConfigError`] if the underlying client cannot be built.
    pub fn new(config: &ClientConfig) -> Result<Self> {
        let mut builder = ClientBuilder::new()
            .timeout(config.timeout)
            .connect_timeout(config.connect_timeout)
            .pool_idle_timeout(config.pool_idle_timeout)
            .pool_max_idle_per_host(config.max_connections);

        if !config.tls_verify {
            warn!("TLS verification disabled for Crowd client");
            builder = builder.danger_accept_invalid_certs(true);
        }

        let http = builder
            .build()
            .map_err(|err| Error::ConfigError(format!("Failed to build HTTP client: {err}")))?;

        Ok(Self {
            http,
            permits: Arc::new(Semaphore::new(config.max_connections.max(1))),
        })
    }

    /// Number of requests that may currently start without waiting.
    #[must_use]
    pub fn available_permits(&self) -> usize {
        self.permits.available_permits()
    }
}

#[async_trait]
impl Transport for ReqwestTransport {
    async fn send(&self, request: WireRequest) -> Result<WireResponse> {
        let _permit = self
            .permits
            .acquire()
            .await
            .map_err(|err| Error::HttpError(format!("Connection limiter closed: {err}")))?;

        let mut builder = self
            .http
            .request(request.method, request.url)
            .headers(request.headers);

        if let Some(body) = request.body {
            builder = builder.body(body);
        }

        let response = builder.send().await?;
        let status = response.status();
        let body = response.bytes().await?;

        Ok(WireResponse::new(status, body.to_vec()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::header::{HeaderValue, AUTHORIZATION};
    use std::time::Duration;
    use wiremock::matchers::{body_string, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn request(server: &MockServer, method: Method, body: Option<&str>) -> WireRequest {
        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, HeaderValue::from_static("Basic YXBwOnB3"));

        WireRequest {
            method,
            url: Url::parse(&format!("{}/resource", server.uri())).unwrap(),
            headers,
            body: body.map(|b| b.as_bytes().to_vec()),
        }
    }

    #[tokio::test]
    async fn forwards_method_headers_and_body() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/resource"))
            .and(header("authorization", "Basic YXBwOnB3"))
            .and(body_string("<a/>"))
            .respond_with(ResponseTemplate::new(201).set_body_string("done"))
            .mount(&server)
            .await;

        let transport = ReqwestTransport::new(&ClientConfig::default()).unwrap();
        let response = transport
            .send(request(&server, Method::POST, Some("<a/>")))
            .await
            .unwrap();

        assert_eq!(response.status, StatusCode::CREATED);
        assert_eq!(response.body, b"done");
    }

    #[tokio::test]
    async fn releases_permit_after_response() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(204))
            .mount(&server)
            .await;

        let config = ClientConfig::default().with_max_connections(2);
        let transport = ReqwestTransport::new(&config).unwrap();
        transport
            .send(request(&server, Method::GET, None))
            .await
            .unwrap();

        assert_eq!(transport.available_permits(), 2);
    }

    #[tokio::test]
    async fn slow_response_is_reported_as_timeout() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_millis(500)))
            .mount(&server)
            .await;

        let config = ClientConfig::default().with_timeout(Duration::from_millis(50));
        let transport = ReqwestTransport::new(&config).unwrap();
        let err = transport
            .send(request(&server, Method::GET, None))
            .await
            .unwrap_err();

        assert!(matches!(err, Error::Timeout(_)));
    }

    #[tokio::test]
    async fn refused_connection_is_transport_error() {
        let transport = ReqwestTransport::new(&ClientConfig::default()).unwrap();
        let err = transport
            .send(WireRequest {
                method: Method::GET,
                url: Url::parse("http://127.0.0.1:1/").unwrap(),
                headers: HeaderMap::new(),
                body: None,
            })
            .await
            .unwrap_err();

        assert!(err.is_transport());
    }
}
