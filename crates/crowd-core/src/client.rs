//! HTTP client settings, client identity and the request/response pipeline.
//!
//! Every logical operation flows through [`ServiceClient`] as one linear pass:
//! build the URL, encode the body, attach headers, dispatch through the [`Transport`],
//! then interpret the status code against a shared rule table.

use crate::error::RemoteErrorBody;
use crate::transport::{ReqwestTransport, Transport, WireRequest, WireResponse};
use crate::xml::{from_xml, to_xml};
use crate::{Error, Result};
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, AUTHORIZATION, CONTENT_TYPE, USER_AGENT};
use reqwest::{Method, StatusCode};
use secrecy::{ExposeSecret, SecretString};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fmt;
use std::sync::{Arc, PoisonError, RwLock};
use std::time::Duration;
use tracing::debug;
use url::Url;

/// Library name reported in the user agent.
pub const LIBRARY_NAME: &str = "crowd-rs";

/// Library version reported in the user agent.
pub const LIBRARY_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Default request timeout in seconds.
///
/// reqwest has a single deadline for the whole exchange, so this is the sum of a 3 s write
/// budget and a 3 s read budget.
pub const DEFAULT_REQUEST_TIMEOUT: u64 = 6;

/// Default connect timeout in seconds
pub const DEFAULT_CONNECT_TIMEOUT: u64 = 3;

/// Default idle timeout for pooled connections in seconds
pub const DEFAULT_POOL_IDLE_TIMEOUT: u64 = 5;

/// Default ceiling on simultaneous connections to the directory host
pub const DEFAULT_MAX_CONNECTIONS: usize = 150;

const XML_CONTENT_TYPE: &str = "application/xml";

/// HTTP client configuration.
///
/// These values are applied once when the client is built and cannot be overridden per call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    /// Request timeout
    pub timeout: Duration,

    /// Connect timeout
    pub connect_timeout: Duration,

    /// Connection pool idle timeout
    pub pool_idle_timeout: Duration,

    /// Maximum simultaneous connections
    pub max_connections: usize,

    /// Verify TLS certificates
    pub tls_verify: bool,
}

impl ClientConfig {
    /// Create a new client configuration with default values.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            timeout: Duration::from_secs(DEFAULT_REQUEST_TIMEOUT),
            connect_timeout: Duration::from_secs(DEFAULT_CONNECT_TIMEOUT),
            pool_idle_timeout: Duration::from_secs(DEFAULT_POOL_IDLE_TIMEOUT),
            max_connections: DEFAULT_MAX_CONNECTIONS,
            tls_verify: true,
        }
    }

    /// Set request timeout.
    #[must_use]
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set connect timeout.
    #[must_use]
    pub const fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Set connection pool idle timeout.
    #[must_use]
    pub const fn with_pool_idle_timeout(mut self, timeout: Duration) -> Self {
        self.pool_idle_timeout = timeout;
        self
    }

    /// Set the ceiling on simultaneous connections.
    #[must_use]
    pub const fn with_max_connections(mut self, max: usize) -> Self {
        self.max_connections = max;
        self
    }

    /// Enable or disable TLS certificate verification.
    #[must_use]
    pub const fn with_tls_verify(mut self, verify: bool) -> Self {
        self.tls_verify = verify;
        self
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// How an operation maps a 404.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scope {
    /// A 404 means the addressed user does not exist.
    User,
    /// A 404 means the addressed group does not exist.
    Group,
    /// A 404 is a generic failure like any other non-2xx status.
    Unscoped,
}

/// What a successful response must look like.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Expect {
    /// Any 2xx; the body is decoded.
    Payload,
    /// Any 2xx; the body is ignored.
    NoContent,
    /// Exactly 201; the body is ignored.
    Created,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Outcome {
    Success,
    PermissionDenied,
    NotFound,
    Failure,
}

struct StatusRule {
    applies: fn(StatusCode, Scope) -> bool,
    outcome: Outcome,
}

fn is_success(status: StatusCode, _: Scope) -> bool {
    status.is_success()
}

fn is_forbidden(status: StatusCode, _: Scope) -> bool {
    status == StatusCode::FORBIDDEN
}

fn is_scoped_not_found(status: StatusCode, scope: Scope) -> bool {
    status == StatusCode::NOT_FOUND && scope != Scope::Unscoped
}

// Evaluated top-down; anything unmatched is a failure.
const STATUS_RULES: [StatusRule; 3] = [
    StatusRule {
        applies: is_success,
        outcome: Outcome::Success,
    },
    StatusRule {
        applies: is_forbidden,
        outcome: Outcome::PermissionDenied,
    },
    StatusRule {
        applies: is_scoped_not_found,
        outcome: Outcome::NotFound,
    },
];

fn classify(status: StatusCode, scope: Scope) -> Outcome {
    STATUS_RULES
        .iter()
        .find(|rule| (rule.applies)(status, scope))
        .map_or(Outcome::Failure, |rule| rule.outcome)
}

/// Map a non-success response to an error.
///
/// The body is consulted only when no canonical error applies.
fn failure_from_body(status: StatusCode, body: &[u8]) -> Error {
    match from_xml::<RemoteErrorBody>(body) {
        Ok(payload) => payload.into_error(status.as_u16()),
        Err(_) => Error::Unknown {
            status: status.as_u16(),
        },
    }
}

/// Interpret a response against the status rules.
///
/// Returns the body on success so the caller can decode it if a payload is expected.
///
/// # Errors
///
/// Returns the permission, not-found, remote or unknown error selected by the rules.
pub fn interpret(response: WireResponse, scope: Scope, expect: Expect) -> Result<Vec<u8>> {
    let status = response.status;

    match classify(status, scope) {
        Outcome::Success if expect == Expect::Created && status != StatusCode::CREATED => {
            Err(Error::Unknown {
                status: status.as_u16(),
            })
        }
        Outcome::Success => Ok(response.body),
        Outcome::PermissionDenied => Err(Error::PermissionDenied),
        Outcome::NotFound => Err(match scope {
            Scope::Group => Error::GroupNotFound,
            _ => Error::UserNotFound,
        }),
        Outcome::Failure => Err(failure_from_body(status, &response.body)),
    }
}

/// Compose the user agent string.
///
/// The application prefix is only included when both name and version are non-empty.
#[must_use]
pub fn user_agent_for(app: &str, version: &str) -> String {
    let platform = format!(
        "{LIBRARY_NAME}/{LIBRARY_VERSION} (rust; {}-{})",
        std::env::consts::ARCH,
        std::env::consts::OS
    );

    if app.is_empty() || version.is_empty() {
        platform
    } else {
        format!("{app}/{version} {platform}")
    }
}

/// Compute the Basic-Auth credential: `base64(principal:credential)`.
#[must_use]
pub fn basic_auth_value(principal: &str, credential: &str) -> String {
    BASE64.encode(format!("{principal}:{credential}"))
}

/// Builder for [`ServiceClient`].
pub struct ServiceClientBuilder {
    base_url: String,
    principal: String,
    credential: SecretString,
    http_config: ClientConfig,
    user_agent: String,
    transport: Option<Arc<dyn Transport>>,
}

impl fmt::Debug for ServiceClientBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServiceClientBuilder")
            .field("base_url", &self.base_url)
            .field("principal", &self.principal)
            .field("http_config", &self.http_config)
            .field("user_agent", &self.user_agent)
            .field("custom_transport", &self.transport.is_some())
            .finish_non_exhaustive()
    }
}

impl ServiceClientBuilder {
    /// Create a builder for the base URL and application credentials.
    ///
    /// Nothing is validated until [`ServiceClientBuilder::build`].
    pub fn new(
        base_url: impl Into<String>,
        principal: impl Into<String>,
        credential: impl Into<String>,
    ) -> Self {
        Self {
            base_url: base_url.into(),
            principal: principal.into(),
            credential: SecretString::from(credential.into()),
            http_config: ClientConfig::default(),
            user_agent: user_agent_for("", ""),
            transport: None,
        }
    }

    /// Override the HTTP client configuration.
    #[must_use]
    pub fn with_http_config(mut self, config: ClientConfig) -> Self {
        self.http_config = config;
        self
    }

    /// Include the calling application's name and version in the user agent.
    #[must_use]
    pub fn with_application(mut self, app: &str, version: &str) -> Self {
        self.user_agent = user_agent_for(app, version);
        self
    }

    /// Replace the default `reqwest` transport.
    #[must_use]
    pub fn with_transport(mut self, transport: Arc<dyn Transport>) -> Self {
        self.transport = Some(transport);
        self
    }

    /// Validate the inputs and build the client.
    ///
    /// # Errors
    ///
    /// Returns [`Error::EmptyUrl`], [`Error::EmptyApplication`] or [`Error::EmptyPassword`]
    /// for a missing input, checked in that order, or [`Error::ConfigError`] if the URL does
    /// not parse or the HTTP client cannot be built.
    pub fn build(self) -> Result<ServiceClient> {
        if self.base_url.is_empty() {
            return Err(Error::EmptyUrl);
        }
        if self.principal.is_empty() {
            return Err(Error::EmptyApplication);
        }
        if self.credential.expose_secret().is_empty() {
            return Err(Error::EmptyPassword);
        }

        let mut base_url = self.base_url;
        if !base_url.ends_with('/') {
            base_url.push('/');
        }
        Url::parse(&base_url)?;

        let transport = match self.transport {
            Some(transport) => transport,
            None => Arc::new(ReqwestTransport::new(&self.http_config)?),
        };

        let basic_auth = basic_auth_value(&self.principal, self.credential.expose_secret());

        Ok(ServiceClient {
            transport,
            base_url: Arc::from(base_url),
            basic_auth: Arc::new(SecretString::from(basic_auth)),
            user_agent: Arc::new(RwLock::new(self.user_agent)),
        })
    }
}

/// Stateless request/response pipeline bound to one directory and one application identity.
///
/// Clones share the transport and the user-agent cell.
#[derive(Clone)]
pub struct ServiceClient {
    transport: Arc<dyn Transport>,
    base_url: Arc<str>,
    basic_auth: Arc<SecretString>,
    user_agent: Arc<RwLock<String>>,
}

impl fmt::Debug for ServiceClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServiceClient")
            .field("base_url", &self.base_url)
            .field("user_agent", &self.user_agent())
            .finish_non_exhaustive()
    }
}

impl ServiceClient {
    /// Return the base URL, always ending with `/`.
    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Return the current user agent.
    #[must_use]
    pub fn user_agent(&self) -> String {
        self.user_agent
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Replace the user agent for requests issued after this call returns.
    pub fn set_user_agent(&self, app: &str, version: &str) {
        let value = user_agent_for(app, version);
        *self
            .user_agent
            .write()
            .unwrap_or_else(PoisonError::into_inner) = value;
    }

    /// GET a resource and decode its payload.
    ///
    /// # Errors
    ///
    /// Returns a transport error, a status-mapped error or [`Error::DecodeError`].
    pub async fn fetch<T>(&self, path: &str, scope: Scope) -> Result<T>
    where
        T: DeserializeOwned,
    {
        let body = self
            .execute::<()>(Method::GET, path, None, scope, Expect::Payload)
            .await?;
        from_xml(&body)
    }

    /// Send a body and decode the response payload.
    ///
    /// # Errors
    ///
    /// Returns an encode, transport, status-mapped or decode error.
    pub async fn exchange<B, T>(&self, method: Method, path: &str, body: &B, scope: Scope) -> Result<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let body = self
            .execute(method, path, Some(body), scope, Expect::Payload)
            .await?;
        from_xml(&body)
    }

    /// Send an optional body and expect a success with no payload.
    ///
    /// # Errors
    ///
    /// Returns an encode, transport or status-mapped error.
    pub async fn submit<B>(
        &self,
        method: Method,
        path: &str,
        body: Option<&B>,
        scope: Scope,
        expect: Expect,
    ) -> Result<()>
    where
        B: Serialize + ?Sized,
    {
        self.execute(method, path, body, scope, expect)
            .await
            .map(|_| ())
    }

    async fn execute<B>(
        &self,
        method: Method,
        path: &str,
        body: Option<&B>,
        scope: Scope,
        expect: Expect,
    ) -> Result<Vec<u8>>
    where
        B: Serialize + ?Sized,
    {
        let request = self.build_request(method, path, body)?;
        let method = request.method.clone();

        debug!(%method, path = %path, "Sending Crowd request");
        let response = self.transport.send(request).await?;
        debug!(%method, path = %path, status = %response.status, "Received Crowd response");

        interpret(response, scope, expect)
    }

    fn build_request<B>(&self, method: Method, path: &str, body: Option<&B>) -> Result<WireRequest>
    where
        B: Serialize + ?Sized,
    {
        let url = Url::parse(&format!("{}{path}", self.base_url))
            .map_err(|err| Error::InvalidRequest(format!("Invalid request path `{path}`: {err}")))?;

        let body = body.map(to_xml).transpose()?;

        let mut headers = HeaderMap::new();
        let authorization = format!("Basic {}", self.basic_auth.expose_secret());
        headers.insert(AUTHORIZATION, header_value(&authorization)?);
        headers.insert(USER_AGENT, header_value(&self.user_agent())?);

        if method != Method::GET {
            headers.insert(CONTENT_TYPE, HeaderValue::from_static(XML_CONTENT_TYPE));
            headers.insert(ACCEPT, HeaderValue::from_static(XML_CONTENT_TYPE));
        }

        Ok(WireRequest {
            method,
            url,
            headers,
            body,
        })
    }
}

fn header_value(value: &str) -> Result<HeaderValue> {
    HeaderValue::from_str(value)
        .map_err(|err| Error::InvalidRequest(format!("Invalid header value: {err}")))
}
