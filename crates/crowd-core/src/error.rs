//! Error types for Crowd operations.
//!
//! This module provides the error taxonomy shared by every Crowd client: construction-time
//! configuration errors, transport failures, the canonical permission and not-found errors,
//! codec failures and errors reported by the remote service itself.

use serde::Deserialize;
use thiserror::Error;

/// Main error type for Crowd operations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// Base URL was empty at construction time
    #[error("URL can't be empty")]
    EmptyUrl,

    /// Application name was empty at construction time
    #[error("Application name can't be empty")]
    EmptyApplication,

    /// Application password was empty at construction time
    #[error("Application password can't be empty")]
    EmptyPassword,

    /// Configuration error
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// HTTP request failed before a response was received
    #[error("HTTP request failed: {0}")]
    HttpError(String),

    /// Request timed out
    #[error("Timeout waiting for Crowd: {0}")]
    Timeout(String),

    /// Remote service rejected the application (403)
    #[error("Application does not have permission to use Crowd")]
    PermissionDenied,

    /// User-scoped operation returned 404
    #[error("User could not be found")]
    UserNotFound,

    /// Group-scoped operation returned 404
    #[error("Group could not be found")]
    GroupNotFound,

    /// Request payload could not be marshalled
    #[error("Failed to encode request body: {0}")]
    EncodeError(String),

    /// Successful response carried a body of the wrong shape
    #[error("Failed to decode response body: {0}")]
    DecodeError(String),

    /// Remote service reported an error with a decodable payload
    #[error("{message}")]
    Remote {
        /// HTTP status code
        status: u16,
        /// Machine-readable reason, empty when the service sent none
        reason: String,
        /// Message supplied by the service
        message: String,
    },

    /// Remote service failed without a decodable error payload
    #[error("Unknown error occurred (status code {status})")]
    Unknown {
        /// HTTP status code
        status: u16,
    },

    /// Request could not be assembled
    #[error("Invalid request: {0}")]
    InvalidRequest(String),
}

/// Specialized result type for Crowd operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Error body returned by Crowd on failure.
///
/// ```xml
/// <error><reason>USER_NOT_FOUND</reason><message>User &lt;bob&gt; does not exist</message></error>
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename = "error")]
pub struct RemoteErrorBody {
    /// Machine-readable reason code.
    #[serde(default)]
    pub reason: String,
    /// Human-readable message.
    pub message: String,
}

impl RemoteErrorBody {
    /// Converts the payload into an [`Error::Remote`] for the given status.
    #[must_use]
    pub fn into_error(self, status: u16) -> Error {
        Error::Remote {
            status,
            reason: self.reason,
            message: self.message,
        }
    }
}

impl Error {
    /// Returns the error code for this error type.
    #[must_use]
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::EmptyUrl => "EMPTY_URL",
            Self::EmptyApplication => "EMPTY_APPLICATION",
            Self::EmptyPassword => "EMPTY_PASSWORD",
            Self::ConfigError(_) => "CONFIG_ERROR",
            Self::HttpError(_) => "HTTP_ERROR",
            Self::Timeout(_) => "TIMEOUT",
            Self::PermissionDenied => "PERMISSION_DENIED",
            Self::UserNotFound => "USER_NOT_FOUND",
            Self::GroupNotFound => "GROUP_NOT_FOUND",
            Self::EncodeError(_) => "ENCODE_ERROR",
            Self::DecodeError(_) => "DECODE_ERROR",
            Self::Remote { .. } => "REMOTE_ERROR",
            Self::Unknown { .. } => "UNKNOWN_ERROR",
            Self::InvalidRequest(_) => "INVALID_REQUEST",
        }
    }

    /// Returns the HTTP status carried by errors reported by the remote service.
    #[must_use]
    pub const fn status_code(&self) -> Option<u16> {
        match self {
            Self::PermissionDenied => Some(403),
            Self::UserNotFound | Self::GroupNotFound => Some(404),
            Self::Remote { status, .. } | Self::Unknown { status } => Some(*status),
            _ => None,
        }
    }

    /// Returns true if the request never produced a response.
    #[must_use]
    pub const fn is_transport(&self) -> bool {
        matches!(self, Self::HttpError(_) | Self::Timeout(_))
    }

    /// Returns true if the error was raised while constructing a client.
    #[must_use]
    pub const fn is_configuration(&self) -> bool {
        matches!(
            self,
            Self::EmptyUrl | Self::EmptyApplication | Self::EmptyPassword | Self::ConfigError(_)
        )
    }
}

// Conversions from external error types
impl From<reqwest::Error> for Error {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::Timeout(err.to_string())
        } else {
            Self::HttpError(err.to_string())
        }
    }
}

impl From<url::ParseError> for Error {
    fn from(err: url::ParseError) -> Self {
        Self::ConfigError(format!("Invalid URL: {err}"))
    }
}

impl From<validator::ValidationErrors> for Error {
    fn from(err: validator::ValidationErrors) -> Self {
        Self::ConfigError(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_codes() {
        assert_eq!(Error::EmptyUrl.error_code(), "EMPTY_URL");
        assert_eq!(Error::EmptyApplication.error_code(), "EMPTY_APPLICATION");
        assert_eq!(Error::EmptyPassword.error_code(), "EMPTY_PASSWORD");
        assert_eq!(Error::PermissionDenied.error_code(), "PERMISSION_DENIED");
        assert_eq!(Error::UserNotFound.error_code(), "USER_NOT_FOUND");
        assert_eq!(Error::GroupNotFound.error_code(), "GROUP_NOT_FOUND");
        assert_eq!(Error::Unknown { status: 500 }.error_code(), "UNKNOWN_ERROR");
        assert_eq!(
            Error::DecodeError("test".to_string()).error_code(),
            "DECODE_ERROR"
        );
    }

    #[test]
    fn test_error_display() {
        assert_eq!(Error::EmptyUrl.to_string(), "URL can't be empty");
        assert_eq!(
            Error::PermissionDenied.to_string(),
            "Application does not have permission to use Crowd"
        );
        assert_eq!(
            Error::Unknown { status: 502 }.to_string(),
            "Unknown error occurred (status code 502)"
        );
    }

    #[test]
    fn test_remote_error_displays_message_verbatim() {
        let err = RemoteErrorBody {
            reason: "INVALID_USER".to_string(),
            message: "Username already taken".to_string(),
        }
        .into_error(400);

        assert_eq!(err.to_string(), "Username already taken");
        assert_eq!(err.status_code(), Some(400));
    }

    #[test]
    fn test_status_code() {
        assert_eq!(Error::PermissionDenied.status_code(), Some(403));
        assert_eq!(Error::GroupNotFound.status_code(), Some(404));
        assert_eq!(Error::Unknown { status: 418 }.status_code(), Some(418));
        assert_eq!(Error::Timeout("slow".to_string()).status_code(), None);
    }

    #[test]
    fn test_classification() {
        assert!(Error::HttpError("refused".to_string()).is_transport());
        assert!(Error::Timeout("slow".to_string()).is_transport());
        assert!(!Error::PermissionDenied.is_transport());

        assert!(Error::EmptyUrl.is_configuration());
        assert!(Error::ConfigError("bad".to_string()).is_configuration());
        assert!(!Error::UserNotFound.is_configuration());
    }

    #[test]
    fn test_from_url_parse_error() {
        let err = url::Url::parse("not a url").unwrap_err();
        let crowd_err: Error = err.into();
        assert!(matches!(crowd_err, Error::ConfigError(_)));
    }

    #[test]
    fn test_construction_errors_are_distinct() {
        assert_ne!(Error::EmptyUrl, Error::EmptyApplication);
        assert_ne!(Error::EmptyApplication, Error::EmptyPassword);
        assert_ne!(Error::EmptyUrl, Error::EmptyPassword);
    }
}
