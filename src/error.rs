//! Error types for sidechat.
//!
//! Every failure a chat turn can hit is one of these variants.  None of them is fatal to a
//! session: the session renders the error as an assistant-role message and returns to idle.

use std::error;
use std::fmt;
use std::io;
use std::sync::Arc;

/// The main error type for sidechat.
#[derive(Clone, Debug)]
pub enum Error {
    /// No configuration, an incomplete configuration, or no answer within the wait.
    ConfigurationMissing {
        /// Human-readable error message.
        message: String,
    },

    /// The configured provider has no entry in the provider catalog.
    UnknownProvider {
        /// The provider name as configured.
        provider: String,
    },

    /// The chat endpoint answered with a non-success HTTP status.
    RequestFailed {
        /// HTTP status code.
        status: u16,
        /// Canonical reason phrase for the status.
        status_text: String,
        /// Error message from the response body, if any.
        message: Option<String>,
    },

    /// A stream line could not be decoded.  Never surfaced to the user.
    MalformedFrame {
        /// The offending line.
        raw: String,
        /// Why it was rejected.
        message: String,
    },

    /// The response stream ended before the terminator arrived.
    StreamInterrupted {
        /// Human-readable error message.
        message: String,
        /// Underlying cause.
        source: Option<Arc<dyn error::Error + Send + Sync>>,
    },

    /// A send is already in flight on this session.
    Busy,

    /// A bounded wait elapsed.
    Timeout {
        /// Human-readable error message.
        message: String,
    },

    /// Connection error.
    Connection {
        /// Human-readable error message.
        message: String,
        /// Underlying cause.
        source: Option<Arc<dyn error::Error + Send + Sync>>,
    },

    /// HTTP client error.
    HttpClient {
        /// Human-readable error message.
        message: String,
        /// The underlying error.
        source: Option<Arc<dyn error::Error + Send + Sync>>,
    },

    /// Error during JSON or YAML serialization or deserialization.
    Serialization {
        /// Human-readable error message.
        message: String,
        /// The underlying error.
        source: Option<Arc<dyn error::Error + Send + Sync>>,
    },

    /// I/O error.
    Io {
        /// Human-readable error message.
        message: String,
        /// The underlying error.
        source: Arc<io::Error>,
    },

    /// A URL parsing or manipulation error.
    Url {
        /// Human-readable error message.
        message: String,
        /// The underlying error.
        source: Option<url::ParseError>,
    },

    /// Error during validation of user-supplied values.
    Validation {
        /// Human-readable error message.
        message: String,
        /// Parameter that failed validation.
        param: Option<String>,
    },
}

impl Error {
    /// Creates a new configuration-missing error.
    pub fn configuration_missing(message: impl Into<String>) -> Self {
        Error::ConfigurationMissing {
            message: message.into(),
        }
    }

    /// Creates a new unknown-provider error.
    pub fn unknown_provider(provider: impl Into<String>) -> Self {
        Error::UnknownProvider {
            provider: provider.into(),
        }
    }

    /// Creates a new request-failed error.
    pub fn request_failed(
        status: u16,
        status_text: impl Into<String>,
        message: Option<String>,
    ) -> Self {
        Error::RequestFailed {
            status,
            status_text: status_text.into(),
            message,
        }
    }

    /// Creates a new malformed-frame error.
    pub fn malformed_frame(raw: impl Into<String>, message: impl Into<String>) -> Self {
        Error::MalformedFrame {
            raw: raw.into(),
            message: message.into(),
        }
    }

    /// Creates a new stream-interrupted error.
    pub fn stream_interrupted(
        message: impl Into<String>,
        source: Option<Box<dyn error::Error + Send + Sync>>,
    ) -> Self {
        Error::StreamInterrupted {
            message: message.into(),
            source: source.map(Arc::from),
        }
    }

    /// Creates a new busy error.
    pub fn busy() -> Self {
        Error::Busy
    }

    /// Creates a new timeout error.
    pub fn timeout(message: impl Into<String>) -> Self {
        Error::Timeout {
            message: message.into(),
        }
    }

    /// Creates a new connection error.
    pub fn connection(
        message: impl Into<String>,
        source: Option<Box<dyn error::Error + Send + Sync>>,
    ) -> Self {
        Error::Connection {
            message: message.into(),
            source: source.map(Arc::from),
        }
    }

    /// Creates a new HTTP client error.
    pub fn http_client(
        message: impl Into<String>,
        source: Option<Box<dyn error::Error + Send + Sync>>,
    ) -> Self {
        Error::HttpClient {
            message: message.into(),
            source: source.map(Arc::from),
        }
    }

    /// Creates a new serialization error.
    pub fn serialization(
        message: impl Into<String>,
        source: Option<Box<dyn error::Error + Send + Sync>>,
    ) -> Self {
        Error::Serialization {
            message: message.into(),
            source: source.map(Arc::from),
        }
    }

    /// Creates a new I/O error.
    pub fn io(message: impl Into<String>, source: io::Error) -> Self {
        Error::Io {
            message: message.into(),
            source: Arc::new(source),
        }
    }

    /// Creates a new URL error.
    pub fn url(message: impl Into<String>, source: Option<url::ParseError>) -> Self {
        Error::Url {
            message: message.into(),
            source,
        }
    }

    /// Creates a new validation error.
    pub fn validation(message: impl Into<String>, param: Option<String>) -> Self {
        Error::Validation {
            message: message.into(),
            param,
        }
    }

    /// Returns true if the configuration could not be obtained.
    pub fn is_configuration_missing(&self) -> bool {
        matches!(self, Error::ConfigurationMissing { .. })
    }

    /// Returns true if the provider is not in the catalog.
    pub fn is_unknown_provider(&self) -> bool {
        matches!(self, Error::UnknownProvider { .. })
    }

    /// Returns true if the chat endpoint rejected the request.
    pub fn is_request_failed(&self) -> bool {
        matches!(self, Error::RequestFailed { .. })
    }

    /// Returns true if this error is a malformed stream frame.
    pub fn is_malformed_frame(&self) -> bool {
        matches!(self, Error::MalformedFrame { .. })
    }

    /// Returns true if the response stream closed early.
    pub fn is_stream_interrupted(&self) -> bool {
        matches!(self, Error::StreamInterrupted { .. })
    }

    /// Returns true if a send was refused because another is in flight.
    pub fn is_busy(&self) -> bool {
        matches!(self, Error::Busy)
    }

    /// Returns true if this error is a timeout.
    pub fn is_timeout(&self) -> bool {
        matches!(self, Error::Timeout { .. })
    }

    /// Returns true if this error is a connection error.
    pub fn is_connection(&self) -> bool {
        matches!(self, Error::Connection { .. })
    }

    /// Returns true if this error is a validation error.
    pub fn is_validation(&self) -> bool {
        matches!(self, Error::Validation { .. })
    }

    /// Returns the HTTP status code associated with this error, if any.
    pub fn status_code(&self) -> Option<u16> {
        match self {
            Error::RequestFailed { status, .. } => Some(*status),
            _ => None,
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::ConfigurationMissing { message } => {
                write!(f, "Configuration missing: {message}")
            }
            Error::UnknownProvider { provider } => {
                write!(f, "Unknown provider: {provider:?}")
            }
            Error::RequestFailed {
                status,
                status_text,
                message,
            } => {
                if let Some(message) = message {
                    write!(f, "API request failed: {status} {status_text}: {message}")
                } else {
                    write!(f, "API request failed: {status} {status_text}")
                }
            }
            Error::MalformedFrame { raw, message } => {
                write!(f, "Malformed frame: {message} in {raw:?}")
            }
            Error::StreamInterrupted { message, .. } => {
                write!(f, "Stream interrupted: {message}")
            }
            Error::Busy => {
                write!(f, "A message is already being sent")
            }
            Error::Timeout { message } => {
                write!(f, "Timeout error: {message}")
            }
            Error::Connection { message, .. } => {
                write!(f, "Connection error: {message}")
            }
            Error::HttpClient { message, .. } => {
                write!(f, "HTTP client error: {message}")
            }
            Error::Serialization { message, .. } => {
                write!(f, "Serialization error: {message}")
            }
            Error::Io { message, .. } => {
                write!(f, "I/O error: {message}")
            }
            Error::Url { message, .. } => {
                write!(f, "URL error: {message}")
            }
            Error::Validation { message, param } => {
                if let Some(param) = param {
                    write!(f, "Validation error: {message} (parameter: {param})")
                } else {
                    write!(f, "Validation error: {message}")
                }
            }
        }
    }
}

impl error::Error for Error {
    fn source(&self) -> Option<&(dyn error::Error + 'static)> {
        match self {
            Error::StreamInterrupted { source, .. } => source
                .as_ref()
                .map(|e| e.as_ref() as &(dyn error::Error + 'static)),
            Error::Connection { source, .. } => source
                .as_ref()
                .map(|e| e.as_ref() as &(dyn error::Error + 'static)),
            Error::HttpClient { source, .. } => source
                .as_ref()
                .map(|e| e.as_ref() as &(dyn error::Error + 'static)),
            Error::Serialization { source, .. } => source
                .as_ref()
                .map(|e| e.as_ref() as &(dyn error::Error + 'static)),
            Error::Io { source, .. } => Some(source),
            Error::Url { source, .. } => {
                source.as_ref().map(|e| e as &(dyn error::Error + 'static))
            }
            _ => None,
        }
    }
}

impl From<io::Error> for Error {
    fn from(err: io::Error) -> Self {
        Error::io(err.to_string(), err)
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::serialization(format!("JSON error: {err}"), Some(Box::new(err)))
    }
}

impl From<serde_yaml::Error> for Error {
    fn from(err: serde_yaml::Error) -> Self {
        Error::serialization(format!("YAML error: {err}"), Some(Box::new(err)))
    }
}

impl From<url::ParseError> for Error {
    fn from(err: url::ParseError) -> Self {
        Error::url(format!("URL parse error: {err}"), Some(err))
    }
}

/// A specialized Result type for sidechat operations.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_failed_display() {
        let err = Error::request_failed(401, "Unauthorized", None);
        assert_eq!(err.to_string(), "API request failed: 401 Unauthorized");
        assert_eq!(err.status_code(), Some(401));

        let err = Error::request_failed(
            429,
            "Too Many Requests",
            Some("slow down".to_string()),
        );
        assert_eq!(
            err.to_string(),
            "API request failed: 429 Too Many Requests: slow down"
        );
    }

    #[test]
    fn predicates() {
        assert!(Error::configuration_missing("no key").is_configuration_missing());
        assert!(Error::unknown_provider("acme").is_unknown_provider());
        assert!(Error::busy().is_busy());
        assert!(Error::stream_interrupted("eof", None).is_stream_interrupted());
        assert!(!Error::busy().is_timeout());
        assert_eq!(Error::busy().status_code(), None);
    }

    #[test]
    fn timeout_display() {
        let err = Error::timeout("Request timed out: deadline has elapsed");
        assert!(err.is_timeout());
        assert_eq!(
            err.to_string(),
            "Timeout error: Request timed out: deadline has elapsed"
        );
    }

    #[test]
    fn io_error_has_source() {
        let err: Error = io::Error::new(io::ErrorKind::NotFound, "gone").into();
        assert!(error::Error::source(&err).is_some());
    }
}
