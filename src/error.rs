//! Error types and failure classification.
//!
//! Every failure surfaced by this crate is an [`Error`]. Failures that came
//! back from the API with a status code are *classified*: the status decides
//! whether the error counts as rate limiting, an authentication failure, a
//! client-side mistake, or a server-side problem. Those facets drive the
//! default retry behaviour and let callers react to a 429 differently from a
//! rejected token.

use http::{HeaderMap, StatusCode};
use std::fmt;
use std::time::Duration;

const RATE_LIMIT_MESSAGE: &str = "Rate limit exceeded. Please wait before making more requests.";
const AUTH_MESSAGE: &str = "Authentication failed. Please check your API token.";
const BAD_REQUEST_MESSAGE: &str = "Invalid request. Please check your filters and query parameters.";
const NOT_FOUND_MESSAGE: &str = "The requested resource was not found.";
const SERVER_ERROR_MESSAGE: &str = "The VNDB server encountered an error. Please try again later.";

const DEFAULT_AUTH_MESSAGE: &str = "Authentication failed";

/// The main error type for VNDB API calls and filter construction.
///
/// # Examples
///
/// ```no_run
/// use vndb_kana::{Client, Error, Query};
///
/// # async fn example() -> Result<(), Error> {
/// let client = Client::builder().build()?;
///
/// match client.vn::<serde_json::Value>(&Query::new()).await {
///     Ok(page) => println!("{} results", page.results.len()),
///     Err(e) if e.is_rate_limit() => {
///         eprintln!("slow down, retry after {:?}", e.retry_after());
///     }
///     Err(e) if e.is_auth_error() => eprintln!("bad token"),
///     Err(e) => eprintln!("{}", e.friendly_message()),
/// }
/// # Ok(())
/// # }
/// ```
#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// Malformed input to a builder or configuration call.
    ///
    /// Never carries a status code and is never retried.
    #[error("Validation error: {0}")]
    Validation(String),

    /// The API answered with a non-success status.
    ///
    /// Rate limiting and authentication failures normally use their dedicated
    /// variants, but a generic error with status 429 or 401 is still
    /// recognised by the facet methods.
    #[error("HTTP error {status}: {message}")]
    Api {
        /// The HTTP status code
        status: StatusCode,
        /// Message reported by the server, or the status reason
        message: String,
        /// The raw response body
        raw_response: Option<String>,
        /// Machine-readable error code, when the body carried one
        code: Option<String>,
    },

    /// The API rejected the request because of rate limiting (status 429).
    #[error("Rate limited: {message}")]
    RateLimit {
        /// Message reported by the server
        message: String,
        /// The raw response body
        raw_response: Option<String>,
        /// Machine-readable error code, when the body carried one
        code: Option<String>,
        /// How long the server asked us to wait, if it said
        retry_after: Option<Duration>,
    },

    /// The API rejected the credentials (status 401).
    #[error("Authentication error: {message}")]
    Authentication {
        /// Message reported by the server, or `"Authentication failed"`
        message: String,
        /// The raw response body
        raw_response: Option<String>,
        /// Machine-readable error code, when the body carried one
        code: Option<String>,
    },

    /// The request never produced an HTTP response (DNS, connect, reset, timeout).
    #[error("Transport error ({kind}): {message}")]
    Transport {
        /// What kind of connection-level failure occurred
        kind: TransportKind,
        /// Description of the failure
        message: String,
        /// The underlying client error, when one exists
        #[source]
        source: Option<reqwest::Error>,
    },

    /// A success response whose body did not match the expected type.
    #[error("Failed to deserialize response (status {status}): {serde_error}")]
    DeserializationFailed {
        /// The raw response body that failed to deserialize
        raw_response: String,
        /// The serde error message
        serde_error: String,
        /// The HTTP status code
        status: StatusCode,
    },

    /// Failed to serialize the request body.
    #[error("Failed to serialize request: {0}")]
    SerializationFailed(String),

    /// Invalid client configuration, such as a bad header value.
    #[error("Configuration error: {0}")]
    ConfigurationError(String),

    /// An invalid URL was provided.
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),
}

/// Connection-level failure kinds for [`Error::Transport`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportKind {
    /// The peer reset or aborted the connection.
    ConnectionReset,
    /// The host name could not be resolved.
    NameResolution,
    /// Nothing accepted the connection.
    ConnectionRefused,
    /// The request exceeded its timeout.
    Timeout,
    /// Any other transport failure.
    Other,
}

impl TransportKind {
    /// Classifies a `reqwest` failure by walking its source chain.
    pub fn from_reqwest(err: &reqwest::Error) -> Self {
        if err.is_timeout() {
            return TransportKind::Timeout;
        }

        let mut cause = std::error::Error::source(err);
        while let Some(current) = cause {
            if let Some(io) = current.downcast_ref::<std::io::Error>() {
                match io.kind() {
                    std::io::ErrorKind::ConnectionRefused => {
                        return TransportKind::ConnectionRefused
                    }
                    std::io::ErrorKind::ConnectionReset | std::io::ErrorKind::ConnectionAborted => {
                        return TransportKind::ConnectionReset
                    }
                    std::io::ErrorKind::TimedOut => return TransportKind::Timeout,
                    _ => {}
                }
            }
            let text = current.to_string().to_ascii_lowercase();
            if text.contains("dns error") || text.contains("failed to lookup address") {
                return TransportKind::NameResolution;
            }
            cause = current.source();
        }

        TransportKind::Other
    }

    /// Returns `true` for the kinds worth retrying by default:
    /// connection reset, name resolution failure and connection refused.
    pub fn is_transient(self) -> bool {
        matches!(
            self,
            TransportKind::ConnectionReset
                | TransportKind::NameResolution
                | TransportKind::ConnectionRefused
        )
    }
}

impl fmt::Display for TransportKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            TransportKind::ConnectionReset => "connection reset",
            TransportKind::NameResolution => "name resolution failed",
            TransportKind::ConnectionRefused => "connection refused",
            TransportKind::Timeout => "timed out",
            TransportKind::Other => "other",
        };
        f.write_str(name)
    }
}

impl From<reqwest::Error> for Error {
    fn from(err: reqwest::Error) -> Self {
        Error::Transport {
            kind: TransportKind::from_reqwest(&err),
            message: err.to_string(),
            source: Some(err),
        }
    }
}

impl Error {
    /// Creates a validation error.
    pub fn validation(message: impl Into<String>) -> Self {
        Error::Validation(message.into())
    }

    /// Creates a generic classified API error with no specialisation.
    pub fn api(status: StatusCode, message: impl Into<String>) -> Self {
        Error::Api {
            status,
            message: message.into(),
            raw_response: None,
            code: None,
        }
    }

    /// Creates a rate-limit error with an optional server wait hint.
    pub fn rate_limit(message: impl Into<String>, retry_after: Option<Duration>) -> Self {
        Error::RateLimit {
            message: message.into(),
            raw_response: None,
            code: None,
            retry_after,
        }
    }

    /// Creates an authentication error; the message defaults to
    /// `"Authentication failed"`.
    pub fn authentication(message: Option<String>) -> Self {
        Error::Authentication {
            message: message.unwrap_or_else(|| DEFAULT_AUTH_MESSAGE.to_string()),
            raw_response: None,
            code: None,
        }
    }

    /// Creates a transport error without an underlying client error.
    pub fn transport(kind: TransportKind, message: impl Into<String>) -> Self {
        Error::Transport {
            kind,
            message: message.into(),
            source: None,
        }
    }

    /// Builds the classified error for a non-success HTTP response.
    ///
    /// 429 becomes [`Error::RateLimit`] with the wait hint taken from the
    /// headers, 401 becomes [`Error::Authentication`], everything else a
    /// generic [`Error::Api`]. A JSON body with `message`/`code` fields
    /// supplies the message and code; otherwise the trimmed body text is used.
    /// Without either, a 401 reads `"Authentication failed"` and any other
    /// status its reason phrase.
    pub fn classify_response(status: StatusCode, headers: &HeaderMap, body: String) -> Self {
        let (message, code) = extract_message(&body);
        let raw_response = Some(body);

        match status.as_u16() {
            429 => Error::RateLimit {
                message: message.unwrap_or_else(|| reason(status)),
                raw_response,
                code,
                retry_after: crate::rate_limit::retry_after_from_headers(headers),
            },
            401 => Error::Authentication {
                message: message.unwrap_or_else(|| DEFAULT_AUTH_MESSAGE.to_string()),
                raw_response,
                code,
            },
            _ => Error::Api {
                status,
                message: message.unwrap_or_else(|| reason(status)),
                raw_response,
                code,
            },
        }
    }

    /// Returns the HTTP status code if this error has one.
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            Error::Api { status, .. } => Some(*status),
            Error::RateLimit { .. } => Some(StatusCode::TOO_MANY_REQUESTS),
            Error::Authentication { .. } => Some(StatusCode::UNAUTHORIZED),
            Error::DeserializationFailed { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Returns the raw response body if this error has one.
    pub fn raw_response(&self) -> Option<&str> {
        match self {
            Error::Api { raw_response, .. }
            | Error::RateLimit { raw_response, .. }
            | Error::Authentication { raw_response, .. } => raw_response.as_deref(),
            Error::DeserializationFailed { raw_response, .. } => Some(raw_response),
            _ => None,
        }
    }

    /// Returns the machine-readable error code, if the server sent one.
    pub fn code(&self) -> Option<&str> {
        match self {
            Error::Api { code, .. }
            | Error::RateLimit { code, .. }
            | Error::Authentication { code, .. } => code.as_deref(),
            _ => None,
        }
    }

    /// Returns the server-communicated wait, only present on rate-limit errors.
    pub fn retry_after(&self) -> Option<Duration> {
        match self {
            Error::RateLimit { retry_after, .. } => *retry_after,
            _ => None,
        }
    }

    /// `true` when the status is 429.
    pub fn is_rate_limit(&self) -> bool {
        self.status_code() == Some(429)
    }

    /// `true` when the status is 401.
    pub fn is_auth_error(&self) -> bool {
        self.status_code() == Some(401)
    }

    /// `true` when the status is in `400..500`.
    pub fn is_client_error(&self) -> bool {
        matches!(self.status_code(), Some(400..=499))
    }

    /// `true` when the status is in `500..600`.
    pub fn is_server_error(&self) -> bool {
        matches!(self.status_code(), Some(500..=599))
    }

    /// `true` for transport failures of a transient kind.
    pub fn is_transient_transport(&self) -> bool {
        matches!(self, Error::Transport { kind, .. } if kind.is_transient())
    }

    /// Returns a message suitable for showing to an end user.
    ///
    /// The first matching rule wins: rate limit, authentication, 400, 404,
    /// server error. Anything else falls back to the error's own message.
    pub fn friendly_message(&self) -> String {
        if self.is_rate_limit() {
            return RATE_LIMIT_MESSAGE.to_string();
        }
        if self.is_auth_error() {
            return AUTH_MESSAGE.to_string();
        }
        match self.status_code() {
            Some(400) => return BAD_REQUEST_MESSAGE.to_string(),
            Some(404) => return NOT_FOUND_MESSAGE.to_string(),
            _ => {}
        }
        if self.is_server_error() {
            return SERVER_ERROR_MESSAGE.to_string();
        }
        self.message()
    }

    /// The error's own message without the variant prefix.
    pub fn message(&self) -> String {
        match self {
            Error::Validation(message) => message.clone(),
            Error::Api { message, .. }
            | Error::RateLimit { message, .. }
            | Error::Authentication { message, .. }
            | Error::Transport { message, .. } => message.clone(),
            other => other.to_string(),
        }
    }

    // Deserialization failures keep their 2xx status for debugging but are
    // not classified, so facets ignore them.
    fn status_code(&self) -> Option<u16> {
        match self {
            Error::DeserializationFailed { .. } => None,
            _ => self.status().map(|status| status.as_u16()),
        }
    }
}

/// `true` for any error produced from an API status: generic, rate-limit or
/// authentication.
pub fn is_classified_error(error: &Error) -> bool {
    matches!(
        error,
        Error::Api { .. } | Error::RateLimit { .. } | Error::Authentication { .. }
    )
}

/// `true` for [`Error::RateLimit`] and for a generic classified error with status 429.
pub fn is_rate_limit_error(error: &Error) -> bool {
    matches!(error, Error::RateLimit { .. }) || (is_classified_error(error) && error.is_rate_limit())
}

/// `true` for [`Error::Authentication`] and for a generic classified error with status 401.
pub fn is_auth_error(error: &Error) -> bool {
    matches!(error, Error::Authentication { .. })
        || (is_classified_error(error) && error.is_auth_error())
}

fn reason(status: StatusCode) -> String {
    status
        .canonical_reason()
        .unwrap_or("Unknown error")
        .to_string()
}

fn extract_message(body: &str) -> (Option<String>, Option<String>) {
    if let Ok(serde_json::Value::Object(map)) = serde_json::from_str::<serde_json::Value>(body) {
        let message = map
            .get("message")
            .or_else(|| map.get("error"))
            .and_then(|v| v.as_str())
            .map(str::to_string);
        let code = map.get("code").and_then(|v| match v {
            serde_json::Value::String(s) => Some(s.clone()),
            serde_json::Value::Number(n) => Some(n.to_string()),
            _ => None,
        });
        return (message, code);
    }

    let trimmed = body.trim();
    if trimmed.is_empty() {
        (None, None)
    } else {
        (Some(trimmed.to_string()), None)
    }
}

/// A specialized `Result` type for VNDB API calls.
pub type Result<T> = std::result::Result<T, Error>;
