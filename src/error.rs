use std::sync::Arc;

use reqwest::StatusCode;
use thiserror::Error;

/// Result type used by fetch and parse operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors produced while fetching and parsing settings.
///
/// [`SettingsFetcher::fetch`](crate::SettingsFetcher::fetch) collapses all of them into
/// [`SettingsSnapshot::has_error`](crate::SettingsSnapshot::has_error), so most callers never
/// need to match on this type. Use [`SettingsFetcher::try_fetch`](crate::SettingsFetcher::try_fetch)
/// to see the exact failure.
#[derive(Error, Debug, Clone)]
#[non_exhaustive]
pub enum Error {
    /// The request did not complete within the configured timeout.
    #[error("request timed out")]
    Timeout,
    /// Could not connect to the settings server.
    #[error("connection failed: {0}")]
    Connection(String),
    /// The server answered with a 4xx or 5xx status.
    #[error("server responded with error status {0}")]
    HttpStatus(StatusCode),
    /// The response body is not a valid settings document.
    // serde_json::Error is not clonable, so we're wrapping it in an Arc.
    #[error("malformed settings body")]
    MalformedBody(#[source] Arc<serde_json::Error>),
    /// A recognized response header has an unusable value.
    #[error("malformed {header} header")]
    MalformedHeader {
        /// Header name.
        header: &'static str,
    },
    /// The request URL could not be parsed.
    #[error("invalid settings url")]
    InvalidUrl(#[source] url::ParseError),
    /// Any other transport-level failure.
    #[error(transparent)]
    Network(Arc<reqwest::Error>),
    /// The transport panicked.
    #[error("unexpected failure: {0}")]
    Unexpected(String),
}

impl From<reqwest::Error> for Error {
    fn from(value: reqwest::Error) -> Self {
        let value = value.without_url();
        if value.is_timeout() {
            Error::Timeout
        } else if value.is_connect() {
            Error::Connection(value.to_string())
        } else if let Some(status) = value.status() {
            Error::HttpStatus(status)
        } else {
            Error::Network(Arc::new(value))
        }
    }
}

impl From<serde_json::Error> for Error {
    fn from(value: serde_json::Error) -> Self {
        Error::MalformedBody(Arc::new(value))
    }
}

/// Reasons a feature could not be evaluated.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum EvaluationError {
    /// The settings document has no entry for the feature.
    #[error("feature not found")]
    FeatureNotFound,
    /// The entry exists but is not a valid feature definition.
    #[error("feature definition is malformed")]
    MalformedFeature,
}
