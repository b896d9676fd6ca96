//! Error kinds surfaced by the bus tracker client.

use quick_xml::DeError;
use thiserror::Error;

/// Result alias used throughout the library.
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Errors returned by the client facade, the response parser and the time
/// utilities.
#[derive(Error, Debug)]
pub enum Error {
    /// The remote API answered with an `<error>` element.
    #[error("code: api_error, description: {code}: {message}")]
    Api { code: String, message: String },

    /// The body could not be read as an XML response document.
    #[error("code: malformed_response, description: {0}")]
    MalformedResponse(String),

    /// A field was present but its text could not be converted.
    #[error("code: malformed_field, description: field `{field}` has invalid value {value:?}")]
    MalformedField { field: String, value: String },

    /// A timestamp field did not match the API's timestamp format.
    #[error("code: malformed_timestamp, description: field `{field}` has invalid timestamp {value:?}")]
    MalformedTimestamp { field: String, value: String },

    /// A required field was absent from a result element.
    #[error("code: missing_field, description: field `{field}` is missing")]
    MissingField { field: String },

    /// The caller's parameters were rejected before any request was sent.
    #[error("code: invalid_parameters, description: {0}")]
    InvalidParameters(String),

    /// An identifier list was empty or longer than the API accepts.
    #[error("code: improper_item_count, description: 0 < items <= 10 are allowed, {count} given")]
    ImproperItemCount { count: usize },

    /// The transport failed; passed through unmodified.
    #[error(transparent)]
    Transport(#[from] TransportError),
}

impl Error {
    /// Returns the error code.
    #[must_use]
    pub const fn code(&self) -> &str {
        match self {
            Self::Api { .. } => "api_error",
            Self::MalformedResponse(_) => "malformed_response",
            Self::MalformedField { .. } => "malformed_field",
            Self::MalformedTimestamp { .. } => "malformed_timestamp",
            Self::MissingField { .. } => "missing_field",
            Self::InvalidParameters(_) => "invalid_parameters",
            Self::ImproperItemCount { .. } => "improper_item_count",
            Self::Transport(_) => "transport",
        }
    }

    pub(crate) fn malformed(field: &str, value: &str) -> Self {
        Self::MalformedField { field: field.to_string(), value: value.to_string() }
    }

    pub(crate) fn malformed_timestamp(field: &str, value: &str) -> Self {
        Self::MalformedTimestamp { field: field.to_string(), value: value.to_string() }
    }

    pub(crate) fn missing(field: &str) -> Self {
        Self::MissingField { field: field.to_string() }
    }
}

impl From<DeError> for Error {
    fn from(err: DeError) -> Self {
        Self::MalformedResponse(format!("failed to deserialize response: {err}"))
    }
}

/// Failures raised by a [`Transport`](crate::fetch::Transport).
#[derive(Error, Debug)]
pub enum TransportError {
    #[error("code: transport, description: invalid request url {url:?}: {reason}")]
    InvalidUrl { url: String, reason: String },

    #[error("code: transport, description: http request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("code: transport, description: api returned status {status}: {body}")]
    Status { status: u16, body: String },
}
