//! Error types for taskdeck-api.

use thiserror::Error;

use taskdeck_core::StoreError;

/// All errors that can arise from backend calls.
#[derive(Debug, Error)]
pub enum ApiError {
    /// The backend answered with a non-2xx status.
    #[error("backend returned HTTP {status}: {body}")]
    Status { status: u16, body: String },

    /// Connection, DNS, TLS, or timeout failure before a status was received.
    #[error("transport error: {0}")]
    Transport(String),

    /// The response body could not be read.
    #[error("failed to read {resource} response: {source}")]
    Read {
        resource: &'static str,
        #[source]
        source: std::io::Error,
    },

    /// The response body was not the expected JSON shape.
    #[error("failed to decode {resource} response: {source}")]
    Decode {
        resource: &'static str,
        #[source]
        source: serde_json::Error,
    },

    /// A write asked for `return=representation` but no row came back.
    #[error("backend returned no {resource} row")]
    EmptyResponse { resource: &'static str },

    /// Backend settings are missing.
    #[error("configuration error: {0}")]
    Config(#[from] StoreError),
}

impl ApiError {
    /// The access token was rejected; signing in again is the only fix.
    pub fn is_unauthorized(&self) -> bool {
        matches!(self, ApiError::Status { status: 401 | 403, .. })
    }
}

impl From<ureq::Error> for ApiError {
    fn from(err: ureq::Error) -> Self {
        match err {
            ureq::Error::Status(status, response) => ApiError::Status {
                status,
                body: response.into_string().unwrap_or_default(),
            },
            ureq::Error::Transport(transport) => ApiError::Transport(transport.to_string()),
        }
    }
}
