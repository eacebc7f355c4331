//! Client error types.

use thiserror::Error;

pub type ClientResult<T> = Result<T, ClientError>;

/// Errors from talking to the check-execution service.
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("request to {url} failed: {source}")]
    Request {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("{url} returned {status}: {body}")]
    Status {
        url: String,
        status: u16,
        body: String,
    },

    #[error("failed to decode response from {url}: {source}")]
    Decode {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("failed to encode run arguments: {0}")]
    Encode(#[from] serde_json::Error),

    #[error("invalid client configuration: {0}")]
    Config(String),

    /// The request task ended without producing a response.
    #[error("request aborted: {0}")]
    Aborted(String),
}
