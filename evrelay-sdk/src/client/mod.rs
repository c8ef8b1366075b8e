//! HTTP client for the evrelay ingress.
//!
//! Gated behind the `client` cargo feature so crates that only need the
//! shared types do not pull in `reqwest`.

mod ingress;

pub use ingress::IngressClient;

use reqwest::StatusCode;

/// Errors produced by [`IngressClient`].
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// Transport-level failure (DNS, TLS, connection reset, …).
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    /// The ingress answered with a non-2xx status code.
    ///
    /// `error` carries the `error` field of the JSON body when there was one.
    #[error("api error: status {status}, body: {body}")]
    Api {
        status: StatusCode,
        error: Option<String>,
        body: String,
    },

    /// Response body could not be deserialized.
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    /// The base URL could not be joined with the endpoint path.
    #[error("invalid url: {0}")]
    Url(#[from] url::ParseError),
}

impl ClientError {
    /// The HTTP status of an API error, if this is one.
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            ClientError::Api { status, .. } => Some(*status),
            _ => None,
        }
    }
}
