//! Ingress handlers.

use axum::{
    Json,
    body::Bytes,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use evrelay_core::processors::PublishError;
use evrelay_core::validation::{self, ValidationError};
use evrelay_sdk::objects::{ErrorResponse, EventSubmission, StatusResponse};
use kanau::processor::Processor;

use crate::state::AppState;

pub const LIVENESS_BANNER: &str = "Hello, your application is running!";

/// `GET /` — liveness check.
///
/// The router only exists once the authority token has been loaded, so
/// answering at all means startup completed.
pub async fn liveness() -> &'static str {
    LIVENESS_BANNER
}

/// `POST /process` — authenticate, validate and enqueue one event.
///
/// The body is parsed by hand so that a malformed body answers with the
/// same JSON error shape as every other rejection. Field values never fail
/// parsing, so only a body that is not a JSON object skips the token check.
pub async fn process_submission(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<Json<StatusResponse>, IngressError> {
    let submission: EventSubmission =
        serde_json::from_slice(&body).map_err(IngressError::MalformedBody)?;

    let resolved = validation::resolve(&submission);
    if !state.authenticator.is_valid(resolved.token) {
        tracing::warn!(source = ?resolved.source, "Rejected submission with invalid token");
        return Err(IngressError::InvalidToken);
    }

    let event = validation::validate(&submission)?;
    let message_id = state.publisher.process(event).await?;

    Ok(Json(StatusResponse::queued(message_id)))
}

/// Errors that can occur in ingress handlers.
#[derive(Debug, thiserror::Error)]
pub enum IngressError {
    #[error("invalid JSON body: {0}")]
    MalformedBody(serde_json::Error),
    #[error("invalid token")]
    InvalidToken,
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error(transparent)]
    Publish(#[from] PublishError),
}

impl IntoResponse for IngressError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            IngressError::MalformedBody(e) => {
                tracing::debug!(error = %e, "Rejected malformed body");
                (StatusCode::BAD_REQUEST, "Invalid JSON body".to_string())
            }
            IngressError::InvalidToken => (StatusCode::FORBIDDEN, "Invalid token".to_string()),
            IngressError::Validation(ValidationError::InvalidTimestampFormat) => (
                StatusCode::BAD_REQUEST,
                "Invalid timestamp format".to_string(),
            ),
            IngressError::Validation(ValidationError::FutureTimestamp(_)) => (
                StatusCode::BAD_REQUEST,
                "Timestamp is in the future".to_string(),
            ),
            IngressError::Publish(e) => {
                tracing::error!(error = %e, "Failed to publish event");
                (StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
            }
        };
        (status, Json(ErrorResponse::new(message))).into_response()
    }
}
