//! HTTP API of the ingress.
//!
//! # Endpoints
//!
//! - `GET /`         – liveness banner, unauthenticated
//! - `POST /process` – authenticate, validate and enqueue one event

pub mod ingress;

use crate::state::AppState;
use axum::Router;
use axum::routing::{get, post};

/// Build the ingress API router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(ingress::liveness))
        .route("/process", post(ingress::process_submission))
}
