//! HTTP endpoint layer.
//!
//! The only place that knows about status codes: handlers validate the
//! request, hand it to the gateway and map the outcome to a response.

pub mod error;
pub mod health;
pub mod state;
pub mod tts;

use axum::routing::{get, post};
use axum::Router;

pub use error::ApiError;
pub use state::AppState;

/// Build the application router.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/tts", post(tts::synthesize))
        .route("/health", get(health::health))
        .with_state(state)
}
