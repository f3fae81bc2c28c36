//! API route definitions
//!
//! - POST /api/v1/advisories - advisory for one domain result
//! - GET  /api/v1/advisories - recent advisory history
//! - GET  /api/v1/health     - liveness and counters

use axum::{routing::get, Router};

use super::handlers::{self, ApiState};

pub fn api_routes(state: ApiState) -> Router {
    Router::new()
        .route(
            "/advisories",
            get(handlers::list_advisories).post(handlers::create_advisory),
        )
        .route("/health", get(handlers::get_health))
        .with_state(state)
}
