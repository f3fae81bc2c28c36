//! REST API module using Axum
//!
//! A thin transport over the aggregator. Request and response bodies are
//! JSON wrapped in the envelope from [`envelope`].

pub mod envelope;
pub mod handlers;
mod routes;

pub use handlers::{AdviseRequest, ApiState};

use axum::http::{header, Method};
use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

/// Build a CORS layer that is restrictive by default (same-origin only).
///
/// Set `AGRI_ADVISOR_CORS_ORIGINS` to a comma-separated list of allowed
/// origins for a browser front end on another host.
fn build_cors_layer() -> CorsLayer {
    let base = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION]);

    match std::env::var("AGRI_ADVISOR_CORS_ORIGINS") {
        Ok(origins) => {
            let allowed: Vec<_> = origins
                .split(',')
                .filter_map(|o| o.trim().parse().ok())
                .collect();
            tracing::info!(origins = %origins, "CORS: allowing configured origins");
            base.allow_origin(allowed)
        }
        Err(_) => base,
    }
}

/// Create the application router
pub fn create_app(state: ApiState) -> Router {
    Router::new()
        .nest("/api/v1", routes::api_routes(state))
        .layer(TraceLayer::new_for_http())
        .layer(build_cors_layer())
}
