//! API route handlers

use std::sync::Arc;
use std::time::Instant;

use axum::extract::{Query, State};
use axum::response::Response;
use axum::Json;
use serde::{Deserialize, Serialize};

use super::envelope::{ApiErrorResponse, ApiResponse};
use crate::config::defaults::{HISTORY_DEFAULT_LIMIT, HISTORY_MAX_LIMIT};
use crate::pipeline::{Aggregator, AggregatorStats};
use crate::storage::{AdvisoryHistory, HistoryStats};
use crate::types::{ContextBundle, Domain, DomainResult, Severity};

// ============================================================================
// API State
// ============================================================================

/// Shared state for API handlers
#[derive(Clone)]
pub struct ApiState {
    pub aggregator: Arc<Aggregator>,
    /// Advisory history, when storage is enabled
    pub history: Option<AdvisoryHistory>,
    pub started_at: Instant,
}

impl ApiState {
    pub fn new(aggregator: Arc<Aggregator>, history: Option<AdvisoryHistory>) -> Self {
        Self {
            aggregator,
            history,
            started_at: Instant::now(),
        }
    }
}

// ============================================================================
// Advisories
// ============================================================================

/// Request body for POST /api/v1/advisories
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AdviseRequest {
    pub domain: Domain,
    /// City name or `user:field@City`
    pub entity_key: String,
    pub result: DomainResult,
    /// Caller-known context (field profile, market quote, history)
    #[serde(default)]
    pub context: ContextBundle,
}

/// POST /api/v1/advisories - Score a domain result and return its advisory
pub async fn create_advisory(State(state): State<ApiState>, Json(request): Json<AdviseRequest>) -> Response {
    let AdviseRequest {
        domain,
        entity_key,
        result,
        context,
    } = request;

    match state
        .aggregator
        .advise_with_hints(domain, result, &entity_key, context)
        .await
    {
        Ok(advisory) => ApiResponse::ok(advisory),
        Err(e) => ApiErrorResponse::from_advisory_error(&e),
    }
}

#[derive(Debug, Deserialize)]
pub struct HistoryQuery {
    #[serde(default)]
    pub limit: Option<usize>,
    #[serde(default)]
    pub domain: Option<Domain>,
    #[serde(default)]
    pub min_severity: Option<Severity>,
}

/// GET /api/v1/advisories - Recent advisories, newest first
pub async fn list_advisories(State(state): State<ApiState>, Query(query): Query<HistoryQuery>) -> Response {
    let Some(history) = state.history.as_ref() else {
        return ApiErrorResponse::service_unavailable("advisory history is disabled");
    };
    let limit = query.limit.unwrap_or(HISTORY_DEFAULT_LIMIT);
    if limit == 0 || limit > HISTORY_MAX_LIMIT {
        return ApiErrorResponse::bad_request(format!("limit must be between 1 and {HISTORY_MAX_LIMIT}"));
    }

    let history = history.clone();
    let records = tokio::task::spawn_blocking(move || {
        history.recent_filtered(query.domain, query.min_severity, limit)
    })
    .await;

    match records {
        Ok(records) => ApiResponse::ok(records),
        Err(e) => ApiErrorResponse::service_unavailable(format!("history read failed: {e}")),
    }
}

// ============================================================================
// Health
// ============================================================================

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
    pub uptime_seconds: u64,
    pub history_enabled: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub history: Option<HistoryStats>,
    pub stats: AggregatorStats,
}

/// GET /api/v1/health - Liveness, aggregator counters and history size
pub async fn get_health(State(state): State<ApiState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
        uptime_seconds: state.started_at.elapsed().as_secs(),
        history_enabled: state.history.is_some(),
        history: state.history.as_ref().map(AdvisoryHistory::stats),
        stats: state.aggregator.stats(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::advisory::AdvisoryGenerator;
    use crate::config::AdvisorConfig;
    use crate::providers::NoopFetcher;

    fn create_test_state() -> ApiState {
        let aggregator = Aggregator::new(
            &AdvisorConfig::default(),
            AdvisoryGenerator::fallback_only(),
            Arc::new(NoopFetcher),
        );
        ApiState::new(Arc::new(aggregator), None)
    }

    #[tokio::test]
    async fn test_health_check() {
        let response = get_health(State(create_test_state())).await;
        assert_eq!(response.status, "ok");
        assert!(!response.history_enabled);
        assert!(response.history.is_none());
        assert_eq!(response.stats.requests, 0);
    }

    #[tokio::test]
    async fn test_history_disabled_is_unavailable() {
        let query = HistoryQuery {
            limit: None,
            domain: None,
            min_severity: None,
        };
        let response = list_advisories(State(create_test_state()), Query(query)).await;
        assert_eq!(response.status(), axum::http::StatusCode::SERVICE_UNAVAILABLE);
    }
}
