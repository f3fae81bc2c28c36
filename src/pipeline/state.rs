//! Per-request stage machine
//!
//! ```text
//! START -> CONTEXT_RESOLVED -> RISK_SCORED -> ADVISORY_READY
//!   \             \                 \
//!    +-------------+-----------------+--> ERROR
//! ```
//!
//! Each request owns one `RequestTrace`; nothing here is shared or persisted.

use serde::Serialize;
use std::time::Instant;
use tracing::{debug, warn};

use crate::error::AdvisoryError;
use crate::types::Domain;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RequestStage {
    Start,
    ContextResolved,
    RiskScored,
    AdvisoryReady,
    Error,
}

impl RequestStage {
    pub fn is_terminal(self) -> bool {
        matches!(self, RequestStage::AdvisoryReady | RequestStage::Error)
    }

    /// The single forward successor, `None` for terminal stages
    pub fn next(self) -> Option<RequestStage> {
        match self {
            RequestStage::Start => Some(RequestStage::ContextResolved),
            RequestStage::ContextResolved => Some(RequestStage::RiskScored),
            RequestStage::RiskScored => Some(RequestStage::AdvisoryReady),
            RequestStage::AdvisoryReady | RequestStage::Error => None,
        }
    }

    /// Forward by exactly one stage, or to `Error` from any non-terminal stage
    pub fn can_transition_to(self, to: RequestStage) -> bool {
        if self.is_terminal() {
            return false;
        }
        to == RequestStage::Error || self.next() == Some(to)
    }
}

impl std::fmt::Display for RequestStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            RequestStage::Start => "START",
            RequestStage::ContextResolved => "CONTEXT_RESOLVED",
            RequestStage::RiskScored => "RISK_SCORED",
            RequestStage::AdvisoryReady => "ADVISORY_READY",
            RequestStage::Error => "ERROR",
        };
        f.write_str(s)
    }
}

/// Stage tracker for one advisory request
#[derive(Debug)]
pub struct RequestTrace {
    domain: Domain,
    entity_key: String,
    stage: RequestStage,
    visited: Vec<RequestStage>,
    started: Instant,
}

impl RequestTrace {
    pub fn new(domain: Domain, entity_key: &str) -> Self {
        Self {
            domain,
            entity_key: entity_key.to_string(),
            stage: RequestStage::Start,
            visited: vec![RequestStage::Start],
            started: Instant::now(),
        }
    }

    pub fn stage(&self) -> RequestStage {
        self.stage
    }

    pub fn visited(&self) -> &[RequestStage] {
        &self.visited
    }

    pub fn elapsed_ms(&self) -> u64 {
        u64::try_from(self.started.elapsed().as_millis()).unwrap_or(u64::MAX)
    }

    /// Move to the next stage. Out-of-order transitions are ignored and logged.
    pub fn advance(&mut self, to: RequestStage) {
        if !self.stage.can_transition_to(to) {
            warn!(from = %self.stage, to = %to, domain = %self.domain, "Ignoring invalid request stage transition");
            return;
        }
        debug!(
            domain = %self.domain,
            entity_key = %self.entity_key,
            from = %self.stage,
            to = %to,
            elapsed_ms = self.elapsed_ms(),
            "Advisory request stage"
        );
        self.stage = to;
        self.visited.push(to);
    }

    /// Enter `Error` and hand the error back for propagation
    pub fn fail(&mut self, err: AdvisoryError) -> AdvisoryError {
        warn!(
            domain = %self.domain,
            entity_key = %self.entity_key,
            stage = %self.stage,
            error = %err,
            "Advisory request failed"
        );
        self.advance(RequestStage::Error);
        err
    }
}
