//! Persistence collaborator
//!
//! The aggregator hands every completed advisory, with the domain result it
//! came from, to a `PersistenceSink` as a fire-and-forget write. A failed
//! write is logged and never reaches the caller.

pub mod history;

pub use history::{AdvisoryHistory, HistoryStats};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::warn;
use uuid::Uuid;

use crate::config::StorageConfig;
use crate::error::PersistenceError;
use crate::types::{Advisory, DomainResult};

/// One persisted advisory with its originating domain result
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AdvisoryRecord {
    pub id: Uuid,
    pub entity_key: String,
    pub result: DomainResult,
    pub advisory: Advisory,
    pub recorded_at: DateTime<Utc>,
}

impl AdvisoryRecord {
    pub fn new(entity_key: &str, result: DomainResult, advisory: Advisory) -> Self {
        Self {
            id: Uuid::new_v4(),
            entity_key: entity_key.to_string(),
            result,
            advisory,
            recorded_at: Utc::now(),
        }
    }
}

/// Storage backend for advisory history. Writes are blocking; callers run
/// them off the request path.
pub trait PersistenceSink: Send + Sync {
    fn record(&self, record: AdvisoryRecord) -> Result<(), PersistenceError>;

    fn name(&self) -> &'static str;
}

/// Open the configured history store; `None` when disabled or unavailable
pub fn open_configured(config: &StorageConfig) -> Option<AdvisoryHistory> {
    if !config.enabled {
        return None;
    }
    match AdvisoryHistory::open(&config.path) {
        Ok(history) => Some(history),
        Err(e) => {
            warn!(path = %config.path, error = %e, "Failed to open advisory history, advisories will not be persisted");
            None
        }
    }
}
