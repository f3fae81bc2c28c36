//! Advisory history in Sled DB
//!
//! Keys are the record timestamp (nanoseconds, big-endian) followed by the
//! record UUID, so iteration order is chronological and concurrent writes in
//! the same nanosecond never collide.

use std::path::Path;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{debug, info};

use super::{AdvisoryRecord, PersistenceSink};
use crate::error::PersistenceError;
use crate::types::{Domain, Severity};

const KEY_LEN: usize = 8 + 16;

fn record_key(record: &AdvisoryRecord) -> [u8; KEY_LEN] {
    let nanos = record
        .recorded_at
        .timestamp_nanos_opt()
        .unwrap_or_else(|| record.recorded_at.timestamp().saturating_mul(1_000_000_000));
    let mut key = [0u8; KEY_LEN];
    key[..8].copy_from_slice(&(nanos.max(0) as u64).to_be_bytes());
    key[8..].copy_from_slice(record.id.as_bytes());
    key
}

/// History statistics
#[derive(Debug, Clone, Serialize)]
pub struct HistoryStats {
    pub record_count: usize,
    pub size_bytes: u64,
    pub oldest: Option<DateTime<Utc>>,
    pub newest: Option<DateTime<Utc>>,
}

/// Sled-backed advisory history
#[derive(Clone)]
pub struct AdvisoryHistory {
    db: Arc<sled::Db>,
}

impl AdvisoryHistory {
    /// Open or create the history database at `path`
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, PersistenceError> {
        let path_ref = path.as_ref();
        if let Some(parent) = path_ref.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)
                    .map_err(|e| PersistenceError::Unavailable(format!("{}: {e}", parent.display())))?;
            }
        }
        let db = sled::open(path_ref)?;
        info!(path = %path_ref.display(), records = db.len(), "Advisory history opened");
        Ok(Self { db: Arc::new(db) })
    }

    pub fn store(&self, record: &AdvisoryRecord) -> Result<(), PersistenceError> {
        let value = serde_json::to_vec(record)?;
        self.db.insert(record_key(record), value)?;
        debug!(id = %record.id, domain = %record.advisory.domain, "Advisory record stored");
        Ok(())
    }

    /// Most recent `limit` records, newest first, optionally restricted to one
    /// domain and a minimum severity
    pub fn recent_filtered(
        &self,
        domain: Option<Domain>,
        min_severity: Option<Severity>,
        limit: usize,
    ) -> Vec<AdvisoryRecord> {
        self.db
            .iter()
            .rev()
            .filter_map(|item| item.ok())
            .filter_map(|(_, value)| serde_json::from_slice::<AdvisoryRecord>(&value).ok())
            .filter(|r| domain.map_or(true, |d| r.advisory.domain == d))
            .filter(|r| min_severity.map_or(true, |s| r.advisory.risk.severity >= s))
            .take(limit)
            .collect()
    }

    pub fn count(&self) -> usize {
        self.db.len()
    }

    /// Delete records older than `cutoff`; returns how many were removed
    pub fn prune_before(&self, cutoff: DateTime<Utc>) -> Result<usize, PersistenceError> {
        let nanos = cutoff.timestamp_nanos_opt().unwrap_or(0).max(0) as u64;
        let end = nanos.to_be_bytes();

        let stale: Vec<sled::IVec> = self
            .db
            .range(..end.to_vec())
            .filter_map(|item| item.ok().map(|(k, _)| k))
            .collect();
        for key in &stale {
            self.db.remove(key)?;
        }
        if !stale.is_empty() {
            self.db.flush()?;
        }
        Ok(stale.len())
    }

    pub fn stats(&self) -> HistoryStats {
        let recorded_at = |value: Option<sled::Result<(sled::IVec, sled::IVec)>>| {
            value
                .and_then(|r| r.ok())
                .and_then(|(_, v)| serde_json::from_slice::<AdvisoryRecord>(&v).ok())
                .map(|r| r.recorded_at)
        };
        HistoryStats {
            record_count: self.count(),
            size_bytes: self.db.size_on_disk().unwrap_or(0),
            oldest: recorded_at(self.db.iter().next()),
            newest: recorded_at(self.db.iter().next_back()),
        }
    }

    pub fn flush(&self) -> Result<(), PersistenceError> {
        self.db.flush()?;
        Ok(())
    }
}

impl PersistenceSink for AdvisoryHistory {
    fn record(&self, record: AdvisoryRecord) -> Result<(), PersistenceError> {
        self.store(&record)
    }

    fn name(&self) -> &'static str {
        "sled"
    }
}
