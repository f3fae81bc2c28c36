//! Background upkeep for a long-running service
//!
//! Expired cache entries are otherwise dropped only when looked up again, and
//! the advisory history grows without bound. `serve` runs one sweep at
//! startup and then one per `cache.sweep_interval_secs`.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::cache::ContextCache;
use crate::storage::AdvisoryHistory;

/// Outcome of one maintenance pass
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SweepReport {
    pub cache_expired: usize,
    pub history_pruned: usize,
}

/// Cache and history upkeep
#[derive(Clone)]
pub struct Maintenance {
    cache: Arc<ContextCache>,
    history: Option<AdvisoryHistory>,
    retention_days: u32,
}

impl Maintenance {
    pub fn new(cache: Arc<ContextCache>, history: Option<AdvisoryHistory>, retention_days: u32) -> Self {
        Self {
            cache,
            history,
            retention_days,
        }
    }

    /// Drop expired cache entries and history older than the retention window.
    /// A retention of 0 days keeps all history.
    pub fn sweep_at(&self, now: DateTime<Utc>) -> SweepReport {
        let cache_expired = self.cache.prune_expired_at(now);

        let history_pruned = match (&self.history, self.retention_days) {
            (Some(history), days) if days > 0 => {
                let cutoff = now - chrono::Duration::days(i64::from(days));
                match history.prune_before(cutoff) {
                    Ok(n) => n,
                    Err(e) => {
                        warn!(error = %e, "Failed to prune advisory history");
                        0
                    }
                }
            }
            _ => 0,
        };

        let report = SweepReport {
            cache_expired,
            history_pruned,
        };
        if report.history_pruned > 0 {
            info!(
                pruned = report.history_pruned,
                retention_days = self.retention_days,
                "Pruned advisory history older than retention window"
            );
        }
        debug!(cache_expired = report.cache_expired, "Maintenance sweep complete");
        report
    }

    /// Sweep now, then every `period` until the handle is aborted
    pub fn spawn(self, period: Duration) -> JoinHandle<()> {
        tokio::spawn(async move {
            info!(period_secs = period.as_secs(), "Maintenance task starting");
            let mut interval = tokio::time::interval(period);
            interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            loop {
                interval.tick().await;
                let this = self.clone();
                // sled deletes block
                if let Err(e) = tokio::task::spawn_blocking(move || this.sweep_at(Utc::now())).await {
                    warn!(error = %e, "Maintenance sweep panicked");
                }
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::advisory::fallback_advisory;
    use crate::cache::CacheKey;
    use crate::config::RiskConfig;
    use crate::risk::RiskScorer;
    use crate::storage::AdvisoryRecord;
    use crate::types::{Advisory, AdvisorySource, ContextBundle, Domain, DomainResult, PrimaryValue};

    fn record_at(at: DateTime<Utc>) -> AdvisoryRecord {
        let result = DomainResult::new(Domain::Market, PrimaryValue::Number(5.0), 0.9)
            .with_metric("volatility_pct", 5.0)
            .with_metric("change_30d_pct", 1.0);
        let risk = RiskScorer::new(RiskConfig::default())
            .score(&result, &ContextBundle::default())
            .unwrap();
        let (summary, recommendations) = fallback_advisory(&result, &risk);
        let advisory = Advisory {
            domain: Domain::Market,
            summary,
            recommendations,
            source: AdvisorySource::Fallback,
            risk,
            generated_at: at,
        };
        let mut record = AdvisoryRecord::new("onion@Nashik", result, advisory);
        record.recorded_at = at;
        record
    }

    #[test]
    fn test_sweep_drops_expired_context_and_old_history() {
        let dir = tempfile::tempdir().unwrap();
        let history = AdvisoryHistory::open(dir.path().join("history.db")).unwrap();
        let now = Utc::now();
        history.store(&record_at(now - chrono::Duration::days(400))).unwrap();
        history.store(&record_at(now - chrono::Duration::days(10))).unwrap();

        let cache = Arc::new(ContextCache::new(8));
        let stale_at = now - chrono::Duration::hours(3);
        cache.put_at(CacheKey::new(Domain::Market, "onion@Nashik"), ContextBundle::default(), Duration::from_secs(3600), stale_at);
        cache.put_at(CacheKey::new(Domain::Market, "wheat@Punjab"), ContextBundle::default(), Duration::from_secs(3600), now);

        let report = Maintenance::new(cache.clone(), Some(history.clone()), 365).sweep_at(now);

        assert_eq!(
            report,
            SweepReport {
                cache_expired: 1,
                history_pruned: 1,
            }
        );
        assert_eq!(cache.len(), 1);
        assert_eq!(history.count(), 1);
    }

    #[test]
    fn test_zero_retention_keeps_history() {
        let dir = tempfile::tempdir().unwrap();
        let history = AdvisoryHistory::open(dir.path().join("history.db")).unwrap();
        let now = Utc::now();
        history.store(&record_at(now - chrono::Duration::days(4000))).unwrap();

        let report = Maintenance::new(Arc::new(ContextCache::new(8)), Some(history.clone()), 0).sweep_at(now);
        assert_eq!(report.history_pruned, 0);
        assert_eq!(history.count(), 1);
    }

    #[tokio::test]
    async fn test_spawned_task_sweeps_immediately() {
        let cache = Arc::new(ContextCache::new(8));
        let past = Utc::now() - chrono::Duration::hours(3);
        cache.put_at(CacheKey::new(Domain::Disease, "Pune"), ContextBundle::default(), Duration::from_secs(60), past);

        let handle = Maintenance::new(cache.clone(), None, 365).spawn(Duration::from_secs(3600));
        for _ in 0..50 {
            if cache.is_empty() {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        handle.abort();
        assert!(cache.is_empty());
    }
}
