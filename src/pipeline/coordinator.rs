//! Aggregator - sequences context resolution, risk scoring and advisory
//! generation for one request
//!
//! ```text
//! START            validate domain result and entity key
//! CONTEXT_RESOLVED cache hit, or fetch + populate cache (failure => degraded)
//! RISK_SCORED      deterministic scoring; InvalidInput is fatal
//! ADVISORY_READY   generative path or template fallback; never fails
//! ```
//!
//! The whole sequence runs under the request deadline. When it elapses the
//! in-flight future is dropped and the caller gets `AdvisoryError::Timeout`.
//! Generative attempts are capped at the time left before the deadline (less
//! a small reserve), so a slow backend ends in the template fallback instead.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use super::state::{RequestStage, RequestTrace};
use crate::advisory::{AdvisoryGenerator, GeneratorStats};
use crate::cache::{CacheKey, CacheStats, ContextCache};
use crate::config::defaults::GENERATIVE_DEADLINE_RESERVE_MS;
use crate::config::{AdvisorConfig, CacheConfig, RequestConfig};
use crate::error::{AdvisoryError, ContextFetchError};
use crate::llm::{ChatCompletionsBackend, GenerativeBackend};
use crate::providers::{self, ContextFetcher};
use crate::risk::{validate_result, RiskScorer};
use crate::storage::{AdvisoryRecord, PersistenceSink};
use crate::types::{Advisory, ContextBundle, Domain, DomainResult, CONTEXT_DEGRADED_FACTOR};

#[derive(Default)]
struct Counters {
    requests: AtomicU64,
    succeeded: AtomicU64,
    invalid_input: AtomicU64,
    timeouts: AtomicU64,
    degraded_context: AtomicU64,
    persist_failures: AtomicU64,
}

/// Aggregator statistics, including its collaborators
#[derive(Debug, Clone, Serialize)]
pub struct AggregatorStats {
    pub requests: u64,
    pub succeeded: u64,
    pub invalid_input: u64,
    pub timeouts: u64,
    pub degraded_context: u64,
    pub persist_failures: u64,
    pub cache: CacheStats,
    pub generator: GeneratorStats,
}

/// Advisory orchestrator. Shared across requests; holds no per-request state.
pub struct Aggregator {
    scorer: RiskScorer,
    generator: AdvisoryGenerator,
    cache: Arc<ContextCache>,
    fetcher: Arc<dyn ContextFetcher>,
    sink: Option<Arc<dyn PersistenceSink>>,
    cache_config: CacheConfig,
    request: RequestConfig,
    counters: Arc<Counters>,
}

impl Aggregator {
    /// Assemble from explicit collaborators
    pub fn new(config: &AdvisorConfig, generator: AdvisoryGenerator, fetcher: Arc<dyn ContextFetcher>) -> Self {
        Self {
            scorer: RiskScorer::new(config.risk.clone()),
            generator,
            cache: Arc::new(ContextCache::new(config.cache.max_entries)),
            fetcher,
            sink: None,
            cache_config: config.cache.clone(),
            request: config.request.clone(),
            counters: Arc::new(Counters::default()),
        }
    }

    /// Production wiring: HTTP generative backend and weather provider when
    /// their API keys are present. Persistence is attached with `with_sink`.
    pub fn from_config(config: &AdvisorConfig) -> Self {
        let backend = ChatCompletionsBackend::from_config(&config.generative)
            .map(|b| Arc::new(b) as Arc<dyn GenerativeBackend>);
        let generator = AdvisoryGenerator::new(backend, config.generative.clone());
        Self::new(config, generator, providers::build_fetcher(config))
    }

    #[must_use]
    pub fn with_sink(mut self, sink: Arc<dyn PersistenceSink>) -> Self {
        self.sink = Some(sink);
        self
    }

    pub fn cache(&self) -> &Arc<ContextCache> {
        &self.cache
    }

    pub fn generator(&self) -> &AdvisoryGenerator {
        &self.generator
    }

    /// Produce an advisory for one domain result
    pub async fn advise(
        &self,
        domain: Domain,
        result: DomainResult,
        entity_key: &str,
    ) -> Result<Advisory, AdvisoryError> {
        self.advise_with_hints(domain, result, entity_key, ContextBundle::default())
            .await
    }

    /// Like `advise`, with caller-supplied context (field profile, market
    /// quote, history). Hint sections take precedence over fetched ones.
    pub async fn advise_with_hints(
        &self,
        domain: Domain,
        result: DomainResult,
        entity_key: &str,
        hints: ContextBundle,
    ) -> Result<Advisory, AdvisoryError> {
        self.counters.requests.fetch_add(1, Ordering::Relaxed);
        let deadline = self.request.deadline();
        let generate_by = Instant::now()
            + deadline.saturating_sub(Duration::from_millis(GENERATIVE_DEADLINE_RESERVE_MS));

        match tokio::time::timeout(deadline, self.run(domain, result, entity_key, hints, generate_by)).await {
            Ok(Ok(advisory)) => {
                self.counters.succeeded.fetch_add(1, Ordering::Relaxed);
                Ok(advisory)
            }
            Ok(Err(e)) => {
                self.counters.invalid_input.fetch_add(1, Ordering::Relaxed);
                Err(e)
            }
            Err(_) => {
                self.counters.timeouts.fetch_add(1, Ordering::Relaxed);
                warn!(
                    %domain,
                    entity_key,
                    deadline_ms = self.request.deadline_ms,
                    "Advisory request deadline exceeded, abandoning in-flight work"
                );
                Err(AdvisoryError::Timeout {
                    deadline_ms: self.request.deadline_ms,
                })
            }
        }
    }

    async fn run(
        &self,
        domain: Domain,
        result: DomainResult,
        entity_key: &str,
        hints: ContextBundle,
        generate_by: Instant,
    ) -> Result<Advisory, AdvisoryError> {
        let mut trace = RequestTrace::new(domain, entity_key);

        // START
        if result.domain != domain {
            return Err(trace.fail(AdvisoryError::invalid(format!(
                "domain result is for {} but {} was requested",
                result.domain, domain
            ))));
        }
        if entity_key.trim().is_empty() {
            return Err(trace.fail(AdvisoryError::invalid("entity key must not be empty")));
        }
        validate_result(&result).map_err(|e| trace.fail(e))?;

        // CONTEXT_RESOLVED
        let (fetched, degraded) = self.resolve_context(domain, entity_key).await;
        let context = hints.merged_with(fetched);
        trace.advance(RequestStage::ContextResolved);

        // RISK_SCORED
        let mut risk = self.scorer.score(&result, &context).map_err(|e| trace.fail(e))?;
        if let Some(reason) = degraded {
            self.counters.degraded_context.fetch_add(1, Ordering::Relaxed);
            risk.risk_factors.push(format!("{CONTEXT_DEGRADED_FACTOR}: {reason}"));
        }
        trace.advance(RequestStage::RiskScored);

        // ADVISORY_READY
        let advisory = self.generator.generate_before(&result, &risk, generate_by).await;
        trace.advance(RequestStage::AdvisoryReady);

        info!(
            %domain,
            entity_key,
            severity = %advisory.risk.severity,
            urgency = %advisory.risk.urgency,
            source = %advisory.source,
            recommendations = advisory.recommendations.len(),
            elapsed_ms = trace.elapsed_ms(),
            "Advisory ready"
        );

        self.persist(entity_key, result, &advisory);
        Ok(advisory)
    }

    /// Cache hit, or fetch and populate. A failed fetch yields an empty
    /// bundle plus the reason, and is not cached.
    async fn resolve_context(&self, domain: Domain, entity_key: &str) -> (ContextBundle, Option<String>) {
        let key = CacheKey::new(domain, entity_key);
        if let Some(bundle) = self.cache.get(&key) {
            debug!(%domain, entity_key, "Context cache hit");
            return (bundle, None);
        }

        let timeout = self.request.context_fetch_timeout();
        let fetched = match tokio::time::timeout(timeout, self.fetcher.fetch(domain, entity_key)).await {
            Ok(outcome) => outcome,
            Err(_) => Err(ContextFetchError::Timeout(self.request.context_fetch_timeout_ms)),
        };

        match fetched {
            Ok(bundle) => {
                let ttl = self.cache_config.ttl_for(domain);
                debug!(%domain, entity_key, fetcher = self.fetcher.name(), ttl_secs = ttl.as_secs(), "Context fetched and cached");
                self.cache.put(key, bundle.clone(), ttl);
                (bundle, None)
            }
            Err(e) => {
                warn!(%domain, entity_key, fetcher = self.fetcher.name(), error = %e, "Context fetch failed, continuing with degraded context");
                (ContextBundle::default(), Some(e.to_string()))
            }
        }
    }

    /// Fire-and-forget history write on the blocking pool
    fn persist(&self, entity_key: &str, result: DomainResult, advisory: &Advisory) {
        let Some(sink) = self.sink.clone() else {
            return;
        };
        let record = AdvisoryRecord::new(entity_key, result, advisory.clone());
        let counters = Arc::clone(&self.counters);
        tokio::task::spawn_blocking(move || {
            let id = record.id;
            if let Err(e) = sink.record(record) {
                counters.persist_failures.fetch_add(1, Ordering::Relaxed);
                warn!(%id, sink = sink.name(), error = %e, "Failed to persist advisory");
            }
        });
    }

    pub fn stats(&self) -> AggregatorStats {
        let c = &self.counters;
        AggregatorStats {
            requests: c.requests.load(Ordering::Relaxed),
            succeeded: c.succeeded.load(Ordering::Relaxed),
            invalid_input: c.invalid_input.load(Ordering::Relaxed),
            timeouts: c.timeouts.load(Ordering::Relaxed),
            degraded_context: c.degraded_context.load(Ordering::Relaxed),
            persist_failures: c.persist_failures.load(Ordering::Relaxed),
            cache: self.cache.stats(),
            generator: self.generator.stats(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::providers::NoopFetcher;
    use crate::types::{AdvisorySource, PrimaryValue, Severity};
    use async_trait::async_trait;

    struct CountingFetcher {
        calls: AtomicU64,
    }

    #[async_trait]
    impl ContextFetcher for CountingFetcher {
        async fn fetch(&self, _domain: Domain, _entity_key: &str) -> Result<ContextBundle, ContextFetchError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(ContextBundle::default())
        }

        fn name(&self) -> &'static str {
            "counting"
        }
    }

    fn soil_result() -> DomainResult {
        DomainResult::new(Domain::Soil, PrimaryValue::Label("loam".into()), 0.9)
            .with_metric("nitrogen", 300.0)
            .with_metric("phosphorus", 80.0)
            .with_metric("potassium", 300.0)
            .with_metric("ph", 6.5)
    }

    fn aggregator(fetcher: Arc<dyn ContextFetcher>) -> Aggregator {
        Aggregator::new(&AdvisorConfig::default(), AdvisoryGenerator::fallback_only(), fetcher)
    }

    #[tokio::test]
    async fn test_domain_mismatch_is_invalid_input() {
        let agg = aggregator(Arc::new(NoopFetcher));
        let err = agg.advise(Domain::Irrigation, soil_result(), "f1").await.unwrap_err();
        assert!(matches!(err, AdvisoryError::InvalidInput(_)));
        assert_eq!(agg.stats().invalid_input, 1);
    }

    #[tokio::test]
    async fn test_empty_entity_key_is_invalid_input() {
        let agg = aggregator(Arc::new(NoopFetcher));
        assert!(agg.advise(Domain::Soil, soil_result(), "  ").await.is_err());
    }

    #[tokio::test]
    async fn test_second_request_uses_cache() {
        let fetcher = Arc::new(CountingFetcher { calls: AtomicU64::new(0) });
        let agg = aggregator(fetcher.clone());

        let first = agg.advise(Domain::Soil, soil_result(), "f1").await.unwrap();
        let second = agg.advise(Domain::Soil, soil_result(), "f1").await.unwrap();
        assert_eq!(fetcher.calls.load(Ordering::SeqCst), 1);
        assert_eq!(first.risk, second.risk);
        assert_eq!(first.source, AdvisorySource::Fallback);
        assert_eq!(first.risk.severity, Severity::Low);
        assert_eq!(agg.stats().cache.hits, 1);
    }
}
