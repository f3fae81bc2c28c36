//! Advisory Generator
//!
//! Turns a scored domain result into the final `Advisory`. The generative
//! backend is tried first under a hard per-attempt timeout with at most one
//! fresh retry on a transient failure. Any other outcome (disabled,
//! unreachable, client error, malformed text, retry exhausted) takes the
//! deterministic template path. `generate` therefore never fails.

pub mod templates;

pub use templates::fallback_advisory;

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use chrono::Utc;
use tokio::time::Instant;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::config::GenerativeConfig;
use crate::error::GenerativeError;
use crate::llm::{build_advisory_prompt, parse_generated, GenerativeBackend, ParsedAdvisory};
use crate::types::{Advisory, AdvisorySource, DomainResult, RiskAssessment};

/// Snapshot of generator counters
#[derive(Debug, Clone, Default, Serialize, PartialEq, Eq)]
pub struct GeneratorStats {
    pub generated: u64,
    pub fallbacks: u64,
    pub retries: u64,
    pub timeouts: u64,
    pub malformed: u64,
    pub prompt_chars: u64,
    pub response_chars: u64,
}

#[derive(Default)]
struct Counters {
    generated: AtomicU64,
    fallbacks: AtomicU64,
    retries: AtomicU64,
    timeouts: AtomicU64,
    malformed: AtomicU64,
    prompt_chars: AtomicU64,
    response_chars: AtomicU64,
}

fn bump(counter: &AtomicU64, by: u64) {
    counter.fetch_add(by, Ordering::Relaxed);
}

pub struct AdvisoryGenerator {
    backend: Option<Arc<dyn GenerativeBackend>>,
    config: GenerativeConfig,
    counters: Counters,
}

impl AdvisoryGenerator {
    pub fn new(backend: Option<Arc<dyn GenerativeBackend>>, config: GenerativeConfig) -> Self {
        Self {
            backend,
            config,
            counters: Counters::default(),
        }
    }

    /// Generator that always uses the template path
    pub fn fallback_only() -> Self {
        Self::new(
            None,
            GenerativeConfig {
                enabled: false,
                ..Default::default()
            },
        )
    }

    /// Produce an advisory; falls back to templates on any generative failure
    pub async fn generate(&self, result: &DomainResult, risk: &RiskAssessment) -> Advisory {
        self.generate_inner(result, risk, None).await
    }

    /// Like `generate`, but no attempt runs past `deadline`. An attempt that
    /// would start with no time left is skipped and the template path taken.
    pub async fn generate_before(
        &self,
        result: &DomainResult,
        risk: &RiskAssessment,
        deadline: Instant,
    ) -> Advisory {
        self.generate_inner(result, risk, Some(deadline)).await
    }

    async fn generate_inner(
        &self,
        result: &DomainResult,
        risk: &RiskAssessment,
        deadline: Option<Instant>,
    ) -> Advisory {
        let (summary, recommendations, source) = match self.try_generate(result, risk, deadline).await {
            Ok(parsed) => (parsed.summary, parsed.recommendations, AdvisorySource::Generated),
            Err(e) => {
                bump(&self.counters.fallbacks, 1);
                match e {
                    GenerativeError::Disabled => {
                        debug!(domain = %result.domain, "Generative backend disabled, using fallback");
                    }
                    other => {
                        warn!(domain = %result.domain, error = %other, "Generative advisory failed, using fallback");
                    }
                }
                let (summary, recommendations) = fallback_advisory(result, risk);
                (summary, recommendations, AdvisorySource::Fallback)
            }
        };

        Advisory {
            domain: result.domain,
            summary,
            recommendations,
            source,
            risk: risk.clone(),
            generated_at: Utc::now(),
        }
    }

    async fn try_generate(
        &self,
        result: &DomainResult,
        risk: &RiskAssessment,
        deadline: Option<Instant>,
    ) -> Result<ParsedAdvisory, GenerativeError> {
        let backend = match (&self.backend, self.config.enabled) {
            (Some(backend), true) => backend,
            _ => return Err(GenerativeError::Disabled),
        };

        let prompt = build_advisory_prompt(result, risk);
        let attempts = 1 + self.config.max_retries.min(1);

        let mut attempt = 1;
        loop {
            let start = Instant::now();
            let timeout = match deadline {
                Some(deadline) => self.config.timeout().min(deadline.saturating_duration_since(start)),
                None => self.config.timeout(),
            };
            if timeout.is_zero() {
                debug!(domain = %result.domain, attempt, "No time left before request deadline, skipping generative attempt");
                bump(&self.counters.timeouts, 1);
                return Err(GenerativeError::Timeout(0));
            }

            // Outer timeout guards backends that ignore the deadline they are given
            let outcome = match tokio::time::timeout(timeout, backend.complete(&prompt, timeout)).await {
                Ok(outcome) => outcome,
                Err(_) => Err(GenerativeError::Timeout(timeout.as_millis() as u64)),
            };

            let error = match outcome.and_then(|text| parse_generated(&text).map(|p| (text, p))) {
                Ok((text, parsed)) => {
                    let prompt_chars = prompt.char_count() as u64;
                    let response_chars = text.chars().count() as u64;
                    bump(&self.counters.generated, 1);
                    bump(&self.counters.prompt_chars, prompt_chars);
                    bump(&self.counters.response_chars, response_chars);
                    info!(
                        target: "agri_advisor::usage",
                        backend = backend.backend_name(),
                        model = backend.model(),
                        domain = %result.domain,
                        prompt_chars,
                        response_chars,
                        latency_ms = start.elapsed().as_millis() as u64,
                        attempt,
                        "Generative advisory usage"
                    );
                    return Ok(parsed);
                }
                Err(e) => e,
            };

            match &error {
                GenerativeError::Timeout(_) => bump(&self.counters.timeouts, 1),
                GenerativeError::Malformed(_) => bump(&self.counters.malformed, 1),
                _ => {}
            }

            if error.is_transient() && attempt < attempts {
                bump(&self.counters.retries, 1);
                warn!(domain = %result.domain, attempt, error = %error, "Transient generative failure, retrying");
                attempt += 1;
                continue;
            }
            return Err(error);
        }
    }

    pub fn stats(&self) -> GeneratorStats {
        let c = &self.counters;
        GeneratorStats {
            generated: c.generated.load(Ordering::Relaxed),
            fallbacks: c.fallbacks.load(Ordering::Relaxed),
            retries: c.retries.load(Ordering::Relaxed),
            timeouts: c.timeouts.load(Ordering::Relaxed),
            malformed: c.malformed.load(Ordering::Relaxed),
            prompt_chars: c.prompt_chars.load(Ordering::Relaxed),
            response_chars: c.response_chars.load(Ordering::Relaxed),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RiskConfig;
    use crate::llm::Prompt;
    use crate::risk::RiskScorer;
    use crate::types::{ContextBundle, Domain, PrimaryValue};
    use async_trait::async_trait;
    use std::sync::Mutex;
    use std::time::Duration;

    /// Backend replaying a fixed script of outcomes, one per call
    struct ScriptedBackend {
        script: Mutex<Vec<Result<String, GenerativeError>>>,
        calls: AtomicU64,
        delay: Duration,
    }

    impl ScriptedBackend {
        fn new(script: Vec<Result<String, GenerativeError>>) -> Self {
            Self {
                script: Mutex::new(script),
                calls: AtomicU64::new(0),
                delay: Duration::ZERO,
            }
        }
    }

    #[async_trait]
    impl GenerativeBackend for ScriptedBackend {
        async fn complete(&self, _prompt: &Prompt, _timeout: Duration) -> Result<String, GenerativeError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if !self.delay.is_zero() {
                tokio::time::sleep(self.delay).await;
            }
            let mut script = self.script.lock().unwrap();
            if script.is_empty() {
                Err(GenerativeError::Unreachable("script exhausted".into()))
            } else {
                script.remove(0)
            }
        }

        fn backend_name(&self) -> &'static str {
            "scripted"
        }
    }

    const GOOD: &str = "SUMMARY: Irrigate now.\nRECOMMENDATIONS:\n1. Apply 20 mm today.";

    fn inputs() -> (DomainResult, RiskAssessment) {
        let result = DomainResult::new(Domain::Irrigation, PrimaryValue::Label("check".into()), 0.9)
            .with_metric("soil_moisture_pct", 15.0)
            .with_metric("temperature_c", 33.0);
        let risk = RiskScorer::new(RiskConfig::default())
            .score(&result, &ContextBundle::default())
            .unwrap();
        (result, risk)
    }

    fn generator(backend: Arc<ScriptedBackend>, timeout_ms: u64) -> AdvisoryGenerator {
        AdvisoryGenerator::new(
            Some(backend),
            GenerativeConfig {
                timeout_ms,
                ..Default::default()
            },
        )
    }

    #[tokio::test]
    async fn test_generated_path() {
        let backend = Arc::new(ScriptedBackend::new(vec![Ok(GOOD.to_string())]));
        let gen = generator(backend.clone(), 1_000);
        let (result, risk) = inputs();
        let advisory = gen.generate(&result, &risk).await;
        assert_eq!(advisory.source, AdvisorySource::Generated);
        assert_eq!(advisory.recommendations, vec!["Apply 20 mm today."]);
        assert_eq!(advisory.risk, risk);
        assert_eq!(gen.stats().generated, 1);
    }

    #[tokio::test]
    async fn test_one_retry_on_server_error() {
        let backend = Arc::new(ScriptedBackend::new(vec![
            Err(GenerativeError::ServerError(503)),
            Ok(GOOD.to_string()),
        ]));
        let gen = generator(backend.clone(), 1_000);
        let (result, risk) = inputs();
        let advisory = gen.generate(&result, &risk).await;
        assert_eq!(advisory.source, AdvisorySource::Generated);
        assert_eq!(backend.calls.load(Ordering::SeqCst), 2);
        assert_eq!(gen.stats().retries, 1);
    }

    #[tokio::test]
    async fn test_retry_exhausted_falls_back() {
        let backend = Arc::new(ScriptedBackend::new(vec![
            Err(GenerativeError::ServerError(500)),
            Err(GenerativeError::ServerError(502)),
            Ok(GOOD.to_string()),
        ]));
        let gen = generator(backend.clone(), 1_000);
        let (result, risk) = inputs();
        let advisory = gen.generate(&result, &risk).await;
        assert_eq!(advisory.source, AdvisorySource::Fallback);
        assert!(!advisory.recommendations.is_empty());
        assert_eq!(backend.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_client_error_and_malformed_are_not_retried() {
        for failure in [
            Err(GenerativeError::ClientError(401)),
            Ok("I cannot help with that.".to_string()),
        ] {
            let backend = Arc::new(ScriptedBackend::new(vec![failure, Ok(GOOD.to_string())]));
            let gen = generator(backend.clone(), 1_000);
            let (result, risk) = inputs();
            let advisory = gen.generate(&result, &risk).await;
            assert_eq!(advisory.source, AdvisorySource::Fallback);
            assert_eq!(backend.calls.load(Ordering::SeqCst), 1);
        }
    }

    #[tokio::test]
    async fn test_slow_backend_times_out_into_fallback() {
        let mut slow = ScriptedBackend::new(vec![Ok(GOOD.to_string()), Ok(GOOD.to_string())]);
        slow.delay = Duration::from_millis(500);
        let backend = Arc::new(slow);
        let gen = generator(backend.clone(), 50);
        let (result, risk) = inputs();
        let advisory = gen.generate(&result, &risk).await;
        assert_eq!(advisory.source, AdvisorySource::Fallback);
        assert!(!advisory.recommendations.is_empty());
        let stats = gen.stats();
        assert_eq!(stats.timeouts, 2);
        assert_eq!(stats.retries, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_attempts_are_capped_by_request_deadline() {
        let mut hung = ScriptedBackend::new(vec![Ok(GOOD.to_string()), Ok(GOOD.to_string())]);
        hung.delay = Duration::from_secs(60);
        let backend = Arc::new(hung);
        let gen = generator(backend.clone(), 8_000);
        let (result, risk) = inputs();

        let start = Instant::now();
        let deadline = start + Duration::from_millis(300);
        let advisory = gen.generate_before(&result, &risk, deadline).await;

        assert_eq!(advisory.source, AdvisorySource::Fallback);
        assert!(Instant::now() <= deadline);
        // the retry finds no time left and never reaches the backend
        assert_eq!(backend.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_disabled_config_never_calls_backend() {
        let backend = Arc::new(ScriptedBackend::new(vec![Ok(GOOD.to_string())]));
        let gen = AdvisoryGenerator::new(
            Some(backend.clone()),
            GenerativeConfig {
                enabled: false,
                ..Default::default()
            },
        );
        let (result, risk) = inputs();
        let advisory = gen.generate(&result, &risk).await;
        assert_eq!(advisory.source, AdvisorySource::Fallback);
        assert_eq!(backend.calls.load(Ordering::SeqCst), 0);
    }
}
