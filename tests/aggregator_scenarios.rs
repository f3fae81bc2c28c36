//! Aggregator Scenario Tests
//!
//! End-to-end advisory requests through `Aggregator` with in-test fakes for
//! the generative backend, the context fetcher and the persistence sink.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;

use agri_advisor::advisory::AdvisoryGenerator;
use agri_advisor::config::{AdvisorConfig, GenerativeConfig};
use agri_advisor::error::{AdvisoryError, ContextFetchError, GenerativeError, PersistenceError};
use agri_advisor::llm::{GenerativeBackend, Prompt};
use agri_advisor::pipeline::Aggregator;
use agri_advisor::providers::{ContextFetcher, NoopFetcher};
use agri_advisor::storage::{AdvisoryRecord, PersistenceSink};
use agri_advisor::types::{
    AdvisorySource, ContextBundle, Domain, DomainResult, FieldProfile, MarketQuote, PrimaryValue,
    Severity, Urgency, WeatherSnapshot, CONTEXT_DEGRADED_FACTOR,
};

// ============================================================================
// Fakes
// ============================================================================

struct FailingBackend {
    error: GenerativeError,
    calls: AtomicUsize,
}

#[async_trait]
impl GenerativeBackend for FailingBackend {
    async fn complete(&self, _prompt: &Prompt, _timeout: Duration) -> Result<String, GenerativeError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Err(self.error.clone())
    }

    fn backend_name(&self) -> &'static str {
        "failing"
    }
}

struct FixedBackend(&'static str);

#[async_trait]
impl GenerativeBackend for FixedBackend {
    async fn complete(&self, _prompt: &Prompt, _timeout: Duration) -> Result<String, GenerativeError> {
        Ok(self.0.to_string())
    }

    fn backend_name(&self) -> &'static str {
        "fixed"
    }
}

struct SlowBackend(Duration);

#[async_trait]
impl GenerativeBackend for SlowBackend {
    async fn complete(&self, _prompt: &Prompt, _timeout: Duration) -> Result<String, GenerativeError> {
        tokio::time::sleep(self.0).await;
        Ok("SUMMARY: late\nRECOMMENDATIONS:\n- too late".to_string())
    }

    fn backend_name(&self) -> &'static str {
        "slow"
    }
}

struct FailingFetcher;

#[async_trait]
impl ContextFetcher for FailingFetcher {
    async fn fetch(&self, _domain: Domain, _entity_key: &str) -> Result<ContextBundle, ContextFetchError> {
        Err(ContextFetchError::Unavailable("weather service down".into()))
    }

    fn name(&self) -> &'static str {
        "failing"
    }
}

/// Answers with weather after a delay, or never when the delay is `None`
struct DelayedFetcher {
    delay: Option<Duration>,
    weather: WeatherSnapshot,
}

#[async_trait]
impl ContextFetcher for DelayedFetcher {
    async fn fetch(&self, _domain: Domain, _entity_key: &str) -> Result<ContextBundle, ContextFetchError> {
        match self.delay {
            Some(delay) => tokio::time::sleep(delay).await,
            None => std::future::pending::<()>().await,
        }
        Ok(ContextBundle {
            weather: Some(self.weather.clone()),
            ..Default::default()
        })
    }

    fn name(&self) -> &'static str {
        "delayed"
    }
}

struct WeatherFetcher(WeatherSnapshot);

#[async_trait]
impl ContextFetcher for WeatherFetcher {
    async fn fetch(&self, _domain: Domain, _entity_key: &str) -> Result<ContextBundle, ContextFetchError> {
        Ok(ContextBundle {
            weather: Some(self.0.clone()),
            ..Default::default()
        })
    }

    fn name(&self) -> &'static str {
        "weather"
    }
}

#[derive(Default)]
struct RecordingSink {
    records: Mutex<Vec<AdvisoryRecord>>,
}

impl PersistenceSink for RecordingSink {
    fn record(&self, record: AdvisoryRecord) -> Result<(), PersistenceError> {
        self.records.lock().unwrap().push(record);
        Ok(())
    }

    fn name(&self) -> &'static str {
        "recording"
    }
}

struct BrokenSink;

impl PersistenceSink for BrokenSink {
    fn record(&self, _record: AdvisoryRecord) -> Result<(), PersistenceError> {
        Err(PersistenceError::Unavailable("disk full".into()))
    }

    fn name(&self) -> &'static str {
        "broken"
    }
}

// ============================================================================
// Helpers
// ============================================================================

fn generator(backend: Arc<dyn GenerativeBackend>, timeout_ms: u64) -> AdvisoryGenerator {
    AdvisoryGenerator::new(
        Some(backend),
        GenerativeConfig {
            timeout_ms,
            ..Default::default()
        },
    )
}

fn fallback_aggregator(fetcher: Arc<dyn ContextFetcher>) -> Aggregator {
    Aggregator::new(&AdvisorConfig::default(), AdvisoryGenerator::fallback_only(), fetcher)
}

fn hot_dry_weather() -> WeatherSnapshot {
    WeatherSnapshot {
        temperature_c: 35.0,
        humidity_pct: 30.0,
        description: "Clear sky".into(),
        forecast_rain_mm: 0.0,
        rain_probability_pct: Some(0.0),
        observed_at: chrono::Utc::now(),
    }
}

fn irrigation_result() -> DomainResult {
    DomainResult::new(Domain::Irrigation, PrimaryValue::Label("check".into()), 0.88)
        .with_metric("soil_moisture_pct", 18.0)
}

// ============================================================================
// Scenarios
// ============================================================================

#[tokio::test]
async fn soil_within_range_is_low_with_no_adjustment() {
    let agg = fallback_aggregator(Arc::new(NoopFetcher));
    let result = DomainResult::new(Domain::Soil, PrimaryValue::Label("loam".into()), 0.92)
        .with_metric("nitrogen", 320.0)
        .with_metric("phosphorus", 75.0)
        .with_metric("potassium", 310.0)
        .with_metric("ph", 6.5);

    let advisory = agg.advise(Domain::Soil, result, "farmer1:north@Pune").await.unwrap();
    assert_eq!(advisory.risk.severity, Severity::Low);
    assert!(advisory.risk.risk_factors.is_empty(), "{:?}", advisory.risk.risk_factors);
    assert_eq!(advisory.source, AdvisorySource::Fallback);
    assert!(advisory.recommendations[0].contains("No fertilizer adjustment needed"));
}

#[tokio::test]
async fn disease_with_large_area_is_high_or_critical() {
    let agg = fallback_aggregator(Arc::new(NoopFetcher));
    let result = DomainResult::new(
        Domain::Disease,
        PrimaryValue::Label("Tomato___Late_blight".into()),
        0.94,
    )
    .with_metric("affected_area_pct", 45.0);

    let advisory = agg.advise(Domain::Disease, result, "Nashik").await.unwrap();
    assert!(advisory.risk.severity >= Severity::High);
    assert!(advisory
        .risk
        .risk_factors
        .iter()
        .any(|f| f.contains("affected area")));
    assert!(!advisory.recommendations.is_empty());
}

#[tokio::test]
async fn dry_hot_field_needs_urgent_irrigation() {
    let agg = fallback_aggregator(Arc::new(WeatherFetcher(hot_dry_weather())));
    let advisory = agg
        .advise(Domain::Irrigation, irrigation_result(), "Pune")
        .await
        .unwrap();

    assert_eq!(advisory.risk.urgency, Urgency::High);
    assert!(advisory.risk.indicator("irrigation_mm").unwrap() > 0.0);
    assert!(advisory
        .recommendations
        .iter()
        .any(|r| r.contains("mm of water")));
}

#[tokio::test]
async fn weather_failure_degrades_but_succeeds_with_generated_text() {
    let backend = Arc::new(FixedBackend(
        "SUMMARY: Soil is dry.\nRECOMMENDATIONS:\n1. Irrigate 25 mm this evening.",
    ));
    let agg = Aggregator::new(
        &AdvisorConfig::default(),
        generator(backend, 1_000),
        Arc::new(FailingFetcher),
    );
    let result = irrigation_result().with_metric("temperature_c", 35.0);

    let advisory = agg.advise(Domain::Irrigation, result, "Pune").await.unwrap();
    assert!(advisory.risk.is_context_degraded());
    assert!(advisory
        .risk
        .risk_factors
        .last()
        .unwrap()
        .starts_with(CONTEXT_DEGRADED_FACTOR));
    assert_eq!(advisory.source, AdvisorySource::Generated);
    assert_eq!(agg.stats().degraded_context, 1);
}

#[tokio::test]
async fn failed_fetch_is_not_cached() {
    let agg = fallback_aggregator(Arc::new(FailingFetcher));
    let result = irrigation_result().with_metric("temperature_c", 28.0);
    agg.advise(Domain::Irrigation, result.clone(), "Pune").await.unwrap();
    let second = agg.advise(Domain::Irrigation, result, "Pune").await.unwrap();
    assert!(second.risk.is_context_degraded());
    assert!(agg.cache().is_empty());
}

#[tokio::test]
async fn generative_timeout_falls_back_with_recommendations() {
    let backend = Arc::new(FailingBackend {
        error: GenerativeError::Timeout(8000),
        calls: AtomicUsize::new(0),
    });
    let agg = Aggregator::new(
        &AdvisorConfig::default(),
        generator(backend.clone(), 1_000),
        Arc::new(WeatherFetcher(hot_dry_weather())),
    );

    let advisory = agg
        .advise(Domain::Irrigation, irrigation_result(), "Pune")
        .await
        .unwrap();
    assert_eq!(advisory.source, AdvisorySource::Fallback);
    assert!(!advisory.recommendations.is_empty());
    // one attempt plus one retry
    assert_eq!(backend.calls.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn invalid_confidence_short_circuits_before_generation() {
    let backend = Arc::new(FailingBackend {
        error: GenerativeError::ServerError(500),
        calls: AtomicUsize::new(0),
    });
    let agg = Aggregator::new(
        &AdvisorConfig::default(),
        generator(backend.clone(), 1_000),
        Arc::new(NoopFetcher),
    );
    let result = DomainResult::new(Domain::Soil, PrimaryValue::Label("loam".into()), 1.4);

    let err = agg.advise(Domain::Soil, result, "f1").await.unwrap_err();
    assert!(matches!(err, AdvisoryError::InvalidInput(_)));
    assert_eq!(backend.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn missing_required_metric_is_invalid_input() {
    let agg = fallback_aggregator(Arc::new(NoopFetcher));
    let result = DomainResult::new(Domain::Soil, PrimaryValue::Label("loam".into()), 0.9)
        .with_metric("nitrogen", 300.0);
    let err = agg.advise(Domain::Soil, result, "f1").await.unwrap_err();
    assert!(err.to_string().contains("phosphorus"), "{err}");
}

#[tokio::test(start_paused = true)]
async fn request_deadline_abandons_hung_context_fetch() {
    let mut config = AdvisorConfig::default();
    config.request.deadline_ms = 100;
    let agg = Aggregator::new(
        &config,
        AdvisoryGenerator::fallback_only(),
        Arc::new(DelayedFetcher {
            delay: None,
            weather: hot_dry_weather(),
        }),
    );

    let err = agg
        .advise(Domain::Irrigation, irrigation_result(), "Pune")
        .await
        .unwrap_err();
    assert_eq!(err, AdvisoryError::Timeout { deadline_ms: 100 });
    assert_eq!(agg.stats().timeouts, 1);
}

#[tokio::test(start_paused = true)]
async fn slow_fetch_and_hung_backend_fall_back_within_default_deadline() {
    let config = AdvisorConfig::default();
    assert!(config.validate().is_ok());
    let agg = Aggregator::new(
        &config,
        generator(Arc::new(SlowBackend(Duration::from_secs(600))), config.generative.timeout_ms),
        Arc::new(DelayedFetcher {
            delay: Some(Duration::from_millis(4_500)),
            weather: hot_dry_weather(),
        }),
    );

    let advisory = agg
        .advise(Domain::Irrigation, irrigation_result(), "Pune")
        .await
        .unwrap();
    assert_eq!(advisory.source, AdvisorySource::Fallback);
    assert!(!advisory.risk.is_context_degraded());
    assert_eq!(agg.stats().generator.timeouts, 2);
}

#[tokio::test(start_paused = true)]
async fn tight_deadline_caps_generation_into_fallback() {
    let mut config = AdvisorConfig::default();
    config.request.deadline_ms = 1_000;
    config.request.context_fetch_timeout_ms = 500;
    let agg = Aggregator::new(
        &config,
        generator(Arc::new(SlowBackend(Duration::from_secs(600))), 8_000),
        Arc::new(DelayedFetcher {
            delay: Some(Duration::from_millis(400)),
            weather: hot_dry_weather(),
        }),
    );

    let advisory = agg
        .advise(Domain::Irrigation, irrigation_result(), "Pune")
        .await
        .unwrap();
    assert_eq!(advisory.source, AdvisorySource::Fallback);
    assert!(!advisory.recommendations.is_empty());
    assert_eq!(agg.stats().timeouts, 0);
}

#[tokio::test(start_paused = true)]
async fn hung_context_fetch_times_out_into_degraded_advisory() {
    let mut config = AdvisorConfig::default();
    config.request.context_fetch_timeout_ms = 200;
    let agg = Aggregator::new(
        &config,
        AdvisoryGenerator::fallback_only(),
        Arc::new(DelayedFetcher {
            delay: None,
            weather: hot_dry_weather(),
        }),
    );
    let result = irrigation_result().with_metric("temperature_c", 28.0);

    let advisory = agg.advise(Domain::Irrigation, result, "Pune").await.unwrap();
    let degraded = advisory
        .risk
        .risk_factors
        .iter()
        .find(|f| f.starts_with(CONTEXT_DEGRADED_FACTOR))
        .expect("degraded factor");
    assert!(degraded.contains("timed out after 200 ms"), "{degraded}");
    assert_eq!(advisory.source, AdvisorySource::Fallback);
    assert!(agg.cache().is_empty());
    assert_eq!(agg.stats().degraded_context, 1);
}

#[tokio::test]
async fn low_confidence_always_flagged() {
    let agg = fallback_aggregator(Arc::new(NoopFetcher));
    for confidence in [0.0, 0.3, 0.69] {
        let result = DomainResult::new(Domain::Disease, PrimaryValue::Label("Corn_rust".into()), confidence)
            .with_metric("affected_area_pct", 10.0);
        let advisory = agg.advise(Domain::Disease, result, "f1").await.unwrap();
        assert!(advisory.risk.has_low_confidence(), "confidence {confidence}");
    }
}

#[tokio::test]
async fn market_hints_drive_bearish_advice() {
    let agg = fallback_aggregator(Arc::new(NoopFetcher));
    let mut prices = vec![2500.0; 60];
    prices.extend((0..30).map(|i| 2500.0 - f64::from(i) * 25.0));
    let quote = MarketQuote::from_history("wheat", "Punjab", &prices).unwrap();
    let hints = ContextBundle {
        market: Some(quote),
        field: Some(FieldProfile {
            crop: Some("wheat".into()),
            ..Default::default()
        }),
        ..Default::default()
    };
    let result = DomainResult::new(Domain::Market, PrimaryValue::Number(1800.0), 0.8);

    let advisory = agg
        .advise_with_hints(Domain::Market, result, "Punjab", hints)
        .await
        .unwrap();
    assert!(advisory.risk.indicator("trend_direction").unwrap() < 0.0);
    assert!(advisory.summary.to_lowercase().contains("bearish"));
}

#[tokio::test]
async fn fetched_price_history_drives_market_advisory() {
    use axum::routing::get;
    use axum::{Json, Router};

    let prices: Vec<serde_json::Value> = (0..90)
        .map(|i| {
            let date = chrono::NaiveDate::from_ymd_opt(2024, 1, 1).unwrap() + chrono::Days::new(i);
            let price = if i < 60 { 2500.0 } else { 2500.0 - (i - 59) as f64 * 25.0 };
            serde_json::json!({ "date": date.to_string(), "price": price })
        })
        .collect();
    let body = Json(serde_json::json!({ "prices": prices }));
    let app = Router::new().route("/prices", get(move || std::future::ready(body.clone())));
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let base_url = format!("http://{}", listener.local_addr().unwrap());
    tokio::spawn(async move { axum::serve(listener, app).await.unwrap() });

    let mut config = AdvisorConfig::default();
    config.weather.enabled = false;
    config.market.base_url = Some(base_url);
    let agg = Aggregator::new(
        &config,
        AdvisoryGenerator::fallback_only(),
        agri_advisor::providers::build_fetcher(&config),
    );
    let result = DomainResult::new(Domain::Market, PrimaryValue::Number(1750.0), 0.8);

    let advisory = agg
        .advise(Domain::Market, result.clone(), "farmer3:wheat@Punjab")
        .await
        .unwrap();
    assert!(!advisory.risk.is_context_degraded());
    assert!(advisory.risk.indicator("trend_direction").unwrap() < 0.0);
    assert!(advisory.summary.to_lowercase().contains("bearish"));

    // the quote is cached under the market TTL
    agg.advise(Domain::Market, result, "farmer3:wheat@Punjab").await.unwrap();
    assert_eq!(agg.stats().cache.hits, 1);
}

#[tokio::test]
async fn completed_advisory_is_persisted() {
    let sink = Arc::new(RecordingSink::default());
    let agg = fallback_aggregator(Arc::new(NoopFetcher)).with_sink(sink.clone());
    let result = DomainResult::new(Domain::Yield, PrimaryValue::Number(3.0), 0.85).with_metric("baseline_yield_t_ha", 4.0);

    let advisory = agg.advise(Domain::Yield, result, "farm-7").await.unwrap();

    // persistence is fire-and-forget; give the blocking pool a moment
    for _ in 0..50 {
        if !sink.records.lock().unwrap().is_empty() {
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    let records = sink.records.lock().unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].entity_key, "farm-7");
    assert_eq!(records[0].advisory, advisory);
}

#[tokio::test]
async fn persistence_failure_never_fails_the_request() {
    let agg = fallback_aggregator(Arc::new(NoopFetcher)).with_sink(Arc::new(BrokenSink));
    let result = DomainResult::new(Domain::Yield, PrimaryValue::Number(3.0), 0.85).with_metric("baseline_yield_t_ha", 4.0);
    assert!(agg.advise(Domain::Yield, result, "farm-7").await.is_ok());
}

#[tokio::test]
async fn concurrent_requests_for_same_key_succeed() {
    let agg = Arc::new(fallback_aggregator(Arc::new(WeatherFetcher(hot_dry_weather()))));
    let mut handles = Vec::new();
    for _ in 0..16 {
        let agg = Arc::clone(&agg);
        handles.push(tokio::spawn(async move {
            agg.advise(Domain::Irrigation, irrigation_result(), "Pune").await
        }));
    }
    let mut severities = Vec::new();
    for handle in handles {
        severities.push(handle.await.unwrap().unwrap().risk.severity);
    }
    assert!(severities.iter().all(|s| *s == severities[0]));
    assert_eq!(agg.cache().len(), 1);
}
