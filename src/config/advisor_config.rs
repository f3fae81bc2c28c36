//! Advisor Configuration - policy values and risk band tables as TOML
//!
//! Every tunable the engine consults lives here. Each struct implements
//! `Default` with the documented policy values, so an absent config file
//! gives the same behavior as the built-in defaults.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{info, warn};

use super::defaults::MIN_LOW_CONFIDENCE_THRESHOLD;
use crate::types::{Domain, Severity};

/// Environment variable naming an explicit config file
pub const CONFIG_ENV_VAR: &str = "AGRI_ADVISOR_CONFIG";

/// Config file looked up in the working directory
pub const LOCAL_CONFIG_FILE: &str = "advisor_config.toml";

// ============================================================================
// Top-Level Config
// ============================================================================

/// Root configuration for an advisor deployment.
///
/// Load with `AdvisorConfig::load()` which searches:
/// 1. `$AGRI_ADVISOR_CONFIG`
/// 2. `./advisor_config.toml`
/// 3. Built-in defaults
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AdvisorConfig {
    /// Generative-language backend policy
    #[serde(default)]
    pub generative: GenerativeConfig,

    /// Context cache sizing and freshness
    #[serde(default)]
    pub cache: CacheConfig,

    /// Per-request deadlines
    #[serde(default)]
    pub request: RequestConfig,

    /// Weather provider
    #[serde(default)]
    pub weather: WeatherConfig,

    /// Market price-history provider
    #[serde(default)]
    pub market: MarketConfig,

    /// Risk band tables and alert thresholds
    #[serde(default)]
    pub risk: RiskConfig,

    /// Advisory history storage
    #[serde(default)]
    pub storage: StorageConfig,

    /// HTTP server configuration
    #[serde(default)]
    pub server: ServerConfig,
}

impl AdvisorConfig {
    /// Load configuration using the standard search order:
    /// 1. `$AGRI_ADVISOR_CONFIG` environment variable
    /// 2. `./advisor_config.toml` in the current working directory
    /// 3. Built-in defaults
    pub fn load() -> Self {
        if let Ok(path) = std::env::var(CONFIG_ENV_VAR) {
            let p = PathBuf::from(&path);
            if p.exists() {
                match Self::load_from_file(&p) {
                    Ok(config) => {
                        info!(path = %p.display(), "Loaded advisor config from {}", CONFIG_ENV_VAR);
                        return config;
                    }
                    Err(e) => {
                        warn!(path = %p.display(), error = %e, "Failed to load config from {}, falling back", CONFIG_ENV_VAR);
                    }
                }
            } else {
                warn!(path = %path, "{} points to non-existent file, falling back", CONFIG_ENV_VAR);
            }
        }

        let local = PathBuf::from(LOCAL_CONFIG_FILE);
        if local.exists() {
            match Self::load_from_file(&local) {
                Ok(config) => {
                    info!("Loaded advisor config from ./{}", LOCAL_CONFIG_FILE);
                    return config;
                }
                Err(e) => {
                    warn!(error = %e, "Failed to load ./{}, using defaults", LOCAL_CONFIG_FILE);
                }
            }
        }

        info!("No {} found, using built-in defaults", LOCAL_CONFIG_FILE);
        Self::default()
    }

    /// Load from a specific TOML file path.
    pub fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::Io(path.to_path_buf(), e))?;
        Self::from_toml_str(&contents).map_err(|e| match e {
            ConfigError::Parse(_, err) => ConfigError::Parse(path.to_path_buf(), err),
            other => other,
        })
    }

    /// Parse and validate a TOML document. Unknown keys only warn.
    pub fn from_toml_str(contents: &str) -> Result<Self, ConfigError> {
        for w in super::validation::validate_unknown_keys(contents) {
            warn!("{}", w);
        }

        let config: Self =
            toml::from_str(contents).map_err(|e| ConfigError::Parse(PathBuf::new(), e))?;
        config.validate()?;
        Ok(config)
    }

    /// Serialize the current config to a TOML string.
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        toml::to_string_pretty(self).map_err(ConfigError::Serialize)
    }

    /// Validate all policy values for internal consistency.
    ///
    /// Rules:
    /// - Band anchors must be finite and strictly ascending
    /// - Timeouts, TTLs and cache capacity must be > 0
    /// - At most one generative retry
    /// - Context fetch plus every generative attempt fits in the request deadline
    /// - Confidence threshold in [0.7, 1]
    pub fn validate(&self) -> Result<(), ConfigError> {
        let mut errors: Vec<String> = Vec::new();

        let g = &self.generative;
        if g.timeout_ms == 0 {
            errors.push("generative.timeout_ms must be > 0".to_string());
        }
        if g.max_retries > 1 {
            errors.push(format!(
                "generative.max_retries ({}) must be 0 or 1",
                g.max_retries
            ));
        }
        if !(0.0..=2.0).contains(&g.temperature) {
            errors.push(format!(
                "generative.temperature ({:.2}) must be within 0-2",
                g.temperature
            ));
        }

        if self.cache.max_entries == 0 {
            errors.push("cache.max_entries must be > 0".to_string());
        }
        for domain in Domain::ALL {
            if self.cache.ttl_secs.for_domain(domain) == 0 {
                errors.push(format!("cache.ttl_secs.{domain} must be > 0"));
            }
        }
        if self.cache.sweep_interval_secs == 0 {
            errors.push("cache.sweep_interval_secs must be > 0".to_string());
        }

        if self.request.deadline_ms == 0 {
            errors.push("request.deadline_ms must be > 0".to_string());
        }
        if self.request.context_fetch_timeout_ms == 0 {
            errors.push("request.context_fetch_timeout_ms must be > 0".to_string());
        }
        if self.request.context_fetch_timeout_ms >= self.request.deadline_ms {
            errors.push(format!(
                "request.context_fetch_timeout_ms ({}) must be less than request.deadline_ms ({})",
                self.request.context_fetch_timeout_ms, self.request.deadline_ms
            ));
        }

        if g.enabled {
            let worst_case = self.request.context_fetch_timeout_ms
                + g.timeout_ms * (1 + u64::from(g.max_retries.min(1)));
            if worst_case >= self.request.deadline_ms {
                errors.push(format!(
                    "request.deadline_ms ({}) must exceed context_fetch_timeout_ms + generative attempts ({worst_case})",
                    self.request.deadline_ms
                ));
            }
        }

        if let Some(url) = self.market.base_url.as_deref() {
            if !(url.starts_with("http://") || url.starts_with("https://")) {
                errors.push(format!("market.base_url ({url}) must be an http(s) URL"));
            }
        }
        if self.market.history_days == 0 {
            errors.push("market.history_days must be > 0".to_string());
        }

        let r = &self.risk;
        if !(MIN_LOW_CONFIDENCE_THRESHOLD..=1.0).contains(&r.low_confidence_threshold) {
            errors.push(format!(
                "risk.low_confidence_threshold ({}) must be within [{MIN_LOW_CONFIDENCE_THRESHOLD}, 1]",
                r.low_confidence_threshold
            ));
        }
        r.disease.anchors.check("risk.disease.anchors", &mut errors);
        r.soil.anchors.check("risk.soil.anchors", &mut errors);
        r.irrigation.anchors.check("risk.irrigation.anchors", &mut errors);
        r.yield_forecast.anchors.check("risk.yield.anchors", &mut errors);
        r.market.anchors.check("risk.market.anchors", &mut errors);

        let (range_errors, range_warnings) = super::validation::validate_policy_ranges(self);
        errors.extend(range_errors);
        for w in &range_warnings {
            warn!("{}", w);
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(ConfigError::Validation(errors))
        }
    }
}

// ============================================================================
// Error Type
// ============================================================================

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Config I/O error ({}): {1}", .0.display())]
    Io(PathBuf, std::io::Error),
    #[error("Config parse error ({}): {1}", .0.display())]
    Parse(PathBuf, toml::de::Error),
    #[error("Config serialization error: {0}")]
    Serialize(toml::ser::Error),
    #[error("Config validation failed:\n  - {}", .0.join("\n  - "))]
    Validation(Vec<String>),
}

// ============================================================================
// Generative Backend
// ============================================================================

/// Generative-language backend policy.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerativeConfig {
    /// Master switch; when false every advisory takes the fallback path
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Per-attempt timeout (ms)
    #[serde(default = "default_generative_timeout_ms")]
    pub timeout_ms: u64,

    /// Fresh retries on timeout / 5xx (0 or 1)
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    /// OpenAI-compatible chat-completions endpoint
    #[serde(default = "default_generative_endpoint")]
    pub endpoint: String,

    #[serde(default = "default_generative_model")]
    pub model: String,

    /// Environment variable holding the API key
    #[serde(default = "default_generative_key_env")]
    pub api_key_env: String,

    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,

    #[serde(default = "default_temperature")]
    pub temperature: f64,
}

fn default_true() -> bool { true }
fn default_generative_timeout_ms() -> u64 { 8_000 }
fn default_max_retries() -> u32 { 1 }
fn default_generative_endpoint() -> String {
    "https://api.groq.com/openai/v1/chat/completions".to_string()
}
fn default_generative_model() -> String { "llama-3.3-70b-versatile".to_string() }
fn default_generative_key_env() -> String { "GROQ_API_KEY".to_string() }
fn default_max_tokens() -> u32 { 600 }
fn default_temperature() -> f64 { 0.3 }

impl GenerativeConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

impl Default for GenerativeConfig {
    fn default() -> Self {
        Self {
            enabled: default_true(),
            timeout_ms: default_generative_timeout_ms(),
            max_retries: default_max_retries(),
            endpoint: default_generative_endpoint(),
            model: default_generative_model(),
            api_key_env: default_generative_key_env(),
            max_tokens: default_max_tokens(),
            temperature: default_temperature(),
        }
    }
}

// ============================================================================
// Cache
// ============================================================================

/// Context cache capacity and per-domain freshness.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    /// LRU capacity across all entity keys
    #[serde(default = "default_cache_max_entries")]
    pub max_entries: usize,

    /// Time-to-live per domain (seconds)
    #[serde(default)]
    pub ttl_secs: DomainTtlConfig,

    /// How often `serve` drops expired entries (seconds)
    #[serde(default = "default_sweep_interval_secs")]
    pub sweep_interval_secs: u64,
}

fn default_cache_max_entries() -> usize { 1_024 }
fn default_sweep_interval_secs() -> u64 { 5 * 60 }

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            max_entries: default_cache_max_entries(),
            ttl_secs: DomainTtlConfig::default(),
            sweep_interval_secs: default_sweep_interval_secs(),
        }
    }
}

impl CacheConfig {
    pub fn ttl_for(&self, domain: Domain) -> Duration {
        Duration::from_secs(self.ttl_secs.for_domain(domain))
    }
}

/// TTL in seconds for each domain's context.
///
/// Weather-driven domains default to 30 minutes, market quotes to 60 minutes,
/// historical sensor aggregates to 24 hours.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DomainTtlConfig {
    #[serde(default = "default_weather_ttl")]
    pub disease: u64,
    #[serde(default = "default_history_ttl")]
    pub soil: u64,
    #[serde(default = "default_weather_ttl")]
    pub irrigation: u64,
    #[serde(rename = "yield", default = "default_history_ttl")]
    pub yield_forecast: u64,
    #[serde(default = "default_market_ttl")]
    pub market: u64,
}

fn default_weather_ttl() -> u64 { 30 * 60 }
fn default_market_ttl() -> u64 { 60 * 60 }
fn default_history_ttl() -> u64 { 24 * 60 * 60 }

impl DomainTtlConfig {
    pub fn for_domain(&self, domain: Domain) -> u64 {
        match domain {
            Domain::Disease => self.disease,
            Domain::Soil => self.soil,
            Domain::Irrigation => self.irrigation,
            Domain::Yield => self.yield_forecast,
            Domain::Market => self.market,
        }
    }
}

impl Default for DomainTtlConfig {
    fn default() -> Self {
        Self {
            disease: default_weather_ttl(),
            soil: default_history_ttl(),
            irrigation: default_weather_ttl(),
            yield_forecast: default_history_ttl(),
            market: default_market_ttl(),
        }
    }
}

// ============================================================================
// Request Deadlines
// ============================================================================

/// Deadlines applied to each advisory request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RequestConfig {
    /// Whole-request deadline (ms); exceeding it abandons in-flight calls
    #[serde(default = "default_deadline_ms")]
    pub deadline_ms: u64,

    /// Deadline for one context-fetch call (ms)
    #[serde(default = "default_context_fetch_timeout_ms")]
    pub context_fetch_timeout_ms: u64,
}

fn default_deadline_ms() -> u64 { 25_000 }
fn default_context_fetch_timeout_ms() -> u64 { 5_000 }

impl RequestConfig {
    pub fn deadline(&self) -> Duration {
        Duration::from_millis(self.deadline_ms)
    }

    pub fn context_fetch_timeout(&self) -> Duration {
        Duration::from_millis(self.context_fetch_timeout_ms)
    }
}

impl Default for RequestConfig {
    fn default() -> Self {
        Self {
            deadline_ms: default_deadline_ms(),
            context_fetch_timeout_ms: default_context_fetch_timeout_ms(),
        }
    }
}

// ============================================================================
// Weather Provider
// ============================================================================

/// OpenWeatherMap-compatible provider settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WeatherConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,

    #[serde(default = "default_weather_base_url")]
    pub base_url: String,

    /// Environment variable holding the API key
    #[serde(default = "default_weather_key_env")]
    pub api_key_env: String,
}

fn default_weather_base_url() -> String {
    "https://api.openweathermap.org/data/2.5".to_string()
}
fn default_weather_key_env() -> String { "WEATHER_API_KEY".to_string() }

impl Default for WeatherConfig {
    fn default() -> Self {
        Self {
            enabled: default_true(),
            base_url: default_weather_base_url(),
            api_key_env: default_weather_key_env(),
        }
    }
}

// ============================================================================
// Market Provider
// ============================================================================

/// Price-history service settings. The provider is off until `base_url` is set.
///
/// The service answers `GET {base_url}/prices?crop=..&region=..&days=..`
/// with `{"prices": [{"date": "YYYY-MM-DD", "price": 2150.0}, ...]}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MarketConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,

    /// Environment variable holding an optional bearer token
    #[serde(default = "default_market_key_env")]
    pub api_key_env: String,

    /// Days of price history requested per quote
    #[serde(default = "default_market_history_days")]
    pub history_days: u32,
}

fn default_market_key_env() -> String { "MARKET_API_KEY".to_string() }
fn default_market_history_days() -> u32 { 90 }

impl Default for MarketConfig {
    fn default() -> Self {
        Self {
            enabled: default_true(),
            base_url: None,
            api_key_env: default_market_key_env(),
            history_days: default_market_history_days(),
        }
    }
}

// ============================================================================
// Risk Policy Tables
// ============================================================================

/// Representative risk-signal value for each severity band.
///
/// A signal is classified into the band whose anchor is nearest; exact ties
/// go to the higher band.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct BandAnchors {
    pub low: f64,
    pub medium: f64,
    pub high: f64,
    pub critical: f64,
}

impl BandAnchors {
    pub const fn new(low: f64, medium: f64, high: f64, critical: f64) -> Self {
        Self { low, medium, high, critical }
    }

    pub fn anchor(&self, severity: Severity) -> f64 {
        match severity {
            Severity::Low => self.low,
            Severity::Medium => self.medium,
            Severity::High => self.high,
            Severity::Critical => self.critical,
        }
    }

    fn check(&self, name: &str, errors: &mut Vec<String>) {
        let values = [self.low, self.medium, self.high, self.critical];
        if values.iter().any(|v| !v.is_finite()) {
            errors.push(format!("{name}: anchors must be finite numbers"));
            return;
        }
        if !values.windows(2).all(|w| w[0] < w[1]) {
            errors.push(format!(
                "{name}: anchors must be strictly ascending (got low={}, medium={}, high={}, critical={})",
                self.low, self.medium, self.high, self.critical
            ));
        }
    }
}

/// Risk scoring policy for all domains.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RiskConfig {
    /// Results below this confidence always carry a low-confidence risk factor
    #[serde(default = "default_low_confidence")]
    pub low_confidence_threshold: f64,

    #[serde(default)]
    pub disease: DiseaseRiskConfig,
    #[serde(default)]
    pub soil: SoilRiskConfig,
    #[serde(default)]
    pub irrigation: IrrigationRiskConfig,
    #[serde(rename = "yield", default)]
    pub yield_forecast: YieldRiskConfig,
    #[serde(default)]
    pub market: MarketRiskConfig,
}

fn default_low_confidence() -> f64 { 0.7 }

impl Default for RiskConfig {
    fn default() -> Self {
        Self {
            low_confidence_threshold: default_low_confidence(),
            disease: DiseaseRiskConfig::default(),
            soil: SoilRiskConfig::default(),
            irrigation: IrrigationRiskConfig::default(),
            yield_forecast: YieldRiskConfig::default(),
            market: MarketRiskConfig::default(),
        }
    }
}

/// Disease: signal is affected area (%) weighted by lethality tier.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiseaseRiskConfig {
    #[serde(default = "default_disease_anchors")]
    pub anchors: BandAnchors,
    /// Affected area (%) at which an area risk factor is raised
    #[serde(default = "default_area_alert_pct")]
    pub area_alert_pct: f64,
    /// Relative humidity (%) treated as favouring spread
    #[serde(default = "default_humidity_alert_pct")]
    pub humidity_alert_pct: f64,
}

fn default_disease_anchors() -> BandAnchors { BandAnchors::new(5.0, 20.0, 40.0, 65.0) }
fn default_area_alert_pct() -> f64 { 15.0 }
fn default_humidity_alert_pct() -> f64 { 85.0 }

impl Default for DiseaseRiskConfig {
    fn default() -> Self {
        Self {
            anchors: default_disease_anchors(),
            area_alert_pct: default_area_alert_pct(),
            humidity_alert_pct: default_humidity_alert_pct(),
        }
    }
}

/// Soil: signal is the weighted deficiency/excess (%) across N-P-K and pH.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SoilRiskConfig {
    #[serde(default = "default_soil_anchors")]
    pub anchors: BandAnchors,
    #[serde(default = "default_weight_n")]
    pub nitrogen_weight: f64,
    #[serde(default = "default_weight_pk")]
    pub phosphorus_weight: f64,
    #[serde(default = "default_weight_pk")]
    pub potassium_weight: f64,
    #[serde(default = "default_weight_ph")]
    pub ph_weight: f64,
    /// Relative deviation (%) of a single nutrient that raises a risk factor
    #[serde(default = "default_nutrient_alert_pct")]
    pub nutrient_alert_pct: f64,
}

fn default_soil_anchors() -> BandAnchors { BandAnchors::new(0.0, 15.0, 35.0, 60.0) }
fn default_weight_n() -> f64 { 0.35 }
fn default_weight_pk() -> f64 { 0.25 }
fn default_weight_ph() -> f64 { 0.15 }
fn default_nutrient_alert_pct() -> f64 { 10.0 }

impl Default for SoilRiskConfig {
    fn default() -> Self {
        Self {
            anchors: default_soil_anchors(),
            nitrogen_weight: default_weight_n(),
            phosphorus_weight: default_weight_pk(),
            potassium_weight: default_weight_pk(),
            ph_weight: default_weight_ph(),
            nutrient_alert_pct: default_nutrient_alert_pct(),
        }
    }
}

/// Irrigation: signal is moisture deficit points adjusted for heat and rain.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IrrigationRiskConfig {
    #[serde(default = "default_irrigation_anchors")]
    pub anchors: BandAnchors,
    /// Volumetric soil moisture (%) below which the crop needs water
    #[serde(default = "default_moisture_threshold")]
    pub moisture_threshold_pct: f64,
    /// Air temperature (°C) above which heat adds to the deficit
    #[serde(default = "default_heat_threshold")]
    pub heat_threshold_c: f64,
    #[serde(default = "default_heat_points")]
    pub heat_points_per_degree: f64,
    /// Deficit points removed per mm of forecast rain
    #[serde(default = "default_rain_credit")]
    pub rain_credit_per_mm: f64,
    /// Irrigation depth (mm) needed to restore one moisture point
    #[serde(default = "default_mm_per_point")]
    pub mm_per_moisture_point: f64,
}

fn default_irrigation_anchors() -> BandAnchors { BandAnchors::new(0.0, 6.0, 14.0, 24.0) }
fn default_moisture_threshold() -> f64 { 30.0 }
fn default_heat_threshold() -> f64 { 30.0 }
fn default_heat_points() -> f64 { 1.5 }
fn default_rain_credit() -> f64 { 0.5 }
fn default_mm_per_point() -> f64 { 1.5 }

impl Default for IrrigationRiskConfig {
    fn default() -> Self {
        Self {
            anchors: default_irrigation_anchors(),
            moisture_threshold_pct: default_moisture_threshold(),
            heat_threshold_c: default_heat_threshold(),
            heat_points_per_degree: default_heat_points(),
            rain_credit_per_mm: default_rain_credit(),
            mm_per_moisture_point: default_mm_per_point(),
        }
    }
}

/// Yield: signal is the shortfall (%) against the historical baseline.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct YieldRiskConfig {
    #[serde(default = "default_yield_anchors")]
    pub anchors: BandAnchors,
    #[serde(default = "default_shortfall_alert")]
    pub shortfall_alert_pct: f64,
}

fn default_yield_anchors() -> BandAnchors { BandAnchors::new(0.0, 10.0, 25.0, 40.0) }
fn default_shortfall_alert() -> f64 { 10.0 }

impl Default for YieldRiskConfig {
    fn default() -> Self {
        Self {
            anchors: default_yield_anchors(),
            shortfall_alert_pct: default_shortfall_alert(),
        }
    }
}

/// Market: signal combines price volatility and trend magnitude.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MarketRiskConfig {
    #[serde(default = "default_market_anchors")]
    pub anchors: BandAnchors,
    #[serde(default = "default_volatility_alert")]
    pub volatility_alert_pct: f64,
    #[serde(default = "default_trend_alert")]
    pub trend_alert_pct: f64,
    #[serde(default = "default_volatility_weight")]
    pub volatility_weight: f64,
    #[serde(default = "default_trend_weight")]
    pub trend_weight: f64,
}

fn default_market_anchors() -> BandAnchors { BandAnchors::new(0.0, 8.0, 16.0, 28.0) }
fn default_volatility_alert() -> f64 { 15.0 }
fn default_trend_alert() -> f64 { 5.0 }
fn default_volatility_weight() -> f64 { 0.5 }
fn default_trend_weight() -> f64 { 1.0 }

impl Default for MarketRiskConfig {
    fn default() -> Self {
        Self {
            anchors: default_market_anchors(),
            volatility_alert_pct: default_volatility_alert(),
            trend_alert_pct: default_trend_alert(),
            volatility_weight: default_volatility_weight(),
            trend_weight: default_trend_weight(),
        }
    }
}

// ============================================================================
// Storage Config
// ============================================================================

/// Advisory history storage.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Persist advisories to the embedded history database
    #[serde(default = "default_true")]
    pub enabled: bool,

    #[serde(default = "default_history_path")]
    pub path: String,

    /// Records older than this many days are pruned (0 keeps everything)
    #[serde(default = "default_retention_days")]
    pub retention_days: u32,
}

fn default_history_path() -> String { "./data/advisory_history.db".to_string() }
fn default_retention_days() -> u32 { 365 }

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            enabled: default_true(),
            path: default_history_path(),
            retention_days: default_retention_days(),
        }
    }
}

// ============================================================================
// Server Config
// ============================================================================

/// HTTP server configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// HTTP server bind address.
    ///
    /// Can be overridden by the `--addr` CLI flag.
    #[serde(default = "default_server_addr")]
    pub addr: String,
}

fn default_server_addr() -> String {
    "0.0.0.0:8080".to_string()
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            addr: default_server_addr(),
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
