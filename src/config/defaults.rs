//! System-wide default constants that are not operator-tunable.
//!
//! Grouped by subsystem for easy discovery.

// ============================================================================
// Scoring
// ============================================================================

/// Below this model confidence a disease diagnosis asks for a new photo.
pub const DISEASE_REIMAGE_CONFIDENCE: f64 = 0.40;

/// Relative humidity bonus applied to the disease signal in humid weather.
pub const DISEASE_HUMIDITY_MULTIPLIER: f64 = 1.10;

/// Results below this confidence must always be flagged, so the configured
/// threshold may be raised but never lowered past it.
pub const MIN_LOW_CONFIDENCE_THRESHOLD: f64 = 0.70;

/// Market trend labels switch from "stable" beyond this 30-day change (%).
pub const MARKET_TREND_LABEL_PCT: f64 = 2.0;

// ============================================================================
// Generative Backend
// ============================================================================

/// Maximum recommendations kept from a generated advisory.
pub const MAX_GENERATED_RECOMMENDATIONS: usize = 6;

/// Share of the request deadline held back from the generative step so the
/// template fallback still completes in time (ms).
pub const GENERATIVE_DEADLINE_RESERVE_MS: u64 = 100;

/// HTTP connect timeout for the generative backend (seconds).
pub const GENERATIVE_CONNECT_TIMEOUT_SECS: u64 = 5;

// ============================================================================
// Context Providers
// ============================================================================

/// OpenWeatherMap forecast steps covering the next 24 hours (3-hour steps).
pub const WEATHER_FORECAST_STEPS_24H: usize = 8;

// ============================================================================
// Advisory History
// ============================================================================

/// Default number of records returned by the history endpoint.
pub const HISTORY_DEFAULT_LIMIT: usize = 20;

/// Upper bound on records returned by one history query.
pub const HISTORY_MAX_LIMIT: usize = 500;
