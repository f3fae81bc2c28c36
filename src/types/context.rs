//! Context types: ContextBundle, WeatherSnapshot, MarketQuote, FieldProfile, HistoricalWindow

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Current conditions plus near-term forecast for an entity's location
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct WeatherSnapshot {
    /// Air temperature (°C)
    pub temperature_c: f64,
    /// Relative humidity (%)
    pub humidity_pct: f64,
    #[serde(default)]
    pub description: String,
    /// Rain expected over the next 24 hours (mm)
    #[serde(default)]
    pub forecast_rain_mm: f64,
    /// Probability of rain over the next 24 hours (0-100)
    #[serde(default)]
    pub rain_probability_pct: Option<f64>,
    #[serde(default = "Utc::now")]
    pub observed_at: DateTime<Utc>,
}

/// Market quote summary for a crop in a region
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MarketQuote {
    #[serde(default)]
    pub crop: String,
    #[serde(default)]
    pub region: String,
    pub current_price: f64,
    #[serde(default)]
    pub avg_30_day: f64,
    #[serde(default)]
    pub min_90_day: f64,
    #[serde(default)]
    pub max_90_day: f64,
    /// Change of current price against the 30-day average (%)
    pub change_30d_pct: f64,
    /// (max - min) / mean over the 90-day window (%)
    pub volatility_pct: f64,
    #[serde(default = "default_currency")]
    pub currency: String,
    #[serde(default = "default_price_unit")]
    pub unit: String,
}

fn default_currency() -> String {
    "INR".to_string()
}

fn default_price_unit() -> String {
    "quintal".to_string()
}

impl MarketQuote {
    /// Build a quote from an ordered price history (oldest first).
    ///
    /// Returns `None` for an empty or non-positive history.
    pub fn from_history(crop: &str, region: &str, prices: &[f64]) -> Option<Self> {
        let current = *prices.last()?;
        if prices.iter().any(|p| !p.is_finite() || *p <= 0.0) {
            return None;
        }
        let window_90 = &prices[prices.len().saturating_sub(90)..];
        let window_30 = &prices[prices.len().saturating_sub(30)..];
        let mean = |w: &[f64]| w.iter().sum::<f64>() / w.len() as f64;

        let avg_30 = mean(window_30);
        let avg_90 = mean(window_90);
        let min_90 = window_90.iter().copied().fold(f64::INFINITY, f64::min);
        let max_90 = window_90.iter().copied().fold(f64::NEG_INFINITY, f64::max);

        Some(Self {
            crop: crop.to_string(),
            region: region.to_string(),
            current_price: current,
            avg_30_day: avg_30,
            min_90_day: min_90,
            max_90_day: max_90,
            change_30d_pct: (current - avg_30) / avg_30 * 100.0,
            volatility_pct: (max_90 - min_90) / avg_90 * 100.0,
            currency: default_currency(),
            unit: default_price_unit(),
        })
    }
}

/// Farmer-declared facts about the field behind an entity key
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct FieldProfile {
    #[serde(default)]
    pub crop: Option<String>,
    /// Explicit growth stage; derived from `days_since_planting` when absent
    #[serde(default)]
    pub crop_stage: Option<String>,
    #[serde(default)]
    pub days_since_planting: Option<u32>,
    #[serde(default)]
    pub field_size_ha: Option<f64>,
    #[serde(default)]
    pub region: Option<String>,
}

impl FieldProfile {
    /// Field-level merge: values already present win
    #[must_use]
    pub fn merged_with(self, other: FieldProfile) -> FieldProfile {
        FieldProfile {
            crop: self.crop.or(other.crop),
            crop_stage: self.crop_stage.or(other.crop_stage),
            days_since_planting: self.days_since_planting.or(other.days_since_planting),
            field_size_ha: self.field_size_ha.or(other.field_size_ha),
            region: self.region.or(other.region),
        }
    }
}

/// Historical aggregates for the entity (sensor series, seasonal baselines)
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct HistoricalWindow {
    /// Mean yield of past seasons for this field (t/ha)
    #[serde(default)]
    pub yield_baseline_t_ha: Option<f64>,
    /// Recent readings per metric, oldest first
    #[serde(default)]
    pub readings: BTreeMap<String, Vec<f64>>,
}

/// Auxiliary, time-sensitive signals needed for risk scoring.
///
/// Every section is optional: context fetchers return partial bundles and
/// the scorer decides which sections a domain actually requires.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ContextBundle {
    #[serde(default)]
    pub weather: Option<WeatherSnapshot>,
    #[serde(default)]
    pub market: Option<MarketQuote>,
    #[serde(default)]
    pub field: Option<FieldProfile>,
    #[serde(default)]
    pub history: Option<HistoricalWindow>,
}

impl ContextBundle {
    pub fn is_empty(&self) -> bool {
        self.weather.is_none() && self.market.is_none() && self.field.is_none() && self.history.is_none()
    }

    /// Section-level merge: sections already present in `self` win, field
    /// profiles are merged field by field.
    #[must_use]
    pub fn merged_with(self, other: ContextBundle) -> ContextBundle {
        let field = match (self.field, other.field) {
            (Some(mine), Some(theirs)) => Some(mine.merged_with(theirs)),
            (mine, theirs) => mine.or(theirs),
        };
        ContextBundle {
            weather: self.weather.or(other.weather),
            market: self.market.or(other.market),
            field,
            history: self.history.or(other.history),
        }
    }

    pub fn crop(&self) -> Option<&str> {
        self.field.as_ref().and_then(|f| f.crop.as_deref())
    }

    pub fn field_size_ha(&self) -> Option<f64> {
        self.field
            .as_ref()
            .and_then(|f| f.field_size_ha)
            .filter(|s| s.is_finite() && *s > 0.0)
    }
}
