//! Domain types: Domain, PrimaryValue, DomainResult

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

// ============================================================================
// Advisory Domain
// ============================================================================

/// One of the five advisory areas served by the engine
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Domain {
    Disease,
    Soil,
    Irrigation,
    Yield,
    Market,
}

impl Domain {
    pub const ALL: [Domain; 5] = [
        Domain::Disease,
        Domain::Soil,
        Domain::Irrigation,
        Domain::Yield,
        Domain::Market,
    ];

    /// Lowercase identifier used in config keys, cache keys and URLs
    pub fn as_str(&self) -> &'static str {
        match self {
            Domain::Disease => "disease",
            Domain::Soil => "soil",
            Domain::Irrigation => "irrigation",
            Domain::Yield => "yield",
            Domain::Market => "market",
        }
    }
}

impl std::fmt::Display for Domain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Domain {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "disease" => Ok(Domain::Disease),
            "soil" => Ok(Domain::Soil),
            "irrigation" => Ok(Domain::Irrigation),
            "yield" => Ok(Domain::Yield),
            "market" => Ok(Domain::Market),
            other => Err(format!("unknown advisory domain '{other}'")),
        }
    }
}

// ============================================================================
// Domain Result
// ============================================================================

/// Headline value of a domain inference: a class label or a figure
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum PrimaryValue {
    Number(f64),
    Label(String),
}

impl PrimaryValue {
    pub fn as_number(&self) -> Option<f64> {
        match self {
            PrimaryValue::Number(n) if n.is_finite() => Some(*n),
            _ => None,
        }
    }

    pub fn as_label(&self) -> Option<&str> {
        match self {
            PrimaryValue::Label(s) => Some(s.as_str()),
            PrimaryValue::Number(_) => None,
        }
    }
}

impl std::fmt::Display for PrimaryValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PrimaryValue::Number(n) => write!(f, "{n:.2}"),
            PrimaryValue::Label(s) => f.write_str(s),
        }
    }
}

/// Normalized output of one domain's inference step.
///
/// Produced upstream by a model-serving collaborator and consumed only by the
/// aggregator. Never mutated once built.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DomainResult {
    pub domain: Domain,
    /// Disease class, predicted yield (t/ha), forecast price, ...
    pub primary_value: PrimaryValue,
    /// Model confidence, expected in [0, 1]
    pub confidence: f64,
    /// Sensor readings and model side outputs (e.g. `ph`, `soil_moisture_pct`)
    #[serde(default)]
    pub raw_metrics: BTreeMap<String, f64>,
    #[serde(default = "Utc::now")]
    pub produced_at: DateTime<Utc>,
}

impl DomainResult {
    pub fn new(domain: Domain, primary_value: PrimaryValue, confidence: f64) -> Self {
        Self {
            domain,
            primary_value,
            confidence,
            raw_metrics: BTreeMap::new(),
            produced_at: Utc::now(),
        }
    }

    /// Builder-style metric insertion, used when assembling results
    #[must_use]
    pub fn with_metric(mut self, name: &str, value: f64) -> Self {
        self.raw_metrics.insert(name.to_string(), value);
        self
    }

    /// Finite metric value, `None` when absent or NaN/Inf
    pub fn metric(&self, name: &str) -> Option<f64> {
        self.raw_metrics.get(name).copied().filter(|v| v.is_finite())
    }
}
