//! Risk types: Severity, Urgency, RiskAssessment

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Prefix of the risk factor appended when model confidence is low
pub const LOW_CONFIDENCE_FACTOR: &str = "confidence below";

/// Prefix of the risk factor appended when context could not be fetched
pub const CONTEXT_DEGRADED_FACTOR: &str = "context_degraded";

/// Qualitative severity of a domain result
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Low = 0,
    Medium = 1,
    High = 2,
    Critical = 3,
}

impl Severity {
    pub const ALL: [Severity; 4] = [
        Severity::Low,
        Severity::Medium,
        Severity::High,
        Severity::Critical,
    ];

    pub fn rank(self) -> usize {
        self as usize
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Low => "low",
            Severity::Medium => "medium",
            Severity::High => "high",
            Severity::Critical => "critical",
        }
    }
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Severity::Low => write!(f, "LOW"),
            Severity::Medium => write!(f, "MEDIUM"),
            Severity::High => write!(f, "HIGH"),
            Severity::Critical => write!(f, "CRITICAL"),
        }
    }
}

/// How soon the farmer should act
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Urgency {
    None = 0,
    Low = 1,
    Medium = 2,
    High = 3,
}

impl Urgency {
    /// One step more urgent, saturating at `High`
    #[must_use]
    pub fn escalate(self) -> Self {
        match self {
            Urgency::None => Urgency::Low,
            Urgency::Low => Urgency::Medium,
            Urgency::Medium | Urgency::High => Urgency::High,
        }
    }
}

impl std::fmt::Display for Urgency {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Urgency::None => write!(f, "NONE"),
            Urgency::Low => write!(f, "LOW"),
            Urgency::Medium => write!(f, "MEDIUM"),
            Urgency::High => write!(f, "HIGH"),
        }
    }
}

/// Deterministic risk classification of one domain result.
///
/// Always embedded in an `Advisory`; never stored on its own.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RiskAssessment {
    pub severity: Severity,
    pub urgency: Urgency,
    /// Most significant contributor first
    pub risk_factors: Vec<String>,
    /// Position of the risk signal on the band scale, 0.0 (low) to 1.0 (critical)
    pub score: f64,
    /// Closed-form quantities derived while scoring (deficits, water volumes,
    /// price changes); the fallback rule table fills its placeholders from these
    #[serde(default)]
    pub indicators: BTreeMap<String, f64>,
}

impl RiskAssessment {
    pub fn indicator(&self, name: &str) -> Option<f64> {
        self.indicators.get(name).copied()
    }

    pub fn has_low_confidence(&self) -> bool {
        self.risk_factors
            .iter()
            .any(|f| f.starts_with(LOW_CONFIDENCE_FACTOR))
    }

    pub fn is_context_degraded(&self) -> bool {
        self.risk_factors
            .iter()
            .any(|f| f.starts_with(CONTEXT_DEGRADED_FACTOR))
    }
}
