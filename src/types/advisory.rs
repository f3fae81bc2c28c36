//! Advisory output types: AdvisorySource, Advisory

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{Domain, RiskAssessment};

/// Which generation path produced the advisory text
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum AdvisorySource {
    /// Text produced by the generative-language backend
    Generated,
    /// Text produced by the deterministic rule table
    Fallback,
}

impl std::fmt::Display for AdvisorySource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AdvisorySource::Generated => write!(f, "generated"),
            AdvisorySource::Fallback => write!(f, "fallback"),
        }
    }
}

/// Terminal artifact of one advisory request.
///
/// Combines the risk assessment with a natural-language recommendation.
/// Not mutated after creation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Advisory {
    pub domain: Domain,
    pub summary: String,
    /// Ordered, actionable recommendations (never empty)
    pub recommendations: Vec<String>,
    pub source: AdvisorySource,
    pub risk: RiskAssessment,
    pub generated_at: DateTime<Utc>,
}
