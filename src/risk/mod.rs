//! Risk Scorer
//!
//! Maps a `DomainResult` plus its `ContextBundle` to a `RiskAssessment`.
//! Scoring is pure: no I/O, no clock, no shared state, so identical inputs
//! always give identical assessments.
//!
//! Each domain has a `DomainScorer` that reduces its inputs to one scalar
//! risk signal in the domain's natural unit. The signal is then classified
//! against the domain's band anchors from `RiskConfig`.
//!
//! ## Scorers
//!
//! 1. **Disease** - affected area weighted by lethality tier and humidity
//! 2. **Soil** - weighted N-P-K deviation plus pH distance from optimal
//! 3. **Irrigation** - moisture deficit adjusted for heat and forecast rain
//! 4. **Yield** - shortfall against the historical baseline
//! 5. **Market** - price volatility and trend magnitude

pub mod bands;
pub mod disease;
pub mod irrigation;
pub mod market;
pub mod soil;
pub mod yield_forecast;

pub use disease::DiseaseScorer;
pub use irrigation::IrrigationScorer;
pub use market::MarketScorer;
pub use soil::SoilScorer;
pub use yield_forecast::YieldScorer;

use std::collections::BTreeMap;

use crate::config::{BandAnchors, RiskConfig};
use crate::error::AdvisoryError;
use crate::types::{
    ContextBundle, Domain, DomainResult, PrimaryValue, RiskAssessment, Severity, Urgency,
    LOW_CONFIDENCE_FACTOR,
};

/// One contributor to a domain's risk, ranked by significance
#[derive(Debug, Clone, PartialEq)]
pub struct RiskFactor {
    pub significance: f64,
    pub text: String,
}

/// Intermediate output of a domain scorer
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DomainSignal {
    /// Risk signal in the domain's natural unit
    pub signal: f64,
    pub factors: Vec<RiskFactor>,
    pub indicators: BTreeMap<String, f64>,
}

impl DomainSignal {
    pub fn new(signal: f64) -> Self {
        Self {
            signal,
            ..Default::default()
        }
    }

    pub fn factor(&mut self, significance: f64, text: impl Into<String>) {
        self.factors.push(RiskFactor {
            significance,
            text: text.into(),
        });
    }

    pub fn indicator(&mut self, name: &str, value: f64) {
        if value.is_finite() {
            self.indicators.insert(name.to_string(), value);
        }
    }
}

/// Per-domain scoring policy
pub trait DomainScorer: Send + Sync {
    fn domain(&self) -> Domain;

    /// Band anchors this domain classifies against
    fn anchors<'a>(&self, policy: &'a RiskConfig) -> &'a BandAnchors;

    /// Reduce the result and context to a risk signal, factors and indicators
    fn assess(
        &self,
        result: &DomainResult,
        context: &ContextBundle,
        policy: &RiskConfig,
    ) -> Result<DomainSignal, AdvisoryError>;

    fn urgency(&self, severity: Severity, _signal: &DomainSignal) -> Urgency {
        default_urgency(severity)
    }
}

/// Urgency lags severity by one step
pub fn default_urgency(severity: Severity) -> Urgency {
    match severity {
        Severity::Low => Urgency::None,
        Severity::Medium => Urgency::Low,
        Severity::High => Urgency::Medium,
        Severity::Critical => Urgency::High,
    }
}

/// Create the default set of five domain scorers
pub fn default_scorers() -> Vec<Box<dyn DomainScorer>> {
    vec![
        Box::new(DiseaseScorer),
        Box::new(SoilScorer),
        Box::new(IrrigationScorer),
        Box::new(YieldScorer),
        Box::new(MarketScorer),
    ]
}

/// Shape checks every domain result must pass before scoring
pub fn validate_result(result: &DomainResult) -> Result<(), AdvisoryError> {
    if !result.confidence.is_finite() || !(0.0..=1.0).contains(&result.confidence) {
        return Err(AdvisoryError::invalid(format!(
            "confidence {} outside [0, 1]",
            result.confidence
        )));
    }
    if let PrimaryValue::Number(n) = result.primary_value {
        if !n.is_finite() {
            return Err(AdvisoryError::invalid("primary_value is not a finite number"));
        }
    }
    if let PrimaryValue::Label(ref label) = result.primary_value {
        if label.trim().is_empty() {
            return Err(AdvisoryError::invalid("primary_value label is empty"));
        }
    }
    if let Some((name, _)) = result.raw_metrics.iter().find(|(_, v)| !v.is_finite()) {
        return Err(AdvisoryError::invalid(format!(
            "raw metric '{name}' is not a finite number"
        )));
    }
    Ok(())
}

/// Metric the domain cannot be scored without
pub(crate) fn required_metric(result: &DomainResult, name: &str) -> Result<f64, AdvisoryError> {
    result.metric(name).ok_or_else(|| {
        AdvisoryError::invalid(format!(
            "{} result is missing required metric '{name}'",
            result.domain
        ))
    })
}

/// Deterministic risk scorer holding the band policy and domain scorers
pub struct RiskScorer {
    policy: RiskConfig,
    scorers: Vec<Box<dyn DomainScorer>>,
}

impl RiskScorer {
    pub fn new(policy: RiskConfig) -> Self {
        Self::with_scorers(policy, default_scorers())
    }

    pub fn with_scorers(policy: RiskConfig, scorers: Vec<Box<dyn DomainScorer>>) -> Self {
        Self { policy, scorers }
    }

    pub fn policy(&self) -> &RiskConfig {
        &self.policy
    }

    /// Score one domain result.
    ///
    /// Fails with `InvalidInput` on a malformed result or when context the
    /// domain requires is absent.
    pub fn score(
        &self,
        result: &DomainResult,
        context: &ContextBundle,
    ) -> Result<RiskAssessment, AdvisoryError> {
        validate_result(result)?;

        let scorer = self
            .scorers
            .iter()
            .find(|s| s.domain() == result.domain)
            .ok_or_else(|| {
                AdvisoryError::invalid(format!("no risk scorer for domain {}", result.domain))
            })?;

        let mut assessed = scorer.assess(result, context, &self.policy)?;
        if !assessed.signal.is_finite() {
            return Err(AdvisoryError::invalid(format!(
                "{} inputs produced a non-finite risk signal",
                result.domain
            )));
        }

        let anchors = scorer.anchors(&self.policy);
        let severity = bands::classify(assessed.signal, anchors);
        let score = bands::normalized_score(assessed.signal, anchors);
        let urgency = scorer.urgency(severity, &assessed);

        // Stable sort keeps insertion order among equally significant factors
        assessed
            .factors
            .sort_by(|a, b| b.significance.total_cmp(&a.significance));
        let mut risk_factors: Vec<String> =
            assessed.factors.into_iter().map(|f| f.text).collect();

        if result.confidence < self.policy.low_confidence_threshold {
            risk_factors.push(format!(
                "{} {:.0}% (model confidence {:.0}%)",
                LOW_CONFIDENCE_FACTOR,
                self.policy.low_confidence_threshold * 100.0,
                result.confidence * 100.0
            ));
        }

        let mut indicators = assessed.indicators;
        indicators.insert("risk_signal".to_string(), assessed.signal);
        indicators.insert("model_confidence".to_string(), result.confidence);

        Ok(RiskAssessment {
            severity,
            urgency,
            risk_factors,
            score,
            indicators,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{FieldProfile, WeatherSnapshot};
    use chrono::Utc;

    fn scorer() -> RiskScorer {
        RiskScorer::new(RiskConfig::default())
    }

    fn soil_result(confidence: f64) -> DomainResult {
        DomainResult::new(Domain::Soil, PrimaryValue::Label("loam".into()), confidence)
            .with_metric("nitrogen", 320.0)
            .with_metric("phosphorus", 75.0)
            .with_metric("potassium", 300.0)
            .with_metric("ph", 6.5)
    }

    #[test]
    fn test_score_is_deterministic() {
        let result = soil_result(0.9);
        let context = ContextBundle::default();
        let a = scorer().score(&result, &context).unwrap();
        let b = scorer().score(&result, &context).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_confidence_outside_unit_interval_is_invalid() {
        for bad in [-0.1, 1.5, f64::NAN] {
            let err = scorer()
                .score(&soil_result(bad), &ContextBundle::default())
                .unwrap_err();
            assert!(matches!(err, AdvisoryError::InvalidInput(_)));
        }
    }

    #[test]
    fn test_low_confidence_always_appended_last() {
        let result = DomainResult::new(
            Domain::Irrigation,
            PrimaryValue::Label("irrigate".into()),
            0.55,
        )
        .with_metric("soil_moisture_pct", 10.0);
        let context = ContextBundle {
            weather: Some(WeatherSnapshot {
                temperature_c: 36.0,
                humidity_pct: 30.0,
                description: "clear sky".into(),
                forecast_rain_mm: 0.0,
                rain_probability_pct: None,
                observed_at: Utc::now(),
            }),
            ..Default::default()
        };
        let risk = scorer().score(&result, &context).unwrap();
        assert!(risk.has_low_confidence());
        assert!(risk
            .risk_factors
            .last()
            .unwrap()
            .starts_with(LOW_CONFIDENCE_FACTOR));
        assert!(risk.risk_factors[0].contains("soil moisture"));
    }

    #[test]
    fn test_confidence_at_threshold_is_not_low() {
        let risk = scorer()
            .score(&soil_result(0.7), &ContextBundle::default())
            .unwrap();
        assert!(!risk.has_low_confidence());
    }

    #[test]
    fn test_in_range_soil_has_no_factors() {
        let context = ContextBundle {
            field: Some(FieldProfile {
                crop: Some("tomato".into()),
                ..Default::default()
            }),
            ..Default::default()
        };
        let risk = scorer().score(&soil_result(0.95), &context).unwrap();
        assert_eq!(risk.severity, Severity::Low);
        assert_eq!(risk.urgency, Urgency::None);
        assert!(risk.risk_factors.is_empty());
        assert_eq!(risk.score, 0.0);
    }

    #[test]
    fn test_non_finite_metric_rejected() {
        let result = soil_result(0.9).with_metric("ph", f64::INFINITY);
        assert!(validate_result(&result).is_err());
    }
}
