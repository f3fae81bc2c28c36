//! Disease scorer: affected area weighted by lethality tier
//!
//! Signal = affected area (%) × lethality multiplier, raised by 10% when
//! the current humidity favours spread. A healthy class scores zero.

use super::{required_metric, DomainScorer, DomainSignal};
use crate::config::defaults::{DISEASE_HUMIDITY_MULTIPLIER, DISEASE_REIMAGE_CONFIDENCE};
use crate::config::{BandAnchors, RiskConfig};
use crate::crops::{self, LethalityTier};
use crate::error::AdvisoryError;
use crate::types::{ContextBundle, Domain, DomainResult, Severity, Urgency};

pub struct DiseaseScorer;

impl DomainScorer for DiseaseScorer {
    fn domain(&self) -> Domain {
        Domain::Disease
    }

    fn anchors<'a>(&self, policy: &'a RiskConfig) -> &'a BandAnchors {
        &policy.disease.anchors
    }

    fn assess(
        &self,
        result: &DomainResult,
        context: &ContextBundle,
        policy: &RiskConfig,
    ) -> Result<DomainSignal, AdvisoryError> {
        let cfg = &policy.disease;
        let class = result.primary_value.as_label().ok_or_else(|| {
            AdvisoryError::invalid("disease result primary_value must be a class label")
        })?;

        if crops::is_healthy_class(class) {
            let mut healthy = DomainSignal::new(0.0);
            healthy.indicator("healthy", 1.0);
            healthy.indicator("affected_area_pct", result.metric("affected_area_pct").unwrap_or(0.0));
            return Ok(healthy);
        }

        let area = required_metric(result, "affected_area_pct")?;
        if !(0.0..=100.0).contains(&area) {
            return Err(AdvisoryError::invalid(format!(
                "affected_area_pct {area} outside 0-100"
            )));
        }

        let tier = crops::lethality_tier(class);
        let mut signal = area * tier.multiplier();

        let humidity = context.weather.as_ref().map(|w| w.humidity_pct);
        let humid = humidity.is_some_and(|h| h >= cfg.humidity_alert_pct);
        if humid {
            signal *= DISEASE_HUMIDITY_MULTIPLIER;
        }

        let mut out = DomainSignal::new(signal);

        if area >= cfg.area_alert_pct {
            out.factor(
                area / cfg.area_alert_pct,
                format!(
                    "affected area {:.0}% exceeds {:.0}% alert threshold",
                    area, cfg.area_alert_pct
                ),
            );
        }
        if tier >= LethalityTier::High {
            out.factor(
                tier.multiplier(),
                format!("{} lethality disease class ({class})", tier.as_str()),
            );
        }
        if let (true, Some(h)) = (humid, humidity) {
            out.factor(
                h / cfg.humidity_alert_pct,
                format!("humidity {h:.0}% favours disease spread"),
            );
        }
        if result.confidence < DISEASE_REIMAGE_CONFIDENCE {
            out.indicator("reimage_recommended", 1.0);
        }

        out.indicator("affected_area_pct", area);
        out.indicator("lethality_multiplier", tier.multiplier());
        if let Some(h) = humidity {
            out.indicator("humidity_pct", h);
        }
        if let Some(size) = context.field_size_ha() {
            out.indicator("affected_field_ha", size * area / 100.0);
        }
        Ok(out)
    }

    fn urgency(&self, severity: Severity, signal: &DomainSignal) -> Urgency {
        if signal.indicators.contains_key("healthy") {
            return Urgency::None;
        }
        match severity {
            Severity::Low => Urgency::Low,
            Severity::Medium => Urgency::Medium,
            Severity::High | Severity::Critical => Urgency::High,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::risk::RiskScorer;
    use crate::types::{PrimaryValue, WeatherSnapshot};
    use chrono::Utc;

    fn diseased(label: &str, confidence: f64, area: f64) -> DomainResult {
        DomainResult::new(Domain::Disease, PrimaryValue::Label(label.into()), confidence)
            .with_metric("affected_area_pct", area)
    }

    fn humid_context(humidity: f64) -> ContextBundle {
        ContextBundle {
            weather: Some(WeatherSnapshot {
                temperature_c: 24.0,
                humidity_pct: humidity,
                description: "overcast".into(),
                forecast_rain_mm: 4.0,
                rain_probability_pct: Some(70.0),
                observed_at: Utc::now(),
            }),
            ..Default::default()
        }
    }

    #[test]
    fn test_large_area_is_high_or_critical_with_area_factor() {
        let scorer = RiskScorer::new(RiskConfig::default());
        let risk = scorer
            .score(&diseased("Tomato___Early_blight", 0.94, 45.0), &ContextBundle::default())
            .unwrap();
        assert!(risk.severity >= Severity::High);
        assert!(risk.risk_factors.iter().any(|f| f.contains("affected area")));
        assert!(!risk.has_low_confidence());
    }

    #[test]
    fn test_lethality_and_humidity_raise_severity() {
        let scorer = RiskScorer::new(RiskConfig::default());
        let mild = scorer
            .score(&diseased("Powdery mildew", 0.9, 40.0), &ContextBundle::default())
            .unwrap();
        let severe = scorer
            .score(&diseased("Late blight", 0.9, 40.0), &humid_context(92.0))
            .unwrap();
        assert!(severe.severity > mild.severity);
        assert!(severe.risk_factors.iter().any(|f| f.contains("humidity")));
    }

    #[test]
    fn test_healthy_plant_has_no_urgency() {
        let scorer = RiskScorer::new(RiskConfig::default());
        let result = DomainResult::new(Domain::Disease, PrimaryValue::Label("Tomato___healthy".into()), 0.97);
        let risk = scorer.score(&result, &ContextBundle::default()).unwrap();
        assert_eq!(risk.severity, Severity::Low);
        assert_eq!(risk.urgency, Urgency::None);
        assert!(risk.risk_factors.is_empty());
    }

    #[test]
    fn test_missing_area_is_invalid() {
        let scorer = RiskScorer::new(RiskConfig::default());
        let result = DomainResult::new(Domain::Disease, PrimaryValue::Label("Leaf rust".into()), 0.9);
        let err = scorer.score(&result, &ContextBundle::default()).unwrap_err();
        assert!(err.to_string().contains("affected_area_pct"));
    }

    #[test]
    fn test_very_low_confidence_flags_reimage() {
        let scorer = RiskScorer::new(RiskConfig::default());
        let risk = scorer
            .score(&diseased("Leaf spot", 0.3, 10.0), &ContextBundle::default())
            .unwrap();
        assert_eq!(risk.indicator("reimage_recommended"), Some(1.0));
        assert!(risk.has_low_confidence());
    }
}
