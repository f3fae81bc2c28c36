//! Yield scorer: predicted yield against the historical baseline
//!
//! Signal = shortfall (%) of the predicted yield below the baseline. The
//! baseline comes from the field's history, else from the crop registry.
//! Inputs outside the model's reliable range are reported as data-quality
//! risk factors.

use super::{DomainScorer, DomainSignal};
use crate::config::{BandAnchors, RiskConfig};
use crate::crops;
use crate::error::AdvisoryError;
use crate::types::{ContextBundle, Domain, DomainResult};

/// Input ranges the yield model was calibrated on: (metric, label, min, max, unit)
const RELIABLE_RANGES: [(&str, &str, f64, f64, &str); 3] = [
    ("soil_quality", "soil quality", 60.0, 90.0, ""),
    ("rainfall_mm", "rainfall", 400.0, 800.0, " mm"),
    ("fertilizer_kg_ha", "fertilizer", 100.0, 200.0, " kg/ha"),
];

/// Significance given to each out-of-range model input
const DATA_QUALITY_SIGNIFICANCE: f64 = 0.5;

pub struct YieldScorer;

impl YieldScorer {
    fn baseline(result: &DomainResult, context: &ContextBundle) -> Option<f64> {
        context
            .history
            .as_ref()
            .and_then(|h| h.yield_baseline_t_ha)
            .or_else(|| result.metric("baseline_yield_t_ha"))
            .or_else(|| context.crop().and_then(crops::lookup).and_then(|c| c.baseline_yield_t_ha))
            .filter(|b| *b > 0.0)
    }
}

impl DomainScorer for YieldScorer {
    fn domain(&self) -> Domain {
        Domain::Yield
    }

    fn anchors<'a>(&self, policy: &'a RiskConfig) -> &'a BandAnchors {
        &policy.yield_forecast.anchors
    }

    fn assess(
        &self,
        result: &DomainResult,
        context: &ContextBundle,
        policy: &RiskConfig,
    ) -> Result<DomainSignal, AdvisoryError> {
        let cfg = &policy.yield_forecast;
        let predicted = result.primary_value.as_number().ok_or_else(|| {
            AdvisoryError::invalid("yield result primary_value must be a predicted yield (t/ha)")
        })?;
        if predicted < 0.0 {
            return Err(AdvisoryError::invalid(format!(
                "predicted yield {predicted} cannot be negative"
            )));
        }
        let baseline = Self::baseline(result, context).ok_or_else(|| {
            AdvisoryError::invalid(
                "no yield baseline: supply field history, baseline_yield_t_ha or a known crop",
            )
        })?;

        let shortfall_pct = ((baseline - predicted) / baseline * 100.0).max(0.0);
        let mut out = DomainSignal::new(shortfall_pct);

        if shortfall_pct >= cfg.shortfall_alert_pct {
            out.factor(
                shortfall_pct / cfg.shortfall_alert_pct,
                format!(
                    "predicted yield {:.1} t/ha is {:.0}% below baseline {:.1} t/ha",
                    predicted, shortfall_pct, baseline
                ),
            );
        }

        for (metric, label, min, max, unit) in RELIABLE_RANGES {
            if let Some(v) = result.metric(metric) {
                if v < min || v > max {
                    out.factor(
                        DATA_QUALITY_SIGNIFICANCE,
                        format!("{label} {v:.0}{unit} outside {min:.0}-{max:.0}{unit} model range"),
                    );
                }
            }
        }

        out.indicator("predicted_yield_t_ha", predicted);
        out.indicator("baseline_yield_t_ha", baseline);
        out.indicator("yield_gap_t_ha", baseline - predicted);
        out.indicator("shortfall_pct", shortfall_pct);
        if let Some(size) = context.field_size_ha() {
            out.indicator("field_size_ha", size);
            out.indicator("total_yield_t", predicted * size);
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::risk::RiskScorer;
    use crate::types::{FieldProfile, HistoricalWindow, PrimaryValue, Severity};

    fn predicted(t_ha: f64) -> DomainResult {
        DomainResult::new(Domain::Yield, PrimaryValue::Number(t_ha), 0.8)
    }

    fn wheat_field() -> ContextBundle {
        ContextBundle {
            field: Some(FieldProfile {
                crop: Some("wheat".into()),
                field_size_ha: Some(2.0),
                ..Default::default()
            }),
            ..Default::default()
        }
    }

    #[test]
    fn test_shortfall_against_registry_baseline() {
        let scorer = RiskScorer::new(RiskConfig::default());
        let risk = scorer.score(&predicted(3.0), &wheat_field()).unwrap();
        // 25% below the 4.0 t/ha wheat baseline
        assert_eq!(risk.severity, Severity::High);
        assert!(risk.risk_factors[0].contains("25% below baseline"));
        assert_eq!(risk.indicator("total_yield_t"), Some(6.0));
    }

    #[test]
    fn test_history_baseline_takes_precedence() {
        let scorer = RiskScorer::new(RiskConfig::default());
        let mut context = wheat_field();
        context.history = Some(HistoricalWindow {
            yield_baseline_t_ha: Some(3.0),
            ..Default::default()
        });
        let risk = scorer.score(&predicted(3.2), &context).unwrap();
        assert_eq!(risk.severity, Severity::Low);
        assert!(risk.risk_factors.is_empty());
    }

    #[test]
    fn test_out_of_range_inputs_are_data_quality_factors() {
        let scorer = RiskScorer::new(RiskConfig::default());
        let result = predicted(4.1).with_metric("rainfall_mm", 250.0);
        let risk = scorer.score(&result, &wheat_field()).unwrap();
        assert_eq!(risk.risk_factors, vec!["rainfall 250 mm outside 400-800 mm model range".to_string()]);
    }

    #[test]
    fn test_unknown_crop_without_history_is_invalid() {
        let scorer = RiskScorer::new(RiskConfig::default());
        assert!(scorer.score(&predicted(3.0), &ContextBundle::default()).is_err());
    }
}
