//! Irrigation scorer: moisture deficit adjusted for heat and forecast rain
//!
//! Signal (moisture points) = deficit below the moisture threshold
//! + heat points above the heat threshold − rain credit.

use super::{required_metric, DomainScorer, DomainSignal};
use crate::config::{BandAnchors, RiskConfig};
use crate::crops;
use crate::error::AdvisoryError;
use crate::types::{ContextBundle, Domain, DomainResult, Severity, Urgency};

/// Litres of water per mm of depth over one hectare
const LITRES_PER_MM_HA: f64 = 10_000.0;

pub struct IrrigationScorer;

impl DomainScorer for IrrigationScorer {
    fn domain(&self) -> Domain {
        Domain::Irrigation
    }

    fn anchors<'a>(&self, policy: &'a RiskConfig) -> &'a BandAnchors {
        &policy.irrigation.anchors
    }

    fn assess(
        &self,
        result: &DomainResult,
        context: &ContextBundle,
        policy: &RiskConfig,
    ) -> Result<DomainSignal, AdvisoryError> {
        let cfg = &policy.irrigation;
        let moisture = required_metric(result, "soil_moisture_pct")?;
        if !(0.0..=100.0).contains(&moisture) {
            return Err(AdvisoryError::invalid(format!(
                "soil_moisture_pct {moisture} outside 0-100"
            )));
        }

        let weather = context.weather.as_ref();
        let temperature = weather
            .map(|w| w.temperature_c)
            .or_else(|| result.metric("temperature_c"));
        let rain_mm = weather
            .map(|w| w.forecast_rain_mm)
            .or_else(|| result.metric("forecast_rain_mm"))
            .unwrap_or(0.0)
            .max(0.0);

        let deficit = (cfg.moisture_threshold_pct - moisture).max(0.0);
        let heat_excess = temperature.map_or(0.0, |t| (t - cfg.heat_threshold_c).max(0.0));
        let heat_points = heat_excess * cfg.heat_points_per_degree;
        let rain_credit = rain_mm * cfg.rain_credit_per_mm;
        let signal = (deficit + heat_points - rain_credit).max(0.0);

        let mut out = DomainSignal::new(signal);

        if deficit > 0.0 {
            out.factor(
                deficit,
                format!(
                    "soil moisture {:.0}% below {:.0}% threshold",
                    moisture, cfg.moisture_threshold_pct
                ),
            );
        }
        match temperature {
            Some(t) if heat_points > 0.0 => out.factor(
                heat_points,
                format!(
                    "temperature {:.1}°C above {:.0}°C heat threshold",
                    t, cfg.heat_threshold_c
                ),
            ),
            Some(_) => {}
            None => out.factor(0.0, "temperature unavailable; heat stress not assessed"),
        }

        let crop = crops::profile_or_generic(context.crop());
        let stage = context
            .field
            .as_ref()
            .and_then(|f| {
                f.crop_stage
                    .clone()
                    .or_else(|| f.days_since_planting.map(|d| crop.stage_at(d).to_string()))
            });
        let daily_mm = stage
            .as_deref()
            .map_or(crops::DEFAULT_WATER_MM_PER_DAY, |s| crop.water_requirement(s));

        let irrigation_mm = if signal > 0.0 {
            ((deficit + heat_points) * cfg.mm_per_moisture_point - rain_mm).max(0.0)
        } else {
            0.0
        };

        out.indicator("soil_moisture_pct", moisture);
        out.indicator("moisture_deficit_pts", deficit);
        out.indicator("heat_points", heat_points);
        out.indicator("forecast_rain_mm", rain_mm);
        out.indicator("daily_water_mm", daily_mm);
        out.indicator("irrigation_mm", irrigation_mm);
        out.indicator("water_l_per_ha", irrigation_mm * LITRES_PER_MM_HA);
        if let Some(t) = temperature {
            out.indicator("temperature_c", t);
        }
        if let Some(size) = context.field_size_ha() {
            out.indicator("field_size_ha", size);
            out.indicator("water_l_field", irrigation_mm * LITRES_PER_MM_HA * size);
        }
        Ok(out)
    }

    fn urgency(&self, severity: Severity, signal: &DomainSignal) -> Urgency {
        match severity {
            Severity::High | Severity::Critical => Urgency::High,
            Severity::Medium => Urgency::Medium,
            Severity::Low if signal.signal > 0.0 => Urgency::Low,
            Severity::Low => Urgency::None,
        }
    }
}
