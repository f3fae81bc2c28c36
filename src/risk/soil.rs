//! Soil scorer: weighted N-P-K deviation plus pH distance
//!
//! Each nutrient contributes its relative deviation from the crop's optimal
//! range (deficit relative to the range floor, excess relative to the
//! ceiling). pH contributes its distance from the optimal range with one pH
//! unit counting as 100%. The weighted sum is expressed in percent.
//!
//! Corrective fertilizer doses close the soil-test deficit, capped at the
//! crop's seasonal N-P-K requirement when the registry knows the crop.

use super::{required_metric, DomainScorer, DomainSignal};
use crate::config::{BandAnchors, RiskConfig};
use crate::crops::{self, OptimalRange};
use crate::error::AdvisoryError;
use crate::types::{ContextBundle, Domain, DomainResult};

/// Nutrient content of the standard straight fertilizers
pub const UREA_N_FRACTION: f64 = 0.46;
pub const DAP_P2O5_FRACTION: f64 = 0.46;
pub const MOP_K2O_FRACTION: f64 = 0.60;

/// Agricultural lime per pH unit raised (t/ha, medium-textured soil)
pub const LIME_T_HA_PER_PH_UNIT: f64 = 2.5;
/// Elemental sulphur per pH unit lowered (kg/ha)
pub const SULPHUR_KG_HA_PER_PH_UNIT: f64 = 500.0;

pub struct SoilScorer;

struct Nutrient {
    key: &'static str,
    label: &'static str,
    value: f64,
    range: OptimalRange,
    weight: f64,
}

impl Nutrient {
    fn relative_deviation(&self) -> f64 {
        let dev = self.range.deviation(self.value);
        if dev < 0.0 {
            -dev / self.range.min
        } else {
            dev / self.range.max
        }
    }
}

impl DomainScorer for SoilScorer {
    fn domain(&self) -> Domain {
        Domain::Soil
    }

    fn anchors<'a>(&self, policy: &'a RiskConfig) -> &'a BandAnchors {
        &policy.soil.anchors
    }

    fn assess(
        &self,
        result: &DomainResult,
        context: &ContextBundle,
        policy: &RiskConfig,
    ) -> Result<DomainSignal, AdvisoryError> {
        let cfg = &policy.soil;
        let n = required_metric(result, "nitrogen")?;
        let p = required_metric(result, "phosphorus")?;
        let k = required_metric(result, "potassium")?;
        let ph = required_metric(result, "ph")?;

        if [n, p, k].iter().any(|v| *v < 0.0) {
            return Err(AdvisoryError::invalid("nutrient readings cannot be negative"));
        }
        if !(0.0..=14.0).contains(&ph) {
            return Err(AdvisoryError::invalid(format!("ph {ph} outside 0-14")));
        }

        let crop = crops::profile_or_generic(context.crop());
        let targets = crop.soil_targets();
        let nutrients = [
            Nutrient { key: "n", label: "nitrogen", value: n, range: targets.nitrogen, weight: cfg.nitrogen_weight },
            Nutrient { key: "p", label: "phosphorus", value: p, range: targets.phosphorus, weight: cfg.phosphorus_weight },
            Nutrient { key: "k", label: "potassium", value: k, range: targets.potassium, weight: cfg.potassium_weight },
        ];

        let ph_deviation = targets.ph.deviation(ph);
        let mut weighted = ph_deviation.abs() * cfg.ph_weight;
        for nutrient in &nutrients {
            weighted += nutrient.relative_deviation() * nutrient.weight;
        }

        let mut out = DomainSignal::new(weighted * 100.0);

        for nutrient in &nutrients {
            let rel = nutrient.relative_deviation();
            let deficit = (nutrient.range.min - nutrient.value).max(0.0);
            let excess = (nutrient.value - nutrient.range.max).max(0.0);
            out.indicator(&format!("{}_deficit_kg_ha", nutrient.key), deficit);
            out.indicator(&format!("{}_excess_kg_ha", nutrient.key), excess);

            if rel * 100.0 >= cfg.nutrient_alert_pct {
                let state = if deficit > 0.0 { "deficient" } else { "excessive" };
                out.factor(
                    rel * nutrient.weight,
                    format!(
                        "{} {state}: {:.0} kg/ha vs optimal {:.0}-{:.0}",
                        nutrient.label, nutrient.value, nutrient.range.min, nutrient.range.max
                    ),
                );
            }
        }

        if ph_deviation != 0.0 {
            out.factor(
                ph_deviation.abs() * cfg.ph_weight,
                format!(
                    "pH {:.1} outside optimal range {:.1}-{:.1}",
                    ph, targets.ph.min, targets.ph.max
                ),
            );
        }

        let n_deficit = (targets.nitrogen.min - n).max(0.0);
        let p_deficit = (targets.phosphorus.min - p).max(0.0);
        let k_deficit = (targets.potassium.min - k).max(0.0);
        let (n_dose, p_dose, k_dose) = match crop.npk {
            Some(need) => {
                out.indicator("crop_n_requirement_kg_ha", need.n);
                out.indicator("crop_p_requirement_kg_ha", need.p);
                out.indicator("crop_k_requirement_kg_ha", need.k);
                (n_deficit.min(need.n), p_deficit.min(need.p), k_deficit.min(need.k))
            }
            None => (n_deficit, p_deficit, k_deficit),
        };
        out.indicator("urea_kg_ha", n_dose / UREA_N_FRACTION);
        out.indicator("dap_kg_ha", p_dose / DAP_P2O5_FRACTION);
        out.indicator("mop_kg_ha", k_dose / MOP_K2O_FRACTION);
        out.indicator("ph", ph);
        out.indicator("ph_deviation", ph_deviation);
        if ph_deviation < 0.0 {
            out.indicator("lime_t_ha", -ph_deviation * LIME_T_HA_PER_PH_UNIT);
        } else if ph_deviation > 0.0 {
            out.indicator("sulphur_kg_ha", ph_deviation * SULPHUR_KG_HA_PER_PH_UNIT);
        }
        if let Some(size) = context.field_size_ha() {
            out.indicator("field_size_ha", size);
        }
        Ok(out)
    }
}
