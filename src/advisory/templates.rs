//! Deterministic fallback advisories
//!
//! Rule table keyed by `(domain, severity)`. Used whenever the generative
//! backend is disabled, unreachable, too slow or returns garbage. Every
//! number in the output is read from `RiskAssessment::indicators`, which the
//! risk scorer derived in closed form; nothing here is generated.
//!
//! The table never returns an empty recommendation list.

use crate::risk::market::MarketTrend;
use crate::types::{Domain, DomainResult, RiskAssessment, Severity};

/// Summary line plus ordered recommendations
pub type TemplateAdvisory = (String, Vec<String>);

const MONITOR_FALLBACK: &str = "Monitor the field closely and re-check conditions within 3 days.";

/// Produce a fallback advisory for the given result and assessment
pub fn fallback_advisory(result: &DomainResult, risk: &RiskAssessment) -> TemplateAdvisory {
    let (summary, mut recommendations) = match result.domain {
        Domain::Disease => disease_template(result, risk),
        Domain::Soil => soil_template(risk),
        Domain::Irrigation => irrigation_template(risk),
        Domain::Yield => yield_template(risk),
        Domain::Market => market_template(risk),
    };

    if risk.is_context_degraded() {
        recommendations.push(
            "Live weather or market data was unavailable for this advisory; verify local conditions before acting."
                .to_string(),
        );
    }
    if recommendations.is_empty() {
        recommendations.push(MONITOR_FALLBACK.to_string());
    }
    (summary, recommendations)
}

fn ind(risk: &RiskAssessment, name: &str) -> f64 {
    risk.indicator(name).unwrap_or(0.0)
}

fn severity_lead(severity: Severity) -> &'static str {
    match severity {
        Severity::Low => "Low risk",
        Severity::Medium => "Moderate risk",
        Severity::High => "High risk",
        Severity::Critical => "Critical risk",
    }
}

// ============================================================================
// Disease
// ============================================================================

fn disease_template(result: &DomainResult, risk: &RiskAssessment) -> TemplateAdvisory {
    let class = result.primary_value.to_string().replace('_', " ");
    let class = class.split_whitespace().collect::<Vec<_>>().join(" ");

    if risk.indicator("healthy").is_some() {
        return (
            "No disease detected; the plant appears healthy.".to_string(),
            vec![
                "Continue weekly scouting of leaves, stems and fruit.".to_string(),
                "Keep plant spacing and airflow to reduce leaf wetness.".to_string(),
                "Avoid overhead irrigation late in the day.".to_string(),
            ],
        );
    }

    let area = ind(risk, "affected_area_pct");
    let mut recs = Vec::new();

    if risk.indicator("reimage_recommended").is_some() {
        recs.push(
            "Diagnosis confidence is low: retake a clear, well-lit close-up photo of the affected leaves."
                .to_string(),
        );
        recs.push("Confirm the diagnosis with a local extension officer before spraying.".to_string());
    }

    match risk.severity {
        Severity::Low => {
            recs.push("Remove and destroy the few affected leaves.".to_string());
            recs.push("Re-inspect the crop in 3-4 days for new lesions.".to_string());
            recs.push("Apply a preventive neem or copper-based spray if symptoms spread.".to_string());
        }
        Severity::Medium => {
            recs.push(format!(
                "Remove and destroy infected leaves ({area:.0}% of the canopy affected)."
            ));
            recs.push(format!(
                "Apply a fungicide or bactericide labelled for {class}; repeat every 7-10 days."
            ));
            recs.push("Avoid overhead watering and work in the field only when foliage is dry.".to_string());
        }
        Severity::High | Severity::Critical => {
            recs.push(format!(
                "Treat within 24 hours: apply a systemic product labelled for {class}."
            ));
            recs.push(format!(
                "Remove heavily infected plants; {area:.0}% of the crop is affected."
            ));
            if let Some(ha) = risk.indicator("affected_field_ha") {
                recs.push(format!("Prioritise the roughly {ha:.2} ha showing symptoms."));
            }
            recs.push("Repeat the spray after 7 days and sanitise tools between rows.".to_string());
        }
    }

    if risk.severity == Severity::Critical {
        recs.push("Contact an agricultural extension officer today to contain the outbreak.".to_string());
    }
    if let Some(h) = risk.indicator("humidity_pct").filter(|h| *h >= 85.0) {
        recs.push(format!(
            "Humidity is {h:.0}%: prefer morning applications so foliage dries before night."
        ));
    }

    (
        format!(
            "{}: {class} detected on {area:.0}% of the affected area.",
            severity_lead(risk.severity)
        ),
        recs,
    )
}

// ============================================================================
// Soil
// ============================================================================

fn soil_template(risk: &RiskAssessment) -> TemplateAdvisory {
    let field = risk.indicator("field_size_ha");
    let with_field_total = |kg_ha: f64| match field {
        Some(ha) => format!("{kg_ha:.0} kg/ha ({:.0} kg for {ha:.1} ha)", kg_ha * ha),
        None => format!("{kg_ha:.0} kg/ha"),
    };

    let mut recs = Vec::new();

    let urea = ind(risk, "urea_kg_ha");
    let dap = ind(risk, "dap_kg_ha");
    let mop = ind(risk, "mop_kg_ha");
    if urea > 0.0 {
        recs.push(format!(
            "Apply Urea at {} to close the {:.0} kg/ha nitrogen deficit; split into two doses.",
            with_field_total(urea),
            ind(risk, "n_deficit_kg_ha")
        ));
    }
    if dap > 0.0 {
        recs.push(format!(
            "Apply DAP at {} as a basal dose for the {:.0} kg/ha phosphorus deficit.",
            with_field_total(dap),
            ind(risk, "p_deficit_kg_ha")
        ));
    }
    if mop > 0.0 {
        recs.push(format!(
            "Apply MOP at {} for the {:.0} kg/ha potassium deficit.",
            with_field_total(mop),
            ind(risk, "k_deficit_kg_ha")
        ));
    }
    for (key, nutrient) in [("n", "nitrogen"), ("p", "phosphorus"), ("k", "potassium")] {
        let excess = ind(risk, &format!("{key}_excess_kg_ha"));
        if excess > 0.0 {
            recs.push(format!(
                "Skip {nutrient} fertilizer this season; soil is {excess:.0} kg/ha above the optimal range."
            ));
        }
    }
    if let Some(lime) = risk.indicator("lime_t_ha") {
        recs.push(format!(
            "Soil is acidic (pH {:.1}): apply agricultural lime at about {lime:.1} t/ha before sowing.",
            ind(risk, "ph")
        ));
    }
    if let Some(sulphur) = risk.indicator("sulphur_kg_ha") {
        recs.push(format!(
            "Soil is alkaline (pH {:.1}): apply elemental sulphur at about {sulphur:.0} kg/ha and add organic matter.",
            ind(risk, "ph")
        ));
    }

    if recs.is_empty() {
        return (
            "Soil nutrients and pH are within the optimal range; no adjustment needed.".to_string(),
            vec![
                "No fertilizer adjustment needed; continue the current maintenance programme.".to_string(),
                "Add compost or farmyard manure to maintain soil organic matter.".to_string(),
                "Re-test the soil after harvest or within 6 months.".to_string(),
            ],
        );
    }

    match risk.severity {
        Severity::Low | Severity::Medium => {
            recs.push("Re-test the soil after this season to confirm the correction.".to_string());
        }
        Severity::High | Severity::Critical => {
            recs.push("Apply corrections before the next irrigation so nutrients move into the root zone.".to_string());
            recs.push("Re-test the soil in 30 days and adjust the remaining doses.".to_string());
        }
    }

    (
        format!(
            "{}: soil needs correction before the crop's next growth stage.",
            severity_lead(risk.severity)
        ),
        recs,
    )
}

// ============================================================================
// Irrigation
// ============================================================================

fn irrigation_template(risk: &RiskAssessment) -> TemplateAdvisory {
    let moisture = ind(risk, "soil_moisture_pct");
    let water_mm = ind(risk, "irrigation_mm");
    let litres_ha = ind(risk, "water_l_per_ha");
    let rain = ind(risk, "forecast_rain_mm");
    let daily = ind(risk, "daily_water_mm");

    let mut recs = Vec::new();

    if water_mm <= 0.0 {
        if rain > 0.0 {
            recs.push(format!(
                "Hold irrigation: {rain:.0} mm of rain is forecast in the next 24 hours."
            ));
        } else {
            recs.push(format!(
                "No irrigation needed now; soil moisture at {moisture:.0}% is adequate."
            ));
        }
        recs.push(format!(
            "Crop water demand at this stage is about {daily:.0} mm/day; re-check moisture in 2-3 days."
        ));
        return (
            format!("{}: soil moisture is sufficient for now.", severity_lead(risk.severity)),
            recs,
        );
    }

    let when = match risk.severity {
        Severity::Low => "within the next 3 days",
        Severity::Medium => "within 48 hours",
        Severity::High => "within 24 hours",
        Severity::Critical => "today",
    };
    recs.push(format!(
        "Irrigate {when}: apply {water_mm:.0} mm of water (about {litres_ha:.0} litres per hectare)."
    ));
    if let Some(total) = risk.indicator("water_l_field") {
        recs.push(format!("Total for the field: about {total:.0} litres."));
    }
    if risk.severity >= Severity::High {
        recs.push("Split the application into early-morning and evening sessions to limit runoff.".to_string());
    }
    if ind(risk, "heat_points") > 0.0 {
        recs.push(format!(
            "Temperature is {:.1}°C: irrigate before 9 am or after 5 pm to reduce evaporation.",
            ind(risk, "temperature_c")
        ));
    }
    if rain > 0.0 {
        recs.push(format!(
            "{rain:.0} mm of rain is forecast; the amount above already accounts for it."
        ));
    }
    recs.push(format!(
        "Crop water demand at this stage is about {daily:.0} mm/day; mulch to conserve moisture."
    ));

    (
        format!(
            "{}: soil moisture at {moisture:.0}% is below the crop's needs.",
            severity_lead(risk.severity)
        ),
        recs,
    )
}

// ============================================================================
// Yield
// ============================================================================

fn yield_template(risk: &RiskAssessment) -> TemplateAdvisory {
    let predicted = ind(risk, "predicted_yield_t_ha");
    let baseline = ind(risk, "baseline_yield_t_ha");
    let shortfall = ind(risk, "shortfall_pct");

    let mut recs = Vec::new();
    match risk.severity {
        Severity::Low => {
            recs.push("Yield is on track; keep the current fertilizer and irrigation schedule.".to_string());
            recs.push("Plan harvest logistics and storage for the expected volume.".to_string());
        }
        Severity::Medium => {
            recs.push(format!(
                "Yield is {shortfall:.0}% below baseline; check for nutrient or water stress this week."
            ));
            recs.push("Scout for pests and disease that may be limiting growth.".to_string());
        }
        Severity::High | Severity::Critical => {
            recs.push(format!(
                "Expected gap of {:.1} t/ha to baseline: run a soil test and correct deficits immediately.",
                ind(risk, "yield_gap_t_ha")
            ));
            recs.push("Verify irrigation is meeting crop demand at the current growth stage.".to_string());
            recs.push("Revisit marketing and input-credit plans for a smaller harvest.".to_string());
        }
    }
    if let Some(total) = risk.indicator("total_yield_t") {
        recs.push(format!("Expected total harvest: about {total:.1} t."));
    }
    if risk.risk_factors.iter().any(|f| f.contains("model range")) {
        recs.push("Some inputs are outside the forecast's reliable range; treat the estimate with caution.".to_string());
    }

    (
        format!(
            "{}: predicted {predicted:.1} t/ha against a baseline of {baseline:.1} t/ha.",
            severity_lead(risk.severity)
        ),
        recs,
    )
}

// ============================================================================
// Market
// ============================================================================

fn market_template(risk: &RiskAssessment) -> TemplateAdvisory {
    let change = ind(risk, "change_30d_pct");
    let volatility = ind(risk, "volatility_pct");
    let trend = MarketTrend::from_direction(ind(risk, "trend_direction"));
    let price = risk
        .indicator("current_price")
        .map(|p| format!(" at ₹{p:.0}/quintal"))
        .unwrap_or_default();

    let mut recs = Vec::new();
    match trend {
        MarketTrend::Bullish => {
            recs.push(format!(
                "Prices are up {change:.1}% on the 30-day average{price}; hold part of the stock for 1-2 weeks."
            ));
            recs.push("Sell in stages as prices rise rather than all at once.".to_string());
        }
        MarketTrend::Bearish => {
            recs.push(format!(
                "Prices are down {:.1}% on the 30-day average{price}; sell perishable stock now.",
                change.abs()
            ));
            recs.push("Store non-perishable produce only if proper storage is available.".to_string());
        }
        MarketTrend::Stable => {
            recs.push(format!("Prices are stable{price}; sell according to cash-flow needs."));
        }
    }
    if risk.severity >= Severity::High {
        recs.push(format!(
            "Volatility is {volatility:.1}%: split sales into 3-4 lots to average out price swings."
        ));
        recs.push("Compare prices across nearby mandis before committing.".to_string());
    }

    (
        format!(
            "{}: market is {} with {volatility:.1}% price volatility.",
            severity_lead(risk.severity),
            trend.as_str()
        ),
        recs,
    )
}
