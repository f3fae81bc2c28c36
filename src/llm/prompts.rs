//! Prompt construction for the generative backend
//!
//! Every prompt is two messages. The system message carries the domain's
//! expert persona, the grounding rules and the two-section output format that
//! `parsing::parse_generated` understands. The user message carries only the
//! request data.

use crate::crops;
use crate::types::{Domain, DomainResult, RiskAssessment};

const SYSTEM_PROMPT: &str = r#"{persona}

### RULES
- Use ONLY the data in the user message. Never invent readings, prices or dates.
- Quantities must come from the INDICATORS block (kg/ha, mm, litres, t/ha, INR/quintal).
- Order recommendations by urgency. At most 6 recommendations.
- Output ONLY the format below. No preamble. No markdown headings.

### OUTPUT FORMAT
SUMMARY: [one or two sentences for the farmer]
RECOMMENDATIONS:
1. [specific action with quantity and timing]
2. [...]"#;

const USER_PROMPT: &str = r#"### REQUEST
Domain: {domain} | Season: {season}
Model output: {primary_value} (confidence {confidence}%)

### RISK ASSESSMENT
Severity: {severity} | Urgency: {urgency} | Score: {score}
Risk factors:
{risk_factors}

### MEASUREMENTS
{metrics}

### INDICATORS
{indicators}"#;

/// System and user halves of one generative request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Prompt {
    pub system: String,
    pub user: String,
}

impl Prompt {
    pub fn char_count(&self) -> usize {
        self.system.chars().count() + self.user.chars().count()
    }
}

/// Expert persona used as the system framing for each domain
pub fn persona(domain: Domain) -> &'static str {
    match domain {
        Domain::Disease => {
            "You are a plant pathologist with decades of field experience in crop disease \
             management. You give stage-appropriate treatment steps, organic and chemical \
             options, safety precautions and preventive measures."
        }
        Domain::Soil => {
            "You are a soil scientist and agronomist specialising in soil fertility. You \
             convert nutrient deficits into specific fertilizer products (Urea, DAP, MOP), \
             doses in kg/ha and application timing, and correct pH with lime or sulphur."
        }
        Domain::Irrigation => {
            "You are an irrigation engineer specialising in weather-based scheduling. You \
             size water amounts from the soil moisture deficit, account for forecast rain \
             and recommend time of day and water-saving practices."
        }
        Domain::Yield => {
            "You are a crop production agronomist specialising in yield optimisation. You \
             explain the gap to the historical baseline, which inputs limit yield and how \
             reliable the forecast is given the data quality."
        }
        Domain::Market => {
            "You are an agricultural market analyst for Indian mandis. You advise farmers \
             on whether to sell now, hold or stagger sales based on price trend and \
             volatility, quoting prices in INR per quintal."
        }
    }
}

fn bullet_block(lines: impl Iterator<Item = String>) -> String {
    let block: Vec<String> = lines.map(|l| format!("- {l}")).collect();
    if block.is_empty() {
        "- none".to_string()
    } else {
        block.join("\n")
    }
}

/// Build the system and user messages for one advisory
pub fn build_advisory_prompt(result: &DomainResult, risk: &RiskAssessment) -> Prompt {
    let season = crops::season_for(result.produced_at.date_naive());

    let risk_factors = bullet_block(risk.risk_factors.iter().cloned());
    let metrics = bullet_block(
        result
            .raw_metrics
            .iter()
            .map(|(name, value)| format!("{name}: {value:.2}")),
    );
    let indicators = bullet_block(
        risk.indicators
            .iter()
            .map(|(name, value)| format!("{name}: {value:.2}")),
    );

    let user = USER_PROMPT
        .replace("{domain}", result.domain.as_str())
        .replace("{season}", season)
        .replace("{primary_value}", &result.primary_value.to_string())
        .replace("{confidence}", &format!("{:.0}", result.confidence * 100.0))
        .replace("{severity}", &risk.severity.to_string())
        .replace("{urgency}", &risk.urgency.to_string())
        .replace("{score}", &format!("{:.2}", risk.score))
        .replace("{risk_factors}", &risk_factors)
        .replace("{metrics}", &metrics)
        .replace("{indicators}", &indicators);

    Prompt {
        system: SYSTEM_PROMPT.replace("{persona}", persona(result.domain)),
        user,
    }
}
