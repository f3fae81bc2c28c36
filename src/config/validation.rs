//! Config validation: unknown-key detection with Levenshtein suggestions
//! and agronomic range checks.
//!
//! The raw TOML is walked as a `toml::Value` tree before serde sees it, so a
//! misspelled key yields a "did you mean?" warning instead of silently
//! falling back to the default. Unknown keys never break a config.

use std::collections::HashSet;

use super::AdvisorConfig;

/// A non-fatal config warning (typo, suspicious value).
#[derive(Debug, Clone)]
pub struct ValidationWarning {
    pub field: String,
    pub message: String,
    pub suggestion: Option<String>,
}

impl std::fmt::Display for ValidationWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)?;
        if let Some(ref s) = self.suggestion {
            write!(f, " (did you mean '{s}'?)")?;
        }
        Ok(())
    }
}

// ============================================================================
// Known Config Keys
// ============================================================================

const ANCHOR_FIELDS: [&str; 4] = ["low", "medium", "high", "critical"];

const RISK_DOMAINS: [(&str, &[&str]); 5] = [
    ("disease", &["area_alert_pct", "humidity_alert_pct"]),
    (
        "soil",
        &[
            "nitrogen_weight",
            "phosphorus_weight",
            "potassium_weight",
            "ph_weight",
            "nutrient_alert_pct",
        ],
    ),
    (
        "irrigation",
        &[
            "moisture_threshold_pct",
            "heat_threshold_c",
            "heat_points_per_degree",
            "rain_credit_per_mm",
            "mm_per_moisture_point",
        ],
    ),
    ("yield", &["shortfall_alert_pct"]),
    (
        "market",
        &[
            "volatility_alert_pct",
            "trend_alert_pct",
            "volatility_weight",
            "trend_weight",
        ],
    ),
];

/// Returns the complete set of valid dotted key paths for `AdvisorConfig`.
///
/// Must track the struct hierarchy in advisor_config.rs.
pub fn known_config_keys() -> HashSet<String> {
    let fixed: &[&str] = &[
        // [generative]
        "generative",
        "generative.enabled",
        "generative.timeout_ms",
        "generative.max_retries",
        "generative.endpoint",
        "generative.model",
        "generative.api_key_env",
        "generative.max_tokens",
        "generative.temperature",
        // [cache]
        "cache",
        "cache.max_entries",
        "cache.ttl_secs",
        "cache.sweep_interval_secs",
        // [request]
        "request",
        "request.deadline_ms",
        "request.context_fetch_timeout_ms",
        // [weather]
        "weather",
        "weather.enabled",
        "weather.base_url",
        "weather.api_key_env",
        // [market]
        "market",
        "market.enabled",
        "market.base_url",
        "market.api_key_env",
        "market.history_days",
        // [storage]
        "storage",
        "storage.enabled",
        "storage.path",
        "storage.retention_days",
        // [server]
        "server",
        "server.addr",
        // [risk]
        "risk",
        "risk.low_confidence_threshold",
    ];

    let mut keys: HashSet<String> = fixed.iter().map(|k| k.to_string()).collect();

    for (domain, fields) in RISK_DOMAINS {
        keys.insert(format!("cache.ttl_secs.{domain}"));
        keys.insert(format!("risk.{domain}"));
        keys.insert(format!("risk.{domain}.anchors"));
        for band in ANCHOR_FIELDS {
            keys.insert(format!("risk.{domain}.anchors.{band}"));
        }
        for field in fields {
            keys.insert(format!("risk.{domain}.{field}"));
        }
    }
    keys
}

// ============================================================================
// TOML Key Walking
// ============================================================================

/// Recursively walks a `toml::Value` tree and collects all dotted key paths.
///
/// For example, a table `{ a = { b = 1, c = 2 } }` yields:
/// `["a", "a.b", "a.c"]`
pub fn walk_toml_keys(value: &toml::Value, prefix: &str) -> Vec<String> {
    let mut keys = Vec::new();
    if let Some(table) = value.as_table() {
        for (k, v) in table {
            let path = if prefix.is_empty() {
                k.clone()
            } else {
                format!("{prefix}.{k}")
            };
            keys.push(path.clone());
            if v.is_table() {
                keys.extend(walk_toml_keys(v, &path));
            }
        }
    }
    keys
}

// ============================================================================
// Levenshtein Distance
// ============================================================================

fn levenshtein(a: &str, b: &str) -> usize {
    let b_chars: Vec<char> = b.chars().collect();
    if a.is_empty() {
        return b_chars.len();
    }
    if b_chars.is_empty() {
        return a.chars().count();
    }

    let mut prev: Vec<usize> = (0..=b_chars.len()).collect();
    let mut curr = vec![0; b_chars.len() + 1];

    for (i, ca) in a.chars().enumerate() {
        curr[0] = i + 1;
        for (j, cb) in b_chars.iter().enumerate() {
            let cost = usize::from(ca != *cb);
            curr[j + 1] = (prev[j + 1] + 1).min(curr[j] + 1).min(prev[j] + cost);
        }
        std::mem::swap(&mut prev, &mut curr);
    }

    prev[b_chars.len()]
}

/// Suggest the closest known key for an unknown key, if within edit distance 3.
pub fn suggest_correction(unknown: &str, known: &HashSet<String>) -> Option<String> {
    known
        .iter()
        .map(|k| (k, levenshtein(unknown, k)))
        .filter(|(_, dist)| *dist <= 3)
        .min_by(|(ka, da), (kb, db)| da.cmp(db).then_with(|| ka.cmp(kb)))
        .map(|(k, _)| k.clone())
}

// ============================================================================
// Unknown Key Validation (entry point)
// ============================================================================

/// Parse a raw TOML string and return warnings for any unknown config keys.
pub fn validate_unknown_keys(raw_toml: &str) -> Vec<ValidationWarning> {
    let value: toml::Value = match raw_toml.parse() {
        Ok(v) => v,
        Err(_) => return Vec::new(), // serde reports the parse error
    };

    let known = known_config_keys();
    walk_toml_keys(&value, "")
        .into_iter()
        .filter(|key| !known.contains(key))
        .map(|key| ValidationWarning {
            suggestion: suggest_correction(&key, &known),
            message: format!("Unknown config key '{key}'"),
            field: key,
        })
        .collect()
}

// ============================================================================
// Policy Range Validation
// ============================================================================

/// Range checks beyond structural validity.
///
/// Returns (errors, warnings). Errors are values that would make scoring
/// meaningless; warnings are legal but agronomically suspicious.
pub fn validate_policy_ranges(config: &AdvisorConfig) -> (Vec<String>, Vec<ValidationWarning>) {
    let mut errors = Vec::new();
    let mut warnings = Vec::new();

    let soil = &config.risk.soil;
    let weights = [
        ("nitrogen_weight", soil.nitrogen_weight),
        ("phosphorus_weight", soil.phosphorus_weight),
        ("potassium_weight", soil.potassium_weight),
        ("ph_weight", soil.ph_weight),
    ];
    for (name, w) in weights {
        if !w.is_finite() || w < 0.0 {
            errors.push(format!("risk.soil.{name} = {w} must be a non-negative number"));
        }
    }
    let weight_sum: f64 = weights.iter().map(|(_, w)| w).sum();
    if weight_sum.is_finite() && (weight_sum - 1.0).abs() > 0.05 {
        warnings.push(ValidationWarning {
            field: "risk.soil".to_string(),
            message: format!("soil weights sum to {weight_sum:.2}; signals will not be percentages"),
            suggestion: None,
        });
    }

    let market = &config.risk.market;
    for (name, w) in [
        ("volatility_weight", market.volatility_weight),
        ("trend_weight", market.trend_weight),
    ] {
        if !w.is_finite() || w < 0.0 {
            errors.push(format!("risk.market.{name} = {w} must be a non-negative number"));
        }
    }

    let irrigation = &config.risk.irrigation;
    if !(0.0..=100.0).contains(&irrigation.moisture_threshold_pct) {
        errors.push(format!(
            "risk.irrigation.moisture_threshold_pct = {:.1} is outside 0-100%",
            irrigation.moisture_threshold_pct
        ));
    }
    if irrigation.mm_per_moisture_point <= 0.0 {
        errors.push(format!(
            "risk.irrigation.mm_per_moisture_point = {:.2} must be > 0",
            irrigation.mm_per_moisture_point
        ));
    }
    if irrigation.rain_credit_per_mm < 0.0 || irrigation.heat_points_per_degree < 0.0 {
        errors.push("risk.irrigation rain credit and heat points must be >= 0".to_string());
    }
    if irrigation.heat_threshold_c < 15.0 || irrigation.heat_threshold_c > 45.0 {
        warnings.push(ValidationWarning {
            field: "risk.irrigation.heat_threshold_c".to_string(),
            message: format!(
                "heat_threshold_c = {:.1} is outside typical range (15-45 °C)",
                irrigation.heat_threshold_c
            ),
            suggestion: None,
        });
    }

    let disease = &config.risk.disease;
    if !(0.0..=100.0).contains(&disease.humidity_alert_pct) {
        errors.push(format!(
            "risk.disease.humidity_alert_pct = {:.1} is outside 0-100%",
            disease.humidity_alert_pct
        ));
    }

    if config.cache.max_entries > 1_000_000 {
        warnings.push(ValidationWarning {
            field: "cache.max_entries".to_string(),
            message: format!(
                "cache.max_entries = {} is unusually large for an in-process cache",
                config.cache.max_entries
            ),
            suggestion: None,
        });
    }

    (errors, warnings)
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_levenshtein() {
        assert_eq!(levenshtein("market", "market"), 0);
        assert_eq!(levenshtein("irigation", "irrigation"), 1);
        assert_eq!(levenshtein("", "abc"), 3);
        assert_eq!(levenshtein("abc", ""), 3);
    }

    #[test]
    fn test_walk_toml_keys_nested() {
        let toml: toml::Value = r#"
            [risk.market.anchors]
            low = 0.0
        "#
        .parse()
        .unwrap();
        let keys = walk_toml_keys(&toml, "");
        assert!(keys.contains(&"risk".to_string()));
        assert!(keys.contains(&"risk.market".to_string()));
        assert!(keys.contains(&"risk.market.anchors.low".to_string()));
    }

    #[test]
    fn test_typo_key_produces_warning_with_suggestion() {
        let toml_str = r#"
[cache.ttl_secs]
irigation = 600
"#;
        let warnings = validate_unknown_keys(toml_str);
        assert_eq!(warnings.len(), 1);
        assert_eq!(warnings[0].field, "cache.ttl_secs.irigation");
        assert_eq!(
            warnings[0].suggestion.as_deref(),
            Some("cache.ttl_secs.irrigation")
        );
    }

    #[test]
    fn test_all_valid_keys_produce_zero_warnings() {
        let toml_str = r#"
[generative]
enabled = true
timeout_ms = 5000

[cache.ttl_secs]
yield = 3600

[risk.yield.anchors]
low = 0.0
medium = 10.0
high = 25.0
critical = 40.0

[server]
addr = "127.0.0.1:9000"
"#;
        let warnings = validate_unknown_keys(toml_str);
        assert!(warnings.is_empty(), "Expected 0 warnings, got: {:?}", warnings);
    }

    #[test]
    fn test_suggest_correction_no_match_for_garbage() {
        let known = known_config_keys();
        assert!(suggest_correction("completely_unrelated_garbage_key_xyz", &known).is_none());
    }

    #[test]
    fn test_defaults_serialize_to_known_keys_only() {
        let toml_str = AdvisorConfig::default().to_toml().unwrap();
        let warnings = validate_unknown_keys(&toml_str);
        assert!(warnings.is_empty(), "Default config emits unknown keys: {:?}", warnings);
    }

    #[test]
    fn test_policy_ranges_defaults_clean() {
        let (errors, warnings) = validate_policy_ranges(&AdvisorConfig::default());
        assert!(errors.is_empty(), "{:?}", errors);
        assert!(warnings.is_empty(), "{:?}", warnings);
    }

    #[test]
    fn test_negative_weight_is_error() {
        let mut config = AdvisorConfig::default();
        config.risk.market.trend_weight = -1.0;
        let (errors, _) = validate_policy_ranges(&config);
        assert!(errors.iter().any(|e| e.contains("trend_weight")));
    }
}
