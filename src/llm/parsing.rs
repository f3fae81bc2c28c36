//! Parsing of generative responses into summary + recommendations

use regex::Regex;

use crate::config::defaults::MAX_GENERATED_RECOMMENDATIONS;
use crate::error::GenerativeError;

/// Structured content extracted from a generative response
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedAdvisory {
    pub summary: String,
    pub recommendations: Vec<String>,
}

fn clean(text: &str) -> String {
    text.replace("**", "").trim().trim_matches('"').trim().to_string()
}

/// Parse a response in the SUMMARY / RECOMMENDATIONS format.
///
/// A response without a summary or without a single recommendation is
/// malformed and must not reach the caller.
pub fn parse_generated(response: &str) -> Result<ParsedAdvisory, GenerativeError> {
    let summary_re = Regex::new(r"(?im)^\s*\**SUMMARY\**:\s*(.+)$")
        .map_err(|e| GenerativeError::Malformed(e.to_string()))?;
    let header_re = Regex::new(r"(?im)^\s*\**RECOMMENDATIONS?\**:[ \t]*(.*)$")
        .map_err(|e| GenerativeError::Malformed(e.to_string()))?;
    let item_re = Regex::new(r"^\s*(?:[-*•]|\d+[.)])\s+(.+)$")
        .map_err(|e| GenerativeError::Malformed(e.to_string()))?;

    if response.trim().is_empty() {
        return Err(GenerativeError::Malformed("empty response".to_string()));
    }

    let summary = summary_re
        .captures(response)
        .and_then(|c| c.get(1))
        .map(|m| clean(m.as_str()))
        .filter(|s| !s.is_empty())
        .ok_or_else(|| GenerativeError::Malformed("missing SUMMARY line".to_string()))?;

    let header = header_re
        .captures(response)
        .ok_or_else(|| GenerativeError::Malformed("missing RECOMMENDATIONS section".to_string()))?;

    let mut recommendations = Vec::new();
    // Some models put the first item on the header line itself
    if let Some(inline) = header.get(1).map(|m| m.as_str()).filter(|s| !s.trim().is_empty()) {
        let item = item_re
            .captures(inline)
            .and_then(|c| c.get(1))
            .map_or(inline, |m| m.as_str());
        recommendations.push(clean(item));
    }
    let body_start = header.get(0).map_or(response.len(), |m| m.end());
    for line in response[body_start..].lines() {
        if let Some(item) = item_re.captures(line).and_then(|c| c.get(1)) {
            let item = clean(item.as_str());
            if !item.is_empty() {
                recommendations.push(item);
            }
        }
    }
    recommendations.truncate(MAX_GENERATED_RECOMMENDATIONS);

    if recommendations.is_empty() {
        return Err(GenerativeError::Malformed("no recommendations".to_string()));
    }

    Ok(ParsedAdvisory {
        summary,
        recommendations,
    })
}
