//! Market scorer: price volatility and trend magnitude
//!
//! Signal = volatility (%) × volatility weight + |30-day change| (%) × trend
//! weight. A bearish trend makes selling decisions more time-critical.

use serde::{Deserialize, Serialize};

use super::{default_urgency, DomainScorer, DomainSignal};
use crate::config::defaults::MARKET_TREND_LABEL_PCT;
use crate::config::{BandAnchors, RiskConfig};
use crate::error::AdvisoryError;
use crate::types::{ContextBundle, Domain, DomainResult, Severity, Urgency};

/// Direction of the 30-day price change
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MarketTrend {
    Bullish,
    Stable,
    Bearish,
}

impl MarketTrend {
    pub fn from_change(change_pct: f64) -> Self {
        if change_pct > MARKET_TREND_LABEL_PCT {
            MarketTrend::Bullish
        } else if change_pct < -MARKET_TREND_LABEL_PCT {
            MarketTrend::Bearish
        } else {
            MarketTrend::Stable
        }
    }

    /// Encoding carried in the `trend_direction` indicator
    pub fn direction(self) -> f64 {
        match self {
            MarketTrend::Bullish => 1.0,
            MarketTrend::Stable => 0.0,
            MarketTrend::Bearish => -1.0,
        }
    }

    pub fn from_direction(direction: f64) -> Self {
        if direction > 0.5 {
            MarketTrend::Bullish
        } else if direction < -0.5 {
            MarketTrend::Bearish
        } else {
            MarketTrend::Stable
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            MarketTrend::Bullish => "bullish",
            MarketTrend::Stable => "stable",
            MarketTrend::Bearish => "bearish",
        }
    }
}

pub struct MarketScorer;

impl DomainScorer for MarketScorer {
    fn domain(&self) -> Domain {
        Domain::Market
    }

    fn anchors<'a>(&self, policy: &'a RiskConfig) -> &'a BandAnchors {
        &policy.market.anchors
    }

    fn assess(
        &self,
        result: &DomainResult,
        context: &ContextBundle,
        policy: &RiskConfig,
    ) -> Result<DomainSignal, AdvisoryError> {
        let cfg = &policy.market;

        let (volatility, change, price, average) = match context.market.as_ref() {
            Some(q) => (
                q.volatility_pct,
                q.change_30d_pct,
                Some(q.current_price),
                Some(q.avg_30_day).filter(|a| *a > 0.0),
            ),
            None => {
                let volatility = result.metric("volatility_pct");
                let change = result.metric("change_30d_pct");
                match (volatility, change) {
                    (Some(v), Some(c)) => (
                        v,
                        c,
                        result.metric("current_price").or_else(|| result.primary_value.as_number()),
                        result.metric("avg_30_day"),
                    ),
                    _ => {
                        return Err(AdvisoryError::invalid(
                            "market result needs a market quote in context or volatility_pct and change_30d_pct metrics",
                        ))
                    }
                }
            }
        };
        if !volatility.is_finite() || !change.is_finite() || volatility < 0.0 {
            return Err(AdvisoryError::invalid("market quote has invalid volatility or change"));
        }

        let signal = volatility * cfg.volatility_weight + change.abs() * cfg.trend_weight;
        let trend = MarketTrend::from_change(change);
        let mut out = DomainSignal::new(signal);

        if volatility >= cfg.volatility_alert_pct {
            out.factor(
                volatility * cfg.volatility_weight,
                format!(
                    "price volatility {:.1}% exceeds {:.0}% alert threshold",
                    volatility, cfg.volatility_alert_pct
                ),
            );
        }
        if change.abs() >= cfg.trend_alert_pct {
            let direction = if change < 0.0 { "down" } else { "up" };
            out.factor(
                change.abs() * cfg.trend_weight,
                format!(
                    "price {direction} {:.1}% against 30-day average ({} trend)",
                    change.abs(),
                    trend.as_str()
                ),
            );
        }

        out.indicator("volatility_pct", volatility);
        out.indicator("change_30d_pct", change);
        out.indicator("trend_direction", trend.direction());
        if let Some(p) = price {
            out.indicator("current_price", p);
        }
        if let Some(a) = average {
            out.indicator("avg_30_day", a);
        }
        Ok(out)
    }

    fn urgency(&self, severity: Severity, signal: &DomainSignal) -> Urgency {
        let base = default_urgency(severity);
        match signal.indicators.get("trend_direction").copied().map(MarketTrend::from_direction) {
            Some(MarketTrend::Bearish) => base.escalate(),
            _ => base,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::risk::RiskScorer;
    use crate::types::{MarketQuote, PrimaryValue};

    fn quote(change: f64, volatility: f64) -> ContextBundle {
        ContextBundle {
            market: Some(MarketQuote {
                crop: "onion".into(),
                region: "Nashik".into(),
                current_price: 1800.0,
                avg_30_day: 1900.0,
                min_90_day: 1500.0,
                max_90_day: 2200.0,
                change_30d_pct: change,
                volatility_pct: volatility,
                currency: "INR".into(),
                unit: "quintal".into(),
            }),
            ..Default::default()
        }
    }

    fn forecast() -> DomainResult {
        DomainResult::new(Domain::Market, PrimaryValue::Number(1850.0), 0.75)
    }

    #[test]
    fn test_trend_labels() {
        assert_eq!(MarketTrend::from_change(2.5), MarketTrend::Bullish);
        assert_eq!(MarketTrend::from_change(-2.5), MarketTrend::Bearish);
        assert_eq!(MarketTrend::from_change(1.0), MarketTrend::Stable);
    }

    #[test]
    fn test_bearish_trend_escalates_urgency() {
        let scorer = RiskScorer::new(RiskConfig::default());
        let falling = scorer.score(&forecast(), &quote(-6.0, 10.0)).unwrap();
        let rising = scorer.score(&forecast(), &quote(6.0, 10.0)).unwrap();
        assert_eq!(falling.severity, rising.severity);
        assert_eq!(falling.urgency, rising.urgency.escalate());
        assert!(falling.risk_factors.iter().any(|f| f.contains("price down 6.0%")));
    }

    #[test]
    fn test_metrics_substitute_for_missing_quote() {
        let scorer = RiskScorer::new(RiskConfig::default());
        let result = forecast()
            .with_metric("volatility_pct", 30.0)
            .with_metric("change_30d_pct", 1.0);
        let risk = scorer.score(&result, &ContextBundle::default()).unwrap();
        // 30 * 0.5 + 1 = 16 sits on the high anchor
        assert_eq!(risk.severity, Severity::High);
        assert_eq!(risk.indicator("current_price"), Some(1850.0));
    }

    #[test]
    fn test_no_quote_is_invalid() {
        let scorer = RiskScorer::new(RiskConfig::default());
        assert!(scorer.score(&forecast(), &ContextBundle::default()).is_err());
    }
}
