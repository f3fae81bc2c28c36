//! Market provider: price history from a mandi price service, summarised
//! into a `MarketQuote` (30-day change, 90-day range and volatility)

use std::time::Duration;

use async_trait::async_trait;
use chrono::NaiveDate;
use serde::Deserialize;
use tracing::{debug, warn};

use super::ContextFetcher;
use crate::config::MarketConfig;
use crate::error::ContextFetchError;
use crate::types::{ContextBundle, Domain, MarketQuote};

#[derive(Debug, Deserialize)]
struct PriceHistoryResponse {
    #[serde(default)]
    prices: Vec<PricePoint>,
    #[serde(default)]
    currency: Option<String>,
    #[serde(default)]
    unit: Option<String>,
}

#[derive(Debug, Deserialize)]
struct PricePoint {
    date: NaiveDate,
    price: f64,
}

/// Crop and region of a market entity key.
///
/// `user:crop@region` and `crop@region` both resolve to `(crop, region)`.
pub fn crop_and_region(entity_key: &str) -> Option<(&str, &str)> {
    let (head, region) = entity_key.rsplit_once('@')?;
    let crop = head.rsplit(':').next().unwrap_or(head).trim();
    let region = region.trim();
    (!crop.is_empty() && !region.is_empty()).then_some((crop, region))
}

fn quote_from(crop: &str, region: &str, mut history: PriceHistoryResponse) -> Option<MarketQuote> {
    history.prices.sort_by_key(|p| p.date);
    let prices: Vec<f64> = history.prices.iter().map(|p| p.price).collect();
    let mut quote = MarketQuote::from_history(crop, region, &prices)?;
    if let Some(currency) = history.currency {
        quote.currency = currency;
    }
    if let Some(unit) = history.unit {
        quote.unit = unit;
    }
    Some(quote)
}

/// Market context provider for market advisories
#[derive(Clone)]
pub struct MarketProvider {
    http: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
    history_days: u32,
    timeout_ms: u64,
}

impl MarketProvider {
    pub fn new(
        base_url: &str,
        api_key: Option<String>,
        history_days: u32,
        timeout: Duration,
    ) -> Result<Self, ContextFetchError> {
        let http = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
            history_days,
            timeout_ms: u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX),
        })
    }

    /// `None` when disabled or no price service is configured
    pub fn from_config(config: &MarketConfig, timeout: Duration) -> Option<Self> {
        if !config.enabled {
            return None;
        }
        let base_url = config.base_url.as_deref()?;
        let api_key = std::env::var(&config.api_key_env)
            .ok()
            .filter(|k| !k.trim().is_empty());
        match Self::new(base_url, api_key, config.history_days, timeout) {
            Ok(provider) => Some(provider),
            Err(e) => {
                warn!(error = %e, "Failed to build market client");
                None
            }
        }
    }

    async fn price_history(&self, crop: &str, region: &str) -> Result<PriceHistoryResponse, ContextFetchError> {
        let days = self.history_days.to_string();
        let mut request = self
            .http
            .get(format!("{}/prices", self.base_url))
            .query(&[("crop", crop), ("region", region), ("days", days.as_str())]);
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }

        let resp = request.send().await.map_err(|e| {
            if e.is_timeout() {
                ContextFetchError::Timeout(self.timeout_ms)
            } else {
                ContextFetchError::Http(e)
            }
        })?;

        let status = resp.status();
        if !status.is_success() {
            return Err(ContextFetchError::Unavailable(format!("prices returned {status}")));
        }
        resp.json::<PriceHistoryResponse>()
            .await
            .map_err(|e| ContextFetchError::Decode(e.to_string()))
    }
}

#[async_trait]
impl ContextFetcher for MarketProvider {
    async fn fetch(&self, domain: Domain, entity_key: &str) -> Result<ContextBundle, ContextFetchError> {
        let (crop, region) = crop_and_region(entity_key).ok_or_else(|| {
            ContextFetchError::Unavailable("market entity key must name crop@region".into())
        })?;

        let history = self.price_history(crop, region).await?;
        let points = history.prices.len();
        let quote = quote_from(crop, region, history).ok_or_else(|| {
            ContextFetchError::Decode(format!("no usable prices for {crop} in {region}"))
        })?;

        debug!(
            %domain,
            crop,
            region,
            points,
            current_price = quote.current_price,
            change_30d_pct = quote.change_30d_pct,
            volatility_pct = quote.volatility_pct,
            "Market context fetched"
        );
        Ok(ContextBundle {
            market: Some(quote),
            ..Default::default()
        })
    }

    fn name(&self) -> &'static str {
        "market"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::extract::Query;
    use axum::routing::get;
    use axum::{Json, Router};
    use std::collections::HashMap;

    #[test]
    fn test_crop_and_region() {
        assert_eq!(crop_and_region("farmer7:onion@Nashik"), Some(("onion", "Nashik")));
        assert_eq!(crop_and_region("wheat@Punjab"), Some(("wheat", "Punjab")));
        assert_eq!(crop_and_region("Nashik"), None);
        assert_eq!(crop_and_region("farmer7:@Nashik"), None);
    }

    #[test]
    fn test_quote_orders_points_by_date() {
        let history: PriceHistoryResponse = serde_json::from_str(
            r#"{"prices":[
                {"date":"2024-03-03","price":1800.0},
                {"date":"2024-03-01","price":2000.0},
                {"date":"2024-03-02","price":1900.0}
            ],"unit":"quintal","currency":"INR"}"#,
        )
        .unwrap();
        let quote = quote_from("onion", "Nashik", history).unwrap();
        assert_eq!(quote.current_price, 1800.0);
        assert!(quote.change_30d_pct < 0.0);
        assert_eq!(quote.min_90_day, 1800.0);
        assert_eq!(quote.max_90_day, 2000.0);
    }

    #[test]
    fn test_empty_history_has_no_quote() {
        let history: PriceHistoryResponse = serde_json::from_str(r#"{"prices":[]}"#).unwrap();
        assert!(quote_from("onion", "Nashik", history).is_none());
    }

    async fn serve_prices(app: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{addr}")
    }

    #[tokio::test]
    async fn test_fetch_builds_quote_from_price_service() {
        let app = Router::new().route(
            "/prices",
            get(|Query(q): Query<HashMap<String, String>>| async move {
                assert_eq!(q.get("crop").map(String::as_str), Some("onion"));
                assert_eq!(q.get("region").map(String::as_str), Some("Nashik"));
                assert_eq!(q.get("days").map(String::as_str), Some("90"));
                let prices: Vec<serde_json::Value> = (1..=30)
                    .map(|day| {
                        serde_json::json!({
                            "date": format!("2024-04-{day:02}"),
                            "price": 2400.0 - 20.0 * f64::from(day),
                        })
                    })
                    .collect();
                Json(serde_json::json!({ "prices": prices }))
            }),
        );
        let base_url = serve_prices(app).await;
        let provider = MarketProvider::new(&base_url, None, 90, Duration::from_secs(2)).unwrap();

        let bundle = provider.fetch(Domain::Market, "farmer7:onion@Nashik").await.unwrap();
        let quote = bundle.market.unwrap();
        assert_eq!(quote.crop, "onion");
        assert_eq!(quote.region, "Nashik");
        assert_eq!(quote.current_price, 1800.0);
        assert!(quote.change_30d_pct < -5.0);
        assert_eq!(quote.currency, "INR");
    }

    #[tokio::test]
    async fn test_server_error_is_unavailable() {
        let app = Router::new().route(
            "/prices",
            get(|| async { axum::http::StatusCode::SERVICE_UNAVAILABLE }),
        );
        let base_url = serve_prices(app).await;
        let provider = MarketProvider::new(&base_url, None, 90, Duration::from_secs(2)).unwrap();
        let err = provider.fetch(Domain::Market, "onion@Nashik").await.unwrap_err();
        assert!(matches!(err, ContextFetchError::Unavailable(_)), "{err}");
    }

    #[tokio::test]
    async fn test_key_without_region_fails_before_any_request() {
        let provider = MarketProvider::new("http://127.0.0.1:9", None, 90, Duration::from_millis(500)).unwrap();
        let err = provider.fetch(Domain::Market, "onion").await.unwrap_err();
        assert!(err.to_string().contains("crop@region"));
    }
}
