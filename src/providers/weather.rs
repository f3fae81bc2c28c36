//! OpenWeatherMap provider: current conditions plus 24-hour forecast rain

use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use serde::Deserialize;
use tracing::{debug, warn};

use super::ContextFetcher;
use crate::config::defaults::WEATHER_FORECAST_STEPS_24H;
use crate::config::WeatherConfig;
use crate::error::ContextFetchError;
use crate::types::{ContextBundle, Domain, WeatherSnapshot};

#[derive(Debug, Deserialize)]
struct CurrentResponse {
    main: MainBlock,
    #[serde(default)]
    weather: Vec<ConditionBlock>,
}

#[derive(Debug, Deserialize)]
struct MainBlock {
    temp: f64,
    humidity: f64,
}

#[derive(Debug, Deserialize)]
struct ConditionBlock {
    #[serde(default)]
    description: String,
}

#[derive(Debug, Deserialize)]
struct ForecastResponse {
    #[serde(default)]
    list: Vec<ForecastStep>,
}

/// One 3-hour forecast step
#[derive(Debug, Deserialize)]
struct ForecastStep {
    #[serde(default)]
    rain: Option<RainBlock>,
    /// Probability of precipitation, 0..1
    #[serde(default)]
    pop: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct RainBlock {
    #[serde(rename = "3h", default)]
    three_hours: f64,
}

/// Location part of an entity key: `user:field@City` resolves to `City`,
/// a bare key is used as the city name itself
pub fn location_of(entity_key: &str) -> &str {
    entity_key
        .rsplit_once('@')
        .map_or(entity_key, |(_, city)| city)
        .trim()
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

fn snapshot_from(current: CurrentResponse, forecast: Option<ForecastResponse>) -> WeatherSnapshot {
    let steps = forecast
        .map(|f| f.list.into_iter().take(WEATHER_FORECAST_STEPS_24H).collect::<Vec<_>>())
        .unwrap_or_default();

    let forecast_rain_mm = steps
        .iter()
        .filter_map(|s| s.rain.as_ref())
        .map(|r| r.three_hours)
        .filter(|mm| mm.is_finite() && *mm > 0.0)
        .sum();
    let rain_probability_pct = steps
        .iter()
        .filter_map(|s| s.pop)
        .filter(|p| p.is_finite())
        .reduce(f64::max)
        .map(|p| (p * 100.0).round());

    WeatherSnapshot {
        temperature_c: current.main.temp,
        humidity_pct: current.main.humidity,
        description: current
            .weather
            .first()
            .map(|w| capitalize(&w.description))
            .unwrap_or_default(),
        forecast_rain_mm,
        rain_probability_pct,
        observed_at: Utc::now(),
    }
}

/// Weather context provider for disease and irrigation advisories
#[derive(Clone)]
pub struct WeatherProvider {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
    timeout_ms: u64,
}

impl WeatherProvider {
    pub fn new(base_url: &str, api_key: String, timeout: Duration) -> Result<Self, ContextFetchError> {
        let http = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
            timeout_ms: u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX),
        })
    }

    /// `None` when disabled or when the key env var is unset
    pub fn from_config(config: &WeatherConfig, timeout: Duration) -> Option<Self> {
        if !config.enabled {
            return None;
        }
        let api_key = match std::env::var(&config.api_key_env) {
            Ok(key) if !key.trim().is_empty() => key,
            _ => {
                warn!(env = %config.api_key_env, "Weather API key not set, weather context disabled");
                return None;
            }
        };
        match Self::new(&config.base_url, api_key, timeout) {
            Ok(provider) => Some(provider),
            Err(e) => {
                warn!(error = %e, "Failed to build weather client");
                None
            }
        }
    }

    async fn get_json<T: serde::de::DeserializeOwned>(&self, path: &str, city: &str) -> Result<T, ContextFetchError> {
        let resp = self
            .http
            .get(format!("{}/{}", self.base_url, path))
            .query(&[("q", city), ("appid", self.api_key.as_str()), ("units", "metric")])
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    ContextFetchError::Timeout(self.timeout_ms)
                } else {
                    ContextFetchError::Http(e)
                }
            })?;

        let status = resp.status();
        if !status.is_success() {
            return Err(ContextFetchError::Unavailable(format!("{path} returned {status}")));
        }
        resp.json::<T>()
            .await
            .map_err(|e| ContextFetchError::Decode(e.to_string()))
    }
}

#[async_trait]
impl ContextFetcher for WeatherProvider {
    async fn fetch(&self, domain: Domain, entity_key: &str) -> Result<ContextBundle, ContextFetchError> {
        let city = location_of(entity_key);
        if city.is_empty() {
            return Err(ContextFetchError::Unavailable("entity key has no location".into()));
        }

        let current: CurrentResponse = self.get_json("weather", city).await?;
        // Forecast is best-effort; current conditions alone still score
        let forecast = match self.get_json::<ForecastResponse>("forecast", city).await {
            Ok(f) => Some(f),
            Err(e) => {
                warn!(%domain, city, error = %e, "Forecast fetch failed, assuming no rain");
                None
            }
        };

        let snapshot = snapshot_from(current, forecast);
        debug!(
            %domain,
            city,
            temperature_c = snapshot.temperature_c,
            humidity_pct = snapshot.humidity_pct,
            forecast_rain_mm = snapshot.forecast_rain_mm,
            "Weather context fetched"
        );
        Ok(ContextBundle {
            weather: Some(snapshot),
            ..Default::default()
        })
    }

    fn name(&self) -> &'static str {
        "openweathermap"
    }
}
