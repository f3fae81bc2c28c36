//! Context-fetch collaborators
//!
//! A `ContextFetcher` turns `(domain, entity_key)` into a partial
//! `ContextBundle`. Fetch failures never fail an advisory request; the
//! aggregator flags them as degraded context instead.

pub mod market;
pub mod weather;

pub use market::MarketProvider;
pub use weather::WeatherProvider;

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tracing::info;

use crate::config::AdvisorConfig;
use crate::error::ContextFetchError;
use crate::types::{ContextBundle, Domain};

#[async_trait]
pub trait ContextFetcher: Send + Sync {
    /// Fetch whatever context this provider knows about for the entity
    async fn fetch(&self, domain: Domain, entity_key: &str) -> Result<ContextBundle, ContextFetchError>;

    fn name(&self) -> &'static str;
}

/// Fetcher with no external sources; always returns an empty bundle
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopFetcher;

#[async_trait]
impl ContextFetcher for NoopFetcher {
    async fn fetch(&self, _domain: Domain, _entity_key: &str) -> Result<ContextBundle, ContextFetchError> {
        Ok(ContextBundle::default())
    }

    fn name(&self) -> &'static str {
        "noop"
    }
}

/// Routes each domain to the provider that serves its context.
/// Domains without a route get an empty bundle.
#[derive(Default, Clone)]
pub struct DomainRouter {
    routes: HashMap<Domain, Arc<dyn ContextFetcher>>,
}

impl DomainRouter {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn route(mut self, domain: Domain, fetcher: Arc<dyn ContextFetcher>) -> Self {
        self.routes.insert(domain, fetcher);
        self
    }

    pub fn serves(&self, domain: Domain) -> bool {
        self.routes.contains_key(&domain)
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }
}

#[async_trait]
impl ContextFetcher for DomainRouter {
    async fn fetch(&self, domain: Domain, entity_key: &str) -> Result<ContextBundle, ContextFetchError> {
        match self.routes.get(&domain) {
            Some(fetcher) => fetcher.fetch(domain, entity_key).await,
            None => Ok(ContextBundle::default()),
        }
    }

    fn name(&self) -> &'static str {
        "router"
    }
}

/// Build the production fetcher from config.
///
/// Weather feeds the weather-driven domains (disease humidity, irrigation
/// temperature and rain) when enabled and an API key is present. Market
/// quotes come from the price service when one is configured.
pub fn build_fetcher(config: &AdvisorConfig) -> Arc<dyn ContextFetcher> {
    let timeout = config.request.context_fetch_timeout();
    let mut router = DomainRouter::new();

    if let Some(weather) = WeatherProvider::from_config(&config.weather, timeout) {
        let weather: Arc<dyn ContextFetcher> = Arc::new(weather);
        router = router
            .route(Domain::Disease, Arc::clone(&weather))
            .route(Domain::Irrigation, weather);
    }
    if let Some(market) = MarketProvider::from_config(&config.market, timeout) {
        router = router.route(Domain::Market, Arc::new(market));
    }

    if router.is_empty() {
        info!("No context providers configured, advisories use caller context only");
        return Arc::new(NoopFetcher);
    }
    let served: Vec<&str> = Domain::ALL
        .iter()
        .filter(|d| router.serves(**d))
        .map(|d| d.as_str())
        .collect();
    info!(domains = ?served, "Context providers enabled");
    Arc::new(router)
}
