//! Agri Advisor: Agronomic Advisory Aggregation Engine
//!
//! Turns a domain model output (disease class, soil NPK, irrigation reading,
//! yield figure, price trend) into a risk-scored, confidence-qualified
//! advisory, with a deterministic fallback when the generative backend is
//! unavailable.
//!
//! ## Architecture
//!
//! - **Risk Scorer** (`risk`): pure, table-driven severity/urgency per domain
//! - **Advisory Generator** (`advisory`): generative backend with timeout and
//!   single retry, template fallback
//! - **Aggregator** (`pipeline`): per-request stage machine under a deadline
//! - **Context Cache** (`cache`): TTL freshness with LRU capacity bound

pub mod advisory;
pub mod api;
pub mod cache;
pub mod config;
pub mod crops;
pub mod error;
pub mod llm;
pub mod pipeline;
pub mod providers;
pub mod risk;
pub mod storage;
pub mod types;

pub use config::AdvisorConfig;

pub use types::{
    Advisory, AdvisorySource, ContextBundle, Domain, DomainResult, PrimaryValue, RiskAssessment,
    Severity, Urgency,
};

pub use error::{AdvisoryError, ContextFetchError, GenerativeError, PersistenceError};

pub use advisory::{fallback_advisory, AdvisoryGenerator};
pub use cache::{CacheKey, ContextCache};
pub use llm::GenerativeBackend;
pub use pipeline::Aggregator;
pub use providers::ContextFetcher;
pub use risk::RiskScorer;
pub use storage::{AdvisoryHistory, AdvisoryRecord, PersistenceSink};
