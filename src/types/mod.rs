//! Shared data structures for the agronomic advisory pipeline
//!
//! One request flows strictly one way through these types:
//! - `DomainResult`: normalized model output for one advisory domain
//! - `ContextBundle`: cached, time-sensitive context (weather, market, field, history)
//! - `RiskAssessment`: severity/urgency classification with contributing factors
//! - `Advisory`: the terminal artifact returned to the caller

mod advisory;
mod context;
mod domain;
mod risk;

pub use advisory::*;
pub use context::*;
pub use domain::*;
pub use risk::*;
