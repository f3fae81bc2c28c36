//! Advisory request pipeline
//!
//! ```text
//! DomainResult ──> context (cache / fetch) ──> RiskScorer ──> AdvisoryGenerator ──> Advisory
//! ```
//!
//! Steps run strictly in order per request; requests run concurrently and
//! share only the context cache.

mod coordinator;
mod maintenance;
mod state;

pub use coordinator::{Aggregator, AggregatorStats};
pub use maintenance::{Maintenance, SweepReport};
pub use state::{RequestStage, RequestTrace};
