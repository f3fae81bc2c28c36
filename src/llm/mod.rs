//! Generative-language backend
//!
//! The advisory generator talks to a `GenerativeBackend`: one call with a
//! system/user prompt pair and a hard timeout, returning raw text. Prompt construction and
//! response parsing live beside it so any backend can be swapped in.

use std::time::Duration;

use async_trait::async_trait;

use crate::error::GenerativeError;

pub mod http_backend;
pub mod parsing;
pub mod prompts;

pub use http_backend::ChatCompletionsBackend;
pub use parsing::{parse_generated, ParsedAdvisory};
pub use prompts::{build_advisory_prompt, Prompt};

/// Unified trait for generative-language backends
#[async_trait]
pub trait GenerativeBackend: Send + Sync {
    /// Complete a prompt, giving up after `timeout`
    async fn complete(&self, prompt: &Prompt, timeout: Duration) -> Result<String, GenerativeError>;

    /// Backend name for logging
    fn backend_name(&self) -> &'static str;

    /// Model identifier for usage accounting
    fn model(&self) -> &str {
        self.backend_name()
    }
}
