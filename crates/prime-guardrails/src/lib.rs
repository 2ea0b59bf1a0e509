//! # Prime Guardrails
//!
//! A security agent that screens text on both sides of a language model call.
//!
//! - **Input guard**: blocks prompt injection and jailbreak attempts, redacts
//!   personal data before it reaches the model
//! - **Output guard**: redacts leaked personal data and secrets, checks the
//!   response against the reference documents it should be based on
//! - **Rate limiting**: per-user request budgets on input screening
//! - **Audit**: structured `tracing` events and an optional JSON-lines file
//!
//! Checks run either against the hosted guard service (`remote` feature, the
//! default) or entirely in-process with [`SecurityAgent::local`].
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use prime_guardrails::SecurityAgent;
//!
//! # async fn call_llm(_prompt: &str) -> String { String::new() }
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let agent = SecurityAgent::new("your-api-key")?;
//!
//!     // Guard input before the model
//!     let result = agent.guard_input("User's message here").await?;
//!     if !result.is_safe {
//!         println!("Request blocked");
//!         return Ok(());
//!     }
//!
//!     let llm_response = call_llm("User's message here").await;
//!
//!     // Guard output before returning it
//!     let result = agent
//!         .guard_output(&llm_response, &["context".to_string()])
//!         .await?;
//!     println!("{}", result.content_or(&llm_response));
//!
//!     Ok(())
//! }
//! ```
//!
//! [`GuardedPipeline`] wraps the same sequence around a model closure.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────┐     ┌───────────────┐     ┌─────────────┐
//! │ Application │ ──► │ SecurityAgent │ ──► │ LLM Provider│
//! └─────────────┘     │               │     └─────────────┘
//!                     │ Rate limiter  │
//!                     │ Audit logger  │
//!                     │ ┌───────────┐ │
//!                     │ │ Backend   │ │──► guard service (HTTP)
//!                     │ │  remote / │ │
//!                     │ │  local    │ │──► PII, injection, grounding
//!                     │ └───────────┘ │
//!                     └───────────────┘
//! ```

pub mod agent;
pub mod audit;
pub mod backend;
pub mod config;
pub mod error;
pub mod grounding;
pub mod injection;
pub mod local;
pub mod pii;
pub mod pipeline;
pub mod rate_limit;
#[cfg(feature = "remote")]
pub mod remote;
pub mod types;

pub use agent::{SecurityAgent, SecurityAgentBuilder};
pub use backend::GuardBackend;
pub use config::{AgentConfig, BackendMode};
pub use error::{GuardError, Result, SafetyCategory};
pub use local::LocalBackend;
pub use pipeline::{GuardedPipeline, PipelineError, PipelineOutcome, BLOCKED_MESSAGE};
#[cfg(feature = "remote")]
pub use remote::RemoteBackend;
pub use types::*;

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::agent::SecurityAgent;
    pub use crate::backend::GuardBackend;
    pub use crate::config::AgentConfig;
    pub use crate::error::{GuardError, Result, SafetyCategory};
    pub use crate::pipeline::{GuardedPipeline, PipelineOutcome, BLOCKED_MESSAGE};
    pub use crate::types::*;
}
