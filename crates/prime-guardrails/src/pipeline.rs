//! Guard a single model call on both sides

use crate::agent::SecurityAgent;
use crate::error::GuardError;
use crate::types::{GuardContext, GuardResult};
use std::future::Future;
use thiserror::Error;
use tracing::info;

/// Message returned to the caller when a request is refused
pub const BLOCKED_MESSAGE: &str = "Request blocked";

/// Outcome of a guarded model call
#[derive(Debug, Clone)]
pub enum PipelineOutcome {
    /// Input or output was refused
    Blocked {
        /// Text to hand back to the caller
        message: String,
        /// Verdict that caused the block
        result: GuardResult,
    },
    /// Model ran and its (possibly sanitized) response passed
    Completed {
        /// Final text for the caller
        text: String,
        /// Input verdict
        input: GuardResult,
        /// Output verdict
        output: GuardResult,
    },
}

impl PipelineOutcome {
    /// Text to return to the caller in either case
    pub fn text(&self) -> &str {
        match self {
            PipelineOutcome::Blocked { message, .. } => message,
            PipelineOutcome::Completed { text, .. } => text,
        }
    }

    /// Check if the call was refused
    pub fn is_blocked(&self) -> bool {
        matches!(self, PipelineOutcome::Blocked { .. })
    }
}

/// Failure of a guarded call
#[derive(Debug, Error)]
pub enum PipelineError<E> {
    /// The agent could not produce a verdict
    #[error("Guard failed: {0}")]
    Guard(#[from] GuardError),
    /// The model call itself failed
    #[error("Model call failed: {0}")]
    Model(E),
}

/// Runs input guard, model, output guard in sequence
pub struct GuardedPipeline<'a> {
    agent: &'a SecurityAgent,
    blocked_message: String,
}

impl<'a> GuardedPipeline<'a> {
    /// Create a pipeline around `agent`
    pub fn new(agent: &'a SecurityAgent) -> Self {
        Self {
            agent,
            blocked_message: BLOCKED_MESSAGE.to_string(),
        }
    }

    /// Override the text returned for refused requests
    pub fn with_blocked_message(mut self, message: impl Into<String>) -> Self {
        self.blocked_message = message.into();
        self
    }

    /// Guard `input`, call `llm` with the screened input, then guard the response
    pub async fn run<F, Fut, E>(
        &self,
        input: &str,
        reference_docs: &[String],
        llm: F,
    ) -> Result<PipelineOutcome, PipelineError<E>>
    where
        F: FnOnce(String) -> Fut,
        Fut: Future<Output = Result<String, E>>,
    {
        self.run_with_context(input, reference_docs, &GuardContext::default(), llm)
            .await
    }

    /// Same as [`run`](Self::run) for a specific user or session
    pub async fn run_with_context<F, Fut, E>(
        &self,
        input: &str,
        reference_docs: &[String],
        context: &GuardContext,
        llm: F,
    ) -> Result<PipelineOutcome, PipelineError<E>>
    where
        F: FnOnce(String) -> Fut,
        Fut: Future<Output = Result<String, E>>,
    {
        let input_result = self.agent.guard_input_with_context(input, context).await?;
        if !input_result.is_safe {
            info!(request_id = %context.request_id, "Input refused; model not called");
            return Ok(self.blocked(input_result));
        }

        let prompt = input_result.content_or(input).to_string();
        let response = llm(prompt).await.map_err(PipelineError::Model)?;

        let output_result = self
            .agent
            .guard_output_with_context(&response, reference_docs, context)
            .await?;
        if !output_result.is_safe {
            info!(request_id = %context.request_id, "Model output refused");
            return Ok(self.blocked(output_result));
        }

        let text = output_result.content_or(&response).to_string();
        Ok(PipelineOutcome::Completed {
            text,
            input: input_result,
            output: output_result,
        })
    }

    fn blocked(&self, result: GuardResult) -> PipelineOutcome {
        PipelineOutcome::Blocked {
            message: self.blocked_message.clone(),
            result,
        }
    }
}
