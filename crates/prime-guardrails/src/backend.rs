//! The seam between the agent and whatever performs the checks

use crate::error::Result;
use crate::types::{GuardContext, GuardResult};
use async_trait::async_trait;

/// A guard backend screens text on either side of a model call.
///
/// The agent owns rate limiting and audit logging; backends only decide.
/// Implement this to plug in a custom classifier or a test double.
#[async_trait]
pub trait GuardBackend: Send + Sync {
    /// Short name used in logs
    fn name(&self) -> &'static str;

    /// Screen untrusted text before it reaches the model
    async fn guard_input(&self, text: &str, context: &GuardContext) -> Result<GuardResult>;

    /// Screen model output, optionally against the documents it should be based on
    async fn guard_output(
        &self,
        text: &str,
        reference_docs: &[String],
        context: &GuardContext,
    ) -> Result<GuardResult>;
}
