pub mod agent;
pub mod client;
pub mod discovery;

use agentnet_types::error::{AgentNetError, AgentNetResult};
use tokio::task::JoinError;

/// Flatten a joined task's result.
pub(crate) fn joined<T>(result: Result<AgentNetResult<T>, JoinError>) -> AgentNetResult<T> {
    result.map_err(|e| AgentNetError::Internal(format!("background task failed: {e}")))?
}
