use async_trait::async_trait;

use super::types::{AgentRequest, AnswerStream};
use crate::utils::Result;

/// Core trait for anything that can answer a question on behalf of an agent
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait AgentClient: Send + Sync {
    /// Send one query.
    ///
    /// Fails with `Authentication`, `Protocol`, `Transport` or `Decode`
    /// before any text is produced; later failures arrive through the stream.
    async fn ask(&self, request: AgentRequest) -> Result<AnswerStream>;
}
