// Gateway module for the remote agent - follows the Train Station Pattern
// All external access must go through this gateway

// Private submodules - not directly accessible from outside
mod client;
mod sse;
mod traits;
mod types;

// Public re-exports - the ONLY way to access agent functionality
pub use client::MuChatClient;
#[cfg(test)]
pub use traits::MockAgentClient;
pub use traits::AgentClient;
pub use types::{AgentRequest, AnswerStream, FragmentSender};
