pub mod access;
pub mod agent;
pub mod app;
pub mod bridge;
pub mod cli;
pub mod constants;
pub mod host;
pub mod runtime;
pub mod utils;

pub use agent::{AgentClient, AnswerStream, MuChatClient};
pub use app::{load_config, Config, ConfigSnapshot, ConfigStore};
pub use bridge::{MessageEvent, MessageHost, ResponseBridge, TurnOutcome};
pub use utils::MuChatError;
