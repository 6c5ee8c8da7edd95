// Gateway module for the response bridge - follows the Train Station Pattern
// All external access must go through this gateway

// Private submodules - not directly accessible from outside
mod host;
mod turn;
mod types;

// Public re-exports - the ONLY way to access bridge functionality
pub use host::MessageHost;
pub use turn::ResponseBridge;
pub use types::{
    BotIdentity, ChannelType, IgnoreReason, MessageEvent, NewPost, TurnOutcome, TurnStage,
};
