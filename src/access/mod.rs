// Gateway module for access control - follows the Train Station Pattern
// All external access must go through this gateway

// Private submodules - not directly accessible from outside
mod gate;
mod trigger;

// Public re-exports - the ONLY way to access gating functionality
pub use gate::{is_allowed, AccessMode, SubjectKind};
pub use trigger::{mentions_bot, resolve_trigger, strip_mentions};
