/// Constants module to avoid magic numbers in the codebase

// Network Configuration
pub const DEFAULT_MUCHAT_API_BASE: &str = "https://app.mu.chat";
pub const HTTP_CONNECT_TIMEOUT_SECS: u64 = 10;

// Timeouts
pub const TURN_TIMEOUT_SECS: u64 = 60; // Whole turn, including every streaming read

// Bridge read sizes (bytes per read, a latency knob only)
pub const SINGLE_SHOT_READ_CHUNK: usize = 2048;
pub const INCREMENTAL_READ_CHUNK: usize = 1024;

// Bot account
pub const BOT_USERNAME: &str = "muchat";
pub const BOT_DISPLAY_NAME: &str = "MuChat Bot";

// Conversation texts
pub const PLACEHOLDER_TEXT: &str = "Typing...";
pub const FALLBACK_REPLY: &str = "Sorry, no answer was received.";

// Logging
pub const LOG_PREFIX: &str = "[MuChat]";

// Configuration
pub const CONFIG_ENV_PREFIX: &str = "MUCHAT_";
pub const LOCAL_CONFIG_PATH: &str = ".muchat/config.toml";
