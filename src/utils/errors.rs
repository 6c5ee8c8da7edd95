use std::time::Duration;
use thiserror::Error;

/// Main error type for the MuChat bridge
#[derive(Error, Debug)]
pub enum MuChatError {
    /// The agent rejected the credential (HTTP 403). Never retried.
    #[error("Authentication failed: the API key was rejected")]
    Authentication,

    #[error("Unexpected response status: {status}")]
    Protocol { status: u16 },

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Decode error: {0}")]
    Decode(String),

    #[error("Turn timed out after {}s", .0.as_secs())]
    Timeout(Duration),

    #[error("Host error: {0}")]
    Host(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl MuChatError {
    /// Short label used in log lines and outcome summaries
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Authentication => "authentication",
            Self::Protocol { .. } => "protocol",
            Self::Transport(_) => "transport",
            Self::Decode(_) => "decode",
            Self::Timeout(_) => "timeout",
            Self::Host(_) => "host",
            Self::Config(_) => "config",
        }
    }
}

/// Body decode failures are `Decode`; everything else on the wire is `Transport`
impl From<reqwest::Error> for MuChatError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            Self::Decode(err.to_string())
        } else {
            Self::Transport(err.to_string())
        }
    }
}

impl From<serde_json::Error> for MuChatError {
    fn from(err: serde_json::Error) -> Self {
        Self::Decode(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, MuChatError>;
