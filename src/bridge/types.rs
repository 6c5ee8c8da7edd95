use serde::{Deserialize, Serialize};
use std::fmt;

use crate::utils::MuChatError;

/// The bot's own account, used for self-message and mention checks
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BotIdentity {
    pub user_id: String,
    pub username: String,
}

impl BotIdentity {
    pub fn new(user_id: impl Into<String>, username: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            username: username.into(),
        }
    }

    /// `@username` form
    pub fn username_mention(&self) -> String {
        format!("@{}", self.username)
    }

    /// `<@userid>` form
    pub fn user_mention(&self) -> String {
        format!("<@{}>", self.user_id)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChannelType {
    /// One-to-one conversation with the bot
    Direct,
    Other,
}

/// A "message posted" notification from the host
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageEvent {
    pub post_id: String,
    pub author_id: String,
    pub channel_id: String,
    pub channel_type: ChannelType,
    #[serde(default)]
    pub root_id: String,
    pub text: String,
}

impl MessageEvent {
    /// Thread the reply belongs to
    pub fn reply_root(&self) -> &str {
        if self.root_id.is_empty() {
            &self.post_id
        } else {
            &self.root_id
        }
    }
}

/// A post the bridge asks the host to create
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewPost {
    pub channel_id: String,
    pub root_id: String,
    pub user_id: String,
    pub text: String,
}

/// Why a message did not start a turn
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IgnoreReason {
    OwnMessage,
    NotMember,
    ChannelBlocked,
    UserBlocked,
    NotMentioned,
    EmptyQuery,
}

impl fmt::Display for IgnoreReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            Self::OwnMessage => "message written by the bot",
            Self::NotMember => "bot is not a member of the channel",
            Self::ChannelBlocked => "channel not allowed",
            Self::UserBlocked => "user not allowed",
            Self::NotMentioned => "bot not mentioned",
            Self::EmptyQuery => "nothing left to ask after removing mentions",
        };
        f.write_str(text)
    }
}

/// Where a turn is in its lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TurnStage {
    Idle,
    Gated,
    Requesting,
    Streaming,
    Finalizing,
    Done,
}

impl fmt::Display for TurnStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            Self::Idle => "idle",
            Self::Gated => "gated",
            Self::Requesting => "requesting",
            Self::Streaming => "streaming",
            Self::Finalizing => "finalizing",
            Self::Done => "done",
        };
        f.write_str(text)
    }
}

/// How a turn ended
#[derive(Debug)]
pub enum TurnOutcome {
    Ignored(IgnoreReason),
    Completed { post_id: String, text: String },
    /// The stage is the one the turn was in when it failed
    Errored { stage: TurnStage, error: MuChatError },
}

impl TurnOutcome {
    pub fn is_completed(&self) -> bool {
        matches!(self, Self::Completed { .. })
    }
}

impl fmt::Display for TurnOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Ignored(reason) => write!(f, "ignored ({})", reason),
            Self::Completed { post_id, text } => {
                write!(f, "replied in post {} ({} chars)", post_id, text.chars().count())
            }
            Self::Errored { stage, error } => write!(f, "failed while {}: {}", stage, error),
        }
    }
}
