use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;

use crate::utils::MuChatError;

/// How a list of channel or user ids is applied
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AccessMode {
    #[default]
    AllowAll,
    AllowSelected,
    BlockSelected,
    /// Channel-level only: denies every channel
    BlockAll,
}

impl AccessMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::AllowAll => "allow_all",
            Self::AllowSelected => "allow_selected",
            Self::BlockSelected => "block_selected",
            Self::BlockAll => "block_all",
        }
    }
}

impl fmt::Display for AccessMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AccessMode {
    type Err = MuChatError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            // An unset mode behaves like allow_all
            "" | "allow_all" => Ok(Self::AllowAll),
            "allow_selected" => Ok(Self::AllowSelected),
            "block_selected" => Ok(Self::BlockSelected),
            "block_all" => Ok(Self::BlockAll),
            other => Err(MuChatError::Config(format!("unknown access mode '{}'", other))),
        }
    }
}

/// What kind of id is being gated
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubjectKind {
    Channel,
    User,
}

/// Decide whether a channel or user may trigger the bot
pub fn is_allowed(
    subject_id: &str,
    mode: AccessMode,
    allow: &HashSet<String>,
    block: &HashSet<String>,
    kind: SubjectKind,
) -> bool {
    match mode {
        AccessMode::AllowAll => true,
        AccessMode::AllowSelected => allow.contains(subject_id),
        AccessMode::BlockSelected => !block.contains(subject_id),
        AccessMode::BlockAll => kind != SubjectKind::Channel,
    }
}
