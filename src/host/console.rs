use async_trait::async_trait;
use colored::Colorize;
use parking_lot::Mutex;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicU64, Ordering};

use crate::bridge::{MessageHost, NewPost};
use crate::utils::{MuChatError, Result};

/// Prints post effects to stdout instead of talking to a chat server
pub struct ConsoleHost {
    next_id: AtomicU64,
    posts: Mutex<HashMap<String, String>>,
    /// Channels the bot has joined; `None` means all of them
    member_channels: Option<HashSet<String>>,
    quiet: bool,
}

impl ConsoleHost {
    pub fn new() -> Self {
        Self {
            next_id: AtomicU64::new(1),
            posts: Mutex::new(HashMap::new()),
            member_channels: None,
            quiet: false,
        }
    }

    /// Only answer in these channels
    pub fn with_member_channels(mut self, channels: HashSet<String>) -> Self {
        self.member_channels = Some(channels);
        self
    }

    /// Keep posts in memory without printing them
    pub fn quiet(mut self) -> Self {
        self.quiet = true;
        self
    }

    #[cfg(test)]
    fn post_text(&self, post_id: &str) -> Option<String> {
        self.posts.lock().get(post_id).cloned()
    }

    fn timestamp() -> String {
        chrono::Local::now().format("%H:%M:%S").to_string()
    }
}

impl Default for ConsoleHost {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl MessageHost for ConsoleHost {
    async fn create_post(&self, post: NewPost) -> Result<String> {
        let post_id = format!("post-{}", self.next_id.fetch_add(1, Ordering::SeqCst));
        self.posts.lock().insert(post_id.clone(), post.text.clone());

        if !self.quiet {
            println!(
                "[{}] {} {} in {} (thread {}): {}",
                Self::timestamp(),
                "create".green(),
                post_id.bold(),
                post.channel_id,
                post.root_id,
                post.text
            );
        }
        Ok(post_id)
    }

    async fn update_post(&self, post_id: &str, text: &str) -> Result<()> {
        let mut posts = self.posts.lock();
        let Some(existing) = posts.get_mut(post_id) else {
            return Err(MuChatError::Host(format!("unknown post {}", post_id)));
        };
        *existing = text.to_string();

        if !self.quiet {
            println!(
                "[{}] {} {}: {}",
                Self::timestamp(),
                "update".yellow(),
                post_id.bold(),
                text
            );
        }
        Ok(())
    }

    async fn is_channel_member(&self, channel_id: &str, _user_id: &str) -> Result<bool> {
        Ok(self
            .member_channels
            .as_ref()
            .map_or(true, |channels| channels.contains(channel_id)))
    }
}
