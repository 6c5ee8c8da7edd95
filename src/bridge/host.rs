use async_trait::async_trait;

use super::types::NewPost;
use crate::utils::Result;

/// The chat platform, as seen from the bridge
#[async_trait]
pub trait MessageHost: Send + Sync {
    /// Create a post and return its id
    async fn create_post(&self, post: NewPost) -> Result<String>;

    /// Replace the text of an existing post
    async fn update_post(&self, post_id: &str, text: &str) -> Result<()>;

    /// Whether `user_id` belongs to the channel. Hosts without membership
    /// information treat every channel as joined.
    async fn is_channel_member(&self, _channel_id: &str, _user_id: &str) -> Result<bool> {
        Ok(true)
    }
}
