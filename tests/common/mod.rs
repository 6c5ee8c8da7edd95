#![allow(dead_code)]

use async_trait::async_trait;
use muchat::app::{Config, ConfigSnapshot, ReplyMode};
use muchat::bridge::{ChannelType, MessageEvent, MessageHost, NewPost};
use muchat::utils::Result;
use std::sync::Mutex;

#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    Create(NewPost),
    Update(String, String),
}

/// Host that records every effect in order
#[derive(Default)]
pub struct RecordingHost {
    effects: Mutex<Vec<Effect>>,
}

impl RecordingHost {
    pub fn effects(&self) -> Vec<Effect> {
        self.effects.lock().unwrap().clone()
    }

    /// Text of every update, in order
    pub fn updates(&self) -> Vec<String> {
        self.effects()
            .into_iter()
            .filter_map(|e| match e {
                Effect::Update(_, text) => Some(text),
                Effect::Create(_) => None,
            })
            .collect()
    }

    /// Text the conversation finally shows
    pub fn final_text(&self) -> Option<String> {
        self.effects().into_iter().last().map(|e| match e {
            Effect::Create(post) => post.text,
            Effect::Update(_, text) => text,
        })
    }
}

#[async_trait]
impl MessageHost for RecordingHost {
    async fn create_post(&self, post: NewPost) -> Result<String> {
        let mut effects = self.effects.lock().unwrap();
        effects.push(Effect::Create(post));
        Ok(format!("post-{}", effects.len()))
    }

    async fn update_post(&self, post_id: &str, text: &str) -> Result<()> {
        self.effects
            .lock()
            .unwrap()
            .push(Effect::Update(post_id.to_string(), text.to_string()));
        Ok(())
    }
}

pub fn snapshot(api_base: &str, mode: ReplyMode, stream: bool) -> ConfigSnapshot {
    let config = Config {
        muchat_api_key: "test-key".to_string(),
        agent_id: "agent-1".to_string(),
        api_base: api_base.to_string(),
        reply_mode: mode,
        stream,
        ..Config::default()
    };
    ConfigSnapshot::derive(&config).expect("test config should be valid")
}

pub fn mention(text: &str) -> MessageEvent {
    MessageEvent {
        post_id: "root-post".to_string(),
        author_id: "user-1".to_string(),
        channel_id: "town-square".to_string(),
        channel_type: ChannelType::Other,
        root_id: String::new(),
        text: text.to_string(),
    }
}
