use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{debug, Instrument};

use super::host::MessageHost;
use super::types::{BotIdentity, IgnoreReason, MessageEvent, NewPost, TurnOutcome, TurnStage};
use crate::access::{is_allowed, resolve_trigger, SubjectKind};
use crate::agent::{AgentClient, AgentRequest, AnswerStream};
use crate::app::{ConfigSnapshot, ConfigStore, ReplyMode};
use crate::constants::{
    FALLBACK_REPLY, INCREMENTAL_READ_CHUNK, PLACEHOLDER_TEXT, SINGLE_SHOT_READ_CHUNK,
};
use crate::utils::{log_debug, log_error, MuChatError, Result};

/// Runs one conversation turn per qualifying message.
///
/// Turns share nothing mutable except the [`ConfigStore`]; each one captures
/// a snapshot when it starts and uses it until it ends.
pub struct ResponseBridge {
    store: Arc<ConfigStore>,
    client: Arc<dyn AgentClient>,
    host: Arc<dyn MessageHost>,
    bot: BotIdentity,
}

impl ResponseBridge {
    pub fn new(
        store: Arc<ConfigStore>,
        client: Arc<dyn AgentClient>,
        host: Arc<dyn MessageHost>,
        bot: BotIdentity,
    ) -> Self {
        Self {
            store,
            client,
            host,
            bot,
        }
    }

    pub fn bot(&self) -> &BotIdentity {
        &self.bot
    }

    /// Handle a message on its own task
    pub fn spawn(self: &Arc<Self>, event: MessageEvent) -> JoinHandle<TurnOutcome> {
        let bridge = Arc::clone(self);
        let span = tracing::info_span!("turn", post = %event.post_id, channel = %event.channel_id);
        tokio::spawn(async move { bridge.handle_message(event).await }.instrument(span))
    }

    /// Run a full turn for one inbound message
    pub async fn handle_message(&self, event: MessageEvent) -> TurnOutcome {
        // Never answer ourselves, whatever the configuration says
        if event.author_id == self.bot.user_id {
            return TurnOutcome::Ignored(IgnoreReason::OwnMessage);
        }

        let snapshot = self.store.current();
        let query = match self.admit(&snapshot, &event).await {
            Ok(query) => query,
            Err(reason) => {
                log_debug(&snapshot, format!("ignoring post {}: {}", event.post_id, reason));
                return TurnOutcome::Ignored(reason);
            }
        };

        let mut stage = TurnStage::Idle;
        advance(&snapshot, &mut stage, TurnStage::Gated);

        let deadline = snapshot.turn_timeout;
        let result = tokio::time::timeout(
            deadline,
            self.run_turn(&snapshot, &event, query, &mut stage),
        )
        .await
        .unwrap_or(Err(MuChatError::Timeout(deadline)));

        match result {
            Ok((post_id, text)) => {
                advance(&snapshot, &mut stage, TurnStage::Done);
                TurnOutcome::Completed { post_id, text }
            }
            Err(error) => {
                log_error(
                    &format!(
                        "{} failure in turn for post {} while {}",
                        error.kind(),
                        event.post_id,
                        stage
                    ),
                    &error,
                );
                TurnOutcome::Errored { stage, error }
            }
        }
    }

    /// Membership, gates and trigger, in that order
    async fn admit(
        &self,
        snapshot: &ConfigSnapshot,
        event: &MessageEvent,
    ) -> std::result::Result<String, IgnoreReason> {
        match self
            .host
            .is_channel_member(&event.channel_id, &self.bot.user_id)
            .await
        {
            Ok(true) => {}
            Ok(false) => return Err(IgnoreReason::NotMember),
            Err(e) => {
                log_error("channel membership lookup", e);
                return Err(IgnoreReason::NotMember);
            }
        }

        if !is_allowed(
            &event.channel_id,
            snapshot.channel_access,
            &snapshot.channel_allow,
            &snapshot.channel_block,
            SubjectKind::Channel,
        ) {
            return Err(IgnoreReason::ChannelBlocked);
        }
        if !is_allowed(
            &event.author_id,
            snapshot.user_access,
            &snapshot.user_allow,
            &snapshot.user_block,
            SubjectKind::User,
        ) {
            return Err(IgnoreReason::UserBlocked);
        }

        resolve_trigger(event, &self.bot)
    }

    async fn run_turn(
        &self,
        snapshot: &ConfigSnapshot,
        event: &MessageEvent,
        query: String,
        stage: &mut TurnStage,
    ) -> Result<(String, String)> {
        let request = AgentRequest::from_snapshot(snapshot, query);
        match snapshot.reply_mode {
            ReplyMode::SingleShot => self.reply_once(snapshot, event, request, stage).await,
            ReplyMode::Incremental => self.reply_incrementally(snapshot, event, request, stage).await,
        }
    }

    /// Accumulate the whole answer, then create one reply post
    async fn reply_once(
        &self,
        snapshot: &ConfigSnapshot,
        event: &MessageEvent,
        request: AgentRequest,
        stage: &mut TurnStage,
    ) -> Result<(String, String)> {
        advance(snapshot, stage, TurnStage::Requesting);
        let mut answer = self.client.ask(request).await?;

        advance(snapshot, stage, TurnStage::Streaming);
        let mut text = String::new();
        while let Some(chunk) = answer.read_chunk(SINGLE_SHOT_READ_CHUNK).await {
            text.push_str(&chunk?);
        }

        advance(snapshot, stage, TurnStage::Finalizing);
        let reply = final_text(&text);
        let post_id = self.host.create_post(self.reply_post(event, &reply)).await?;
        Ok((post_id, reply))
    }

    /// Post a placeholder, then keep rewriting it as the answer grows
    async fn reply_incrementally(
        &self,
        snapshot: &ConfigSnapshot,
        event: &MessageEvent,
        request: AgentRequest,
        stage: &mut TurnStage,
    ) -> Result<(String, String)> {
        advance(snapshot, stage, TurnStage::Requesting);
        let post_id = self
            .host
            .create_post(self.reply_post(event, PLACEHOLDER_TEXT))
            .await?;
        let mut answer = self.client.ask(request).await?;

        advance(snapshot, stage, TurnStage::Streaming);
        let mut published = None;
        let text = self
            .stream_into_post(&post_id, &mut answer, &mut published)
            .await?;

        advance(snapshot, stage, TurnStage::Finalizing);
        let reply = final_text(&text);
        if published.as_deref() != Some(reply.as_str()) {
            self.update_post_logged(&post_id, &reply).await;
        }
        Ok((post_id, reply))
    }

    /// Each update carries the trimmed text received so far.
    ///
    /// Whitespace-only prefixes leave the placeholder alone, so every
    /// published text is a prefix of the final reply. `published` holds the
    /// last text the host accepted.
    async fn stream_into_post(
        &self,
        post_id: &str,
        answer: &mut AnswerStream,
        published: &mut Option<String>,
    ) -> Result<String> {
        let mut text = String::new();
        while let Some(chunk) = answer.read_chunk(INCREMENTAL_READ_CHUNK).await {
            text.push_str(&chunk?);
            let visible = text.trim();
            if visible.is_empty() || published.as_deref() == Some(visible) {
                continue;
            }
            if self.update_post_logged(post_id, visible).await {
                *published = Some(visible.to_string());
            }
        }
        Ok(text)
    }

    /// Update failures never end the turn
    async fn update_post_logged(&self, post_id: &str, text: &str) -> bool {
        match self.host.update_post(post_id, text).await {
            Ok(()) => true,
            Err(e) => {
                log_error(&format!("updating post {}", post_id), e);
                false
            }
        }
    }

    fn reply_post(&self, event: &MessageEvent, text: &str) -> NewPost {
        NewPost {
            channel_id: event.channel_id.clone(),
            root_id: event.reply_root().to_string(),
            user_id: self.bot.user_id.clone(),
            text: text.to_string(),
        }
    }
}

fn advance(snapshot: &ConfigSnapshot, stage: &mut TurnStage, next: TurnStage) {
    debug!("turn stage {} -> {}", stage, next);
    log_debug(snapshot, format!("turn {}", next));
    *stage = next;
}

/// Trimmed answer, or the fallback so the user always gets a reply
fn final_text(text: &str) -> String {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        FALLBACK_REPLY.to_string()
    } else {
        trimmed.to_string()
    }
}
