use serde::{Deserialize, Serialize};
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};

use crate::app::ConfigSnapshot;
use crate::utils::Result;

/// One question for the agent, with everything needed to authenticate it
#[derive(Debug, Clone, PartialEq)]
pub struct AgentRequest {
    pub api_base: String,
    pub api_key: String,
    pub agent_id: String,
    pub query: String,
    pub stream: bool,
}

impl AgentRequest {
    /// Build a request from the snapshot a turn captured
    pub fn from_snapshot(snapshot: &ConfigSnapshot, query: impl Into<String>) -> Self {
        Self {
            api_base: snapshot.api_base.clone(),
            api_key: snapshot.api_key.clone(),
            agent_id: snapshot.agent_id.clone(),
            query: query.into(),
            stream: snapshot.stream,
        }
    }
}

/// Request body sent to `/api/agents/{id}/query`
#[derive(Debug, Serialize)]
pub(super) struct QueryBody<'a> {
    pub query: &'a str,
    pub stream: bool,
}

/// Response shape shared by the buffered body and every SSE data line
#[derive(Debug, Deserialize)]
pub(super) struct AgentAnswer {
    #[serde(default)]
    pub answer: String,
}

/// Write half of an [`AnswerStream`]
pub type FragmentSender = UnboundedSender<Result<String>>;

/// Agent output for one turn.
///
/// Either already complete (buffered mode) or fed live by a background pump
/// (streaming mode). The stream ends when every sender has been dropped.
#[derive(Debug)]
pub struct AnswerStream {
    rx: UnboundedReceiver<Result<String>>,
    pending: String,
}

impl AnswerStream {
    /// Create a live stream and the sender that feeds it
    pub fn channel() -> (FragmentSender, Self) {
        let (tx, rx) = mpsc::unbounded_channel();
        (
            tx,
            Self {
                rx,
                pending: String::new(),
            },
        )
    }

    /// A finished stream holding one piece of text
    pub fn from_text(text: impl Into<String>) -> Self {
        Self::from_fragments([text.into()])
    }

    /// A finished stream holding the given fragments in order
    pub fn from_fragments<I>(fragments: I) -> Self
    where
        I: IntoIterator<Item = String>,
    {
        let (tx, stream) = Self::channel();
        for fragment in fragments {
            let _ = tx.send(Ok(fragment));
        }
        stream
    }

    /// Read the next piece of text, at most `max_bytes` long.
    ///
    /// Pieces never split a UTF-8 character; a single character wider than
    /// `max_bytes` is returned whole. `None` means the stream has ended.
    pub async fn read_chunk(&mut self, max_bytes: usize) -> Option<Result<String>> {
        while self.pending.is_empty() {
            match self.rx.recv().await? {
                Ok(fragment) => self.pending = fragment,
                Err(e) => return Some(Err(e)),
            }
        }

        let cut = split_point(&self.pending, max_bytes);
        let rest = self.pending.split_off(cut);
        Some(Ok(std::mem::replace(&mut self.pending, rest)))
    }

    /// Drain the whole stream into one string
    pub async fn read_to_string(&mut self) -> Result<String> {
        let mut text = String::new();
        while let Some(chunk) = self.read_chunk(usize::MAX).await {
            text.push_str(&chunk?);
        }
        Ok(text)
    }
}

/// Largest char boundary not past `max_bytes`, but always at least one char
fn split_point(text: &str, max_bytes: usize) -> usize {
    if text.len() <= max_bytes {
        return text.len();
    }
    let mut cut = max_bytes;
    while cut > 0 && !text.is_char_boundary(cut) {
        cut -= 1;
    }
    if cut == 0 {
        cut = text.chars().next().map(char::len_utf8).unwrap_or(text.len());
    }
    cut
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::MuChatError;

    #[tokio::test]
    async fn test_chunks_respect_max_bytes() {
        let mut stream = AnswerStream::from_text("abcdefgh");
        assert_eq!(stream.read_chunk(3).await.unwrap().unwrap(), "abc");
        assert_eq!(stream.read_chunk(3).await.unwrap().unwrap(), "def");
        assert_eq!(stream.read_chunk(3).await.unwrap().unwrap(), "gh");
        assert!(stream.read_chunk(3).await.is_none());
    }

    #[tokio::test]
    async fn test_chunks_never_split_characters() {
        // Each of these is two bytes in UTF-8
        let mut stream = AnswerStream::from_text("سلام");
        let mut pieces = Vec::new();
        while let Some(chunk) = stream.read_chunk(3).await {
            pieces.push(chunk.unwrap());
        }
        assert_eq!(pieces.concat(), "سلام");
        assert!(pieces.iter().all(|p| p.chars().count() == 1));

        let mut stream = AnswerStream::from_text("€x");
        assert_eq!(stream.read_chunk(1).await.unwrap().unwrap(), "€");
        assert_eq!(stream.read_chunk(1).await.unwrap().unwrap(), "x");
    }

    #[tokio::test]
    async fn test_empty_fragments_are_skipped() {
        let mut stream =
            AnswerStream::from_fragments(["".to_string(), "a".to_string(), "".to_string()]);
        assert_eq!(stream.read_chunk(16).await.unwrap().unwrap(), "a");
        assert!(stream.read_chunk(16).await.is_none());
    }

    #[tokio::test]
    async fn test_live_stream_ends_when_sender_drops() {
        let (tx, mut stream) = AnswerStream::channel();
        tokio::spawn(async move {
            tx.send(Ok("he".to_string())).unwrap();
            tx.send(Ok("llo".to_string())).unwrap();
        });
        assert_eq!(stream.read_to_string().await.unwrap(), "hello");
    }

    #[tokio::test]
    async fn test_error_item_is_reported() {
        let (tx, mut stream) = AnswerStream::channel();
        tx.send(Err(MuChatError::Transport("reset".to_string()))).unwrap();
        drop(tx);
        let item = stream.read_chunk(16).await.unwrap();
        assert!(matches!(item, Err(MuChatError::Transport(_))));
    }
}
