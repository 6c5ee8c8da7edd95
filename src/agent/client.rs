use async_trait::async_trait;
use futures::StreamExt;
use reqwest::{Client, Response, StatusCode};
use std::time::Duration;
use tracing::debug;

use super::sse::{parse_data_line, SseLineDecoder};
use super::traits::AgentClient;
use super::types::{AgentAnswer, AgentRequest, AnswerStream, FragmentSender, QueryBody};
use crate::constants::HTTP_CONNECT_TIMEOUT_SECS;
use crate::utils::{MuChatError, Result};

/// HTTP client for the MuChat agent API.
///
/// Holds only the connection pool; the credential and agent come with each
/// request so a configuration change never affects a turn already running.
/// There is no whole-request timeout here: the caller's turn deadline bounds
/// both the request and every streaming read.
#[derive(Clone)]
pub struct MuChatClient {
    client: Client,
}

impl MuChatClient {
    pub fn new() -> Result<Self> {
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(HTTP_CONNECT_TIMEOUT_SECS))
            .build()
            .map_err(|e| MuChatError::Transport(format!("failed to build HTTP client: {}", e)))?;
        Ok(Self { client })
    }

    fn query_url(request: &AgentRequest) -> String {
        format!(
            "{}/api/agents/{}/query",
            request.api_base.trim_end_matches('/'),
            request.agent_id
        )
    }
}

#[async_trait]
impl AgentClient for MuChatClient {
    async fn ask(&self, request: AgentRequest) -> Result<AnswerStream> {
        let url = Self::query_url(&request);
        debug!("POST {} (stream: {})", url, request.stream);

        let response = self
            .client
            .post(&url)
            .bearer_auth(&request.api_key)
            .json(&QueryBody {
                query: &request.query,
                stream: request.stream,
            })
            .send()
            .await?;

        match response.status() {
            StatusCode::OK => {}
            StatusCode::FORBIDDEN => return Err(MuChatError::Authentication),
            status => {
                return Err(MuChatError::Protocol {
                    status: status.as_u16(),
                })
            }
        }

        if request.stream {
            return Ok(spawn_event_pump(response));
        }

        let body = response.bytes().await?;
        let answer: AgentAnswer = serde_json::from_slice(&body)?;
        Ok(AnswerStream::from_text(answer.answer))
    }
}

/// Start the background task that turns the SSE body into fragments
fn spawn_event_pump(response: Response) -> AnswerStream {
    let (tx, stream) = AnswerStream::channel();
    tokio::spawn(pump_events(response, tx));
    stream
}

/// Owns the only sender; returning drops it, which ends the stream exactly once.
async fn pump_events(response: Response, tx: FragmentSender) {
    let mut body = response.bytes_stream();
    let mut decoder = SseLineDecoder::default();

    loop {
        let next = tokio::select! {
            // The consumer went away (turn finished or timed out)
            _ = tx.closed() => {
                debug!("answer stream dropped, closing agent connection");
                return;
            }
            next = body.next() => next,
        };

        match next {
            Some(Ok(bytes)) => {
                for line in decoder.push(&bytes) {
                    if !forward_line(&line, &tx) {
                        return;
                    }
                }
            }
            Some(Err(e)) => {
                let _ = tx.send(Err(e.into()));
                return;
            }
            None => break,
        }
    }

    if let Some(line) = decoder.finish() {
        forward_line(&line, &tx);
    }
}

/// Send a data line's answer on; false once nobody is listening
fn forward_line(line: &str, tx: &FragmentSender) -> bool {
    match parse_data_line(line) {
        None => true,
        Some(Err(e)) => {
            debug!("skipping malformed event line: {}", e);
            true
        }
        Some(Ok(answer)) => tx.send(Ok(answer)).is_ok(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(api_base: &str) -> AgentRequest {
        AgentRequest {
            api_base: api_base.to_string(),
            api_key: "k".to_string(),
            agent_id: "agent-7".to_string(),
            query: "q".to_string(),
            stream: false,
        }
    }

    #[test]
    fn test_query_url() {
        assert_eq!(
            MuChatClient::query_url(&request("https://app.mu.chat")),
            "https://app.mu.chat/api/agents/agent-7/query"
        );
        assert_eq!(
            MuChatClient::query_url(&request("http://localhost:8080/")),
            "http://localhost:8080/api/agents/agent-7/query"
        );
    }

    #[test]
    fn test_forward_line_skips_noise() {
        let (tx, _stream) = AnswerStream::channel();
        assert!(forward_line("event: answer", &tx));
        assert!(forward_line("data:notjson", &tx));
        assert!(forward_line("data:{\"answer\":\"x\"}", &tx));
    }

    #[test]
    fn test_forward_line_stops_without_consumer() {
        let (tx, stream) = AnswerStream::channel();
        drop(stream);
        assert!(!forward_line("data:{\"answer\":\"x\"}", &tx));
        // Lines that would not be written never fail
        assert!(forward_line(": ping", &tx));
    }
}
