mod common;

use common::{mention, snapshot, Effect, RecordingHost};
use httpmock::prelude::*;
use muchat::agent::MuChatClient;
use muchat::app::{ConfigStore, ReplyMode};
use muchat::bridge::{BotIdentity, ResponseBridge, TurnOutcome, TurnStage};
use muchat::MuChatError;
use pretty_assertions::assert_eq;
use std::sync::Arc;
use std::time::Duration;

const QUERY_PATH: &str = "/api/agents/agent-1/query";

fn bridge_for(store: ConfigStore) -> (Arc<ResponseBridge>, Arc<RecordingHost>) {
    let host = Arc::new(RecordingHost::default());
    let bridge = ResponseBridge::new(
        Arc::new(store),
        Arc::new(MuChatClient::new().unwrap()),
        host.clone(),
        BotIdentity::new("bot-id", "muchat"),
    );
    (Arc::new(bridge), host)
}

#[tokio::test]
async fn single_shot_reply_is_one_threaded_post() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(POST)
                .path(QUERY_PATH)
                .header("authorization", "Bearer test-key");
            then.status(200).body(r#"{"answer":"hello"}"#);
        })
        .await;

    let store = ConfigStore::new(snapshot(&server.base_url(), ReplyMode::SingleShot, false));
    let (bridge, host) = bridge_for(store);

    let outcome = bridge.spawn(mention("@muchat hello?")).await.unwrap();

    assert!(outcome.is_completed());
    let effects = host.effects();
    assert_eq!(effects.len(), 1);
    match &effects[0] {
        Effect::Create(post) => {
            assert_eq!(post.text, "hello");
            assert_eq!(post.root_id, "root-post");
            assert_eq!(post.user_id, "bot-id");
        }
        other => panic!("expected a created post, got {:?}", other),
    }
}

#[tokio::test]
async fn incremental_reply_grows_the_placeholder() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(POST).path(QUERY_PATH);
            then.status(200)
                .header("content-type", "text/event-stream")
                .body("data:{\"answer\":\"a\"}\n\ndata:{\"answer\":\"b\"}\n\n");
        })
        .await;

    let store = ConfigStore::new(snapshot(&server.base_url(), ReplyMode::Incremental, true));
    let (bridge, host) = bridge_for(store);

    let outcome = bridge.handle_message(mention("@muchat go")).await;
    assert!(outcome.is_completed());

    let effects = host.effects();
    assert!(matches!(&effects[0], Effect::Create(post) if post.text == "Typing..."));
    assert_eq!(host.final_text().as_deref(), Some("ab"));

    // The post only ever grows towards the final text
    let updates = host.updates();
    assert!(updates.len() >= 2, "updates: {:?}", updates);
    assert_eq!(updates[0], "a");
    for pair in updates.windows(2) {
        assert!(pair[1].starts_with(pair[0].as_str()), "updates: {:?}", updates);
    }
    assert!(updates.iter().all(|u| "ab".starts_with(u.as_str())));
}

#[tokio::test]
async fn malformed_fragment_does_not_reach_the_post() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(POST).path(QUERY_PATH);
            then.status(200)
                .header("content-type", "text/event-stream")
                .body("data:notjson\n\ndata:{\"answer\":\"x\"}\n\n");
        })
        .await;

    let store = ConfigStore::new(snapshot(&server.base_url(), ReplyMode::Incremental, true));
    let (bridge, host) = bridge_for(store);

    let outcome = bridge.handle_message(mention("@muchat go")).await;
    assert!(outcome.is_completed());
    assert_eq!(host.final_text().as_deref(), Some("x"));
}

#[tokio::test]
async fn rejected_credential_posts_nothing_in_single_shot() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(POST).path(QUERY_PATH);
            then.status(403);
        })
        .await;

    let store = ConfigStore::new(snapshot(&server.base_url(), ReplyMode::SingleShot, false));
    let (bridge, host) = bridge_for(store);

    let outcome = bridge.handle_message(mention("@muchat hi")).await;
    match outcome {
        TurnOutcome::Errored { stage, error } => {
            assert_eq!(stage, TurnStage::Requesting);
            assert!(matches!(error, MuChatError::Authentication));
        }
        other => panic!("expected an error, got {}", other),
    }
    assert!(host.effects().is_empty());
}

#[tokio::test]
async fn slow_agent_hits_the_turn_deadline() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(POST).path(QUERY_PATH);
            then.status(200)
                .delay(Duration::from_secs(3))
                .body(r#"{"answer":"too late"}"#);
        })
        .await;

    let mut snap = snapshot(&server.base_url(), ReplyMode::Incremental, false);
    snap.turn_timeout = Duration::from_millis(200);
    let (bridge, host) = bridge_for(ConfigStore::new(snap));

    let outcome = bridge.handle_message(mention("@muchat hi")).await;
    match outcome {
        TurnOutcome::Errored { stage, error } => {
            assert_eq!(stage, TurnStage::Requesting);
            assert!(matches!(error, MuChatError::Timeout(_)));
        }
        other => panic!("expected a timeout, got {}", other),
    }

    // Only the placeholder exists; nothing is written after the deadline
    let effects = host.effects();
    assert_eq!(effects.len(), 1);
    assert!(matches!(&effects[0], Effect::Create(post) if post.text == "Typing..."));
}

#[tokio::test]
async fn new_snapshot_applies_to_the_next_turn() {
    let first = MockServer::start_async().await;
    first
        .mock_async(|when, then| {
            when.method(POST).path(QUERY_PATH);
            then.status(200).body(r#"{"answer":"from first"}"#);
        })
        .await;
    let second = MockServer::start_async().await;
    let second_mock = second
        .mock_async(|when, then| {
            when.method(POST)
                .path(QUERY_PATH)
                .header("authorization", "Bearer rotated-key");
            then.status(200).body(r#"{"answer":"from second"}"#);
        })
        .await;

    let store = Arc::new(ConfigStore::new(snapshot(
        &first.base_url(),
        ReplyMode::SingleShot,
        false,
    )));
    let host = Arc::new(RecordingHost::default());
    let bridge = Arc::new(ResponseBridge::new(
        store.clone(),
        Arc::new(MuChatClient::new().unwrap()),
        host.clone(),
        BotIdentity::new("bot-id", "muchat"),
    ));

    bridge.handle_message(mention("@muchat one")).await;
    assert_eq!(host.final_text().as_deref(), Some("from first"));

    let mut rotated = snapshot(&second.base_url(), ReplyMode::SingleShot, false);
    rotated.api_key = "rotated-key".to_string();
    assert_eq!(store.replace(rotated), 2);

    bridge.handle_message(mention("@muchat two")).await;
    assert_eq!(host.final_text().as_deref(), Some("from second"));
    second_mock.assert_async().await;
}
