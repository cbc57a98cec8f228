//! Integration tests for session save/load across independent `Agent`s.

use agent_kernel::{Agent, AgentOptions, InMemorySessionBackend, Msg, SessionHandle};
use std::sync::Arc;

fn agent() -> Agent {
    let options = AgentOptions::builder()
        .system_prompt("You are a helpful assistant")
        .model("test-model")
        .base_url("http://localhost:1")
        .build()
        .unwrap();
    Agent::new(options)
}

#[tokio::test]
async fn a_saved_session_restores_memory_into_a_brand_new_agent() {
    let backend = Arc::new(InMemorySessionBackend::new());
    let handle = SessionHandle::new(backend, "conversation-42");

    let original = agent();
    original.receive_external(Msg::user("what's the weather")).await;
    original.receive_external(Msg::assistant_text("it's sunny")).await;
    handle.save(&original).await.unwrap();

    let restored = agent();
    assert_ne!(restored.memory_len().await, original.memory_len().await);
    handle.load(&restored).await.unwrap();
    assert_eq!(restored.memory_len().await, original.memory_len().await);

    let snapshot = restored.memory_snapshot().await;
    assert!(snapshot.iter().any(|m| m.extract_text() == "it's sunny"));
}

#[tokio::test]
async fn stopped_flag_survives_a_save_and_load_roundtrip() {
    let backend = Arc::new(InMemorySessionBackend::new());
    let handle = SessionHandle::new(backend, "paused-session");

    let original = agent();
    original.set_stopped(true);
    handle.save(&original).await.unwrap();

    let restored = agent();
    assert!(!restored.is_stopped().await);
    handle.load(&restored).await.unwrap();
    assert!(restored.is_stopped().await);
}

#[tokio::test]
async fn loading_an_unsaved_key_does_not_touch_the_agent() {
    let backend = Arc::new(InMemorySessionBackend::new());
    let handle = SessionHandle::new(backend, "never-saved");

    let agent = agent();
    agent.receive_external(Msg::user("untouched")).await;
    assert!(handle.load(&agent).await.is_err());
    assert_eq!(agent.memory_len().await, 2);
}
