//! Integration tests for the sequential/fanout pipeline combinators.
//!
//! Without a live model transport every agent call ends in a provider error,
//! so these tests focus on propagation shape: `sequential` stops at the
//! first failing stage, `fanout` runs every agent and surfaces one error if
//! any of them fail.

use agent_kernel::{pipeline, Agent, AgentOptions, Msg};
use std::sync::Arc;

fn unreachable_agent(name: &str) -> Arc<Agent> {
    let options = AgentOptions::builder().name(name).model("test-model").base_url("http://localhost:1").build().unwrap();
    Arc::new(Agent::new(options))
}

#[tokio::test]
async fn sequential_stops_at_the_first_failing_stage() {
    let stages = vec![unreachable_agent("first"), unreachable_agent("second")];
    let result = pipeline::sequential(&stages, Msg::user("start")).await;
    assert!(result.is_err());
}

#[tokio::test]
async fn fanout_surfaces_an_error_when_any_participant_fails() {
    let agents = vec![unreachable_agent("a"), unreachable_agent("b"), unreachable_agent("c")];
    let result = pipeline::fanout(&agents, Msg::user("start")).await;
    assert!(result.is_err());
}

#[tokio::test]
async fn an_empty_agent_list_produces_an_empty_result_for_both_combinators() {
    let empty: Vec<Arc<Agent>> = Vec::new();
    assert_eq!(pipeline::sequential(&empty, Msg::user("start")).await.unwrap(), Vec::<Msg>::new());
    assert_eq!(pipeline::fanout(&empty, Msg::user("start")).await.unwrap(), Vec::<Msg>::new());
}
