//! Integration tests wiring `Agent`, tools, and options together.
//!
//! These tests verify that different modules work correctly when assembled
//! through the public API, without needing a live model transport.

use agent_kernel::{Agent, AgentOptions, Msg, tool};

#[tokio::test]
async fn agent_registers_a_tool_built_with_the_builder() {
    let calculator = tool("add", "Add two numbers")
        .param("a", "number")
        .param("b", "number")
        .build(|args| async move {
            let a = args["a"].as_f64().unwrap_or(0.0);
            let b = args["b"].as_f64().unwrap_or(0.0);
            Ok(serde_json::json!({"result": a + b}))
        });

    let options = AgentOptions::builder()
        .system_prompt("You are a calculator assistant")
        .model("test-model")
        .base_url("http://localhost:1234/v1")
        .build()
        .unwrap();

    let agent = Agent::new(options);
    agent.register_tool(calculator).await.unwrap();

    assert_eq!(agent.tools_len().await, 1);
}

#[tokio::test]
async fn registering_a_duplicate_tool_name_fails() {
    let options = AgentOptions::builder().model("test-model").base_url("http://localhost:1234/v1").build().unwrap();
    let agent = Agent::new(options);

    let make_tool = || tool("echo", "echoes").build(|args| async move { Ok(args) });
    agent.register_tool(make_tool()).await.unwrap();
    assert!(agent.register_tool(make_tool()).await.is_err());
}

#[test]
fn builder_requires_a_model_when_no_env_var_is_set() {
    // SAFETY: test-only env mutation, no other test in this file reads this var.
    unsafe { std::env::remove_var("AGENT_KERNEL_MODEL") };
    let result = AgentOptions::builder().base_url("http://localhost:1234/v1").build();
    assert!(result.is_err());
}

#[tokio::test]
async fn fresh_agent_seeds_memory_from_system_prompt_only() {
    let options = AgentOptions::builder()
        .system_prompt("You are a calculator assistant")
        .model("test-model")
        .base_url("http://localhost:1234/v1")
        .build()
        .unwrap();

    let agent = Agent::new(options);
    assert_eq!(agent.memory_len().await, 1);

    let history = agent.memory_snapshot().await;
    assert_eq!(history[0].extract_text(), "You are a calculator assistant");
}

#[tokio::test]
async fn receive_external_appends_without_calling_the_model() {
    let options = AgentOptions::builder().model("test-model").base_url("http://localhost:1234/v1").build().unwrap();
    let agent = Agent::new(options);

    agent.receive_external(Msg::user("a message delivered out of band")).await;
    assert_eq!(agent.memory_len().await, 1);
}
