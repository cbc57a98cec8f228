//! Advanced integration tests combining several subsystems at once.

use agent_kernel::{Agent, AgentOptions, HookEvent, Msg};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

#[tokio::test]
async fn tool_groups_and_hooks_compose() {
    let pre_acting_count = Arc::new(AtomicUsize::new(0));
    let counter = pre_acting_count.clone();

    let options = AgentOptions::builder().model("test-model").base_url("http://localhost:1").build().unwrap();
    let agent = Agent::new(options);

    let divide = agent_kernel::tool("divide", "Divide numbers")
        .param("a", "number")
        .param("b", "number")
        .build(|args| async move {
            let a = args["a"].as_f64().unwrap_or(0.0);
            let b = args["b"].as_f64().unwrap_or(1.0);
            Ok(serde_json::json!({"result": a / b}))
        });

    agent.create_tool_group("math", "arithmetic tools", true);
    agent.register_tool_in_group(divide, "math").await.unwrap();

    agent
        .add_hook(0, move |event, ctx| {
            let counter = counter.clone();
            async move {
                if matches!(event, HookEvent::PreActing { .. }) {
                    counter.fetch_add(1, Ordering::SeqCst);
                }
                let _ = &ctx;
                event
            }
        })
        .await;

    // Without a live transport the loop never reaches ACTING, so PreActing
    // should not fire — this documents that hooks only see the edges the
    // loop actually reaches.
    let _ = agent.call(Some(Msg::user("divide 10 by 2"))).await;
    assert_eq!(pre_acting_count.load(Ordering::SeqCst), 0);

    agent.set_active_tool_groups(&[]).await;
    assert_eq!(agent.tools_len().await, 1, "deactivating a group doesn't unregister its tools");
}

#[tokio::test]
async fn memory_snapshot_restore_roundtrips_across_tool_registration() {
    let options = AgentOptions::builder()
        .system_prompt("You are a test assistant")
        .model("test-model")
        .base_url("http://localhost:1")
        .build()
        .unwrap();
    let agent = Agent::new(options);

    agent.receive_external(Msg::user("first")).await;
    agent.receive_external(Msg::assistant_text("second")).await;
    let snapshot = agent.memory_snapshot().await;
    assert_eq!(snapshot.len(), 3);

    agent.clear_memory().await;
    assert_eq!(agent.memory_len().await, 0);

    agent.restore_memory(snapshot.clone()).await;
    assert_eq!(agent.memory_len().await, 3);
}
