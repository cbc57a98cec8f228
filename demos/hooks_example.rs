//! Hooks Example
//!
//! Demonstrates the priority-ordered hook pipeline: every hook registered for
//! an `Agent` runs on every dispatch (not "first decision wins"), and a hook
//! can request a human-in-the-loop pause via `stop_agent()`.

use agent_kernel::{Agent, AgentOptions, HookEvent, Msg};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    println!("{}", "=".repeat(70));
    println!("HOOKS EXAMPLE");
    println!("{}", "=".repeat(70));
    println!();

    // Example 1: audit logging on PreReasoning, lowest priority so it runs
    // after anything that rewrites the input.
    println!("Example 1: Audit logging hook");
    println!("{}", "-".repeat(70));

    let options = AgentOptions::builder()
        .system_prompt("You are a helpful assistant")
        .model("gpt-4o-mini")
        .base_url("https://api.openai.com/v1")
        .api_key(std::env::var("OPENAI_API_KEY").unwrap_or_default())
        .build()?;

    let agent = Agent::new(options);

    agent
        .add_hook(0, |event, ctx| async move {
            if let HookEvent::PreReasoning { input_messages } = &event {
                println!("📋 audit: about to reason over {} message(s)", input_messages.len());
            }
            let _ = &ctx;
            event
        })
        .await;

    // Example 2: a PostReasoning hook that pauses the agent (HITL) whenever
    // the model's reply mentions a dangerous keyword, instead of letting the
    // loop proceed to tool execution unattended.
    println!("\nExample 2: Human-in-the-loop pause on PostReasoning");
    println!("{}", "-".repeat(70));

    agent
        .add_hook(10, |event, ctx| async move {
            if let HookEvent::PostReasoning { reasoning_message } = &event {
                let text = reasoning_message.extract_text();
                if text.contains("DELETE") || text.contains("DESTROY") {
                    println!("🛑 hook: pausing for human review before acting");
                    ctx.stop_agent();
                }
            }
            event
        })
        .await;

    let reply = agent.call(Some(Msg::user("Summarize: never DELETE production data without a backup."))).await?;

    println!("Assistant: {}", reply.extract_text());
    if agent.is_stopped().await {
        println!("\nAgent is paused — resume by calling `call(None)` once a human approves continuing.");
    }

    println!();
    println!("{}", "=".repeat(70));
    println!("Hooks example complete!");
    println!("{}", "=".repeat(70));

    Ok(())
}
