//! Hub Broadcast Example
//!
//! Demonstrates the multi-agent message hub: several agents join a shared
//! `Hub`, one agent's final reply is broadcast into every other
//! participant's memory automatically, and a hub-level announcement is
//! delivered to everyone once at the start.

use agent_kernel::{Agent, AgentOptions, Hub, Msg};
use std::sync::Arc;

fn build_agent(name: &str, system_prompt: &str) -> Arc<Agent> {
    let options = AgentOptions::builder()
        .name(name)
        .system_prompt(system_prompt)
        .model("gpt-4o-mini")
        .base_url("https://api.openai.com/v1")
        .api_key(std::env::var("OPENAI_API_KEY").unwrap_or_default())
        .build()
        .expect("valid agent options");
    Arc::new(Agent::new(options))
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    println!("{}", "=".repeat(70));
    println!("HUB BROADCAST EXAMPLE");
    println!("{}", "=".repeat(70));
    println!();

    let planner = build_agent("planner", "You plan a small team's sprint.");
    let reviewer = build_agent("reviewer", "You review sprint plans for risk.");

    let hub = Hub::new(Some(Msg::system("Sprint planning session starting. Be concise.")));
    hub.add(planner.clone()).await?;
    hub.add(reviewer.clone()).await?;

    // Deliver the announcement to whoever has joined so far.
    hub.enter().await;
    println!("planner memory after enter(): {} message(s)", planner.memory_len().await);
    println!("reviewer memory after enter(): {} message(s)\n", reviewer.memory_len().await);

    // The planner's reply is broadcast to the reviewer automatically once
    // `call()` returns, since both are hub participants.
    let plan = planner.call(Some(Msg::user("Draft a one-sentence sprint goal."))).await?;
    println!("planner said: {}", plan.extract_text());
    println!("reviewer memory now has: {} message(s)", reviewer.memory_len().await);

    let review = reviewer.call(None).await?;
    println!("\nreviewer said: {}", review.extract_text());

    println!("\nparticipants: {:?}", hub.participants().iter().map(|p| p.name.clone()).collect::<Vec<_>>());

    hub.close().await;
    println!("\n{}", "=".repeat(70));
    println!("Example complete!");

    Ok(())
}
