//! Interrupt Capability Demo
//!
//! Demonstrates `Agent::interrupt()`: a cooperative cancel signal checked at
//! every loop edge (before reasoning, per streaming chunk, before each tool
//! call) so a long-running call can be stopped from another task.

use agent_kernel::{Agent, AgentOptions, Msg};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::timeout;

/// Cancel the call if it hasn't finished within a fixed deadline.
async fn timeout_example() -> Result<(), Box<dyn std::error::Error>> {
    println!("{}", "=".repeat(60));
    println!("Example 1: Timeout-based Interruption");
    println!("{}", "=".repeat(60));
    println!();

    let options = AgentOptions::builder()
        .system_prompt("You are a helpful assistant. Be verbose in your responses.")
        .model("gpt-4o-mini")
        .base_url("https://api.openai.com/v1")
        .api_key(std::env::var("OPENAI_API_KEY").unwrap_or_default())
        .build()?;

    let agent = Arc::new(Agent::new(options));
    let interruptor = agent.clone();

    println!("Starting call (will be interrupted after 3 seconds if still running)...\n");

    let result = timeout(
        Duration::from_secs(3),
        agent.call(Some(Msg::user("Write a detailed 1000-word essay about quantum computing"))),
    )
    .await;

    match result {
        Ok(Ok(reply)) => println!("\nResponse completed within timeout: {} chars", reply.extract_text().len()),
        Ok(Err(err)) => println!("\nCall errored before timing out: {err}"),
        Err(_) => {
            interruptor.interrupt();
            println!("\n⚠️  Operation timed out and was interrupted!");
            println!("History preserved: {} messages", interruptor.memory_len().await);
        }
    }

    Ok(())
}

/// Cancel a call from a sibling task, simulating a user-pressed cancel
/// button rather than a fixed deadline.
async fn concurrent_cancel_example() -> Result<(), Box<dyn std::error::Error>> {
    println!("\n{}", "=".repeat(60));
    println!("Example 2: Concurrent Cancellation");
    println!("{}", "=".repeat(60));
    println!();

    let options = AgentOptions::builder()
        .system_prompt("You are a helpful assistant.")
        .model("gpt-4o-mini")
        .base_url("https://api.openai.com/v1")
        .api_key(std::env::var("OPENAI_API_KEY").unwrap_or_default())
        .build()?;

    let agent = Arc::new(Agent::new(options));
    let call_agent = agent.clone();
    let call_task = tokio::spawn(async move { call_agent.call(Some(Msg::user("Count slowly to one hundred"))).await });

    tokio::time::sleep(Duration::from_millis(500)).await;
    println!("Cancel button pressed — interrupting...");
    agent.interrupt();

    match call_task.await {
        Ok(Ok(reply)) => println!("Call finished before the interrupt reached it: {} chars", reply.extract_text().len()),
        Ok(Err(err)) => println!("Call ended with: {err}"),
        Err(join_err) => println!("Task join error: {join_err}"),
    }

    Ok(())
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    timeout_example().await?;
    concurrent_cancel_example().await?;
    Ok(())
}
