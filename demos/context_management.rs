//! Context Management Examples
//!
//! Demonstrates manual history management using `Memory`'s token-estimation
//! and truncation helpers. The kernel provides these low-level building
//! blocks but does NOT truncate automatically — callers decide when and how,
//! based on their own domain needs.
//!
//! Patterns demonstrated:
//! 1. Stateless agents (recommended for single-task agents)
//! 2. Manual truncation at natural breakpoints
//! 3. Token budget monitoring with periodic checks

use agent_kernel::{Agent, AgentOptions, Msg, estimate_tokens, is_approaching_limit, truncate_messages};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    println!("{}", "=".repeat(70));
    println!("CONTEXT MANAGEMENT EXAMPLES");
    println!("{}", "=".repeat(70));
    println!();

    pattern_1_stateless().await?;
    pattern_2_manual_truncation().await?;
    pattern_3_token_monitoring().await?;

    Ok(())
}

/// Best for: single-task agents (copy editor, code formatter, etc.) that
/// never need to remember a previous turn.
async fn pattern_1_stateless() -> Result<(), Box<dyn std::error::Error>> {
    println!("=== Pattern 1: Stateless Agents ===");
    println!("Best for: single-task agents with no context needed\n");

    let options = AgentOptions::builder()
        .model("gpt-4o-mini")
        .base_url("https://api.openai.com/v1")
        .api_key(std::env::var("OPENAI_API_KEY").unwrap_or_default())
        .system_prompt("You are a helpful assistant")
        .build()?;

    let tasks = vec!["Explain Rust", "Explain Python", "Explain JavaScript"];

    for task in tasks {
        let agent = Agent::new(options.clone());
        let reply = agent.call(Some(Msg::user(task))).await?;
        println!("{task} -> {} chars", reply.extract_text().len());
    }

    println!();
    Ok(())
}

/// Best for: long-running assistants that need to stay under a provider's
/// context window without dropping the system prompt.
async fn pattern_2_manual_truncation() -> Result<(), Box<dyn std::error::Error>> {
    println!("=== Pattern 2: Manual Truncation at a Breakpoint ===\n");

    let options = AgentOptions::builder()
        .model("gpt-4o-mini")
        .base_url("https://api.openai.com/v1")
        .api_key(std::env::var("OPENAI_API_KEY").unwrap_or_default())
        .system_prompt("You are a helpful assistant")
        .build()?;

    let agent = Agent::new(options);
    for turn in 0..20 {
        agent.call(Some(Msg::user(format!("turn {turn}")))).await?;
    }

    let before = agent.memory_len().await;
    let history = agent.memory_snapshot().await;
    let trimmed = truncate_messages(&history, 6, true);
    agent.restore_memory(trimmed.clone()).await;

    println!("history: {before} messages -> {} after truncation (system prompt preserved)", trimmed.len());
    println!();
    Ok(())
}

/// Best for: conversational agents where the caller wants a warning before
/// hitting a hard context limit, without committing to a fixed turn budget.
async fn pattern_3_token_monitoring() -> Result<(), Box<dyn std::error::Error>> {
    println!("=== Pattern 3: Token Budget Monitoring ===\n");

    let options = AgentOptions::builder()
        .model("gpt-4o-mini")
        .base_url("https://api.openai.com/v1")
        .api_key(std::env::var("OPENAI_API_KEY").unwrap_or_default())
        .system_prompt("You are a helpful assistant")
        .build()?;

    let agent = Agent::new(options);
    let limit = 4000;

    for turn in 0..5 {
        agent.call(Some(Msg::user(format!("tell me something new, turn {turn}")))).await?;
        let history = agent.memory_snapshot().await;
        let tokens = estimate_tokens(&history);
        println!("turn {turn}: ~{tokens} tokens (limit {limit})");

        if is_approaching_limit(&history, limit, 0.2) {
            println!("  -> approaching the limit, truncating to the last 8 messages");
            let trimmed = truncate_messages(&history, 8, true);
            agent.restore_memory(trimmed).await;
        }
    }

    println!();
    Ok(())
}
