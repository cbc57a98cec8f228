//! Advanced Patterns — Pipeline Combinators and Execution Policy
//!
//! Demonstrates composing several agents without hand-written
//! `tokio::spawn`/`join_all` boilerplate (`pipeline::sequential`,
//! `pipeline::fanout`), and tuning the retry/backoff policy applied to a
//! single agent's model and tool calls.

use agent_kernel::{Agent, AgentOptions, Msg, pipeline, policy::ExecutionConfig};
use std::sync::Arc;
use std::time::Duration;

fn build_agent(name: &str, system_prompt: &str) -> Arc<Agent> {
    let options = AgentOptions::builder()
        .name(name)
        .system_prompt(system_prompt)
        .model("gpt-4o-mini")
        .base_url("https://api.openai.com/v1")
        .api_key(std::env::var("OPENAI_API_KEY").unwrap_or_default())
        .model_policy(
            ExecutionConfig::model_defaults()
                .with_timeout(Duration::from_secs(20))
                .with_max_attempts(2),
        )
        .build()
        .expect("valid agent options");
    Arc::new(Agent::new(options))
}

/// A draft passes through an outline agent, then a prose agent, each seeing
/// only the previous agent's output.
async fn sequential_example() -> Result<(), Box<dyn std::error::Error>> {
    println!("{}", "=".repeat(70));
    println!("Example 1: Sequential pipeline (outline -> prose)");
    println!("{}", "=".repeat(70));

    let outliner = build_agent("outliner", "Produce a three-bullet outline for the given topic.");
    let writer = build_agent("writer", "Expand the given outline into two short paragraphs.");

    let stages = vec![outliner, writer];
    let outputs = pipeline::sequential(&stages, Msg::user("the history of tea")).await?;

    for (i, msg) in outputs.iter().enumerate() {
        println!("stage {i}: {}", msg.extract_text());
    }
    Ok(())
}

/// Three independent reviewers look at the same input concurrently; all
/// three must finish before the fanout returns.
async fn fanout_example() -> Result<(), Box<dyn std::error::Error>> {
    println!("\n{}", "=".repeat(70));
    println!("Example 2: Fanout (three independent reviewers)");
    println!("{}", "=".repeat(70));

    let reviewers = vec![
        build_agent("clarity_reviewer", "Rate the clarity of the given text from 1-10 and say why."),
        build_agent("tone_reviewer", "Rate the tone of the given text from 1-10 and say why."),
        build_agent("accuracy_reviewer", "Flag any factual concerns in the given text."),
    ];

    let input = Msg::user("Tea was first cultivated in ancient China and later spread along trade routes.");
    let reviews = pipeline::fanout(&reviewers, input).await?;

    for review in reviews {
        println!("{}", review.extract_text());
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    sequential_example().await?;
    fanout_example().await?;
    Ok(())
}
