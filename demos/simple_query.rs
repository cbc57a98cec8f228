//! Simple query example
//!
//! Demonstrates the minimal path: build an `Agent`, send one message, read
//! the reply back.

use agent_kernel::{Agent, AgentOptions, Msg};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let options = AgentOptions::builder()
        .system_prompt("You are a helpful assistant")
        .model("gpt-4o-mini")
        .base_url("https://api.openai.com/v1")
        .api_key(std::env::var("OPENAI_API_KEY").unwrap_or_default())
        .build()?;

    let agent = Agent::new(options);

    println!("Sending query to model...\n");

    let reply = agent
        .call(Some(Msg::user("What's the capital of France? Please be brief.")))
        .await?;

    println!("Response: {}", reply.extract_text());
    println!("\nQuery complete!");

    Ok(())
}
