//! Structured Output Example
//!
//! Demonstrates `Agent::call_structured`: instead of parsing free text, the
//! kernel registers a synthetic tool shaped by the caller's JSON schema for
//! the duration of the call, asks the model to invoke it exactly once, and
//! hands back the validated JSON value.

use agent_kernel::{Agent, AgentOptions, Msg};
use serde_json::json;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    println!("{}", "=".repeat(70));
    println!("STRUCTURED OUTPUT EXAMPLE");
    println!("{}", "=".repeat(70));
    println!();

    let options = AgentOptions::builder()
        .system_prompt("You extract structured data from user requests.")
        .model("gpt-4o-mini")
        .base_url("https://api.openai.com/v1")
        .api_key(std::env::var("OPENAI_API_KEY").unwrap_or_default())
        .build()?;

    let agent = Agent::new(options);

    let schema = json!({
        "type": "object",
        "properties": {
            "city": {"type": "string"},
            "date": {"type": "string", "description": "ISO-8601 date"},
            "party_size": {"type": "integer"}
        },
        "required": ["city", "date", "party_size"]
    });

    let reply = agent
        .call_structured(
            Some(Msg::user("Book a table for 4 in Lisbon on the 3rd of next month")),
            schema,
        )
        .await?;

    println!("Structured result:\n{}", serde_json::to_string_pretty(&reply)?);

    println!("\n{}", "=".repeat(70));
    println!("Example complete!");

    Ok(())
}
