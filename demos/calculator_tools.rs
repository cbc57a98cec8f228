//! Calculator with Tools Example
//!
//! Demonstrates registering tools on an `Agent` so the model can call them;
//! the reasoning/acting loop invokes the tool and feeds the result back to
//! the model automatically, no manual dispatch required.

use agent_kernel::{Agent, AgentOptions, Msg, tool};
use serde_json::json;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let add_tool = tool("add", "Add two numbers")
        .param("a", "number")
        .param("b", "number")
        .build(|args| async move {
            let a = args["a"].as_f64().unwrap_or(0.0);
            let b = args["b"].as_f64().unwrap_or(0.0);
            Ok(json!({"result": a + b}))
        });

    let subtract_tool = tool("subtract", "Subtract two numbers")
        .param("a", "number")
        .param("b", "number")
        .build(|args| async move {
            let a = args["a"].as_f64().unwrap_or(0.0);
            let b = args["b"].as_f64().unwrap_or(0.0);
            Ok(json!({"result": a - b}))
        });

    let multiply_tool = tool("multiply", "Multiply two numbers")
        .param("a", "number")
        .param("b", "number")
        .build(|args| async move {
            let a = args["a"].as_f64().unwrap_or(0.0);
            let b = args["b"].as_f64().unwrap_or(0.0);
            Ok(json!({"result": a * b}))
        });

    let divide_tool = tool("divide", "Divide two numbers")
        .param("a", "number")
        .param("b", "number")
        .build(|args| async move {
            let a = args["a"].as_f64().unwrap_or(0.0);
            let b = args["b"].as_f64().unwrap_or(0.0);
            if b == 0.0 {
                return Ok(json!({"error": "Cannot divide by zero"}));
            }
            Ok(json!({"result": a / b}))
        });

    let options = AgentOptions::builder()
        .system_prompt(
            "You are a helpful calculator assistant. \
             Use the provided tools to perform calculations. \
             Always show your work and explain the result.",
        )
        .model("gpt-4o-mini")
        .base_url("https://api.openai.com/v1")
        .api_key(std::env::var("OPENAI_API_KEY").unwrap_or_default())
        .build()?;

    let agent = Agent::new(options);
    agent.register_tool(add_tool).await?;
    agent.register_tool(subtract_tool).await?;
    agent.register_tool(multiply_tool).await?;
    agent.register_tool(divide_tool).await?;

    let queries = vec![
        "What is 25 plus 17?",
        "Calculate 144 divided by 12",
        "What's 7 times 8, then add 5?",
    ];

    println!("{}", "=".repeat(70));
    println!("CALCULATOR TOOLS EXAMPLE");
    println!("{}", "=".repeat(70));
    println!();

    for query in queries {
        println!("User: {}", query);
        println!("{}", "-".repeat(50));

        // Clear memory between queries so each one starts from a clean slate;
        // the tool registry stays put, only the conversation history resets.
        agent.clear_memory().await;
        let reply = agent.call(Some(Msg::user(query))).await?;
        println!("Assistant: {}", reply.extract_text());
        println!();
    }

    println!("{}", "=".repeat(70));
    println!("Example complete!");

    Ok(())
}
