//! Multi-Tool Agent Example
//!
//! Demonstrates grouping tools and toggling groups on and off at runtime —
//! a "default" group that's always active, plus an "admin" group that starts
//! inactive and is enabled only when the caller decides the agent should be
//! allowed to use it.

use agent_kernel::{Agent, AgentOptions, Msg, tool};
use serde_json::json;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    println!("{}", "=".repeat(70));
    println!("MULTI-TOOL AGENT EXAMPLE");
    println!("{}", "=".repeat(70));
    println!();

    let options = AgentOptions::builder()
        .system_prompt("You are an assistant that can look things up and, when permitted, manage files.")
        .model("gpt-4o-mini")
        .base_url("https://api.openai.com/v1")
        .api_key(std::env::var("OPENAI_API_KEY").unwrap_or_default())
        .build()?;

    let agent = Agent::new(options);

    let search_tool = tool("search_docs", "Search internal documentation")
        .param("query", "string")
        .build(|args| async move {
            let query = args["query"].as_str().unwrap_or_default();
            Ok(json!({"results": [format!("doc result for '{query}'")]}))
        });
    agent.register_tool(search_tool).await?;

    agent.create_tool_group("admin", "destructive or privileged operations", false);
    let delete_file_tool = tool("delete_file", "Delete a file by path")
        .param("path", "string")
        .build(|args| async move {
            let path = args["path"].as_str().unwrap_or_default();
            Ok(json!({"deleted": path}))
        });
    agent.register_tool_in_group(delete_file_tool, "admin").await?;

    println!("Tools registered: {}", agent.tools_len().await);

    println!("\nAsking the agent to delete a file without admin privileges enabled...");
    let reply = agent.call(Some(Msg::user("Please delete the file /tmp/scratch.txt"))).await?;
    println!("Assistant: {}", reply.extract_text());

    println!("\nEnabling the admin group and retrying...");
    agent.set_active_tool_groups(&["admin"]).await;
    agent.clear_memory().await;
    let reply = agent.call(Some(Msg::user("Please delete the file /tmp/scratch.txt"))).await?;
    println!("Assistant: {}", reply.extract_text());

    println!("\n{}", "=".repeat(70));
    println!("Example complete!");

    Ok(())
}
