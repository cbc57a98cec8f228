//! # agent-kernel
//!
//! A provider-agnostic agent orchestration runtime: a ReAct reasoning/acting
//! kernel, a multi-provider wire dialect layer, a priority-ordered hook
//! pipeline, and a multi-agent message hub.
//!
//! ## Overview
//!
//! This crate grew out of a local-OpenAI-compatible-server SDK (LM Studio,
//! Ollama, llama.cpp, vLLM). The streaming HTTP transport, the tool-calling
//! loop, and the interrupt/retry machinery are carried forward mostly
//! unchanged; what's new is that the loop is now driven by a typed hook
//! pipeline instead of a fixed callback list, the wire layer understands six
//! OpenAI-compatible-ish dialects instead of one, and several agents can
//! share a conversation through a [`hub::Hub`] or be composed with
//! [`pipeline::sequential`]/[`pipeline::fanout`].
//!
//! ## Key Features
//!
//! - **Dialect-aware transport**: one OpenAI-shaped wire format, six
//!   capability profiles (OpenAI, Anthropic, Gemini, GLM, Dashscope,
//!   DeepSeek) layered on top via [`dialect::Capability`].
//! - **Tool calling**: JSON-schema tool definitions via [`tools::tool`],
//!   grouped and gated through a [`registry::ToolRegistry`].
//! - **Lifecycle hooks**: a priority-ordered pipeline ([`hooks::HookPipeline`])
//!   observing or mutating every edge of the reasoning/acting loop, including
//!   a human-in-the-loop stop signal.
//! - **Multi-agent hub**: scoped broadcast domains over a set of agents
//!   ([`hub::Hub`]).
//! - **Sessions**: save/restore an agent's memory and stopped flag through a
//!   storage-agnostic [`session::SessionBackend`].
//! - **Pipeline combinators**: [`pipeline::sequential`] and
//!   [`pipeline::fanout`] compose several agents without hand-written
//!   `tokio::spawn`/`join_all` boilerplate.
//! - **Context management**: character-based token estimation and history
//!   truncation via [`memory::Memory`].
//! - **Retry logic**: exponential backoff with jitter, separate presets for
//!   model calls and tool invocations, via [`policy::ExecutionConfig`].
//!
//! ## Example
//!
//! ```rust,no_run
//! use agent_kernel::{Agent, AgentOptions};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let options = AgentOptions::builder()
//!         .system_prompt("You are a helpful assistant")
//!         .model("gpt-4o-mini")
//!         .base_url("https://api.openai.com/v1")
//!         .api_key(std::env::var("OPENAI_API_KEY")?)
//!         .build()?;
//!
//!     let agent = Agent::new(options);
//!     let reply = agent.call(Some(agent_kernel::Msg::user("What's 2+2?"))).await?;
//!     println!("{}", reply.extract_text());
//!
//!     Ok(())
//! }
//! ```
//!
//! ## Architecture
//!
//! - **types**: the canonical, provider-agnostic message model (`Msg`,
//!   `ContentBlock`).
//! - **registry** / **tools**: named, schema-described, group-gated tool
//!   definitions.
//! - **memory**: per-agent conversation history plus token-budget helpers.
//! - **hooks**: the priority-ordered lifecycle pipeline.
//! - **dialect** (and **dialect::wire**): the six-capability wire format
//!   layer sitting on one OpenAI-shaped transport.
//! - **agent**: the reasoning/acting kernel that ties the above together
//!   into one conversational turn.
//! - **hub**: multi-agent broadcast domains.
//! - **session**: persistence of an agent's memory across process restarts.
//! - **pipeline**: sequential and fanout composition of several agents.
//! - **policy**: timeout and retry-with-backoff configuration.
//! - **config**: base-URL/model resolution for the six dialect capabilities.
//! - **error**: the two-layer error taxonomy (`TransportError`, `AgentError`)
//!   used across every public API.

mod config;
mod error;
mod hooks;
mod hub;
mod memory;
mod registry;
mod tools;
mod types;

/// The provider dialect layer. Public so integrators needing direct access
/// to wire-shape details (e.g. custom dialect testing, or a transport other
/// than the kernel's own) can reach [`dialect::wire`] and the
/// capability/formatting free functions beyond the crate-root re-exports.
pub mod dialect;

/// The reasoning-acting kernel. Public so integrators can reach
/// [`agent::Agent`] and [`agent::AgentOptions`] directly rather than only
/// through the crate-root re-exports.
pub mod agent;

/// Execution policy: timeouts and retry-with-backoff, with separate presets
/// for model calls and tool invocations. Public so callers can build their
/// own [`policy::ExecutionConfig`] for operations outside the kernel.
pub mod policy;

/// Sequential and fanout composition of several agents' `call()`s.
pub mod pipeline;

/// Save/restore an agent's memory and stopped flag under a string key.
pub mod session;

// ============================================================================
// PUBLIC EXPORTS
// ============================================================================

pub use agent::{Agent, AgentOptions, AgentOptionsBuilder};
pub use config::{default_url, get_base_url, get_model};
pub use dialect::{Capability, GenerateOptions, ToolChoice, ToolChoiceSupport};
pub use error::{AgentError, Result, TransportError};
pub use hooks::{HookDispatchContext, HookEvent, HookHandle, HookPipeline, observe};
pub use hub::{Hub, HubParticipant};
pub use memory::{Memory, estimate_tokens, is_approaching_limit, truncate_messages};
pub use registry::{DEFAULT_GROUP, ToolRegistry, ToolSchema};
pub use session::{InMemorySessionBackend, SessionBackend, SessionDocument, SessionFlags, SessionHandle};
pub use tools::{Tool, ToolBuilder, ToolContext, tool};
pub use types::{
    AudioBlock, BlockKind, ContentBlock, ImageBlock, MediaSource, Msg, MessageRole, TextBlock, ThinkingBlock,
    ToolResultBlock, ToolUseBlock, VideoBlock,
};

// ============================================================================
// CONVENIENCE PRELUDE
// ============================================================================

/// Convenience module bundling the pieces most callers touch.
/// `use agent_kernel::prelude::*;` pulls in the kernel, the message model,
/// the tool builder, hooks, and errors.
pub mod prelude {
    pub use crate::{
        Agent, AgentError, AgentOptions, AgentOptionsBuilder, ContentBlock, HookDispatchContext, HookEvent,
        HookPipeline, Hub, Msg, MessageRole, Result, TextBlock, Tool, ToolUseBlock, tool,
    };
}
