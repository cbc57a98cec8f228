//! The reasoning-acting kernel: the ReAct state machine that drives one
//! model-and-tools conversation turn by turn.
//!
//! A streaming HTTP transport plus an auto-execute loop around it, with an
//! `Arc<AtomicBool>` interrupt flag. The loop is driven by the seven-edge
//! hook pipeline rather than an ad hoc callback list, and every mutable
//! piece of state lives behind a lock so an `Arc<Agent>` can be shared with
//! a [`crate::hub::Hub`] or the pipeline combinators.

use crate::config;
use crate::dialect::wire::{OpenAIChunk, OpenAIRequest};
use crate::dialect::{
    apply_options, apply_quirks, apply_tool_choice, apply_tools, format_multi_agent, format_single_agent,
    parse_chunk, Capability, ChunkMerger, GenerateOptions, ToolChoice,
};
use crate::error::{AgentError, Result};
use crate::hooks::{HookChain, HookDispatchContext, HookEvent, HookHandle, HookPipeline};
use crate::hub::HubLink;
use crate::memory::Memory;
use crate::policy::{retry_with_backoff, ExecutionConfig};
use crate::registry::ToolRegistry;
use crate::tools::{tool, Tool, ToolContext};
use crate::types::{ContentBlock, Msg, ToolUseBlock};
use futures::stream::{Stream, StreamExt};
use serde_json::Value;
use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;

/// Name of the synthetic tool injected for the duration of one
/// `call_structured()` invocation; stripped from memory and unregistered
/// again once that call returns (§4.9: "structured output rides the tool
/// channel, never leaks outside the call that asked for it").
const STRUCTURED_TOOL_NAME: &str = "generate_structured_response";

/// Immutable configuration for one [`Agent`]. Build with
/// [`AgentOptions::builder`].
#[derive(Debug, Clone)]
pub struct AgentOptions {
    pub name: Option<String>,
    pub model: String,
    pub base_url: String,
    pub api_key: Option<String>,
    pub system_prompt: Option<String>,
    pub capability: Option<Capability>,
    pub generate_options: GenerateOptions,
    pub tool_choice: ToolChoice,
    /// Whether memory should be flattened through [`format_multi_agent`]
    /// instead of [`format_single_agent`] before each model call.
    pub multi_agent: bool,
    /// Cap on REASONING→ACTING round-trips within one `call()`, per §4.6.
    pub max_iterations: u32,
    pub model_policy: ExecutionConfig,
    pub tool_policy: ExecutionConfig,
    /// Overall read timeout given to the underlying `reqwest::Client`, a
    /// floor above `model_policy.timeout` so a slow-but-alive stream isn't
    /// severed by the HTTP client before the policy's own per-attempt
    /// timeout has a chance to fire.
    pub connect_timeout: Duration,
}

impl AgentOptions {
    pub fn builder() -> AgentOptionsBuilder {
        AgentOptionsBuilder::default()
    }
}

/// Fluent builder for [`AgentOptions`], widened with the fields the dialect,
/// hook, and policy layers introduce.
#[derive(Debug, Clone)]
pub struct AgentOptionsBuilder {
    name: Option<String>,
    model: Option<String>,
    base_url: Option<String>,
    api_key: Option<String>,
    system_prompt: Option<String>,
    capability: Option<Capability>,
    generate_options: GenerateOptions,
    tool_choice: ToolChoice,
    multi_agent: bool,
    max_iterations: u32,
    model_policy: ExecutionConfig,
    tool_policy: ExecutionConfig,
    connect_timeout: Duration,
}

impl Default for AgentOptionsBuilder {
    fn default() -> Self {
        Self {
            name: None,
            model: None,
            base_url: None,
            api_key: None,
            system_prompt: None,
            capability: None,
            generate_options: GenerateOptions::default(),
            tool_choice: ToolChoice::Auto,
            multi_agent: false,
            max_iterations: 10,
            model_policy: ExecutionConfig::model_defaults(),
            tool_policy: ExecutionConfig::tool_defaults(),
            connect_timeout: Duration::from_secs(120),
        }
    }
}

impl AgentOptionsBuilder {
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    pub fn base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = Some(base_url.into());
        self
    }

    pub fn api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    pub fn system_prompt(mut self, system_prompt: impl Into<String>) -> Self {
        self.system_prompt = Some(system_prompt.into());
        self
    }

    pub fn capability(mut self, capability: Capability) -> Self {
        self.capability = Some(capability);
        self
    }

    pub fn generate_options(mut self, options: GenerateOptions) -> Self {
        self.generate_options = options;
        self
    }

    pub fn tool_choice(mut self, choice: ToolChoice) -> Self {
        self.tool_choice = choice;
        self
    }

    pub fn multi_agent(mut self, multi_agent: bool) -> Self {
        self.multi_agent = multi_agent;
        self
    }

    pub fn max_iterations(mut self, max_iterations: u32) -> Self {
        self.max_iterations = max_iterations.max(1);
        self
    }

    pub fn model_policy(mut self, policy: ExecutionConfig) -> Self {
        self.model_policy = policy;
        self
    }

    pub fn tool_policy(mut self, policy: ExecutionConfig) -> Self {
        self.tool_policy = policy;
        self
    }

    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Resolve `model`/`base_url` (env var > explicit argument > capability
    /// default, per [`config`]) and produce [`AgentOptions`]. Fails if no
    /// model was given and `AGENT_KERNEL_MODEL` isn't set either.
    pub fn build(self) -> Result<AgentOptions> {
        let model = config::get_model(self.model.as_deref(), true)
            .ok_or_else(|| AgentError::invalid_input("model must be set via .model(...) or AGENT_KERNEL_MODEL"))?;
        let base_url = self
            .base_url
            .unwrap_or_else(|| config::get_base_url(self.capability, None));

        Ok(AgentOptions {
            name: self.name,
            model,
            base_url,
            api_key: self.api_key,
            system_prompt: self.system_prompt,
            capability: self.capability,
            generate_options: self.generate_options,
            tool_choice: self.tool_choice,
            multi_agent: self.multi_agent,
            max_iterations: self.max_iterations,
            model_policy: self.model_policy,
            tool_policy: self.tool_policy,
            connect_timeout: self.connect_timeout,
        })
    }
}

/// One agent: its own memory, tool registry, and hook pipeline, driven
/// through the REASONING/ACTING loop by [`Agent::call`]. Every public method
/// takes `&self` so an `Arc<Agent>` can be shared across a hub or a pipeline
/// combinator without an outer lock.
pub struct Agent {
    options: AgentOptions,
    memory: RwLock<Memory>,
    tools: RwLock<ToolRegistry>,
    hooks: RwLock<HookPipeline>,
    http_client: reqwest::Client,
    interrupted: Arc<AtomicBool>,
    stopped: AtomicBool,
    hub_link: RwLock<Option<HubLink>>,
}

enum RunOutcome {
    Message(Msg),
    Structured(Value),
}

impl Agent {
    pub fn new(options: AgentOptions) -> Self {
        let mut memory = Memory::new();
        if let Some(prompt) = &options.system_prompt {
            memory.append(Msg::system(prompt.clone()));
        }
        let http_client = reqwest::Client::builder()
            .timeout(options.connect_timeout)
            .build()
            .expect("building the HTTP client from static options should never fail");

        Self {
            options,
            memory: RwLock::new(memory),
            tools: RwLock::new(ToolRegistry::new()),
            hooks: RwLock::new(HookPipeline::new()),
            http_client,
            interrupted: Arc::new(AtomicBool::new(false)),
            stopped: AtomicBool::new(false),
            hub_link: RwLock::new(None),
        }
    }

    pub fn name(&self) -> Option<&str> {
        self.options.name.as_deref()
    }

    pub fn model(&self) -> &str {
        &self.options.model
    }

    /// Flip the interrupt flag. Idempotent, cheap, and safe to call from any
    /// thread while `call()` is in flight elsewhere. Cleared again
    /// automatically at the start of the next `call()`.
    pub fn interrupt(&self) {
        self.interrupted.store(true, Ordering::SeqCst);
    }

    pub async fn register_tool(&self, tool: Tool) -> Result<()> {
        self.tools.write().await.register(tool)
    }

    pub async fn register_tool_in_group(&self, tool: Tool, group: impl Into<String>) -> Result<()> {
        self.tools.write().await.register_in_group(tool, group)
    }

    pub async fn create_tool_group(&self, name: impl Into<String>, description: impl Into<String>, active: bool) {
        self.tools.write().await.create_group(name, description, active);
    }

    pub async fn set_active_tool_groups(&self, names: &[&str]) {
        self.tools.write().await.set_active_groups(names);
    }

    pub async fn tools_len(&self) -> usize {
        self.tools.read().await.len()
    }

    pub async fn add_hook<F, Fut>(&self, priority: i64, handler: F) -> HookHandle
    where
        F: Fn(HookEvent, HookDispatchContext) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = HookEvent> + Send + 'static,
    {
        self.hooks.write().await.add_hook(priority, handler)
    }

    pub async fn remove_hook(&self, handle: HookHandle) {
        self.hooks.write().await.remove_hook(handle);
    }

    pub async fn memory_snapshot(&self) -> Vec<Msg> {
        self.memory.read().await.snapshot()
    }

    pub async fn memory_len(&self) -> usize {
        self.memory.read().await.len()
    }

    pub async fn restore_memory(&self, messages: Vec<Msg>) {
        self.memory.write().await.restore(messages);
    }

    pub async fn clear_memory(&self) {
        self.memory.write().await.clear();
    }

    pub async fn is_stopped(&self) -> bool {
        self.stopped.load(Ordering::SeqCst)
    }

    /// Set the HITL-stopped flag directly, e.g. after restoring a session.
    /// Synchronous: it's a plain atomic, not memory-lock-guarded.
    pub fn set_stopped(&self, stopped: bool) {
        self.stopped.store(stopped, Ordering::SeqCst);
    }

    pub(crate) async fn attach_hub(&self, link: HubLink) {
        *self.hub_link.write().await = Some(link);
    }

    pub(crate) async fn detach_hub(&self) {
        *self.hub_link.write().await = None;
    }

    /// Append an externally-sourced message — a hub broadcast or
    /// announcement — directly to memory, bypassing the reasoning loop.
    pub async fn receive_external(&self, msg: Msg) {
        self.memory.write().await.append(msg);
    }

    /// Run one full call: append `user_msg` (if any), then loop
    /// REASONING→ACTING until the model stops requesting tools, a hook
    /// requests an HITL pause, or `max_iterations` is exceeded. Returns the
    /// final assistant [`Msg`].
    pub async fn call(&self, user_msg: Option<Msg>) -> Result<Msg> {
        match self.run(user_msg, None).await? {
            RunOutcome::Message(msg) => Ok(msg),
            RunOutcome::Structured(_) => unreachable!("run() without a schema never returns Structured"),
        }
    }

    /// Run one full call exactly like [`Agent::call`], but require the model
    /// to finish by invoking a synthetic tool matching `schema` and return
    /// its arguments directly instead of a `Msg`. The synthetic tool is
    /// registered for the duration of this call only.
    pub async fn call_structured(&self, user_msg: Option<Msg>, schema: Value) -> Result<Value> {
        match self.run(user_msg, Some(schema)).await? {
            RunOutcome::Structured(value) => Ok(value),
            RunOutcome::Message(msg) => {
                // The model finished without ever calling the structured tool
                // (e.g. it gave up after max_iterations). Surface its text so
                // the caller at least sees why, rather than a silently empty value.
                Err(AgentError::parse(format!(
                    "model finished without producing a structured result: {}",
                    msg.extract_text()
                )))
            }
        }
    }

    async fn run(&self, user_msg: Option<Msg>, structured_schema: Option<Value>) -> Result<RunOutcome> {
        self.interrupted.store(false, Ordering::SeqCst);

        let hook_chain = self.hooks.read().await.snapshot();
        let ctx = HookDispatchContext::new();
        hook_chain.dispatch(HookEvent::PreCall, &ctx).await;

        if let Some(msg) = user_msg {
            self.memory.write().await.append(msg);
        }

        let mut injected_structured_tool = false;
        if let Some(schema) = &structured_schema {
            let mut tools = self.tools.write().await;
            if tools.get(STRUCTURED_TOOL_NAME).is_none() {
                tools.register(
                    tool(
                        STRUCTURED_TOOL_NAME,
                        "Call this exactly once, with the final result matching the requested schema, to finish.",
                    )
                    .schema(schema.clone())
                    .build(|args| async move { Ok(args) }),
                )?;
                injected_structured_tool = true;
            }
        }

        let outcome = self.run_loop(&hook_chain, &ctx, structured_schema.is_some()).await;

        if injected_structured_tool {
            self.tools.write().await.unregister(STRUCTURED_TOOL_NAME);
        }

        let outcome = outcome?;

        if let RunOutcome::Message(final_msg) = &outcome {
            hook_chain
                .dispatch(
                    HookEvent::PostCall {
                        final_message: final_msg.clone(),
                    },
                    &ctx,
                )
                .await;

            let link = self.hub_link.read().await.clone();
            if let Some(link) = link {
                let named = final_msg
                    .clone()
                    .with_name(self.options.name.clone().unwrap_or_default());
                link.auto_deliver(named).await;
            }
        }

        Ok(outcome)
    }

    async fn run_loop(&self, hook_chain: &HookChain, ctx: &HookDispatchContext, want_structured: bool) -> Result<RunOutcome> {
        let mut iteration: u32 = 0;

        loop {
            if self.interrupted.load(Ordering::SeqCst) {
                return Err(AgentError::Interrupted);
            }

            let input_messages = self.memory.read().await.snapshot();
            let pre = hook_chain
                .dispatch(HookEvent::PreReasoning { input_messages }, ctx)
                .await;
            let input_messages = match pre {
                HookEvent::PreReasoning { input_messages } => input_messages,
                _ => unreachable!("dispatching PreReasoning must yield PreReasoning back"),
            };

            let reasoning_message = self.reason(&input_messages, hook_chain, ctx).await?;

            if self.interrupted.load(Ordering::SeqCst) {
                return Err(AgentError::Interrupted);
            }

            let post = hook_chain
                .dispatch(
                    HookEvent::PostReasoning {
                        reasoning_message,
                    },
                    ctx,
                )
                .await;
            let reasoning_message = match post {
                HookEvent::PostReasoning { reasoning_message } => reasoning_message,
                _ => unreachable!("dispatching PostReasoning must yield PostReasoning back"),
            };

            let tool_uses: Vec<ToolUseBlock> = reasoning_message.tool_uses().into_iter().cloned().collect();

            if want_structured {
                if let Some(call) = tool_uses.iter().find(|t| t.name == STRUCTURED_TOOL_NAME) {
                    let value = call.input.clone();
                    let call_id = call.id.clone();
                    let mut stripped_msg = reasoning_message.clone();
                    stripped_msg.content.retain(|b| {
                        !matches!(b, ContentBlock::ToolUse(t) if t.id == call_id && t.name == STRUCTURED_TOOL_NAME)
                    });
                    self.memory.write().await.append(stripped_msg);
                    return Ok(RunOutcome::Structured(value));
                }
            }

            self.memory.write().await.append(reasoning_message.clone());

            if ctx.stop_requested() {
                self.stopped.store(true, Ordering::SeqCst);
                return Ok(RunOutcome::Message(reasoning_message));
            }

            if tool_uses.is_empty() {
                self.stopped.store(false, Ordering::SeqCst);
                return Ok(RunOutcome::Message(reasoning_message));
            }

            iteration += 1;
            if iteration > self.options.max_iterations {
                let mut msg = reasoning_message;
                msg.metadata.insert("finish_reason".to_string(), serde_json::json!("max_iterations"));
                return Ok(RunOutcome::Message(msg));
            }

            for tool_use in tool_uses {
                if self.interrupted.load(Ordering::SeqCst) {
                    return Err(AgentError::Interrupted);
                }

                let pre_act = hook_chain.dispatch(HookEvent::PreActing { tool_use }, ctx).await;
                let tool_use = match pre_act {
                    HookEvent::PreActing { tool_use } => tool_use,
                    _ => unreachable!("dispatching PreActing must yield PreActing back"),
                };

                let result = {
                    let registry = self.tools.read().await;
                    let tool_ctx = ToolContext::with_cancellation(tool_use.id.clone(), self.interrupted.clone());
                    let name = tool_use.name.clone();
                    let input = tool_use.input.clone();
                    retry_with_backoff(&self.options.tool_policy, || {
                        let registry = &registry;
                        let tool_ctx = tool_ctx.clone();
                        let name = name.clone();
                        let input = input.clone();
                        async move { Ok(registry.invoke(&name, input, &tool_ctx).await) }
                    })
                    .await?
                };

                let post_act = hook_chain
                    .dispatch(HookEvent::PostActing { tool_use, result }, ctx)
                    .await;
                let result = match post_act {
                    HookEvent::PostActing { result, .. } => result,
                    _ => unreachable!("dispatching PostActing must yield PostActing back"),
                };

                self.memory
                    .write()
                    .await
                    .append(Msg::tool(vec![ContentBlock::ToolResult(result)]));
            }
        }
    }

    fn capability(&self) -> Capability {
        self.options
            .capability
            .unwrap_or_else(|| Capability::detect(&self.options.base_url, &self.options.model))
    }

    async fn reason(&self, input_messages: &[Msg], hook_chain: &HookChain, ctx: &HookDispatchContext) -> Result<Msg> {
        let capability = self.capability();
        let active_tools = self.tools.read().await.active_schemas();

        let mut messages = if self.options.multi_agent {
            format_multi_agent(input_messages)
        } else {
            format_single_agent(input_messages)
        };
        apply_quirks(capability, &mut messages, !active_tools.is_empty());

        let mut request = OpenAIRequest::new(self.options.model.clone(), messages);
        apply_options(&mut request, &self.options.model, &self.options.generate_options);
        apply_tools(&mut request, &active_tools);
        apply_tool_choice(&mut request, capability, &self.options.tool_choice, !active_tools.is_empty());

        retry_with_backoff(&self.options.model_policy, || self.send_request(&request, hook_chain, ctx)).await
    }

    async fn send_request(&self, request: &OpenAIRequest, hook_chain: &HookChain, ctx: &HookDispatchContext) -> Result<Msg> {
        if self.interrupted.load(Ordering::SeqCst) {
            return Err(AgentError::Interrupted);
        }

        let url = format!("{}/chat/completions", self.options.base_url.trim_end_matches('/'));
        let mut req = self.http_client.post(&url).json(request);
        if let Some(api_key) = &self.options.api_key {
            req = req.header("Authorization", format!("Bearer {api_key}"));
        }

        let response = req.send().await.map_err(|e| AgentError::provider(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_else(|_| "<no response body>".to_string());
            return Err(AgentError::provider(format!("{status}: {body}")));
        }

        let mut merger = ChunkMerger::new();
        let mut stream = parse_sse_stream(response);

        while let Some(chunk_result) = stream.next().await {
            if self.interrupted.load(Ordering::SeqCst) {
                return Err(AgentError::Interrupted);
            }
            let chunk = chunk_result?;
            if let Some(partial) = parse_chunk(&chunk) {
                let text = partial.extract_text();
                if !text.is_empty() {
                    hook_chain.dispatch(HookEvent::ReasoningChunk { chunk: text }, ctx).await;
                }
                merger.push(partial);
            }
        }

        merger.flush()
    }
}

/// Hand-rolled SSE line scanner: split on `data: ` prefixes, skip the
/// `data: [DONE]` sentinel, decode each remaining line as one chunk.
fn parse_sse_stream(response: reqwest::Response) -> Pin<Box<dyn Stream<Item = Result<OpenAIChunk>> + Send>> {
    let stream = response.bytes_stream().filter_map(|result| async move {
        let bytes = match result {
            Ok(b) => b,
            Err(e) => return Some(Err(AgentError::provider(e.to_string()))),
        };
        let text = String::from_utf8_lossy(&bytes).into_owned();
        for line in text.lines() {
            let Some(data) = line.strip_prefix("data: ") else {
                continue;
            };
            if data == "[DONE]" {
                continue;
            }
            return Some(
                serde_json::from_str::<OpenAIChunk>(data).map_err(|e| AgentError::parse(format!("chunk: {e}"))),
            );
        }
        None
    });
    Box::pin(stream)
}
