//! The hook pipeline: priority-ordered interceptors that observe and mutate
//! the ReAct loop at seven fixed edges, one call of `on_event` each, and all
//! of them run every time — there's no "first decision wins" short-circuit.
//! Ties in priority break by insertion order, and mutations an earlier hook
//! makes are visible to later hooks in the same dispatch.
//!
//! Modeled on the `layer0::hook::Hook` trait shape: a handler declares the
//! points it cares about, the kernel drives it with a context/event value,
//! and an error from a handler is logged and swallowed rather than aborting
//! the call — only an explicit `stop_agent()` signal can halt the loop.

use crate::types::{Msg, ToolResultBlock, ToolUseBlock};
use serde_json::Value;
use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// The seven fixed edges of one `call()`, in firing order.
#[derive(Debug, Clone)]
pub enum HookEvent {
    /// Once when `call()` starts (outermost).
    PreCall,
    /// Before each model invocation. A handler may replace `input_messages`.
    PreReasoning { input_messages: Vec<Msg> },
    /// Once per streaming delta from the dialect layer.
    ReasoningChunk { chunk: String },
    /// After a complete model reply is parsed. A handler may call
    /// [`HookDispatchContext::stop_agent`] to request an HITL pause.
    PostReasoning { reasoning_message: Msg },
    /// Once per tool call about to be executed.
    PreActing { tool_use: ToolUseBlock },
    /// Once per tool call after execution.
    PostActing {
        tool_use: ToolUseBlock,
        result: ToolResultBlock,
    },
    /// Once when `call()` returns.
    PostCall { final_message: Msg },
}

impl HookEvent {
    fn label(&self) -> &'static str {
        match self {
            HookEvent::PreCall => "pre_call",
            HookEvent::PreReasoning { .. } => "pre_reasoning",
            HookEvent::ReasoningChunk { .. } => "reasoning_chunk",
            HookEvent::PostReasoning { .. } => "post_reasoning",
            HookEvent::PreActing { .. } => "pre_acting",
            HookEvent::PostActing { .. } => "post_acting",
            HookEvent::PostCall { .. } => "post_call",
        }
    }
}

/// Passed to every handler alongside the event. `stop_agent()` is only
/// meaningful on `PostReasoning`; calling it elsewhere is a no-op as far as
/// the kernel is concerned; the kernel checks the flag only after dispatching
/// `PostReasoning`.
#[derive(Clone, Default)]
pub struct HookDispatchContext {
    stop_requested: Arc<AtomicBool>,
}

impl HookDispatchContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn stop_agent(&self) {
        self.stop_requested.store(true, Ordering::SeqCst);
    }

    pub fn stop_requested(&self) -> bool {
        self.stop_requested.load(Ordering::SeqCst)
    }
}

/// A hook handler: takes the current event and dispatch context, returns the
/// (possibly mutated) event. Boxed/`Arc`-wrapped for the same reason
/// `ToolHandler` is: uniform storage of differently-typed closures.
pub type HookHandler =
    Arc<dyn Fn(HookEvent, HookDispatchContext) -> Pin<Box<dyn Future<Output = HookEvent> + Send>> + Send + Sync>;

/// An opaque handle returned by [`HookPipeline::add_hook`], used to
/// [`HookPipeline::remove_hook`] the same registration later.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct HookHandle(u64);

struct Registration {
    handle: HookHandle,
    priority: i64,
    insertion_order: u64,
    handler: HookHandler,
}

/// Priority-ordered collection of hooks. `add_hook`/`remove_hook` is the only
/// registration surface; dispatch always runs every currently-registered
/// hook, sorted ascending by priority with stable ties.
#[derive(Default)]
pub struct HookPipeline {
    registrations: Vec<Registration>,
    next_handle: u64,
    next_insertion_order: u64,
}

impl HookPipeline {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a handler at the given priority (lower runs earlier). Ties
    /// break by registration order.
    pub fn add_hook<F, Fut>(&mut self, priority: i64, handler: F) -> HookHandle
    where
        F: Fn(HookEvent, HookDispatchContext) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = HookEvent> + Send + 'static,
    {
        let handle = HookHandle(self.next_handle);
        self.next_handle += 1;
        let insertion_order = self.next_insertion_order;
        self.next_insertion_order += 1;
        self.registrations.push(Registration {
            handle,
            priority,
            insertion_order,
            handler: Arc::new(move |event, ctx| Box::pin(handler(event, ctx))),
        });
        handle
    }

    pub fn remove_hook(&mut self, handle: HookHandle) {
        self.registrations.retain(|r| r.handle != handle);
    }

    pub fn len(&self) -> usize {
        self.registrations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.registrations.is_empty()
    }

    /// Snapshot the current registrations, sorted by priority ascending with
    /// insertion-order ties, for use across one `call()`. In-flight
    /// `add_hook`/`remove_hook` calls made while a call is running never
    /// affect that call's chain.
    pub fn snapshot(&self) -> HookChain {
        let mut handlers: Vec<&Registration> = self.registrations.iter().collect();
        handlers.sort_by(|a, b| a.priority.cmp(&b.priority).then(a.insertion_order.cmp(&b.insertion_order)));
        HookChain {
            handlers: handlers.into_iter().map(|r| r.handler.clone()).collect(),
        }
    }
}

/// A priority-sorted, insertion-order-stable snapshot of the hooks active for
/// one `call()`. Every handler in the chain runs for every event; mutations
/// by an earlier handler are visible to later ones.
#[derive(Clone, Default)]
pub struct HookChain {
    handlers: Vec<HookHandler>,
}

impl HookChain {
    /// Run every hook in order against `event`, threading mutations through,
    /// and return the final event. `ctx` carries the `stop_agent()` signal
    /// the kernel checks after a `PostReasoning` dispatch.
    pub async fn dispatch(&self, mut event: HookEvent, ctx: &HookDispatchContext) -> HookEvent {
        for handler in &self.handlers {
            let label = event.label();
            event = handler(event, ctx.clone()).await;
            tracing::trace!(hook_point = label, "hook dispatched");
        }
        event
    }
}

/// Helper for handlers that only care about reading the event's payload, not
/// mutating it: wraps a sync closure returning `()` as a pass-through hook.
pub fn observe<F>(f: F) -> impl Fn(HookEvent, HookDispatchContext) -> Pin<Box<dyn Future<Output = HookEvent> + Send>> + Send + Sync
where
    F: Fn(&HookEvent, &HookDispatchContext) + Send + Sync + 'static,
{
    move |event, ctx| {
        f(&event, &ctx);
        Box::pin(async move { event })
    }
}
