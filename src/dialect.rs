//! The provider dialect layer: one OpenAI-shaped wire transport shared by all
//! six capabilities, with capability-configured behavior layered on top
//! instead of a formatter subclass per provider — the way `querymt`'s
//! `deepseek`/`alibaba` provider crates share one `qmt_openai` wire helper
//! rather than hand-rolling their own.

pub mod wire;

use crate::error::{AgentError, Result};
use crate::registry::ToolSchema;
use crate::types::{BlockKind, ContentBlock, MediaSource, Msg, MessageRole, TextBlock, ThinkingBlock, ToolUseBlock};
use serde_json::Value;
use wire::{OpenAIChunk, OpenAIContent, OpenAIContentPart, OpenAIMessage, OpenAIRequest, OpenAIToolCall};

/// The six wire dialects the spec recognizes. Unknown/unrecognized base
/// URLs or model names fall back to [`Capability::Openai`], which supports
/// every tool-choice mode and strict schemas — the most permissive default.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Capability {
    Openai,
    Anthropic,
    Gemini,
    Glm,
    Dashscope,
    Deepseek,
}

/// What a capability supports for the `tool_choice` wire field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ToolChoiceSupport {
    pub none: bool,
    pub required: bool,
    pub specific: bool,
}

impl Capability {
    /// Detect from a base URL substring match first, then a model-name
    /// prefix/substring match. Defaults to OpenAI when nothing matches.
    pub fn detect(base_url: &str, model: &str) -> Self {
        let url = base_url.to_lowercase();
        if url.contains("anthropic.com") {
            return Capability::Anthropic;
        }
        if url.contains("generativelanguage.googleapis.com") || url.contains("gemini") {
            return Capability::Gemini;
        }
        if url.contains("bigmodel.cn") || url.contains("zhipuai") {
            return Capability::Glm;
        }
        if url.contains("dashscope") {
            return Capability::Dashscope;
        }
        if url.contains("deepseek.com") {
            return Capability::Deepseek;
        }

        let m = model.to_lowercase();
        if m.starts_with("claude") {
            return Capability::Anthropic;
        }
        if m.starts_with("gemini") {
            return Capability::Gemini;
        }
        if m.starts_with("glm") {
            return Capability::Glm;
        }
        if m.starts_with("qwen") {
            return Capability::Dashscope;
        }
        if m.starts_with("deepseek") {
            return Capability::Deepseek;
        }
        Capability::Openai
    }

    pub fn tool_choice_support(&self) -> ToolChoiceSupport {
        match self {
            Capability::Openai => ToolChoiceSupport { none: true, required: true, specific: true },
            Capability::Anthropic => ToolChoiceSupport { none: true, required: true, specific: true },
            Capability::Gemini => ToolChoiceSupport { none: true, required: true, specific: false },
            Capability::Glm => ToolChoiceSupport { none: false, required: true, specific: true },
            Capability::Dashscope => ToolChoiceSupport { none: true, required: true, specific: true },
            Capability::Deepseek => ToolChoiceSupport { none: true, required: true, specific: true },
        }
    }

    pub fn supports_strict_schema(&self) -> bool {
        matches!(self, Capability::Openai)
    }
}

/// Whether `model` names a reasoning model: sampling fields must be omitted
/// and a non-null `max_tokens` is mandatory for these.
pub fn is_reasoning_model(model: &str) -> bool {
    let m = model.to_lowercase();
    m.contains("deepseek-reasoner") || m.contains("deepseek-r1") || m.starts_with("o1-")
}

/// A tool-choice request from the caller, independent of wire shape.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ToolChoice {
    None,
    Auto,
    Required,
    Specific(String),
}

/// Generation parameters applied to the wire request by [`apply_options`].
#[derive(Debug, Clone, Default)]
pub struct GenerateOptions {
    pub temperature: Option<f32>,
    pub top_p: Option<f32>,
    pub frequency_penalty: Option<f32>,
    pub presence_penalty: Option<f32>,
    pub max_tokens: Option<u32>,
    pub seed: Option<i64>,
    pub stop: Option<Vec<String>>,
    pub response_format: Option<Value>,
    pub reasoning_effort: Option<String>,
}

/// Apply sampling/shape options to the wire request, honoring the
/// reasoning-model rule: when `model` is a reasoning model, every sampling
/// field is omitted and `max_tokens` defaults to 4000 if unset.
pub fn apply_options(request: &mut OpenAIRequest, model: &str, options: &GenerateOptions) {
    if is_reasoning_model(model) {
        request.temperature = None;
        request.top_p = None;
        request.frequency_penalty = None;
        request.presence_penalty = None;
        request.max_tokens = Some(options.max_tokens.unwrap_or(4000));
        request.reasoning_effort = options.reasoning_effort.clone();
        request.seed = options.seed;
        request.stop = options.stop.clone();
        request.response_format = options.response_format.clone();
        return;
    }
    request.temperature = options.temperature;
    request.top_p = options.top_p;
    request.frequency_penalty = options.frequency_penalty;
    request.presence_penalty = options.presence_penalty;
    request.max_tokens = options.max_tokens;
    request.seed = options.seed;
    request.stop = options.stop.clone();
    request.response_format = options.response_format.clone();
    request.reasoning_effort = options.reasoning_effort.clone();
}

/// Attach active tool schemas to the wire request, in OpenAI function-call
/// shape (shared verbatim by all six capabilities).
pub fn apply_tools(request: &mut OpenAIRequest, tools: &[ToolSchema]) {
    if tools.is_empty() {
        request.tools = None;
        return;
    }
    request.tools = Some(
        tools
            .iter()
            .map(|t| {
                let mut function = serde_json::json!({
                    "name": t.name,
                    "description": t.description,
                    "parameters": t.parameters,
                });
                if t.strict {
                    function["strict"] = Value::Bool(true);
                }
                serde_json::json!({"type": "function", "function": function})
            })
            .collect(),
    );
}

/// Apply a tool-choice request, degrading it per the detected capability's
/// support table: `specific → required (if supported) else auto`,
/// `required → auto` (when unsupported), `none → auto` (when unsupported).
/// Every degradation is logged via `tracing::warn!`.
///
/// GLM is a further special case (§4.5 "GLM … force tool_choice=\"auto\"
/// when tools present"): whenever `tools_present` is true, GLM's wire value
/// is forced to `"auto"` regardless of the requested choice, overriding the
/// capability table's otherwise-permissive entry for GLM.
pub fn apply_tool_choice(request: &mut OpenAIRequest, capability: Capability, choice: &ToolChoice, tools_present: bool) {
    if capability == Capability::Glm && tools_present {
        if !matches!(choice, ToolChoice::Auto) {
            tracing::warn!(
                capability = ?capability,
                requested = ?choice,
                degraded_to = "auto",
                "tool_choice forced to auto: GLM requires auto whenever tools are present"
            );
        }
        request.tool_choice = Some(Value::String("auto".to_string()));
        return;
    }

    let support = capability.tool_choice_support();
    let (wire_value, degraded_from) = match choice {
        ToolChoice::None => {
            if support.none {
                (Value::String("none".to_string()), None)
            } else {
                (Value::String("auto".to_string()), Some("none"))
            }
        }
        ToolChoice::Auto => (Value::String("auto".to_string()), None),
        ToolChoice::Required => {
            if support.required {
                (Value::String("required".to_string()), None)
            } else {
                (Value::String("auto".to_string()), Some("required"))
            }
        }
        ToolChoice::Specific(name) => {
            if support.specific {
                (serde_json::json!({"type": "function", "function": {"name": name}}), None)
            } else if support.required {
                (Value::String("required".to_string()), Some("specific"))
            } else {
                (Value::String("auto".to_string()), Some("specific"))
            }
        }
    };

    if let Some(from) = degraded_from {
        tracing::warn!(
            capability = ?capability,
            requested = from,
            degraded_to = %wire_value,
            "tool_choice degraded: capability does not support the requested mode"
        );
    }

    request.tool_choice = Some(wire_value);
}

const CONVERSATION_HISTORY_PROMPT: &str = "The following is the conversation history between participants:\n";

/// Map one agent's memory to wire messages one-to-one.
///
/// - USER: text-only fast path emits a plain string; any media block
///   switches to a content-parts array (images become data URIs or URL
///   refs, audio `Base64Source` becomes `input_audio`, audio `UrlSource`
///   becomes a text placeholder, unknown/video content becomes a
///   `"[... unsupported]"` placeholder — never a formatting failure).
/// - ASSISTANT: text content plus `tool_calls`; a `ThinkingBlock` becomes
///   `reasoning_content`.
/// - TOOL: `role=tool`, `tool_call_id` set from the `ToolResultBlock`'s id.
/// - A SYSTEM message carrying a `ToolResultBlock` is rewritten to TOOL.
pub fn format_single_agent(messages: &[Msg]) -> Vec<OpenAIMessage> {
    messages.iter().map(format_one_message).collect()
}

fn format_one_message(msg: &Msg) -> OpenAIMessage {
    if msg.role == MessageRole::System && msg.has_content_blocks(BlockKind::ToolResult) {
        return format_tool_message(msg);
    }
    match msg.role {
        MessageRole::Tool => format_tool_message(msg),
        MessageRole::Assistant => format_assistant_message(msg),
        _ => format_input_message(msg),
    }
}

fn format_input_message(msg: &Msg) -> OpenAIMessage {
    let role = msg.role.to_string();
    let has_media = msg.content.iter().any(|b| {
        matches!(
            b,
            ContentBlock::Image(_) | ContentBlock::Audio(_) | ContentBlock::Video(_)
        )
    });

    let content = if has_media {
        OpenAIContent::Parts(msg.content.iter().map(format_content_part).collect())
    } else {
        OpenAIContent::Text(msg.extract_text())
    };

    OpenAIMessage {
        role,
        content: Some(content),
        tool_calls: None,
        tool_call_id: None,
        reasoning_content: None,
        name: msg.name.clone(),
    }
}

fn format_content_part(block: &ContentBlock) -> OpenAIContentPart {
    match block {
        ContentBlock::Text(t) => OpenAIContentPart::Text { text: t.text.clone() },
        ContentBlock::Image(img) => match &img.source {
            MediaSource::Base64 { data, media_type } => OpenAIContentPart::ImageUrl {
                image_url: wire::OpenAIImageUrl {
                    url: format!("data:{media_type};base64,{data}"),
                    detail: None,
                },
            },
            MediaSource::Url { url } => OpenAIContentPart::ImageUrl {
                image_url: wire::OpenAIImageUrl { url: url.clone(), detail: None },
            },
        },
        ContentBlock::Audio(audio) => match &audio.source {
            MediaSource::Base64 { data, media_type } => OpenAIContentPart::InputAudio {
                input_audio: wire::OpenAIInputAudio {
                    data: data.clone(),
                    format: media_type.clone(),
                },
            },
            MediaSource::Url { url } => OpenAIContentPart::Text {
                text: format!("[audio at {url}]"),
            },
        },
        ContentBlock::Video(_) => OpenAIContentPart::Text { text: "[video unsupported]".to_string() },
        ContentBlock::Thinking(_) | ContentBlock::ToolUse(_) | ContentBlock::ToolResult(_) => {
            OpenAIContentPart::Text { text: "[unsupported]".to_string() }
        }
    }
}

fn format_assistant_message(msg: &Msg) -> OpenAIMessage {
    let text = msg.extract_text();
    let thinking = msg.first_content_block(BlockKind::Thinking).and_then(|b| match b {
        ContentBlock::Thinking(t) => Some(t.thinking.clone()),
        _ => None,
    });

    let tool_calls: Vec<OpenAIToolCall> = msg
        .tool_uses()
        .into_iter()
        .map(|t| OpenAIToolCall {
            id: t.id.clone(),
            call_type: "function".to_string(),
            function: wire::OpenAIFunction {
                name: t.name.clone(),
                arguments: if t.content.is_empty() {
                    serde_json::to_string(&t.input).unwrap_or_default()
                } else {
                    t.content.clone()
                },
            },
        })
        .collect();

    OpenAIMessage {
        role: "assistant".to_string(),
        content: if text.is_empty() { None } else { Some(OpenAIContent::Text(text)) },
        tool_calls: if tool_calls.is_empty() { None } else { Some(tool_calls) },
        tool_call_id: None,
        reasoning_content: thinking,
        name: msg.name.clone(),
    }
}

fn format_tool_message(msg: &Msg) -> OpenAIMessage {
    let (tool_call_id, text) = msg
        .first_content_block(BlockKind::ToolResult)
        .and_then(|b| match b {
            ContentBlock::ToolResult(r) => Some((r.id.clone(), r.extract_text())),
            _ => None,
        })
        .unwrap_or_default();

    OpenAIMessage {
        role: "tool".to_string(),
        content: Some(OpenAIContent::Text(text)),
        tool_calls: None,
        tool_call_id: Some(tool_call_id),
        reasoning_content: None,
        name: None,
    }
}

/// Collapse a multi-agent conversation into one USER message per non-system,
/// non-tool-sequence run, so a single-agent-shaped wire history can still
/// carry a multi-speaker transcript. Tool-call/tool-result runs and system
/// messages pass through untouched; media blocks are flushed to content
/// parts at the position they occurred.
pub fn format_multi_agent(messages: &[Msg]) -> Vec<OpenAIMessage> {
    let mut out = Vec::new();
    let mut run: Vec<&Msg> = Vec::new();

    let flush = |run: &mut Vec<&Msg>, out: &mut Vec<OpenAIMessage>| {
        if run.is_empty() {
            return;
        }
        if run.len() == 1 {
            out.push(format_one_message(run[0]));
            run.clear();
            return;
        }
        let mut history = String::new();
        for msg in run.iter().take(run.len() - 1) {
            let label = msg.name.clone().unwrap_or_else(|| msg.role.to_string());
            history.push_str(&format!("{label}: {}\n", msg.extract_text()));
        }
        let current = run.last().expect("run non-empty");
        let current_label = current.name.clone().unwrap_or_else(|| current.role.to_string());
        let text = format!(
            "{CONVERSATION_HISTORY_PROMPT}<history>\n{history}</history>\n{current_label}: {}",
            current.extract_text()
        );

        let parts: Vec<OpenAIContentPart> = run
            .iter()
            .flat_map(|m| m.content.iter())
            .filter(|b| matches!(b, ContentBlock::Image(_) | ContentBlock::Audio(_) | ContentBlock::Video(_)))
            .map(format_content_part)
            .collect();

        let content = if parts.is_empty() {
            OpenAIContent::Text(text)
        } else {
            let mut all = vec![OpenAIContentPart::Text { text }];
            all.extend(parts);
            OpenAIContent::Parts(all)
        };

        out.push(OpenAIMessage {
            role: "user".to_string(),
            content: Some(content),
            tool_calls: None,
            tool_call_id: None,
            reasoning_content: None,
            name: None,
        });
        run.clear();
    };

    for msg in messages {
        let is_tool_sequence = msg.has_content_blocks(BlockKind::ToolUse) || msg.role == MessageRole::Tool;
        if msg.role == MessageRole::System || is_tool_sequence {
            flush(&mut run, &mut out);
            out.push(format_one_message(msg));
        } else {
            run.push(msg);
        }
    }
    flush(&mut run, &mut out);
    out
}

/// Apply provider-specific quirks to an already-formatted wire message list,
/// in place.
pub fn apply_quirks(capability: Capability, messages: &mut Vec<OpenAIMessage>, tools_present: bool) {
    match capability {
        Capability::Deepseek => apply_deepseek_quirks(messages),
        Capability::Glm => apply_glm_quirks(messages, tools_present),
        _ => {}
    }
}

fn apply_deepseek_quirks(messages: &mut Vec<OpenAIMessage>) {
    let last_user_index = messages.iter().rposition(|m| m.role == "user");

    for (i, msg) in messages.iter_mut().enumerate() {
        msg.name = None;
        if msg.role == "system" {
            msg.role = "user".to_string();
        }
        if let Some(last_user) = last_user_index {
            if i < last_user {
                msg.reasoning_content = None;
            }
        } else {
            msg.reasoning_content = None;
        }
    }

    if messages.last().map(|m| m.role == "assistant").unwrap_or(false) {
        messages.push(OpenAIMessage {
            role: "user".to_string(),
            content: Some(OpenAIContent::Text(String::new())),
            tool_calls: None,
            tool_call_id: None,
            reasoning_content: None,
            name: None,
        });
    }
}

fn apply_glm_quirks(messages: &mut Vec<OpenAIMessage>, tools_present: bool) {
    if !messages.iter().any(|m| m.role == "user") {
        messages.push(OpenAIMessage {
            role: "user".to_string(),
            content: Some(OpenAIContent::Text(String::new())),
            tool_calls: None,
            tool_call_id: None,
            reasoning_content: None,
            name: None,
        });
    }
    // The forced tool_choice="auto" half of the GLM quirk runs in
    // `apply_tool_choice`, which is the one that owns `request.tool_choice`;
    // `tools_present` is threaded through only to keep this function's
    // signature matching `apply_deepseek_quirks`'s.
    let _ = tools_present;
}

/// Parse one non-streaming provider reply into a complete `Msg`, in fixed
/// order: reasoning, then text, then tool calls.
pub fn parse_response(message: &OpenAIMessage) -> Msg {
    let mut blocks = Vec::new();
    if let Some(reasoning) = &message.reasoning_content {
        if !reasoning.is_empty() {
            blocks.push(ContentBlock::Thinking(ThinkingBlock::new(reasoning.clone())));
        }
    }
    if let Some(content) = &message.content {
        let text = content.as_text();
        if !text.is_empty() {
            blocks.push(ContentBlock::Text(TextBlock::new(text)));
        }
    }
    if let Some(tool_calls) = &message.tool_calls {
        for call in tool_calls {
            let input: Value = serde_json::from_str(&call.function.arguments).unwrap_or(Value::Null);
            let mut tool_use = ToolUseBlock::new(call.id.clone(), call.function.name.clone(), input);
            tool_use.content = call.function.arguments.clone();
            blocks.push(ContentBlock::ToolUse(tool_use));
        }
    }
    Msg::assistant(blocks)
}

/// Sentinel tool-call name used for a streaming delta that continues an
/// existing tool call without repeating its name/id. A chunk merger
/// reassembles fragments sharing this sentinel by their position/index.
pub const FRAGMENT_SENTINEL: &str = "__fragment__";

/// Parse one streaming chunk's delta into a partial `Msg`, or `None` if the
/// delta carries nothing actionable (e.g. a bare role-establishing delta).
/// A chunk that begins a new tool call carries its real name/id; subsequent
/// chunks for the same call are emitted with [`FRAGMENT_SENTINEL`] and an
/// empty id — reassembly by index is the chunk merger's job, not this
/// function's.
pub fn parse_chunk(chunk: &OpenAIChunk) -> Option<Msg> {
    let choice = chunk.choices.first()?;
    let delta = &choice.delta;
    let mut blocks = Vec::new();

    if let Some(reasoning) = &delta.reasoning_content {
        if !reasoning.is_empty() {
            blocks.push(ContentBlock::Thinking(ThinkingBlock::new(reasoning.clone())));
        }
    }
    if let Some(text) = &delta.content {
        if !text.is_empty() {
            blocks.push(ContentBlock::Text(TextBlock::new(text.clone())));
        }
    }
    if let Some(tool_calls) = &delta.tool_calls {
        for call in tool_calls {
            let (name, id) = match (&call.id, &call.function.as_ref().and_then(|f| f.name.clone())) {
                (Some(id), Some(name)) => (name.clone(), id.clone()),
                _ => (FRAGMENT_SENTINEL.to_string(), String::new()),
            };
            let args_fragment = call.function.as_ref().and_then(|f| f.arguments.clone()).unwrap_or_default();
            let mut tool_use = ToolUseBlock::new(id, name, Value::Null);
            tool_use.content = args_fragment;
            tool_use.metadata.insert("index".to_string(), Value::from(call.index));
            blocks.push(ContentBlock::ToolUse(tool_use));
        }
    }

    if blocks.is_empty() {
        None
    } else {
        Some(Msg::assistant(blocks))
    }
}

/// Reassembles streaming tool-call fragments by delta index into complete
/// `ToolUseBlock`s. Validates accumulated arguments as JSON only at flush
/// time, so a tool call whose arguments never arrive cleanly surfaces as a
/// parse error on the kernel's side rather than panicking mid-stream.
#[derive(Debug, Default)]
pub struct ChunkMerger {
    text_buffer: String,
    reasoning_buffer: String,
    tool_calls: std::collections::BTreeMap<u64, PartialToolCall>,
}

#[derive(Debug, Default, Clone)]
struct PartialToolCall {
    id: String,
    name: String,
    arguments: String,
}

impl ChunkMerger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one parsed chunk's blocks in; returns any blocks that are
    /// immediately final (currently none — text/reasoning accumulate until
    /// [`ChunkMerger::flush`]).
    pub fn push(&mut self, msg: Msg) {
        for (index, block) in msg.content.into_iter().enumerate() {
            match block {
                ContentBlock::Text(t) => self.text_buffer.push_str(&t.text),
                ContentBlock::Thinking(t) => self.reasoning_buffer.push_str(&t.thinking),
                ContentBlock::ToolUse(tool_use) => {
                    let idx = tool_use
                        .metadata
                        .get("index")
                        .and_then(|v| v.as_u64())
                        .unwrap_or(index as u64);
                    let entry = self.tool_calls.entry(idx).or_default();
                    if tool_use.name != FRAGMENT_SENTINEL {
                        entry.name = tool_use.name;
                    }
                    if !tool_use.id.is_empty() {
                        entry.id = tool_use.id;
                    }
                    entry.arguments.push_str(&tool_use.content);
                }
                _ => {}
            }
        }
    }

    /// Finish the stream: build the complete `Msg`, validating each
    /// accumulated tool call's arguments as JSON. A tool call whose
    /// arguments don't parse surfaces as `AgentError::ParseError`, never a
    /// panic — the kernel turns that into an error `ToolResultBlock`.
    pub fn flush(self) -> Result<Msg> {
        let mut blocks = Vec::new();
        if !self.reasoning_buffer.is_empty() {
            blocks.push(ContentBlock::Thinking(ThinkingBlock::new(self.reasoning_buffer)));
        }
        if !self.text_buffer.is_empty() {
            blocks.push(ContentBlock::Text(TextBlock::new(self.text_buffer)));
        }
        for (_, call) in self.tool_calls {
            let input: Value = serde_json::from_str(&call.arguments)
                .map_err(|e| AgentError::parse(format!("tool call '{}' arguments: {e}", call.name)))?;
            let mut tool_use = ToolUseBlock::new(call.id, call.name, input);
            tool_use.content = call.arguments;
            blocks.push(ContentBlock::ToolUse(tool_use));
        }
        Ok(Msg::assistant(blocks))
    }
}
