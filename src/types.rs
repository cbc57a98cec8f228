//! The canonical message model (C1).
//!
//! `Msg` is the only type that flows through the kernel and is stored in
//! [`crate::memory::Memory`]; everything provider-specific lives behind the
//! dialect layer (`crate::dialect`) and never leaks into this module. Content
//! is only ever inspected through the extraction helpers at the bottom of this
//! file — direct matching on `ContentBlock` outside this crate works too
//! (the variants are public) but the helpers are the sanctioned path.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// Who produced a [`Msg`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    System,
    User,
    Assistant,
    Tool,
}

impl fmt::Display for MessageRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            MessageRole::System => "system",
            MessageRole::User => "user",
            MessageRole::Assistant => "assistant",
            MessageRole::Tool => "tool",
        };
        write!(f, "{s}")
    }
}

/// Where a media content block's bytes come from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum MediaSource {
    Url { url: String },
    Base64 { data: String, media_type: String },
}

/// Plain text produced or consumed by a turn.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextBlock {
    pub text: String,
}

impl TextBlock {
    pub fn new(text: impl Into<String>) -> Self {
        Self { text: text.into() }
    }
}

/// Model-internal reasoning, opaque to users but preserved across turns so a
/// later dialect-format pass can round-trip `reasoning_content` back to
/// providers that want it (DeepSeek reasoning models, primarily).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ThinkingBlock {
    pub thinking: String,
    #[serde(default)]
    pub metadata: serde_json::Map<String, Value>,
}

impl ThinkingBlock {
    pub fn new(thinking: impl Into<String>) -> Self {
        Self {
            thinking: thinking.into(),
            metadata: serde_json::Map::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageBlock {
    pub source: MediaSource,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AudioBlock {
    pub source: MediaSource,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VideoBlock {
    pub source: MediaSource,
}

impl ImageBlock {
    pub fn from_url(url: impl Into<String>) -> Self {
        Self {
            source: MediaSource::Url { url: url.into() },
        }
    }

    pub fn from_base64(data: impl Into<String>, media_type: impl Into<String>) -> Self {
        Self {
            source: MediaSource::Base64 {
                data: data.into(),
                media_type: media_type.into(),
            },
        }
    }
}

/// An assistant's request to invoke a tool.
///
/// `content` carries the raw, not-yet-parsed argument string as it was
/// received from the wire; `input` is the parsed form. Both are kept because
/// the chunk merger (`crate::dialect::chunk`) assembles `content`
/// incrementally from streaming deltas before it is ever valid enough to
/// parse into `input`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolUseBlock {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub input: Value,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub metadata: serde_json::Map<String, Value>,
}

impl ToolUseBlock {
    pub fn new(id: impl Into<String>, name: impl Into<String>, input: Value) -> Self {
        let content = serde_json::to_string(&input).unwrap_or_default();
        Self {
            id: id.into(),
            name: name.into(),
            input,
            content,
            metadata: serde_json::Map::new(),
        }
    }
}

/// A tool's reply. `output` can itself carry text/image/audio content blocks
/// so multimodal tool results (e.g. a screenshot tool) pass through unchanged.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolResultBlock {
    pub id: String,
    pub name: String,
    pub output: Vec<ContentBlock>,
}

impl ToolResultBlock {
    pub fn new(id: impl Into<String>, name: impl Into<String>, output: Vec<ContentBlock>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            output,
        }
    }

    pub fn text(id: impl Into<String>, name: impl Into<String>, text: impl Into<String>) -> Self {
        Self::new(id, name, vec![ContentBlock::Text(TextBlock::new(text))])
    }

    /// The `"[tool error: …]"` shape recovered tool failures (unknown tool,
    /// inactive group, invoker error) are required to carry.
    pub fn error(id: impl Into<String>, name: impl Into<String>, message: impl fmt::Display) -> Self {
        Self::text(id, name, format!("[tool error: {message}]"))
    }

    /// Concatenation of every `TextBlock` in `output`, `"\n"`-joined.
    pub fn extract_text(&self) -> String {
        self.output
            .iter()
            .filter_map(|b| match b {
                ContentBlock::Text(t) => Some(t.text.as_str()),
                _ => None,
            })
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// A single unit of message content.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentBlock {
    Text(TextBlock),
    Thinking(ThinkingBlock),
    Image(ImageBlock),
    Audio(AudioBlock),
    Video(VideoBlock),
    ToolUse(ToolUseBlock),
    ToolResult(ToolResultBlock),
}

/// Which [`ContentBlock`] variant a caller is asking about; used by the
/// extraction helpers below so callers don't need to `match` directly.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockKind {
    Text,
    Thinking,
    Image,
    Audio,
    Video,
    ToolUse,
    ToolResult,
}

impl ContentBlock {
    fn kind(&self) -> BlockKind {
        match self {
            ContentBlock::Text(_) => BlockKind::Text,
            ContentBlock::Thinking(_) => BlockKind::Thinking,
            ContentBlock::Image(_) => BlockKind::Image,
            ContentBlock::Audio(_) => BlockKind::Audio,
            ContentBlock::Video(_) => BlockKind::Video,
            ContentBlock::ToolUse(_) => BlockKind::ToolUse,
            ContentBlock::ToolResult(_) => BlockKind::ToolResult,
        }
    }
}

/// The canonical dialog unit. Immutable after construction — to "edit" a
/// `Msg`, build a new one; [`crate::memory::Memory`] only ever appends.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Msg {
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
    pub role: MessageRole,
    #[serde(default)]
    pub content: Vec<ContentBlock>,
    #[serde(default)]
    pub metadata: serde_json::Map<String, Value>,
}

impl Msg {
    pub fn new(role: MessageRole, content: Vec<ContentBlock>) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            name: None,
            role,
            content,
            metadata: serde_json::Map::new(),
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_metadata(mut self, metadata: serde_json::Map<String, Value>) -> Self {
        self.metadata = metadata;
        self
    }

    pub fn system(text: impl Into<String>) -> Self {
        Self::new(MessageRole::System, vec![ContentBlock::Text(TextBlock::new(text))])
    }

    pub fn user(text: impl Into<String>) -> Self {
        Self::new(MessageRole::User, vec![ContentBlock::Text(TextBlock::new(text))])
    }

    pub fn user_blocks(content: Vec<ContentBlock>) -> Self {
        Self::new(MessageRole::User, content)
    }

    pub fn assistant(content: Vec<ContentBlock>) -> Self {
        Self::new(MessageRole::Assistant, content)
    }

    pub fn assistant_text(text: impl Into<String>) -> Self {
        Self::assistant(vec![ContentBlock::Text(TextBlock::new(text))])
    }

    pub fn tool(content: Vec<ContentBlock>) -> Self {
        Self::new(MessageRole::Tool, content)
    }

    /// Every content block of the requested kind, in order.
    pub fn content_blocks(&self, kind: BlockKind) -> Vec<&ContentBlock> {
        self.content.iter().filter(|b| b.kind() == kind).collect()
    }

    /// The first content block of the requested kind, if any.
    pub fn first_content_block(&self, kind: BlockKind) -> Option<&ContentBlock> {
        self.content.iter().find(|b| b.kind() == kind)
    }

    /// Whether this message carries at least one block of the requested kind.
    pub fn has_content_blocks(&self, kind: BlockKind) -> bool {
        self.content.iter().any(|b| b.kind() == kind)
    }

    /// Concatenation of every `TextBlock`'s text, `"\n"`-joined; `""` if none.
    pub fn extract_text(&self) -> String {
        self.content
            .iter()
            .filter_map(|b| match b {
                ContentBlock::Text(t) => Some(t.text.as_str()),
                _ => None,
            })
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Every `ToolUseBlock` carried by this message, in order.
    pub fn tool_uses(&self) -> Vec<&ToolUseBlock> {
        self.content
            .iter()
            .filter_map(|b| match b {
                ContentBlock::ToolUse(t) => Some(t),
                _ => None,
            })
            .collect()
    }
}
