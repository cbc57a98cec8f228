//! Conversation memory (C3): the ordered `Vec<Msg>` history an agent carries
//! between turns, plus the token-estimation and truncation helpers the donor
//! SDK exposed as free functions in its `context` module.
//!
//! Token counting here is a character-based approximation, not a real
//! tokenizer — it's meant to catch "context window is getting large" early,
//! not to match any specific model's tokenizer exactly.

use crate::types::{ContentBlock, Msg, MessageRole};

/// Ordered conversation history for one agent.
#[derive(Debug, Clone, Default)]
pub struct Memory {
    messages: Vec<Msg>,
}

impl Memory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_messages(messages: Vec<Msg>) -> Self {
        Self { messages }
    }

    pub fn append(&mut self, msg: Msg) {
        self.messages.push(msg);
    }

    pub fn append_all(&mut self, msgs: impl IntoIterator<Item = Msg>) {
        self.messages.extend(msgs);
    }

    pub fn clear(&mut self) {
        self.messages.clear();
    }

    pub fn messages(&self) -> &[Msg] {
        &self.messages
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// A cloned copy of the current history, suitable for a session snapshot.
    pub fn snapshot(&self) -> Vec<Msg> {
        self.messages.clone()
    }

    /// Replace the current history wholesale, e.g. when restoring a session.
    pub fn restore(&mut self, messages: Vec<Msg>) {
        self.messages = messages;
    }

    /// Character-based approximation of token count (~4 characters per
    /// token). Always include a 10-20% safety margin when comparing against
    /// a hard context-window limit; this is not a real tokenizer.
    pub fn estimate_tokens(&self) -> usize {
        estimate_tokens(&self.messages)
    }

    /// Whether the estimated token count exceeds `limit * margin`.
    pub fn is_approaching_limit(&self, limit: usize, margin: f64) -> bool {
        is_approaching_limit(&self.messages, limit, margin)
    }

    /// Truncate in place, keeping the system message (if `preserve_system`)
    /// plus the most recent `keep` messages. A simple policy: it does not
    /// try to keep tool-call/tool-result pairs together, so truncating
    /// mid-tool-chain can leave a dangling `ToolResultBlock` with no matching
    /// `ToolUseBlock`. Use at natural turn boundaries.
    pub fn truncate(&mut self, keep: usize, preserve_system: bool) {
        self.messages = truncate_messages(&self.messages, keep, preserve_system);
    }
}

pub fn estimate_tokens(messages: &[Msg]) -> usize {
    if messages.is_empty() {
        return 0;
    }

    let mut total_chars = 0;

    for msg in messages {
        total_chars += 8; // role + id formatting overhead

        for block in &msg.content {
            match block {
                ContentBlock::Text(text) => total_chars += text.text.len(),
                ContentBlock::Thinking(thinking) => total_chars += thinking.thinking.len(),
                ContentBlock::Image(_) | ContentBlock::Audio(_) | ContentBlock::Video(_) => {
                    total_chars += 64; // media blocks are opaque to this approximation
                }
                ContentBlock::ToolUse(tool_use) => {
                    total_chars += tool_use.name.len();
                    total_chars += tool_use.id.len();
                    total_chars += tool_use.input.to_string().len();
                }
                ContentBlock::ToolResult(result) => {
                    total_chars += result.id.len();
                    total_chars += result.extract_text().len();
                }
            }
        }
    }

    total_chars += 16; // conversation-level overhead

    (total_chars + 3) / 4
}

pub fn truncate_messages(messages: &[Msg], keep: usize, preserve_system: bool) -> Vec<Msg> {
    if messages.is_empty() {
        return Vec::new();
    }

    if messages.len() <= keep {
        return messages.to_vec();
    }

    let has_system = preserve_system && messages[0].role == MessageRole::System;

    if has_system {
        let mut result = vec![messages[0].clone()];
        if keep > 0 && messages.len() > 1 {
            let start = messages.len().saturating_sub(keep);
            result.extend_from_slice(&messages[start.max(1)..]);
        }
        result
    } else if keep > 0 {
        let start = messages.len().saturating_sub(keep);
        messages[start..].to_vec()
    } else {
        Vec::new()
    }
}

pub fn is_approaching_limit(messages: &[Msg], limit: usize, margin: f64) -> bool {
    let estimated = estimate_tokens(messages);
    (estimated as f64) > (limit as f64) * margin
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_memory_has_zero_tokens() {
        assert_eq!(Memory::new().estimate_tokens(), 0);
    }

    #[test]
    fn estimate_grows_with_content() {
        let mut mem = Memory::new();
        mem.append(Msg::user("hello"));
        let small = mem.estimate_tokens();
        mem.append(Msg::user("a much longer message with significantly more characters in it"));
        assert!(mem.estimate_tokens() > small);
    }

    #[test]
    fn truncate_preserves_system_message() {
        let mut mem = Memory::new();
        mem.append(Msg::system("you are a helpful assistant"));
        for i in 0..20 {
            mem.append(Msg::user(format!("message {i}")));
        }
        mem.truncate(5, true);
        assert_eq!(mem.messages()[0].role, MessageRole::System);
        assert_eq!(mem.len(), 6); // system + 5 kept
    }

    #[test]
    fn truncate_without_preserve_system_keeps_only_recent() {
        let mut mem = Memory::new();
        mem.append(Msg::system("sys"));
        for i in 0..10 {
            mem.append(Msg::user(format!("m{i}")));
        }
        mem.truncate(3, false);
        assert_eq!(mem.len(), 3);
        assert_ne!(mem.messages()[0].role, MessageRole::System);
    }

    #[test]
    fn truncate_is_noop_when_under_keep_count() {
        let mut mem = Memory::new();
        mem.append(Msg::user("one"));
        mem.append(Msg::user("two"));
        mem.truncate(10, true);
        assert_eq!(mem.len(), 2);
    }

    #[test]
    fn is_approaching_limit_respects_margin() {
        let mut mem = Memory::new();
        mem.append(Msg::user("x".repeat(1000)));
        let tokens = mem.estimate_tokens();
        assert!(mem.is_approaching_limit(tokens, 0.5));
        assert!(!mem.is_approaching_limit(tokens * 10, 0.9));
    }

    #[test]
    fn snapshot_and_restore_roundtrip() {
        let mut mem = Memory::new();
        mem.append(Msg::user("hi"));
        let snap = mem.snapshot();
        let mut restored = Memory::new();
        restored.restore(snap);
        assert_eq!(restored.len(), 1);
    }
}
