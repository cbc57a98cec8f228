//! The tool registry (C2): named callable units with JSON schema, groups, and
//! per-group activation.
//!
//! Generalizes the donor SDK's flat `Vec<Arc<Tool>>` on `AgentOptions` into a
//! name-keyed registry with groups, following the same "registry keyed by
//! name, factory/invoker behind a trait object" shape `querymt`'s provider
//! plugin registry uses for providers instead of tools.

use crate::error::{AgentError, Result};
use crate::tools::Tool;
use serde_json::Value;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

/// The JSON-Schema-shaped description of a tool, independent of its handler.
#[derive(Debug, Clone)]
pub struct ToolSchema {
    pub name: String,
    pub description: String,
    pub parameters: Value,
    pub strict: bool,
    pub group: String,
}

/// The name every tool belongs to unless registered into another group.
/// Always active; cannot be deactivated.
pub const DEFAULT_GROUP: &str = "default";

struct GroupState {
    #[allow(dead_code)]
    description: String,
    active: bool,
}

/// Name-keyed collection of tools, with named groups that gate which schemas
/// are surfaced to the model.
pub struct ToolRegistry {
    tools: HashMap<String, Arc<Tool>>,
    groups: HashMap<String, GroupState>,
}

impl Default for ToolRegistry {
    fn default() -> Self {
        let mut groups = HashMap::new();
        groups.insert(
            DEFAULT_GROUP.to_string(),
            GroupState {
                description: "always-active default group".to_string(),
                active: true,
            },
        );
        Self {
            tools: HashMap::new(),
            groups,
        }
    }
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a tool into the `"default"` group. Fails if a tool with the
    /// same name is already registered.
    pub fn register(&mut self, tool: Tool) -> Result<()> {
        self.register_in_group(tool, DEFAULT_GROUP)
    }

    /// Register a tool into an explicit group, creating the group (inactive
    /// by default, unless it is `"default"`) if it doesn't exist yet.
    pub fn register_in_group(&mut self, tool: Tool, group: impl Into<String>) -> Result<()> {
        let group = group.into();
        if self.tools.contains_key(tool.name()) {
            return Err(AgentError::invalid_input(format!(
                "tool '{}' is already registered",
                tool.name()
            )));
        }
        self.groups.entry(group.clone()).or_insert_with(|| GroupState {
            description: String::new(),
            active: group == DEFAULT_GROUP,
        });
        let mut tool = tool;
        tool.set_group(group);
        self.tools.insert(tool.name().to_string(), Arc::new(tool));
        Ok(())
    }

    /// Remove a tool by name. Used to tear down a call-scoped synthetic tool
    /// (the kernel's structured-output tool, primarily) without leaving it
    /// registered for calls that never asked for it. Returns whether a tool
    /// was actually removed.
    pub fn unregister(&mut self, name: &str) -> bool {
        self.tools.remove(name).is_some()
    }

    pub fn create_group(&mut self, name: impl Into<String>, description: impl Into<String>, active: bool) {
        let name = name.into();
        self.groups.insert(
            name,
            GroupState {
                description: description.into(),
                active,
            },
        );
    }

    /// Replace the active set wholesale: every named group becomes active,
    /// every other existing group becomes inactive. `"default"` is untouched
    /// — it is always active.
    pub fn set_active_groups(&mut self, names: &[&str]) {
        let wanted: HashSet<&str> = names.iter().copied().collect();
        for (name, state) in self.groups.iter_mut() {
            if name == DEFAULT_GROUP {
                state.active = true;
                continue;
            }
            state.active = wanted.contains(name.as_str());
        }
    }

    /// Toggle specific groups without touching the others.
    pub fn update_tool_groups(&mut self, names: &[&str], active: bool) {
        for name in names {
            if *name == DEFAULT_GROUP && !active {
                continue; // default group can never be deactivated
            }
            if let Some(state) = self.groups.get_mut(*name) {
                state.active = active;
            }
        }
    }

    fn group_active(&self, group: &str) -> bool {
        self.groups.get(group).map(|g| g.active).unwrap_or(false)
    }

    /// Schemas of every tool whose group is currently active.
    pub fn active_schemas(&self) -> Vec<ToolSchema> {
        self.tools
            .values()
            .filter(|t| self.group_active(t.group()))
            .map(|t| t.schema())
            .collect()
    }

    pub fn get(&self, name: &str) -> Option<Arc<Tool>> {
        self.tools.get(name).cloned()
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    /// Invoke a tool by name. Unknown-tool and inactive-group conditions
    /// never fail this call — they produce a `"[tool error: …]"` result, per
    /// the registry's error-recovery contract.
    pub async fn invoke(&self, name: &str, input: Value, ctx: &crate::tools::ToolContext) -> crate::types::ToolResultBlock {
        let Some(tool) = self.get(name) else {
            tracing::warn!(tool = name, "invoke: unknown tool");
            return crate::types::ToolResultBlock::error(ctx.call_id.clone(), name, "unknown tool");
        };
        if !self.group_active(tool.group()) {
            tracing::warn!(tool = name, group = tool.group(), "invoke: tool's group is inactive");
            return crate::types::ToolResultBlock::error(
                ctx.call_id.clone(),
                name,
                format!("tool's group '{}' is not active", tool.group()),
            );
        }
        match tool.execute(input).await {
            Ok(value) => crate::types::ToolResultBlock::text(
                ctx.call_id.clone(),
                name,
                serde_json::to_string(&value).unwrap_or_default(),
            ),
            Err(err) => {
                tracing::warn!(tool = name, error = %err, "invoke: tool handler returned an error");
                crate::types::ToolResultBlock::error(ctx.call_id.clone(), name, err)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::ToolContext;
    use serde_json::json;

    fn echo_tool(name: &str) -> Tool {
        crate::tools::tool(name, "echoes its input")
            .param("value", "string")
            .build(|args| async move { Ok(args) })
    }

    #[test]
    fn register_rejects_duplicate_names() {
        let mut registry = ToolRegistry::new();
        registry.register(echo_tool("echo")).unwrap();
        let err = registry.register(echo_tool("echo")).unwrap_err();
        assert!(matches!(err, AgentError::InvalidInput(_)));
    }

    #[test]
    fn default_group_is_always_active() {
        let registry = ToolRegistry::new();
        assert!(registry.group_active(DEFAULT_GROUP));
    }

    #[test]
    fn inactive_group_hides_schema() {
        let mut registry = ToolRegistry::new();
        registry.create_group("admin", "admin-only tools", false);
        registry.register_in_group(echo_tool("danger"), "admin").unwrap();
        assert_eq!(registry.active_schemas().len(), 0);

        registry.update_tool_groups(&["admin"], true);
        assert_eq!(registry.active_schemas().len(), 1);
    }

    #[test]
    fn set_active_groups_deactivates_everything_else() {
        let mut registry = ToolRegistry::new();
        registry.create_group("a", "", true);
        registry.create_group("b", "", true);
        registry.register_in_group(echo_tool("ta"), "a").unwrap();
        registry.register_in_group(echo_tool("tb"), "b").unwrap();

        registry.set_active_groups(&["a"]);
        let names: Vec<String> = registry.active_schemas().into_iter().map(|s| s.name).collect();
        assert_eq!(names, vec!["ta".to_string()]);
    }

    #[tokio::test]
    async fn invoke_unknown_tool_is_recovered_not_fatal() {
        let registry = ToolRegistry::new();
        let ctx = ToolContext::new("call_1");
        let result = registry.invoke("missing", json!({}), &ctx).await;
        assert_eq!(result.extract_text(), "[tool error: unknown tool]");
    }

    #[tokio::test]
    async fn invoke_inactive_group_is_recovered_not_fatal() {
        let mut registry = ToolRegistry::new();
        registry.create_group("admin", "", false);
        registry.register_in_group(echo_tool("danger"), "admin").unwrap();
        let ctx = ToolContext::new("call_1");
        let result = registry.invoke("danger", json!({}), &ctx).await;
        assert!(result.extract_text().starts_with("[tool error:"));
    }

    #[tokio::test]
    async fn invoke_success_roundtrips_value() {
        let mut registry = ToolRegistry::new();
        registry.register(echo_tool("echo")).unwrap();
        let ctx = ToolContext::new("call_1");
        let result = registry.invoke("echo", json!({"value": "hi"}), &ctx).await;
        assert!(result.extract_text().contains("hi"));
    }
}
