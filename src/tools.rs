//! Tool definitions: schema-bearing, invokable units the kernel may hand off
//! to during the acting half of the ReAct loop.
//!
//! A [`Tool`] pairs a JSON Schema (accepted in several convenience shapes and
//! normalized to full JSON Schema by [`convert_schema_to_openai`]) with an
//! async handler. Handlers use the `Arc<dyn Fn(...) -> Pin<Box<dyn Future...>>>`
//! type-erasure pattern so tools of different concrete closure types can live
//! side by side in a [`crate::registry::ToolRegistry`].

use crate::error::AgentError;
use crate::registry::{ToolSchema, DEFAULT_GROUP};
use crate::Result;
use serde_json::Value;
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

/// Per-invocation context handed to a tool's handler alongside its parsed
/// input. Carries the id of the `ToolUseBlock` the invocation pairs with and
/// a cooperative cancellation flag mirroring the kernel's own interrupt
/// signal (§5: tool invokers are passed a cancellation handle; honoring it
/// is a quality-of-implementation concern).
#[derive(Clone)]
pub struct ToolContext {
    pub call_id: String,
    cancelled: Arc<std::sync::atomic::AtomicBool>,
}

impl ToolContext {
    pub fn new(call_id: impl Into<String>) -> Self {
        Self {
            call_id: call_id.into(),
            cancelled: Arc::new(std::sync::atomic::AtomicBool::new(false)),
        }
    }

    pub fn with_cancellation(call_id: impl Into<String>, cancelled: Arc<std::sync::atomic::AtomicBool>) -> Self {
        Self {
            call_id: call_id.into(),
            cancelled,
        }
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(std::sync::atomic::Ordering::SeqCst)
    }
}

/// A tool handler: takes parsed JSON arguments, returns a boxed future of a
/// JSON result. Boxed and `Arc`-wrapped so closures of differing concrete
/// types can be stored uniformly in a registry and cheaply cloned.
pub type ToolHandler =
    Arc<dyn Fn(Value) -> Pin<Box<dyn Future<Output = Result<Value>> + Send>> + Send + Sync>;

/// A callable unit the model may invoke, with a name, description, JSON
/// Schema for its parameters, and an async handler.
#[derive(Clone)]
pub struct Tool {
    name: String,
    description: String,
    input_schema: Value,
    strict: bool,
    group: String,
    handler: ToolHandler,
}

impl Tool {
    /// Construct a tool directly. `schema` accepts simple type notation
    /// (`{"a": "number"}`), extended per-property schema (with `description`/
    /// `optional`/`default`), or a full JSON Schema object — see
    /// [`convert_schema_to_openai`] for the exact rules.
    pub fn new<F, Fut>(name: impl Into<String>, description: impl Into<String>, schema: Value, handler: F) -> Self
    where
        F: Fn(Value) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Value>> + Send + 'static,
    {
        Self {
            name: name.into(),
            description: description.into(),
            input_schema: convert_schema_to_openai(schema),
            strict: false,
            group: DEFAULT_GROUP.to_string(),
            handler: Arc::new(move |args| Box::pin(handler(args))),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn input_schema(&self) -> &Value {
        &self.input_schema
    }

    pub fn group(&self) -> &str {
        &self.group
    }

    pub(crate) fn set_group(&mut self, group: impl Into<String>) {
        self.group = group.into();
    }

    /// Mark this tool as requiring strict schema adherence. Only honored by
    /// dialect capabilities whose capability table entry supports it
    /// (currently OPENAI); ignored elsewhere.
    pub fn strict(mut self, strict: bool) -> Self {
        self.strict = strict;
        self
    }

    pub fn is_strict(&self) -> bool {
        self.strict
    }

    /// The [`ToolSchema`] surfaced to the dialect layer for active tools.
    pub fn schema(&self) -> ToolSchema {
        ToolSchema {
            name: self.name.clone(),
            description: self.description.clone(),
            parameters: self.input_schema.clone(),
            strict: self.strict,
            group: self.group.clone(),
        }
    }

    pub async fn execute(&self, args: Value) -> Result<Value> {
        (self.handler)(args).await
    }

    /// OpenAI-compatible `{"type": "function", "function": {...}}` wire
    /// representation, used by the dialect layer when formatting tools for
    /// any of the OpenAI-shaped capabilities (all six share this transport shape).
    pub fn to_openai_format(&self) -> Value {
        let mut function = serde_json::json!({
            "name": self.name,
            "description": self.description,
            "parameters": self.input_schema,
        });
        if self.strict {
            function["strict"] = Value::Bool(true);
        }
        serde_json::json!({
            "type": "function",
            "function": function,
        })
    }
}

impl fmt::Debug for Tool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Handler is intentionally omitted - it's not debuggable.
        f.debug_struct("Tool")
            .field("name", &self.name)
            .field("description", &self.description)
            .field("input_schema", &self.input_schema)
            .field("group", &self.group)
            .field("strict", &self.strict)
            .field("handler", &"<fn>")
            .finish()
    }
}

/// Convert a friendly schema shape into full JSON Schema.
///
/// Three accepted shapes:
/// 1. Already-full JSON Schema (has `"type"` and `"properties"`) — passed through.
/// 2. Flat simple-type notation (`{"location": "string"}`) — every key required.
/// 3. Extended per-property schema (`{"limit": {"type": "integer", "optional": true}}`)
///    — `required`/`optional` flags and a `default` key all affect whether the
///    property lands in the output's `required` array; `optional`/`required`
///    keys are stripped since they aren't standard JSON Schema.
fn convert_schema_to_openai(schema: Value) -> Value {
    let Some(obj) = schema.as_object() else {
        return serde_json::json!({"type": "object", "properties": {}, "required": []});
    };

    if obj.contains_key("type") && obj.contains_key("properties") {
        return schema;
    }

    let mut properties = serde_json::Map::new();
    let mut required = Vec::new();

    for (param_name, param_type) in obj {
        if let Some(type_str) = param_type.as_str() {
            properties.insert(param_name.clone(), type_to_json_schema(type_str));
            required.push(param_name.clone());
        } else if param_type.is_object() {
            let mut prop = param_type.clone();
            let prop_obj = prop.as_object_mut().expect("checked is_object above");

            let is_optional = prop_obj.remove("optional").and_then(|v| v.as_bool()).unwrap_or(false);
            let is_required = prop_obj.remove("required").and_then(|v| v.as_bool());
            let has_default = prop_obj.contains_key("default");

            properties.insert(param_name.clone(), prop);

            if is_required == Some(true) {
                required.push(param_name.clone());
            } else if is_optional || is_required == Some(false) {
                // explicitly optional
            } else if !has_default {
                required.push(param_name.clone());
            }
        }
    }

    serde_json::json!({
        "type": "object",
        "properties": properties,
        "required": required,
    })
}

fn type_to_json_schema(type_str: &str) -> Value {
    let json_type = match type_str {
        "string" | "str" => "string",
        "integer" | "int" | "i32" | "i64" | "u32" | "u64" => "integer",
        "number" | "float" | "f32" | "f64" => "number",
        "boolean" | "bool" => "boolean",
        "array" | "list" | "vec" => "array",
        "object" | "dict" | "map" => "object",
        _ => "string",
    };
    serde_json::json!({ "type": json_type })
}

/// Fluent builder for [`Tool`]. Start with [`tool`], add parameters with
/// [`ToolBuilder::param`] or a full schema with [`ToolBuilder::schema`], then
/// finish with [`ToolBuilder::build`].
pub struct ToolBuilder {
    name: String,
    description: String,
    schema: Value,
    strict: bool,
}

impl ToolBuilder {
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            schema: serde_json::json!({}),
            strict: false,
        }
    }

    /// Replace the schema wholesale. Overwrites anything added via `.param()`.
    pub fn schema(mut self, schema: Value) -> Self {
        self.schema = schema;
        self
    }

    /// Add one required parameter with a simple type string. Resets the
    /// schema to an empty object first if `.schema()` set it to something
    /// that isn't an object.
    pub fn param(mut self, name: &str, type_str: &str) -> Self {
        if !self.schema.is_object() {
            self.schema = serde_json::json!({});
        }
        let obj = self.schema.as_object_mut().expect("just ensured object");
        obj.insert(name.to_string(), Value::String(type_str.to_string()));
        self
    }

    pub fn strict(mut self, strict: bool) -> Self {
        self.strict = strict;
        self
    }

    pub fn build<F, Fut>(self, handler: F) -> Tool
    where
        F: Fn(Value) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Value>> + Send + 'static,
    {
        Tool::new(self.name, self.description, self.schema, handler).strict(self.strict)
    }
}

/// Start building a tool: `tool("name", "description").param(...).build(handler)`.
pub fn tool(name: impl Into<String>, description: impl Into<String>) -> ToolBuilder {
    ToolBuilder::new(name, description)
}

/// Helper for handlers that need to pull a required argument out of the
/// parsed input, returning a consistent `AgentError::InvalidInput` if it's
/// missing or the wrong shape.
pub fn required_str<'a>(args: &'a Value, key: &str) -> Result<&'a str> {
    args.get(key)
        .and_then(|v| v.as_str())
        .ok_or_else(|| AgentError::invalid_input(format!("missing or non-string parameter '{key}'")))
}

pub fn required_f64(args: &Value, key: &str) -> Result<f64> {
    args.get(key)
        .and_then(|v| v.as_f64())
        .ok_or_else(|| AgentError::invalid_input(format!("missing or non-numeric parameter '{key}'")))
}
