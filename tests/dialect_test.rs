//! Integration tests for the provider dialect layer, exercising
//! capability detection together with the formatting/quirk/option pipeline
//! end to end rather than one function at a time.

use agent_kernel::dialect::wire::OpenAIRequest;
use agent_kernel::dialect::{self, Capability, GenerateOptions, ToolChoice};
use agent_kernel::Msg;

#[test]
fn deepseek_capability_is_detected_from_base_url_and_carries_its_quirks_end_to_end() {
    let capability = Capability::detect("https://api.deepseek.com/v1", "deepseek-chat");
    assert_eq!(capability, Capability::Deepseek);

    let history = vec![Msg::system("be terse"), Msg::user("hi"), Msg::assistant_text("hello there")];
    let mut wire_messages = dialect::format_single_agent(&history);
    dialect::apply_quirks(capability, &mut wire_messages, false);

    // system -> user rewrite, and no system role survives.
    assert!(wire_messages.iter().all(|m| m.role != "system"));
    // trailing assistant turn gets an empty user turn appended so the next
    // request doesn't end on an assistant message.
    assert_eq!(wire_messages.last().unwrap().role, "user");
}

#[test]
fn glm_capability_synthesizes_a_user_turn_when_none_exists() {
    let capability = Capability::detect("https://open.bigmodel.cn/api/paas/v4", "glm-4");
    assert_eq!(capability, Capability::Glm);

    // GLM's capability table supports a specific function choice, but the
    // GLM quirk (§4.5) forces tool_choice="auto" whenever tools are present,
    // overriding that support.
    let mut request = OpenAIRequest::new("glm-4".to_string(), vec![]);
    dialect::apply_tool_choice(&mut request, capability, &ToolChoice::Specific("lookup".to_string()), true);
    assert_eq!(request.tool_choice, Some(serde_json::Value::String("auto".to_string())));

    let history = vec![Msg::system("be terse")];
    let mut wire_messages = dialect::format_single_agent(&history);
    dialect::apply_quirks(capability, &mut wire_messages, true);
    assert!(wire_messages.iter().any(|m| m.role == "user"));
}

#[test]
fn gemini_degrades_a_specific_tool_choice_to_required() {
    let mut request = OpenAIRequest::new("gemini-1.5-pro".to_string(), vec![]);
    dialect::apply_tool_choice(&mut request, Capability::Gemini, &ToolChoice::Specific("lookup".to_string()), true);
    assert_eq!(request.tool_choice, Some(serde_json::Value::String("required".to_string())));
}

#[test]
fn reasoning_models_drop_sampling_fields_even_when_the_caller_set_them() {
    let mut request = OpenAIRequest::new("o1-preview".to_string(), vec![]);
    let options = GenerateOptions {
        temperature: Some(0.9),
        top_p: Some(0.5),
        ..Default::default()
    };
    dialect::apply_options(&mut request, "o1-preview", &options);

    assert!(request.temperature.is_none());
    assert!(request.top_p.is_none());
    assert_eq!(request.max_tokens, Some(4000));
}

#[test]
fn system_message_carrying_a_tool_result_is_rewritten_to_tool_role() {
    use agent_kernel::{ContentBlock, MessageRole, ToolResultBlock};

    let msg = Msg::new(
        MessageRole::System,
        vec![ContentBlock::ToolResult(ToolResultBlock::text("call_1", "lookup", "42"))],
    );
    let wire = dialect::format_single_agent(std::slice::from_ref(&msg));
    assert_eq!(wire[0].role, "tool");
    assert_eq!(wire[0].tool_call_id.as_deref(), Some("call_1"));
}
