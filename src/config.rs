//! Configuration resolution: base-URL/model defaulting for the six dialect
//! capabilities, with environment-variable overrides.
//!
//! Defaults are keyed on [`crate::dialect::Capability`] rather than a second,
//! near-identical provider enum — see DESIGN.md for why. Resolution priority
//! is env var > explicit argument > capability default, with `AGENT_KERNEL_*`
//! env-var names and a `prefer_env` opt-in on `get_model`.

use crate::dialect::Capability;
use std::env;

/// Default base URL for each dialect capability. These are sensible,
/// widely-documented endpoints; any of them can be overridden per call via
/// `fallback` or globally via `AGENT_KERNEL_BASE_URL`.
pub fn default_url(capability: Capability) -> &'static str {
    match capability {
        Capability::Openai => "https://api.openai.com/v1",
        Capability::Anthropic => "https://api.anthropic.com/v1",
        Capability::Gemini => "https://generativelanguage.googleapis.com/v1beta",
        Capability::Glm => "https://open.bigmodel.cn/api/paas/v4",
        Capability::Dashscope => "https://dashscope.aliyuncs.com/compatible-mode/v1",
        Capability::Deepseek => "https://api.deepseek.com/v1",
    }
}

/// Resolve the base URL to use, in priority order:
/// 1. `AGENT_KERNEL_BASE_URL` environment variable.
/// 2. `capability`'s default URL, if given.
/// 3. `fallback`, if given.
/// 4. OpenAI's default URL as the ultimate fallback.
pub fn get_base_url(capability: Option<Capability>, fallback: Option<&str>) -> String {
    if let Ok(url) = env::var("AGENT_KERNEL_BASE_URL") {
        return url;
    }
    if let Some(cap) = capability {
        return default_url(cap).to_string();
    }
    fallback.unwrap_or_else(|| default_url(Capability::Openai)).to_string()
}

/// Resolve the model name to use.
///
/// If `prefer_env` is true, `AGENT_KERNEL_MODEL` is checked first; otherwise
/// only `fallback` is consulted. Returns `None` if nothing resolves.
pub fn get_model(fallback: Option<&str>, prefer_env: bool) -> Option<String> {
    if prefer_env {
        if let Ok(model) = env::var("AGENT_KERNEL_MODEL") {
            return Some(model);
        }
    }
    fallback.map(|s| s.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    // Environment variables are process-global; serialize the tests that
    // touch AGENT_KERNEL_* so they don't race each other.
    static ENV_LOCK: Mutex<()> = Mutex::new(());

    #[test]
    fn default_urls_cover_every_capability() {
        assert_eq!(default_url(Capability::Openai), "https://api.openai.com/v1");
        assert_eq!(default_url(Capability::Deepseek), "https://api.deepseek.com/v1");
        assert_eq!(default_url(Capability::Glm), "https://open.bigmodel.cn/api/paas/v4");
    }

    #[test]
    fn get_base_url_prefers_capability_default() {
        let _guard = ENV_LOCK.lock().unwrap();
        // SAFETY: serialized via ENV_LOCK; no other test reads/writes this var concurrently.
        unsafe { env::remove_var("AGENT_KERNEL_BASE_URL") };
        let url = get_base_url(Some(Capability::Deepseek), None);
        assert_eq!(url, "https://api.deepseek.com/v1");
    }

    #[test]
    fn get_base_url_falls_back_to_explicit_value() {
        let _guard = ENV_LOCK.lock().unwrap();
        // SAFETY: serialized via ENV_LOCK.
        unsafe { env::remove_var("AGENT_KERNEL_BASE_URL") };
        let url = get_base_url(None, Some("http://localhost:1234/v1"));
        assert_eq!(url, "http://localhost:1234/v1");
    }

    #[test]
    fn get_base_url_env_var_overrides_everything() {
        let _guard = ENV_LOCK.lock().unwrap();
        // SAFETY: serialized via ENV_LOCK; restored at the end of the test.
        unsafe { env::set_var("AGENT_KERNEL_BASE_URL", "http://custom:9000/v1") };
        let url = get_base_url(Some(Capability::Openai), None);
        assert_eq!(url, "http://custom:9000/v1");
        // SAFETY: serialized via ENV_LOCK.
        unsafe { env::remove_var("AGENT_KERNEL_BASE_URL") };
    }

    #[test]
    fn get_model_without_prefer_env_ignores_environment() {
        let _guard = ENV_LOCK.lock().unwrap();
        // SAFETY: serialized via ENV_LOCK.
        unsafe { env::set_var("AGENT_KERNEL_MODEL", "should-not-be-used") };
        let model = get_model(Some("gpt-4o"), false);
        assert_eq!(model, Some("gpt-4o".to_string()));
        // SAFETY: serialized via ENV_LOCK.
        unsafe { env::remove_var("AGENT_KERNEL_MODEL") };
    }

    #[test]
    fn get_model_returns_none_when_nothing_resolves() {
        let _guard = ENV_LOCK.lock().unwrap();
        // SAFETY: serialized via ENV_LOCK.
        unsafe { env::remove_var("AGENT_KERNEL_MODEL") };
        assert_eq!(get_model(None, true), None);
    }
}
