//! The session store (C8): save/load an [`crate::agent::Agent`]'s memory and
//! HITL-stopped flag under a string key.
//!
//! Wholly new relative to the donor SDK, which had no persistence concept.
//! `SessionBackend` is a small storage-agnostic trait (à la the registry's
//! "name-keyed map behind a trait object" shape) so the default in-process
//! `HashMap` backend can later be swapped for a file- or database-backed one
//! without touching call sites.

use crate::agent::Agent;
use crate::error::{AgentError, Result};
use crate::types::Msg;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};

/// The version of [`SessionDocument`]'s JSON shape. Bumped if the shape ever
/// changes incompatibly; `load` does not currently reject a mismatched
/// version, it just carries it through unchanged (§6: "unknown fields
/// preserved").
pub const SESSION_FORMAT_VERSION: u32 = 1;

/// A saved agent's state, exactly the `{version, memory, flags}` shape
/// described in §6.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionDocument {
    pub version: u32,
    pub memory: Vec<Msg>,
    pub flags: SessionFlags,
    #[serde(flatten, default)]
    pub extra: serde_json::Map<String, Value>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SessionFlags {
    pub stopped: bool,
}

/// Storage-agnostic backend for session documents, addressed by an opaque
/// string key.
#[async_trait]
pub trait SessionBackend: Send + Sync {
    async fn save(&self, key: &str, document: Value) -> Result<()>;
    async fn load(&self, key: &str) -> Result<Value>;
    async fn exists(&self, key: &str) -> Result<bool>;
}

/// The default backend: an in-process `HashMap`. Sessions do not outlive the
/// process; swap in a different [`SessionBackend`] for durability.
#[derive(Default)]
pub struct InMemorySessionBackend {
    sessions: RwLock<HashMap<String, Value>>,
}

impl InMemorySessionBackend {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SessionBackend for InMemorySessionBackend {
    async fn save(&self, key: &str, document: Value) -> Result<()> {
        self.sessions.write().unwrap().insert(key.to_string(), document);
        Ok(())
    }

    async fn load(&self, key: &str) -> Result<Value> {
        self.sessions
            .read()
            .unwrap()
            .get(key)
            .cloned()
            .ok_or_else(|| AgentError::session_not_found(key))
    }

    async fn exists(&self, key: &str) -> Result<bool> {
        Ok(self.sessions.read().unwrap().contains_key(key))
    }
}

/// Save `agent`'s current memory and stopped flag under `key` in `backend`.
pub async fn save(backend: &dyn SessionBackend, key: &str, agent: &Agent) -> Result<()> {
    let document = SessionDocument {
        version: SESSION_FORMAT_VERSION,
        memory: agent.memory_snapshot().await,
        flags: SessionFlags { stopped: agent.is_stopped().await },
        extra: serde_json::Map::new(),
    };
    let value = serde_json::to_value(document).map_err(|e| AgentError::parse(e.to_string()))?;
    backend.save(key, value).await
}

/// Restore `agent`'s memory and stopped flag from the session saved under
/// `key` in `backend`. `AgentError::SessionNotFound` if the key is unknown.
pub async fn load(backend: &dyn SessionBackend, key: &str, agent: &Agent) -> Result<()> {
    let value = backend.load(key).await?;
    let document: SessionDocument = serde_json::from_value(value).map_err(|e| AgentError::parse(e.to_string()))?;
    agent.restore_memory(document.memory).await;
    agent.set_stopped(document.flags.stopped);
    Ok(())
}

/// Convenience wrapper bundling a backend with its own session key, so an
/// agent's natural persistence point doesn't need to thread both through
/// every call site.
pub struct SessionHandle {
    backend: Arc<dyn SessionBackend>,
    key: String,
}

impl SessionHandle {
    pub fn new(backend: Arc<dyn SessionBackend>, key: impl Into<String>) -> Self {
        Self { backend, key: key.into() }
    }

    pub async fn save(&self, agent: &Agent) -> Result<()> {
        save(self.backend.as_ref(), &self.key, agent).await
    }

    pub async fn load(&self, agent: &Agent) -> Result<()> {
        load(self.backend.as_ref(), &self.key, agent).await
    }

    pub async fn exists(&self) -> Result<bool> {
        self.backend.exists(&self.key).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::AgentOptions;

    fn agent() -> Agent {
        let options = AgentOptions::builder().model("gpt-4").base_url("http://localhost:1234/v1").build().unwrap();
        Agent::new(options)
    }

    #[tokio::test]
    async fn load_unknown_key_is_session_not_found() {
        let backend = InMemorySessionBackend::new();
        let agent = agent();
        let err = load(&backend, "missing", &agent).await.unwrap_err();
        assert!(matches!(err, AgentError::SessionNotFound(_)));
    }

    #[tokio::test]
    async fn save_then_load_roundtrips_memory_and_stopped_flag() {
        let backend = InMemorySessionBackend::new();
        let agent = agent();
        agent.receive_external(Msg::user("hi")).await;
        agent.set_stopped(true);

        save(&backend, "turn-1", &agent).await.unwrap();
        assert!(backend.exists("turn-1").await.unwrap());

        let restored = self::tests::agent();
        load(&backend, "turn-1", &restored).await.unwrap();
        assert_eq!(restored.memory_len().await, 1);
        assert!(restored.is_stopped().await);
    }

    #[tokio::test]
    async fn session_handle_bundles_backend_and_key() {
        let handle = SessionHandle::new(Arc::new(InMemorySessionBackend::new()), "s1");
        let agent = agent();
        assert!(!handle.exists().await.unwrap());
        handle.save(&agent).await.unwrap();
        assert!(handle.exists().await.unwrap());
    }
}
