//! The multi-agent message hub (C7): a scoped broadcast domain over a set of
//! [`crate::agent::Agent`]s.
//!
//! Wholly new relative to the donor SDK (which only ever drove one agent at a
//! time); the RAII shape of the scope guard generalizes the donor `Client`'s
//! `Arc<AtomicBool>` interrupt-flag lifecycle into a Drop-based teardown.
//! Participants are held by strong `Arc<Agent>` reference from the hub side;
//! each agent only learns of the hub through a `Weak` back-pointer it is
//! handed on `add()`, so a hub and its participants never form a reference
//! cycle (§9: "Hub↔Agent subscriptions are weak relations").

use crate::agent::Agent;
use crate::error::{AgentError, Result};
use crate::types::Msg;
use std::collections::HashMap;
use std::sync::{Arc, RwLock, Weak};

/// A weak back-pointer an [`Agent`] holds to the hub it has joined, so it can
/// deliver its own final message to the rest of the hub after `call()`
/// returns. Structural bookkeeping only — never kept alive past the hub's own
/// lifetime, so it cannot itself create a cycle.
#[derive(Clone)]
pub(crate) struct HubLink {
    inner: Weak<HubInner>,
}

impl HubLink {
    /// Deliver `msg` to the rest of the hub, respecting `enable_auto_broadcast`.
    /// Called by [`crate::agent::Agent::call`] when it returns a final message
    /// and this agent has joined a hub.
    pub(crate) async fn auto_deliver(&self, msg: Msg) {
        if let Some(inner) = self.inner.upgrade() {
            Hub { inner }.auto_deliver(msg).await;
        }
    }
}

/// Read-only view of one hub participant, returned by [`Hub::participants`].
#[derive(Debug, Clone)]
pub struct HubParticipant {
    pub name: String,
}

struct HubInner {
    participants: RwLock<HashMap<String, Arc<Agent>>>,
    announcement: Option<Msg>,
    auto_broadcast: std::sync::atomic::AtomicBool,
}

/// A broadcast domain. Cheaply `Clone`-able (an `Arc` handle); every clone
/// refers to the same underlying participant set.
#[derive(Clone)]
pub struct Hub {
    inner: Arc<HubInner>,
}

impl Hub {
    /// Create an empty hub. `announcement`, if given, is delivered to every
    /// participant's memory exactly once, the first time [`Hub::enter`] is
    /// called — not on `add()`.
    pub fn new(announcement: Option<Msg>) -> Self {
        Self {
            inner: Arc::new(HubInner {
                participants: RwLock::new(HashMap::new()),
                announcement,
                auto_broadcast: std::sync::atomic::AtomicBool::new(true),
            }),
        }
    }

    pub fn enable_auto_broadcast(&self, enabled: bool) {
        self.inner.auto_broadcast.store(enabled, std::sync::atomic::Ordering::SeqCst);
    }

    fn auto_broadcast(&self) -> bool {
        self.inner.auto_broadcast.load(std::sync::atomic::Ordering::SeqCst)
    }

    /// Add a participant, wiring it bidirectionally with every existing
    /// member: from this point on, a broadcast from any participant reaches
    /// every other one, including the newcomer.
    ///
    /// `agent` must have a name (set via its `AgentOptions`) — identity in
    /// the hub is by name, since a delivered broadcast names its sender so
    /// the receiver can skip re-delivering to itself.
    pub async fn add(&self, agent: Arc<Agent>) -> Result<()> {
        let name = agent
            .name()
            .ok_or_else(|| AgentError::invalid_input("an agent joining a Hub must have a name"))?
            .to_string();

        agent
            .attach_hub(HubLink {
                inner: Arc::downgrade(&self.inner),
            })
            .await;

        let mut participants = self.inner.participants.write().unwrap();
        participants.insert(name, agent);
        Ok(())
    }

    /// Remove a participant. Its hub link is cleared so it stops delivering
    /// broadcasts here; already-delivered messages in its memory are
    /// untouched.
    pub async fn delete(&self, name: &str) {
        let removed = self.inner.participants.write().unwrap().remove(name);
        if let Some(agent) = removed {
            agent.detach_hub().await;
        }
    }

    /// The names currently joined.
    pub fn participants(&self) -> Vec<HubParticipant> {
        self.inner
            .participants
            .read()
            .unwrap()
            .keys()
            .map(|name| HubParticipant { name: name.clone() })
            .collect()
    }

    /// Deliver the hub's announcement (if any) to every current participant.
    /// Idempotent in the sense that calling it twice delivers it twice —
    /// callers are expected to call this once, right after assembling the
    /// initial participant set.
    pub async fn enter(&self) {
        let Some(announcement) = self.inner.announcement.clone() else {
            return;
        };
        let agents: Vec<Arc<Agent>> = self.inner.participants.read().unwrap().values().cloned().collect();
        for agent in agents {
            agent.receive_external(announcement.clone()).await;
        }
    }

    /// Append `msg` to every participant's memory except the one named by
    /// `msg.name` (the sender). Delivered as a USER-role message bearing the
    /// sender's name, regardless of the sender's own role, per §4.7.
    pub async fn broadcast(&self, msg: Msg) {
        let sender = msg.name.clone();
        let delivered = Msg::user_blocks(msg.content.clone()).with_metadata(msg.metadata.clone());
        let delivered = match &sender {
            Some(name) => delivered.with_name(name.clone()),
            None => delivered,
        };

        let agents: Vec<(String, Arc<Agent>)> = self
            .inner
            .participants
            .read()
            .unwrap()
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();

        for (name, agent) in agents {
            if Some(&name) == sender.as_ref() {
                continue;
            }
            agent.receive_external(delivered.clone()).await;
        }
    }

    /// Deliver `msg` to the hub as if it were the final message of one of
    /// the agent's calls. Called by [`Agent::call`] when the agent has a hub
    /// link and auto-broadcast is enabled; exposed for manual broadcast too.
    pub(crate) async fn auto_deliver(&self, msg: Msg) {
        if self.auto_broadcast() {
            self.broadcast(msg).await;
        }
    }

    /// Remove every participant, detaching their hub links. Equivalent to
    /// calling [`Hub::delete`] on each one; the hub itself remains usable
    /// (an empty hub is a valid, if inert, hub).
    pub async fn close(&self) {
        let names: Vec<String> = self.inner.participants.read().unwrap().keys().cloned().collect();
        for name in names {
            self.delete(&name).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::{Agent, AgentOptions};

    fn agent_named(name: &str) -> Arc<Agent> {
        let options = AgentOptions::builder()
            .name(name)
            .model("gpt-4")
            .base_url("http://localhost:1234/v1")
            .build()
            .unwrap();
        Arc::new(Agent::new(options))
    }

    #[tokio::test]
    async fn add_requires_a_name() {
        let options = AgentOptions::builder().model("gpt-4").base_url("http://localhost:1234/v1").build().unwrap();
        let agent = Arc::new(Agent::new(options));
        let hub = Hub::new(None);
        assert!(hub.add(agent).await.is_err());
    }

    #[tokio::test]
    async fn broadcast_reaches_everyone_but_sender() {
        let hub = Hub::new(None);
        let a = agent_named("a");
        let b = agent_named("b");
        let c = agent_named("c");
        hub.add(a.clone()).await.unwrap();
        hub.add(b.clone()).await.unwrap();
        hub.add(c.clone()).await.unwrap();

        hub.broadcast(Msg::assistant_text("hello").with_name("a")).await;

        assert_eq!(a.memory_len().await, 0);
        assert_eq!(b.memory_len().await, 1);
        assert_eq!(c.memory_len().await, 1);

        let delivered = b.memory_snapshot().await;
        assert_eq!(delivered[0].name.as_deref(), Some("a"));
        assert_eq!(delivered[0].extract_text(), "hello");
    }

    #[tokio::test]
    async fn enter_delivers_announcement_once() {
        let hub = Hub::new(Some(Msg::system("welcome")));
        let a = agent_named("a");
        hub.add(a.clone()).await.unwrap();
        hub.enter().await;
        assert_eq!(a.memory_len().await, 1);
    }

    #[tokio::test]
    async fn close_detaches_every_participant() {
        let hub = Hub::new(None);
        let a = agent_named("a");
        hub.add(a.clone()).await.unwrap();
        hub.close().await;
        assert!(hub.participants().is_empty());
        // Broadcasts after close no longer reach the detached agent.
        hub.broadcast(Msg::assistant_text("late").with_name("someone else")).await;
        assert_eq!(a.memory_len().await, 0);
    }

    #[tokio::test]
    async fn auto_broadcast_can_be_disabled() {
        let hub = Hub::new(None);
        hub.enable_auto_broadcast(false);
        let a = agent_named("a");
        let b = agent_named("b");
        hub.add(a.clone()).await.unwrap();
        hub.add(b.clone()).await.unwrap();

        hub.auto_deliver(Msg::assistant_text("hi").with_name("a")).await;
        assert_eq!(b.memory_len().await, 0);
    }
}
