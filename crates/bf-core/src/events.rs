//! Live-update bus for per-event SSE broadcasting.
//!
//! [`EventBus`] wraps a `tokio::sync::broadcast` channel with a bounded
//! ring-buffer of recent updates so that late-joining booth screens can catch
//! up. Publishing never fails: with no subscribers the update is only kept in
//! the ring buffer.

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use tokio::sync::broadcast;
use uuid::Uuid;

use crate::artifact::Artifact;
use crate::ids::EventId;
use crate::ports::LiveChannel;

/// Maximum number of updates retained in the ring buffer.
const MAX_RECENT_UPDATES: usize = 100;

// ---------------------------------------------------------------------------
// LiveUpdate
// ---------------------------------------------------------------------------

/// Payload describing what happened within an event.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum LiveUpdate {
    ArtifactCreated {
        artifact: Artifact,
    },
    /// The AI endpoint is warming up; the next attempt follows the wait.
    RestyleWaiting {
        style: String,
        estimated_wait_secs: u64,
        attempt: u32,
    },
    ArtifactsWiped {
        count: usize,
    },
}

// ---------------------------------------------------------------------------
// Envelope
// ---------------------------------------------------------------------------

/// A timestamped update scoped to one event.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Envelope {
    pub id: Uuid,
    pub timestamp: DateTime<Utc>,
    pub event_id: EventId,
    pub update: LiveUpdate,
}

impl Envelope {
    pub fn new(event_id: EventId, update: LiveUpdate) -> Self {
        Self {
            id: Uuid::new_v4(),
            timestamp: Utc::now(),
            event_id,
            update,
        }
    }
}

// ---------------------------------------------------------------------------
// EventBus
// ---------------------------------------------------------------------------

/// Broadcast channel with a bounded ring buffer of recent updates.
pub struct EventBus {
    tx: broadcast::Sender<Envelope>,
    recent: RwLock<VecDeque<Envelope>>,
}

impl EventBus {
    /// Create a new bus; `capacity` sizes the broadcast channel buffer.
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self {
            tx,
            recent: RwLock::new(VecDeque::with_capacity(MAX_RECENT_UPDATES)),
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Envelope> {
        self.tx.subscribe()
    }

    /// Return up to `n` recent updates for one event (newest first).
    pub fn recent_for(&self, event_id: EventId, n: usize) -> Vec<Envelope> {
        self.recent
            .read()
            .iter()
            .filter(|e| e.event_id == event_id)
            .take(n)
            .cloned()
            .collect()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(256)
    }
}

impl LiveChannel for EventBus {
    fn publish(&self, event_id: EventId, update: LiveUpdate) {
        let envelope = Envelope::new(event_id, update);

        {
            let mut recent = self.recent.write();
            if recent.len() >= MAX_RECENT_UPDATES {
                recent.pop_back();
            }
            recent.push_front(envelope.clone());
        }

        // No subscribers is fine.
        let _ = self.tx.send(envelope);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn waiting(attempt: u32) -> LiveUpdate {
        LiveUpdate::RestyleWaiting {
            style: "Anime".into(),
            estimated_wait_secs: 5,
            attempt,
        }
    }

    #[test]
    fn publish_and_receive() {
        let bus = EventBus::new(16);
        let mut rx = bus.subscribe();
        let event_id = EventId::new();

        bus.publish(event_id, waiting(1));

        let envelope = rx.try_recv().unwrap();
        assert_eq!(envelope.event_id, event_id);
        assert!(matches!(envelope.update, LiveUpdate::RestyleWaiting { attempt: 1, .. }));
    }

    #[test]
    fn recent_is_capped_and_scoped() {
        let bus = EventBus::default();
        let a = EventId::new();
        let b = EventId::new();
        for i in 0..150 {
            bus.publish(a, waiting(i));
        }
        bus.publish(b, LiveUpdate::ArtifactsWiped { count: 2 });

        assert_eq!(bus.recent_for(a, 500).len(), MAX_RECENT_UPDATES - 1);
        let for_b = bus.recent_for(b, 10);
        assert_eq!(for_b.len(), 1);
        assert!(matches!(for_b[0].update, LiveUpdate::ArtifactsWiped { count: 2 }));
    }

    #[test]
    fn newest_first() {
        let bus = EventBus::default();
        let id = EventId::new();
        bus.publish(id, waiting(1));
        bus.publish(id, waiting(2));
        let recent = bus.recent_for(id, 1);
        assert!(matches!(recent[0].update, LiveUpdate::RestyleWaiting { attempt: 2, .. }));
    }

    #[test]
    fn no_subscribers_does_not_panic() {
        let bus = EventBus::new(4);
        bus.publish(EventId::new(), LiveUpdate::ArtifactsWiped { count: 0 });
    }

    #[test]
    fn envelope_serializes_tagged() {
        let env = Envelope::new(EventId::new(), waiting(3));
        let json = serde_json::to_value(&env).unwrap();
        assert_eq!(json["update"]["type"], "restyle_waiting");
        assert_eq!(json["update"]["estimated_wait_secs"], 5);
    }
}
