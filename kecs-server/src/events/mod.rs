//! L5 WebSocket/Event Bridge: polls the emulation backend for ECS events
//! and fans them out to subscribed UI clients (spec 4.4, 6, 9).
//!
//! The AWS event processor's dynamic dispatch by event-type string becomes
//! the exhaustive `EcsEvent` tagged variant the redesign flags call for.

use kecs_definitions::client::BackendClient;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;

const CHANNEL_CAPACITY: usize = 256;
const POLL_INTERVAL: Duration = Duration::from_secs(2);

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum EcsEvent {
    TaskStateChange {
        resource_id: String,
        timestamp: chrono::DateTime<chrono::Utc>,
        payload: Value,
    },
    ServiceAction {
        resource_id: String,
        timestamp: chrono::DateTime<chrono::Utc>,
        payload: Value,
    },
    ClusterStateChange {
        resource_id: String,
        timestamp: chrono::DateTime<chrono::Utc>,
        payload: Value,
    },
    ContainerInstance {
        resource_id: String,
        timestamp: chrono::DateTime<chrono::Utc>,
        payload: Value,
    },
}

impl EcsEvent {
    fn event_type(&self) -> &'static str {
        match self {
            EcsEvent::TaskStateChange { .. } => "task_status_changed",
            EcsEvent::ServiceAction { .. } => "service_updated",
            EcsEvent::ClusterStateChange { .. } => "cluster_updated",
            EcsEvent::ContainerInstance { .. } => "container_instance_updated",
        }
    }

    fn resource_type(&self) -> &'static str {
        match self {
            EcsEvent::TaskStateChange { .. } => "task",
            EcsEvent::ServiceAction { .. } => "service",
            EcsEvent::ClusterStateChange { .. } => "cluster",
            EcsEvent::ContainerInstance { .. } => "containerInstance",
        }
    }

    fn resource_id(&self) -> &str {
        match self {
            EcsEvent::TaskStateChange { resource_id, .. }
            | EcsEvent::ServiceAction { resource_id, .. }
            | EcsEvent::ClusterStateChange { resource_id, .. }
            | EcsEvent::ContainerInstance { resource_id, .. } => resource_id,
        }
    }

    fn timestamp(&self) -> chrono::DateTime<chrono::Utc> {
        match self {
            EcsEvent::TaskStateChange { timestamp, .. }
            | EcsEvent::ServiceAction { timestamp, .. }
            | EcsEvent::ClusterStateChange { timestamp, .. }
            | EcsEvent::ContainerInstance { timestamp, .. } => *timestamp,
        }
    }

    fn payload(&self) -> &Value {
        match self {
            EcsEvent::TaskStateChange { payload, .. }
            | EcsEvent::ServiceAction { payload, .. }
            | EcsEvent::ClusterStateChange { payload, .. }
            | EcsEvent::ContainerInstance { payload, .. } => payload,
        }
    }

    /// The wire shape UI clients receive over `/ws` (spec 6).
    pub fn to_message(&self) -> Value {
        json!({
            "type": self.event_type(),
            "resourceType": self.resource_type(),
            "resourceId": self.resource_id(),
            "timestamp": self.timestamp(),
            "payload": self.payload(),
        })
    }
}

/// Raw shape the emulation backend reports events in; translated into
/// `EcsEvent` before fan-out so every downstream consumer matches
/// exhaustively on the tagged variant rather than a string.
#[derive(Debug, Deserialize)]
struct RawEvent {
    resource_type: String,
    resource_id: String,
    timestamp: chrono::DateTime<chrono::Utc>,
    #[serde(default)]
    payload: Value,
}

impl RawEvent {
    fn into_ecs_event(self) -> Option<EcsEvent> {
        let (resource_id, timestamp, payload) = (self.resource_id, self.timestamp, self.payload);
        match self.resource_type.as_str() {
            "task" => Some(EcsEvent::TaskStateChange { resource_id, timestamp, payload }),
            "service" => Some(EcsEvent::ServiceAction { resource_id, timestamp, payload }),
            "cluster" => Some(EcsEvent::ClusterStateChange { resource_id, timestamp, payload }),
            "containerInstance" => Some(EcsEvent::ContainerInstance { resource_id, timestamp, payload }),
            _ => None,
        }
    }
}

/// Broadcast hub: every subscriber (one per open `/ws` connection) gets a
/// copy of every published event. Lagging subscribers drop the oldest
/// events rather than blocking publishers.
#[derive(Clone)]
pub struct EventBus {
    sender: broadcast::Sender<EcsEvent>,
}

impl EventBus {
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(CHANNEL_CAPACITY);
        EventBus { sender }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<EcsEvent> {
        self.sender.subscribe()
    }

    pub fn publish(&self, event: EcsEvent) {
        let _ = self.sender.send(event);
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

/// Polls the emulation backend for new events on an interval and republishes
/// them on `bus`. Runs until `shutdown` resolves; a no-op under
/// `BackendMode::Test`, since there is no backend to poll.
pub async fn poll_backend_events(backend: BackendClient, bus: Arc<EventBus>) {
    if backend.mode() == kecs_definitions::client::BackendMode::Test {
        return;
    }
    let mut ticker = tokio::time::interval(POLL_INTERVAL);
    loop {
        ticker.tick().await;
        match backend.call::<Vec<RawEvent>>("KecsEmulation.ListEvents", &json!({})).await {
            Ok(events) => {
                for raw in events {
                    if let Some(event) = raw.into_ecs_event() {
                        bus.publish(event);
                    }
                }
            }
            Err(e) => {
                tracing::debug!(error = %e, "event poll failed, retrying next tick");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn message_shape_matches_wire_contract() {
        let event = EcsEvent::TaskStateChange {
            resource_id: "task-1".to_string(),
            timestamp: chrono::Utc::now(),
            payload: json!({"lastStatus": "RUNNING"}),
        };
        let msg = event.to_message();
        assert_eq!(msg["type"], "task_status_changed");
        assert_eq!(msg["resourceType"], "task");
        assert_eq!(msg["resourceId"], "task-1");
    }

    #[tokio::test]
    async fn subscribers_receive_published_events() {
        let bus = EventBus::new();
        let mut rx = bus.subscribe();
        bus.publish(EcsEvent::ClusterStateChange {
            resource_id: "cluster-1".to_string(),
            timestamp: chrono::Utc::now(),
            payload: Value::Null,
        });
        let received = rx.recv().await.unwrap();
        assert_eq!(received.resource_id(), "cluster-1");
    }
}
