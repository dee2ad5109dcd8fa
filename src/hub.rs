//! Change broadcast hub
//!
//! Every connected WebSocket client subscribes here. When the registrant set
//! changes, the hub sends a content-free `data_updated` signal and clients
//! re-query the REST API themselves.
//!
//! ```text
//! WaitlistService (successful mutation)   ws client (new_registration)
//!          │                                        │
//!          └──────────────► BroadcastHub ◄──────────┘
//!                               │
//!                               └─► every connected ws client
//! ```
//!
//! There is no replay: a client that is not connected when a signal goes out
//! never sees it.

use serde::{Deserialize, Serialize};
use std::time::Duration;
use tokio::sync::broadcast;
use tracing::debug;

/// Configuration for the broadcast hub
#[derive(Debug, Clone)]
pub struct BroadcastHubConfig {
    /// Broadcast channel capacity (default: 64)
    pub channel_capacity: usize,
    /// WebSocket ping interval (default: 30s)
    pub heartbeat_interval: Duration,
}

impl Default for BroadcastHubConfig {
    fn default() -> Self {
        Self {
            channel_capacity: 64,
            heartbeat_interval: Duration::from_secs(30),
        }
    }
}

/// Messages sent to WebSocket clients
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    /// Registrant set changed; re-query
    DataUpdated,
    /// Reply to a client `ping`
    Pong,
}

/// Messages from WebSocket clients
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    /// A registration happened outside the REST API; tell everyone
    NewRegistration {
        /// Optional client payload, only logged
        #[serde(default)]
        data: Option<serde_json::Value>,
    },
    Ping,
}

/// Process-wide fan-out of change signals
pub struct BroadcastHub {
    config: BroadcastHubConfig,
    tx: broadcast::Sender<ServerMessage>,
}

impl BroadcastHub {
    pub fn new(config: BroadcastHubConfig) -> Self {
        let (tx, _) = broadcast::channel(config.channel_capacity);
        Self { config, tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ServerMessage> {
        self.tx.subscribe()
    }

    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }

    /// Tell every current subscriber that the registrant set changed.
    /// Returns how many subscribers the signal reached.
    pub fn notify_data_updated(&self, reason: &str) -> usize {
        // send() only fails when nobody is listening
        let reached = self.tx.send(ServerMessage::DataUpdated).unwrap_or(0);
        debug!(reason = %reason, subscribers = reached, "Broadcast data_updated");
        reached
    }

    pub fn heartbeat_interval(&self) -> Duration {
        self.config.heartbeat_interval
    }
}

impl Default for BroadcastHub {
    fn default() -> Self {
        Self::new(BroadcastHubConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::broadcast::error::TryRecvError;

    #[test]
    fn test_notify_without_subscribers() {
        let hub = BroadcastHub::default();
        assert_eq!(hub.subscriber_count(), 0);
        assert_eq!(hub.notify_data_updated("test"), 0);
    }

    #[tokio::test]
    async fn test_every_subscriber_gets_one_signal() {
        let hub = BroadcastHub::default();
        let mut a = hub.subscribe();
        let mut b = hub.subscribe();

        assert_eq!(hub.notify_data_updated("create"), 2);

        assert_eq!(a.recv().await.unwrap(), ServerMessage::DataUpdated);
        assert_eq!(b.recv().await.unwrap(), ServerMessage::DataUpdated);
        assert!(matches!(a.try_recv(), Err(TryRecvError::Empty)));
        assert!(matches!(b.try_recv(), Err(TryRecvError::Empty)));
    }

    #[test]
    fn test_late_subscriber_sees_no_history() {
        let hub = BroadcastHub::default();
        let _early = hub.subscribe();
        hub.notify_data_updated("before");

        let mut late = hub.subscribe();
        assert!(matches!(late.try_recv(), Err(TryRecvError::Empty)));
    }

    #[test]
    fn test_message_wire_format() {
        let json = serde_json::to_string(&ServerMessage::DataUpdated).unwrap();
        assert_eq!(json, r#"{"type":"data_updated"}"#);

        let msg: ClientMessage = serde_json::from_str(
            r#"{"type": "new_registration", "data": {"name": "Budi"}}"#,
        )
        .unwrap();
        assert!(matches!(msg, ClientMessage::NewRegistration { data: Some(_) }));

        let msg: ClientMessage = serde_json::from_str(r#"{"type": "new_registration"}"#).unwrap();
        assert!(matches!(msg, ClientMessage::NewRegistration { data: None }));

        let msg: ClientMessage = serde_json::from_str(r#"{"type": "ping"}"#).unwrap();
        assert!(matches!(msg, ClientMessage::Ping));
    }
}
