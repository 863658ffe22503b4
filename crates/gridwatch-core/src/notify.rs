//! ---
//! gw_section: "02-domain-state-model"
//! gw_subsection: "module"
//! gw_type: "source"
//! gw_scope: "code"
//! gw_description: "Operator notification fan-out."
//! gw_version: "v0.0.0-prealpha"
//! gw_owner: "tbd"
//! ---
use std::collections::VecDeque;

use chrono::{DateTime, Utc};
use gridwatch_common::fault::Severity;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use tracing::info;
use uuid::Uuid;

/// Cause attached to each notification; also the metrics label vocabulary.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    strum::Display,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ActionKind {
    Isolate,
    Restore,
    Fix,
    AddIssue,
    Maintenance,
    Reset,
    FaultDetected,
}

/// User-facing notification emitted by control actions and fault detection.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Notification {
    pub id: Uuid,
    pub timestamp: DateTime<Utc>,
    pub action: ActionKind,
    #[serde(default)]
    pub pole_id: Option<String>,
    pub severity: Severity,
    pub message: String,
}

impl Notification {
    pub fn new(
        action: ActionKind,
        pole_id: Option<String>,
        severity: Severity,
        message: impl Into<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            timestamp: Utc::now(),
            action,
            pole_id,
            severity,
            message: message.into(),
        }
    }
}

/// Fan-out hub: live subscribers get a broadcast stream, late readers drain a
/// bounded recent-history buffer.
#[derive(Debug)]
pub struct NotificationHub {
    sender: broadcast::Sender<Notification>,
    recent: Mutex<VecDeque<Notification>>,
    buffer: usize,
}

impl NotificationHub {
    pub fn new(buffer: usize) -> Self {
        let buffer = buffer.max(16);
        let (sender, _) = broadcast::channel(buffer);
        Self {
            sender,
            recent: Mutex::new(VecDeque::new()),
            buffer,
        }
    }

    /// Publish to live subscribers and the recent buffer. Delivery to
    /// subscribers is best-effort; a full or absent receiver never blocks the
    /// control path.
    pub fn publish(&self, notification: Notification) {
        info!(
            action = %notification.action,
            pole_id = notification.pole_id.as_deref().unwrap_or("-"),
            severity = %notification.severity,
            message = %notification.message,
            "notification"
        );
        let mut recent = self.recent.lock();
        if recent.len() == self.buffer {
            recent.pop_back();
        }
        recent.push_front(notification.clone());
        drop(recent);
        let _ = self.sender.send(notification);
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Notification> {
        self.sender.subscribe()
    }

    /// Newest-first view of recent notifications.
    pub fn recent(&self) -> Vec<Notification> {
        self.recent.lock().iter().cloned().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn publish_records_recent_history() {
        let hub = NotificationHub::new(16);
        hub.publish(Notification::new(
            ActionKind::Isolate,
            Some("pole-01".into()),
            Severity::High,
            "pole-01 isolated",
        ));
        let recent = hub.recent();
        assert_eq!(recent.len(), 1);
        assert_eq!(recent[0].action, ActionKind::Isolate);
    }

    #[tokio::test]
    async fn subscribers_receive_published_notifications() {
        let hub = NotificationHub::new(16);
        let mut rx = hub.subscribe();
        hub.publish(Notification::new(
            ActionKind::Reset,
            None,
            Severity::Low,
            "registry reset",
        ));
        let received = rx.recv().await.unwrap();
        assert_eq!(received.action, ActionKind::Reset);
        assert!(received.pole_id.is_none());
    }

    #[test]
    fn recent_buffer_is_bounded() {
        let hub = NotificationHub::new(16);
        for index in 0..40 {
            hub.publish(Notification::new(
                ActionKind::Fix,
                Some(format!("pole-{index:02}")),
                Severity::Low,
                "fixed",
            ));
        }
        assert_eq!(hub.recent().len(), 16);
        assert_eq!(hub.recent()[0].pole_id.as_deref(), Some("pole-39"));
    }
}
