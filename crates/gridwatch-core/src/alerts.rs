//! ---
//! gw_section: "02-domain-state-model"
//! gw_subsection: "module"
//! gw_type: "source"
//! gw_scope: "code"
//! gw_description: "Alert log keyed against the pole registry."
//! gw_version: "v0.0.0-prealpha"
//! gw_owner: "tbd"
//! ---
use std::collections::VecDeque;

use chrono::{DateTime, Utc};
use gridwatch_common::fault::Severity;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tracing::debug;
use uuid::Uuid;

/// Operator-visible alert entry. `pole_id` is a weak reference: the pole may
/// be reset or renamed underneath it without invalidating the entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Alert {
    pub id: Uuid,
    pub pole_id: String,
    pub message: String,
    pub severity: Severity,
    pub timestamp: DateTime<Utc>,
    pub created_by: String,
}

impl Alert {
    pub fn new(
        pole_id: impl Into<String>,
        message: impl Into<String>,
        severity: Severity,
        created_by: impl Into<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            pole_id: pole_id.into(),
            message: message.into(),
            severity,
            timestamp: Utc::now(),
            created_by: created_by.into(),
        }
    }
}

/// Bounded, newest-first alert collection.
///
/// The operator surface renders a bounded window; once capacity is reached the
/// oldest entries are evicted.
#[derive(Debug)]
pub struct AlertLog {
    entries: Mutex<VecDeque<Alert>>,
    capacity: usize,
}

impl AlertLog {
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: Mutex::new(VecDeque::new()),
            capacity: capacity.max(1),
        }
    }

    /// Record an alert, evicting the oldest entry when at capacity.
    pub fn raise(&self, alert: Alert) -> Alert {
        let mut entries = self.entries.lock();
        if entries.len() == self.capacity {
            if let Some(evicted) = entries.pop_back() {
                debug!(alert_id = %evicted.id, pole_id = %evicted.pole_id, "alert evicted at capacity");
            }
        }
        entries.push_front(alert.clone());
        alert
    }

    /// Dismiss a single alert by id. Returns whether an entry was removed.
    pub fn dismiss(&self, id: Uuid) -> bool {
        let mut entries = self.entries.lock();
        let before = entries.len();
        entries.retain(|alert| alert.id != id);
        entries.len() < before
    }

    /// Remove every alert referencing `pole_id`, returning the count removed.
    pub fn clear_for_pole(&self, pole_id: &str) -> usize {
        let mut entries = self.entries.lock();
        let before = entries.len();
        entries.retain(|alert| alert.pole_id != pole_id);
        before - entries.len()
    }

    /// Drop all alerts, returning the count removed.
    pub fn clear_all(&self) -> usize {
        let mut entries = self.entries.lock();
        let removed = entries.len();
        entries.clear();
        removed
    }

    /// Newest-first view of the log.
    pub fn snapshot(&self) -> Vec<Alert> {
        self.entries.lock().iter().cloned().collect()
    }

    pub fn active_count(&self) -> usize {
        self.entries.lock().len()
    }
}
