//! ---
//! gw_section: "11-simulation-test-harness"
//! gw_subsection: "module"
//! gw_type: "source"
//! gw_scope: "code"
//! gw_description: "Operator-triggered fault injection for simulation runs."
//! gw_version: "v0.0.0-prealpha"
//! gw_owner: "tbd"
//! ---
use std::collections::HashMap;
use std::sync::Arc;

use gridwatch_common::fault::FaultKind;
use parking_lot::Mutex;
use tracing::debug;

/// Control surface for queuing faults against specific poles.
///
/// Implementations must be shareable across the API server and the
/// simulation loop.
pub trait FaultInjector: Send + Sync {
    /// Queue a one-shot fault for the next frame generated for `pole_id`.
    fn inject_fault(&self, pole_id: &str, fault: FaultKind);
}

/// Shared queue of pending injected faults, keyed by pole.
///
/// A second injection for the same pole before the next tick replaces the
/// pending fault.
#[derive(Debug, Clone, Default)]
pub struct FaultQueue {
    pending: Arc<Mutex<HashMap<String, FaultKind>>>,
}

impl FaultQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Remove and return the pending fault for `pole_id`, if any.
    pub fn take(&self, pole_id: &str) -> Option<FaultKind> {
        self.pending.lock().remove(pole_id)
    }

    pub fn pending_count(&self) -> usize {
        self.pending.lock().len()
    }
}

impl FaultInjector for FaultQueue {
    fn inject_fault(&self, pole_id: &str, fault: FaultKind) {
        debug!(pole_id, fault = %fault, "fault queued for injection");
        self.pending.lock().insert(pole_id.to_owned(), fault);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn injected_fault_is_taken_once() {
        let queue = FaultQueue::new();
        queue.inject_fault("pole-01", FaultKind::Overload);
        assert_eq!(queue.pending_count(), 1);
        assert_eq!(queue.take("pole-01"), Some(FaultKind::Overload));
        assert_eq!(queue.take("pole-01"), None);
    }

    #[test]
    fn later_injection_replaces_pending_fault() {
        let queue = FaultQueue::new();
        queue.inject_fault("pole-01", FaultKind::VoltageSag);
        queue.inject_fault("pole-01", FaultKind::LineDown);
        assert_eq!(queue.take("pole-01"), Some(FaultKind::LineDown));
    }
}
