//! ---
//! gw_section: "01-core-functionality"
//! gw_subsection: "module"
//! gw_type: "source"
//! gw_scope: "code"
//! gw_description: "Domain state machine and monitoring runtime."
//! gw_version: "v0.0.0-prealpha"
//! gw_owner: "tbd"
//! ---
//! Pole/alert state synchronization and the control-action workflow.
//!
//! The registry is the single authoritative copy of pole state; every surface
//! (API, CLI, tests) observes it through snapshots and mutates it through the
//! [`control::ControlActionProcessor`].

pub mod alerts;
pub mod control;
pub mod notify;
pub mod pole;
pub mod registry;
pub mod risk;
pub mod runtime;

pub use alerts::{Alert, AlertLog};
pub use control::{ControlActionProcessor, ControlError, IssueReport};
pub use notify::{ActionKind, Notification, NotificationHub};
pub use pole::{Pole, PoleStatus};
pub use registry::{FaultObservation, PoleRegistry};
pub use risk::RiskModel;
pub use runtime::{GridState, MonitorRuntime, RuntimeHandle};
