//! ---
//! gw_section: "11-simulation-test-harness"
//! gw_subsection: "module"
//! gw_type: "source"
//! gw_scope: "code"
//! gw_description: "Simulation runtime module exports and shared types."
//! gw_version: "v0.0.0-prealpha"
//! gw_owner: "tbd"
//! ---
//! Synthetic telemetry engines for the GridWatch runtime.
//!
//! Every reading in this workspace originates here: randomized generators,
//! deterministic scenario replay, and the operator-triggered fault queue.

pub mod faults;
pub mod frames;
pub mod generator;
pub mod replay;

pub use faults::{FaultInjector, FaultQueue};
pub use frames::PoleTelemetryFrame;
pub use generator::{SimulationEngine, SimulationMode};
pub use replay::{ReplayEngine, ScenarioFrame};
