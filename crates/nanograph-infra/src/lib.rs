//! Nanograph Infrastructure Library
//!
//! Process-level plumbing shared by nanograph binaries and test harnesses:
//! - Telemetry initialization (tracing subscriber)

pub mod telemetry;

pub use telemetry::{init_telemetry, shutdown_telemetry};
