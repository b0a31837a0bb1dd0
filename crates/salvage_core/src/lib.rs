//! `salvage_core`: deterministic salvage-operation simulation.
//!
//! No IO, no network. All randomness via the injected Rng.

pub mod config;
mod engine;
pub mod hazard;
mod id;
pub mod math;
mod stance;
mod types;

#[cfg(any(test, feature = "test-support"))]
pub mod test_fixtures;

pub use config::{ConfigError, ConfigOverrides, HazardClamp, SimulationConfig};
pub use engine::{ExtractionEngine, OperationSnapshot};
pub use hazard::{add_hazard, check_threshold_events, HazardEffect, HazardState};
pub use id::generate_uuid;
pub use stance::{scaled_duration, StanceModifiers};
pub use types::*;

#[cfg(test)]
mod tests;
