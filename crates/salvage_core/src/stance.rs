//! Stance modifiers, a fixed lookup per operator stance.

use crate::config::SimulationConfig;
use crate::Stance;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StanceModifiers {
    pub time_mult: f32,
    /// Detection-facing only; never gates extraction.
    pub noise_mult: f32,
    pub hazard_mult: f32,
    /// Added to a node's condition on successful transfer.
    pub condition_delta: f32,
}

impl Stance {
    pub const fn modifiers(self) -> StanceModifiers {
        match self {
            Stance::Quick => StanceModifiers {
                time_mult: 0.7,
                noise_mult: 1.4,
                hazard_mult: 1.5,
                condition_delta: -10.0,
            },
            Stance::Normal => StanceModifiers {
                time_mult: 1.0,
                noise_mult: 1.0,
                hazard_mult: 1.0,
                condition_delta: 0.0,
            },
            Stance::Careful => StanceModifiers {
                time_mult: 1.4,
                noise_mult: 0.7,
                hazard_mult: 0.6,
                condition_delta: 5.0,
            },
        }
    }
}

/// Stance-scaled extraction duration, floored at the configured minimum.
pub fn scaled_duration(extract_time_sec: f32, stance: Stance, config: &SimulationConfig) -> f32 {
    (extract_time_sec * stance.modifiers().time_mult).max(config.min_extract_time_sec)
}
