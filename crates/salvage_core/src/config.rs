//! Tunable simulation constants, partial overrides and construction-time validation.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HazardClamp {
    pub min: f32,
    pub max: f32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulationConfig {
    pub tick_rate_hz: f32,
    pub hazard_clamp: HazardClamp,
    /// Strictly ascending. Each fires at most once per operation.
    pub hazard_thresholds: Vec<f32>,
    pub stall_chance_at_threshold: f32,
    pub fragile_damage_chance_at_threshold: f32,
    pub volatile_explode_chance_at_threshold: f32,
    /// Neighbouring nodes caught in each explosion.
    pub volatile_radius_count: usize,
    pub stabilize_time_sec: f32,
    /// Extra noise emitted per second while stabilizing.
    pub stabilize_noise_per_sec: f32,
    /// Scales the explosion chance once the site is stabilized.
    pub stabilize_effect_multiplier: f32,
    /// Hazard gained per unit of noise per second.
    pub noise_hazard_factor: f32,
    pub stall_penalty_sec: f32,
    pub fragile_damage: f32,
    pub blast_damage: f32,
    pub blast_damage_chance: f32,
    pub min_extract_time_sec: f32,
    /// `ItemProgress` events per item; 0 reports every tick.
    pub progress_reports_per_item: u32,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            tick_rate_hz: 10.0,
            hazard_clamp: HazardClamp { min: 0.0, max: 100.0 },
            hazard_thresholds: vec![30.0, 60.0, 90.0],
            stall_chance_at_threshold: 0.15,
            fragile_damage_chance_at_threshold: 0.35,
            volatile_explode_chance_at_threshold: 0.2,
            volatile_radius_count: 2,
            stabilize_time_sec: 4.0,
            stabilize_noise_per_sec: 6.0,
            stabilize_effect_multiplier: 0.35,
            noise_hazard_factor: 0.05,
            stall_penalty_sec: 3.0,
            fragile_damage: 15.0,
            blast_damage: 25.0,
            blast_damage_chance: 0.5,
            min_extract_time_sec: 0.5,
            progress_reports_per_item: 10,
        }
    }
}

/// Partial config: every field left `None` keeps the default.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ConfigOverrides {
    pub tick_rate_hz: Option<f32>,
    pub hazard_clamp: Option<HazardClamp>,
    pub hazard_thresholds: Option<Vec<f32>>,
    pub stall_chance_at_threshold: Option<f32>,
    pub fragile_damage_chance_at_threshold: Option<f32>,
    pub volatile_explode_chance_at_threshold: Option<f32>,
    pub volatile_radius_count: Option<usize>,
    pub stabilize_time_sec: Option<f32>,
    pub stabilize_noise_per_sec: Option<f32>,
    pub stabilize_effect_multiplier: Option<f32>,
    pub noise_hazard_factor: Option<f32>,
    pub stall_penalty_sec: Option<f32>,
    pub fragile_damage: Option<f32>,
    pub blast_damage: Option<f32>,
    pub blast_damage_chance: Option<f32>,
    pub min_extract_time_sec: Option<f32>,
    pub progress_reports_per_item: Option<u32>,
}

macro_rules! merge_fields {
    ($config:ident, $overrides:ident, $($field:ident),+ $(,)?) => {
        $(
            if let Some(value) = &$overrides.$field {
                $config.$field = value.clone();
            }
        )+
    };
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ConfigError {
    #[error("tick_rate_hz must be a positive number, got {0}")]
    InvalidTickRate(f32),

    #[error("{field} must be finite, got {value}")]
    NonFinite { field: &'static str, value: f32 },

    #[error("{field} must not be negative, got {value}")]
    Negative { field: &'static str, value: f32 },

    #[error("{field} must be a probability in [0, 1], got {value}")]
    ProbabilityOutOfRange { field: &'static str, value: f32 },

    #[error("hazard clamp is inverted: min {min} > max {max}")]
    InvertedHazardClamp { min: f32, max: f32 },

    #[error("hazard thresholds must be strictly ascending: {previous} then {next}")]
    ThresholdsNotAscending { previous: f32, next: f32 },

    #[error("hazard threshold {threshold} lies outside the clamp range [{min}, {max}]")]
    ThresholdOutOfRange { threshold: f32, min: f32, max: f32 },
}

impl SimulationConfig {
    #[must_use]
    pub fn with_overrides(mut self, overrides: &ConfigOverrides) -> Self {
        let config = &mut self;
        merge_fields!(
            config,
            overrides,
            tick_rate_hz,
            hazard_clamp,
            hazard_thresholds,
            stall_chance_at_threshold,
            fragile_damage_chance_at_threshold,
            volatile_explode_chance_at_threshold,
            volatile_radius_count,
            stabilize_time_sec,
            stabilize_noise_per_sec,
            stabilize_effect_multiplier,
            noise_hazard_factor,
            stall_penalty_sec,
            fragile_damage,
            blast_damage,
            blast_damage_chance,
            min_extract_time_sec,
            progress_reports_per_item,
        );
        self
    }

    /// Seconds per tick.
    pub fn tick_dt(&self) -> f32 {
        1.0 / self.tick_rate_hz
    }

    /// Ticks needed to cover `seconds`, rounded up.
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    pub fn ticks_for(&self, seconds: f32) -> u64 {
        (seconds * self.tick_rate_hz).ceil().max(0.0) as u64
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.tick_rate_hz.is_finite() || self.tick_rate_hz <= 0.0 {
            return Err(ConfigError::InvalidTickRate(self.tick_rate_hz));
        }

        let HazardClamp { min, max } = self.hazard_clamp;
        finite("hazard_clamp.min", min)?;
        finite("hazard_clamp.max", max)?;
        if min > max {
            return Err(ConfigError::InvertedHazardClamp { min, max });
        }

        for window in self.hazard_thresholds.windows(2) {
            if let [previous, next] = *window {
                if next <= previous {
                    return Err(ConfigError::ThresholdsNotAscending { previous, next });
                }
            }
        }
        for &threshold in &self.hazard_thresholds {
            finite("hazard_thresholds", threshold)?;
            if threshold < min || threshold > max {
                return Err(ConfigError::ThresholdOutOfRange { threshold, min, max });
            }
        }

        probability("stall_chance_at_threshold", self.stall_chance_at_threshold)?;
        probability(
            "fragile_damage_chance_at_threshold",
            self.fragile_damage_chance_at_threshold,
        )?;
        probability(
            "volatile_explode_chance_at_threshold",
            self.volatile_explode_chance_at_threshold,
        )?;
        probability("blast_damage_chance", self.blast_damage_chance)?;

        non_negative("stabilize_time_sec", self.stabilize_time_sec)?;
        non_negative("stabilize_noise_per_sec", self.stabilize_noise_per_sec)?;
        non_negative("stabilize_effect_multiplier", self.stabilize_effect_multiplier)?;
        non_negative("noise_hazard_factor", self.noise_hazard_factor)?;
        non_negative("stall_penalty_sec", self.stall_penalty_sec)?;
        non_negative("fragile_damage", self.fragile_damage)?;
        non_negative("blast_damage", self.blast_damage)?;
        non_negative("min_extract_time_sec", self.min_extract_time_sec)?;
        Ok(())
    }
}

fn finite(field: &'static str, value: f32) -> Result<(), ConfigError> {
    if value.is_finite() {
        Ok(())
    } else {
        Err(ConfigError::NonFinite { field, value })
    }
}

fn non_negative(field: &'static str, value: f32) -> Result<(), ConfigError> {
    finite(field, value)?;
    if value < 0.0 {
        return Err(ConfigError::Negative { field, value });
    }
    Ok(())
}

fn probability(field: &'static str, value: f32) -> Result<(), ConfigError> {
    if (0.0..=1.0).contains(&value) {
        Ok(())
    } else {
        Err(ConfigError::ProbabilityOutOfRange { field, value })
    }
}
