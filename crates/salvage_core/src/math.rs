//! Numeric helpers shared by the hazard subsystem, planner and engine.
//! Pure functions; randomness only through the passed-in Rng.

use rand::Rng;

pub const CONDITION_MIN: f32 = 0.0;
pub const CONDITION_MAX: f32 = 100.0;

pub fn clamp_condition(condition: f32) -> f32 {
    condition.clamp(CONDITION_MIN, CONDITION_MAX)
}

/// Returns `true` with probability `p`.
///
/// `p <= 0` never draws from the RNG and returns false; `p >= 1` likewise returns true.
pub fn roll(rng: &mut impl Rng, p: f32) -> bool {
    if p <= 0.0 {
        return false;
    }
    if p >= 1.0 {
        return true;
    }
    rng.gen::<f32>() < p
}

/// Value per kilogram, falling back to raw value for massless items.
pub fn value_density(value: f32, mass_kg: f32) -> f32 {
    if mass_kg > 0.0 {
        value / mass_kg
    } else {
        value
    }
}

/// Value density, doubled for preferred items.
pub fn weighted_score(value: f32, mass_kg: f32, preferred: bool) -> f32 {
    let base = value_density(value, mass_kg);
    if preferred {
        base * 2.0
    } else {
        base
    }
}

/// Picks up to `amount` distinct items uniformly at random, in sampled order.
pub fn sample_without_replacement<T: Clone>(
    rng: &mut impl Rng,
    items: &[T],
    amount: usize,
) -> Vec<T> {
    let amount = amount.min(items.len());
    rand::seq::index::sample(rng, items.len(), amount)
        .into_iter()
        .map(|index| items[index].clone())
        .collect()
}
