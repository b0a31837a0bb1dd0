//! Hazard meter and threshold effects.
//!
//! The site carries a single scalar hazard value that only rises during an
//! operation. Each configured threshold, the first time hazard reaches it,
//! triggers one stochastic effect pass over the remaining nodes:
//!
//! 1. Volatile pass: explosive nodes may detonate, destroying themselves and
//!    peppering up to `volatile_radius_count` random neighbours with shrapnel.
//! 2. Fragile pass: fragile nodes may lose condition.
//! 3. Stall pass: any node may have its extraction time extended.
//!
//! Nodes destroyed earlier in a pass are excluded from everything after.

use std::collections::BTreeSet;

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::config::SimulationConfig;
use crate::math::{clamp_condition, roll, sample_without_replacement};
use crate::{LootNode, NodeId, NodeTag, Site};

/// Which thresholds (by index into `SimulationConfig::hazard_thresholds`) have
/// fired during the current operation. Never reset mid-operation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HazardState {
    fired: BTreeSet<usize>,
}

impl HazardState {
    pub fn has_fired(&self, index: usize) -> bool {
        self.fired.contains(&index)
    }

    pub fn fired_count(&self) -> usize {
        self.fired.len()
    }

    fn mark_fired(&mut self, index: usize) -> bool {
        self.fired.insert(index)
    }
}

/// Outcome of threshold resolution, in the order it happened.
#[derive(Debug, Clone)]
pub enum HazardEffect {
    Threshold {
        threshold: f32,
        hazard: f32,
    },
    Damaged {
        node: LootNode,
        amount: f32,
        message: String,
    },
    Destroyed {
        node: LootNode,
        message: String,
    },
    Stalled {
        node_id: NodeId,
        added_sec: f32,
        message: String,
    },
}

/// Adds `amount` to the site's hazard, clamped into the configured range.
pub fn add_hazard(site: &mut Site, amount: f32, config: &SimulationConfig) {
    let clamp = config.hazard_clamp;
    site.hazard = (site.hazard + amount).clamp(clamp.min, clamp.max);
}

/// Fires every not-yet-fired threshold the current hazard has reached, lowest first.
pub fn check_threshold_events(
    site: &mut Site,
    state: &mut HazardState,
    config: &SimulationConfig,
    rng: &mut impl Rng,
    effects: &mut Vec<HazardEffect>,
) {
    for (index, &threshold) in config.hazard_thresholds.iter().enumerate() {
        if state.has_fired(index) || site.hazard < threshold {
            continue;
        }
        state.mark_fired(index);
        effects.push(HazardEffect::Threshold {
            threshold,
            hazard: site.hazard,
        });

        resolve_volatile_pass(site, config, rng, effects);
        resolve_fragile_pass(site, config, rng, effects);
        resolve_stall_pass(site, config, rng, effects);
    }
}

fn explode_chance(site: &Site, config: &SimulationConfig) -> f32 {
    if site.stabilized_volatiles {
        config.volatile_explode_chance_at_threshold * config.stabilize_effect_multiplier
    } else {
        config.volatile_explode_chance_at_threshold
    }
}

fn resolve_volatile_pass(
    site: &mut Site,
    config: &SimulationConfig,
    rng: &mut impl Rng,
    effects: &mut Vec<HazardEffect>,
) {
    let chance = explode_chance(site, config);
    let candidates: Vec<NodeId> = site
        .nodes
        .iter()
        .filter(|node| node.is_explosive())
        .map(|node| node.id.clone())
        .collect();

    for candidate in candidates {
        // Already taken out by an earlier blast in this pass.
        if !site.contains(&candidate) {
            continue;
        }
        if !roll(rng, chance) {
            continue;
        }
        let Some(exploded) = site.remove_node(&candidate) else {
            continue;
        };
        let source = exploded.name.clone();
        effects.push(HazardEffect::Destroyed {
            message: format!("{source} exploded"),
            node: exploded,
        });

        let neighbours =
            sample_without_replacement(rng, &site.node_ids(), config.volatile_radius_count);
        for neighbour in neighbours {
            if !roll(rng, config.blast_damage_chance) {
                continue;
            }
            apply_blast_damage(site, &neighbour, &source, config, effects);
        }
    }
}

fn apply_blast_damage(
    site: &mut Site,
    node_id: &NodeId,
    source: &str,
    config: &SimulationConfig,
    effects: &mut Vec<HazardEffect>,
) {
    let Some(node) = site.node_mut(node_id) else {
        return;
    };
    node.condition = clamp_condition(node.condition - config.blast_damage);
    let destroyed = node.condition <= 0.0;
    effects.push(HazardEffect::Damaged {
        message: format!("{} hit by shrapnel from {source}", node.name),
        node: node.clone(),
        amount: config.blast_damage,
    });

    if destroyed {
        if let Some(node) = site.remove_node(node_id) {
            effects.push(HazardEffect::Destroyed {
                message: format!("{} destroyed by the blast from {source}", node.name),
                node,
            });
        }
    }
}

fn resolve_fragile_pass(
    site: &mut Site,
    config: &SimulationConfig,
    rng: &mut impl Rng,
    effects: &mut Vec<HazardEffect>,
) {
    for node in site.nodes.iter_mut().filter(|node| node.has_tag(NodeTag::Fragile)) {
        if !roll(rng, config.fragile_damage_chance_at_threshold) {
            continue;
        }
        node.condition = clamp_condition(node.condition - config.fragile_damage);
        effects.push(HazardEffect::Damaged {
            message: format!("{} cracked under the strain", node.name),
            node: node.clone(),
            amount: config.fragile_damage,
        });
    }
}

fn resolve_stall_pass(
    site: &mut Site,
    config: &SimulationConfig,
    rng: &mut impl Rng,
    effects: &mut Vec<HazardEffect>,
) {
    for node in &mut site.nodes {
        if !roll(rng, config.stall_chance_at_threshold) {
            continue;
        }
        node.extract_time_sec += config.stall_penalty_sec;
        effects.push(HazardEffect::Stalled {
            node_id: node.id.clone(),
            added_sec: config.stall_penalty_sec,
            message: format!(
                "{} jammed; extraction now takes {:.1}s",
                node.name, node.extract_time_sec
            ),
        });
    }
}
