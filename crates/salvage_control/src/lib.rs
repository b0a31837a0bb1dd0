use salvage_core::math::weighted_score;
use salvage_core::{CargoState, LootNode, NodeId, NodeTag};
use serde::{Deserialize, Serialize};

/// Only this many preferred tags are honoured; the rest are ignored.
pub const MAX_PREFERRED_TAGS: usize = 3;

/// Chooses which nodes to queue, and in what order.
pub trait QueuePlanner {
    fn plan(&self, nodes: &[LootNode], cargo: &CargoState) -> Vec<NodeId>;
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AutoQueuePriorities {
    pub preferred_tags: Vec<NodeTag>,
}

impl AutoQueuePriorities {
    pub fn preferring(tags: &[NodeTag]) -> Self {
        Self {
            preferred_tags: tags.to_vec(),
        }
    }

    fn honoured(&self) -> &[NodeTag] {
        let end = self.preferred_tags.len().min(MAX_PREFERRED_TAGS);
        &self.preferred_tags[..end]
    }

    pub fn prefers(&self, node: &LootNode) -> bool {
        node.has_any_tag(self.honoured())
    }
}

/// Greedy value-per-kilogram planner:
/// 1. Drop worthless nodes (`value <= 0`).
/// 2. Rank by value density, doubled for preferred tags. Ties keep input order.
/// 3. Accept in rank order while mass and volume (on top of current cargo) fit.
///    An overflowing node is passed over; lighter ones later may still fit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValueDensityPlanner {
    pub priorities: AutoQueuePriorities,
    pub max_items: usize,
}

impl QueuePlanner for ValueDensityPlanner {
    fn plan(&self, nodes: &[LootNode], cargo: &CargoState) -> Vec<NodeId> {
        compute_auto_queue(nodes, cargo, &self.priorities, self.max_items)
    }
}

fn score(node: &LootNode, priorities: &AutoQueuePriorities) -> f32 {
    weighted_score(node.value, node.mass_kg, priorities.prefers(node))
}

/// Pure: depends only on its arguments, never on engine state.
pub fn compute_auto_queue(
    nodes: &[LootNode],
    cargo: &CargoState,
    priorities: &AutoQueuePriorities,
    max_items: usize,
) -> Vec<NodeId> {
    let mut candidates: Vec<(&LootNode, f32)> = nodes
        .iter()
        .filter(|node| node.value > 0.0)
        .map(|node| (node, score(node, priorities)))
        .collect();
    // `sort_by` is stable, so equal scores keep their manifest order.
    candidates.sort_by(|a, b| b.1.total_cmp(&a.1));

    let mut mass = cargo.used_mass_kg;
    let mut volume = cargo.used_volume_m3;
    let mut picked = Vec::new();
    for (node, _) in candidates {
        if picked.len() >= max_items {
            break;
        }
        if mass + node.mass_kg > cargo.max_mass_kg
            || volume + node.volume_m3 > cargo.max_volume_m3
        {
            continue;
        }
        mass += node.mass_kg;
        volume += node.volume_m3;
        picked.push(node.id.clone());
    }
    picked
}
