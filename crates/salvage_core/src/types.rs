//! Type definitions for `salvage_core`.
//!
//! Sites, loot nodes, cargo, operator options and the extraction event stream.

use std::str::FromStr;

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// ID newtypes
// ---------------------------------------------------------------------------

macro_rules! string_id {
    ($name:ident) => {
        #[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
        pub struct $name(pub String);

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(&self.0)
            }
        }
    };
}

string_id!(NodeId);
string_id!(SiteId);
string_id!(EventId);

// ---------------------------------------------------------------------------
// Core enums
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NodeCategory {
    Module,
    Crate,
    Intel,
    Crew,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NodeTag {
    Ammo,
    Fuel,
    Volatile,
    Fragile,
    Heavy,
    Rare,
    Ore,
    Oil,
}

impl NodeTag {
    pub const ALL: [NodeTag; 8] = [
        NodeTag::Ammo,
        NodeTag::Fuel,
        NodeTag::Volatile,
        NodeTag::Fragile,
        NodeTag::Heavy,
        NodeTag::Rare,
        NodeTag::Ore,
        NodeTag::Oil,
    ];

    pub const fn label(self) -> &'static str {
        match self {
            NodeTag::Ammo => "Ammo",
            NodeTag::Fuel => "Fuel",
            NodeTag::Volatile => "Volatile",
            NodeTag::Fragile => "Fragile",
            NodeTag::Heavy => "Heavy",
            NodeTag::Rare => "Rare",
            NodeTag::Ore => "Ore",
            NodeTag::Oil => "Oil",
        }
    }

    /// Tags whose carriers can detonate at a hazard threshold.
    pub const fn is_explosive(self) -> bool {
        matches!(self, NodeTag::Volatile | NodeTag::Ammo | NodeTag::Fuel)
    }
}

impl FromStr for NodeTag {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        NodeTag::ALL
            .into_iter()
            .find(|tag| tag.label().eq_ignore_ascii_case(s))
            .ok_or_else(|| format!("unknown tag '{s}'"))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ToolKind {
    Crane,
    Cutter,
}

impl std::fmt::Display for ToolKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ToolKind::Crane => f.write_str("Crane"),
            ToolKind::Cutter => f.write_str("Cutter"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SiteKind {
    Wreck,
    ResourceNode,
}

impl FromStr for SiteKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "wreck" => Ok(SiteKind::Wreck),
            "resource" | "resourcenode" | "resource_node" => Ok(SiteKind::ResourceNode),
            _ => Err(format!("unknown site kind '{s}'")),
        }
    }
}

/// Operator speed/safety profile for an operation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Stance {
    Quick,
    #[default]
    Normal,
    Careful,
}

impl FromStr for Stance {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "quick" => Ok(Stance::Quick),
            "normal" => Ok(Stance::Normal),
            "careful" => Ok(Stance::Careful),
            _ => Err(format!("unknown stance '{s}'")),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum EventLevel {
    #[default]
    Normal,
    Debug,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum EngineStatus {
    #[default]
    Idle,
    Running,
    Completed,
    Aborted,
}

// ---------------------------------------------------------------------------
// Site state
// ---------------------------------------------------------------------------

/// One extractable item at a site.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LootNode {
    pub id: NodeId,
    pub name: String,
    pub category: NodeCategory,
    pub tags: Vec<NodeTag>,
    pub mass_kg: f32,
    pub volume_m3: f32,
    /// 0–100. Every mutation goes through `clamp_condition`.
    pub condition: f32,
    pub value: f32,
    /// Nominal extraction duration before stance scaling. Stalls add to it.
    pub extract_time_sec: f32,
    pub base_noise: f32,
    pub base_hazard: f32,
    pub requires_tool: Option<ToolKind>,
    /// Descriptive only. Explosiveness comes from tags.
    pub volatile: bool,
}

impl LootNode {
    pub fn has_tag(&self, tag: NodeTag) -> bool {
        self.tags.contains(&tag)
    }

    pub fn has_any_tag(&self, tags: &[NodeTag]) -> bool {
        self.tags.iter().any(|tag| tags.contains(tag))
    }

    /// Volatile, Ammo or Fuel tagged.
    pub fn is_explosive(&self) -> bool {
        self.tags.iter().any(|tag| tag.is_explosive())
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub x: f32,
    pub y: f32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Site {
    pub id: SiteId,
    pub kind: SiteKind,
    pub position: Position,
    /// Remaining nodes, in generation order.
    pub nodes: Vec<LootNode>,
    pub hazard: f32,
    pub ambient_noise: f32,
    pub stabilized_volatiles: bool,
    /// True iff `nodes` is empty. Maintained by `remove_node`.
    pub exhausted: bool,
    pub created_at_ms: i64,
    pub structural_integrity: f32,
}

impl Site {
    pub fn new(id: SiteId, kind: SiteKind, position: Position, nodes: Vec<LootNode>) -> Self {
        let exhausted = nodes.is_empty();
        Self {
            id,
            kind,
            position,
            nodes,
            hazard: 0.0,
            ambient_noise: 0.0,
            stabilized_volatiles: false,
            exhausted,
            created_at_ms: 0,
            structural_integrity: 100.0,
        }
    }

    pub fn node(&self, id: &NodeId) -> Option<&LootNode> {
        self.nodes.iter().find(|node| &node.id == id)
    }

    pub fn node_mut(&mut self, id: &NodeId) -> Option<&mut LootNode> {
        self.nodes.iter_mut().find(|node| &node.id == id)
    }

    pub fn contains(&self, id: &NodeId) -> bool {
        self.nodes.iter().any(|node| &node.id == id)
    }

    /// Removes a node, preserving the order of the rest.
    pub fn remove_node(&mut self, id: &NodeId) -> Option<LootNode> {
        let position = self.nodes.iter().position(|node| &node.id == id)?;
        let node = self.nodes.remove(position);
        self.exhausted = self.nodes.is_empty();
        Some(node)
    }

    pub fn node_ids(&self) -> Vec<NodeId> {
        self.nodes.iter().map(|node| node.id.clone()).collect()
    }
}

// ---------------------------------------------------------------------------
// Session-owned state
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CargoFit {
    Fits,
    /// Would fit in an empty hold, but not alongside what is loaded now.
    NeedsSpace,
    /// Larger than the hold itself.
    ExceedsCapacity,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CargoState {
    pub max_mass_kg: f32,
    pub max_volume_m3: f32,
    pub used_mass_kg: f32,
    pub used_volume_m3: f32,
}

impl CargoState {
    pub const fn new(max_mass_kg: f32, max_volume_m3: f32) -> Self {
        Self {
            max_mass_kg,
            max_volume_m3,
            used_mass_kg: 0.0,
            used_volume_m3: 0.0,
        }
    }

    pub fn free_mass_kg(&self) -> f32 {
        (self.max_mass_kg - self.used_mass_kg).max(0.0)
    }

    pub fn free_volume_m3(&self) -> f32 {
        (self.max_volume_m3 - self.used_volume_m3).max(0.0)
    }

    pub fn fit(&self, mass_kg: f32, volume_m3: f32) -> CargoFit {
        if mass_kg > self.max_mass_kg || volume_m3 > self.max_volume_m3 {
            CargoFit::ExceedsCapacity
        } else if self.used_mass_kg + mass_kg > self.max_mass_kg
            || self.used_volume_m3 + volume_m3 > self.max_volume_m3
        {
            CargoFit::NeedsSpace
        } else {
            CargoFit::Fits
        }
    }

    pub fn load(&mut self, mass_kg: f32, volume_m3: f32) {
        self.used_mass_kg += mass_kg;
        self.used_volume_m3 += volume_m3;
    }

    /// Frees space, flooring usage at zero.
    pub fn unload(&mut self, mass_kg: f32, volume_m3: f32) {
        self.used_mass_kg = (self.used_mass_kg - mass_kg).max(0.0);
        self.used_volume_m3 = (self.used_volume_m3 - volume_m3).max(0.0);
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolsState {
    pub has_crane: bool,
    pub has_cutter: bool,
}

impl ToolsState {
    pub const fn has(&self, tool: ToolKind) -> bool {
        match tool {
            ToolKind::Crane => self.has_crane,
            ToolKind::Cutter => self.has_cutter,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OperationOptions {
    pub stance: Stance,
    /// Hold the queue head while cargo is full instead of skipping it.
    pub wait_for_space: bool,
    pub auto_stabilize_volatiles: bool,
    pub event_level: EventLevel,
}

/// The node currently being extracted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActiveExtraction {
    pub node_id: NodeId,
    /// Ordinal of this entry among queue entries the operation has resolved.
    pub queue_index: usize,
    /// Stance-scaled duration; refreshed every tick so stalls apply mid-extraction.
    pub total_sec: f32,
    pub ticks: u64,
    pub progress: f32,
    /// Last progress bucket reported via `ItemProgress`.
    pub reported_bucket: u32,
}

// ---------------------------------------------------------------------------
// Event types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SkipReason {
    MissingTool(ToolKind),
    CargoFull,
    ExceedsCapacity,
}

impl std::fmt::Display for SkipReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SkipReason::MissingTool(tool) => write!(f, "requires {tool}"),
            SkipReason::CargoFull => f.write_str("not enough cargo space"),
            SkipReason::ExceedsCapacity => f.write_str("larger than the cargo hold"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventEnvelope {
    pub id: EventId,
    pub tick: u64,
    pub time_sec: f32,
    pub event: ExtractionEvent,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum ExtractionEvent {
    /// Only emitted at `EventLevel::Debug`.
    Tick {
        hazard: f32,
    },
    ItemStarted {
        node: LootNode,
        queue_index: usize,
        total_sec: f32,
    },
    ItemProgress {
        node_id: NodeId,
        progress: f32,
    },
    ItemTransferred {
        node: LootNode,
        queue_index: usize,
    },
    ItemSkipped {
        node: LootNode,
        queue_index: usize,
        reason: SkipReason,
        message: String,
    },
    ItemStalled {
        node_id: NodeId,
        added_sec: f32,
        message: String,
    },
    HazardThreshold {
        threshold: f32,
        hazard: f32,
    },
    NodeDamaged {
        node: LootNode,
        amount: f32,
        message: String,
    },
    NodeDestroyed {
        node: LootNode,
        message: String,
    },
    StabilizedVolatiles {
        message: String,
    },
    Aborted {
        message: String,
    },
    Completed {
        message: String,
    },
}

impl ExtractionEvent {
    pub const fn label(&self) -> &'static str {
        match self {
            ExtractionEvent::Tick { .. } => "Tick",
            ExtractionEvent::ItemStarted { .. } => "ItemStarted",
            ExtractionEvent::ItemProgress { .. } => "ItemProgress",
            ExtractionEvent::ItemTransferred { .. } => "ItemTransferred",
            ExtractionEvent::ItemSkipped { .. } => "ItemSkipped",
            ExtractionEvent::ItemStalled { .. } => "ItemStalled",
            ExtractionEvent::HazardThreshold { .. } => "HazardThreshold",
            ExtractionEvent::NodeDamaged { .. } => "NodeDamaged",
            ExtractionEvent::NodeDestroyed { .. } => "NodeDestroyed",
            ExtractionEvent::StabilizedVolatiles { .. } => "StabilizedVolatiles",
            ExtractionEvent::Aborted { .. } => "Aborted",
            ExtractionEvent::Completed { .. } => "Completed",
        }
    }
}
