//! Shared test fixtures for salvage_core and downstream crates.
//!
//! `quiet_config()` keeps the default thresholds but zeroes every stochastic
//! effect and the ambient noise coupling, so hazard only moves when a test
//! asks it to. `loot_node()` is a plain 10 kg / 1 m³ / 10 s item.

use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

use crate::{
    CargoState, EventEnvelope, ExtractionEngine, ExtractionEvent, LootNode, NodeCategory, NodeId,
    OperationOptions, Position, SimulationConfig, Site, SiteId, SiteKind, ToolsState,
};

pub fn quiet_config() -> SimulationConfig {
    SimulationConfig {
        stall_chance_at_threshold: 0.0,
        fragile_damage_chance_at_threshold: 0.0,
        volatile_explode_chance_at_threshold: 0.0,
        noise_hazard_factor: 0.0,
        ..SimulationConfig::default()
    }
}

pub fn loot_node(id: &str) -> LootNode {
    LootNode {
        id: NodeId(id.to_string()),
        name: format!("Test {id}"),
        category: NodeCategory::Crate,
        tags: vec![],
        mass_kg: 10.0,
        volume_m3: 1.0,
        condition: 100.0,
        value: 100.0,
        extract_time_sec: 10.0,
        base_noise: 0.0,
        base_hazard: 0.0,
        requires_tool: None,
        volatile: false,
    }
}

pub fn site_with(nodes: Vec<LootNode>) -> Site {
    Site::new(
        SiteId("site_test".to_string()),
        SiteKind::Wreck,
        Position::default(),
        nodes,
    )
}

pub fn ample_cargo() -> CargoState {
    CargoState::new(10_000.0, 1_000.0)
}

pub fn all_tools() -> ToolsState {
    ToolsState {
        has_crane: true,
        has_cutter: true,
    }
}

/// Deterministic RNG seeded with 42.
pub fn make_rng() -> ChaCha8Rng {
    ChaCha8Rng::seed_from_u64(42)
}

/// Engine over `site` with ample cargo, every tool and default options.
pub fn engine_for(site: Site, config: SimulationConfig) -> ExtractionEngine<ChaCha8Rng> {
    ExtractionEngine::new(
        site,
        ample_cargo(),
        all_tools(),
        OperationOptions::default(),
        config,
        make_rng(),
    )
    .expect("fixture config is valid")
}

/// Steps until the engine stops running or `max_steps` is hit.
pub fn run_until_stopped(
    engine: &mut ExtractionEngine<ChaCha8Rng>,
    max_steps: usize,
) -> Vec<EventEnvelope> {
    let mut events = Vec::new();
    for _ in 0..max_steps {
        if !engine.is_running() {
            break;
        }
        engine.run_step(&mut |event| events.push(event));
    }
    events
}

pub fn count_of(events: &[EventEnvelope], label: &str) -> usize {
    events.iter().filter(|e| e.event.label() == label).count()
}

pub fn labels(events: &[EventEnvelope]) -> Vec<&'static str> {
    events.iter().map(|e| e.event.label()).collect()
}

pub fn progress_values(events: &[EventEnvelope]) -> Vec<f32> {
    events
        .iter()
        .filter_map(|e| match e.event {
            ExtractionEvent::ItemProgress { progress, .. } => Some(progress),
            _ => None,
        })
        .collect()
}
