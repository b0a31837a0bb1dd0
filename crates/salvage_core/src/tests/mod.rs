use super::*;
use crate::test_fixtures::{
    all_tools, ample_cargo, count_of, engine_for, labels, loot_node, make_rng, progress_values,
    quiet_config, run_until_stopped, site_with,
};
use rand_chacha::ChaCha8Rng;

mod stabilize;

// --- Shared test helpers ------------------------------------------------

fn engine_with(
    site: Site,
    cargo: CargoState,
    tools: ToolsState,
    options: OperationOptions,
    config: SimulationConfig,
) -> ExtractionEngine<ChaCha8Rng> {
    ExtractionEngine::new(site, cargo, tools, options, config, make_rng()).unwrap()
}

fn id(raw: &str) -> NodeId {
    NodeId(raw.to_string())
}

fn start(engine: &mut ExtractionEngine<ChaCha8Rng>) -> Vec<EventEnvelope> {
    let mut events = Vec::new();
    engine.start(&mut |event| events.push(event));
    events
}

fn step(engine: &mut ExtractionEngine<ChaCha8Rng>) -> Vec<EventEnvelope> {
    let mut events = Vec::new();
    engine.run_step(&mut |event| events.push(event));
    events
}

fn steps(engine: &mut ExtractionEngine<ChaCha8Rng>, n: usize) -> Vec<EventEnvelope> {
    let mut events = Vec::new();
    for _ in 0..n {
        engine.run_step(&mut |event| events.push(event));
    }
    events
}

/// One default node, queued, engine started.
fn started_single_node(config: SimulationConfig) -> ExtractionEngine<ChaCha8Rng> {
    let mut engine = engine_for(site_with(vec![loot_node("a")]), config);
    engine.enqueue(&[id("a")]);
    start(&mut engine);
    engine
}
