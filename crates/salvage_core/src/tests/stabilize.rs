use super::*;

fn stabilizing_options() -> OperationOptions {
    OperationOptions {
        auto_stabilize_volatiles: true,
        ..OperationOptions::default()
    }
}

fn stabilizing_engine(
    nodes: Vec<LootNode>,
    config: SimulationConfig,
) -> ExtractionEngine<ChaCha8Rng> {
    let ids: Vec<NodeId> = nodes.iter().map(|n| n.id.clone()).collect();
    let mut engine = engine_with(
        site_with(nodes),
        ample_cargo(),
        all_tools(),
        stabilizing_options(),
        config,
    );
    engine.enqueue(&ids);
    engine
}

#[test]
fn test_start_stabilizes_once() {
    let mut engine = stabilizing_engine(vec![loot_node("a")], quiet_config());
    let events = start(&mut engine);
    assert_eq!(labels(&events), vec!["StabilizedVolatiles"]);
    assert!(engine.site().stabilized_volatiles);
    assert_eq!(engine.state().tick, 40);
    assert!((engine.elapsed_sec() - 4.0).abs() < 1e-5);

    // Stabilization time is not extraction time.
    assert!(engine.active().is_none());
    let events = step(&mut engine);
    assert_eq!(labels(&events), vec!["ItemStarted"]);
}

#[test]
fn test_restart_does_not_stabilize_again() {
    let mut engine = stabilizing_engine(vec![loot_node("a")], quiet_config());
    start(&mut engine);
    steps(&mut engine, 5);
    let mut sink = Vec::new();
    engine.abort(&mut |e| sink.push(e));

    let events = start(&mut engine);
    assert!(events.is_empty());
    assert_eq!(engine.state().tick, 45);
}

#[test]
fn test_already_stabilized_site_skips_cost() {
    let mut site = site_with(vec![loot_node("a")]);
    site.stabilized_volatiles = true;
    let mut engine = engine_with(
        site,
        ample_cargo(),
        all_tools(),
        stabilizing_options(),
        quiet_config(),
    );
    engine.enqueue(&[id("a")]);
    assert!(start(&mut engine).is_empty());
    assert_eq!(engine.state().tick, 0);
}

#[test]
fn test_stabilization_noise_can_cross_threshold() {
    let config = SimulationConfig {
        noise_hazard_factor: 1.0,
        stabilize_noise_per_sec: 10.0,
        ..quiet_config()
    };
    let mut engine = stabilizing_engine(vec![loot_node("a")], config);
    let events = start(&mut engine);

    assert_eq!(events[0].event.label(), "StabilizedVolatiles");
    assert_eq!(count_of(&events, "HazardThreshold"), 1);
    assert!((engine.site().hazard - 40.0).abs() < 1e-3);
    assert!((engine.state().total_noise - 40.0).abs() < 1e-3);
}

#[test]
fn test_stabilization_can_save_volatile_node() {
    let config = SimulationConfig {
        hazard_thresholds: vec![30.0],
        volatile_explode_chance_at_threshold: 1.0,
        stabilize_effect_multiplier: 0.0,
        ..quiet_config()
    };
    let mut bomb = loot_node("bomb");
    bomb.tags = vec![NodeTag::Volatile];
    bomb.base_hazard = 100.0;

    let mut stabilized = stabilizing_engine(vec![bomb.clone()], config.clone());
    start(&mut stabilized);
    let events = run_until_stopped(&mut stabilized, 1_000);
    assert_eq!(count_of(&events, "NodeDestroyed"), 0);
    assert_eq!(count_of(&events, "ItemTransferred"), 1);

    let mut raw = engine_for(site_with(vec![bomb]), config);
    raw.enqueue(&[id("bomb")]);
    start(&mut raw);
    let events = run_until_stopped(&mut raw, 1_000);
    assert_eq!(count_of(&events, "NodeDestroyed"), 1);
    assert_eq!(count_of(&events, "ItemTransferred"), 0);
}

#[test]
fn test_debug_level_reports_stabilization_ticks() {
    let options = OperationOptions {
        event_level: EventLevel::Debug,
        ..stabilizing_options()
    };
    let mut engine = engine_with(
        site_with(vec![loot_node("a")]),
        ample_cargo(),
        all_tools(),
        options,
        quiet_config(),
    );
    let events = start(&mut engine);
    assert_eq!(count_of(&events, "Tick"), 40);
    assert_eq!(events[0].event.label(), "StabilizedVolatiles");
}
