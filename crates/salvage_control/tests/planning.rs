//! Full-loop tests: generate a site, plan a queue, run the operation.

use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use salvage_control::{compute_auto_queue, AutoQueuePriorities, QueuePlanner, ValueDensityPlanner};
use salvage_core::test_fixtures::{all_tools, count_of, run_until_stopped};
use salvage_core::{
    CargoState, EngineStatus, ExtractionEngine, NodeTag, OperationOptions, SimulationConfig,
    SiteKind, Stance,
};
use salvage_world::{generate_site, SiteGenParams};

#[test]
fn plan_respects_capacity_and_cap() {
    let params = SiteGenParams::new(SiteKind::Wreck);
    for seed in 0..40 {
        let site = generate_site(&params, &mut ChaCha8Rng::seed_from_u64(seed));
        let cargo = CargoState {
            used_mass_kg: 100.0,
            used_volume_m3: 1.0,
            ..CargoState::new(600.0, 8.0)
        };
        let priorities = AutoQueuePriorities::preferring(&[NodeTag::Rare]);
        let plan = compute_auto_queue(&site.nodes, &cargo, &priorities, 5);
        assert!(plan.len() <= 5);

        let start = (cargo.used_mass_kg, cargo.used_volume_m3);
        let (mass, volume) = plan.iter().fold(start, |acc, id| {
            let node = site.node(id).unwrap();
            (acc.0 + node.mass_kg, acc.1 + node.volume_m3)
        });
        assert!(mass <= cargo.max_mass_kg + 1e-3, "seed {seed}");
        assert!(volume <= cargo.max_volume_m3 + 1e-3, "seed {seed}");
    }
}

#[test]
fn plan_is_independent_of_call_history() {
    let site = generate_site(
        &SiteGenParams::new(SiteKind::ResourceNode),
        &mut ChaCha8Rng::seed_from_u64(11),
    );
    let planner = ValueDensityPlanner {
        priorities: AutoQueuePriorities::preferring(&[NodeTag::Oil]),
        max_items: 3,
    };
    let cargo = CargoState::new(2_000.0, 20.0);
    assert_eq!(planner.plan(&site.nodes, &cargo), planner.plan(&site.nodes, &cargo));
}

#[test]
fn planned_operation_runs_to_completion() {
    for seed in 0..15 {
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        let site = generate_site(&SiteGenParams::new(SiteKind::Wreck), &mut rng);
        let cargo = CargoState::new(900.0, 12.0);
        let planner = ValueDensityPlanner {
            priorities: AutoQueuePriorities::default(),
            max_items: 6,
        };
        let plan = planner.plan(&site.nodes, &cargo);

        let options = OperationOptions {
            stance: Stance::Careful,
            auto_stabilize_volatiles: true,
            ..OperationOptions::default()
        };
        let mut engine = ExtractionEngine::new(
            site,
            cargo,
            all_tools(),
            options,
            SimulationConfig::default(),
            rng,
        )
        .unwrap();
        assert_eq!(engine.enqueue(&plan), plan.len());

        let mut events = Vec::new();
        engine.start(&mut |e| events.push(e));
        events.extend(run_until_stopped(&mut engine, 50_000));

        assert_eq!(engine.status(), EngineStatus::Completed, "seed {seed}");
        assert_eq!(count_of(&events, "StabilizedVolatiles"), 1);
        // The plan fit the empty hold, so nothing is skipped for space.
        assert_eq!(count_of(&events, "ItemSkipped"), 0, "seed {seed}");
        assert!(count_of(&events, "ItemTransferred") + count_of(&events, "NodeDestroyed") >= 1);
        assert!(engine.cargo().used_mass_kg <= 900.0 + 1e-3);
        assert!(engine.cargo().used_volume_m3 <= 12.0 + 1e-3);
    }
}
