//! Site generation and file-loading tests.

use std::io::Write;

use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use salvage_core::{NodeTag, SimulationConfig, SiteKind};
use salvage_world::{
    generate_site, generate_site_from, load_config, load_overrides, load_templates,
    SiteGenParams,
};

fn write_temp(contents: &str) -> tempfile::NamedTempFile {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(contents.as_bytes()).unwrap();
    file
}

#[test]
fn same_seed_generates_same_site() {
    let params = SiteGenParams::new(SiteKind::Wreck);
    let a = generate_site(&params, &mut ChaCha8Rng::seed_from_u64(7));
    let b = generate_site(&params, &mut ChaCha8Rng::seed_from_u64(7));
    assert_eq!(a.id, b.id);
    assert_eq!(a.node_ids(), b.node_ids());
    let names = |site: &salvage_core::Site| -> Vec<String> {
        site.nodes.iter().map(|n| n.name.clone()).collect()
    };
    assert_eq!(names(&a), names(&b));
}

#[test]
fn different_seeds_differ() {
    let params = SiteGenParams::new(SiteKind::Wreck);
    let a = generate_site(&params, &mut ChaCha8Rng::seed_from_u64(1));
    let b = generate_site(&params, &mut ChaCha8Rng::seed_from_u64(2));
    assert_ne!(a.id, b.id);
}

#[test]
fn wreck_sites_respect_ranges() {
    let params = SiteGenParams::new(SiteKind::Wreck);
    for seed in 0..50 {
        let site = generate_site(&params, &mut ChaCha8Rng::seed_from_u64(seed));
        assert_eq!(site.kind, SiteKind::Wreck);
        assert!((6..=12).contains(&site.nodes.len()), "seed {seed}");
        assert!(!site.exhausted);
        assert!(!site.stabilized_volatiles);
        assert!((0.0..=10.0).contains(&site.hazard));
        assert!((0.2..=1.0).contains(&site.ambient_noise));
        assert!((40.0..=100.0).contains(&site.structural_integrity));
        for node in &site.nodes {
            assert!((40.0..=100.0).contains(&node.condition));
            assert!(node.mass_kg > 0.0 && node.volume_m3 > 0.0);
            assert!(node.value > 0.0 && node.extract_time_sec > 0.0);
            assert!(node.id.0.starts_with("node_"));
        }
    }
}

#[test]
fn resource_sites_hold_pristine_deposits() {
    let params = SiteGenParams::new(SiteKind::ResourceNode);
    for seed in 0..50 {
        let site = generate_site(&params, &mut ChaCha8Rng::seed_from_u64(seed));
        assert!((3..=6).contains(&site.nodes.len()));
        assert!((0.0..=5.0).contains(&site.hazard));
        assert!((site.structural_integrity - 100.0).abs() < 1e-6);
        for node in &site.nodes {
            assert!((node.condition - 100.0).abs() < 1e-6);
            assert!(node.has_any_tag(&[NodeTag::Ore, NodeTag::Oil]));
        }
    }
}

#[test]
fn node_ids_are_unique_within_a_site() {
    let params = SiteGenParams {
        node_count: 40..=40,
        ..SiteGenParams::new(SiteKind::Wreck)
    };
    let site = generate_site(&params, &mut ChaCha8Rng::seed_from_u64(3));
    let mut ids = site.node_ids();
    ids.sort_by(|a, b| a.0.cmp(&b.0));
    ids.dedup();
    assert_eq!(ids.len(), 40);
}

#[test]
fn params_carry_through() {
    let params = SiteGenParams {
        position: salvage_core::Position { x: 4.0, y: -2.0 },
        created_at_ms: 1_700_000_000_000,
        node_count: 0..=0,
        ..SiteGenParams::new(SiteKind::Wreck)
    };
    let site = generate_site(&params, &mut ChaCha8Rng::seed_from_u64(0));
    assert_eq!(site.created_at_ms, 1_700_000_000_000);
    assert!((site.position.x - 4.0).abs() < 1e-6);
    assert!(site.nodes.is_empty());
    assert!(site.exhausted);
}

#[test]
fn empty_template_list_yields_exhausted_site() {
    let params = SiteGenParams::new(SiteKind::Wreck);
    let site = generate_site_from(&params, &[], &mut ChaCha8Rng::seed_from_u64(0));
    assert!(site.exhausted);
}

#[test]
fn custom_templates_load_and_generate() {
    let file = write_temp(
        r#"{
            "templates": [{
                "name": "Cargo Pallet",
                "category": "Crate",
                "tags": ["Heavy"],
                "mass_kg": [50.0, 50.0],
                "volume_m3": [2.0, 2.0],
                "value": [120.0, 120.0],
                "extract_time_sec": [6.0, 6.0],
                "base_noise": [1.0, 1.0],
                "base_hazard": [0.5, 0.5]
            }]
        }"#,
    );
    let templates = load_templates(file.path()).unwrap();
    assert_eq!(templates.len(), 1);
    assert!(templates[0].requires_tool.is_none());

    let params = SiteGenParams {
        node_count: 3..=3,
        ..SiteGenParams::new(SiteKind::Wreck)
    };
    let site = generate_site_from(&params, &templates, &mut ChaCha8Rng::seed_from_u64(5));
    assert_eq!(site.nodes.len(), 3);
    assert!(site.nodes.iter().all(|n| n.name == "Cargo Pallet"));
    assert!(site.nodes.iter().all(|n| (n.mass_kg - 50.0).abs() < 1e-6));
}

#[test]
fn malformed_templates_report_the_path() {
    let file = write_temp(r#"{ "templates": [ { "name": "Broken" } ] }"#);
    let err = load_templates(file.path()).unwrap_err();
    assert!(format!("{err:#}").contains("parsing"));
}

#[test]
fn overrides_merge_onto_defaults() {
    let file = write_temp(r#"{ "hazard_thresholds": [50.0], "stall_chance_at_threshold": 0.0 }"#);
    let overrides = load_overrides(file.path()).unwrap();
    assert_eq!(overrides.hazard_thresholds.as_deref().map(<[f32]>::len), Some(1));

    let config = load_config(file.path()).unwrap();
    assert_eq!(config.hazard_thresholds.len(), 1);
    assert!(config.stall_chance_at_threshold.abs() < 1e-6);
    assert_eq!(config.volatile_radius_count, SimulationConfig::default().volatile_radius_count);
}

#[test]
fn unknown_override_keys_are_rejected() {
    let file = write_temp(r#"{ "hazzard_thresholds": [50.0] }"#);
    assert!(load_overrides(file.path()).is_err());
}

#[test]
fn invalid_override_values_fail_validation() {
    let file = write_temp(r#"{ "blast_damage_chance": 1.5 }"#);
    let err = load_config(file.path()).unwrap_err();
    assert!(format!("{err:#}").contains("probability"));
}

#[test]
fn missing_file_is_an_error() {
    let err = load_overrides(std::path::Path::new("/nonexistent/overrides.json")).unwrap_err();
    assert!(err.to_string().contains("reading"));
}
