//! Site generation and config/template loading shared by the CLI and tests.

use std::ops::RangeInclusive;
use std::path::Path;

use anyhow::{ensure, Context, Result};
use rand::Rng;
use salvage_core::{
    ConfigOverrides, LootNode, NodeCategory, NodeId, NodeTag, Position, SimulationConfig, Site,
    SiteId, SiteKind, ToolKind,
};
use serde::{Deserialize, Serialize};

/// Blueprint for one kind of node. Each `(lo, hi)` pair is an inclusive range.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeTemplate {
    pub name: String,
    pub category: NodeCategory,
    #[serde(default)]
    pub tags: Vec<NodeTag>,
    pub mass_kg: (f32, f32),
    pub volume_m3: (f32, f32),
    pub value: (f32, f32),
    pub extract_time_sec: (f32, f32),
    pub base_noise: (f32, f32),
    pub base_hazard: (f32, f32),
    #[serde(default)]
    pub requires_tool: Option<ToolKind>,
    #[serde(default)]
    pub volatile: bool,
}

#[derive(Deserialize)]
struct TemplatesFile {
    templates: Vec<NodeTemplate>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SiteGenParams {
    pub kind: SiteKind,
    pub position: Position,
    pub node_count: RangeInclusive<usize>,
    pub created_at_ms: i64,
}

impl SiteGenParams {
    /// Default node counts: 6–12 for wrecks, 3–6 for resource nodes.
    pub fn new(kind: SiteKind) -> Self {
        let node_count = match kind {
            SiteKind::Wreck => 6..=12,
            SiteKind::ResourceNode => 3..=6,
        };
        Self {
            kind,
            position: Position::default(),
            node_count,
            created_at_ms: 0,
        }
    }

    /// Same as `new`, stamped with the current wall-clock time.
    pub fn now(kind: SiteKind) -> Self {
        Self {
            created_at_ms: chrono::Utc::now().timestamp_millis(),
            ..Self::new(kind)
        }
    }
}

// ---------------------------------------------------------------------------
// Built-in templates
// ---------------------------------------------------------------------------

#[allow(clippy::too_many_arguments)]
fn template(
    name: &str,
    category: NodeCategory,
    tags: &[NodeTag],
    mass_kg: (f32, f32),
    volume_m3: (f32, f32),
    value: (f32, f32),
    extract_time_sec: (f32, f32),
    base_noise: (f32, f32),
    base_hazard: (f32, f32),
    requires_tool: Option<ToolKind>,
) -> NodeTemplate {
    NodeTemplate {
        name: name.to_string(),
        category,
        tags: tags.to_vec(),
        mass_kg,
        volume_m3,
        value,
        extract_time_sec,
        base_noise,
        base_hazard,
        requires_tool,
        volatile: false,
    }
}

fn wreck_templates() -> Vec<NodeTemplate> {
    use NodeCategory::{Crate, Crew, Intel, Module};
    use NodeTag::{Ammo, Fragile, Fuel, Heavy, Rare, Volatile};
    vec![
        NodeTemplate {
            volatile: true,
            ..template(
                "Reactor Core",
                Module,
                &[Heavy, Volatile],
                (300.0, 600.0),
                (4.0, 8.0),
                (800.0, 1500.0),
                (18.0, 30.0),
                (2.0, 3.5),
                (1.5, 3.0),
                Some(ToolKind::Crane),
            )
        },
        template(
            "Weapons Array",
            Module,
            &[Heavy, Ammo],
            (150.0, 350.0),
            (2.0, 5.0),
            (500.0, 900.0),
            (12.0, 20.0),
            (1.5, 2.5),
            (1.0, 2.0),
            Some(ToolKind::Cutter),
        ),
        template(
            "Sensor Suite",
            Module,
            &[Fragile, Rare],
            (40.0, 90.0),
            (0.5, 1.5),
            (400.0, 700.0),
            (8.0, 14.0),
            (0.8, 1.5),
            (0.3, 0.8),
            Some(ToolKind::Cutter),
        ),
        template(
            "Ammo Crate",
            Crate,
            &[Ammo],
            (30.0, 60.0),
            (0.4, 0.8),
            (150.0, 300.0),
            (4.0, 7.0),
            (0.5, 1.0),
            (0.8, 1.5),
            None,
        ),
        template(
            "Fuel Cell Crate",
            Crate,
            &[Fuel, Volatile],
            (40.0, 80.0),
            (0.5, 1.0),
            (200.0, 350.0),
            (5.0, 8.0),
            (0.6, 1.2),
            (1.0, 2.0),
            None,
        ),
        template(
            "Supply Crate",
            Crate,
            &[],
            (20.0, 50.0),
            (0.5, 1.2),
            (80.0, 200.0),
            (3.0, 6.0),
            (0.4, 0.8),
            (0.1, 0.4),
            None,
        ),
        template(
            "Medical Crate",
            Crate,
            &[Fragile],
            (10.0, 25.0),
            (0.3, 0.6),
            (150.0, 280.0),
            (3.0, 5.0),
            (0.3, 0.6),
            (0.1, 0.3),
            None,
        ),
        template(
            "Data Core",
            Intel,
            &[Fragile, Rare],
            (2.0, 6.0),
            (0.05, 0.15),
            (600.0, 1200.0),
            (6.0, 10.0),
            (0.2, 0.5),
            (0.2, 0.5),
            Some(ToolKind::Cutter),
        ),
        template(
            "Flight Recorder",
            Intel,
            &[Rare],
            (8.0, 15.0),
            (0.1, 0.3),
            (300.0, 600.0),
            (5.0, 8.0),
            (0.3, 0.6),
            (0.2, 0.4),
            None,
        ),
        template(
            "Escape Pod",
            Crew,
            &[Heavy],
            (400.0, 800.0),
            (6.0, 10.0),
            (500.0, 1000.0),
            (20.0, 30.0),
            (2.0, 3.0),
            (1.0, 2.0),
            Some(ToolKind::Crane),
        ),
    ]
}

fn resource_templates() -> Vec<NodeTemplate> {
    use NodeCategory::Crate;
    use NodeTag::{Heavy, Oil, Ore, Rare, Volatile};
    vec![
        template(
            "Ore Vein",
            Crate,
            &[Ore, Heavy],
            (200.0, 500.0),
            (1.5, 3.5),
            (200.0, 450.0),
            (10.0, 18.0),
            (1.5, 2.5),
            (0.5, 1.2),
            Some(ToolKind::Cutter),
        ),
        template(
            "Rich Ore Pocket",
            Crate,
            &[Ore, Rare],
            (80.0, 200.0),
            (0.6, 1.5),
            (350.0, 700.0),
            (8.0, 14.0),
            (1.0, 2.0),
            (0.4, 1.0),
            None,
        ),
        NodeTemplate {
            volatile: true,
            ..template(
                "Oil Seep",
                Crate,
                &[Oil, Volatile],
                (100.0, 250.0),
                (1.0, 2.5),
                (250.0, 500.0),
                (10.0, 16.0),
                (0.8, 1.5),
                (1.0, 2.0),
                None,
            )
        },
        template(
            "Surface Ore",
            Crate,
            &[Ore],
            (40.0, 120.0),
            (0.3, 1.0),
            (80.0, 180.0),
            (4.0, 8.0),
            (0.6, 1.2),
            (0.2, 0.6),
            None,
        ),
    ]
}

pub fn builtin_templates(kind: SiteKind) -> Vec<NodeTemplate> {
    match kind {
        SiteKind::Wreck => wreck_templates(),
        SiteKind::ResourceNode => resource_templates(),
    }
}

// ---------------------------------------------------------------------------
// Generation
// ---------------------------------------------------------------------------

fn draw(rng: &mut impl Rng, (lo, hi): (f32, f32)) -> f32 {
    if hi <= lo {
        lo
    } else {
        rng.gen_range(lo..=hi)
    }
}

fn instantiate(template: &NodeTemplate, kind: SiteKind, rng: &mut impl Rng) -> LootNode {
    let condition = match kind {
        SiteKind::Wreck => draw(rng, (40.0, 100.0)),
        SiteKind::ResourceNode => 100.0,
    };
    LootNode {
        id: NodeId::generate(rng),
        name: template.name.clone(),
        category: template.category,
        tags: template.tags.clone(),
        mass_kg: draw(rng, template.mass_kg),
        volume_m3: draw(rng, template.volume_m3),
        condition,
        value: draw(rng, template.value),
        extract_time_sec: draw(rng, template.extract_time_sec),
        base_noise: draw(rng, template.base_noise),
        base_hazard: draw(rng, template.base_hazard),
        requires_tool: template.requires_tool,
        volatile: template.volatile,
    }
}

/// Generates a fresh site from the built-in templates for `params.kind`.
pub fn generate_site(params: &SiteGenParams, rng: &mut impl Rng) -> Site {
    generate_site_from(params, &builtin_templates(params.kind), rng)
}

/// Generates a fresh site drawing nodes uniformly from `templates`.
/// An empty template list yields an empty (already exhausted) site.
pub fn generate_site_from(
    params: &SiteGenParams,
    templates: &[NodeTemplate],
    rng: &mut impl Rng,
) -> Site {
    let id = SiteId::generate(rng);
    let lo = *params.node_count.start();
    let hi = (*params.node_count.end()).max(lo);
    let count = if templates.is_empty() {
        0
    } else {
        rng.gen_range(lo..=hi)
    };

    let nodes: Vec<LootNode> = (0..count)
        .map(|_| {
            let template = &templates[rng.gen_range(0..templates.len())];
            instantiate(template, params.kind, rng)
        })
        .collect();

    let mut site = Site::new(id, params.kind, params.position, nodes);
    site.created_at_ms = params.created_at_ms;
    match params.kind {
        SiteKind::Wreck => {
            site.hazard = draw(rng, (0.0, 10.0));
            site.ambient_noise = draw(rng, (0.2, 1.0));
            site.structural_integrity = draw(rng, (40.0, 100.0));
        }
        SiteKind::ResourceNode => {
            site.hazard = draw(rng, (0.0, 5.0));
            site.ambient_noise = draw(rng, (0.2, 1.0));
            site.structural_integrity = 100.0;
        }
    }
    site
}

// ---------------------------------------------------------------------------
// Loading
// ---------------------------------------------------------------------------

/// Checks every template range is ordered and physically sensible.
pub fn validate_templates(templates: &[NodeTemplate]) -> Result<()> {
    ensure!(!templates.is_empty(), "template list is empty");
    for template in templates {
        ensure!(!template.name.is_empty(), "template with empty name");
        let ranges = [
            ("mass_kg", template.mass_kg),
            ("volume_m3", template.volume_m3),
            ("value", template.value),
            ("extract_time_sec", template.extract_time_sec),
            ("base_noise", template.base_noise),
            ("base_hazard", template.base_hazard),
        ];
        for (field, (lo, hi)) in ranges {
            ensure!(
                lo.is_finite() && hi.is_finite() && lo <= hi,
                "template '{}' {field} range ({lo}, {hi}) is not ordered",
                template.name,
            );
            ensure!(
                lo >= 0.0,
                "template '{}' {field} range starts below zero",
                template.name,
            );
        }
    }
    Ok(())
}

pub fn load_templates(path: &Path) -> Result<Vec<NodeTemplate>> {
    let file: TemplatesFile = serde_json::from_str(
        &std::fs::read_to_string(path)
            .with_context(|| format!("reading {}", path.display()))?,
    )
    .with_context(|| format!("parsing {}", path.display()))?;
    validate_templates(&file.templates)
        .with_context(|| format!("validating {}", path.display()))?;
    Ok(file.templates)
}

pub fn load_overrides(path: &Path) -> Result<ConfigOverrides> {
    let contents =
        std::fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    serde_json::from_str(&contents).with_context(|| format!("parsing {}", path.display()))
}

/// Defaults merged with the overrides file at `path`, validated.
pub fn load_config(path: &Path) -> Result<SimulationConfig> {
    let config = SimulationConfig::default().with_overrides(&load_overrides(path)?);
    config
        .validate()
        .with_context(|| format!("invalid config in {}", path.display()))?;
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use salvage_core::test_fixtures::make_rng;

    #[test]
    fn test_builtin_templates_are_valid() {
        validate_templates(&builtin_templates(SiteKind::Wreck)).unwrap();
        validate_templates(&builtin_templates(SiteKind::ResourceNode)).unwrap();
    }

    #[test]
    fn test_resource_templates_are_deposits() {
        for template in builtin_templates(SiteKind::ResourceNode) {
            assert_eq!(template.category, NodeCategory::Crate);
            assert!(
                template.tags.contains(&NodeTag::Ore) || template.tags.contains(&NodeTag::Oil),
                "{} is not an ore or oil deposit",
                template.name
            );
        }
    }

    #[test]
    fn test_draw_degenerate_range_returns_low() {
        let mut rng = make_rng();
        assert!((draw(&mut rng, (5.0, 5.0)) - 5.0).abs() < 1e-6);
        assert!((draw(&mut rng, (5.0, 1.0)) - 5.0).abs() < 1e-6);
    }

    #[test]
    fn test_inverted_range_rejected() {
        let mut templates = builtin_templates(SiteKind::Wreck);
        templates[0].mass_kg = (10.0, 1.0);
        let err = validate_templates(&templates).unwrap_err();
        assert!(err.to_string().contains("mass_kg"));
    }

    #[test]
    fn test_negative_range_rejected() {
        let mut templates = builtin_templates(SiteKind::Wreck);
        templates[1].base_hazard = (-1.0, 1.0);
        assert!(validate_templates(&templates).is_err());
    }

    #[test]
    fn test_empty_template_list_rejected() {
        assert!(validate_templates(&[]).is_err());
    }

    #[test]
    fn test_params_now_stamps_time() {
        let params = SiteGenParams::now(SiteKind::Wreck);
        assert!(params.created_at_ms > 0);
        assert_eq!(params.node_count, 6..=12);
    }
}
