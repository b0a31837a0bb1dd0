use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use salvage_control::{AutoQueuePriorities, QueuePlanner, ValueDensityPlanner};
use salvage_core::{
    CargoState, EventEnvelope, EventLevel, ExtractionEngine, ExtractionEvent, NodeTag,
    OperationOptions, SimulationConfig, Site, SiteKind, Stance, ToolsState,
};
use salvage_world::{generate_site, load_config, SiteGenParams};
use serde::Serialize;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

// ---------------------------------------------------------------------------
// CLI definition
// ---------------------------------------------------------------------------

#[derive(Parser)]
#[command(name = "salvage_cli", about = "Salvage operation simulator")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate a site, plan a queue and run the operation to completion.
    Run(RunArgs),
    /// Generate a site and print it as JSON.
    Generate {
        #[arg(long)]
        seed: Option<u64>,
        #[arg(long, default_value = "wreck")]
        kind: SiteKind,
    },
}

#[derive(Args)]
#[allow(clippy::struct_excessive_bools)]
struct RunArgs {
    /// Seed for site generation and hazard rolls. Random if omitted.
    #[arg(long)]
    seed: Option<u64>,
    #[arg(long, default_value = "wreck")]
    kind: SiteKind,
    #[arg(long, default_value = "normal")]
    stance: Stance,
    /// Hold the queue head until cargo space frees up instead of skipping it.
    #[arg(long)]
    wait_for_space: bool,
    /// Stabilize volatiles before the first extraction.
    #[arg(long)]
    stabilize: bool,
    /// Preferred tag for the auto-queue planner; repeatable, first three count.
    #[arg(long = "prefer")]
    prefer: Vec<NodeTag>,
    #[arg(long, default_value_t = 8)]
    max_items: usize,
    #[arg(long, default_value_t = 1_500.0)]
    cargo_mass: f32,
    #[arg(long, default_value_t = 20.0)]
    cargo_volume: f32,
    #[arg(long)]
    crane: bool,
    #[arg(long)]
    cutter: bool,
    /// JSON file of config overrides.
    #[arg(long)]
    config: Option<PathBuf>,
    /// Abort the operation if it is still running after this many steps.
    #[arg(long, default_value_t = 100_000)]
    max_steps: u64,
    #[arg(long, default_value = "normal", value_parser = ["normal", "debug"])]
    event_level: String,
    /// Write every emitted event to this file as JSON.
    #[arg(long)]
    events_out: Option<PathBuf>,
}

// ---------------------------------------------------------------------------
// Run loop
// ---------------------------------------------------------------------------

#[derive(Serialize)]
struct EventLog<'a> {
    seed: u64,
    site_id: &'a str,
    events: &'a [EventEnvelope],
}

fn resolve_config(path: Option<&Path>) -> Result<SimulationConfig> {
    match path {
        Some(path) => load_config(path),
        None => Ok(SimulationConfig::default()),
    }
}

fn run(args: &RunArgs) -> Result<()> {
    let seed = args.seed.unwrap_or_else(rand::random);
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let config = resolve_config(args.config.as_deref())?;

    let site = generate_site(&SiteGenParams::now(args.kind), &mut rng);
    let cargo = CargoState::new(args.cargo_mass, args.cargo_volume);
    let planner = ValueDensityPlanner {
        priorities: AutoQueuePriorities::preferring(&args.prefer),
        max_items: args.max_items,
    };
    let plan = planner.plan(&site.nodes, &cargo);

    println!(
        "Site {} ({:?}) seed={seed}: {} nodes, hazard={:.1}, integrity={:.0}",
        site.id,
        site.kind,
        site.nodes.len(),
        site.hazard,
        site.structural_integrity,
    );
    print_manifest(&site, &plan);
    println!("{}", "-".repeat(80));

    let options = OperationOptions {
        stance: args.stance,
        wait_for_space: args.wait_for_space,
        auto_stabilize_volatiles: args.stabilize,
        event_level: match args.event_level.as_str() {
            "debug" => EventLevel::Debug,
            _ => EventLevel::Normal,
        },
    };
    let tools = ToolsState {
        has_crane: args.crane,
        has_cutter: args.cutter,
    };
    let site_id = site.id.0.clone();
    let mut engine = ExtractionEngine::new(site, cargo, tools, options, config, rng)
        .context("building extraction engine")?;
    let queued = engine.enqueue(&plan);
    info!(queued, "queue planned");

    let mut log = Vec::new();
    let mut on_event = |envelope: EventEnvelope| {
        print_event(&envelope);
        log.push(envelope);
    };
    engine.start(&mut on_event);
    let mut steps = 0;
    while engine.is_running() && steps < args.max_steps {
        engine.run_step(&mut on_event);
        steps += 1;
    }
    if engine.is_running() {
        warn!(steps, "step limit reached; aborting");
        engine.abort(&mut on_event);
    }

    println!("{}", "-".repeat(80));
    print_summary(&engine, &log);

    if let Some(path) = &args.events_out {
        write_events(path, seed, &site_id, &log)?;
        println!("Events written to {}", path.display());
    }
    Ok(())
}

fn print_manifest(site: &Site, plan: &[salvage_core::NodeId]) {
    for node in &site.nodes {
        let slot = plan
            .iter()
            .position(|id| *id == node.id)
            .map_or_else(|| "  -".to_string(), |i| format!("{:3}", i + 1));
        let tags: Vec<&str> = node.tags.iter().map(|t| t.label()).collect();
        let tool = node.requires_tool.map(|t| t.to_string()).unwrap_or_default();
        println!(
            "  {slot}  {:<18} {:>7.1}kg {:>5.2}m3  value={:>7.1}  cond={:>5.1}  {:>5.1}s  [{}] {tool}",
            node.name,
            node.mass_kg,
            node.volume_m3,
            node.value,
            node.condition,
            node.extract_time_sec,
            tags.join(","),
        );
    }
}

fn print_event(envelope: &EventEnvelope) {
    let detail = match &envelope.event {
        ExtractionEvent::Tick { .. } | ExtractionEvent::ItemProgress { .. } => return,
        ExtractionEvent::ItemStarted {
            node, total_sec, ..
        } => format!("extracting {} ({total_sec:.1}s)", node.name),
        ExtractionEvent::ItemTransferred { node, .. } => format!(
            "transferred {} ({:.1}kg, condition {:.0})",
            node.name, node.mass_kg, node.condition
        ),
        ExtractionEvent::HazardThreshold { threshold, hazard } => {
            format!("*** hazard threshold {threshold:.0} crossed (hazard={hazard:.1}) ***")
        }
        ExtractionEvent::ItemSkipped { message, .. }
        | ExtractionEvent::ItemStalled { message, .. }
        | ExtractionEvent::NodeDamaged { message, .. }
        | ExtractionEvent::NodeDestroyed { message, .. }
        | ExtractionEvent::StabilizedVolatiles { message }
        | ExtractionEvent::Aborted { message }
        | ExtractionEvent::Completed { message } => message.clone(),
    };
    println!(
        "[t={:7.1}s {:<19}] {detail}",
        envelope.time_sec,
        envelope.event.label()
    );
}

fn print_summary(engine: &ExtractionEngine<ChaCha8Rng>, log: &[EventEnvelope]) {
    let state = engine.state();
    let (count, value) = log
        .iter()
        .filter_map(|e| match &e.event {
            ExtractionEvent::ItemTransferred { node, .. } => Some(node.value),
            _ => None,
        })
        .fold((0, 0.0_f32), |(n, total), v| (n + 1, total + v));
    let count_label = |label: &str| log.iter().filter(|e| e.event.label() == label).count();

    println!(
        "Status: {:?} after {:.1}s ({} ticks)",
        state.status, state.elapsed_sec, state.tick
    );
    println!("Transferred: {count} item(s) worth {value:.1}");
    println!(
        "Skipped: {}  Destroyed: {}  Damaged: {}",
        count_label("ItemSkipped"),
        count_label("NodeDestroyed"),
        count_label("NodeDamaged"),
    );
    println!(
        "Cargo: {:.1}/{:.1}kg  {:.2}/{:.2}m3",
        state.cargo.used_mass_kg,
        state.cargo.max_mass_kg,
        state.cargo.used_volume_m3,
        state.cargo.max_volume_m3,
    );
    println!(
        "Site: hazard={:.1}  noise={:.1}  remaining={}  exhausted={}",
        state.site.hazard,
        state.total_noise,
        state.site.nodes.len(),
        state.site.exhausted,
    );
}

fn write_events(path: &Path, seed: u64, site_id: &str, events: &[EventEnvelope]) -> Result<()> {
    let file =
        std::fs::File::create(path).with_context(|| format!("creating {}", path.display()))?;
    let log = EventLog {
        seed,
        site_id,
        events,
    };
    serde_json::to_writer_pretty(file, &log)
        .with_context(|| format!("writing {}", path.display()))?;
    Ok(())
}

fn generate(seed: Option<u64>, kind: SiteKind) -> Result<()> {
    let seed = seed.unwrap_or_else(rand::random);
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let site = generate_site(&SiteGenParams::now(kind), &mut rng);
    let json = serde_json::to_string_pretty(&site).context("serializing site")?;
    println!("{json}");
    Ok(())
}

// ---------------------------------------------------------------------------
// Entry point
// ---------------------------------------------------------------------------

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match cli.command {
        Commands::Run(args) => run(&args)?,
        Commands::Generate { seed, kind } => generate(seed, kind)?,
    }
    Ok(())
}
