//! Colony Sim - headless runner
//!
//! Builds the demo village (or resumes a save), optionally applies a command
//! script, runs it for a number of ticks, and prints a JSON summary per
//! instance. Several seeds run in parallel; each instance owns all of its
//! state, so results match a serial run seed for seed.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use clap::Parser;
use rayon::prelude::*;
use serde::Serialize;
use tracing_subscriber::EnvFilter;

use colony_sim::command::{CommandExecutor, CommandOutcome, CommandResolver};
use colony_sim::content::ContentRegistry;
use colony_sim::core::error::Result;
use colony_sim::core::SimulationConfig;
use colony_sim::ecs::world::World;
use colony_sim::persistence::SaveState;
use colony_sim::render::{collect_snapshot, RenderSnapshot};
use colony_sim::simulation::{demo_world, run_simulation_tick, SimulationEvent};

#[derive(Parser, Debug)]
#[command(name = "colony-sim")]
#[command(about = "Run the colony simulation headless and print a summary")]
struct Args {
    /// Seed of the first instance; instance i uses seed + i
    #[arg(long, default_value_t = 1)]
    seed: u64,

    /// Ticks to run
    #[arg(long, default_value_t = 2000)]
    ticks: u64,

    /// Independent instances to run in parallel
    #[arg(long, default_value_t = 1)]
    instances: u64,

    /// TOML file overriding simulation constants
    #[arg(long)]
    config: Option<PathBuf>,

    /// Resume from a save instead of building the demo world
    #[arg(long)]
    load: Option<PathBuf>,

    /// Command script applied before the run
    #[arg(long)]
    commands: Option<PathBuf>,

    /// Write the final state here (suffixed with the seed for several instances)
    #[arg(long)]
    save: Option<PathBuf>,

    /// Log a snapshot summary every N ticks
    #[arg(long)]
    snapshot_every: Option<u64>,
}

#[derive(Debug, Default, Serialize)]
struct RunSummary {
    seed: u64,
    tick: u64,
    pawns: usize,
    buildings: usize,
    average_mood: f32,
    total_gold: u128,
    minted: u64,
    tax_pool: u64,
    interactions: usize,
    path_failures: usize,
    gave_up_waiting: usize,
    stalls: usize,
    spawned: usize,
    level_ups: usize,
}

impl RunSummary {
    fn record(&mut self, events: &[SimulationEvent]) {
        for event in events {
            match event {
                SimulationEvent::InteractionCompleted { .. } => self.interactions += 1,
                SimulationEvent::PathFailed { .. } => self.path_failures += 1,
                SimulationEvent::GaveUpWaiting { .. } => self.gave_up_waiting += 1,
                SimulationEvent::Stalled { .. } => self.stalls += 1,
                SimulationEvent::PawnSpawned { .. } => self.spawned += 1,
                SimulationEvent::LevelUp { .. } => self.level_ups += 1,
                _ => {}
            }
        }
    }
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("colony_sim=info")),
        )
        .init();

    let args = Args::parse();
    let config = match &args.config {
        Some(path) => SimulationConfig::from_toml_file(path)?,
        None => SimulationConfig::default(),
    };
    let script = match &args.commands {
        Some(path) => Some(std::fs::read_to_string(path)?),
        None => None,
    };

    tracing::info!(seed = args.seed, instances = args.instances, ticks = args.ticks, "Colony Sim starting");

    let results: Vec<Result<RunSummary>> = (0..args.instances.max(1))
        .into_par_iter()
        .map(|i| run_instance(&args, config.clone(), script.as_deref(), args.seed + i))
        .collect();

    for result in results {
        let summary = result?;
        println!("{}", serde_json::to_string(&summary)?);
    }
    Ok(())
}

fn run_instance(args: &Args, config: SimulationConfig, script: Option<&str>, seed: u64) -> Result<RunSummary> {
    // Each instance builds its own registry; nothing is shared between runs
    let registry = ContentRegistry::standard()?;
    let mut world = match &args.load {
        Some(path) => SaveState::read_from(path)?.import(Arc::clone(&registry))?,
        None => demo_world(config, Arc::clone(&registry), seed)?,
    };

    let mut summary = RunSummary {
        seed: world.seed(),
        ..RunSummary::default()
    };

    if let Some(script) = script {
        let commands = CommandResolver::new(&registry).resolve_script(script)?;
        for command in commands {
            // Rejected commands are logged and skipped
            if let Ok(CommandOutcome::Advanced { events }) =
                CommandExecutor::execute(&mut world, command)
            {
                summary.record(&events);
            }
        }
    }

    let mut snapshot = RenderSnapshot::default();
    for _ in 0..args.ticks {
        let events = run_simulation_tick(&mut world);
        summary.record(&events);

        if let Some(every) = args.snapshot_every.filter(|&n| n > 0) {
            if world.current_tick % every == 0 {
                collect_snapshot(&world, &mut snapshot);
                tracing::info!(
                    seed,
                    tick = snapshot.tick,
                    pawns = snapshot.pawns.len(),
                    mood = snapshot.average_mood(),
                    tax_pool = snapshot.tax_pool,
                    "Snapshot"
                );
            }
        }
    }

    if let Some(path) = &args.save {
        let path = save_path(path, seed, args.instances > 1);
        SaveState::export(&world).write_to(&path)?;
        tracing::info!(seed, path = %path.display(), "Saved");
    }

    fill_summary(&mut summary, &world);
    Ok(summary)
}

fn fill_summary(summary: &mut RunSummary, world: &World) {
    let snapshot = RenderSnapshot::capture(world);
    summary.tick = world.current_tick;
    summary.pawns = snapshot.pawns.len();
    summary.buildings = snapshot.buildings.len();
    summary.average_mood = snapshot.average_mood();
    summary.total_gold = world.total_gold();
    summary.minted = world.treasury.minted;
    summary.tax_pool = world.treasury.tax_pool;
}

fn save_path(path: &Path, seed: u64, per_seed: bool) -> PathBuf {
    if !per_seed {
        return path.to_path_buf();
    }
    let stem = path.file_stem().and_then(|s| s.to_str()).unwrap_or("save");
    let ext = path.extension().and_then(|s| s.to_str()).unwrap_or("json");
    path.with_file_name(format!("{stem}-{seed}.{ext}"))
}
