//! Tick system - orchestrates simulation updates
//!
//! One fixed-order pass per tick:
//! needs/buffs -> decisions -> movement -> interactions/economy -> bookkeeping
//!
//! Every system runs to completion before the next starts; nothing blocks.

use crate::city::economy::EconomyFailure;
use crate::content::InteractionKind;
use crate::core::types::{EntityId, Tick};
use crate::ecs::world::World;
use crate::simulation::action_execute::{advance_interactions, advance_movement};
use crate::simulation::action_select::select_actions;
use crate::simulation::invariants::check_invariants;
use crate::simulation::mood::{recompute_moods, update_needs};
use crate::simulation::population::try_population_growth;

/// Events generated during a simulation tick
///
/// Returned by `run_simulation_tick` for logs and observers.
#[derive(Debug, Clone, PartialEq)]
pub enum SimulationEvent {
    /// A pawn committed to a new plan
    ActionStarted {
        pawn: EntityId,
        action: &'static str,
        target: Option<EntityId>,
        tick: Tick,
    },
    /// A use, work, or haul delivery finished; `gold` is the amount moved
    InteractionCompleted {
        pawn: EntityId,
        building: EntityId,
        kind: InteractionKind,
        gold: u64,
        tick: Tick,
    },
    /// Economic re-check refused the interaction
    InteractionFailed {
        pawn: EntityId,
        building: EntityId,
        reason: EconomyFailure,
        tick: Tick,
    },
    /// The target was locked by another pawn; waiting began
    LockContended {
        pawn: EntityId,
        building: EntityId,
        holder: EntityId,
        tick: Tick,
    },
    GaveUpWaiting {
        pawn: EntityId,
        building: EntityId,
        tick: Tick,
    },
    /// No route to the target; it is skipped until the cache entry expires
    PathFailed {
        pawn: EntityId,
        target: EntityId,
        tick: Tick,
    },
    Stalled {
        pawn: EntityId,
        ticks: u32,
        tick: Tick,
    },
    PawnSpawned {
        pawn: EntityId,
        home: EntityId,
        tick: Tick,
    },
    LevelUp {
        building: EntityId,
        level: u32,
        tick: Tick,
    },
}

/// Run one simulation tick
pub fn run_simulation_tick(world: &mut World) -> Vec<SimulationEvent> {
    let mut events = Vec::new();

    update_needs(world);
    select_actions(world, &mut events);
    advance_movement(world, &mut events);
    advance_interactions(world, &mut events);

    // Bookkeeping
    let decay = world.config.contention_decay;
    world.buildings.decay_recent_uses(decay);

    let tick = world.current_tick;
    for (building, level) in world.apply_level_policy() {
        tracing::debug!(building = %building, level, "Building levelled up");
        events.push(SimulationEvent::LevelUp {
            building,
            level,
            tick,
        });
    }

    try_population_growth(world, &mut events);
    world.unreachable.purge(tick);
    recompute_moods(world);

    tracing::trace!(
        tick,
        pawns = world.pawns.live_count(),
        events = events.len(),
        "Tick complete"
    );

    world.tick();

    if cfg!(debug_assertions) {
        let violations = check_invariants(world);
        for violation in &violations {
            tracing::error!(tick = world.current_tick, "{}", violation);
        }
        debug_assert!(violations.is_empty(), "invariants broken: {violations:?}");
    }

    events
}

/// Run `n` ticks, collecting every event
pub fn advance_ticks(world: &mut World, n: u64) -> Vec<SimulationEvent> {
    let mut events = Vec::new();
    for _ in 0..n {
        events.extend(run_simulation_tick(world));
    }
    tracing::debug!(ticks = n, tick = world.current_tick, events = events.len(), "Advanced");
    events
}
