//! Action execution - advances every pawn's current action once per tick
//!
//! Two passes in pawn index order:
//! - `advance_movement`: MoveTo path steps and Wander steps. Each step claims
//!   its destination tile through the occupancy arena, so when two pawns aim
//!   for the same tile the lower index wins and the other defers a tick.
//! - `advance_interactions`: lock acquisition, bounded waiting, countdowns,
//!   and atomic completion (needs, buffs, gold, resources).
//!
//! Every transition reads only the stored phase counters, path cursor, and
//! tick stamps, so replays are exact.

use std::sync::Arc;

use rand::Rng;

use crate::city::economy::{check_use, check_work, settle_use, settle_work, EconomyFailure};
use crate::content::{InteractionDef, InteractionKind, ObjectDef};
use crate::core::types::{EntityId, TilePos};
use crate::ecs::world::World;
use crate::entity::buffs::BuffSource;
use crate::entity::tasks::{Action, HaulJob, HaulPickup, HaulStage, InteractPhase};
use crate::simulation::tick::SimulationEvent;
use crate::spatial::pathfinding::{find_path, NavGrid};
use crate::world::LockResult;

/// Drop a pawn's plan, lock, and cargo; it re-decides on the next tick
pub fn abort_plan(world: &mut World, p: usize) {
    let pawn = world.pawns.ids[p];
    world.occupancy.release_pawn(pawn);
    world.pawns.actions[p].clear();
    world.pawns.inventories[p].clear();
}

// === MOVEMENT ===

pub fn advance_movement(world: &mut World, events: &mut Vec<SimulationEvent>) {
    for p in world.pawns.iter_living().collect::<Vec<_>>() {
        match world.pawns.actions[p].current().clone() {
            Action::MoveTo { target, goals } => step_move(world, p, target, &goals, events),
            Action::Wander { steps_left, dwell } => step_wander(world, p, steps_left, dwell),
            _ => {}
        }
    }
}

/// Recompute the path of pawn `p` toward `goals`; false when none exists
fn repath(world: &mut World, p: usize, goals: &[TilePos]) -> bool {
    let pawn = world.pawns.ids[p];
    let start = world.pawns.positions[p];
    let path = {
        let nav = NavGrid::new(&world.tiles, world.registry(), &world.occupancy)
            .for_mover(pawn, world.config.crowd_penalty);
        let free: Vec<TilePos> = goals
            .iter()
            .copied()
            .filter(|&g| nav.is_free_for_mover(g))
            .collect();
        find_path(&nav, start, &free, world.config.max_path_nodes)
    };
    match path {
        Some(path) => {
            let state = &mut world.pawns.actions[p];
            state.path = path.steps;
            state.cursor = 0;
            true
        }
        None => false,
    }
}

fn fail_path(world: &mut World, p: usize, target: Option<EntityId>, events: &mut Vec<SimulationEvent>) {
    let pawn = world.pawns.ids[p];
    let tick = world.current_tick;
    if let Some(target) = target {
        world
            .unreachable
            .mark(pawn, target, tick + world.config.unreachable_ttl);
        events.push(SimulationEvent::PathFailed { pawn, target, tick });
    }
    tracing::debug!(pawn = %pawn, target = ?target, "Path lost, abandoning plan");
    abort_plan(world, p);
}

fn step_move(
    world: &mut World,
    p: usize,
    target: Option<EntityId>,
    goals: &[TilePos],
    events: &mut Vec<SimulationEvent>,
) {
    let tick = world.current_tick;
    let pawn = world.pawns.ids[p];
    let pos = world.pawns.positions[p];

    if world.pawns.actions[p].remaining_path().is_empty() {
        if goals.contains(&pos) {
            world.pawns.actions[p].complete_current(tick);
            return;
        }
        if !repath(world, p, goals) {
            fail_path(world, p, target, events);
            return;
        }
    }
    if tick < world.pawns.actions[p].next_step_at {
        return;
    }

    let Some(&next) = world.pawns.actions[p].remaining_path().first() else {
        return;
    };

    let standable = NavGrid::new(&world.tiles, world.registry(), &world.occupancy).is_standable(next);
    if !standable {
        // The map changed under the cached path
        if !repath(world, p, goals) {
            fail_path(world, p, target, events);
        }
        return;
    }

    if world.occupancy.move_pawn(pawn, pos, next) {
        world.pawns.positions[p] = next;
        let interval = world.config.move_interval as u64;
        let state = &mut world.pawns.actions[p];
        state.cursor += 1;
        state.stalled_ticks = 0;
        state.next_step_at = tick + interval;
        if state.remaining_path().is_empty() && goals.contains(&next) {
            state.complete_current(tick);
        }
    } else {
        let limit = world.config.stall_limit;
        let state = &mut world.pawns.actions[p];
        state.stalled_ticks += 1;
        if state.stalled_ticks >= limit {
            let ticks = state.stalled_ticks;
            events.push(SimulationEvent::Stalled { pawn, ticks, tick });
            tracing::debug!(pawn = %pawn, ticks, "Stalled, re-deciding");
            abort_plan(world, p);
        }
    }
}

fn step_wander(world: &mut World, p: usize, steps_left: u32, dwell: u32) {
    let tick = world.current_tick;
    if dwell > 0 {
        set_wander(world, p, steps_left, dwell - 1);
        return;
    }
    if steps_left == 0 {
        world.pawns.actions[p].complete_current(tick);
        return;
    }

    let pawn = world.pawns.ids[p];
    let pos = world.pawns.positions[p];
    let radius = world.config.diversity_radius;
    let options: Vec<(TilePos, u32)> = {
        let nav = NavGrid::new(&world.tiles, world.registry(), &world.occupancy).for_mover(pawn, 0.0);
        pos.neighbors()
            .into_iter()
            .filter(|&n| nav.is_free_for_mover(n))
            .map(|n| (n, 1 + world.tiles.local_diversity(n, radius) as u32))
            .collect()
    };

    if let Some(next) = pick_weighted(world, &options) {
        if world.occupancy.move_pawn(pawn, pos, next) {
            world.pawns.positions[p] = next;
        }
    }
    let max_dwell = world.config.wander_max_dwell;
    let next_dwell = world.rng_mut().gen_range(0..=max_dwell);
    set_wander(world, p, steps_left - 1, next_dwell);
}

/// Weighted draw toward tiles with more terrain variety nearby
fn pick_weighted(world: &mut World, options: &[(TilePos, u32)]) -> Option<TilePos> {
    let total: u32 = options.iter().map(|(_, w)| w).sum();
    if total == 0 {
        return None;
    }
    let mut roll = world.rng_mut().gen_range(0..total);
    for &(pos, weight) in options {
        if roll < weight {
            return Some(pos);
        }
        roll -= weight;
    }
    None
}

fn set_wander(world: &mut World, p: usize, steps_left: u32, dwell: u32) {
    if let Action::Wander {
        steps_left: s,
        dwell: d,
    } = world.pawns.actions[p].current_mut()
    {
        *s = steps_left;
        *d = dwell;
    }
}

// === INTERACTIONS ===

pub fn advance_interactions(world: &mut World, events: &mut Vec<SimulationEvent>) {
    for p in world.pawns.iter_living().collect::<Vec<_>>() {
        match world.pawns.actions[p].current().clone() {
            Action::Use {
                target,
                interaction,
                phase,
            } => advance_service(world, p, target, interaction, phase, events),
            Action::Work {
                target,
                interaction,
                phase,
            } => advance_service(world, p, target, interaction, phase, events),
            Action::Haul { job, stage } => advance_haul(world, p, job, stage, events),
            _ => {}
        }
    }
}

fn set_phase(world: &mut World, p: usize, next: InteractPhase) {
    match world.pawns.actions[p].current_mut() {
        Action::Use { phase, .. } | Action::Work { phase, .. } => *phase = next,
        Action::Haul { stage, .. } => match stage {
            HaulStage::Load(phase) | HaulStage::Unload(phase) => *phase = next,
        },
        _ => {}
    }
}

fn stands_at_use_area(world: &World, p: usize, b: usize, def: &ObjectDef) -> bool {
    world
        .buildings
        .use_tiles(b, def)
        .contains(&world.pawns.positions[p])
}

/// Shared Pending/Waiting handling: try the lock, wait, or give up
///
/// Returns true when the lock is held after this call.
fn acquire(
    world: &mut World,
    p: usize,
    building: EntityId,
    phase: InteractPhase,
    duration: u32,
    events: &mut Vec<SimulationEvent>,
) -> bool {
    let pawn = world.pawns.ids[p];
    let tick = world.current_tick;
    match world.occupancy.try_lock(building, pawn) {
        LockResult::Acquired | LockResult::AlreadyHeld => {
            set_phase(
                world,
                p,
                InteractPhase::Interacting {
                    remaining: duration.max(1),
                },
            );
            true
        }
        LockResult::Contended(holder) => {
            match phase {
                InteractPhase::Waiting { retries_left } if retries_left <= 1 => {
                    events.push(SimulationEvent::GaveUpWaiting {
                        pawn,
                        building,
                        tick,
                    });
                    tracing::debug!(pawn = %pawn, building = %building, "Gave up waiting");
                    // Short cooldown so the next decision looks elsewhere
                    let cooldown = world.config.wait_retries as u64;
                    world.unreachable.mark(pawn, building, tick + cooldown);
                    abort_plan(world, p);
                }
                InteractPhase::Waiting { retries_left } => {
                    set_phase(
                        world,
                        p,
                        InteractPhase::Waiting {
                            retries_left: retries_left - 1,
                        },
                    );
                }
                _ => {
                    events.push(SimulationEvent::LockContended {
                        pawn,
                        building,
                        holder,
                        tick,
                    });
                    let retries_left = world.config.wait_retries;
                    set_phase(world, p, InteractPhase::Waiting { retries_left });
                }
            }
            false
        }
    }
}

/// Count an Interacting phase down; true when it just reached zero
fn countdown(world: &mut World, p: usize, remaining: u32) -> bool {
    let left = remaining.saturating_sub(1);
    if left == 0 {
        return true;
    }
    set_phase(world, p, InteractPhase::Interacting { remaining: left });
    false
}

fn advance_service(
    world: &mut World,
    p: usize,
    target: EntityId,
    interaction: usize,
    phase: InteractPhase,
    events: &mut Vec<SimulationEvent>,
) {
    let registry = Arc::clone(world.registry());
    let Some(b) = world.buildings.index_of(target) else {
        abort_plan(world, p);
        return;
    };
    let Some(def) = registry.object(world.buildings.def_ids[b]) else {
        abort_plan(world, p);
        return;
    };
    let Some(interaction_def) = def.interactions.get(interaction) else {
        abort_plan(world, p);
        return;
    };

    match phase {
        InteractPhase::Pending | InteractPhase::Waiting { .. } => {
            if !stands_at_use_area(world, p, b, def) {
                abort_plan(world, p);
                return;
            }
            let level = world.buildings.levels[b];
            let gold = world.pawns.gold[p];
            let check = match interaction_def.kind {
                InteractionKind::Work => check_work(def, level, gold, world.buildings.gold[b]).map(|_| ()),
                _ => check_use(def, level, gold, world.buildings.stores[b].as_ref()).map(|_| ()),
            };
            if let Err(reason) = check {
                fail_interaction(world, p, target, reason, events);
                return;
            }
            acquire(world, p, target, phase, interaction_def.duration, events);
        }
        InteractPhase::Interacting { remaining } => {
            if countdown(world, p, remaining) {
                complete_service(world, p, b, def, interaction_def, events);
            }
        }
    }
}

fn fail_interaction(
    world: &mut World,
    p: usize,
    building: EntityId,
    reason: EconomyFailure,
    events: &mut Vec<SimulationEvent>,
) {
    let pawn = world.pawns.ids[p];
    tracing::debug!(pawn = %pawn, building = %building, ?reason, "Interaction refused");
    events.push(SimulationEvent::InteractionFailed {
        pawn,
        building,
        reason,
        tick: world.current_tick,
    });
    abort_plan(world, p);
}

/// Apply need gains, the granted buff, attachment, and contention bookkeeping
fn apply_interaction_effects(world: &mut World, p: usize, b: usize, interaction_def: &InteractionDef) {
    let building = world.buildings.ids[b];
    let pawn = world.pawns.ids[p];
    for gain in &interaction_def.satisfies {
        world.pawns.needs[p].satisfy(gain.need, gain.amount);
    }
    if let Some(buff) = interaction_def.grant_buff {
        if let Some(def) = world.registry().buff(buff) {
            let (offset, duration) = (def.mood_offset, def.duration.unwrap_or(0));
            world.pawns.buffs[p].grant_timed(buff, BuffSource::Object(building), duration, offset);
        }
    }
    let gain = world.config.attachment_gain;
    world.buildings.add_attachment(b, pawn, gain);
    world.buildings.record_use(b, pawn);
}

fn complete_service(
    world: &mut World,
    p: usize,
    b: usize,
    def: &ObjectDef,
    interaction_def: &InteractionDef,
    events: &mut Vec<SimulationEvent>,
) {
    let building = world.buildings.ids[b];
    let pawn = world.pawns.ids[p];
    let tick = world.current_tick;
    let level = world.buildings.levels[b];

    let settled = match interaction_def.kind {
        InteractionKind::Work => settle_work(
            def,
            level,
            &mut world.pawns.gold[p],
            &mut world.buildings.gold[b],
            world.buildings.stores[b].as_mut(),
            &mut world.treasury,
        )
        .map(|r| r.payout),
        _ => settle_use(
            def,
            level,
            world.config.tax_percent,
            &mut world.pawns.gold[p],
            &mut world.buildings.gold[b],
            world.buildings.stores[b].as_mut(),
            &mut world.treasury,
        )
        .map(|r| r.cost),
    };

    match settled {
        Ok(gold) => {
            world.buildings.throughput[b] += gold;
            apply_interaction_effects(world, p, b, interaction_def);
            world.occupancy.release(building, pawn);
            world.pawns.actions[p].complete_current(tick);
            events.push(SimulationEvent::InteractionCompleted {
                pawn,
                building,
                kind: interaction_def.kind,
                gold,
                tick,
            });
        }
        Err(reason) => fail_interaction(world, p, building, reason, events),
    }
}

// === HAULING ===

fn advance_haul(
    world: &mut World,
    p: usize,
    job: HaulJob,
    stage: HaulStage,
    events: &mut Vec<SimulationEvent>,
) {
    let registry = Arc::clone(world.registry());
    let Some(dest) = world.buildings.index_of(job.dest) else {
        abort_plan(world, p);
        return;
    };
    let Some(dest_def) = registry.object(world.buildings.def_ids[dest]) else {
        abort_plan(world, p);
        return;
    };
    let Some(haul) = dest_def.haul else {
        abort_plan(world, p);
        return;
    };
    let dest_space = world.buildings.stores[dest].map_or(0, |s| s.space());
    if dest_space == 0 {
        abort_plan(world, p);
        return;
    }

    match stage {
        HaulStage::Load(phase) => match job.pickup {
            HaulPickup::Terrain(tile) => {
                let pos = world.pawns.positions[p];
                let in_reach = pos.manhattan(&tile) == 1
                    && world
                        .tiles
                        .get(tile)
                        .map_or(false, |t| {
                            t.terrains().any(|id| {
                                registry.terrain(id).and_then(|d| d.resource) == Some(job.resource)
                            })
                        });
                if !in_reach {
                    abort_plan(world, p);
                    return;
                }
                let amount = haul.per_trip.min(dest_space);
                if world.pawns.inventories[p].load(job.resource, amount) == 0 {
                    abort_plan(world, p);
                    return;
                }
                world.pawns.actions[p].complete_current(world.current_tick);
            }
            HaulPickup::Building(src) => {
                let Some(s) = world.buildings.index_of(src) else {
                    abort_plan(world, p);
                    return;
                };
                let Some(src_def) = registry.object(world.buildings.def_ids[s]) else {
                    abort_plan(world, p);
                    return;
                };
                match phase {
                    InteractPhase::Pending | InteractPhase::Waiting { .. } => {
                        if !stands_at_use_area(world, p, s, src_def) {
                            abort_plan(world, p);
                            return;
                        }
                        acquire(world, p, src, phase, 1, events);
                    }
                    InteractPhase::Interacting { remaining } => {
                        if !countdown(world, p, remaining) {
                            return;
                        }
                        let available = world.buildings.stores[s]
                            .filter(|st| st.resource == job.resource)
                            .map_or(0, |st| st.amount);
                        let space = world.pawns.inventories[p].space_for(job.resource);
                        let amount = haul.per_trip.min(available).min(space).min(dest_space);
                        world.occupancy.release(src, world.pawns.ids[p]);
                        if amount == 0 {
                            abort_plan(world, p);
                            return;
                        }
                        if let Some(store) = world.buildings.stores[s].as_mut() {
                            store.remove(amount);
                        }
                        world.pawns.inventories[p].load(job.resource, amount);
                        world.pawns.actions[p].complete_current(world.current_tick);
                    }
                }
            }
        },
        HaulStage::Unload(phase) => {
            if world.pawns.inventories[p].is_empty() {
                abort_plan(world, p);
                return;
            }
            let Some(interaction_def) = dest_def.interactions.get(job.interaction) else {
                abort_plan(world, p);
                return;
            };
            match phase {
                InteractPhase::Pending | InteractPhase::Waiting { .. } => {
                    if !stands_at_use_area(world, p, dest, dest_def) {
                        abort_plan(world, p);
                        return;
                    }
                    acquire(world, p, job.dest, phase, interaction_def.duration, events);
                }
                InteractPhase::Interacting { remaining } => {
                    if !countdown(world, p, remaining) {
                        return;
                    }
                    let pawn = world.pawns.ids[p];
                    let tick = world.current_tick;
                    let carried = world.pawns.inventories[p].amount;
                    let delivered = match world.buildings.stores[dest].as_mut() {
                        Some(store) if store.resource == job.resource => store.add(carried),
                        _ => 0,
                    };
                    // Whatever did not fit is dropped
                    world.pawns.inventories[p].clear();
                    apply_interaction_effects(world, p, dest, interaction_def);
                    world.occupancy.release(job.dest, pawn);
                    world.pawns.actions[p].complete_current(tick);
                    tracing::debug!(pawn = %pawn, building = %job.dest, delivered, "Haul delivered");
                    events.push(SimulationEvent::InteractionCompleted {
                        pawn,
                        building: job.dest,
                        kind: InteractionKind::Haul,
                        gold: 0,
                        tick,
                    });
                }
            }
        }
    }
}
