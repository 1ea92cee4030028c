//! World invariant checker
//!
//! Any violation here is an engine defect, never a consequence of a valid
//! command sequence. The tick driver runs this in debug builds; tests call it
//! directly.

use thiserror::Error;

use crate::core::types::EntityId;
use crate::ecs::world::World;
use crate::entity::buffs::{MOOD_MAX, MOOD_MIN};
use crate::entity::tasks::{Action, HaulPickup, HaulStage, InteractPhase};
use crate::spatial::pathfinding::NavGrid;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invariant violated: {message}")]
pub struct InvariantViolation {
    pub message: String,
}

impl InvariantViolation {
    fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Check every world invariant; an empty list means the state is sound
pub fn check_invariants(world: &World) -> Vec<InvariantViolation> {
    let mut out = Vec::new();
    check_gold(world, &mut out);
    check_pawns(world, &mut out);
    check_locks(world, &mut out);
    check_stores(world, &mut out);
    out
}

fn check_gold(world: &World, out: &mut Vec<InvariantViolation>) {
    let actual = world.total_gold();
    let expected = world.treasury.expected_total();
    if actual != expected {
        out.push(InvariantViolation::new(format!(
            "gold total {actual} != injected + minted {expected}"
        )));
    }
}

fn check_pawns(world: &World, out: &mut Vec<InvariantViolation>) {
    let nav = NavGrid::new(&world.tiles, world.registry(), &world.occupancy);
    let mut live = 0;
    for p in world.pawns.iter_living() {
        live += 1;
        let id = world.pawns.ids[p];
        let pos = world.pawns.positions[p];

        for (need, value) in world.pawns.needs[p].iter() {
            if !(0.0..=100.0).contains(&value) {
                out.push(InvariantViolation::new(format!(
                    "pawn {id} need {need:?} = {value} out of range"
                )));
            }
        }
        let mood = world.pawns.moods[p];
        if !(MOOD_MIN..=MOOD_MAX).contains(&mood) {
            out.push(InvariantViolation::new(format!("pawn {id} mood {mood} out of range")));
        }
        if world.occupancy.pawn_at(pos) != Some(id) {
            out.push(InvariantViolation::new(format!(
                "pawn {id} at {pos:?} missing from occupancy"
            )));
        }
        if !nav.is_standable(pos) {
            out.push(InvariantViolation::new(format!(
                "pawn {id} stands on impassable {pos:?}"
            )));
        }
        let inventory = &world.pawns.inventories[p];
        if inventory.amount > inventory.capacity {
            out.push(InvariantViolation::new(format!(
                "pawn {id} carries {} over capacity {}",
                inventory.amount, inventory.capacity
            )));
        }
    }
    // Every occupied tile belongs to exactly one live pawn
    if world.occupancy.pawn_count() != live {
        out.push(InvariantViolation::new(format!(
            "{} occupied pawn tiles for {live} live pawns",
            world.occupancy.pawn_count()
        )));
    }
}

/// The building a pawn's current action is interacting with, if any
fn interacting_with(action: &Action) -> Option<EntityId> {
    match action {
        Action::Use {
            target,
            phase: InteractPhase::Interacting { .. },
            ..
        }
        | Action::Work {
            target,
            phase: InteractPhase::Interacting { .. },
            ..
        } => Some(*target),
        Action::Haul {
            job,
            stage: HaulStage::Load(InteractPhase::Interacting { .. }),
        } => match job.pickup {
            HaulPickup::Building(source) => Some(source),
            HaulPickup::Terrain(_) => None,
        },
        Action::Haul {
            job,
            stage: HaulStage::Unload(InteractPhase::Interacting { .. }),
        } => Some(job.dest),
        _ => None,
    }
}

fn check_locks(world: &World, out: &mut Vec<InvariantViolation>) {
    for (building, holder) in world.occupancy.locks() {
        if world.buildings.index_of(building).is_none() {
            out.push(InvariantViolation::new(format!(
                "lock on dead building {building}"
            )));
        }
        let Some(p) = world.pawns.index_of(holder) else {
            out.push(InvariantViolation::new(format!(
                "building {building} locked by dead pawn {holder}"
            )));
            continue;
        };
        if interacting_with(world.pawns.actions[p].current()) != Some(building) {
            out.push(InvariantViolation::new(format!(
                "pawn {holder} holds {building} without interacting with it"
            )));
        }
    }
}

fn check_stores(world: &World, out: &mut Vec<InvariantViolation>) {
    for b in world.buildings.iter_living() {
        if let Some(store) = &world.buildings.stores[b] {
            if store.amount > store.max {
                out.push(InvariantViolation::new(format!(
                    "building {} store {} over max {}",
                    world.buildings.ids[b], store.amount, store.max
                )));
            }
        }
    }
}
