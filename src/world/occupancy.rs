//! Occupancy arena: who stands on, blocks, or holds what
//!
//! One structure owns every cross-system claim so the "no double lock, no
//! orphaned lock, one pawn per tile" rules are enforced in a single place:
//! - building footprint tiles (impassable)
//! - pawn tiles (one pawn per tile, moves are reservation checked)
//! - interaction locks (one holder per building, one building per pawn)
//!
//! Tile maps use `AHashMap` for O(1) lookup and are never iterated for
//! simulation decisions; locks use `BTreeMap` so export order is stable.

use std::collections::BTreeMap;

use ahash::AHashMap;

use crate::core::types::{EntityId, TilePos};

/// Outcome of a lock request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LockResult {
    /// The pawn now holds the lock
    Acquired,
    /// The pawn already held this lock
    AlreadyHeld,
    /// Another pawn holds it
    Contended(EntityId),
}

#[derive(Debug, Clone, Default)]
pub struct Occupancy {
    structures: AHashMap<TilePos, EntityId>,
    pawns: AHashMap<TilePos, EntityId>,
    locks: BTreeMap<EntityId, EntityId>,
    held: BTreeMap<EntityId, EntityId>,
}

impl Occupancy {
    pub fn new() -> Self {
        Self::default()
    }

    // === STRUCTURES ===

    /// Claim footprint tiles for a building. Fails without side effects if
    /// any tile is already claimed by a structure or pawn.
    pub fn place_structure(&mut self, id: EntityId, tiles: &[TilePos]) -> bool {
        if tiles
            .iter()
            .any(|t| self.structures.contains_key(t) || self.pawns.contains_key(t))
        {
            return false;
        }
        for &t in tiles {
            self.structures.insert(t, id);
        }
        true
    }

    pub fn remove_structure(&mut self, id: EntityId, tiles: &[TilePos]) {
        for t in tiles {
            if self.structures.get(t) == Some(&id) {
                self.structures.remove(t);
            }
        }
    }

    pub fn structure_at(&self, pos: TilePos) -> Option<EntityId> {
        self.structures.get(&pos).copied()
    }

    // === PAWNS ===

    pub fn pawn_at(&self, pos: TilePos) -> Option<EntityId> {
        self.pawns.get(&pos).copied()
    }

    pub fn is_free(&self, pos: TilePos) -> bool {
        !self.structures.contains_key(&pos) && !self.pawns.contains_key(&pos)
    }

    pub fn place_pawn(&mut self, id: EntityId, pos: TilePos) -> bool {
        if !self.is_free(pos) {
            return false;
        }
        self.pawns.insert(pos, id);
        true
    }

    /// Move a pawn one tile. The destination acts as a reservation: the first
    /// pawn to claim it in a tick wins and later movers are refused.
    pub fn move_pawn(&mut self, id: EntityId, from: TilePos, to: TilePos) -> bool {
        if self.pawns.get(&from) != Some(&id) || !self.is_free(to) {
            return false;
        }
        self.pawns.remove(&from);
        self.pawns.insert(to, id);
        true
    }

    pub fn remove_pawn(&mut self, id: EntityId, pos: TilePos) {
        if self.pawns.get(&pos) == Some(&id) {
            self.pawns.remove(&pos);
        }
    }

    pub fn pawn_count(&self) -> usize {
        self.pawns.len()
    }

    // === LOCKS ===

    pub fn try_lock(&mut self, building: EntityId, pawn: EntityId) -> LockResult {
        match self.locks.get(&building) {
            Some(&holder) if holder == pawn => return LockResult::AlreadyHeld,
            Some(&holder) => return LockResult::Contended(holder),
            None => {}
        }
        // A pawn interacts with one building at a time
        if let Some(previous) = self.held.get(&pawn).copied() {
            self.locks.remove(&previous);
        }
        self.locks.insert(building, pawn);
        self.held.insert(pawn, building);
        LockResult::Acquired
    }

    /// Release a lock if (and only if) `pawn` holds it
    pub fn release(&mut self, building: EntityId, pawn: EntityId) -> bool {
        if self.locks.get(&building) != Some(&pawn) {
            return false;
        }
        self.locks.remove(&building);
        self.held.remove(&pawn);
        true
    }

    /// Drop whatever lock a pawn holds
    pub fn release_pawn(&mut self, pawn: EntityId) -> Option<EntityId> {
        let building = self.held.remove(&pawn)?;
        self.locks.remove(&building);
        Some(building)
    }

    /// Drop the lock on a building, returning its former holder
    pub fn release_building(&mut self, building: EntityId) -> Option<EntityId> {
        let pawn = self.locks.remove(&building)?;
        self.held.remove(&pawn);
        Some(pawn)
    }

    pub fn holder(&self, building: EntityId) -> Option<EntityId> {
        self.locks.get(&building).copied()
    }

    pub fn held_by(&self, pawn: EntityId) -> Option<EntityId> {
        self.held.get(&pawn).copied()
    }

    /// (building, holder) pairs in ascending building id order
    pub fn locks(&self) -> impl Iterator<Item = (EntityId, EntityId)> + '_ {
        self.locks.iter().map(|(b, p)| (*b, *p))
    }

    pub fn lock_count(&self) -> usize {
        self.locks.len()
    }
}
