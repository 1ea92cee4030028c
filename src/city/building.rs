//! Building archetype with SoA layout

use std::collections::BTreeMap;

use crate::city::stockpile::ResourceStore;
use crate::content::ObjectDef;
use crate::core::types::{EntityId, ObjectDefId, Tick, TilePos};

/// Attachment affinity is kept within [0, 10]
pub const ATTACHMENT_MAX: f32 = 10.0;

/// Structure of Arrays for building and object instances
///
/// Same conventions as the pawn archetype: slots are never reused, ids are
/// ascending, and deleted instances stay with `alive = false`.
#[derive(Debug, Clone, Default)]
pub struct BuildingArchetype {
    pub ids: Vec<EntityId>,
    pub def_ids: Vec<ObjectDefId>,
    /// Top-left footprint tile
    pub anchors: Vec<TilePos>,
    /// Footprint size copied from the definition at placement
    pub footprints: Vec<(u32, u32)>,
    pub levels: Vec<u32>,
    pub gold: Vec<u64>,
    pub stores: Vec<Option<ResourceStore>>,
    /// Per-pawn affinity in [0, 10]
    pub attachment: Vec<BTreeMap<EntityId, f32>>,
    /// Cumulative gold moved through the building (payments in, wages out)
    pub throughput: Vec<u64>,
    /// Decaying count of completed interactions, split by pawn
    pub recent_uses: Vec<BTreeMap<EntityId, f32>>,
    pub built_at: Vec<Tick>,
    /// Last tick a resident was spawned here (homes only)
    pub last_spawn: Vec<Tick>,
    pub alive: Vec<bool>,
}

impl BuildingArchetype {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of slots, including deleted ones
    pub fn count(&self) -> usize {
        self.ids.len()
    }

    pub fn live_count(&self) -> usize {
        self.alive.iter().filter(|&&a| a).count()
    }

    /// Append an instance of `def` anchored at `anchor`
    pub fn spawn(&mut self, id: EntityId, def: &ObjectDef, anchor: TilePos, tick: Tick) -> usize {
        debug_assert!(self.ids.last().map_or(true, |&last| last < id));
        let index = self.ids.len();
        self.ids.push(id);
        self.def_ids.push(def.id);
        self.anchors.push(anchor);
        self.footprints.push(def.footprint);
        self.levels.push(0);
        self.gold.push(0);
        self.stores.push(def.store.as_ref().map(ResourceStore::from_def));
        self.attachment.push(BTreeMap::new());
        self.throughput.push(0);
        self.recent_uses.push(BTreeMap::new());
        self.built_at.push(tick);
        self.last_spawn.push(tick);
        self.alive.push(true);
        index
    }

    /// Index of a live instance
    pub fn index_of(&self, id: EntityId) -> Option<usize> {
        self.ids
            .binary_search(&id)
            .ok()
            .filter(|&i| self.alive[i])
    }

    pub fn iter_living(&self) -> impl Iterator<Item = usize> + '_ {
        self.alive
            .iter()
            .enumerate()
            .filter(|(_, &alive)| alive)
            .map(|(i, _)| i)
    }

    /// Live instances of one definition, ascending id
    pub fn iter_of_def(&self, def: ObjectDefId) -> impl Iterator<Item = usize> + '_ {
        self.iter_living().filter(move |&i| self.def_ids[i] == def)
    }

    /// Mark an instance deleted; returns its index if it was alive
    pub fn despawn(&mut self, id: EntityId) -> Option<usize> {
        let index = self.index_of(id)?;
        self.alive[index] = false;
        self.attachment[index].clear();
        self.recent_uses[index].clear();
        Some(index)
    }

    /// Tiles covered by the footprint of instance `index`
    pub fn footprint_tiles(&self, index: usize) -> Vec<TilePos> {
        let anchor = self.anchors[index];
        let (w, h) = self.footprints[index];
        (0..h as i32)
            .flat_map(|dy| (0..w as i32).map(move |dx| anchor.offset(dx, dy)))
            .collect()
    }

    /// Use-area tiles of instance `index`, in definition order
    pub fn use_tiles(&self, index: usize, def: &ObjectDef) -> Vec<TilePos> {
        let anchor = self.anchors[index];
        def.use_area
            .iter()
            .map(|&(dx, dy)| anchor.offset(dx, dy))
            .collect()
    }

    pub fn attachment_of(&self, index: usize, pawn: EntityId) -> f32 {
        self.attachment[index].get(&pawn).copied().unwrap_or(0.0)
    }

    pub fn add_attachment(&mut self, index: usize, pawn: EntityId, amount: f32) {
        let entry = self.attachment[index].entry(pawn).or_insert(0.0);
        *entry = (*entry + amount).clamp(0.0, ATTACHMENT_MAX);
    }

    /// Drop every attachment and use entry pointing at a deleted pawn
    pub fn forget_pawn(&mut self, pawn: EntityId) {
        for map in self.attachment.iter_mut().chain(self.recent_uses.iter_mut()) {
            map.remove(&pawn);
        }
    }

    pub fn record_use(&mut self, index: usize, pawn: EntityId) {
        *self.recent_uses[index].entry(pawn).or_insert(0.0) += 1.0;
    }

    /// Recent uses of instance `index` by every pawn
    pub fn total_recent_uses(&self, index: usize) -> f32 {
        self.recent_uses[index].values().sum()
    }

    /// Recent uses of instance `index` by pawns other than `pawn`
    pub fn contention_for(&self, index: usize, pawn: EntityId) -> f32 {
        self.recent_uses[index]
            .iter()
            .filter(|(&user, _)| user != pawn)
            .map(|(_, &uses)| uses)
            .sum()
    }

    /// Decay contention counters; tiny remainders are dropped
    pub fn decay_recent_uses(&mut self, factor: f32) {
        for map in &mut self.recent_uses {
            map.retain(|_, uses| {
                *uses *= factor;
                *uses >= 0.001
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::content::standard::{FARM, TAVERN};
    use crate::content::ContentRegistry;

    #[test]
    fn test_spawn_copies_definition_data() {
        let registry = ContentRegistry::standard().unwrap();
        let tavern = registry.object(TAVERN).unwrap();
        let mut arch = BuildingArchetype::new();
        let idx = arch.spawn(EntityId(4), tavern, TilePos::new(5, 5), 0);

        assert_eq!(idx, 0);
        assert_eq!(arch.levels[0], 0);
        assert_eq!(arch.stores[0].map(|s| s.amount), Some(20));
        assert_eq!(arch.footprint_tiles(0).len(), 4);
        assert!(arch.footprint_tiles(0).contains(&TilePos::new(6, 6)));
        assert!(arch.use_tiles(0, tavern).contains(&TilePos::new(4, 5)));
    }

    #[test]
    fn test_iter_of_def_and_despawn() {
        let registry = ContentRegistry::standard().unwrap();
        let mut arch = BuildingArchetype::new();
        arch.spawn(EntityId(1), registry.object(FARM).unwrap(), TilePos::new(0, 0), 0);
        arch.spawn(EntityId(2), registry.object(TAVERN).unwrap(), TilePos::new(9, 0), 0);
        arch.spawn(EntityId(3), registry.object(FARM).unwrap(), TilePos::new(0, 9), 0);

        assert_eq!(arch.iter_of_def(FARM).collect::<Vec<_>>(), vec![0, 2]);
        arch.despawn(EntityId(1));
        assert_eq!(arch.iter_of_def(FARM).collect::<Vec<_>>(), vec![2]);
        assert_eq!(arch.index_of(EntityId(1)), None);
        assert_eq!(arch.live_count(), 2);
    }

    #[test]
    fn test_attachment_is_clamped() {
        let registry = ContentRegistry::standard().unwrap();
        let mut arch = BuildingArchetype::new();
        arch.spawn(EntityId(1), registry.object(TAVERN).unwrap(), TilePos::new(0, 0), 0);
        for _ in 0..30 {
            arch.add_attachment(0, EntityId(9), 1.0);
        }
        assert_eq!(arch.attachment_of(0, EntityId(9)), ATTACHMENT_MAX);
        arch.forget_pawn(EntityId(9));
        assert_eq!(arch.attachment_of(0, EntityId(9)), 0.0);
    }

    #[test]
    fn test_recent_uses_decay_to_zero() {
        let registry = ContentRegistry::standard().unwrap();
        let mut arch = BuildingArchetype::new();
        arch.spawn(EntityId(1), registry.object(TAVERN).unwrap(), TilePos::new(0, 0), 0);
        arch.record_use(0, EntityId(9));
        for _ in 0..2000 {
            arch.decay_recent_uses(0.9);
        }
        assert_eq!(arch.total_recent_uses(0), 0.0);
        assert!(arch.recent_uses[0].is_empty());
    }

    #[test]
    fn test_own_uses_are_not_contention() {
        let registry = ContentRegistry::standard().unwrap();
        let mut arch = BuildingArchetype::new();
        arch.spawn(EntityId(1), registry.object(TAVERN).unwrap(), TilePos::new(0, 0), 0);
        arch.record_use(0, EntityId(7));
        arch.record_use(0, EntityId(7));
        arch.record_use(0, EntityId(8));

        assert_eq!(arch.total_recent_uses(0), 3.0);
        assert_eq!(arch.contention_for(0, EntityId(7)), 1.0);
        assert_eq!(arch.contention_for(0, EntityId(8)), 2.0);
        arch.forget_pawn(EntityId(8));
        assert_eq!(arch.contention_for(0, EntityId(7)), 0.0);
    }
}
