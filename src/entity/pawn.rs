//! Pawn archetype with SoA layout

use serde::{Deserialize, Serialize};

use crate::core::types::{EntityId, ResourceId, Tick, TilePos};
use crate::entity::buffs::BuffSet;
use crate::entity::needs::Needs;
use crate::entity::tasks::ActionState;

/// Carried cargo for hauling
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Inventory {
    pub resource: Option<ResourceId>,
    pub amount: u32,
    pub capacity: u32,
}

impl Inventory {
    pub fn with_capacity(capacity: u32) -> Self {
        Self {
            resource: None,
            amount: 0,
            capacity,
        }
    }

    /// Room left for `resource`; zero when carrying something else
    pub fn space_for(&self, resource: ResourceId) -> u32 {
        match self.resource {
            Some(r) if r != resource && self.amount > 0 => 0,
            _ => self.capacity.saturating_sub(self.amount),
        }
    }

    /// Add up to `amount`, returns what was actually taken
    pub fn load(&mut self, resource: ResourceId, amount: u32) -> u32 {
        let taken = amount.min(self.space_for(resource));
        if taken > 0 {
            self.resource = Some(resource);
            self.amount += taken;
        }
        taken
    }

    /// Remove up to `amount` of `resource`, returns what was actually removed
    pub fn unload(&mut self, resource: ResourceId, amount: u32) -> u32 {
        if self.resource != Some(resource) {
            return 0;
        }
        let removed = amount.min(self.amount);
        self.amount -= removed;
        if self.amount == 0 {
            self.resource = None;
        }
        removed
    }

    pub fn clear(&mut self) {
        self.resource = None;
        self.amount = 0;
    }

    pub fn is_empty(&self) -> bool {
        self.amount == 0
    }
}

/// Structure of Arrays for pawns
///
/// Indices only ever grow; a deleted pawn keeps its slot with `alive = false`.
/// Because ids are handed out in ascending order, `ids` is always sorted and
/// index order is creation order.
#[derive(Debug, Clone, Default)]
pub struct PawnArchetype {
    pub ids: Vec<EntityId>,
    pub names: Vec<String>,
    pub born_at: Vec<Tick>,
    pub positions: Vec<TilePos>,
    pub needs: Vec<Needs>,
    pub buffs: Vec<BuffSet>,
    /// Sum of buff offsets, refreshed every tick
    pub moods: Vec<f32>,
    pub actions: Vec<ActionState>,
    pub gold: Vec<u64>,
    pub inventories: Vec<Inventory>,
    /// Home that spawned this pawn, if any
    pub homes: Vec<Option<EntityId>>,
    pub alive: Vec<bool>,
}

impl PawnArchetype {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of slots, including dead ones
    pub fn count(&self) -> usize {
        self.ids.len()
    }

    pub fn live_count(&self) -> usize {
        self.alive.iter().filter(|&&a| a).count()
    }

    /// Append a pawn; `id` must be greater than every existing id
    pub fn spawn(
        &mut self,
        id: EntityId,
        name: String,
        position: TilePos,
        needs: Needs,
        tick: Tick,
    ) -> usize {
        debug_assert!(self.ids.last().map_or(true, |&last| last < id));
        let index = self.ids.len();
        self.ids.push(id);
        self.names.push(name);
        self.born_at.push(tick);
        self.positions.push(position);
        self.needs.push(needs);
        self.buffs.push(BuffSet::new());
        self.moods.push(0.0);
        self.actions.push(ActionState::new());
        self.gold.push(0);
        self.inventories.push(Inventory::default());
        self.homes.push(None);
        self.alive.push(true);
        index
    }

    /// Index of a live pawn
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

    /// Mark a pawn dead; returns its index if it was alive
    pub fn despawn(&mut self, id: EntityId) -> Option<usize> {
        let index = self.index_of(id)?;
        self.alive[index] = false;
        self.actions[index].clear();
        self.inventories[index].clear();
        Some(index)
    }

    pub fn residents_of(&self, home: EntityId) -> usize {
        self.iter_living()
            .filter(|&i| self.homes[i] == Some(home))
            .count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::ResourceId;

    const FOOD: ResourceId = ResourceId(0);
    const WOOD: ResourceId = ResourceId(1);

    fn spawn_three() -> PawnArchetype {
        let mut pawns = PawnArchetype::new();
        for (i, id) in [3, 7, 12].into_iter().enumerate() {
            pawns.spawn(
                EntityId(id),
                format!("p{}", i),
                TilePos::new(i as i32, 0),
                Needs::default(),
                0,
            );
        }
        pawns
    }

    #[test]
    fn test_index_lookup_skips_dead() {
        let mut pawns = spawn_three();
        assert_eq!(pawns.index_of(EntityId(7)), Some(1));
        assert_eq!(pawns.index_of(EntityId(8)), None);

        assert_eq!(pawns.despawn(EntityId(7)), Some(1));
        assert_eq!(pawns.index_of(EntityId(7)), None);
        assert_eq!(pawns.despawn(EntityId(7)), None);
        assert_eq!(pawns.live_count(), 2);
        assert_eq!(pawns.iter_living().collect::<Vec<_>>(), vec![0, 2]);
    }

    #[test]
    fn test_inventory_holds_one_resource() {
        let mut inv = Inventory::with_capacity(10);
        assert_eq!(inv.load(FOOD, 6), 6);
        assert_eq!(inv.load(WOOD, 3), 0);
        assert_eq!(inv.load(FOOD, 6), 4);
        assert_eq!(inv.unload(WOOD, 5), 0);
        assert_eq!(inv.unload(FOOD, 15), 10);
        assert!(inv.is_empty());
        assert_eq!(inv.resource, None);
        assert_eq!(inv.load(WOOD, 3), 3);
    }

    #[test]
    fn test_residents_counted_per_home() {
        let mut pawns = spawn_three();
        pawns.homes[0] = Some(EntityId(1));
        pawns.homes[2] = Some(EntityId(1));
        assert_eq!(pawns.residents_of(EntityId(1)), 2);
        pawns.despawn(EntityId(12));
        assert_eq!(pawns.residents_of(EntityId(1)), 1);
    }
}
