//! ECS World - owns every entity, component table, and per-instance resource
//!
//! Nothing here is process-wide: the content registry is a shared read-only
//! `Arc`, and the RNG, config, and level policy belong to this instance alone.

use std::sync::Arc;

use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

use crate::city::{BuildingArchetype, LevelPolicy, ThroughputLevelPolicy, Treasury};
use crate::content::ContentRegistry;
use crate::core::error::{CommandError, Result};
use crate::core::types::{EntityId, EntityKind, ObjectDefId, TerrainId, Tick, TilePos};
use crate::core::SimulationConfig;
use crate::entity::{Needs, PawnArchetype};
use crate::entity::pawn::Inventory;
use crate::world::{Occupancy, TileLayer, TileMap, UnreachableCache};

/// One independent simulation instance
#[derive(Debug)]
pub struct World {
    pub current_tick: Tick,
    pub config: SimulationConfig,
    registry: Arc<ContentRegistry>,
    pub tiles: TileMap,
    pub occupancy: Occupancy,
    pub pawns: PawnArchetype,
    pub buildings: BuildingArchetype,
    pub treasury: Treasury,
    pub unreachable: UnreachableCache,
    level_policy: Box<dyn LevelPolicy>,
    rng: ChaCha8Rng,
    seed: u64,
    next_entity_id: u32,
}

impl World {
    /// Empty map filled with the registry's default terrain
    pub fn new(
        config: SimulationConfig,
        registry: Arc<ContentRegistry>,
        width: u32,
        height: u32,
        seed: u64,
    ) -> Result<Self> {
        config.validate()?;
        let tiles = TileMap::new(width, height, registry.default_terrain());
        Ok(Self::from_parts(config, registry, tiles, seed))
    }

    pub(crate) fn from_parts(
        config: SimulationConfig,
        registry: Arc<ContentRegistry>,
        tiles: TileMap,
        seed: u64,
    ) -> Self {
        let level_policy = Box::new(ThroughputLevelPolicy::from_config(&config));
        Self {
            current_tick: 0,
            config,
            registry,
            tiles,
            occupancy: Occupancy::new(),
            pawns: PawnArchetype::new(),
            buildings: BuildingArchetype::new(),
            treasury: Treasury::new(),
            unreachable: UnreachableCache::new(),
            level_policy,
            rng: ChaCha8Rng::seed_from_u64(seed),
            seed,
            next_entity_id: 1,
        }
    }

    /// Replace the building level policy
    pub fn with_level_policy(mut self, policy: Box<dyn LevelPolicy>) -> Self {
        self.level_policy = policy;
        self
    }

    pub fn registry(&self) -> &Arc<ContentRegistry> {
        &self.registry
    }

    pub fn level_policy(&self) -> &dyn LevelPolicy {
        self.level_policy.as_ref()
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }

    pub fn rng_mut(&mut self) -> &mut ChaCha8Rng {
        &mut self.rng
    }

    /// Position in the RNG stream, saved so restores resume the same draws
    pub fn rng_word_pos(&self) -> u128 {
        self.rng.get_word_pos()
    }

    pub(crate) fn set_rng_word_pos(&mut self, word_pos: u128) {
        self.rng.set_word_pos(word_pos);
    }

    pub fn next_entity_id(&self) -> u32 {
        self.next_entity_id
    }

    pub(crate) fn set_next_entity_id(&mut self, next: u32) {
        self.next_entity_id = next;
    }

    fn allocate_id(&mut self) -> EntityId {
        let id = EntityId(self.next_entity_id);
        self.next_entity_id += 1;
        id
    }

    pub fn tick(&mut self) {
        self.current_tick += 1;
    }

    pub fn kind_of(&self, id: EntityId) -> Option<EntityKind> {
        if self.pawns.index_of(id).is_some() {
            Some(EntityKind::Pawn)
        } else if self.buildings.index_of(id).is_some() {
            Some(EntityKind::Building)
        } else {
            None
        }
    }

    /// Pawn or building covering `pos`; pawns win when both could apply
    pub fn entity_at(&self, pos: TilePos) -> Option<(EntityKind, EntityId)> {
        if let Some(id) = self.occupancy.pawn_at(pos) {
            return Some((EntityKind::Pawn, id));
        }
        self.occupancy
            .structure_at(pos)
            .map(|id| (EntityKind::Building, id))
    }

    pub fn entity_count(&self) -> usize {
        self.pawns.live_count() + self.buildings.live_count()
    }

    /// Sum of every gold balance plus the tax pool
    pub fn total_gold(&self) -> u128 {
        let pawns: u128 = self
            .pawns
            .iter_living()
            .map(|i| self.pawns.gold[i] as u128)
            .sum();
        let buildings: u128 = self
            .buildings
            .iter_living()
            .map(|i| self.buildings.gold[i] as u128)
            .sum();
        pawns + buildings + self.treasury.tax_pool as u128
    }

    // === PLACEMENT ===

    /// In bounds, walkable, and free of pawns and buildings
    pub fn check_standable(&self, pos: TilePos) -> std::result::Result<(), CommandError> {
        if !self.tiles.in_bounds(pos) {
            return Err(CommandError::OutOfBounds(pos));
        }
        if let Some((_, occupant)) = self.entity_at(pos) {
            return Err(CommandError::Occupied { pos, occupant });
        }
        if !self.tiles.is_terrain_walkable(pos, &self.registry) {
            return Err(CommandError::Blocked(pos));
        }
        Ok(())
    }

    /// Place a new pawn with fresh needs and starting gold
    pub fn spawn_pawn(
        &mut self,
        name: impl Into<String>,
        pos: TilePos,
    ) -> std::result::Result<EntityId, CommandError> {
        self.check_standable(pos)?;
        let id = self.allocate_id();
        let needs = Needs::from_registry(&self.registry);
        let index = self
            .pawns
            .spawn(id, name.into(), pos, needs, self.current_tick);
        self.pawns.gold[index] = self.config.starting_gold;
        self.pawns.inventories[index] = Inventory::with_capacity(self.config.inventory_capacity);
        self.treasury.inject(self.config.starting_gold);
        self.occupancy.place_pawn(id, pos);
        tracing::debug!(pawn = %id, x = pos.x, y = pos.y, "Pawn placed");
        Ok(id)
    }

    /// Place a building of `def` with its top-left corner at `anchor`
    pub fn spawn_building(
        &mut self,
        def: ObjectDefId,
        anchor: TilePos,
    ) -> std::result::Result<EntityId, CommandError> {
        let registry = Arc::clone(&self.registry);
        let object = registry
            .object(def)
            .ok_or_else(|| CommandError::UnknownDefinition(format!("object {:?}", def)))?;

        let footprint: Vec<TilePos> = object
            .footprint_offsets()
            .map(|(dx, dy)| anchor.offset(dx, dy))
            .collect();
        for &pos in &footprint {
            self.check_standable(pos)?;
        }

        let id = self.allocate_id();
        let index = self.buildings.spawn(id, object, anchor, self.current_tick);
        self.buildings.gold[index] = object.initial_gold;
        self.treasury.inject(object.initial_gold);
        self.occupancy.place_structure(id, &footprint);
        self.unreachable.clear();
        tracing::debug!(building = %id, def = %object.name, x = anchor.x, y = anchor.y, "Building placed");
        Ok(id)
    }

    // === REMOVAL ===

    /// Remove a pawn; its gold goes to the tax pool and its lock is released
    pub fn delete_pawn(&mut self, id: EntityId) -> bool {
        let Some(index) = self.pawns.index_of(id) else {
            return false;
        };
        self.occupancy.release_pawn(id);
        self.occupancy.remove_pawn(id, self.pawns.positions[index]);
        let gold = std::mem::take(&mut self.pawns.gold[index]);
        self.treasury.absorb(gold);
        self.pawns.despawn(id);
        self.buildings.forget_pawn(id);
        self.unreachable.forget(id);
        tracing::debug!(pawn = %id, gold, "Pawn deleted");
        true
    }

    /// Remove a building; every pawn planning around it re-decides next tick
    pub fn delete_building(&mut self, id: EntityId) -> bool {
        let Some(index) = self.buildings.index_of(id) else {
            return false;
        };
        self.occupancy.release_building(id);
        let footprint = self.buildings.footprint_tiles(index);
        self.occupancy.remove_structure(id, &footprint);
        let gold = std::mem::take(&mut self.buildings.gold[index]);
        self.treasury.absorb(gold);
        self.buildings.despawn(id);

        for p in self.pawns.iter_living().collect::<Vec<_>>() {
            if self.pawns.actions[p].references(id) {
                self.occupancy.release_pawn(self.pawns.ids[p]);
                self.pawns.actions[p].clear();
                self.pawns.inventories[p].clear();
            }
            if self.pawns.homes[p] == Some(id) {
                self.pawns.homes[p] = None;
            }
        }
        self.unreachable.clear();
        tracing::debug!(building = %id, gold, "Building deleted");
        true
    }

    // === TERRAIN ===

    /// Set one terrain layer of a tile
    ///
    /// Refused when it would leave a pawn standing on an unwalkable tile.
    pub fn paint_terrain(
        &mut self,
        pos: TilePos,
        layer: TileLayer,
        terrain: Option<TerrainId>,
    ) -> std::result::Result<(), CommandError> {
        if !self.tiles.in_bounds(pos) {
            return Err(CommandError::OutOfBounds(pos));
        }
        if let Some(t) = terrain {
            if self.registry.terrain(t).is_none() {
                return Err(CommandError::UnknownDefinition(format!("terrain {:?}", t)));
            }
        } else if layer == TileLayer::Base {
            return Err(CommandError::CannotClearBase(pos));
        }
        if let Some(occupant) = self.occupancy.pawn_at(pos) {
            if !self.would_be_walkable(pos, layer, terrain) {
                return Err(CommandError::Occupied { pos, occupant });
            }
        }
        self.tiles.set_terrain(pos, layer, terrain);
        self.unreachable.clear();
        Ok(())
    }

    /// Whether a tile stays walkable after replacing one layer
    pub(crate) fn would_be_walkable(
        &self,
        pos: TilePos,
        layer: TileLayer,
        terrain: Option<TerrainId>,
    ) -> bool {
        let Some(tile) = self.tiles.get(pos) else {
            return false;
        };
        let mut edited = *tile;
        match (layer, terrain) {
            (TileLayer::Base, Some(t)) => edited.base = t,
            (TileLayer::Base, None) => {}
            (TileLayer::Overlay, t) => edited.overlay = t,
        }
        edited.terrains().all(|id| {
            self.registry
                .terrain(id)
                .map_or(false, |def| def.walkable)
        })
    }

    /// Re-evaluate every building's level with the current policy
    ///
    /// Returns (building, new level) for each building that levelled up.
    pub fn apply_level_policy(&mut self) -> Vec<(EntityId, u32)> {
        let mut changed = Vec::new();
        for i in self.buildings.iter_living().collect::<Vec<_>>() {
            let current = self.buildings.levels[i];
            let next = self
                .level_policy
                .level_for(self.buildings.throughput[i], current)
                .max(current);
            if next != current {
                self.buildings.levels[i] = next;
                changed.push((self.buildings.ids[i], next));
            }
        }
        changed
    }
}
