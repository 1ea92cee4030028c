//! Plain-data export and validated import of a whole world
//!
//! An export captures everything that influences future ticks: tiles, live
//! entities with all components, locks, the treasury, the unreachable cache,
//! the clock, and the RNG stream position. Importing it into the same content
//! registry resumes ticking bit-identically.
//!
//! Import never partially succeeds: any inconsistency is reported as
//! `SimError::Restore` and no world is produced.

use std::collections::BTreeSet;
use std::path::Path;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::city::{ResourceStore, SavedLevelPolicy, Treasury};
use crate::content::ContentRegistry;
use crate::core::error::{Result, SimError};
use crate::core::types::{EntityId, ObjectDefId, Tick, TilePos};
use crate::core::SimulationConfig;
use crate::ecs::world::World;
use crate::entity::{ActionState, BuffSet, Inventory, Needs};
use crate::simulation::invariants::check_invariants;
use crate::world::{LockResult, Tile, TileMap};

/// Current save format version
pub const SAVE_VERSION: u32 = 2;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PawnRecord {
    pub id: EntityId,
    pub name: String,
    pub born_at: Tick,
    pub position: TilePos,
    pub needs: Needs,
    pub buffs: BuffSet,
    pub mood: f32,
    pub action: ActionState,
    pub gold: u64,
    pub inventory: Inventory,
    pub home: Option<EntityId>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BuildingRecord {
    pub id: EntityId,
    pub def: ObjectDefId,
    pub anchor: TilePos,
    pub level: u32,
    pub gold: u64,
    pub store: Option<ResourceStore>,
    /// (pawn, affinity) in ascending pawn order
    pub attachment: Vec<(EntityId, f32)>,
    pub throughput: u64,
    /// (pawn, decaying use count) in ascending pawn order
    pub recent_uses: Vec<(EntityId, f32)>,
    pub built_at: Tick,
    pub last_spawn: Tick,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SaveState {
    pub version: u32,
    pub content_fingerprint: u64,
    pub seed: u64,
    pub rng_word_pos: u128,
    pub tick: Tick,
    pub next_entity_id: u32,
    pub config: SimulationConfig,
    pub width: u32,
    pub height: u32,
    pub tiles: Vec<Tile>,
    pub pawns: Vec<PawnRecord>,
    pub buildings: Vec<BuildingRecord>,
    /// (building, holder)
    pub locks: Vec<(EntityId, EntityId)>,
    pub treasury: Treasury,
    /// `None` for custom policies; the import then uses the config default
    pub level_policy: Option<SavedLevelPolicy>,
    /// (pawn, target, expires at)
    pub unreachable: Vec<(EntityId, EntityId, Tick)>,
}

fn restore_err(msg: impl Into<String>) -> SimError {
    SimError::Restore(msg.into())
}

impl SaveState {
    /// Copy the world's state into plain data
    pub fn export(world: &World) -> Self {
        let pawns = world
            .pawns
            .iter_living()
            .map(|p| PawnRecord {
                id: world.pawns.ids[p],
                name: world.pawns.names[p].clone(),
                born_at: world.pawns.born_at[p],
                position: world.pawns.positions[p],
                needs: world.pawns.needs[p].clone(),
                buffs: world.pawns.buffs[p].clone(),
                mood: world.pawns.moods[p],
                action: world.pawns.actions[p].clone(),
                gold: world.pawns.gold[p],
                inventory: world.pawns.inventories[p],
                home: world.pawns.homes[p],
            })
            .collect();

        let buildings = world
            .buildings
            .iter_living()
            .map(|b| BuildingRecord {
                id: world.buildings.ids[b],
                def: world.buildings.def_ids[b],
                anchor: world.buildings.anchors[b],
                level: world.buildings.levels[b],
                gold: world.buildings.gold[b],
                store: world.buildings.stores[b],
                attachment: world.buildings.attachment[b]
                    .iter()
                    .map(|(&pawn, &value)| (pawn, value))
                    .collect(),
                throughput: world.buildings.throughput[b],
                recent_uses: world.buildings.recent_uses[b]
                    .iter()
                    .map(|(&pawn, &uses)| (pawn, uses))
                    .collect(),
                built_at: world.buildings.built_at[b],
                last_spawn: world.buildings.last_spawn[b],
            })
            .collect();

        tracing::debug!(tick = world.current_tick, "World exported");
        Self {
            version: SAVE_VERSION,
            content_fingerprint: world.registry().fingerprint(),
            seed: world.seed(),
            rng_word_pos: world.rng_word_pos(),
            tick: world.current_tick,
            next_entity_id: world.next_entity_id(),
            config: world.config.clone(),
            width: world.tiles.width(),
            height: world.tiles.height(),
            tiles: world.tiles.tiles().to_vec(),
            pawns,
            buildings,
            locks: world.occupancy.locks().collect(),
            treasury: world.treasury,
            level_policy: world.level_policy().saved_form(),
            unreachable: world.unreachable.iter().collect(),
        }
    }

    /// Rebuild a world against `registry`
    pub fn import(&self, registry: Arc<ContentRegistry>) -> Result<World> {
        if self.version != SAVE_VERSION {
            return Err(restore_err(format!(
                "unsupported save version {} (expected {SAVE_VERSION})",
                self.version
            )));
        }
        if self.content_fingerprint != registry.fingerprint() {
            return Err(restore_err("save was made with different content definitions"));
        }
        self.config.validate()?;

        for tile in &self.tiles {
            for terrain in tile.terrains() {
                if registry.terrain(terrain).is_none() {
                    return Err(restore_err(format!("unknown terrain {:?}", terrain)));
                }
            }
        }
        let tiles = TileMap::from_tiles(self.width, self.height, self.tiles.clone()).ok_or_else(|| {
            restore_err(format!(
                "{} tiles do not fill a {}x{} map",
                self.tiles.len(),
                self.width,
                self.height
            ))
        })?;

        self.check_ids()?;

        let mut world = World::from_parts(self.config.clone(), Arc::clone(&registry), tiles, self.seed);
        world.current_tick = self.tick;
        world.set_rng_word_pos(self.rng_word_pos);
        world.set_next_entity_id(self.next_entity_id);
        world.treasury = self.treasury;
        if let Some(policy) = self.level_policy {
            world = world.with_level_policy(policy.into_policy());
        }

        for record in &self.buildings {
            restore_building(&mut world, &registry, record)?;
        }
        for record in &self.pawns {
            restore_pawn(&mut world, record)?;
        }
        for &(building, pawn) in &self.locks {
            if world.buildings.index_of(building).is_none() || world.pawns.index_of(pawn).is_none() {
                return Err(restore_err(format!("lock {building} -> {pawn} names a missing entity")));
            }
            if world.occupancy.held_by(pawn).is_some()
                || world.occupancy.try_lock(building, pawn) != LockResult::Acquired
            {
                return Err(restore_err(format!("lock {building} -> {pawn} conflicts")));
            }
        }
        for &(pawn, target, until) in &self.unreachable {
            world.unreachable.mark(pawn, target, until);
        }

        if let Some(violation) = check_invariants(&world).into_iter().next() {
            return Err(restore_err(violation.to_string()));
        }

        tracing::info!(
            tick = world.current_tick,
            pawns = world.pawns.live_count(),
            buildings = world.buildings.live_count(),
            "World restored"
        );
        Ok(world)
    }

    /// Ids must be unique, ascending per table, and below the id counter
    fn check_ids(&self) -> Result<()> {
        let mut seen = BTreeSet::new();
        let pawn_ids = self.pawns.iter().map(|p| p.id);
        let building_ids = self.buildings.iter().map(|b| b.id);
        for id in pawn_ids.chain(building_ids) {
            if id.0 >= self.next_entity_id {
                return Err(restore_err(format!("entity {id} is beyond the id counter")));
            }
            if !seen.insert(id) {
                return Err(restore_err(format!("duplicate entity id {id}")));
            }
        }
        let ascending = |ids: Vec<EntityId>| ids.windows(2).all(|w| w[0] < w[1]);
        if !ascending(self.pawns.iter().map(|p| p.id).collect())
            || !ascending(self.buildings.iter().map(|b| b.id).collect())
        {
            return Err(restore_err("entity records are not in ascending id order"));
        }
        Ok(())
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn write_to(&self, path: &Path) -> Result<()> {
        std::fs::write(path, self.to_json()?)?;
        Ok(())
    }

    pub fn read_from(path: &Path) -> Result<Self> {
        Self::from_json(&std::fs::read_to_string(path)?)
    }
}

fn restore_building(world: &mut World, registry: &ContentRegistry, record: &BuildingRecord) -> Result<()> {
    let def = registry
        .object(record.def)
        .ok_or_else(|| restore_err(format!("building {} has unknown definition", record.id)))?;
    let footprint: Vec<TilePos> = def
        .footprint_offsets()
        .map(|(dx, dy)| record.anchor.offset(dx, dy))
        .collect();
    if footprint.iter().any(|&pos| !world.tiles.in_bounds(pos)) {
        return Err(restore_err(format!("building {} lies outside the map", record.id)));
    }
    if !world.occupancy.place_structure(record.id, &footprint) {
        return Err(restore_err(format!("building {} overlaps another", record.id)));
    }
    if let Some(store) = &record.store {
        if def.store.as_ref().map(|s| s.resource) != Some(store.resource) {
            return Err(restore_err(format!("building {} has a foreign store", record.id)));
        }
    }

    let b = world.buildings.spawn(record.id, def, record.anchor, record.built_at);
    world.buildings.levels[b] = record.level;
    world.buildings.gold[b] = record.gold;
    world.buildings.stores[b] = record.store;
    world.buildings.attachment[b] = record.attachment.iter().copied().collect();
    world.buildings.throughput[b] = record.throughput;
    world.buildings.recent_uses[b] = record.recent_uses.iter().copied().collect();
    world.buildings.last_spawn[b] = record.last_spawn;
    Ok(())
}

fn restore_pawn(world: &mut World, record: &PawnRecord) -> Result<()> {
    let pos = record.position;
    if !world.tiles.in_bounds(pos) {
        return Err(restore_err(format!("pawn {} lies outside the map", record.id)));
    }
    if !world.occupancy.place_pawn(record.id, pos) {
        return Err(restore_err(format!("pawn {} shares tile {pos:?}", record.id)));
    }

    let p = world
        .pawns
        .spawn(record.id, record.name.clone(), pos, record.needs.clone(), record.born_at);
    world.pawns.buffs[p] = record.buffs.clone();
    world.pawns.moods[p] = record.mood;
    world.pawns.actions[p] = record.action.clone();
    world.pawns.gold[p] = record.gold;
    world.pawns.inventories[p] = record.inventory;
    world.pawns.homes[p] = record.home;
    Ok(())
}
