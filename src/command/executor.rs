//! Command execution - validated world edits issued between ticks
//!
//! Every command either applies completely or fails with a `CommandError`
//! and leaves the world untouched.

use crate::core::error::CommandError;
use crate::core::types::{EntityId, EntityKind, ObjectDefId, Rgb, TerrainId, TilePos};
use crate::ecs::world::World;
use crate::simulation::tick::{advance_ticks, SimulationEvent};
use crate::world::TileLayer;

/// A discrete edit of the world
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    PlacePawn {
        name: String,
        pos: TilePos,
    },
    PlaceBuilding {
        def: ObjectDefId,
        anchor: TilePos,
    },
    /// `None` clears the overlay layer
    PaintTerrain {
        pos: TilePos,
        layer: TileLayer,
        terrain: Option<TerrainId>,
    },
    /// Remove the pawn or building at a tile, else its overlay terrain
    DeleteAt {
        pos: TilePos,
    },
    /// Repaint the 4-connected region sharing the start tile's value on `layer`
    FloodFill {
        start: TilePos,
        layer: TileLayer,
        terrain: Option<TerrainId>,
    },
    SetColor {
        pos: TilePos,
        color: Option<Rgb>,
    },
    Advance {
        ticks: u64,
    },
}

/// What a successful command did
#[derive(Debug, Clone, PartialEq)]
pub enum CommandOutcome {
    Placed(EntityId),
    Painted { tiles: usize },
    Deleted { kind: EntityKind, id: EntityId },
    ClearedOverlay(TilePos),
    Recolored(TilePos),
    Advanced { events: Vec<SimulationEvent> },
}

/// Executes commands against a world
pub struct CommandExecutor;

impl CommandExecutor {
    pub fn execute(world: &mut World, command: Command) -> Result<CommandOutcome, CommandError> {
        let result = match command {
            Command::PlacePawn { name, pos } => world.spawn_pawn(name, pos).map(CommandOutcome::Placed),
            Command::PlaceBuilding { def, anchor } => {
                world.spawn_building(def, anchor).map(CommandOutcome::Placed)
            }
            Command::PaintTerrain {
                pos,
                layer,
                terrain,
            } => world
                .paint_terrain(pos, layer, terrain)
                .map(|()| CommandOutcome::Painted { tiles: 1 }),
            Command::DeleteAt { pos } => delete_at(world, pos),
            Command::FloodFill {
                start,
                layer,
                terrain,
            } => flood_fill(world, start, layer, terrain),
            Command::SetColor { pos, color } => {
                if world.tiles.set_color(pos, color) {
                    Ok(CommandOutcome::Recolored(pos))
                } else {
                    Err(CommandError::OutOfBounds(pos))
                }
            }
            Command::Advance { ticks } => Ok(CommandOutcome::Advanced {
                events: advance_ticks(world, ticks),
            }),
        };

        if let Err(err) = &result {
            tracing::warn!(tick = world.current_tick, %err, "Command rejected");
        }
        result
    }
}

fn delete_at(world: &mut World, pos: TilePos) -> Result<CommandOutcome, CommandError> {
    if !world.tiles.in_bounds(pos) {
        return Err(CommandError::OutOfBounds(pos));
    }
    match world.entity_at(pos) {
        Some((EntityKind::Pawn, id)) => {
            world.delete_pawn(id);
            Ok(CommandOutcome::Deleted {
                kind: EntityKind::Pawn,
                id,
            })
        }
        Some((EntityKind::Building, id)) => {
            world.delete_building(id);
            Ok(CommandOutcome::Deleted {
                kind: EntityKind::Building,
                id,
            })
        }
        None => {
            let has_overlay = world
                .tiles
                .get(pos)
                .map_or(false, |t| t.layer(TileLayer::Overlay).is_some());
            if !has_overlay {
                return Err(CommandError::NothingToDelete(pos));
            }
            world.paint_terrain(pos, TileLayer::Overlay, None)?;
            Ok(CommandOutcome::ClearedOverlay(pos))
        }
    }
}

fn flood_fill(
    world: &mut World,
    start: TilePos,
    layer: TileLayer,
    terrain: Option<TerrainId>,
) -> Result<CommandOutcome, CommandError> {
    if !world.tiles.in_bounds(start) {
        return Err(CommandError::OutOfBounds(start));
    }
    if terrain.is_none() && layer == TileLayer::Base {
        return Err(CommandError::CannotClearBase(start));
    }
    if let Some(t) = terrain {
        if world.registry().terrain(t).is_none() {
            return Err(CommandError::UnknownDefinition(format!("terrain {:?}", t)));
        }
    }
    let limit = world.config.max_flood_fill;
    let region = world
        .tiles
        .flood_region(start, layer, limit)
        .ok_or(CommandError::FillTooLarge { limit })?;

    // Validate the whole region before touching anything
    for &pos in &region {
        if let Some(occupant) = world.occupancy.pawn_at(pos) {
            if !world.would_be_walkable(pos, layer, terrain) {
                return Err(CommandError::Occupied { pos, occupant });
            }
        }
    }
    for &pos in &region {
        world.paint_terrain(pos, layer, terrain)?;
    }
    tracing::debug!(x = start.x, y = start.y, tiles = region.len(), "Flood fill");
    Ok(CommandOutcome::Painted {
        tiles: region.len(),
    })
}
