use thiserror::Error;

use crate::core::types::{EntityId, TilePos};

#[derive(Error, Debug)]
pub enum SimError {
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Invalid content definition: {0}")]
    InvalidContent(String),

    #[error("Command rejected: {0}")]
    Command(#[from] CommandError),

    #[error("Restore failed: {0}")]
    Restore(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerdeError(#[from] serde_json::Error),

    #[error("Config parse error: {0}")]
    TomlError(#[from] toml::de::Error),
}

pub type Result<T> = std::result::Result<T, SimError>;

/// Why a world-editing command was refused; the world is left unchanged
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CommandError {
    #[error("Tile out of bounds: {0:?}")]
    OutOfBounds(TilePos),

    #[error("Tile already occupied by {occupant}: {pos:?}")]
    Occupied { pos: TilePos, occupant: EntityId },

    #[error("Tile is not walkable: {0:?}")]
    Blocked(TilePos),

    #[error("Unknown definition: {0}")]
    UnknownDefinition(String),

    #[error("Nothing to delete at {0:?}")]
    NothingToDelete(TilePos),

    #[error("Flood fill region exceeds {limit} tiles")]
    FillTooLarge { limit: usize },

    #[error("Base terrain cannot be cleared: {0:?}")]
    CannotClearBase(TilePos),

    #[error("Malformed command: {0}")]
    Malformed(String),
}
