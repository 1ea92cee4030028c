//! Command resolution - turns text command lines into `Command`s
//!
//! Definition names resolve through the content registry, so scripts can say
//! `build tavern 10 4` instead of numeric ids. One command per line; blank
//! lines and `#` comments are skipped.
//!
//! ```text
//! pawn <name> <x> <y>
//! build <object> <x> <y>
//! paint <base|overlay> <terrain|none> <x> <y>
//! fill <base|overlay> <terrain|none> <x> <y>
//! delete <x> <y>
//! color <x> <y> <r> <g> <b> | color <x> <y> none
//! advance <ticks>
//! ```

use crate::command::executor::Command;
use crate::content::ContentRegistry;
use crate::core::error::CommandError;
use crate::core::types::{Rgb, TerrainId, TilePos};
use crate::world::TileLayer;

/// Resolves command text against one registry
pub struct CommandResolver<'a> {
    registry: &'a ContentRegistry,
}

impl<'a> CommandResolver<'a> {
    pub fn new(registry: &'a ContentRegistry) -> Self {
        Self { registry }
    }

    /// Parse a whole script; the first bad line aborts with its line number
    pub fn resolve_script(&self, script: &str) -> Result<Vec<Command>, CommandError> {
        let mut commands = Vec::new();
        for (n, line) in script.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let command = self.resolve_line(line).map_err(|e| match e {
                CommandError::Malformed(msg) => CommandError::Malformed(format!("line {}: {}", n + 1, msg)),
                other => other,
            })?;
            commands.push(command);
        }
        Ok(commands)
    }

    pub fn resolve_line(&self, line: &str) -> Result<Command, CommandError> {
        let words: Vec<&str> = line.split_whitespace().collect();
        let Some((&verb, args)) = words.split_first() else {
            return Err(CommandError::Malformed("empty command".into()));
        };

        match (verb.to_lowercase().as_str(), args) {
            ("pawn", [name, x, y]) => Ok(Command::PlacePawn {
                name: (*name).to_string(),
                pos: parse_pos(x, y)?,
            }),
            ("build", [object, x, y]) => {
                let def = self
                    .registry
                    .find_object(object)
                    .ok_or_else(|| CommandError::UnknownDefinition((*object).to_string()))?;
                Ok(Command::PlaceBuilding {
                    def: def.id,
                    anchor: parse_pos(x, y)?,
                })
            }
            ("paint", [layer, terrain, x, y]) => Ok(Command::PaintTerrain {
                pos: parse_pos(x, y)?,
                layer: parse_layer(layer)?,
                terrain: self.parse_terrain(terrain)?,
            }),
            ("fill", [layer, terrain, x, y]) => Ok(Command::FloodFill {
                start: parse_pos(x, y)?,
                layer: parse_layer(layer)?,
                terrain: self.parse_terrain(terrain)?,
            }),
            ("delete", [x, y]) => Ok(Command::DeleteAt {
                pos: parse_pos(x, y)?,
            }),
            ("color", [x, y, none]) if none.eq_ignore_ascii_case("none") => Ok(Command::SetColor {
                pos: parse_pos(x, y)?,
                color: None,
            }),
            ("color", [x, y, r, g, b]) => Ok(Command::SetColor {
                pos: parse_pos(x, y)?,
                color: Some(Rgb(parse_num(r)?, parse_num(g)?, parse_num(b)?)),
            }),
            ("advance", [ticks]) => Ok(Command::Advance {
                ticks: parse_num(ticks)?,
            }),
            _ => Err(CommandError::Malformed(line.to_string())),
        }
    }

    fn parse_terrain(&self, word: &str) -> Result<Option<TerrainId>, CommandError> {
        if word.eq_ignore_ascii_case("none") {
            return Ok(None);
        }
        self.registry
            .find_terrain(word)
            .map(|t| Some(t.id))
            .ok_or_else(|| CommandError::UnknownDefinition(word.to_string()))
    }
}

fn parse_num<T: std::str::FromStr>(word: &str) -> Result<T, CommandError> {
    word.parse()
        .map_err(|_| CommandError::Malformed(format!("not a number: {word}")))
}

fn parse_pos(x: &str, y: &str) -> Result<TilePos, CommandError> {
    Ok(TilePos::new(parse_num(x)?, parse_num(y)?))
}

fn parse_layer(word: &str) -> Result<TileLayer, CommandError> {
    match word.to_lowercase().as_str() {
        "base" => Ok(TileLayer::Base),
        "overlay" => Ok(TileLayer::Overlay),
        _ => Err(CommandError::Malformed(format!("unknown layer: {word}"))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::content::standard::{TAVERN, WATER};

    #[test]
    fn test_resolves_names() {
        let registry = ContentRegistry::standard().unwrap();
        let resolver = CommandResolver::new(&registry);
        assert_eq!(
            resolver.resolve_line("build tavern 3 4").unwrap(),
            Command::PlaceBuilding {
                def: TAVERN,
                anchor: TilePos::new(3, 4)
            }
        );
        assert_eq!(
            resolver.resolve_line("paint overlay water 1 2").unwrap(),
            Command::PaintTerrain {
                pos: TilePos::new(1, 2),
                layer: TileLayer::Overlay,
                terrain: Some(WATER)
            }
        );
        assert_eq!(
            resolver.resolve_line("fill overlay none 0 0").unwrap(),
            Command::FloodFill {
                start: TilePos::new(0, 0),
                layer: TileLayer::Overlay,
                terrain: None
            }
        );
    }

    #[test]
    fn test_unknown_names_and_bad_lines() {
        let registry = ContentRegistry::standard().unwrap();
        let resolver = CommandResolver::new(&registry);
        assert_eq!(
            resolver.resolve_line("build castle 0 0"),
            Err(CommandError::UnknownDefinition("castle".into()))
        );
        assert!(matches!(
            resolver.resolve_line("advance soon"),
            Err(CommandError::Malformed(_))
        ));
    }

    #[test]
    fn test_script_skips_comments_and_reports_line() {
        let registry = ContentRegistry::standard().unwrap();
        let resolver = CommandResolver::new(&registry);
        let commands = resolver
            .resolve_script("# setup\npawn bob 1 1\n\nadvance 10\n")
            .unwrap();
        assert_eq!(commands.len(), 2);

        let err = resolver.resolve_script("pawn bob 1 1\njump 2").unwrap_err();
        assert_eq!(err, CommandError::Malformed("line 2: jump 2".into()));
    }
}
