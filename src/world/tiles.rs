//! Tile storage: base terrain, optional overlay terrain, optional color override
//!
//! Walkability is decided identically for both layers: a tile is passable only
//! when every terrain present on it is walkable. Which layer a terrain was
//! painted on never changes whether it blocks.

use std::collections::VecDeque;

use serde::{Deserialize, Serialize};

use crate::content::ContentRegistry;
use crate::core::types::{Rgb, TerrainId, TilePos};

/// Which terrain slot of a tile an edit targets
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TileLayer {
    Base,
    Overlay,
}

/// A single grid cell
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tile {
    pub base: TerrainId,
    pub overlay: Option<TerrainId>,
    /// Painted color; falls back to the terrain color when absent
    pub color: Option<Rgb>,
}

impl Tile {
    pub fn new(base: TerrainId) -> Self {
        Self {
            base,
            overlay: None,
            color: None,
        }
    }

    pub fn layer(&self, layer: TileLayer) -> Option<TerrainId> {
        match layer {
            TileLayer::Base => Some(self.base),
            TileLayer::Overlay => self.overlay,
        }
    }

    /// Terrains present on this tile, base first
    pub fn terrains(&self) -> impl Iterator<Item = TerrainId> {
        std::iter::once(self.base).chain(self.overlay)
    }
}

/// Dense row-major tile grid
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TileMap {
    width: u32,
    height: u32,
    tiles: Vec<Tile>,
}

impl TileMap {
    /// Create a map filled with one base terrain
    pub fn new(width: u32, height: u32, fill: TerrainId) -> Self {
        Self {
            width,
            height,
            tiles: vec![Tile::new(fill); (width as usize) * (height as usize)],
        }
    }

    /// Rebuild a map from stored rows; `None` if the length does not match
    pub fn from_tiles(width: u32, height: u32, tiles: Vec<Tile>) -> Option<Self> {
        if tiles.len() != (width as usize) * (height as usize) {
            return None;
        }
        Some(Self {
            width,
            height,
            tiles,
        })
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    #[inline]
    pub fn in_bounds(&self, pos: TilePos) -> bool {
        pos.x >= 0 && pos.y >= 0 && (pos.x as u32) < self.width && (pos.y as u32) < self.height
    }

    #[inline]
    fn index(&self, pos: TilePos) -> Option<usize> {
        if self.in_bounds(pos) {
            Some(pos.y as usize * self.width as usize + pos.x as usize)
        } else {
            None
        }
    }

    /// Row-major index of a tile, used for dense per-tile scratch buffers
    #[inline]
    pub fn dense_index(&self, pos: TilePos) -> Option<usize> {
        self.index(pos)
    }

    pub fn len(&self) -> usize {
        self.tiles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tiles.is_empty()
    }

    pub fn get(&self, pos: TilePos) -> Option<&Tile> {
        self.index(pos).map(|i| &self.tiles[i])
    }

    /// Set one layer of a tile. Clearing the base layer is not possible;
    /// returns false when out of bounds or when asked to clear the base.
    pub fn set_terrain(&mut self, pos: TilePos, layer: TileLayer, terrain: Option<TerrainId>) -> bool {
        let Some(i) = self.index(pos) else {
            return false;
        };
        match (layer, terrain) {
            (TileLayer::Base, Some(t)) => self.tiles[i].base = t,
            (TileLayer::Base, None) => return false,
            (TileLayer::Overlay, t) => self.tiles[i].overlay = t,
        }
        true
    }

    pub fn set_color(&mut self, pos: TilePos, color: Option<Rgb>) -> bool {
        let Some(i) = self.index(pos) else {
            return false;
        };
        self.tiles[i].color = color;
        true
    }

    /// Terrain-only entry cost; `None` means impassable (or out of bounds)
    pub fn terrain_cost(&self, pos: TilePos, registry: &ContentRegistry) -> Option<f32> {
        let tile = self.get(pos)?;
        let mut cost: f32 = 1.0;
        for id in tile.terrains() {
            let def = registry.terrain(id)?;
            if !def.walkable {
                return None;
            }
            cost = cost.max(def.move_cost);
        }
        Some(cost)
    }

    pub fn is_terrain_walkable(&self, pos: TilePos, registry: &ContentRegistry) -> bool {
        self.terrain_cost(pos, registry).is_some()
    }

    /// Whether either layer of the tile holds `terrain`
    pub fn has_terrain(&self, pos: TilePos, terrain: TerrainId) -> bool {
        self.get(pos)
            .map(|t| t.terrains().any(|id| id == terrain))
            .unwrap_or(false)
    }

    /// Color shown for a tile: painted color, else overlay, else base terrain
    pub fn display_color(&self, pos: TilePos, registry: &ContentRegistry) -> Option<Rgb> {
        let tile = self.get(pos)?;
        if let Some(color) = tile.color {
            return Some(color);
        }
        let top = tile.overlay.unwrap_or(tile.base);
        registry.terrain(top).map(|t| t.color)
    }

    /// All tiles with their coordinates in row-major order
    pub fn iter(&self) -> impl Iterator<Item = (TilePos, &Tile)> + '_ {
        let width = self.width as usize;
        self.tiles
            .iter()
            .enumerate()
            .map(move |(i, t)| (TilePos::new((i % width) as i32, (i / width) as i32), t))
    }

    pub fn tiles(&self) -> &[Tile] {
        &self.tiles
    }

    /// Number of distinct terrain ids present anywhere on the map
    pub fn distinct_terrain_count(&self) -> usize {
        let mut seen: Vec<TerrainId> = Vec::new();
        for tile in &self.tiles {
            for id in tile.terrains() {
                if !seen.contains(&id) {
                    seen.push(id);
                }
            }
        }
        seen.len()
    }

    /// Distinct terrain ids within a square of `radius` around `center`
    pub fn local_diversity(&self, center: TilePos, radius: i32) -> usize {
        let mut seen: Vec<TerrainId> = Vec::new();
        for dy in -radius..=radius {
            for dx in -radius..=radius {
                if let Some(tile) = self.get(center.offset(dx, dy)) {
                    for id in tile.terrains() {
                        if !seen.contains(&id) {
                            seen.push(id);
                        }
                    }
                }
            }
        }
        seen.len()
    }

    /// 4-connected region sharing the start tile's value on `layer`
    ///
    /// Returns `None` when the region would exceed `limit` tiles.
    pub fn flood_region(&self, start: TilePos, layer: TileLayer, limit: usize) -> Option<Vec<TilePos>> {
        let target = self.get(start)?.layer(layer);
        let mut visited = vec![false; self.tiles.len()];
        let mut queue = VecDeque::new();
        let mut region = Vec::new();

        visited[self.index(start)?] = true;
        queue.push_back(start);

        while let Some(pos) = queue.pop_front() {
            region.push(pos);
            if region.len() > limit {
                return None;
            }
            for next in pos.neighbors() {
                let Some(i) = self.index(next) else {
                    continue;
                };
                if !visited[i] && self.tiles[i].layer(layer) == target {
                    visited[i] = true;
                    queue.push_back(next);
                }
            }
        }

        Some(region)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::content::standard::{FLOWERS, GRASS, ROCK, SAND, WATER};

    #[test]
    fn test_bounds() {
        let map = TileMap::new(4, 3, GRASS);
        assert!(map.in_bounds(TilePos::new(3, 2)));
        assert!(!map.in_bounds(TilePos::new(4, 0)));
        assert!(!map.in_bounds(TilePos::new(0, -1)));
        assert_eq!(map.len(), 12);
    }

    #[test]
    fn test_overlay_blocks_like_base() {
        let registry = ContentRegistry::standard().unwrap();
        let mut map = TileMap::new(4, 4, GRASS);
        let a = TilePos::new(1, 1);
        let b = TilePos::new(2, 2);

        map.set_terrain(a, TileLayer::Base, Some(WATER));
        map.set_terrain(b, TileLayer::Overlay, Some(WATER));

        assert!(!map.is_terrain_walkable(a, &registry));
        assert!(!map.is_terrain_walkable(b, &registry));
        assert!(map.is_terrain_walkable(TilePos::new(0, 0), &registry));
    }

    #[test]
    fn test_cost_takes_the_slower_layer() {
        let registry = ContentRegistry::standard().unwrap();
        let mut map = TileMap::new(2, 1, GRASS);
        let pos = TilePos::new(0, 0);
        map.set_terrain(pos, TileLayer::Overlay, Some(SAND));
        assert_eq!(map.terrain_cost(pos, &registry), Some(1.5));
        map.set_terrain(pos, TileLayer::Overlay, None);
        assert_eq!(map.terrain_cost(pos, &registry), Some(1.0));
    }

    #[test]
    fn test_cannot_clear_base() {
        let mut map = TileMap::new(2, 2, GRASS);
        assert!(!map.set_terrain(TilePos::new(0, 0), TileLayer::Base, None));
        assert!(!map.set_terrain(TilePos::new(5, 5), TileLayer::Overlay, Some(ROCK)));
    }

    #[test]
    fn test_display_color_precedence() {
        let registry = ContentRegistry::standard().unwrap();
        let mut map = TileMap::new(1, 1, GRASS);
        let pos = TilePos::new(0, 0);
        let grass_color = registry.terrain(GRASS).unwrap().color;
        assert_eq!(map.display_color(pos, &registry), Some(grass_color));

        map.set_terrain(pos, TileLayer::Overlay, Some(FLOWERS));
        let flower_color = registry.terrain(FLOWERS).unwrap().color;
        assert_eq!(map.display_color(pos, &registry), Some(flower_color));

        map.set_color(pos, Some(Rgb(1, 2, 3)));
        assert_eq!(map.display_color(pos, &registry), Some(Rgb(1, 2, 3)));
    }

    #[test]
    fn test_flood_region_stops_at_boundaries() {
        let mut map = TileMap::new(5, 5, GRASS);
        for y in 0..5 {
            map.set_terrain(TilePos::new(2, y), TileLayer::Base, Some(ROCK));
        }
        let region = map
            .flood_region(TilePos::new(0, 0), TileLayer::Base, 100)
            .unwrap();
        assert_eq!(region.len(), 10);
        assert!(region.iter().all(|p| p.x < 2));

        assert!(map
            .flood_region(TilePos::new(0, 0), TileLayer::Base, 5)
            .is_none());
    }

    #[test]
    fn test_diversity_counts_both_layers() {
        let mut map = TileMap::new(5, 5, GRASS);
        assert_eq!(map.local_diversity(TilePos::new(2, 2), 1), 1);
        map.set_terrain(TilePos::new(1, 1), TileLayer::Overlay, Some(FLOWERS));
        map.set_terrain(TilePos::new(3, 3), TileLayer::Base, Some(SAND));
        assert_eq!(map.local_diversity(TilePos::new(2, 2), 1), 3);
        assert_eq!(map.distinct_terrain_count(), 3);
    }
}
