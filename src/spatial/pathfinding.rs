//! A* pathfinding over the tile grid
//!
//! 4-directional movement with a Manhattan heuristic. Every walkable tile
//! costs at least 1.0 to enter, so the heuristic never overestimates and the
//! first goal popped is optimal. Building footprints and any unwalkable
//! terrain (base or overlay) are impassable; tiles holding other pawns stay
//! passable at an extra cost.

use std::cmp::Ordering;
use std::collections::BinaryHeap;

use ordered_float::OrderedFloat;

use crate::content::ContentRegistry;
use crate::core::types::{EntityId, TilePos};
use crate::world::{Occupancy, TileMap};

/// Read-only view of everything that affects movement cost
#[derive(Debug, Clone, Copy)]
pub struct NavGrid<'a> {
    pub tiles: &'a TileMap,
    pub registry: &'a ContentRegistry,
    pub occupancy: &'a Occupancy,
    /// The pawn searching; its own tile never counts as crowded
    pub mover: Option<EntityId>,
    pub crowd_penalty: f32,
}

impl<'a> NavGrid<'a> {
    pub fn new(
        tiles: &'a TileMap,
        registry: &'a ContentRegistry,
        occupancy: &'a Occupancy,
    ) -> Self {
        Self {
            tiles,
            registry,
            occupancy,
            mover: None,
            crowd_penalty: 0.0,
        }
    }

    pub fn for_mover(mut self, mover: EntityId, crowd_penalty: f32) -> Self {
        self.mover = Some(mover);
        self.crowd_penalty = crowd_penalty;
        self
    }

    /// Walkable terrain and no building footprint
    pub fn is_standable(&self, pos: TilePos) -> bool {
        self.occupancy.structure_at(pos).is_none()
            && self.tiles.is_terrain_walkable(pos, self.registry)
    }

    /// Standable and not held by another pawn
    pub fn is_free_for_mover(&self, pos: TilePos) -> bool {
        self.is_standable(pos)
            && match self.occupancy.pawn_at(pos) {
                Some(other) => Some(other) == self.mover,
                None => true,
            }
    }

    /// Cost of stepping onto `pos`; `None` when impassable
    pub fn step_cost(&self, pos: TilePos) -> Option<f32> {
        if self.occupancy.structure_at(pos).is_some() {
            return None;
        }
        let mut cost = self.tiles.terrain_cost(pos, self.registry)?;
        if let Some(other) = self.occupancy.pawn_at(pos) {
            if Some(other) != self.mover {
                cost += self.crowd_penalty;
            }
        }
        Some(cost)
    }
}

/// A found route
#[derive(Debug, Clone, PartialEq)]
pub struct Path {
    /// Tiles to step onto in order; excludes the start tile
    pub steps: Vec<TilePos>,
    /// Sum of entry costs along `steps`
    pub cost: f32,
    /// Goal tile the path ends at
    pub goal: TilePos,
}

impl Path {
    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }
}

/// Node in the A* open set
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct PathNode {
    pos: TilePos,
    f_cost: OrderedFloat<f32>,
    g_cost: OrderedFloat<f32>,
}

impl Ord for PathNode {
    fn cmp(&self, other: &Self) -> Ordering {
        // Reverse order for min-heap; deeper nodes first on equal f, then
        // lowest position so pops never depend on insertion order
        other
            .f_cost
            .cmp(&self.f_cost)
            .then_with(|| self.g_cost.cmp(&other.g_cost))
            .then_with(|| other.pos.cmp(&self.pos))
    }
}

impl PartialOrd for PathNode {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

fn heuristic(pos: TilePos, goals: &[TilePos]) -> f32 {
    goals
        .iter()
        .map(|g| pos.manhattan(g))
        .min()
        .unwrap_or(0) as f32
}

/// Cheapest path from `start` to any of `goals`
///
/// Goals that cannot be stood on are ignored. Returns `None` when no goal is
/// reachable or the search expands more than `max_nodes` tiles; a partial
/// path is never returned.
pub fn find_path(
    nav: &NavGrid<'_>,
    start: TilePos,
    goals: &[TilePos],
    max_nodes: usize,
) -> Option<Path> {
    let goals: Vec<TilePos> = goals
        .iter()
        .copied()
        .filter(|&g| nav.tiles.in_bounds(g) && nav.is_standable(g))
        .collect();
    if goals.is_empty() {
        return None;
    }
    if goals.contains(&start) {
        return Some(Path {
            steps: Vec::new(),
            cost: 0.0,
            goal: start,
        });
    }
    let start_index = nav.tiles.dense_index(start)?;

    let size = nav.tiles.len();
    let mut g_scores = vec![f32::INFINITY; size];
    let mut came_from: Vec<Option<usize>> = vec![None; size];
    let mut closed = vec![false; size];
    let mut open_set = BinaryHeap::new();
    let mut expanded = 0usize;

    g_scores[start_index] = 0.0;
    open_set.push(PathNode {
        pos: start,
        f_cost: OrderedFloat(heuristic(start, &goals)),
        g_cost: OrderedFloat(0.0),
    });

    while let Some(current) = open_set.pop() {
        let Some(current_index) = nav.tiles.dense_index(current.pos) else {
            continue;
        };
        if closed[current_index] {
            continue;
        }
        closed[current_index] = true;

        if goals.contains(&current.pos) {
            let steps = reconstruct_path(nav.tiles, &came_from, current.pos, start_index);
            return Some(Path {
                steps,
                cost: g_scores[current_index],
                goal: current.pos,
            });
        }

        expanded += 1;
        if expanded > max_nodes {
            return None;
        }

        let current_g = g_scores[current_index];
        for neighbor in current.pos.neighbors() {
            let Some(neighbor_index) = nav.tiles.dense_index(neighbor) else {
                continue;
            };
            if closed[neighbor_index] {
                continue;
            }
            let Some(move_cost) = nav.step_cost(neighbor) else {
                continue;
            };

            let tentative_g = current_g + move_cost;
            if tentative_g < g_scores[neighbor_index] {
                came_from[neighbor_index] = Some(current_index);
                g_scores[neighbor_index] = tentative_g;
                open_set.push(PathNode {
                    pos: neighbor,
                    f_cost: OrderedFloat(tentative_g + heuristic(neighbor, &goals)),
                    g_cost: OrderedFloat(tentative_g),
                });
            }
        }
    }

    None
}

/// Walk `came_from` back to the start; the start tile itself is dropped
fn reconstruct_path(
    tiles: &TileMap,
    came_from: &[Option<usize>],
    goal: TilePos,
    start_index: usize,
) -> Vec<TilePos> {
    let width = tiles.width() as usize;
    let to_pos = |i: usize| TilePos::new((i % width) as i32, (i / width) as i32);

    let mut path = vec![goal];
    let mut current = tiles.dense_index(goal);
    while let Some(index) = current {
        match came_from[index] {
            Some(prev) if prev != start_index => {
                path.push(to_pos(prev));
                current = Some(prev);
            }
            _ => break,
        }
    }
    path.reverse();
    path
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::content::standard::{GRASS, ROCK, SAND, WATER};
    use crate::world::TileLayer;

    fn setup(width: u32, height: u32) -> (TileMap, std::sync::Arc<ContentRegistry>, Occupancy) {
        (
            TileMap::new(width, height, GRASS),
            ContentRegistry::standard().unwrap(),
            Occupancy::new(),
        )
    }

    #[test]
    fn test_straight_line() {
        let (tiles, registry, occ) = setup(10, 10);
        let nav = NavGrid::new(&tiles, &registry, &occ);
        let path = find_path(&nav, TilePos::new(0, 0), &[TilePos::new(5, 0)], 1000).unwrap();
        assert_eq!(path.len(), 5);
        assert_eq!(path.steps.last(), Some(&TilePos::new(5, 0)));
        assert_eq!(path.cost, 5.0);
        assert_eq!(path.goal, TilePos::new(5, 0));
    }

    #[test]
    fn test_start_on_goal_is_empty_path() {
        let (tiles, registry, occ) = setup(3, 3);
        let nav = NavGrid::new(&tiles, &registry, &occ);
        let path = find_path(&nav, TilePos::new(1, 1), &[TilePos::new(1, 1)], 10).unwrap();
        assert!(path.is_empty());
    }

    #[test]
    fn test_overlay_blocks_like_base() {
        let (mut tiles, registry, occ) = setup(5, 3);
        tiles.set_terrain(TilePos::new(2, 0), TileLayer::Base, Some(ROCK));
        tiles.set_terrain(TilePos::new(2, 1), TileLayer::Overlay, Some(WATER));
        tiles.set_terrain(TilePos::new(2, 2), TileLayer::Overlay, Some(WATER));
        let nav = NavGrid::new(&tiles, &registry, &occ);
        assert!(find_path(&nav, TilePos::new(0, 1), &[TilePos::new(4, 1)], 1000).is_none());
    }

    #[test]
    fn test_routes_around_structures() {
        let (tiles, registry, mut occ) = setup(6, 3);
        occ.place_structure(EntityId(1), &[TilePos::new(2, 0), TilePos::new(2, 1)]);
        let nav = NavGrid::new(&tiles, &registry, &occ);
        let path = find_path(&nav, TilePos::new(0, 0), &[TilePos::new(4, 0)], 1000).unwrap();
        assert!(path.steps.contains(&TilePos::new(2, 2)));
        assert!(path.steps.iter().all(|p| occ.structure_at(*p).is_none()));
    }

    #[test]
    fn test_terrain_costs_are_summed() {
        let (mut tiles, registry, occ) = setup(5, 3);
        for x in 1..4 {
            tiles.set_terrain(TilePos::new(x, 0), TileLayer::Overlay, Some(SAND));
        }
        let nav = NavGrid::new(&tiles, &registry, &occ);
        let path = find_path(&nav, TilePos::new(0, 0), &[TilePos::new(4, 0)], 1000).unwrap();
        // Three sand tiles (4.5) plus one grass beat the grass detour (6.0)
        assert_eq!(path.cost, 5.5);
        assert_eq!(path.len(), 4);
    }

    #[test]
    fn test_picks_nearest_of_several_goals() {
        let (tiles, registry, occ) = setup(10, 1);
        let nav = NavGrid::new(&tiles, &registry, &occ);
        let goals = [TilePos::new(9, 0), TilePos::new(3, 0)];
        let path = find_path(&nav, TilePos::new(0, 0), &goals, 1000).unwrap();
        assert_eq!(path.goal, TilePos::new(3, 0));
    }

    #[test]
    fn test_crowded_tiles_cost_more_but_stay_passable() {
        let (tiles, registry, mut occ) = setup(3, 1);
        occ.place_pawn(EntityId(7), TilePos::new(1, 0));
        let nav = NavGrid::new(&tiles, &registry, &occ).for_mover(EntityId(1), 2.0);
        let path = find_path(&nav, TilePos::new(0, 0), &[TilePos::new(2, 0)], 100).unwrap();
        assert_eq!(path.cost, 4.0);
        assert!(!nav.is_free_for_mover(TilePos::new(1, 0)));
    }

    #[test]
    fn test_node_budget_fails_cleanly() {
        let (tiles, registry, occ) = setup(50, 50);
        let nav = NavGrid::new(&tiles, &registry, &occ);
        assert!(find_path(&nav, TilePos::new(0, 0), &[TilePos::new(49, 49)], 10).is_none());
    }

    #[test]
    fn test_identical_searches_return_identical_paths() {
        let (tiles, registry, occ) = setup(12, 12);
        let nav = NavGrid::new(&tiles, &registry, &occ);
        let a = find_path(&nav, TilePos::new(0, 0), &[TilePos::new(11, 11)], 10_000);
        let b = find_path(&nav, TilePos::new(0, 0), &[TilePos::new(11, 11)], 10_000);
        assert_eq!(a, b);
    }
}
