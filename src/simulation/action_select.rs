//! Action selection - the utility decision engine
//!
//! Runs for pawns with no current action and an empty queue:
//! 1. Needs below their seek threshold are ranked by urgency (ties: lower id)
//! 2. For the most urgent need, every live instance offering a satisfying
//!    interaction becomes a candidate unless it is unaffordable, busy, or
//!    cached as unreachable
//! 3. Reachable candidates are scored by `score_candidate`; the best wins,
//!    ties going to the shorter path and then the lower instance id
//! 4. A need with no viable candidate falls through to the next one, and a
//!    pawn with nothing satisfiable wanders
//!
//! Each need is visited once, so a decision costs at most one pass over the
//! needs. Path failures found on the way are cached so the same instance is
//! not retried until the cache entry expires.

use ordered_float::OrderedFloat;

use crate::city::economy::{check_use, check_work};
use crate::content::{HaulSource, InteractionKind, ObjectDef};
use crate::core::config::DecisionWeights;
use crate::core::types::{EntityId, NeedId, TerrainId, TilePos};
use crate::ecs::world::World;
use crate::entity::needs::urgency;
use crate::entity::tasks::{Action, HaulJob, HaulPickup, HaulStage, InteractPhase};
use crate::simulation::tick::SimulationEvent;
use crate::spatial::pathfinding::{find_path, NavGrid, Path};

/// Everything the scorer needs to know about one option
#[derive(Debug, Clone, PartialEq)]
pub struct Candidate {
    pub building: EntityId,
    pub interaction: usize,
    pub kind: InteractionKind,
    /// Need points the interaction restores
    pub gain: f32,
    /// Path cost to the nearest free use tile (plus the haul leg estimate)
    pub path_cost: f32,
    /// This pawn's attachment to the instance, 0..10
    pub attachment: f32,
    /// Decaying count of recent interactions at the instance by other pawns
    pub contention: f32,
    /// Another pawn currently holds the instance's lock
    pub locked: bool,
}

/// Utility of a candidate for a need of the given urgency
///
/// Pure function of its inputs; higher is better.
pub fn score_candidate(weights: &DecisionWeights, urgency: f32, candidate: &Candidate) -> f32 {
    let mut score = urgency * weights.satisfaction * (candidate.gain / 100.0);
    score -= weights.distance * candidate.path_cost;
    score += weights.attachment * candidate.attachment;
    score -= weights.contention * candidate.contention;
    if candidate.locked {
        score -= weights.locked_penalty;
    }
    score
}

/// Index of the best candidate: highest score, then shortest path, then
/// lowest instance id, then lowest interaction index
pub fn pick_best(weights: &DecisionWeights, urgency: f32, candidates: &[Candidate]) -> Option<usize> {
    candidates
        .iter()
        .enumerate()
        .min_by(|(_, a), (_, b)| {
            let score_a = OrderedFloat(score_candidate(weights, urgency, a));
            let score_b = OrderedFloat(score_candidate(weights, urgency, b));
            score_b
                .cmp(&score_a)
                .then_with(|| OrderedFloat(a.path_cost).cmp(&OrderedFloat(b.path_cost)))
                .then_with(|| a.building.cmp(&b.building))
                .then_with(|| a.interaction.cmp(&b.interaction))
        })
        .map(|(i, _)| i)
}

/// Needs below their seek threshold, most urgent first
pub fn ranked_needs(world: &World, pawn: usize) -> Vec<(NeedId, f32)> {
    let registry = world.registry();
    let mut ranked: Vec<(NeedId, f32)> = world.pawns.needs[pawn]
        .iter()
        .filter_map(|(id, value)| {
            let def = registry.need(id)?;
            let u = urgency(def, value);
            (u > 0.0).then_some((id, u))
        })
        .collect();
    ranked.sort_by(|a, b| {
        OrderedFloat(b.1)
            .cmp(&OrderedFloat(a.1))
            .then_with(|| a.0.cmp(&b.0))
    });
    ranked
}

/// A concrete plan for one pawn
#[derive(Debug, Clone, PartialEq)]
pub struct Plan {
    pub actions: Vec<Action>,
    /// Path for the first action when it is a MoveTo
    pub path: Vec<TilePos>,
    pub need: Option<NeedId>,
    pub target: Option<EntityId>,
}

/// Result of deciding for one pawn
#[derive(Debug, Clone, PartialEq)]
pub struct Decision {
    pub plan: Plan,
    /// Instances found unreachable during this decision
    pub path_failures: Vec<EntityId>,
}

/// Candidate plus what is needed to turn it into a plan
struct Choice {
    candidate: Candidate,
    path: Path,
    goals: Vec<TilePos>,
    haul: Option<HaulRoute>,
}

struct HaulRoute {
    job: HaulJob,
    pickup_goals: Vec<TilePos>,
    dest_goals: Vec<TilePos>,
}

/// Run the decision engine for every idle pawn, in index order
pub fn select_actions(world: &mut World, events: &mut Vec<SimulationEvent>) {
    let tick = world.current_tick;
    let ttl = world.config.unreachable_ttl;
    for p in world.pawns.iter_living().collect::<Vec<_>>() {
        if !world.pawns.actions[p].is_idle() {
            continue;
        }
        let decision = decide(world, p);
        let pawn = world.pawns.ids[p];

        for target in decision.path_failures {
            world.unreachable.mark(pawn, target, tick + ttl);
            events.push(SimulationEvent::PathFailed { pawn, target, tick });
        }

        let plan = decision.plan;
        let label = plan.actions.first().map_or("idle", |a| a.label());
        tracing::debug!(
            pawn = %pawn,
            action = label,
            need = ?plan.need,
            target = ?plan.target,
            "Decision"
        );
        events.push(SimulationEvent::ActionStarted {
            pawn,
            action: label,
            target: plan.target,
            tick,
        });
        world.pawns.actions[p].begin_plan(plan.actions, plan.path, tick);
    }
}

/// Decide what pawn `p` does next; never mutates the world
pub fn decide(world: &World, p: usize) -> Decision {
    let mut path_failures = Vec::new();

    for (need, need_urgency) in ranked_needs(world, p) {
        let options = gather_options(world, p, need, &mut path_failures);
        if options.is_empty() {
            continue;
        }
        let candidates: Vec<Candidate> = options.iter().map(|o| o.candidate.clone()).collect();
        let Some(best) = pick_best(&world.config.weights, need_urgency, &candidates) else {
            continue;
        };
        let Some(chosen) = options.into_iter().nth(best) else {
            continue;
        };
        return Decision {
            plan: build_plan(chosen, need),
            path_failures,
        };
    }

    Decision {
        plan: Plan {
            actions: vec![Action::Wander {
                steps_left: world.config.wander_steps,
                dwell: 0,
            }],
            path: Vec::new(),
            need: None,
            target: None,
        },
        path_failures,
    }
}

fn build_plan(choice: Choice, need: NeedId) -> Plan {
    let target = Some(choice.candidate.building);
    let mut actions = Vec::new();

    match choice.haul {
        None => {
            let interaction = choice.candidate.interaction;
            let building = choice.candidate.building;
            if !choice.path.is_empty() {
                actions.push(Action::MoveTo {
                    target,
                    goals: choice.goals,
                });
            }
            let phase = InteractPhase::Pending;
            actions.push(match choice.candidate.kind {
                InteractionKind::Work => Action::Work {
                    target: building,
                    interaction,
                    phase,
                },
                _ => Action::Use {
                    target: building,
                    interaction,
                    phase,
                },
            });
        }
        Some(route) => {
            let pickup_target = match route.job.pickup {
                HaulPickup::Building(src) => Some(src),
                HaulPickup::Terrain(_) => Some(route.job.dest),
            };
            if !choice.path.is_empty() {
                actions.push(Action::MoveTo {
                    target: pickup_target,
                    goals: route.pickup_goals,
                });
            }
            actions.push(Action::Haul {
                job: route.job,
                stage: HaulStage::Load(InteractPhase::Pending),
            });
            actions.push(Action::MoveTo {
                target: Some(route.job.dest),
                goals: route.dest_goals,
            });
            actions.push(Action::Haul {
                job: route.job,
                stage: HaulStage::Unload(InteractPhase::Pending),
            });
        }
    }

    let path = if matches!(actions.first(), Some(Action::MoveTo { .. })) {
        choice.path.steps
    } else {
        Vec::new()
    };
    Plan {
        actions,
        path,
        need: Some(need),
        target,
    }
}

fn nav_for(world: &World, p: usize) -> NavGrid<'_> {
    NavGrid::new(&world.tiles, world.registry(), &world.occupancy)
        .for_mover(world.pawns.ids[p], world.config.crowd_penalty)
}

/// Use tiles of a building instance that the pawn could stand on now
pub fn free_use_tiles(world: &World, p: usize, b: usize, def: &ObjectDef) -> Vec<TilePos> {
    let nav = nav_for(world, p);
    world
        .buildings
        .use_tiles(b, def)
        .into_iter()
        .filter(|&t| world.tiles.in_bounds(t) && nav.is_free_for_mover(t))
        .collect()
}

fn gather_options(
    world: &World,
    p: usize,
    need: NeedId,
    path_failures: &mut Vec<EntityId>,
) -> Vec<Choice> {
    let registry = world.registry();
    let pawn = world.pawns.ids[p];
    let start = world.pawns.positions[p];
    let gold = world.pawns.gold[p];
    let tick = world.current_tick;
    let nav = nav_for(world, p);
    let mut options = Vec::new();

    for &(def_id, interaction) in registry.satisfiers_of(need) {
        let Some(def) = registry.object(def_id) else {
            continue;
        };
        if !def.offers(interaction) {
            continue;
        }
        let Some(interaction_def) = def.interactions.get(interaction) else {
            continue;
        };
        let gain = interaction_def.gain_for(need);

        for b in world.buildings.iter_of_def(def_id) {
            let building = world.buildings.ids[b];
            if world.unreachable.is_blocked(pawn, building, tick)
                || path_failures.contains(&building)
            {
                continue;
            }
            let level = world.buildings.levels[b];

            // Economic exclusion happens before any path search
            let affordable = match interaction_def.kind {
                InteractionKind::Use => {
                    check_use(def, level, gold, world.buildings.stores[b].as_ref()).is_ok()
                }
                InteractionKind::Work => {
                    check_work(def, level, gold, world.buildings.gold[b]).is_ok()
                }
                InteractionKind::Haul => true,
            };
            if !affordable {
                continue;
            }

            let candidate = |path_cost: f32| Candidate {
                building,
                interaction,
                kind: interaction_def.kind,
                gain,
                path_cost,
                attachment: world.buildings.attachment_of(b, pawn),
                contention: world.buildings.contention_for(b, pawn),
                locked: world
                    .occupancy
                    .holder(building)
                    .map_or(false, |holder| holder != pawn),
            };

            if interaction_def.kind == InteractionKind::Haul {
                if let Some((route, path, estimate)) =
                    plan_haul(world, p, b, def, interaction, path_failures)
                {
                    options.push(Choice {
                        candidate: candidate(estimate),
                        path,
                        goals: Vec::new(),
                        haul: Some(route),
                    });
                }
                continue;
            }

            let goals = free_use_tiles(world, p, b, def);
            if goals.is_empty() {
                // Every use tile is taken right now; busy, not unreachable
                continue;
            }
            match find_path(&nav, start, &goals, world.config.max_path_nodes) {
                Some(path) => options.push(Choice {
                    candidate: candidate(path.cost),
                    goals: world.buildings.use_tiles(b, def),
                    path,
                    haul: None,
                }),
                None => path_failures.push(building),
            }
        }
    }

    options
}

/// Route a haul trip into building `b`: pick the nearest stocked source
///
/// Returns the route, the path to the pickup, and the estimated total cost.
fn plan_haul(
    world: &World,
    p: usize,
    b: usize,
    def: &ObjectDef,
    interaction: usize,
    path_failures: &mut Vec<EntityId>,
) -> Option<(HaulRoute, Path, f32)> {
    let registry = world.registry();
    let haul = def.haul?;
    let dest = world.buildings.ids[b];
    let pawn = world.pawns.ids[p];
    let tick = world.current_tick;

    let store = world.buildings.stores[b]?;
    if store.resource != haul.resource || store.space() == 0 {
        return None;
    }
    if world.pawns.inventories[p].space_for(haul.resource) == 0 {
        return None;
    }
    let dest_goals = world.buildings.use_tiles(b, def);
    let nav = nav_for(world, p);
    let start = world.pawns.positions[p];
    let max_nodes = world.config.max_path_nodes;

    let (pickup, pickup_goals, path) = match haul.source {
        HaulSource::Object(src_def_id) => {
            let src_def = registry.object(src_def_id)?;
            let mut best: Option<(EntityId, Vec<TilePos>, Path)> = None;
            for s in world.buildings.iter_of_def(src_def_id) {
                let src = world.buildings.ids[s];
                if src == dest
                    || world.unreachable.is_blocked(pawn, src, tick)
                    || path_failures.contains(&src)
                {
                    continue;
                }
                let stocked = world.buildings.stores[s]
                    .map_or(false, |st| st.resource == haul.resource && st.amount > 0);
                if !stocked {
                    continue;
                }
                let goals = free_use_tiles(world, p, s, src_def);
                if goals.is_empty() {
                    continue;
                }
                match find_path(&nav, start, &goals, max_nodes) {
                    Some(path) => {
                        let better = best.as_ref().map_or(true, |(_, _, current)| {
                            OrderedFloat(path.cost) < OrderedFloat(current.cost)
                        });
                        if better {
                            best = Some((src, world.buildings.use_tiles(s, src_def), path));
                        }
                    }
                    None => path_failures.push(src),
                }
            }
            let (src, goals, path) = best?;
            (HaulPickup::Building(src), goals, path)
        }
        HaulSource::Terrain(terrain) => {
            let goals = terrain_stand_tiles(world, p, terrain);
            if goals.is_empty() {
                return None;
            }
            let Some(path) = find_path(&nav, start, &goals, max_nodes) else {
                path_failures.push(dest);
                return None;
            };
            let tile = path
                .goal
                .neighbors()
                .into_iter()
                .find(|&n| world.tiles.has_terrain(n, terrain))?;
            (HaulPickup::Terrain(tile), goals, path)
        }
    };

    let leg = dest_goals
        .iter()
        .map(|g| g.manhattan(&path.goal))
        .min()
        .unwrap_or(0) as f32;
    let estimate = path.cost + leg;
    let job = HaulJob {
        dest,
        interaction,
        resource: haul.resource,
        pickup,
    };
    Some((
        HaulRoute {
            job,
            pickup_goals,
            dest_goals,
        },
        path,
        estimate,
    ))
}

/// Free tiles adjacent to any tile holding `terrain`, in row-major order
pub fn terrain_stand_tiles(world: &World, p: usize, terrain: TerrainId) -> Vec<TilePos> {
    let nav = nav_for(world, p);
    let mut goals: Vec<TilePos> = world
        .tiles
        .iter()
        .filter(|(_, tile)| tile.terrains().any(|t| t == terrain))
        .flat_map(|(pos, _)| pos.neighbors())
        .filter(|&n| world.tiles.in_bounds(n) && nav.is_free_for_mover(n))
        .collect();
    goals.sort_by(|a, b| a.y.cmp(&b.y).then(a.x.cmp(&b.x)));
    goals.dedup();
    goals
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::content::standard::{BED, FUN, HUNGER, PARK, REST, TAVERN, WATER};
    use crate::content::ContentRegistry;
    use crate::core::SimulationConfig;
    use crate::world::TileLayer;

    fn candidate(building: u32, gain: f32, path_cost: f32) -> Candidate {
        Candidate {
            building: EntityId(building),
            interaction: 0,
            kind: InteractionKind::Use,
            gain,
            path_cost,
            attachment: 0.0,
            contention: 0.0,
            locked: false,
        }
    }

    fn world(width: u32, height: u32) -> World {
        World::new(
            SimulationConfig::default(),
            ContentRegistry::standard().unwrap(),
            width,
            height,
            3,
        )
        .unwrap()
    }

    #[test]
    fn test_score_rewards_gain_and_penalizes_distance() {
        let weights = DecisionWeights::default();
        let near = candidate(1, 40.0, 2.0);
        let far = candidate(2, 40.0, 20.0);
        assert!(score_candidate(&weights, 1.0, &near) > score_candidate(&weights, 1.0, &far));

        let mut locked = near.clone();
        locked.locked = true;
        assert!(score_candidate(&weights, 1.0, &locked) < score_candidate(&weights, 1.0, &near));

        let mut loyal = near.clone();
        loyal.attachment = 10.0;
        assert!(score_candidate(&weights, 1.0, &loyal) > score_candidate(&weights, 1.0, &near));
    }

    #[test]
    fn test_ties_break_by_distance_then_id() {
        let weights = DecisionWeights {
            distance: 0.0,
            ..DecisionWeights::default()
        };
        let options = vec![
            candidate(9, 40.0, 5.0),
            candidate(4, 40.0, 5.0),
            candidate(2, 40.0, 7.0),
        ];
        assert_eq!(pick_best(&weights, 1.0, &options), Some(1));
        assert_eq!(pick_best(&weights, 1.0, &[]), None);
    }

    #[test]
    fn test_needs_ranked_by_urgency() {
        let mut world = world(8, 8);
        world.spawn_pawn("a", TilePos::new(0, 0)).unwrap();
        world.pawns.needs[0].set(HUNGER, 40.0);
        world.pawns.needs[0].set(FUN, 5.0);
        world.pawns.needs[0].set(REST, 100.0);
        let ranked: Vec<NeedId> = ranked_needs(&world, 0).into_iter().map(|r| r.0).collect();
        assert_eq!(ranked[0], FUN);
        assert_eq!(ranked[1], HUNGER);
        assert!(!ranked.contains(&REST));
    }

    #[test]
    fn test_picks_nearest_satisfier() {
        let mut world = world(20, 6);
        world.spawn_pawn("a", TilePos::new(0, 0)).unwrap();
        let _far = world.spawn_building(BED, TilePos::new(15, 0)).unwrap();
        let near = world.spawn_building(BED, TilePos::new(4, 0)).unwrap();
        world.pawns.needs[0].set(REST, 10.0);

        let decision = decide(&world, 0);
        assert_eq!(decision.plan.target, Some(near));
        assert_eq!(decision.plan.need, Some(REST));
        assert!(matches!(decision.plan.actions[0], Action::MoveTo { .. }));
        assert!(matches!(decision.plan.actions[1], Action::Use { .. }));
        assert_eq!(decision.plan.path.last(), Some(&TilePos::new(3, 0)));
    }

    #[test]
    fn test_attachment_outweighs_own_recent_use() {
        let mut world = world(12, 6);
        world.spawn_pawn("a", TilePos::new(5, 2)).unwrap();
        let _left = world.spawn_building(BED, TilePos::new(2, 2)).unwrap();
        let right = world.spawn_building(BED, TilePos::new(8, 2)).unwrap();
        world.pawns.needs[0].set(REST, 10.0);

        let pawn = world.pawns.ids[0];
        let b = world.buildings.index_of(right).unwrap();
        let gain = world.config.attachment_gain;
        world.buildings.add_attachment(b, pawn, gain);
        world.buildings.record_use(b, pawn);
        world.buildings.decay_recent_uses(world.config.contention_decay);
        assert_eq!(decide(&world, 0).plan.target, Some(right));

        // Crowding by someone else still pushes the pawn away
        world.buildings.record_use(b, EntityId(999));
        world.buildings.record_use(b, EntityId(999));
        assert_ne!(decide(&world, 0).plan.target, Some(right));
    }

    #[test]
    fn test_unaffordable_need_falls_back_to_next() {
        let mut world = world(12, 6);
        world.spawn_pawn("a", TilePos::new(0, 0)).unwrap();
        world.spawn_building(TAVERN, TilePos::new(4, 2)).unwrap();
        let park = world.spawn_building(PARK, TilePos::new(8, 2)).unwrap();
        world.pawns.needs[0].set(HUNGER, 5.0);
        world.pawns.needs[0].set(FUN, 30.0);
        world.pawns.gold[0] = 1;

        let decision = decide(&world, 0);
        assert_eq!(decision.plan.need, Some(FUN));
        assert_eq!(decision.plan.target, Some(park));
    }

    #[test]
    fn test_unreachable_is_reported_and_falls_back_to_wander() {
        let mut world = world(12, 12);
        world.spawn_pawn("a", TilePos::new(0, 0)).unwrap();
        let bed = world.spawn_building(BED, TilePos::new(8, 8)).unwrap();
        for i in 0..12 {
            world
                .paint_terrain(TilePos::new(i, 5), TileLayer::Overlay, Some(WATER))
                .unwrap();
        }
        world.pawns.needs[0].set(REST, 10.0);

        let decision = decide(&world, 0);
        assert_eq!(decision.path_failures, vec![bed]);
        assert!(matches!(decision.plan.actions[0], Action::Wander { .. }));

        world.unreachable.mark(world.pawns.ids[0], bed, 1_000);
        let again = decide(&world, 0);
        assert!(again.path_failures.is_empty());
    }
}
