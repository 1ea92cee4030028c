//! Per-pawn action state machine data
//!
//! The current action is a tagged union advanced once per tick by
//! `simulation::action_execute`. Every transition is derived from the data
//! stored here (phase counters, path cursor, tick stamps), so replaying the
//! same inputs replays the same transitions.

use std::collections::VecDeque;

use serde::{Deserialize, Serialize};

use crate::core::types::{EntityId, ResourceId, Tick, TilePos};

/// Progress of an exclusive interaction with a building
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum InteractPhase {
    /// Standing at the use area, lock not yet requested
    Pending,
    /// Target locked by someone else; retried once per tick
    Waiting { retries_left: u32 },
    /// Lock held; completion fires when `remaining` reaches zero
    Interacting { remaining: u32 },
}

/// Where a haul trip picks its cargo up
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum HaulPickup {
    Building(EntityId),
    /// A resource-bearing terrain tile next to the stand tile
    Terrain(TilePos),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct HaulJob {
    pub dest: EntityId,
    /// Index of the Haul interaction on the destination definition
    pub interaction: usize,
    pub resource: ResourceId,
    pub pickup: HaulPickup,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum HaulStage {
    Load(InteractPhase),
    Unload(InteractPhase),
}

/// What a pawn is doing
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Action {
    Idle,
    /// Follow the cached path to any of `goals`
    MoveTo {
        target: Option<EntityId>,
        goals: Vec<TilePos>,
    },
    /// Consume a building's service
    Use {
        target: EntityId,
        interaction: usize,
        phase: InteractPhase,
    },
    /// Labor at a building for pay
    Work {
        target: EntityId,
        interaction: usize,
        phase: InteractPhase,
    },
    Haul { job: HaulJob, stage: HaulStage },
    /// Local random walk; `dwell` ticks are spent standing between steps
    Wander { steps_left: u32, dwell: u32 },
}

impl Action {
    /// Short label used by snapshots and logs
    pub fn label(&self) -> &'static str {
        match self {
            Action::Idle => "idle",
            Action::MoveTo { .. } => "moving",
            Action::Use { phase, .. } | Action::Work { phase, .. } => match phase {
                InteractPhase::Waiting { .. } => "waiting",
                _ if matches!(self, Action::Use { .. }) => "using",
                _ => "working",
            },
            Action::Haul { .. } => "hauling",
            Action::Wander { .. } => "wandering",
        }
    }

    /// Building this action refers to, if any
    pub fn target(&self) -> Option<EntityId> {
        match self {
            Action::MoveTo { target, .. } => *target,
            Action::Use { target, .. } | Action::Work { target, .. } => Some(*target),
            Action::Haul { job, .. } => match job.pickup {
                HaulPickup::Building(src) => Some(src),
                HaulPickup::Terrain(_) => Some(job.dest),
            },
            Action::Idle | Action::Wander { .. } => None,
        }
    }
}

/// Current action, pending queue, cached path, and timing of one pawn
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionState {
    current: Action,
    queue: VecDeque<Action>,
    /// Tiles still to walk for the current MoveTo, consumed from `cursor`
    pub path: Vec<TilePos>,
    pub cursor: usize,
    /// Tick the current action became current
    pub started_at: Tick,
    /// Earliest tick the next path step may be taken
    pub next_step_at: Tick,
    /// Consecutive ticks without progress
    pub stalled_ticks: u32,
}

impl Default for ActionState {
    fn default() -> Self {
        Self::new()
    }
}

impl ActionState {
    pub fn new() -> Self {
        Self {
            current: Action::Idle,
            queue: VecDeque::new(),
            path: Vec::new(),
            cursor: 0,
            started_at: 0,
            next_step_at: 0,
            stalled_ticks: 0,
        }
    }

    pub fn current(&self) -> &Action {
        &self.current
    }

    pub fn current_mut(&mut self) -> &mut Action {
        &mut self.current
    }

    pub fn queued(&self) -> impl Iterator<Item = &Action> {
        self.queue.iter()
    }

    pub fn is_idle(&self) -> bool {
        self.current == Action::Idle && self.queue.is_empty()
    }

    /// Replace everything with a new plan; `path` belongs to the first action
    pub fn begin_plan(&mut self, actions: Vec<Action>, path: Vec<TilePos>, tick: Tick) {
        let mut queue: VecDeque<Action> = actions.into();
        self.current = queue.pop_front().unwrap_or(Action::Idle);
        self.queue = queue;
        self.path = path;
        self.cursor = 0;
        self.started_at = tick;
        self.next_step_at = tick;
        self.stalled_ticks = 0;
    }

    /// Finish the current action and promote the next queued one
    pub fn complete_current(&mut self, tick: Tick) {
        self.current = self.queue.pop_front().unwrap_or(Action::Idle);
        self.path.clear();
        self.cursor = 0;
        self.started_at = tick;
        self.next_step_at = tick;
        self.stalled_ticks = 0;
    }

    /// Drop the current action and everything queued behind it
    pub fn clear(&mut self) {
        self.current = Action::Idle;
        self.queue.clear();
        self.path.clear();
        self.cursor = 0;
        self.stalled_ticks = 0;
    }

    /// Path tiles not yet walked
    pub fn remaining_path(&self) -> &[TilePos] {
        self.path.get(self.cursor..).unwrap_or(&[])
    }

    /// Whether the current action or any queued one refers to `building`
    pub fn references(&self, building: EntityId) -> bool {
        self.current.target() == Some(building)
            || self.queue.iter().any(|a| a.target() == Some(building))
            || matches!(&self.current, Action::Haul { job, .. } if job.dest == building)
            || self
                .queue
                .iter()
                .any(|a| matches!(a, Action::Haul { job, .. } if job.dest == building))
    }
}
