pub mod action_execute;
pub mod action_select;
pub mod invariants;
pub mod mood;
pub mod population;
pub mod scenario;
pub mod tick;

pub use action_select::{decide, pick_best, score_candidate, Candidate, Decision, Plan};
pub use invariants::{check_invariants, InvariantViolation};
pub use scenario::demo_world;
pub use tick::{advance_ticks, run_simulation_tick, SimulationEvent};
