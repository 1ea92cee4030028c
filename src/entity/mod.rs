pub mod buffs;
pub mod needs;
pub mod pawn;
pub mod tasks;

pub use buffs::{ActiveBuff, BuffDuration, BuffSet, BuffSource};
pub use needs::{NeedSeverity, Needs};
pub use pawn::{Inventory, PawnArchetype};
pub use tasks::{Action, ActionState, HaulJob, HaulPickup, HaulStage, InteractPhase};
