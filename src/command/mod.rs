//! Command surface
//!
//! Text line -> CommandResolver -> Command -> CommandExecutor -> CommandOutcome

pub mod executor;
pub mod resolver;

pub use executor::{Command, CommandExecutor, CommandOutcome};
pub use resolver::CommandResolver;
