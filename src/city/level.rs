//! Building level progression
//!
//! How throughput turns into levels is a policy decision, so it sits behind a
//! trait the world owns. The default ties levels to cumulative gold moved
//! through the building.

use std::fmt::Debug;

use serde::{Deserialize, Serialize};

use crate::core::config::SimulationConfig;

/// Maps a building's cumulative throughput to its level
pub trait LevelPolicy: Debug + Send + Sync {
    /// New level for a building; implementations must never return less
    /// than `current`
    fn level_for(&self, throughput: u64, current: u32) -> u32;

    /// Plain-data form for saves. Policies without one are not persisted and
    /// must be re-applied after a restore.
    fn saved_form(&self) -> Option<SavedLevelPolicy> {
        None
    }
}

/// Built-in policies as they are written into saves
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SavedLevelPolicy {
    Throughput { gold_per_level: u64, max_level: u32 },
    Fixed,
}

impl SavedLevelPolicy {
    pub fn into_policy(self) -> Box<dyn LevelPolicy> {
        match self {
            SavedLevelPolicy::Throughput {
                gold_per_level,
                max_level,
            } => Box::new(ThroughputLevelPolicy {
                gold_per_level: gold_per_level.max(1),
                max_level,
            }),
            SavedLevelPolicy::Fixed => Box::new(FixedLevelPolicy),
        }
    }
}

/// One level per `gold_per_level` of throughput, capped at `max_level`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ThroughputLevelPolicy {
    pub gold_per_level: u64,
    pub max_level: u32,
}

impl ThroughputLevelPolicy {
    pub fn from_config(config: &SimulationConfig) -> Self {
        Self {
            gold_per_level: config.gold_per_level.max(1),
            max_level: config.max_level,
        }
    }
}

impl Default for ThroughputLevelPolicy {
    fn default() -> Self {
        Self::from_config(&SimulationConfig::default())
    }
}

impl LevelPolicy for ThroughputLevelPolicy {
    fn level_for(&self, throughput: u64, current: u32) -> u32 {
        let earned = (throughput / self.gold_per_level).min(self.max_level as u64) as u32;
        earned.max(current)
    }

    fn saved_form(&self) -> Option<SavedLevelPolicy> {
        Some(SavedLevelPolicy::Throughput {
            gold_per_level: self.gold_per_level,
            max_level: self.max_level,
        })
    }
}

/// Policy that never levels anything up
#[derive(Debug, Clone, Copy, Default)]
pub struct FixedLevelPolicy;

impl LevelPolicy for FixedLevelPolicy {
    fn level_for(&self, _throughput: u64, current: u32) -> u32 {
        current
    }

    fn saved_form(&self) -> Option<SavedLevelPolicy> {
        Some(SavedLevelPolicy::Fixed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_throughput_levels() {
        let policy = ThroughputLevelPolicy {
            gold_per_level: 100,
            max_level: 3,
        };
        assert_eq!(policy.level_for(0, 0), 0);
        assert_eq!(policy.level_for(99, 0), 0);
        assert_eq!(policy.level_for(250, 0), 2);
        assert_eq!(policy.level_for(10_000, 0), 3);
    }

    #[test]
    fn test_levels_never_decrease() {
        let policy = ThroughputLevelPolicy {
            gold_per_level: 100,
            max_level: 3,
        };
        assert_eq!(policy.level_for(0, 2), 2);
        assert_eq!(FixedLevelPolicy.level_for(1_000_000, 1), 1);
    }

    #[test]
    fn test_saved_form_rebuilds_same_policy() {
        let policy = ThroughputLevelPolicy {
            gold_per_level: 40,
            max_level: 2,
        };
        let rebuilt = policy.saved_form().unwrap().into_policy();
        assert_eq!(rebuilt.level_for(100, 0), 2);
        assert_eq!(rebuilt.saved_form(), policy.saved_form());

        let fixed = FixedLevelPolicy.saved_form().unwrap().into_policy();
        assert_eq!(fixed.level_for(1_000, 0), 0);
    }
}
