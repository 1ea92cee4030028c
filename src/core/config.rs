//! Simulation configuration with documented constants
//!
//! All tuning numbers live here with an explanation of what they control.
//! A config is owned by each `World`; there is no process-wide instance, so
//! two simulations with different configs can run side by side.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::core::error::{Result, SimError};

/// Weights used by the utility scorer in the decision engine
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DecisionWeights {
    /// Score per point of need restored by the candidate interaction (/100)
    pub satisfaction: f32,
    /// Score lost per tile of path cost to reach the candidate
    pub distance: f32,
    /// Score gained per point of attachment affinity (0..10)
    pub attachment: f32,
    /// Flat malus when the candidate is currently locked by another pawn
    pub locked_penalty: f32,
    /// Malus per unit of recent use by other pawns
    pub contention: f32,
}

impl Default for DecisionWeights {
    fn default() -> Self {
        Self {
            satisfaction: 1.0,
            distance: 0.02,
            attachment: 0.05,
            locked_penalty: 0.3,
            contention: 0.05,
        }
    }
}

/// Configuration for the simulation systems
///
/// These values have been tuned to produce good emergent behavior.
/// Changing them will affect pacing and feel, never the invariants.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    // === MOVEMENT ===
    /// Ticks between successive tile steps of a moving pawn
    pub move_interval: u32,

    /// Consecutive ticks without progress before a pawn abandons its plan
    ///
    /// Applies to blocked movement. Once exceeded the pawn drops its queue
    /// and the decision engine runs again on the next tick.
    pub stall_limit: u32,

    /// Extra path cost for tiles currently occupied by another pawn
    ///
    /// Pawns are dynamic obstacles: the pathfinder routes around crowds when
    /// it is cheap to do so, and the per-step collision check handles the rest.
    pub crowd_penalty: f32,

    /// Upper bound on nodes expanded by one path search
    pub max_path_nodes: usize,

    // === CONTENTION ===
    /// Ticks a pawn will wait on a locked target before giving up
    pub wait_retries: u32,

    /// Ticks an unreachable (pawn, target) pair stays excluded
    pub unreachable_ttl: u64,

    /// Multiplicative decay applied to each building's recent-use counter per tick
    pub contention_decay: f32,

    // === DECISION ===
    pub weights: DecisionWeights,

    /// Random-walk steps performed by one Wander action
    pub wander_steps: u32,

    /// Maximum ticks a wandering pawn lingers between steps
    pub wander_max_dwell: u32,

    /// Radius (tiles) sampled when measuring local terrain diversity
    pub diversity_radius: i32,

    // === ECONOMY ===
    /// Percentage of every use payment routed to the global tax pool
    pub tax_percent: u64,

    /// Attachment gained by a pawn for a building per completed interaction
    pub attachment_gain: f32,

    /// Gold handed to pawns created by commands or population growth
    pub starting_gold: u64,

    /// Units of a resource a pawn can carry at once
    pub inventory_capacity: u32,

    /// Gold throughput needed per building level (default level policy)
    pub gold_per_level: u64,

    /// Highest level the default level policy assigns
    pub max_level: u32,

    // === POPULATION ===
    /// Ticks between population growth attempts
    pub spawn_interval: u64,

    /// Distinct terrain kinds needed per extra pawn above housing capacity
    pub variety_divisor: u32,

    // === COMMANDS ===
    /// Largest region a single flood fill may repaint
    pub max_flood_fill: usize,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            move_interval: 1,
            stall_limit: 8,
            crowd_penalty: 2.0,
            max_path_nodes: 20_000,

            wait_retries: 40,
            unreachable_ttl: 120,
            contention_decay: 0.98,

            weights: DecisionWeights::default(),
            wander_steps: 6,
            wander_max_dwell: 4,
            diversity_radius: 2,

            tax_percent: 10,
            attachment_gain: 1.0,
            starting_gold: 50,
            inventory_capacity: 10,
            gold_per_level: 400,
            max_level: 5,

            spawn_interval: 500,
            variety_divisor: 3,

            max_flood_fill: 4096,
        }
    }
}

impl SimulationConfig {
    /// Create a new config with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a config from TOML; absent keys keep their defaults
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: SimulationConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load and validate a TOML config file
    pub fn from_toml_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    /// Validate configuration for internal consistency
    pub fn validate(&self) -> Result<()> {
        if self.move_interval == 0 {
            return Err(SimError::InvalidConfig("move_interval must be >= 1".into()));
        }
        if self.stall_limit == 0 || self.wait_retries == 0 {
            return Err(SimError::InvalidConfig(
                "stall_limit and wait_retries must be >= 1".into(),
            ));
        }
        if self.tax_percent > 100 {
            return Err(SimError::InvalidConfig(format!(
                "tax_percent ({}) must be <= 100",
                self.tax_percent
            )));
        }
        if !(0.0..=1.0).contains(&self.contention_decay) {
            return Err(SimError::InvalidConfig(format!(
                "contention_decay ({}) must be within [0, 1]",
                self.contention_decay
            )));
        }
        if self.crowd_penalty < 0.0 {
            return Err(SimError::InvalidConfig("crowd_penalty must be >= 0".into()));
        }
        if self.variety_divisor == 0 {
            return Err(SimError::InvalidConfig("variety_divisor must be >= 1".into()));
        }
        if self.spawn_interval == 0 {
            return Err(SimError::InvalidConfig("spawn_interval must be >= 1".into()));
        }
        if self.gold_per_level == 0 {
            return Err(SimError::InvalidConfig("gold_per_level must be >= 1".into()));
        }
        if self.inventory_capacity == 0 {
            return Err(SimError::InvalidConfig(
                "inventory_capacity must be >= 1".into(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        assert!(SimulationConfig::default().validate().is_ok());
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config = SimulationConfig::from_toml_str(
            r#"
            move_interval = 3
            tax_percent = 25

            [weights]
            distance = 0.5
            "#,
        )
        .unwrap();

        assert_eq!(config.move_interval, 3);
        assert_eq!(config.tax_percent, 25);
        assert_eq!(config.weights.distance, 0.5);
        assert_eq!(config.weights.satisfaction, 1.0);
        assert_eq!(config.stall_limit, SimulationConfig::default().stall_limit);
    }

    #[test]
    fn test_invalid_tax_rejected() {
        let result = SimulationConfig::from_toml_str("tax_percent = 150");
        assert!(matches!(result, Err(SimError::InvalidConfig(_))));
    }

    #[test]
    fn test_malformed_toml_rejected() {
        let result = SimulationConfig::from_toml_str("move_interval = \"fast\"");
        assert!(matches!(result, Err(SimError::TomlError(_))));
    }
}
