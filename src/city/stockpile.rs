//! Per-building resource store

use serde::{Deserialize, Serialize};

use crate::content::ResourceStoreDef;
use crate::core::types::ResourceId;

/// A single-resource store attached to a building instance
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceStore {
    pub resource: ResourceId,
    pub amount: u32,
    pub max: u32,
}

impl ResourceStore {
    pub fn from_def(def: &ResourceStoreDef) -> Self {
        Self {
            resource: def.resource,
            amount: def.initial.min(def.max),
            max: def.max,
        }
    }

    pub fn space(&self) -> u32 {
        self.max.saturating_sub(self.amount)
    }

    pub fn is_full(&self) -> bool {
        self.amount >= self.max
    }

    /// Try to add resources, returns amount actually added
    pub fn add(&mut self, amount: u32) -> u32 {
        let added = amount.min(self.space());
        self.amount += added;
        added
    }

    /// Try to remove resources, returns amount actually removed
    pub fn remove(&mut self, amount: u32) -> u32 {
        let removed = amount.min(self.amount);
        self.amount -= removed;
        removed
    }

    /// Remove exactly `amount` or nothing
    pub fn consume(&mut self, amount: u32) -> bool {
        if self.amount < amount {
            return false;
        }
        self.amount -= amount;
        true
    }
}
