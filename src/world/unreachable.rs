//! Short-lived memory of (pawn, target) pairs that failed to path
//!
//! The decision engine skips a cached pair until it expires, so a pawn never
//! re-targets an unreachable building on consecutive decisions.

use std::collections::BTreeMap;

use crate::core::types::{EntityId, Tick};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UnreachableCache {
    /// (pawn, target) -> tick the entry stops applying
    entries: BTreeMap<(EntityId, EntityId), Tick>,
}

impl UnreachableCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn mark(&mut self, pawn: EntityId, target: EntityId, until: Tick) {
        self.entries.insert((pawn, target), until);
    }

    pub fn is_blocked(&self, pawn: EntityId, target: EntityId, now: Tick) -> bool {
        self.entries
            .get(&(pawn, target))
            .map_or(false, |&until| now < until)
    }

    /// Drop expired entries
    pub fn purge(&mut self, now: Tick) {
        self.entries.retain(|_, until| now < *until);
    }

    /// Drop every entry that mentions `id` as pawn or target
    pub fn forget(&mut self, id: EntityId) {
        self.entries
            .retain(|(pawn, target), _| *pawn != id && *target != id);
    }

    /// Drop everything; used when the map changes shape
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// (pawn, target, until) triples in ascending key order
    pub fn iter(&self) -> impl Iterator<Item = (EntityId, EntityId, Tick)> + '_ {
        self.entries.iter().map(|(&(p, t), &until)| (p, t, until))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PAWN: EntityId = EntityId(1);
    const FAR: EntityId = EntityId(2);

    #[test]
    fn test_entries_expire() {
        let mut cache = UnreachableCache::new();
        cache.mark(PAWN, FAR, 10);
        assert!(cache.is_blocked(PAWN, FAR, 9));
        assert!(!cache.is_blocked(PAWN, FAR, 10));
        assert!(!cache.is_blocked(FAR, PAWN, 5));

        cache.purge(10);
        assert!(cache.is_empty());
    }

    #[test]
    fn test_forget_removes_both_roles() {
        let mut cache = UnreachableCache::new();
        cache.mark(PAWN, FAR, 10);
        cache.mark(EntityId(3), PAWN, 10);
        cache.mark(EntityId(3), FAR, 10);
        cache.forget(PAWN);
        assert_eq!(cache.len(), 1);
    }
}
