//! Data-driven needs that drive pawn behavior

use serde::{Deserialize, Serialize};

use crate::content::{ContentRegistry, NeedDef};
use crate::core::types::NeedId;

pub const NEED_MIN: f32 = 0.0;
pub const NEED_MAX: f32 = 100.0;

/// Need values keyed by need id, kept sorted by id
///
/// 100 = fully satisfied, 0 = desperate.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Needs {
    values: Vec<(NeedId, f32)>,
}

impl Needs {
    /// Every registered need at its initial value
    pub fn from_registry(registry: &ContentRegistry) -> Self {
        Self {
            values: registry
                .needs()
                .map(|def| (def.id, def.initial.clamp(NEED_MIN, NEED_MAX)))
                .collect(),
        }
    }

    pub fn get(&self, need: NeedId) -> Option<f32> {
        self.values
            .binary_search_by_key(&need, |(id, _)| *id)
            .ok()
            .map(|i| self.values[i].1)
    }

    /// Set a need value, clamped to [0, 100]; inserts untracked needs
    pub fn set(&mut self, need: NeedId, value: f32) {
        let value = value.clamp(NEED_MIN, NEED_MAX);
        match self.values.binary_search_by_key(&need, |(id, _)| *id) {
            Ok(i) => self.values[i].1 = value,
            Err(i) => self.values.insert(i, (need, value)),
        }
    }

    /// Decay every tracked need by its per-tick rate
    pub fn decay(&mut self, registry: &ContentRegistry) {
        for (id, value) in &mut self.values {
            if let Some(def) = registry.need(*id) {
                *value = (*value - def.decay_per_tick).clamp(NEED_MIN, NEED_MAX);
            }
        }
    }

    /// Raise a need; untracked needs are ignored
    pub fn satisfy(&mut self, need: NeedId, amount: f32) {
        if let Ok(i) = self.values.binary_search_by_key(&need, |(id, _)| *id) {
            let value = &mut self.values[i].1;
            *value = (*value + amount).clamp(NEED_MIN, NEED_MAX);
        }
    }

    /// (need, value) pairs in ascending need id order
    pub fn iter(&self) -> impl Iterator<Item = (NeedId, f32)> + '_ {
        self.values.iter().copied()
    }

    /// Lowest need value; ties go to the lower need id
    pub fn most_pressing(&self) -> Option<(NeedId, f32)> {
        self.values
            .iter()
            .copied()
            .min_by(|a, b| a.1.total_cmp(&b.1).then(a.0.cmp(&b.0)))
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// Severity band a need value currently sits in
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum NeedSeverity {
    Fine,
    Low,
    Critical,
}

pub fn severity(def: &NeedDef, value: f32) -> NeedSeverity {
    if def.critical.map(|t| value < t.below).unwrap_or(false) {
        NeedSeverity::Critical
    } else if def.low.map(|t| value < t.below).unwrap_or(false) {
        NeedSeverity::Low
    } else {
        NeedSeverity::Fine
    }
}

/// How urgently a need wants attention; 0 when at or above its seek threshold
///
/// Relative deficit below the seek threshold plus a bonus for active debuffs,
/// so a critical need always outranks a merely low one at equal deficit.
pub fn urgency(def: &NeedDef, value: f32) -> f32 {
    if value >= def.seek_threshold {
        return 0.0;
    }
    let deficit = (def.seek_threshold - value) / def.seek_threshold.max(1.0);
    let bonus = match severity(def, value) {
        NeedSeverity::Fine => 0.0,
        NeedSeverity::Low => 0.5,
        NeedSeverity::Critical => 1.0,
    };
    deficit + bonus
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::content::standard::{FUN, HUNGER, REST};

    #[test]
    fn test_initial_values_from_registry() {
        let registry = ContentRegistry::standard().unwrap();
        let needs = Needs::from_registry(&registry);
        assert_eq!(needs.len(), 4);
        assert_eq!(needs.get(HUNGER), Some(80.0));
    }

    #[test]
    fn test_decay_clamps_at_zero() {
        let registry = ContentRegistry::standard().unwrap();
        let mut needs = Needs::from_registry(&registry);
        needs.set(HUNGER, 0.01);
        needs.decay(&registry);
        assert_eq!(needs.get(HUNGER), Some(0.0));
    }

    #[test]
    fn test_satisfy_clamps_at_hundred() {
        let registry = ContentRegistry::standard().unwrap();
        let mut needs = Needs::from_registry(&registry);
        needs.satisfy(REST, 500.0);
        assert_eq!(needs.get(REST), Some(100.0));
    }

    #[test]
    fn test_most_pressing_prefers_lower_id_on_tie() {
        let registry = ContentRegistry::standard().unwrap();
        let mut needs = Needs::from_registry(&registry);
        needs.set(FUN, 10.0);
        needs.set(REST, 10.0);
        assert_eq!(needs.most_pressing(), Some((REST, 10.0)));
    }

    #[test]
    fn test_urgency_orders_by_severity() {
        let registry = ContentRegistry::standard().unwrap();
        let def = registry.need(HUNGER).unwrap();
        assert_eq!(urgency(def, 90.0), 0.0);
        let mild = urgency(def, 50.0);
        let low = urgency(def, 25.0);
        let critical = urgency(def, 5.0);
        assert!(mild > 0.0);
        assert!(low > mild + 0.4);
        assert!(critical > low);
        assert_eq!(severity(def, 5.0), NeedSeverity::Critical);
    }
}
