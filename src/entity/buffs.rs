//! Mood modifiers: need-tied debuffs and time-boxed action buffs

use serde::{Deserialize, Serialize};

use crate::core::types::{BuffId, EntityId, NeedId};

pub const MOOD_MIN: f32 = -100.0;
pub const MOOD_MAX: f32 = 100.0;

/// What applied a buff
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BuffSource {
    /// A need below one of its thresholds
    Need(NeedId),
    /// A completed interaction with this building
    Object(EntityId),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BuffDuration {
    /// Expires when the countdown reaches zero
    Ticks(u32),
    /// Lives exactly as long as its need stays below threshold
    TiedToNeed,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActiveBuff {
    pub buff: BuffId,
    pub source: BuffSource,
    pub remaining: BuffDuration,
    pub mood_offset: f32,
}

/// Active buffs of one pawn, in application order
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BuffSet {
    active: Vec<ActiveBuff>,
}

impl BuffSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Grant a timed buff; re-granting the same buff from the same source
    /// restarts its countdown instead of stacking
    pub fn grant_timed(&mut self, buff: BuffId, source: BuffSource, ticks: u32, mood_offset: f32) {
        if ticks == 0 {
            return;
        }
        if let Some(existing) = self
            .active
            .iter_mut()
            .find(|b| b.buff == buff && b.source == source)
        {
            existing.remaining = BuffDuration::Ticks(ticks);
            existing.mood_offset = mood_offset;
            return;
        }
        self.active.push(ActiveBuff {
            buff,
            source,
            remaining: BuffDuration::Ticks(ticks),
            mood_offset,
        });
    }

    /// Ensure a need-tied buff is present exactly when `active` is true
    pub fn set_need_buff(&mut self, need: NeedId, buff: BuffId, mood_offset: f32, active: bool) {
        let source = BuffSource::Need(need);
        let position = self
            .active
            .iter()
            .position(|b| b.buff == buff && b.source == source);
        match (position, active) {
            (None, true) => self.active.push(ActiveBuff {
                buff,
                source,
                remaining: BuffDuration::TiedToNeed,
                mood_offset,
            }),
            (Some(i), false) => {
                self.active.remove(i);
            }
            _ => {}
        }
    }

    /// Count down timed buffs and drop the expired ones
    pub fn tick(&mut self) {
        for buff in &mut self.active {
            if let BuffDuration::Ticks(remaining) = &mut buff.remaining {
                *remaining = remaining.saturating_sub(1);
            }
        }
        self.active
            .retain(|b| !matches!(b.remaining, BuffDuration::Ticks(0)));
    }

    /// Sum of active offsets, clamped to [-100, 100]
    pub fn mood(&self) -> f32 {
        self.active
            .iter()
            .map(|b| b.mood_offset)
            .sum::<f32>()
            .clamp(MOOD_MIN, MOOD_MAX)
    }

    pub fn contains(&self, buff: BuffId) -> bool {
        self.active.iter().any(|b| b.buff == buff)
    }

    pub fn iter(&self) -> impl Iterator<Item = &ActiveBuff> {
        self.active.iter()
    }

    pub fn len(&self) -> usize {
        self.active.len()
    }

    pub fn is_empty(&self) -> bool {
        self.active.is_empty()
    }
}
