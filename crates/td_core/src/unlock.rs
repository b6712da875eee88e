//! Bonus tower unlock: achievement tracking and the persistence port.
//!
//! The unlock outlives a match, so the flag lives behind an injected
//! [`UnlockStore`]. The two achievements are evaluated once each, when the
//! wave they depend on completes, and cached for the rest of the match.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::towers::TowerKind;

/// Wave whose completion decides the no-damage achievement.
pub const NO_DAMAGE_WAVE: u32 = 5;

/// Wave whose completion decides the all-towers achievement.
pub const ALL_TOWERS_WAVE: u32 = 10;

/// Persistent storage for the bonus tower unlock.
pub trait UnlockStore {
    /// Whether the bonus tower has been unlocked in any earlier session.
    fn is_unlocked(&self) -> bool;

    /// Record the unlock. Called at most once per session.
    fn set_unlocked(&mut self);
}

/// In-memory store. Counts writes so tests can check idempotence.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MemoryUnlockStore {
    unlocked: bool,
    writes: u32,
}

impl MemoryUnlockStore {
    /// Store that starts out locked.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Store that starts out unlocked.
    #[must_use]
    pub fn unlocked() -> Self {
        Self {
            unlocked: true,
            writes: 0,
        }
    }

    /// Number of `set_unlocked` calls seen.
    #[must_use]
    pub fn writes(&self) -> u32 {
        self.writes
    }
}

impl UnlockStore for MemoryUnlockStore {
    fn is_unlocked(&self) -> bool {
        self.unlocked
    }

    fn set_unlocked(&mut self) {
        self.unlocked = true;
        self.writes += 1;
    }
}

impl<S: UnlockStore + ?Sized> UnlockStore for &mut S {
    fn is_unlocked(&self) -> bool {
        (**self).is_unlocked()
    }

    fn set_unlocked(&mut self) {
        (**self).set_unlocked();
    }
}

/// Per-match achievement state.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Achievements {
    /// No base damage taken by the end of wave 5. `None` until decided.
    pub wave5_no_damage: Option<bool>,
    /// Every base tower kind placed by the end of wave 10. `None` until
    /// decided.
    pub all_base_types_by_wave10: Option<bool>,
    /// Tower kinds placed at least once this match.
    pub placed_kinds: BTreeSet<TowerKind>,
}

impl Achievements {
    /// Remember that a tower of `kind` was placed.
    pub fn record_placement(&mut self, kind: TowerKind) {
        self.placed_kinds.insert(kind);
    }

    /// Decide any achievement whose wave has now completed.
    ///
    /// Already-decided achievements keep their cached value.
    pub fn on_wave_complete(&mut self, wave: u32, damage_taken: u32) {
        if self.wave5_no_damage.is_none() && wave >= NO_DAMAGE_WAVE {
            self.wave5_no_damage = Some(damage_taken == 0);
        }
        if self.all_base_types_by_wave10.is_none() && wave >= ALL_TOWERS_WAVE {
            let all = TowerKind::BASE
                .iter()
                .all(|kind| self.placed_kinds.contains(kind));
            self.all_base_types_by_wave10 = Some(all);
        }
    }

    /// Both achievements earned.
    #[must_use]
    pub fn earned(&self) -> bool {
        self.wave5_no_damage == Some(true) && self.all_base_types_by_wave10 == Some(true)
    }

    /// Write the unlock if it is earned and not yet stored.
    ///
    /// Returns `true` only on the call that performs the write.
    pub fn try_unlock(&self, store: &mut impl UnlockStore) -> bool {
        if !self.earned() || store.is_unlocked() {
            return false;
        }
        store.set_unlocked();
        true
    }
}
