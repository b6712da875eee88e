//! Wave composition and the spawn queue.
//!
//! Waves are generated by formula. Scripted waves are computed once into a
//! [`WaveTable`]; endless waves past the table keep scaling from the same
//! formula. Starting a wave expands its groups into a FIFO [`Spawner`]
//! queue that releases one enemy per spawn interval.

use std::collections::VecDeque;

use serde::{Deserialize, Serialize};

use crate::enemies::EnemyKind;

/// Wave at which each archetype in [`EnemyKind::ALL`] first appears.
pub const UNLOCK_WAVES: [u32; 6] = [1, 3, 6, 9, 12, 15];

/// A boss joins every wave divisible by this.
pub const BOSS_WAVE_INTERVAL: u32 = 5;

/// Endless counts grow by `1 / ENDLESS_SCALE_DIVISOR` of the base count per
/// wave past the scripted table.
pub const ENDLESS_SCALE_DIVISOR: u32 = 5;

/// A run of one archetype within a wave.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WaveGroup {
    /// Archetype.
    pub kind: EnemyKind,
    /// Number spawned.
    pub count: u32,
}

/// Contents of one wave.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WaveDefinition {
    /// Wave number, starting at 1.
    pub wave: u32,
    /// Groups in spawn order.
    pub groups: Vec<WaveGroup>,
    /// Boss appended after the groups, if any.
    pub boss: Option<EnemyKind>,
}

impl WaveDefinition {
    /// Compute the contents of `wave` given how many waves are scripted.
    #[must_use]
    pub fn generate(wave: u32, scripted_waves: u32) -> Self {
        let base_wave = wave.min(scripted_waves);
        let groups = EnemyKind::ALL
            .iter()
            .zip(UNLOCK_WAVES)
            .enumerate()
            .filter(|(_, (_, unlock))| base_wave >= *unlock)
            .map(|(tier, (&kind, unlock))| {
                let base = base_count(tier, base_wave, unlock);
                let count = if wave > scripted_waves {
                    base + base * (wave - scripted_waves) / ENDLESS_SCALE_DIVISOR
                } else {
                    base
                };
                WaveGroup { kind, count }
            })
            .collect();

        Self {
            wave,
            groups,
            boss: boss_for_wave(wave),
        }
    }

    /// Total enemies in the wave, boss included.
    #[must_use]
    pub fn enemy_count(&self) -> u32 {
        self.groups.iter().map(|g| g.count).sum::<u32>() + u32::from(self.boss.is_some())
    }

    /// Expand into spawn order: groups in order, then the boss.
    #[must_use]
    pub fn spawn_entries(&self) -> VecDeque<SpawnEntry> {
        let mut queue: VecDeque<SpawnEntry> = self
            .groups
            .iter()
            .flat_map(|group| {
                (0..group.count).map(move |_| SpawnEntry {
                    kind: group.kind,
                    is_boss: false,
                })
            })
            .collect();
        if let Some(kind) = self.boss {
            queue.push_back(SpawnEntry {
                kind,
                is_boss: true,
            });
        }
        queue
    }
}

fn base_count(tier: usize, wave: u32, unlock: u32) -> u32 {
    if tier == 0 {
        4 + 2 * (wave - unlock)
    } else {
        let divisor = u32::try_from(tier).unwrap_or(u32::MAX).saturating_add(2);
        ((wave - unlock + 1) * 6 / divisor).max(1)
    }
}

/// Boss archetype for `wave`: every fifth wave, stepping up one tier each
/// time and staying on the strongest once it is reached.
#[must_use]
pub fn boss_for_wave(wave: u32) -> Option<EnemyKind> {
    if wave == 0 || wave % BOSS_WAVE_INTERVAL != 0 {
        return None;
    }
    let last = EnemyKind::ALL.len() - 1;
    let index = usize::try_from(wave / BOSS_WAVE_INTERVAL - 1)
        .unwrap_or(last)
        .min(last);
    Some(EnemyKind::ALL[index])
}

/// Pre-generated scripted waves.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WaveTable {
    scripted: Vec<WaveDefinition>,
}

impl WaveTable {
    /// Generate waves `1..=scripted_waves`.
    #[must_use]
    pub fn new(scripted_waves: u32) -> Self {
        Self {
            scripted: (1..=scripted_waves)
                .map(|wave| WaveDefinition::generate(wave, scripted_waves))
                .collect(),
        }
    }

    /// Number of scripted waves.
    #[must_use]
    pub fn scripted_len(&self) -> u32 {
        u32::try_from(self.scripted.len()).unwrap_or(u32::MAX)
    }

    /// Definition for `wave`, generated on the fly past the table.
    #[must_use]
    pub fn definition(&self, wave: u32) -> WaveDefinition {
        wave.checked_sub(1)
            .and_then(|index| self.scripted.get(index as usize))
            .cloned()
            .unwrap_or_else(|| WaveDefinition::generate(wave, self.scripted_len()))
    }
}

/// One queued spawn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SpawnEntry {
    /// Archetype.
    pub kind: EnemyKind,
    /// Spawn as a boss.
    pub is_boss: bool,
}

/// FIFO spawn queue with a fixed cadence.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Spawner {
    queue: VecDeque<SpawnEntry>,
    timer: u32,
    interval: u32,
}

impl Spawner {
    /// Empty spawner releasing one entry every `interval` ticks.
    #[must_use]
    pub fn new(interval: u32) -> Self {
        Self {
            queue: VecDeque::new(),
            timer: 0,
            interval,
        }
    }

    /// Queue a wave. The timer resets so the first entry comes out on the
    /// next tick.
    pub fn load(&mut self, definition: &WaveDefinition) {
        self.queue.extend(definition.spawn_entries());
        self.timer = 0;
    }

    /// Entries still waiting.
    #[must_use]
    pub fn pending(&self) -> usize {
        self.queue.len()
    }

    /// Nothing left to spawn.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    /// Advance one tick, releasing an entry when the timer has run out.
    pub fn tick(&mut self) -> Option<SpawnEntry> {
        if self.queue.is_empty() {
            return None;
        }
        if self.timer > 0 {
            self.timer -= 1;
            return None;
        }
        self.timer = self.interval.saturating_sub(1);
        self.queue.pop_front()
    }
}
