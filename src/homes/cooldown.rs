use crate::entities::player::PlayerId;
use crate::world::time::{Cooldown, GameClock};
use std::collections::HashMap;
use std::time::Duration;

/// Per-player, per-action cooldown windows.
pub trait CooldownLedger {
    /// Whole seconds until `action` is usable again, 0 when free.
    fn remaining_time(&self, player: PlayerId, action: &str) -> u64;
    /// Start or overwrite the window for `action`.
    fn commit(&mut self, player: PlayerId, action: &str, duration_seconds: u64);
    fn sync_clock(&mut self, _clock: &GameClock) {}
}

/// In-memory ledger driven by the game clock.
#[derive(Debug, Clone)]
pub struct CooldownBook {
    clock: GameClock,
    entries: HashMap<(PlayerId, String), Cooldown>,
}

impl CooldownBook {
    pub fn new(clock: &GameClock) -> Self {
        Self {
            clock: clock.clone(),
            entries: HashMap::new(),
        }
    }

    /// Drop windows that already ran out.
    pub fn purge_expired(&mut self) {
        let clock = &self.clock;
        self.entries.retain(|_, cooldown| !cooldown.is_ready(clock));
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl CooldownLedger for CooldownBook {
    fn remaining_time(&self, player: PlayerId, action: &str) -> u64 {
        self.entries
            .get(&(player, action.to_string()))
            .map_or(0, |cooldown| cooldown.remaining_secs(&self.clock))
    }

    fn commit(&mut self, player: PlayerId, action: &str, duration_seconds: u64) {
        let cooldown =
            Cooldown::from_duration_from_now(&self.clock, Duration::from_secs(duration_seconds));
        self.entries.insert((player, action.to_string()), cooldown);
    }

    fn sync_clock(&mut self, clock: &GameClock) {
        self.clock = clock.clone();
        self.purge_expired();
    }
}
