use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct GameTick(pub u64);

#[derive(Debug, Clone)]
pub struct GameClock {
    tick_length: Duration,
    tick: GameTick,
}

impl GameClock {
    pub fn new(tick_length: Duration) -> Self {
        let tick_length = if tick_length.is_zero() {
            Duration::from_millis(1)
        } else {
            tick_length
        };
        Self {
            tick_length,
            tick: GameTick(0),
        }
    }

    pub fn tick_length(&self) -> Duration {
        self.tick_length
    }

    pub fn now(&self) -> GameTick {
        self.tick
    }

    pub fn advance(&mut self, ticks: u64) -> GameTick {
        self.tick.0 = self.tick.0.saturating_add(ticks);
        self.tick
    }

    pub fn advance_duration(&mut self, duration: Duration) -> GameTick {
        let ticks = self.ticks_from_duration_round_up(duration);
        self.advance(ticks)
    }

    pub fn ticks_from_duration_round_up(&self, duration: Duration) -> u64 {
        if duration.is_zero() {
            return 0;
        }
        let tick_nanos = self.tick_length.as_nanos().max(1);
        let duration_nanos = duration.as_nanos();
        let ticks = (duration_nanos + tick_nanos - 1) / tick_nanos;
        ticks.min(u64::MAX as u128) as u64
    }

    pub fn ticks_from_secs(&self, seconds: u64) -> u64 {
        self.ticks_from_duration_round_up(Duration::from_secs(seconds))
    }

    pub fn duration_for_ticks(&self, ticks: u64) -> Duration {
        let nanos = self
            .tick_length
            .as_nanos()
            .saturating_mul(ticks as u128)
            .min(u64::MAX as u128) as u64;
        Duration::from_nanos(nanos)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Cooldown {
    ready_at: GameTick,
}

impl Cooldown {
    pub fn new(ready_at: GameTick) -> Self {
        Self { ready_at }
    }

    pub fn from_ticks_from_now(clock: &GameClock, ticks: u64) -> Self {
        let ready_at = GameTick(clock.now().0.saturating_add(ticks));
        Self { ready_at }
    }

    pub fn from_duration_from_now(clock: &GameClock, duration: Duration) -> Self {
        let ticks = clock.ticks_from_duration_round_up(duration);
        Self::from_ticks_from_now(clock, ticks)
    }

    pub fn ready_at(&self) -> GameTick {
        self.ready_at
    }

    pub fn is_ready(&self, clock: &GameClock) -> bool {
        clock.now() >= self.ready_at
    }

    pub fn remaining_ticks(&self, clock: &GameClock) -> u64 {
        self.ready_at.0.saturating_sub(clock.now().0)
    }

    pub fn remaining_duration(&self, clock: &GameClock) -> Duration {
        clock.duration_for_ticks(self.remaining_ticks(clock))
    }

    /// Whole seconds left, rounded up so a running cooldown never reports zero.
    pub fn remaining_secs(&self, clock: &GameClock) -> u64 {
        let remaining = self.remaining_duration(clock);
        let secs = remaining.as_secs();
        if remaining.subsec_nanos() > 0 {
            secs + 1
        } else {
            secs
        }
    }
}

/// Long form used in player messages, e.g. "19 minutes 30 seconds".
pub fn format_duration_long(seconds: u64) -> String {
    let hours = seconds / 3_600;
    let minutes = (seconds % 3_600) / 60;
    let secs = seconds % 60;
    let mut parts = Vec::new();
    if hours > 0 {
        parts.push(plural(hours, "hour"));
    }
    if minutes > 0 {
        parts.push(plural(minutes, "minute"));
    }
    if secs > 0 || parts.is_empty() {
        parts.push(plural(secs, "second"));
    }
    parts.join(" ")
}

fn plural(value: u64, unit: &str) -> String {
    if value == 1 {
        format!("{value} {unit}")
    } else {
        format!("{value} {unit}s")
    }
}
