use std::cmp::Ordering;
use std::collections::{BinaryHeap, HashMap};
use crate::world::time::GameTick;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CronHandle(pub u64);

/// Heap entry for a one-shot deferred task
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
struct CronEntry {
    handle: CronHandle,
    target: GameTick,
}

/// Min-heap by target tick, then by scheduling order
impl Ord for CronEntry {
    fn cmp(&self, other: &Self) -> Ordering {
        // BinaryHeap is a max-heap
        other
            .target
            .cmp(&self.target)
            .then_with(|| other.handle.0.cmp(&self.handle.0))
    }
}

impl PartialOrd for CronEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// One-shot deferred tasks ordered by the tick they become due.
///
/// Tasks scheduled for the same tick fire in the order they were scheduled.
#[derive(Debug)]
pub struct Cron<T> {
    heap: BinaryHeap<CronEntry>,
    tasks: HashMap<CronHandle, (GameTick, T)>,
    next_handle: u64,
}

impl<T> Default for Cron<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Cron<T> {
    pub fn new() -> Self {
        Cron {
            heap: BinaryHeap::new(),
            tasks: HashMap::new(),
            next_handle: 1,
        }
    }

    /// Schedule `task` to become due `delay` ticks after `now`
    pub fn schedule(&mut self, now: GameTick, delay: u64, task: T) -> CronHandle {
        let handle = CronHandle(self.next_handle);
        self.next_handle += 1;
        let target = GameTick(now.0.saturating_add(delay));
        self.tasks.insert(handle, (target, task));
        self.heap.push(CronEntry { handle, target });
        handle
    }

    /// Pop the next task that is due at `now`, if any
    pub fn pop_ready(&mut self, now: GameTick) -> Option<T> {
        loop {
            let entry = *self.heap.peek()?;
            if !self.tasks.contains_key(&entry.handle) {
                // cancelled
                self.heap.pop();
                continue;
            }
            if entry.target > now {
                return None;
            }
            self.heap.pop();
            return self.tasks.remove(&entry.handle).map(|(_, task)| task);
        }
    }

    /// Drop a task before it fires; returns it when it was still pending
    pub fn cancel(&mut self, handle: CronHandle) -> Option<T> {
        self.tasks.remove(&handle).map(|(_, task)| task)
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cron_fires_in_target_order() {
        let mut cron = Cron::new();
        let now = GameTick(1000);

        cron.schedule(now, 10, "late");
        cron.schedule(now, 5, "early");
        assert_eq!(cron.len(), 2);

        assert_eq!(cron.pop_ready(GameTick(1004)), None);
        assert_eq!(cron.pop_ready(GameTick(1005)), Some("early"));
        assert_eq!(cron.pop_ready(GameTick(1009)), None);
        assert_eq!(cron.pop_ready(GameTick(1010)), Some("late"));
        assert!(cron.is_empty());
    }

    #[test]
    fn cron_same_tick_keeps_scheduling_order() {
        let mut cron = Cron::new();
        let now = GameTick(0);
        cron.schedule(now, 5, 1);
        cron.schedule(now, 5, 2);
        cron.schedule(now, 5, 3);

        let mut ready = Vec::new();
        while let Some(task) = cron.pop_ready(GameTick(5)) {
            ready.push(task);
        }
        assert_eq!(ready, vec![1, 2, 3]);
    }

    #[test]
    fn cron_cancel_skips_task() {
        let mut cron = Cron::new();
        let now = GameTick(0);
        let first = cron.schedule(now, 1, "first");
        cron.schedule(now, 2, "second");

        assert_eq!(cron.cancel(first), Some("first"));
        assert_eq!(cron.cancel(first), None);
        assert_eq!(cron.len(), 1);
        assert_eq!(cron.pop_ready(GameTick(1)), None);
        assert_eq!(cron.pop_ready(GameTick(2)), Some("second"));
    }

    #[test]
    fn cron_zero_delay_is_due_immediately() {
        let mut cron = Cron::new();
        cron.schedule(GameTick(7), 0, "now");
        assert_eq!(cron.pop_ready(GameTick(7)), Some("now"));
    }
}
