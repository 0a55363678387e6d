//! Shared identity → counter registry with passive eviction

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use tracing::debug;

use super::{Clock, WindowCounter};

struct Slot {
    counter: Arc<WindowCounter>,
    last_access: AtomicU64,
}

impl Slot {
    fn new(now_millis: u64) -> Self {
        Self {
            counter: Arc::new(WindowCounter::new(now_millis)),
            last_access: AtomicU64::new(now_millis),
        }
    }

    fn touch(&self, now_millis: u64) {
        self.last_access.fetch_max(now_millis, Ordering::Relaxed);
    }

    fn last_access(&self) -> u64 {
        self.last_access.load(Ordering::Relaxed)
    }
}

/// Bounded, idle-evicting map from identity key to `WindowCounter`.
///
/// Insert-if-absent goes through the map's entry API, so concurrent first
/// requests for one identity always end up sharing a single counter.
/// Eviction only drops the map entry: callers already holding the counter
/// keep counting against it.
pub struct CounterRegistry {
    slots: DashMap<String, Slot>,
    max_size: usize,
    idle_timeout_millis: u64,
    clock: Arc<dyn Clock>,
}

impl CounterRegistry {
    pub fn new(max_size: usize, idle_timeout: Duration, clock: Arc<dyn Clock>) -> Self {
        Self {
            slots: DashMap::new(),
            max_size: max_size.max(1),
            idle_timeout_millis: idle_timeout.as_millis() as u64,
            clock,
        }
    }

    pub fn now_millis(&self) -> u64 {
        self.clock.now_millis()
    }

    /// Counter for `identity`, created on first use
    pub fn get_or_create(&self, identity: &str) -> Arc<WindowCounter> {
        let now = self.clock.now_millis();

        if let Some(slot) = self.slots.get(identity) {
            slot.touch(now);
            return slot.counter.clone();
        }

        if self.slots.len() >= self.max_size {
            self.make_room(now);
        }

        let slot = self
            .slots
            .entry(identity.to_string())
            .or_insert_with(|| Slot::new(now));
        slot.touch(now);
        slot.counter.clone()
    }

    /// Drop identities not seen within the idle timeout. Returns how many.
    pub fn evict_idle(&self) -> usize {
        let now = self.clock.now_millis();
        self.evict_idle_at(now)
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn contains(&self, identity: &str) -> bool {
        self.slots.contains_key(identity)
    }

    fn evict_idle_at(&self, now: u64) -> usize {
        let before = self.slots.len();
        let idle = self.idle_timeout_millis;
        self.slots
            .retain(|_, slot| now.saturating_sub(slot.last_access()) < idle);
        let evicted = before.saturating_sub(self.slots.len());
        if evicted > 0 {
            debug!(evicted, remaining = self.slots.len(), "Evicted idle rate-limit counters");
        }
        evicted
    }

    /// Bring the map back under its cap: idle entries first, then the least
    /// recently used down to 90% of capacity so the sort is not redone on
    /// every insert.
    fn make_room(&self, now: u64) {
        self.evict_idle_at(now);
        if self.slots.len() < self.max_size {
            return;
        }

        let target = self.max_size - self.max_size / 10 - 1;
        let mut by_age: Vec<(String, u64)> = self
            .slots
            .iter()
            .map(|entry| (entry.key().clone(), entry.value().last_access()))
            .collect();
        by_age.sort_unstable_by_key(|(_, last)| *last);

        let excess = by_age.len().saturating_sub(target);
        for (key, _) in by_age.into_iter().take(excess) {
            self.slots.remove(&key);
        }
        debug!(evicted = excess, "Registry at capacity, evicted least recently used counters");
    }
}
