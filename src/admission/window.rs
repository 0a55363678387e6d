//! Fixed-window request counter for a single identity

use parking_lot::Mutex;

/// Result of one admission attempt against a counter
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WindowSnapshot {
    pub admitted: bool,
    /// Burst capacity in effect (0 when misconfigured as non-positive)
    pub limit: u64,
    pub remaining: u64,
    /// Milliseconds until the current window rolls over
    pub resets_in_millis: u64,
}

impl WindowSnapshot {
    /// Whole seconds a rejected client should wait, never less than one
    pub fn retry_after_secs(&self) -> u64 {
        self.resets_in_millis.div_ceil(1000).max(1)
    }
}

#[derive(Debug)]
struct WindowState {
    window_start: u64,
    count: u64,
}

/// Per-identity counter. The read-reset-increment sequence runs under the
/// counter's own lock, so admissions for one identity are linearizable.
#[derive(Debug)]
pub struct WindowCounter {
    state: Mutex<WindowState>,
}

impl WindowCounter {
    pub fn new(now_millis: u64) -> Self {
        Self {
            state: Mutex::new(WindowState {
                window_start: now_millis,
                count: 0,
            }),
        }
    }

    /// Admit one request if the current window still has budget.
    ///
    /// A window that has been open for at least `window_millis` is reset in
    /// place before counting. A non-positive `capacity` never admits.
    pub fn try_acquire(&self, now_millis: u64, capacity: i64, window_millis: u64) -> WindowSnapshot {
        let limit = capacity.max(0) as u64;
        let mut state = self.state.lock();

        if now_millis.saturating_sub(state.window_start) >= window_millis {
            state.window_start = now_millis;
            state.count = 0;
        }

        let admitted = state.count < limit;
        if admitted {
            state.count += 1;
        }

        let elapsed = now_millis.saturating_sub(state.window_start);
        WindowSnapshot {
            admitted,
            limit,
            remaining: limit.saturating_sub(state.count),
            resets_in_millis: window_millis.saturating_sub(elapsed),
        }
    }

    /// Requests counted in the current window
    pub fn count(&self) -> u64 {
        self.state.lock().count
    }
}
