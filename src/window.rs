//! Count-based sliding window over call outcomes.

use smallvec::SmallVec;

/// Ring buffer holding the outcome of the last N completed calls.
///
/// `true` marks a failure. The failure rate is undefined until the window
/// has collected a full N samples since the last reset; evaluating a
/// partial window would let one early failure read as a 100% rate.
pub(crate) struct SlidingWindow {
    slots: SmallVec<[bool; 32]>,
    capacity: usize,
    next: usize,
    filled: usize,
    failures: usize,
}

impl SlidingWindow {
    pub fn new(capacity: usize) -> Self {
        debug_assert!(capacity > 0);
        Self {
            slots: smallvec::smallvec![false; capacity],
            capacity,
            next: 0,
            filled: 0,
            failures: 0,
        }
    }

    /// Appends one completed-call outcome, evicting the oldest sample once
    /// the window is full.
    pub fn record(&mut self, failure: bool) {
        if self.filled == self.capacity {
            if self.slots[self.next] {
                self.failures -= 1;
            }
        } else {
            self.filled += 1;
        }

        self.slots[self.next] = failure;
        if failure {
            self.failures += 1;
        }
        self.next = (self.next + 1) % self.capacity;
    }

    /// Failure rate in percent over the most recent N samples, or `None`
    /// while the window is still filling.
    pub fn failure_rate(&self) -> Option<f64> {
        if self.filled < self.capacity {
            return None;
        }

        Some(self.failures as f64 / self.capacity as f64 * 100.0)
    }

    /// Number of samples currently held.
    pub fn samples(&self) -> usize {
        self.filled
    }

    /// Discards all samples; the rate becomes undefined again.
    pub fn reset(&mut self) {
        self.slots.iter_mut().for_each(|slot| *slot = false);
        self.next = 0;
        self.filled = 0;
        self.failures = 0;
    }
}
