// SPDX-License-Identifier: MIT OR Apache-2.0

//! # Sliding Window Transition Counter
//!
//! Maintains the transition matrix over the last `W` observed transitions
//! across all cases, updated incrementally in O(1) per event.
//!
//! ```text
//!              push (prev, curr)                evict oldest
//!  event ──► buffer (FIFO, cap W) ──────────► (op, oc) once full
//!                │                                  │
//!                ▼ +1/W                             ▼ -1/W
//!             matrix[prev][curr]               matrix[op][oc]
//! ```
//!
//! Each transition contributes a fixed step of `1 / W`, so the matrix always
//! holds window-normalized weights: the total is `occupancy / W`, which is 1.0
//! once the window has filled. The counter starts in a warm-up phase (buffer
//! below capacity, nothing evicted) and permanently enters steady state when
//! the buffer first reaches capacity.
//!
//! ## Drift and resync
//!
//! The incremental step accumulates float rounding over long streams. Evictions
//! clamp at zero so no cell can go negative, and an optional resync interval
//! rebuilds the matrix exactly from the buffer contents every `k` applied
//! transitions for callers that need exact fidelity.

pub mod matrix;

pub use matrix::{MatrixSnapshot, SparseCell, TransitionMatrix};

use std::collections::VecDeque;

/// Incrementally maintained windowed transition matrix.
#[derive(Debug)]
pub struct SlidingWindowCounter {
    matrix: TransitionMatrix,
    buffer: VecDeque<(usize, usize)>,
    window_size: usize,
    step: f32,
    resync_interval: Option<u64>,
    applied: u64,
}

impl SlidingWindowCounter {
    /// Create a counter for a `class_count` x `class_count` matrix.
    ///
    /// `window_size` must be at least 1; pipeline configuration validates this
    /// before any counter is built. A zero `resync_interval` is treated as
    /// disabled, the same as `None`.
    pub fn new(class_count: usize, window_size: usize, resync_interval: Option<u64>) -> Self {
        debug_assert!(window_size >= 1);
        Self {
            matrix: TransitionMatrix::new(class_count),
            buffer: VecDeque::with_capacity(window_size),
            window_size,
            step: 1.0 / window_size as f32,
            resync_interval: resync_interval.filter(|interval| *interval > 0),
            applied: 0,
        }
    }

    /// Apply one transition: evict the oldest pair when at capacity, then add
    /// the new pair.
    pub fn apply(&mut self, prev: usize, curr: usize) {
        if self.buffer.len() == self.window_size {
            if let Some((old_prev, old_curr)) = self.buffer.pop_front() {
                self.matrix.decrement(old_prev, old_curr, self.step);
            }
        }

        self.buffer.push_back((prev, curr));
        self.matrix.increment(prev, curr, self.step);
        self.applied += 1;

        if let Some(interval) = self.resync_interval {
            if self.applied % interval == 0 {
                self.rebuild_from_buffer();
            }
        }
    }

    /// Whether the window has filled at least once.
    pub fn is_warm(&self) -> bool {
        self.buffer.len() == self.window_size
    }

    /// Transitions currently held in the window.
    pub fn occupancy(&self) -> usize {
        self.buffer.len()
    }

    pub fn window_size(&self) -> usize {
        self.window_size
    }

    /// Transitions applied since construction.
    pub fn applied(&self) -> u64 {
        self.applied
    }

    pub fn matrix(&self) -> &TransitionMatrix {
        &self.matrix
    }

    /// Recompute the matrix exactly from the buffered pairs, discarding any
    /// accumulated float drift.
    pub fn rebuild_from_buffer(&mut self) {
        self.matrix.zero();
        for &(prev, curr) in &self.buffer {
            self.matrix.increment(prev, curr, self.step);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // Power-of-two window sizes make 1/W exact in f32, so these tests can
    // assert equality instead of tolerances.

    #[test]
    fn test_warm_up_fills_without_eviction() {
        let mut counter = SlidingWindowCounter::new(4, 4, None);
        counter.apply(0, 1);
        counter.apply(1, 2);
        counter.apply(2, 3);
        assert!(!counter.is_warm());
        assert_eq!(counter.occupancy(), 3);
        assert_eq!(counter.matrix().total(), 0.75);

        counter.apply(3, 0);
        assert!(counter.is_warm());
        assert_eq!(counter.matrix().total(), 1.0);
    }

    #[test]
    fn test_eviction_moves_weight_between_cells() {
        let mut counter = SlidingWindowCounter::new(3, 2, None);
        counter.apply(0, 1);
        counter.apply(1, 2);
        assert_eq!(counter.matrix().get(0, 1), 0.5);
        assert_eq!(counter.matrix().get(1, 2), 0.5);

        // Third transition evicts (0, 1).
        counter.apply(2, 0);
        assert_eq!(counter.matrix().get(0, 1), 0.0);
        assert_eq!(counter.matrix().get(1, 2), 0.5);
        assert_eq!(counter.matrix().get(2, 0), 0.5);
        assert_eq!(counter.matrix().total(), 1.0);
    }

    #[test]
    fn test_repeated_transition_accumulates_weight() {
        let mut counter = SlidingWindowCounter::new(2, 4, None);
        for _ in 0..4 {
            counter.apply(0, 1);
        }
        assert_eq!(counter.matrix().get(0, 1), 1.0);

        // Eviction removes one step from the same cell the push adds to.
        counter.apply(0, 1);
        assert_eq!(counter.matrix().get(0, 1), 1.0);
    }

    #[test]
    fn test_weight_total_stays_one_in_steady_state() {
        let mut counter = SlidingWindowCounter::new(5, 8, None);
        for i in 0..100usize {
            counter.apply(i % 5, (i + 1) % 5);
            if counter.is_warm() {
                assert!((counter.matrix().total() - 1.0).abs() < 1e-5);
            }
        }
    }

    #[test]
    fn test_rebuild_matches_incremental_matrix() {
        let mut counter = SlidingWindowCounter::new(4, 8, None);
        for i in 0..50usize {
            counter.apply(i % 4, (i * 3 + 1) % 4);
        }

        let incremental = counter.matrix().clone();
        counter.rebuild_from_buffer();
        for row in 0..4 {
            for col in 0..4 {
                let drift = (incremental.get(row, col) - counter.matrix().get(row, col)).abs();
                assert!(drift < 1e-5, "cell ({row},{col}) drifted by {drift}");
            }
        }
    }

    #[test]
    fn test_resync_interval_removes_injected_drift() {
        let mut counter = SlidingWindowCounter::new(3, 4, Some(10));
        for _ in 0..9 {
            counter.apply(0, 1);
        }
        // Inject drift that an exact recount must erase.
        counter.matrix.increment(2, 2, 0.125);
        assert!(counter.matrix().get(2, 2) > 0.0);

        // The 10th apply triggers the rebuild.
        counter.apply(0, 1);
        assert_eq!(counter.matrix().get(2, 2), 0.0);
        assert_eq!(counter.matrix().get(0, 1), 1.0);
        assert_eq!(counter.applied(), 10);
    }

    #[test]
    fn test_zero_resync_interval_is_treated_as_disabled() {
        let mut counter = SlidingWindowCounter::new(3, 2, Some(0));
        counter.apply(0, 1);
        counter.apply(1, 2);

        assert_eq!(counter.applied(), 2);
        assert_eq!(counter.matrix().total(), 1.0);
    }

    #[test]
    fn test_window_of_one_replaces_previous_transition() {
        let mut counter = SlidingWindowCounter::new(3, 1, None);
        counter.apply(0, 1);
        assert!(counter.is_warm());
        assert_eq!(counter.matrix().get(0, 1), 1.0);

        counter.apply(1, 2);
        assert_eq!(counter.matrix().get(0, 1), 0.0);
        assert_eq!(counter.matrix().get(1, 2), 1.0);
    }
}
