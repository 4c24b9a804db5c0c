// ── Bounded rate history ──
//
// Fixed-capacity FIFO per interface. Owned exclusively by that
// interface's poll task; readers get copies via `snapshot`, never a
// live view.

use std::collections::VecDeque;

use crate::model::RateSample;

/// Ring buffer of the most recent rate samples for one interface.
#[derive(Debug, Clone)]
pub struct InterfaceHistory {
    samples: VecDeque<RateSample>,
    capacity: usize,
}

impl InterfaceHistory {
    /// Capacity is clamped to at least one sample.
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            samples: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Append a sample, evicting the oldest when full. O(1) amortized.
    pub fn append(&mut self, sample: RateSample) {
        if self.samples.len() == self.capacity {
            self.samples.pop_front();
        }
        self.samples.push_back(sample);
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn latest(&self) -> Option<&RateSample> {
        self.samples.back()
    }

    /// Chronological copy, oldest first.
    pub fn snapshot(&self) -> Vec<RateSample> {
        self.samples.iter().copied().collect()
    }
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};

    use super::*;

    fn sample(seq: i64) -> RateSample {
        #[allow(clippy::cast_precision_loss, clippy::as_conversions)]
        let in_bps = seq as f64;
        RateSample::valid(
            Utc.timestamp_opt(1_700_000_000 + seq, 0).single().expect("timestamp"),
            in_bps,
            0.0,
        )
    }

    #[test]
    fn append_beyond_capacity_evicts_oldest() {
        let capacity = 5;
        let extra = 3;
        let mut history = InterfaceHistory::new(capacity);
        for i in 0..(capacity + extra) {
            history.append(sample(i64::try_from(i).expect("small index")));
        }

        assert_eq!(history.len(), capacity);
        let snap = history.snapshot();
        // The `extra` oldest entries are gone; order is chronological.
        assert!((snap[0].in_bps - 3.0).abs() < 1e-9);
        for pair in snap.windows(2) {
            assert!(pair[0].timestamp < pair[1].timestamp);
        }
    }

    #[test]
    fn latest_tracks_the_newest_sample() {
        let mut history = InterfaceHistory::new(4);
        assert!(history.latest().is_none());
        history.append(sample(1));
        history.append(sample(2));
        assert!((history.latest().expect("latest").in_bps - 2.0).abs() < 1e-9);
    }

    #[test]
    fn zero_capacity_is_clamped_to_one() {
        let mut history = InterfaceHistory::new(0);
        history.append(sample(1));
        history.append(sample(2));
        assert_eq!(history.len(), 1);
        assert!((history.snapshot()[0].in_bps - 2.0).abs() < 1e-9);
    }

    #[test]
    fn snapshot_is_a_copy_not_a_view() {
        let mut history = InterfaceHistory::new(4);
        history.append(sample(1));
        let snap = history.snapshot();
        history.append(sample(2));
        assert_eq!(snap.len(), 1);
    }
}
