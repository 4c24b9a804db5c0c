// ── Counter-delta to rate conversion ──
//
// Two timestamped counter readings in, one rate sample out. The tricky
// part is telling three stories apart from the same signal (the counter
// went "backwards"):
//
//   - a reordered or duplicated read: tiny decrement, invalid sample
//   - a genuine wrap: huge decrement, modular delta is the truth
//   - a device reset: the modular delta implies an impossible rate
//
// Thresholds come from `RatePolicy` — they are tuning knobs for the
// device population, not protocol constants.

use tracing::debug;

use ifpulse_snmp::CounterReading;

use crate::config::RatePolicy;
use crate::model::RateSample;

/// Stateless rate calculator; per-target baselines live in PollState.
#[derive(Debug, Clone, Copy)]
pub struct RateCalculator {
    policy: RatePolicy,
}

impl RateCalculator {
    pub fn new(policy: RatePolicy) -> Self {
        Self { policy }
    }

    /// Compute the rate sample for `current` against the previous
    /// baseline. With no baseline (first poll) the sample is invalid —
    /// there is no interval to derive a rate from yet. The caller
    /// always replaces its baseline with `current` afterwards,
    /// whatever the outcome, so one bad reading never poisons the next
    /// delta.
    pub fn compute(&self, previous: Option<&CounterReading>, current: &CounterReading) -> RateSample {
        let Some(prev) = previous else {
            return RateSample::invalid(current.timestamp);
        };

        #[allow(clippy::cast_precision_loss, clippy::as_conversions)]
        let elapsed = (current.timestamp - prev.timestamp).num_milliseconds() as f64 / 1000.0;
        if elapsed <= 0.0 {
            debug!(elapsed, "clock did not advance between samples");
            return RateSample::invalid(current.timestamp);
        }

        let range = current.width.range();
        let in_bps = self.direction_rate(prev.in_octets, current.in_octets, range, elapsed);
        let out_bps = self.direction_rate(prev.out_octets, current.out_octets, range, elapsed);

        match (in_bps, out_bps) {
            (Some(in_bps), Some(out_bps)) => {
                RateSample::valid(current.timestamp, in_bps, out_bps)
            }
            _ => RateSample::invalid(current.timestamp),
        }
    }

    /// Classify one direction's delta, returning its rate in bits/sec
    /// or `None` when the pair is anomalous (reorder, reset, spike).
    #[allow(clippy::cast_precision_loss, clippy::as_conversions)]
    fn direction_rate(&self, prev: u64, cur: u64, range: f64, elapsed: f64) -> Option<f64> {
        let delta = if cur >= prev {
            (cur - prev) as f64
        } else {
            let decrement = (prev - cur) as f64;
            if decrement < range * self.policy.reorder_guard_fraction {
                // Small backwards step: a reordered or duplicated read,
                // not a wrap. Wrapping it would fabricate a huge spike.
                debug!(decrement, "small counter decrement, dropping sample");
                return None;
            }
            // Modular delta across the wrap point.
            range - (prev as f64) + (cur as f64)
        };

        let rate = delta * 8.0 / elapsed;
        if rate > self.policy.max_rate_bps {
            // Beyond any plausible link speed: a reset (or a wrap that
            // is really a reset). Render a gap, never a spike.
            debug!(rate, ceiling = self.policy.max_rate_bps, "rate above sanity ceiling");
            return None;
        }
        Some(rate)
    }
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, TimeZone, Utc};

    use ifpulse_snmp::CounterWidth;

    use super::*;

    fn calc() -> RateCalculator {
        RateCalculator::new(RatePolicy::default())
    }

    fn reading(in_octets: u64, out_octets: u64, width: CounterWidth, at_secs: i64) -> CounterReading {
        CounterReading {
            in_octets,
            out_octets,
            width,
            timestamp: Utc.timestamp_opt(1_700_000_000 + at_secs, 0).single().expect("timestamp"),
        }
    }

    #[test]
    fn first_poll_yields_invalid_baseline() {
        let cur = reading(1000, 500, CounterWidth::Bits64, 0);
        let sample = calc().compute(None, &cur);
        assert!(!sample.valid);
        assert_eq!(sample.timestamp, cur.timestamp);
    }

    #[test]
    fn steady_counters_yield_the_textbook_rate() {
        let prev = reading(1000, 2000, CounterWidth::Bits64, 0);
        let cur = reading(2000, 4500, CounterWidth::Bits64, 10);
        let sample = calc().compute(Some(&prev), &cur);
        assert!(sample.valid);
        assert!((sample.in_bps - 800.0).abs() < 1e-9); // 1000 octets * 8 / 10s
        assert!((sample.out_bps - 2000.0).abs() < 1e-9); // 2500 octets * 8 / 10s
    }

    #[test]
    fn elapsed_zero_or_negative_is_invalid() {
        let prev = reading(1000, 1000, CounterWidth::Bits64, 10);
        let same = reading(2000, 2000, CounterWidth::Bits64, 10);
        assert!(!calc().compute(Some(&prev), &same).valid);

        let earlier = reading(2000, 2000, CounterWidth::Bits64, 5);
        assert!(!calc().compute(Some(&prev), &earlier).valid);
    }

    #[test]
    fn wraparound_32bit_produces_modular_rate_not_spike() {
        // previous = 2^32 - 100, current = 50, elapsed = 10s
        // modular delta = 150 octets => 120 bits/sec
        let prev = reading(u64::from(u32::MAX) - 99, 0, CounterWidth::Bits32, 0);
        let cur = reading(50, 0, CounterWidth::Bits32, 10);
        let sample = calc().compute(Some(&prev), &cur);
        assert!(sample.valid);
        assert!((sample.in_bps - 120.0).abs() < 1e-9);
        assert!(sample.in_bps >= 0.0);
    }

    #[test]
    fn device_reset_is_invalid_not_a_fabricated_spike() {
        // 64-bit counter drops from 9e9 to 500: far too small a
        // decrement to be a wrap of an 18-quintillion range.
        let prev = reading(9_000_000_000, 9_000_000_000, CounterWidth::Bits64, 0);
        let cur = reading(500, 500, CounterWidth::Bits64, 10);
        let sample = calc().compute(Some(&prev), &cur);
        assert!(!sample.valid);
    }

    #[test]
    fn rate_above_ceiling_is_invalid() {
        // 200 Gbit/s over 10s on a forward delta — reset artifact.
        let prev = reading(0, 0, CounterWidth::Bits64, 0);
        let cur = reading(250_000_000_000, 0, CounterWidth::Bits64, 10);
        let sample = calc().compute(Some(&prev), &cur);
        assert!(!sample.valid);
    }

    #[test]
    fn one_bad_direction_invalidates_the_sample() {
        // Inbound fine, outbound went slightly backwards (reorder).
        let prev = reading(1000, 5000, CounterWidth::Bits64, 0);
        let cur = reading(2000, 4990, CounterWidth::Bits64, 10);
        let sample = calc().compute(Some(&prev), &cur);
        assert!(!sample.valid);
    }

    #[test]
    fn sub_second_intervals_use_fractional_elapsed() {
        let prev = reading(0, 0, CounterWidth::Bits64, 0);
        let mut cur = reading(125, 0, CounterWidth::Bits64, 0);
        cur.timestamp = prev.timestamp + Duration::milliseconds(500);
        let sample = calc().compute(Some(&prev), &cur);
        assert!(sample.valid);
        assert!((sample.in_bps - 2000.0).abs() < 1e-9); // 125 * 8 / 0.5
    }
}
