// ── Domain model ──
//
// Resolved targets and the immutable snapshot types the rendering
// layer consumes. Wire-side types (readings, identities, widths) are
// defined in ifpulse-snmp and re-exported from the crate root.

use std::sync::Arc;

use chrono::{DateTime, Utc};

use ifpulse_snmp::{CredentialIdentity, OperStatus, SnmpVersion};

use crate::config::InterfaceSpec;

/// One device-interface pair to poll. Immutable after resolution.
#[derive(Debug, Clone)]
pub struct Target {
    /// Unique key: `host:interface`. Doubles as the store key.
    pub key: String,
    /// Owning display group.
    pub group: String,
    pub host: String,
    pub port: u16,
    pub version: SnmpVersion,
    pub identity: CredentialIdentity,
    pub interface: InterfaceSpec,
    /// Human label for the device (falls back to the host).
    pub label: String,
}

/// One computed data point. Appended to history once, never mutated.
///
/// Invalid samples are recorded too — they render as gaps, keeping the
/// time axis honest across wraps, resets, and failed cycles.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RateSample {
    pub timestamp: DateTime<Utc>,
    /// Inbound bits/sec. Non-negative; meaningless when `!valid`.
    pub in_bps: f64,
    /// Outbound bits/sec. Non-negative; meaningless when `!valid`.
    pub out_bps: f64,
    pub valid: bool,
}

impl RateSample {
    pub fn valid(timestamp: DateTime<Utc>, in_bps: f64, out_bps: f64) -> Self {
        Self {
            timestamp,
            in_bps,
            out_bps,
            valid: true,
        }
    }

    /// A gap marker: no rate derivable for this cycle.
    pub fn invalid(timestamp: DateTime<Utc>) -> Self {
        Self {
            timestamp,
            in_bps: 0.0,
            out_bps: 0.0,
            valid: false,
        }
    }
}

/// Where a target currently is in its poll cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PollPhase {
    #[default]
    Idle,
    Polling,
}

/// Point-in-time, immutable view of one interface's polling state.
///
/// Published as `Arc<InterfaceSnapshot>` after every cycle; readers can
/// never observe a half-updated interface.
#[derive(Debug, Clone)]
pub struct InterfaceSnapshot {
    pub target_key: String,
    pub group: String,
    pub host: String,
    pub label: String,
    /// Resolved interface display name.
    pub interface_name: String,
    /// Operator-assigned ifAlias, if the device reports one.
    pub alias: Option<String>,
    /// Resolved ifIndex; `None` when name resolution failed.
    pub if_index: Option<u32>,
    /// Link speed in bits/sec from ifHighSpeed.
    pub speed_bps: Option<u64>,
    pub oper_status: OperStatus,
    pub latest: Option<RateSample>,
    /// Chronological history, oldest first.
    pub history: Vec<RateSample>,
    pub last_poll_succeeded: bool,
    pub poll_error: Option<String>,
    /// Ticks that fired while a previous poll was still in flight.
    pub missed_cycles: u64,
    pub phase: PollPhase,
    pub last_poll: Option<DateTime<Utc>>,
}

impl InterfaceSnapshot {
    /// Peak of in/out utilization against link speed, in percent.
    pub fn utilization_percent(&self) -> Option<f64> {
        let speed = self.speed_bps.filter(|s| *s > 0)?;
        let latest = self.latest.filter(|s| s.valid)?;
        #[allow(clippy::cast_precision_loss, clippy::as_conversions)]
        let speed = speed as f64;
        Some((latest.in_bps.max(latest.out_bps) / speed) * 100.0)
    }
}

/// One config group's interfaces, in config order.
#[derive(Debug, Clone)]
pub struct GroupSnapshot {
    pub name: String,
    pub interfaces: Vec<Arc<InterfaceSnapshot>>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snapshot(speed: Option<u64>, latest: Option<RateSample>) -> InterfaceSnapshot {
        InterfaceSnapshot {
            target_key: "r1:Ethernet1".into(),
            group: "core".into(),
            host: "r1".into(),
            label: "r1".into(),
            interface_name: "Ethernet1".into(),
            alias: None,
            if_index: Some(1),
            speed_bps: speed,
            oper_status: OperStatus::Up,
            latest,
            history: Vec::new(),
            last_poll_succeeded: true,
            poll_error: None,
            missed_cycles: 0,
            phase: PollPhase::Idle,
            last_poll: None,
        }
    }

    #[test]
    fn utilization_uses_peak_direction() {
        let sample = RateSample::valid(Utc::now(), 100_000_000.0, 400_000_000.0);
        let snap = snapshot(Some(1_000_000_000), Some(sample));
        let util = snap.utilization_percent().expect("utilization");
        assert!((util - 40.0).abs() < 1e-9);
    }

    #[test]
    fn utilization_absent_without_speed_or_valid_sample() {
        assert!(snapshot(None, Some(RateSample::valid(Utc::now(), 1.0, 1.0)))
            .utilization_percent()
            .is_none());
        assert!(snapshot(Some(1_000_000_000), Some(RateSample::invalid(Utc::now())))
            .utilization_percent()
            .is_none());
        assert!(snapshot(Some(0), Some(RateSample::valid(Utc::now(), 1.0, 1.0)))
            .utilization_percent()
            .is_none());
    }
}
