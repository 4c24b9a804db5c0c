#![allow(clippy::unwrap_used)]
// Integration tests for the poll scheduler, driven through a scripted
// CounterSource — no sockets involved.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::{TimeZone, Utc};

use ifpulse_core::poller::CounterSource;
use ifpulse_core::{
    CounterReading, CounterWidth, GlobalDefaults, GroupSpec, InterfaceReading, InterfaceSpec,
    InterfaceTable, MonitorConfig, OperStatus, Poller, SnmpError, Target, TargetSpec,
};

// ── Scripted source ─────────────────────────────────────────────────

/// Pops one pre-scripted result per read; exhausted scripts fail.
struct ScriptedSource {
    script: Mutex<VecDeque<Result<InterfaceReading, SnmpError>>>,
}

impl ScriptedSource {
    fn new(script: Vec<Result<InterfaceReading, SnmpError>>) -> Arc<Self> {
        Arc::new(Self {
            script: Mutex::new(script.into()),
        })
    }
}

impl CounterSource for ScriptedSource {
    async fn read_interface(
        &self,
        _target: &Target,
        _if_index: u32,
        _width: CounterWidth,
    ) -> Result<InterfaceReading, SnmpError> {
        self.script
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(SnmpError::Wire("script exhausted".into())))
    }

    async fn interface_table(&self, _target: &Target) -> Result<InterfaceTable, SnmpError> {
        Ok(InterfaceTable::default())
    }
}

fn reading(in_octets: u64, out_octets: u64, at_secs: i64) -> Result<InterfaceReading, SnmpError> {
    Ok(InterfaceReading {
        counters: CounterReading {
            in_octets,
            out_octets,
            width: CounterWidth::Bits64,
            timestamp: Utc.timestamp_opt(1_700_000_000 + at_secs, 0).single().unwrap(),
        },
        speed_bps: Some(1_000_000_000),
        oper_status: OperStatus::Up,
    })
}

/// One group, one device, one interface addressed by ifIndex.
fn single_target_config() -> MonitorConfig {
    MonitorConfig {
        defaults: GlobalDefaults {
            // Only the immediate startup tick fires during a test.
            interval: Duration::from_secs(3600),
            timeout: Duration::from_secs(5),
            max_history: 60,
            ..GlobalDefaults::default()
        },
        groups: vec![GroupSpec {
            name: "lab".into(),
            targets: vec![TargetSpec {
                host: "192.0.2.10".into(),
                label: Some("agg1".into()),
                version: None,
                community: None,
                port: None,
                credentials: None,
                interfaces: vec![InterfaceSpec::Index(1)],
            }],
        }],
        rate_policy: ifpulse_core::RatePolicy::default(),
    }
}

async fn wait_until(poller: &Poller, cond: impl Fn(&Poller) -> bool) {
    for _ in 0..300 {
        if cond(poller) {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("poller never reached expected state");
}

fn history_len(poller: &Poller) -> usize {
    poller.snapshot()[0].interfaces[0].history.len()
}

// ── Scenarios ───────────────────────────────────────────────────────

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn three_cycles_produce_invalid_then_rates() {
    // Counter sequence 1000, 2000, 3500 octets at 10s spacing:
    // first sample is the baseline (invalid), then 800 and 1200 bps.
    let source = ScriptedSource::new(vec![
        reading(1000, 0, 0),
        reading(2000, 0, 10),
        reading(3500, 0, 20),
    ]);
    let poller = Poller::start(single_target_config(), source).await;

    wait_until(&poller, |p| history_len(p) == 1).await;
    poller.poll_now().unwrap();
    wait_until(&poller, |p| history_len(p) == 2).await;
    poller.poll_now().unwrap();
    wait_until(&poller, |p| history_len(p) == 3).await;

    let groups = poller.snapshot();
    assert_eq!(groups.len(), 1);
    assert_eq!(groups[0].name, "lab");
    let iface = &groups[0].interfaces[0];

    assert_eq!(iface.history.len(), 3);
    assert!(!iface.history[0].valid);
    assert!(iface.history[1].valid);
    assert!((iface.history[1].in_bps - 800.0).abs() < 1e-9);
    assert!(iface.history[2].valid);
    assert!((iface.history[2].in_bps - 1200.0).abs() < 1e-9);
    assert!(iface.last_poll_succeeded);
    assert_eq!(iface.label, "agg1");
    assert_eq!(iface.speed_bps, Some(1_000_000_000));

    poller.shutdown().await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn failed_cycle_marks_target_and_next_cycle_recovers() {
    let source = ScriptedSource::new(vec![
        reading(1000, 0, 0),
        Err(SnmpError::Timeout {
            endpoint: "192.0.2.10:161".into(),
            timeout_secs: 5,
        }),
        reading(3000, 0, 20),
    ]);
    let poller = Poller::start(single_target_config(), source).await;

    wait_until(&poller, |p| history_len(p) == 1).await;

    // Failure: no sample appended, flag dropped, history kept stale.
    poller.poll_now().unwrap();
    wait_until(&poller, |p| !p.snapshot()[0].interfaces[0].last_poll_succeeded).await;
    let iface = poller.snapshot()[0].interfaces[0].clone();
    assert_eq!(iface.history.len(), 1);
    assert!(iface.poll_error.is_some());

    // Next cycle retries unconditionally and recovers. The delta spans
    // the failed cycle: 2000 octets over 20s = 800 bps.
    poller.poll_now().unwrap();
    wait_until(&poller, |p| history_len(p) == 2).await;
    let iface = poller.snapshot()[0].interfaces[0].clone();
    assert!(iface.last_poll_succeeded);
    assert!(iface.poll_error.is_none());
    assert!(iface.history[1].valid);
    assert!((iface.history[1].in_bps - 800.0).abs() < 1e-9);

    poller.shutdown().await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn agent_without_hc_counters_falls_back_to_32bit() {
    // First read (64-bit table) answers noSuchObject; the runner
    // retries the 32-bit table within the same cycle.
    let mut first = reading(1000, 0, 0);
    if let Ok(r) = &mut first {
        r.counters.width = CounterWidth::Bits32;
    }
    let mut second = reading(2000, 0, 10);
    if let Ok(r) = &mut second {
        r.counters.width = CounterWidth::Bits32;
    }
    let source = ScriptedSource::new(vec![
        Err(SnmpError::NoSuchObject {
            oid: "1.3.6.1.2.1.31.1.1.1.6.1".into(),
        }),
        first,
        second,
    ]);
    let poller = Poller::start(single_target_config(), source).await;

    wait_until(&poller, |p| history_len(p) == 1).await;
    poller.poll_now().unwrap();
    wait_until(&poller, |p| history_len(p) == 2).await;

    let iface = poller.snapshot()[0].interfaces[0].clone();
    assert!(iface.last_poll_succeeded);
    assert!(iface.history[1].valid);
    assert!((iface.history[1].in_bps - 800.0).abs() < 1e-9);

    poller.shutdown().await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn snapshot_preserves_group_and_interface_order() {
    let source = ScriptedSource::new(vec![
        reading(0, 0, 0),
        reading(0, 0, 0),
        reading(0, 0, 0),
    ]);
    let config = MonitorConfig {
        defaults: GlobalDefaults {
            interval: Duration::from_secs(3600),
            ..GlobalDefaults::default()
        },
        groups: vec![
            GroupSpec {
                name: "edge".into(),
                targets: vec![TargetSpec {
                    host: "192.0.2.1".into(),
                    label: None,
                    version: None,
                    community: None,
                    port: None,
                    credentials: None,
                    interfaces: vec![InterfaceSpec::Index(2), InterfaceSpec::Index(1)],
                }],
            },
            GroupSpec {
                name: "core".into(),
                targets: vec![TargetSpec {
                    host: "192.0.2.2".into(),
                    label: None,
                    version: None,
                    community: None,
                    port: None,
                    credentials: None,
                    interfaces: vec![InterfaceSpec::Index(9)],
                }],
            },
        ],
        rate_policy: ifpulse_core::RatePolicy::default(),
    };

    let poller = Poller::start(config, source).await;

    let groups = poller.snapshot();
    assert_eq!(
        groups.iter().map(|g| g.name.as_str()).collect::<Vec<_>>(),
        vec!["edge", "core"]
    );
    assert_eq!(
        groups[0]
            .interfaces
            .iter()
            .map(|i| i.target_key.as_str())
            .collect::<Vec<_>>(),
        vec!["192.0.2.1:if2", "192.0.2.1:if1"]
    );
    assert_eq!(groups[1].interfaces[0].target_key, "192.0.2.2:if9");

    poller.shutdown().await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn unresolvable_credentials_exclude_only_that_target() {
    let source = ScriptedSource::new(vec![reading(0, 0, 0)]);
    let mut config = single_target_config();
    // Second target demands v3 but has no credential block anywhere.
    config.groups[0].targets.push(TargetSpec {
        host: "192.0.2.99".into(),
        label: None,
        version: Some(ifpulse_core::SnmpVersion::V3),
        community: None,
        port: None,
        credentials: None,
        interfaces: vec![InterfaceSpec::Index(1)],
    });

    let poller = Poller::start(config, source).await;

    let groups = poller.snapshot();
    let keys: Vec<_> = groups[0]
        .interfaces
        .iter()
        .map(|i| i.target_key.as_str())
        .collect();
    assert_eq!(keys, vec!["192.0.2.10:if1"], "invalid target must be excluded");

    poller.shutdown().await;
}
