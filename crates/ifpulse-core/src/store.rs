// ── Published snapshot store ──
//
// The handoff point between poll tasks and the rendering layer. Each
// poll task publishes a complete, immutable `Arc<InterfaceSnapshot>`
// per cycle; readers pull whole snapshots and can never observe a
// torn update. A watch channel carries a version counter so the TUI
// can sleep until something actually changed.

use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::watch;

use crate::model::InterfaceSnapshot;

pub struct StatStore {
    snapshots: DashMap<String, Arc<InterfaceSnapshot>>,
    version: watch::Sender<u64>,
}

impl StatStore {
    pub(crate) fn new() -> Self {
        let (version, _) = watch::channel(0u64);
        Self {
            snapshots: DashMap::new(),
            version,
        }
    }

    /// Replace one interface's snapshot and notify subscribers.
    pub(crate) fn publish(&self, snapshot: InterfaceSnapshot) {
        self.snapshots
            .insert(snapshot.target_key.clone(), Arc::new(snapshot));
        // send_modify updates even with zero receivers.
        self.version.send_modify(|v| *v += 1);
    }

    /// Current snapshot for one interface key.
    pub fn get(&self, target_key: &str) -> Option<Arc<InterfaceSnapshot>> {
        self.snapshots.get(target_key).map(|r| Arc::clone(r.value()))
    }

    pub fn len(&self) -> usize {
        self.snapshots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.snapshots.is_empty()
    }

    /// Subscribe to change notifications (monotonic version counter).
    pub fn subscribe(&self) -> watch::Receiver<u64> {
        self.version.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use ifpulse_snmp::OperStatus;

    use super::*;
    use crate::model::{PollPhase, RateSample};

    fn snapshot(key: &str, in_bps: f64) -> InterfaceSnapshot {
        InterfaceSnapshot {
            target_key: key.into(),
            group: "lab".into(),
            host: "r1".into(),
            label: "r1".into(),
            interface_name: "Ethernet1".into(),
            alias: None,
            if_index: Some(1),
            speed_bps: None,
            oper_status: OperStatus::Up,
            latest: Some(RateSample::valid(Utc::now(), in_bps, 0.0)),
            history: Vec::new(),
            last_poll_succeeded: true,
            poll_error: None,
            missed_cycles: 0,
            phase: PollPhase::Idle,
            last_poll: None,
        }
    }

    #[test]
    fn publish_replaces_and_bumps_version() {
        let store = StatStore::new();
        let rx = store.subscribe();
        assert_eq!(*rx.borrow(), 0);

        store.publish(snapshot("r1:Ethernet1", 100.0));
        store.publish(snapshot("r1:Ethernet1", 200.0));

        assert_eq!(store.len(), 1);
        assert_eq!(*rx.borrow(), 2);
        let latest = store.get("r1:Ethernet1").expect("snapshot");
        assert!((latest.latest.expect("sample").in_bps - 200.0).abs() < 1e-9);
    }

    #[test]
    fn readers_keep_their_arc_across_republish() {
        let store = StatStore::new();
        store.publish(snapshot("r1:Ethernet1", 100.0));
        let held = store.get("r1:Ethernet1").expect("snapshot");

        store.publish(snapshot("r1:Ethernet1", 999.0));
        // The old snapshot is unchanged in the reader's hands.
        assert!((held.latest.expect("sample").in_bps - 100.0).abs() < 1e-9);
    }
}
