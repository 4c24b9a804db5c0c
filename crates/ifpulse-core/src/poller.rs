// ── Poll scheduler ──
//
// One tick broadcaster, one owning task per target. A target task polls
// inline when the tick sequence advances, so overlapping polls for the
// same target are impossible by construction; ticks that fire while a
// poll is in flight collapse in the watch channel and the observed
// sequence gap becomes the missed-cycle count. Across targets nothing
// is ordered — each task runs its own cycle independently.

use std::collections::{HashMap, HashSet};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use tokio::sync::{Mutex, watch};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use ifpulse_snmp::{
    CounterReading, CounterWidth, InterfaceReading, InterfaceTable, OperStatus, SessionKey,
    SnmpClient, SnmpError,
};

use crate::config::{InterfaceSpec, MonitorConfig};
use crate::error::CoreError;
use crate::history::InterfaceHistory;
use crate::model::{GroupSnapshot, InterfaceSnapshot, PollPhase, Target};
use crate::rate::RateCalculator;
use crate::resolve;
use crate::store::StatStore;

/// How long shutdown waits for in-flight reads before abandoning them.
const SHUTDOWN_GRACE: Duration = Duration::from_secs(2);

/// The read side of the transport, seen from the scheduler.
///
/// The production implementation is [`SnmpClient`]; tests drive the
/// full poll path through scripted implementations.
pub trait CounterSource: Send + Sync + 'static {
    /// Read counters, speed, and oper-status for one interface.
    fn read_interface(
        &self,
        target: &Target,
        if_index: u32,
        width: CounterWidth,
    ) -> impl Future<Output = Result<InterfaceReading, SnmpError>> + Send;

    /// Walk the interface naming tables of the target's device.
    fn interface_table(
        &self,
        target: &Target,
    ) -> impl Future<Output = Result<InterfaceTable, SnmpError>> + Send;

    /// Release transport resources on shutdown.
    fn teardown(&self) {}
}

impl CounterSource for SnmpClient {
    async fn read_interface(
        &self,
        target: &Target,
        if_index: u32,
        width: CounterWidth,
    ) -> Result<InterfaceReading, SnmpError> {
        SnmpClient::read_interface(
            self,
            &target.host,
            target.port,
            target.version,
            &target.identity,
            if_index,
            width,
        )
        .await
    }

    async fn interface_table(&self, target: &Target) -> Result<InterfaceTable, SnmpError> {
        SnmpClient::interface_table(self, &target.host, target.port, target.version, &target.identity)
            .await
    }

    fn teardown(&self) {
        self.shutdown();
    }
}

// ── Poller ───────────────────────────────────────────────────────────

/// The main entry point for consumers.
///
/// Cheaply cloneable. [`start()`](Self::start) resolves targets, runs
/// interface discovery, and spawns the background tasks;
/// [`snapshot()`](Self::snapshot) can be called at any time without
/// blocking the scheduler.
#[derive(Clone)]
pub struct Poller {
    inner: Arc<PollerInner>,
}

struct PollerInner {
    store: Arc<StatStore>,
    /// Group name → target keys, in config order.
    layout: IndexMap<String, Vec<String>>,
    interval: Duration,
    manual_tx: watch::Sender<u64>,
    cancel: CancellationToken,
    handles: Mutex<Vec<JoinHandle<()>>>,
    /// Drops transport resources once all tasks are done or abandoned.
    teardown: Box<dyn Fn() + Send + Sync>,
}

impl Poller {
    /// Resolve all configured targets, discover interface indexes, and
    /// start polling.
    ///
    /// A target whose credentials fail resolution is logged and
    /// excluded; the rest of the schedule proceeds. Never fails as a
    /// whole.
    pub async fn start<S: CounterSource>(config: MonitorConfig, source: Arc<S>) -> Self {
        let store = Arc::new(StatStore::new());

        if config.defaults.timeout >= config.defaults.interval {
            warn!(
                timeout_secs = config.defaults.timeout.as_secs(),
                interval_secs = config.defaults.interval.as_secs(),
                "read timeout is not shorter than the poll interval"
            );
        }

        // ── Resolve every device-interface pair ──────────────────
        let mut layout: IndexMap<String, Vec<String>> = IndexMap::new();
        let mut targets: Vec<Target> = Vec::new();
        let mut seen_keys: HashSet<String> = HashSet::new();

        for group in &config.groups {
            let keys = layout.entry(group.name.clone()).or_default();
            for spec in &group.targets {
                for interface in &spec.interfaces {
                    match resolve::resolve_target(&config.defaults, spec, interface, &group.name) {
                        Ok(target) => {
                            if !seen_keys.insert(target.key.clone()) {
                                warn!(key = %target.key, "duplicate target, keeping first");
                                continue;
                            }
                            keys.push(target.key.clone());
                            targets.push(target);
                        }
                        Err(e) => {
                            error!(error = %e, "target excluded from schedule");
                        }
                    }
                }
            }
        }

        // ── One discovery walk per distinct device ───────────────
        let mut reps: HashMap<SessionKey, Target> = HashMap::new();
        for target in &targets {
            let key = SessionKey::new(&target.host, target.port, target.version, &target.identity);
            reps.entry(key).or_insert_with(|| target.clone());
        }
        let tables: HashMap<SessionKey, Result<InterfaceTable, SnmpError>> = {
            let walks = reps.iter().map(|(key, rep)| {
                let source = Arc::clone(&source);
                let key = key.clone();
                let rep = rep.clone();
                async move {
                    info!(host = %rep.host, "resolving interfaces");
                    let result = source.interface_table(&rep).await;
                    (key, result)
                }
            });
            futures_util::future::join_all(walks).await.into_iter().collect()
        };

        // ── Spawn one owning task per target ─────────────────────
        let (tick_tx, _) = watch::channel(0u64);
        let (manual_tx, _) = watch::channel(0u64);
        let cancel = CancellationToken::new();
        let calc = RateCalculator::new(config.rate_policy);
        let mut handles = Vec::new();

        for target in targets {
            let session_key =
                SessionKey::new(&target.host, target.port, target.version, &target.identity);
            let (if_index, name, alias, resolve_error) =
                resolve_interface(&target, tables.get(&session_key));

            let runner = TargetRunner {
                source: Arc::clone(&source),
                store: Arc::clone(&store),
                calc,
                target,
                if_index,
                interface_name: name,
                alias,
                width: CounterWidth::Bits64,
                baseline: None,
                history: InterfaceHistory::new(config.defaults.max_history),
                speed_bps: None,
                oper_status: OperStatus::Unknown,
                last_poll: None,
                last_poll_succeeded: resolve_error.is_none(),
                poll_error: resolve_error,
                missed_cycles: 0,
                phase: PollPhase::Idle,
            };
            // Publish the pre-poll state synchronously so the first
            // snapshot() already shows every configured interface.
            runner.publish();

            handles.push(tokio::spawn(runner.run(
                tick_tx.subscribe(),
                manual_tx.subscribe(),
                cancel.child_token(),
            )));
        }

        handles.push(tokio::spawn(tick_task(
            tick_tx,
            config.defaults.interval,
            cancel.child_token(),
        )));

        info!(
            targets = store.len(),
            interval_secs = config.defaults.interval.as_secs(),
            "poller started"
        );

        let teardown_source = Arc::clone(&source);
        Self {
            inner: Arc::new(PollerInner {
                store,
                layout,
                interval: config.defaults.interval,
                manual_tx,
                cancel,
                handles: Mutex::new(handles),
                teardown: Box::new(move || teardown_source.teardown()),
            }),
        }
    }

    /// Trigger an immediate poll of all idle targets, out of band of
    /// the tick clock. Does not reset the tick clock; targets already
    /// mid-poll simply continue.
    pub fn poll_now(&self) -> Result<(), CoreError> {
        if self.inner.cancel.is_cancelled() {
            return Err(CoreError::ShuttingDown);
        }
        self.inner.manual_tx.send_modify(|v| *v += 1);
        Ok(())
    }

    /// Point-in-time view of every interface, grouped in config order.
    pub fn snapshot(&self) -> Vec<GroupSnapshot> {
        self.inner
            .layout
            .iter()
            .map(|(name, keys)| GroupSnapshot {
                name: name.clone(),
                interfaces: keys
                    .iter()
                    .filter_map(|key| self.inner.store.get(key))
                    .collect(),
            })
            .collect()
    }

    /// (total devices, devices whose interfaces all polled clean).
    pub fn device_counts(&self) -> (usize, usize) {
        let mut hosts = HashSet::new();
        let mut unhealthy = HashSet::new();
        for group in self.snapshot() {
            for iface in group.interfaces {
                hosts.insert(iface.host.clone());
                if iface.poll_error.is_some() || !iface.last_poll_succeeded {
                    unhealthy.insert(iface.host.clone());
                }
            }
        }
        (hosts.len(), hosts.len() - unhealthy.len())
    }

    /// Subscribe to store change notifications.
    pub fn subscribe(&self) -> watch::Receiver<u64> {
        self.inner.store.subscribe()
    }

    /// Configured poll cadence.
    pub fn interval(&self) -> Duration {
        self.inner.interval
    }

    /// Stop polling: cancel all tasks, wait out the grace period, then
    /// tear down the transport. In-flight reads that outlive the grace
    /// period are abandoned, not awaited.
    pub async fn shutdown(&self) {
        self.inner.cancel.cancel();

        let drained: Vec<JoinHandle<()>> = {
            let mut handles = self.inner.handles.lock().await;
            handles.drain(..).collect()
        };
        if tokio::time::timeout(SHUTDOWN_GRACE, futures_util::future::join_all(drained))
            .await
            .is_err()
        {
            warn!("shutdown grace period expired, abandoning in-flight reads");
        }

        (self.inner.teardown)();
        debug!("poller stopped");
    }
}

/// Map a target's configured interface onto the device's discovery
/// table: (ifIndex, display name, alias, resolution error).
fn resolve_interface(
    target: &Target,
    table: Option<&Result<InterfaceTable, SnmpError>>,
) -> (Option<u32>, String, Option<String>, Option<String>) {
    match (&target.interface, table) {
        (InterfaceSpec::Index(idx), Some(Ok(table))) => {
            let name = table
                .name_of(*idx)
                .map_or_else(|| format!("if{idx}"), ToOwned::to_owned);
            let alias = table.alias_of(*idx).map(ToOwned::to_owned);
            (Some(*idx), name, alias, None)
        }
        // A literal index stays pollable even when discovery failed.
        (InterfaceSpec::Index(idx), _) => (Some(*idx), format!("if{idx}"), None, None),
        (InterfaceSpec::Name(name), Some(Ok(table))) => match table.index_of(name) {
            Some(idx) => {
                let alias = table.alias_of(idx).map(ToOwned::to_owned);
                (Some(idx), name.clone(), alias, None)
            }
            None => {
                warn!(
                    host = %target.host,
                    interface = %name,
                    available = ?table.available_names(),
                    "interface not found in device tables"
                );
                (None, name.clone(), None, Some("interface not found".into()))
            }
        },
        (InterfaceSpec::Name(name), Some(Err(e))) => (
            None,
            name.clone(),
            None,
            Some(format!("interface discovery failed: {e}")),
        ),
        (InterfaceSpec::Name(name), None) => {
            (None, name.clone(), None, Some("interface discovery failed".into()))
        }
    }
}

/// Broadcast a monotonically increasing tick sequence on the poll
/// interval. The first tick fires immediately at startup.
async fn tick_task(tick_tx: watch::Sender<u64>, period: Duration, cancel: CancellationToken) {
    let mut interval = tokio::time::interval(period);
    interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            biased;
            () = cancel.cancelled() => break,
            _ = interval.tick() => {
                tick_tx.send_modify(|seq| *seq += 1);
            }
        }
    }
}

// ── Per-target polling task ──────────────────────────────────────────

/// Sole owner and writer of one target's poll state.
struct TargetRunner<S: CounterSource> {
    source: Arc<S>,
    store: Arc<StatStore>,
    calc: RateCalculator,
    target: Target,
    if_index: Option<u32>,
    interface_name: String,
    alias: Option<String>,
    /// Counter table in use; downgraded once if the agent has no HC
    /// counters, then stays 32-bit for the rest of the run.
    width: CounterWidth,
    baseline: Option<CounterReading>,
    history: InterfaceHistory,
    speed_bps: Option<u64>,
    oper_status: OperStatus,
    last_poll: Option<DateTime<Utc>>,
    last_poll_succeeded: bool,
    poll_error: Option<String>,
    missed_cycles: u64,
    phase: PollPhase,
}

impl<S: CounterSource> TargetRunner<S> {
    async fn run(
        mut self,
        mut tick_rx: watch::Receiver<u64>,
        mut manual_rx: watch::Receiver<u64>,
        cancel: CancellationToken,
    ) {
        let mut last_seq = *tick_rx.borrow();

        loop {
            tokio::select! {
                biased;
                () = cancel.cancelled() => break,
                changed = tick_rx.changed() => {
                    if changed.is_err() {
                        break;
                    }
                    let seq = *tick_rx.borrow_and_update();
                    // Ticks that fired while we were polling collapse in
                    // the channel; the gap is the missed-cycle count.
                    let gap = seq.saturating_sub(last_seq);
                    if gap > 1 {
                        self.missed_cycles += gap - 1;
                        debug!(target = %self.target.key, missed = gap - 1, "skipped ticks while polling");
                    }
                    last_seq = seq;
                    self.poll_cycle().await;
                }
                changed = manual_rx.changed() => {
                    if changed.is_err() {
                        break;
                    }
                    manual_rx.borrow_and_update();
                    self.poll_cycle().await;
                }
            }
        }
    }

    async fn poll_cycle(&mut self) {
        // Unresolvable interface: nothing to read, state already shows
        // the resolution error.
        let Some(if_index) = self.if_index else {
            return;
        };

        self.phase = PollPhase::Polling;
        self.publish();

        let mut outcome = self
            .source
            .read_interface(&self.target, if_index, self.width)
            .await;

        // Agents without ifXTable answer noSuchObject for HC counters;
        // drop to the 32-bit table once and stay there.
        if self.width == CounterWidth::Bits64
            && matches!(outcome, Err(SnmpError::NoSuchObject { .. }))
        {
            debug!(target = %self.target.key, "no 64-bit counters, falling back to 32-bit");
            self.width = CounterWidth::Bits32;
            outcome = self
                .source
                .read_interface(&self.target, if_index, self.width)
                .await;
        }

        match outcome {
            Ok(reading) => {
                self.speed_bps = reading.speed_bps.or(self.speed_bps);
                self.oper_status = reading.oper_status;

                let sample = self.calc.compute(self.baseline.as_ref(), &reading.counters);
                // The baseline always moves forward, valid sample or
                // not — one bad reading must not poison the next delta.
                self.baseline = Some(reading.counters);
                self.history.append(sample);
                self.last_poll = Some(reading.counters.timestamp);
                self.last_poll_succeeded = true;
                self.poll_error = None;
            }
            Err(e) => {
                self.last_poll_succeeded = false;
                self.poll_error = Some(e.to_string());
                let err = CoreError::Transport {
                    target: self.target.key.clone(),
                    source: e,
                };
                warn!(error = %err, "poll failed");
            }
        }

        self.phase = PollPhase::Idle;
        self.publish();
    }

    /// Publish a complete immutable snapshot of this target's state.
    fn publish(&self) {
        self.store.publish(InterfaceSnapshot {
            target_key: self.target.key.clone(),
            group: self.target.group.clone(),
            host: self.target.host.clone(),
            label: self.target.label.clone(),
            interface_name: self.interface_name.clone(),
            alias: self.alias.clone(),
            if_index: self.if_index,
            speed_bps: self.speed_bps,
            oper_status: self.oper_status,
            latest: self.history.latest().copied(),
            history: self.history.snapshot(),
            last_poll_succeeded: self.last_poll_succeeded,
            poll_error: self.poll_error.clone(),
            missed_cycles: self.missed_cycles,
            phase: self.phase,
            last_poll: self.last_poll,
        });
    }
}
