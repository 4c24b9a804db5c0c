//! Poll engine for ifpulse: credential resolution, scheduling, rate
//! computation, and bounded history.
//!
//! This crate owns the monitoring semantics between `ifpulse-snmp` and
//! the UI:
//!
//! - **[`Poller`]** — lifecycle facade. [`Poller::start`] resolves
//!   targets, discovers interface indexes, and spawns one tick
//!   broadcaster plus one owning task per target. Exposes
//!   [`snapshot()`](Poller::snapshot), [`poll_now()`](Poller::poll_now),
//!   and change notification for reactive rendering.
//! - **[`resolve`]** — the target → global → built-in credential
//!   cascade, with the security level derived from resolved secrets.
//! - **[`RateCalculator`]** — counter deltas to bits/sec, with
//!   wraparound, reorder, and reset classification.
//! - **[`InterfaceHistory`]** — fixed-capacity FIFO of
//!   [`RateSample`]s feeding sparklines.
//! - **[`StatStore`]** — immutable published snapshots; readers never
//!   observe a torn update.
//!
//! The core consumes a typed [`MonitorConfig`] and never touches disk;
//! file loading lives in `ifpulse-config`.

pub mod config;
pub mod error;
pub mod history;
pub mod model;
pub mod poller;
pub mod rate;
pub mod resolve;
pub mod store;

// ── Primary re-exports ──────────────────────────────────────────────
pub use config::{
    CredentialSpec, GlobalDefaults, GroupSpec, InterfaceSpec, MonitorConfig, RatePolicy,
    TargetSpec,
};
pub use error::CoreError;
pub use history::InterfaceHistory;
pub use model::{GroupSnapshot, InterfaceSnapshot, PollPhase, RateSample, Target};
pub use poller::{CounterSource, Poller};
pub use rate::RateCalculator;
pub use store::StatStore;

// Wire-side types, re-exported for consumers that only depend on core.
pub use ifpulse_snmp::{
    AuthProtocol, CounterReading, CounterWidth, CredentialIdentity, InterfaceReading,
    InterfaceTable, OperStatus, PrivProtocol, SecurityLevel, SnmpClient, SnmpError, SnmpVersion,
    UsmUser,
};
