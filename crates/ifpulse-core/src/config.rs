// ── Runtime monitoring configuration ──
//
// The typed structure the poll engine consumes. Built by ifpulse-config
// (or by hand in tests) — the core never reads files. Cross-field
// credential validation happens in `resolve`, not here.

use std::time::Duration;

use secrecy::SecretString;

use ifpulse_snmp::{AuthProtocol, PrivProtocol, SnmpVersion};

/// Built-in defaults, applied as the last tier of the resolution
/// cascade (target → global → these).
pub const DEFAULT_PORT: u16 = 161;
pub const DEFAULT_COMMUNITY: &str = "public";
pub const DEFAULT_INTERVAL: Duration = Duration::from_secs(10);
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);
pub const DEFAULT_MAX_HISTORY: usize = 60;

/// Top-level monitoring configuration.
#[derive(Debug, Clone, Default)]
pub struct MonitorConfig {
    pub defaults: GlobalDefaults,
    pub groups: Vec<GroupSpec>,
    pub rate_policy: RatePolicy,
}

/// Global defaults. Per-target-overridable fields are `Option` so the
/// resolver can tell "unset" from "explicitly configured"; the
/// scheduler-wide knobs carry concrete values.
#[derive(Debug, Clone)]
pub struct GlobalDefaults {
    pub version: Option<SnmpVersion>,
    pub community: Option<String>,
    pub port: Option<u16>,
    pub credentials: Option<CredentialSpec>,
    /// Poll cadence for all targets.
    pub interval: Duration,
    /// Per-target read deadline; should stay below `interval`.
    pub timeout: Duration,
    /// Ring-buffer capacity per interface.
    pub max_history: usize,
}

impl Default for GlobalDefaults {
    fn default() -> Self {
        Self {
            version: None,
            community: None,
            port: None,
            credentials: None,
            interval: DEFAULT_INTERVAL,
            timeout: DEFAULT_TIMEOUT,
            max_history: DEFAULT_MAX_HISTORY,
        }
    }
}

/// A partially specified v3 credential block, before resolution.
/// Every field is optional — per-target blocks only need to carry the
/// fields that differ from the global block.
#[derive(Debug, Clone, Default)]
pub struct CredentialSpec {
    pub username: Option<String>,
    pub auth_protocol: Option<AuthProtocol>,
    pub auth_secret: Option<SecretString>,
    pub priv_protocol: Option<PrivProtocol>,
    pub priv_secret: Option<SecretString>,
}

/// A named group of targets, displayed together.
#[derive(Debug, Clone)]
pub struct GroupSpec {
    pub name: String,
    pub targets: Vec<TargetSpec>,
}

/// One configured device with per-target overrides and the interfaces
/// to monitor on it.
#[derive(Debug, Clone)]
pub struct TargetSpec {
    pub host: String,
    pub label: Option<String>,
    pub version: Option<SnmpVersion>,
    pub community: Option<String>,
    pub port: Option<u16>,
    pub credentials: Option<CredentialSpec>,
    pub interfaces: Vec<InterfaceSpec>,
}

/// How an interface is identified in configuration: by name (resolved
/// against the device's ifName/ifDescr tables at startup) or directly
/// by ifIndex.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InterfaceSpec {
    Name(String),
    Index(u32),
}

impl std::fmt::Display for InterfaceSpec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Name(name) => f.write_str(name),
            Self::Index(idx) => write!(f, "if{idx}"),
        }
    }
}

/// Wrap/reset classification policy for the rate calculator.
///
/// These are operational tuning knobs, not protocol constants — the
/// right values depend on the device population being monitored.
#[derive(Debug, Clone, Copy)]
pub struct RatePolicy {
    /// Rates above this are treated as a device reset, not a wrap.
    pub max_rate_bps: f64,
    /// A raw counter decrement smaller than this fraction of the
    /// counter range is a reordered/duplicate read, not a wrap.
    pub reorder_guard_fraction: f64,
}

impl Default for RatePolicy {
    fn default() -> Self {
        Self {
            // 100 Gbit/s — beyond any link this tool is pointed at.
            max_rate_bps: 100e9,
            reorder_guard_fraction: 1e-6,
        }
    }
}
