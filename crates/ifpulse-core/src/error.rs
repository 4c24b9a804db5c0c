// ── Core error types ──
//
// Two real failure classes, matching where they are handled:
// configuration errors are startup-fatal for the offending target only,
// transport errors are per-cycle and always retried on the next tick.
// Rate anomalies are NOT errors — they are a classification outcome of
// the rate calculator and never surface here.

use thiserror::Error;

use ifpulse_snmp::SnmpError;

/// Unified error type for the core crate.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Credential/version resolution failed. The named target is
    /// excluded from scheduling; other targets continue.
    #[error("configuration error for {target}: {reason}")]
    Config { target: String, reason: String },

    /// Session construction or read failure for one target during one
    /// cycle. Never fatal to the process.
    #[error("transport error for {target}: {source}")]
    Transport {
        target: String,
        #[source]
        source: SnmpError,
    },

    /// The poller is shutting down and no longer accepts requests.
    #[error("poller is shutting down")]
    ShuttingDown,
}

impl CoreError {
    pub(crate) fn config(target: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Config {
            target: target.into(),
            reason: reason.into(),
        }
    }
}
