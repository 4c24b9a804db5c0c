// ── Transport error types ──
//
// Everything that can go wrong between us and an SNMP agent. Callers
// upstream (the poll scheduler) treat all of these as per-cycle,
// per-target failures — none are fatal to the process.

use thiserror::Error;

/// Unified error type for the SNMP transport crate.
#[derive(Debug, Error)]
pub enum SnmpError {
    #[error("session setup for {endpoint} failed: {reason}")]
    SessionSetup { endpoint: String, reason: String },

    #[error("request to {endpoint} timed out after {timeout_secs}s")]
    Timeout { endpoint: String, timeout_secs: u64 },

    #[error("agent returned error-status {status} (index {index})")]
    AgentError { status: u32, index: u32 },

    /// The agent answered, but not with the object we asked for
    /// (noSuchObject / noSuchInstance / endOfMibView).
    #[error("object not supported by agent: {oid}")]
    NoSuchObject { oid: String },

    /// The agent answered with a value of an unexpected ASN.1 type.
    #[error("unexpected value type for {oid}")]
    UnexpectedType { oid: String },

    #[error("invalid object identifier")]
    InvalidOid,

    /// Low-level wire failure (send/receive/decode) from the SNMP stack.
    #[error("wire error: {0}")]
    Wire(String),

    /// The blocking worker driving the socket went away mid-request.
    #[error("transport worker failed: {0}")]
    Worker(String),
}

impl From<snmp2::Error> for SnmpError {
    fn from(err: snmp2::Error) -> Self {
        SnmpError::Wire(format!("{err:?}"))
    }
}
