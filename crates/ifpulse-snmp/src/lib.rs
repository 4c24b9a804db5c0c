//! SNMP polling transport for ifpulse.
//!
//! This crate owns everything on the wire side of the poll engine:
//!
//! - **[`CredentialIdentity`]** — resolved v1/v2c community or v3 USM
//!   user, with the derived [`SecurityLevel`] and a stable fingerprint
//!   for cache keying.
//! - **[`Session`]** — one blocking `snmp2` socket per agent endpoint,
//!   driven from async code with an independent hard read deadline.
//! - **[`SessionCache`]** — single-flight construction, one shared
//!   session per (host, port, version, identity) for the whole run.
//! - **[`SnmpClient`]** — the facade the poll engine holds: counter
//!   reads ([`InterfaceReading`]) and discovery walks
//!   ([`InterfaceTable`]).
//!
//! Retry policy deliberately does NOT live here: every failure is
//! surfaced to the caller, and the scheduler decides when to try again.

pub mod auth;
pub mod cache;
pub mod client;
pub mod discover;
pub mod error;
pub mod oids;
pub mod session;

pub use auth::{AuthProtocol, CredentialIdentity, PrivProtocol, SecurityLevel, SnmpVersion, UsmUser};
pub use cache::{SessionCache, SessionKey};
pub use client::SnmpClient;
pub use discover::InterfaceTable;
pub use error::SnmpError;
pub use session::{CounterReading, CounterWidth, InterfaceReading, OperStatus, Session};
