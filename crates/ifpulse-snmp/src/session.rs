// ── Agent session ──
//
// One `Session` per (host, port, identity): a blocking snmp2 socket
// behind a mutex, driven from async code via `spawn_blocking`. The
// socket-level timeout bounds each round trip; callers get an
// additional hard deadline via `tokio::time::timeout` so a wedged
// worker can never stall a poll cycle past its budget.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::{DateTime, Utc};
use secrecy::ExposeSecret;
use snmp2::{Oid, SyncSession, Value};
use tracing::debug;

use crate::auth::{
    AuthProtocol, CredentialIdentity, PrivProtocol, SecurityLevel, SnmpVersion, UsmUser,
};
use crate::error::SnmpError;
use crate::oids;

/// Upper bound on getnext steps in a single column walk. Protects
/// against agents that never leave the subtree.
const MAX_WALK_STEPS: usize = 65_536;

/// Bit width of an octet counter pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CounterWidth {
    Bits32,
    Bits64,
}

impl CounterWidth {
    /// Counter range as a float, for anomaly classification.
    pub fn range(self) -> f64 {
        match self {
            Self::Bits32 => 4_294_967_296.0,
            Self::Bits64 => 18_446_744_073_709_551_616.0,
        }
    }
}

/// ifOperStatus of an interface at read time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OperStatus {
    Up,
    Down,
    Testing,
    #[default]
    Unknown,
}

impl OperStatus {
    fn from_wire(v: i64) -> Self {
        match v {
            1 => Self::Up,
            2 => Self::Down,
            3 => Self::Testing,
            _ => Self::Unknown,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Up => "up",
            Self::Down => "down",
            Self::Testing => "testing",
            Self::Unknown => "?",
        }
    }
}

/// One raw octet-counter reading. Immutable; consumed by the rate
/// calculator as the delta baseline and then discarded.
#[derive(Debug, Clone, Copy)]
pub struct CounterReading {
    pub in_octets: u64,
    pub out_octets: u64,
    pub width: CounterWidth,
    pub timestamp: DateTime<Utc>,
}

/// Everything one poll cycle reads from an interface.
#[derive(Debug, Clone, Copy)]
pub struct InterfaceReading {
    pub counters: CounterReading,
    /// Link speed in bits/sec (from ifHighSpeed), if the agent reports it.
    pub speed_bps: Option<u64>,
    pub oper_status: OperStatus,
}

/// A cached SNMP session for one agent endpoint and identity.
pub struct Session {
    endpoint: String,
    timeout: Duration,
    inner: Arc<Mutex<SyncSession>>,
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("endpoint", &self.endpoint)
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}

impl Session {
    /// Open a session to `host:port` with the given identity.
    ///
    /// Construction binds a UDP socket and, for v3, runs engine
    /// discovery on first use; it does not verify the agent is
    /// reachable — an unreachable agent surfaces on the first read.
    pub async fn connect(
        host: &str,
        port: u16,
        version: SnmpVersion,
        identity: &CredentialIdentity,
        timeout: Duration,
    ) -> Result<Self, SnmpError> {
        let endpoint = format!("{host}:{port}");
        let identity = identity.clone();
        let ep = endpoint.clone();

        let inner = tokio::task::spawn_blocking(move || {
            build_sync_session(&ep, version, &identity, timeout)
        })
        .await
        .map_err(|e| SnmpError::Worker(e.to_string()))??;

        debug!(endpoint = %endpoint, %version, "session established");
        Ok(Self {
            endpoint,
            timeout,
            inner: Arc::new(Mutex::new(inner)),
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Read octet counters, speed, and oper-status for one interface.
    ///
    /// `width` selects the counter table: 64-bit HC counters from
    /// ifXTable or 32-bit counters from ifTable. An agent without HC
    /// support yields `SnmpError::NoSuchObject`, which the caller uses
    /// to downgrade the target to 32-bit for the rest of the run.
    pub async fn read_interface(
        &self,
        if_index: u32,
        width: CounterWidth,
    ) -> Result<InterfaceReading, SnmpError> {
        let inner = Arc::clone(&self.inner);
        let endpoint = self.endpoint.clone();

        let task = tokio::task::spawn_blocking(move || {
            let mut session = inner
                .lock()
                .map_err(|_| SnmpError::Worker("session mutex poisoned".into()))?;

            let (in_base, out_base) = match width {
                CounterWidth::Bits64 => (oids::IF_HC_IN_OCTETS, oids::IF_HC_OUT_OCTETS),
                CounterWidth::Bits32 => (oids::IF_IN_OCTETS, oids::IF_OUT_OCTETS),
            };

            let in_octets = get_counter(&mut session, in_base, if_index)?;
            let out_octets = get_counter(&mut session, out_base, if_index)?;
            let timestamp = Utc::now();

            // ifHighSpeed / ifOperStatus are best-effort: some agents
            // serve counters but not the rest of the row.
            let speed_bps = match get_counter(&mut session, oids::IF_HIGH_SPEED, if_index) {
                Ok(mbps) => Some(mbps.saturating_mul(1_000_000)),
                Err(SnmpError::NoSuchObject { .. } | SnmpError::UnexpectedType { .. }) => None,
                Err(e) => return Err(e),
            };
            let oper_status = match get_integer(&mut session, oids::IF_OPER_STATUS, if_index) {
                Ok(v) => OperStatus::from_wire(v),
                Err(SnmpError::NoSuchObject { .. } | SnmpError::UnexpectedType { .. }) => {
                    OperStatus::Unknown
                }
                Err(e) => return Err(e),
            };

            Ok(InterfaceReading {
                counters: CounterReading {
                    in_octets,
                    out_octets,
                    width,
                    timestamp,
                },
                speed_bps,
                oper_status,
            })
        });

        match tokio::time::timeout(self.timeout, task).await {
            Ok(joined) => joined.map_err(|e| SnmpError::Worker(e.to_string()))?,
            Err(_) => Err(SnmpError::Timeout {
                endpoint,
                timeout_secs: self.timeout.as_secs(),
            }),
        }
    }

    /// Walk one string column of the interface tables, returning
    /// ifIndex → value. Used by discovery (ifName/ifDescr/ifAlias).
    pub async fn walk_column(
        &self,
        base: &'static [u64],
    ) -> Result<BTreeMap<u32, String>, SnmpError> {
        let inner = Arc::clone(&self.inner);
        let endpoint = self.endpoint.clone();

        tokio::task::spawn_blocking(move || {
            let mut session = inner
                .lock()
                .map_err(|_| SnmpError::Worker("session mutex poisoned".into()))?;

            let mut results = BTreeMap::new();
            let mut cursor: Vec<u64> = base.to_vec();

            for _ in 0..MAX_WALK_STEPS {
                let oid = Oid::from(cursor.as_slice()).map_err(|_| SnmpError::InvalidOid)?;
                let mut pdu = session.getnext(&oid)?;
                if pdu.error_status != 0 {
                    // End of a short table on some v1 agents.
                    break;
                }
                let Some((next_oid, value)) = pdu.varbinds.next() else {
                    break;
                };
                let Some(components) = next_oid.iter().map(|it| it.collect::<Vec<u64>>()) else {
                    break;
                };
                if components.len() <= base.len() || components[..base.len()] != *base {
                    break;
                }
                match value {
                    Value::EndOfMibView => break,
                    Value::OctetString(bytes) => {
                        // Row index is the instance component after the column OID.
                        #[allow(clippy::cast_possible_truncation, clippy::as_conversions)]
                        let if_index = components[base.len()] as u32;
                        results.insert(if_index, String::from_utf8_lossy(bytes).into_owned());
                    }
                    _ => {}
                }
                cursor = components;
            }

            debug!(endpoint = %endpoint, column = %oids::dotted(base), rows = results.len(), "column walk complete");
            Ok(results)
        })
        .await
        .map_err(|e| SnmpError::Worker(e.to_string()))?
    }
}

// ── snmp2 plumbing ───────────────────────────────────────────────────

fn build_sync_session(
    endpoint: &str,
    version: SnmpVersion,
    identity: &CredentialIdentity,
    timeout: Duration,
) -> Result<SyncSession, SnmpError> {
    let setup_err = |reason: String| SnmpError::SessionSetup {
        endpoint: endpoint.to_owned(),
        reason,
    };

    match identity {
        CredentialIdentity::Community(community) => match version {
            SnmpVersion::V1 => SyncSession::new_v1(endpoint, community.as_bytes(), Some(timeout), 0)
                .map_err(|e| setup_err(format!("{e:?}"))),
            _ => SyncSession::new_v2c(endpoint, community.as_bytes(), Some(timeout), 0)
                .map_err(|e| setup_err(format!("{e:?}"))),
        },
        CredentialIdentity::UsmUser(user) => {
            let security = build_v3_security(user);
            SyncSession::new_v3(endpoint, Some(timeout), 0, security)
                .map_err(|e| setup_err(format!("{e:?}")))
        }
    }
}

fn build_v3_security(user: &UsmUser) -> snmp2::v3::Security {
    use snmp2::v3;

    let auth_protocol = match user.auth_protocol {
        AuthProtocol::Sha => v3::AuthProtocol::Sha1,
        AuthProtocol::Md5 => v3::AuthProtocol::Md5,
    };
    let cipher = match user.priv_protocol {
        PrivProtocol::Aes128 => v3::Cipher::Aes128,
        PrivProtocol::Des => v3::Cipher::Des,
    };

    match user.security_level {
        SecurityLevel::NoAuthNoPriv => {
            v3::Security::new(user.username.as_bytes(), b"").with_auth(v3::Auth::NoAuthNoPriv)
        }
        SecurityLevel::AuthNoPriv => {
            let auth_key = user
                .auth_secret
                .as_ref()
                .map_or("", |s| s.expose_secret())
                .as_bytes()
                .to_vec();
            v3::Security::new(user.username.as_bytes(), &auth_key)
                .with_auth_protocol(auth_protocol)
                .with_auth(v3::Auth::AuthNoPriv)
        }
        SecurityLevel::AuthPriv => {
            let auth_key = user
                .auth_secret
                .as_ref()
                .map_or("", |s| s.expose_secret())
                .as_bytes()
                .to_vec();
            let priv_key = user
                .priv_secret
                .as_ref()
                .map_or("", |s| s.expose_secret())
                .as_bytes()
                .to_vec();
            v3::Security::new(user.username.as_bytes(), &auth_key)
                .with_auth_protocol(auth_protocol)
                .with_auth(v3::Auth::AuthPriv {
                    cipher,
                    privacy_password: priv_key,
                })
        }
    }
}

/// GET one instance and coerce the reply to an unsigned counter value.
fn get_counter(session: &mut SyncSession, base: &[u64], if_index: u32) -> Result<u64, SnmpError> {
    let instance = oids::indexed(base, if_index);
    let oid = Oid::from(instance.as_slice()).map_err(|_| SnmpError::InvalidOid)?;
    let mut pdu = session.get(&oid)?;
    if pdu.error_status != 0 {
        return Err(SnmpError::AgentError {
            status: pdu.error_status,
            index: pdu.error_index,
        });
    }
    let Some((_oid, value)) = pdu.varbinds.next() else {
        return Err(SnmpError::UnexpectedType {
            oid: oids::dotted(&instance),
        });
    };
    match value {
        Value::Counter64(v) => Ok(v),
        Value::Counter32(v) | Value::Unsigned32(v) => Ok(u64::from(v)),
        Value::Integer(v) => u64::try_from(v).map_err(|_| SnmpError::UnexpectedType {
            oid: oids::dotted(&instance),
        }),
        Value::NoSuchObject | Value::NoSuchInstance | Value::EndOfMibView => {
            Err(SnmpError::NoSuchObject {
                oid: oids::dotted(&instance),
            })
        }
        _ => Err(SnmpError::UnexpectedType {
            oid: oids::dotted(&instance),
        }),
    }
}

/// GET one instance and coerce the reply to a signed integer.
fn get_integer(session: &mut SyncSession, base: &[u64], if_index: u32) -> Result<i64, SnmpError> {
    let instance = oids::indexed(base, if_index);
    let oid = Oid::from(instance.as_slice()).map_err(|_| SnmpError::InvalidOid)?;
    let mut pdu = session.get(&oid)?;
    if pdu.error_status != 0 {
        return Err(SnmpError::AgentError {
            status: pdu.error_status,
            index: pdu.error_index,
        });
    }
    let Some((_oid, value)) = pdu.varbinds.next() else {
        return Err(SnmpError::UnexpectedType {
            oid: oids::dotted(&instance),
        });
    };
    match value {
        Value::Integer(v) => Ok(v),
        Value::Counter32(v) | Value::Unsigned32(v) => Ok(i64::from(v)),
        Value::NoSuchObject | Value::NoSuchInstance | Value::EndOfMibView => {
            Err(SnmpError::NoSuchObject {
                oid: oids::dotted(&instance),
            })
        }
        _ => Err(SnmpError::UnexpectedType {
            oid: oids::dotted(&instance),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counter_width_ranges() {
        assert_eq!(CounterWidth::Bits32.range(), 2f64.powi(32));
        assert_eq!(CounterWidth::Bits64.range(), 2f64.powi(64));
    }

    #[test]
    fn oper_status_wire_mapping() {
        assert_eq!(OperStatus::from_wire(1), OperStatus::Up);
        assert_eq!(OperStatus::from_wire(2), OperStatus::Down);
        assert_eq!(OperStatus::from_wire(3), OperStatus::Testing);
        assert_eq!(OperStatus::from_wire(99), OperStatus::Unknown);
    }
}
