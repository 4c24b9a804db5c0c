// ── Client facade ──
//
// The one object the poll engine holds: a session cache plus the read
// and discovery operations, addressed by (host, port, version,
// identity). Safe to share across poll tasks.

use std::time::Duration;

use crate::auth::{CredentialIdentity, SnmpVersion};
use crate::cache::{SessionCache, SessionKey};
use crate::discover::{self, InterfaceTable};
use crate::error::SnmpError;
use crate::session::{CounterWidth, InterfaceReading, Session};

/// Shared SNMP client over cached per-target sessions.
#[derive(Debug)]
pub struct SnmpClient {
    cache: SessionCache<Session>,
    read_timeout: Duration,
}

impl SnmpClient {
    /// `read_timeout` bounds every counter read independently per
    /// target; it should be comfortably shorter than the poll interval.
    pub fn new(read_timeout: Duration) -> Self {
        Self {
            cache: SessionCache::new(),
            read_timeout,
        }
    }

    async fn session(
        &self,
        host: &str,
        port: u16,
        version: SnmpVersion,
        identity: &CredentialIdentity,
    ) -> Result<std::sync::Arc<Session>, SnmpError> {
        let key = SessionKey::new(host, port, version, identity);
        self.cache
            .acquire(key, || {
                Session::connect(host, port, version, identity, self.read_timeout)
            })
            .await
    }

    /// Read counters, speed, and oper-status for one interface.
    pub async fn read_interface(
        &self,
        host: &str,
        port: u16,
        version: SnmpVersion,
        identity: &CredentialIdentity,
        if_index: u32,
        width: CounterWidth,
    ) -> Result<InterfaceReading, SnmpError> {
        let session = self.session(host, port, version, identity).await?;
        session.read_interface(if_index, width).await
    }

    /// Walk the interface naming tables of one device.
    pub async fn interface_table(
        &self,
        host: &str,
        port: u16,
        version: SnmpVersion,
        identity: &CredentialIdentity,
    ) -> Result<InterfaceTable, SnmpError> {
        let session = self.session(host, port, version, identity).await?;
        discover::walk_interfaces(&session).await
    }

    /// Tear down all cached sessions.
    pub fn shutdown(&self) {
        self.cache.clear();
    }
}
