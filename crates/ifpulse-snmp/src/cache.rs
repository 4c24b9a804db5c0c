// ── Session cache ──
//
// One cached session per (host, port, version, identity-fingerprint).
// Construction is single-flight: concurrent first-time acquires for the
// same key build exactly one session and share it. Sessions are never
// evicted during a run — the population is bounded by the number of
// distinct configured targets.

use std::future::Future;
use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::OnceCell;

use crate::auth::{CredentialIdentity, SnmpVersion};
use crate::error::SnmpError;

/// Cache key: everything that affects the wire exchange with an agent.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SessionKey {
    pub host: String,
    pub port: u16,
    pub version: SnmpVersion,
    pub fingerprint: String,
}

impl SessionKey {
    pub fn new(
        host: &str,
        port: u16,
        version: SnmpVersion,
        identity: &CredentialIdentity,
    ) -> Self {
        Self {
            host: host.to_owned(),
            port,
            version,
            fingerprint: identity.fingerprint(),
        }
    }
}

/// Single-flight cache of shared sessions.
///
/// Generic over the session type so the single-flight behavior is
/// testable without a socket.
pub struct SessionCache<T> {
    cells: DashMap<SessionKey, Arc<OnceCell<Arc<T>>>>,
}

impl<T> Default for SessionCache<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> std::fmt::Debug for SessionCache<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionCache")
            .field("sessions", &self.len())
            .finish()
    }
}

impl<T> SessionCache<T> {
    pub fn new() -> Self {
        Self {
            cells: DashMap::new(),
        }
    }

    /// Number of keys with a construction cell (built or in progress).
    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// Drop all cached sessions. Called on shutdown after outstanding
    /// reads have completed or been abandoned.
    pub fn clear(&self) {
        self.cells.clear();
    }
}

impl<T: Send + Sync + 'static> SessionCache<T> {
    /// Return the cached session for `key`, constructing it via `init`
    /// if absent. Concurrent acquires for the same cold key run `init`
    /// exactly once and all receive the same session. A failed `init`
    /// leaves the cell empty, so the next acquire retries construction.
    pub async fn acquire<F, Fut>(&self, key: SessionKey, init: F) -> Result<Arc<T>, SnmpError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, SnmpError>>,
    {
        // Clone the cell out before awaiting — holding a map guard
        // across an await point would block other shards' writers.
        let cell = {
            let entry = self.cells.entry(key).or_default();
            Arc::clone(entry.value())
        };

        let session = cell
            .get_or_try_init(|| async { init().await.map(Arc::new) })
            .await?;
        Ok(Arc::clone(session))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    use super::*;
    use crate::auth::CredentialIdentity;

    fn key() -> SessionKey {
        SessionKey::new(
            "192.0.2.1",
            161,
            SnmpVersion::V2c,
            &CredentialIdentity::Community("public".into()),
        )
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_cold_acquires_build_once() {
        let cache: Arc<SessionCache<u64>> = Arc::new(SessionCache::new());
        let builds = Arc::new(AtomicUsize::new(0));

        let mut handles = Vec::new();
        for _ in 0..16 {
            let cache = Arc::clone(&cache);
            let builds = Arc::clone(&builds);
            handles.push(tokio::spawn(async move {
                cache
                    .acquire(key(), || async {
                        builds.fetch_add(1, Ordering::SeqCst);
                        tokio::time::sleep(Duration::from_millis(10)).await;
                        Ok(42u64)
                    })
                    .await
                    .unwrap()
            }));
        }

        let mut sessions = Vec::new();
        for handle in handles {
            sessions.push(handle.await.unwrap());
        }

        assert_eq!(builds.load(Ordering::SeqCst), 1, "init ran more than once");
        for session in &sessions {
            assert!(Arc::ptr_eq(session, &sessions[0]));
        }
        assert_eq!(cache.len(), 1);
    }

    #[tokio::test]
    async fn failed_construction_retries_on_next_acquire() {
        let cache: SessionCache<u64> = SessionCache::new();

        let first = cache
            .acquire(key(), || async {
                Err(SnmpError::Wire("unreachable".into()))
            })
            .await;
        assert!(first.is_err());

        let second = cache.acquire(key(), || async { Ok(7u64) }).await.unwrap();
        assert_eq!(*second, 7);
    }

    #[tokio::test]
    async fn distinct_identities_get_distinct_sessions() {
        let cache: SessionCache<u64> = SessionCache::new();
        let community = key();
        let other = SessionKey::new(
            "192.0.2.1",
            161,
            SnmpVersion::V2c,
            &CredentialIdentity::Community("private".into()),
        );

        let a = cache
            .acquire(community, || async { Ok(1u64) })
            .await
            .unwrap();
        let b = cache.acquire(other, || async { Ok(2u64) }).await.unwrap();
        assert_eq!((*a, *b), (1, 2));
        assert_eq!(cache.len(), 2);
    }
}
