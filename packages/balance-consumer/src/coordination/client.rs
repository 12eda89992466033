//! Coordination Client Adapter (C1).
//!
//! A thin capability interface over a ZooKeeper-style hierarchical
//! ephemeral-node store: create/delete nodes, list children, read
//! payloads, install persistent child watches, observe session
//! lifecycle. `EtcdCoordinationClient` is the one concrete adapter this
//! crate ships, built on `etcd-client` -- the same coordination-store
//! crate this pack's own partition-assignment code uses. An "ephemeral"
//! node here is an etcd key bound to a lease that is kept alive for the
//! session's lifetime and revoked on `Lost`.

use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use etcd_client::{Client, Compare, CompareOp, GetOptions, PutOptions, Txn, TxnOp, WatchOptions};
use tokio::sync::watch;
use tracing::{debug, info, warn};

use super::error::CoordinationError;

/// Session lifecycle signal (spec §4.1).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionEvent {
    Connected,
    Suspended,
    Lost,
}

/// A node's payload plus its store-assigned version, as returned by `get`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeData {
    pub payload: String,
    pub version: i64,
}

/// Handle to a running persistent child watch. Dropping it stops the
/// watch's background dispatch task.
pub struct WatchHandle {
    task: tokio::task::JoinHandle<()>,
}

impl Drop for WatchHandle {
    fn drop(&mut self) {
        self.task.abort();
    }
}

/// Capabilities exposed to the rest of the core (spec §4.1).
///
/// Implementations may block on network I/O; the handler passed to
/// `watch_children` must not block the adapter's own dispatch thread
/// beyond enqueuing work -- see spec §5.
#[async_trait]
pub trait CoordinationClient: Send + Sync {
    /// Create `path` and all missing ancestors as persistent nodes. Idempotent.
    async fn ensure_path(&self, path: &str) -> Result<(), CoordinationError>;

    /// Create a node at `path`. Fails with `AlreadyExists` if one is already there.
    async fn create(
        &self,
        path: &str,
        payload: &str,
        ephemeral: bool,
    ) -> Result<(), CoordinationError>;

    /// Remove the node at `path`. `NotFound` is the caller's responsibility to
    /// treat as success.
    async fn delete(&self, path: &str) -> Result<(), CoordinationError>;

    /// List the immediate children of `path`.
    async fn get_children(&self, path: &str) -> Result<Vec<String>, CoordinationError>;

    /// Fetch the payload and version of the node at `path`.
    async fn get(&self, path: &str) -> Result<NodeData, CoordinationError>;

    /// Install a persistent watch on `path`'s child set. `handler` is invoked
    /// with the full, current child list on install and again on every
    /// subsequent change; the watch reissues itself on each fire until the
    /// returned handle is dropped.
    async fn watch_children(
        &self,
        path: &str,
        handler: Box<dyn Fn(Vec<String>) + Send + Sync>,
    ) -> Result<WatchHandle, CoordinationError>;

    /// A stream of session lifecycle transitions.
    fn session_events(&self) -> watch::Receiver<SessionEvent>;

    /// Re-establish the session after `Lost`: grant a fresh lease (or
    /// equivalent) and emit a new `Connected` once it is live. All
    /// ephemeral nodes created under the previous lease are gone
    /// server-side; the caller is responsible for recreating them.
    async fn reconnect(&self) -> Result<(), CoordinationError>;
}

const SESSION_LEASE_TTL_SECS: i64 = 10;

/// `etcd`-backed `CoordinationClient`.
pub struct EtcdCoordinationClient {
    client: Client,
    lease_id: AtomicI64,
    session_tx: watch::Sender<SessionEvent>,
    session_rx: watch::Receiver<SessionEvent>,
}

impl EtcdCoordinationClient {
    /// Connect to `endpoints`, grant the session lease, and start its
    /// keepalive loop. The adapter is unusable (no ephemeral creates
    /// will succeed) until this has run.
    pub async fn connect(endpoints: Vec<String>) -> Result<Arc<Self>, CoordinationError> {
        let client = Client::connect(endpoints, None)
            .await
            .map_err(|e| CoordinationError::TransientCoordination(e.to_string()))?;
        let (session_tx, session_rx) = watch::channel(SessionEvent::Connected);
        let this = Self { client, lease_id: AtomicI64::new(0), session_tx, session_rx };
        this.establish_session().await?;
        Ok(Arc::new(this))
    }

    /// Grant a fresh lease and spawn its keepalive task. Called at
    /// construction and again by `reconnect` after `Lost`.
    async fn establish_session(&self) -> Result<(), CoordinationError> {
        let lease_id = self
            .client
            .clone()
            .lease_grant(SESSION_LEASE_TTL_SECS, None)
            .await
            .map_err(|e| CoordinationError::TransientCoordination(e.to_string()))?
            .id();
        self.lease_id.store(lease_id, Ordering::SeqCst);

        let (mut keeper, mut stream) = self
            .client
            .clone()
            .lease_keep_alive(lease_id)
            .await
            .map_err(|e| CoordinationError::TransientCoordination(e.to_string()))?;

        let session_tx = self.session_tx.clone();
        let interval = Duration::from_secs((SESSION_LEASE_TTL_SECS as u64) / 3).max(Duration::from_secs(1));
        tokio::spawn(async move {
            loop {
                tokio::time::sleep(interval).await;
                if keeper.keep_alive().await.is_err() {
                    warn!("lease keepalive send failed, session lost");
                    let _ = session_tx.send(SessionEvent::Lost);
                    return;
                }
                match stream.message().await {
                    Ok(Some(_)) => {}
                    Ok(None) | Err(_) => {
                        warn!("lease keepalive stream closed, session lost");
                        let _ = session_tx.send(SessionEvent::Lost);
                        return;
                    }
                }
            }
        });

        info!(lease_id, "coordination session established");
        let _ = self.session_tx.send(SessionEvent::Connected);
        Ok(())
    }

    fn lease(&self) -> i64 {
        self.lease_id.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl CoordinationClient for EtcdCoordinationClient {
    async fn ensure_path(&self, _path: &str) -> Result<(), CoordinationError> {
        // etcd's flat keyspace has no notion of a persistent directory node
        // distinct from its children; any key written under `path` exists
        // without a separate ancestor-creation step. Idempotent by
        // construction.
        Ok(())
    }

    async fn create(
        &self,
        path: &str,
        payload: &str,
        ephemeral: bool,
    ) -> Result<(), CoordinationError> {
        let mut put_options = PutOptions::new();
        if ephemeral {
            put_options = put_options.with_lease(self.lease());
        }

        let txn = Txn::new()
            .when(vec![Compare::version(path, CompareOp::Equal, 0)])
            .and_then(vec![TxnOp::put(path, payload, Some(put_options))])
            .or_else(vec![TxnOp::get(path, None)]);

        let resp = self
            .client
            .clone()
            .txn(txn)
            .await
            .map_err(|e| CoordinationError::TransientCoordination(e.to_string()))?;

        if resp.succeeded() {
            Ok(())
        } else {
            Err(CoordinationError::AlreadyExists { path: path.to_string() })
        }
    }

    async fn delete(&self, path: &str) -> Result<(), CoordinationError> {
        let resp = self
            .client
            .clone()
            .delete(path, None)
            .await
            .map_err(|e| CoordinationError::TransientCoordination(e.to_string()))?;
        if resp.deleted() == 0 {
            return Err(CoordinationError::NotFound { path: path.to_string() });
        }
        Ok(())
    }

    async fn get_children(&self, path: &str) -> Result<Vec<String>, CoordinationError> {
        let prefix = format!("{path}/");
        let resp = self
            .client
            .clone()
            .get(prefix.clone(), Some(GetOptions::new().with_prefix()))
            .await
            .map_err(|e| CoordinationError::TransientCoordination(e.to_string()))?;

        if resp.kvs().is_empty() {
            return Err(CoordinationError::NotFound { path: path.to_string() });
        }

        let mut children: Vec<String> = resp
            .kvs()
            .iter()
            .filter_map(|kv| kv.key_str().ok())
            .filter_map(|key| key.strip_prefix(&prefix))
            .map(ToString::to_string)
            .collect();
        children.sort();
        children.dedup();
        Ok(children)
    }

    async fn get(&self, path: &str) -> Result<NodeData, CoordinationError> {
        let resp = self
            .client
            .clone()
            .get(path, None)
            .await
            .map_err(|e| CoordinationError::TransientCoordination(e.to_string()))?;

        let kv = resp
            .kvs()
            .first()
            .ok_or_else(|| CoordinationError::NotFound { path: path.to_string() })?;

        Ok(NodeData {
            payload: kv.value_str().unwrap_or_default().to_string(),
            version: kv.version(),
        })
    }

    async fn watch_children(
        &self,
        path: &str,
        handler: Box<dyn Fn(Vec<String>) + Send + Sync>,
    ) -> Result<WatchHandle, CoordinationError> {
        let initial = self.get_children(path).await.unwrap_or_default();
        handler(initial);

        let prefix = format!("{path}/");
        let (_watcher, mut stream) = self
            .client
            .clone()
            .watch(prefix.clone(), Some(WatchOptions::new().with_prefix()))
            .await
            .map_err(|e| CoordinationError::TransientCoordination(e.to_string()))?;

        let mut client = self.client.clone();
        let path = path.to_string();
        let task = tokio::spawn(async move {
            loop {
                match stream.message().await {
                    Ok(Some(resp)) => {
                        if resp.events().is_empty() {
                            continue;
                        }
                        debug!(%path, "child watch fired, refetching children");
                        let fetch = client
                            .get(prefix.clone(), Some(GetOptions::new().with_prefix()))
                            .await;
                        if let Ok(fetch) = fetch {
                            let mut children: Vec<String> = fetch
                                .kvs()
                                .iter()
                                .filter_map(|kv| kv.key_str().ok())
                                .filter_map(|key| key.strip_prefix(&prefix))
                                .map(ToString::to_string)
                                .collect();
                            children.sort();
                            children.dedup();
                            handler(children);
                        }
                    }
                    Ok(None) | Err(_) => {
                        warn!(%path, "watch stream ended");
                        return;
                    }
                }
            }
        });

        Ok(WatchHandle { task })
    }

    fn session_events(&self) -> watch::Receiver<SessionEvent> {
        self.session_rx.clone()
    }

    async fn reconnect(&self) -> Result<(), CoordinationError> {
        self.establish_session().await
    }
}

#[cfg(test)]
pub mod mock {
    //! In-memory `CoordinationClient` test double. No network, no
    //! `etcd`: the unit tests for C2/C3/C5/C6 exercise their logic
    //! against this instead.

    use std::collections::BTreeMap;
    use std::sync::Mutex;

    use super::*;

    #[derive(Default)]
    struct Inner {
        nodes: BTreeMap<String, String>,
        creates: u64,
    }

    pub struct MockCoordinationClient {
        inner: Mutex<Inner>,
        session_tx: watch::Sender<SessionEvent>,
        session_rx: watch::Receiver<SessionEvent>,
    }

    impl MockCoordinationClient {
        #[must_use]
        pub fn new() -> Arc<Self> {
            let (session_tx, session_rx) = watch::channel(SessionEvent::Connected);
            Arc::new(Self { inner: Mutex::new(Inner::default()), session_tx, session_rx })
        }

        /// Test hook: simulate server-side expiry of all ephemeral state.
        /// Leaves the session `Lost` until the controller calls `reconnect`,
        /// the same as a real lease expiry would.
        pub fn simulate_session_loss(&self) {
            self.inner.lock().unwrap().nodes.clear();
            let _ = self.session_tx.send(SessionEvent::Lost);
        }

        pub fn node_payload(&self, path: &str) -> Option<String> {
            self.inner.lock().unwrap().nodes.get(path).cloned()
        }

        /// Test hook: total number of successful `create` calls, for
        /// asserting a rebalance pass wrote nothing it didn't need to.
        pub fn create_count(&self) -> u64 {
            self.inner.lock().unwrap().creates
        }
    }

    #[async_trait]
    impl CoordinationClient for MockCoordinationClient {
        async fn ensure_path(&self, _path: &str) -> Result<(), CoordinationError> {
            Ok(())
        }

        async fn create(
            &self,
            path: &str,
            payload: &str,
            _ephemeral: bool,
        ) -> Result<(), CoordinationError> {
            let mut inner = self.inner.lock().unwrap();
            if inner.nodes.contains_key(path) {
                return Err(CoordinationError::AlreadyExists { path: path.to_string() });
            }
            inner.nodes.insert(path.to_string(), payload.to_string());
            inner.creates += 1;
            Ok(())
        }

        async fn delete(&self, path: &str) -> Result<(), CoordinationError> {
            let mut inner = self.inner.lock().unwrap();
            if inner.nodes.remove(path).is_none() {
                return Err(CoordinationError::NotFound { path: path.to_string() });
            }
            Ok(())
        }

        async fn get_children(&self, path: &str) -> Result<Vec<String>, CoordinationError> {
            let prefix = format!("{path}/");
            let inner = self.inner.lock().unwrap();
            let mut children: Vec<String> = inner
                .nodes
                .keys()
                .filter_map(|k| k.strip_prefix(&prefix))
                .map(ToString::to_string)
                .collect();
            children.sort();
            if children.is_empty() {
                return Err(CoordinationError::NotFound { path: path.to_string() });
            }
            Ok(children)
        }

        async fn get(&self, path: &str) -> Result<NodeData, CoordinationError> {
            let inner = self.inner.lock().unwrap();
            inner
                .nodes
                .get(path)
                .map(|payload| NodeData { payload: payload.clone(), version: 0 })
                .ok_or_else(|| CoordinationError::NotFound { path: path.to_string() })
        }

        async fn watch_children(
            &self,
            _path: &str,
            _handler: Box<dyn Fn(Vec<String>) + Send + Sync>,
        ) -> Result<WatchHandle, CoordinationError> {
            // Tests drive rebalances directly; no background dispatch needed.
            let task = tokio::spawn(async {});
            Ok(WatchHandle { task })
        }

        fn session_events(&self) -> watch::Receiver<SessionEvent> {
            self.session_rx.clone()
        }

        async fn reconnect(&self) -> Result<(), CoordinationError> {
            let _ = self.session_tx.send(SessionEvent::Connected);
            Ok(())
        }
    }
}
