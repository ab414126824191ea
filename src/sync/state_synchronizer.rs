use std::collections::HashSet;
use std::sync::atomic::AtomicBool;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;

use arc_swap::ArcSwap;
use arc_swap::ArcSwapOption;
use dashmap::DashMap;
use serde_json::Value;
use tokio::sync::mpsc;
use tokio::sync::Mutex;
use tokio::time::sleep;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::debug;
use tracing::error;
use tracing::info;
use tracing::instrument;
use tracing::warn;

use super::watch::PathWatch;
#[cfg(test)]
use super::watch::WatchState;
use crate::collection_path;
use crate::config_path;
use crate::ensure_exists;
use crate::Aliases;
use crate::ApiError;
use crate::ClusterState;
use crate::CoordinationClient;
use crate::Error;
use crate::Replica;
use crate::ReplicaState;
use crate::Result;
use crate::SyncConfig;
use crate::WatchEvent;
use crate::WatchKind;
use crate::ALIASES;
use crate::CLUSTER_STATE;
use crate::CONFIG_NAME_PROP;
use crate::LIVE_NODES;

/// A replica selected by [`StateSynchronizer::get_replica_props`], keyed by
/// its stable core-node name.
#[derive(Debug, Clone, PartialEq)]
pub struct ReplicaRef {
    pub core_node_name: String,
    pub replica: Replica,
}

impl ReplicaRef {
    pub fn core_url(&self) -> String {
        self.replica.core_url()
    }
}

/// Maintains the locally cached, eventually-consistent mirror of the
/// cluster topology and keeps it current via coordination-service watches.
///
/// Concurrency contract: one update lock serializes initial setup, every
/// snapshot-publishing reload and all watch re-arming; readers load the
/// published snapshot through an atomic reference and never take the lock.
/// A burst of remote changes may coalesce into a single reload that jumps
/// straight to the latest version; snapshots are last-write-wins, with
/// versions never decreasing.
pub struct StateSynchronizer<C: CoordinationClient> {
    client: Arc<C>,
    settings: SyncConfig,
    cluster_state: ArcSwapOption<ClusterState>,
    aliases: ArcSwap<Aliases>,
    update_lock: Mutex<()>,
    reload_scheduled: AtomicBool,
    watches: DashMap<&'static str, Arc<PathWatch>>,
    closed: CancellationToken,
}

impl<C: CoordinationClient> StateSynchronizer<C> {
    pub fn new(client: Arc<C>, settings: SyncConfig) -> Arc<Self> {
        let watches = DashMap::new();
        for watch in [
            PathWatch::new(CLUSTER_STATE, WatchKind::Data),
            PathWatch::new(LIVE_NODES, WatchKind::Children),
            PathWatch::new(ALIASES, WatchKind::Data),
        ] {
            watches.insert(watch.path(), Arc::new(watch));
        }
        Arc::new(Self {
            client,
            settings,
            cluster_state: ArcSwapOption::empty(),
            aliases: ArcSwap::from_pointee(Aliases::default()),
            update_lock: Mutex::new(()),
            reload_scheduled: AtomicBool::new(false),
            watches,
            closed: CancellationToken::new(),
        })
    }

    /// Initialization protocol: ensure the watched documents exist, install
    /// every watch, publish the initial snapshot, and hand the watch-event
    /// stream to the background dispatch loop.
    ///
    /// The explicit alias re-read at the end closes the startup race
    /// between installing the alias watch and the first read.
    #[instrument(skip_all)]
    pub async fn open(self: &Arc<Self>, events: mpsc::UnboundedReceiver<WatchEvent>) -> Result<()> {
        {
            let _guard = self.update_lock.lock().await;
            ensure_exists(self.client.as_ref(), CLUSTER_STATE, b"").await?;
            ensure_exists(self.client.as_ref(), ALIASES, b"").await?;
            ensure_exists(self.client.as_ref(), LIVE_NODES, b"").await?;

            info!("updating cluster state from the coordination service");
            let topology = self.client.get_data(CLUSTER_STATE, true).await?;
            self.watch(CLUSTER_STATE).armed();

            let live_nodes: HashSet<String> =
                self.client.get_children(LIVE_NODES, true).await?.into_iter().collect();
            self.watch(LIVE_NODES).armed();

            let state = ClusterState::load(topology.version, &topology.data, live_nodes)?;
            self.cluster_state.store(Some(Arc::new(state)));

            let aliases = self.client.get_data(ALIASES, true).await?;
            self.watch(ALIASES).armed();
            self.aliases.store(Arc::new(Aliases::load(&aliases.data)?));
        }
        self.update_aliases().await?;

        let this = Arc::clone(self);
        tokio::spawn(async move { this.run_event_loop(events).await });
        Ok(())
    }

    /// Latest published snapshot. Wait-free; `None` before the first load.
    pub fn cluster_state(&self) -> Option<Arc<ClusterState>> {
        self.cluster_state.load_full()
    }

    pub fn aliases(&self) -> Arc<Aliases> {
        self.aliases.load_full()
    }

    /// Re-read the alias document and replace the published table.
    pub async fn update_aliases(&self) -> Result<()> {
        let _guard = self.update_lock.lock().await;
        let versioned = self.client.get_data(ALIASES, false).await?;
        self.aliases.store(Arc::new(Aliases::load(&versioned.data)?));
        Ok(())
    }

    /// Reload the snapshot. `immediate` runs the reload now; otherwise one
    /// reload is scheduled after the configured delay, coalescing bursts of
    /// requests into a single run (a request while one is pending is a
    /// no-op).
    pub async fn update_cluster_state(self: &Arc<Self>, immediate: bool) -> Result<()> {
        self.update(immediate, false).await
    }

    /// Refresh only the live-node set of the current snapshot, sharing the
    /// collection tree. Skips re-reading the topology document entirely:
    /// node join/leave is frequent relative to topology changes.
    pub async fn update_live_nodes(self: &Arc<Self>) -> Result<()> {
        self.update(true, true).await
    }

    /// Shard leader discovery with bounded retry.
    ///
    /// Polls the snapshot for a leader replica whose node is currently
    /// live (a recorded leader on a dead node is not a valid leader),
    /// sleeping between attempts. Fails with a service-unavailable
    /// condition only once at least `timeout` has elapsed, or promptly
    /// after [`StateSynchronizer::close`].
    pub async fn get_leader(&self, collection: &str, shard: &str, timeout: Duration) -> Result<Replica> {
        let started = Instant::now();
        let deadline = started + timeout;
        loop {
            if let Some(state) = self.cluster_state.load_full() {
                if let Some(leader) = state.leader(collection, shard) {
                    if state.live_nodes_contain(leader.node_name()) {
                        return Ok(leader.clone());
                    }
                }
            }
            let now = Instant::now();
            if self.closed.is_cancelled() || now >= deadline {
                return Err(ApiError::LeaderNotFound {
                    collection: collection.to_string(),
                    shard: shard.to_string(),
                    waited: started.elapsed(),
                }
                .into());
            }
            let remaining = deadline - now;
            sleep(self.settings.leader_poll_interval().min(remaining)).await;
        }
    }

    /// [`StateSynchronizer::get_leader`] with the configured default budget.
    pub async fn get_leader_default(&self, collection: &str, shard: &str) -> Result<Replica> {
        self.get_leader(collection, shard, self.settings.default_leader_timeout()).await
    }

    /// URL of the core hosted by the shard leader.
    pub async fn leader_url(&self, collection: &str, shard: &str, timeout: Duration) -> Result<String> {
        Ok(self.get_leader(collection, shard, timeout).await?.core_url())
    }

    /// Every replica of `collection`/`shard` other than
    /// `exclude_core_node_name` whose node is currently live, optionally
    /// restricted to replicas whose state equals `state_filter` and does
    /// not equal `exclude_state_filter`.
    ///
    /// An empty result means either the shard has no other replicas or all
    /// of them were filtered out; the two cases are not distinguished.
    /// Before the first snapshot load the result is empty as well.
    pub fn get_replica_props(
        &self,
        collection: &str,
        shard: &str,
        exclude_core_node_name: &str,
        state_filter: Option<ReplicaState>,
        exclude_state_filter: Option<ReplicaState>,
    ) -> Result<Vec<ReplicaRef>> {
        let state = match self.cluster_state.load_full() {
            Some(state) => state,
            None => return Ok(Vec::new()),
        };
        let doc_collection = state
            .collection(collection)
            .ok_or_else(|| ApiError::CollectionNotFound(collection.to_string()))?;
        let slice = doc_collection.slice(shard).ok_or_else(|| ApiError::ShardNotFound {
            collection: collection.to_string(),
            shard: shard.to_string(),
        })?;

        let refs = slice
            .replicas_map()
            .iter()
            .filter(|(core_node_name, replica)| {
                core_node_name.as_str() != exclude_core_node_name
                    && state.live_nodes_contain(replica.node_name())
                    && state_filter.map_or(true, |f| replica.state() == f)
                    && exclude_state_filter.map_or(true, |f| replica.state() != f)
            })
            .map(|(core_node_name, replica)| ReplicaRef {
                core_node_name: core_node_name.clone(),
                replica: replica.clone(),
            })
            .collect();
        Ok(refs)
    }

    /// Config-set name for a collection, from the per-collection pointer
    /// document. Validates that the named config actually exists.
    pub async fn read_config_name(&self, collection: &str) -> Result<String> {
        let path = collection_path(collection);
        debug!(%path, "loading collection config pointer");
        let versioned = match self.client.get_data(&path, false).await {
            Ok(v) => v,
            Err(Error::Coordination(crate::CoordinationError::NotFound(_))) => {
                return Err(ApiError::CollectionNotFound(collection.to_string()).into());
            }
            Err(e) => return Err(e),
        };
        let doc: Value = serde_json::from_slice(&versioned.data)?;
        let config_name = doc
            .get(CONFIG_NAME_PROP)
            .and_then(Value::as_str)
            .ok_or_else(|| ApiError::ConfigNotFound(format!("no {CONFIG_NAME_PROP} for {collection}")))?
            .to_string();
        if !self.client.exists(&config_path(&config_name)).await? {
            error!(%config_name, "specified config does not exist");
            return Err(ApiError::ConfigNotFound(config_name).into());
        }
        Ok(config_name)
    }

    /// Stop the synchronizer: leader polls exit promptly, pending scheduled
    /// reloads are dropped, watches are abandoned and the event loop
    /// drains. In-flight coordination calls are not forcibly cancelled; a
    /// final callback may still fire and is ignored.
    pub fn close(&self) {
        info!("closing state synchronizer");
        self.closed.cancel();
        for entry in self.watches.iter() {
            entry.value().abandon();
        }
    }

    pub fn is_closed(&self) -> bool {
        self.closed.is_cancelled()
    }

    #[cfg(test)]
    pub(crate) fn watch_state(&self, path: &str) -> Option<WatchState> {
        self.watches.get(path).map(|w| w.state())
    }

    fn watch(&self, path: &str) -> Arc<PathWatch> {
        Arc::clone(
            self.watches
                .get(path)
                .expect("watch registry covers all watched paths")
                .value(),
        )
    }

    async fn update(self: &Arc<Self>, immediate: bool, only_live_nodes: bool) -> Result<()> {
        if immediate {
            let _guard = self.update_lock.lock().await;
            return self.reload_locked(only_live_nodes).await;
        }

        if self.reload_scheduled.swap(true, Ordering::AcqRel) {
            debug!("cluster state reload already scheduled");
            return Ok(());
        }
        debug!(delay_ms = self.settings.update_delay_ms, "scheduling cluster state reload");
        let this = Arc::clone(self);
        tokio::spawn(async move {
            tokio::select! {
                _ = this.closed.cancelled() => {
                    this.reload_scheduled.store(false, Ordering::Release);
                }
                _ = sleep(this.settings.update_delay()) => {
                    let _guard = this.update_lock.lock().await;
                    this.reload_scheduled.store(false, Ordering::Release);
                    if let Err(e) = this.reload_locked(only_live_nodes).await {
                        error!(error = %e, "scheduled cluster state reload failed");
                    }
                }
            }
        });
        Ok(())
    }

    /// Must be called with the update lock held. Publication is a single
    /// atomic store; concurrent readers never observe a half-built
    /// snapshot.
    async fn reload_locked(&self, only_live_nodes: bool) -> Result<()> {
        let live_nodes: HashSet<String> =
            self.client.get_children(LIVE_NODES, false).await?.into_iter().collect();

        let current = self.cluster_state.load_full();
        let new_state = match (only_live_nodes, current) {
            (true, Some(current)) => {
                debug!(live = live_nodes.len(), "updating live nodes");
                current.with_live_nodes(live_nodes)
            }
            _ => {
                debug!("updating cluster state");
                let topology = self.client.get_data(CLUSTER_STATE, false).await?;
                ClusterState::load(topology.version, &topology.data, live_nodes)?
            }
        };
        self.cluster_state.store(Some(Arc::new(new_state)));
        Ok(())
    }

    async fn run_event_loop(self: Arc<Self>, mut events: mpsc::UnboundedReceiver<WatchEvent>) {
        loop {
            tokio::select! {
                _ = self.closed.cancelled() => break,
                maybe_event = events.recv() => {
                    let event = match maybe_event {
                        Some(event) => event,
                        None => break,
                    };
                    if let Err(e) = self.handle_event(&event).await {
                        match e {
                            Error::Coordination(ref ce) if ce.is_transient() => {
                                // Reconnect-then-replay will re-trigger us.
                                warn!(path = %event.path, error = %e,
                                    "watch fired but the coordination service is unreachable");
                            }
                            e => {
                                error!(path = %event.path, error = %e, "fatal error processing watch event");
                                self.close();
                                break;
                            }
                        }
                    }
                }
            }
        }
        debug!("watch event loop stopped");
    }

    /// Re-arm-and-read under the update lock: the fresh watch is installed
    /// by the same read that fetches the new content, so no concurrent
    /// write can slip in unseen between firing and reinstall.
    async fn handle_event(&self, event: &WatchEvent) -> Result<()> {
        let watch = match self.watches.get(event.path.as_str()) {
            Some(entry) => Arc::clone(entry.value()),
            None => {
                warn!(path = %event.path, "event for unwatched path");
                return Ok(());
            }
        };
        if !watch.fired() {
            // closed; tolerate the final callback
            return Ok(());
        }

        let _guard = self.update_lock.lock().await;
        match (watch.path(), watch.kind()) {
            (CLUSTER_STATE, WatchKind::Data) => {
                let live_nodes = self
                    .cluster_state
                    .load_full()
                    .map(|s| s.live_nodes().clone())
                    .unwrap_or_default();
                info!(live = live_nodes.len(), "cluster state change observed, updating");
                let topology = self.client.get_data(CLUSTER_STATE, true).await?;
                watch.armed();
                let state = ClusterState::load(topology.version, &topology.data, live_nodes)?;
                self.cluster_state.store(Some(Arc::new(state)));
            }
            (LIVE_NODES, WatchKind::Children) => {
                let live_nodes: HashSet<String> =
                    self.client.get_children(LIVE_NODES, true).await?.into_iter().collect();
                watch.armed();
                debug!(live = live_nodes.len(), "updating live nodes");
                if let Some(current) = self.cluster_state.load_full() {
                    self.cluster_state
                        .store(Some(Arc::new(current.with_live_nodes(live_nodes))));
                }
            }
            (ALIASES, WatchKind::Data) => {
                info!("updating aliases");
                let versioned = self.client.get_data(ALIASES, true).await?;
                watch.armed();
                self.aliases.store(Arc::new(Aliases::load(&versioned.data)?));
            }
            (path, kind) => {
                warn!(path, ?kind, "unexpected watch registration");
            }
        }
        Ok(())
    }
}
