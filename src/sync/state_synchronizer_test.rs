use std::sync::Arc;
use std::time::Duration;
use std::time::Instant;

use serde_json::json;
use tokio::time::sleep;

use super::StateSynchronizer;
use crate::test_utils::MemoryCoordination;
use crate::ApiError;
use crate::Error;
use crate::ReplicaState;
use crate::SyncConfig;
use crate::WatchState;
use crate::ALIASES;
use crate::CLUSTER_STATE;

fn test_settings() -> SyncConfig {
    SyncConfig {
        update_delay_ms: 50,
        leader_poll_interval_ms: 5,
        default_leader_timeout_ms: 200,
    }
}

/// Topology with collection `c1`, active shard `s1`: leader `r1` on n1,
/// follower `r2` on n2 in the given state, `r3` down on n2.
fn topology_doc(r2_state: &str, with_leader: bool) -> Vec<u8> {
    let mut r1 = json!({
        "core": "c1_s1_replica1",
        "node_name": "n1:8983_search",
        "state": "active",
        "base_url": "http://n1:8983/search"
    });
    if with_leader {
        r1["leader"] = json!("true");
    }
    serde_json::to_vec(&json!({
        "c1": {
            "router": {"name": "compositeId"},
            "shards": {
                "s1": {
                    "range": "80000000-ffffffff",
                    "state": "active",
                    "replicas": {
                        "r1": r1,
                        "r2": {
                            "core": "c1_s1_replica2",
                            "node_name": "n2:8983_search",
                            "state": r2_state
                        },
                        "r3": {
                            "core": "c1_s1_replica3",
                            "node_name": "n2:8983_search",
                            "state": "down"
                        }
                    }
                }
            }
        }
    }))
    .expect("should encode")
}

async fn wait_until(what: &str, cond: impl Fn() -> bool) {
    let deadline = Instant::now() + Duration::from_secs(2);
    while !cond() {
        if Instant::now() > deadline {
            panic!("timed out waiting for {what}");
        }
        sleep(Duration::from_millis(5)).await;
    }
}

async fn opened(
    client: &Arc<MemoryCoordination>,
    events: tokio::sync::mpsc::UnboundedReceiver<crate::WatchEvent>,
) -> Arc<StateSynchronizer<MemoryCoordination>> {
    let sync = StateSynchronizer::new(Arc::clone(client), test_settings());
    sync.open(events).await.expect("should open");
    sync
}

/// # Case 1: Opening publishes the initial snapshot and arms every watch
///
/// ## Setup
/// 1. Seed the topology document and one live-node entry
/// 2. Open the synchronizer
///
/// ## Validation criteria
/// 1. The snapshot holds the seeded collection and live node
/// 2. All three watches are armed
#[tokio::test]
async fn test_open_publishes_initial_snapshot() {
    let (client, events) = MemoryCoordination::new();
    client.put(CLUSTER_STATE, &topology_doc("active", true));
    client.put("/live_nodes/n1:8983_search", b"");
    let sync = opened(&client, events).await;

    let state = sync.cluster_state().expect("snapshot published");
    assert!(state.collection("c1").is_some());
    assert!(state.live_nodes_contain("n1:8983_search"));
    assert!(sync.aliases().is_empty());

    assert_eq!(sync.watch_state(CLUSTER_STATE), Some(WatchState::Armed));
    assert_eq!(sync.watch_state(crate::LIVE_NODES), Some(WatchState::Armed));
    assert_eq!(sync.watch_state(ALIASES), Some(WatchState::Armed));
}

/// # Case 2: Topology changes propagate through the watch, repeatedly
///
/// ## Validation criteria
/// 1. Each remote write is observed without any explicit reload call
/// 2. The second write proves the watch was re-armed after the first
/// 3. The snapshot version never decreases
#[tokio::test]
async fn test_topology_watch_rearms() {
    let (client, events) = MemoryCoordination::new();
    client.put(CLUSTER_STATE, &topology_doc("down", true));
    client.put("/live_nodes/n1:8983_search", b"");
    let sync = opened(&client, events).await;
    let v0 = sync.cluster_state().expect("snapshot").version();

    client.put(CLUSTER_STATE, &topology_doc("recovering", true));
    wait_until("first topology update", || {
        sync.cluster_state().is_some_and(|s| s.version() > v0)
    })
    .await;
    let v1 = sync.cluster_state().expect("snapshot").version();
    assert!(v1 > v0);

    client.put(CLUSTER_STATE, &topology_doc("active", true));
    wait_until("second topology update", || {
        sync.cluster_state().is_some_and(|s| s.version() > v1)
    })
    .await;
    let state = sync.cluster_state().expect("snapshot");
    let r2 = state.collection("c1").unwrap().slice("s1").unwrap().replica("r2").unwrap();
    assert_eq!(r2.state(), ReplicaState::Active);
}

/// # Case 3: Node join and leave refresh only the live-node set
///
/// ## Validation criteria
/// 1. Registry changes are observed through the children watch
/// 2. The collection tree of the new snapshot is the same allocation
#[tokio::test]
async fn test_live_node_changes_share_collection_tree() {
    let (client, events) = MemoryCoordination::new();
    client.put(CLUSTER_STATE, &topology_doc("active", true));
    client.put("/live_nodes/n1:8983_search", b"");
    let sync = opened(&client, events).await;
    let before = sync.cluster_state().expect("snapshot");

    client.put("/live_nodes/n2:8983_search", b"");
    wait_until("node join", || {
        sync.cluster_state().is_some_and(|s| s.live_nodes_contain("n2:8983_search"))
    })
    .await;
    let joined = sync.cluster_state().expect("snapshot");
    assert!(Arc::ptr_eq(before.collections_handle(), joined.collections_handle()));

    client.remove("/live_nodes/n1:8983_search");
    wait_until("node leave", || {
        sync.cluster_state().is_some_and(|s| !s.live_nodes_contain("n1:8983_search"))
    })
    .await;
}

/// # Case 4: Scheduled reloads are debounced
///
/// ## Setup
/// No event loop here: the synchronizer is used without `open`, so only
/// explicit reload calls move the snapshot.
///
/// ## Validation criteria
/// 1. A non-immediate reload is not visible before the delay
/// 2. It is visible after the delay
#[tokio::test]
async fn test_debounced_reload() {
    let (client, _events) = MemoryCoordination::new();
    client.put(CLUSTER_STATE, &topology_doc("down", true));
    let sync = StateSynchronizer::new(Arc::clone(&client), test_settings());
    sync.update_cluster_state(true).await.expect("immediate reload");
    let v0 = sync.cluster_state().expect("snapshot").version();

    client.put(CLUSTER_STATE, &topology_doc("active", true));
    sync.update_cluster_state(false).await.expect("schedule");
    sync.update_cluster_state(false).await.expect("coalesced schedule");
    assert_eq!(sync.cluster_state().expect("snapshot").version(), v0);

    wait_until("debounced reload", || {
        sync.cluster_state().is_some_and(|s| s.version() > v0)
    })
    .await;
}

/// # Case 5: Live-nodes-only reload shares the collection tree
#[tokio::test]
async fn test_update_live_nodes_only() {
    let (client, _events) = MemoryCoordination::new();
    client.put(CLUSTER_STATE, &topology_doc("active", true));
    let sync = StateSynchronizer::new(Arc::clone(&client), test_settings());
    sync.update_cluster_state(true).await.expect("immediate reload");
    let before = sync.cluster_state().expect("snapshot");

    client.put("/live_nodes/n1:8983_search", b"");
    sync.update_live_nodes().await.expect("live-nodes reload");
    let after = sync.cluster_state().expect("snapshot");
    assert!(after.live_nodes_contain("n1:8983_search"));
    assert!(Arc::ptr_eq(before.collections_handle(), after.collections_handle()));
}

/// # Case 6: Leader discovery returns an established leader immediately
#[tokio::test]
async fn test_get_leader_immediate() {
    let (client, events) = MemoryCoordination::new();
    client.put(CLUSTER_STATE, &topology_doc("active", true));
    client.put("/live_nodes/n1:8983_search", b"");
    let sync = opened(&client, events).await;

    let leader = sync
        .get_leader("c1", "s1", Duration::from_secs(1))
        .await
        .expect("leader known");
    assert_eq!(leader.name(), "r1");
    assert_eq!(
        sync.leader_url("c1", "s1", Duration::from_secs(1)).await.expect("url"),
        "http://n1:8983/search/c1_s1_replica1"
    );
}

/// # Case 7: A recorded leader on a dead node is not a leader
///
/// ## Validation criteria
/// 1. Discovery keeps polling for the whole budget, then fails
/// 2. The error reports at least the requested wait
#[tokio::test]
async fn test_get_leader_dead_node_times_out() {
    let (client, events) = MemoryCoordination::new();
    client.put(CLUSTER_STATE, &topology_doc("active", true));
    // n1 never registers as live
    client.put("/live_nodes/n2:8983_search", b"");
    let sync = opened(&client, events).await;

    let timeout = Duration::from_millis(50);
    let started = Instant::now();
    match sync.get_leader("c1", "s1", timeout).await {
        Err(Error::Api(ApiError::LeaderNotFound { collection, shard, waited })) => {
            assert_eq!(collection, "c1");
            assert_eq!(shard, "s1");
            assert!(waited >= timeout);
        }
        other => panic!("expected LeaderNotFound, got {other:?}"),
    }
    assert!(started.elapsed() >= timeout);
}

/// # Case 7b: Discovery without an explicit budget uses the configured one
///
/// ## Validation criteria
/// 1. With a live leader, the default-budget variant returns it
/// 2. Without one it burns exactly the configured default before failing
#[tokio::test]
async fn test_get_leader_default_budget() {
    let (client, events) = MemoryCoordination::new();
    client.put(CLUSTER_STATE, &topology_doc("active", true));
    client.put("/live_nodes/n1:8983_search", b"");
    let sync = opened(&client, events).await;

    let leader = sync.get_leader_default("c1", "s1").await.expect("leader known");
    assert_eq!(leader.name(), "r1");

    client.remove("/live_nodes/n1:8983_search");
    wait_until("node leave", || {
        sync.cluster_state().is_some_and(|s| !s.live_nodes_contain("n1:8983_search"))
    })
    .await;

    let default_budget = test_settings().default_leader_timeout();
    let started = Instant::now();
    match sync.get_leader_default("c1", "s1").await {
        Err(Error::Api(ApiError::LeaderNotFound { waited, .. })) => {
            assert!(waited >= default_budget);
        }
        other => panic!("expected LeaderNotFound, got {other:?}"),
    }
    assert!(started.elapsed() >= default_budget);
}

/// # Case 8: Discovery picks up a leader elected while polling
#[tokio::test]
async fn test_get_leader_waits_for_election() {
    let (client, events) = MemoryCoordination::new();
    client.put(CLUSTER_STATE, &topology_doc("active", false));
    client.put("/live_nodes/n1:8983_search", b"");
    let sync = opened(&client, events).await;

    let writer = Arc::clone(&client);
    tokio::spawn(async move {
        sleep(Duration::from_millis(20)).await;
        writer.put(CLUSTER_STATE, &topology_doc("active", true));
    });

    let leader = sync
        .get_leader("c1", "s1", Duration::from_secs(2))
        .await
        .expect("leader elected while waiting");
    assert_eq!(leader.name(), "r1");
}

/// # Case 9: Replica selection filters self, dead nodes and states
///
/// ## Setup
/// `s1` holds r1 (active leader, n1), r2 (active, n2), r3 (down, n2);
/// only n1 and n2 are live.
#[tokio::test]
async fn test_get_replica_props_filters() {
    let (client, events) = MemoryCoordination::new();
    client.put(CLUSTER_STATE, &topology_doc("active", true));
    client.put("/live_nodes/n1:8983_search", b"");
    client.put("/live_nodes/n2:8983_search", b"");
    let sync = opened(&client, events).await;

    let mut names: Vec<String> = sync
        .get_replica_props("c1", "s1", "r1", None, None)
        .expect("should select")
        .into_iter()
        .map(|r| r.core_node_name)
        .collect();
    names.sort();
    assert_eq!(names, vec!["r2", "r3"]);

    let active = sync
        .get_replica_props("c1", "s1", "r1", Some(ReplicaState::Active), None)
        .expect("should select");
    assert_eq!(active.len(), 1);
    assert_eq!(active[0].core_node_name, "r2");
    assert_eq!(active[0].core_url(), "http://n2:8983/search/c1_s1_replica2");

    let not_down = sync
        .get_replica_props("c1", "s1", "r1", None, Some(ReplicaState::Down))
        .expect("should select");
    assert_eq!(not_down.len(), 1);
    assert_eq!(not_down[0].core_node_name, "r2");

    match sync.get_replica_props("missing", "s1", "r1", None, None) {
        Err(Error::Api(ApiError::CollectionNotFound(name))) => assert_eq!(name, "missing"),
        other => panic!("expected CollectionNotFound, got {other:?}"),
    }
    match sync.get_replica_props("c1", "missing", "r1", None, None) {
        Err(Error::Api(ApiError::ShardNotFound { shard, .. })) => assert_eq!(shard, "missing"),
        other => panic!("expected ShardNotFound, got {other:?}"),
    }
}

/// # Case 10: Peers on dead nodes do not count
///
/// With n2 not live, excluding the leader itself leaves nothing. Empty
/// here means "no usable peer", indistinguishable from "no peer at all".
#[tokio::test]
async fn test_get_replica_props_excludes_dead_nodes() {
    let (client, events) = MemoryCoordination::new();
    client.put(CLUSTER_STATE, &topology_doc("active", true));
    client.put("/live_nodes/n1:8983_search", b"");
    let sync = opened(&client, events).await;

    let refs = sync
        .get_replica_props("c1", "s1", "r1", None, None)
        .expect("should select");
    assert!(refs.is_empty());
}

/// # Case 11: Config-name lookup validates that the config exists
#[tokio::test]
async fn test_read_config_name() {
    let (client, events) = MemoryCoordination::new();
    client.put(CLUSTER_STATE, &topology_doc("active", true));
    let pointer = serde_json::to_vec(&json!({"configName": "conf1"})).expect("should encode");
    client.put("/collections/c1", &pointer);
    client.put("/configs/conf1", b"");
    let sync = opened(&client, events).await;

    assert_eq!(sync.read_config_name("c1").await.expect("should resolve"), "conf1");

    // pointer names a config that was never uploaded
    let dangling = serde_json::to_vec(&json!({"configName": "ghost"})).expect("should encode");
    client.put("/collections/c2", &dangling);
    match sync.read_config_name("c2").await {
        Err(Error::Api(ApiError::ConfigNotFound(name))) => assert_eq!(name, "ghost"),
        other => panic!("expected ConfigNotFound, got {other:?}"),
    }

    match sync.read_config_name("c3").await {
        Err(Error::Api(ApiError::CollectionNotFound(name))) => assert_eq!(name, "c3"),
        other => panic!("expected CollectionNotFound, got {other:?}"),
    }
}

/// # Case 12: Alias changes propagate through the alias watch
#[tokio::test]
async fn test_alias_watch() {
    let (client, events) = MemoryCoordination::new();
    client.put(CLUSTER_STATE, &topology_doc("active", true));
    let sync = opened(&client, events).await;
    assert!(sync.aliases().is_empty());

    let doc = serde_json::to_vec(&json!({"collection": {"main": "c1"}})).expect("should encode");
    client.put(ALIASES, &doc);
    wait_until("alias update", || {
        sync.aliases().collection_alias("main") == Some("c1")
    })
    .await;
}

/// # Case 13: Close abandons watches and unblocks waiters
///
/// ## Validation criteria
/// 1. Watches report abandoned
/// 2. Leader discovery fails promptly instead of burning its budget
/// 3. Later remote writes no longer move the snapshot
#[tokio::test]
async fn test_close() {
    let (client, events) = MemoryCoordination::new();
    client.put(CLUSTER_STATE, &topology_doc("active", true));
    let sync = opened(&client, events).await;
    let version = sync.cluster_state().expect("snapshot").version();

    sync.close();
    assert!(sync.is_closed());
    assert_eq!(sync.watch_state(CLUSTER_STATE), Some(WatchState::Abandoned));

    let started = Instant::now();
    assert!(sync.get_leader("c1", "missing", Duration::from_secs(10)).await.is_err());
    assert!(started.elapsed() < Duration::from_secs(1));

    client.put(CLUSTER_STATE, &topology_doc("down", true));
    sleep(Duration::from_millis(50)).await;
    assert_eq!(sync.cluster_state().expect("snapshot").version(), version);
}

/// # Case 14: Selection before the first snapshot is empty, not an error
#[tokio::test]
async fn test_replica_props_before_first_snapshot() {
    let (client, _events) = MemoryCoordination::new();
    let sync = StateSynchronizer::new(client, test_settings());
    assert!(sync
        .get_replica_props("c1", "s1", "r1", None, None)
        .expect("empty before load")
        .is_empty());
}
