//! End-to-end properties of the watch fan-out engine (spec.md §8, properties
//! 1, 4, 5, 7), driven against `MemoryStore` rather than a real cluster
//! store.

use std::sync::Arc;
use std::time::Duration;

use futures::{FutureExt, StreamExt};
use rand::Rng;
use tokio_util::sync::CancellationToken;

use lainlet_core::decode::config::ConfigDecoder;
use lainlet_core::decode::container::ContainerDecoder;
use lainlet_core::store::MemoryStore;
use lainlet_core::watcher::Watcher;

fn pod_group_json(node_name: &str, node_ip: &str, cid: &str) -> Vec<u8> {
    format!(
        r#"{{"Spec":{{"Name":"web.web.api","Namespace":"web","Pod":{{"Annotation":"","Containers":[],"Dependencies":[]}}}},"Pods":[{{"InstanceNo":0,"Containers":[{{"Id":"{cid}","ContainerIp":"10.0.0.1","NodeIp":"{node_ip}","NodeName":"{node_name}","ContainerPort":80}}]}}]}}"#
    )
    .into_bytes()
}

/// Property 1 (snapshot-before-delta): a subscriber registered after the
/// initial snapshot is seeded sees a marker only for changes made after it
/// subscribed; the cache it reads back after that marker reflects at least
/// the full pre-subscription snapshot plus the new write.
#[tokio::test]
async fn snapshot_before_delta() {
    let store = Arc::new(MemoryStore::new());
    store.seed("/lain/config/a", b"1".to_vec());
    let watcher = Watcher::spawn(store.clone(), "/lain/config/", ConfigDecoder).await.unwrap();

    // Pre-subscription snapshot is already visible via get().
    assert_eq!(watcher.get("*").len(), 1);

    let cancel = CancellationToken::new();
    let mut markers = watcher.watch("*", cancel.clone());

    store.set("/lain/config/b", b"2".to_vec());
    tokio::time::timeout(Duration::from_secs(1), markers.next())
        .await
        .expect("marker delivered")
        .expect("stream open");

    // The cache now reflects the pre-subscription snapshot *and* the change
    // observed after subscribing. Derived keys are relative to the subtree
    // root, not the absolute store path.
    let snapshot = watcher.get("*");
    assert_eq!(snapshot.len(), 2);
    assert!(snapshot.contains_key("a"));
    assert!(snapshot.contains_key("b"));
}

/// Property 4 (inverse index integrity): after a sequence of pod-group
/// updates that move a container between nodes, the container Cacher holds
/// exactly one entry per live `(node_name, cid)` and `(node_ip, cid)` pair —
/// no stale entries from earlier node placements survive.
#[tokio::test]
async fn inverse_index_integrity_after_relocation() {
    let store = Arc::new(MemoryStore::new());
    let raw_key = "/lain/deployd/pod_groups/web.web.api";
    store.seed(raw_key, pod_group_json("node-1", "10.1.1.1", "c1"));
    let watcher = Watcher::spawn(store.clone(), "/lain/deployd/pod_groups/", ContainerDecoder)
        .await
        .unwrap();
    assert_eq!(watcher.get("node-1/c1").len(), 1);
    assert_eq!(watcher.get("10.1.1.1/c1").len(), 1);

    let cancel = CancellationToken::new();
    let mut markers = watcher.watch("*", cancel.clone());
    store.set(raw_key, pod_group_json("node-2", "10.2.2.2", "c1"));
    tokio::time::timeout(Duration::from_secs(1), markers.next())
        .await
        .expect("marker delivered");

    assert!(watcher.get("node-1/c1").is_empty(), "stale by-node entry must be retracted");
    assert!(watcher.get("10.1.1.1/c1").is_empty(), "stale by-ip entry must be retracted");
    assert_eq!(watcher.get("node-2/c1").len(), 1);
    assert_eq!(watcher.get("10.2.2.2/c1").len(), 1);
    assert_eq!(watcher.status().total_keys, 2);
}

/// Property 5 (cancellation cleanup): cancelling N subscribers returns
/// `num_receivers` to its pre-subscription value, and does not leak the
/// watcher's dispatch loop (future sends still succeed afterwards).
#[tokio::test]
async fn cancellation_returns_receiver_count_to_baseline() {
    let store = Arc::new(MemoryStore::new());
    let watcher = Watcher::spawn(store.clone(), "/lain/config/", ConfigDecoder).await.unwrap();
    let baseline = watcher.status().num_receivers;

    let mut tokens = Vec::new();
    for _ in 0..8 {
        let cancel = CancellationToken::new();
        let _stream = watcher.watch("*", cancel.clone());
        tokens.push(cancel);
    }
    tokio::task::yield_now().await;
    assert_eq!(watcher.status().num_receivers, baseline + 8);

    for cancel in tokens {
        cancel.cancel();
    }
    // Deregistration happens on a spawned task; give it a tick to run.
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(watcher.status().num_receivers, baseline);

    // The dispatch loop is still alive and functional after the churn.
    let cancel = CancellationToken::new();
    let mut stream = watcher.watch("*", cancel);
    store.set("/lain/config/z", b"1".to_vec());
    tokio::time::timeout(Duration::from_secs(1), stream.next())
        .await
        .expect("dispatch loop still delivers after prior cancellations");
}

/// Property 4, randomized: a container bounced across a random sequence of
/// node placements always leaves the inverse index with exactly one live
/// `(node_name, cid)` and `(node_ip, cid)` pair — whichever placement landed
/// last — and no more, regardless of how many hops it took to get there.
#[tokio::test]
async fn inverse_index_integrity_survives_random_relocation_sequence() {
    let mut rng = rand::thread_rng();
    let store = Arc::new(MemoryStore::new());
    let raw_key = "/lain/deployd/pod_groups/web.web.api";
    let candidate_nodes = [("node-1", "10.1.1.1"), ("node-2", "10.2.2.2"), ("node-3", "10.3.3.3")];
    let (first_node, first_ip) = candidate_nodes[rng.gen_range(0..candidate_nodes.len())];
    store.seed(raw_key, pod_group_json(first_node, first_ip, "c1"));
    let watcher = Watcher::spawn(store.clone(), "/lain/deployd/pod_groups/", ContainerDecoder)
        .await
        .unwrap();

    let cancel = CancellationToken::new();
    let mut markers = watcher.watch("*", cancel.clone());

    let mut last = (first_node, first_ip);
    let hops = rng.gen_range(3..10);
    for _ in 0..hops {
        let (node, ip) = candidate_nodes[rng.gen_range(0..candidate_nodes.len())];
        store.set(raw_key, pod_group_json(node, ip, "c1"));
        tokio::time::timeout(Duration::from_secs(1), markers.next())
            .await
            .expect("marker delivered")
            .expect("stream open");
        last = (node, ip);
    }

    for (node, ip) in candidate_nodes {
        if node == last.0 {
            assert_eq!(watcher.get(&format!("{node}/c1")).len(), 1);
        } else {
            assert!(watcher.get(&format!("{node}/c1")).is_empty(), "stale by-node entry for {node} must be gone");
        }
        if ip == last.1 {
            assert_eq!(watcher.get(&format!("{ip}/c1")).len(), 1);
        } else {
            assert!(watcher.get(&format!("{ip}/c1")).is_empty(), "stale by-ip entry for {ip} must be gone");
        }
    }
    assert_eq!(watcher.status().total_keys, 2, "exactly one live node key and one live ip key, nothing more");
    cancel.cancel();
}

/// Property 7 (backpressure boundedness): a subscriber that never reads
/// still only ever has at most one buffered marker — repeated changes before
/// any read coalesce rather than queuing unboundedly, and delivering to it
/// never blocks the dispatch loop (other subscribers keep receiving).
#[tokio::test]
async fn slow_subscriber_coalesces_without_blocking_others() {
    let store = Arc::new(MemoryStore::new());
    let watcher = Watcher::spawn(store.clone(), "/lain/config/", ConfigDecoder).await.unwrap();

    let slow_cancel = CancellationToken::new();
    let mut slow = watcher.watch("*", slow_cancel.clone());
    let fast_cancel = CancellationToken::new();
    let mut fast = watcher.watch("*", fast_cancel.clone());

    for i in 0..20 {
        store.set(format!("/lain/config/k{i}"), b"v".to_vec());
        // Drain only the fast subscriber; the slow one never reads.
        let _ = tokio::time::timeout(Duration::from_millis(50), fast.next()).await;
    }

    // The dispatch loop never blocked on the slow subscriber (the fast one
    // kept receiving above), and the slow subscriber still has exactly one
    // coalesced marker waiting for it.
    tokio::time::timeout(Duration::from_millis(200), slow.next())
        .await
        .expect("slow subscriber still receives a coalesced marker")
        .expect("stream still open");
    let immediate = slow.next().now_or_never();
    assert!(immediate.is_none(), "no second marker queued beyond the one coalesced slot");

    slow_cancel.cancel();
    fast_cancel.cancel();
}
