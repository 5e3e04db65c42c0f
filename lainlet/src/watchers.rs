//! Wires the five domain watchers (config, container, pod-group, depends,
//! nodes) against one shared store and exposes them both to endpoint
//! dispatchers and to the status endpoint's watcher catalogue.

use std::collections::BTreeMap;
use std::sync::Arc;

use lainlet_core::decode::config::ConfigDecoder;
use lainlet_core::decode::container::ContainerDecoder;
use lainlet_core::decode::depends::DependsDecoder;
use lainlet_core::decode::nodes::NodesDecoder;
use lainlet_core::decode::pod_group::PodGroupDecoder;
use lainlet_core::error::StoreError;
use lainlet_core::store::StoreAdapter;
use lainlet_core::watcher::Watcher;

use crate::endpoints::status::WatcherStatusSource;

/// The subtree roots each domain watcher subscribes to, per spec.md §4.6.
///
/// The container watcher reads the same raw pod-group entries the pod-group
/// watcher does (`ContainerDecoder::decode` parses `RawPodGroupEntry`, not a
/// separate per-container record) and fans each one into its derived
/// `nodename/cid` and `nodeip/cid` keys, matching the original's
/// `container.KEY = "/lain/deployd/pod_groups"`.
pub mod roots {
    pub const CONFIG: &str = "/lain/config";
    pub const POD_GROUP: &str = "/lain/deployd/pod_groups";
    pub const CONTAINER: &str = POD_GROUP;
    pub const DEPENDS: &str = "/lain/deployd/depends";
    pub const NODES: &str = "/lain/deployd/nodes";
}

/// Every watcher `lainletd` spawns at startup. Held as `Arc`s so both
/// endpoint dispatchers and the status endpoint's catalogue can share them.
pub struct Watchers {
    pub config: Arc<Watcher<ConfigDecoder>>,
    pub container: Arc<Watcher<ContainerDecoder>>,
    pub pod_group: Arc<Watcher<PodGroupDecoder>>,
    pub depends: Arc<Watcher<DependsDecoder>>,
    pub nodes: Arc<Watcher<NodesDecoder>>,
}

impl Watchers {
    pub async fn spawn(store: Arc<dyn StoreAdapter>) -> Result<Self, StoreError> {
        let config = Watcher::spawn(store.clone(), roots::CONFIG, ConfigDecoder).await?;
        let container = Watcher::spawn(store.clone(), roots::CONTAINER, ContainerDecoder).await?;
        let pod_group = Watcher::spawn(store.clone(), roots::POD_GROUP, PodGroupDecoder).await?;
        let depends = Watcher::spawn(store.clone(), roots::DEPENDS, DependsDecoder).await?;
        let nodes = Watcher::spawn(store, roots::NODES, NodesDecoder).await?;
        Ok(Self { config, container, pod_group, depends, nodes })
    }

    /// Type-erased view used by the status endpoint, keyed by the same
    /// names the original exposed per watcher in its status map.
    pub fn status_sources(&self) -> BTreeMap<String, Arc<dyn WatcherStatusSource>> {
        let mut out: BTreeMap<String, Arc<dyn WatcherStatusSource>> = BTreeMap::new();
        out.insert("configwatcher".to_string(), self.config.clone());
        out.insert("containerwatcher".to_string(), self.container.clone());
        out.insert("podgroupwatcher".to_string(), self.pod_group.clone());
        out.insert("dependswatcher".to_string(), self.depends.clone());
        out.insert("nodeswatcher".to_string(), self.nodes.clone());
        out
    }
}
