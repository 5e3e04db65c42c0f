//! `GET /lainlet/version` and `GET /lainlet/status`: process metadata and a
//! snapshot of every domain Watcher's health, aggregated across watchers of
//! different decoder types. Supplemented from `endpoints/lainlet.go` (dropped
//! from the distilled spec, but this is exactly the ambient status surface
//! SPEC_FULL.md's "carry ambient stack regardless of Non-goals" calls for).

use std::collections::BTreeMap;
use std::sync::Arc;

use lainlet_core::decode::Decoder;
use lainlet_core::watcher::{Status, Watcher};
use serde::Serialize;

/// Type-erases a domain `Watcher<D>`'s [`Status`] accessor so the status
/// endpoint can aggregate watchers of different decoders in one map.
pub trait WatcherStatusSource: Send + Sync {
    fn status(&self) -> Status;
}

impl<D: Decoder> WatcherStatusSource for Watcher<D> {
    fn status(&self) -> Status {
        Watcher::status(self)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct WatcherStatusReply {
    pub num_receivers: usize,
    pub update_time: u64,
    pub last_event: String,
    pub total_keys: usize,
}

impl From<Status> for WatcherStatusReply {
    fn from(s: Status) -> Self {
        Self { num_receivers: s.num_receivers, update_time: s.update_time, last_event: s.last_event, total_keys: s.total_keys }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct StatusReply {
    pub goroutines: usize,
    pub status: BTreeMap<String, WatcherStatusReply>,
}

#[derive(Debug, Clone, Serialize)]
pub struct VersionReply {
    pub version: String,
    pub api_version: String,
}

pub const VERSION: &str = env!("CARGO_PKG_VERSION");
pub const API_VERSION: &str = "1.0";

pub fn version() -> VersionReply {
    VersionReply { version: VERSION.to_string(), api_version: API_VERSION.to_string() }
}

/// `runtime.NumGoroutine()`'s nearest analogue: the number of live Tokio
/// tasks isn't introspectable without an external collector, so this reports
/// worker-thread count, the one ambient concurrency signal `tokio` exposes
/// without extra instrumentation.
pub fn status(watchers: &BTreeMap<String, Arc<dyn WatcherStatusSource>>) -> StatusReply {
    StatusReply {
        goroutines: tokio::runtime::Handle::current().metrics().num_workers(),
        status: watchers.iter().map(|(name, w)| (name.clone(), w.status().into())).collect(),
    }
}
