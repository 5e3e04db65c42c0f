//! One Watcher per domain: owns a subtree, a Cacher, a Decoder, and a
//! subscriber registry; runs a single upstream watch loop plus a dispatch
//! loop that fans events out to concurrent subscribers.
//!
//! Grounded in `kube_runtime::reflector` (cache-seed-then-stream shape) and
//! `kube_runtime::reflector::dispatcher` (subscriber fan-out/backpressure),
//! adapted to spec's drop-oldest, marker-only subscriber channel (Design
//! Note "Drop-oldest fan-out").

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use backoff::backoff::Backoff;
use futures::{Stream, StreamExt};
use parking_lot::RwLock;
use pin_project::pin_project;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::cacher::Cacher;
use crate::decode::{Decoder, Inverter};
use crate::error::StoreError;
use crate::store::{Action, KVPair, StoreAdapter};

/// Diagnostic snapshot of a Watcher, aggregated by the Lainlet meta endpoint.
#[derive(Debug, Clone)]
pub struct Status {
    pub num_receivers: usize,
    pub update_time: u64,
    pub last_event: String,
    pub total_keys: usize,
}

struct StatusInner {
    update_time: u64,
    last_event: String,
}

impl Default for StatusInner {
    fn default() -> Self {
        Self {
            update_time: 0,
            last_event: String::new(),
        }
    }
}

struct Subscriber {
    key: String,
    tx: mpsc::Sender<()>,
}

enum InternalEvent {
    Change { keys: Vec<String> },
    Reset,
    Transient,
}

/// A registered watch's stream of change markers. Every item means "cache
/// may have changed under your key, re-project." The stream ends when the
/// caller's cancellation token fires or the Watcher itself shuts down.
#[pin_project]
pub struct WatchStream {
    #[pin]
    rx: tokio_stream::wrappers::ReceiverStream<()>,
}

impl Stream for WatchStream {
    type Item = ();

    fn poll_next(
        self: std::pin::Pin<&mut Self>,
        cx: &mut std::task::Context<'_>,
    ) -> std::task::Poll<Option<Self::Item>> {
        self.project().rx.poll_next(cx)
    }
}

/// One Watcher per domain, generic over its Decoder (and thus its cached
/// value type).
pub struct Watcher<D: Decoder> {
    root: String,
    store: Arc<dyn StoreAdapter>,
    decoder: D,
    cache: Cacher<D::Value>,
    inverter: RwLock<Inverter>,
    subscribers: RwLock<HashMap<u64, Subscriber>>,
    next_sub_id: AtomicU64,
    status: RwLock<StatusInner>,
    shutdown: CancellationToken,
}

fn now_unix() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

impl<D: Decoder> Watcher<D> {
    /// Fetch the initial subtree, seed the cache, then spawn the watch loop
    /// and the dispatch loop. Returns once the initial snapshot is ready.
    pub async fn spawn(
        store: Arc<dyn StoreAdapter>,
        root: impl Into<String>,
        decoder: D,
    ) -> Result<Arc<Self>, StoreError> {
        let root = root.into();
        let initial = store.list_subtree(&root).await?;

        let watcher = Arc::new(Self {
            root: root.clone(),
            store,
            decoder,
            cache: Cacher::new(),
            inverter: RwLock::new(Inverter::new()),
            subscribers: RwLock::new(HashMap::new()),
            next_sub_id: AtomicU64::new(0),
            status: RwLock::new(StatusInner::default()),
            shutdown: CancellationToken::new(),
        });

        let mut seen = HashSet::new();
        {
            let mut inverter = watcher.inverter.write();
            for pair in &initial {
                seen.insert(pair.key.clone());
                watcher.apply_one(pair, &mut inverter);
            }
        }
        {
            let mut status = watcher.status.write();
            status.update_time = now_unix();
            status.last_event = "initial snapshot".to_string();
        }

        let (tx, rx) = mpsc::channel(64);
        tokio::spawn(Self::run_dispatch_loop(watcher.clone(), rx));
        tokio::spawn(Self::run_watch_loop(watcher.clone(), seen, tx));

        Ok(watcher)
    }

    fn derived_key_for(&self, raw_key: &str) -> Option<String> {
        self.decoder.derived_key_hint(raw_key)
    }

    /// Strip this watcher's subtree root from an absolute store key. Every
    /// decoder operates on keys relative to the root (e.g. `foo` under
    /// `/lain/config`, `web.web.api` under `/lain/deployd/pod_groups`); the
    /// store itself only ever hands back absolute paths.
    fn relative_key<'a>(&self, raw_key: &'a str) -> &'a str {
        raw_key.strip_prefix(self.root.as_str()).unwrap_or(raw_key).trim_start_matches('/')
    }

    /// Decode one raw pair, looking up its previous cached value when the
    /// decoder can name its derived key ahead of parsing, and apply the
    /// resulting updates to the cache. Returns the set of derived keys
    /// touched.
    fn apply_one(&self, pair: &KVPair, inverter: &mut Inverter) -> Vec<String> {
        let relative_key = self.relative_key(&pair.key).to_string();
        let previous = self
            .derived_key_for(&relative_key)
            .and_then(|key| self.cache.get(&key).remove(&key));
        let relative_pair = KVPair { key: relative_key, ..pair.clone() };
        let outcome = self.decoder.decode(&relative_pair, previous.as_ref(), inverter);
        let mut touched = Vec::with_capacity(outcome.updates.len());
        for (key, value) in outcome.updates {
            self.cache.put(key.clone(), value);
            touched.push(key);
        }
        touched
    }

    fn apply_removed(&self, raw_key: &str, inverter: &mut Inverter) -> Vec<String> {
        let relative_key = self.relative_key(raw_key);
        let previous = self
            .derived_key_for(relative_key)
            .and_then(|key| self.cache.get(&key).remove(&key));
        let outcome = self.decoder.decode_removed(relative_key, previous.as_ref(), inverter);
        let mut touched = Vec::with_capacity(outcome.updates.len());
        for (key, value) in outcome.updates {
            self.cache.put(key.clone(), value);
            touched.push(key);
        }
        touched
    }

    async fn run_watch_loop(
        self: Arc<Self>,
        mut seen: HashSet<String>,
        internal_tx: mpsc::Sender<InternalEvent>,
    ) {
        let mut backoff = backoff::ExponentialBackoffBuilder::new()
            .with_initial_interval(Duration::from_secs(1))
            .with_max_interval(Duration::from_secs(30))
            .with_max_elapsed_time(None)
            .build();
        let mut last_index: u64 = 0;

        'reconnect: loop {
            if self.shutdown.is_cancelled() {
                return;
            }
            let stream = match self
                .store
                .watch_subtree(&self.root, last_index, self.shutdown.clone())
                .await
            {
                Ok(stream) => stream,
                Err(err) => {
                    tracing::warn!(root = %self.root, %err, "failed to establish watch, backing off");
                    if let Some(wait) = backoff.next_backoff() {
                        tokio::time::sleep(wait).await;
                    }
                    continue 'reconnect;
                }
            };
            tokio::pin!(stream);

            while let Some(event) = stream.next().await {
                if self.shutdown.is_cancelled() {
                    return;
                }
                match event.action {
                    Action::Error => {
                        let message = event
                            .data
                            .first()
                            .map(|kv| String::from_utf8_lossy(&kv.value).into_owned())
                            .unwrap_or_default();
                        tracing::warn!(root = %self.root, %message, "watch transport error, backing off");
                        {
                            let mut status = self.status.write();
                            status.last_event = format!("error: {message}");
                        }
                        let _ = internal_tx.send(InternalEvent::Transient).await;
                        if let Some(wait) = backoff.next_backoff() {
                            tokio::time::sleep(wait).await;
                        }
                        continue 'reconnect;
                    }
                    Action::Delete if event.key == self.root => {
                        self.cache.reset(HashMap::new());
                        self.inverter.write().replace(&self.root, Vec::new());
                        seen.clear();
                        last_index = event.modified_index;
                        {
                            let mut status = self.status.write();
                            status.update_time = now_unix();
                            status.last_event = "reset: root deleted".to_string();
                        }
                        let _ = internal_tx.send(InternalEvent::Reset).await;
                    }
                    _ => {
                        backoff.reset();
                        last_index = event.modified_index;
                        let mut touched = Vec::new();
                        let current_keys: HashSet<String> =
                            event.data.iter().map(|kv| kv.key.clone()).collect();
                        {
                            let mut inverter = self.inverter.write();
                            for pair in &event.data {
                                touched.extend(self.apply_one(pair, &mut inverter));
                            }
                            for stale_raw_key in seen.difference(&current_keys).cloned().collect::<Vec<_>>() {
                                touched.extend(self.apply_removed(&stale_raw_key, &mut inverter));
                            }
                        }
                        seen = current_keys;
                        {
                            let mut status = self.status.write();
                            status.update_time = now_unix();
                            status.last_event = format!("{:?} {}", event.action, event.key);
                        }
                        if !touched.is_empty() {
                            let _ = internal_tx.send(InternalEvent::Change { keys: touched }).await;
                        }
                    }
                }
            }

            if self.shutdown.is_cancelled() {
                return;
            }
            tracing::warn!(root = %self.root, "watch stream closed unexpectedly, reconnecting");
            if let Some(wait) = backoff.next_backoff() {
                tokio::time::sleep(wait).await;
            }
        }
    }

    async fn run_dispatch_loop(self: Arc<Self>, mut rx: mpsc::Receiver<InternalEvent>) {
        while let Some(event) = rx.recv().await {
            let subscribers = self.subscribers.read();
            match event {
                InternalEvent::Reset | InternalEvent::Transient => {
                    for sub in subscribers.values() {
                        let _ = sub.tx.try_send(());
                    }
                }
                InternalEvent::Change { keys } => {
                    for sub in subscribers.values() {
                        if keys.iter().any(|k| Cacher::<()>::subscription_matches(&sub.key, k)) {
                            let _ = sub.tx.try_send(());
                        }
                    }
                }
            }
        }
    }

    /// Cache snapshot of the entries matching `key`, per the Cacher's
    /// exact-or-prefix rule.
    pub fn get(&self, key: &str) -> HashMap<String, D::Value> {
        self.cache.query(key)
    }

    /// Register a subscriber. Returns a stream of change markers; the
    /// stream ends when `cancel` fires or the Watcher shuts down.
    ///
    /// Takes `self: &Arc<Self>` (rather than `&self`) because deregistering
    /// on cancellation needs a task that outlives this call, which must
    /// hold its own strong reference to the Watcher.
    pub fn watch(self: &Arc<Self>, key: impl Into<String>, cancel: CancellationToken) -> WatchStream {
        let (tx, rx) = mpsc::channel(1);
        let id = self.next_sub_id.fetch_add(1, Ordering::Relaxed);
        self.subscribers.write().insert(
            id,
            Subscriber {
                key: key.into(),
                tx,
            },
        );

        let watcher = Arc::clone(self);
        tokio::spawn(async move {
            cancel.cancelled().await;
            watcher.unregister(id);
        });

        WatchStream {
            rx: tokio_stream::wrappers::ReceiverStream::new(rx),
        }
    }

    fn unregister(&self, id: u64) {
        self.subscribers.write().remove(&id);
    }

    pub fn status(&self) -> Status {
        let status = self.status.read();
        Status {
            num_receivers: self.subscribers.read().len(),
            update_time: status.update_time,
            last_event: status.last_event.clone(),
            total_keys: self.cache.count(),
        }
    }

    pub fn shutdown(&self) {
        self.shutdown.cancel();
        for sub in self.subscribers.write().drain() {
            drop(sub);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decode::config::ConfigDecoder;
    use crate::store::MemoryStore;
    use futures::StreamExt;

    #[tokio::test]
    async fn initial_snapshot_is_seeded_before_watch_returns() {
        let store = Arc::new(MemoryStore::new());
        store.seed("/lain/config/a", b"1".to_vec());
        let watcher = Watcher::spawn(store, "/lain/config/", ConfigDecoder).await.unwrap();
        assert_eq!(watcher.get("/lain/config/a").len(), 1);
    }

    #[tokio::test]
    async fn watch_delivers_marker_on_change() {
        let store = Arc::new(MemoryStore::new());
        let watcher = Watcher::spawn(store.clone(), "/lain/config/", ConfigDecoder).await.unwrap();
        let cancel = CancellationToken::new();
        let mut stream = watcher.watch("*", cancel.clone());
        store.set("/lain/config/a", b"1".to_vec());
        let marker = tokio::time::timeout(Duration::from_secs(1), stream.next()).await;
        assert!(marker.is_ok());
    }

    #[tokio::test]
    async fn status_reports_receiver_and_key_counts() {
        let store = Arc::new(MemoryStore::new());
        store.seed("/lain/config/a", b"1".to_vec());
        let watcher = Watcher::spawn(store, "/lain/config/", ConfigDecoder).await.unwrap();
        let cancel = CancellationToken::new();
        let _stream = watcher.watch("*", cancel);
        tokio::task::yield_now().await;
        let status = watcher.status();
        assert_eq!(status.total_keys, 1);
        assert_eq!(status.num_receivers, 1);
    }
}
