//! The store adapter boundary: a uniform interface over the upstream
//! key/value store. Real backends (etcd, Xline, consul) live outside this
//! crate; this module only defines the contract the rest of the engine
//! consumes, plus an in-memory double used in tests.

use std::collections::BTreeMap;
use std::pin::Pin;
use std::sync::Arc;

use async_trait::async_trait;
use futures::Stream;
use parking_lot::Mutex;
use tokio_util::sync::CancellationToken;

use crate::error::StoreError;

/// A single key/value entry as observed from the store, tagged with the
/// store's own modification index.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KVPair {
    pub key: String,
    pub value: Vec<u8>,
    pub index: u64,
}

impl KVPair {
    pub fn new(key: impl Into<String>, value: impl Into<Vec<u8>>, index: u64) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
            index,
        }
    }
}

/// The kind of mutation a watch [`Event`] reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Get,
    Update,
    Delete,
    Error,
}

/// A single observed mutation on a watched subtree.
///
/// `data` carries a re-read of the subtree at the time of the event (see
/// [`StoreAdapter::watch_subtree`] for the re-read trade-off), except for
/// `Action::Delete` on the subtree root, where it is always empty, and
/// `Action::Error`, where it carries a single synthetic pair describing the
/// failure.
#[derive(Debug, Clone)]
pub struct Event {
    pub action: Action,
    pub key: String,
    pub modified_index: u64,
    pub data: Vec<KVPair>,
}

impl Event {
    pub fn error(key: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            action: Action::Error,
            key: key.into(),
            modified_index: 0,
            data: vec![KVPair::new("error", message.into().into_bytes(), 0)],
        }
    }

    pub fn delete_root(key: impl Into<String>, modified_index: u64) -> Self {
        Self {
            action: Action::Delete,
            key: key.into(),
            modified_index,
            data: Vec::new(),
        }
    }
}

pub type EventStream = Pin<Box<dyn Stream<Item = Event> + Send>>;

/// Uniform interface over the upstream key/value store.
///
/// Implementations are responsible for their own connection management and
/// retry of individual RPCs; the engine only relies on `watch_subtree`
/// terminating its stream (rather than hanging) on unrecoverable errors, and
/// on `list_subtree` returning results sorted by key.
#[async_trait]
pub trait StoreAdapter: Send + Sync + 'static {
    /// Fetch a single key. `Ok(None)` means the key does not exist.
    async fn get(&self, key: &str) -> Result<Option<KVPair>, StoreError>;

    /// Recursively list every leaf under `key`, sorted by key.
    async fn list_subtree(&self, key: &str) -> Result<Vec<KVPair>, StoreError>;

    /// Watch every mutation under `key` from (after) `after_index`.
    ///
    /// The returned stream emits one [`Event`] per observed mutation, in
    /// non-decreasing `modified_index` order. On a transport error it
    /// emits a single terminal `Action::Error` event and closes. On
    /// deletion of `key` itself it emits a single `Action::Delete` event
    /// with empty `data` and closes.
    async fn watch_subtree(
        &self,
        key: &str,
        after_index: u64,
        cancel: CancellationToken,
    ) -> Result<EventStream, StoreError>;
}

/// An in-memory [`StoreAdapter`] used by tests and by the `lainletd` demo
/// binary in the absence of a real cluster store.
///
/// Mutations made through [`MemoryStore::set`]/[`MemoryStore::delete`] are
/// fanned out to every outstanding `watch_subtree` stream rooted at or above
/// the mutated key.
#[derive(Clone)]
pub struct MemoryStore {
    inner: Arc<Mutex<MemoryStoreState>>,
}

struct MemoryStoreState {
    data: BTreeMap<String, (Vec<u8>, u64)>,
    next_index: u64,
    watchers: Vec<(String, tokio::sync::mpsc::UnboundedSender<Event>)>,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new(MemoryStoreState {
                data: BTreeMap::new(),
                next_index: 1,
                watchers: Vec::new(),
            })),
        }
    }

    /// Seed or overwrite a key without generating a watch event. Useful for
    /// preparing fixture state before a watcher starts its initial list.
    pub fn seed(&self, key: impl Into<String>, value: impl Into<Vec<u8>>) {
        let mut inner = self.inner.lock();
        let idx = inner.next_index;
        inner.next_index += 1;
        inner.data.insert(key.into(), (value.into(), idx));
    }

    /// Set a key and notify watchers rooted at a prefix of it.
    pub fn set(&self, key: impl Into<String>, value: impl Into<Vec<u8>>) {
        let key = key.into();
        let value = value.into();
        let mut inner = self.inner.lock();
        let idx = inner.next_index;
        inner.next_index += 1;
        inner.data.insert(key.clone(), (value, idx));
        Self::notify(&mut inner, &key, idx);
    }

    /// Delete a key and notify watchers rooted at a prefix of it.
    pub fn delete(&self, key: &str) {
        let mut inner = self.inner.lock();
        let idx = inner.next_index;
        inner.next_index += 1;
        let is_root_delete = inner.watchers.iter().any(|(root, _)| root == key);
        inner.data.remove(key);
        if is_root_delete {
            let watchers: Vec<_> = inner
                .watchers
                .iter()
                .filter(|(root, _)| root == key)
                .cloned()
                .collect();
            for (root, tx) in watchers {
                let _ = tx.send(Event::delete_root(root, idx));
            }
            inner.watchers.retain(|(root, _)| root != key);
        }
        Self::notify(&mut inner, key, idx);
    }

    fn notify(inner: &mut MemoryStoreState, mutated_key: &str, idx: u64) {
        let roots: Vec<_> = inner
            .watchers
            .iter()
            .filter(|(root, _)| mutated_key.starts_with(root.as_str()))
            .map(|(root, tx)| (root.clone(), tx.clone()))
            .collect();
        for (root, tx) in roots {
            let _ = tx.send(Event {
                action: Action::Update,
                key: mutated_key.to_string(),
                modified_index: idx,
                data: Self::list_locked(inner, &root),
            });
        }
    }

    fn list_locked(inner: &MemoryStoreState, prefix: &str) -> Vec<KVPair> {
        inner
            .data
            .range(prefix.to_string()..)
            .take_while(|(k, _)| k.starts_with(prefix))
            .map(|(k, (v, idx))| KVPair::new(k.clone(), v.clone(), *idx))
            .collect()
    }

    /// Inject a synthetic transport error into every watcher rooted at `key`.
    pub fn inject_error(&self, key: &str, message: &str) {
        let inner = self.inner.lock();
        for (root, tx) in inner.watchers.iter().filter(|(root, _)| root == key) {
            let _ = tx.send(Event::error(root.clone(), message));
        }
    }
}

#[async_trait]
impl StoreAdapter for MemoryStore {
    async fn get(&self, key: &str) -> Result<Option<KVPair>, StoreError> {
        let inner = self.inner.lock();
        Ok(inner
            .data
            .get(key)
            .map(|(v, idx)| KVPair::new(key.to_string(), v.clone(), *idx)))
    }

    async fn list_subtree(&self, key: &str) -> Result<Vec<KVPair>, StoreError> {
        let inner = self.inner.lock();
        Ok(Self::list_locked(&inner, key))
    }

    async fn watch_subtree(
        &self,
        key: &str,
        _after_index: u64,
        cancel: CancellationToken,
    ) -> Result<EventStream, StoreError> {
        let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
        self.inner.lock().watchers.push((key.to_string(), tx));
        let stream = async_stream::stream! {
            loop {
                tokio::select! {
                    _ = cancel.cancelled() => break,
                    event = rx.recv() => match event {
                        Some(event) => yield event,
                        None => break,
                    }
                }
            }
        };
        Ok(Box::pin(stream))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::StreamExt;

    #[tokio::test]
    async fn list_subtree_is_sorted_by_key() {
        let store = MemoryStore::new();
        store.seed("/a/2", b"two".to_vec());
        store.seed("/a/1", b"one".to_vec());
        let pairs = store.list_subtree("/a/").await.unwrap();
        assert_eq!(pairs[0].key, "/a/1");
        assert_eq!(pairs[1].key, "/a/2");
    }

    #[tokio::test]
    async fn watch_subtree_emits_on_mutation() {
        let store = MemoryStore::new();
        let cancel = CancellationToken::new();
        let mut stream = store.watch_subtree("/a/", 0, cancel.clone()).await.unwrap();
        store.set("/a/1", b"one".to_vec());
        let event = stream.next().await.unwrap();
        assert_eq!(event.action, Action::Update);
        assert_eq!(event.data.len(), 1);
        cancel.cancel();
        assert!(stream.next().await.is_none());
    }

    #[tokio::test]
    async fn watch_subtree_root_delete_closes_stream() {
        let store = MemoryStore::new();
        let cancel = CancellationToken::new();
        let mut stream = store.watch_subtree("/a", 0, cancel).await.unwrap();
        store.delete("/a");
        let event = stream.next().await.unwrap();
        assert_eq!(event.action, Action::Delete);
        assert!(event.data.is_empty());
        assert!(stream.next().await.is_none());
    }
}
