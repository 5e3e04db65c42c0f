//! Thread-safe derived-key cache: exact lookup, prefix lookup, full
//! snapshot, key list, count. Multi-reader/single-writer, enforced by
//! `parking_lot::RwLock` rather than trusting callers to serialize writes.

use std::collections::HashMap;

use parking_lot::RwLock;

/// A value stored in a [`Cacher`]. Decoded values are cheap to clone
/// (`Arc`-wrapped by callers where large) since every reader gets an owned
/// copy out of a lock-guarded snapshot.
pub trait CachedValue: Clone + Send + Sync + 'static {}
impl<T: Clone + Send + Sync + 'static> CachedValue for T {}

/// A mapping from derived key to decoded value, owned exclusively by one
/// [`crate::watcher::Watcher`]. See spec §4.2 for the full contract.
pub struct Cacher<V: CachedValue> {
    data: RwLock<HashMap<String, V>>,
}

impl<V: CachedValue> Default for Cacher<V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<V: CachedValue> Cacher<V> {
    pub fn new() -> Self {
        Self {
            data: RwLock::new(HashMap::new()),
        }
    }

    pub fn from_map(data: HashMap<String, V>) -> Self {
        Self {
            data: RwLock::new(data),
        }
    }

    /// Set `key`. `value = None` deletes it.
    pub fn put(&self, key: String, value: Option<V>) {
        let mut data = self.data.write();
        match value {
            Some(v) => {
                data.insert(key, v);
            }
            None => {
                data.remove(&key);
            }
        }
    }

    /// Atomically replace the entire contents.
    pub fn reset(&self, data: HashMap<String, V>) {
        *self.data.write() = data;
    }

    /// Remove `key`, or every entry prefixed by it when `recursive`. Returns
    /// the removed keys.
    pub fn delete(&self, key: &str, recursive: bool) -> Vec<String> {
        let mut data = self.data.write();
        if recursive {
            let removed: Vec<String> = data
                .keys()
                .filter(|k| k.starts_with(key))
                .cloned()
                .collect();
            for k in &removed {
                data.remove(k);
            }
            removed
        } else if data.remove(key).is_some() {
            vec![key.to_string()]
        } else {
            Vec::new()
        }
    }

    /// Exact match if present, else every entry whose key starts with
    /// `key`. Mirrors the original Go `Cacher.Get`.
    pub fn get(&self, key: &str) -> HashMap<String, V> {
        let data = self.data.read();
        if let Some(v) = data.get(key) {
            let mut m = HashMap::with_capacity(1);
            m.insert(key.to_string(), v.clone());
            return m;
        }
        data.iter()
            .filter(|(k, _)| k.starts_with(key))
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect()
    }

    /// Subscription-key query per spec.md §3 invariant 4: `"*"` returns the
    /// whole map; a key ending in `/` returns every entry with that prefix;
    /// any other non-empty key returns only the exact match, or nothing.
    ///
    /// This is a stricter sibling of [`Cacher::get`]: `get` always falls
    /// back to a prefix scan when there is no exact match, which is right
    /// for point lookups against a known-prefix key, but wrong for matching
    /// a subscriber's declared subscription key against affected derived
    /// keys (a subscriber on `"foo"` must not match `"foobar"`).
    pub fn query(&self, key: &str) -> HashMap<String, V> {
        let data = self.data.read();
        if key == "*" {
            return data.clone();
        }
        if let Some(prefix) = key.strip_suffix('/') {
            let prefix = format!("{prefix}/");
            return data
                .iter()
                .filter(|(k, _)| k.starts_with(&prefix))
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect();
        }
        match data.get(key) {
            Some(v) => {
                let mut m = HashMap::with_capacity(1);
                m.insert(key.to_string(), v.clone());
                m
            }
            None => HashMap::new(),
        }
    }

    /// Whether `subscription_key` matches `derived_key`, per the dispatch
    /// loop's matching rule (spec.md §4.3): `"*"` matches everything, a key
    /// ending in `/` matches by prefix, anything else matches exactly.
    pub fn subscription_matches(subscription_key: &str, derived_key: &str) -> bool {
        if subscription_key == "*" {
            return true;
        }
        if let Some(prefix) = subscription_key.strip_suffix('/') {
            return derived_key.starts_with(&format!("{prefix}/"));
        }
        subscription_key == derived_key
    }

    /// Defensive copy of the full map.
    pub fn get_all(&self) -> HashMap<String, V> {
        self.data.read().clone()
    }

    pub fn get_all_keys(&self) -> Vec<String> {
        self.data.read().keys().cloned().collect()
    }

    pub fn count(&self) -> usize {
        self.data.read().len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn get_falls_back_to_prefix_scan() {
        let c: Cacher<i32> = Cacher::new();
        c.put("a/b".into(), Some(1));
        c.put("a/c".into(), Some(2));
        assert_eq!(c.get("a/b").len(), 1);
        assert_eq!(c.get("a/").len(), 2);
    }

    #[test]
    fn query_star_returns_everything() {
        let c: Cacher<i32> = Cacher::new();
        c.put("x".into(), Some(1));
        c.put("y".into(), Some(2));
        assert_eq!(c.query("*").len(), 2);
    }

    #[test]
    fn query_non_prefix_key_does_not_fall_back() {
        let c: Cacher<i32> = Cacher::new();
        c.put("foobar".into(), Some(1));
        assert!(c.query("foo").is_empty());
        assert_eq!(c.query("foobar").len(), 1);
    }

    #[test]
    fn query_trailing_slash_is_prefix_match() {
        let c: Cacher<i32> = Cacher::new();
        c.put("a/1".into(), Some(1));
        c.put("a/2".into(), Some(2));
        c.put("b/1".into(), Some(3));
        assert_eq!(c.query("a/").len(), 2);
    }

    #[test]
    fn delete_recursive_returns_removed_keys() {
        let c: Cacher<i32> = Cacher::new();
        c.put("a/1".into(), Some(1));
        c.put("a/2".into(), Some(2));
        c.put("b/1".into(), Some(3));
        let mut removed = c.delete("a/", true);
        removed.sort();
        assert_eq!(removed, vec!["a/1".to_string(), "a/2".to_string()]);
        assert_eq!(c.count(), 1);
    }

    #[test]
    fn put_none_deletes() {
        let c: Cacher<i32> = Cacher::new();
        c.put("k".into(), Some(1));
        c.put("k".into(), None);
        assert_eq!(c.count(), 0);
    }

    #[test]
    fn subscription_matches_rules() {
        assert!(Cacher::<i32>::subscription_matches("*", "anything"));
        assert!(Cacher::<i32>::subscription_matches("a/", "a/b"));
        assert!(!Cacher::<i32>::subscription_matches("a/", "ab"));
        assert!(Cacher::<i32>::subscription_matches("a", "a"));
        assert!(!Cacher::<i32>::subscription_matches("a", "ab"));
    }
}
