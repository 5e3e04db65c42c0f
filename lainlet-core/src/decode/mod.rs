//! Domain decoder catalogue: pure functions turning raw KV pairs into
//! `derived-key -> decoded-value` updates, with an inverter for decoders
//! that fan one raw key into several derived keys.

pub mod config;
pub mod container;
pub mod depends;
pub mod nodes;
pub mod pod_group;
pub mod raw;

use std::collections::HashMap;

use crate::cacher::CachedValue;
use crate::store::KVPair;

/// One derived-key update produced by decoding a single raw KV pair.
/// `None` deletes the derived key.
pub struct DecodeOutcome<V> {
    pub updates: Vec<(String, Option<V>)>,
}

impl<V> DecodeOutcome<V> {
    pub fn new() -> Self {
        Self { updates: Vec::new() }
    }

    pub fn upsert(mut self, key: impl Into<String>, value: V) -> Self {
        self.updates.push((key.into(), Some(value)));
        self
    }

    pub fn delete(mut self, key: impl Into<String>) -> Self {
        self.updates.push((key.into(), None));
        self
    }
}

impl<V> Default for DecodeOutcome<V> {
    fn default() -> Self {
        Self::new()
    }
}

/// Tracks, for decoders that invert one raw key into many derived keys,
/// which derived keys a given raw key currently owns. Single-writer (the
/// watch loop), so no internal locking.
#[derive(Default)]
pub struct Inverter {
    raw_to_derived: HashMap<String, Vec<String>>,
}

impl Inverter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record that `raw_key` currently produces `derived_keys`, returning
    /// whatever it produced previously (to be deleted by the caller).
    pub fn replace(&mut self, raw_key: &str, derived_keys: Vec<String>) -> Vec<String> {
        self.raw_to_derived
            .insert(raw_key.to_string(), derived_keys)
            .unwrap_or_default()
    }

    /// Remove and return every derived key previously recorded for
    /// `raw_key` (used when the raw key itself disappears).
    pub fn take(&mut self, raw_key: &str) -> Vec<String> {
        self.raw_to_derived.remove(raw_key).unwrap_or_default()
    }

    pub fn contains(&self, raw_key: &str) -> bool {
        self.raw_to_derived.contains_key(raw_key)
    }
}

/// A pure decoder turning raw KV pairs under a Watcher's subtree into
/// derived cache entries.
pub trait Decoder: Send + Sync + 'static {
    type Value: CachedValue;

    /// For decoders whose raw keys map many-to-one onto a derived key
    /// (nodes, depends), the derived key the given raw key contributes to,
    /// computable from the raw key alone. The watch loop uses this to look
    /// up the derived key's current cache value and pass it as `previous`
    /// so the decoder can merge rather than overwrite. `None` for decoders
    /// where the derived key is only knowable after parsing the payload
    /// (pod-group, container).
    fn derived_key_hint(&self, _raw_key: &str) -> Option<String> {
        None
    }

    /// Decode a single raw pair. `previous` is the derived value currently
    /// cached for `derived_key_hint(&raw.key)`, if any, so merge decoders
    /// can fold a new sub-field into existing nested state instead of
    /// clobbering it. `inverter` is provided so fan-out decoders can clear
    /// out derived keys the same raw key previously owned before (or
    /// without) writing new ones.
    fn decode(
        &self,
        raw: &KVPair,
        previous: Option<&Self::Value>,
        inverter: &mut Inverter,
    ) -> DecodeOutcome<Self::Value>;

    /// Called when a raw key that previously existed no longer appears in
    /// a subtree re-read. `previous` is looked up the same way as in
    /// `decode`. Default: delete everything the inverter recorded for it
    /// (right for fan-out decoders; decoders with no inverter entries and
    /// no merge state should override this).
    fn decode_removed(
        &self,
        raw_key: &str,
        _previous: Option<&Self::Value>,
        inverter: &mut Inverter,
    ) -> DecodeOutcome<Self::Value> {
        let mut outcome = DecodeOutcome::new();
        for derived in inverter.take(raw_key) {
            outcome = outcome.delete(derived);
        }
        outcome
    }
}
