//! Nodes decoder: per-node fields, each tagged as string-or-map. Raw keys
//! are two path segments relative to the subtree root, `<node-name>/
//! <sub-field>`; the decoder merges each sub-field into the node's existing
//! entry rather than overwriting it. Derived keys carry the `:` suffix the
//! original's `endpoints/nodes.go` queries with (`key += ":"`), not `/`.

use std::collections::HashMap;

use crate::decode::{DecodeOutcome, Decoder, Inverter};
use crate::store::KVPair;

/// A node info sub-field value: either a plain string or a string map, per
/// Design Note "Dynamic polymorphism in NodeInfo values".
#[derive(Debug, Clone, PartialEq)]
pub enum NodeFieldValue {
    String(String),
    Map(HashMap<String, String>),
}

fn split_node_key(raw_key: &str) -> Option<(&str, &str)> {
    raw_key.rsplit_once('/')
}

/// The derived key a node's sub-fields are cached under: its name with a
/// trailing `:`.
fn node_cache_key(node_name: &str) -> String {
    format!("{node_name}:")
}

pub struct NodesDecoder;

impl Decoder for NodesDecoder {
    type Value = HashMap<String, NodeFieldValue>;

    fn derived_key_hint(&self, raw_key: &str) -> Option<String> {
        split_node_key(raw_key).map(|(node, _)| node_cache_key(node))
    }

    fn decode(
        &self,
        raw: &KVPair,
        previous: Option<&Self::Value>,
        _inverter: &mut Inverter,
    ) -> DecodeOutcome<Self::Value> {
        let Some((node_name, sub_field)) = split_node_key(&raw.key) else {
            tracing::warn!(key = %raw.key, "node key missing sub-field segment, skipping");
            return DecodeOutcome::new();
        };

        let raw_str = String::from_utf8_lossy(&raw.value).into_owned();
        let value = match serde_json::from_str::<HashMap<String, String>>(&raw_str) {
            Ok(map) => NodeFieldValue::Map(map),
            Err(_) => NodeFieldValue::String(raw_str),
        };

        let mut fields = previous.cloned().unwrap_or_default();
        fields.insert(sub_field.to_string(), value);
        DecodeOutcome::new().upsert(node_cache_key(node_name), fields)
    }

    fn decode_removed(
        &self,
        raw_key: &str,
        previous: Option<&Self::Value>,
        _inverter: &mut Inverter,
    ) -> DecodeOutcome<Self::Value> {
        let Some((node_name, sub_field)) = split_node_key(raw_key) else {
            return DecodeOutcome::new();
        };
        let Some(previous) = previous else {
            return DecodeOutcome::new();
        };
        let mut fields = previous.clone();
        fields.remove(sub_field);
        if fields.is_empty() {
            DecodeOutcome::new().delete(node_cache_key(node_name))
        } else {
            DecodeOutcome::new().upsert(node_cache_key(node_name), fields)
        }
    }
}
