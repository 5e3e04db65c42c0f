//! Depends decoder: nested `{dep-id -> {node -> {app -> dep-item}}}`. Raw
//! keys are three path segments relative to the subtree root, `<dep-id>/
//! <node>/<app>`; the decoder merges each `(node, app)` leaf into the
//! dep-id's existing nested map.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::decode::{DecodeOutcome, Decoder, Inverter};
use crate::store::KVPair;

#[derive(Debug, Clone, Deserialize)]
struct RawDependItem {
    #[serde(rename = "Annotation", default)]
    annotation: String,
    #[serde(rename = "Containers", default)]
    containers: Vec<RawDependContainer>,
}

#[derive(Debug, Clone, Deserialize)]
struct RawDependContainer {
    #[serde(rename = "ContainerID", default)]
    container_id: String,
    #[serde(rename = "NodeIp", default)]
    node_ip: String,
    #[serde(rename = "Ip", default)]
    ip: String,
    #[serde(rename = "Port", default)]
    port: u16,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DependContainer {
    pub container_id: String,
    pub node_ip: String,
    pub ip: String,
    pub port: u16,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DependItem {
    pub annotation: String,
    pub containers: Vec<DependContainer>,
}

impl From<RawDependItem> for DependItem {
    fn from(raw: RawDependItem) -> Self {
        Self {
            annotation: raw.annotation,
            containers: raw
                .containers
                .into_iter()
                .map(|c| DependContainer {
                    container_id: c.container_id,
                    node_ip: c.node_ip,
                    ip: c.ip,
                    port: c.port,
                })
                .collect(),
        }
    }
}

pub type DependsByNodeApp = HashMap<String, HashMap<String, DependItem>>;

fn split_depend_key(raw_key: &str) -> Option<(&str, &str, &str)> {
    let mut parts = raw_key.splitn(3, '/');
    let dep_id = parts.next()?;
    let rest = parts.next()?;
    let rest2 = parts.next()?;
    Some((dep_id, rest, rest2))
}

pub struct DependsDecoder;

impl Decoder for DependsDecoder {
    type Value = DependsByNodeApp;

    fn derived_key_hint(&self, raw_key: &str) -> Option<String> {
        split_depend_key(raw_key).map(|(dep_id, _, _)| dep_id.to_string())
    }

    fn decode(
        &self,
        raw: &KVPair,
        previous: Option<&Self::Value>,
        _inverter: &mut Inverter,
    ) -> DecodeOutcome<Self::Value> {
        let Some((dep_id, node, app)) = split_depend_key(&raw.key) else {
            tracing::warn!(key = %raw.key, "depends key missing node/app segments, skipping");
            return DecodeOutcome::new();
        };

        let item: DependItem = match serde_json::from_slice::<RawDependItem>(&raw.value) {
            Ok(raw_item) => raw_item.into(),
            Err(source) => {
                tracing::warn!(key = %raw.key, %source, "depends decode failed, retaining prior value");
                return DecodeOutcome::new();
            }
        };

        let mut by_node = previous.cloned().unwrap_or_default();
        by_node.entry(node.to_string()).or_default().insert(app.to_string(), item);
        DecodeOutcome::new().upsert(dep_id.to_string(), by_node)
    }

    fn decode_removed(
        &self,
        raw_key: &str,
        previous: Option<&Self::Value>,
        _inverter: &mut Inverter,
    ) -> DecodeOutcome<Self::Value> {
        let Some((dep_id, node, app)) = split_depend_key(raw_key) else {
            return DecodeOutcome::new();
        };
        let Some(previous) = previous else {
            return DecodeOutcome::new();
        };
        let mut by_node = previous.clone();
        if let Some(apps) = by_node.get_mut(node) {
            apps.remove(app);
            if apps.is_empty() {
                by_node.remove(node);
            }
        }
        if by_node.is_empty() {
            DecodeOutcome::new().delete(dep_id.to_string())
        } else {
            DecodeOutcome::new().upsert(dep_id.to_string(), by_node)
        }
    }
}
