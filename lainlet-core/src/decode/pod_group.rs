//! Pod-group decoder: decodes a pod-group spec+runtime entry, keyed by its
//! own name. The sole source of truth every other projection reads from.

use std::sync::Arc;

use crate::decode::raw::{RawContainerRuntime, RawContainerSpec, RawDependency, RawPodGroupEntry};
use crate::decode::{DecodeOutcome, Decoder, Inverter};
use crate::store::KVPair;

#[derive(Debug, Clone)]
pub struct PodGroupSpec {
    pub name: String,
    pub namespace: String,
    pub annotation: String,
    pub containers: Vec<RawContainerSpec>,
    pub dependencies: Vec<RawDependency>,
}

#[derive(Debug, Clone)]
pub struct PodRuntime {
    pub instance_no: i32,
    pub containers: Vec<RawContainerRuntime>,
}

/// The structured value stored by the pod-group Cacher under the pod-group's
/// name. Immutable after decode; shared read-only across projections.
#[derive(Debug, Clone)]
pub struct PodGroup {
    pub spec: Arc<PodGroupSpec>,
    pub pods: Arc<Vec<PodRuntime>>,
}

impl PodGroup {
    fn from_raw(raw: RawPodGroupEntry) -> Self {
        let spec = PodGroupSpec {
            name: raw.spec.name.clone(),
            namespace: raw.spec.namespace,
            annotation: raw.spec.pod.annotation,
            containers: raw.spec.pod.containers,
            dependencies: raw.spec.pod.dependencies,
        };
        let pods = raw
            .pods
            .into_iter()
            .map(|p| PodRuntime {
                instance_no: p.instance_no,
                containers: p.containers,
            })
            .collect();
        Self {
            spec: Arc::new(spec),
            pods: Arc::new(pods),
        }
    }
}

/// Decodes entries under `/lain/deployd/pod_groups`. Derived key is the
/// pod-group's own name (its raw key already is that name, relative to the
/// subtree root).
pub struct PodGroupDecoder;

impl Decoder for PodGroupDecoder {
    type Value = PodGroup;

    fn decode(
        &self,
        raw: &KVPair,
        _previous: Option<&Self::Value>,
        _inverter: &mut Inverter,
    ) -> DecodeOutcome<Self::Value> {
        match serde_json::from_slice::<RawPodGroupEntry>(&raw.value) {
            Ok(entry) => DecodeOutcome::new().upsert(raw.key.clone(), PodGroup::from_raw(entry)),
            Err(source) => {
                tracing::warn!(key = %raw.key, %source, "pod-group decode failed, retaining prior value");
                DecodeOutcome::new()
            }
        }
    }

    fn decode_removed(
        &self,
        raw_key: &str,
        _previous: Option<&Self::Value>,
        _inverter: &mut Inverter,
    ) -> DecodeOutcome<Self::Value> {
        DecodeOutcome::new().delete(raw_key.to_string())
    }
}
