//! Container decoder: fans one pod-group raw entry into per-container
//! entries keyed by `nodename/cid` and `nodeip/cid`, maintaining the
//! inverter so stale entries are retracted when a pod-group is updated or
//! removed.

use crate::decode::raw::{app_release_version, RawPodGroupEntry};
use crate::decode::{DecodeOutcome, Decoder, Inverter};
use crate::store::KVPair;

/// One container's projected runtime info.
#[derive(Debug, Clone, PartialEq)]
pub struct ContainerInfo {
    pub app: String,
    pub app_version: String,
    pub proc: String,
    pub node_name: String,
    pub node_ip: String,
    pub ip: String,
    pub port: u16,
    pub instance_no: i32,
}

pub struct ContainerDecoder;

impl Decoder for ContainerDecoder {
    type Value = ContainerInfo;

    fn decode(
        &self,
        raw: &KVPair,
        _previous: Option<&Self::Value>,
        inverter: &mut Inverter,
    ) -> DecodeOutcome<Self::Value> {
        let entry = match serde_json::from_slice::<RawPodGroupEntry>(&raw.value) {
            Ok(entry) => entry,
            Err(source) => {
                tracing::warn!(key = %raw.key, %source, "container decode failed, retaining prior value");
                return DecodeOutcome::new();
            }
        };

        let app_version = app_release_version(&entry.spec);
        let mut derived_keys = Vec::new();
        let mut outcome = DecodeOutcome::new();

        for pod in &entry.pods {
            for container in &pod.containers {
                let info = ContainerInfo {
                    app: entry.spec.namespace.clone(),
                    app_version: app_version.clone(),
                    proc: entry.spec.name.clone(),
                    node_name: container.node_name.clone(),
                    node_ip: container.node_ip.clone(),
                    ip: container.container_ip.clone(),
                    port: container.container_port,
                    instance_no: pod.instance_no,
                };
                let by_node = format!("{}/{}", container.node_name, container.id);
                let by_ip = format!("{}/{}", container.node_ip, container.id);
                outcome = outcome.upsert(by_node.clone(), info.clone()).upsert(by_ip.clone(), info);
                derived_keys.push(by_node);
                derived_keys.push(by_ip);
            }
        }

        let stale = inverter.replace(&raw.key, derived_keys);
        let fresh: std::collections::HashSet<_> = outcome.updates.iter().map(|(k, _)| k.clone()).collect();
        for key in stale {
            if !fresh.contains(&key) {
                outcome = outcome.delete(key);
            }
        }
        outcome
    }

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

#[cfg(test)]
mod tests {
    use super::*;

    fn pod_group_json(node_name: &str, node_ip: &str, cid: &str) -> Vec<u8> {
        format!(
            r#"{{"Spec":{{"Name":"web.web.api","Namespace":"web","Pod":{{"Annotation":"","Containers":[{{"Env":["LAIN_APP_RELEASE_VERSION=1.2.3"]}}],"Dependencies":[]}}}},"Pods":[{{"InstanceNo":0,"Containers":[{{"Id":"{cid}","ContainerIp":"10.0.0.1","NodeIp":"{node_ip}","NodeName":"{node_name}","ContainerPort":80}}]}}]}}"#
        )
        .into_bytes()
    }

    #[test]
    fn decode_produces_both_node_and_ip_keys() {
        let decoder = ContainerDecoder;
        let mut inverter = Inverter::new();
        let raw = KVPair::new("/lain/deployd/pod_groups/web.web.api", pod_group_json("node-1", "10.1.1.1", "c1"), 1);
        let outcome = decoder.decode(&raw, None, &mut inverter);
        let keys: Vec<_> = outcome.updates.iter().map(|(k, _)| k.clone()).collect();
        assert!(keys.contains(&"node-1/c1".to_string()));
        assert!(keys.contains(&"10.1.1.1/c1".to_string()));
    }

    #[test]
    fn update_retracts_stale_derived_keys() {
        let decoder = ContainerDecoder;
        let mut inverter = Inverter::new();
        let raw_key = "/lain/deployd/pod_groups/web.web.api";
        let first = KVPair::new(raw_key, pod_group_json("node-1", "10.1.1.1", "c1"), 1);
        decoder.decode(&first, None, &mut inverter);

        let second = KVPair::new(raw_key, pod_group_json("node-2", "10.2.2.2", "c1"), 2);
        let outcome = decoder.decode(&second, None, &mut inverter);
        let deletes: Vec<_> = outcome
            .updates
            .iter()
            .filter(|(_, v)| v.is_none())
            .map(|(k, _)| k.clone())
            .collect();
        assert!(deletes.contains(&"node-1/c1".to_string()));
        assert!(deletes.contains(&"10.1.1.1/c1".to_string()));
    }

    #[test]
    fn removed_raw_key_deletes_all_its_derived_keys() {
        let decoder = ContainerDecoder;
        let mut inverter = Inverter::new();
        let raw_key = "/lain/deployd/pod_groups/web.web.api";
        let raw = KVPair::new(raw_key, pod_group_json("node-1", "10.1.1.1", "c1"), 1);
        decoder.decode(&raw, None, &mut inverter);
        let outcome = decoder.decode_removed(raw_key, None, &mut inverter);
        assert_eq!(outcome.updates.len(), 2);
        assert!(outcome.updates.iter().all(|(_, v)| v.is_none()));
        assert!(!inverter.contains(raw_key));
    }
}
