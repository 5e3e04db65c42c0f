//! Wire shapes the pod-group/container decoders must tolerate (spec.md §6).
//! Field names mirror the upstream JSON exactly; domain types derived from
//! them live alongside their decoders.

use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct RawPodGroupEntry {
    #[serde(rename = "Spec")]
    pub spec: RawSpec,
    #[serde(rename = "Pods", default)]
    pub pods: Vec<RawPod>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RawSpec {
    #[serde(rename = "Name")]
    pub name: String,
    #[serde(rename = "Namespace")]
    pub namespace: String,
    #[serde(rename = "Pod")]
    pub pod: RawPodSpec,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RawPodSpec {
    #[serde(rename = "Annotation", default)]
    pub annotation: String,
    #[serde(rename = "Containers", default)]
    pub containers: Vec<RawContainerSpec>,
    #[serde(rename = "Dependencies", default)]
    pub dependencies: Vec<RawDependency>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RawContainerSpec {
    #[serde(rename = "Image", default)]
    pub image: String,
    #[serde(rename = "Env", default)]
    pub env: Vec<String>,
    #[serde(rename = "Command", default)]
    pub command: String,
    #[serde(rename = "CpuLimit", default)]
    pub cpu_limit: i64,
    #[serde(rename = "MemoryLimit", default)]
    pub memory_limit: i64,
    #[serde(rename = "Expose", default)]
    pub expose: u16,
    #[serde(rename = "Volumes", default)]
    pub volumes: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RawDependency {
    #[serde(rename = "PodName")]
    pub pod_name: String,
    #[serde(rename = "Policy", default)]
    pub policy: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RawPod {
    #[serde(rename = "InstanceNo", default)]
    pub instance_no: i32,
    #[serde(rename = "Containers", default)]
    pub containers: Vec<RawContainerRuntime>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RawContainerRuntime {
    #[serde(rename = "Id", default)]
    pub id: String,
    #[serde(rename = "ContainerIp", default)]
    pub container_ip: String,
    #[serde(rename = "NodeIp", default)]
    pub node_ip: String,
    #[serde(rename = "NodeName", default)]
    pub node_name: String,
    #[serde(rename = "ContainerPort", default)]
    pub container_port: u16,
    #[serde(rename = "Runtime", default)]
    pub runtime: RawRuntime,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawRuntime {
    #[serde(rename = "Config", default)]
    pub config: RawRuntimeConfig,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawRuntimeConfig {
    #[serde(rename = "Env", default)]
    pub env: Vec<String>,
}

/// The `{ports: [{srcport, dstport, proto}]}` JSON embedded as a string in
/// `RawPodSpec::annotation`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Annotation {
    #[serde(default)]
    pub ports: Vec<PortMapping>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PortMapping {
    pub srcport: u16,
    pub dstport: u16,
    #[serde(default)]
    pub proto: String,
}

/// Extracts `LAIN_APP_RELEASE_VERSION=<value>` from the first container's
/// env list, as the original container/rebellion decoders do.
pub fn app_release_version(spec: &RawSpec) -> String {
    env_value(spec.pod.containers.first(), "LAIN_APP_RELEASE_VERSION")
}

/// Extracts `LAIN_PROCNAME=<value>` from the first container's env list.
pub fn proc_name(spec: &RawSpec) -> String {
    env_value(spec.pod.containers.first(), "LAIN_PROCNAME")
}

fn env_value(container: Option<&RawContainerSpec>, var: &str) -> String {
    let prefix = format!("{var}=");
    container
        .and_then(|c| c.env.iter().find(|e| e.starts_with(&prefix)))
        .map(|e| e[prefix.len()..].to_string())
        .unwrap_or_default()
}

/// Best-effort parse of the pod-group annotation string. Malformed or empty
/// annotations decode to an empty port list rather than an error, matching
/// the original's tolerance of pod-groups with no `ports` annotation.
pub fn parse_annotation(annotation: &str) -> Annotation {
    if annotation.is_empty() {
        return Annotation::default();
    }
    serde_json::from_str(annotation).unwrap_or_default()
}
