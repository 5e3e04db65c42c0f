//! `GET/WATCH /coreinfo`: per pod-group, full pod/container/dependency spec
//! fanned out over instances. App-scoped. Grounded on `endpoints/coreinfo.go`.

use std::collections::{BTreeMap, HashMap};

use lainlet_core::decode::pod_group::PodGroup;
use lainlet_core::error::AuthError;
use serde::Serialize;

use crate::context::Context;
use crate::dispatcher::{Endpoint, Projected};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ContainerForCoreinfo {
    pub command: String,
    pub id: String,
    pub ip: String,
    pub cpu: i64,
    pub env: Vec<String>,
    pub expose: i32,
    pub image: String,
    pub memory: i64,
    pub node_ip: String,
    pub node_name: String,
    pub volumes: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DependencyForCoreinfo {
    pub pod_name: String,
    pub policy: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PodInfoForCoreinfo {
    pub annotation: String,
    pub instance_no: i32,
    pub containers: Vec<ContainerForCoreinfo>,
    pub dependencies: Vec<DependencyForCoreinfo>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Default)]
pub struct CoreInfo {
    pub pod_infos: Vec<PodInfoForCoreinfo>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Default)]
pub struct CoreinfoReply {
    pub data: BTreeMap<String, CoreInfo>,
}

pub struct CoreinfoRequest {
    pub remote_addr: String,
    pub appname: Option<String>,
}

pub struct CoreinfoEndpoint;

impl Endpoint for CoreinfoEndpoint {
    type Request = CoreinfoRequest;
    type Value = PodGroup;
    type Output = CoreinfoReply;

    fn resolve_key(&self, request: &Self::Request, ctx: &Context) -> Result<String, AuthError> {
        crate::endpoints::resolve_app_scoped_key(ctx, &request.remote_addr, request.appname.as_deref())
    }

    fn project(&self, _key: &str, data: HashMap<String, PodGroup>) -> Projected<Self::Output> {
        let mut out = BTreeMap::new();
        for pg in data.values() {
            let dependencies: Vec<_> = pg
                .spec
                .dependencies
                .iter()
                .map(|d| DependencyForCoreinfo { pod_name: d.pod_name.clone(), policy: d.policy.clone() })
                .collect();
            let pod_infos = pg
                .pods
                .iter()
                .map(|pod| PodInfoForCoreinfo {
                    annotation: pg.spec.annotation.clone(),
                    instance_no: pod.instance_no,
                    containers: pod
                        .containers
                        .iter()
                        .enumerate()
                        .map(|(j, runtime)| {
                            let spec = pg.spec.containers.get(j);
                            ContainerForCoreinfo {
                                command: spec.map(|s| s.command.clone()).unwrap_or_default(),
                                id: runtime.id.clone(),
                                ip: runtime.container_ip.clone(),
                                cpu: spec.map(|s| s.cpu_limit).unwrap_or_default(),
                                env: spec.map(|s| s.env.clone()).unwrap_or_default(),
                                expose: spec.map(|s| s.expose as i32).unwrap_or_default(),
                                image: spec.map(|s| s.image.clone()).unwrap_or_default(),
                                memory: spec.map(|s| s.memory_limit).unwrap_or_default(),
                                node_ip: runtime.node_ip.clone(),
                                node_name: runtime.node_name.clone(),
                                volumes: spec.map(|s| s.volumes.clone()).unwrap_or_default(),
                            }
                        })
                        .collect(),
                    dependencies: dependencies.clone(),
                })
                .collect();
            out.insert(pg.spec.name.clone(), CoreInfo { pod_infos });
        }
        Projected::Ok(CoreinfoReply { data: out })
    }
}
