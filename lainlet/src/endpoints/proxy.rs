//! `GET/WATCH /proxy`: per pod-group, the exposed container address list.
//! App-scoped. Grounded on `endpoints/proxy.go`.

use std::collections::{BTreeMap, HashMap};

use lainlet_core::decode::pod_group::PodGroup;
use lainlet_core::error::AuthError;
use serde::Serialize;

use crate::context::Context;
use crate::dispatcher::{Endpoint, Projected};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ContainerForProxy {
    pub container_ip: String,
    pub container_port: i32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Default)]
pub struct ProcInfo {
    pub containers: Vec<ContainerForProxy>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Default)]
pub struct ProxyReply {
    pub data: BTreeMap<String, ProcInfo>,
}

pub struct ProxyRequest {
    pub remote_addr: String,
    pub appname: Option<String>,
}

pub struct ProxyEndpoint;

impl Endpoint for ProxyEndpoint {
    type Request = ProxyRequest;
    type Value = PodGroup;
    type Output = ProxyReply;

    fn resolve_key(&self, request: &Self::Request, ctx: &Context) -> Result<String, AuthError> {
        crate::endpoints::resolve_app_scoped_key(ctx, &request.remote_addr, request.appname.as_deref())
    }

    fn project(&self, _key: &str, data: HashMap<String, PodGroup>) -> Projected<Self::Output> {
        let mut out = BTreeMap::new();
        for pg in data.values() {
            let mut containers = Vec::new();
            for pod in pg.pods.iter() {
                for (j, container) in pod.containers.iter().enumerate() {
                    let expose = pg.spec.containers.get(j).map(|c| c.expose as i32).unwrap_or_default();
                    containers.push(ContainerForProxy { container_ip: container.container_ip.clone(), container_port: expose });
                }
            }
            out.insert(pg.spec.name.clone(), ProcInfo { containers });
        }
        Projected::Ok(ProxyReply { data: out })
    }
}
