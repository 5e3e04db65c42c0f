//! `GET/WATCH /rebellion/localprocs`: per pod-group, the pods with at least
//! one container scheduled on this node. App-scoped. Grounded on
//! `endpoints/rebellion_localprocs.go`.

use std::collections::{BTreeMap, HashMap};

use lainlet_core::decode::pod_group::{PodGroup, PodGroupSpec};
use lainlet_core::error::AuthError;
use serde::Serialize;

use crate::context::Context;
use crate::dispatcher::{Endpoint, Projected};

fn app_version(spec: &PodGroupSpec) -> String {
    let prefix = "LAIN_APP_RELEASE_VERSION=";
    spec.containers
        .first()
        .and_then(|c| c.env.iter().find(|e| e.starts_with(prefix)))
        .map(|e| e[prefix.len()..].to_string())
        .unwrap_or_default()
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PodInfoForRebellion {
    pub annotation: String,
    pub instance_no: i32,
    pub app_version: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Default)]
pub struct CoreInfoForRebellion {
    pub pod_infos: Vec<PodInfoForRebellion>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Default)]
pub struct RebellionLocalprocsReply {
    pub data: BTreeMap<String, CoreInfoForRebellion>,
}

pub struct RebellionLocalprocsRequest {
    pub remote_addr: String,
    pub appname: Option<String>,
}

pub struct RebellionLocalprocsEndpoint {
    pub hostname: String,
}

impl Endpoint for RebellionLocalprocsEndpoint {
    type Request = RebellionLocalprocsRequest;
    type Value = PodGroup;
    type Output = RebellionLocalprocsReply;

    fn resolve_key(&self, request: &Self::Request, ctx: &Context) -> Result<String, AuthError> {
        crate::endpoints::resolve_app_scoped_key(ctx, &request.remote_addr, request.appname.as_deref())
    }

    fn project(&self, _key: &str, data: HashMap<String, PodGroup>) -> Projected<Self::Output> {
        let mut out = BTreeMap::new();
        for pg in data.values() {
            let version = app_version(&pg.spec);
            let pod_infos: Vec<_> = pg
                .pods
                .iter()
                .filter(|pod| pod.containers.iter().any(|c| c.node_name == self.hostname))
                .map(|pod| PodInfoForRebellion {
                    annotation: pg.spec.annotation.clone(),
                    instance_no: pod.instance_no,
                    app_version: version.clone(),
                })
                .collect();
            if !pod_infos.is_empty() {
                out.insert(pg.spec.name.clone(), CoreInfoForRebellion { pod_infos });
            }
        }
        Projected::Ok(RebellionLocalprocsReply { data: out })
    }
}
