//! `GET/WATCH /webrouter/webprocs`: per web pod-group (name's second-to-last
//! `.`-segment is `web`), pod/container exposure info. App-scoped. Degrades
//! when over half the containers have lost their IP. Grounded on
//! `endpoints/webrouter_webprocs.go`.

use std::collections::{BTreeMap, HashMap};

use lainlet_core::decode::pod_group::PodGroup;
use lainlet_core::error::{AuthError, ProjectionError};
use serde::Serialize;

use crate::context::Context;
use crate::dispatcher::{Endpoint, Projected};

fn is_web_proc(name: &str) -> bool {
    let parts: Vec<&str> = name.split('.').collect();
    parts.len() >= 3 && parts[parts.len() - 2] == "web"
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ContainerForWebrouter {
    pub ip: String,
    pub expose: i32,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PodInfoForWebrouter {
    pub annotation: String,
    pub containers: Vec<ContainerForWebrouter>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Default)]
pub struct CoreInfoForWebrouter {
    pub pod_infos: Vec<PodInfoForWebrouter>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Default)]
pub struct WebrouterWebprocsReply {
    pub data: BTreeMap<String, CoreInfoForWebrouter>,
}

pub struct WebrouterWebprocsRequest {
    pub remote_addr: String,
    pub appname: Option<String>,
}

pub struct WebrouterWebprocsEndpoint;

impl Endpoint for WebrouterWebprocsEndpoint {
    type Request = WebrouterWebprocsRequest;
    type Value = PodGroup;
    type Output = WebrouterWebprocsReply;

    fn resolve_key(&self, request: &Self::Request, ctx: &Context) -> Result<String, AuthError> {
        crate::endpoints::resolve_app_scoped_key(ctx, &request.remote_addr, request.appname.as_deref())
    }

    fn project(&self, _key: &str, data: HashMap<String, PodGroup>) -> Projected<Self::Output> {
        let mut out = BTreeMap::new();
        let mut container_count = 0usize;
        let mut alive_count = 0usize;

        for pg in data.values() {
            if !is_web_proc(&pg.spec.name) {
                continue;
            }
            let pod_infos = pg
                .pods
                .iter()
                .map(|pod| {
                    container_count += 1;
                    if pod.containers.first().is_some_and(|c| !c.container_ip.is_empty()) {
                        alive_count += 1;
                    }
                    let containers = pod
                        .containers
                        .iter()
                        .enumerate()
                        .map(|(j, c)| ContainerForWebrouter {
                            ip: c.container_ip.clone(),
                            expose: pg.spec.containers.get(j).map(|s| s.expose as i32).unwrap_or_default(),
                        })
                        .collect();
                    PodInfoForWebrouter { annotation: pg.spec.annotation.clone(), containers }
                })
                .collect();
            out.insert(pg.spec.name.clone(), CoreInfoForWebrouter { pod_infos });
        }

        let reply = WebrouterWebprocsReply { data: out };
        if container_count == 0 || alive_count * 2 < container_count {
            Projected::Degraded(reply, ProjectionError::TooManyDeadContainers)
        } else {
            Projected::Ok(reply)
        }
    }
}
