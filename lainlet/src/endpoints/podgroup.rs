//! `GET/WATCH /podgroup`: per pod-group, one entry per pod instance with its
//! resolved proc name and primary container address. App-scoped. Grounded on
//! `endpoints/podgroup.go`.

use std::collections::HashMap;

use lainlet_core::decode::pod_group::PodGroup;
use lainlet_core::error::AuthError;
use serde::Serialize;

use crate::context::Context;
use crate::dispatcher::{Endpoint, Projected};

fn runtime_env_value(env: &[String], var: &str) -> String {
    let prefix = format!("{var}=");
    env.iter()
        .find(|e| e.starts_with(&prefix))
        .map(|e| e[prefix.len()..].to_string())
        .unwrap_or_default()
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Pod {
    pub proc_name: String,
    pub instance_no: i32,
    pub ip: String,
    pub port: i32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Default)]
pub struct PodGroupReplyEntry {
    pub pods: Vec<Pod>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Default)]
pub struct PodgroupReply {
    pub data: Vec<PodGroupReplyEntry>,
}

pub struct PodgroupRequest {
    pub remote_addr: String,
    pub appname: Option<String>,
}

pub struct PodgroupEndpoint;

impl Endpoint for PodgroupEndpoint {
    type Request = PodgroupRequest;
    type Value = PodGroup;
    type Output = PodgroupReply;

    fn resolve_key(&self, request: &Self::Request, ctx: &Context) -> Result<String, AuthError> {
        crate::endpoints::resolve_app_scoped_key(ctx, &request.remote_addr, request.appname.as_deref())
    }

    fn project(&self, _key: &str, data: HashMap<String, PodGroup>) -> Projected<Self::Output> {
        let mut out: Vec<PodGroupReplyEntry> = Vec::with_capacity(data.len());
        for pg in data.values() {
            let pods = pg
                .pods
                .iter()
                .filter_map(|pod| {
                    let first = pod.containers.first()?;
                    Some(Pod {
                        proc_name: runtime_env_value(&first.runtime.config.env, "LAIN_PROCNAME"),
                        instance_no: pod.instance_no,
                        ip: first.container_ip.clone(),
                        port: first.container_port as i32,
                    })
                })
                .collect();
            out.push(PodGroupReplyEntry { pods });
        }
        Projected::Ok(PodgroupReply { data: out })
    }
}
