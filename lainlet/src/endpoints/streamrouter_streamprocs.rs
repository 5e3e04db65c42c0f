//! `GET/WATCH /streamrouter/streamprocs`: per namespace, the stream procs
//! with their upstream containers and listen/upstream port pairs, sorted for
//! canonical comparison. App-scoped. Degrades (but still serves the best
//! projection available) when over half the containers across all pod
//! groups have lost their IP. Grounded on
//! `endpoints/streamrouter_streamprocs.go`.

use std::collections::HashMap;

use lainlet_core::decode::pod_group::PodGroup;
use lainlet_core::decode::raw::parse_annotation;
use lainlet_core::error::{AuthError, ProjectionError};
use serde::Serialize;

use crate::context::Context;
use crate::dispatcher::{Endpoint, Projected};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StreamUpstream {
    pub host: String,
    pub instance_no: i32,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StreamService {
    pub upstream_port: u16,
    pub listen_port: u16,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StreamProc {
    pub name: String,
    pub upstreams: Vec<StreamUpstream>,
    pub services: Vec<StreamService>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Default)]
pub struct StreamProcList {
    pub procs: Vec<StreamProc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Default)]
pub struct StreamrouterStreamprocsReply {
    pub data: HashMap<String, StreamProcList>,
}

pub struct StreamrouterStreamprocsRequest {
    pub remote_addr: String,
    pub appname: Option<String>,
}

pub struct StreamrouterStreamprocsEndpoint;

impl Endpoint for StreamrouterStreamprocsEndpoint {
    type Request = StreamrouterStreamprocsRequest;
    type Value = PodGroup;
    type Output = StreamrouterStreamprocsReply;

    fn resolve_key(&self, request: &Self::Request, ctx: &Context) -> Result<String, AuthError> {
        crate::endpoints::resolve_app_scoped_key(ctx, &request.remote_addr, request.appname.as_deref())
    }

    fn project(&self, _key: &str, data: HashMap<String, PodGroup>) -> Projected<Self::Output> {
        let mut out: HashMap<String, StreamProcList> = HashMap::new();
        let mut container_count = 0usize;
        let mut alive_count = 0usize;

        for pg in data.values() {
            let annotation = parse_annotation(&pg.spec.annotation);
            if annotation.ports.is_empty() {
                continue;
            }
            let services = annotation
                .ports
                .iter()
                .map(|p| StreamService { upstream_port: p.dstport, listen_port: p.srcport })
                .collect();
            let upstreams: Vec<_> = pg
                .pods
                .iter()
                .filter_map(|pod| {
                    container_count += 1;
                    let first = pod.containers.first()?;
                    if !first.container_ip.is_empty() {
                        alive_count += 1;
                    }
                    Some(StreamUpstream { host: first.container_ip.clone(), instance_no: pod.instance_no })
                })
                .collect();
            let proc = StreamProc { name: pg.spec.name.clone(), upstreams, services };
            out.entry(pg.spec.namespace.clone()).or_insert_with(StreamProcList::default).procs.push(proc);
        }

        for list in out.values_mut() {
            list.procs.sort_by(|a, b| a.name.cmp(&b.name));
            for proc in &mut list.procs {
                proc.upstreams.sort_by_key(|u| u.instance_no);
                proc.services.sort_by_key(|s| s.listen_port);
            }
        }

        let reply = StreamrouterStreamprocsReply { data: out };
        if container_count == 0 || alive_count * 2 < container_count {
            Projected::Degraded(reply, ProjectionError::TooManyDeadContainers)
        } else {
            Projected::Ok(reply)
        }
    }
}
