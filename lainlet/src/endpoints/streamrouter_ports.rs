//! `GET/WATCH /streamrouter/ports`: the flat, sorted list of all listen
//! ports declared across pod-group annotations. App-scoped. Grounded on
//! `endpoints/streamrouter_ports.go`.

use std::collections::HashMap;

use lainlet_core::decode::pod_group::PodGroup;
use lainlet_core::decode::raw::parse_annotation;
use lainlet_core::error::AuthError;
use serde::Serialize;

use crate::context::Context;
use crate::dispatcher::{Endpoint, Projected};

#[derive(Debug, Clone, PartialEq, Serialize, Default)]
pub struct StreamrouterPortsReply {
    pub data: Vec<u16>,
}

pub struct StreamrouterPortsRequest {
    pub remote_addr: String,
    pub appname: Option<String>,
}

pub struct StreamrouterPortsEndpoint;

impl Endpoint for StreamrouterPortsEndpoint {
    type Request = StreamrouterPortsRequest;
    type Value = PodGroup;
    type Output = StreamrouterPortsReply;

    fn resolve_key(&self, request: &Self::Request, ctx: &Context) -> Result<String, AuthError> {
        crate::endpoints::resolve_app_scoped_key(ctx, &request.remote_addr, request.appname.as_deref())
    }

    fn project(&self, _key: &str, data: HashMap<String, PodGroup>) -> Projected<Self::Output> {
        let mut ports = Vec::new();
        for pg in data.values() {
            let annotation = parse_annotation(&pg.spec.annotation);
            if annotation.ports.is_empty() {
                continue;
            }
            ports.extend(annotation.ports.iter().map(|p| p.srcport));
        }
        ports.sort_unstable();
        Projected::Ok(StreamrouterPortsReply { data: ports })
    }
}
