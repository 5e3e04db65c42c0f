//! `GET /localspec`: the set of `appname/procname` pairs with at least one
//! container on a given node, defaulting to this node. Super-only, no Watch
//! (the original never implemented one). Grounded on `endpoints/localspec.go`.

use std::collections::{BTreeSet, HashMap};

use lainlet_core::decode::container::ContainerInfo;
use lainlet_core::error::AuthError;
use serde::Serialize;

use crate::context::Context;
use crate::dispatcher::{Endpoint, Projected};

#[derive(Debug, Clone, PartialEq, Serialize, Default)]
pub struct LocalspecReply {
    pub data: Vec<String>,
}

pub struct LocalspecRequest {
    pub remote_addr: String,
    pub nodeip: Option<String>,
}

pub struct LocalspecEndpoint;

impl Endpoint for LocalspecEndpoint {
    type Request = LocalspecRequest;
    type Value = ContainerInfo;
    type Output = LocalspecReply;

    fn resolve_key(&self, request: &Self::Request, ctx: &Context) -> Result<String, AuthError> {
        if !ctx.auth.is_super(&request.remote_addr) {
            return Err(AuthError::SuperRequired);
        }
        let nodeip = request.nodeip.as_deref().filter(|s| !s.is_empty()).unwrap_or(&ctx.local_ip);
        Ok(crate::endpoints::fix_prefix(nodeip))
    }

    fn project(&self, _key: &str, data: HashMap<String, ContainerInfo>) -> Projected<Self::Output> {
        let set: BTreeSet<String> = data.values().map(|c| format!("{}/{}", c.app, c.proc)).collect();
        Projected::Ok(LocalspecReply { data: set.into_iter().collect() })
    }
}
