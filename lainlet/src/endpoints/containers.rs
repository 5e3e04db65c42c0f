//! `GET/WATCH /containers`: identity projection of the container Cacher,
//! optionally filtered by nodename. Super-only. Grounded on
//! `endpoints/container.go`. The `v.is_none()` skip the Go original guards
//! against is impossible here: the container decoder never stores a nil
//! sentinel in the cache, so no equivalent check is needed.

use std::collections::{BTreeMap, HashMap};

use lainlet_core::decode::container::ContainerInfo;
use lainlet_core::error::AuthError;
use serde::Serialize;

use crate::context::Context;
use crate::dispatcher::{Endpoint, Projected};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ContainerEntry {
    pub app_name: String,
    pub app_version: String,
    pub proc_name: String,
    pub node_name: String,
    pub node_ip: String,
    pub ip: String,
    pub port: i32,
    pub instance_no: i32,
}

impl From<&ContainerInfo> for ContainerEntry {
    fn from(c: &ContainerInfo) -> Self {
        Self {
            app_name: c.app.clone(),
            app_version: c.app_version.clone(),
            proc_name: c.proc.clone(),
            node_name: c.node_name.clone(),
            node_ip: c.node_ip.clone(),
            ip: c.ip.clone(),
            port: c.port as i32,
            instance_no: c.instance_no,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Default)]
pub struct ContainersReply {
    pub data: BTreeMap<String, ContainerEntry>,
}

pub struct ContainersRequest {
    pub remote_addr: String,
    pub nodename: Option<String>,
}

pub struct ContainersEndpoint;

impl Endpoint for ContainersEndpoint {
    type Request = ContainersRequest;
    type Value = ContainerInfo;
    type Output = ContainersReply;

    fn resolve_key(&self, request: &Self::Request, ctx: &Context) -> Result<String, AuthError> {
        if !ctx.auth.is_super(&request.remote_addr) {
            return Err(AuthError::SuperRequired);
        }
        Ok(crate::endpoints::filter_key(request.nodename.as_deref()))
    }

    fn project(&self, _key: &str, data: HashMap<String, ContainerInfo>) -> Projected<Self::Output> {
        let out = data.iter().map(|(k, v)| (k.clone(), ContainerEntry::from(v))).collect();
        Projected::Ok(ContainersReply { data: out })
    }
}
