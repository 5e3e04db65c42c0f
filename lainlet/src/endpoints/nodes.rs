//! `GET/WATCH /nodes`: identity projection of the nodes Cacher, keyed with
//! the `:`-suffix separator rather than `/`. Super-only. Grounded on
//! `endpoints/nodes.go`.

use std::collections::{BTreeMap, HashMap};

use lainlet_core::decode::nodes::NodeFieldValue;
use lainlet_core::error::AuthError;
use serde::Serialize;

use crate::context::Context;
use crate::dispatcher::{Endpoint, Projected};

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "vtype", rename_all = "UPPERCASE")]
pub enum NodeInfoValue {
    String { sval: String },
    Map { mval: BTreeMap<String, String> },
}

impl From<&NodeFieldValue> for NodeInfoValue {
    fn from(v: &NodeFieldValue) -> Self {
        match v {
            NodeFieldValue::String(s) => NodeInfoValue::String { sval: s.clone() },
            NodeFieldValue::Map(m) => NodeInfoValue::Map { mval: m.iter().map(|(k, v)| (k.clone(), v.clone())).collect() },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Default)]
pub struct NodeInfo {
    pub v: BTreeMap<String, NodeInfoValue>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Default)]
pub struct NodesReply {
    pub data: BTreeMap<String, NodeInfo>,
}

pub struct NodesRequest {
    pub remote_addr: String,
    pub name: Option<String>,
}

pub struct NodesEndpoint;

impl Endpoint for NodesEndpoint {
    type Request = NodesRequest;
    type Value = HashMap<String, NodeFieldValue>;
    type Output = NodesReply;

    fn resolve_key(&self, request: &Self::Request, ctx: &Context) -> Result<String, AuthError> {
        if !ctx.auth.is_super(&request.remote_addr) {
            return Err(AuthError::SuperRequired);
        }
        Ok(crate::endpoints::node_filter_key(request.name.as_deref()))
    }

    fn project(&self, _key: &str, data: HashMap<String, HashMap<String, NodeFieldValue>>) -> Projected<Self::Output> {
        let out = data
            .iter()
            .map(|(node, fields)| {
                let v = fields.iter().map(|(k, v)| (k.clone(), NodeInfoValue::from(v))).collect();
                (node.clone(), NodeInfo { v })
            })
            .collect();
        Projected::Ok(NodesReply { data: out })
    }
}
