//! `GET/WATCH /depends`: identity projection of the depends Cacher. Super-only.
//! Grounded on `endpoints/depends.go`.

use std::collections::{BTreeMap, HashMap};

use lainlet_core::decode::depends::DependsByNodeApp;
use lainlet_core::error::AuthError;
use serde::Serialize;

use crate::context::Context;
use crate::dispatcher::{Endpoint, Projected};

#[derive(Debug, Clone, PartialEq, Serialize, Default)]
pub struct DependsReply {
    pub data: BTreeMap<String, DependsByNodeApp>,
}

pub struct DependsRequest {
    pub remote_addr: String,
    pub target: Option<String>,
}

pub struct DependsEndpoint;

impl Endpoint for DependsEndpoint {
    type Request = DependsRequest;
    type Value = DependsByNodeApp;
    type Output = DependsReply;

    fn resolve_key(&self, request: &Self::Request, ctx: &Context) -> Result<String, AuthError> {
        if !ctx.auth.is_super(&request.remote_addr) {
            return Err(AuthError::SuperRequired);
        }
        Ok(request.target.clone().filter(|s| !s.is_empty()).unwrap_or_else(|| "*".to_string()))
    }

    fn project(&self, _key: &str, data: HashMap<String, DependsByNodeApp>) -> Projected<Self::Output> {
        Projected::Ok(DependsReply { data: data.into_iter().collect() })
    }
}
