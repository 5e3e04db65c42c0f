//! `GET /apps`: the set of known app namespaces, derived from pod-group
//! namespaces. Grounded on `endpoints/apps.go`.

use std::collections::{BTreeMap, HashMap};

use lainlet_core::decode::pod_group::PodGroup;
use lainlet_core::error::AuthError;
use serde::Serialize;

use crate::context::Context;
use crate::dispatcher::{Endpoint, Projected};

#[derive(Debug, Clone, PartialEq, Serialize, Default)]
pub struct AppInfo {
    pub appname: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Default)]
pub struct AppsReply {
    pub data: BTreeMap<String, AppInfo>,
}

pub struct AppsRequest {
    pub remote_addr: String,
}

pub struct AppsEndpoint;

impl Endpoint for AppsEndpoint {
    type Request = AppsRequest;
    type Value = PodGroup;
    type Output = AppsReply;

    fn resolve_key(&self, request: &Self::Request, ctx: &Context) -> Result<String, AuthError> {
        if !ctx.auth.is_super(&request.remote_addr) {
            return Err(AuthError::SuperRequired);
        }
        Ok("*".to_string())
    }

    fn project(&self, _key: &str, data: HashMap<String, PodGroup>) -> Projected<Self::Output> {
        let mut out = BTreeMap::new();
        for pg in data.values() {
            let appname = pg.spec.namespace.clone();
            out.entry(appname.clone()).or_insert(AppInfo { appname });
        }
        Projected::Ok(AppsReply { data: out })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lainlet_core::decode::pod_group::PodGroupSpec;
    use std::sync::Arc;

    fn pg(name: &str, namespace: &str) -> PodGroup {
        PodGroup {
            spec: Arc::new(PodGroupSpec {
                name: name.to_string(),
                namespace: namespace.to_string(),
                annotation: String::new(),
                containers: Vec::new(),
                dependencies: Vec::new(),
            }),
            pods: Arc::new(Vec::new()),
        }
    }

    #[test]
    fn projects_distinct_namespaces() {
        let mut data = HashMap::new();
        data.insert("web.web.api".to_string(), pg("web.web.api", "web"));
        data.insert("db.worker.main".to_string(), pg("db.worker.main", "db"));
        let Projected::Ok(reply) = AppsEndpoint.project("*", data) else {
            panic!("expected Ok");
        };
        assert_eq!(reply.data.len(), 2);
        assert_eq!(reply.data["web"].appname, "web");
        assert_eq!(reply.data["db"].appname, "db");
    }
}
