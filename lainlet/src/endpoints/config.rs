//! `GET/WATCH /config`: identity projection of the config Cacher, gated on
//! the secret-prefix list for non-super callers. Grounded on
//! `endpoints/config.go`.

use std::collections::{BTreeMap, HashMap};

use lainlet_core::error::AuthError;
use serde::Serialize;

use crate::context::{is_secret_config_target, Context};
use crate::dispatcher::{Endpoint, Projected};

#[derive(Debug, Clone, PartialEq, Serialize, Default)]
pub struct ConfigReply {
    pub data: BTreeMap<String, String>,
}

pub struct ConfigRequest {
    pub remote_addr: String,
    pub target: Option<String>,
}

pub struct ConfigEndpoint;

impl Endpoint for ConfigEndpoint {
    type Request = ConfigRequest;
    type Value = String;
    type Output = ConfigReply;

    fn resolve_key(&self, request: &Self::Request, ctx: &Context) -> Result<String, AuthError> {
        let target = request.target.as_deref().filter(|s| !s.is_empty()).unwrap_or("*");
        if is_secret_config_target(target) && !ctx.auth.is_super(&request.remote_addr) {
            return Err(AuthError::SuperRequired);
        }
        Ok(target.to_string())
    }

    fn project(&self, _key: &str, data: HashMap<String, String>) -> Projected<Self::Output> {
        Projected::Ok(ConfigReply { data: data.into_iter().collect() })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::{AllowAll, StaticAuth};
    use std::sync::Arc;

    fn ctx(auth: Arc<dyn crate::auth::Auth>) -> Context {
        Context::new("h", "1.2.3.4", auth)
    }

    #[test]
    fn non_super_rejected_for_secret_target() {
        let ctx = ctx(Arc::new(StaticAuth::new(vec![], vec![])));
        let req = ConfigRequest { remote_addr: "1.2.3.4".into(), target: Some("ssl".into()) };
        assert_eq!(ConfigEndpoint.resolve_key(&req, &ctx).unwrap_err(), AuthError::SuperRequired);
    }

    #[test]
    fn non_secret_target_allowed_for_anyone() {
        let ctx = ctx(Arc::new(StaticAuth::new(vec![], vec![])));
        let req = ConfigRequest { remote_addr: "1.2.3.4".into(), target: Some("lain_domain".into()) };
        assert_eq!(ConfigEndpoint.resolve_key(&req, &ctx).unwrap(), "lain_domain");
    }

    #[test]
    fn default_target_is_star_and_secret() {
        let ctx = ctx(Arc::new(AllowAll));
        let req = ConfigRequest { remote_addr: "1.2.3.4".into(), target: None };
        assert_eq!(ConfigEndpoint.resolve_key(&req, &ctx).unwrap(), "*");
    }
}
