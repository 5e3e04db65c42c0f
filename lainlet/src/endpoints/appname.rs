//! `GET /appname`: resolves the owning app for an IP via the auth
//! collaborator. Super-only, no Watch. Supplemented from
//! `endpoints/appname.go` (dropped from the distilled spec).

use std::collections::BTreeMap;

use lainlet_core::error::AuthError;
use serde::Serialize;

use crate::context::Context;

#[derive(Debug, Clone, PartialEq, Serialize, Default)]
pub struct AppnameReply {
    pub data: BTreeMap<String, String>,
}

pub struct AppnameRequest {
    pub remote_addr: String,
    pub ip: Option<String>,
}

/// Resolves `appname` for `request.ip` (or the caller's own address) via
/// `ctx.auth`. Looked up directly rather than through the watch fan-out
/// engine and [`crate::dispatcher::EndpointDispatcher`]: there is no subtree
/// to subscribe to and nothing to dedup.
pub fn resolve(ctx: &Context, request: &AppnameRequest) -> Result<AppnameReply, AuthError> {
    if !ctx.auth.is_super(&request.remote_addr) {
        return Err(AuthError::SuperRequired);
    }
    let target = request.ip.as_deref().filter(|s| !s.is_empty()).unwrap_or(&request.remote_addr);
    let appname = ctx.auth.app_name(target)?;
    let mut data = BTreeMap::new();
    data.insert("appname".to_string(), appname);
    Ok(AppnameReply { data })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::StaticAuth;
    use std::sync::Arc;

    #[test]
    fn resolves_appname_for_remote_addr() {
        let ctx = Context::new("h", "1.2.3.4", Arc::new(StaticAuth::new(vec!["9.9.9.9".into()], vec![("1.2.3.4".into(), "web".into())])));
        let request = AppnameRequest { remote_addr: "9.9.9.9".into(), ip: Some("1.2.3.4".into()) };
        let reply = resolve(&ctx, &request).unwrap();
        assert_eq!(reply.data["appname"], "web");
    }

    #[test]
    fn non_super_rejected() {
        let ctx = Context::new("h", "1.2.3.4", Arc::new(StaticAuth::new(vec![], vec![])));
        let request = AppnameRequest { remote_addr: "9.9.9.9".into(), ip: None };
        assert_eq!(resolve(&ctx, &request).unwrap_err(), AuthError::SuperRequired);
    }
}
