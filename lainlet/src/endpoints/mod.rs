//! The endpoint catalogue (spec.md §4.5-§4.6). Every endpoint is a small
//! [`crate::dispatcher::Endpoint`] impl; this module holds the helpers their
//! `resolve_key` implementations share.

pub mod appname;
pub mod apps;
pub mod backupctl;
pub mod config;
pub mod containers;
pub mod coreinfo;
pub mod depends;
pub mod localspec;
pub mod nodes;
pub mod podgroup;
pub mod proxy;
pub mod rebellion_localprocs;
pub mod status;
pub mod streamrouter_ports;
pub mod streamrouter_streamprocs;
pub mod webrouter_webprocs;

use lainlet_core::error::AuthError;

use crate::context::Context;

/// Append `/` to a non-empty key that doesn't already end in one. Mirrors
/// the original's `fixPrefix`.
pub fn fix_prefix(s: &str) -> String {
    if s.is_empty() || s.ends_with('/') {
        s.to_string()
    } else {
        format!("{s}/")
    }
}

/// The plain (non-auth-gated) filter-to-subscription-key rule shared by
/// super-only endpoints that accept an optional filter with no further
/// `pass` check (backupctl's appname filter, containers' nodename filter):
/// `"*"` or absent means everything; otherwise prefix-normalize.
pub fn filter_key(filter: Option<&str>) -> String {
    let filter = filter.filter(|s| !s.is_empty()).unwrap_or("*");
    if filter == "*" {
        "*".to_string()
    } else {
        fix_prefix(filter)
    }
}

/// The app-scoped resolve rule shared by `coreinfo`, `proxy`,
/// `rebellion-localprocs`, `streamrouter-ports`, `streamrouter-streamprocs`,
/// `webrouter-webprocs`, and `podgroup` (spec.md §4.5):
///
/// - `appname` defaults to `"*"`.
/// - If the caller doesn't `pass` for the requested `appname`: when the
///   request was for `"*"`, fall back to the caller's own app (via
///   `app_name`); otherwise fail with `NoPermission`.
/// - Otherwise prefix-normalize `appname` (no-op for `"*"`).
pub fn resolve_app_scoped_key(ctx: &Context, remote_addr: &str, appname: Option<&str>) -> Result<String, AuthError> {
    let appname = appname.filter(|s| !s.is_empty()).unwrap_or("*");
    if !ctx.auth.pass(remote_addr, appname) {
        if appname == "*" {
            let owned = ctx.auth.app_name(remote_addr)?;
            return Ok(fix_prefix(&owned));
        }
        return Err(AuthError::NoPermission);
    }
    Ok(if appname == "*" { "*".to_string() } else { fix_prefix(appname) })
}

/// The `nodes` endpoint's own separator: `:` rather than `/` (spec.md
/// SPEC_FULL.md "Nodes key normalization uses a `:` suffix, not `/`",
/// grounded on `endpoints/nodes.go`).
pub fn node_filter_key(filter: Option<&str>) -> String {
    let filter = filter.filter(|s| !s.is_empty()).unwrap_or("*");
    if filter == "*" || filter.ends_with(':') {
        filter.to_string()
    } else {
        format!("{filter}:")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fix_prefix_appends_slash_once() {
        assert_eq!(fix_prefix("web"), "web/");
        assert_eq!(fix_prefix("web/"), "web/");
        assert_eq!(fix_prefix(""), "");
    }

    #[test]
    fn node_filter_key_uses_colon() {
        assert_eq!(node_filter_key(None), "*");
        assert_eq!(node_filter_key(Some("node-1")), "node-1:");
        assert_eq!(node_filter_key(Some("node-1:")), "node-1:");
    }
}
