//! The auth collaborator boundary (spec.md §1, §2): answers `is_super`,
//! `pass`, and `app_name` for a remote address. Lainlet core treats this as
//! an external collaborator — out of scope for this crate beyond the
//! contract its three methods expose — so only the trait plus a permissive
//! test/demo double live here; a real deployment wires in an implementation
//! backed by the cluster's app-ownership registry.

pub use lainlet_core::error::AuthError;

/// Resolves caller identity and app ownership from a remote address.
///
/// Implementations must be cheap and non-blocking: every endpoint call
/// resolves its subscription key through this trait.
pub trait Auth: Send + Sync + 'static {
    /// Whether `remote_addr` is allowed to call super-only endpoints.
    fn is_super(&self, remote_addr: &str) -> bool;

    /// Whether `remote_addr` may read data scoped to `appname`. `appname ==
    /// "*"` asks whether the caller may read every app (always false unless
    /// also super, in the default double).
    fn pass(&self, remote_addr: &str, appname: &str) -> bool;

    /// The single app `remote_addr` is known to own, used to auto-scope
    /// `appname == "*"` requests that fail `pass`.
    fn app_name(&self, remote_addr: &str) -> Result<String, AuthError>;
}

/// A permissive double: every address is super and owns every app. Used by
/// `lainletd`'s demo wiring and by dispatcher tests, in place of the real
/// registry-backed implementation a production deployment supplies.
pub struct AllowAll;

impl Auth for AllowAll {
    fn is_super(&self, _remote_addr: &str) -> bool {
        true
    }

    fn pass(&self, _remote_addr: &str, _appname: &str) -> bool {
        true
    }

    fn app_name(&self, remote_addr: &str) -> Result<String, AuthError> {
        Ok(remote_addr.to_string())
    }
}

/// A fixed-registry double for tests: explicit `(addr, app)` ownership pairs,
/// a fixed super-admin address set, and `pass` succeeding only for an owned
/// app or a super caller.
pub struct StaticAuth {
    supers: Vec<String>,
    owners: Vec<(String, String)>,
}

impl StaticAuth {
    pub fn new(supers: Vec<String>, owners: Vec<(String, String)>) -> Self {
        Self { supers, owners }
    }
}

impl Auth for StaticAuth {
    fn is_super(&self, remote_addr: &str) -> bool {
        self.supers.iter().any(|s| s == remote_addr)
    }

    fn pass(&self, remote_addr: &str, appname: &str) -> bool {
        if self.is_super(remote_addr) {
            return true;
        }
        self.owners
            .iter()
            .any(|(addr, app)| addr == remote_addr && app == appname)
    }

    fn app_name(&self, remote_addr: &str) -> Result<String, AuthError> {
        self.owners
            .iter()
            .find(|(addr, _)| addr == remote_addr)
            .map(|(_, app)| app.clone())
            .ok_or(AuthError::CannotConfirmApp)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn static_auth_pass_requires_ownership_or_super() {
        let auth = StaticAuth::new(vec!["10.0.0.1".into()], vec![("10.0.0.2".into(), "web".into())]);
        assert!(auth.pass("10.0.0.1", "anything"));
        assert!(auth.pass("10.0.0.2", "web"));
        assert!(!auth.pass("10.0.0.2", "db"));
        assert!(!auth.pass("10.0.0.3", "web"));
    }

    #[test]
    fn static_auth_app_name_unknown_addr_errors() {
        let auth = StaticAuth::new(vec![], vec![("10.0.0.2".into(), "web".into())]);
        assert_eq!(auth.app_name("10.0.0.2").unwrap(), "web");
        assert_eq!(auth.app_name("10.0.0.9").unwrap_err(), AuthError::CannotConfirmApp);
    }
}
