//! Process-wide, immutable-after-init configuration. Per Design Note "Global
//! state": `hostname`, `localIp`, the secret-prefix list, and the auth
//! collaborator are built once at startup and threaded through by reference
//! rather than stashed in module-level statics.

use std::sync::Arc;

use crate::auth::Auth;

/// Config keys that require super privileges to read, per spec.md §4.5.
/// A target matches if it is prefixed by one of these (exact match for most
/// entries; `"*"` matches everything).
pub const SECRET_PREFIXES: &[&str] = &[
    "*",
    "swarm_manager_ip",
    "super_apps",
    "dnsmasq_servers",
    "calico_default_rule",
    "calico_network",
    "dnsmasq_addresses",
    "ssl",
    "vips",
    "tinydns_fqdns",
    "bootstrap_node_ip",
    "dns_port",
    "vip",
    "etcd_cluster_token",
    "system_volumes",
    "rsyncd_secrets",
    "dns_ip",
    "node_network",
];

pub fn is_secret_config_target(target: &str) -> bool {
    SECRET_PREFIXES.iter().any(|prefix| target.starts_with(prefix))
}

/// Shared, read-only process context passed to every endpoint's `resolve_key`.
pub struct Context {
    pub hostname: String,
    pub local_ip: String,
    pub auth: Arc<dyn Auth>,
}

impl Context {
    pub fn new(hostname: impl Into<String>, local_ip: impl Into<String>, auth: Arc<dyn Auth>) -> Self {
        Self {
            hostname: hostname.into(),
            local_ip: local_ip.into(),
            auth,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn secret_prefix_matches_are_prefix_based() {
        assert!(is_secret_config_target("*"));
        assert!(is_secret_config_target("ssl"));
        assert!(is_secret_config_target("ssl_cert_path"));
        assert!(!is_secret_config_target("lain_domain"));
    }
}
