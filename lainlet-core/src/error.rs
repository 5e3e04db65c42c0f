//! Error taxonomy for the watch fan-out engine, one enum per concern.
//!
//! Mirrors `kube_runtime::watcher::Error` / `kube_runtime::controller::Error`:
//! each variant carries `#[source]`/`#[from]` and a human `#[error("...")]`
//! message. Nothing here is a bare `String`.

use thiserror::Error;

/// Failures surfaced by a [`crate::store::StoreAdapter`].
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("store transport error: {0}")]
    Transport(String),

    #[error("store returned no data for key {0:?}")]
    NotFound(String),
}

/// Failures surfaced while decoding raw store entries into derived values.
///
/// Per spec.md §7, a decode error is never fatal: the Watcher logs it once
/// and retains the cache's prior value for the affected derived key.
#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("malformed json for key {key}: {source}")]
    Json {
        key: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("malformed annotation for key {key}: {source}")]
    Annotation {
        key: String,
        #[source]
        source: serde_json::Error,
    },
}

/// Failures surfaced by the auth collaborator boundary and the endpoint
/// dispatcher's resolve-key step.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AuthError {
    #[error("authorize failed, super required")]
    SuperRequired,

    #[error("authorize failed, no permission")]
    NoPermission,

    #[error("authorize failed, can not confirm the app by request ip")]
    CannotConfirmApp,
}

/// Failures surfaced by a projection.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ProjectionError {
    #[error(transparent)]
    Auth(#[from] AuthError),

    /// The liveness guard tripped: more than half the known containers have
    /// lost their IPs. Watch suppresses emission; Get returns the partial
    /// payload paired with this error.
    #[error("over half of the containers lost their IPs")]
    TooManyDeadContainers,
}

/// Errors a Watch stream can terminate with. Per spec.md §7, only upstream
/// fatal conditions reach subscribers; transient/decode errors are absorbed
/// internally by the watch loop.
#[derive(Debug, Error)]
pub enum WatchError {
    #[error("upstream watch terminated: {0}")]
    Fatal(#[from] StoreError),
}
