//! The generic `{resolve key, project, dedup}` pattern every endpoint
//! follows (spec.md Design Note "Per-endpoint repeated patterns"),
//! implemented once as [`EndpointDispatcher<D, E>`] rather than per endpoint.

use std::collections::HashMap;
use std::sync::Arc;

use futures::Stream;
use parking_lot::RwLock;
use tokio_stream::StreamExt;
use tokio_util::sync::CancellationToken;

use lainlet_core::cacher::CachedValue;
use lainlet_core::decode::Decoder;
use lainlet_core::error::{AuthError, ProjectionError};
use lainlet_core::watcher::Watcher;

use crate::context::Context;

/// The outcome of a single projection pass (spec.md §4.5 item 2-3).
///
/// `Degraded` models the liveness-guard failure policy (§4.5 "Special
/// failure policy"): the projector still produces a best-effort payload, but
/// flags it with the sentinel error. The dispatcher never treats a degraded
/// pass as a change, and never lets it overwrite the dedup cache, so a
/// recovering projection is still detected as "changed" once it turns
/// healthy again.
pub enum Projected<T> {
    Ok(T),
    Degraded(T, ProjectionError),
}

/// One endpoint's `{resolve key, project}` pair. The dedup cache and the
/// Get/Watch control flow are handled generically by [`EndpointDispatcher`].
pub trait Endpoint: Send + Sync + 'static {
    type Request: Send + Sync;
    type Value: CachedValue;
    type Output: Clone + PartialEq + Send + Sync + 'static;

    fn resolve_key(&self, request: &Self::Request, ctx: &Context) -> Result<String, AuthError>;

    fn project(&self, key: &str, data: HashMap<String, Self::Value>) -> Projected<Self::Output>;
}

/// Generic endpoint dispatcher: owns an endpoint's resolve/project pair, a
/// reference to the Watcher whose Cacher it reads, and the endpoint's
/// per-subscription-key dedup cache (spec.md §4.5 "State").
///
/// The dedup cache is guarded by a single `parking_lot::RwLock` held across
/// both the comparison and the conditional write (spec.md §9 Open Question
/// 2): there is no window where a concurrent caller can observe a
/// compare-then-write race.
pub struct EndpointDispatcher<D: Decoder, E: Endpoint<Value = D::Value>> {
    watcher: Arc<Watcher<D>>,
    endpoint: E,
    dedup: RwLock<HashMap<String, E::Output>>,
}

impl<D: Decoder, E: Endpoint<Value = D::Value>> EndpointDispatcher<D, E> {
    pub fn new(watcher: Arc<Watcher<D>>, endpoint: E) -> Arc<Self> {
        Arc::new(Self {
            watcher,
            endpoint,
            dedup: RwLock::new(HashMap::new()),
        })
    }

    /// Project the current cache contents under `key` and fold the result
    /// into the dedup cache. Returns `(payload, error, changed)`; `changed`
    /// is always `false` for a degraded pass, and a degraded pass never
    /// mutates the dedup cache (so a later healthy pass with the same
    /// payload as the last *healthy* one is still detected as unchanged).
    fn compute(&self, key: &str) -> (E::Output, Option<ProjectionError>, bool) {
        let data = self.watcher.get(key);
        match self.endpoint.project(key, data) {
            Projected::Ok(payload) => {
                let mut dedup = self.dedup.write();
                let changed = dedup.get(key) != Some(&payload);
                if changed {
                    dedup.insert(key.to_string(), payload.clone());
                }
                (payload, None, changed)
            }
            Projected::Degraded(payload, err) => (payload, Some(err), false),
        }
    }

    /// One-shot GET: resolve key, project, return — always, degraded or not
    /// (spec.md §4.5 "Get always returns the current projection").
    pub fn get(&self, request: &E::Request, ctx: &Context) -> Result<(E::Output, Option<ProjectionError>), AuthError> {
        let key = self.endpoint.resolve_key(request, ctx)?;
        let (payload, err, _changed) = self.compute(&key);
        Ok((payload, err))
    }

    /// Long-lived WATCH: resolve key, emit the initial projection only if
    /// it isn't degraded, then emit again only when a later poll reports a
    /// genuine (non-degraded) change (spec.md §4.5 "Watch suppresses
    /// emission", §4.6, §7, §8 property 6). A degraded initial projection
    /// yields nothing until the underlying state recovers, matching the
    /// original's `endpoints/streamrouter_streamprocs.go` Watch, which
    /// returns the liveness-guard error instead of calling `stream.Send`.
    pub fn watch(
        self: &Arc<Self>,
        request: &E::Request,
        ctx: &Context,
        cancel: CancellationToken,
    ) -> Result<impl Stream<Item = E::Output> + Send + 'static, AuthError>
    where
        D: 'static,
    {
        let key = self.endpoint.resolve_key(request, ctx)?;
        let (initial, initial_err, _changed) = self.compute(&key);
        let markers = self.watcher.watch(key.clone(), cancel);
        let dispatcher = Arc::clone(self);

        Ok(async_stream::stream! {
            if initial_err.is_none() {
                yield initial;
            }
            tokio::pin!(markers);
            while markers.next().await.is_some() {
                let (payload, err, changed) = dispatcher.compute(&key);
                if err.is_none() && changed {
                    yield payload;
                }
            }
        })
    }
}
