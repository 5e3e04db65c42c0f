//! Process entry point: parses CLI flags, spawns the five domain watchers
//! against a store adapter, and logs periodic status until interrupted.
//!
//! The store driver itself (etcd/Xline wire client) is out of scope (spec.md
//! §1 Non-goals); `lainlet_core::store::MemoryStore` stands in here as the
//! `StoreAdapter` a real deployment would replace with a networked one.

use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use lainlet::endpoints::status::WatcherStatusSource;
use lainlet::watchers::Watchers;
use lainlet_core::store::{MemoryStore, StoreAdapter};

/// Flags mirror the original's `-etcd`/`-ip`/`-debug`/`-web`, renamed to
/// clap's kebab-case long-flag convention.
#[derive(Parser)]
#[command(name = "lainletd", version, about = "Per-node read-only projection service")]
struct Opts {
    /// Address(es) of the backing key/value store cluster, comma-separated.
    #[arg(long, default_value = "")]
    store_addr: String,

    /// The IP this lainletd instance is running on, used to default
    /// node-scoped endpoints (localspec) to the local node.
    #[arg(long, default_value = "127.0.0.1")]
    ip: String,

    /// Enable debug-level logging.
    #[arg(long)]
    debug: bool,

    /// Disable auth entirely; every caller is treated as super and owning
    /// every app. Matches the original's `-noauth`.
    #[arg(long)]
    noauth: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let opts = Opts::parse();

    let filter = if opts.debug { "lainlet=debug,lainlet_core=debug,info" } else { "lainlet=info,lainlet_core=info,warn" };
    tracing_subscriber::fmt().with_env_filter(tracing_subscriber::EnvFilter::new(filter)).init();

    if !opts.noauth {
        tracing::warn!("real auth registry wiring is out of scope; running with the permissive AllowAll double");
    }

    tracing::info!(ip = %opts.ip, store_addr = %opts.store_addr, hostname = %hostname(), "starting lainletd");

    let store: Arc<dyn StoreAdapter> = Arc::new(MemoryStore::new());
    let watchers = Watchers::spawn(store).await?;

    let shutdown = tokio::signal::ctrl_c();
    tokio::pin!(shutdown);
    let mut tick = tokio::time::interval(Duration::from_secs(30));
    loop {
        tokio::select! {
            _ = tick.tick() => {
                for (name, source) in watchers.status_sources() {
                    let status = source.status();
                    tracing::debug!(watcher = %name, receivers = status.num_receivers, keys = status.total_keys, "watcher status");
                }
            }
            _ = &mut shutdown => {
                tracing::info!("received interrupt, shutting down");
                break;
            }
        }
    }

    Ok(())
}

fn hostname() -> String {
    hostname::get()
        .ok()
        .and_then(|h| h.into_string().ok())
        .unwrap_or_else(|| "unknown".to_string())
}
