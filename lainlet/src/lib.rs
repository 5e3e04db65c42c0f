//! Projection engine, endpoint catalogue, and auth boundary wiring the
//! `lainlet-core` watch fan-out engine to co-located clients (spec.md
//! §4.5-§4.6). The `lainletd` binary is the thin process entry point; this
//! crate holds everything it wires together.

pub mod auth;
pub mod context;
pub mod dispatcher;
pub mod endpoints;
pub mod watchers;
