//! lookout-meili
//!
//! `SearchGateway` over HTTP for a Meilisearch-compatible index, a
//! latency probe that works against any gateway, and an indexing benchmark.

pub mod admin;
pub mod bench;
pub mod client;
pub mod probe;
pub mod query;
pub mod wire;

pub use admin::MeiliAdmin;
pub use client::MeiliGateway;
pub use probe::{probe, ProbeReport};
