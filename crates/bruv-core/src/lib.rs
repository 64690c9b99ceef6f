//! bruv-core: triage logic for the bruv Gerrit review tool.
//!
//! This crate owns configuration, Gerrit change records and the ssh query
//! client, the annotation pipeline, the filter language, and the read-state
//! store.

pub mod config;
pub mod core;
pub mod fetcher;
pub mod filter;
pub mod gerrit;
pub mod pipeline;
pub mod store;
pub mod text;
