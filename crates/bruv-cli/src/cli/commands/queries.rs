//! Implementation of `bruv queries` and `bruv pipeline`.

use anyhow::Result;
use std::path::Path;

use bruv_core::pipeline::triage_pipeline;
use bruv_core::store::ReadStateStore;

use crate::cli::commands::helpers::load_config;
use crate::cli::FilterArgs;
use crate::output::{Formatter, OutputFormat};

/// Print saved queries and the names selected by default.
#[tracing::instrument(skip(config_path, format))]
pub fn run_queries(config_path: Option<&Path>, format: OutputFormat) -> Result<()> {
    let config = load_config(config_path)?;

    let output = serde_json::json!({
        "query": config.query,
        "queries": config.queries,
        "default_queries": config.default_queries,
    });

    Formatter::new(format).print(&output)
}

/// Print the step order `list` would run with the same flags.
#[tracing::instrument(skip(config_path, format))]
pub fn run_pipeline(config_path: Option<&Path>, filter: &FilterArgs, format: OutputFormat) -> Result<()> {
    let config = load_config(config_path)?;
    let options = filter.options()?;

    // Step names don't depend on stored state.
    let store = ReadStateStore::open_in_memory()?;
    let steps = triage_pipeline(&config, &store, &options).step_names();

    let output = serde_json::json!({ "steps": steps });
    Formatter::new(format).print(&output)
}
