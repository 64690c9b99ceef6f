//! Implementation of `bruv list`.

use anyhow::Result;
use std::path::Path;

use crate::cli::commands::helpers::open_bruv;
use crate::cli::FilterArgs;
use crate::output::{Formatter, OutputFormat};

/// List changes from a saved query, a literal query, or the configured default.
#[tracing::instrument(skip(config_path, format))]
pub fn run_list(
    config_path: Option<&Path>,
    name: Option<&str>,
    query: Option<&str>,
    filter: &FilterArgs,
    format: OutputFormat,
) -> Result<()> {
    let options = filter.options()?;
    let bruv = open_bruv(config_path)?;

    let changes = match (name, query) {
        (Some(name), _) => bruv.get_saved(name, &options)?,
        (None, Some(query)) => bruv.get_changes(query, &options)?,
        (None, None) => bruv.get_default(&options)?,
    };

    Formatter::new(format).print_changes(&changes, "Nothing to review.")
}
