//! Implementation of `bruv read`, `bruv unread` and `bruv state`.

use anyhow::Result;
use std::path::Path;

use bruv_core::store::ReadStateRecord;

use crate::cli::commands::helpers::{open_bruv, parse_numbers};
use crate::output::{Formatter, OutputFormat};

/// Mark changes read as of now.
#[tracing::instrument(skip(config_path, format))]
pub fn run_read(config_path: Option<&Path>, numbers: &[String], format: OutputFormat) -> Result<()> {
    let numbers = parse_numbers(numbers)?;
    let bruv = open_bruv(config_path)?;

    let records = numbers
        .into_iter()
        .map(|number| bruv.mark_read(number).map_err(anyhow::Error::from))
        .collect::<Result<Vec<ReadStateRecord>>>()?;

    Formatter::new(format).print_records(&records, "")
}

/// Mark changes unread.
#[tracing::instrument(skip(config_path, format))]
pub fn run_unread(config_path: Option<&Path>, numbers: &[String], format: OutputFormat) -> Result<()> {
    let numbers = parse_numbers(numbers)?;
    let bruv = open_bruv(config_path)?;

    let records = numbers
        .into_iter()
        .map(|number| bruv.mark_unread(number).map_err(anyhow::Error::from))
        .collect::<Result<Vec<ReadStateRecord>>>()?;

    Formatter::new(format).print_records(&records, "")
}

/// Print every stored read-state record.
#[tracing::instrument(skip(config_path, format))]
pub fn run_state(config_path: Option<&Path>, format: OutputFormat) -> Result<()> {
    let bruv = open_bruv(config_path)?;
    let records = bruv.read_states()?;
    Formatter::new(format).print_records(&records, "No read state recorded.")
}
