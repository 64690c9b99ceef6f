//! Shared helpers for CLI commands.

use anyhow::{Context, Result};
use std::path::Path;

use bruv_core::config::Config;
use bruv_core::core::Bruv;
use bruv_core::filter::FilterExpr;
use bruv_core::pipeline::PipelineOptions;
use bruv_core::store::parse_change_number;

use crate::cli::FilterArgs;

/// Load the configuration from `--config`, `$BRUV_CONFIG` or `~/.bruvrc`.
pub fn load_config(explicit: Option<&Path>) -> Result<Config> {
    let path = Config::resolve_path(explicit)?;
    let config = Config::load(&path)
        .with_context(|| format!("Failed to load configuration from {}", path.display()))?;
    tracing::debug!(path = %path.display(), host = %config.host, "configuration loaded");
    Ok(config)
}

/// Load the configuration and open the store.
pub fn open_bruv(explicit: Option<&Path>) -> Result<Bruv> {
    let config = load_config(explicit)?;
    let store_path = config.store_path();
    Bruv::open(config)
        .with_context(|| format!("Failed to open read-state store {}", store_path.display()))
}

impl FilterArgs {
    /// Pipeline options for these flags. A bad `--where` expression is an error.
    pub fn options(&self) -> Result<PipelineOptions> {
        let filter = self
            .expression
            .as_deref()
            .filter(|expr| !expr.trim().is_empty())
            .map(FilterExpr::parse)
            .transpose()?;

        Ok(PipelineOptions {
            show_all: self.all,
            hide_mine: self.hide_mine,
            filter,
        })
    }
}

/// Canonicalize every change number, failing on the first bad one.
pub fn parse_numbers(inputs: &[String]) -> Result<Vec<u64>> {
    inputs
        .iter()
        .map(|input| parse_change_number(input).map_err(anyhow::Error::from))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn test_load_config_reports_path() {
        let dir = tempdir().expect("tempdir");
        let path = dir.path().join("missing.json");
        let err = load_config(Some(&path)).expect_err("missing config");
        assert!(format!("{err:#}").contains("missing.json"));
    }

    #[test]
    fn test_load_config_from_file() {
        let dir = tempdir().expect("tempdir");
        let path = dir.path().join("bruvrc");
        fs::write(&path, r#"{"username": "me", "host": "review.example.org"}"#).expect("write");

        let config = load_config(Some(&path)).expect("config");
        assert_eq!(config.username, "me");
        assert_eq!(config.host, "review.example.org");
    }

    #[test]
    fn test_open_bruv_creates_store() {
        let dir = tempdir().expect("tempdir");
        let db = dir.path().join("state").join("read_state.db");
        let path = dir.path().join("bruvrc");
        fs::write(
            &path,
            format!(r#"{{"username": "me", "db_file": "{}"}}"#, db.display()),
        )
        .expect("write");

        let bruv = open_bruv(Some(&path)).expect("open");
        bruv.mark_read(7).expect("mark read");
        assert!(db.exists());
    }

    #[test]
    fn test_filter_args_options() {
        let args = FilterArgs {
            expression: Some("project:openstack/nova".to_string()),
            all: true,
            hide_mine: false,
        };
        let options = args.options().expect("options");
        assert!(options.show_all);
        assert!(!options.hide_mine);
        assert!(options.filter.is_some());

        let blank = FilterArgs {
            expression: Some("  ".to_string()),
            ..FilterArgs::default()
        };
        assert!(blank.options().expect("options").filter.is_none());
    }

    #[test]
    fn test_filter_args_rejects_bad_expression() {
        let args = FilterArgs {
            expression: Some("colour:blue".to_string()),
            ..FilterArgs::default()
        };
        assert!(args.options().is_err());
    }

    #[test]
    fn test_parse_numbers() {
        let numbers = parse_numbers(&["42".to_string(), " 7 ".to_string()]).expect("numbers");
        assert_eq!(numbers, vec![42, 7]);
        assert!(parse_numbers(&["42".to_string(), "abc".to_string()]).is_err());
    }
}
