//! CLI command definitions and handlers.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use crate::output::OutputFormat;

pub mod commands;

/// Personal Gerrit review triage
#[derive(Parser, Debug)]
#[command(name = "bruv")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Configuration file (default: $BRUV_CONFIG or ~/.bruvrc)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Output format
    #[arg(long, global = true, value_enum, default_value_t)]
    pub format: OutputFormat,

    #[command(subcommand)]
    pub command: Commands,
}

/// Pipeline selection shared by `list` and `pipeline`.
#[derive(Args, Debug, Clone, Default)]
pub struct FilterArgs {
    /// Filter expression, e.g. "project:openstack/nova -bug:any"
    #[arg(long = "where", value_name = "EXPR")]
    pub expression: Option<String>,

    /// Keep changes already read or unchanged since my last review
    #[arg(long)]
    pub all: bool,

    /// Hide changes I own
    #[arg(long)]
    pub hide_mine: bool,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// List changes needing attention
    List {
        /// Saved query name (default: the configured query)
        name: Option<String>,

        /// Literal Gerrit query
        #[arg(long, conflicts_with = "name")]
        query: Option<String>,

        #[command(flatten)]
        filter: FilterArgs,
    },

    /// Mark changes read
    Read {
        /// Change numbers
        #[arg(required = true)]
        numbers: Vec<String>,
    },

    /// Mark changes unread
    Unread {
        /// Change numbers
        #[arg(required = true)]
        numbers: Vec<String>,
    },

    /// Show stored read state
    State,

    /// Show saved and default queries
    Queries,

    /// Show the pipeline steps that `list` would run
    Pipeline {
        #[command(flatten)]
        filter: FilterArgs,
    },

    /// Interactive triage session
    Shell {
        #[command(flatten)]
        filter: FilterArgs,
    },
}
