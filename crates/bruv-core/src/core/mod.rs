//! Service layer for bruv-core.
//!
//! [`Bruv`] ties together the configuration, the read-state store and a
//! Gerrit client, and exposes the operations the presentation layers need.
//!
//! # Usage
//!
//! ```no_run
//! use bruv_core::config::Config;
//! use bruv_core::core::Bruv;
//! use bruv_core::pipeline::PipelineOptions;
//!
//! let config = Config::load(&Config::resolve_path(None).unwrap()).unwrap();
//! let bruv = Bruv::open(config).unwrap();
//! let changes = bruv.get_default(&PipelineOptions::default()).unwrap();
//! ```

pub mod errors;

pub use errors::{CoreError, CoreResult};

use std::collections::BTreeMap;

use tracing::info;

use crate::config::Config;
use crate::fetcher::ChangesFetcher;
use crate::gerrit::{GerritClient, SshGerritClient};
use crate::pipeline::{triage_pipeline, AnnotatedChange, Pipeline, PipelineOptions};
use crate::store::{ReadStateRecord, ReadStateStore};

/// Facade over configuration, read state and Gerrit.
pub struct Bruv {
    config: Config,
    store: ReadStateStore,
    client: Box<dyn GerritClient>,
}

impl Bruv {
    /// Open the configured store and prepare an ssh Gerrit client.
    pub fn open(config: Config) -> CoreResult<Self> {
        let store = ReadStateStore::open(&config.store_path())?;
        let client = Box::new(SshGerritClient::new(&config));
        Ok(Self::with_client(config, store, client))
    }

    /// Build from explicit parts.
    #[must_use]
    pub fn with_client(
        config: Config,
        store: ReadStateStore,
        client: Box<dyn GerritClient>,
    ) -> Self {
        Self {
            config,
            store,
            client,
        }
    }

    #[must_use]
    pub const fn config(&self) -> &Config {
        &self.config
    }

    #[must_use]
    pub const fn store(&self) -> &ReadStateStore {
        &self.store
    }

    /// The triage pipeline for `options`.
    #[must_use]
    pub fn pipeline<'a>(&'a self, options: &'a PipelineOptions) -> Pipeline<'a> {
        triage_pipeline(&self.config, &self.store, options)
    }

    /// Run `query` and return the annotated, filtered changes.
    pub fn get_changes(
        &self,
        query: &str,
        options: &PipelineOptions,
    ) -> CoreResult<Vec<AnnotatedChange>> {
        if query.trim().is_empty() {
            return Err(CoreError::query(
                "empty query; pass one or set \"query\" in the configuration",
            ));
        }

        ChangesFetcher::new(self.client.as_ref())
            .with_pipeline(self.pipeline(options))
            .get_changes(query)
    }

    /// Run a saved query by name.
    pub fn get_saved(
        &self,
        name: &str,
        options: &PipelineOptions,
    ) -> CoreResult<Vec<AnnotatedChange>> {
        let query = self.config.saved_query(name)?;
        self.get_changes(query, options)
    }

    /// Run the configured default query.
    pub fn get_default(&self, options: &PipelineOptions) -> CoreResult<Vec<AnnotatedChange>> {
        self.get_changes(&self.config.query, options)
    }

    pub fn mark_read(&self, number: u64) -> CoreResult<ReadStateRecord> {
        info!(number, "marking read");
        self.store.mark_read(number)
    }

    pub fn mark_unread(&self, number: u64) -> CoreResult<ReadStateRecord> {
        info!(number, "marking unread");
        self.store.mark_unread(number)
    }

    /// Every stored read-state record.
    pub fn read_states(&self) -> CoreResult<Vec<ReadStateRecord>> {
        self.store.get_all()
    }

    #[must_use]
    pub const fn saved_queries(&self) -> &BTreeMap<String, String> {
        &self.config.queries
    }

    #[must_use]
    pub fn default_queries(&self) -> &[String] {
        &self.config.default_queries
    }
}
