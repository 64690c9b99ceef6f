//! Query Gerrit and run the result through a pipeline.

use tracing::info;

use crate::core::CoreResult;
use crate::gerrit::{GerritClient, QueryOptions};
use crate::pipeline::{AnnotatedChange, Pipeline};

/// Fetches changes and annotates them. No retries: the first failure is returned.
pub struct ChangesFetcher<'a> {
    client: &'a dyn GerritClient,
    pipeline: Pipeline<'a>,
}

impl<'a> ChangesFetcher<'a> {
    /// A fetcher that returns changes unannotated until a pipeline is set.
    #[must_use]
    pub fn new(client: &'a dyn GerritClient) -> Self {
        Self {
            client,
            pipeline: Pipeline::identity(),
        }
    }

    #[must_use]
    pub fn with_pipeline(mut self, pipeline: Pipeline<'a>) -> Self {
        self.pipeline = pipeline;
        self
    }

    /// Run `query` with comments, current patch set and commit message, then the pipeline.
    pub fn get_changes(&self, query: &str) -> CoreResult<Vec<AnnotatedChange>> {
        let changes = self.client.query(query, &QueryOptions::full())?;
        let fetched = changes.len();

        let annotated = self
            .pipeline
            .run(changes.into_iter().map(AnnotatedChange::from).collect())?;

        info!(fetched, kept = annotated.len(), "pipeline finished");
        Ok(annotated)
    }
}
