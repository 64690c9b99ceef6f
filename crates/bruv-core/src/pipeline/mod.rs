//! Change annotation and filtering pipeline.
//!
//! A [`Pipeline`] is an ordered list of named steps built with
//! [`PipelineBuilder`]. Mappers rewrite each [`AnnotatedChange`] in place;
//! filters drop changes. Steps run in declared order over the whole list.
//!
//! # Default order
//!
//! | step | reads | writes |
//! |---|---|---|
//! | `strip_bot_comments` | comments | comments |
//! | `last_checked` | comments, current patch set | `last_checked_patch_set`, `change_since_last_comment`, `diff_url` |
//! | `read_state` | store, `lastUpdated` | `is_read`, `last_read` |
//! | `headers` | commit message | `headers` |
//! | `related_bugs` | `headers` | `related_bugs` |
//! | `blueprint` | `headers` | `is_blueprint` |
//! | `bug_base_url` | project | `bug_base_url` |
//! | filter `changed_since_last_comment` | `change_since_last_comment` | |
//! | filter `unread` | `is_read` | |
//!
//! Every mapper runs for every change; none short-circuits the rest.

pub mod steps;

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::{Serialize, Serializer};
use tracing::debug;

use crate::config::Config;
use crate::core::CoreResult;
use crate::filter::FilterExpr;
use crate::gerrit::Change;
use crate::store::ReadStateStore;

/// A change plus everything the pipeline derives about it.
///
/// Serializes as the raw Gerrit fields followed by the derived ones.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AnnotatedChange {
    #[serde(flatten)]
    pub change: Change,
    /// `Key: value` trailers from the commit message, in order.
    pub headers: Vec<(String, String)>,
    pub related_bugs: BTreeSet<String>,
    pub is_blueprint: bool,
    /// Patch set I last commented on. Serialized as `-1` when never checked.
    #[serde(serialize_with = "serialize_last_checked")]
    pub last_checked_patch_set: Option<u32>,
    pub change_since_last_comment: bool,
    pub diff_url: String,
    pub is_read: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_read: Option<DateTime<Utc>>,
    pub bug_base_url: String,
}

impl From<Change> for AnnotatedChange {
    fn from(change: Change) -> Self {
        Self {
            diff_url: change.url.clone(),
            change,
            headers: Vec::new(),
            related_bugs: BTreeSet::new(),
            is_blueprint: false,
            last_checked_patch_set: None,
            change_since_last_comment: true,
            is_read: false,
            last_read: None,
            bug_base_url: String::new(),
        }
    }
}

#[allow(clippy::ref_option)]
fn serialize_last_checked<S: Serializer>(value: &Option<u32>, serializer: S) -> Result<S::Ok, S::Error> {
    match value {
        Some(number) => serializer.serialize_i64(i64::from(*number)),
        None => serializer.serialize_i64(-1),
    }
}

type MapFn<'a> = Box<dyn Fn(&mut AnnotatedChange) -> CoreResult<()> + 'a>;
type FilterFn<'a> = Box<dyn Fn(&AnnotatedChange) -> bool + 'a>;

enum Step<'a> {
    Map { name: &'static str, apply: MapFn<'a> },
    Filter { name: &'static str, keep: FilterFn<'a> },
    Subflow(Pipeline<'a>),
}

impl Step<'_> {
    fn run(&self, mut changes: Vec<AnnotatedChange>) -> CoreResult<Vec<AnnotatedChange>> {
        match self {
            Self::Map { name, apply } => {
                debug!(step = *name, count = changes.len(), "map");
                for change in &mut changes {
                    apply(change)?;
                }
                Ok(changes)
            }
            Self::Filter { name, keep } => {
                let before = changes.len();
                changes.retain(|change| keep(change));
                debug!(step = *name, kept = changes.len(), dropped = before - changes.len(), "filter");
                Ok(changes)
            }
            Self::Subflow(pipeline) => pipeline.run(changes),
        }
    }
}

/// Accumulates steps in declared order.
#[derive(Default)]
pub struct PipelineBuilder<'a> {
    steps: Vec<Step<'a>>,
}

impl<'a> PipelineBuilder<'a> {
    #[must_use]
    pub fn new() -> Self {
        Self { steps: Vec::new() }
    }

    /// Append a mapping step.
    #[must_use]
    pub fn add_mapper<F>(mut self, name: &'static str, apply: F) -> Self
    where
        F: Fn(&mut AnnotatedChange) -> CoreResult<()> + 'a,
    {
        self.steps.push(Step::Map {
            name,
            apply: Box::new(apply),
        });
        self
    }

    /// Append a filtering step. Changes for which `keep` is false are dropped.
    #[must_use]
    pub fn add_filter<F>(mut self, name: &'static str, keep: F) -> Self
    where
        F: Fn(&AnnotatedChange) -> bool + 'a,
    {
        self.steps.push(Step::Filter {
            name,
            keep: Box::new(keep),
        });
        self
    }

    /// Append every step of another pipeline.
    #[must_use]
    pub fn add_subflow(mut self, pipeline: Pipeline<'a>) -> Self {
        self.steps.push(Step::Subflow(pipeline));
        self
    }

    #[must_use]
    pub fn build(self) -> Pipeline<'a> {
        Pipeline { steps: self.steps }
    }
}

/// An ordered, immutable list of steps.
#[derive(Default)]
pub struct Pipeline<'a> {
    steps: Vec<Step<'a>>,
}

impl Pipeline<'_> {
    /// A pipeline that passes changes through untouched.
    #[must_use]
    pub fn identity() -> Self {
        Self { steps: Vec::new() }
    }

    /// Run every step in order.
    pub fn run(&self, changes: Vec<AnnotatedChange>) -> CoreResult<Vec<AnnotatedChange>> {
        self.steps
            .iter()
            .try_fold(changes, |changes, step| step.run(changes))
    }

    /// Step names in execution order, subflows flattened. Filters are prefixed `filter:`.
    #[must_use]
    pub fn step_names(&self) -> Vec<String> {
        let mut names = Vec::new();
        for step in &self.steps {
            match step {
                Step::Map { name, .. } => names.push((*name).to_string()),
                Step::Filter { name, .. } => names.push(format!("filter:{name}")),
                Step::Subflow(pipeline) => names.extend(pipeline.step_names()),
            }
        }
        names
    }
}

/// Knobs for [`triage_pipeline`].
#[derive(Debug, Clone, Default)]
pub struct PipelineOptions {
    /// Keep changes that are read or unchanged since my last review.
    pub show_all: bool,
    /// Drop changes I own.
    pub hide_mine: bool,
    /// Extra user filter, applied last.
    pub filter: Option<FilterExpr>,
}

/// The seven annotation steps, in dependency order.
#[must_use]
pub fn annotation_pipeline<'a>(config: &'a Config, store: &'a ReadStateStore) -> Pipeline<'a> {
    PipelineBuilder::new()
        .add_mapper("strip_bot_comments", move |change| {
            steps::strip_bot_comments(change, config);
            Ok(())
        })
        .add_mapper("last_checked", move |change| {
            steps::annotate_last_checked(change, config.self_identity(), &config.host);
            Ok(())
        })
        .add_mapper("read_state", move |change| {
            steps::annotate_read_state(change, store)
        })
        .add_mapper("headers", |change| {
            steps::annotate_headers(change);
            Ok(())
        })
        .add_mapper("related_bugs", |change| {
            steps::annotate_related_bugs(change);
            Ok(())
        })
        .add_mapper("blueprint", |change| {
            steps::annotate_blueprint(change);
            Ok(())
        })
        .add_mapper("bug_base_url", move |change| {
            steps::annotate_bug_base_url(change, config);
            Ok(())
        })
        .build()
}

/// Annotation followed by the filters selected in `options`.
#[must_use]
pub fn triage_pipeline<'a>(
    config: &'a Config,
    store: &'a ReadStateStore,
    options: &'a PipelineOptions,
) -> Pipeline<'a> {
    let mut builder = PipelineBuilder::new().add_subflow(annotation_pipeline(config, store));

    if !options.show_all {
        builder = builder
            .add_filter("changed_since_last_comment", steps::changed_since_last_comment)
            .add_filter("unread", steps::unread);
    }

    if options.hide_mine {
        builder = builder.add_filter("not_mine", move |change| {
            steps::not_mine(change, config.self_identity())
        });
    }

    if let Some(filter) = &options.filter {
        builder = builder.add_filter("expression", move |change| filter.matches(change));
    }

    builder.build()
}
