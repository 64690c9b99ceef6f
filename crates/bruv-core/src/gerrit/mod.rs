//! Gerrit change records and the query client seam.
//!
//! Records mirror the JSON rows printed by `gerrit query --format=JSON`.
//! Gerrit has emitted change and patch set numbers both as JSON strings and
//! as integers across versions; both are accepted and canonicalized.

pub mod ssh;

use std::fmt::Display;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use tracing::warn;

use crate::core::{CoreError, CoreResult};

pub use ssh::{resolve_identity, SshGerritClient, SshIdentity};

/// A Gerrit account as embedded in changes and comments.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
}

impl Account {
    /// Whether this account has the given username.
    #[must_use]
    pub fn is(&self, username: &str) -> bool {
        self.username.as_deref() == Some(username)
    }
}

/// A review comment. Comments arrive in chronological order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Comment {
    #[serde(with = "chrono::serde::ts_seconds")]
    pub timestamp: DateTime<Utc>,
    #[serde(default)]
    pub reviewer: Account,
    #[serde(default)]
    pub message: String,
}

/// The current revision of a change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PatchSet {
    #[serde(deserialize_with = "number_or_string")]
    pub number: u32,
    #[serde(default)]
    pub revision: String,
    #[serde(default, rename = "ref")]
    pub git_ref: String,
}

/// A change as returned by Gerrit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Change {
    #[serde(deserialize_with = "number_or_string")]
    pub number: u64,
    /// Change-Id.
    #[serde(default)]
    pub id: String,
    pub project: String,
    #[serde(default)]
    pub branch: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub topic: Option<String>,
    #[serde(default)]
    pub subject: String,
    #[serde(default)]
    pub owner: Account,
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub open: bool,
    #[serde(default)]
    pub commit_message: String,
    #[serde(with = "chrono::serde::ts_seconds")]
    pub last_updated: DateTime<Utc>,
    #[serde(default)]
    pub comments: Vec<Comment>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_patch_set: Option<PatchSet>,
}

/// Detail requested alongside each change.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct QueryOptions {
    pub comments: bool,
    pub current_patch_set: bool,
    pub commit_message: bool,
}

impl QueryOptions {
    /// Everything the annotation pipeline needs.
    #[must_use]
    pub const fn full() -> Self {
        Self {
            comments: true,
            current_patch_set: true,
            commit_message: true,
        }
    }

    /// Flags for `gerrit query`.
    #[must_use]
    pub fn flags(&self) -> Vec<&'static str> {
        let mut flags = Vec::new();
        if self.comments {
            flags.push("--comments");
        }
        if self.current_patch_set {
            flags.push("--current-patch-set");
        }
        if self.commit_message {
            flags.push("--commit-message");
        }
        flags
    }
}

/// Something that can answer Gerrit queries.
///
/// Failures must surface as [`CoreError::Query`] with the server's message.
pub trait GerritClient {
    fn query(&self, query: &str, options: &QueryOptions) -> CoreResult<Vec<Change>>;
}

/// A single row of `gerrit query --format=JSON` output.
#[derive(Debug, Deserialize)]
struct RowKind {
    #[serde(rename = "type")]
    kind: Option<String>,
    message: Option<String>,
}

/// Parse `gerrit query --format=JSON` output into changes.
///
/// The trailing `stats` row is skipped. An `error` row turns the whole
/// query into a [`CoreError::Query`].
pub fn parse_query_output(output: &str) -> CoreResult<Vec<Change>> {
    let mut changes = Vec::new();

    for (index, line) in output.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        let value: serde_json::Value = serde_json::from_str(line).map_err(|e| {
            CoreError::query(format!("malformed output at line {}: {e}", index + 1))
        })?;

        let row = RowKind::deserialize(&value).map_err(|e| {
            CoreError::query(format!("malformed output at line {}: {e}", index + 1))
        })?;

        match row.kind.as_deref() {
            Some("stats") => {}
            Some("error") => {
                return Err(CoreError::query(
                    row.message.unwrap_or_else(|| "unknown error".to_string()),
                ));
            }
            Some(other) => {
                warn!(line = index + 1, kind = other, "skipping unexpected query row");
            }
            None => {
                let change = Change::deserialize(value).map_err(|e| {
                    CoreError::query(format!("malformed change at line {}: {e}", index + 1))
                })?;
                changes.push(change);
            }
        }
    }

    Ok(changes)
}

fn number_or_string<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: FromStr + Deserialize<'de>,
    T::Err: Display,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Lenient<T> {
        Number(T),
        Text(String),
    }

    match Lenient::<T>::deserialize(deserializer)? {
        Lenient::Number(n) => Ok(n),
        Lenient::Text(s) => s.trim().parse().map_err(serde::de::Error::custom),
    }
}
