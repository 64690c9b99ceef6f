//! Persistent per-change read state.
//!
//! A small SQLite table mapping a change number to the last time the change
//! was read. The schema version lives in `PRAGMA user_version`. The store is
//! opened once per process and is not locked: bruv assumes a single process
//! touches it at a time.

use std::path::Path;

use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::core::{CoreError, CoreResult};

/// Current schema version.
pub const SCHEMA_VERSION: i64 = 1;

const SCHEMA_SQL: &str = "
CREATE TABLE IF NOT EXISTS read_state (
    number     INTEGER PRIMARY KEY,
    last_read  TEXT NOT NULL,
    updated_at TEXT NOT NULL
);
";

/// Read state of one change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReadStateRecord {
    pub number: u64,
    /// Last time the change was read. [`DateTime::UNIX_EPOCH`] means never.
    pub last_read: DateTime<Utc>,
}

impl ReadStateRecord {
    #[must_use]
    pub const fn new(number: u64, last_read: DateTime<Utc>) -> Self {
        Self { number, last_read }
    }

    /// Whether a change last updated at `last_updated` counts as read.
    ///
    /// Equal timestamps count as unread.
    #[must_use]
    pub fn covers(&self, last_updated: DateTime<Utc>) -> bool {
        self.last_read > last_updated
    }
}

/// Canonicalize a change number given as text.
pub fn parse_change_number(input: &str) -> CoreResult<u64> {
    input
        .trim()
        .parse()
        .map_err(|_| CoreError::InvalidChangeNumber {
            input: input.to_string(),
        })
}

/// SQLite-backed read-state store.
pub struct ReadStateStore {
    conn: Connection,
}

impl ReadStateStore {
    /// Open or create the store at the given path.
    ///
    /// Creates parent directories if they don't exist.
    pub fn open(path: &Path) -> CoreResult<Self> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                std::fs::create_dir_all(parent).map_err(|e| CoreError::StoreCorrupt {
                    detail: format!("cannot create {}: {e}", parent.display()),
                })?;
            }
        }

        debug!(path = %path.display(), "opening read-state store");
        let conn = Connection::open(path)?;
        Self::init(conn)
    }

    /// Create an in-memory store (for testing).
    pub fn open_in_memory() -> CoreResult<Self> {
        Self::init(Connection::open_in_memory()?)
    }

    fn init(conn: Connection) -> CoreResult<Self> {
        let version: i64 = conn.query_row("PRAGMA user_version", [], |row| row.get(0))?;
        if version > SCHEMA_VERSION {
            return Err(CoreError::StoreCorrupt {
                detail: format!(
                    "schema version {version} is newer than supported version {SCHEMA_VERSION}"
                ),
            });
        }

        conn.execute_batch(SCHEMA_SQL)?;
        if version < SCHEMA_VERSION {
            conn.execute_batch(&format!("PRAGMA user_version = {SCHEMA_VERSION};"))?;
        }

        Ok(Self { conn })
    }

    /// Get the record for a change, if any.
    pub fn get(&self, number: u64) -> CoreResult<Option<ReadStateRecord>> {
        let row: Option<(i64, String)> = self
            .conn
            .query_row(
                "SELECT number, last_read FROM read_state WHERE number = ?",
                params![to_key(number)?],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .optional()?;

        row.map(decode_row).transpose()
    }

    /// Insert or replace the record for `number`.
    ///
    /// The record's own `number` is overwritten with `number` so it always
    /// round-trips with its key.
    pub fn set(&self, number: u64, mut record: ReadStateRecord) -> CoreResult<ReadStateRecord> {
        record.number = number;
        let now = Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true);
        self.conn.execute(
            "INSERT INTO read_state (number, last_read, updated_at) VALUES (?1, ?2, ?3)
             ON CONFLICT(number) DO UPDATE SET last_read = excluded.last_read,
                                               updated_at = excluded.updated_at",
            params![to_key(number)?, encode_time(record.last_read), now],
        )?;
        Ok(record)
    }

    /// All records, ordered by change number.
    pub fn get_all(&self) -> CoreResult<Vec<ReadStateRecord>> {
        let mut stmt = self
            .conn
            .prepare("SELECT number, last_read FROM read_state ORDER BY number")?;
        let rows = stmt
            .query_map([], |row| Ok((row.get(0)?, row.get(1)?)))?
            .collect::<Result<Vec<(i64, String)>, _>>()?;

        rows.into_iter().map(decode_row).collect()
    }

    /// Mark a change read as of now.
    pub fn mark_read(&self, number: u64) -> CoreResult<ReadStateRecord> {
        self.set(number, ReadStateRecord::new(number, Utc::now()))
    }

    /// Mark a change unread by resetting its last-read time to the epoch.
    pub fn mark_unread(&self, number: u64) -> CoreResult<ReadStateRecord> {
        self.set(number, ReadStateRecord::new(number, DateTime::<Utc>::UNIX_EPOCH))
    }
}

fn to_key(number: u64) -> CoreResult<i64> {
    i64::try_from(number).map_err(|_| CoreError::InvalidChangeNumber {
        input: number.to_string(),
    })
}

fn encode_time(time: DateTime<Utc>) -> String {
    time.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn decode_row((number, last_read): (i64, String)) -> CoreResult<ReadStateRecord> {
    let number = u64::try_from(number).map_err(|_| CoreError::StoreCorrupt {
        detail: format!("negative change number {number}"),
    })?;
    let last_read = DateTime::parse_from_rfc3339(&last_read)
        .map_err(|e| CoreError::StoreCorrupt {
            detail: format!("bad timestamp '{last_read}' for change {number}: {e}"),
        })?
        .with_timezone(&Utc);
    Ok(ReadStateRecord { number, last_read })
}
