//! Configuration loading.
//!
//! bruv reads a single JSON file (default `~/.bruvrc`). Every key is
//! optional; missing keys fall back to the defaults in [`Config::default`].
//! The loaded [`Config`] is constructed once and passed by reference to the
//! fetcher, the pipeline and the store.

use std::collections::BTreeMap;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::core::{CoreError, CoreResult};

/// Environment variable overriding the configuration file location.
pub const CONFIG_ENV_VAR: &str = "BRUV_CONFIG";

/// Name of the configuration file in the home directory.
const CONFIG_FILE_NAME: &str = ".bruvrc";

/// Tracker used for projects without an entry in `bug_base_urls`.
pub const DEFAULT_BUG_BASE_URL: &str = "https://launchpad.net/bugs";

const DEFAULT_PRIVATE_KEY: &str = "~/.ssh/id_rsa";
const DEFAULT_HOST: &str = "review.openstack.org";
const DEFAULT_PORT: u16 = 29418;

/// User configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Private key path. An empty string leaves key selection to ssh.
    pub private_key: String,
    /// Gerrit account used to log in.
    pub username: String,
    /// Identity whose comments count as "reviewed by me". Defaults to `username`.
    pub self_username: Option<String>,
    pub host: String,
    pub port: u16,
    /// Query run when no saved query or literal query is given.
    pub query: String,
    /// Read-state database location.
    pub db_file: Option<PathBuf>,
    /// Per-project bug tracker base URLs.
    pub bug_base_urls: BTreeMap<String, String>,
    /// Accounts whose comments are stripped before annotation.
    pub bot_accounts: Vec<String>,
    /// Saved queries by name.
    pub queries: BTreeMap<String, String>,
    /// Saved query names shown by default.
    #[serde(rename = "default-queries")]
    pub default_queries: Vec<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            private_key: DEFAULT_PRIVATE_KEY.to_string(),
            username: env::var("USER").unwrap_or_default(),
            self_username: None,
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            query: String::new(),
            db_file: None,
            bug_base_urls: BTreeMap::new(),
            bot_accounts: vec!["jenkins".to_string()],
            queries: BTreeMap::new(),
            default_queries: Vec::new(),
        }
    }
}

impl Config {
    /// Resolve the configuration file path.
    ///
    /// Resolution order:
    /// 1. Explicit path (`--config`)
    /// 2. `BRUV_CONFIG` environment variable
    /// 3. `~/.bruvrc`
    pub fn resolve_path(explicit: Option<&Path>) -> CoreResult<PathBuf> {
        if let Some(path) = explicit {
            return Ok(path.to_path_buf());
        }

        if let Some(path) = env::var_os(CONFIG_ENV_VAR).filter(|p| !p.is_empty()) {
            return Ok(PathBuf::from(path));
        }

        dirs::home_dir()
            .map(|home| home.join(CONFIG_FILE_NAME))
            .ok_or_else(|| {
                CoreError::config(
                    CONFIG_FILE_NAME,
                    "cannot locate home directory; use --config or set BRUV_CONFIG",
                )
            })
    }

    /// Load and validate the configuration at `path`.
    pub fn load(path: &Path) -> CoreResult<Self> {
        let content = fs::read_to_string(path)
            .map_err(|e| CoreError::config(path.display().to_string(), e.to_string()))?;
        Self::from_json(&content, &path.display().to_string())
    }

    /// Parse and validate configuration JSON. `origin` is used in error messages.
    pub fn from_json(content: &str, origin: &str) -> CoreResult<Self> {
        let config: Self = serde_json::from_str(content)
            .map_err(|e| CoreError::config(origin, format!("invalid JSON: {e}")))?;
        config.validate(origin)?;
        Ok(config)
    }

    fn validate(&self, origin: &str) -> CoreResult<()> {
        if self.username.trim().is_empty() {
            return Err(CoreError::config(
                origin,
                "no username configured and $USER is not set",
            ));
        }
        if self.host.trim().is_empty() {
            return Err(CoreError::config(origin, "host must not be empty"));
        }
        if let Some(name) = self
            .default_queries
            .iter()
            .find(|name| !self.queries.contains_key(*name))
        {
            return Err(CoreError::config(
                origin,
                format!("default-queries names unknown saved query '{name}'"),
            ));
        }
        Ok(())
    }

    /// Identity whose comments mark a change as reviewed.
    #[must_use]
    pub fn self_identity(&self) -> &str {
        self.self_username.as_deref().unwrap_or(&self.username)
    }

    /// Expanded private key path, or `None` when ssh should choose.
    #[must_use]
    pub fn key_path(&self) -> Option<PathBuf> {
        let key = self.private_key.trim();
        if key.is_empty() {
            None
        } else {
            Some(expand_tilde(key))
        }
    }

    /// Location of the read-state database.
    #[must_use]
    pub fn store_path(&self) -> PathBuf {
        if let Some(path) = &self.db_file {
            return expand_tilde(&path.to_string_lossy());
        }
        dirs::data_dir().map_or_else(
            || PathBuf::from("bruv.db"),
            |dir| dir.join("bruv").join("read_state.db"),
        )
    }

    /// Bug tracker base URL for `project`.
    #[must_use]
    pub fn bug_base_url(&self, project: &str) -> &str {
        self.bug_base_urls
            .get(project)
            .map_or(DEFAULT_BUG_BASE_URL, String::as_str)
    }

    /// Look up a saved query by name.
    pub fn saved_query(&self, name: &str) -> CoreResult<&str> {
        self.queries
            .get(name)
            .map(String::as_str)
            .ok_or_else(|| CoreError::UnknownQuery {
                name: name.to_string(),
            })
    }

    /// Whether `username` is one of the configured bot accounts.
    #[must_use]
    pub fn is_bot(&self, username: &str) -> bool {
        self.bot_accounts.iter().any(|bot| bot == username)
    }
}

/// Expand a leading `~/` to the home directory.
#[must_use]
pub fn expand_tilde(path: &str) -> PathBuf {
    if path == "~" {
        if let Some(home) = dirs::home_dir() {
            return home;
        }
    }
    if let Some(rest) = path.strip_prefix("~/") {
        if let Some(home) = dirs::home_dir() {
            return home.join(rest);
        }
    }
    PathBuf::from(path)
}
