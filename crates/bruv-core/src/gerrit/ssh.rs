//! Gerrit queries over the system `ssh` client.
//!
//! Authentication is left to ssh and ssh-agent. bruv only decides whether
//! to hand ssh an explicit key file or rely on a key the agent already holds.

use std::env;
use std::path::{Path, PathBuf};
use std::process::Command;

use tracing::{debug, info};

use crate::config::Config;
use crate::core::{CoreError, CoreResult};

use super::{parse_query_output, Change, GerritClient, QueryOptions};

/// How ssh should authenticate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SshIdentity {
    /// No key configured; ssh picks from its own configuration.
    Default,
    /// The configured key is already loaded in ssh-agent.
    Agent { key: PathBuf },
    /// Pass the key file with `-i`.
    KeyFile(PathBuf),
}

/// Resolve the configured private key, preferring a matching agent key.
///
/// `None` leaves key selection to ssh.
pub fn resolve_identity(key: Option<&Path>) -> CoreResult<SshIdentity> {
    let Some(key) = key else {
        return Ok(SshIdentity::Default);
    };

    if agent_has_key(key) {
        debug!(key = %key.display(), "using key loaded in ssh-agent");
        return Ok(SshIdentity::Agent {
            key: key.to_path_buf(),
        });
    }

    if key.is_file() {
        return Ok(SshIdentity::KeyFile(key.to_path_buf()));
    }

    Err(CoreError::config(
        key.display().to_string(),
        "private key file not found and not loaded in ssh-agent",
    ))
}

fn agent_has_key(key: &Path) -> bool {
    if env::var_os("SSH_AUTH_SOCK").is_none() {
        return false;
    }

    let Ok(output) = Command::new("ssh-add").arg("-l").output() else {
        return false;
    };
    if !output.status.success() {
        return false;
    }

    agent_listing_contains(&String::from_utf8_lossy(&output.stdout), key)
}

/// Whether `ssh-add -l` output lists a key whose comment is `key`.
///
/// Lines look like `2048 SHA256:abc... /home/me/.ssh/id_rsa (RSA)`.
fn agent_listing_contains(listing: &str, key: &Path) -> bool {
    listing
        .lines()
        .filter_map(|line| {
            let mut parts = line.splitn(3, ' ');
            parts.next()?;
            parts.next()?;
            let rest = parts.next()?;
            Some(rest.rsplit_once(" (").map_or(rest, |(comment, _)| comment))
        })
        .any(|comment| Path::new(comment) == key)
}

/// Quote `value` for the remote shell that runs `gerrit query`.
fn shell_quote(value: &str) -> String {
    format!("'{}'", value.replace('\'', r"'\''"))
}

/// Gerrit client that shells out to `ssh <host> gerrit query`.
///
/// The ssh identity is resolved on each query, so building a client never
/// touches the key file or the agent.
#[derive(Debug, Clone)]
pub struct SshGerritClient {
    host: String,
    port: u16,
    username: String,
    key: Option<PathBuf>,
    program: String,
}

impl SshGerritClient {
    #[must_use]
    pub fn new(config: &Config) -> Self {
        Self {
            host: config.host.clone(),
            port: config.port,
            username: config.username.clone(),
            key: config.key_path(),
            program: "ssh".to_string(),
        }
    }

    /// Arguments passed to ssh for `query`.
    fn ssh_args(&self, identity: &SshIdentity, query: &str, options: &QueryOptions) -> Vec<String> {
        let mut args = vec![
            "-p".to_string(),
            self.port.to_string(),
            "-o".to_string(),
            "BatchMode=yes".to_string(),
        ];

        if let SshIdentity::KeyFile(key) = identity {
            args.push("-i".to_string());
            args.push(key.display().to_string());
            args.push("-o".to_string());
            args.push("IdentitiesOnly=yes".to_string());
        }

        args.push(format!("{}@{}", self.username, self.host));
        args.push("gerrit".to_string());
        args.push("query".to_string());
        args.push("--format=JSON".to_string());
        args.extend(options.flags().into_iter().map(String::from));
        args.push("--".to_string());
        args.push(shell_quote(query));
        args
    }
}

impl GerritClient for SshGerritClient {
    fn query(&self, query: &str, options: &QueryOptions) -> CoreResult<Vec<Change>> {
        let identity = resolve_identity(self.key.as_deref())?;
        info!(host = %self.host, query, "querying gerrit");

        let output = Command::new(&self.program)
            .args(self.ssh_args(&identity, query, options))
            .output()
            .map_err(|e| {
                if let Err(which_err) = which::which(&self.program) {
                    CoreError::query(format!(
                        "{} command not found. Please install OpenSSH: {which_err}",
                        self.program
                    ))
                } else {
                    CoreError::query(format!("Failed to execute {}: {e}", self.program))
                }
            })?;

        let stdout = String::from_utf8_lossy(&output.stdout);

        if !output.status.success() {
            // Gerrit reports query syntax errors as a JSON row; prefer that message.
            parse_query_output(&stdout)?;
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(CoreError::query(format!(
                "ssh exited with {}: {}",
                output.status,
                stderr.trim()
            )));
        }

        let changes = parse_query_output(&stdout)?;
        info!(count = changes.len(), "gerrit returned changes");
        Ok(changes)
    }
}
