//! Remote directory listing
//!
//! A listing is one remote invocation of `cd -- <dir> && pwd -P && ls -1Ap`.
//! The first output line is the resolved directory; the rest are entries,
//! with directories marked by a trailing `/`.

use std::fmt;
use std::time::Duration;

use super::quoting::{build_listing_command, BuildError};
use super::runner::{CapturedOutput, RemoteShell, SpawnError};

/// How long a listing may take unless configured otherwise
pub const DEFAULT_LISTING_TIMEOUT: Duration = Duration::from_secs(30);

/// One entry of a remote directory
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteEntry {
    pub name: String,
    pub is_dir: bool,
}

impl RemoteEntry {
    pub fn parent() -> Self {
        Self {
            name: "..".to_string(),
            is_dir: true,
        }
    }

    pub fn is_parent(&self) -> bool {
        self.name == ".."
    }
}

/// A successful listing
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Listing {
    /// Physical path the remote resolved the request to
    pub cwd: String,
    /// Entries, `..` first
    pub entries: Vec<RemoteEntry>,
}

#[derive(Debug)]
pub enum ListingError {
    Build(BuildError),
    Spawn(SpawnError),
    /// The remote command failed; carries its stderr
    Remote(String),
    EmptyResponse,
    /// No answer within the time limit; the transport was killed
    TimedOut(Duration),
}

impl fmt::Display for ListingError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ListingError::Build(e) => write!(f, "Error: {e}"),
            ListingError::Spawn(e) => write!(f, "Error: {e}"),
            ListingError::Remote(msg) => write!(f, "Error: {msg}"),
            ListingError::EmptyResponse => {
                write!(f, "Error: empty response while listing directory")
            }
            ListingError::TimedOut(limit) => {
                write!(f, "Error: listing timed out after {limit:?}")
            }
        }
    }
}

impl std::error::Error for ListingError {}

impl From<BuildError> for ListingError {
    fn from(e: BuildError) -> Self {
        ListingError::Build(e)
    }
}

impl From<SpawnError> for ListingError {
    fn from(e: SpawnError) -> Self {
        ListingError::Spawn(e)
    }
}

/// List `dir` on the remote, giving up after [`DEFAULT_LISTING_TIMEOUT`].
pub async fn list_directory(shell: &RemoteShell, dir: &str) -> Result<Listing, ListingError> {
    list_directory_within(shell, dir, DEFAULT_LISTING_TIMEOUT).await
}

/// List `dir` on the remote, giving up after `limit`.
///
/// On timeout the transport process is dropped, which kills it.
pub async fn list_directory_within(
    shell: &RemoteShell,
    dir: &str,
    limit: Duration,
) -> Result<Listing, ListingError> {
    let line = build_listing_command(dir)?;
    let output = match tokio::time::timeout(limit, shell.run(&line)).await {
        Ok(result) => result?,
        Err(_) => {
            tracing::warn!("Listing {} timed out after {:?}", dir, limit);
            return Err(ListingError::TimedOut(limit));
        }
    };
    parse_listing(dir, &output)
}

/// Interpret the output of a listing command.
pub fn parse_listing(requested: &str, output: &CapturedOutput) -> Result<Listing, ListingError> {
    if !output.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        let stderr = stderr.trim();
        let message = if stderr.is_empty() {
            "failed to list directory".to_string()
        } else {
            stderr.to_string()
        };
        return Err(ListingError::Remote(message));
    }

    let stdout = String::from_utf8_lossy(&output.stdout);
    let mut lines = stdout.lines();
    let first = lines.next().ok_or(ListingError::EmptyResponse)?;
    let cwd = match first.trim() {
        "" => requested.to_string(),
        resolved => resolved.to_string(),
    };

    let mut entries = vec![RemoteEntry::parent()];
    entries.extend(lines.filter(|line| !line.is_empty()).map(|line| {
        match line.strip_suffix('/') {
            Some(name) => RemoteEntry {
                name: name.to_string(),
                is_dir: true,
            },
            None => RemoteEntry {
                name: line.to_string(),
                is_dir: false,
            },
        }
    }));

    Ok(Listing { cwd, entries })
}
