//! Remote execution over a remote-shell transport
//!
//! Nothing here keeps a connection open. Every action is one process:
//! - `quoting`: builds escaped command lines
//! - `editor`: resolves the editor for remote editing
//! - `runner`: spawns the remote shell and captures its output
//! - `listing`: directory listings for the browser

pub mod editor;
pub mod listing;
pub mod quoting;
pub mod runner;

pub use editor::{resolve_editor, EditorSettings, EditorSpec, EnvSettings};
pub use listing::{list_directory, list_directory_within, Listing, ListingError, RemoteEntry};
pub use quoting::{build_command, quote, BuildError, CommandLine};
pub use runner::{CapturedOutput, OutputStream, RemoteShell, RunEvent, RunningCommand, SpawnError};

/// The addressed remote host and its tracked working directory
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteTarget {
    host: String,
    cwd: String,
}

impl RemoteTarget {
    pub fn new(host: impl Into<String>, start_path: &str) -> Self {
        Self {
            host: host.into(),
            cwd: normalize_start_path(start_path),
        }
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn cwd(&self) -> &str {
        &self.cwd
    }

    /// Record the directory a successful navigation resolved to.
    ///
    /// Empty paths are ignored so the directory is never empty.
    pub fn set_cwd(&mut self, cwd: impl Into<String>) {
        let cwd = cwd.into();
        if cwd.is_empty() {
            tracing::warn!("Ignoring empty remote directory");
            return;
        }
        tracing::info!("Remote directory is now {}", cwd);
        self.cwd = cwd;
    }

    /// Path of `name` inside the current directory
    pub fn child_path(&self, name: &str) -> String {
        if self.cwd.ends_with('/') {
            format!("{}{}", self.cwd, name)
        } else {
            format!("{}/{}", self.cwd, name)
        }
    }

    /// Path of the parent of the current directory
    pub fn parent_path(&self) -> String {
        parent_path(&self.cwd)
    }
}

/// Start paths are sent to the remote as given; an empty one means the
/// login directory.
fn normalize_start_path(path: &str) -> String {
    let trimmed = path.trim();
    if trimmed.is_empty() {
        return ".".to_string();
    }
    let collapsed = trimmed.trim_end_matches('/');
    if collapsed.is_empty() {
        "/".to_string()
    } else {
        collapsed.to_string()
    }
}

fn parent_path(path: &str) -> String {
    let trimmed = path.trim_end_matches('/');
    match trimmed.rfind('/') {
        Some(0) => "/".to_string(),
        Some(idx) => trimmed[..idx].to_string(),
        // Relative single component, e.g. the "." start path
        None if trimmed.is_empty() => "/".to_string(),
        None => format!("{trimmed}/.."),
    }
}
