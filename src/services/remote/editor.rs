//! Editor resolution for remote editing.
//!
//! The editor comes from `VISUAL`, then `EDITOR`. The value is parsed as
//! shell words; anything that does not parse cleanly degrades to the
//! fallback editor rather than being interpolated raw.

use std::collections::HashMap;

/// Primary editor setting
pub const PRIMARY_SETTING: &str = "VISUAL";
/// Secondary editor setting, consulted when the primary is absent or empty
pub const SECONDARY_SETTING: &str = "EDITOR";
/// Editor used when neither setting yields a usable value
pub const FALLBACK_EDITOR: &str = "vi";

/// A resolved editor invocation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EditorSpec {
    pub program: String,
    pub args: Vec<String>,
}

impl EditorSpec {
    pub fn fallback() -> Self {
        Self::program(FALLBACK_EDITOR)
    }

    fn program(program: &str) -> Self {
        Self {
            program: program.to_string(),
            args: Vec::new(),
        }
    }
}

/// Source of named string settings
pub trait EditorSettings {
    fn get(&self, name: &str) -> Option<String>;
}

/// Reads settings from the process environment
#[derive(Debug, Default, Clone, Copy)]
pub struct EnvSettings;

impl EditorSettings for EnvSettings {
    fn get(&self, name: &str) -> Option<String> {
        std::env::var(name).ok()
    }
}

impl EditorSettings for HashMap<String, String> {
    fn get(&self, name: &str) -> Option<String> {
        HashMap::get(self, name).cloned()
    }
}

/// Resolve the editor with the default `vi` fallback.
pub fn resolve_editor(settings: &dyn EditorSettings) -> EditorSpec {
    resolve_editor_with_fallback(settings, FALLBACK_EDITOR)
}

/// Resolve the editor, falling back to `fallback` (no arguments).
pub fn resolve_editor_with_fallback(settings: &dyn EditorSettings, fallback: &str) -> EditorSpec {
    let raw = [PRIMARY_SETTING, SECONDARY_SETTING]
        .iter()
        .filter_map(|name| settings.get(name))
        .find(|value| !value.is_empty());

    let Some(raw) = raw else {
        return EditorSpec::program(fallback);
    };

    let tokens = match shlex::split(&raw) {
        Some(tokens) => tokens,
        None => {
            tracing::debug!("Editor setting {:?} does not parse, using {}", raw, fallback);
            return EditorSpec::program(fallback);
        }
    };

    let mut tokens = tokens.into_iter();
    match tokens.next() {
        Some(program) if !program.is_empty() => EditorSpec {
            program,
            args: tokens.collect(),
        },
        _ => EditorSpec::program(fallback),
    }
}
