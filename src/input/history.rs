//! Session command history
//!
//! Entries are kept oldest first. Recall hands out copies, so editing a
//! recalled line never changes what was stored. The line being typed when
//! recall started is stashed and comes back after the newest entry.

#[derive(Debug, Clone, Default)]
pub struct CommandHistory {
    entries: Vec<String>,
    /// Entry being shown; `None` means the fresh line
    cursor: Option<usize>,
    stash: Option<String>,
}

impl CommandHistory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a submitted command. Duplicates are kept.
    pub fn push(&mut self, entry: impl Into<String>) {
        self.entries.push(entry.into());
        self.reset_cursor();
    }

    /// Return to the fresh line and forget the stash
    pub fn reset_cursor(&mut self) {
        self.cursor = None;
        self.stash = None;
    }

    pub fn entries(&self) -> &[String] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn is_browsing(&self) -> bool {
        self.cursor.is_some()
    }

    /// Step to the previous (older) entry.
    ///
    /// `current` is the text in the prompt; it is stashed when leaving the
    /// fresh line. Returns the text to show, or `None` at the oldest entry.
    pub fn prev(&mut self, current: &str) -> Option<String> {
        let target = match self.cursor {
            None if self.entries.is_empty() => return None,
            None => {
                self.stash = Some(current.to_string());
                self.entries.len() - 1
            }
            Some(0) => return None,
            Some(idx) => idx - 1,
        };
        self.cursor = Some(target);
        Some(self.entries[target].clone())
    }

    /// Step to the next (newer) entry, or back to the stashed fresh line
    /// after the newest one. Returns `None` when already on the fresh line.
    pub fn next(&mut self) -> Option<String> {
        let idx = self.cursor?;
        if idx + 1 < self.entries.len() {
            self.cursor = Some(idx + 1);
            Some(self.entries[idx + 1].clone())
        } else {
            self.cursor = None;
            Some(self.stash.take().unwrap_or_default())
        }
    }
}
