//! Directory browser state
//!
//! A single-column list of the entries of the current remote directory,
//! `..` first, with one selected row.

use ratatui::widgets::ListState;

use crate::services::remote::RemoteEntry;

/// Rows moved by PageUp/PageDown
pub const PAGE_STEP: usize = 10;

#[derive(Debug, Default)]
pub struct Browser {
    entries: Vec<RemoteEntry>,
    list_state: ListState,
}

impl Browser {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the entries after a listing; selection goes back to the top.
    pub fn set_entries(&mut self, entries: Vec<RemoteEntry>) {
        self.entries = entries;
        self.list_state = ListState::default();
        if !self.entries.is_empty() {
            self.list_state.select(Some(0));
        }
    }

    /// Replace the entries but keep the selection on the same name if it
    /// is still there (reload).
    pub fn refresh_entries(&mut self, entries: Vec<RemoteEntry>) {
        let previous = self.selected_entry().map(|e| e.name.clone());
        let offset = self.list_state.offset();
        self.set_entries(entries);
        if let Some(idx) = previous.and_then(|name| self.entries.iter().position(|e| e.name == name))
        {
            self.list_state = ListState::default()
                .with_offset(offset)
                .with_selected(Some(idx));
        }
    }

    pub fn entries(&self) -> &[RemoteEntry] {
        &self.entries
    }

    pub fn selected(&self) -> Option<usize> {
        self.list_state.selected()
    }

    pub fn selected_entry(&self) -> Option<&RemoteEntry> {
        self.selected().and_then(|idx| self.entries.get(idx))
    }

    pub fn list_state_mut(&mut self) -> &mut ListState {
        &mut self.list_state
    }

    pub fn move_by(&mut self, delta: isize) {
        if self.entries.is_empty() {
            return;
        }
        let last = self.entries.len() - 1;
        let current = self.selected().unwrap_or(0);
        let next = current.saturating_add_signed(delta).min(last);
        self.list_state.select(Some(next));
    }

    pub fn move_up(&mut self) {
        self.move_by(-1);
    }

    pub fn move_down(&mut self) {
        self.move_by(1);
    }

    pub fn page_up(&mut self) {
        self.move_by(-(PAGE_STEP as isize));
    }

    pub fn page_down(&mut self) {
        self.move_by(PAGE_STEP as isize);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entries(count: usize) -> Vec<RemoteEntry> {
        let mut entries = vec![RemoteEntry::parent()];
        entries.extend((0..count).map(|i| RemoteEntry {
            name: format!("file{i}"),
            is_dir: false,
        }));
        entries
    }

    #[test]
    fn test_selection_is_clamped() {
        let mut browser = Browser::new();
        browser.set_entries(entries(3));
        assert_eq!(browser.selected(), Some(0));
        browser.move_up();
        assert_eq!(browser.selected(), Some(0));
        browser.page_down();
        assert_eq!(browser.selected(), Some(3));
        browser.move_down();
        assert_eq!(browser.selected(), Some(3));
    }

    #[test]
    fn test_page_moves_by_ten() {
        let mut browser = Browser::new();
        browser.set_entries(entries(30));
        browser.page_down();
        browser.page_down();
        assert_eq!(browser.selected(), Some(20));
        browser.page_up();
        assert_eq!(browser.selected(), Some(10));
    }

    #[test]
    fn test_empty_browser() {
        let mut browser = Browser::new();
        browser.move_down();
        assert_eq!(browser.selected(), None);
        assert!(browser.selected_entry().is_none());
    }

    #[test]
    fn test_refresh_keeps_selection_by_name() {
        let mut browser = Browser::new();
        browser.set_entries(entries(5));
        browser.move_by(3);
        assert_eq!(browser.selected_entry().unwrap().name, "file2");

        let mut fewer = entries(5);
        fewer.remove(1);
        browser.refresh_entries(fewer);
        assert_eq!(browser.selected_entry().unwrap().name, "file2");
    }
}
