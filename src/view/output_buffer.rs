//! Scrollable, searchable buffer over one command's output
//!
//! Raw bytes go through an [`AnsiRenderer`]; the buffer keeps the styled
//! lines for drawing and the plain text of each line for search. The line
//! still being written (no newline yet) is shown as the last line and
//! replaced when more bytes arrive.

use crate::primitives::ansi::{line_text, AnsiRenderer, StyledLine, StyledSpan};

/// Scrollback cap used when none is configured
pub const DEFAULT_MAX_LINES: usize = 2000;

const DEFAULT_PAGE_HEIGHT: usize = 20;

#[derive(Debug, Clone, PartialEq, Eq)]
struct SearchState {
    pattern: String,
    /// (line, char column), document order
    matches: Vec<(usize, usize)>,
    active: Option<usize>,
}

#[derive(Debug, Clone)]
pub struct OutputBuffer {
    raw: Vec<u8>,
    renderer: AnsiRenderer,
    lines: Vec<StyledLine>,
    plain: Vec<String>,
    /// Last entry of `lines` is the renderer's unterminated line
    partial_open: bool,
    scroll_offset: usize,
    page_height: usize,
    max_lines: usize,
    search: Option<SearchState>,
}

impl Default for OutputBuffer {
    fn default() -> Self {
        Self::new()
    }
}

impl OutputBuffer {
    pub fn new() -> Self {
        Self::with_max_lines(DEFAULT_MAX_LINES)
    }

    pub fn with_max_lines(max_lines: usize) -> Self {
        Self {
            raw: Vec::new(),
            renderer: AnsiRenderer::new(),
            lines: Vec::new(),
            plain: Vec::new(),
            partial_open: false,
            scroll_offset: 0,
            page_height: DEFAULT_PAGE_HEIGHT,
            max_lines: max_lines.max(1),
            search: None,
        }
    }

    /// Append raw output bytes.
    pub fn append(&mut self, bytes: &[u8]) {
        if bytes.is_empty() {
            return;
        }
        self.raw.extend_from_slice(bytes);

        if self.partial_open {
            self.lines.pop();
            self.plain.pop();
            self.partial_open = false;
        }
        for line in self.renderer.feed(bytes) {
            self.push_line(line);
        }
        if self.renderer.has_partial_line() {
            self.push_line(self.renderer.partial_line());
            self.partial_open = true;
        }
        self.after_mutation();
    }

    /// Append a synthetic, unstyled line (headers, markers, messages).
    ///
    /// An unterminated output line is ended first.
    pub fn append_line(&mut self, text: &str) {
        if self.partial_open {
            self.append(b"\n");
        }
        let line = if text.is_empty() {
            Vec::new()
        } else {
            vec![StyledSpan::plain(text)]
        };
        self.push_line(line);
        self.after_mutation();
    }

    fn push_line(&mut self, line: StyledLine) {
        self.plain.push(line_text(&line));
        self.lines.push(line);
    }

    fn after_mutation(&mut self) {
        let dropped = self.apply_cap();
        self.scroll_offset = self.scroll_offset.saturating_sub(dropped);
        self.refresh_search(dropped);
        self.clamp_scroll();
    }

    /// Drop the oldest lines beyond the cap; returns how many went.
    fn apply_cap(&mut self) -> usize {
        let excess = self.lines.len().saturating_sub(self.max_lines);
        if excess > 0 {
            self.lines.drain(..excess);
            self.plain.drain(..excess);
            tracing::trace!("Dropped {} lines of scrollback", excess);
        }
        excess
    }

    /// Recompute matches after the text changed, keeping the active match
    /// where it was if it still exists. Scroll is not moved.
    fn refresh_search(&mut self, dropped: usize) {
        let Some(search) = self.search.take() else {
            return;
        };
        let previous = search
            .active
            .and_then(|i| search.matches.get(i).copied())
            .and_then(|(line, col)| line.checked_sub(dropped).map(|line| (line, col)));
        let matches = find_matches(&self.plain, &search.pattern);
        let active = match previous {
            _ if matches.is_empty() => None,
            Some(pos) => matches
                .iter()
                .position(|&m| m >= pos)
                .or(Some(matches.len() - 1)),
            None => Some(0),
        };
        self.search = Some(SearchState {
            pattern: search.pattern,
            matches,
            active,
        });
    }

    fn max_scroll(&self) -> usize {
        self.lines.len().saturating_sub(self.page_height)
    }

    fn clamp_scroll(&mut self) {
        self.scroll_offset = self.scroll_offset.min(self.max_scroll());
    }

    /// Rows available for output; at least 1.
    pub fn set_page_height(&mut self, rows: usize) {
        self.page_height = rows.max(1);
        self.clamp_scroll();
    }

    pub fn page_height(&self) -> usize {
        self.page_height
    }

    pub fn page_down(&mut self) {
        self.scroll_offset = (self.scroll_offset + self.page_height).min(self.max_scroll());
    }

    pub fn page_up(&mut self) {
        self.scroll_offset = self.scroll_offset.saturating_sub(self.page_height);
    }

    pub fn scroll_to_top(&mut self) {
        self.scroll_offset = 0;
    }

    pub fn scroll_to_bottom(&mut self) {
        self.scroll_offset = self.max_scroll();
    }

    /// Scroll by `delta` lines; negative scrolls up.
    pub fn scroll_by(&mut self, delta: isize) {
        self.scroll_offset = self
            .scroll_offset
            .saturating_add_signed(delta)
            .min(self.max_scroll());
    }

    /// Start a search for `pattern` (literal, case-sensitive).
    pub fn search(&mut self, pattern: &str) {
        if pattern.is_empty() {
            self.search = None;
            return;
        }
        let matches = find_matches(&self.plain, pattern);
        let active = if matches.is_empty() {
            None
        } else {
            Some(
                matches
                    .iter()
                    .position(|&(line, _)| line >= self.scroll_offset)
                    .unwrap_or(0),
            )
        };
        tracing::debug!("Search for {:?}: {} matches", pattern, matches.len());
        self.search = Some(SearchState {
            pattern: pattern.to_string(),
            matches,
            active,
        });
        self.reveal_active();
    }

    pub fn clear_search(&mut self) {
        self.search = None;
    }

    pub fn next_match(&mut self) {
        self.step_match(true);
    }

    pub fn prev_match(&mut self) {
        self.step_match(false);
    }

    fn step_match(&mut self, forward: bool) {
        let Some(search) = self.search.as_mut() else {
            return;
        };
        let count = search.matches.len();
        if count == 0 {
            return;
        }
        let current = search.active.unwrap_or(0);
        search.active = Some(if forward {
            (current + 1) % count
        } else {
            (current + count - 1) % count
        });
        self.reveal_active();
    }

    /// Scroll only as far as needed to put the active match's line on screen.
    fn reveal_active(&mut self) {
        let Some((line, _)) = self.active_match_position() else {
            return;
        };
        if line < self.scroll_offset {
            self.scroll_offset = line;
        } else if line >= self.scroll_offset + self.page_height {
            self.scroll_offset = line + 1 - self.page_height;
        }
        self.clamp_scroll();
    }

    /// Lines currently in the window
    pub fn visible_lines(&self) -> &[StyledLine] {
        let end = (self.scroll_offset + self.page_height).min(self.lines.len());
        &self.lines[self.scroll_offset.min(end)..end]
    }

    pub fn lines(&self) -> &[StyledLine] {
        &self.lines
    }

    pub fn plain_line(&self, index: usize) -> Option<&str> {
        self.plain.get(index).map(String::as_str)
    }

    pub fn raw(&self) -> &[u8] {
        &self.raw
    }

    pub fn scroll_offset(&self) -> usize {
        self.scroll_offset
    }

    pub fn total_lines(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    pub fn search_pattern(&self) -> Option<&str> {
        self.search.as_ref().map(|s| s.pattern.as_str())
    }

    pub fn matches(&self) -> &[(usize, usize)] {
        self.search.as_ref().map_or(&[], |s| s.matches.as_slice())
    }

    pub fn match_count(&self) -> usize {
        self.matches().len()
    }

    /// Index of the active match
    pub fn active_match(&self) -> Option<usize> {
        self.search.as_ref().and_then(|s| s.active)
    }

    /// (line, char column) of the active match
    pub fn active_match_position(&self) -> Option<(usize, usize)> {
        let search = self.search.as_ref()?;
        search.active.and_then(|i| search.matches.get(i).copied())
    }
}

/// All occurrences of `pattern`, overlapping ones included.
fn find_matches(lines: &[String], pattern: &str) -> Vec<(usize, usize)> {
    if pattern.is_empty() {
        return Vec::new();
    }
    let mut matches = Vec::new();
    for (line_idx, line) in lines.iter().enumerate() {
        if !line.contains(pattern) {
            continue;
        }
        for (col, (byte_idx, _)) in line.char_indices().enumerate() {
            if line[byte_idx..].starts_with(pattern) {
                matches.push((line_idx, col));
            }
        }
    }
    matches
}
