//! Single-line text editing state
//!
//! `LineEdit` backs the command prompt and the search prompt. The cursor is
//! a byte offset that always sits on a char boundary.

/// Single-line editing state
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LineEdit {
    text: String,
    /// Cursor position (in bytes)
    cursor: usize,
}

impl LineEdit {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn value(&self) -> &str {
        &self.text
    }

    /// Cursor position (in bytes)
    pub fn cursor(&self) -> usize {
        self.cursor
    }

    /// Cursor position in characters, for drawing
    pub fn cursor_chars(&self) -> usize {
        self.text[..self.cursor].chars().count()
    }

    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }

    /// Replace the text; the cursor goes to the end.
    ///
    /// Only the first line of `text` is kept.
    pub fn set_value(&mut self, text: &str) {
        self.text = text.lines().next().unwrap_or("").to_string();
        self.cursor = self.text.len();
    }

    pub fn clear(&mut self) {
        self.text.clear();
        self.cursor = 0;
    }

    // ========================================================================
    // Cursor movement
    // ========================================================================

    pub fn move_left(&mut self) {
        self.cursor = self.prev_boundary();
    }

    pub fn move_right(&mut self) {
        self.cursor = self.next_boundary();
    }

    pub fn move_home(&mut self) {
        self.cursor = 0;
    }

    pub fn move_end(&mut self) {
        self.cursor = self.text.len();
    }

    /// Move to the start of the previous word
    pub fn move_word_left(&mut self) {
        self.cursor = self.word_start_before();
    }

    /// Move past the end of the next word
    pub fn move_word_right(&mut self) {
        let rest = &self.text[self.cursor..];
        let skipped_space = rest.len() - rest.trim_start().len();
        let word = rest[skipped_space..]
            .find(char::is_whitespace)
            .unwrap_or(rest.len() - skipped_space);
        self.cursor += skipped_space + word;
    }

    fn prev_boundary(&self) -> usize {
        self.text[..self.cursor]
            .char_indices()
            .next_back()
            .map_or(0, |(idx, _)| idx)
    }

    fn next_boundary(&self) -> usize {
        self.text[self.cursor..]
            .chars()
            .next()
            .map_or(self.cursor, |c| self.cursor + c.len_utf8())
    }

    fn word_start_before(&self) -> usize {
        let before = self.text[..self.cursor].trim_end();
        before
            .char_indices()
            .rev()
            .find(|(_, c)| c.is_whitespace())
            .map_or(0, |(idx, c)| idx + c.len_utf8())
    }

    // ========================================================================
    // Editing
    // ========================================================================

    /// Insert a character at the cursor. Newlines are ignored.
    pub fn insert_char(&mut self, c: char) {
        if c == '\n' || c == '\r' {
            return;
        }
        self.text.insert(self.cursor, c);
        self.cursor += c.len_utf8();
    }

    /// Insert text at the cursor (pasted text); line breaks become spaces
    pub fn insert_str(&mut self, text: &str) {
        for c in text.chars() {
            match c {
                '\r' => {}
                '\n' => self.insert_char(' '),
                c => self.insert_char(c),
            }
        }
    }

    /// Delete the character before the cursor
    pub fn backspace(&mut self) {
        if self.cursor == 0 {
            return;
        }
        let start = self.prev_boundary();
        self.text.replace_range(start..self.cursor, "");
        self.cursor = start;
    }

    /// Delete the character at the cursor
    pub fn delete(&mut self) {
        let end = self.next_boundary();
        if end > self.cursor {
            self.text.replace_range(self.cursor..end, "");
        }
    }

    /// Delete everything before the cursor (Ctrl+U)
    pub fn kill_to_start(&mut self) {
        self.text.replace_range(..self.cursor, "");
        self.cursor = 0;
    }

    /// Delete everything from the cursor on (Ctrl+K)
    pub fn kill_to_end(&mut self) {
        self.text.truncate(self.cursor);
    }

    /// Delete the word before the cursor (Ctrl+W)
    pub fn delete_word_backward(&mut self) {
        let start = self.word_start_before();
        self.text.replace_range(start..self.cursor, "");
        self.cursor = start;
    }
}
