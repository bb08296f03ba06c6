//! Command panel: prompt, running command and output pager
//!
//! The panel is a small state machine over [`PanelMode`]. A running command
//! is not a mode of its own: output can be paged and searched while it
//! streams in, and submission is refused until it has finished or been
//! cancelled.

use tokio::runtime::Handle;

use crate::input::history::CommandHistory;
use crate::input::line_edit::LineEdit;
use crate::services::remote::quoting::build_command;
use crate::services::remote::runner::{OutputStream, RemoteShell, RunEvent, RunningCommand};
use crate::services::remote::RemoteTarget;
use crate::view::output_buffer::{OutputBuffer, DEFAULT_MAX_LINES};

const STDERR_PREFIX: &[u8] = b"stderr: ";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PanelMode {
    Hidden,
    /// Typing a command
    Editing,
    /// Viewing output
    Paging,
    /// Typing a search pattern over the output
    Searching,
}

pub struct CommandPanel {
    mode: PanelMode,
    edit: LineEdit,
    search_edit: LineEdit,
    history: CommandHistory,
    output: OutputBuffer,
    running: Option<RunningCommand>,
    saw_output: bool,
    /// Stream whose last chunk ended mid-line, if any
    open_line: Option<OutputStream>,
    status: Option<String>,
    shell: RemoteShell,
    runtime: Handle,
    max_lines: usize,
}

impl CommandPanel {
    pub fn new(shell: RemoteShell, runtime: Handle) -> Self {
        Self::with_max_lines(shell, runtime, DEFAULT_MAX_LINES)
    }

    pub fn with_max_lines(shell: RemoteShell, runtime: Handle, max_lines: usize) -> Self {
        Self {
            mode: PanelMode::Hidden,
            edit: LineEdit::new(),
            search_edit: LineEdit::new(),
            history: CommandHistory::new(),
            output: OutputBuffer::with_max_lines(max_lines),
            running: None,
            saw_output: false,
            open_line: None,
            status: None,
            shell,
            runtime,
            max_lines,
        }
    }

    pub fn mode(&self) -> PanelMode {
        self.mode
    }

    pub fn is_visible(&self) -> bool {
        self.mode != PanelMode::Hidden
    }

    pub fn edit_text(&self) -> &str {
        self.edit.value()
    }

    /// Prompt cursor, in characters
    pub fn edit_cursor(&self) -> usize {
        self.edit.cursor_chars()
    }

    pub fn search_text(&self) -> &str {
        self.search_edit.value()
    }

    /// Search prompt cursor, in characters
    pub fn search_cursor(&self) -> usize {
        self.search_edit.cursor_chars()
    }

    pub fn output(&self) -> &OutputBuffer {
        &self.output
    }

    pub fn output_mut(&mut self) -> &mut OutputBuffer {
        &mut self.output
    }

    pub fn history(&self) -> &CommandHistory {
        &self.history
    }

    pub fn is_running(&self) -> bool {
        self.running.is_some()
    }

    pub fn running_pid(&self) -> Option<u32> {
        self.running.as_ref().and_then(RunningCommand::pid)
    }

    pub fn status(&self) -> Option<&str> {
        self.status.as_deref()
    }

    fn set_status(&mut self, message: impl Into<String>) {
        self.status = Some(message.into());
    }

    /// Hidden -> Editing with an empty prompt
    pub fn open(&mut self) {
        if self.mode != PanelMode::Hidden {
            return;
        }
        self.edit.clear();
        self.history.reset_cursor();
        self.status = None;
        self.mode = PanelMode::Editing;
    }

    // ========================================================================
    // Prompt editing (command prompt or search prompt, by mode)
    // ========================================================================

    fn active_edit(&mut self) -> Option<&mut LineEdit> {
        match self.mode {
            PanelMode::Editing => Some(&mut self.edit),
            PanelMode::Searching => Some(&mut self.search_edit),
            PanelMode::Hidden | PanelMode::Paging => None,
        }
    }

    pub fn insert_char(&mut self, c: char) {
        if let Some(edit) = self.active_edit() {
            edit.insert_char(c);
        }
    }

    pub fn insert_str(&mut self, text: &str) {
        if let Some(edit) = self.active_edit() {
            edit.insert_str(text);
        }
    }

    pub fn backspace(&mut self) {
        if let Some(edit) = self.active_edit() {
            edit.backspace();
        }
    }

    pub fn delete(&mut self) {
        if let Some(edit) = self.active_edit() {
            edit.delete();
        }
    }

    pub fn move_left(&mut self) {
        if let Some(edit) = self.active_edit() {
            edit.move_left();
        }
    }

    pub fn move_right(&mut self) {
        if let Some(edit) = self.active_edit() {
            edit.move_right();
        }
    }

    pub fn move_home(&mut self) {
        if let Some(edit) = self.active_edit() {
            edit.move_home();
        }
    }

    pub fn move_end(&mut self) {
        if let Some(edit) = self.active_edit() {
            edit.move_end();
        }
    }

    pub fn move_word_left(&mut self) {
        if let Some(edit) = self.active_edit() {
            edit.move_word_left();
        }
    }

    pub fn move_word_right(&mut self) {
        if let Some(edit) = self.active_edit() {
            edit.move_word_right();
        }
    }

    pub fn kill_to_start(&mut self) {
        if let Some(edit) = self.active_edit() {
            edit.kill_to_start();
        }
    }

    pub fn kill_to_end(&mut self) {
        if let Some(edit) = self.active_edit() {
            edit.kill_to_end();
        }
    }

    pub fn delete_word_backward(&mut self) {
        if let Some(edit) = self.active_edit() {
            edit.delete_word_backward();
        }
    }

    /// Recall the previous (older) history entry into the prompt
    pub fn history_prev(&mut self) {
        if self.mode != PanelMode::Editing {
            return;
        }
        if let Some(text) = self.history.prev(self.edit.value()) {
            self.edit.set_value(&text);
        }
    }

    /// Recall the next (newer) history entry, or the line being typed
    pub fn history_next(&mut self) {
        if self.mode != PanelMode::Editing {
            return;
        }
        if let Some(text) = self.history.next() {
            self.edit.set_value(&text);
        }
    }

    // ========================================================================
    // Running commands
    // ========================================================================

    /// Run the prompt text in the target's current directory.
    pub fn submit(&mut self, target: &RemoteTarget) {
        if self.mode != PanelMode::Editing {
            return;
        }
        if self.running.is_some() {
            self.set_status("A command is still running");
            return;
        }
        let text = self.edit.value().trim().to_string();
        if text.is_empty() {
            self.set_status("Empty command");
            return;
        }

        self.history.push(text.clone());
        self.edit.clear();
        self.reset_output();
        self.saw_output = false;
        self.open_line = None;
        self.mode = PanelMode::Paging;

        let line = match build_command(target.cwd(), &text) {
            Ok(line) => line,
            Err(e) => {
                tracing::warn!("Could not build command: {}", e);
                self.fail(e.to_string());
                return;
            }
        };

        match self.shell.spawn(&self.runtime, &line) {
            Ok(running) => {
                tracing::info!("Running {:?} in {} on {}", text, target.cwd(), target.host());
                self.output.append_line(&format!("$ {text}"));
                self.running = Some(running);
                self.set_status("Running...");
            }
            Err(e) => {
                tracing::warn!("Could not start command: {}", e);
                self.fail(e.to_string());
            }
        }
    }

    /// Replace the output with an empty buffer of the same page height
    fn reset_output(&mut self) {
        let page_height = self.output.page_height();
        self.output = OutputBuffer::with_max_lines(self.max_lines);
        self.output.set_page_height(page_height);
    }

    fn fail(&mut self, message: String) {
        self.reset_output();
        self.output.append_line(&format!("error: {message}"));
        self.set_status("Command failed");
    }

    /// Move pending output into the buffer. Returns true if anything changed.
    pub fn poll(&mut self) -> bool {
        let Some(running) = self.running.as_mut() else {
            return false;
        };

        let mut events = Vec::new();
        while let Some(event) = running.try_recv() {
            events.push(event);
        }
        let lost = events.is_empty() && running.is_finished();
        let changed = !events.is_empty();

        for event in events {
            self.handle_event(event);
        }
        if lost && self.running.is_some() {
            tracing::warn!("Command supervisor stopped without a result");
            self.running = None;
            self.output.append_line("error: command stopped unexpectedly");
            self.set_status("Command failed");
            return true;
        }
        changed
    }

    fn handle_event(&mut self, event: RunEvent) {
        match event {
            RunEvent::Output { stream, chunk } => {
                self.saw_output = true;
                self.append_chunk(stream, &chunk);
            }
            RunEvent::Exited { code } => {
                self.running = None;
                if !self.saw_output {
                    self.output.append_line("[no output]");
                }
                if code == 0 {
                    self.set_status("Command finished");
                } else {
                    self.output.append_line(&format!("[exit {code}]"));
                    self.set_status(format!("Command failed ({code})"));
                }
            }
            RunEvent::Cancelled => {
                self.running = None;
                self.output.append_line("[cancelled]");
            }
            RunEvent::Failed { message } => {
                self.running = None;
                self.output.append_line(&format!("error: {message}"));
                self.set_status("Command failed");
            }
        }
    }

    /// Feed raw output to the buffer, marking the start of each stderr line.
    ///
    /// A line left open by one stream is ended before the other stream
    /// writes, so the two never share a line.
    fn append_chunk(&mut self, stream: OutputStream, chunk: &[u8]) {
        let mut bytes = Vec::with_capacity(chunk.len() + STDERR_PREFIX.len());
        if self.open_line.is_some_and(|open| open != stream) {
            bytes.push(b'\n');
            self.open_line = None;
        }
        for piece in chunk.split_inclusive(|&b| b == b'\n') {
            if self.open_line.is_none() && stream == OutputStream::Stderr {
                bytes.extend_from_slice(STDERR_PREFIX);
            }
            bytes.extend_from_slice(piece);
            self.open_line = if piece.ends_with(b"\n") {
                None
            } else {
                Some(stream)
            };
        }
        self.output.append(&bytes);
    }

    /// Kill the running command and return to the prompt.
    ///
    /// Returns false if nothing was running.
    pub fn cancel(&mut self) -> bool {
        self.poll();
        let Some(running) = self.running.take() else {
            return false;
        };
        tracing::info!("Cancelling command (pid {:?})", running.pid());
        self.runtime.block_on(running.cancel());
        self.output.append_line("[cancelled]");
        self.set_status("Command cancelled");
        self.edit.clear();
        self.history.reset_cursor();
        self.mode = PanelMode::Editing;
        true
    }

    // ========================================================================
    // Paging and search
    // ========================================================================

    /// Paging -> Searching with an empty pattern prompt
    pub fn begin_search(&mut self) {
        if self.mode != PanelMode::Paging {
            return;
        }
        self.search_edit.clear();
        self.mode = PanelMode::Searching;
    }

    /// Run the typed search and go back to paging
    pub fn confirm_search(&mut self) {
        if self.mode != PanelMode::Searching {
            return;
        }
        let pattern = self.search_edit.value().to_string();
        self.mode = PanelMode::Paging;
        if pattern.is_empty() {
            self.output.clear_search();
            self.status = None;
            return;
        }
        self.output.search(&pattern);
        self.report_match();
    }

    /// Leave the search prompt; prior search and scroll stay as they were
    pub fn cancel_search(&mut self) {
        if self.mode == PanelMode::Searching {
            self.mode = PanelMode::Paging;
        }
    }

    pub fn next_match(&mut self) {
        if self.output.search_pattern().is_some() {
            self.output.next_match();
            self.report_match();
        }
    }

    pub fn prev_match(&mut self) {
        if self.output.search_pattern().is_some() {
            self.output.prev_match();
            self.report_match();
        }
    }

    fn report_match(&mut self) {
        let Some(pattern) = self.output.search_pattern() else {
            return;
        };
        let message = match self.output.active_match() {
            Some(idx) => format!(
                "Match {}/{} for '{}'",
                idx + 1,
                self.output.match_count(),
                pattern
            ),
            None => format!("No matches for '{pattern}'"),
        };
        self.set_status(message);
    }

    /// Paging -> Editing for the next command; output is kept until then
    pub fn edit_next(&mut self) {
        if self.mode != PanelMode::Paging {
            return;
        }
        if self.running.is_some() {
            self.set_status("A command is still running (Ctrl-C cancels)");
            return;
        }
        self.edit.clear();
        self.history.reset_cursor();
        self.status = None;
        self.mode = PanelMode::Editing;
    }

    /// Close the panel from any mode, cancelling a running command and
    /// dropping the prompt and output. History is kept.
    pub fn dismiss(&mut self) {
        if let Some(running) = self.running.take() {
            tracing::info!("Cancelling command on dismiss");
            self.runtime.block_on(running.cancel());
        }
        self.edit.clear();
        self.search_edit.clear();
        self.history.reset_cursor();
        self.reset_output();
        self.status = None;
        self.mode = PanelMode::Hidden;
    }
}
