//! Application state and actions
//!
//! `App` ties the browser, the command panel and the remote target
//! together. Interactive programs (editor, pager) need the real terminal,
//! so they are not run here: the app records a request and the event loop
//! runs it with the terminal modes suspended.

pub mod browser;

use std::time::Duration;

use crossterm::event::{KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use tokio::runtime::Handle;

use crate::config::Config;
use crate::input::panel_keys::handle_panel_key;
use crate::services::remote::editor::{resolve_editor_with_fallback, EditorSettings};
use crate::services::remote::listing::list_directory_within;
use crate::services::remote::quoting::{build_editor_command, build_pager_command, CommandLine};
use crate::services::remote::runner::RemoteShell;
use crate::services::remote::{RemoteEntry, RemoteTarget};
use crate::view::command_panel::CommandPanel;

use browser::Browser;

/// An interactive program to run on the real terminal
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InteractiveRequest {
    pub line: CommandLine,
    /// What it is, for logs and the status line
    pub label: String,
}

pub struct App {
    config: Config,
    target: RemoteTarget,
    shell: RemoteShell,
    runtime: Handle,
    browser: Browser,
    panel: CommandPanel,
    editor_settings: Box<dyn EditorSettings>,
    status: Option<String>,
    pending_interactive: Option<InteractiveRequest>,
    should_quit: bool,
}

impl App {
    pub fn new(
        config: Config,
        target: RemoteTarget,
        shell: RemoteShell,
        runtime: Handle,
        editor_settings: Box<dyn EditorSettings>,
    ) -> Self {
        let panel =
            CommandPanel::with_max_lines(shell.clone(), runtime.clone(), config.panel.max_lines);
        Self {
            config,
            target,
            shell,
            runtime,
            browser: Browser::new(),
            panel,
            editor_settings,
            status: None,
            pending_interactive: None,
            should_quit: false,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn target(&self) -> &RemoteTarget {
        &self.target
    }

    pub fn browser(&self) -> &Browser {
        &self.browser
    }

    pub fn browser_mut(&mut self) -> &mut Browser {
        &mut self.browser
    }

    pub fn panel(&self) -> &CommandPanel {
        &self.panel
    }

    pub fn panel_mut(&mut self) -> &mut CommandPanel {
        &mut self.panel
    }

    pub fn status(&self) -> Option<&str> {
        self.status.as_deref()
    }

    pub fn set_status(&mut self, message: impl Into<String>) {
        self.status = Some(message.into());
    }

    pub fn should_quit(&self) -> bool {
        self.should_quit
    }

    pub fn quit(&mut self) {
        self.should_quit = true;
    }

    /// Hand the pending editor/pager run to the event loop
    pub fn take_interactive_request(&mut self) -> Option<InteractiveRequest> {
        self.pending_interactive.take()
    }

    /// Called every UI tick. Returns true if a redraw is needed.
    pub fn tick(&mut self) -> bool {
        self.panel.poll()
    }

    // ========================================================================
    // Navigation
    // ========================================================================

    /// Reload the current directory
    pub fn refresh(&mut self) -> bool {
        let cwd = self.target.cwd().to_string();
        self.load_directory(&cwd, true)
    }

    /// List `path` and make it the current directory if that worked.
    ///
    /// On failure the current directory and entries are left untouched.
    pub fn enter_directory(&mut self, path: &str) -> bool {
        self.load_directory(path, false)
    }

    pub fn go_parent(&mut self) -> bool {
        let parent = self.target.parent_path();
        self.enter_directory(&parent)
    }

    fn load_directory(&mut self, path: &str, keep_selection: bool) -> bool {
        let limit = Duration::from_secs(self.config.ssh.listing_timeout_secs);
        let result = self
            .runtime
            .block_on(list_directory_within(&self.shell, path, limit));
        match result {
            Ok(listing) => {
                self.target.set_cwd(listing.cwd);
                if keep_selection {
                    self.browser.refresh_entries(listing.entries);
                } else {
                    self.browser.set_entries(listing.entries);
                }
                self.status = None;
                true
            }
            Err(e) => {
                tracing::warn!("Listing {} failed: {}", path, e);
                self.status = Some(e.to_string());
                false
            }
        }
    }

    /// Enter the selected directory, or page the selected file
    pub fn activate_selected(&mut self) {
        let Some(entry) = self.browser.selected_entry().cloned() else {
            return;
        };
        if entry.is_parent() {
            self.go_parent();
        } else if entry.is_dir {
            let path = self.target.child_path(&entry.name);
            self.enter_directory(&path);
        } else {
            self.open_file(&entry);
        }
    }

    fn selected_file(&mut self) -> Option<RemoteEntry> {
        match self.browser.selected_entry() {
            Some(entry) if !entry.is_dir => Some(entry.clone()),
            Some(_) => {
                self.status = Some("Not a file".to_string());
                None
            }
            None => None,
        }
    }

    pub fn open_selected(&mut self) {
        if let Some(entry) = self.selected_file() {
            self.open_file(&entry);
        }
    }

    pub fn edit_selected(&mut self) {
        if let Some(entry) = self.selected_file() {
            self.edit_file(&entry);
        }
    }

    fn open_file(&mut self, entry: &RemoteEntry) {
        match build_pager_command(self.target.cwd(), &entry.name) {
            Ok(line) => self.request_interactive(line, format!("view {}", entry.name)),
            Err(e) => self.status = Some(format!("Error: {e}")),
        }
    }

    fn edit_file(&mut self, entry: &RemoteEntry) {
        let editor =
            resolve_editor_with_fallback(self.editor_settings.as_ref(), &self.config.editor.fallback);
        tracing::debug!("Editing {} with {:?}", entry.name, editor);
        match build_editor_command(self.target.cwd(), &editor, &entry.name) {
            Ok(line) => self.request_interactive(line, format!("edit {}", entry.name)),
            Err(e) => self.status = Some(format!("Error: {e}")),
        }
    }

    fn request_interactive(&mut self, line: CommandLine, label: String) {
        self.pending_interactive = Some(InteractiveRequest { line, label });
    }

    /// Run an interactive request on the current terminal and reload.
    ///
    /// The caller must have released the terminal first.
    pub fn run_interactive(&mut self, request: &InteractiveRequest) {
        tracing::info!("Running interactive {}", request.label);
        match self.shell.run_interactive(&request.line) {
            Ok(0) => self.status = None,
            Ok(code) => self.status = Some(format!("{} exited with {}", request.label, code)),
            Err(e) => self.status = Some(format!("Error: {e}")),
        }
        let cwd = self.target.cwd().to_string();
        let previous_status = self.status.take();
        self.load_directory(&cwd, true);
        if self.status.is_none() {
            self.status = previous_status;
        }
    }

    // ========================================================================
    // Keys
    // ========================================================================

    pub fn handle_key(&mut self, event: &KeyEvent) {
        if event.kind == KeyEventKind::Release {
            return;
        }
        if handle_panel_key(&mut self.panel, event, &self.target) {
            return;
        }

        let ctrl = event.modifiers.contains(KeyModifiers::CONTROL);
        match event.code {
            KeyCode::Char('q') => self.quit(),
            KeyCode::Char('c') if ctrl => self.quit(),
            KeyCode::Up | KeyCode::Char('k') => self.browser.move_up(),
            KeyCode::Down | KeyCode::Char('j') => self.browser.move_down(),
            KeyCode::PageUp => self.browser.page_up(),
            KeyCode::PageDown => self.browser.page_down(),
            KeyCode::Enter => self.activate_selected(),
            KeyCode::Char('p') | KeyCode::Backspace => {
                self.go_parent();
            }
            KeyCode::Char('r') => {
                self.refresh();
            }
            KeyCode::Char('e') => self.edit_selected(),
            KeyCode::Char('o') => self.open_selected(),
            KeyCode::Char(':') | KeyCode::Char('s') => {
                self.status = None;
                self.panel.open();
            }
            _ => {}
        }
    }

    /// Bracketed paste goes to whichever prompt is open
    pub fn handle_paste(&mut self, text: &str) {
        self.panel.insert_str(text);
    }
}
