use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use ratatui::backend::TestBackend;
use ratatui::buffer::Buffer;
use ratatui::Terminal;
use rex::app::App;
use rex::config::Config;
use rex::services::remote::runner::RemoteShell;
use rex::services::remote::RemoteTarget;
use rex::view::ui;
use tempfile::TempDir;
use tokio::runtime::Runtime;

/// Drives a full `App` against the local machine and renders it into an
/// in-memory terminal.
///
/// Commands run through the local `sh`, inside a temporary directory that
/// acts as the remote filesystem.
pub struct RexTestHarness {
    app: App,
    terminal: Terminal<TestBackend>,
    root: PathBuf,
    _temp_dir: TempDir,
    // Declared last so it outlives the app's running commands
    _runtime: Runtime,
}

impl RexTestHarness {
    /// Harness with an empty temporary "remote" directory
    pub fn new(width: u16, height: u16) -> anyhow::Result<Self> {
        Self::with_editor_settings(width, height, HashMap::new())
    }

    pub fn with_editor_settings(
        width: u16,
        height: u16,
        editor_settings: HashMap<String, String>,
    ) -> anyhow::Result<Self> {
        super::tracing::init_tracing_from_env();

        let temp_dir = tempfile::tempdir()?;
        let root = temp_dir.path().canonicalize()?;
        let runtime = Runtime::new()?;

        let app = App::new(
            Config::default(),
            RemoteTarget::new("testhost", &root.to_string_lossy()),
            RemoteShell::local(),
            runtime.handle().clone(),
            Box::new(editor_settings),
        );
        let terminal = Terminal::new(TestBackend::new(width, height))?;

        Ok(Self {
            app,
            terminal,
            root,
            _temp_dir: temp_dir,
            _runtime: runtime,
        })
    }

    /// Physical path of the temporary "remote" root
    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn create_file(&self, relative: &str, contents: &str) -> anyhow::Result<()> {
        let path = self.root.join(relative);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, contents)?;
        Ok(())
    }

    pub fn create_dir(&self, relative: &str) -> anyhow::Result<()> {
        std::fs::create_dir_all(self.root.join(relative))?;
        Ok(())
    }

    pub fn app(&self) -> &App {
        &self.app
    }

    pub fn app_mut(&mut self) -> &mut App {
        &mut self.app
    }

    /// List the start directory, as the binary does before drawing
    pub fn load(&mut self) -> anyhow::Result<()> {
        if !self.app.refresh() {
            anyhow::bail!("listing failed: {:?}", self.app.status());
        }
        Ok(())
    }

    pub fn send_key(&mut self, code: KeyCode, modifiers: KeyModifiers) -> anyhow::Result<()> {
        self.app.handle_key(&KeyEvent::new(code, modifiers));
        self.render()
    }

    pub fn press(&mut self, code: KeyCode) -> anyhow::Result<()> {
        self.send_key(code, KeyModifiers::NONE)
    }

    pub fn type_text(&mut self, text: &str) -> anyhow::Result<()> {
        for c in text.chars() {
            self.app.handle_key(&KeyEvent::new(KeyCode::Char(c), KeyModifiers::NONE));
        }
        self.render()
    }

    /// Move the browser selection onto `name`
    pub fn select(&mut self, name: &str) -> anyhow::Result<()> {
        let browser = self.app.browser();
        let idx = browser
            .entries()
            .iter()
            .position(|e| e.name == name)
            .ok_or_else(|| anyhow::anyhow!("no entry named {name}"))?;
        let current = browser.selected().unwrap_or(0);
        self.app
            .browser_mut()
            .move_by(idx as isize - current as isize);
        self.render()
    }

    /// Open the panel, type `command` and submit it
    pub fn run_command(&mut self, command: &str) -> anyhow::Result<()> {
        if !self.app.panel().is_visible() {
            self.press(KeyCode::Char(':'))?;
        }
        self.type_text(command)?;
        self.press(KeyCode::Enter)
    }

    /// Tick until the running command finishes
    pub fn wait_for_command(&mut self) -> anyhow::Result<()> {
        let deadline = Instant::now() + Duration::from_secs(10);
        while self.app.panel().is_running() {
            if Instant::now() > deadline {
                anyhow::bail!("command still running after 10s");
            }
            self.app.tick();
            std::thread::sleep(Duration::from_millis(10));
        }
        self.render()
    }

    pub fn render(&mut self) -> anyhow::Result<()> {
        let app = &mut self.app;
        self.terminal.draw(|frame| ui::draw(frame, app))?;
        Ok(())
    }

    pub fn buffer(&self) -> &Buffer {
        self.terminal.backend().buffer()
    }

    /// Screen contents, one string per row, trailing spaces trimmed
    pub fn screen_lines(&self) -> Vec<String> {
        let buffer = self.buffer();
        let area = buffer.area;
        (0..area.height)
            .map(|y| {
                let row: String = (0..area.width)
                    .map(|x| buffer[(x, y)].symbol().to_string())
                    .collect();
                row.trim_end().to_string()
            })
            .collect()
    }

    pub fn screen_to_string(&self) -> String {
        self.screen_lines().join("\n")
    }

    pub fn assert_screen_contains(&self, text: &str) {
        let screen = self.screen_to_string();
        assert!(
            screen.contains(text),
            "Expected screen to contain {text:?}\nScreen:\n{screen}"
        );
    }

    pub fn assert_screen_not_contains(&self, text: &str) {
        let screen = self.screen_to_string();
        assert!(
            !screen.contains(text),
            "Expected screen not to contain {text:?}\nScreen:\n{screen}"
        );
    }

    /// Row index of the first screen line containing `text`
    pub fn find_row(&self, text: &str) -> Option<u16> {
        self.screen_lines()
            .iter()
            .position(|line| line.contains(text))
            .map(|row| row as u16)
    }
}
