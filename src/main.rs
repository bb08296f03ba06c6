use anyhow::{Context, Result as AnyhowResult};
use clap::Parser;
use crossterm::event::{poll as event_poll, read as event_read, Event as CrosstermEvent};
use ratatui::backend::CrosstermBackend;
use ratatui::Terminal;
use rex::app::App;
use rex::config::Config;
use rex::services::remote::editor::EnvSettings;
use rex::services::remote::runner::{which, RemoteShell};
use rex::services::remote::RemoteTarget;
use rex::services::terminal_modes::{self, TerminalModes};
use rex::services::{log_dirs, tracing_setup};
use rex::view::ui;
use std::io::{stdout, Stdout};
use std::path::PathBuf;
use std::time::Duration;

/// Browse a remote filesystem and run commands on it over ssh
#[derive(Parser, Debug)]
#[command(name = "rex")]
#[command(about = "Browse a remote filesystem and run commands on it over ssh", long_about = None)]
#[command(version)]
struct Args {
    /// Remote host, as passed to ssh (e.g. user@host)
    #[arg(
        value_name = "HOST",
        required_unless_present_any = ["local", "dump_config", "show_paths"]
    )]
    host: Option<String>,

    /// Directory to start in
    #[arg(value_name = "PATH", default_value = ".")]
    path: String,

    /// Path to configuration file
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Path to log file (default: per-process file in the state directory)
    #[arg(long, value_name = "PATH")]
    log_file: Option<PathBuf>,

    /// Print the effective configuration as JSON and exit
    #[arg(long)]
    dump_config: bool,

    /// Print the directories used by rex and exit
    #[arg(long)]
    show_paths: bool,

    /// Run against this machine through `sh` instead of ssh
    #[arg(long)]
    local: bool,
}

type AppTerminal = Terminal<CrosstermBackend<Stdout>>;

fn main() -> AnyhowResult<()> {
    let args = Args::parse();

    if args.show_paths {
        log_dirs::print_all_paths();
        return Ok(());
    }

    if args.dump_config {
        let config = Config::load(args.config.as_deref()).context("Failed to load configuration")?;
        println!("{}", config.to_json()?);
        return Ok(());
    }

    let log_file = args.log_file.clone().unwrap_or_else(log_dirs::main_log_path);
    if let Err(e) = tracing_setup::init_global(&log_file) {
        eprintln!("Warning: cannot write log file {}: {}", log_file.display(), e);
    }
    log_dirs::cleanup_stale_logs();
    tracing::info!("rex starting");

    let config = Config::load(args.config.as_deref()).context("Failed to load configuration")?;

    let (host, shell) = if args.local {
        let host = args.host.clone().unwrap_or_else(|| "localhost".to_string());
        (host, RemoteShell::local())
    } else {
        let host = args.host.clone().context("A host is required")?;
        if which(&config.ssh.program).is_none() {
            anyhow::bail!("{} not found in PATH", config.ssh.program);
        }
        let shell = RemoteShell::ssh(&config.ssh.program, &host, &config.ssh.extra_args);
        (host, shell)
    };

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("Failed to start async runtime")?;

    let tick = Duration::from_millis(config.panel.tick_ms);
    let target = RemoteTarget::new(host, &args.path);
    let mut app = App::new(
        config,
        target,
        shell,
        runtime.handle().clone(),
        Box::new(EnvSettings),
    );

    // Fail before taking over the terminal if the start directory is unusable
    if !app.refresh() {
        let message = app.status().unwrap_or("Error: cannot list directory").to_string();
        anyhow::bail!("{}: {}", args.path, message);
    }

    let original_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |panic| {
        terminal_modes::emergency_cleanup();
        original_hook(panic);
    }));

    let mut modes = TerminalModes::enable().context("Failed to set up terminal")?;
    let mut terminal =
        Terminal::new(CrosstermBackend::new(stdout())).context("Failed to create terminal")?;
    terminal.clear()?;

    let result = run_event_loop(&mut app, &mut terminal, &mut modes, tick);

    modes.undo();
    drop(app);
    tracing::info!("rex exiting");
    result
}

fn run_event_loop(
    app: &mut App,
    terminal: &mut AppTerminal,
    modes: &mut TerminalModes,
    tick: Duration,
) -> AnyhowResult<()> {
    let mut needs_render = true;

    loop {
        if needs_render {
            terminal.draw(|frame| ui::draw(frame, app))?;
            needs_render = false;
        }

        if app.should_quit() {
            return Ok(());
        }

        if event_poll(tick)? {
            match event_read()? {
                CrosstermEvent::Key(key) => {
                    app.handle_key(&key);
                    needs_render = true;
                }
                CrosstermEvent::Paste(text) => {
                    app.handle_paste(&text);
                    needs_render = true;
                }
                CrosstermEvent::Resize(_, _) => needs_render = true,
                _ => {}
            }
        }

        if let Some(request) = app.take_interactive_request() {
            modes.undo();
            app.run_interactive(&request);
            *modes = TerminalModes::enable().context("Failed to restore terminal")?;
            terminal.clear()?;
            needs_render = true;
        }

        if app.tick() {
            needs_render = true;
        }
    }
}
