//! Remote-shell process runner
//!
//! Each remote action is one child process: `ssh <host> "sh -lc '<line>'"`.
//! The command line is always passed as a single argv element, never through
//! a local shell string.
//!
//! Streaming runs are owned by a supervisor task on the tokio runtime. The
//! supervisor reads stdout and stderr concurrently, forwards raw chunks as
//! they arrive and is the only place the child is waited on, so the process
//! handle and pipes are released exactly once whether the command exits or
//! is cancelled. A cancel is honoured until both pipes are closed, including
//! after the child itself exited but a background job still holds a pipe.

use std::fmt;
use std::io;
use std::process::Stdio;

use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::{Child, ChildStderr, ChildStdout, Command};
use tokio::runtime::Handle;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;

use super::quoting::{wrap_for_remote, CommandLine};

/// Which output stream a line came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputStream {
    Stdout,
    Stderr,
}

/// Events produced by a streaming run
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunEvent {
    /// Bytes as read from one stream; not aligned to lines
    Output { stream: OutputStream, chunk: Vec<u8> },
    /// The child exited on its own
    Exited { code: i32 },
    /// The child was killed and reaped after a cancel request
    Cancelled,
    /// Reading or waiting failed after a successful spawn
    Failed { message: String },
}

/// Output of a command run to completion
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CapturedOutput {
    pub stdout: Vec<u8>,
    pub stderr: Vec<u8>,
    pub exit_code: i32,
}

impl CapturedOutput {
    pub fn success(&self) -> bool {
        self.exit_code == 0
    }
}

/// The child process could not be created
#[derive(Debug)]
pub struct SpawnError {
    pub program: String,
    pub source: io::Error,
}

impl fmt::Display for SpawnError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "failed to start {}: {}", self.program, self.source)
    }
}

impl std::error::Error for SpawnError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.source)
    }
}

/// How remote commands are launched
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteShell {
    program: String,
    prefix_args: Vec<String>,
    tty_flag: Option<String>,
    /// Wrap the line for a remote login shell
    login_wrap: bool,
}

impl RemoteShell {
    /// Run commands on `host` through `program` (normally `ssh`).
    pub fn ssh(program: &str, host: &str, extra_args: &[String]) -> Self {
        let mut prefix_args = extra_args.to_vec();
        prefix_args.push(host.to_string());
        Self {
            program: program.to_string(),
            prefix_args,
            tty_flag: Some("-t".to_string()),
            login_wrap: true,
        }
    }

    /// Run commands on the local machine through `sh -c`, without the login
    /// shell wrapper.
    pub fn local() -> Self {
        Self {
            program: "sh".to_string(),
            prefix_args: vec!["-c".to_string()],
            tty_flag: None,
            login_wrap: false,
        }
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    /// Arguments passed to the program for `line`
    pub fn args_for(&self, line: &CommandLine, interactive: bool) -> Vec<String> {
        let mut args = Vec::with_capacity(self.prefix_args.len() + 2);
        if interactive {
            args.extend(self.tty_flag.iter().cloned());
        }
        args.extend(self.prefix_args.iter().cloned());
        if self.login_wrap {
            args.push(wrap_for_remote(line));
        } else {
            args.push(line.as_str().to_string());
        }
        args
    }

    fn command(&self, line: &CommandLine) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.args(self.args_for(line, false));
        cmd
    }

    fn spawn_error(&self, source: io::Error) -> SpawnError {
        SpawnError {
            program: self.program.clone(),
            source,
        }
    }

    /// Run a command to completion, capturing both streams.
    pub async fn run(&self, line: &CommandLine) -> Result<CapturedOutput, SpawnError> {
        tracing::debug!("Running remote command: {}", line);
        let output = self
            .command(line)
            .stdin(Stdio::null())
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| self.spawn_error(e))?;

        Ok(CapturedOutput {
            stdout: output.stdout,
            stderr: output.stderr,
            exit_code: exit_code(output.status),
        })
    }

    /// Start a streaming run on `runtime`.
    ///
    /// Output chunks arrive through [`RunningCommand::try_recv`]. The last
    /// event is always one of `Exited`, `Cancelled` or `Failed`.
    pub fn spawn(&self, runtime: &Handle, line: &CommandLine) -> Result<RunningCommand, SpawnError> {
        tracing::debug!("Spawning remote command: {}", line);
        let _guard = runtime.enter();

        let mut cmd = self.command(line);
        cmd.stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        #[cfg(unix)]
        cmd.process_group(0);

        let mut child = cmd.spawn().map_err(|e| self.spawn_error(e))?;
        let pid = child.id();
        tracing::debug!("Spawned {} with pid {:?}", self.program, pid);

        let (event_tx, event_rx) = mpsc::unbounded_channel();
        let (cancel_tx, cancel_rx) = oneshot::channel();

        let stdout = child.stdout.take();
        let stderr = child.stderr.take();
        let supervisor = runtime.spawn(supervise(child, stdout, stderr, event_tx, cancel_rx));

        Ok(RunningCommand {
            pid,
            events: event_rx,
            cancel: Some(cancel_tx),
            supervisor,
        })
    }

    /// Run a command attached to the local terminal (editor, pager).
    ///
    /// Blocks until the child exits. The caller is responsible for handing
    /// the terminal over first.
    pub fn run_interactive(&self, line: &CommandLine) -> Result<i32, SpawnError> {
        tracing::debug!("Running interactive remote command: {}", line);
        let status = std::process::Command::new(&self.program)
            .args(self.args_for(line, true))
            .status()
            .map_err(|e| self.spawn_error(e))?;
        Ok(exit_code(status))
    }
}

/// A streaming run in progress
#[derive(Debug)]
pub struct RunningCommand {
    pid: Option<u32>,
    events: mpsc::UnboundedReceiver<RunEvent>,
    cancel: Option<oneshot::Sender<()>>,
    supervisor: JoinHandle<()>,
}

impl RunningCommand {
    pub fn pid(&self) -> Option<u32> {
        self.pid
    }

    /// Next pending event, if any, without blocking
    pub fn try_recv(&mut self) -> Option<RunEvent> {
        self.events.try_recv().ok()
    }

    /// True once the supervisor has stopped; every event it produced is
    /// already queued.
    pub fn is_finished(&self) -> bool {
        self.supervisor.is_finished()
    }

    /// Wait for the next event. `None` once the supervisor is gone.
    pub async fn recv(&mut self) -> Option<RunEvent> {
        self.events.recv().await
    }

    /// Kill the child and wait until it has been reaped.
    pub async fn cancel(mut self) {
        if let Some(cancel) = self.cancel.take() {
            let _ = cancel.send(());
        }
        if let Err(e) = (&mut self.supervisor).await {
            tracing::warn!("Command supervisor ended abnormally: {}", e);
        }
    }
}

async fn supervise(
    mut child: Child,
    stdout: Option<ChildStdout>,
    stderr: Option<ChildStderr>,
    events: mpsc::UnboundedSender<RunEvent>,
    mut cancel: oneshot::Receiver<()>,
) {
    // Leader of the child's process group; stays valid after the child is reaped
    let group = child.id();
    let mut readers = [
        stdout.map(|s| tokio::spawn(forward_chunks(s, OutputStream::Stdout, events.clone()))),
        stderr.map(|s| tokio::spawn(forward_chunks(s, OutputStream::Stderr, events.clone()))),
    ];

    // A dropped sender means the RunningCommand is gone; treat it as a cancel
    let outcome = tokio::select! {
        status = child.wait() => Some(status),
        _ = &mut cancel => None,
    };

    let final_event = match outcome {
        Some(Ok(status)) => {
            // Background jobs may keep the pipes open after the child exited
            let drained = tokio::select! {
                _ = join_readers(&mut readers) => true,
                _ = &mut cancel => false,
            };
            if drained {
                let code = exit_code(status);
                tracing::info!("Remote command exited with {}", code);
                RunEvent::Exited { code }
            } else {
                kill_group(group);
                abort_readers(&readers);
                tracing::info!("Remote command cancelled after its shell exited");
                RunEvent::Cancelled
            }
        }
        Some(Err(e)) => {
            tracing::warn!("Failed waiting for remote command: {}", e);
            kill_and_reap(&mut child, group).await;
            abort_readers(&readers);
            RunEvent::Failed {
                message: e.to_string(),
            }
        }
        None => {
            kill_and_reap(&mut child, group).await;
            abort_readers(&readers);
            tracing::info!("Remote command cancelled");
            RunEvent::Cancelled
        }
    };

    let _ = events.send(final_event);
}

async fn join_readers(readers: &mut [Option<JoinHandle<()>>]) {
    for reader in readers.iter_mut().flatten() {
        let _ = reader.await;
    }
}

fn abort_readers(readers: &[Option<JoinHandle<()>>]) {
    for reader in readers.iter().flatten() {
        reader.abort();
    }
}

/// SIGKILL the whole process group led by `group`
fn kill_group(group: Option<u32>) {
    #[cfg(unix)]
    if let Some(pid) = group {
        use nix::sys::signal::{killpg, Signal};
        use nix::unistd::Pid;
        if let Err(e) = killpg(Pid::from_raw(pid as i32), Signal::SIGKILL) {
            tracing::debug!("killpg({}) failed: {}", pid, e);
        }
    }
    #[cfg(not(unix))]
    let _ = group;
}

async fn kill_and_reap(child: &mut Child, group: Option<u32>) {
    // The child leads its own group; take any grandchildren with it
    kill_group(group);
    if let Err(e) = child.kill().await {
        tracing::debug!("Child already gone: {}", e);
        let _ = child.wait().await;
    }
}

const CHUNK_SIZE: usize = 8192;

async fn forward_chunks(
    mut stream: impl AsyncRead + Unpin,
    which: OutputStream,
    events: mpsc::UnboundedSender<RunEvent>,
) {
    let mut buf = vec![0u8; CHUNK_SIZE];
    loop {
        match stream.read(&mut buf).await {
            Ok(0) => break,
            Ok(n) => {
                let event = RunEvent::Output {
                    stream: which,
                    chunk: buf[..n].to_vec(),
                };
                if events.send(event).is_err() {
                    break;
                }
            }
            Err(e) => {
                tracing::warn!("Error reading {:?}: {}", which, e);
                break;
            }
        }
    }
}

#[cfg(unix)]
fn exit_code(status: std::process::ExitStatus) -> i32 {
    use std::os::unix::process::ExitStatusExt;
    status
        .code()
        .or_else(|| status.signal().map(|sig| 128 + sig))
        .unwrap_or(-1)
}

#[cfg(not(unix))]
fn exit_code(status: std::process::ExitStatus) -> i32 {
    status.code().unwrap_or(-1)
}

/// Find `program` on `PATH`.
pub fn which(program: &str) -> Option<std::path::PathBuf> {
    let path = std::env::var_os("PATH")?;
    std::env::split_paths(&path)
        .map(|dir| dir.join(program))
        .find(|candidate| is_executable(candidate))
}

#[cfg(unix)]
fn is_executable(path: &std::path::Path) -> bool {
    use std::os::unix::fs::PermissionsExt;
    path.metadata()
        .map(|m| m.is_file() && m.permissions().mode() & 0o111 != 0)
        .unwrap_or(false)
}

#[cfg(not(unix))]
fn is_executable(path: &std::path::Path) -> bool {
    path.is_file()
}
