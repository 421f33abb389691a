/// External tool invocation with timeouts and captured diagnostics
use crate::error::ToolError;
use std::ffi::{OsStr, OsString};
use std::io::Read;
use std::path::{Path, PathBuf};
use std::process::{Child, Command, ExitStatus, Stdio};
use std::sync::mpsc;
use std::thread;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

const POLL_INTERVAL: Duration = Duration::from_millis(25);

/// How long captured output is awaited once the tool has exited or been killed.
const DRAIN_GRACE: Duration = Duration::from_secs(1);

/// Structured result of a successful tool run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolOutput {
    /// File the tool was asked to produce, verified to exist.
    pub produced: PathBuf,
    /// Captured stdout followed by stderr.
    pub diagnostics: String,
}

/// Builder for one external process invocation.
/// The tool directory is only prepended to the child's PATH.
#[derive(Debug, Clone)]
pub struct ToolCommand {
    program: String,
    args: Vec<OsString>,
    tool_path: Option<PathBuf>,
    timeout: Duration,
    log_path: Option<PathBuf>,
}

impl ToolCommand {
    pub fn new(program: &str) -> Self {
        Self {
            program: program.to_string(),
            args: Vec::new(),
            tool_path: None,
            timeout: Duration::from_secs(600),
            log_path: None,
        }
    }

    pub fn arg(mut self, arg: impl AsRef<OsStr>) -> Self {
        self.args.push(arg.as_ref().to_os_string());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        self.args
            .extend(args.into_iter().map(|a| a.as_ref().to_os_string()));
        self
    }

    pub fn tool_path(mut self, tool_path: Option<&Path>) -> Self {
        self.tool_path = tool_path.map(Path::to_path_buf);
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Writes the captured diagnostics to `path` once the tool exits.
    pub fn log_to(mut self, path: &Path) -> Self {
        self.log_path = Some(path.to_path_buf());
        self
    }

    /// Human readable command line for logs.
    pub fn command_line(&self) -> String {
        let mut line = self.program.clone();
        for arg in &self.args {
            line.push(' ');
            line.push_str(&arg.to_string_lossy());
        }
        line
    }

    /// Runs the tool and checks that `expected_output` exists afterwards.
    pub fn run(&self, expected_output: &Path) -> Result<ToolOutput, ToolError> {
        debug!("Command: {}", self.command_line());
        let start_time = Instant::now();

        let mut command = Command::new(&self.program);
        command
            .args(&self.args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        if let Some(path) = self.child_path() {
            command.env("PATH", path);
        }
        // Own process group, so a timeout also reaches processes the tool forks.
        #[cfg(unix)]
        {
            use std::os::unix::process::CommandExt;
            command.process_group(0);
        }

        let mut child = command.spawn().map_err(|source| ToolError::Spawn {
            tool: self.program.clone(),
            source,
        })?;

        let stdout = capture(child.stdout.take());
        let stderr = capture(child.stderr.take());

        let status = self.wait_with_timeout(&mut child);

        // Forked processes may still hold the pipes; never wait on them indefinitely.
        let drain_deadline = Instant::now() + DRAIN_GRACE;
        let mut diagnostics = collect_capture(stdout, drain_deadline);
        diagnostics.push_str(&collect_capture(stderr, drain_deadline));
        self.write_log(&diagnostics);

        let status = status?;
        debug!(
            "{} finished in {:.2}s with {}",
            self.program,
            start_time.elapsed().as_secs_f64(),
            status
        );

        if !status.success() {
            return Err(ToolError::Failed {
                tool: self.program.clone(),
                status: status.code(),
                diagnostics,
            });
        }

        if !expected_output.exists() {
            return Err(ToolError::MissingOutput {
                tool: self.program.clone(),
                path: expected_output.to_path_buf(),
            });
        }

        Ok(ToolOutput {
            produced: expected_output.to_path_buf(),
            diagnostics,
        })
    }

    fn wait_with_timeout(&self, child: &mut Child) -> Result<ExitStatus, ToolError> {
        let deadline = Instant::now() + self.timeout;
        loop {
            match child.try_wait() {
                Ok(Some(status)) => return Ok(status),
                Ok(None) if Instant::now() >= deadline => {
                    warn!("{} timed out after {:?}, killing", self.program, self.timeout);
                    kill_process_group(child);
                    let _ = child.kill();
                    let _ = child.wait();
                    return Err(ToolError::TimedOut {
                        tool: self.program.clone(),
                        timeout: self.timeout,
                    });
                }
                Ok(None) => thread::sleep(POLL_INTERVAL),
                Err(source) => {
                    let _ = child.kill();
                    return Err(ToolError::Spawn {
                        tool: self.program.clone(),
                        source,
                    });
                }
            }
        }
    }

    fn child_path(&self) -> Option<OsString> {
        let tool_path = self.tool_path.as_ref()?;
        let inherited = std::env::var_os("PATH").unwrap_or_default();
        let paths = std::iter::once(tool_path.clone()).chain(std::env::split_paths(&inherited));
        match std::env::join_paths(paths) {
            Ok(joined) => Some(joined),
            Err(err) => {
                warn!("Ignoring tool path {}: {}", tool_path.display(), err);
                None
            }
        }
    }

    fn write_log(&self, diagnostics: &str) {
        if let Some(log_path) = &self.log_path {
            if let Err(err) = std::fs::write(log_path, diagnostics) {
                warn!("Failed to write {}: {}", log_path.display(), err);
            }
        }
    }
}

/// Kills every process in the tool's group. Best effort.
#[cfg(unix)]
fn kill_process_group(child: &Child) {
    let group = format!("-{}", child.id());
    match Command::new("kill")
        .args(["-KILL", "--", &group])
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
    {
        Ok(status) if status.success() => {}
        Ok(status) => debug!("kill {} exited with {}", group, status),
        Err(err) => debug!("Failed to run kill for group {}: {}", group, err),
    }
}

#[cfg(not(unix))]
fn kill_process_group(_child: &Child) {}

/// Drains a child pipe on its own thread while the parent polls for exit.
fn capture<R: Read + Send + 'static>(pipe: Option<R>) -> Option<mpsc::Receiver<String>> {
    pipe.map(|mut pipe| {
        let (sender, receiver) = mpsc::channel();
        thread::spawn(move || {
            let mut bytes = Vec::new();
            let _ = pipe.read_to_end(&mut bytes);
            let _ = sender.send(String::from_utf8_lossy(&bytes).into_owned());
        });
        receiver
    })
}

/// Captured text, or nothing if the pipe is still open at `deadline`.
fn collect_capture(receiver: Option<mpsc::Receiver<String>>, deadline: Instant) -> String {
    receiver
        .and_then(|r| {
            r.recv_timeout(deadline.saturating_duration_since(Instant::now()))
                .ok()
        })
        .unwrap_or_default()
}
