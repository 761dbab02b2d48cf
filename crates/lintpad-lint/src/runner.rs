//! Analysis runners: the seam between a session and the process that produces diagnostics.

use crate::config::{InputMode, ToolConfig};
use crate::error::AnalysisError;
use crate::parse::parse_output;
use crate::session::AnalysisRequest;
use lintpad_core::Diagnostic;
use std::io::{Read, Write};
use std::path::PathBuf;
use std::process::{Child, Command, Stdio};
use std::sync::Arc;
use std::sync::mpsc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::{Duration, Instant};

/// Default wall-clock budget of a single run.
pub const DEFAULT_ANALYSIS_TIMEOUT: Duration = Duration::from_secs(20);

const POLL_INTERVAL: Duration = Duration::from_millis(10);

/// Shared cancellation flag for one run.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    /// Create an untripped token.
    pub fn new() -> Self {
        Self::default()
    }

    /// Trip the token.
    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    /// `true` once [`CancelToken::cancel`] has been called on any clone.
    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Something that turns a document snapshot into diagnostics.
///
/// `run` is called on a worker thread and may block; it should return
/// [`AnalysisError::Cancelled`] promptly once `cancel` trips.
pub trait AnalysisRunner: Send + Sync {
    /// Short name for logs.
    fn name(&self) -> &str;

    /// Cheap synchronous availability check, made before a run is started.
    fn check_available(&self) -> Result<(), AnalysisError>;

    /// Analyze `request`.
    fn run(
        &self,
        request: &AnalysisRequest,
        cancel: &CancelToken,
    ) -> Result<Vec<Diagnostic>, AnalysisError>;
}

/// Runs an external program described by a [`ToolConfig`].
#[derive(Debug, Clone)]
pub struct ExternalTool {
    config: ToolConfig,
    timeout: Duration,
}

impl ExternalTool {
    /// Create a runner with the default timeout.
    pub fn new(config: ToolConfig) -> Self {
        Self {
            config,
            timeout: DEFAULT_ANALYSIS_TIMEOUT,
        }
    }

    /// Override the process timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// The tool description.
    pub fn config(&self) -> &ToolConfig {
        &self.config
    }

    fn resolve_program(&self) -> Result<PathBuf, AnalysisError> {
        which::which(&self.config.program).map_err(|error| {
            AnalysisError::Unavailable(format!("{}: {error}", self.config.program))
        })
    }

    fn spawn(
        &self,
        program: PathBuf,
        request: &AnalysisRequest,
    ) -> Result<(Child, Option<tempfile::NamedTempFile>), AnalysisError> {
        let (input_file, file_arg) = match self.config.input {
            InputMode::TempFile => {
                let mut file = tempfile::Builder::new()
                    .prefix("lintpad-")
                    .suffix(self.config.file_suffix.as_deref().unwrap_or(""))
                    .tempfile()?;
                file.write_all(request.text.as_bytes())?;
                file.flush()?;
                let path = file.path().display().to_string();
                (Some(file), path)
            }
            InputMode::Stdin => (None, String::new()),
        };

        let mut command = Command::new(program);
        command
            .args(self.config.expand_args(&file_arg, &request.language))
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .stdin(match self.config.input {
                InputMode::Stdin => Stdio::piped(),
                InputMode::TempFile => Stdio::null(),
            });
        let mut child = command.spawn().map_err(|error| {
            AnalysisError::Unavailable(format!("{}: {error}", self.config.program))
        })?;

        if let Some(mut stdin) = child.stdin.take() {
            let text = request.text.clone();
            thread::spawn(move || {
                if let Err(error) = stdin.write_all(text.as_bytes()) {
                    tracing::debug!(%error, "tool closed stdin early");
                }
            });
        }
        Ok((child, input_file))
    }
}

/// Read `pipe` to the end on a helper thread; the text arrives on the returned channel.
fn drain<R: Read + Send + 'static>(pipe: Option<R>) -> mpsc::Receiver<String> {
    let (tx, rx) = mpsc::channel();
    thread::spawn(move || {
        let mut output = String::new();
        if let Some(mut pipe) = pipe {
            let mut bytes = Vec::new();
            if pipe.read_to_end(&mut bytes).is_ok() {
                output = String::from_utf8_lossy(&bytes).into_owned();
            }
        }
        // The run may have given up on this pipe already.
        let _ = tx.send(output);
    });
    rx
}

/// Wait for a drained pipe until `deadline`.
///
/// A pipe stays open after the tool exits if a process it spawned inherited it; `None` then.
fn collect(pipe: &mpsc::Receiver<String>, deadline: Instant) -> Option<String> {
    match pipe.recv_timeout(deadline.saturating_duration_since(Instant::now())) {
        Ok(output) => Some(output),
        Err(mpsc::RecvTimeoutError::Disconnected) => Some(String::new()),
        Err(mpsc::RecvTimeoutError::Timeout) => None,
    }
}

fn stop(child: &mut Child) {
    if let Err(error) = child.kill() {
        tracing::debug!(%error, "kill failed; process already exited");
    }
    if let Err(error) = child.wait() {
        tracing::debug!(%error, "wait after kill failed");
    }
}

/// Reject runs that exited non-zero without producing any output.
///
/// Accepted non-zero codes carry findings on stdout; an empty stdout means the tool itself
/// failed, e.g. `python -m pylint` without the module installed.
fn check_silent_failure(
    code: Option<i32>,
    stdout: &str,
    stderr: &str,
) -> Result<(), AnalysisError> {
    if code == Some(0) || !stdout.trim().is_empty() {
        return Ok(());
    }
    let stderr = stderr.trim();
    if stderr.contains("No module named") || stderr.contains("command not found") {
        let reason = stderr.lines().last().unwrap_or(stderr);
        return Err(AnalysisError::Unavailable(reason.to_string()));
    }
    Err(AnalysisError::UnexpectedExit {
        code,
        stderr: stderr.to_string(),
    })
}

impl AnalysisRunner for ExternalTool {
    fn name(&self) -> &str {
        &self.config.program
    }

    fn check_available(&self) -> Result<(), AnalysisError> {
        self.resolve_program().map(|_| ())
    }

    fn run(
        &self,
        request: &AnalysisRequest,
        cancel: &CancelToken,
    ) -> Result<Vec<Diagnostic>, AnalysisError> {
        let program = self.resolve_program()?;
        let (mut child, _input_file) = self.spawn(program, request)?;
        let stdout = drain(child.stdout.take());
        let stderr = drain(child.stderr.take());

        let deadline = Instant::now() + self.timeout;
        let status = loop {
            if cancel.is_cancelled() {
                stop(&mut child);
                return Err(AnalysisError::Cancelled);
            }
            if let Some(status) = child.try_wait()? {
                break status;
            }
            if Instant::now() >= deadline {
                tracing::warn!(
                    tool = self.name(),
                    version = request.version,
                    "analysis tool timed out; killing"
                );
                stop(&mut child);
                return Err(AnalysisError::Timeout(self.timeout));
            }
            thread::sleep(POLL_INTERVAL);
        };

        let output = (collect(&stdout, deadline), collect(&stderr, deadline));
        let (Some(stdout), Some(stderr)) = output else {
            tracing::warn!(
                tool = self.name(),
                version = request.version,
                "tool exited but its output pipes stayed open"
            );
            return Err(AnalysisError::Timeout(self.timeout));
        };
        if !self.config.accepts_exit(status.code()) {
            return Err(AnalysisError::UnexpectedExit {
                code: status.code(),
                stderr: stderr.trim().to_string(),
            });
        }
        check_silent_failure(status.code(), &stdout, &stderr)?;

        let line_count = request.text.split('\n').count();
        parse_output(
            self.config.output,
            self.config.column_base,
            &stdout,
            line_count,
        )
    }
}
