//! Per-buffer analysis session.
//!
//! The session owns at most one in-flight run. Runs execute on a worker thread and report back
//! over a channel; [`DiagnosticsSession::poll`] drains that channel without blocking and
//! enforces the run deadline. Results are matched to runs by [`AnalysisHandle`], so the output
//! of a superseded or cancelled run is dropped on arrival.
//!
//! ```text
//! Idle --request--> Running --result--> Completed
//!                      |  \--error/timeout--> Failed
//!                      \--cancel/request--> Cancelled
//! ```

use crate::error::AnalysisError;
use crate::runner::{AnalysisRunner, CancelToken, DEFAULT_ANALYSIS_TIMEOUT};
use lintpad_core::{Diagnostic, Snapshot};
use std::fmt;
use std::sync::Arc;
use std::sync::mpsc;
use std::thread;
use std::time::{Duration, Instant};

/// Input of one analysis run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnalysisRequest {
    /// Buffer version the text belongs to.
    pub version: u64,
    /// Full document text.
    pub text: String,
    /// Language identifier.
    pub language: String,
}

impl AnalysisRequest {
    /// Build a request from a buffer snapshot.
    pub fn from_snapshot(snapshot: Snapshot, language: impl Into<String>) -> Self {
        Self {
            version: snapshot.version,
            text: snapshot.text,
            language: language.into(),
        }
    }
}

/// Identity of one requested run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct AnalysisHandle(u64);

impl AnalysisHandle {
    /// Raw id.
    pub fn id(self) -> u64 {
        self.0
    }
}

impl fmt::Display for AnalysisHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Session state.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum SessionState {
    /// No run requested yet.
    #[default]
    Idle,
    /// A run is in flight.
    Running {
        /// Run handle.
        handle: AnalysisHandle,
        /// Version being analyzed.
        version: u64,
    },
    /// The last run finished.
    Completed {
        /// Run handle.
        handle: AnalysisHandle,
        /// Version that was analyzed.
        version: u64,
    },
    /// The last run failed.
    Failed {
        /// Run handle.
        handle: AnalysisHandle,
        /// Failure reason.
        error: AnalysisError,
    },
    /// The last run was cancelled.
    Cancelled {
        /// Run handle.
        handle: AnalysisHandle,
    },
}

impl SessionState {
    /// `true` while a run is in flight.
    pub fn is_running(&self) -> bool {
        matches!(self, Self::Running { .. })
    }
}

/// Outcome of a run, delivered by [`DiagnosticsSession::poll`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    /// The run finished.
    Completed {
        /// Run handle.
        handle: AnalysisHandle,
        /// Version the diagnostics refer to.
        version: u64,
        /// Diagnostics, in tool order.
        diagnostics: Vec<Diagnostic>,
    },
    /// The run failed; previously delivered diagnostics remain valid.
    Failed {
        /// Run handle.
        handle: AnalysisHandle,
        /// Version that was being analyzed.
        version: u64,
        /// Failure reason.
        error: AnalysisError,
    },
}

struct WorkerMessage {
    handle: AnalysisHandle,
    version: u64,
    result: Result<Vec<Diagnostic>, AnalysisError>,
}

struct InFlight {
    handle: AnalysisHandle,
    version: u64,
    cancel: CancelToken,
    deadline: Instant,
}

/// Analysis session for one buffer.
pub struct DiagnosticsSession {
    runner: Arc<dyn AnalysisRunner>,
    timeout: Duration,
    next_handle: u64,
    current: Option<InFlight>,
    state: SessionState,
    pending: Vec<SessionEvent>,
    tx: mpsc::Sender<WorkerMessage>,
    rx: mpsc::Receiver<WorkerMessage>,
}

impl fmt::Debug for DiagnosticsSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DiagnosticsSession")
            .field("runner", &self.runner.name())
            .field("timeout", &self.timeout)
            .field("state", &self.state)
            .finish_non_exhaustive()
    }
}

impl DiagnosticsSession {
    /// Create a session with the default timeout.
    pub fn new(runner: Arc<dyn AnalysisRunner>) -> Self {
        let (tx, rx) = mpsc::channel();
        Self {
            runner,
            timeout: DEFAULT_ANALYSIS_TIMEOUT,
            next_handle: 1,
            current: None,
            state: SessionState::Idle,
            pending: Vec::new(),
            tx,
            rx,
        }
    }

    /// Override the run deadline.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Current state.
    pub fn state(&self) -> &SessionState {
        &self.state
    }

    /// Handle of the in-flight run, if any.
    pub fn in_flight(&self) -> Option<AnalysisHandle> {
        self.current.as_ref().map(|run| run.handle)
    }

    /// Start analyzing `request`, superseding any run in flight.
    ///
    /// A tool that is not available fails the run immediately: the state is `Failed` when this
    /// returns and the failure is delivered by the next [`DiagnosticsSession::poll`].
    pub fn request(&mut self, request: AnalysisRequest) -> AnalysisHandle {
        if let Some(previous) = self.current.take() {
            tracing::debug!(handle = %previous.handle, "superseding in-flight analysis");
            previous.cancel.cancel();
        }

        let handle = AnalysisHandle(self.next_handle);
        self.next_handle += 1;
        let version = request.version;

        if let Err(error) = self.runner.check_available() {
            self.fail(handle, version, error);
            return handle;
        }

        let cancel = CancelToken::new();
        let runner = Arc::clone(&self.runner);
        let tx = self.tx.clone();
        let token = cancel.clone();
        let spawned = thread::Builder::new()
            .name(format!("lintpad-analysis-{}", handle.0))
            .spawn(move || {
                let result = runner.run(&request, &token);
                // The session may have been dropped; nobody is waiting then.
                let _ = tx.send(WorkerMessage {
                    handle,
                    version,
                    result,
                });
            });
        if let Err(error) = spawned {
            self.fail(handle, version, error.into());
            return handle;
        }

        tracing::debug!(
            %handle,
            version,
            runner = self.runner.name(),
            "analysis started"
        );
        self.current = Some(InFlight {
            handle,
            version,
            cancel,
            deadline: Instant::now() + self.timeout,
        });
        self.state = SessionState::Running { handle, version };
        handle
    }

    /// Cancel `handle` if it is the run in flight. Returns `false` otherwise.
    pub fn cancel(&mut self, handle: AnalysisHandle) -> bool {
        match self.current.take() {
            Some(run) if run.handle == handle => {
                run.cancel.cancel();
                self.state = SessionState::Cancelled { handle };
                tracing::debug!(%handle, "analysis cancelled");
                true
            }
            other => {
                self.current = other;
                false
            }
        }
    }

    /// Collect finished runs and enforce the deadline. Never blocks.
    pub fn poll(&mut self) -> Vec<SessionEvent> {
        let mut events = std::mem::take(&mut self.pending);
        while let Ok(message) = self.rx.try_recv() {
            events.extend(self.accept(message));
        }
        events.extend(self.check_deadline());
        events
    }

    /// Block until an event is available or `timeout` elapses.
    pub fn wait(&mut self, timeout: Duration) -> Vec<SessionEvent> {
        let deadline = Instant::now() + timeout;
        loop {
            let events = self.poll();
            let now = Instant::now();
            if !events.is_empty() || now >= deadline || self.current.is_none() {
                return events;
            }
            let slice = (deadline - now).min(Duration::from_millis(10));
            if let Ok(message) = self.rx.recv_timeout(slice)
                && let Some(event) = self.accept(message)
            {
                return vec![event];
            }
        }
    }

    fn accept(&mut self, message: WorkerMessage) -> Option<SessionEvent> {
        let current = self
            .current
            .as_ref()
            .is_some_and(|run| run.handle == message.handle);
        if !current {
            tracing::debug!(handle = %message.handle, "discarding result of superseded analysis");
            return None;
        }
        self.current = None;

        match message.result {
            Ok(diagnostics) => {
                tracing::debug!(
                    handle = %message.handle,
                    version = message.version,
                    count = diagnostics.len(),
                    "analysis completed"
                );
                self.state = SessionState::Completed {
                    handle: message.handle,
                    version: message.version,
                };
                Some(SessionEvent::Completed {
                    handle: message.handle,
                    version: message.version,
                    diagnostics,
                })
            }
            Err(error) => {
                tracing::warn!(handle = %message.handle, version = message.version, %error, "analysis failed");
                self.state = SessionState::Failed {
                    handle: message.handle,
                    error: error.clone(),
                };
                Some(SessionEvent::Failed {
                    handle: message.handle,
                    version: message.version,
                    error,
                })
            }
        }
    }

    fn check_deadline(&mut self) -> Option<SessionEvent> {
        let expired = self
            .current
            .as_ref()
            .is_some_and(|run| Instant::now() >= run.deadline);
        if !expired {
            return None;
        }
        let run = self.current.take()?;
        run.cancel.cancel();
        let error = AnalysisError::Timeout(self.timeout);
        tracing::warn!(handle = %run.handle, version = run.version, "analysis deadline passed");
        self.state = SessionState::Failed {
            handle: run.handle,
            error: error.clone(),
        };
        Some(SessionEvent::Failed {
            handle: run.handle,
            version: run.version,
            error,
        })
    }

    fn fail(&mut self, handle: AnalysisHandle, version: u64, error: AnalysisError) {
        tracing::warn!(%handle, version, %error, "analysis could not start");
        self.state = SessionState::Failed {
            handle,
            error: error.clone(),
        };
        self.pending.push(SessionEvent::Failed {
            handle,
            version,
            error,
        });
    }
}

impl Drop for DiagnosticsSession {
    fn drop(&mut self) {
        if let Some(run) = self.current.take() {
            run.cancel.cancel();
        }
    }
}
