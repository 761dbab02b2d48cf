//! Event-driven coordinator.
//!
//! The coordinator is the single owner of a document's buffer, token cache and diagnostics. The
//! host forwards view events into it and calls [`Coordinator::tick`] from its event loop; the
//! coordinator answers through subscribed callbacks with [`Notification`]s.
//!
//! Edit flow:
//!
//! ```text
//! on_edit -> Buffer::replace -> Highlighter::retokenize_affected -> DiagnosticSet::remap_through
//!         -> rebuild dirty visible RenderLines -> publish -> reset debounce deadline
//! tick    -> debounce expired? request analysis
//!         -> session completed? remap result through the edit log, replace, publish
//! ```

use crate::clock::{Clock, SystemClock};
use crate::config::LintpadConfig;
use crate::error::CoordinatorError;
use lintpad_core::{
    Buffer, Diagnostic, DiagnosticSet, Edit, EditLog, Position, Range, RenderLine, Theme,
    diagnostics_at,
};
use lintpad_highlight::{Grammar, Highlighter};
use lintpad_lint::{
    AnalysisError, AnalysisRequest, AnalysisRunner, DiagnosticsSession, ExternalTool,
    SessionEvent,
};
use std::collections::{BTreeMap, BTreeSet};
use std::ops;
use std::sync::Arc;
use std::time::Instant;

/// Analysis status reported to the host.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum DiagnosticsStatus {
    /// No analysis running.
    #[default]
    Idle,
    /// An analysis run is in flight.
    Running,
    /// The last run failed; previously published diagnostics are still shown.
    Failed(AnalysisError),
}

/// Messages from the coordinator to the view layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notification {
    /// A visible line must be repainted.
    RenderLineChanged {
        /// Line index.
        line: usize,
        /// The complete render model of the line.
        model: Arc<RenderLine>,
    },
    /// The analysis status changed.
    DiagnosticsStatusChanged(DiagnosticsStatus),
    /// Answer to [`Coordinator::on_hover_at`].
    HoverResult {
        /// Hovered line.
        line: usize,
        /// Hovered column.
        column: usize,
        /// Diagnostics under the pointer, in display order.
        diagnostics: Vec<Diagnostic>,
    },
}

/// Notification callback.
pub type NotificationCallback = Box<dyn FnMut(&Notification) + Send>;

type RunnerFactory = Box<dyn Fn(&str) -> Option<Arc<dyn AnalysisRunner>> + Send>;

struct Document {
    buffer: Buffer,
    language: String,
    highlighter: Highlighter,
    diagnostics: DiagnosticSet,
    log: EditLog,
    session: Option<DiagnosticsSession>,
    render_cache: BTreeMap<usize, Arc<RenderLine>>,
    analysis_due: Option<Instant>,
    in_flight_version: Option<u64>,
}

impl Document {
    fn render_line(
        &mut self,
        line: usize,
        theme: &Theme,
    ) -> Result<Arc<RenderLine>, CoordinatorError> {
        if let Some(model) = self.render_cache.get(&line) {
            return Ok(Arc::clone(model));
        }
        let text = self.buffer.line_text(line)?;
        let diagnostics: Vec<Diagnostic> = self.diagnostics.on_line(line).cloned().collect();
        let model = Arc::new(RenderLine::build(
            line,
            &text,
            self.highlighter.spans(line),
            &diagnostics,
            theme,
            self.buffer.version(),
        ));
        self.render_cache.insert(line, Arc::clone(&model));
        Ok(model)
    }

    fn prune_log(&mut self) {
        let keep_from = self
            .in_flight_version
            .unwrap_or(self.buffer.version())
            .min(self.diagnostics.version());
        self.log.prune_before(keep_from);
    }
}

/// Coordinates one open document.
pub struct Coordinator {
    config: LintpadConfig,
    clock: Box<dyn Clock>,
    theme: Theme,
    runners: RunnerFactory,
    document: Option<Document>,
    visible: ops::Range<usize>,
    status: DiagnosticsStatus,
    callbacks: Vec<NotificationCallback>,
}

impl std::fmt::Debug for Coordinator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Coordinator")
            .field("config", &self.config)
            .field("visible", &self.visible)
            .field("status", &self.status)
            .field("version", &self.version())
            .finish_non_exhaustive()
    }
}

impl Coordinator {
    /// Create a coordinator that runs the tools named by `config`.
    pub fn new(config: LintpadConfig) -> Self {
        let tools = config.clone();
        let timeout = config.analysis_timeout();
        let runners: RunnerFactory = Box::new(move |language| {
            tools.tool_for(language).map(|tool| {
                Arc::new(ExternalTool::new(tool).with_timeout(timeout)) as Arc<dyn AnalysisRunner>
            })
        });
        Self {
            visible: 0..config.visible_lines,
            config,
            clock: Box::new(SystemClock),
            theme: Theme::default(),
            runners,
            document: None,
            status: DiagnosticsStatus::Idle,
            callbacks: Vec::new(),
        }
    }

    /// Use `clock` for debouncing.
    pub fn with_clock(mut self, clock: impl Clock + 'static) -> Self {
        self.clock = Box::new(clock);
        self
    }

    /// Analyze every language with `runner` instead of the configured tools.
    pub fn with_runner(mut self, runner: Arc<dyn AnalysisRunner>) -> Self {
        self.runners = Box::new(move |_| Some(Arc::clone(&runner)));
        self
    }

    /// Start with `theme` instead of the built-in one.
    pub fn with_theme(mut self, theme: Theme) -> Self {
        self.theme = theme;
        self
    }

    /// Subscribe to notifications.
    pub fn subscribe<F>(&mut self, callback: F)
    where
        F: FnMut(&Notification) + Send + 'static,
    {
        self.callbacks.push(Box::new(callback));
    }

    /// Configuration in use.
    pub fn config(&self) -> &LintpadConfig {
        &self.config
    }

    /// Current theme.
    pub fn theme(&self) -> &Theme {
        &self.theme
    }

    /// Current analysis status.
    pub fn status(&self) -> &DiagnosticsStatus {
        &self.status
    }

    /// Visible line range.
    pub fn visible_lines(&self) -> ops::Range<usize> {
        self.visible.clone()
    }

    /// Buffer version of the open document.
    pub fn version(&self) -> Option<u64> {
        self.document.as_ref().map(|doc| doc.buffer.version())
    }

    /// The open document's buffer.
    pub fn buffer(&self) -> Option<&Buffer> {
        self.document.as_ref().map(|doc| &doc.buffer)
    }

    /// The open document's token cache.
    pub fn highlighter(&self) -> Option<&Highlighter> {
        self.document.as_ref().map(|doc| &doc.highlighter)
    }

    /// Diagnostics of the open document, remapped to the current version.
    pub fn diagnostics(&self) -> Option<&DiagnosticSet> {
        self.document.as_ref().map(|doc| &doc.diagnostics)
    }

    /// Language of the open document.
    pub fn language(&self) -> Option<&str> {
        self.document.as_ref().map(|doc| doc.language.as_str())
    }

    /// Screen column of `position`, using the configured tab width.
    pub fn display_column(&self, position: Position) -> Result<usize, CoordinatorError> {
        let doc = self.document.as_ref().ok_or(CoordinatorError::NoDocument)?;
        Ok(doc.buffer.display_column(position, self.config.tab_width)?)
    }

    /// Render model of `line`, built on demand.
    pub fn render_line(&mut self, line: usize) -> Result<Arc<RenderLine>, CoordinatorError> {
        let doc = self.document.as_mut().ok_or(CoordinatorError::NoDocument)?;
        doc.render_line(line, &self.theme)
    }

    /// Open a document, replacing any open one.
    pub fn on_document_opened(
        &mut self,
        content: &str,
        language: &str,
    ) -> Result<(), CoordinatorError> {
        if self.document.is_some() {
            self.on_document_closed();
        }

        let buffer = Buffer::from_text(content);
        let mut highlighter = Highlighter::new(Grammar::for_language(language)?);
        highlighter.rebuild(&buffer)?;
        let session = (self.runners)(language).map(|runner| {
            DiagnosticsSession::new(runner).with_timeout(self.config.analysis_timeout())
        });
        if session.is_none() {
            tracing::debug!(language, "no analysis tool configured");
        }

        let analysis_due = session.as_ref().map(|_| self.clock.now() + self.config.debounce());
        self.document = Some(Document {
            diagnostics: DiagnosticSet::new(buffer.version(), Vec::new()),
            buffer,
            language: language.to_string(),
            highlighter,
            log: EditLog::new(),
            session,
            render_cache: BTreeMap::new(),
            analysis_due,
            in_flight_version: None,
        });
        tracing::debug!(language, "document opened");

        let lines: BTreeSet<usize> = self.visible_document_lines().collect();
        self.publish_lines(&lines)
    }

    /// Apply an edit: delete `deleted_range` (if any, it must start at `position`) and insert
    /// `inserted_text` at `position`.
    ///
    /// Returns the edit record; its `version_after` is the new buffer version.
    pub fn on_edit(
        &mut self,
        position: Position,
        inserted_text: &str,
        deleted_range: Option<Range>,
    ) -> Result<Edit, CoordinatorError> {
        let range = match deleted_range {
            Some(range) if range.start != position => {
                return Err(CoordinatorError::EditMismatch { position, range });
            }
            Some(range) => range,
            None => Range::new(position, position),
        };

        let now = self.clock.now();
        let debounce = self.config.debounce();
        let doc = self.document.as_mut().ok_or(CoordinatorError::NoDocument)?;

        let edit = doc.buffer.replace(range, inserted_text)?;
        let mut dirty = doc.highlighter.retokenize_affected(&doc.buffer, &edit)?;
        let summary = doc.diagnostics.remap_through(&edit);
        if summary.is_changed() {
            tracing::debug!(
                version = edit.version_after,
                shifted = summary.shifted,
                stale = summary.stale,
                dropped = summary.dropped,
                "diagnostics remapped"
            );
        }
        doc.log.push(edit.clone());

        if edit.line_delta() != 0 {
            doc.render_cache.retain(|&line, _| line < edit.start.line);
            let visible = clamp_lines(&self.visible, doc.buffer.line_count());
            dirty.extend(visible.start.max(edit.start.line)..visible.end);
        } else {
            for line in &dirty {
                doc.render_cache.remove(line);
            }
        }
        if doc.session.is_some() {
            doc.analysis_due = Some(now + debounce);
        }
        doc.prune_log();

        self.publish_lines(&dirty)?;
        Ok(edit)
    }

    /// Diagnostics under (`line`, `column`); also published as [`Notification::HoverResult`].
    pub fn on_hover_at(&mut self, line: usize, column: usize) -> Vec<Diagnostic> {
        let diagnostics = self
            .document
            .as_ref()
            .map(|doc| {
                diagnostics_at(
                    doc.diagnostics.items(),
                    doc.highlighter.spans(line),
                    line,
                    column,
                )
            })
            .unwrap_or_default();
        self.notify(&Notification::HoverResult {
            line,
            column,
            diagnostics: diagnostics.clone(),
        });
        diagnostics
    }

    /// Switch themes. Cached lines are restyled without retokenizing; visible lines are
    /// republished.
    pub fn on_theme_changed(&mut self, theme: Theme) -> Result<(), CoordinatorError> {
        self.theme = theme;
        if let Some(doc) = self.document.as_mut() {
            for model in doc.render_cache.values_mut() {
                *model = Arc::new(model.restyled(&self.theme));
            }
        }
        let lines: BTreeSet<usize> = self.visible_document_lines().collect();
        self.publish_lines(&lines)
    }

    /// Load a JSON theme file and switch to it.
    pub fn load_theme(
        &mut self,
        path: impl AsRef<std::path::Path>,
    ) -> Result<(), CoordinatorError> {
        let theme = Theme::from_path(path)?;
        tracing::debug!(theme = theme.name(), "theme loaded");
        self.on_theme_changed(theme)
    }

    /// Close the document, cancelling any analysis in flight.
    pub fn on_document_closed(&mut self) {
        if let Some(mut doc) = self.document.take()
            && let Some(session) = doc.session.as_mut()
            && let Some(handle) = session.in_flight()
        {
            session.cancel(handle);
        }
        self.set_status(DiagnosticsStatus::Idle, false);
        tracing::debug!("document closed");
    }

    /// Change the visible line range; newly visible lines are published.
    pub fn set_visible_lines(&mut self, range: ops::Range<usize>) -> Result<(), CoordinatorError> {
        let previous = std::mem::replace(&mut self.visible, range);
        let lines: BTreeSet<usize> = self
            .visible_document_lines()
            .filter(|line| !previous.contains(line))
            .collect();
        self.publish_lines(&lines)
    }

    /// Drive the debounce timer and collect analysis results. Call from the host event loop.
    pub fn tick(&mut self) -> Result<(), CoordinatorError> {
        let now = self.clock.now();
        let Some(doc) = self.document.as_mut() else {
            return Ok(());
        };

        let mut started = false;
        if let Some(due) = doc.analysis_due
            && now >= due
            && let Some(session) = doc.session.as_mut()
        {
            doc.analysis_due = None;
            let request = AnalysisRequest::from_snapshot(doc.buffer.snapshot(), doc.language.clone());
            tracing::debug!(
                version = request.version,
                language = doc.language.as_str(),
                "debounce elapsed; requesting analysis"
            );
            doc.in_flight_version = Some(request.version);
            session.request(request);
            started = session.state().is_running();
        }

        let events = doc.session.as_mut().map(|s| s.poll()).unwrap_or_default();
        if started {
            self.set_status(DiagnosticsStatus::Running, false);
        }
        for event in events {
            self.handle_session_event(event)?;
        }
        Ok(())
    }

    fn handle_session_event(&mut self, event: SessionEvent) -> Result<(), CoordinatorError> {
        let Some(doc) = self.document.as_mut() else {
            return Ok(());
        };
        doc.in_flight_version = None;

        match event {
            SessionEvent::Completed {
                version,
                diagnostics,
                ..
            } => {
                let mut incoming = DiagnosticSet::new(version, diagnostics);
                let current = doc.buffer.version();
                let summary = doc.log.remap(&mut incoming, current);
                tracing::debug!(
                    analyzed = version,
                    current,
                    count = incoming.len(),
                    shifted = summary.shifted,
                    stale = summary.stale,
                    dropped = summary.dropped,
                    "analysis result delivered"
                );

                let mut dirty: BTreeSet<usize> = doc.diagnostics.lines().into_iter().collect();
                dirty.extend(incoming.lines());
                doc.diagnostics = incoming;
                for line in &dirty {
                    doc.render_cache.remove(line);
                }
                doc.prune_log();

                self.publish_lines(&dirty)?;
                self.set_status(DiagnosticsStatus::Idle, false);
            }
            SessionEvent::Failed { version, error, .. } => {
                tracing::warn!(version, %error, "analysis failed; keeping previous diagnostics");
                doc.prune_log();
                self.set_status(DiagnosticsStatus::Failed(error), true);
            }
        }
        Ok(())
    }

    /// Visible lines that exist in the open document.
    fn visible_document_lines(&self) -> ops::Range<usize> {
        let line_count = self.buffer().map_or(0, Buffer::line_count);
        clamp_lines(&self.visible, line_count)
    }

    /// Rebuild `lines` that are visible and exist, then publish them together.
    fn publish_lines(&mut self, lines: &BTreeSet<usize>) -> Result<(), CoordinatorError> {
        let Some(doc) = self.document.as_mut() else {
            return Ok(());
        };
        let line_count = doc.buffer.line_count();
        let mut models = Vec::new();
        for &line in lines {
            if line >= line_count || !self.visible.contains(&line) {
                continue;
            }
            models.push((line, doc.render_line(line, &self.theme)?));
        }
        for (line, model) in models {
            self.notify(&Notification::RenderLineChanged { line, model });
        }
        Ok(())
    }

    fn set_status(&mut self, status: DiagnosticsStatus, always: bool) {
        if !always && self.status == status {
            return;
        }
        self.status = status.clone();
        self.notify(&Notification::DiagnosticsStatusChanged(status));
    }

    fn notify(&mut self, notification: &Notification) {
        for callback in &mut self.callbacks {
            callback(notification);
        }
    }
}

fn clamp_lines(range: &ops::Range<usize>, line_count: usize) -> ops::Range<usize> {
    range.start.min(line_count)..range.end.min(line_count)
}
