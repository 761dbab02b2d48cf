#![warn(missing_docs)]
//! lintpad - a headless coordinator for a lint-aware text editor.
//!
//! `lintpad` owns one document and keeps three things consistent with it: the syntax token
//! cache, the diagnostics reported by an external analyzer, and the per-line render models the
//! view paints. The view layer forwards events ([`Coordinator::on_edit`],
//! [`Coordinator::on_hover_at`], ...) and drives [`Coordinator::tick`] from its event loop; the
//! coordinator answers with [`Notification`]s.
//!
//! # Overview
//!
//! - Edits rescan only the lines whose text or incoming highlighter state changed.
//! - Diagnostics follow edits: lines above an edit keep their markers, lines below shift, and
//!   markers on edited text are kept but flagged stale until the next analysis.
//! - Analysis starts after a quiet period ([`LintpadConfig::debounce_ms`]) and runs off the
//!   calling thread; results that arrive after further edits are remapped before they are shown.
//!
//! ```rust
//! use lintpad::{Coordinator, LintpadConfig, Notification};
//! use lintpad_core::Position;
//! use std::sync::{Arc, Mutex};
//!
//! let mut coordinator = Coordinator::new(LintpadConfig::default());
//! let repainted = Arc::new(Mutex::new(Vec::new()));
//! let sink = Arc::clone(&repainted);
//! coordinator.subscribe(move |notification| {
//!     if let Notification::RenderLineChanged { line, .. } = notification {
//!         sink.lock().unwrap().push(*line);
//!     }
//! });
//!
//! coordinator.on_document_opened("{\"a\": 1}\n", "json").unwrap();
//! repainted.lock().unwrap().clear();
//!
//! coordinator.on_edit(Position::new(0, 8), ",", None).unwrap();
//! assert_eq!(*repainted.lock().unwrap(), vec![0]);
//! ```

pub mod clock;
pub mod config;
pub mod coordinator;
pub mod error;

pub use clock::{Clock, ManualClock, SystemClock};
pub use config::{ConfigError, LintpadConfig};
pub use coordinator::{Coordinator, DiagnosticsStatus, Notification, NotificationCallback};
pub use error::CoordinatorError;
