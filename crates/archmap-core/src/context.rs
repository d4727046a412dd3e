//! Per-run state threaded through every stage: warnings, the stage-tagged
//! user log, progress reporting and cancellation.

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use archmap_model::{DataWarning, Stage};
use chrono::{DateTime, Local};
use serde::Serialize;
use tracing::{info, warn};

/// Shared cancellation flag, checked between stages.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Progress notification for the host.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Progress {
    pub stage: Stage,
    /// 1-based stage position within a full run; `None` for standalone operations.
    pub position: Option<usize>,
    pub total: usize,
    /// Item count reported by the stage, when it has one.
    pub count: Option<usize>,
    pub message: String,
}

pub type ProgressCallback = Box<dyn FnMut(&Progress)>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Info,
    Notice,
    Warning,
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Info => "INFO",
            Self::Notice => "NOTICE",
            Self::Warning => "WARN",
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct LogEntry {
    pub timestamp: DateTime<Local>,
    pub stage: Stage,
    pub level: LogLevel,
    pub message: String,
}

impl fmt::Display for LogEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}] {:<6} [{}] {}",
            self.timestamp.format("%H:%M:%S"),
            self.level,
            self.stage,
            self.message
        )
    }
}

/// Mutable run state. Every stage receives it by `&mut`.
pub struct RunContext {
    stage: Stage,
    cancel: CancelToken,
    progress: Option<ProgressCallback>,
    warnings: Vec<DataWarning>,
    log: Vec<LogEntry>,
}

impl fmt::Debug for RunContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RunContext")
            .field("stage", &self.stage)
            .field("cancelled", &self.cancel.is_cancelled())
            .field("warnings", &self.warnings.len())
            .field("log", &self.log.len())
            .finish()
    }
}

impl Default for RunContext {
    fn default() -> Self {
        Self::new()
    }
}

impl RunContext {
    pub fn new() -> Self {
        Self {
            stage: Stage::Setup,
            cancel: CancelToken::new(),
            progress: None,
            warnings: Vec::new(),
            log: Vec::new(),
        }
    }

    pub fn with_cancel(mut self, cancel: CancelToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn with_progress(mut self, callback: impl FnMut(&Progress) + 'static) -> Self {
        self.progress = Some(Box::new(callback));
        self
    }

    pub fn stage(&self) -> Stage {
        self.stage
    }

    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Marks the start of a stage and notifies progress.
    pub fn enter(&mut self, stage: Stage) {
        self.stage = stage;
        info!(stage = %stage, "stage started");
        self.report(None, format!("{stage} started"));
    }

    /// Reports an item count for the current stage.
    pub fn count(&mut self, count: usize, message: impl Into<String>) {
        let message = message.into();
        self.push(LogLevel::Info, message.clone());
        self.report(Some(count), message);
    }

    pub fn info(&mut self, message: impl Into<String>) {
        let message = message.into();
        info!(stage = %self.stage, "{message}");
        self.push(LogLevel::Info, message);
    }

    /// Non-fatal condition that is not a data problem, e.g. an empty result.
    pub fn notice(&mut self, message: impl Into<String>) {
        let message = message.into();
        info!(stage = %self.stage, notice = true, "{message}");
        self.push(LogLevel::Notice, message);
    }

    /// Records a recoverable data problem.
    pub fn warn(&mut self, warning: DataWarning) {
        warn!(stage = %self.stage, "{warning}");
        self.push(LogLevel::Warning, warning.to_string());
        self.warnings.push(warning);
    }

    pub fn warn_opt(&mut self, warning: Option<DataWarning>) {
        if let Some(warning) = warning {
            self.warn(warning);
        }
    }

    pub fn warnings(&self) -> &[DataWarning] {
        &self.warnings
    }

    pub fn log(&self) -> &[LogEntry] {
        &self.log
    }

    /// The user log as text, one entry per line.
    pub fn render_log(&self) -> String {
        let mut out = String::new();
        for entry in &self.log {
            out.push_str(&entry.to_string());
            out.push('\n');
        }
        out
    }

    fn push(&mut self, level: LogLevel, message: String) {
        self.log.push(LogEntry {
            timestamp: Local::now(),
            stage: self.stage,
            level,
            message,
        });
    }

    fn report(&mut self, count: Option<usize>, message: String) {
        let stage = self.stage;
        if let Some(callback) = self.progress.as_mut() {
            callback(&Progress {
                stage,
                position: stage.position(),
                total: Stage::RUN.len(),
                count,
                message,
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::rc::Rc;

    use super::*;

    #[test]
    fn warnings_are_logged_with_stage() {
        let mut ctx = RunContext::new();
        ctx.enter(Stage::Dissolve);
        ctx.warn(DataWarning::DissolveSkipped {
            layer: "merged".to_string(),
        });
        assert_eq!(ctx.warnings().len(), 1);
        let entry = &ctx.log()[0];
        assert_eq!(entry.stage, Stage::Dissolve);
        assert_eq!(entry.level, LogLevel::Warning);
        assert!(ctx.render_log().contains("[dissolve]"));
    }

    #[test]
    fn progress_reports_stage_position() {
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&seen);
        let mut ctx = RunContext::new().with_progress(move |p| sink.borrow_mut().push(p.clone()));
        ctx.enter(Stage::Extent);
        ctx.count(3, "3 sites");
        let seen = seen.borrow();
        assert_eq!(seen.len(), 2);
        assert_eq!(seen[0].position, Some(4));
        assert_eq!(seen[1].count, Some(3));
    }

    #[test]
    fn cancel_token_is_shared() {
        let ctx = RunContext::new();
        let token = ctx.cancel_token();
        token.cancel();
        assert!(ctx.is_cancelled());
    }
}
