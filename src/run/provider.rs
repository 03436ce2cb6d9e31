use std::sync::Mutex;

use thiserror::Error;

use crate::board::Board;
use crate::report::Violation;
use crate::rules::{ConstraintKind, DrcEngine};

use super::progress::ProgressReporter;

/// How a provider's scan ended. Cancellation is a normal outcome, not
/// an error; partial results up to the stop point are kept.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderStatus {
    Completed,
    Cancelled,
}

/// A provider hit something it cannot recover from. The run records
/// the failure and moves on to the next provider.
#[derive(Debug, Error)]
#[error("provider '{provider}' failed: {message}")]
pub struct ProviderError {
    pub provider: &'static str,
    pub message: String,
}

/// One self-contained check. Providers declare the constraint kinds
/// they resolve so the runner can skip scans nothing constrains.
pub trait TestProvider {
    fn name(&self) -> &'static str;

    fn consumed_kinds(&self) -> &'static [ConstraintKind];

    fn run(&self, ctx: &RunContext<'_>) -> Result<ProviderStatus, ProviderError>;
}

/// Shared state handed to every provider: the board, the resolver, the
/// progress observer, and the violation sink. Safe to use from worker
/// threads.
pub struct RunContext<'a> {
    pub board: &'a Board,
    pub engine: &'a DrcEngine,
    pub reporter: &'a dyn ProgressReporter,
    violations: Mutex<Vec<Violation>>,
}

impl<'a> RunContext<'a> {
    #[must_use]
    pub fn new(board: &'a Board, engine: &'a DrcEngine, reporter: &'a dyn ProgressReporter) -> Self {
        Self {
            board,
            engine,
            reporter,
            violations: Mutex::new(Vec::new()),
        }
    }

    /// Record a violation, subject to the per-kind error limit. Past
    /// the limit the hit is still counted but the record is dropped.
    pub fn report(&self, violation: Violation) {
        if self.engine.record_violation_kind(violation.kind) {
            if let Ok(mut sink) = self.violations.lock() {
                sink.push(violation);
            }
        }
    }

    /// Record a batch in one lock acquisition.
    pub fn report_all(&self, violations: impl IntoIterator<Item = Violation>) {
        if let Ok(mut sink) = self.violations.lock() {
            for violation in violations {
                if self.engine.record_violation_kind(violation.kind) {
                    sink.push(violation);
                }
            }
        }
    }

    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.reporter.is_cancelled()
    }

    pub(crate) fn into_violations(self) -> Vec<Violation> {
        self.violations.into_inner().unwrap_or_default()
    }
}
