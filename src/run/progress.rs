/// Observer for long runs. Implementations must be cheap and
/// thread-safe; checks happen from worker threads mid-scan.
pub trait ProgressReporter: Sync {
    /// A provider is starting a phase of `total` work items.
    fn begin_phase(&self, name: &str, total: usize);

    /// `done` work items of the current phase are finished.
    fn advance(&self, done: usize);

    /// Polled cooperatively; once true, providers wind down at the
    /// next check point and the run reports itself cancelled.
    fn is_cancelled(&self) -> bool;
}

/// Reporter that ignores progress and never cancels.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullReporter;

impl ProgressReporter for NullReporter {
    fn begin_phase(&self, _name: &str, _total: usize) {}

    fn advance(&self, _done: usize) {}

    fn is_cancelled(&self) -> bool {
        false
    }
}

/// How many items a scan processes between cancellation polls.
pub const CANCEL_CHECK_INTERVAL: usize = 64;
