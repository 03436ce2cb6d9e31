//! Run orchestration: providers, dispatch, progress and cancellation.

mod progress;
mod provider;
mod runner;

pub use progress::{NullReporter, ProgressReporter, CANCEL_CHECK_INTERVAL};
pub use provider::{ProviderError, ProviderStatus, RunContext, TestProvider};
pub use runner::{DrcReport, DrcRunner, RunOutcome};
