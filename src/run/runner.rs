use tracing::{debug, error, info};

use crate::board::Board;
use crate::providers::{
    AnnularWidthProvider, ClearanceProvider, HoleSizeProvider, TrackWidthProvider,
    ViaDiameterProvider,
};
use crate::report::{ExclusionSet, Violation};
use crate::rules::DrcEngine;

use super::progress::ProgressReporter;
use super::provider::{ProviderError, ProviderStatus, RunContext, TestProvider};

/// How a full run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunOutcome {
    Completed,
    Cancelled,
}

/// Everything a run produced: violations in deterministic order, the
/// outcome, which providers were skipped, and which failed.
#[derive(Debug)]
pub struct DrcReport {
    pub violations: Vec<Violation>,
    pub outcome: RunOutcome,
    pub skipped: Vec<&'static str>,
    pub failures: Vec<ProviderError>,
}

impl DrcReport {
    /// Violations not waived by an exclusion.
    pub fn active_violations(&self) -> impl Iterator<Item = &Violation> {
        self.violations.iter().filter(|v| !v.excluded)
    }

    /// Serialize the report for host tooling.
    ///
    /// # Errors
    ///
    /// Propagates serialization failures from `serde_json`.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        #[derive(serde::Serialize)]
        struct ReportDoc<'a> {
            cancelled: bool,
            violations: &'a [Violation],
            skipped: &'a [&'a str],
            failures: Vec<String>,
        }
        serde_json::to_string_pretty(&ReportDoc {
            cancelled: self.outcome == RunOutcome::Cancelled,
            violations: &self.violations,
            skipped: &self.skipped,
            failures: self.failures.iter().map(ToString::to_string).collect(),
        })
    }
}

/// Dispatches providers in registration order. The provider set is
/// explicit; nothing registers itself behind the caller's back.
#[derive(Default)]
pub struct DrcRunner {
    providers: Vec<Box<dyn TestProvider>>,
}

impl DrcRunner {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Runner with the built-in checks, cheap single-item scans first.
    #[must_use]
    pub fn with_default_providers() -> Self {
        let mut runner = Self::new();
        runner.register(Box::new(TrackWidthProvider));
        runner.register(Box::new(ViaDiameterProvider));
        runner.register(Box::new(AnnularWidthProvider));
        runner.register(Box::new(HoleSizeProvider));
        runner.register(Box::new(ClearanceProvider));
        runner
    }

    pub fn register(&mut self, provider: Box<dyn TestProvider>) {
        self.providers.push(provider);
    }

    #[must_use]
    pub fn provider_names(&self) -> Vec<&'static str> {
        self.providers.iter().map(|p| p.name()).collect()
    }

    /// Run every registered provider. A provider failure is recorded
    /// and the run continues; cancellation stops dispatch. Exclusions,
    /// if given, are resolved onto the collected violations.
    pub fn run(
        &self,
        board: &Board,
        engine: &DrcEngine,
        reporter: &dyn ProgressReporter,
        exclusions: Option<&ExclusionSet>,
    ) -> DrcReport {
        let ctx = RunContext::new(board, engine, reporter);
        let mut outcome = RunOutcome::Completed;
        let mut skipped = Vec::new();
        let mut failures = Vec::new();

        for provider in &self.providers {
            if ctx.is_cancelled() {
                outcome = RunOutcome::Cancelled;
                break;
            }
            if !provider
                .consumed_kinds()
                .iter()
                .any(|&kind| engine.has_rules_for(kind))
            {
                debug!(provider = provider.name(), "skipping, nothing constrains it");
                skipped.push(provider.name());
                continue;
            }
            match provider.run(&ctx) {
                Ok(ProviderStatus::Completed) => {}
                Ok(ProviderStatus::Cancelled) => {
                    outcome = RunOutcome::Cancelled;
                    break;
                }
                Err(failure) => {
                    error!(provider = failure.provider, error = %failure, "provider failed");
                    failures.push(failure);
                }
            }
        }

        let mut violations = ctx.into_violations();
        // Deterministic report order regardless of worker scheduling.
        violations.sort_by(|a, b| a.serialize_key().cmp(&b.serialize_key()));
        if let Some(exclusions) = exclusions {
            exclusions.resolve(&mut violations);
        }
        let cancelled = outcome == RunOutcome::Cancelled;
        info!(
            violations = violations.len(),
            skipped = skipped.len(),
            failures = failures.len(),
            cancelled,
            "run finished"
        );

        DrcReport {
            violations,
            outcome,
            skipped,
            failures,
        }
    }
}
