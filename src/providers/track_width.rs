use crate::board::Item;
use crate::report::{ErrorKind, Violation};
use crate::rules::ConstraintKind;
use crate::run::{
    ProviderError, ProviderStatus, RunContext, TestProvider, CANCEL_CHECK_INTERVAL,
};
use crate::units::to_mm_string;

/// Checks every track segment and arc against the effective track
/// width constraint on its layer.
pub struct TrackWidthProvider;

impl TestProvider for TrackWidthProvider {
    fn name(&self) -> &'static str {
        "track width"
    }

    fn consumed_kinds(&self) -> &'static [ConstraintKind] {
        &[ConstraintKind::TrackWidth]
    }

    fn run(&self, ctx: &RunContext<'_>) -> Result<ProviderStatus, ProviderError> {
        let tracks: Vec<&Item> = ctx
            .board
            .items()
            .filter(|i| matches!(i, Item::Track(_)))
            .collect();
        ctx.reporter.begin_phase(self.name(), tracks.len());

        for (i, item) in tracks.iter().enumerate() {
            if i % CANCEL_CHECK_INTERVAL == 0 {
                if ctx.is_cancelled() {
                    return Ok(ProviderStatus::Cancelled);
                }
                if ctx.engine.is_error_limit_exceeded(ErrorKind::TrackWidth) {
                    break;
                }
                ctx.reporter.advance(i);
            }
            let Item::Track(track) = item else { continue };

            let eff = ctx.engine.eval_rules(
                ConstraintKind::TrackWidth,
                ctx.board,
                item,
                None,
                Some(track.layer),
            );
            if eff.is_ignored() {
                continue;
            }

            let breached = match (eff.range.min, eff.range.max) {
                (Some(min), _) if track.width < min => Some(("min", min)),
                (_, Some(max)) if track.width > max => Some(("max", max)),
                _ => None,
            };
            let Some((bound_name, bound)) = breached else {
                continue;
            };

            let detail = format!(
                "{} ({}; {bound_name} {}; actual {})",
                ErrorKind::TrackWidth.description(),
                eff.source_description(),
                to_mm_string(bound),
                to_mm_string(track.width),
            );
            ctx.report(
                Violation::new(ErrorKind::TrackWidth, eff.severity, track.reference_point(), detail)
                    .with_item(track.id)
                    .with_layer(track.layer)
                    .with_rule(eff.source.rule_name()),
            );
        }

        ctx.reporter.advance(tracks.len());
        Ok(ProviderStatus::Completed)
    }
}
