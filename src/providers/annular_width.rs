use crate::board::Item;
use crate::report::{ErrorKind, Violation};
use crate::rules::ConstraintKind;
use crate::run::{
    ProviderError, ProviderStatus, RunContext, TestProvider, CANCEL_CHECK_INTERVAL,
};
use crate::units::to_mm_string;

/// Checks the copper ring left around each via's hole, the pad
/// diameter minus the drill over two.
pub struct AnnularWidthProvider;

impl TestProvider for AnnularWidthProvider {
    fn name(&self) -> &'static str {
        "annular width"
    }

    fn consumed_kinds(&self) -> &'static [ConstraintKind] {
        &[ConstraintKind::AnnularWidth]
    }

    fn run(&self, ctx: &RunContext<'_>) -> Result<ProviderStatus, ProviderError> {
        let vias: Vec<&Item> = ctx
            .board
            .items()
            .filter(|i| matches!(i, Item::Via(_)))
            .collect();
        ctx.reporter.begin_phase(self.name(), vias.len());

        for (i, item) in vias.iter().enumerate() {
            if i % CANCEL_CHECK_INTERVAL == 0 {
                if ctx.is_cancelled() {
                    return Ok(ProviderStatus::Cancelled);
                }
                if ctx.engine.is_error_limit_exceeded(ErrorKind::AnnularWidth) {
                    break;
                }
                ctx.reporter.advance(i);
            }
            let Item::Via(via) = item else { continue };

            let eff =
                ctx.engine
                    .eval_rules(ConstraintKind::AnnularWidth, ctx.board, item, None, None);
            if eff.is_ignored() {
                continue;
            }

            let annular = via.annular_width();
            let breached = match (eff.range.min, eff.range.max) {
                (Some(min), _) if annular < min => Some(("min", min)),
                (_, Some(max)) if annular > max => Some(("max", max)),
                _ => None,
            };
            let Some((bound_name, bound)) = breached else {
                continue;
            };

            let detail = format!(
                "{} ({}; {bound_name} {}; actual {})",
                ErrorKind::AnnularWidth.description(),
                eff.source_description(),
                to_mm_string(bound),
                to_mm_string(annular),
            );
            ctx.report(
                Violation::new(ErrorKind::AnnularWidth, eff.severity, via.position, detail)
                    .with_item(via.id)
                    .with_rule(eff.source.rule_name()),
            );
        }

        ctx.reporter.advance(vias.len());
        Ok(ProviderStatus::Completed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::board::{Board, DesignSettings};
    use crate::geom::Vec2;
    use crate::rules::DrcEngine;
    use crate::run::NullReporter;

    #[test]
    fn thin_ring_is_flagged() {
        let mut board = Board::new(2);
        board.set_settings(DesignSettings {
            min_annular_width: Some(150_000),
            ..DesignSettings::default()
        });
        // (0.6 - 0.5) / 2 = 0.05 mm ring.
        board.add_via(Vec2::new(0, 0), 600_000, 500_000, None);
        let engine = DrcEngine::new(Vec::new(), board.settings().clone());
        let ctx = RunContext::new(&board, &engine, &NullReporter);
        AnnularWidthProvider.run(&ctx).unwrap();
        let violations = ctx.into_violations();
        assert_eq!(violations.len(), 1);
        assert!(violations[0].detail.contains("actual 0.05 mm"));
    }

    #[test]
    fn healthy_ring_passes() {
        let mut board = Board::new(2);
        board.set_settings(DesignSettings {
            min_annular_width: Some(150_000),
            ..DesignSettings::default()
        });
        board.add_via(Vec2::new(0, 0), 800_000, 400_000, None);
        let engine = DrcEngine::new(Vec::new(), board.settings().clone());
        let ctx = RunContext::new(&board, &engine, &NullReporter);
        AnnularWidthProvider.run(&ctx).unwrap();
        assert!(ctx.into_violations().is_empty());
    }
}
