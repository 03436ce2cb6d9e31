use crate::board::Item;
use crate::report::{ErrorKind, Violation};
use crate::rules::ConstraintKind;
use crate::run::{
    ProviderError, ProviderStatus, RunContext, TestProvider, CANCEL_CHECK_INTERVAL,
};
use crate::units::to_mm_string;

/// Checks via pad diameters. Vias span layers, so resolution runs
/// without a layer and every layer-filtered rule still applies.
pub struct ViaDiameterProvider;

impl TestProvider for ViaDiameterProvider {
    fn name(&self) -> &'static str {
        "via diameter"
    }

    fn consumed_kinds(&self) -> &'static [ConstraintKind] {
        &[ConstraintKind::ViaDiameter]
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
                if ctx.engine.is_error_limit_exceeded(ErrorKind::ViaDiameter) {
                    break;
                }
                ctx.reporter.advance(i);
            }
            let Item::Via(via) = item else { continue };

            let eff =
                ctx.engine
                    .eval_rules(ConstraintKind::ViaDiameter, ctx.board, item, None, None);
            if eff.is_ignored() {
                continue;
            }

            let breached = match (eff.range.min, eff.range.max) {
                (Some(min), _) if via.diameter < min => Some(("min", min)),
                (_, Some(max)) if via.diameter > max => Some(("max", max)),
                _ => None,
            };
            let Some((bound_name, bound)) = breached else {
                continue;
            };

            let detail = format!(
                "{} ({}; {bound_name} {}; actual {})",
                ErrorKind::ViaDiameter.description(),
                eff.source_description(),
                to_mm_string(bound),
                to_mm_string(via.diameter),
            );
            ctx.report(
                Violation::new(ErrorKind::ViaDiameter, eff.severity, via.position, detail)
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
    use crate::board::{Board, BuiltinCatalog, DesignSettings};
    use crate::geom::Vec2;
    use crate::rules::{parse_rules, DrcEngine};
    use crate::run::NullReporter;

    fn run_provider(board: &Board, engine: &DrcEngine) -> Vec<Violation> {
        let ctx = RunContext::new(board, engine, &NullReporter);
        assert_eq!(
            ViaDiameterProvider.run(&ctx).unwrap(),
            ProviderStatus::Completed
        );
        ctx.into_violations()
    }

    #[test]
    fn small_via_is_flagged() {
        let mut board = Board::new(2);
        board.add_via(Vec2::new(0, 0), 500_000, 300_000, None);
        let outcome = parse_rules(
            "(rule vias (constraint via_diameter (min 0.6mm)))",
            &BuiltinCatalog,
        );
        let engine = DrcEngine::new(outcome.rules, DesignSettings::default());
        let violations = run_provider(&board, &engine);
        assert_eq!(violations.len(), 1);
        assert!(violations[0].detail.contains("rule 'vias'"));
        assert_eq!(violations[0].rule_name.as_deref(), Some("vias"));
    }

    #[test]
    fn layer_filtered_rule_still_applies_to_vias() {
        let mut board = Board::new(2);
        board.add_via(Vec2::new(0, 0), 500_000, 300_000, None);
        let outcome = parse_rules(
            "(rule outer (layer outer) (constraint via_diameter (min 0.6mm)))",
            &BuiltinCatalog,
        );
        let engine = DrcEngine::new(outcome.rules, DesignSettings::default());
        assert_eq!(run_provider(&board, &engine).len(), 1);
    }

    #[test]
    fn implicit_default_applies_when_no_rule() {
        let mut board = Board::new(2);
        board.set_settings(DesignSettings {
            min_via_diameter: Some(600_000),
            ..DesignSettings::default()
        });
        board.add_via(Vec2::new(0, 0), 500_000, 300_000, None);
        let engine = DrcEngine::new(Vec::new(), board.settings().clone());
        let violations = run_provider(&board, &engine);
        assert_eq!(violations.len(), 1);
        assert!(violations[0].detail.contains("board setup constraints"));
    }
}
