use crate::board::{Item, ViaType};
use crate::report::{ErrorKind, Violation};
use crate::rules::{ConstraintKind, ConstraintSource};
use crate::run::{
    ProviderError, ProviderStatus, RunContext, TestProvider, CANCEL_CHECK_INTERVAL,
};
use crate::units::to_mm_string;

/// Checks drilled hole sizes on vias and pads. Micro vias report a
/// distinct defect kind and, absent a matching rule, fall back to the
/// board's micro via drill limit rather than the through hole one.
pub struct HoleSizeProvider;

impl TestProvider for HoleSizeProvider {
    fn name(&self) -> &'static str {
        "hole size"
    }

    fn consumed_kinds(&self) -> &'static [ConstraintKind] {
        &[ConstraintKind::HoleSize]
    }

    fn run(&self, ctx: &RunContext<'_>) -> Result<ProviderStatus, ProviderError> {
        let drilled: Vec<&Item> = ctx
            .board
            .items()
            .filter(|i| match i {
                Item::Via(_) => true,
                Item::Pad(p) => p.drill.is_some(),
                Item::Track(_) => false,
            })
            .collect();
        ctx.reporter.begin_phase(self.name(), drilled.len());

        for (i, item) in drilled.iter().enumerate() {
            if i % CANCEL_CHECK_INTERVAL == 0 {
                if ctx.is_cancelled() {
                    return Ok(ProviderStatus::Cancelled);
                }
                // Two defect kinds come out of this scan; stop only
                // once neither can record anything.
                if ctx.engine.is_error_limit_exceeded(ErrorKind::DrillOutOfRange)
                    && ctx
                        .engine
                        .is_error_limit_exceeded(ErrorKind::MicroviaDrillOutOfRange)
                {
                    break;
                }
                ctx.reporter.advance(i);
            }

            let eff = ctx
                .engine
                .eval_rules(ConstraintKind::HoleSize, ctx.board, item, None, None);

            match item {
                Item::Via(via) => {
                    let is_micro = via.via_type == ViaType::Micro;
                    let kind = if is_micro {
                        ErrorKind::MicroviaDrillOutOfRange
                    } else {
                        ErrorKind::DrillOutOfRange
                    };

                    // Board defaults carry a separate micro via drill
                    // minimum; a named rule overrides either.
                    let from_rule = matches!(eff.source, ConstraintSource::Rule(_));
                    let (min, severity, source) = if is_micro && !from_rule {
                        match ctx.engine.settings().min_microvia_hole {
                            Some(min) => (
                                Some(min),
                                crate::rules::Severity::Error,
                                "board setup constraints".to_owned(),
                            ),
                            None => continue,
                        }
                    } else {
                        if eff.is_ignored() {
                            continue;
                        }
                        (eff.range.min, eff.severity, eff.source_description())
                    };

                    let breached = match (min, eff.range.max) {
                        (Some(min), _) if via.drill < min => Some(("min", min)),
                        (_, Some(max)) if via.drill > max => Some(("max", max)),
                        _ => None,
                    };
                    let Some((bound_name, bound)) = breached else {
                        continue;
                    };

                    let detail = format!(
                        "{} ({source}; {bound_name} {}; actual {})",
                        kind.description(),
                        to_mm_string(bound),
                        to_mm_string(via.drill),
                    );
                    ctx.report(
                        Violation::new(kind, severity, via.position, detail)
                            .with_item(via.id)
                            .with_rule(eff.source.rule_name()),
                    );
                }
                Item::Pad(pad) => {
                    if eff.is_ignored() {
                        continue;
                    }
                    let Some(drill) = pad.min_drill() else { continue };
                    let Some(min) = eff.range.min else { continue };
                    if drill >= min {
                        continue;
                    }
                    let detail = format!(
                        "{} ({}; min {}; actual {})",
                        ErrorKind::DrillOutOfRange.description(),
                        eff.source_description(),
                        to_mm_string(min),
                        to_mm_string(drill),
                    );
                    ctx.report(
                        Violation::new(
                            ErrorKind::DrillOutOfRange,
                            eff.severity,
                            pad.position,
                            detail,
                        )
                        .with_item(pad.id)
                        .with_rule(eff.source.rule_name()),
                    );
                }
                Item::Track(_) => {}
            }
        }

        ctx.reporter.advance(drilled.len());
        Ok(ProviderStatus::Completed)
    }
}
