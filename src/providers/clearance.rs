//! Copper-to-copper clearance.
//!
//! The scan is per copper layer: build an R-tree of the layer's copper
//! shapes, then for each shape query candidates whose envelopes come
//! within the worst-case clearance any rule could impose. Pair work is
//! data-parallel; results are sorted before reporting so the output
//! order does not depend on worker scheduling.

use rayon::prelude::*;
use rstar::{RTree, RTreeObject, AABB};

use crate::board::{Item, ItemId, Layer, NetId};
use crate::geom::CopperShape;
use crate::report::{ErrorKind, Violation};
use crate::rules::ConstraintKind;
use crate::run::{
    ProviderError, ProviderStatus, RunContext, TestProvider, CANCEL_CHECK_INTERVAL,
};
use crate::units::to_mm_string;

pub struct ClearanceProvider;

struct LayerEntry {
    item_index: usize,
    id: ItemId,
    net: Option<NetId>,
    shape: CopperShape,
    envelope: AABB<[i64; 2]>,
}

impl RTreeObject for LayerEntry {
    type Envelope = AABB<[i64; 2]>;

    fn envelope(&self) -> Self::Envelope {
        self.envelope
    }
}

impl TestProvider for ClearanceProvider {
    fn name(&self) -> &'static str {
        "clearance"
    }

    fn consumed_kinds(&self) -> &'static [ConstraintKind] {
        &[ConstraintKind::Clearance]
    }

    fn run(&self, ctx: &RunContext<'_>) -> Result<ProviderStatus, ProviderError> {
        let worst_case = ctx.engine.worst_case_min(ConstraintKind::Clearance);
        let items: Vec<&Item> = ctx.board.items().collect();

        for layer in ctx.board.copper_layer_set().iter() {
            if ctx.engine.is_error_limit_exceeded(ErrorKind::Clearance) {
                break;
            }
            let entries: Vec<LayerEntry> = items
                .iter()
                .enumerate()
                .filter_map(|(item_index, item)| {
                    let shape = copper_shape(item, layer)?;
                    let min = shape.bbox().min;
                    let max = shape.bbox().max;
                    Some(LayerEntry {
                        item_index,
                        id: item.id(),
                        net: item.net(),
                        shape,
                        envelope: AABB::from_corners(
                            [min.x - worst_case, min.y - worst_case],
                            [max.x + worst_case, max.y + worst_case],
                        ),
                    })
                })
                .collect();
            if entries.len() < 2 {
                continue;
            }
            ctx.reporter
                .begin_phase(&format!("clearance: {}", layer.name()), entries.len());

            let tree = RTree::bulk_load(
                entries
                    .iter()
                    .map(|e| IndexedEnvelope {
                        index: e.item_index,
                        envelope: e.envelope,
                    })
                    .collect(),
            );
            let by_index: std::collections::HashMap<usize, &LayerEntry> =
                entries.iter().map(|e| (e.item_index, e)).collect();

            let mut found: Vec<Violation> = entries
                .par_iter()
                .enumerate()
                .flat_map_iter(|(i, a)| {
                    if i % CANCEL_CHECK_INTERVAL == 0
                        && (ctx.is_cancelled()
                            || ctx.engine.is_error_limit_exceeded(ErrorKind::Clearance))
                    {
                        return Vec::new().into_iter();
                    }
                    let mut local = Vec::new();
                    for candidate in tree.locate_in_envelope_intersecting(&a.shape_envelope()) {
                        let Some(b) = by_index.get(&candidate.index) else {
                            continue;
                        };
                        // Each unordered pair once, and never an item
                        // against itself.
                        if b.id.0 <= a.id.0 {
                            continue;
                        }
                        if a.net.is_some() && a.net == b.net {
                            continue;
                        }
                        if let Some(v) = check_pair(ctx, &items, a, b, layer) {
                            local.push(v);
                        }
                    }
                    local.into_iter()
                })
                .collect();

            if ctx.is_cancelled() {
                found.sort_by(|x, y| x.serialize_key().cmp(&y.serialize_key()));
                ctx.report_all(found);
                return Ok(ProviderStatus::Cancelled);
            }
            found.sort_by(|x, y| x.serialize_key().cmp(&y.serialize_key()));
            ctx.report_all(found);
            ctx.reporter.advance(entries.len());
        }

        Ok(ProviderStatus::Completed)
    }
}

struct IndexedEnvelope {
    index: usize,
    envelope: AABB<[i64; 2]>,
}

impl RTreeObject for IndexedEnvelope {
    type Envelope = AABB<[i64; 2]>;

    fn envelope(&self) -> Self::Envelope {
        self.envelope
    }
}

impl LayerEntry {
    /// Un-inflated envelope of the shape itself. Querying this against
    /// the inflated candidate envelopes finds every pair whose gap
    /// could be under the worst-case clearance, counting each pair's
    /// inflation once instead of twice.
    fn shape_envelope(&self) -> AABB<[i64; 2]> {
        let bbox = self.shape.bbox();
        AABB::from_corners([bbox.min.x, bbox.min.y], [bbox.max.x, bbox.max.y])
    }
}

fn copper_shape(item: &Item, layer: Layer) -> Option<CopperShape> {
    if !item.layers().contains(layer) {
        return None;
    }
    match item {
        Item::Track(t) => {
            let (start, end) = t.endpoints();
            Some(CopperShape::Segment {
                a: start,
                b: end,
                half_width: t.width / 2,
            })
        }
        Item::Via(v) => Some(CopperShape::Circle {
            center: v.position,
            radius: v.diameter / 2,
        }),
        Item::Pad(p) => Some(CopperShape::Circle {
            center: p.position,
            radius: p.size_x.max(p.size_y) / 2,
        }),
    }
}

#[allow(clippy::cast_precision_loss)]
fn check_pair(
    ctx: &RunContext<'_>,
    items: &[&Item],
    a: &LayerEntry,
    b: &LayerEntry,
    layer: Layer,
) -> Option<Violation> {
    let item_a = items[a.item_index];
    let item_b = items[b.item_index];
    let eff = ctx.engine.eval_rules(
        ConstraintKind::Clearance,
        ctx.board,
        item_a,
        Some(item_b),
        Some(layer),
    );
    if eff.is_ignored() {
        return None;
    }
    let min = eff.range.min?;

    let (gap, at) = a.shape.distance(&b.shape);
    if gap >= min as f64 {
        return None;
    }

    let detail = format!(
        "{} ({}; min {}; actual {})",
        ErrorKind::Clearance.description(),
        eff.source_description(),
        to_mm_string(min),
        to_mm_string(gap.round() as i64),
    );
    Some(
        Violation::new(ErrorKind::Clearance, eff.severity, at, detail)
            .with_item(a.id)
            .with_item(b.id)
            .with_layer(layer)
            .with_rule(eff.source.rule_name()),
    )
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
            ClearanceProvider.run(&ctx).unwrap(),
            ProviderStatus::Completed
        );
        ctx.into_violations()
    }

    fn two_parallel_tracks(gap: i64) -> Board {
        let mut board = Board::new(2);
        let n1 = board.add_net("A", "Signal");
        let n2 = board.add_net("B", "Signal");
        let width = 200_000;
        board.add_segment(
            Layer::F_CU,
            Vec2::new(0, 0),
            Vec2::new(2_000_000, 0),
            width,
            Some(n1),
        );
        board.add_segment(
            Layer::F_CU,
            Vec2::new(0, width + gap),
            Vec2::new(2_000_000, width + gap),
            width,
            Some(n2),
        );
        board
    }

    #[test]
    fn close_tracks_violate() {
        let board = two_parallel_tracks(100_000);
        let mut settings = DesignSettings::default();
        settings.min_clearance = Some(150_000);
        let engine = DrcEngine::new(Vec::new(), settings);
        let violations = run_provider(&board, &engine);
        assert_eq!(violations.len(), 1);
        let v = &violations[0];
        assert_eq!(v.kind, ErrorKind::Clearance);
        assert_eq!(v.items.len(), 2);
        assert_eq!(v.layer, Some(Layer::F_CU));
        assert!(v.detail.contains("min 0.15 mm"));
        assert!(v.detail.contains("actual 0.1 mm"));
    }

    #[test]
    fn distant_tracks_pass() {
        let board = two_parallel_tracks(500_000);
        let mut settings = DesignSettings::default();
        settings.min_clearance = Some(150_000);
        let engine = DrcEngine::new(Vec::new(), settings);
        assert!(run_provider(&board, &engine).is_empty());
    }

    #[test]
    fn same_net_is_never_checked() {
        let mut board = Board::new(2);
        let net = board.add_net("GND", "Signal");
        board.add_segment(
            Layer::F_CU,
            Vec2::new(0, 0),
            Vec2::new(2_000_000, 0),
            200_000,
            Some(net),
        );
        board.add_segment(
            Layer::F_CU,
            Vec2::new(0, 250_000),
            Vec2::new(2_000_000, 250_000),
            200_000,
            Some(net),
        );
        let mut settings = DesignSettings::default();
        settings.min_clearance = Some(150_000);
        let engine = DrcEngine::new(Vec::new(), settings);
        assert!(run_provider(&board, &engine).is_empty());
    }

    #[test]
    fn different_layers_do_not_interact() {
        let mut board = Board::new(2);
        let n1 = board.add_net("A", "Signal");
        let n2 = board.add_net("B", "Signal");
        board.add_segment(
            Layer::F_CU,
            Vec2::new(0, 0),
            Vec2::new(2_000_000, 0),
            200_000,
            Some(n1),
        );
        board.add_segment(
            Layer::B_CU,
            Vec2::new(0, 0),
            Vec2::new(2_000_000, 0),
            200_000,
            Some(n2),
        );
        let mut settings = DesignSettings::default();
        settings.min_clearance = Some(150_000);
        let engine = DrcEngine::new(Vec::new(), settings);
        assert!(run_provider(&board, &engine).is_empty());
    }

    #[test]
    fn rule_clearance_overrides_default() {
        let board = two_parallel_tracks(300_000);
        let outcome = parse_rules(
            "(rule wide (constraint clearance (min 0.5mm)))",
            &BuiltinCatalog,
        );
        let engine = DrcEngine::new(outcome.rules, DesignSettings::default());
        let violations = run_provider(&board, &engine);
        assert_eq!(violations.len(), 1);
        assert!(violations[0].detail.contains("rule 'wide'"));
    }

    #[test]
    fn output_order_is_deterministic() {
        let mut board = Board::new(2);
        let mut nets = Vec::new();
        for i in 0..6 {
            nets.push(board.add_net(&format!("N{i}"), "Signal"));
        }
        for (i, &net) in nets.iter().enumerate() {
            let y = i as i64 * 250_000;
            board.add_segment(
                Layer::F_CU,
                Vec2::new(0, y),
                Vec2::new(2_000_000, y),
                200_000,
                Some(net),
            );
        }
        let mut settings = DesignSettings::default();
        settings.min_clearance = Some(150_000);
        let engine = || DrcEngine::new(Vec::new(), settings.clone());
        let first: Vec<String> = run_provider(&board, &engine())
            .iter()
            .map(Violation::serialize_key)
            .collect();
        let second: Vec<String> = run_provider(&board, &engine())
            .iter()
            .map(Violation::serialize_key)
            .collect();
        assert!(!first.is_empty());
        assert_eq!(first, second);
    }

    #[test]
    fn touching_shapes_report_zero_gap() {
        let board = two_parallel_tracks(0);
        let mut settings = DesignSettings::default();
        settings.min_clearance = Some(150_000);
        let engine = DrcEngine::new(Vec::new(), settings);
        let violations = run_provider(&board, &engine);
        assert_eq!(violations.len(), 1);
        assert!(violations[0].detail.contains("actual 0 mm"));
    }
}
