use criterion::{black_box, criterion_group, criterion_main, Criterion};

use copperlint::geom::Vec2;
use copperlint::{
    parse_rules, Board, BuiltinCatalog, ConstraintKind, DesignSettings, DrcEngine, DrcRunner,
    Layer, NullReporter,
};

/// Build a rule set with `n` conditional clearance rules plus a
/// catch-all, the worst case for a resolution scan (every conditional
/// misses).
fn build_engine(n: usize) -> DrcEngine {
    let mut src = String::new();
    for i in 0..n {
        src.push_str(&format!(
            "(rule r{i} (condition \"A.NetClass == 'Class{i}'\") (constraint clearance (min 0.{}mm)))\n",
            (i % 9) + 1
        ));
    }
    src.push_str("(rule base (constraint clearance (min 0.15mm)))\n");
    let outcome = parse_rules(&src, &BuiltinCatalog);
    assert!(outcome.is_clean());
    DrcEngine::new(outcome.rules, DesignSettings::default())
}

/// Grid of parallel track pairs, every pair just under its clearance.
fn build_board(tracks: i64) -> Board {
    let mut board = Board::new(2);
    for i in 0..tracks {
        let net = board.add_net(&format!("N{i}"), "Signal");
        board.add_segment(
            Layer::F_CU,
            Vec2::new(0, i * 300_000),
            Vec2::new(10_000_000, i * 300_000),
            200_000,
            Some(net),
        );
    }
    board
}

fn bench_resolution(c: &mut Criterion) {
    let mut group = c.benchmark_group("eval_rules");
    for &n in &[5, 20, 50] {
        let engine = build_engine(n);
        let board = build_board(2);
        let items: Vec<&copperlint::Item> = board.items().collect();
        group.bench_function(format!("{n}_rules"), |b| {
            b.iter(|| {
                engine.eval_rules(
                    ConstraintKind::Clearance,
                    black_box(&board),
                    items[0],
                    Some(items[1]),
                    Some(Layer::F_CU),
                )
            });
        });
    }
    group.finish();
}

fn bench_full_run(c: &mut Criterion) {
    let mut group = c.benchmark_group("full_run");
    group.sample_size(20);
    for &tracks in &[100, 500] {
        let board = build_board(tracks);
        let runner = DrcRunner::with_default_providers();
        group.bench_function(format!("{tracks}_tracks"), |b| {
            b.iter(|| {
                // Violation counters are per-run state, so each
                // iteration gets a fresh engine.
                let engine = build_engine(10);
                runner.run(black_box(&board), &engine, &NullReporter, None)
            });
        });
    }
    group.finish();
}

criterion_group!(benches, bench_resolution, bench_full_run);
criterion_main!(benches);
