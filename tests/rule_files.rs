use copperlint::geom::Vec2;
use copperlint::{
    parse_rules, Board, BuiltinCatalog, ConstraintKind, ConstraintSource, DesignSettings,
    DrcEngine, Layer, Severity,
};

#[test]
fn realistic_rule_file_loads_cleanly() {
    let src = r#"
(version 1)

# Fab house capabilities
(rule fab_limits
  (constraint track_width (min 0.127mm))
  (constraint hole_size (min 0.2mm) (max 6.3mm))
  (constraint via_diameter (min 0.45mm))
  (constraint annular_width (min 0.13mm)))

# High voltage spacing, outer layers only
(rule "HV spacing"
  (severity error)
  (layer outer)
  (condition "A.NetClass == 'HV' || B.NetClass == 'HV'")
  (constraint clearance (min 1.5mm)))

# Noisy legacy corner, reviewed and accepted
(rule legacy
  (severity warning)
  (layer "In1.Cu")
  (constraint clearance (min 0.1mm)))
"#;
    let outcome = parse_rules(src, &BuiltinCatalog);
    assert!(outcome.is_clean(), "errors: {:?}", outcome.errors);
    assert_eq!(outcome.rules.len(), 3);

    let fab = &outcome.rules[0];
    assert_eq!(fab.priority, 0);
    assert_eq!(fab.constraints.len(), 4);
    let hole = fab.constraint(ConstraintKind::HoleSize).unwrap();
    assert_eq!(hole.range.min, Some(200_000));
    assert_eq!(hole.range.max, Some(6_300_000));

    let hv = &outcome.rules[1];
    // Layer filter plus two predicate leaves.
    assert_eq!(hv.priority, 3);
    assert_eq!(
        hv.constraint(ConstraintKind::Clearance).unwrap().severity,
        Severity::Error
    );

    let legacy = &outcome.rules[2];
    assert_eq!(legacy.priority, 1);
    assert!(legacy.layer_filter.unwrap().contains(Layer::inner(1)));
}

#[test]
fn rule_file_loads_from_disk() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("board.kicad_dru");
    std::fs::write(
        &path,
        "(version 1)\n(rule t (constraint track_width (min 0.2mm)))\n",
    )
    .unwrap();
    let outcome = copperlint::parse_rules_file(&path, &BuiltinCatalog).unwrap();
    assert!(outcome.is_clean());
    assert_eq!(outcome.rules.len(), 1);
}

#[test]
fn mil_and_inch_units_normalize() {
    let outcome = parse_rules(
        "(rule imperial (constraint clearance (min 10mil) (max 0.1in)))",
        &BuiltinCatalog,
    );
    assert!(outcome.is_clean());
    let c = outcome.rules[0].constraint(ConstraintKind::Clearance).unwrap();
    assert_eq!(c.range.min, Some(254_000));
    assert_eq!(c.range.max, Some(2_540_000));
}

#[test]
fn comma_decimal_separator_is_accepted() {
    let outcome = parse_rules(
        "(rule eu (constraint clearance (min 1,5mm)))",
        &BuiltinCatalog,
    );
    assert!(outcome.is_clean());
    let c = outcome.rules[0].constraint(ConstraintKind::Clearance).unwrap();
    assert_eq!(c.range.min, Some(1_500_000));
}

#[test]
fn every_error_is_reported_with_an_offset() {
    let src = r#"
(rule ok_one (constraint track_width (min 0.2mm)))
(rule bad_kind (constraint sparkle (min 1mm)))
(rule bad_condition (condition "A.Glitter > 1") (constraint clearance (min 1mm)))
(rule ok_two (constraint clearance (min 0.2mm)))
(rule bad_unit (constraint clearance (min 3parsec)))
"#;
    let outcome = parse_rules(src, &BuiltinCatalog);
    assert_eq!(outcome.rules.len(), 2);
    assert_eq!(outcome.errors.len(), 3);
    for error in &outcome.errors {
        assert!(error.offset < src.len());
    }
    assert!(outcome
        .errors
        .iter()
        .any(|e| e.message.contains("Glitter")));
}

#[test]
fn inapplicable_property_defers_to_next_rule() {
    // A via has no Width, so `A.Width` evaluates falsy and the first
    // rule never matches; resolution falls through to the next one.
    let mut board = Board::new(2);
    board.add_via(Vec2::new(0, 0), 400_000, 200_000, None);
    let outcome = parse_rules(
        r#"
(rule via_only (condition "A.Width > 0mm") (constraint via_diameter (min 1mm)))
(rule fallback (constraint via_diameter (min 0.5mm)))
"#,
        &BuiltinCatalog,
    );
    assert!(outcome.is_clean());
    let engine = DrcEngine::new(outcome.rules, DesignSettings::default());
    let items: Vec<&copperlint::Item> = board.items().collect();
    let eff = engine.eval_rules(ConstraintKind::ViaDiameter, &board, items[0], None, None);
    assert_eq!(eff.source, ConstraintSource::Rule("fallback".into()));
    assert_eq!(eff.range.min, Some(500_000));
}

#[test]
fn larger_rule_sets_resolve_by_specificity() {
    let mut board = Board::new(4);
    let hv = board.add_net("VBUS", "HV");
    board.add_segment(
        Layer::inner(1),
        Vec2::new(0, 0),
        Vec2::new(1_000_000, 0),
        200_000,
        Some(hv),
    );
    let other = board.add_net("D0", "Signal");
    board.add_segment(
        Layer::inner(1),
        Vec2::new(0, 400_000),
        Vec2::new(1_000_000, 400_000),
        200_000,
        Some(other),
    );

    let outcome = parse_rules(
        r#"
(rule base (constraint clearance (min 0.1mm)))
(rule inner_layers (layer inner) (constraint clearance (min 0.2mm)))
(rule hv_inner (layer inner) (condition "A.NetClass == 'HV'") (constraint clearance (min 0.4mm)))
"#,
        &BuiltinCatalog,
    );
    assert!(outcome.is_clean());
    let engine = DrcEngine::new(outcome.rules, DesignSettings::default());
    let items: Vec<&copperlint::Item> = board.items().collect();

    let eff = engine.eval_rules(
        ConstraintKind::Clearance,
        &board,
        items[0],
        Some(items[1]),
        Some(Layer::inner(1)),
    );
    assert_eq!(eff.source, ConstraintSource::Rule("hv_inner".into()));

    let eff_outer = engine.eval_rules(
        ConstraintKind::Clearance,
        &board,
        items[0],
        Some(items[1]),
        Some(Layer::F_CU),
    );
    assert_eq!(eff_outer.source, ConstraintSource::Rule("base".into()));
}
