//! Constraint resolution.
//!
//! The engine owns the compiled rule set, bucketed per constraint kind
//! and sorted so that resolution is a linear scan stopping at the first
//! match. Rules whose condition fails to evaluate are poisoned: logged
//! once, then skipped for the rest of the run.

use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use tracing::{debug, warn};

use crate::board::{Board, DesignSettings, Item, Layer};
use crate::expr::EvalContext;
use crate::report::ErrorKind;

use super::model::{ConstraintKind, MinOptMax, Rule, Severity};

/// Where an effective constraint came from. Carried onto violations so
/// a report can say which rule fired.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConstraintSource {
    /// A named rule from a rule file.
    Rule(String),
    /// The board's design settings, used when no rule matched.
    ImplicitDefault,
    /// Nothing constrains this kind for this query.
    None,
}

impl ConstraintSource {
    #[must_use]
    pub fn rule_name(&self) -> Option<&str> {
        match self {
            ConstraintSource::Rule(name) => Some(name),
            _ => None,
        }
    }
}

/// Outcome of resolving one constraint query.
#[derive(Debug, Clone)]
pub struct EffectiveConstraint {
    pub kind: ConstraintKind,
    pub range: MinOptMax,
    pub severity: Severity,
    pub source: ConstraintSource,
}

impl EffectiveConstraint {
    fn none(kind: ConstraintKind) -> Self {
        Self {
            kind,
            range: MinOptMax::default(),
            severity: Severity::Ignore,
            source: ConstraintSource::None,
        }
    }

    /// Whether checks should skip this query entirely.
    #[must_use]
    pub fn is_ignored(&self) -> bool {
        self.source == ConstraintSource::None || self.severity == Severity::Ignore
    }

    /// Phrase for violation messages: "rule 'x'" or "board setup
    /// constraints".
    #[must_use]
    pub fn source_description(&self) -> String {
        match &self.source {
            ConstraintSource::Rule(name) => format!("rule '{name}'"),
            ConstraintSource::ImplicitDefault => "board setup constraints".to_owned(),
            ConstraintSource::None => "no constraint".to_owned(),
        }
    }
}

/// Tunables; defaults match interactive use.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Per-kind cap on reported violations. Further hits of the same
    /// kind are counted but not recorded.
    pub max_errors_per_kind: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_errors_per_kind: 500,
        }
    }
}

struct Bucket {
    /// Indices into `rules`, sorted priority-descending; ties keep
    /// declaration order.
    members: Vec<usize>,
}

/// The resolver. Build once per run from parsed rules and the board's
/// design settings; shareable across worker threads.
pub struct DrcEngine {
    rules: Vec<Rule>,
    buckets: Vec<Bucket>,
    settings: DesignSettings,
    config: EngineConfig,
    /// Rules whose condition errored at runtime. Checked before every
    /// evaluation so a bad rule costs one log line, not thousands.
    poisoned: Mutex<HashSet<usize>>,
    counts: [AtomicUsize; ErrorKind::COUNT],
}

impl DrcEngine {
    #[must_use]
    pub fn new(rules: Vec<Rule>, settings: DesignSettings) -> Self {
        Self::with_config(rules, settings, EngineConfig::default())
    }

    #[must_use]
    pub fn with_config(rules: Vec<Rule>, settings: DesignSettings, config: EngineConfig) -> Self {
        let mut buckets: Vec<Bucket> = ConstraintKind::ALL
            .iter()
            .map(|_| Bucket { members: Vec::new() })
            .collect();
        for (i, rule) in rules.iter().enumerate() {
            for constraint in &rule.constraints {
                buckets[kind_index(constraint.kind)].members.push(i);
            }
        }
        for bucket in &mut buckets {
            bucket
                .members
                .sort_by(|&a, &b| rules[b].priority.cmp(&rules[a].priority));
        }
        Self {
            rules,
            buckets,
            settings,
            config,
            poisoned: Mutex::new(HashSet::new()),
            counts: Default::default(),
        }
    }

    #[must_use]
    pub fn settings(&self) -> &DesignSettings {
        &self.settings
    }

    #[must_use]
    pub fn rules(&self) -> &[Rule] {
        &self.rules
    }

    /// Whether any rule or implicit default constrains `kind`. Checks
    /// with nothing to enforce are skipped up front.
    #[must_use]
    pub fn has_rules_for(&self, kind: ConstraintKind) -> bool {
        !self.buckets[kind_index(kind)].members.is_empty() || self.implicit_min(kind).is_some()
    }

    /// Resolve the effective constraint of `kind` for an item (or item
    /// pair) on a layer. Highest-priority matching rule wins; ties go
    /// to the earlier declaration. Falls back to the board's design
    /// settings, then to no constraint.
    #[must_use]
    pub fn eval_rules(
        &self,
        kind: ConstraintKind,
        board: &Board,
        a: &Item,
        b: Option<&Item>,
        layer: Option<Layer>,
    ) -> EffectiveConstraint {
        for &idx in &self.buckets[kind_index(kind)].members {
            let rule = &self.rules[idx];
            if !rule.matches_layer(layer) {
                continue;
            }
            if !self.condition_matches(idx, rule, board, a, b, layer) {
                continue;
            }
            let constraint = rule
                .constraint(kind)
                .unwrap_or_else(|| unreachable!("bucketed rule carries its kind"));
            debug!(rule = %rule.name, kind = %kind, "constraint resolved");
            return EffectiveConstraint {
                kind,
                range: constraint.range,
                severity: constraint.severity,
                source: ConstraintSource::Rule(rule.name.clone()),
            };
        }

        if let Some(min) = self.implicit_min(kind) {
            return EffectiveConstraint {
                kind,
                range: MinOptMax::min(min),
                severity: Severity::Error,
                source: ConstraintSource::ImplicitDefault,
            };
        }

        EffectiveConstraint::none(kind)
    }

    /// Largest minimum any rule or default could impose for `kind`.
    /// Used to size spatial search envelopes; over-estimating is safe,
    /// under-estimating drops real violations.
    #[must_use]
    pub fn worst_case_min(&self, kind: ConstraintKind) -> i64 {
        let rule_max = self.buckets[kind_index(kind)]
            .members
            .iter()
            .filter_map(|&i| self.rules[i].constraint(kind))
            .filter_map(|c| c.range.min)
            .max()
            .unwrap_or(0);
        rule_max.max(self.implicit_min(kind).unwrap_or(0))
    }

    /// Count a violation of `kind`; false once the per-kind cap is hit,
    /// which tells the provider to stop recording that kind.
    pub fn record_violation_kind(&self, kind: ErrorKind) -> bool {
        let n = self.counts[kind.index()].fetch_add(1, Ordering::Relaxed);
        n < self.config.max_errors_per_kind
    }

    #[must_use]
    pub fn is_error_limit_exceeded(&self, kind: ErrorKind) -> bool {
        self.counts[kind.index()].load(Ordering::Relaxed) >= self.config.max_errors_per_kind
    }

    #[must_use]
    pub fn violation_count(&self, kind: ErrorKind) -> usize {
        self.counts[kind.index()].load(Ordering::Relaxed)
    }

    fn implicit_min(&self, kind: ConstraintKind) -> Option<i64> {
        match kind {
            ConstraintKind::TrackWidth => self.settings.min_track_width,
            ConstraintKind::Clearance => self.settings.min_clearance,
            ConstraintKind::AnnularWidth => self.settings.min_annular_width,
            ConstraintKind::ViaDiameter => self.settings.min_via_diameter,
            ConstraintKind::HoleSize => self.settings.min_through_hole,
            _ => None,
        }
    }

    /// A pair query tries both item orderings, so rule authors never
    /// need to care which side of the pair the scan found first.
    fn condition_matches(
        &self,
        idx: usize,
        rule: &Rule,
        board: &Board,
        a: &Item,
        b: Option<&Item>,
        layer: Option<Layer>,
    ) -> bool {
        let Some(condition) = &rule.condition else {
            return true;
        };
        if self.poisoned.lock().is_ok_and(|set| set.contains(&idx)) {
            return false;
        }

        let forward = EvalContext { board, a, b, layer };
        match condition.evaluate(&forward) {
            Ok(v) if v.is_truthy() => return true,
            Ok(_) => {}
            Err(e) => {
                self.poison(idx, rule, &e);
                return false;
            }
        }

        let Some(b) = b else { return false };
        let swapped = EvalContext {
            board,
            a: b,
            b: Some(a),
            layer,
        };
        match condition.evaluate(&swapped) {
            Ok(v) => v.is_truthy(),
            Err(e) => {
                self.poison(idx, rule, &e);
                false
            }
        }
    }

    fn poison(&self, idx: usize, rule: &Rule, error: &dyn std::error::Error) {
        if let Ok(mut set) = self.poisoned.lock() {
            if set.insert(idx) {
                warn!(
                    rule = %rule.name,
                    error = %error,
                    "rule condition failed to evaluate; disabling rule for this run"
                );
            }
        }
    }
}

fn kind_index(kind: ConstraintKind) -> usize {
    ConstraintKind::ALL
        .iter()
        .position(|&k| k == kind)
        .unwrap_or_else(|| unreachable!("every kind is in ALL"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::board::BuiltinCatalog;
    use crate::rules::parse::parse_rules;

    fn board_with_nets() -> Board {
        let mut board = Board::new(2);
        board.set_settings(DesignSettings {
            min_track_width: Some(200_000),
            min_clearance: Some(150_000),
            ..DesignSettings::default()
        });
        let hv = board.add_net("VBUS", "HV");
        let sig = board.add_net("D1", "Signal");
        board.add_segment(
            Layer::F_CU,
            crate::geom::Vec2 { x: 0, y: 0 },
            crate::geom::Vec2 { x: 1_000_000, y: 0 },
            300_000,
            Some(hv),
        );
        board.add_segment(
            Layer::F_CU,
            crate::geom::Vec2 { x: 0, y: 500_000 },
            crate::geom::Vec2 { x: 1_000_000, y: 500_000 },
            300_000,
            Some(sig),
        );
        board
    }

    fn engine_from(src: &str, settings: DesignSettings) -> DrcEngine {
        let outcome = parse_rules(src, &BuiltinCatalog);
        assert!(outcome.is_clean(), "errors: {:?}", outcome.errors);
        DrcEngine::new(outcome.rules, settings)
    }

    #[test]
    fn higher_priority_rule_wins() {
        let board = board_with_nets();
        let engine = engine_from(
            r#"
(rule base (constraint clearance (min 0.1mm)))
(rule hv (condition "A.NetClass == 'HV'") (constraint clearance (min 0.5mm)))
"#,
            DesignSettings::default(),
        );
        let items: Vec<&Item> = board.items().collect();
        let eff = engine.eval_rules(
            ConstraintKind::Clearance,
            &board,
            items[0],
            Some(items[1]),
            Some(Layer::F_CU),
        );
        assert_eq!(eff.range.min, Some(500_000));
        assert_eq!(eff.source, ConstraintSource::Rule("hv".into()));
    }

    #[test]
    fn pair_condition_matches_in_either_order() {
        let board = board_with_nets();
        let engine = engine_from(
            r#"(rule hv (condition "B.NetClass == 'HV'") (constraint clearance (min 0.5mm)))"#,
            DesignSettings::default(),
        );
        let items: Vec<&Item> = board.items().collect();
        // Forward assignment: B is the signal track, no match; swapped
        // assignment puts the HV track on the B side.
        let eff = engine.eval_rules(
            ConstraintKind::Clearance,
            &board,
            items[0],
            Some(items[1]),
            Some(Layer::F_CU),
        );
        assert_eq!(eff.source, ConstraintSource::Rule("hv".into()));
    }

    #[test]
    fn equal_priority_falls_back_to_declaration_order() {
        let board = board_with_nets();
        let engine = engine_from(
            r"
(rule first (constraint clearance (min 0.2mm)))
(rule second (constraint clearance (min 0.3mm)))
",
            DesignSettings::default(),
        );
        let items: Vec<&Item> = board.items().collect();
        let eff = engine.eval_rules(
            ConstraintKind::Clearance,
            &board,
            items[0],
            Some(items[1]),
            Some(Layer::F_CU),
        );
        assert_eq!(eff.source, ConstraintSource::Rule("first".into()));
    }

    #[test]
    fn implicit_default_when_no_rule_matches() {
        let board = board_with_nets();
        let engine = engine_from(
            r#"(rule hv (condition "A.NetClass == 'Nope'") (constraint track_width (min 1mm)))"#,
            board.settings().clone(),
        );
        let items: Vec<&Item> = board.items().collect();
        let eff = engine.eval_rules(ConstraintKind::TrackWidth, &board, items[0], None, None);
        assert_eq!(eff.range.min, Some(200_000));
        assert_eq!(eff.source, ConstraintSource::ImplicitDefault);
        assert_eq!(eff.source_description(), "board setup constraints");
    }

    #[test]
    fn no_rule_and_no_default_is_ignored() {
        let board = board_with_nets();
        let engine = engine_from("", DesignSettings::default());
        let items: Vec<&Item> = board.items().collect();
        let eff = engine.eval_rules(ConstraintKind::ViaDiameter, &board, items[0], None, None);
        assert!(eff.is_ignored());
        assert_eq!(eff.source, ConstraintSource::None);
    }

    #[test]
    fn layer_filter_excludes_other_layers() {
        let board = board_with_nets();
        let engine = engine_from(
            "(rule outer_only (layer outer) (constraint clearance (min 0.4mm)))",
            DesignSettings::default(),
        );
        let items: Vec<&Item> = board.items().collect();
        let outer = engine.eval_rules(
            ConstraintKind::Clearance,
            &board,
            items[0],
            Some(items[1]),
            Some(Layer::F_CU),
        );
        assert_eq!(outer.range.min, Some(400_000));
        let inner = engine.eval_rules(
            ConstraintKind::Clearance,
            &board,
            items[0],
            Some(items[1]),
            Some(Layer::inner(1)),
        );
        assert!(inner.is_ignored());
    }

    #[test]
    fn has_rules_for_considers_defaults() {
        let engine = engine_from("", DesignSettings {
            min_track_width: Some(200_000),
            ..DesignSettings::default()
        });
        assert!(engine.has_rules_for(ConstraintKind::TrackWidth));
        assert!(!engine.has_rules_for(ConstraintKind::Clearance));
    }

    #[test]
    fn worst_case_min_covers_rules_and_defaults() {
        let engine = engine_from(
            r#"
(rule a (constraint clearance (min 0.3mm)))
(rule b (condition "A.NetClass == 'HV'") (constraint clearance (min 0.8mm)))
"#,
            DesignSettings {
                min_clearance: Some(150_000),
                ..DesignSettings::default()
            },
        );
        assert_eq!(engine.worst_case_min(ConstraintKind::Clearance), 800_000);
    }

    #[test]
    fn runtime_condition_error_poisons_the_rule() {
        struct AnythingGoes;
        impl crate::board::PropertyCatalog for AnythingGoes {
            fn has_property(&self, _name: &str) -> bool {
                true
            }
            fn has_function(&self, _name: &str) -> bool {
                true
            }
        }

        // Compiles against a permissive catalog, then errors at
        // evaluation time because no item has a Bogus property.
        let condition = crate::expr::compile("A.Bogus > 1", &AnythingGoes).unwrap();
        let bad = Rule {
            name: "bad".into(),
            priority: Rule::computed_priority(None, Some(&condition)),
            layer_filter: None,
            condition: Some(condition),
            constraints: vec![crate::rules::Constraint {
                kind: ConstraintKind::Clearance,
                range: MinOptMax::min(900_000),
                severity: Severity::Error,
            }],
        };
        let outcome = parse_rules(
            "(rule fallback (constraint clearance (min 0.2mm)))",
            &BuiltinCatalog,
        );
        let mut rules = vec![bad];
        rules.extend(outcome.rules);
        let board = board_with_nets();
        let engine = DrcEngine::new(rules, DesignSettings::default());
        let items: Vec<&Item> = board.items().collect();

        for _ in 0..3 {
            let eff = engine.eval_rules(
                ConstraintKind::Clearance,
                &board,
                items[0],
                Some(items[1]),
                Some(Layer::F_CU),
            );
            assert_eq!(eff.source, ConstraintSource::Rule("fallback".into()));
            assert_eq!(eff.range.min, Some(200_000));
        }
    }

    #[test]
    fn error_limit_caps_per_kind() {
        let engine = DrcEngine::with_config(
            Vec::new(),
            DesignSettings::default(),
            EngineConfig {
                max_errors_per_kind: 2,
            },
        );
        assert!(engine.record_violation_kind(ErrorKind::Clearance));
        assert!(engine.record_violation_kind(ErrorKind::Clearance));
        assert!(!engine.record_violation_kind(ErrorKind::Clearance));
        assert!(engine.is_error_limit_exceeded(ErrorKind::Clearance));
        assert!(!engine.is_error_limit_exceeded(ErrorKind::TrackWidth));
        assert_eq!(engine.violation_count(ErrorKind::Clearance), 3);
    }
}
