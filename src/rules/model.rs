use std::fmt;

use serde::Serialize;

use crate::board::{Layer, LayerSet};
use crate::expr::CompiledExpr;

/// How a broken constraint is reported.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Error,
    Warning,
    Ignore,
}

impl Severity {
    #[must_use]
    pub fn keyword(self) -> &'static str {
        match self {
            Severity::Error => "error",
            Severity::Warning => "warning",
            Severity::Ignore => "ignore",
        }
    }

    #[must_use]
    pub fn from_keyword(s: &str) -> Option<Self> {
        match s {
            "error" => Some(Severity::Error),
            "warning" => Some(Severity::Warning),
            "ignore" => Some(Severity::Ignore),
            _ => None,
        }
    }
}

/// Closed enumeration of measurable constraint kinds. The keyword
/// spellings are a stable rule-file contract.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConstraintKind {
    Clearance,
    HoleClearance,
    HoleSize,
    HoleToHole,
    TrackWidth,
    AnnularWidth,
    ViaDiameter,
    DiffPairGap,
    DiffPairUncoupled,
    EdgeClearance,
    Disallow,
}

impl ConstraintKind {
    pub const ALL: [ConstraintKind; 11] = [
        ConstraintKind::Clearance,
        ConstraintKind::HoleClearance,
        ConstraintKind::HoleSize,
        ConstraintKind::HoleToHole,
        ConstraintKind::TrackWidth,
        ConstraintKind::AnnularWidth,
        ConstraintKind::ViaDiameter,
        ConstraintKind::DiffPairGap,
        ConstraintKind::DiffPairUncoupled,
        ConstraintKind::EdgeClearance,
        ConstraintKind::Disallow,
    ];

    #[must_use]
    pub fn keyword(self) -> &'static str {
        match self {
            ConstraintKind::Clearance => "clearance",
            ConstraintKind::HoleClearance => "hole_clearance",
            ConstraintKind::HoleSize => "hole_size",
            ConstraintKind::HoleToHole => "hole_to_hole",
            ConstraintKind::TrackWidth => "track_width",
            ConstraintKind::AnnularWidth => "annular_width",
            ConstraintKind::ViaDiameter => "via_diameter",
            ConstraintKind::DiffPairGap => "diff_pair_gap",
            ConstraintKind::DiffPairUncoupled => "diff_pair_uncoupled",
            ConstraintKind::EdgeClearance => "edge_clearance",
            ConstraintKind::Disallow => "disallow",
        }
    }

    #[must_use]
    pub fn from_keyword(s: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|k| k.keyword() == s)
    }
}

impl fmt::Display for ConstraintKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.keyword())
    }
}

/// Accepted value range of a constraint, internal units. Any subset of
/// the three bounds may be present.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MinOptMax {
    pub min: Option<i64>,
    pub opt: Option<i64>,
    pub max: Option<i64>,
}

impl MinOptMax {
    #[must_use]
    pub fn min(value: i64) -> Self {
        Self {
            min: Some(value),
            ..Self::default()
        }
    }
}

/// One constraint declared by a rule.
#[derive(Debug, Clone)]
pub struct Constraint {
    pub kind: ConstraintKind,
    pub range: MinOptMax,
    pub severity: Severity,
}

/// A parsed, compiled rule. Immutable once built; recompiled only when
/// its source text changes.
#[derive(Debug, Clone)]
pub struct Rule {
    pub name: String,
    /// Specificity score, derived: +1 for a layer filter plus one per
    /// predicate leaf of the condition. Higher outranks lower.
    pub priority: u32,
    pub layer_filter: Option<LayerSet>,
    pub condition: Option<CompiledExpr>,
    pub constraints: Vec<Constraint>,
}

impl Rule {
    /// Compute the derived specificity score for a rule's filters.
    #[must_use]
    pub fn computed_priority(layer_filter: Option<LayerSet>, condition: Option<&CompiledExpr>) -> u32 {
        u32::from(layer_filter.is_some()) + condition.map_or(0, CompiledExpr::specificity)
    }

    /// Whether a query layer passes this rule's layer filter. A query
    /// without a layer (board-wide checks such as via diameter) matches
    /// any filter.
    #[must_use]
    pub fn matches_layer(&self, layer: Option<Layer>) -> bool {
        match (self.layer_filter, layer) {
            (Some(filter), Some(layer)) => filter.contains(layer),
            _ => true,
        }
    }

    #[must_use]
    pub fn constraint(&self, kind: ConstraintKind) -> Option<&Constraint> {
        self.constraints.iter().find(|c| c.kind == kind)
    }
}
