//! Design rule checking for printed circuit boards.
//!
//! Rules are written in a small text DSL, compiled once against the
//! item property catalog, and resolved per item (or item pair) by a
//! priority scan. Geometry checks run as independent providers that
//! report [`Violation`] records with stable identities, so reviewed
//! findings can be waived across runs.
//!
//! ```
//! use copperlint::{
//!     Board, BuiltinCatalog, DesignSettings, DrcEngine, DrcRunner, Layer, NullReporter,
//!     parse_rules,
//! };
//! use copperlint::geom::Vec2;
//!
//! let mut board = Board::new(2);
//! board.set_settings(DesignSettings {
//!     min_track_width: Some(200_000),
//!     ..DesignSettings::default()
//! });
//! board.add_segment(Layer::F_CU, Vec2::new(0, 0), Vec2::new(2_000_000, 0), 150_000, None);
//!
//! let rules = parse_rules("(version 1)", &BuiltinCatalog);
//! let engine = DrcEngine::new(rules.rules, board.settings().clone());
//! let report = DrcRunner::with_default_providers().run(&board, &engine, &NullReporter, None);
//! assert_eq!(report.violations.len(), 1);
//! ```

pub mod board;
mod error;
pub mod expr;
pub mod geom;
pub mod providers;
pub mod report;
pub mod rules;
pub mod run;
pub mod units;

pub use board::{
    Board, BuiltinCatalog, DesignSettings, Item, ItemId, Layer, LayerSet, NetId, Pad,
    PropertyCatalog, Track, TrackShape, Via, ViaType,
};
pub use error::DrcError;
pub use expr::{compile, CompiledExpr, EvalContext, ExprError, Value};
pub use report::{ErrorKind, ExclusionSet, ExclusionStore, JsonFileStore, MemoryStore, Violation};
pub use rules::{
    parse_rules, parse_rules_file, Constraint, ConstraintKind, ConstraintSource, DrcEngine, EffectiveConstraint,
    EngineConfig, MinOptMax, ParseOutcome, Rule, RuleParseError, Severity,
};
pub use run::{
    DrcReport, DrcRunner, NullReporter, ProgressReporter, ProviderError, ProviderStatus,
    RunContext, RunOutcome, TestProvider,
};
