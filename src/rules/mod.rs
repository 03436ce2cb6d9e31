//! Rule model, rule-file parsing, and constraint resolution.

mod engine;
mod model;
pub(crate) mod parse;

pub use engine::{ConstraintSource, DrcEngine, EffectiveConstraint, EngineConfig};
pub use model::{Constraint, ConstraintKind, MinOptMax, Rule, Severity};
pub use parse::{parse_rules, parse_rules_file, ParseOutcome, RuleParseError};
