use thiserror::Error;

use crate::expr::ExprError;
use crate::report::ExclusionStoreError;
use crate::rules::RuleParseError;

/// Unified error type covering expression compilation, rule-file
/// loading, exclusion persistence, and I/O.
#[derive(Debug, Error)]
pub enum DrcError {
    #[error(transparent)]
    Expr(#[from] ExprError),

    #[error(transparent)]
    Rule(#[from] RuleParseError),

    #[error(transparent)]
    Exclusions(#[from] ExclusionStoreError),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}
