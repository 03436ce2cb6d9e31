//! Rule-file parser.
//!
//! Rule files are s-expressions:
//!
//! ```text
//! (version 1)
//! (rule "HV clearance"
//!   (severity error)
//!   (layer outer)
//!   (condition "A.NetClass == 'HV'")
//!   (constraint clearance (min 1.5mm)))
//! ```
//!
//! Parsing collects every error instead of stopping at the first: a
//! malformed top-level form is reported with its source offset and
//! skipped, and all well-formed rules still load.

use std::fmt;

use winnow::combinator::{alt, cut_err, repeat};
use winnow::error::{ErrMode, ModalResult, StrContext, StrContextValue};
use winnow::prelude::*;
use winnow::token::take_while;

use crate::board::{Layer, LayerSet, PropertyCatalog};
use crate::expr::{self, grammar};

use super::model::{Constraint, ConstraintKind, MinOptMax, Rule, Severity};

/// One rule-file error, with the byte offset it was detected at.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuleParseError {
    pub offset: usize,
    pub message: String,
}

impl fmt::Display for RuleParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "rule parse error at offset {}: {}", self.offset, self.message)
    }
}

impl std::error::Error for RuleParseError {}

/// Result of parsing a rule file: the rules that loaded plus every error
/// encountered.
#[derive(Debug, Default)]
pub struct ParseOutcome {
    pub rules: Vec<Rule>,
    pub errors: Vec<RuleParseError>,
}

impl ParseOutcome {
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.errors.is_empty()
    }
}

/// Read and parse a rule file from disk.
///
/// # Errors
///
/// Fails only on I/O; malformed rules are collected in the returned
/// [`ParseOutcome`].
pub fn parse_rules_file(
    path: &std::path::Path,
    catalog: &dyn PropertyCatalog,
) -> Result<ParseOutcome, crate::DrcError> {
    let source = std::fs::read_to_string(path)?;
    Ok(parse_rules(&source, catalog))
}

/// Parse rule-file source, compiling conditions against `catalog`.
/// Declaration order of the returned rules is the file order.
#[must_use]
pub fn parse_rules(source: &str, catalog: &dyn PropertyCatalog) -> ParseOutcome {
    let mut outcome = ParseOutcome::default();
    let mut pos = 0;

    loop {
        pos = skip_trivia(source, pos);
        if pos >= source.len() {
            break;
        }
        if source.as_bytes()[pos] != b'(' {
            outcome.errors.push(RuleParseError {
                offset: pos,
                message: "expected '(' at top level".to_owned(),
            });
            match source[pos..].find('(') {
                Some(delta) => pos += delta,
                None => break,
            }
            continue;
        }

        let Some(end) = balanced_form_end(source, pos) else {
            outcome.errors.push(RuleParseError {
                offset: pos,
                message: "unclosed form".to_owned(),
            });
            break;
        };

        let form_src = &source[pos..end];
        match form.parse(form_src) {
            Ok(Form::Version(_)) => {}
            Ok(Form::Rule(parsed)) => match finish_rule(parsed, catalog) {
                Ok(rule) => outcome.rules.push(rule),
                Err(message) => outcome.errors.push(RuleParseError {
                    offset: pos,
                    message,
                }),
            },
            Err(e) => outcome.errors.push(RuleParseError {
                offset: pos + e.offset(),
                message: e.inner().to_string(),
            }),
        }
        pos = end;
    }

    outcome
}

/// Skip whitespace and `#` line comments outside any form.
fn skip_trivia(source: &str, mut pos: usize) -> usize {
    let bytes = source.as_bytes();
    while pos < bytes.len() {
        match bytes[pos] {
            b' ' | b'\t' | b'\r' | b'\n' => pos += 1,
            b'#' => {
                while pos < bytes.len() && bytes[pos] != b'\n' {
                    pos += 1;
                }
            }
            _ => break,
        }
    }
    pos
}

/// Byte offset one past the close paren matching the open paren at
/// `start`, honoring quoted strings and comments.
fn balanced_form_end(source: &str, start: usize) -> Option<usize> {
    let bytes = source.as_bytes();
    let mut depth = 0usize;
    let mut quote: Option<u8> = None;
    let mut i = start;
    while i < bytes.len() {
        let b = bytes[i];
        match quote {
            Some(q) => {
                if b == b'\\' {
                    i += 1;
                } else if b == q {
                    quote = None;
                }
            }
            None => match b {
                b'\'' | b'"' => quote = Some(b),
                b'#' => {
                    while i < bytes.len() && bytes[i] != b'\n' {
                        i += 1;
                    }
                }
                b'(' => depth += 1,
                b')' => {
                    depth -= 1;
                    if depth == 0 {
                        return Some(i + 1);
                    }
                }
                _ => {}
            },
        }
        i += 1;
    }
    None
}

// -- Form grammar -----------------------------------------------------------

enum Form {
    Version(i64),
    Rule(RuleForm),
}

#[derive(Default)]
struct RuleForm {
    name: String,
    severity: Option<Severity>,
    layer: Option<LayerSet>,
    condition_src: Option<String>,
    constraints: Vec<(ConstraintKind, MinOptMax)>,
}

fn ws(input: &mut &str) -> ModalResult<()> {
    let _: () = repeat(
        0..,
        alt((
            take_while(1.., |c: char| c.is_ascii_whitespace()).void(),
            ('#', take_while(0.., |c: char| c != '\n')).void(),
        )),
    )
    .parse_next(input)?;
    Ok(())
}

fn keyword<'i>(input: &mut &'i str) -> ModalResult<&'i str> {
    take_while(1.., |c: char| c.is_ascii_alphanumeric() || c == '_').parse_next(input)
}

fn rule_name(input: &mut &str) -> ModalResult<String> {
    alt((grammar::string_literal, keyword.map(str::to_owned))).parse_next(input)
}

fn length_iu(input: &mut &str) -> ModalResult<i64> {
    #[allow(clippy::cast_possible_truncation)]
    grammar::number_literal
        .map(|v| v.round() as i64)
        .parse_next(input)
}

fn bound(input: &mut &str) -> ModalResult<(&'static str, i64)> {
    ws.parse_next(input)?;
    '('.parse_next(input)?;
    ws.parse_next(input)?;
    let which = alt(("min".value("min"), "opt".value("opt"), "max".value("max")))
        .context(StrContext::Expected(StrContextValue::Description(
            "min, opt or max",
        )))
        .parse_next(input)?;
    ws.parse_next(input)?;
    let value = cut_err(length_iu).parse_next(input)?;
    ws.parse_next(input)?;
    cut_err(')').parse_next(input)?;
    Ok((which, value))
}

fn constraint_clause(input: &mut &str) -> ModalResult<(ConstraintKind, MinOptMax)> {
    let kind_word = cut_err(keyword)
        .context(StrContext::Expected(StrContextValue::Description(
            "constraint kind",
        )))
        .parse_next(input)?;
    let Some(kind) = ConstraintKind::from_keyword(kind_word) else {
        return Err(ErrMode::from_input(input).cut());
    };
    let bounds: Vec<(&str, i64)> = repeat(0.., bound).parse_next(input)?;
    let mut range = MinOptMax::default();
    for (which, value) in bounds {
        match which {
            "min" => range.min = Some(value),
            "opt" => range.opt = Some(value),
            _ => range.max = Some(value),
        }
    }
    Ok((kind, range))
}

fn layer_clause(input: &mut &str) -> ModalResult<LayerSet> {
    alt((
        "outer".value(LayerSet::outer()),
        "inner".value(LayerSet::inner()),
        grammar::string_literal.try_map(|name: String| {
            Layer::parse(&name)
                .map(LayerSet::single)
                .ok_or_else(|| RuleParseError {
                    offset: 0,
                    message: format!("unknown layer '{name}'"),
                })
        }),
    ))
    .context(StrContext::Expected(StrContextValue::Description(
        "outer, inner or a layer name",
    )))
    .parse_next(input)
}

fn severity_clause(input: &mut &str) -> ModalResult<Severity> {
    let word = cut_err(keyword).parse_next(input)?;
    Severity::from_keyword(word).ok_or_else(|| ErrMode::from_input(input).cut())
}

fn rule_clause(input: &mut &str, rule: &mut RuleForm) -> ModalResult<()> {
    ws.parse_next(input)?;
    '('.parse_next(input)?;
    ws.parse_next(input)?;
    let head = cut_err(keyword)
        .context(StrContext::Expected(StrContextValue::Description(
            "severity, layer, condition or constraint",
        )))
        .parse_next(input)?;
    ws.parse_next(input)?;
    match head {
        "severity" => rule.severity = Some(severity_clause(input)?),
        "layer" => rule.layer = Some(layer_clause(input)?),
        "condition" => rule.condition_src = Some(cut_err(grammar::string_literal).parse_next(input)?),
        "constraint" => {
            let parsed = constraint_clause(input)?;
            rule.constraints.push(parsed);
        }
        _ => return Err(ErrMode::from_input(input).cut()),
    }
    ws.parse_next(input)?;
    cut_err(')').parse_next(input)?;
    Ok(())
}

fn rule_form(input: &mut &str) -> ModalResult<RuleForm> {
    let mut rule = RuleForm {
        name: cut_err(rule_name)
            .context(StrContext::Expected(StrContextValue::Description(
                "rule name",
            )))
            .parse_next(input)?,
        ..RuleForm::default()
    };
    loop {
        let checkpoint = input.checkpoint();
        ws.parse_next(input)?;
        if input.starts_with(')') || input.is_empty() {
            input.reset(&checkpoint);
            break;
        }
        rule_clause(input, &mut rule)?;
    }
    Ok(rule)
}

fn form(input: &mut &str) -> ModalResult<Form> {
    ws.parse_next(input)?;
    '('.parse_next(input)?;
    ws.parse_next(input)?;
    let head = cut_err(keyword)
        .context(StrContext::Expected(StrContextValue::Description(
            "version or rule",
        )))
        .parse_next(input)?;
    ws.parse_next(input)?;
    let parsed = match head {
        "version" => Form::Version(
            cut_err(winnow::ascii::dec_int::<_, i64, _>).parse_next(input)?,
        ),
        "rule" => Form::Rule(rule_form(input)?),
        _ => return Err(ErrMode::from_input(input).cut()),
    };
    ws.parse_next(input)?;
    cut_err(')').parse_next(input)?;
    ws.parse_next(input)?;
    Ok(parsed)
}

fn finish_rule(parsed: RuleForm, catalog: &dyn PropertyCatalog) -> Result<Rule, String> {
    if parsed.constraints.is_empty() {
        return Err(format!("rule '{}' declares no constraint", parsed.name));
    }

    let condition = match &parsed.condition_src {
        Some(src) => Some(
            expr::compile(src, catalog)
                .map_err(|e| format!("in rule '{}': condition {e}", parsed.name))?,
        ),
        None => None,
    };

    let severity = parsed.severity.unwrap_or(Severity::Error);
    let priority = Rule::computed_priority(parsed.layer, condition.as_ref());
    Ok(Rule {
        name: parsed.name,
        priority,
        layer_filter: parsed.layer,
        condition,
        constraints: parsed
            .constraints
            .into_iter()
            .map(|(kind, range)| Constraint {
                kind,
                range,
                severity,
            })
            .collect(),
    })
}
