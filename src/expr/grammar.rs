use winnow::combinator::{alt, cut_err, delimited, opt, preceded, repeat};
use winnow::error::{ErrMode, ModalResult, StrContext, StrContextValue};
use winnow::prelude::*;
use winnow::token::{any, one_of, take_while};

use crate::units;

use super::ast::{ArithOp, CompareOp, Expr, Subject, UnaryOp};

// -- Whitespace -------------------------------------------------------------

fn ws(input: &mut &str) -> ModalResult<()> {
    take_while(0.., |c: char| c.is_ascii_whitespace())
        .void()
        .parse_next(input)
}

// -- Identifiers ------------------------------------------------------------

fn ident<'i>(input: &mut &'i str) -> ModalResult<&'i str> {
    (
        take_while(1.., |c: char| c.is_ascii_alphabetic() || c == '_'),
        take_while(0.., |c: char| c.is_ascii_alphanumeric() || c == '_'),
    )
        .take()
        .parse_next(input)
}

// -- Literals ---------------------------------------------------------------

/// Numeric literal with optional locale-flexible decimal separator (`.` or
/// `,`) and optional unit suffix, normalized to internal units.
pub(crate) fn number_literal(input: &mut &str) -> ModalResult<f64> {
    let whole = take_while(1.., |c: char| c.is_ascii_digit()).parse_next(input)?;
    let frac: Option<&str> = opt(preceded(
        one_of(['.', ',']),
        take_while(1.., |c: char| c.is_ascii_digit()),
    ))
    .parse_next(input)?;
    let suffix = take_while(0.., |c: char| c.is_ascii_alphabetic()).parse_next(input)?;

    let mut text = whole.to_owned();
    if let Some(frac) = frac {
        text.push('.');
        text.push_str(frac);
    }
    let mut value: f64 = text.parse().map_err(|_| ErrMode::from_input(input).cut())?;
    if !suffix.is_empty() {
        let scale = units::suffix_scale(suffix).ok_or_else(|| ErrMode::from_input(input).cut())?;
        value *= scale;
    }
    Ok(value)
}

/// String literal in single or double quotes with backslash escapes.
pub(crate) fn string_literal(input: &mut &str) -> ModalResult<String> {
    let quote = one_of(['\'', '"']).parse_next(input)?;
    let mut s = String::new();
    loop {
        let ch = any.parse_next(input)?;
        match ch {
            c if c == quote => return Ok(s),
            '\\' => {
                let esc = any.parse_next(input)?;
                match esc {
                    'n' => s.push('\n'),
                    't' => s.push('\t'),
                    other => s.push(other),
                }
            }
            c => s.push(c),
        }
    }
}

// -- Subject properties and calls -------------------------------------------

fn subject(input: &mut &str) -> ModalResult<Subject> {
    alt(('A'.value(Subject::A), 'B'.value(Subject::B))).parse_next(input)
}

/// `A.Width`, `B.NetClass`, `A.isOnLayer('F.Cu')`, `A.isPlated()`.
fn subject_term(input: &mut &str) -> ModalResult<Expr> {
    let subj = subject.parse_next(input)?;
    '.'.parse_next(input)?;
    let name = cut_err(ident)
        .context(StrContext::Expected(StrContextValue::Description(
            "property or function name",
        )))
        .parse_next(input)?;

    if opt((ws, '(')).parse_next(input)?.is_some() {
        ws.parse_next(input)?;
        let arg = opt(string_literal).parse_next(input)?;
        ws.parse_next(input)?;
        cut_err(')')
            .context(StrContext::Expected(StrContextValue::CharLiteral(')')))
            .parse_next(input)?;
        Ok(Expr::Call {
            subject: subj,
            func: name.to_owned(),
            arg,
        })
    } else {
        Ok(Expr::Property {
            subject: subj,
            name: name.to_owned(),
        })
    }
}

// -- Expression ladder (|| < && < compare < +- < */ < unary < primary) ------

fn primary(input: &mut &str) -> ModalResult<Expr> {
    ws.parse_next(input)?;
    alt((
        delimited('(', expression, (ws, cut_err(')'))),
        number_literal.map(Expr::Number),
        string_literal.map(Expr::Str),
        subject_term,
    ))
    .context(StrContext::Expected(StrContextValue::Description(
        "expression",
    )))
    .parse_next(input)
}

fn unary(input: &mut &str) -> ModalResult<Expr> {
    ws.parse_next(input)?;
    if let Some(op) = opt(one_of(['!', '-', '+'])).parse_next(input)? {
        let inner = cut_err(unary).parse_next(input)?;
        Ok(match op {
            '!' => Expr::Unary(UnaryOp::Not, Box::new(inner)),
            '-' => Expr::Unary(UnaryOp::Neg, Box::new(inner)),
            _ => inner,
        })
    } else {
        primary(input)
    }
}

fn mul_expr(input: &mut &str) -> ModalResult<Expr> {
    let first = unary(input)?;
    let rest: Vec<(char, Expr)> = repeat(
        0..,
        (preceded(ws, one_of(['*', '/'])), cut_err(unary)),
    )
    .parse_next(input)?;
    Ok(rest.into_iter().fold(first, |acc, (op, rhs)| {
        let op = if op == '*' { ArithOp::Mul } else { ArithOp::Div };
        Expr::Arith(op, Box::new(acc), Box::new(rhs))
    }))
}

fn add_expr(input: &mut &str) -> ModalResult<Expr> {
    let first = mul_expr(input)?;
    let rest: Vec<(char, Expr)> = repeat(
        0..,
        (preceded(ws, one_of(['+', '-'])), cut_err(mul_expr)),
    )
    .parse_next(input)?;
    Ok(rest.into_iter().fold(first, |acc, (op, rhs)| {
        let op = if op == '+' { ArithOp::Add } else { ArithOp::Sub };
        Expr::Arith(op, Box::new(acc), Box::new(rhs))
    }))
}

fn compare_op(input: &mut &str) -> ModalResult<CompareOp> {
    ws.parse_next(input)?;
    alt((
        "==".value(CompareOp::Eq),
        "!=".value(CompareOp::Neq),
        ">=".value(CompareOp::Gte),
        ">".value(CompareOp::Gt),
        "<=".value(CompareOp::Lte),
        "<".value(CompareOp::Lt),
    ))
    .parse_next(input)
}

fn compare_expr(input: &mut &str) -> ModalResult<Expr> {
    let lhs = add_expr(input)?;
    if let Some(op) = opt(compare_op).parse_next(input)? {
        let rhs = cut_err(add_expr)
            .context(StrContext::Expected(StrContextValue::Description(
                "comparison operand",
            )))
            .parse_next(input)?;
        Ok(Expr::Compare(op, Box::new(lhs), Box::new(rhs)))
    } else {
        Ok(lhs)
    }
}

fn and_expr(input: &mut &str) -> ModalResult<Expr> {
    let first = compare_expr(input)?;
    let rest: Vec<Expr> =
        repeat(0.., preceded((ws, "&&"), cut_err(compare_expr))).parse_next(input)?;
    Ok(rest
        .into_iter()
        .fold(first, |acc, r| Expr::And(Box::new(acc), Box::new(r))))
}

fn or_expr(input: &mut &str) -> ModalResult<Expr> {
    let first = and_expr(input)?;
    let rest: Vec<Expr> = repeat(0.., preceded((ws, "||"), cut_err(and_expr))).parse_next(input)?;
    Ok(rest
        .into_iter()
        .fold(first, |acc, r| Expr::Or(Box::new(acc), Box::new(r))))
}

fn expression(input: &mut &str) -> ModalResult<Expr> {
    ws.parse_next(input)?;
    or_expr(input)
}

/// Full-input expression parser; trailing whitespace is consumed so any
/// leftover input is a parse error with a useful offset.
pub(crate) fn toplevel(input: &mut &str) -> ModalResult<Expr> {
    let expr = expression(input)?;
    ws.parse_next(input)?;
    Ok(expr)
}
