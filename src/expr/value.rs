use std::cmp::Ordering;
use std::fmt;

use super::ast::CompareOp;

/// Runtime value of an expression: a number (booleans are 0.0/1.0) or a
/// string.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Number(f64),
    Str(String),
}

impl Value {
    /// Truthiness for condition results: non-zero numbers and non-empty
    /// strings are true.
    #[must_use]
    pub fn is_truthy(&self) -> bool {
        match self {
            Value::Number(n) => *n != 0.0,
            Value::Str(s) => !s.is_empty(),
        }
    }

    /// Numeric view; non-numeric strings coerce to 0.
    #[must_use]
    pub fn as_number(&self) -> f64 {
        match self {
            Value::Number(n) => *n,
            Value::Str(s) => s.trim().parse().unwrap_or(0.0),
        }
    }

    /// Compare under the given operator. Comparison never fails: when one
    /// side is a string, a numeric comparison is attempted first and the
    /// comparison falls back to string ordering if the string is not
    /// numeric.
    #[must_use]
    pub fn compare(&self, op: CompareOp, other: &Value) -> bool {
        let ord = self.ordering(other);
        match op {
            CompareOp::Eq => ord == Ordering::Equal,
            CompareOp::Neq => ord != Ordering::Equal,
            CompareOp::Gt => ord == Ordering::Greater,
            CompareOp::Gte => ord != Ordering::Less,
            CompareOp::Lt => ord == Ordering::Less,
            CompareOp::Lte => ord != Ordering::Greater,
        }
    }

    fn ordering(&self, other: &Value) -> Ordering {
        match (self, other) {
            (Value::Number(a), Value::Number(b)) => a.partial_cmp(b).unwrap_or(Ordering::Equal),
            (Value::Str(a), Value::Str(b)) => {
                match (a.trim().parse::<f64>(), b.trim().parse::<f64>()) {
                    (Ok(x), Ok(y)) => x.partial_cmp(&y).unwrap_or(Ordering::Equal),
                    _ => a.cmp(b),
                }
            }
            (Value::Number(a), Value::Str(s)) => match s.trim().parse::<f64>() {
                Ok(b) => a.partial_cmp(&b).unwrap_or(Ordering::Equal),
                Err(_) => format_number(*a).cmp(s),
            },
            (Value::Str(s), Value::Number(b)) => match s.trim().parse::<f64>() {
                Ok(a) => a.partial_cmp(b).unwrap_or(Ordering::Equal),
                Err(_) => s.as_str().cmp(&format_number(*b)),
            },
        }
    }
}

fn format_number(n: f64) -> String {
    if n.fract() == 0.0 && n.abs() < 1e15 {
        format!("{}", n as i64)
    } else {
        format!("{n}")
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Number(if v { 1.0 } else { 0.0 })
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Number(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Str(v.to_owned())
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Number(n) => write!(f, "{n}"),
            Value::Str(s) => write!(f, "'{s}'"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn truthiness() {
        assert!(Value::Number(1.0).is_truthy());
        assert!(Value::Number(-0.5).is_truthy());
        assert!(!Value::Number(0.0).is_truthy());
        assert!(Value::Str("x".into()).is_truthy());
        assert!(!Value::Str(String::new()).is_truthy());
    }

    #[test]
    fn numeric_compare() {
        let a = Value::Number(10.0);
        let b = Value::Number(20.0);
        assert!(a.compare(CompareOp::Lt, &b));
        assert!(!a.compare(CompareOp::Eq, &b));
        assert!(a.compare(CompareOp::Lte, &a));
    }

    #[test]
    fn numeric_string_compares_numerically() {
        let a = Value::Str("10".into());
        let b = Value::Number(9.5);
        assert!(a.compare(CompareOp::Gt, &b));
        let c = Value::Str("9".into());
        // String ordering would say "10" < "9"; numeric fallback must win.
        assert!(a.compare(CompareOp::Gt, &c));
    }

    #[test]
    fn non_numeric_string_falls_back_to_string_compare() {
        let a = Value::Str("HV".into());
        let b = Value::Str("HV".into());
        assert!(a.compare(CompareOp::Eq, &b));
        assert!(Value::Str("apple".into()).compare(CompareOp::Lt, &Value::Str("banana".into())));
    }

    #[test]
    fn as_number_coerces() {
        assert_eq!(Value::Str(" 2.5 ".into()).as_number(), 2.5);
        assert_eq!(Value::Str("F.Cu".into()).as_number(), 0.0);
        assert_eq!(Value::from(true).as_number(), 1.0);
    }
}
