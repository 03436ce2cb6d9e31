use std::fmt;

/// Which item of the candidate pair an identifier refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Subject {
    A,
    B,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareOp {
    Eq,
    Neq,
    Gt,
    Gte,
    Lt,
    Lte,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArithOp {
    Add,
    Sub,
    Mul,
    Div,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Neg,
    Not,
}

/// Condition expression AST. Numbers carry internal units already (unit
/// suffixes are normalized during parsing).
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Number(f64),
    Str(String),
    Property {
        subject: Subject,
        name: String,
    },
    Call {
        subject: Subject,
        func: String,
        arg: Option<String>,
    },
    Unary(UnaryOp, Box<Expr>),
    Arith(ArithOp, Box<Expr>, Box<Expr>),
    Compare(CompareOp, Box<Expr>, Box<Expr>),
    And(Box<Expr>, Box<Expr>),
    Or(Box<Expr>, Box<Expr>),
}

/// Count of predicate leaves (comparisons and calls), used when deriving
/// a rule's specificity score from its condition.
#[must_use]
pub fn predicate_leaves(expr: &Expr) -> u32 {
    match expr {
        Expr::Compare(..) | Expr::Call { .. } => 1,
        Expr::Property { .. } | Expr::Number(_) | Expr::Str(_) => 0,
        Expr::Unary(_, inner) => predicate_leaves(inner),
        Expr::Arith(_, a, b) | Expr::And(a, b) | Expr::Or(a, b) => {
            predicate_leaves(a) + predicate_leaves(b)
        }
    }
}

impl fmt::Display for Subject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Subject::A => write!(f, "A"),
            Subject::B => write!(f, "B"),
        }
    }
}

impl fmt::Display for CompareOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            CompareOp::Eq => "==",
            CompareOp::Neq => "!=",
            CompareOp::Gt => ">",
            CompareOp::Gte => ">=",
            CompareOp::Lt => "<",
            CompareOp::Lte => "<=",
        };
        write!(f, "{s}")
    }
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expr::Number(n) => write!(f, "{n}"),
            Expr::Str(s) => write!(f, "'{s}'"),
            Expr::Property { subject, name } => write!(f, "{subject}.{name}"),
            Expr::Call { subject, func, arg } => match arg {
                Some(a) => write!(f, "{subject}.{func}('{a}')"),
                None => write!(f, "{subject}.{func}()"),
            },
            Expr::Unary(UnaryOp::Neg, e) => write!(f, "-{e}"),
            Expr::Unary(UnaryOp::Not, e) => write!(f, "!{e}"),
            Expr::Arith(op, a, b) => {
                let s = match op {
                    ArithOp::Add => "+",
                    ArithOp::Sub => "-",
                    ArithOp::Mul => "*",
                    ArithOp::Div => "/",
                };
                write!(f, "({a} {s} {b})")
            }
            Expr::Compare(op, a, b) => write!(f, "({a} {op} {b})"),
            Expr::And(a, b) => write!(f, "({a} && {b})"),
            Expr::Or(a, b) => write!(f, "({a} || {b})"),
        }
    }
}
