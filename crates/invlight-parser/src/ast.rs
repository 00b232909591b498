//! AST types for filter expressions.
//!
//! The AST is purely syntactic: attribute names are kept as written, together
//! with their source position, and resolved against the attribute registry by
//! the compiler in `invlight-eval`.

use std::fmt;

use serde::Serialize;

// =============================================================================
// Source positions
// =============================================================================

/// A 1-based line/column position in the rule text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
pub struct Position {
    pub line: usize,
    pub column: usize,
}

impl Position {
    pub fn new(line: usize, column: usize) -> Self {
        Position { line, column }
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "line {}, column {}", self.line, self.column)
    }
}

// =============================================================================
// Expressions
// =============================================================================

/// A parsed filter expression.
///
/// `And` / `Or` are n-ary: `a and b and c` is a single `And` with three
/// children.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum Expr {
    And(Vec<Expr>),
    Or(Vec<Expr>),
    Not(Box<Expr>),
    Predicate(Predicate),
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expr::And(args) => {
                let parts: Vec<String> = args.iter().map(|a| format!("{a}")).collect();
                write!(f, "({})", parts.join(" and "))
            }
            Expr::Or(args) => {
                let parts: Vec<String> = args.iter().map(|a| format!("{a}")).collect();
                write!(f, "({})", parts.join(" or "))
            }
            Expr::Not(arg) => write!(f, "not {arg}"),
            Expr::Predicate(p) => write!(f, "{p}"),
        }
    }
}

impl Expr {
    /// Visit every predicate in the tree, left to right.
    pub fn predicates(&self) -> Vec<&Predicate> {
        let mut out = Vec::new();
        collect_predicates(self, &mut out);
        out
    }
}

fn collect_predicates<'a>(expr: &'a Expr, out: &mut Vec<&'a Predicate>) {
    match expr {
        Expr::And(args) | Expr::Or(args) => {
            for a in args {
                collect_predicates(a, out);
            }
        }
        Expr::Not(inner) => collect_predicates(inner, out),
        Expr::Predicate(p) => out.push(p),
    }
}

/// A single test against one item attribute.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Predicate {
    pub attribute: AttributeRef,
    pub test: Test,
}

impl fmt::Display for Predicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = &self.attribute.name;
        match &self.test {
            Test::Compare { op, value } => write!(f, "{name} {op} {value}"),
            Test::In { values, negated } => {
                let parts: Vec<String> = values.iter().map(|v| format!("{v}")).collect();
                let kw = if *negated { "not in" } else { "in" };
                write!(f, "{name} {kw} [{}]", parts.join(", "))
            }
            Test::IsTrue => write!(f, "{name}"),
        }
    }
}

/// An attribute name as written in the rule text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AttributeRef {
    pub name: String,
    pub position: Position,
}

/// The test applied to an attribute.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum Test {
    /// `Attr <op> literal`, including the method form `Attr.Contains("x")`.
    Compare { op: CompareOp, value: Literal },
    /// `Attr in [..]` / `Attr not in [..]`.
    In { values: Vec<Literal>, negated: bool },
    /// Bare attribute: true when the (boolean) attribute is set.
    IsTrue,
}

/// Binary comparison operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CompareOp {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    Contains,
    StartsWith,
    EndsWith,
    Matches,
}

impl fmt::Display for CompareOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            CompareOp::Eq => "==",
            CompareOp::Ne => "!=",
            CompareOp::Lt => "<",
            CompareOp::Le => "<=",
            CompareOp::Gt => ">",
            CompareOp::Ge => ">=",
            CompareOp::Contains => "contains",
            CompareOp::StartsWith => "startswith",
            CompareOp::EndsWith => "endswith",
            CompareOp::Matches => "matches",
        };
        f.write_str(s)
    }
}

// =============================================================================
// Literals
// =============================================================================

/// A literal value in rule text.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum Literal {
    String(String),
    Integer(i64),
    Float(f64),
    Bool(bool),
}

impl Literal {
    /// Short type name used in error messages.
    pub fn type_name(&self) -> &'static str {
        match self {
            Literal::String(_) => "string",
            Literal::Integer(_) => "integer",
            Literal::Float(_) => "float",
            Literal::Bool(_) => "boolean",
        }
    }

    /// Numeric view of integer and float literals.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Literal::Integer(n) => Some(*n as f64),
            Literal::Float(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Literal::String(s) => Some(s),
            _ => None,
        }
    }
}

impl fmt::Display for Literal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Literal::String(s) => {
                f.write_str("\"")?;
                for c in s.chars() {
                    match c {
                        '"' => f.write_str("\\\"")?,
                        '\\' => f.write_str("\\\\")?,
                        '\n' => f.write_str("\\n")?,
                        '\t' => f.write_str("\\t")?,
                        '\r' => f.write_str("\\r")?,
                        other => write!(f, "{other}")?,
                    }
                }
                f.write_str("\"")
            }
            Literal::Integer(n) => write!(f, "{n}"),
            Literal::Float(n) => {
                // fixed-point: the grammar has no exponent form
                let text = n.to_string();
                if text.contains('.') {
                    f.write_str(&text)
                } else {
                    write!(f, "{text}.0")
                }
            }
            Literal::Bool(b) => write!(f, "{b}"),
        }
    }
}
