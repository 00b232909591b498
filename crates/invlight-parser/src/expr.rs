//! Filter expression parser using a pest PEG grammar + Pratt parser.
//!
//! Parses rule text like:
//! - `Rarity == "Rare" and ItemLevel >= 80`
//! - `ClassName in ["Ring", "Amulet"] && !IsCorrupted`
//! - `BaseName.Contains("Sapphire") or (Quality > 15 and Sockets >= 3)`

use pest::Parser;
use pest::error::LineColLocation;
use pest::iterators::{Pair, Pairs};
use pest::pratt_parser::{Assoc, Op, PrattParser};
use pest_derive::Parser;

use crate::ast::{AttributeRef, CompareOp, Expr, Literal, Position, Predicate, Test};
use crate::error::{IflParserError, Result};

// ---------------------------------------------------------------------------
// Pest parser (generated from ifl.pest grammar)
// ---------------------------------------------------------------------------

#[derive(Parser)]
#[grammar = "src/ifl.pest"]
struct IflParser;

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// Parse a filter expression into an AST.
///
/// # Examples
///
/// ```
/// use invlight_parser::parse_expression;
///
/// let expr = parse_expression(r#"Rarity == "Rare" and ItemLevel >= 80"#).unwrap();
/// println!("{expr}");
/// ```
pub fn parse_expression(input: &str) -> Result<Expr> {
    check_nesting(input)?;
    let pairs = IflParser::parse(Rule::rule_text, input).map_err(syntax_error)?;

    let pratt = PrattParser::new()
        .op(Op::infix(Rule::or_op, Assoc::Left))
        .op(Op::infix(Rule::and_op, Assoc::Left))
        .op(Op::prefix(Rule::not_op));

    // rule_text = { SOI ~ expr ~ EOI }
    let expr_pair = pairs
        .flat_map(|p| p.into_inner())
        .find(|p| p.as_rule() == Rule::expr)
        .ok_or_else(|| IflParserError::Syntax {
            line: 1,
            column: 1,
            message: "expected an expression".into(),
        })?;

    parse_expr(expr_pair, &pratt)
}

// ---------------------------------------------------------------------------
// Nesting limit
// ---------------------------------------------------------------------------

/// Maximum nesting of `not` operators and parentheses in one expression.
pub const MAX_NESTING_DEPTH: usize = 256;

/// Reject input nested deeper than [`MAX_NESTING_DEPTH`] before it reaches the
/// recursive parser.
///
/// A `not` stays open until its operand ends: the next `and`/`or`, the
/// closing parenthesis of its group, or the end of input. String literals and
/// comments are skipped.
fn check_nesting(input: &str) -> Result<()> {
    let bytes = input.as_bytes();
    let mut depth = 0usize;
    // `not`s open at the current parenthesis level
    let mut pending = 0usize;
    // `pending` of each enclosing level
    let mut outer: Vec<usize> = Vec::new();
    let mut i = 0;

    while i < bytes.len() {
        match bytes[i] {
            b'"' => {
                i = skip_string(bytes, i + 1);
                continue;
            }
            b'/' if bytes.get(i + 1) == Some(&b'/') => {
                i = input[i..].find('\n').map_or(bytes.len(), |p| i + p);
                continue;
            }
            b'/' if bytes.get(i + 1) == Some(&b'*') => {
                i = input[i + 2..].find("*/").map_or(bytes.len(), |p| i + 2 + p + 2);
                continue;
            }
            b'(' => {
                outer.push(pending);
                pending = 0;
                depth += 1;
            }
            b')' => {
                depth = depth.saturating_sub(pending);
                pending = 0;
                if let Some(prev) = outer.pop() {
                    depth = depth.saturating_sub(1 + prev);
                }
            }
            b'!' if bytes.get(i + 1) != Some(&b'=') => {
                pending += 1;
                depth += 1;
            }
            b'&' | b'|' => {
                depth = depth.saturating_sub(pending);
                pending = 0;
            }
            b if b.is_ascii_alphabetic() || b == b'_' => {
                let start = i;
                while i < bytes.len() && (bytes[i].is_ascii_alphanumeric() || bytes[i] == b'_') {
                    i += 1;
                }
                let word = &input[start..i];
                if word.eq_ignore_ascii_case("not") {
                    pending += 1;
                    depth += 1;
                } else if word.eq_ignore_ascii_case("and") || word.eq_ignore_ascii_case("or") {
                    depth = depth.saturating_sub(pending);
                    pending = 0;
                }
                if depth > MAX_NESTING_DEPTH {
                    return Err(too_deep(input, start));
                }
                continue;
            }
            _ => {}
        }
        if depth > MAX_NESTING_DEPTH {
            return Err(too_deep(input, i));
        }
        i += 1;
    }
    Ok(())
}

/// Index just past the closing quote of a string whose contents start at `i`.
fn skip_string(bytes: &[u8], mut i: usize) -> usize {
    while i < bytes.len() {
        match bytes[i] {
            b'\\' => i += 2,
            b'"' => return i + 1,
            _ => i += 1,
        }
    }
    bytes.len()
}

fn too_deep(input: &str, offset: usize) -> IflParserError {
    let before = &input[..offset];
    let line = before.matches('\n').count() + 1;
    let column = before.rsplit('\n').next().unwrap_or("").chars().count() + 1;
    IflParserError::Syntax {
        line,
        column,
        message: format!("expression nested deeper than {MAX_NESTING_DEPTH} levels"),
    }
}

// ---------------------------------------------------------------------------
// Internal parsing helpers
// ---------------------------------------------------------------------------

fn parse_expr(pair: Pair<'_, Rule>, pratt: &PrattParser<Rule>) -> Result<Expr> {
    pratt
        .map_primary(|primary| match primary.as_rule() {
            Rule::expr => parse_expr(primary, pratt),
            Rule::comparison | Rule::method_call => parse_comparison(primary),
            Rule::membership => parse_membership(primary),
            Rule::truthy => parse_truthy(primary),
            other => unreachable!("unexpected primary rule: {other:?}"),
        })
        .map_prefix(|op, rhs| match op.as_rule() {
            Rule::not_op => Ok(Expr::Not(Box::new(rhs?))),
            other => unreachable!("unexpected prefix rule: {other:?}"),
        })
        .map_infix(|lhs, op, rhs| match op.as_rule() {
            Rule::and_op => Ok(merge_binary(Junction::And, lhs?, rhs?)),
            Rule::or_op => Ok(merge_binary(Junction::Or, lhs?, rhs?)),
            other => unreachable!("unexpected infix rule: {other:?}"),
        })
        .parse(pair.into_inner())
}

#[derive(Clone, Copy)]
enum Junction {
    And,
    Or,
}

/// Flatten nested binary operators of the same kind.
/// `a and (b and c)` → `And(a, b, c)` instead of `And(a, And(b, c))`.
fn merge_binary(kind: Junction, lhs: Expr, rhs: Expr) -> Expr {
    let mut args = Vec::new();
    for side in [lhs, rhs] {
        match (kind, side) {
            (Junction::And, Expr::And(children)) | (Junction::Or, Expr::Or(children)) => {
                args.extend(children)
            }
            (_, other) => args.push(other),
        }
    }
    match kind {
        Junction::And => Expr::And(args),
        Junction::Or => Expr::Or(args),
    }
}

fn parse_comparison(pair: Pair<'_, Rule>) -> Result<Expr> {
    let position = position_of(&pair);
    let mut inner = pair.into_inner();

    let attribute = parse_attribute(next_child(&mut inner, position)?);
    let op = parse_op(next_child(&mut inner, position)?);
    let value = parse_literal(next_child(&mut inner, position)?)?;

    Ok(Expr::Predicate(Predicate {
        attribute,
        test: Test::Compare { op, value },
    }))
}

fn parse_membership(pair: Pair<'_, Rule>) -> Result<Expr> {
    let position = position_of(&pair);
    let mut inner = pair.into_inner();
    let attribute = parse_attribute(next_child(&mut inner, position)?);

    let mut negated = false;
    let mut values = Vec::new();
    for p in inner {
        match p.as_rule() {
            Rule::negated => negated = true,
            Rule::list => {
                for item in p.into_inner() {
                    values.push(parse_literal(item)?);
                }
            }
            _ => {} // in_kw
        }
    }

    Ok(Expr::Predicate(Predicate {
        attribute,
        test: Test::In { values, negated },
    }))
}

fn parse_truthy(pair: Pair<'_, Rule>) -> Result<Expr> {
    let position = position_of(&pair);
    let mut inner = pair.into_inner();
    let attribute = parse_attribute(next_child(&mut inner, position)?);
    Ok(Expr::Predicate(Predicate {
        attribute,
        test: Test::IsTrue,
    }))
}

fn parse_attribute(pair: Pair<'_, Rule>) -> AttributeRef {
    AttributeRef {
        position: position_of(&pair),
        name: pair.as_str().to_string(),
    }
}

fn parse_op(pair: Pair<'_, Rule>) -> CompareOp {
    match pair.as_rule() {
        Rule::eq => CompareOp::Eq,
        Rule::ne => CompareOp::Ne,
        Rule::lt => CompareOp::Lt,
        Rule::le => CompareOp::Le,
        Rule::gt => CompareOp::Gt,
        Rule::ge => CompareOp::Ge,
        Rule::contains_kw => CompareOp::Contains,
        Rule::startswith_kw => CompareOp::StartsWith,
        Rule::endswith_kw => CompareOp::EndsWith,
        Rule::matches_kw => CompareOp::Matches,
        other => unreachable!("unexpected operator rule: {other:?}"),
    }
}

fn parse_literal(pair: Pair<'_, Rule>) -> Result<Literal> {
    match pair.as_rule() {
        Rule::string => {
            let raw = pair.into_inner().next().map(|p| p.as_str()).unwrap_or("");
            Ok(Literal::String(unescape(raw)))
        }
        Rule::number => parse_number(pair),
        Rule::boolean => Ok(Literal::Bool(pair.as_str().eq_ignore_ascii_case("true"))),
        other => unreachable!("unexpected literal rule: {other:?}"),
    }
}

fn parse_number(pair: Pair<'_, Rule>) -> Result<Literal> {
    let text = pair.as_str();
    let parsed = if text.contains('.') {
        text.parse::<f64>().ok().map(Literal::Float)
    } else {
        text.parse::<i64>().ok().map(Literal::Integer)
    };
    parsed.ok_or_else(|| {
        let pos = position_of(&pair);
        IflParserError::InvalidNumber {
            literal: text.to_string(),
            line: pos.line,
            column: pos.column,
        }
    })
}

/// Resolve the escapes the grammar admits: `\"`, `\\`, `\n`, `\t`, `\r`.
fn unescape(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut chars = raw.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('n') => out.push('\n'),
            Some('t') => out.push('\t'),
            Some('r') => out.push('\r'),
            Some(other) => out.push(other),
            None => out.push('\\'),
        }
    }
    out
}

fn next_child<'i>(pairs: &mut Pairs<'i, Rule>, parent: Position) -> Result<Pair<'i, Rule>> {
    pairs.next().ok_or(IflParserError::Syntax {
        line: parent.line,
        column: parent.column,
        message: "incomplete predicate".into(),
    })
}

fn position_of(pair: &Pair<'_, Rule>) -> Position {
    let (line, column) = pair.line_col();
    Position::new(line, column)
}

fn syntax_error(err: pest::error::Error<Rule>) -> IflParserError {
    let err = err.renamed_rules(rule_label);
    let (line, column) = match err.line_col {
        LineColLocation::Pos(pos) => pos,
        LineColLocation::Span(start, _) => start,
    };
    IflParserError::Syntax {
        line,
        column,
        message: err.variant.message().into_owned(),
    }
}

/// Human-readable names for grammar rules in error messages.
fn rule_label(rule: &Rule) -> String {
    match rule {
        Rule::EOI => "end of input",
        Rule::expr | Rule::rule_text => "expression",
        Rule::attribute | Rule::truthy => "attribute name",
        Rule::comparison | Rule::membership | Rule::method_call => "predicate",
        Rule::eq | Rule::ne | Rule::lt | Rule::le | Rule::gt | Rule::ge => "comparison operator",
        Rule::contains_kw | Rule::startswith_kw | Rule::endswith_kw | Rule::matches_kw => {
            "text operator"
        }
        Rule::and_op => "`and`",
        Rule::or_op => "`or`",
        Rule::not_op | Rule::negated => "`not`",
        Rule::in_kw => "`in`",
        Rule::list => "list",
        Rule::string => "string",
        Rule::number => "number",
        Rule::boolean => "boolean",
        other => return format!("{other:?}"),
    }
    .to_string()
}

// =============================================================================
// Tests
// =============================================================================
