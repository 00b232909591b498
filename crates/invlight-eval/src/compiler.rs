//! Compile parsed filter expressions into predicate trees.
//!
//! The compiler resolves every attribute name against the registry, checks
//! that each operator and literal fits the attribute's kind, and produces the
//! matching `CompiledMatcher`. Anything the registry does not allow is a
//! compile error carrying the attribute's source position; a compiled
//! predicate can therefore be evaluated against any item without failing.

use std::path::Path;

use regex::Regex;

use invlight_parser::{CompareOp, Expr, Literal, Position, Predicate, Test};

use crate::error::{EvalError, Result};
use crate::item::ItemRecord;
use crate::matcher::CompiledMatcher;
use crate::schema::{AttrKind, Attribute, Rarity};

// =============================================================================
// Compiled types
// =============================================================================

/// The executable form of one filter expression.
///
/// Immutable once built, so one predicate may be evaluated from several
/// threads at the same time.
#[derive(Debug, Clone)]
pub enum CompiledPredicate {
    /// Every child must match.
    All(Vec<CompiledPredicate>),
    /// At least one child must match.
    Any(Vec<CompiledPredicate>),
    Not(Box<CompiledPredicate>),
    /// A single attribute test.
    Test {
        attribute: Attribute,
        matcher: CompiledMatcher,
    },
}

impl CompiledPredicate {
    /// Evaluate against an item, short-circuiting left to right.
    ///
    /// A test against an attribute the item does not carry is `false`.
    pub fn matches(&self, item: &ItemRecord) -> bool {
        match self {
            CompiledPredicate::All(children) => children.iter().all(|c| c.matches(item)),
            CompiledPredicate::Any(children) => children.iter().any(|c| c.matches(item)),
            CompiledPredicate::Not(inner) => !inner.matches(item),
            CompiledPredicate::Test { attribute, matcher } => {
                item.get(*attribute).is_some_and(|v| matcher.matches(v))
            }
        }
    }
}

// =============================================================================
// Public API
// =============================================================================

/// Parse and compile rule text.
pub fn compile(text: &str) -> Result<CompiledPredicate> {
    let expr = invlight_parser::parse_rule(text)?;
    compile_expr(&expr)
}

/// Read, parse and compile a rule file.
pub fn compile_file(path: &Path) -> Result<CompiledPredicate> {
    let expr = invlight_parser::parse_rule_file(path)?;
    compile_expr(&expr)
}

/// Compile an already parsed expression.
pub fn compile_expr(expr: &Expr) -> Result<CompiledPredicate> {
    match expr {
        Expr::And(args) => Ok(CompiledPredicate::All(
            args.iter().map(compile_expr).collect::<Result<_>>()?,
        )),
        Expr::Or(args) => Ok(CompiledPredicate::Any(
            args.iter().map(compile_expr).collect::<Result<_>>()?,
        )),
        Expr::Not(inner) => Ok(CompiledPredicate::Not(Box::new(compile_expr(inner)?))),
        Expr::Predicate(p) => compile_predicate(p),
    }
}

/// Evaluate a compiled predicate against an item.
pub fn matches(predicate: &CompiledPredicate, item: &ItemRecord) -> bool {
    predicate.matches(item)
}

// =============================================================================
// Predicate compilation
// =============================================================================

/// Attribute being compiled plus its source position, for error reporting.
#[derive(Clone, Copy)]
struct Site {
    attribute: Attribute,
    pos: Position,
}

impl Site {
    fn unsupported(self, op: impl ToString) -> EvalError {
        EvalError::UnsupportedOperator {
            op: op.to_string(),
            attribute: self.attribute.name().to_string(),
            kind: self.attribute.kind(),
            line: self.pos.line,
            column: self.pos.column,
        }
    }

    fn mismatch(self, lit: &Literal) -> EvalError {
        EvalError::TypeMismatch {
            attribute: self.attribute.name().to_string(),
            kind: self.attribute.kind(),
            found: lit.type_name(),
            line: self.pos.line,
            column: self.pos.column,
        }
    }
}

fn compile_predicate(pred: &Predicate) -> Result<CompiledPredicate> {
    let pos = pred.attribute.position;
    let name = &pred.attribute.name;
    let attribute = Attribute::lookup(name).ok_or_else(|| EvalError::UnknownAttribute {
        name: name.clone(),
        line: pos.line,
        column: pos.column,
        suggestion: Attribute::suggest(name),
    })?;
    let site = Site { attribute, pos };

    let matcher = match &pred.test {
        Test::IsTrue => {
            if attribute.kind() != AttrKind::Boolean {
                return Err(site.unsupported("bare attribute"));
            }
            CompiledMatcher::BoolEq(true)
        }
        Test::Compare { op, value } => compile_compare(site, *op, value)?,
        Test::In { values, negated } => {
            let kind = attribute.kind();
            if matches!(kind, AttrKind::Boolean | AttrKind::StringList) {
                return Err(site.unsupported(if *negated { "not in" } else { "in" }));
            }
            let members = values
                .iter()
                .map(|v| compile_eq(site, v))
                .collect::<Result<Vec<_>>>()?;
            let any = CompiledMatcher::AnyOf(members);
            if *negated {
                CompiledMatcher::Negated(Box::new(any))
            } else {
                any
            }
        }
    };

    Ok(CompiledPredicate::Test { attribute, matcher })
}

fn compile_compare(site: Site, op: CompareOp, value: &Literal) -> Result<CompiledMatcher> {
    let kind = site.attribute.kind();
    match op {
        CompareOp::Eq => {
            if kind == AttrKind::StringList {
                return Err(site.unsupported(op));
            }
            compile_eq(site, value)
        }
        CompareOp::Ne => {
            if kind == AttrKind::StringList {
                return Err(site.unsupported(op));
            }
            Ok(CompiledMatcher::Negated(Box::new(compile_eq(site, value)?)))
        }
        CompareOp::Lt | CompareOp::Le | CompareOp::Gt | CompareOp::Ge => {
            compile_ordering(site, op, value)
        }
        CompareOp::Contains | CompareOp::StartsWith | CompareOp::EndsWith | CompareOp::Matches => {
            let text_op_allowed = match kind {
                AttrKind::String => true,
                AttrKind::StringList => matches!(op, CompareOp::Contains | CompareOp::Matches),
                _ => false,
            };
            if !text_op_allowed {
                return Err(site.unsupported(op));
            }
            let needle = value.as_str().ok_or_else(|| site.mismatch(value))?;
            let inner = compile_text(site, op, needle)?;
            Ok(if kind == AttrKind::StringList {
                CompiledMatcher::AnyElement(Box::new(inner))
            } else {
                inner
            })
        }
    }
}

/// Equality matcher for one literal; shared by `==`, `!=` and membership.
fn compile_eq(site: Site, lit: &Literal) -> Result<CompiledMatcher> {
    match site.attribute.kind() {
        AttrKind::String => lit
            .as_str()
            .map(|s| CompiledMatcher::Exact(s.to_string()))
            .ok_or_else(|| site.mismatch(lit)),
        AttrKind::Integer | AttrKind::Float => lit
            .as_f64()
            .map(CompiledMatcher::NumericEq)
            .ok_or_else(|| site.mismatch(lit)),
        AttrKind::Boolean => match lit {
            Literal::Bool(b) => Ok(CompiledMatcher::BoolEq(*b)),
            _ => Err(site.mismatch(lit)),
        },
        AttrKind::Rarity => Ok(CompiledMatcher::RarityEq(rarity_literal(site, lit)?)),
        AttrKind::StringList => Err(site.unsupported(CompareOp::Eq)),
    }
}

fn compile_ordering(site: Site, op: CompareOp, lit: &Literal) -> Result<CompiledMatcher> {
    match site.attribute.kind() {
        AttrKind::Integer | AttrKind::Float => {
            let n = lit.as_f64().ok_or_else(|| site.mismatch(lit))?;
            Ok(match op {
                CompareOp::Lt => CompiledMatcher::NumericLt(n),
                CompareOp::Le => CompiledMatcher::NumericLte(n),
                CompareOp::Gt => CompiledMatcher::NumericGt(n),
                _ => CompiledMatcher::NumericGte(n),
            })
        }
        AttrKind::Rarity => {
            let r = rarity_literal(site, lit)?;
            Ok(match op {
                CompareOp::Lt => CompiledMatcher::RarityLt(r),
                CompareOp::Le => CompiledMatcher::RarityLte(r),
                CompareOp::Gt => CompiledMatcher::RarityGt(r),
                _ => CompiledMatcher::RarityGte(r),
            })
        }
        _ => Err(site.unsupported(op)),
    }
}

fn compile_text(site: Site, op: CompareOp, needle: &str) -> Result<CompiledMatcher> {
    Ok(match op {
        CompareOp::Contains => CompiledMatcher::Contains(needle.to_string()),
        CompareOp::StartsWith => CompiledMatcher::StartsWith(needle.to_string()),
        CompareOp::EndsWith => CompiledMatcher::EndsWith(needle.to_string()),
        _ => {
            let re = Regex::new(needle).map_err(|source| EvalError::InvalidRegex {
                pattern: needle.to_string(),
                line: site.pos.line,
                column: site.pos.column,
                source,
            })?;
            CompiledMatcher::Regex(re)
        }
    })
}

fn rarity_literal(site: Site, lit: &Literal) -> Result<Rarity> {
    let s = lit.as_str().ok_or_else(|| site.mismatch(lit))?;
    s.parse().map_err(|()| EvalError::UnknownRarity {
        value: s.to_string(),
        line: site.pos.line,
        column: site.pos.column,
    })
}

// =============================================================================
// Tests
// =============================================================================


// =============================================================================
// Property-based tests
// =============================================================================

#[cfg(test)]
mod proptests {
    use super::*;
    use crate::item::ItemKey;
    use proptest::prelude::*;

    fn arb_rarity() -> impl Strategy<Value = Rarity> {
        prop::sample::select(Rarity::ALL.to_vec())
    }

    // -------------------------------------------------------------------------
    // 1. Evaluation is deterministic and agrees with the direct comparison
    // -------------------------------------------------------------------------
    proptest! {
        #[test]
        fn rarity_and_level_agree_with_direct_comparison(
            rarity in arb_rarity(),
            level in 0i64..=100,
            threshold in 0i64..=100,
        ) {
            let text = format!(r#"Rarity == "Rare" and ItemLevel >= {threshold}"#);
            let pred = compile(&text).unwrap();
            let it = ItemRecord::builder(ItemKey(1))
                .attr("Rarity", rarity)
                .attr("ItemLevel", level)
                .build()
                .unwrap();
            let expected = rarity == Rarity::Rare && level >= threshold;
            prop_assert_eq!(pred.matches(&it), expected);
            prop_assert_eq!(pred.matches(&it), expected);
        }
    }

    // -------------------------------------------------------------------------
    // 2. `not` inverts any comparison on a present attribute
    // -------------------------------------------------------------------------
    proptest! {
        #[test]
        fn not_inverts_present_comparison(quality in 0i64..=30, bound in 0i64..=30) {
            let it = ItemRecord::builder(ItemKey(2)).attr("Quality", quality).build().unwrap();
            let plain = compile(&format!("Quality < {bound}")).unwrap();
            let negated = compile(&format!("not Quality < {bound}")).unwrap();
            prop_assert_ne!(plain.matches(&it), negated.matches(&it));
        }
    }

    // -------------------------------------------------------------------------
    // 3. Contains agrees with str::contains for arbitrary text
    // -------------------------------------------------------------------------
    proptest! {
        #[test]
        fn contains_agrees_with_str_contains(hay in "[a-zA-Z ]{0,12}", needle in "[a-zA-Z]{1,3}") {
            let pred = compile(&format!(r#"Name contains "{needle}""#)).unwrap();
            let it = ItemRecord::builder(ItemKey(3)).attr("Name", hay.as_str()).build().unwrap();
            prop_assert_eq!(pred.matches(&it), hay.contains(needle.as_str()));
        }
    }
}
