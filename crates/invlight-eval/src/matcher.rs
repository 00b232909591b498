//! Compiled matchers for the evaluation hot path.
//!
//! Each `CompiledMatcher` is built once when a rule is compiled. Literals are
//! already converted to the attribute's representation (rarity names resolved,
//! integers widened, regexes compiled), so `matches()` is a plain comparison
//! with no allocation.

use regex::Regex;

use crate::item::AttrValue;
use crate::schema::Rarity;

/// A pre-compiled test against a single attribute value.
///
/// A value of a kind the matcher does not understand never matches. The
/// compiler rejects such combinations up front, so that case only arises for
/// hand-built matchers.
#[derive(Debug, Clone)]
pub enum CompiledMatcher {
    // -- String matchers (case-sensitive) --
    /// Exact string equality.
    Exact(String),
    /// Substring containment.
    Contains(String),
    /// String starts with prefix.
    StartsWith(String),
    /// String ends with suffix.
    EndsWith(String),
    /// Compiled regex pattern.
    Regex(Regex),

    // -- Numeric (integers and floats compare as f64) --
    NumericEq(f64),
    NumericGt(f64),
    NumericGte(f64),
    NumericLt(f64),
    NumericLte(f64),

    // -- Rarity (ordered Normal < Magic < Rare < Unique) --
    RarityEq(Rarity),
    RarityGt(Rarity),
    RarityGte(Rarity),
    RarityLt(Rarity),
    RarityLte(Rarity),

    /// Boolean equality. A bare boolean attribute compiles to `BoolEq(true)`.
    BoolEq(bool),

    // -- Composite --
    /// String list: match if any element matches the inner matcher.
    AnyElement(Box<CompiledMatcher>),
    /// Match if ANY child matches (set membership).
    AnyOf(Vec<CompiledMatcher>),
    /// Invert the inner matcher (`!=`, `not in`).
    Negated(Box<CompiledMatcher>),
}

impl CompiledMatcher {
    /// Check if this matcher matches an attribute value.
    pub fn matches(&self, value: &AttrValue) -> bool {
        match self {
            CompiledMatcher::Exact(expected) => match_str(value, |s| s == expected),
            CompiledMatcher::Contains(needle) => match_str(value, |s| s.contains(needle.as_str())),
            CompiledMatcher::StartsWith(prefix) => {
                match_str(value, |s| s.starts_with(prefix.as_str()))
            }
            CompiledMatcher::EndsWith(suffix) => match_str(value, |s| s.ends_with(suffix.as_str())),
            CompiledMatcher::Regex(re) => match_str(value, |s| re.is_match(s)),

            CompiledMatcher::NumericEq(n) => match_numeric(value, |v| (v - n).abs() < f64::EPSILON),
            CompiledMatcher::NumericGt(n) => match_numeric(value, |v| v > *n),
            CompiledMatcher::NumericGte(n) => match_numeric(value, |v| v >= *n),
            CompiledMatcher::NumericLt(n) => match_numeric(value, |v| v < *n),
            CompiledMatcher::NumericLte(n) => match_numeric(value, |v| v <= *n),

            CompiledMatcher::RarityEq(r) => match_rarity(value, |v| v == *r),
            CompiledMatcher::RarityGt(r) => match_rarity(value, |v| v > *r),
            CompiledMatcher::RarityGte(r) => match_rarity(value, |v| v >= *r),
            CompiledMatcher::RarityLt(r) => match_rarity(value, |v| v < *r),
            CompiledMatcher::RarityLte(r) => match_rarity(value, |v| v <= *r),

            CompiledMatcher::BoolEq(expected) => {
                matches!(value, AttrValue::Bool(b) if b == expected)
            }

            CompiledMatcher::AnyElement(inner) => match value {
                AttrValue::List(items) => items.iter().any(|s| inner.matches_str(s)),
                _ => false,
            },
            CompiledMatcher::AnyOf(matchers) => matchers.iter().any(|m| m.matches(value)),
            CompiledMatcher::Negated(inner) => !inner.matches(value),
        }
    }

    /// String matchers applied to a bare `&str`, for list elements.
    fn matches_str(&self, s: &str) -> bool {
        match self {
            CompiledMatcher::Exact(expected) => s == expected,
            CompiledMatcher::Contains(needle) => s.contains(needle.as_str()),
            CompiledMatcher::StartsWith(prefix) => s.starts_with(prefix.as_str()),
            CompiledMatcher::EndsWith(suffix) => s.ends_with(suffix.as_str()),
            CompiledMatcher::Regex(re) => re.is_match(s),
            CompiledMatcher::AnyOf(matchers) => matchers.iter().any(|m| m.matches_str(s)),
            CompiledMatcher::Negated(inner) => !inner.matches_str(s),
            _ => false,
        }
    }
}

// ---------------------------------------------------------------------------
// Helper functions
// ---------------------------------------------------------------------------

fn match_str(value: &AttrValue, pred: impl Fn(&str) -> bool) -> bool {
    match value {
        AttrValue::Str(s) => pred(s),
        _ => false,
    }
}

fn match_numeric(value: &AttrValue, pred: impl Fn(f64) -> bool) -> bool {
    match value {
        AttrValue::Int(n) => pred(*n as f64),
        AttrValue::Float(n) => pred(*n),
        _ => false,
    }
}

fn match_rarity(value: &AttrValue, pred: impl Fn(Rarity) -> bool) -> bool {
    match value {
        AttrValue::Rarity(r) => pred(*r),
        _ => false,
    }
}
