//! # invlight-parser
//!
//! Parser for `.ifl` item filter rules: one boolean expression per file,
//! tested against the attributes of an inventory or stash item.
//!
//! - **Comparisons**: `==`, `!=`, `<`, `<=`, `>`, `>=`
//! - **Text tests**: `contains`, `startswith`, `endswith`, `matches` (regex),
//!   also in method form `BaseName.Contains("Ring")`
//! - **Set membership**: `ClassName in ["Ring", "Amulet"]`, `not in`
//! - **Boolean combinators**: `and`/`&&`, `or`/`||`, `not`/`!`, parentheses
//! - **Literals**: strings, integers, floats, `true`/`false`
//!
//! ## Architecture
//!
//! A PEG grammar ([`pest`]) tokenizes the expression and a Pratt parser
//! assigns precedence (`not` > `and` > `or`). The resulting [`Expr`] is purely
//! syntactic; attribute names are resolved later by `invlight-eval`.
//!
//! ## Quick Start
//!
//! ```rust
//! use invlight_parser::{Expr, parse_rule};
//!
//! let expr = parse_rule(r#"Rarity == "Rare" and ItemLevel >= 80"#).unwrap();
//! assert!(matches!(expr, Expr::And(ref args) if args.len() == 2));
//! ```

pub mod ast;
pub mod error;
pub mod expr;
pub mod parser;

pub use ast::{AttributeRef, CompareOp, Expr, Literal, Position, Predicate, Test};
pub use error::{IflParserError, Result};
pub use expr::{MAX_NESTING_DEPTH, parse_expression};
pub use parser::{RULE_FILE_EXTENSION, is_rule_file, parse_rule, parse_rule_file, rule_files};
