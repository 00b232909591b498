//! # invlight-eval
//!
//! Evaluator and runtime for `.ifl` item filter rules.
//!
//! This crate consumes the AST produced by [`invlight_parser`] and evaluates
//! it against item records using a compile-then-evaluate model.
//!
//! ## Architecture
//!
//! - **Compiler**: resolves attribute names against a fixed registry and
//!   type-checks literals, so evaluation never meets an unknown name.
//! - **Engine**: the compiled rules of one rule set; an item is selected when
//!   any rule matches.
//! - **Rule sets**: [`RuleSetManager`] rescans the rule directory, merges the
//!   files with persisted entries and publishes a fresh engine atomically.
//! - **Frames**: [`HighlightSelector`] pulls panel snapshots through a
//!   [`TimedCache`] and turns matches into draw commands.
//!
//! ## Quick Start
//!
//! ```rust
//! use invlight_eval::{ItemKey, ItemRecord, Rarity, compile};
//!
//! let rule = compile(r#"Rarity == "Rare" and ItemLevel >= 80"#).unwrap();
//!
//! let item = ItemRecord::builder(ItemKey(1))
//!     .attr("Rarity", Rarity::Rare)
//!     .attr("ItemLevel", 82)
//!     .build()
//!     .unwrap();
//! assert!(rule.matches(&item));
//! ```

pub mod cache;
pub mod compiler;
pub mod engine;
pub mod error;
pub mod highlight;
pub mod item;
pub mod matcher;
pub mod ruleset;
pub mod schema;
pub mod settings;

pub use cache::{ITEM_SNAPSHOT_TTL, TimedCache};
pub use compiler::{CompiledPredicate, compile, compile_expr, compile_file, matches};
pub use engine::{CompiledRule, Engine};
pub use error::{EvalError, Result};
pub use highlight::{
    AreaInfo, DrawCommand, FilterTestOutcome, Frame, GameStateProvider, HighlightOptions,
    HighlightSelector, HighlightStyle, HoveredItem, Panel,
};
pub use item::{AttrValue, ItemKey, ItemRecord, ItemRecordBuilder, Rect};
pub use matcher::CompiledMatcher;
pub use ruleset::{
    ReloadIssue, ReloadOutcome, ReloadReport, RuleDirectories, RuleSetCommand, RuleSetEntry,
    RuleSetManager, reload_rules,
};
pub use schema::{ATTRIBUTES, AttrKind, Attribute, AttributeDef, Rarity};
pub use settings::{Color, Settings};
