//! Rule evaluation engine.
//!
//! The `Engine` holds the compiled rules of one rule set. An item is selected
//! when it matches ANY rule; rule order only affects the order in which
//! matching rule names are reported.

use std::path::Path;

use crate::compiler::{CompiledPredicate, compile, compile_file};
use crate::error::Result;
use crate::item::ItemRecord;

/// One compiled rule file.
#[derive(Debug, Clone)]
pub struct CompiledRule {
    /// Display name (usually the file name).
    pub name: String,
    pub predicate: CompiledPredicate,
}

/// A set of compiled rules evaluated with OR semantics.
///
/// # Example
///
/// ```rust
/// use invlight_eval::{Engine, ItemKey, ItemRecord, Rarity};
///
/// let mut engine = Engine::new();
/// engine.add_rule("rares", r#"Rarity == "Rare" and ItemLevel >= 80"#).unwrap();
///
/// let item = ItemRecord::builder(ItemKey(1))
///     .attr("Rarity", Rarity::Rare)
///     .attr("ItemLevel", 82)
///     .build()
///     .unwrap();
/// assert_eq!(engine.evaluate(&item), vec!["rares"]);
/// ```
#[derive(Debug, Clone, Default)]
pub struct Engine {
    rules: Vec<CompiledRule>,
}

impl Engine {
    /// Create a new empty engine.
    pub fn new() -> Self {
        Engine { rules: Vec::new() }
    }

    /// Compile rule text and add it under `name`.
    pub fn add_rule(&mut self, name: impl Into<String>, text: &str) -> Result<()> {
        let predicate = compile(text)?;
        self.add_compiled_rule(CompiledRule {
            name: name.into(),
            predicate,
        });
        Ok(())
    }

    /// Compile a rule file and add it, named after its file name.
    pub fn add_rule_file(&mut self, path: &Path) -> Result<()> {
        let predicate = compile_file(path)?;
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        self.add_compiled_rule(CompiledRule { name, predicate });
        Ok(())
    }

    pub fn add_compiled_rule(&mut self, rule: CompiledRule) {
        self.rules.push(rule);
    }

    /// True when at least one rule matches the item.
    pub fn matches_any(&self, item: &ItemRecord) -> bool {
        self.rules.iter().any(|r| r.predicate.matches(item))
    }

    /// Names of every rule matching the item, in rule order.
    pub fn evaluate(&self, item: &ItemRecord) -> Vec<&str> {
        self.rules
            .iter()
            .filter(|r| r.predicate.matches(item))
            .map(|r| r.name.as_str())
            .collect()
    }

    /// Items matched by at least one rule, in input order.
    pub fn select<'a>(&self, items: &'a [ItemRecord]) -> Vec<&'a ItemRecord> {
        items.iter().filter(|i| self.matches_any(i)).collect()
    }

    pub fn rule_count(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    pub fn rules(&self) -> &[CompiledRule] {
        &self.rules
    }
}
