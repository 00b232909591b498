//! Rule set discovery, merge and hot reload.
//!
//! A rule set is an ordered list of [`RuleSetEntry`] values (persisted) plus
//! the [`Engine`] compiled from the enabled ones (never persisted). Reloading
//! rescans the rule directory, merges what it finds with the prior entries,
//! and recompiles every enabled rule from disk.
//!
//! [`RuleSetManager`] owns both halves for a running overlay. The compiled
//! engine is published through an [`ArcSwap`], so a frame in flight keeps the
//! engine it loaded while a reload installs the next one.

use std::collections::HashSet;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use arc_swap::ArcSwap;
use parking_lot::{Mutex, RwLock};
use serde::{Deserialize, Serialize};

use invlight_parser::rule_files;

use crate::compiler::compile;
use crate::engine::{CompiledRule, Engine};
use crate::error::{EvalError, Result};

// =============================================================================
// Entries and issues
// =============================================================================

/// Persisted state of one rule file.
///
/// `location` is relative to the rule directory and unique within a rule set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleSetEntry {
    pub name: String,
    pub location: String,
    pub enabled: bool,
}

impl RuleSetEntry {
    pub fn new(name: impl Into<String>, location: impl Into<String>, enabled: bool) -> Self {
        RuleSetEntry {
            name: name.into(),
            location: location.into(),
            enabled,
        }
    }
}

/// A non-fatal problem found while reloading.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ReloadIssue {
    /// The configured custom directory does not exist; the default was used.
    CustomDirectoryMissing { path: PathBuf },
    /// A prior entry's file is gone; the entry was dropped.
    MissingFile { name: String, location: String },
    /// An enabled rule file could not be read.
    ReadFailed {
        name: String,
        location: String,
        message: String,
    },
    /// An enabled rule file did not compile.
    CompileFailed {
        name: String,
        location: String,
        message: String,
    },
}

impl fmt::Display for ReloadIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReloadIssue::CustomDirectoryMissing { path } => {
                write!(f, "custom config folder {} does not exist", path.display())
            }
            ReloadIssue::MissingFile { name, .. } => write!(f, "file \"{name}\" does not exist"),
            ReloadIssue::ReadFailed { name, message, .. } => {
                write!(f, "cannot read \"{name}\": {message}")
            }
            ReloadIssue::CompileFailed { name, message, .. } => {
                write!(f, "rule \"{name}\" failed to compile: {message}")
            }
        }
    }
}

/// Result of [`reload_rules`].
#[derive(Debug)]
pub struct ReloadOutcome {
    pub directory: PathBuf,
    pub entries: Vec<RuleSetEntry>,
    pub engine: Engine,
    pub issues: Vec<ReloadIssue>,
}

// =============================================================================
// Reload
// =============================================================================

/// Merge the rule files in `directory` with `prior` and compile enabled rules.
///
/// Prior entries whose file still exists keep their position and `enabled`
/// flag. Files not yet listed are appended, disabled, in file-name order.
/// Per-file problems are returned as issues and logged; only a failure to
/// list `directory` is an error.
pub fn reload_rules(directory: &Path, prior: &[RuleSetEntry]) -> Result<ReloadOutcome> {
    let files = rule_files(directory).map_err(|source| EvalError::RuleDirectory {
        path: directory.to_path_buf(),
        source,
    })?;

    let mut issues = Vec::new();
    let mut seen: HashSet<String> = HashSet::new();
    let mut entries = Vec::with_capacity(prior.len() + files.len());

    for entry in prior {
        if seen.contains(&entry.location) {
            continue;
        }
        if directory.join(&entry.location).is_file() {
            seen.insert(entry.location.clone());
            entries.push(entry.clone());
        } else {
            log::error!("File \"{}\" does not exist", entry.name);
            issues.push(ReloadIssue::MissingFile {
                name: entry.name.clone(),
                location: entry.location.clone(),
            });
        }
    }

    for file in &files {
        let Some(location) = file.file_name().map(|n| n.to_string_lossy().into_owned()) else {
            continue;
        };
        if seen.insert(location.clone()) {
            entries.push(RuleSetEntry::new(location.clone(), location, false));
        }
    }

    let mut engine = Engine::new();
    for entry in entries.iter().filter(|e| e.enabled) {
        let path = directory.join(&entry.location);
        let text = match fs::read_to_string(&path) {
            Ok(text) => text,
            Err(e) => {
                log::error!("Cannot read rule \"{}\" ({}): {e}", entry.name, path.display());
                issues.push(ReloadIssue::ReadFailed {
                    name: entry.name.clone(),
                    location: entry.location.clone(),
                    message: e.to_string(),
                });
                continue;
            }
        };
        match compile(&text) {
            Ok(predicate) => engine.add_compiled_rule(CompiledRule {
                name: entry.name.clone(),
                predicate,
            }),
            Err(e) => {
                log::error!("Rule \"{}\" failed to compile: {e}", entry.name);
                issues.push(ReloadIssue::CompileFailed {
                    name: entry.name.clone(),
                    location: entry.location.clone(),
                    message: e.to_string(),
                });
            }
        }
    }

    log::info!(
        "Loaded {} of {} rule files from {}",
        engine.rule_count(),
        entries.len(),
        directory.display()
    );

    Ok(ReloadOutcome {
        directory: directory.to_path_buf(),
        entries,
        engine,
        issues,
    })
}

// =============================================================================
// Directory resolution
// =============================================================================

/// Default rule directory plus an optional custom folder name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuleDirectories {
    pub default: PathBuf,
    /// Joined onto the parent of `default`, so a sibling folder of the
    /// default config directory can be named directly.
    pub custom: Option<String>,
}

impl RuleDirectories {
    pub fn new(default: impl Into<PathBuf>) -> Self {
        RuleDirectories {
            default: default.into(),
            custom: None,
        }
    }

    pub fn with_custom(mut self, custom: Option<String>) -> Self {
        self.custom = custom;
        self
    }

    /// The directory a reload should scan, and an issue when the custom
    /// directory was configured but does not exist.
    pub fn resolve(&self) -> (PathBuf, Option<ReloadIssue>) {
        let Some(custom) = self.custom.as_deref().filter(|c| !c.trim().is_empty()) else {
            return (self.default.clone(), None);
        };
        let base = self.default.parent().unwrap_or(&self.default);
        let candidate = base.join(custom);
        if candidate.is_dir() {
            return (candidate, None);
        }
        log::error!(
            "Custom config folder {} does not exist, using {}",
            candidate.display(),
            self.default.display()
        );
        (
            self.default.clone(),
            Some(ReloadIssue::CustomDirectoryMissing { path: candidate }),
        )
    }
}

// =============================================================================
// Manager
// =============================================================================

/// Summary of one successful reload.
#[derive(Debug, Clone, Serialize)]
pub struct ReloadReport {
    pub directory: PathBuf,
    pub entries: Vec<RuleSetEntry>,
    /// Number of rules that compiled.
    pub compiled: usize,
    pub issues: Vec<ReloadIssue>,
}

/// An edit to the rule set, as issued by a settings UI.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RuleSetCommand {
    SetEnabled { index: usize, enabled: bool },
    MoveUp(usize),
    MoveDown(usize),
    SetCustomDirectory(Option<String>),
    Reload,
}

/// Owns the entry list and the active compiled engine.
///
/// Entry edits take effect on the next [`reload`](RuleSetManager::reload).
/// Reloads are serialized; readers of [`active`](RuleSetManager::active)
/// never block and always see a complete engine.
pub struct RuleSetManager {
    directories: RwLock<RuleDirectories>,
    entries: Mutex<Vec<RuleSetEntry>>,
    active: ArcSwap<Engine>,
}

impl RuleSetManager {
    /// Create a manager with an empty active engine. Call
    /// [`reload`](RuleSetManager::reload) to load rules.
    pub fn new(directories: RuleDirectories, entries: Vec<RuleSetEntry>) -> Self {
        RuleSetManager {
            directories: RwLock::new(directories),
            entries: Mutex::new(entries),
            active: ArcSwap::from_pointee(Engine::new()),
        }
    }

    /// The engine installed by the last successful reload.
    pub fn active(&self) -> Arc<Engine> {
        self.active.load_full()
    }

    pub fn entries(&self) -> Vec<RuleSetEntry> {
        self.entries.lock().clone()
    }

    /// Rescan, merge and recompile, then publish the new engine.
    ///
    /// If the directory cannot be listed the error is returned and the
    /// previous entries and engine stay in effect.
    pub fn reload(&self) -> Result<ReloadReport> {
        let mut entries = self.entries.lock();
        let (directory, dir_issue) = self.directories.read().resolve();

        let outcome = match reload_rules(&directory, &entries) {
            Ok(outcome) => outcome,
            Err(e) => {
                log::error!("Reload aborted, keeping previous rules: {e}");
                return Err(e);
            }
        };

        let compiled = outcome.engine.rule_count();
        *entries = outcome.entries;
        self.active.store(Arc::new(outcome.engine));

        let issues: Vec<ReloadIssue> = dir_issue.into_iter().chain(outcome.issues).collect();
        Ok(ReloadReport {
            directory: outcome.directory,
            entries: entries.clone(),
            compiled,
            issues,
        })
    }

    /// Apply one command. Returns the report when the command reloads.
    pub fn apply(&self, command: RuleSetCommand) -> Result<Option<ReloadReport>> {
        match command {
            RuleSetCommand::SetEnabled { index, enabled } => {
                let mut entries = self.entries.lock();
                let len = entries.len();
                let entry = entries
                    .get_mut(index)
                    .ok_or(EvalError::InvalidEntryIndex { index, len })?;
                entry.enabled = enabled;
            }
            RuleSetCommand::MoveUp(index) => {
                let mut entries = self.entries.lock();
                check_index(index, entries.len())?;
                if index > 0 {
                    entries.swap(index, index - 1);
                }
            }
            RuleSetCommand::MoveDown(index) => {
                let mut entries = self.entries.lock();
                check_index(index, entries.len())?;
                if index + 1 < entries.len() {
                    entries.swap(index, index + 1);
                }
            }
            RuleSetCommand::SetCustomDirectory(custom) => {
                self.directories.write().custom = custom;
            }
            RuleSetCommand::Reload => return self.reload().map(Some),
        }
        Ok(None)
    }
}

fn check_index(index: usize, len: usize) -> Result<()> {
    if index < len {
        Ok(())
    } else {
        Err(EvalError::InvalidEntryIndex { index, len })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn write(dir: &Path, name: &str, text: &str) {
        fs::write(dir.join(name), text).unwrap();
    }

    fn locations(entries: &[RuleSetEntry]) -> Vec<&str> {
        entries.iter().map(|e| e.location.as_str()).collect()
    }

    #[test]
    fn test_new_files_appended_disabled_in_name_order() {
        let tmp = TempDir::new().unwrap();
        write(tmp.path(), "b.ifl", "IsCorrupted");
        write(tmp.path(), "a.ifl", "IsMirrored");
        write(tmp.path(), "notes.txt", "ignored");

        let out = reload_rules(tmp.path(), &[]).unwrap();
        assert_eq!(locations(&out.entries), vec!["a.ifl", "b.ifl"]);
        assert!(out.entries.iter().all(|e| !e.enabled));
        assert!(out.engine.is_empty());
        assert!(out.issues.is_empty());
    }

    #[test]
    fn test_prior_entries_keep_position_and_flag() {
        let tmp = TempDir::new().unwrap();
        write(tmp.path(), "a.ifl", "IsMirrored");
        write(tmp.path(), "b.ifl", "IsCorrupted");
        write(tmp.path(), "c.ifl", "IsIdentified");

        let prior = vec![
            RuleSetEntry::new("c.ifl", "c.ifl", true),
            RuleSetEntry::new("a.ifl", "a.ifl", false),
        ];
        let out = reload_rules(tmp.path(), &prior).unwrap();
        assert_eq!(locations(&out.entries), vec!["c.ifl", "a.ifl", "b.ifl"]);
        assert!(out.entries[0].enabled);
        assert_eq!(out.engine.rule_count(), 1);
    }

    #[test]
    fn test_duplicate_prior_locations_collapse() {
        let tmp = TempDir::new().unwrap();
        write(tmp.path(), "a.ifl", "IsMirrored");
        let prior = vec![
            RuleSetEntry::new("a.ifl", "a.ifl", true),
            RuleSetEntry::new("a copy", "a.ifl", false),
        ];
        let out = reload_rules(tmp.path(), &prior).unwrap();
        assert_eq!(out.entries, vec![RuleSetEntry::new("a.ifl", "a.ifl", true)]);
    }

    #[test]
    fn test_compile_failure_is_reported_not_fatal() {
        let tmp = TempDir::new().unwrap();
        write(tmp.path(), "bad.ifl", "ItemLevel >");
        write(tmp.path(), "good.ifl", "ItemLevel > 1");
        let prior = vec![
            RuleSetEntry::new("bad.ifl", "bad.ifl", true),
            RuleSetEntry::new("good.ifl", "good.ifl", true),
        ];
        let out = reload_rules(tmp.path(), &prior).unwrap();
        assert_eq!(out.engine.rule_count(), 1);
        assert_eq!(out.engine.rules()[0].name, "good.ifl");
        assert!(matches!(
            &out.issues[..],
            [ReloadIssue::CompileFailed { name, .. }] if name == "bad.ifl"
        ));
    }

    #[test]
    fn test_missing_directory_is_error() {
        let tmp = TempDir::new().unwrap();
        let err = reload_rules(&tmp.path().join("nope"), &[]).unwrap_err();
        assert!(matches!(err, EvalError::RuleDirectory { .. }));
    }

    #[test]
    fn test_resolve_custom_directory() {
        let tmp = TempDir::new().unwrap();
        let default = tmp.path().join("invlight");
        fs::create_dir(&default).unwrap();
        fs::create_dir(tmp.path().join("MyRules")).unwrap();

        let dirs = RuleDirectories::new(&default).with_custom(Some("MyRules".into()));
        assert_eq!(dirs.resolve(), (tmp.path().join("MyRules"), None));

        let dirs = RuleDirectories::new(&default).with_custom(Some("Missing".into()));
        let (dir, issue) = dirs.resolve();
        assert_eq!(dir, default);
        assert!(matches!(issue, Some(ReloadIssue::CustomDirectoryMissing { .. })));

        let dirs = RuleDirectories::new(&default).with_custom(Some("  ".into()));
        assert_eq!(dirs.resolve(), (default.clone(), None));
    }

    #[test]
    fn test_manager_commands() {
        let tmp = TempDir::new().unwrap();
        write(tmp.path(), "a.ifl", "IsMirrored");
        write(tmp.path(), "b.ifl", "IsCorrupted");
        let mgr = RuleSetManager::new(RuleDirectories::new(tmp.path()), Vec::new());
        mgr.reload().unwrap();

        assert_eq!(
            mgr.apply(RuleSetCommand::SetEnabled {
                index: 1,
                enabled: true
            })
            .unwrap()
            .map(|r| r.compiled),
            None
        );
        // Not recompiled until reload
        assert!(mgr.active().is_empty());

        mgr.apply(RuleSetCommand::MoveUp(1)).unwrap();
        assert_eq!(locations(&mgr.entries()), vec!["b.ifl", "a.ifl"]);
        mgr.apply(RuleSetCommand::MoveUp(0)).unwrap();
        mgr.apply(RuleSetCommand::MoveDown(1)).unwrap();
        assert_eq!(locations(&mgr.entries()), vec!["b.ifl", "a.ifl"]);

        let report = mgr.apply(RuleSetCommand::Reload).unwrap().unwrap();
        assert_eq!(report.compiled, 1);
        assert_eq!(mgr.active().rules()[0].name, "b.ifl");

        assert!(matches!(
            mgr.apply(RuleSetCommand::MoveDown(5)),
            Err(EvalError::InvalidEntryIndex { index: 5, len: 2 })
        ));
    }
}
