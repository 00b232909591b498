mod fixture;

use std::io::{self, BufRead};
use std::path::{Path, PathBuf};
use std::process;
use std::sync::Arc;
use std::time::Instant;

use clap::{Parser, Subcommand};
use invlight_eval::{
    ATTRIBUTES, Engine, HighlightSelector, ItemKey, ItemRecord, RuleSetManager, Settings,
    compile_file,
};
use invlight_parser::{parse_rule, rule_files};
use serde::Serialize;

use crate::fixture::FixtureState;

#[derive(Parser)]
#[command(name = "invlight")]
#[command(about = "Parse, check, and evaluate .ifl item filter rules")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Parse a filter expression and print the AST as JSON
    Parse {
        /// The expression to parse
        expr: String,
    },

    /// Compile a rule file, or every rule file in a directory
    Check {
        /// Path to a .ifl file or a directory of them
        path: PathBuf,

        /// List every file, not just failures
        #[arg(short, long)]
        verbose: bool,
    },

    /// List the item attributes rules can reference
    Attributes {
        /// Print the registry as JSON
        #[arg(long)]
        json: bool,
    },

    /// Evaluate items against rules
    ///
    /// Items are JSON objects with a key and attributes. Provide one with
    /// --item, or NDJSON (newline-delimited JSON) on stdin.
    Eval {
        /// Path to a .ifl file or a directory of them
        #[arg(short, long, conflicts_with = "expr", required_unless_present = "expr")]
        rules: Option<PathBuf>,

        /// An inline filter expression
        #[arg(short = 'x', long)]
        expr: Option<String>,

        /// A single item as a JSON string (if omitted, reads NDJSON from stdin)
        #[arg(short, long)]
        item: Option<String>,

        /// Pretty-print JSON output
        #[arg(short, long)]
        pretty: bool,
    },

    /// Merge a rule directory with persisted settings and compile enabled rules
    Reload {
        /// Default rule directory
        #[arg(short, long)]
        dir: PathBuf,

        /// Settings JSON file (defaults are used when absent)
        #[arg(short, long)]
        settings: Option<PathBuf>,

        /// Write the merged entries back to the settings file
        #[arg(short, long, requires = "settings")]
        write: bool,
    },

    /// Run one highlight frame against a JSON game-state fixture
    Frame {
        /// Settings JSON file
        #[arg(short, long)]
        settings: PathBuf,

        /// Default rule directory
        #[arg(short, long)]
        dir: PathBuf,

        /// Game-state fixture JSON file
        #[arg(long)]
        state: PathBuf,

        /// Pretty-print JSON output
        #[arg(short, long)]
        pretty: bool,
    },
}

fn main() {
    env_logger::init();
    let cli = Cli::parse();

    match cli.command {
        Commands::Parse { expr } => cmd_parse(expr),
        Commands::Check { path, verbose } => cmd_check(path, verbose),
        Commands::Attributes { json } => cmd_attributes(json),
        Commands::Eval {
            rules,
            expr,
            item,
            pretty,
        } => cmd_eval(rules, expr, item, pretty),
        Commands::Reload {
            dir,
            settings,
            write,
        } => cmd_reload(dir, settings, write),
        Commands::Frame {
            settings,
            dir,
            state,
            pretty,
        } => cmd_frame(settings, dir, state, pretty),
    }
}

// ---------------------------------------------------------------------------
// Subcommand implementations
// ---------------------------------------------------------------------------

fn cmd_parse(expr: String) {
    match parse_rule(&expr) {
        Ok(ast) => print_json(&ast, true),
        Err(e) => {
            eprintln!("Parse error: {e}");
            process::exit(1);
        }
    }
}

fn cmd_check(path: PathBuf, verbose: bool) {
    let files = if path.is_dir() {
        match rule_files(&path) {
            Ok(files) => files,
            Err(e) => {
                eprintln!("Error listing {}: {e}", path.display());
                process::exit(1);
            }
        }
    } else {
        vec![path.clone()]
    };

    let mut failed = 0usize;
    for file in &files {
        match compile_file(file) {
            Ok(_) => {
                if verbose {
                    println!("  ok     {}", file.display());
                }
            }
            Err(e) => {
                failed += 1;
                println!("  error  {}: {e}", file.display());
            }
        }
    }

    println!(
        "Checked {} rule files from {}: {} ok, {failed} failed",
        files.len(),
        path.display(),
        files.len() - failed
    );
    if failed > 0 {
        process::exit(1);
    }
}

fn cmd_attributes(json: bool) {
    if json {
        print_json(&ATTRIBUTES, true);
        return;
    }
    for def in ATTRIBUTES {
        println!("{:<14} {:<12} {}", def.name, def.kind.as_str(), def.description);
    }
}

#[derive(Serialize)]
struct EvalMatch<'a> {
    key: ItemKey,
    rules: Vec<&'a str>,
}

fn cmd_eval(rules: Option<PathBuf>, expr: Option<String>, item: Option<String>, pretty: bool) {
    let engine = match (rules, expr) {
        (_, Some(expr)) => {
            let mut engine = Engine::new();
            if let Err(e) = engine.add_rule("expr", &expr) {
                eprintln!("Error compiling expression: {e}");
                process::exit(1);
            }
            engine
        }
        (Some(path), None) => load_engine(&path),
        (None, None) => {
            eprintln!("Either --rules or --expr is required");
            process::exit(2);
        }
    };

    if let Some(json_str) = item {
        let record = match parse_item(&json_str) {
            Ok(r) => r,
            Err(e) => {
                eprintln!("Invalid item: {e}");
                process::exit(1);
            }
        };
        let rules = engine.evaluate(&record);
        if rules.is_empty() {
            eprintln!("No matches.");
        } else {
            print_json(&EvalMatch { key: record.key(), rules }, pretty);
        }
    } else {
        let stdin = io::stdin();
        let mut line_num = 0u64;
        let mut match_count = 0u64;

        for line in stdin.lock().lines() {
            line_num += 1;
            let line = match line {
                Ok(l) => l,
                Err(e) => {
                    eprintln!("Error reading line {line_num}: {e}");
                    continue;
                }
            };

            if line.trim().is_empty() {
                continue;
            }

            let record = match parse_item(&line) {
                Ok(r) => r,
                Err(e) => {
                    eprintln!("Invalid item on line {line_num}: {e}");
                    continue;
                }
            };

            let rules = engine.evaluate(&record);
            if !rules.is_empty() {
                match_count += 1;
                print_json(&EvalMatch { key: record.key(), rules }, pretty);
            }
        }

        eprintln!("Processed {line_num} items, {match_count} matches.");
    }
}

fn cmd_reload(dir: PathBuf, settings_path: Option<PathBuf>, write: bool) {
    let mut settings = match &settings_path {
        Some(p) => load_settings(p),
        None => Settings::default(),
    };

    let manager = RuleSetManager::new(settings.rule_directories(&dir), settings.rules.clone());
    let report = match manager.reload() {
        Ok(r) => r,
        Err(e) => {
            eprintln!("Reload failed: {e}");
            process::exit(1);
        }
    };

    for issue in &report.issues {
        eprintln!("Warning: {issue}");
    }
    print_json(&report, true);

    if write && let Some(path) = settings_path {
        settings.rules = report.entries;
        if let Err(e) = settings.save(&path) {
            eprintln!("Error writing {}: {e}", path.display());
            process::exit(1);
        }
        eprintln!("Saved {} entries to {}", settings.rules.len(), path.display());
    }
}

fn cmd_frame(settings_path: PathBuf, dir: PathBuf, state_path: PathBuf, pretty: bool) {
    let mut settings = load_settings(&settings_path);
    let state = match FixtureState::load(&state_path) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("Error loading state {}: {e}", state_path.display());
            process::exit(1);
        }
    };
    if state.filter_test.is_some() {
        settings.filter_test = state.filter_test.clone();
    }
    if !settings.enable {
        eprintln!("Warning: overlay is disabled in {}", settings_path.display());
    }

    let manager = RuleSetManager::new(settings.rule_directories(&dir), settings.rules.clone());
    match manager.reload() {
        Ok(report) => {
            for issue in &report.issues {
                eprintln!("Warning: {issue}");
            }
        }
        Err(e) => {
            eprintln!("Reload failed: {e}");
            process::exit(1);
        }
    }

    let area = state.area;
    let selector = HighlightSelector::new(
        Arc::new(state),
        Arc::new(manager),
        settings.highlight_options(),
    );
    if let Some(area) = area {
        selector.on_area_change(area);
    }

    let frame = selector.tick(Instant::now());
    log::debug!("frame produced {} draw commands", frame.commands.len());
    print_json(&frame, pretty);
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn load_engine(path: &Path) -> Engine {
    let mut engine = Engine::new();
    let files = if path.is_dir() {
        match rule_files(path) {
            Ok(files) => files,
            Err(e) => {
                eprintln!("Error loading rules from {}: {e}", path.display());
                process::exit(1);
            }
        }
    } else {
        vec![path.to_path_buf()]
    };

    let mut errors = 0usize;
    for file in &files {
        if let Err(e) = engine.add_rule_file(file) {
            errors += 1;
            eprintln!("  - {}: {e}", file.display());
        }
    }
    if errors > 0 {
        eprintln!("Warning: {errors} rule files failed to compile");
    }
    if engine.is_empty() && errors > 0 {
        process::exit(1);
    }

    eprintln!("Loaded {} rules from {}", engine.rule_count(), path.display());
    engine
}

fn load_settings(path: &Path) -> Settings {
    match Settings::load(path) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("Error loading settings {}: {e}", path.display());
            process::exit(1);
        }
    }
}

fn parse_item(json: &str) -> Result<ItemRecord, String> {
    let value: serde_json::Value = serde_json::from_str(json).map_err(|e| e.to_string())?;
    ItemRecord::from_json(&value).map_err(|e| e.to_string())
}

fn print_json(value: &impl Serialize, pretty: bool) {
    let json = if pretty {
        serde_json::to_string_pretty(value)
    } else {
        serde_json::to_string(value)
    };
    match json {
        Ok(j) => println!("{j}"),
        Err(e) => {
            eprintln!("JSON serialization error: {e}");
            process::exit(1);
        }
    }
}
