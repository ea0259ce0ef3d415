//! TexSwap CLI
//!
//! Developer tool for rule resource files: validate them, preview the ids
//! they would be installed under, and simulate switch sequences against an
//! in-memory host.

use std::fs;
use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};

use tx_core::host::{HostApiError, RuleSource};
use tx_core::memory::{MemoryEngine, MemoryNotifier, MemoryStore};
use tx_core::{
    assign_rule_ids, parse_rule_file, Coordinator, RuleSetRegistry, Selection,
    ACTIVE_SELECTION_KEY,
};

#[derive(Parser)]
#[command(name = "tx-cli")]
#[command(about = "TexSwap rule file validator and switch simulator")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate a rule resource file
    Validate {
        /// Rule file to validate
        #[arg(short, long)]
        input: String,
    },

    /// Show the dynamic-rule ids a file would be installed under
    Info {
        /// Rule file to inspect
        #[arg(short, long)]
        input: String,

        /// Id base to assign from
        #[arg(short, long, default_value_t = 1000)]
        base: u32,
    },

    /// Run a switch sequence against an in-memory host
    Simulate {
        /// Directory holding <key>.json rule files
        #[arg(short, long)]
        rules_dir: PathBuf,

        /// Rule-set keys to switch through, in order ("none" allowed)
        #[arg(required = true)]
        keys: Vec<String>,
    },
}

fn main() {
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Validate { input } => cmd_validate(&input),
        Commands::Info { input, base } => cmd_info(&input, base),
        Commands::Simulate { rules_dir, keys } => cmd_simulate(&rules_dir, &keys),
    };

    if let Err(e) = result {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}

fn cmd_validate(input: &str) -> Result<(), String> {
    let content = fs::read_to_string(input)
        .map_err(|e| format!("Failed to read '{}': {}", input, e))?;

    let rules = parse_rule_file(&content)
        .map_err(|e| format!("Invalid rule file '{}': {}", input, e))?;

    println!("Rule file '{}' is valid", input);
    println!("  Rules:    {}", rules.len());

    Ok(())
}

fn cmd_info(input: &str, base: u32) -> Result<(), String> {
    let content = fs::read_to_string(input)
        .map_err(|e| format!("Failed to read '{}': {}", input, e))?;

    let mut rules = parse_rule_file(&content)
        .map_err(|e| format!("Invalid rule file '{}': {}", input, e))?;
    assign_rule_ids(&mut rules, base);

    println!("Rule file: {}", input);
    println!("  Rules:    {}", rules.len());
    println!("  Id range: {}..{}", base, base + rules.len() as u32);
    println!();

    for rule in &rules {
        let condition = rule
            .body
            .get("condition")
            .and_then(|c| c.get("urlFilter"))
            .and_then(|f| f.as_str());
        match condition {
            Some(filter) => println!("  [{}] {}", rule.id, filter),
            None => println!(
                "  [{}] {}",
                rule.id,
                serde_json::Value::Object(rule.body.clone())
            ),
        }
    }

    Ok(())
}

fn cmd_simulate(rules_dir: &Path, keys: &[String]) -> Result<(), String> {
    let engine = MemoryEngine::new();
    let store = MemoryStore::new();
    let notifier = MemoryNotifier::new();
    let registry = RuleSetRegistry::builtin();

    for descriptor in registry.iter() {
        engine.ship_static_ruleset(&descriptor.static_ruleset_id);
    }

    let coordinator = Coordinator::new(
        registry,
        engine.clone(),
        store.clone(),
        DirSource {
            dir: rules_dir.to_path_buf(),
        },
        notifier.clone(),
    );

    for key in keys {
        match coordinator.switch_to(Selection::from_key(key)) {
            Ok(active) => println!("Switched to '{active}'"),
            Err(e) => {
                println!("Switch to '{key}' failed: {e}");
                continue;
            }
        }
        println!("  Dynamic ids:     {:?}", engine.installed_dynamic_ids());
        println!("  Static rulesets: {:?}", engine.enabled_static_rulesets());
        println!(
            "  Persisted:       {}",
            store.value(ACTIVE_SELECTION_KEY).unwrap_or_default()
        );
    }

    println!();
    println!("Broadcasts: {}", notifier.notes().len());

    Ok(())
}

/// Rule source reading `<dir>/<key>.json`, the same naming convention the
/// extension uses for its bundled resources.
struct DirSource {
    dir: PathBuf,
}

impl RuleSource for DirSource {
    fn load(&self, key: &str) -> Result<String, HostApiError> {
        let path = self.dir.join(format!("{key}.json"));
        fs::read_to_string(&path)
            .map_err(|e| HostApiError::new(format!("failed to read {}: {}", path.display(), e)))
    }
}
