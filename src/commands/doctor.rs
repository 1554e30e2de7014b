//! Diagnose moltlog setup issues

use colored::*;
use eyre::Result;

use crate::config::{Config, ENV_LLM_KEY, ENV_POST_KEY};
use crate::memory::MemoryStore;
use crate::persona::{PersonaId, PersonaLoader, PromptSource};

pub fn run(config: &Config) -> Result<()> {
    println!("{}", "moltlog Doctor".bold());
    println!("{}", "═".repeat(50));
    println!();

    let mut issues = 0;

    // Credentials
    if config.llm.api_key.is_some() {
        println!("{} {} is set", "✓".green(), ENV_LLM_KEY);
    } else {
        println!("{} {} is missing", "✗".red(), ENV_LLM_KEY);
        issues += 1;
    }
    if !config.publisher.enabled {
        println!("{} Publishing disabled", "→".blue());
    } else if config.publisher.api_key.is_some() {
        println!("{} {} is set", "✓".green(), ENV_POST_KEY);
    } else {
        println!("{} {} is missing (or run with --no-post)", "✗".red(), ENV_POST_KEY);
        issues += 1;
    }
    println!("  Model: {} at {}", config.llm.model.cyan(), config.llm.base_url);
    println!();

    // Memory
    let store = MemoryStore::new(config.memory_dir());
    if store.root().exists() {
        let count = store.list_records(None)?.len();
        println!(
            "{} Memory directory: {} ({} records)",
            "✓".green(),
            store.root().display(),
            count
        );
    } else {
        println!(
            "{} Memory directory missing: {} (created on first run)",
            "⚠".yellow(),
            store.root().display()
        );
    }
    match store.load_state() {
        Ok(state) => println!("  Next day index: {}", state.next_day().to_string().cyan()),
        Err(e) => {
            println!("{} Cannot read long-term memory: {}", "✗".red(), e);
            issues += 1;
        }
    }
    println!();

    // Personas
    let loader = PersonaLoader::new(config.agents_dir());
    for id in PersonaId::ALL {
        match loader.load(id) {
            Ok(persona) => match persona.source {
                PromptSource::Builtin => println!("{} {}: built-in prompt", "✓".green(), id.display_name()),
                PromptSource::File(path) => {
                    println!("{} {}: {}", "✓".green(), id.display_name(), path.display())
                }
            },
            Err(e) => {
                println!("{} {}: {}", "✗".red(), id.display_name(), e);
                issues += 1;
            }
        }
    }
    println!();

    // Git
    if !config.git.enabled {
        println!("{} Git commit disabled", "→".blue());
    } else if which::which("git").is_ok() {
        let repo = config.repo_dir();
        if repo.join(".git").exists() {
            println!("{} Git repository: {}", "✓".green(), repo.display());
        } else {
            println!("{} Not a git repository: {}", "⚠".yellow(), repo.display());
        }
    } else {
        println!("{} git not found on PATH", "⚠".yellow());
    }

    println!();
    if issues == 0 {
        println!("{} All checks passed", "✓".green().bold());
    } else {
        println!("{} {} issue(s) found", "✗".red().bold(), issues);
    }

    Ok(())
}
