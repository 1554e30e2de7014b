//! Persona inspection commands

use colored::*;
use eyre::Result;
use serde::Serialize;

use crate::cli::{OutputFormat, PersonaAction};
use crate::config::Config;
use crate::memory::MemoryStore;
use crate::persona::{PersonaId, PersonaLoader, PromptSource, TemplateVars};

pub fn run(action: PersonaAction, config: &Config) -> Result<()> {
    match action {
        PersonaAction::List { format } => list(OutputFormat::resolve(format), config),
        PersonaAction::Show { persona, day } => show(persona, day, config),
    }
}

fn list(format: OutputFormat, config: &Config) -> Result<()> {
    let loader = PersonaLoader::new(config.agents_dir());
    let personas = loader.load_all()?;

    #[derive(Serialize)]
    struct PersonaSummary {
        id: &'static str,
        name: &'static str,
        output: String,
        source: String,
    }

    let summaries: Vec<PersonaSummary> = personas
        .values()
        .map(|p| PersonaSummary {
            id: p.id.as_str(),
            name: p.id.display_name(),
            output: p.shape().describe(),
            source: match &p.source {
                PromptSource::Builtin => "builtin".to_string(),
                PromptSource::File(path) => path.display().to_string(),
            },
        })
        .collect();

    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&summaries)?),
        OutputFormat::Yaml => println!("{}", serde_yaml::to_string(&summaries)?),
        OutputFormat::Text => {
            println!("{}", "Personas:".bold());
            println!();
            for s in &summaries {
                println!("  {} {} ({})", "●".green(), s.name.bold(), s.id);
                println!("    Output: {}", s.output.cyan());
                println!("    Prompt: {}", s.source.dimmed());
                println!();
            }
            println!(
                "  Override a prompt with {}",
                loader.agents_dir().join("<id>_system.md").display().to_string().cyan()
            );
        }
    }

    Ok(())
}

fn show(id: PersonaId, day: Option<u32>, config: &Config) -> Result<()> {
    let persona = PersonaLoader::new(config.agents_dir()).load(id)?;

    let day = match day {
        Some(day) => day,
        None => MemoryStore::new(config.memory_dir()).load_state()?.next_day(),
    };
    let vars = TemplateVars::new()
        .set("day", day)
        .set("date", chrono::Utc::now().date_naive().format("%Y-%m-%d"));

    println!("{} {}", persona.id.display_name().bold(), format!("(day {})", day).dimmed());
    println!("{}", "─".repeat(50));
    println!("{}", persona.system_for(&vars));
    Ok(())
}
