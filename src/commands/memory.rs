use colored::*;
use eyre::{Context, Result};
use serde::Serialize;

use crate::cli::{MemoryAction, OutputFormat};
use crate::config::Config;
use crate::memory::MemoryStore;
use crate::memory::opportunities::OpportunityStatus;
use crate::persona::PersonaId;

pub fn run(action: MemoryAction, config: &Config) -> Result<()> {
    let store = MemoryStore::new(config.memory_dir());
    match action {
        MemoryAction::Show { format } => show(&store, OutputFormat::resolve(format)),
        MemoryAction::List { persona, format } => list(&store, persona, OutputFormat::resolve(format)),
        MemoryAction::Opportunities { format } => opportunities(&store, OutputFormat::resolve(format)),
    }
}

fn show(store: &MemoryStore, format: OutputFormat) -> Result<()> {
    let state = store.load_state().context("Failed to load long-term memory")?;

    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&state)?),
        OutputFormat::Yaml => println!("{}", serde_yaml::to_string(&state)?),
        OutputFormat::Text => {
            println!("{}", "Long-term memory".bold());
            println!("  {}", store.state_path().display().to_string().dimmed());
            println!();
            println!("  Day: {}", state.day.to_string().cyan());
            match state.last_run {
                Some(d) => println!("  Last run: {}", d),
                None => println!("  Last run: {}", "never".dimmed()),
            }
            println!();
            println!("{}", state.summary());
        }
    }
    Ok(())
}

fn list(store: &MemoryStore, persona: Option<PersonaId>, format: OutputFormat) -> Result<()> {
    let records = store.list_records(persona)?;

    #[derive(Serialize)]
    struct RecordRow {
        persona: PersonaId,
        date: String,
        path: String,
    }

    let rows: Vec<RecordRow> = records
        .iter()
        .map(|r| RecordRow {
            persona: r.persona,
            date: r.date.format("%Y-%m-%d").to_string(),
            path: r.path.display().to_string(),
        })
        .collect();

    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&rows)?),
        OutputFormat::Yaml => println!("{}", serde_yaml::to_string(&rows)?),
        OutputFormat::Text => {
            if rows.is_empty() {
                println!("  {} No records in {}", "(none)".dimmed(), store.root().display());
                return Ok(());
            }
            println!("{} {} records:", "📓".blue(), rows.len());
            for row in &rows {
                println!("  {} {:<12} {}", row.date.cyan(), row.persona.to_string(), row.path.dimmed());
            }
        }
    }
    Ok(())
}

fn opportunities(store: &MemoryStore, format: OutputFormat) -> Result<()> {
    let book = store.load_opportunities().context("Failed to load opportunity book")?;

    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&book)?),
        OutputFormat::Yaml => println!("{}", serde_yaml::to_string(&book)?),
        OutputFormat::Text => {
            println!("{}", "Opportunity book".bold());
            println!(
                "  Review every {} days, last review: {}",
                book.review_interval_days,
                book.last_review_date.as_deref().unwrap_or("never")
            );
            println!();
            if book.opportunities.is_empty() {
                println!("  {}", "(none)".dimmed());
            }
            for opp in &book.opportunities {
                let status = format!("{:?}", opp.status).to_lowercase();
                let status = match opp.status {
                    OpportunityStatus::Active => status.green(),
                    OpportunityStatus::Blocked => status.yellow(),
                    OpportunityStatus::Killed => status.red(),
                    _ => status.dimmed(),
                };
                println!("  {} [{}] {}", opp.id.bold(), status, opp.title);
                for action in &opp.next_actions {
                    println!("      → {}", action);
                }
            }
        }
    }
    Ok(())
}
