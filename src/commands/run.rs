//! The scheduled daily command

use chrono::{NaiveDate, Utc};
use colored::*;
use eyre::{Context, Result};
use std::path::PathBuf;
use std::time::Duration;

use crate::config::{Config, ENV_LLM_KEY, ENV_POST_KEY, GitConfig, RunMode};
use crate::error::{RunError, truncate_chars};
use crate::git::{self, GitOutcome};
use crate::llm::DeepSeekClient;
use crate::memory::{MemoryStore, RecordBody};
use crate::persona::PersonaLoader;
use crate::publish::{MoltbookClient, Publisher};
use crate::runner::{DailyRunner, RunOutcome, RunRequest};

pub struct RunArgs {
    pub mode: Option<RunMode>,
    pub day: Option<u32>,
    pub date: Option<String>,
    pub no_post: bool,
    pub no_commit: bool,
    pub dry_run: bool,
}

pub fn run(args: RunArgs, quiet: bool, config: &Config) -> Result<()> {
    let date = match args.date.as_deref() {
        Some(s) => NaiveDate::parse_from_str(s, "%Y-%m-%d").context("Invalid date format (use YYYY-MM-DD)")?,
        None => Utc::now().date_naive(),
    };
    let mode = args.mode.unwrap_or(config.run.mode);
    let publish = config.publisher.enabled && !args.no_post && !args.dry_run;

    // Credentials are checked before anything is generated
    let llm_key = config
        .llm
        .api_key
        .as_deref()
        .ok_or(RunError::MissingCredential(ENV_LLM_KEY))?;
    let post_key = if publish {
        Some(
            config
                .publisher
                .api_key
                .as_deref()
                .ok_or(RunError::MissingCredential(ENV_POST_KEY))?,
        )
    } else {
        None
    };

    let store = MemoryStore::new(config.memory_dir());
    let day = match args.day {
        Some(day) => day,
        None => store.load_state().context("Failed to load long-term memory")?.next_day(),
    };

    let personas = PersonaLoader::new(config.agents_dir())
        .load_all()
        .context("Failed to load personas")?;
    let client = DeepSeekClient::new(
        &config.llm.base_url,
        &config.llm.model,
        llm_key,
        Duration::from_secs(config.llm.timeout_secs),
    );
    let runner = DailyRunner::new(&client, &personas, &store);

    if !quiet {
        println!(
            "{} Generating day {} ({}) in {} mode with {}...",
            "→".blue(),
            day.to_string().cyan(),
            date,
            format!("{:?}", mode).to_lowercase().cyan(),
            config.llm.model.cyan()
        );
    }

    let request = RunRequest {
        day,
        date,
        mode,
        submolt: config.publisher.submolt.clone(),
    };
    let outcome = runner.run(&request).context("Daily run failed")?;

    if args.dry_run {
        return print_dry_run(&outcome, &store);
    }

    let git = (!args.no_commit).then(|| (config.repo_dir(), &config.git));
    let publisher = post_key.map(|key| {
        MoltbookClient::new(
            &config.publisher.base_url,
            key,
            Duration::from_secs(config.publisher.timeout_secs),
        )
    });
    deliver(&outcome, date, &store, git, publisher.as_ref(), quiet)
}

/// Persist a validated run, then commit it to git, then post it. Records
/// are on disk before the post is attempted, so a failed post keeps them.
fn deliver<P: Publisher>(
    outcome: &RunOutcome,
    date: NaiveDate,
    store: &MemoryStore,
    git: Option<(PathBuf, &GitConfig)>,
    publisher: Option<&P>,
    quiet: bool,
) -> Result<()> {
    let written = store.commit(&outcome.batch).context("Failed to write memory")?;
    if !quiet {
        for path in &written {
            println!("{} Wrote {}", "✓".green(), path.display());
        }
        if let Some(summary) = &outcome.opportunities {
            if !summary.rejected_new.is_empty() {
                println!(
                    "{} Rejected new opportunities (not a review day): {}",
                    "⚠".yellow(),
                    summary.rejected_new.join(", ")
                );
            }
            if !summary.downgraded.is_empty() {
                println!("{} Downgraded to backlog: {}", "⚠".yellow(), summary.downgraded.join(", "));
            }
        }
    }

    if let Some((repo, git_config)) = git {
        let message = format!("Daily growth logs: {}", date.format("%Y-%m-%d"));
        let result = git::commit_if_possible(&repo, git_config, &message);
        if !quiet {
            report_git(&result);
        }
    }

    if let Some(publisher) = publisher {
        let response = publisher.publish(&outcome.post).context("Failed to publish post")?;
        log::info!(
            "Moltbook post response: {}",
            truncate_chars(&response.to_string(), 500)
        );
        if !quiet {
            println!(
                "{} Posted '{}' to {}",
                "✓".green(),
                outcome.post.title,
                outcome.post.submolt.cyan()
            );
        }
    }

    Ok(())
}

fn report_git(outcome: &GitOutcome) {
    match outcome {
        GitOutcome::Disabled => {}
        GitOutcome::NotAvailable => println!("{} git not found, skipping commit", "⚠".yellow()),
        GitOutcome::NoChanges => println!("{} No git changes to commit", "→".blue()),
        GitOutcome::Committed { pushed: true } => println!("{} Committed and pushed", "✓".green()),
        GitOutcome::Committed { pushed: false } => println!("{} Committed (not pushed)", "✓".green()),
        GitOutcome::Failed(e) => println!("{} git commit skipped: {}", "⚠".yellow(), e),
    }
}

fn print_dry_run(outcome: &RunOutcome, store: &MemoryStore) -> Result<()> {
    println!("{}", "Dry run: nothing written".bold());
    println!();

    for record in &outcome.batch.records {
        let path = store.record_path(record.persona, record.date);
        println!("{} {}", "●".green(), path.display().to_string().bold());
        match &record.content {
            RecordBody::Json(value) => println!("{}", serde_json::to_string_pretty(value)?),
            RecordBody::Markdown(text) => println!("{}", text),
        }
        println!();
    }

    if let Some(state) = &outcome.batch.state {
        println!("{} {}", "●".green(), store.state_path().display().to_string().bold());
        println!("{}", serde_json::to_string_pretty(state)?);
        println!();
    }
    if let Some(book) = &outcome.batch.opportunities {
        println!("{} {}", "●".green(), store.opportunities_path().display().to_string().bold());
        println!("{}", serde_json::to_string_pretty(book)?);
        println!();
    }

    println!("{} {} → {}", "Post:".bold(), outcome.post.title, outcome.post.submolt.cyan());
    println!("{}", outcome.post.content);
    Ok(())
}
