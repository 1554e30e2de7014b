use colored::*;
use eyre::Result;
use std::path::PathBuf;

use crate::cli::{ConfigAction, OutputFormat};
use crate::config::{Config, ENV_LLM_KEY, ENV_POST_KEY};

pub fn run(action: ConfigAction, config: &Config) -> Result<()> {
    match action {
        ConfigAction::Show { format } => show(OutputFormat::resolve(format), config),
        ConfigAction::Path => path(),
    }
}

fn key_status(key: &Option<String>) -> ColoredString {
    match key {
        Some(_) => "set".green(),
        None => "missing".red(),
    }
}

fn show(format: OutputFormat, config: &Config) -> Result<()> {
    // API keys are #[serde(skip)], so the structured formats never leak them
    match format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(config)?);
        }
        OutputFormat::Yaml => {
            println!("{}", serde_yaml::to_string(config)?);
        }
        OutputFormat::Text => {
            println!("{}", "moltlog Configuration".bold());
            println!();

            println!("{}:", "paths".cyan());
            println!("  agents: {}", config.agents_dir().display());
            println!("  memory: {}", config.memory_dir().display());
            println!("  repo: {}", config.repo_dir().display());
            println!();

            println!("{}:", "llm".cyan());
            println!("  base_url: {}", config.llm.base_url);
            println!("  model: {}", config.llm.model);
            println!("  timeout_secs: {}", config.llm.timeout_secs);
            println!("  {}: {}", ENV_LLM_KEY, key_status(&config.llm.api_key));
            println!();

            println!("{}:", "publisher".cyan());
            println!("  enabled: {}", config.publisher.enabled);
            println!("  base_url: {}", config.publisher.base_url);
            println!("  submolt: {}", config.publisher.submolt);
            println!("  {}: {}", ENV_POST_KEY, key_status(&config.publisher.api_key));
            println!();

            println!("{}:", "git".cyan());
            println!("  enabled: {}", config.git.enabled);
            println!("  push: {}", config.git.push);
            println!();

            println!("{}:", "run".cyan());
            println!("  mode: {:?}", config.run.mode);
            println!("  log_level: {}", config.log_level.as_filter());
        }
    }

    Ok(())
}

fn path() -> Result<()> {
    println!("{}", "Config search order:".bold());
    let entries = search_order(std::env::var("MOLTLOG_DIR").ok(), dirs::config_dir());
    for (i, entry) in entries.iter().enumerate() {
        println!("  {}. {}", i + 1, entry);
    }
    Ok(())
}

/// Config lookup chain as printed by `config path`
fn search_order(moltlog_dir: Option<String>, config_dir: Option<PathBuf>) -> Vec<String> {
    let mut entries = vec!["--config <path>".to_string(), "$MOLTLOG_CONFIG".to_string()];
    entries.push(match moltlog_dir.filter(|d| !d.trim().is_empty()) {
        Some(dir) => PathBuf::from(dir).join("moltlog.yaml").display().to_string(),
        None => "$MOLTLOG_DIR/moltlog.yaml (unset)".to_string(),
    });
    if let Some(dir) = config_dir {
        entries.push(dir.join("moltlog").join("moltlog.yaml").display().to_string());
    }
    entries.push("./moltlog.yaml".to_string());
    entries
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_search_order_without_moltlog_dir() {
        let entries = search_order(None, Some(PathBuf::from("/home/u/.config")));
        assert_eq!(
            entries,
            vec![
                "--config <path>",
                "$MOLTLOG_CONFIG",
                "$MOLTLOG_DIR/moltlog.yaml (unset)",
                "/home/u/.config/moltlog/moltlog.yaml",
                "./moltlog.yaml",
            ]
        );
    }

    #[test]
    fn test_search_order_with_moltlog_dir() {
        let entries = search_order(Some("/srv/molt".to_string()), None);
        assert_eq!(entries[2], "/srv/molt/moltlog.yaml");
        assert_eq!(entries.len(), 4);
    }
}
