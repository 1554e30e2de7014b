use eyre::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

pub const ENV_LLM_KEY: &str = "DEEPSEEK_API_KEY";
pub const ENV_LLM_BASE_URL: &str = "DEEPSEEK_BASE_URL";
pub const ENV_LLM_MODEL: &str = "DEEPSEEK_MODEL";
pub const ENV_POST_KEY: &str = "MOLTBOOK_KEY_HEALING";
pub const ENV_SUBMOLT: &str = "MOLTBOOK_SUBMOLT";

/// Main moltlog configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct Config {
    pub log_level: LogLevel,
    pub paths: PathsConfig,
    pub llm: LlmConfig,
    pub publisher: PublisherConfig,
    pub git: GitConfig,
    pub run: RunConfig,
}

#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
    Off,
}

impl LogLevel {
    pub fn as_filter(&self) -> &'static str {
        match self {
            LogLevel::Trace => "trace",
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
            LogLevel::Off => "off",
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct PathsConfig {
    /// Directory holding `<persona>_system.md` overrides
    pub agents: PathBuf,
    /// Root of the memory store
    pub memory: PathBuf,
    /// Git working tree the memory lives in
    pub repo: PathBuf,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct LlmConfig {
    pub base_url: String,
    pub model: String,
    pub timeout_secs: u64,
    /// Filled from the environment only, never written back
    #[serde(skip)]
    pub api_key: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct PublisherConfig {
    pub enabled: bool,
    pub base_url: String,
    pub submolt: String,
    pub timeout_secs: u64,
    #[serde(skip)]
    pub api_key: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct GitConfig {
    pub enabled: bool,
    pub push: bool,
    pub user_name: String,
    pub user_email: String,
}

/// Which generation pipeline a run uses
#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum RunMode {
    /// One call, one `post`/`memory`/`ops` object
    Unified,
    /// Profit, then Healing, then DigitalTwin, then the public post
    Composite,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RunConfig {
    pub mode: RunMode,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            log_level: LogLevel::Info,
            paths: PathsConfig::default(),
            llm: LlmConfig::default(),
            publisher: PublisherConfig::default(),
            git: GitConfig::default(),
            run: RunConfig::default(),
        }
    }
}

impl Default for PathsConfig {
    fn default() -> Self {
        let root = Config::moltlog_dir();

        Self {
            agents: root.join("agents"),
            memory: root.join("memory"),
            repo: root,
        }
    }
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.deepseek.com".to_string(),
            model: "deepseek-chat".to_string(),
            timeout_secs: 60,
            api_key: None,
        }
    }
}

impl Default for PublisherConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            base_url: "https://www.moltbook.com".to_string(),
            submolt: "general".to_string(),
            timeout_secs: 60,
            api_key: None,
        }
    }
}

impl Default for GitConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            push: true,
            user_name: "moltbook-bot".to_string(),
            user_email: "moltbook-bot@users.noreply.github.com".to_string(),
        }
    }
}

impl Default for RunConfig {
    fn default() -> Self {
        Self { mode: RunMode::Composite }
    }
}

impl Config {
    /// Load configuration with fallback chain, then apply environment overrides
    pub fn load(config_path: Option<&PathBuf>) -> Result<Self> {
        let mut config = Self::load_file(config_path)?;
        config.apply_env(|key| std::env::var(key).ok());
        Ok(config)
    }

    fn load_file(config_path: Option<&PathBuf>) -> Result<Self> {
        // If explicit config path provided, try to load it
        if let Some(path) = config_path {
            return Self::load_from_file(path).context(format!("Failed to load config from {}", path.display()));
        }

        if let Ok(env_path) = std::env::var("MOLTLOG_CONFIG") {
            let path = PathBuf::from(env_path);
            if path.exists() {
                match Self::load_from_file(&path) {
                    Ok(config) => return Ok(config),
                    Err(e) => {
                        log::warn!("Failed to load config from MOLTLOG_CONFIG: {}", e);
                    }
                }
            }
        }

        if let Ok(dir) = std::env::var("MOLTLOG_DIR") {
            let path = PathBuf::from(dir).join("moltlog.yaml");
            if path.exists() {
                match Self::load_from_file(&path) {
                    Ok(config) => return Ok(config),
                    Err(e) => {
                        log::warn!("Failed to load config from MOLTLOG_DIR: {}", e);
                    }
                }
            }
        }

        if let Some(config_dir) = dirs::config_dir() {
            let path = config_dir.join("moltlog").join("moltlog.yaml");
            if path.exists() {
                match Self::load_from_file(&path) {
                    Ok(config) => return Ok(config),
                    Err(e) => {
                        log::warn!("Failed to load config from {}: {}", path.display(), e);
                    }
                }
            }
        }

        let local_config = PathBuf::from("moltlog.yaml");
        if local_config.exists() {
            match Self::load_from_file(&local_config) {
                Ok(config) => return Ok(config),
                Err(e) => {
                    log::warn!("Failed to load local config: {}", e);
                }
            }
        }

        log::info!("No config file found, using defaults");
        Ok(Self::default())
    }

    fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(&path).context("Failed to read config file")?;

        let config: Self = serde_yaml::from_str(&content).context("Failed to parse config file")?;

        log::info!("Loaded config from: {}", path.as_ref().display());
        Ok(config)
    }

    /// Overlay credentials and endpoint settings from the environment.
    ///
    /// Takes a lookup function so tests don't have to mutate process env.
    pub fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        if let Some(key) = get(ENV_LLM_KEY) {
            self.llm.api_key = Some(key);
        }
        if let Some(url) = get(ENV_LLM_BASE_URL) {
            self.llm.base_url = url;
        }
        if let Some(model) = get(ENV_LLM_MODEL) {
            self.llm.model = model;
        }
        if let Some(key) = get(ENV_POST_KEY) {
            self.publisher.api_key = Some(key);
        }
        if let Some(submolt) = get(ENV_SUBMOLT) {
            self.publisher.submolt = submolt;
        }
        self.llm.base_url = self.llm.base_url.trim_end_matches('/').to_string();
        self.publisher.base_url = self.publisher.base_url.trim_end_matches('/').to_string();
    }

    /// Root directory for agents, memory and the git tree
    pub fn moltlog_dir() -> PathBuf {
        std::env::var("MOLTLOG_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| dirs::config_dir().unwrap_or_else(|| PathBuf::from(".")).join("moltlog"))
    }

    /// Expand a path that may contain ~ or env vars
    pub fn expand_path(path: &Path) -> PathBuf {
        let path_str = path.to_string_lossy();
        let expanded = shellexpand::full(&path_str).unwrap_or_else(|_| path_str.clone());
        PathBuf::from(expanded.as_ref())
    }

    pub fn memory_dir(&self) -> PathBuf {
        Self::expand_path(&self.paths.memory)
    }

    pub fn agents_dir(&self) -> PathBuf {
        Self::expand_path(&self.paths.agents)
    }

    pub fn repo_dir(&self) -> PathBuf {
        Self::expand_path(&self.paths.repo)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env_of(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
    }

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.llm.model, "deepseek-chat");
        assert_eq!(config.llm.timeout_secs, 60);
        assert_eq!(config.publisher.submolt, "general");
        assert!(config.publisher.enabled);
        assert!(config.llm.api_key.is_none());
        assert_eq!(config.run.mode, RunMode::Composite);
    }

    #[test]
    fn test_apply_env_overrides() {
        let env = env_of(&[
            (ENV_LLM_KEY, "  sk-test  "),
            (ENV_LLM_BASE_URL, "http://localhost:9000/"),
            (ENV_LLM_MODEL, "deepseek-reasoner"),
            (ENV_POST_KEY, "mb-key"),
            (ENV_SUBMOLT, "healing"),
        ]);
        let mut config = Config::default();
        config.apply_env(|k| env.get(k).cloned());

        assert_eq!(config.llm.api_key.as_deref(), Some("sk-test"));
        assert_eq!(config.llm.base_url, "http://localhost:9000");
        assert_eq!(config.llm.model, "deepseek-reasoner");
        assert_eq!(config.publisher.api_key.as_deref(), Some("mb-key"));
        assert_eq!(config.publisher.submolt, "healing");
    }

    #[test]
    fn test_apply_env_ignores_blank_values() {
        let env = env_of(&[(ENV_LLM_KEY, "   "), (ENV_SUBMOLT, "")]);
        let mut config = Config::default();
        config.apply_env(|k| env.get(k).cloned());

        assert!(config.llm.api_key.is_none());
        assert_eq!(config.publisher.submolt, "general");
    }

    #[test]
    fn test_partial_yaml_uses_defaults() {
        let yaml = r#"
log_level: debug
llm:
  model: custom-model
run:
  mode: unified
"#;
        let config: Config = serde_yaml::from_str(yaml).expect("Failed to parse");
        assert_eq!(config.log_level, LogLevel::Debug);
        assert_eq!(config.llm.model, "custom-model");
        assert_eq!(config.llm.base_url, "https://api.deepseek.com");
        assert_eq!(config.run.mode, RunMode::Unified);
        assert!(config.git.enabled);
    }

    #[test]
    fn test_api_keys_never_serialized() {
        let mut config = Config::default();
        config.llm.api_key = Some("secret".to_string());
        config.publisher.api_key = Some("secret".to_string());
        let yaml = serde_yaml::to_string(&config).expect("Failed to serialize");
        assert!(!yaml.contains("secret"));
    }

    #[test]
    fn test_expand_path_no_expansion() {
        let path = PathBuf::from("/usr/local/bin");
        let expanded = Config::expand_path(&path);
        assert_eq!(expanded, PathBuf::from("/usr/local/bin"));
    }

    #[test]
    fn test_expand_path_with_tilde() {
        let path = PathBuf::from("~/memory");
        let expanded = Config::expand_path(&path);
        assert!(!expanded.to_string_lossy().contains('~'));
        assert!(expanded.to_string_lossy().contains("memory"));
    }

    #[test]
    fn test_load_explicit_file() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("moltlog.yaml");
        fs::write(&path, "publisher:\n  enabled: false\n").unwrap();

        let config = Config::load_from_file(&path).unwrap();
        assert!(!config.publisher.enabled);
    }

    #[test]
    fn test_load_explicit_missing_file_errors() {
        let path = PathBuf::from("/nonexistent/moltlog.yaml");
        assert!(Config::load(Some(&path)).is_err());
    }
}
