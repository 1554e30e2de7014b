//! Commit the memory directory after a run
//!
//! Everything here is best effort: a missing git binary, a clean tree or a
//! rejected push is logged and reported, never turned into a run failure.

use std::path::Path;
use std::process::{Command, Output};

use crate::config::GitConfig;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GitOutcome {
    Disabled,
    NotAvailable,
    NoChanges,
    Committed { pushed: bool },
    Failed(String),
}

fn git(repo: &Path, args: &[&str]) -> std::io::Result<Output> {
    Command::new("git").args(args).current_dir(repo).output()
}

fn stderr_of(output: &Output) -> String {
    String::from_utf8_lossy(&output.stderr).trim().to_string()
}

pub fn commit_if_possible(repo: &Path, config: &GitConfig, message: &str) -> GitOutcome {
    if !config.enabled {
        return GitOutcome::Disabled;
    }
    if which::which("git").is_err() {
        log::warn!("git not found on PATH, skipping commit");
        return GitOutcome::NotAvailable;
    }

    let status = match git(repo, &["status", "--porcelain"]) {
        Ok(out) if out.status.success() => out,
        Ok(out) => return GitOutcome::Failed(format!("git status: {}", stderr_of(&out))),
        Err(e) => return GitOutcome::Failed(format!("git status: {}", e)),
    };
    if status.stdout.iter().all(u8::is_ascii_whitespace) {
        log::info!("No git changes to commit");
        return GitOutcome::NoChanges;
    }

    let steps: [Vec<&str>; 4] = [
        vec!["config", "user.name", config.user_name.as_str()],
        vec!["config", "user.email", config.user_email.as_str()],
        vec!["add", "-A"],
        vec!["commit", "-m", message],
    ];
    for args in &steps {
        match git(repo, args) {
            Ok(out) if out.status.success() => {}
            Ok(out) => return GitOutcome::Failed(format!("git {}: {}", args[0], stderr_of(&out))),
            Err(e) => return GitOutcome::Failed(format!("git {}: {}", args[0], e)),
        }
    }

    if !config.push {
        return GitOutcome::Committed { pushed: false };
    }

    let pushed = match git(repo, &["push"]) {
        Ok(out) if out.status.success() => true,
        Ok(out) => {
            log::warn!("git push failed: {}", stderr_of(&out));
            false
        }
        Err(e) => {
            log::warn!("git push failed: {}", e);
            false
        }
    };
    GitOutcome::Committed { pushed }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_disabled() {
        let config = GitConfig {
            enabled: false,
            ..GitConfig::default()
        };
        assert_eq!(
            commit_if_possible(Path::new("/nonexistent"), &config, "msg"),
            GitOutcome::Disabled
        );
    }

    #[test]
    fn test_commit_in_fresh_repo() {
        if which::which("git").is_err() {
            return;
        }
        let temp = TempDir::new().unwrap();
        let init = git(temp.path(), &["init", "-q"]).unwrap();
        assert!(init.status.success());

        let config = GitConfig {
            push: false,
            ..GitConfig::default()
        };
        assert_eq!(commit_if_possible(temp.path(), &config, "empty"), GitOutcome::NoChanges);

        std::fs::write(temp.path().join("state.json"), "{}").unwrap();
        assert_eq!(
            commit_if_possible(temp.path(), &config, "Daily growth logs: 2026-01-05"),
            GitOutcome::Committed { pushed: false }
        );

        let log = git(temp.path(), &["log", "--oneline"]).unwrap();
        assert!(String::from_utf8_lossy(&log.stdout).contains("Daily growth logs: 2026-01-05"));
    }

    #[test]
    fn test_not_a_repo_fails_softly() {
        if which::which("git").is_err() {
            return;
        }
        let temp = TempDir::new().unwrap();
        let outcome = commit_if_possible(temp.path(), &GitConfig::default(), "msg");
        assert!(matches!(outcome, GitOutcome::Failed(_)));
    }
}
