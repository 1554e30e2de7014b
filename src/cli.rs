use clap::{Parser, Subcommand, ValueEnum};
use std::io::IsTerminal;
use std::path::PathBuf;

use crate::config::RunMode;
use crate::persona::PersonaId;

/// Output format for commands
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable text
    Text,
    /// JSON format
    Json,
    /// YAML format
    Yaml,
}

impl OutputFormat {
    /// Resolve the effective output format.
    /// If user specified a format, use it.
    /// Otherwise: TTY → Text, non-TTY (pipe) → Json
    pub fn resolve(user_choice: Option<OutputFormat>) -> OutputFormat {
        match user_choice {
            Some(fmt) => fmt,
            None => {
                if std::io::stdout().is_terminal() {
                    OutputFormat::Text
                } else {
                    OutputFormat::Json
                }
            }
        }
    }
}

#[derive(Parser)]
#[command(
    name = "moltlog",
    about = "Daily persona growth logs: generate, validate, remember, publish",
    version,
    after_help = "Logs are written to: ~/.local/share/moltlog/logs/moltlog.log"
)]
pub struct Cli {
    /// Path to config file
    #[arg(short, long, global = true, help = "Path to moltlog.yaml config file")]
    pub config: Option<PathBuf>,

    /// Enable verbose output
    #[arg(short, long, global = true, help = "Enable verbose output")]
    pub verbose: bool,

    /// Suppress non-error output
    #[arg(short, long, global = true, help = "Suppress non-error output")]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run today's generation (the scheduled command)
    Run {
        /// Pipeline to use (defaults to config run.mode)
        #[arg(long, value_enum)]
        mode: Option<RunMode>,

        /// Day index override (defaults to the stored day + 1)
        #[arg(long)]
        day: Option<u32>,

        /// Date override, YYYY-MM-DD (defaults to today, UTC)
        #[arg(long)]
        date: Option<String>,

        /// Skip publishing the post
        #[arg(long)]
        no_post: bool,

        /// Skip the git commit
        #[arg(long)]
        no_commit: bool,

        /// Generate and validate, then print what would be written
        #[arg(long)]
        dry_run: bool,
    },

    /// Inspect personas
    Persona {
        #[command(subcommand)]
        action: PersonaAction,
    },

    /// Inspect the memory store
    Memory {
        #[command(subcommand)]
        action: MemoryAction,
    },

    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },

    /// Diagnose setup issues
    Doctor,

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        shell: clap_complete::Shell,
    },
}

#[derive(Subcommand)]
pub enum PersonaAction {
    /// List personas and where their prompts come from
    List {
        #[arg(long, short = 'o', value_enum)]
        format: Option<OutputFormat>,
    },
    /// Show one persona's system prompt
    Show {
        #[arg(value_enum)]
        persona: PersonaId,

        /// Substitute this day index into the prompt
        #[arg(long)]
        day: Option<u32>,
    },
}

#[derive(Subcommand)]
pub enum MemoryAction {
    /// Print long-term memory
    Show {
        #[arg(long, short = 'o', value_enum)]
        format: Option<OutputFormat>,
    },
    /// List dated records
    List {
        #[arg(long, value_enum)]
        persona: Option<PersonaId>,

        #[arg(long, short = 'o', value_enum)]
        format: Option<OutputFormat>,
    },
    /// Print the opportunity book
    Opportunities {
        #[arg(long, short = 'o', value_enum)]
        format: Option<OutputFormat>,
    },
}

#[derive(Subcommand)]
pub enum ConfigAction {
    /// Show the effective configuration
    Show {
        #[arg(long, short = 'o', value_enum)]
        format: Option<OutputFormat>,
    },
    /// Print the config file search path
    Path,
}
