//! Personas: named prompt templates with a required output shape
//!
//! Each persona ships a built-in system prompt. Dropping
//! `<agents_dir>/<id>_system.md` next to the memory replaces it.

pub mod loader;
pub mod prompts;

pub use loader::PersonaLoader;

use lazy_regex::regex_replace_all;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::path::PathBuf;

/// The agents a run can speak as
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum PersonaId {
    #[value(name = "digitaltwin")]
    DigitalTwin,
    Healing,
    Profit,
    Unified,
}

impl PersonaId {
    pub const ALL: [PersonaId; 4] = [
        PersonaId::DigitalTwin,
        PersonaId::Healing,
        PersonaId::Profit,
        PersonaId::Unified,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            PersonaId::DigitalTwin => "digitaltwin",
            PersonaId::Healing => "healing",
            PersonaId::Profit => "profit",
            PersonaId::Unified => "unified",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            PersonaId::DigitalTwin => "DigitalTwin",
            PersonaId::Healing => "Healing",
            PersonaId::Profit => "Profit",
            PersonaId::Unified => "Unified",
        }
    }

    /// Output shape the persona must produce on its daily call
    pub fn output_shape(&self) -> OutputShape {
        match self {
            PersonaId::DigitalTwin | PersonaId::Healing => OutputShape::Markdown,
            PersonaId::Profit => OutputShape::Json {
                required: &["updated_state", "today_profit_md"],
                exact: false,
            },
            PersonaId::Unified => OutputShape::Json {
                required: &["post", "memory", "ops"],
                exact: true,
            },
        }
    }

    fn builtin_prompt(&self) -> &'static str {
        match self {
            PersonaId::DigitalTwin => prompts::DIGITALTWIN_SYSTEM,
            PersonaId::Healing => prompts::HEALING_SYSTEM,
            PersonaId::Profit => prompts::PROFIT_SYSTEM,
            PersonaId::Unified => prompts::UNIFIED_SYSTEM,
        }
    }
}

impl fmt::Display for PersonaId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for PersonaId {
    type Err = eyre::Error;

    fn from_str(s: &str) -> eyre::Result<Self> {
        match s.to_lowercase().as_str() {
            "digitaltwin" | "digital-twin" | "twin" => Ok(PersonaId::DigitalTwin),
            "healing" => Ok(PersonaId::Healing),
            "profit" => Ok(PersonaId::Profit),
            "unified" => Ok(PersonaId::Unified),
            _ => eyre::bail!("Unknown persona: {}. Supported: digitaltwin, healing, profit, unified", s),
        }
    }
}

/// What a persona's raw reply has to look like
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputShape {
    /// Non-empty free text
    Markdown,
    /// A JSON object carrying `required` keys; with `exact`, nothing else
    Json {
        required: &'static [&'static str],
        exact: bool,
    },
}

impl OutputShape {
    pub fn describe(&self) -> String {
        match self {
            OutputShape::Markdown => "markdown".to_string(),
            OutputShape::Json { required, exact } => {
                let keys = required.join(", ");
                if *exact {
                    format!("json {{{}}} (exact)", keys)
                } else {
                    format!("json {{{}}}", keys)
                }
            }
        }
    }
}

/// Where a persona's system prompt came from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PromptSource {
    Builtin,
    File(PathBuf),
}

/// A loaded persona
#[derive(Debug, Clone)]
pub struct Persona {
    pub id: PersonaId,
    pub system_prompt: String,
    pub source: PromptSource,
}

impl Persona {
    pub fn builtin(id: PersonaId) -> Self {
        Self {
            id,
            system_prompt: id.builtin_prompt().to_string(),
            source: PromptSource::Builtin,
        }
    }

    pub fn shape(&self) -> OutputShape {
        self.id.output_shape()
    }

    /// System prompt with the day counter and date substituted
    pub fn system_for(&self, vars: &TemplateVars) -> String {
        render(&self.system_prompt, vars)
    }
}

/// Placeholder values for [`render`]
#[derive(Debug, Clone, Default)]
pub struct TemplateVars {
    values: HashMap<String, String>,
}

impl TemplateVars {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(mut self, key: &str, value: impl ToString) -> Self {
        self.values.insert(key.to_string(), value.to_string());
        self
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(String::as_str)
    }
}

/// Substitute `{{name}}` placeholders. Unknown names are left in place.
pub fn render(template: &str, vars: &TemplateVars) -> String {
    regex_replace_all!(r"\{\{\s*([a-z_]+)\s*\}\}", template, |whole: &str, name: &str| {
        vars.get(name).map(str::to_string).unwrap_or_else(|| whole.to_string())
    })
    .into_owned()
}
