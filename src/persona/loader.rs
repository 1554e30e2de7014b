//! Persona loading with on-disk overrides

use eyre::{Context, Result};
use indexmap::IndexMap;
use std::fs;
use std::path::{Path, PathBuf};

use super::{Persona, PersonaId, PromptSource};

/// Loads personas, preferring `<agents_dir>/<id>_system.md` over the built-ins
pub struct PersonaLoader {
    agents_dir: PathBuf,
}

impl PersonaLoader {
    pub fn new(agents_dir: PathBuf) -> Self {
        Self { agents_dir }
    }

    pub fn override_path(&self, id: PersonaId) -> PathBuf {
        self.agents_dir.join(format!("{}_system.md", id.as_str()))
    }

    /// Load a single persona. An empty override file falls back to the built-in.
    pub fn load(&self, id: PersonaId) -> Result<Persona> {
        let path = self.override_path(id);
        if !path.exists() {
            return Ok(Persona::builtin(id));
        }

        let content =
            fs::read_to_string(&path).with_context(|| format!("Failed to read persona file: {}", path.display()))?;
        let prompt = content.trim();

        if prompt.is_empty() {
            log::warn!("Persona file {} is empty, using built-in prompt", path.display());
            return Ok(Persona::builtin(id));
        }

        log::debug!("Loaded persona {} from {}", id, path.display());
        Ok(Persona {
            id,
            system_prompt: prompt.to_string(),
            source: PromptSource::File(path),
        })
    }

    /// Load every persona, in a stable order
    pub fn load_all(&self) -> Result<IndexMap<PersonaId, Persona>> {
        let mut personas = IndexMap::new();
        for id in PersonaId::ALL {
            personas.insert(id, self.load(id)?);
        }
        Ok(personas)
    }

    pub fn agents_dir(&self) -> &Path {
        &self.agents_dir
    }
}
