//! Memory store: dated daily records plus cross-run state
//!
//! Layout under the memory root:
//!   <persona>/<YYYY-MM-DD>.md|json   one immutable record per persona per day
//!   state.json                       long-term memory
//!   profit/opportunities.json        opportunity book

pub mod opportunities;
pub mod state;

pub use opportunities::OpportunityBook;
pub use state::LongTermMemory;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::fs;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use walkdir::WalkDir;

use crate::error::{Result, RunError};
use crate::persona::PersonaId;

const STATE_FILE: &str = "state.json";
const OPPORTUNITIES_FILE: &str = "opportunities.json";

/// On-disk encoding of a daily record
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordFormat {
    Json,
    Markdown,
}

impl RecordFormat {
    pub fn for_persona(id: PersonaId) -> Self {
        match id {
            PersonaId::Unified => RecordFormat::Json,
            _ => RecordFormat::Markdown,
        }
    }

    pub fn extension(&self) -> &'static str {
        match self {
            RecordFormat::Json => "json",
            RecordFormat::Markdown => "md",
        }
    }
}

/// Generated content of a record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RecordBody {
    Json(Value),
    Markdown(String),
}

/// The dated artifact of one persona for one run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyRecord {
    pub day: u32,
    pub date: NaiveDate,
    pub persona: PersonaId,
    pub generated_at: DateTime<Utc>,
    pub content: RecordBody,
}

impl DailyRecord {
    pub fn json(persona: PersonaId, day: u32, date: NaiveDate, content: Value) -> Self {
        Self {
            day,
            date,
            persona,
            generated_at: Utc::now(),
            content: RecordBody::Json(content),
        }
    }

    pub fn markdown(persona: PersonaId, day: u32, date: NaiveDate, content: impl Into<String>) -> Self {
        Self {
            day,
            date,
            persona,
            generated_at: Utc::now(),
            content: RecordBody::Markdown(content.into()),
        }
    }

    pub fn format(&self) -> RecordFormat {
        RecordFormat::for_persona(self.persona)
    }

    /// Content as prompt-ready text
    pub fn body_text(&self) -> String {
        match &self.content {
            RecordBody::Markdown(text) => text.clone(),
            RecordBody::Json(value) => serde_json::to_string_pretty(value).unwrap_or_default(),
        }
    }

    /// Serialize for disk
    pub fn to_file_contents(&self) -> Result<String> {
        match self.format() {
            RecordFormat::Json => Ok(serde_json::to_string_pretty(self)? + "\n"),
            RecordFormat::Markdown => {
                let mut md = String::new();
                md.push_str("---\n");
                md.push_str(&format!("day: {}\n", self.day));
                md.push_str(&format!("date: {}\n", self.date.format("%Y-%m-%d")));
                md.push_str(&format!("persona: {}\n", self.persona));
                md.push_str(&format!("generated_at: {}\n", self.generated_at.to_rfc3339()));
                md.push_str("---\n\n");
                md.push_str(self.body_text().trim());
                md.push('\n');
                Ok(md)
            }
        }
    }

    /// Parse a record file back. Markdown without frontmatter is accepted as
    /// a plain body so hand-written notes still feed the next run.
    pub fn from_file_contents(content: &str, persona: PersonaId, date: NaiveDate) -> Result<Self> {
        match RecordFormat::for_persona(persona) {
            RecordFormat::Json => Ok(serde_json::from_str(content)?),
            RecordFormat::Markdown => {
                let mut record = DailyRecord::markdown(persona, 0, date, String::new());
                let body = match content.strip_prefix("---\n") {
                    Some(rest) => match rest.split_once("\n---\n") {
                        Some((frontmatter, body)) => {
                            for line in frontmatter.lines() {
                                let Some((key, value)) = line.split_once(':') else {
                                    continue;
                                };
                                let value = value.trim();
                                match key.trim() {
                                    "day" => record.day = value.parse().unwrap_or(0),
                                    "generated_at" => {
                                        if let Ok(ts) = DateTime::parse_from_rfc3339(value) {
                                            record.generated_at = ts.with_timezone(&Utc);
                                        }
                                    }
                                    _ => {}
                                }
                            }
                            body
                        }
                        None => content,
                    },
                    None => content,
                };
                record.content = RecordBody::Markdown(body.trim().to_string());
                Ok(record)
            }
        }
    }
}

/// Everything one run wants to persist
#[derive(Debug, Clone, Default)]
pub struct WriteBatch {
    pub records: Vec<DailyRecord>,
    pub state: Option<LongTermMemory>,
    pub opportunities: Option<OpportunityBook>,
}

/// A record found on disk
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordInfo {
    pub persona: PersonaId,
    pub date: NaiveDate,
    pub path: PathBuf,
}

/// File-backed memory rooted at one directory
pub struct MemoryStore {
    root: PathBuf,
}

impl MemoryStore {
    pub fn new(root: PathBuf) -> Self {
        Self { root }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn ensure_layout(&self) -> Result<()> {
        for id in PersonaId::ALL {
            fs::create_dir_all(self.root.join(id.as_str()))?;
        }
        Ok(())
    }

    pub fn record_path(&self, persona: PersonaId, date: NaiveDate) -> PathBuf {
        self.root.join(persona.as_str()).join(format!(
            "{}.{}",
            date.format("%Y-%m-%d"),
            RecordFormat::for_persona(persona).extension()
        ))
    }

    pub fn has_record(&self, persona: PersonaId, date: NaiveDate) -> bool {
        self.record_path(persona, date).exists()
    }

    pub fn read_record(&self, persona: PersonaId, date: NaiveDate) -> Result<Option<DailyRecord>> {
        let path = self.record_path(persona, date);
        if !path.exists() {
            return Ok(None);
        }
        let content = fs::read_to_string(&path)?;
        DailyRecord::from_file_contents(&content, persona, date).map(Some)
    }

    pub fn state_path(&self) -> PathBuf {
        self.root.join(STATE_FILE)
    }

    pub fn opportunities_path(&self) -> PathBuf {
        self.root.join(PersonaId::Profit.as_str()).join(OPPORTUNITIES_FILE)
    }

    pub fn load_state(&self) -> Result<LongTermMemory> {
        self.read_json_or_default(&self.state_path())
    }

    pub fn load_opportunities(&self) -> Result<OpportunityBook> {
        self.read_json_or_default(&self.opportunities_path())
    }

    fn read_json_or_default<T: DeserializeOwned + Default>(&self, path: &Path) -> Result<T> {
        if !path.exists() {
            return Ok(T::default());
        }
        let content = fs::read_to_string(path)?;
        match serde_json::from_str(&content) {
            Ok(value) => Ok(value),
            Err(e) => {
                log::warn!("Unreadable {}, starting from defaults: {}", path.display(), e);
                Ok(T::default())
            }
        }
    }

    /// Persist a batch as a unit. Fails before writing anything if any dated
    /// record already exists; records are never overwritten. Every file is
    /// staged in a temp file first, and if a later rename fails the ones
    /// already in place are rolled back.
    pub fn commit(&self, batch: &WriteBatch) -> Result<Vec<PathBuf>> {
        for record in &batch.records {
            let path = self.record_path(record.persona, record.date);
            if path.exists() {
                return Err(RunError::RecordExists { path });
            }
        }

        let mut rendered = Vec::with_capacity(batch.records.len() + 2);
        for record in &batch.records {
            rendered.push((self.record_path(record.persona, record.date), record.to_file_contents()?, true));
        }
        if let Some(book) = &batch.opportunities {
            rendered.push((self.opportunities_path(), serde_json::to_string_pretty(book)?, false));
        }
        if let Some(state) = &batch.state {
            rendered.push((self.state_path(), serde_json::to_string_pretty(state)?, false));
        }

        self.ensure_layout()?;
        let staged = rendered
            .into_iter()
            .map(|(path, contents, no_clobber)| StagedWrite::new(path, &contents, no_clobber))
            .collect::<Result<Vec<_>>>()?;

        let mut done: Vec<Persisted> = Vec::with_capacity(staged.len());
        for write in staged {
            match write.persist() {
                Ok(persisted) => {
                    log::info!("Wrote {}", persisted.path.display());
                    done.push(persisted);
                }
                Err(e) => {
                    log::error!("Commit failed, rolling back {} file(s): {}", done.len(), e);
                    for persisted in done.iter().rev() {
                        persisted.roll_back();
                    }
                    return Err(e);
                }
            }
        }

        Ok(done.into_iter().map(|p| p.path).collect())
    }

    /// All dated records, oldest first
    pub fn list_records(&self, persona: Option<PersonaId>) -> Result<Vec<RecordInfo>> {
        let mut records = Vec::new();
        if !self.root.exists() {
            return Ok(records);
        }

        let walker = WalkDir::new(&self.root).min_depth(2).max_depth(2).into_iter();
        for entry in walker.filter_map(|e| e.ok()) {
            let path = entry.path();
            if !entry.file_type().is_file() {
                continue;
            }
            let Some(id) = path
                .parent()
                .and_then(|p| p.file_name())
                .and_then(|n| n.to_str())
                .and_then(|n| n.parse::<PersonaId>().ok())
            else {
                continue;
            };
            if persona.is_some_and(|p| p != id) {
                continue;
            }
            let ext_matches = path
                .extension()
                .and_then(|e| e.to_str())
                .is_some_and(|e| e == RecordFormat::for_persona(id).extension());
            let date = path
                .file_stem()
                .and_then(|s| s.to_str())
                .and_then(|s| NaiveDate::parse_from_str(s, "%Y-%m-%d").ok());

            if let (true, Some(date)) = (ext_matches, date) {
                records.push(RecordInfo {
                    persona: id,
                    date,
                    path: path.to_path_buf(),
                });
            }
        }

        records.sort_by(|a, b| a.date.cmp(&b.date).then(a.persona.cmp(&b.persona)));
        Ok(records)
    }
}

/// One file written to a temp file next to its target, not yet renamed
struct StagedWrite {
    path: PathBuf,
    tmp: NamedTempFile,
    no_clobber: bool,
    previous: Option<String>,
}

/// A file now in place, with what it replaced
struct Persisted {
    path: PathBuf,
    previous: Option<String>,
}

impl StagedWrite {
    fn new(path: PathBuf, contents: &str, no_clobber: bool) -> Result<Self> {
        let dir = path.parent().unwrap_or_else(|| Path::new("."));
        fs::create_dir_all(dir)?;

        let previous = if !no_clobber && path.is_file() {
            Some(fs::read_to_string(&path)?)
        } else {
            None
        };

        let mut tmp = NamedTempFile::new_in(dir)?;
        tmp.write_all(contents.as_bytes())?;
        tmp.as_file().sync_all()?;

        Ok(Self {
            path,
            tmp,
            no_clobber,
            previous,
        })
    }

    fn persist(self) -> Result<Persisted> {
        let StagedWrite {
            path,
            tmp,
            no_clobber,
            previous,
        } = self;

        if no_clobber {
            tmp.persist_noclobber(&path).map_err(|e| {
                if e.error.kind() == ErrorKind::AlreadyExists {
                    RunError::RecordExists { path: path.clone() }
                } else {
                    RunError::Io(e.error)
                }
            })?;
        } else {
            tmp.persist(&path).map_err(|e| RunError::Io(e.error))?;
        }
        Ok(Persisted { path, previous })
    }
}

impl Persisted {
    fn roll_back(&self) {
        let result = match &self.previous {
            Some(contents) => fs::write(&self.path, contents),
            None => fs::remove_file(&self.path),
        };
        if let Err(e) = result {
            log::warn!("Could not roll back {}: {}", self.path.display(), e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    #[test]
    fn test_record_paths() {
        let store = MemoryStore::new(PathBuf::from("/m"));
        assert_eq!(
            store.record_path(PersonaId::Unified, date("2026-01-05")),
            PathBuf::from("/m/unified/2026-01-05.json")
        );
        assert_eq!(
            store.record_path(PersonaId::Healing, date("2026-01-05")),
            PathBuf::from("/m/healing/2026-01-05.md")
        );
        assert_eq!(store.opportunities_path(), PathBuf::from("/m/profit/opportunities.json"));
    }

    #[test]
    fn test_missing_files_load_defaults() {
        let temp = TempDir::new().unwrap();
        let store = MemoryStore::new(temp.path().to_path_buf());
        assert_eq!(store.load_state().unwrap(), LongTermMemory::default());
        assert_eq!(store.load_opportunities().unwrap(), OpportunityBook::default());
    }

    #[test]
    fn test_corrupt_state_loads_defaults() {
        let temp = TempDir::new().unwrap();
        fs::write(temp.path().join("state.json"), "{not json").unwrap();
        let store = MemoryStore::new(temp.path().to_path_buf());
        assert_eq!(store.load_state().unwrap().day, 0);
    }

    #[test]
    fn test_commit_and_read_back() {
        let temp = TempDir::new().unwrap();
        let store = MemoryStore::new(temp.path().to_path_buf());
        let d = date("2026-01-05");

        let mut state = LongTermMemory::default();
        state.mark_run(5, d);
        let batch = WriteBatch {
            records: vec![
                DailyRecord::json(PersonaId::Unified, 5, d, json!({"post": {}, "memory": {}, "ops": {}})),
                DailyRecord::markdown(PersonaId::Healing, 5, d, "# Calm\n\nBreathe."),
            ],
            state: Some(state),
            opportunities: None,
        };
        let written = store.commit(&batch).unwrap();
        assert_eq!(written.len(), 3);

        let unified = store.read_record(PersonaId::Unified, d).unwrap().unwrap();
        assert_eq!(unified.day, 5);
        assert_eq!(unified.content, batch.records[0].content);

        let healing = store.read_record(PersonaId::Healing, d).unwrap().unwrap();
        assert_eq!(healing.day, 5);
        assert_eq!(healing.body_text(), "# Calm\n\nBreathe.");

        assert_eq!(store.load_state().unwrap().day, 5);
    }

    #[test]
    fn test_commit_refuses_to_overwrite() {
        let temp = TempDir::new().unwrap();
        let store = MemoryStore::new(temp.path().to_path_buf());
        let d = date("2026-01-05");

        let first = WriteBatch {
            records: vec![DailyRecord::markdown(PersonaId::Profit, 5, d, "first")],
            ..WriteBatch::default()
        };
        store.commit(&first).unwrap();
        let before = fs::read_to_string(store.record_path(PersonaId::Profit, d)).unwrap();

        let mut state = LongTermMemory::default();
        state.day = 99;
        let second = WriteBatch {
            records: vec![
                DailyRecord::markdown(PersonaId::DigitalTwin, 5, d, "twin"),
                DailyRecord::markdown(PersonaId::Profit, 5, d, "second"),
            ],
            state: Some(state),
            opportunities: None,
        };
        let err = store.commit(&second).unwrap_err();
        assert!(matches!(err, RunError::RecordExists { .. }));

        let after = fs::read_to_string(store.record_path(PersonaId::Profit, d)).unwrap();
        assert_eq!(before, after);
        assert!(!store.has_record(PersonaId::DigitalTwin, d));
        assert!(!store.state_path().exists());
    }

    #[test]
    fn test_failed_commit_leaves_nothing_behind() {
        let temp = TempDir::new().unwrap();
        let store = MemoryStore::new(temp.path().to_path_buf());
        let d = date("2026-01-05");

        // A directory where the opportunity book should go makes that write fail
        fs::create_dir_all(store.opportunities_path()).unwrap();

        let mut state = LongTermMemory::default();
        state.mark_run(5, d);
        let batch = WriteBatch {
            records: vec![
                DailyRecord::markdown(PersonaId::Profit, 5, d, "profit"),
                DailyRecord::markdown(PersonaId::DigitalTwin, 5, d, "twin"),
                DailyRecord::markdown(PersonaId::Healing, 5, d, "healing"),
            ],
            state: Some(state),
            opportunities: Some(OpportunityBook::default()),
        };
        assert!(store.commit(&batch).is_err());

        assert!(!store.has_record(PersonaId::Profit, d));
        assert!(!store.has_record(PersonaId::DigitalTwin, d));
        assert!(!store.has_record(PersonaId::Healing, d));
        assert!(!store.state_path().exists());

        // Once the obstacle is gone the same date commits cleanly
        fs::remove_dir(store.opportunities_path()).unwrap();
        let written = store.commit(&batch).unwrap();
        assert_eq!(written.len(), 5);
        assert_eq!(store.load_state().unwrap().day, 5);
    }

    #[test]
    fn test_rollback_restores_overwritten_files() {
        let temp = TempDir::new().unwrap();
        let store = MemoryStore::new(temp.path().to_path_buf());
        let d = date("2026-01-06");

        let mut book = OpportunityBook::default();
        book.last_review_date = Some("2026-01-01".to_string());
        store
            .commit(&WriteBatch {
                opportunities: Some(book),
                ..WriteBatch::default()
            })
            .unwrap();
        let before = fs::read_to_string(store.opportunities_path()).unwrap();

        // state.json as a directory fails the last rename
        fs::create_dir_all(store.state_path()).unwrap();
        let batch = WriteBatch {
            records: vec![DailyRecord::markdown(PersonaId::Healing, 6, d, "healing")],
            state: Some(LongTermMemory::default()),
            opportunities: Some(OpportunityBook::default()),
        };
        assert!(store.commit(&batch).is_err());

        assert!(!store.has_record(PersonaId::Healing, d));
        assert_eq!(fs::read_to_string(store.opportunities_path()).unwrap(), before);
    }

    #[test]
    fn test_plain_markdown_record_is_readable() {
        let temp = TempDir::new().unwrap();
        let store = MemoryStore::new(temp.path().to_path_buf());
        let d = date("2026-01-04");
        fs::create_dir_all(temp.path().join("healing")).unwrap();
        fs::write(store.record_path(PersonaId::Healing, d), "just notes\n").unwrap();

        let record = store.read_record(PersonaId::Healing, d).unwrap().unwrap();
        assert_eq!(record.body_text(), "just notes");
        assert_eq!(record.day, 0);
    }

    #[test]
    fn test_list_records_sorted_and_filtered() {
        let temp = TempDir::new().unwrap();
        let store = MemoryStore::new(temp.path().to_path_buf());
        for (persona, d) in [
            (PersonaId::Healing, "2026-01-06"),
            (PersonaId::Unified, "2026-01-05"),
            (PersonaId::Healing, "2026-01-05"),
        ] {
            let batch = WriteBatch {
                records: vec![match RecordFormat::for_persona(persona) {
                    RecordFormat::Json => DailyRecord::json(persona, 1, date(d), json!({})),
                    RecordFormat::Markdown => DailyRecord::markdown(persona, 1, date(d), "x"),
                }],
                ..WriteBatch::default()
            };
            store.commit(&batch).unwrap();
        }
        fs::write(temp.path().join("healing").join("notes.txt"), "ignored").unwrap();

        let all = store.list_records(None).unwrap();
        assert_eq!(all.len(), 3);
        assert_eq!(all[0].date, date("2026-01-05"));
        assert_eq!(all[2].date, date("2026-01-06"));

        let healing = store.list_records(Some(PersonaId::Healing)).unwrap();
        assert_eq!(healing.len(), 2);
        assert!(healing.iter().all(|r| r.persona == PersonaId::Healing));
    }
}
