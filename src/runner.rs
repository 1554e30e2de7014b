//! The daily run
//!
//! A run only talks to the model and stages writes. Nothing touches disk
//! until the caller commits the returned [`WriteBatch`], so any failure
//! along the way leaves the memory exactly as it was.

use chrono::{Days, NaiveDate};
use indexmap::IndexMap;

use crate::config::RunMode;
use crate::error::{Result, RunError, truncate_chars};
use crate::llm::{ChatMessage, ChatModel, CompletionOptions};
use crate::memory::opportunities::UpdateSummary;
use crate::memory::{DailyRecord, MemoryStore, WriteBatch};
use crate::output;
use crate::persona::{Persona, PersonaId, TemplateVars, prompts, render};
use crate::publish::PostRequest;

/// Characters of earlier output fed into a prompt
const CONTEXT_LIMIT: usize = 2500;

const UNIFIED_OPTIONS: CompletionOptions = CompletionOptions::new(0.6, 1200);
const PROFIT_OPTIONS: CompletionOptions = CompletionOptions::new(0.4, 1600);
const HEALING_OPTIONS: CompletionOptions = CompletionOptions::new(0.7, 900);
const DIGITALTWIN_OPTIONS: CompletionOptions = CompletionOptions::new(0.55, 900);
const POST_OPTIONS: CompletionOptions = CompletionOptions::new(0.6, 700);

#[derive(Debug, Clone)]
pub struct RunRequest {
    pub day: u32,
    pub date: NaiveDate,
    pub mode: RunMode,
    /// Submolt used when the reply doesn't name one
    pub submolt: String,
}

/// Everything a successful run produced, not yet persisted
#[derive(Debug, Clone)]
pub struct RunOutcome {
    pub batch: WriteBatch,
    pub post: PostRequest,
    pub opportunities: Option<UpdateSummary>,
}

pub struct DailyRunner<'a, M: ChatModel> {
    model: &'a M,
    personas: &'a IndexMap<PersonaId, Persona>,
    store: &'a MemoryStore,
}

impl<'a, M: ChatModel> DailyRunner<'a, M> {
    pub fn new(model: &'a M, personas: &'a IndexMap<PersonaId, Persona>, store: &'a MemoryStore) -> Self {
        Self {
            model,
            personas,
            store,
        }
    }

    pub fn run(&self, request: &RunRequest) -> Result<RunOutcome> {
        if request.day == 0 {
            return Err(RunError::InvalidInput("day index must be a positive integer".to_string()));
        }

        let writes: &[PersonaId] = match request.mode {
            RunMode::Unified => &[PersonaId::Unified],
            RunMode::Composite => &[PersonaId::Profit, PersonaId::DigitalTwin, PersonaId::Healing],
        };
        for id in writes {
            if self.store.has_record(*id, request.date) {
                return Err(RunError::RecordExists {
                    path: self.store.record_path(*id, request.date),
                });
            }
        }

        log::info!("Starting {:?} run for day {} ({})", request.mode, request.day, request.date);
        match request.mode {
            RunMode::Unified => self.run_unified(request),
            RunMode::Composite => self.run_composite(request),
        }
    }

    /// Send one persona prompt and return the raw reply. The persona's
    /// system prompt gets the day counter substituted.
    pub fn ask(&self, persona: &Persona, vars: &TemplateVars, task: &str, options: CompletionOptions) -> Result<String> {
        let system = persona.system_for(vars);
        if system.trim().is_empty() {
            return Err(RunError::InvalidInput(format!("prompt for {} is empty", persona.id)));
        }
        let messages = [ChatMessage::system(system), ChatMessage::user(render(task, vars).trim())];
        log::debug!("Asking {} ({} chars of task)", persona.id, messages[1].content.len());
        self.model.complete(&messages, options)
    }

    fn persona(&self, id: PersonaId) -> Result<&Persona> {
        self.personas
            .get(&id)
            .ok_or_else(|| RunError::InvalidInput(format!("persona {} is not loaded", id)))
    }

    /// Yesterday's record for a persona, truncated for prompting. An
    /// unreadable record only costs the context, never the run.
    fn yesterday(&self, id: PersonaId, date: NaiveDate) -> String {
        let Some(prev) = date.checked_sub_days(Days::new(1)) else {
            return String::new();
        };
        match self.store.read_record(id, prev) {
            Ok(Some(record)) => truncate_chars(&record.body_text(), CONTEXT_LIMIT).to_string(),
            Ok(None) => String::new(),
            Err(e) => {
                log::warn!(
                    "Ignoring unreadable {}: {}",
                    self.store.record_path(id, prev).display(),
                    e
                );
                String::new()
            }
        }
    }

    fn base_vars(request: &RunRequest) -> TemplateVars {
        TemplateVars::new()
            .set("day", request.day)
            .set("date", request.date.format("%Y-%m-%d"))
            .set("submolt", &request.submolt)
    }

    fn run_unified(&self, request: &RunRequest) -> Result<RunOutcome> {
        let persona = self.persona(PersonaId::Unified)?;
        let mut state = self.store.load_state()?;

        let vars = Self::base_vars(request)
            .set("memory", state.summary())
            .set("yesterday", self.yesterday(PersonaId::Unified, request.date));

        let raw = self.ask(persona, &vars, prompts::UNIFIED_TASK, UNIFIED_OPTIONS)?;
        let (reply, value) = output::parse_unified(&raw)?;

        state.merge(&reply.memory);
        state.mark_run(request.day, request.date);

        let submolt = match reply.post.submolt.trim() {
            "" => request.submolt.clone(),
            s => s.to_string(),
        };
        let mut content = reply.post.body.trim().to_string();
        let tags: Vec<String> = reply
            .post
            .tags
            .iter()
            .map(|t| t.trim().trim_start_matches('#'))
            .filter(|t| !t.is_empty())
            .map(|t| format!("#{}", t))
            .collect();
        if !tags.is_empty() {
            content.push_str("\n\n");
            content.push_str(&tags.join(" "));
        }

        Ok(RunOutcome {
            batch: WriteBatch {
                records: vec![DailyRecord::json(PersonaId::Unified, request.day, request.date, value)],
                state: Some(state),
                opportunities: None,
            },
            post: PostRequest {
                submolt,
                title: reply.post.title.trim().to_string(),
                content,
            },
            opportunities: None,
        })
    }

    fn run_composite(&self, request: &RunRequest) -> Result<RunOutcome> {
        let date = request.date;
        let mut state = self.store.load_state()?;
        let mut book = self.store.load_opportunities()?;
        book.clamp_active(date);

        let review_day = book.is_review_day(date);
        let allow_new = book.allows_new(date);
        let review_date = if review_day {
            date.format("%Y-%m-%d").to_string()
        } else {
            book.last_review_date.clone().unwrap_or_default()
        };

        // Profit
        let vars = Self::base_vars(request)
            .set("yesterday", self.yesterday(PersonaId::Profit, date))
            .set("opportunities", serde_json::to_string_pretty(&book.compact())?)
            .set("allow_new", allow_new)
            .set("review_day", review_day)
            .set("review_date", review_date);
        let raw = self.ask(self.persona(PersonaId::Profit)?, &vars, prompts::PROFIT_TASK, PROFIT_OPTIONS)?;
        let profit = output::parse_profit(&raw)?;
        let mut update = profit.updated_state;
        if !review_day {
            update.last_review_date = None;
        }
        let summary = book.apply_update(update, date, allow_new);
        let profit_md = profit.today_profit_md.trim().to_string();

        // Healing
        let vars = Self::base_vars(request)
            .set("yesterday", self.yesterday(PersonaId::Healing, date))
            .set("profit", truncate_chars(&profit_md, CONTEXT_LIMIT));
        let raw = self.ask(self.persona(PersonaId::Healing)?, &vars, prompts::HEALING_TASK, HEALING_OPTIONS)?;
        let healing = output::parse_markdown(PersonaId::Healing, &raw)?;

        // DigitalTwin
        let vars = Self::base_vars(request)
            .set("yesterday", self.yesterday(PersonaId::DigitalTwin, date))
            .set("healing", truncate_chars(&healing, CONTEXT_LIMIT))
            .set("profit", truncate_chars(&profit_md, CONTEXT_LIMIT));
        let raw = self.ask(
            self.persona(PersonaId::DigitalTwin)?,
            &vars,
            prompts::DIGITALTWIN_TASK,
            DIGITALTWIN_OPTIONS,
        )?;
        let twin = output::parse_markdown(PersonaId::DigitalTwin, &raw)?;

        // Public post, always in HealingAgent's voice
        let vars = Self::base_vars(request)
            .set("digitaltwin", truncate_chars(&twin, 2200))
            .set("healing", truncate_chars(&healing, 1400));
        let messages = [
            ChatMessage::system(prompts::PUBLIC_POST_SYSTEM),
            ChatMessage::user(render(prompts::PUBLIC_POST_TASK, &vars)),
        ];
        let raw = self.model.complete(&messages, POST_OPTIONS)?;
        let post = output::parse_public_post(&raw, &default_post_title(date))?;

        state.mark_run(request.day, date);

        Ok(RunOutcome {
            batch: WriteBatch {
                records: vec![
                    DailyRecord::markdown(PersonaId::Profit, request.day, date, profit_md.clone()),
                    DailyRecord::markdown(PersonaId::DigitalTwin, request.day, date, twin.clone()),
                    DailyRecord::markdown(
                        PersonaId::Healing,
                        request.day,
                        date,
                        master_log(date, &healing, &profit_md, &twin),
                    ),
                ],
                state: Some(state),
                opportunities: Some(book),
            },
            post: PostRequest {
                submolt: request.submolt.clone(),
                title: post.title,
                content: post.content,
            },
            opportunities: Some(summary),
        })
    }
}

pub fn default_post_title(date: NaiveDate) -> String {
    format!("HealingAgent · Daily Thought ({})", date.format("%Y-%m-%d"))
}

/// HealingAgent's combined log: all three sections of the day
pub fn master_log(date: NaiveDate, healing: &str, profit: &str, twin: &str) -> String {
    format!(
        "# HealingAgent Combined Growth Log ({})\n\n## 1) Healing\n{}\n\n## 2) Profit (opportunity loop)\n{}\n\n## 3) DigitalTwin (Empire Daily)\n{}\n",
        date.format("%Y-%m-%d"),
        healing.trim(),
        profit.trim(),
        twin.trim()
    )
}
