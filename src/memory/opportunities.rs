//! Profit's opportunity book (`profit/opportunities.json`)
//!
//! Invariants kept after every update: at most [`MAX_ACTIVE`] active entries,
//! no entry ever removed, new ids only on review days or when nothing is
//! active.

use chrono::NaiveDate;
use indexmap::IndexMap;
use serde::de::{self, Deserializer};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use std::collections::HashSet;

use crate::output::ProfitStateUpdate;

pub const MAX_ACTIVE: usize = 2;
pub const DEFAULT_REVIEW_INTERVAL_DAYS: i64 = 7;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OpportunityStatus {
    Backlog,
    Active,
    Blocked,
    Done,
    Killed,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Opportunity {
    #[serde(deserialize_with = "id_string")]
    pub id: String,
    #[serde(default, deserialize_with = "null_default")]
    pub title: String,
    pub status: OpportunityStatus,
    #[serde(default, deserialize_with = "null_default")]
    pub next_actions: Vec<String>,
    #[serde(default, deserialize_with = "null_default")]
    pub risk: String,
    #[serde(default, deserialize_with = "null_default")]
    pub progress_today: String,
    #[serde(default, deserialize_with = "null_default")]
    pub review_today: String,
    #[serde(default, deserialize_with = "null_default")]
    pub notes: String,
    #[serde(default)]
    pub last_update: Option<String>,
    #[serde(default, deserialize_with = "null_default")]
    pub history: Vec<Value>,
    #[serde(flatten)]
    pub extra: IndexMap<String, Value>,
}

impl Opportunity {
    pub fn new(id: &str, title: &str, status: OpportunityStatus) -> Self {
        Self {
            id: id.to_string(),
            title: title.to_string(),
            status,
            next_actions: Vec::new(),
            risk: String::new(),
            progress_today: String::new(),
            review_today: String::new(),
            notes: String::new(),
            last_update: None,
            history: Vec::new(),
            extra: IndexMap::new(),
        }
    }

    pub fn is_active(&self) -> bool {
        self.status == OpportunityStatus::Active
    }
}

fn null_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

fn id_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    match Value::deserialize(deserializer)? {
        Value::String(s) => Ok(s),
        Value::Number(n) => Ok(n.to_string()),
        other => Err(de::Error::custom(format!("invalid opportunity id: {}", other))),
    }
}

/// What [`OpportunityBook::apply_update`] changed
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UpdateSummary {
    pub added: Vec<String>,
    pub rejected_new: Vec<String>,
    pub carried_over: Vec<String>,
    pub downgraded: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OpportunityBook {
    pub version: u32,
    pub review_interval_days: i64,
    pub last_review_date: Option<String>,
    pub opportunities: Vec<Opportunity>,
}

impl Default for OpportunityBook {
    fn default() -> Self {
        Self {
            version: 1,
            review_interval_days: DEFAULT_REVIEW_INTERVAL_DAYS,
            last_review_date: None,
            opportunities: Vec::new(),
        }
    }
}

impl OpportunityBook {
    /// A review is due when none happened yet, the stored date is unreadable,
    /// or the interval has elapsed.
    pub fn is_review_day(&self, today: NaiveDate) -> bool {
        let Some(last) = self.last_review_date.as_deref() else {
            return true;
        };
        match NaiveDate::parse_from_str(last, "%Y-%m-%d") {
            Ok(last) => (today - last).num_days() >= self.review_interval_days,
            Err(_) => true,
        }
    }

    pub fn active_count(&self) -> usize {
        self.opportunities.iter().filter(|o| o.is_active()).count()
    }

    pub fn allows_new(&self, today: NaiveDate) -> bool {
        self.is_review_day(today) || self.active_count() == 0
    }

    /// Downgrade every active entry past the first [`MAX_ACTIVE`] to backlog
    pub fn clamp_active(&mut self, today: NaiveDate) -> Vec<String> {
        let mut seen = 0;
        let mut downgraded = Vec::new();
        for opp in self.opportunities.iter_mut().filter(|o| o.is_active()) {
            seen += 1;
            if seen <= MAX_ACTIVE {
                continue;
            }
            opp.status = OpportunityStatus::Backlog;
            opp.history.push(json!({
                "date": today.format("%Y-%m-%d").to_string(),
                "event": "auto-downgrade-to-backlog",
                "note": format!("active > {} clamp", MAX_ACTIVE),
            }));
            downgraded.push(opp.id.clone());
        }
        if !downgraded.is_empty() {
            log::info!("Downgraded to backlog: {}", downgraded.join(", "));
        }
        downgraded
    }

    /// Merge Profit's proposed state. `allow_new` must be decided before the
    /// model was asked, from the book as it stood then.
    pub fn apply_update(&mut self, update: ProfitStateUpdate, today: NaiveDate, allow_new: bool) -> UpdateSummary {
        let mut summary = UpdateSummary::default();

        if let Some(proposed) = update.opportunities {
            let existing: HashSet<String> = self.opportunities.iter().map(|o| o.id.clone()).collect();
            let mut seen: HashSet<String> = HashSet::new();
            let mut merged = Vec::with_capacity(proposed.len().max(self.opportunities.len()));

            for opp in proposed {
                if opp.id.trim().is_empty() {
                    log::warn!("Ignoring opportunity without id: {}", opp.title);
                    continue;
                }
                if !seen.insert(opp.id.clone()) {
                    log::warn!("Ignoring duplicate opportunity id {}", opp.id);
                    continue;
                }
                if !existing.contains(&opp.id) {
                    if !allow_new {
                        log::warn!("New opportunity {} rejected: not a review day", opp.id);
                        summary.rejected_new.push(opp.id);
                        continue;
                    }
                    summary.added.push(opp.id.clone());
                }
                merged.push(opp);
            }

            for old in self.opportunities.drain(..) {
                if !seen.contains(&old.id) {
                    summary.carried_over.push(old.id.clone());
                    merged.push(old);
                }
            }

            self.opportunities = merged;
        }

        if let Some(date) = update.last_review_date.as_deref().map(str::trim)
            && NaiveDate::parse_from_str(date, "%Y-%m-%d").is_ok()
        {
            self.last_review_date = Some(date.to_string());
        }

        let today_str = today.format("%Y-%m-%d").to_string();
        for opp in &mut self.opportunities {
            if opp.last_update.as_deref().is_none_or(|d| d.trim().is_empty()) {
                opp.last_update = Some(today_str.clone());
            }
        }

        summary.downgraded = self.clamp_active(today);
        summary
    }

    /// The subset of fields shown to the model
    pub fn compact(&self) -> Value {
        Value::Array(
            self.opportunities
                .iter()
                .map(|o| {
                    json!({
                        "id": o.id,
                        "title": o.title,
                        "status": o.status,
                        "next_actions": o.next_actions,
                        "last_update": o.last_update,
                        "notes": o.notes,
                    })
                })
                .collect(),
        )
    }
}
