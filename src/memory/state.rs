//! Long-term memory carried across runs (`state.json`)

use chrono::NaiveDate;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::output::MemorySection;

/// Oldest insights are dropped past this many
pub const MAX_INSIGHTS: usize = 60;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LongTermMemory {
    pub version: u32,
    /// Last completed day index; 0 before the first run
    pub day: u32,
    pub last_run: Option<NaiveDate>,
    pub north_star: String,
    pub worldview: String,
    pub principles: Vec<String>,
    pub active_items: Vec<String>,
    pub insights: Vec<String>,
    /// Fields written by hand or by older versions, kept verbatim
    #[serde(flatten)]
    pub extra: IndexMap<String, Value>,
}

impl Default for LongTermMemory {
    fn default() -> Self {
        Self {
            version: 1,
            day: 0,
            last_run: None,
            north_star: String::new(),
            worldview: String::new(),
            principles: Vec::new(),
            active_items: Vec::new(),
            insights: Vec::new(),
            extra: IndexMap::new(),
        }
    }
}

impl LongTermMemory {
    pub fn next_day(&self) -> u32 {
        self.day.saturating_add(1)
    }

    /// Record that `day` completed on `date`
    pub fn mark_run(&mut self, day: u32, date: NaiveDate) {
        self.day = self.day.max(day);
        self.last_run = Some(date);
    }

    /// Merge the unified reply's memory section
    pub fn merge(&mut self, section: &MemorySection) {
        let worldview = section.worldview.trim();
        if !worldview.is_empty() {
            self.worldview = worldview.to_string();
        }

        for insight in &section.insights {
            let insight = insight.trim();
            if !insight.is_empty() && !self.insights.iter().any(|i| i == insight) {
                self.insights.push(insight.to_string());
            }
        }
        if self.insights.len() > MAX_INSIGHTS {
            let excess = self.insights.len() - MAX_INSIGHTS;
            self.insights.drain(..excess);
        }

        let actions: Vec<String> = section
            .actions
            .iter()
            .map(|a| a.trim().to_string())
            .filter(|a| !a.is_empty())
            .collect();
        if !actions.is_empty() {
            self.active_items = actions;
        }
    }

    /// Compact text view for prompts
    pub fn summary(&self) -> String {
        let mut out = String::new();
        if !self.north_star.is_empty() {
            out.push_str(&format!("North star: {}\n", self.north_star));
        }
        if !self.worldview.is_empty() {
            out.push_str(&format!("Worldview: {}\n", self.worldview));
        }
        if !self.principles.is_empty() {
            out.push_str(&format!("Principles: {}\n", self.principles.join("; ")));
        }
        if !self.active_items.is_empty() {
            out.push_str(&format!("Active items: {}\n", self.active_items.join("; ")));
        }
        let recent: Vec<&str> = self.insights.iter().rev().take(5).map(String::as_str).collect();
        if !recent.is_empty() {
            out.push_str(&format!("Recent insights: {}\n", recent.join("; ")));
        }
        if out.is_empty() {
            out.push_str("(empty)");
        }
        out.trim_end().to_string()
    }
}
