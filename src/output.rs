//! Parsing and validating persona replies
//!
//! Models are asked for bare JSON but sometimes wrap it in prose or code
//! fences. [`extract_json`] tries the whole reply first, then the outermost
//! `{...}` span. Typed structs then enforce the required shape.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{Result, RunError};
use crate::memory::opportunities::Opportunity;
use crate::persona::{OutputShape, PersonaId};

/// `post` section of the unified reply
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PostSection {
    pub submolt: String,
    pub title: String,
    pub body: String,
    pub tags: Vec<String>,
}

/// `memory` section of the unified reply
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemorySection {
    pub worldview: String,
    pub insights: Vec<String>,
    pub actions: Vec<String>,
}

/// `ops` section of the unified reply
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OpsSection {
    pub ratio: String,
    pub rationale: String,
    pub metrics: Vec<String>,
    pub rollback_rule: String,
}

/// The whole unified reply. Extra top-level keys are rejected.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UnifiedOutput {
    pub post: PostSection,
    pub memory: MemorySection,
    pub ops: OpsSection,
}

/// Profit's proposed changes to the opportunity book
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProfitStateUpdate {
    #[serde(default)]
    pub last_review_date: Option<String>,
    #[serde(default)]
    pub opportunities: Option<Vec<Opportunity>>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ProfitOutput {
    pub updated_state: ProfitStateUpdate,
    pub today_profit_md: String,
}

/// The public post generated at the end of a composite run
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct PublicPost {
    #[serde(default)]
    pub title: String,
    pub content: String,
}

/// Parse a reply as JSON, falling back to its outermost `{...}` span
pub fn extract_json(raw: &str) -> Result<Value> {
    let raw = raw.trim();
    if let Ok(value) = serde_json::from_str::<Value>(raw) {
        return Ok(value);
    }

    match (raw.find('{'), raw.rfind('}')) {
        (Some(start), Some(end)) if end > start => serde_json::from_str(&raw[start..=end])
            .map_err(|e| RunError::MalformedResponse(format!("embedded JSON does not parse: {}", e))),
        _ => Err(RunError::MalformedResponse(format!(
            "no JSON object in reply: {}",
            crate::error::truncate_chars(raw, 120)
        ))),
    }
}

/// Check a JSON value against a persona's declared shape
pub fn check_shape(persona: PersonaId, shape: OutputShape, value: &Value) -> Result<()> {
    let OutputShape::Json { required, exact } = shape else {
        return Ok(());
    };

    let object = value
        .as_object()
        .ok_or_else(|| RunError::schema(persona.as_str(), "reply is not a JSON object"))?;

    for key in required {
        if !object.contains_key(*key) {
            return Err(RunError::schema(persona.as_str(), format!("missing key '{}'", key)));
        }
    }

    if exact && let Some(extra) = object.keys().find(|k| !required.contains(&k.as_str())) {
        return Err(RunError::schema(persona.as_str(), format!("unexpected key '{}'", extra)));
    }

    Ok(())
}

/// Extract, shape-check and deserialize a JSON reply. Returns the typed
/// value together with the exact JSON that was accepted.
pub fn parse_structured<T: DeserializeOwned>(persona: PersonaId, raw: &str) -> Result<(T, Value)> {
    let value = extract_json(raw)?;
    check_shape(persona, persona.output_shape(), &value)?;
    let typed = serde_json::from_value(value.clone()).map_err(|e| RunError::schema(persona.as_str(), e.to_string()))?;
    Ok((typed, value))
}

/// Validate a markdown reply
pub fn parse_markdown(persona: PersonaId, raw: &str) -> Result<String> {
    let text = raw.trim();
    if text.is_empty() {
        return Err(RunError::schema(persona.as_str(), "empty reply"));
    }
    Ok(text.to_string())
}

pub fn parse_unified(raw: &str) -> Result<(UnifiedOutput, Value)> {
    parse_structured(PersonaId::Unified, raw)
}

pub fn parse_profit(raw: &str) -> Result<ProfitOutput> {
    let (output, _): (ProfitOutput, Value) = parse_structured(PersonaId::Profit, raw)?;
    if output.today_profit_md.trim().is_empty() {
        return Err(RunError::schema("profit", "today_profit_md is empty"));
    }
    Ok(output)
}

/// Parse the public post. A missing title gets the dated default.
pub fn parse_public_post(raw: &str, default_title: &str) -> Result<PublicPost> {
    let value = extract_json(raw)?;
    let mut post: PublicPost =
        serde_json::from_value(value).map_err(|e| RunError::schema("public post", e.to_string()))?;

    post.title = post.title.trim().to_string();
    post.content = post.content.trim().to_string();
    if post.title.is_empty() {
        post.title = default_title.to_string();
    }
    if post.content.is_empty() {
        return Err(RunError::schema("public post", "content is empty"));
    }
    Ok(post)
}

#[cfg(test)]
mod tests {
    use super::*;

    const UNIFIED: &str = r#"{
        "post": {"submolt": "general", "title": "Day 5", "body": "Breathe.", "tags": ["calm"]},
        "memory": {"worldview": "slow is smooth", "insights": ["rest compounds"], "actions": ["walk"]},
        "ops": {"ratio": "70/30", "rationale": "focus", "metrics": ["posts"], "rollback_rule": "revert if engagement drops 2 days"}
    }"#;

    #[test]
    fn test_extract_json_direct() {
        let value = extract_json(r#"{"a": 1}"#).unwrap();
        assert_eq!(value["a"], 1);
    }

    #[test]
    fn test_extract_json_from_fenced_reply() {
        let raw = "Sure, here you go:\n```json\n{\"title\": \"t\", \"content\": \"c\"}\n```\nEnjoy!";
        let value = extract_json(raw).unwrap();
        assert_eq!(value["title"], "t");
    }

    #[test]
    fn test_extract_json_no_object() {
        let err = extract_json("I cannot comply").unwrap_err();
        assert!(matches!(err, RunError::MalformedResponse(_)));
    }

    #[test]
    fn test_extract_json_broken_object() {
        let err = extract_json("{ \"a\": }").unwrap_err();
        assert!(matches!(err, RunError::MalformedResponse(_)));
    }

    #[test]
    fn test_parse_unified_ok() {
        let (output, value) = parse_unified(UNIFIED).unwrap();
        assert_eq!(output.post.title, "Day 5");
        assert_eq!(output.ops.metrics, vec!["posts"]);
        let keys: Vec<&String> = value.as_object().unwrap().keys().collect();
        assert_eq!(keys, vec!["post", "memory", "ops"]);
    }

    #[test]
    fn test_parse_unified_missing_top_level_key() {
        let raw = r#"{"post": {"submolt": "g", "title": "t", "body": "b", "tags": []},
                      "memory": {"worldview": "w", "insights": [], "actions": []}}"#;
        let err = parse_unified(raw).unwrap_err();
        match err {
            RunError::SchemaMismatch { detail, .. } => assert!(detail.contains("ops")),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_parse_unified_extra_top_level_key() {
        let mut value: Value = serde_json::from_str(UNIFIED).unwrap();
        value["commentary"] = Value::String("extra".to_string());
        let err = parse_unified(&value.to_string()).unwrap_err();
        assert!(matches!(err, RunError::SchemaMismatch { .. }));
    }

    #[test]
    fn test_parse_unified_missing_nested_field() {
        let mut value: Value = serde_json::from_str(UNIFIED).unwrap();
        value["ops"].as_object_mut().unwrap().remove("rollback_rule");
        let err = parse_unified(&value.to_string()).unwrap_err();
        assert!(matches!(err, RunError::SchemaMismatch { .. }));
    }

    #[test]
    fn test_parse_unified_wrong_type() {
        let mut value: Value = serde_json::from_str(UNIFIED).unwrap();
        value["post"]["tags"] = Value::String("calm".to_string());
        let err = parse_unified(&value.to_string()).unwrap_err();
        assert!(matches!(err, RunError::SchemaMismatch { .. }));
    }

    #[test]
    fn test_parse_profit_requires_markdown() {
        let raw = r#"{"updated_state": {"opportunities": []}, "today_profit_md": "   "}"#;
        assert!(parse_profit(raw).is_err());

        let raw = r##"{"updated_state": {}, "today_profit_md": "# Profit"}"##;
        let output = parse_profit(raw).unwrap();
        assert!(output.updated_state.opportunities.is_none());
    }

    #[test]
    fn test_parse_profit_missing_updated_state() {
        let err = parse_profit(r##"{"today_profit_md": "# Profit"}"##).unwrap_err();
        assert!(matches!(err, RunError::SchemaMismatch { .. }));
    }

    #[test]
    fn test_parse_public_post_default_title() {
        let post = parse_public_post(r#"{"content": "Breathe six times."}"#, "Default (2026-01-05)").unwrap();
        assert_eq!(post.title, "Default (2026-01-05)");
        assert_eq!(post.content, "Breathe six times.");
    }

    #[test]
    fn test_parse_public_post_empty_content() {
        let err = parse_public_post(r#"{"title": "t", "content": "  "}"#, "d").unwrap_err();
        assert!(matches!(err, RunError::SchemaMismatch { .. }));
    }

    #[test]
    fn test_parse_markdown() {
        assert_eq!(parse_markdown(PersonaId::Healing, "  # Hi \n").unwrap(), "# Hi");
        assert!(parse_markdown(PersonaId::Healing, "\n\n").is_err());
    }
}
