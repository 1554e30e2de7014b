//! Moltbook publisher

use serde::Serialize;
use serde_json::Value;
use std::time::Duration;

use crate::error::{Result, RunError, truncate_chars};

const ERROR_BODY_LIMIT: usize = 500;

/// Body of `POST /api/v1/posts`
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PostRequest {
    pub submolt: String,
    pub title: String,
    pub content: String,
}

pub trait Publisher {
    fn publish(&self, post: &PostRequest) -> Result<Value>;
}

pub struct MoltbookClient {
    agent: ureq::Agent,
    base_url: String,
    api_key: String,
}

impl MoltbookClient {
    pub fn new(base_url: &str, api_key: &str, timeout: Duration) -> Self {
        let agent: ureq::Agent = ureq::Agent::config_builder()
            .timeout_global(Some(timeout))
            .http_status_as_error(false)
            .build()
            .into();

        Self {
            agent,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
        }
    }

    pub fn endpoint(&self) -> String {
        format!("{}/api/v1/posts", self.base_url)
    }
}

impl Publisher for MoltbookClient {
    fn publish(&self, post: &PostRequest) -> Result<Value> {
        let url = self.endpoint();
        let request_body = serde_json::to_string(post)?;
        log::info!("Posting '{}' to submolt {}", post.title, post.submolt);

        let mut response = self
            .agent
            .post(&url)
            .header("Authorization", &format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .send(request_body.as_bytes())
            .map_err(|e| RunError::Publish(format!("request failed: {}", e)))?;

        let status = response.status().as_u16();
        let response_body = response
            .body_mut()
            .read_to_string()
            .map_err(|e| RunError::Publish(format!("failed to read response: {}", e)))?;

        if status >= 400 {
            return Err(RunError::Publish(format!(
                "HTTP {}: {}",
                status,
                truncate_chars(&response_body, ERROR_BODY_LIMIT)
            )));
        }

        // Some deployments answer 201 with an empty body
        if response_body.trim().is_empty() {
            return Ok(Value::Null);
        }
        serde_json::from_str(&response_body)
            .map_err(|e| RunError::Publish(format!("response is not JSON: {}", e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::serve_once;

    fn sample_post() -> PostRequest {
        PostRequest {
            submolt: "general".to_string(),
            title: "Day five".to_string(),
            content: "Breathe.".to_string(),
        }
    }

    #[test]
    fn test_post_request_shape() {
        let post = PostRequest {
            submolt: "general".to_string(),
            title: "HealingAgent · Daily Thought (2026-01-05)".to_string(),
            content: "Breathe.".to_string(),
        };
        let value = serde_json::to_value(&post).unwrap();
        assert_eq!(value.as_object().unwrap().len(), 3);
        assert_eq!(value["submolt"], "general");
        assert_eq!(value["content"], "Breathe.");
    }

    #[test]
    fn test_endpoint() {
        let client = MoltbookClient::new("https://www.moltbook.com/", "k", Duration::from_secs(1));
        assert_eq!(client.endpoint(), "https://www.moltbook.com/api/v1/posts");
    }

    #[test]
    fn test_unreachable_host_is_publish_error() {
        let client = MoltbookClient::new("http://127.0.0.1:1", "k", Duration::from_secs(2));
        let post = PostRequest {
            submolt: "general".to_string(),
            title: "t".to_string(),
            content: "c".to_string(),
        };
        assert!(matches!(client.publish(&post), Err(RunError::Publish(_))));
    }

    #[test]
    fn test_publish_sends_post() {
        let (base, request) = serve_once(201, r#"{"success":true,"post":{"id":"p1"}}"#);
        let client = MoltbookClient::new(&base, "mb-key", Duration::from_secs(5));
        let response = client.publish(&sample_post()).unwrap();
        assert_eq!(response["post"]["id"], "p1");

        let request = request.join().unwrap();
        assert!(request.starts_with("POST /api/v1/posts"));
        assert!(request.contains("Bearer mb-key"));
        assert!(request.contains(r#""title":"Day five""#));
    }

    #[test]
    fn test_publish_empty_body_is_null() {
        let (base, request) = serve_once(201, "");
        let client = MoltbookClient::new(&base, "k", Duration::from_secs(5));
        assert_eq!(client.publish(&sample_post()).unwrap(), Value::Null);
        request.join().unwrap();
    }

    #[test]
    fn test_publish_error_status() {
        let body = format!("{{\"error\":\"{}\"}}", "y".repeat(700));
        let (base, request) = serve_once(401, &body);
        let client = MoltbookClient::new(&base, "bad", Duration::from_secs(5));
        let err = client.publish(&sample_post()).unwrap_err();
        request.join().unwrap();

        let RunError::Publish(message) = err else {
            panic!("expected publish error");
        };
        assert!(message.starts_with("HTTP 401: "));
        assert_eq!(message.trim_start_matches("HTTP 401: ").chars().count(), ERROR_BODY_LIMIT);
    }
}
