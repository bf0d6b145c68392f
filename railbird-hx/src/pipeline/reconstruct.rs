//! Reconstruction client for the external vision/LLM endpoint
//!
//! The endpoint is an untrusted, occasionally malformed data source: the
//! response should be a JSON array of hand objects but may arrive wrapped in
//! a fenced code block or with junk around it. Parsing is tolerant up to a
//! point and fails the call past it.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use super::prompt::{build_prompt, Platform};
use super::PipelineError;
use crate::models::CandidateHand;
use railbird_common::config::VisionConfig;

/// One encoded crop attached to a reconstruction request
#[derive(Debug, Clone, Serialize)]
pub struct EncodedCrop {
    pub region: String,
    pub timestamp_seconds: f64,
    /// Base64-encoded PNG
    pub data: String,
}

/// Seam for the vision call so the coordinator can be tested without a live
/// endpoint.
#[async_trait]
pub trait HandReconstructor: Send + Sync {
    async fn reconstruct(
        &self,
        images: &[EncodedCrop],
        platform: Platform,
        known_players: Option<&[String]>,
    ) -> Result<Vec<CandidateHand>, PipelineError>;
}

#[derive(Debug, Serialize)]
struct VisionRequest<'a> {
    model: &'a str,
    prompt: String,
    temperature: f64,
    images: &'a [EncodedCrop],
}

#[derive(Debug, Deserialize)]
struct VisionResponse {
    content: String,
}

/// HTTP client for the vision endpoint
pub struct VisionClient {
    http_client: reqwest::Client,
    endpoint_url: String,
    api_key: String,
    model: String,
}

impl VisionClient {
    pub fn new(config: &VisionConfig) -> Result<Self, PipelineError> {
        let http_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_seconds))
            .build()
            .map_err(|e| PipelineError::Network(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            http_client,
            endpoint_url: config.endpoint_url.clone(),
            api_key: config.api_key.clone(),
            model: config.model.clone(),
        })
    }
}

#[async_trait]
impl HandReconstructor for VisionClient {
    async fn reconstruct(
        &self,
        images: &[EncodedCrop],
        platform: Platform,
        known_players: Option<&[String]>,
    ) -> Result<Vec<CandidateHand>, PipelineError> {
        let request = VisionRequest {
            model: &self.model,
            prompt: build_prompt(platform, known_players),
            temperature: 0.1,
            images,
        };

        tracing::debug!(
            image_count = images.len(),
            platform = platform.as_str(),
            "Sending reconstruction request"
        );

        let mut builder = self.http_client.post(&self.endpoint_url).json(&request);
        if !self.api_key.is_empty() {
            builder = builder.bearer_auth(&self.api_key);
        }

        let response = builder.send().await.map_err(|e| {
            if e.is_timeout() {
                PipelineError::Timeout(format!("Vision call timed out: {}", e))
            } else {
                PipelineError::Network(format!("Vision call failed: {}", e))
            }
        })?;

        let status = response.status();
        if status.as_u16() == 429 || status.as_u16() == 503 || status.as_u16() == 529 {
            return Err(PipelineError::RateLimited(format!("HTTP {}", status)));
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(PipelineError::Network(format!("HTTP {}: {}", status, body)));
        }

        let vision_response: VisionResponse = response
            .json()
            .await
            .map_err(|e| PipelineError::ResponseParse(format!("Invalid response envelope: {}", e)))?;

        parse_hands(&vision_response.content)
    }
}

/// Extract the contents of the first fenced code block, preferring ```json.
fn extract_fenced_block(raw: &str) -> Option<&str> {
    let open = raw.find("```")?;
    let after_open = &raw[open + 3..];
    // Skip an optional language tag on the opening fence line
    let body_start = after_open.find('\n')? + 1;
    let body = &after_open[body_start..];
    let close = body.find("```")?;
    Some(body[..close].trim())
}

/// Parse the raw model output into candidate hands.
///
/// Two-step fallback: strict JSON parse first, then one retry on the first
/// fenced block. A non-array top level is a SchemaError; elements that do not
/// match the hand shape are dropped with a warning.
pub fn parse_hands(raw: &str) -> Result<Vec<CandidateHand>, PipelineError> {
    let trimmed = raw.trim();

    let value: serde_json::Value = match serde_json::from_str(trimmed) {
        Ok(v) => v,
        Err(first_err) => {
            let fenced = extract_fenced_block(trimmed).ok_or_else(|| {
                PipelineError::ResponseParse(format!(
                    "Not valid JSON and no fenced block found: {}",
                    first_err
                ))
            })?;
            serde_json::from_str(fenced).map_err(|e| {
                PipelineError::ResponseParse(format!("Fenced block is not valid JSON: {}", e))
            })?
        }
    };

    let array = match value {
        serde_json::Value::Array(items) => items,
        other => {
            return Err(PipelineError::Schema(format!(
                "Expected a JSON array of hands, got {}",
                json_type_name(&other)
            )))
        }
    };

    let mut hands = Vec::with_capacity(array.len());
    for (i, item) in array.into_iter().enumerate() {
        match serde_json::from_value::<CandidateHand>(item) {
            Ok(hand) => {
                if hand.players.is_empty() {
                    tracing::warn!(index = i, "Dropping hand with no players");
                    continue;
                }
                hands.push(hand);
            }
            Err(e) => {
                tracing::warn!(index = i, error = %e, "Dropping malformed hand element");
            }
        }
    }

    Ok(hands)
}

fn json_type_name(value: &serde_json::Value) -> &'static str {
    match value {
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "a boolean",
        serde_json::Value::Number(_) => "a number",
        serde_json::Value::String(_) => "a string",
        serde_json::Value::Array(_) => "an array",
        serde_json::Value::Object(_) => "an object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const HAND_JSON: &str = r#"[
        {
            "hand_id": "001",
            "timestamp_seconds": 4.0,
            "blinds": {"small_blind": 1.0, "big_blind": 2.0, "ante": 0.0},
            "players": [
                {"name": "alice", "position": "BTN", "stack_start": 100.0},
                {"name": "bob", "position": "BB", "stack_start": 150.0}
            ],
            "confidence": 0.9,
            "extraction_method": "vision"
        }
    ]"#;

    #[test]
    fn test_parse_bare_array() {
        let hands = parse_hands(HAND_JSON).expect("parse");
        assert_eq!(hands.len(), 1);
        assert_eq!(hands[0].hand_id, "001");
        assert_eq!(hands[0].confidence, 0.9);
    }

    #[test]
    fn test_parse_fenced_array_identical_to_bare() {
        let fenced = format!("Here are the hands:\n```json\n{}\n```\nDone.", HAND_JSON);
        let bare = parse_hands(HAND_JSON).expect("bare");
        let wrapped = parse_hands(&fenced).expect("fenced");
        assert_eq!(bare.len(), wrapped.len());
        assert_eq!(bare[0].hand_id, wrapped[0].hand_id);
        assert_eq!(bare[0].players.len(), wrapped[0].players.len());
    }

    #[test]
    fn test_parse_fence_without_language_tag() {
        let fenced = format!("```\n{}\n```", HAND_JSON);
        let hands = parse_hands(&fenced).expect("parse");
        assert_eq!(hands.len(), 1);
    }

    #[test]
    fn test_non_array_is_schema_error() {
        let result = parse_hands(r#"{"hands": []}"#);
        assert!(matches!(result, Err(PipelineError::Schema(_))));

        let result = parse_hands("42");
        assert!(matches!(result, Err(PipelineError::Schema(_))));
    }

    #[test]
    fn test_garbage_is_parse_error() {
        let result = parse_hands("the model refused to answer");
        assert!(matches!(result, Err(PipelineError::ResponseParse(_))));
    }

    #[test]
    fn test_garbage_inside_fence_is_parse_error() {
        let result = parse_hands("```json\nnot json either\n```");
        assert!(matches!(result, Err(PipelineError::ResponseParse(_))));
    }

    #[test]
    fn test_empty_array_is_ok() {
        let hands = parse_hands("[]").expect("parse");
        assert!(hands.is_empty());
    }

    #[test]
    fn test_malformed_elements_dropped() {
        let mixed = r#"[
            {"hand_id": "001", "timestamp_seconds": 1.0,
             "players": [{"name": "alice", "stack_start": 10.0}]},
            {"this_is": "not a hand"},
            {"hand_id": "002", "timestamp_seconds": 2.0, "players": []}
        ]"#;

        let hands = parse_hands(mixed).expect("parse");
        // Second element fails deserialization, third has no players
        assert_eq!(hands.len(), 1);
        assert_eq!(hands[0].hand_id, "001");
    }
}
