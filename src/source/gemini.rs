//! Google Gemini backed question source.
//!
//! Sends one `generateContent` request per quiz, constraining the reply to a
//! fixed JSON schema so the text can be parsed without any extraction step.

use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::{debug, error, info, instrument};

use super::{parse_questions, GenerationError, QuestionSource, QUESTIONS_PER_QUIZ};
use crate::{config::GeminiConfig, question::Question};

#[derive(Debug, Clone)]
pub struct GeminiSource {
    config: GeminiConfig,
    client: Client,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateRequest {
    contents: Vec<Content>,
    generation_config: GenerationConfig,
}

#[derive(Debug, Serialize)]
struct Content {
    parts: Vec<Part>,
}

#[derive(Debug, Serialize)]
struct Part {
    text: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    response_mime_type: &'static str,
    response_schema: Value,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    #[serde(default)]
    usage_metadata: Option<UsageMetadata>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    #[serde(default)]
    content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Debug, Deserialize)]
struct CandidatePart {
    #[serde(default)]
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UsageMetadata {
    #[serde(default)]
    prompt_token_count: Option<u32>,
    #[serde(default)]
    candidates_token_count: Option<u32>,
}

impl GenerateResponse {
    /// Text of the first candidate, or `None` when the service produced none.
    fn text(&self) -> Option<String> {
        let parts = &self.candidates.first()?.content.as_ref()?.parts;
        let text: String = parts.iter().filter_map(|p| p.text.as_deref()).collect();
        (!text.is_empty()).then_some(text)
    }
}

pub(crate) fn build_prompt(topic: &str) -> String {
    format!(
        "Generate a quiz with exactly {} multiple-choice questions about \"{}\".\n\
         Each question must have 4 distinct options.\n\
         Ensure the questions vary in difficulty.\n\
         Provide a clear explanation for the correct answer.",
        QUESTIONS_PER_QUIZ, topic
    )
}

pub(crate) fn response_schema() -> Value {
    json!({
        "type": "ARRAY",
        "items": {
            "type": "OBJECT",
            "properties": {
                "text": {
                    "type": "STRING",
                    "description": "The question text"
                },
                "options": {
                    "type": "ARRAY",
                    "items": { "type": "STRING" },
                    "description": "An array of exactly 4 possible answers"
                },
                "correctAnswer": {
                    "type": "STRING",
                    "description": "The exact string of the correct option from the options array"
                },
                "explanation": {
                    "type": "STRING",
                    "description": "A short explanation of why the answer is correct"
                }
            },
            "required": ["text", "options", "correctAnswer", "explanation"],
            "propertyOrdering": ["text", "options", "correctAnswer", "explanation"]
        }
    })
}

impl GeminiSource {
    pub fn new(config: GeminiConfig) -> Result<Self, GenerationError> {
        let client = Client::builder().timeout(config.timeout).build()?;
        Ok(Self { config, client })
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/{}:generateContent",
            self.config.base_url.trim_end_matches('/'),
            self.config.model
        )
    }

    fn request_body(topic: &str) -> GenerateRequest {
        GenerateRequest {
            contents: vec![Content {
                parts: vec![Part {
                    text: build_prompt(topic),
                }],
            }],
            generation_config: GenerationConfig {
                response_mime_type: "application/json",
                response_schema: response_schema(),
            },
        }
    }

    async fn send(&self, topic: &str) -> Result<Option<String>, GenerationError> {
        let url = self.endpoint();
        debug!("Sending generateContent request to {}", url);

        let response = self
            .client
            .post(&url)
            .header("x-goog-api-key", &self.config.api_key)
            .json(&Self::request_body(topic))
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            error!("Gemini API error: {} - {}", status, body);
            return Err(GenerationError::Api {
                status: status.as_u16(),
                body,
            });
        }

        let parsed: GenerateResponse = serde_json::from_str(&body)
            .map_err(|e| GenerationError::ParseFailure(e.to_string()))?;

        if let Some(usage) = &parsed.usage_metadata {
            info!(
                "Gemini usage - prompt: {:?} tokens, response: {:?} tokens",
                usage.prompt_token_count, usage.candidates_token_count
            );
        }

        Ok(parsed.text())
    }
}

impl QuestionSource for GeminiSource {
    #[instrument(level = "info", skip(self), fields(model = %self.config.model))]
    async fn generate(&self, topic: &str) -> Result<Vec<Question>, GenerationError> {
        let payload = self.send(topic).await?;
        let questions = parse_questions(payload.as_deref())?;
        info!("Generated {} questions about '{}'", questions.len(), topic);
        Ok(questions)
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    fn test_config() -> GeminiConfig {
        GeminiConfig {
            api_key: "test-key".to_string(),
            model: "gemini-2.5-flash".to_string(),
            base_url: "https://example.test/v1beta/models/".to_string(),
            timeout: Duration::from_secs(5),
        }
    }

    #[test]
    fn endpoint_joins_base_and_model() {
        let source = GeminiSource::new(test_config()).unwrap();

        assert_eq!(
            source.endpoint(),
            "https://example.test/v1beta/models/gemini-2.5-flash:generateContent"
        );
    }

    #[test]
    fn prompt_names_topic_and_count() {
        let prompt = build_prompt("Space Exploration");

        assert!(prompt.contains("exactly 10 multiple-choice questions"));
        assert!(prompt.contains("\"Space Exploration\""));
        assert!(prompt.contains("4 distinct options"));
    }

    #[test]
    fn request_body_asks_for_structured_json() {
        let body = serde_json::to_value(GeminiSource::request_body("Rust")).unwrap();

        let config = &body["generationConfig"];
        assert_eq!(config["responseMimeType"], "application/json");
        assert_eq!(config["responseSchema"]["type"], "ARRAY");
        assert_eq!(
            config["responseSchema"]["items"]["propertyOrdering"],
            json!(["text", "options", "correctAnswer", "explanation"])
        );
        assert!(body["contents"][0]["parts"][0]["text"]
            .as_str()
            .unwrap()
            .contains("\"Rust\""));
    }

    #[test]
    fn response_text_joins_first_candidate_parts() {
        let response: GenerateResponse = serde_json::from_value(json!({
            "candidates": [
                { "content": { "parts": [ { "text": "[{\"te" }, { "text": "xt\": 1}]" } ] } },
                { "content": { "parts": [ { "text": "ignored" } ] } }
            ]
        }))
        .unwrap();

        assert_eq!(response.text().as_deref(), Some("[{\"text\": 1}]"));
    }

    #[test]
    fn response_without_candidates_has_no_text() {
        let response: GenerateResponse =
            serde_json::from_value(json!({ "promptFeedback": { "blockReason": "SAFETY" } }))
                .unwrap();

        assert_eq!(response.text(), None);
        assert!(matches!(
            parse_questions(response.text().as_deref()),
            Err(GenerationError::EmptyResponse)
        ));
    }
}
