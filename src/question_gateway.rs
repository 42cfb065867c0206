use std::{collections::BTreeMap, future::Future, time::Duration};

use color_eyre::eyre::{Result, eyre};
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use crate::{
    config::{AppConfig, QuestionSourceKind},
    error::FetchError,
    log_util,
    question::{QuestionPayload, parse_payload},
};

const QUESTION_SCHEMA: &str = r#"{
  "type": "object",
  "additionalProperties": false,
  "properties": {
    "question": {
      "type": "string",
      "description": "a one-paragraph clinical scenario followed by the question"
    },
    "choices": {
      "type": "array",
      "description": "four answer choices labelled A. to D.",
      "items": { "type": "string" }
    },
    "correct": {
      "type": "integer",
      "description": "0-based index of the single correct choice"
    },
    "explanations": {
      "type": "array",
      "description": "one explanation per choice, in choice order, saying why it is correct or incorrect",
      "items": { "type": "string" }
    },
    "links": {
      "type": "array",
      "description": "one list of learning links per choice, in choice order",
      "items": {
        "type": "array",
        "items": { "type": "string" }
      }
    }
  },
  "required": ["question", "choices", "correct", "explanations", "links"]
}"#;

const SYSTEM_PROMPT: &str = r#"You are an NPTE-PT exam tutor. Generate a multiple-choice question with specific content.
Use a scenario-style question: a short clinical vignette followed by the question stem.
Rules:
- The choices must be labeled A, B, C, D
- Each choice must be a unique answer
- One and only one of the choices must be the correct answer
- Do NOT use generic placeholders like "Option A" or "Explanation for option X".
- 'correct' is 0-based (0=A, 1=B, 2=C, 3=D)
- For each choice provide a detailed explanation for why it is correct or incorrect
- Provide relevant learning links for each choice
- Make content specific to the topic, not generic
Return JSON that strictly matches the provided schema."#;

const DEFAULT_OPENAI_API_BASE: &str = "https://api.openai.com/v1";

/// Request/response adapter to whatever generates questions.
pub trait QuestionGateway {
    fn fetch_question(
        &self,
        topic: &str,
    ) -> impl Future<Output = Result<QuestionPayload, FetchError>> + Send;
}

/// Request body accepted by the question service.
#[derive(Debug, Serialize)]
struct AskRequest<'a> {
    prompt: &'a str,
}

/// Client for the question service's `POST /api/ask` endpoint.
#[derive(Debug, Clone)]
pub struct BackendGateway {
    client: Client,
    base_url: String,
}

impl BackendGateway {
    pub fn new(client: Client, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into(),
        }
    }

    fn endpoint(&self) -> String {
        format!("{}/api/ask", self.base_url.trim_end_matches('/'))
    }
}

impl QuestionGateway for BackendGateway {
    async fn fetch_question(&self, topic: &str) -> Result<QuestionPayload, FetchError> {
        let endpoint = self.endpoint();
        log_util::log_debug(&format!(
            "BackendGateway: requesting question for '{}' from {}",
            topic, endpoint
        ));
        let response = self
            .client
            .post(&endpoint)
            .json(&AskRequest { prompt: topic })
            .send()
            .await
            .map_err(|err| FetchError::Transport(err.to_string()))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|err| FetchError::Transport(err.to_string()))?;
        log_util::log_debug(&format!(
            "BackendGateway: status {} ({} bytes)",
            status,
            body.len()
        ));
        classify_backend_response(status, &body)
    }
}

fn classify_backend_response(status: StatusCode, body: &str) -> Result<QuestionPayload, FetchError> {
    if !status.is_success() {
        return Err(FetchError::Server {
            status: status.as_u16(),
            message: body.trim().to_string(),
        });
    }
    parse_payload(body)
}

/// Structured question as produced by the chat completions schema. Per-choice data comes back as
/// arrays because strict schemas cannot describe index-keyed maps.
#[derive(Debug, Clone, Deserialize)]
struct GeneratedQuestion {
    question: String,
    choices: Vec<String>,
    correct: usize,
    #[serde(default)]
    explanations: Vec<String>,
    #[serde(default)]
    links: Vec<Vec<String>>,
}

impl From<GeneratedQuestion> for QuestionPayload {
    fn from(generated: GeneratedQuestion) -> Self {
        let explanations: BTreeMap<usize, String> = generated
            .explanations
            .into_iter()
            .enumerate()
            .filter(|(_, text)| !text.trim().is_empty())
            .collect();
        let links: BTreeMap<usize, Vec<String>> = generated
            .links
            .into_iter()
            .enumerate()
            .filter(|(_, urls)| !urls.is_empty())
            .collect();
        Self {
            question: generated.question,
            choices: generated.choices,
            correct: generated.correct,
            explanations,
            links,
        }
    }
}

/// Generates questions directly through the OpenAI chat completions API.
#[derive(Debug, Clone)]
pub struct OpenAiGateway {
    client: Client,
    api_key: String,
    api_base: String,
    model_name: String,
}

impl OpenAiGateway {
    pub fn new(client: Client, api_key: impl Into<String>, model_name: impl Into<String>) -> Self {
        Self {
            client,
            api_key: api_key.into(),
            api_base: DEFAULT_OPENAI_API_BASE.to_string(),
            model_name: model_name.into(),
        }
    }

    fn build_prompt(topic: &str) -> String {
        format!(
            "Generate a multiple-choice question about: {topic}\n\nYou must provide:\n1. A specific one-paragraph scenario followed by the question on {topic}\n2. Wrong answers that are somewhat similar to the correct answer.\n\nMake everything specific to {topic}.\n\nSchema:\n```json\n{QUESTION_SCHEMA}\n```"
        )
    }
}

impl QuestionGateway for OpenAiGateway {
    async fn fetch_question(&self, topic: &str) -> Result<QuestionPayload, FetchError> {
        let payload = json!({
            "model": self.model_name.as_str(),
            "messages": [
                {
                    "role": "system",
                    "content": SYSTEM_PROMPT,
                },
                {
                    "role": "user",
                    "content": Self::build_prompt(topic),
                }
            ],
            "response_format": {
                "type": "json_schema",
                "json_schema": {
                    "name": "npte_question",
                    "schema": schema_value(),
                    "strict": true,
                }
            }
        });

        let endpoint = format!("{}/chat/completions", self.api_base);
        log_util::log_debug(&format!(
            "OpenAiGateway: invoking {} with model {} for '{}'",
            endpoint, self.model_name, topic
        ));
        let response = self
            .client
            .post(&endpoint)
            .bearer_auth(&self.api_key)
            .json(&payload)
            .send()
            .await
            .map_err(|err| FetchError::Transport(err.to_string()))?;

        let status = response.status();
        log_util::log_debug(&format!("OpenAiGateway: OpenAI status {}", status));
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|err| format!("<failed to read body: {}>", err));
            log_util::log_debug(&format!("OpenAiGateway: OpenAI error body: {}", body));
            return Err(FetchError::Server {
                status: status.as_u16(),
                message: body,
            });
        }

        let response_value: Value = response
            .json()
            .await
            .map_err(|err| FetchError::MalformedPayload(err.to_string()))?;
        parse_completion(&response_value)
    }
}

fn parse_completion(value: &Value) -> Result<QuestionPayload, FetchError> {
    let text = extract_completion_text(value).ok_or_else(|| {
        FetchError::MalformedPayload("OpenAI response did not include assistant content".into())
    })?;
    let generated: GeneratedQuestion = serde_json::from_str(&text)
        .map_err(|err| FetchError::MalformedPayload(err.to_string()))?;
    log_util::log_debug("OpenAiGateway: deserialization completed successfully");
    Ok(generated.into())
}

fn schema_value() -> Value {
    serde_json::from_str(QUESTION_SCHEMA).expect("QUESTION_SCHEMA is valid")
}

fn extract_completion_text(value: &Value) -> Option<String> {
    let choices = value.get("choices")?.as_array()?;
    let first_choice = choices.first()?;
    let message = first_choice.get("message")?;
    let content = message.get("content")?;
    match content {
        Value::String(text) => Some(text.clone()),
        Value::Array(parts) => {
            let mut buffer = String::new();
            for part in parts {
                if let Some(text) = part.get("text").and_then(Value::as_str) {
                    buffer.push_str(text);
                }
            }
            if buffer.is_empty() {
                None
            } else {
                Some(buffer)
            }
        }
        _ => None,
    }
}

/// The gateway selected by configuration.
#[derive(Debug, Clone)]
pub enum QuestionSource {
    Backend(BackendGateway),
    OpenAi(OpenAiGateway),
}

impl QuestionSource {
    pub fn from_config(config: &AppConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()
            .map_err(|err| eyre!("failed to build HTTP client: {}", err))?;

        match config.question_source {
            QuestionSourceKind::Backend => Ok(Self::Backend(BackendGateway::new(
                client,
                config.backend_url.clone(),
            ))),
            QuestionSourceKind::OpenAi => {
                let api_key = config.resolved_openai_key().ok_or_else(|| {
                    eyre!("OpenAI API key missing. Set it in the config view or OPENAI_API_KEY.")
                })?;
                Ok(Self::OpenAi(OpenAiGateway::new(
                    client,
                    api_key,
                    config.openai_model.as_model_name(),
                )))
            }
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Backend(_) => QuestionSourceKind::Backend.label(),
            Self::OpenAi(_) => QuestionSourceKind::OpenAi.label(),
        }
    }
}

impl QuestionGateway for QuestionSource {
    async fn fetch_question(&self, topic: &str) -> Result<QuestionPayload, FetchError> {
        match self {
            Self::Backend(gateway) => gateway.fetch_question(topic).await,
            Self::OpenAi(gateway) => gateway.fetch_question(topic).await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::question::Question;

    #[test]
    fn backend_success_decodes_payload() {
        let body = r#"{"question":"Q","choices":["a","b"],"correct":0,"explanations":{"0":"yes"},"links":{"1":["https://apta.org"]}}"#;
        let payload = classify_backend_response(StatusCode::OK, body).unwrap();
        assert_eq!(payload.choices.len(), 2);
        assert_eq!(payload.links.get(&1).unwrap()[0], "https://apta.org");
    }

    #[test]
    fn backend_error_status_is_a_server_error() {
        let err = classify_backend_response(
            StatusCode::SERVICE_UNAVAILABLE,
            r#"{"detail":"Agent system not initialized"}"#,
        )
        .unwrap_err();
        assert_eq!(
            err,
            FetchError::Server {
                status: 503,
                message: r#"{"detail":"Agent system not initialized"}"#.to_string(),
            }
        );
    }

    #[test]
    fn backend_garbage_body_is_malformed() {
        let err = classify_backend_response(StatusCode::OK, "not json").unwrap_err();
        assert!(matches!(err, FetchError::MalformedPayload(_)));
    }

    #[test]
    fn backend_endpoint_joins_without_double_slash() {
        let gateway = BackendGateway::new(Client::new(), "http://localhost:8000/");
        assert_eq!(gateway.endpoint(), "http://localhost:8000/api/ask");
    }

    #[test]
    fn ask_request_uses_prompt_field() {
        let body = serde_json::to_value(AskRequest {
            prompt: "Lymphatic system",
        })
        .unwrap();
        assert_eq!(body, json!({"prompt": "Lymphatic system"}));
    }

    #[test]
    fn completion_content_converts_to_index_keyed_payload() {
        let generated = json!({
            "question": "A runner reports heel pain on first steps in the morning. Most likely?",
            "choices": ["A. Achilles rupture", "B. Plantar fasciitis", "C. Calcaneal fracture", "D. Tarsal tunnel"],
            "correct": 1,
            "explanations": ["Would show a positive Thompson test.", "Classic first-step pain.", "", "Neural symptoms expected."],
            "links": [[], ["https://www.jospt.org/doi/10.2519/jospt.2014.0303"], [], []]
        });
        let completion = json!({
            "choices": [{"message": {"content": generated.to_string()}}]
        });

        let payload = parse_completion(&completion).unwrap();
        assert_eq!(payload.correct, 1);
        assert_eq!(payload.explanations.len(), 3);
        assert!(payload.explanations.get(&2).is_none());
        assert_eq!(payload.links.keys().copied().collect::<Vec<_>>(), vec![1]);

        let question = Question::try_from(payload).unwrap();
        assert_eq!(question.correct_choice(), "B. Plantar fasciitis");
    }

    #[test]
    fn completion_missing_correct_index_is_malformed() {
        let generated = json!({
            "question": "Q",
            "choices": ["a", "b"],
            "explanations": [],
            "links": []
        });
        let completion = json!({
            "choices": [{"message": {"content": generated.to_string()}}]
        });
        assert!(matches!(
            parse_completion(&completion),
            Err(FetchError::MalformedPayload(_))
        ));
    }

    #[test]
    fn completion_without_content_is_malformed() {
        let completion = json!({"choices": []});
        assert!(matches!(
            parse_completion(&completion),
            Err(FetchError::MalformedPayload(_))
        ));
    }

    #[test]
    fn completion_content_parts_are_joined() {
        let completion = json!({
            "choices": [{"message": {"content": [
                {"type": "text", "text": "{\"question\":\"Q\",\"choices\":[\"a\"],"},
                {"type": "text", "text": "\"correct\":0,\"explanations\":[],\"links\":[]}"}
            ]}}]
        });
        let payload = parse_completion(&completion).unwrap();
        assert_eq!(payload.choices, vec!["a".to_string()]);
    }

    #[test]
    fn schema_is_valid_json() {
        assert_eq!(schema_value()["required"].as_array().unwrap().len(), 5);
        assert!(OpenAiGateway::build_prompt("Lymphatic system").contains("Lymphatic system"));
    }

    #[test]
    fn backend_source_builds_from_default_config() {
        let config = AppConfig {
            question_source: QuestionSourceKind::Backend,
            ..AppConfig::default()
        };
        let source = QuestionSource::from_config(&config).unwrap();
        assert!(matches!(source, QuestionSource::Backend(_)));
        assert_eq!(source.label(), "Question service");
    }
}
