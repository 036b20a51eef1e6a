use std::time::Duration;

use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use serde_json::{json, Value};

use crate::{
    config::Config,
    constants::prompts::{
        quiz_prompt, summary_language_instruction, EXTRACTION_PROMPT, SUMMARY_PROMPT,
        TEXT_INPUT_PREFIX,
    },
    errors::{AppError, AppResult},
    models::{
        domain::{FileData, Language, QuizSet},
        dto::quiz_dto::{generated_quiz_schema, parse_generated_quiz},
    },
};

static DATA_URL_PREFIX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^data:(.*,)?").expect("DATA_URL_PREFIX is a valid regex pattern"));

/// Removes a `data:<mime>;base64,` prefix from a base64 payload.
pub fn strip_data_url_prefix(encoded: &str) -> &str {
    match DATA_URL_PREFIX.find(encoded) {
        Some(m) => &encoded[m.end()..],
        None => encoded,
    }
}

/// What a summary or quiz is generated from: the user's edited text when
/// they chose to use it, otherwise the uploaded file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StudySource {
    Text(String),
    File(FileData),
}

/// The external document model. Every failure is a generation failure.
#[async_trait]
pub trait DocumentIntelligence: Send + Sync {
    async fn extract_text(&self, file: &FileData) -> AppResult<String>;
    async fn summarize(&self, source: &StudySource, language: Language) -> AppResult<String>;
    async fn generate_quiz(
        &self,
        source: &StudySource,
        count: u32,
        language: Language,
    ) -> AppResult<QuizSet>;
}

#[derive(Debug, Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Debug, Deserialize)]
struct ResponsePart {
    text: Option<String>,
}

impl GenerateContentResponse {
    fn text(&self) -> String {
        self.candidates
            .first()
            .and_then(|c| c.content.as_ref())
            .map(|content| {
                content
                    .parts
                    .iter()
                    .filter_map(|p| p.text.as_deref())
                    .collect::<String>()
            })
            .unwrap_or_default()
    }
}

fn inline_part(file: &FileData) -> Value {
    json!({
        "inline_data": {
            "mime_type": file.mime_type,
            "data": file.to_base64(),
        }
    })
}

fn source_parts(source: &StudySource) -> Vec<Value> {
    match source {
        StudySource::Text(text) => vec![
            json!({ "text": TEXT_INPUT_PREFIX }),
            json!({ "text": text }),
        ],
        StudySource::File(file) => vec![inline_part(file)],
    }
}

fn request_body(mut parts: Vec<Value>, instruction: String, json_output: bool) -> Value {
    parts.push(json!({ "text": instruction }));
    let mut body = json!({ "contents": [{ "parts": parts }] });
    if json_output {
        body["generationConfig"] = json!({ "responseMimeType": "application/json" });
    }
    body
}

/// Gemini `generateContent` client.
pub struct GeminiModelService {
    client: reqwest::Client,
    api_key: SecretString,
    model: String,
    base_url: String,
}

impl GeminiModelService {
    pub fn new(config: &Config) -> AppResult<Self> {
        config.validate_provider()?;
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()?;
        Ok(Self {
            client,
            api_key: config.gemini_api_key.clone(),
            model: config.gemini_model.clone(),
            base_url: config.gemini_base_url.trim_end_matches('/').to_string(),
        })
    }

    fn endpoint(&self) -> String {
        format!("{}/models/{}:generateContent", self.base_url, self.model)
    }

    async fn generate(&self, body: &Value) -> AppResult<String> {
        let response = self
            .client
            .post(self.endpoint())
            .header("x-goog-api-key", self.api_key.expose_secret())
            .json(body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body_text = response.text().await.unwrap_or_default();
            log::error!("Gemini API error {}: {}", status, body_text);
            return Err(AppError::GenerationFailed(format!(
                "Model API returned {}",
                status
            )));
        }

        let parsed: GenerateContentResponse = response.json().await?;
        Ok(parsed.text())
    }
}

#[async_trait]
impl DocumentIntelligence for GeminiModelService {
    async fn extract_text(&self, file: &FileData) -> AppResult<String> {
        let body = request_body(vec![inline_part(file)], EXTRACTION_PROMPT.to_string(), false);
        let text = self.generate(&body).await.inspect_err(|e| {
            log::error!("Text extraction error: {}", e);
        })?;
        Ok(text)
    }

    async fn summarize(&self, source: &StudySource, language: Language) -> AppResult<String> {
        let instruction = format!("{}\n{}", SUMMARY_PROMPT, summary_language_instruction(language));
        let body = request_body(source_parts(source), instruction, false);
        let summary = self.generate(&body).await.inspect_err(|e| {
            log::error!("Summarization error: {}", e);
        })?;
        if summary.trim().is_empty() {
            return Err(AppError::GenerationFailed(
                "Model returned an empty summary".to_string(),
            ));
        }
        Ok(summary)
    }

    async fn generate_quiz(
        &self,
        source: &StudySource,
        count: u32,
        language: Language,
    ) -> AppResult<QuizSet> {
        let instruction = quiz_prompt(count, language, &generated_quiz_schema());
        let body = request_body(source_parts(source), instruction, true);
        let raw = self.generate(&body).await.inspect_err(|e| {
            log::error!("Quiz generation error: {}", e);
        })?;
        if raw.trim().is_empty() {
            return Err(AppError::GenerationFailed(
                "No data returned from API".to_string(),
            ));
        }

        let quiz = parse_generated_quiz(&raw)?;
        if quiz.len() != count as usize {
            log::warn!("Requested {} questions, model returned {}", count, quiz.len());
        }
        Ok(quiz)
    }
}
