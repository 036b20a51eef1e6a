use once_cell::sync::Lazy;
use regex::Regex;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::errors::{AppError, AppResult};
use crate::models::domain::quiz_question::OPTION_COUNT;
use crate::models::domain::{QuizQuestion, QuizSet};

static CODE_FENCE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?s)^\s*```(?:json)?\s*(.*?)\s*```\s*$").expect("CODE_FENCE is a valid regex pattern")
});

/// One question exactly as the model is asked to return it.
#[derive(Debug, Clone, Deserialize, Serialize, Validate, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct GeneratedQuestionDto {
    #[validate(range(min = 0))]
    pub id: i64,

    #[validate(length(min = 1))]
    pub question: String,

    /// Exactly four answer options.
    #[validate(length(equal = 4))]
    pub options: Vec<String>,

    /// Zero-based index of the correct option (0, 1, 2, or 3).
    #[validate(range(min = 0, max = 3))]
    pub correct_answer_index: i64,

    /// A helpful explanation of the correct answer to learn from.
    pub explanation: String,
}

impl TryFrom<GeneratedQuestionDto> for QuizQuestion {
    type Error = AppError;

    fn try_from(dto: GeneratedQuestionDto) -> Result<Self, Self::Error> {
        dto.validate()?;

        if dto.question.trim().is_empty() {
            return Err(AppError::ValidationError(format!(
                "Question {} has no text",
                dto.id
            )));
        }
        if dto.options.iter().any(|o| o.trim().is_empty()) {
            return Err(AppError::ValidationError(format!(
                "Question {} has a blank option",
                dto.id
            )));
        }

        let id = u32::try_from(dto.id)
            .map_err(|_| AppError::ValidationError(format!("Question id {} is out of range", dto.id)))?;
        let correct_answer_index = usize::try_from(dto.correct_answer_index)
            .ok()
            .filter(|i| *i < OPTION_COUNT)
            .ok_or_else(|| {
                AppError::ValidationError(format!(
                    "Question {} has an out-of-range correct answer",
                    dto.id
                ))
            })?;

        Ok(QuizQuestion {
            id,
            question: dto.question,
            options: dto.options,
            correct_answer_index,
            explanation: dto.explanation,
        })
    }
}

impl From<&QuizQuestion> for GeneratedQuestionDto {
    fn from(question: &QuizQuestion) -> Self {
        GeneratedQuestionDto {
            id: i64::from(question.id),
            question: question.question.clone(),
            options: question.options.clone(),
            correct_answer_index: question.correct_answer_index as i64,
            explanation: question.explanation.clone(),
        }
    }
}

/// JSON schema of the expected response, embedded in the quiz prompt.
pub fn generated_quiz_schema() -> String {
    let schema = schemars::schema_for!(Vec<GeneratedQuestionDto>);
    serde_json::to_string_pretty(&schema).unwrap_or_else(|_| "[]".to_string())
}

fn strip_code_fence(raw: &str) -> &str {
    CODE_FENCE
        .captures(raw)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str())
        .unwrap_or(raw)
}

/// Parses and validates a model response into a quiz set.
///
/// Any missing field, wrong option count, out-of-range answer or duplicate
/// id rejects the whole response.
pub fn parse_generated_quiz(raw: &str) -> AppResult<QuizSet> {
    let body = strip_code_fence(raw);
    let dtos: Vec<GeneratedQuestionDto> = serde_json::from_str(body).map_err(|e| {
        AppError::GenerationFailed(format!("Malformed quiz response: {}", e))
    })?;

    if dtos.is_empty() {
        return Err(AppError::GenerationFailed(
            "Quiz response contained no questions".to_string(),
        ));
    }

    let questions = dtos
        .into_iter()
        .map(QuizQuestion::try_from)
        .collect::<Result<Vec<_>, AppError>>()
        .map_err(|e| AppError::GenerationFailed(format!("Invalid quiz response: {}", e)))?;

    QuizSet::new(questions)
        .map_err(|e| AppError::GenerationFailed(format!("Invalid quiz response: {}", e)))
}
