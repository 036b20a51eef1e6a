use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::domain::file_data::FileData;
use crate::models::domain::quiz::QuizSet;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    En,
    #[default]
    Ar,
}

impl Language {
    pub fn code(&self) -> &'static str {
        match self {
            Language::En => "en",
            Language::Ar => "ar",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            Language::En => "English",
            Language::Ar => "Arabic",
        }
    }
}

/// A saved study artifact. Never mutated after creation.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryItem {
    pub id: String, // uuid v7, sorts by creation time
    pub user_id: String,
    pub timestamp: DateTime<Utc>,
    pub file_name: String,
    pub file_data: FileData,
    pub extracted_text: String,
    pub summary: Option<String>,
    pub quiz: Option<QuizSet>,
    pub language: Language,
}

impl HistoryItem {
    pub fn new(
        user_id: &str,
        file: FileData,
        extracted_text: &str,
        summary: Option<&str>,
        quiz: Option<&QuizSet>,
        language: Language,
    ) -> Self {
        HistoryItem {
            id: Uuid::now_v7().to_string(),
            user_id: user_id.to_string(),
            timestamp: Utc::now(),
            file_name: file.name.clone(),
            file_data: file,
            extracted_text: extracted_text.to_string(),
            summary: summary.filter(|s| !s.trim().is_empty()).map(str::to_string),
            quiz: quiz.filter(|q| !q.is_empty()).cloned(),
            language,
        }
    }

    pub fn owned_by(&self, owner_id: &str) -> bool {
        self.user_id == owner_id
    }
}
