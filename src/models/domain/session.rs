use serde::{Deserialize, Serialize};

use crate::models::domain::file_data::FileData;
use crate::models::domain::history_item::Language;
use crate::models::domain::quiz::{QuizSet, TimerConfig};
use crate::models::domain::user::Identity;

/// Generation counters for one guest identity.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GuestUsage {
    pub summaries_count: u32,
    pub questions_count: u32,
}

/// Which screen the workspace is on.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ViewState {
    #[default]
    Idle,
    QuizConfig,
    EditText,
    Processing,
    SummaryView,
    QuizView,
    HistoryView,
    Error,
}

/// Everything the workspace persists between runs.
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SessionSnapshot {
    pub user: Option<Identity>,
    pub guest_usage: GuestUsage,
    pub current_file: Option<FileData>,
    pub extracted_text: String,
    pub is_using_edited_text: bool,
    pub language: Language,
    pub question_count: u32,
    pub timer: TimerConfig,
    pub summary: Option<String>,
    pub quiz: Option<QuizSet>,
    pub view: ViewState,
}
