use serde::Serialize;

use crate::models::domain::QuizQuestion;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SessionState {
    Active,
    FinishedSummary,
    FinishedReview,
}

impl SessionState {
    pub fn is_finished(&self) -> bool {
        !matches!(self, SessionState::Active)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FinishReason {
    Completed,
    Submitted,
    TimeExpired,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Score {
    pub correct: usize,
    pub total: usize,
}

impl Score {
    /// Rounded to the nearest integer, halves rounding up.
    pub fn percentage(&self) -> u32 {
        if self.total == 0 {
            return 0;
        }
        ((200 * self.correct + self.total) / (2 * self.total)) as u32
    }

    pub fn passed(&self) -> bool {
        self.percentage() >= 50
    }
}

/// What the UI renders for the in-progress or finished quiz.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QuizSessionSnapshot {
    pub state: SessionState,
    pub pointer: usize,
    pub total: usize,
    pub remaining_seconds: Option<u32>,
    pub answered: Vec<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub score: Option<Score>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub finish_reason: Option<FinishReason>,
}

/// A finished question with its correctness annotation.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewEntry<'a> {
    pub question: &'a QuizQuestion,
    pub selected: Option<usize>,
    pub is_correct: bool,
}
