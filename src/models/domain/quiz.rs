use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::errors::{AppError, AppResult};
use crate::models::domain::quiz_question::QuizQuestion;

/// Ordered question set; insertion order is presentation order.
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(transparent)]
pub struct QuizSet {
    questions: Vec<QuizQuestion>,
}

impl QuizSet {
    /// Builds a set, rejecting duplicate question ids.
    pub fn new(questions: Vec<QuizQuestion>) -> AppResult<Self> {
        let mut seen = HashSet::new();
        for question in &questions {
            if !seen.insert(question.id) {
                return Err(AppError::ValidationError(format!(
                    "Duplicate question id {} in quiz set",
                    question.id
                )));
            }
        }
        Ok(Self { questions })
    }

    pub fn questions(&self) -> &[QuizQuestion] {
        &self.questions
    }

    pub fn get(&self, index: usize) -> Option<&QuizQuestion> {
        self.questions.get(index)
    }

    pub fn find(&self, id: u32) -> Option<&QuizQuestion> {
        self.questions.iter().find(|q| q.id == id)
    }

    pub fn len(&self) -> usize {
        self.questions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.questions.is_empty()
    }

    pub fn ids(&self) -> impl Iterator<Item = u32> + '_ {
        self.questions.iter().map(|q| q.id)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TimerMode {
    Off,
    PerQuestion,
    Total,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize, Serialize)]
pub struct TimerConfig {
    pub mode: TimerMode,
    pub value: u32,
}

impl Default for TimerConfig {
    fn default() -> Self {
        TimerConfig {
            mode: TimerMode::PerQuestion,
            value: 60,
        }
    }
}

impl TimerConfig {
    pub fn off() -> Self {
        TimerConfig {
            mode: TimerMode::Off,
            value: 0,
        }
    }

    pub fn per_question(seconds: u32) -> Self {
        TimerConfig {
            mode: TimerMode::PerQuestion,
            value: seconds,
        }
    }

    pub fn total(minutes: u32) -> Self {
        TimerConfig {
            mode: TimerMode::Total,
            value: minutes,
        }
    }

    /// Whole-quiz countdown in seconds, `None` when there is no deadline.
    ///
    /// `PerQuestion` still yields one countdown for the whole attempt
    /// (`value * question_count`), it is not reset between questions.
    pub fn budget_seconds(&self, question_count: usize) -> Option<u32> {
        let budget = match self.mode {
            TimerMode::Off => return None,
            TimerMode::PerQuestion => self.value.saturating_mul(question_count as u32),
            TimerMode::Total => self.value.saturating_mul(60),
        };
        // a zero budget would auto-submit before the first tick
        (budget > 0).then_some(budget)
    }
}
