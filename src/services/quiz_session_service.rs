use std::collections::BTreeMap;

use crate::errors::{AppError, AppResult};
use crate::models::domain::{QuizSet, TimerConfig};
use crate::models::dto::response::{
    FinishReason, QuizSessionSnapshot, ReviewEntry, Score, SessionState,
};
use crate::services::quiz_timer::Tick;

/// Question id to selected option index. Skipped questions have no entry.
pub type AnswerRecord = BTreeMap<u32, usize>;

/// State machine for one quiz attempt: navigation, countdown, scoring and
/// read-only review.
#[derive(Debug, Clone)]
pub struct QuizSession {
    questions: QuizSet,
    timer: TimerConfig,
    state: SessionState,
    pointer: usize,
    answers: AnswerRecord,
    remaining: Option<u32>,
    finish_reason: Option<FinishReason>,
    attempt: u64,
}

impl QuizSession {
    pub fn new(questions: QuizSet, timer: TimerConfig) -> AppResult<Self> {
        if questions.is_empty() {
            return Err(AppError::ValidationError(
                "A quiz needs at least one question".to_string(),
            ));
        }
        let remaining = timer.budget_seconds(questions.len());
        Ok(Self {
            questions,
            timer,
            state: SessionState::Active,
            pointer: 0,
            answers: AnswerRecord::new(),
            remaining,
            finish_reason: None,
            attempt: 0,
        })
    }

    /// Replaces the question set and restarts. An empty set is ignored.
    pub fn start(&mut self, questions: QuizSet, timer: TimerConfig) -> bool {
        if questions.is_empty() {
            log::warn!("Ignoring quiz start with an empty question set");
            return false;
        }
        self.questions = questions;
        self.timer = timer;
        self.reset();
        true
    }

    /// Same questions, fresh answers, full timer budget.
    pub fn retake(&mut self) {
        self.reset();
    }

    fn reset(&mut self) {
        self.state = SessionState::Active;
        self.pointer = 0;
        self.answers.clear();
        self.remaining = self.timer.budget_seconds(self.questions.len());
        self.finish_reason = None;
        self.attempt += 1;
    }

    /// Records an answer for the current question. Returns `false` when the
    /// session is finished or the selection does not fit the question.
    pub fn select_option(&mut self, question_id: u32, option_index: usize) -> bool {
        if self.state != SessionState::Active {
            return false;
        }
        let Some(current) = self.questions.get(self.pointer) else {
            return false;
        };
        if current.id != question_id || !current.has_option(option_index) {
            log::debug!(
                "Ignoring selection {} for question {} while on question {}",
                option_index,
                question_id,
                current.id
            );
            return false;
        }
        self.answers.insert(question_id, option_index);
        true
    }

    /// Selects an option on whichever question is showing.
    pub fn select_current(&mut self, option_index: usize) -> bool {
        match self.questions.get(self.pointer).map(|q| q.id) {
            Some(id) => self.select_option(id, option_index),
            None => false,
        }
    }

    /// One second of countdown. Reaching zero submits the quiz.
    pub fn tick(&mut self) -> SessionState {
        if self.state != SessionState::Active {
            return self.state;
        }
        if let Some(remaining) = self.remaining.as_mut() {
            *remaining = remaining.saturating_sub(1);
            if *remaining == 0 {
                self.finish_with(FinishReason::TimeExpired);
            }
        }
        self.state
    }

    /// Applies a timer tick, ignoring ticks issued for an earlier attempt.
    pub fn apply_tick(&mut self, tick: Tick) -> SessionState {
        if tick.attempt != self.attempt {
            log::debug!(
                "Dropping stale tick for attempt {} (current {})",
                tick.attempt,
                self.attempt
            );
            return self.state;
        }
        self.tick()
    }

    pub fn next(&mut self) -> SessionState {
        let last = self.questions.len() - 1;
        match self.state {
            SessionState::Active if self.pointer >= last => {
                self.finish_with(FinishReason::Completed)
            }
            _ if self.pointer < last => self.pointer += 1,
            _ => {}
        }
        self.state
    }

    pub fn previous(&mut self) {
        self.pointer = self.pointer.saturating_sub(1);
    }

    /// Manual submit from any question.
    pub fn finish(&mut self) {
        if self.state == SessionState::Active {
            self.finish_with(FinishReason::Submitted);
        }
    }

    fn finish_with(&mut self, reason: FinishReason) {
        self.state = SessionState::FinishedSummary;
        self.finish_reason = Some(reason);
    }

    pub fn enter_review(&mut self) -> bool {
        if self.state != SessionState::FinishedSummary {
            return false;
        }
        self.state = SessionState::FinishedReview;
        self.pointer = 0;
        true
    }

    pub fn exit_review(&mut self) -> bool {
        if self.state != SessionState::FinishedReview {
            return false;
        }
        self.state = SessionState::FinishedSummary;
        true
    }

    /// `None` while the quiz is still running.
    pub fn score(&self) -> Option<Score> {
        if !self.state.is_finished() {
            return None;
        }
        let correct = self
            .questions
            .questions()
            .iter()
            .filter(|q| q.is_correct(self.answers.get(&q.id).copied()))
            .count();
        Some(Score {
            correct,
            total: self.questions.len(),
        })
    }

    pub fn review_entry(&self, index: usize) -> Option<ReviewEntry<'_>> {
        if !self.state.is_finished() {
            return None;
        }
        let question = self.questions.get(index)?;
        let selected = self.answers.get(&question.id).copied();
        Some(ReviewEntry {
            question,
            selected,
            is_correct: question.is_correct(selected),
        })
    }

    pub fn review_entries(&self) -> Vec<ReviewEntry<'_>> {
        (0..self.questions.len())
            .filter_map(|i| self.review_entry(i))
            .collect()
    }

    pub fn snapshot(&self) -> QuizSessionSnapshot {
        QuizSessionSnapshot {
            state: self.state,
            pointer: self.pointer,
            total: self.questions.len(),
            remaining_seconds: self.remaining,
            answered: self
                .questions
                .ids()
                .map(|id| self.answers.contains_key(&id))
                .collect(),
            score: self.score(),
            finish_reason: self.finish_reason,
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn pointer(&self) -> usize {
        self.pointer
    }

    pub fn remaining_seconds(&self) -> Option<u32> {
        self.remaining
    }

    pub fn has_timer(&self) -> bool {
        self.remaining.is_some()
    }

    pub fn answers(&self) -> &AnswerRecord {
        &self.answers
    }

    pub fn questions(&self) -> &QuizSet {
        &self.questions
    }

    pub fn finish_reason(&self) -> Option<FinishReason> {
        self.finish_reason
    }

    /// Epoch of the current attempt, bumped by `start` and `retake`.
    pub fn attempt(&self) -> u64 {
        self.attempt
    }

    pub fn current_selection(&self) -> Option<usize> {
        let question = self.questions.get(self.pointer)?;
        self.answers.get(&question.id).copied()
    }
}

/// `m:ss` countdown display.
pub fn format_clock(seconds: u32) -> String {
    format!("{}:{:02}", seconds / 60, seconds % 60)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::fixtures::sample_quiz_set;

    fn session(count: usize, timer: TimerConfig) -> QuizSession {
        QuizSession::new(sample_quiz_set(count), timer).expect("non-empty set")
    }

    fn answer_current(session: &mut QuizSession, correct: bool) {
        let question = session.questions().get(session.pointer()).expect("pointer is valid").clone();
        let choice = if correct {
            question.correct_answer_index
        } else {
            (question.correct_answer_index + 1) % question.options.len()
        };
        assert!(session.select_option(question.id, choice));
    }

    #[test]
    fn new_rejects_empty_set() {
        let result = QuizSession::new(QuizSet::default(), TimerConfig::off());
        assert!(result.is_err());
    }

    #[test]
    fn start_with_empty_set_is_a_no_op() {
        let mut s = session(3, TimerConfig::off());
        s.next();
        assert!(!s.start(QuizSet::default(), TimerConfig::off()));

        assert_eq!(s.pointer(), 1);
        assert_eq!(s.questions().len(), 3);
    }

    #[test]
    fn initial_state_is_active_with_budget() {
        let s = session(5, TimerConfig::per_question(60));

        assert_eq!(s.state(), SessionState::Active);
        assert_eq!(s.pointer(), 0);
        assert!(s.answers().is_empty());
        assert_eq!(s.remaining_seconds(), Some(300));
        assert!(s.score().is_none());
    }

    #[test]
    fn pointer_stays_in_bounds_under_any_navigation() {
        let mut s = session(3, TimerConfig::off());
        for step in 0..20 {
            if step % 3 == 0 {
                s.next();
            } else {
                s.previous();
            }
            assert!(s.pointer() < 3);
        }

        s.finish();
        s.enter_review();
        for _ in 0..10 {
            s.next();
            assert!(s.pointer() < 3);
        }
        for _ in 0..10 {
            s.previous();
        }
        assert_eq!(s.pointer(), 0);
    }

    #[test]
    fn next_on_last_question_finishes() {
        let mut s = session(3, TimerConfig::off());

        assert_eq!(s.next(), SessionState::Active);
        assert_eq!(s.next(), SessionState::Active);
        assert_eq!(s.pointer(), 2);
        assert_eq!(s.next(), SessionState::FinishedSummary);
        assert_eq!(s.finish_reason(), Some(FinishReason::Completed));
        assert_eq!(s.pointer(), 2);
    }

    #[test]
    fn previous_at_start_is_a_no_op() {
        let mut s = session(2, TimerConfig::off());
        s.previous();
        assert_eq!(s.pointer(), 0);
        assert_eq!(s.state(), SessionState::Active);
    }

    #[test]
    fn selecting_overwrites_previous_answer() {
        let mut s = session(2, TimerConfig::off());
        let id = s.questions().get(0).expect("first").id;

        assert!(s.select_option(id, 0));
        assert!(s.select_option(id, 2));
        assert_eq!(s.answers().get(&id), Some(&2));
        assert_eq!(s.current_selection(), Some(2));
    }

    #[test]
    fn selection_for_other_question_or_bad_index_is_ignored() {
        let mut s = session(2, TimerConfig::off());
        let second = s.questions().get(1).expect("second").id;
        let first = s.questions().get(0).expect("first").id;

        assert!(!s.select_option(second, 0));
        assert!(!s.select_option(first, 4));
        assert!(s.answers().is_empty());
    }

    #[test]
    fn selection_after_finish_does_not_mutate_answers() {
        let mut s = session(2, TimerConfig::off());
        answer_current(&mut s, true);
        s.finish();
        let before = s.answers().clone();

        assert!(!s.select_current(3));
        s.enter_review();
        assert!(!s.select_current(3));
        assert_eq!(s.answers(), &before);
    }

    #[test]
    fn score_is_stable_across_review() {
        let mut s = session(4, TimerConfig::off());
        answer_current(&mut s, true);
        s.next();
        answer_current(&mut s, false);
        s.finish();
        let score = s.score().expect("finished");

        assert!(s.enter_review());
        assert_eq!(s.pointer(), 0);
        s.next();
        s.next();
        assert_eq!(s.score(), Some(score));
        assert!(s.exit_review());
        assert_eq!(s.state(), SessionState::FinishedSummary);
        assert_eq!(s.score(), Some(score));
        assert_eq!(score, Score { correct: 1, total: 4 });
    }

    #[test]
    fn review_only_from_summary() {
        let mut s = session(2, TimerConfig::off());
        assert!(!s.enter_review());
        assert!(!s.exit_review());
        s.finish();
        assert!(s.enter_review());
        assert!(!s.enter_review());
    }

    #[test]
    fn next_in_review_never_leaves_review() {
        let mut s = session(2, TimerConfig::off());
        s.finish();
        s.enter_review();

        s.next();
        assert_eq!(s.next(), SessionState::FinishedReview);
        assert_eq!(s.pointer(), 1);
    }

    #[test]
    fn exhausting_timer_auto_finishes() {
        let mut s = session(2, TimerConfig::per_question(3));
        let budget = s.remaining_seconds().expect("timer configured");

        for _ in 0..budget {
            s.tick();
        }
        assert_eq!(s.state(), SessionState::FinishedSummary);
        assert_eq!(s.remaining_seconds(), Some(0));
        assert_eq!(s.finish_reason(), Some(FinishReason::TimeExpired));

        s.tick();
        assert_eq!(s.remaining_seconds(), Some(0));
    }

    #[test]
    fn tick_without_timer_changes_nothing() {
        let mut s = session(2, TimerConfig::off());
        for _ in 0..1000 {
            s.tick();
        }
        assert_eq!(s.state(), SessionState::Active);
        assert_eq!(s.remaining_seconds(), None);
    }

    #[test]
    fn timed_scenario_scores_sixty_percent() {
        let mut s = session(5, TimerConfig::per_question(60));
        assert_eq!(s.remaining_seconds(), Some(300));

        for _ in 0..3 {
            answer_current(&mut s, true);
            s.next();
        }
        for _ in 0..300 {
            s.tick();
        }

        let score = s.score().expect("auto-finished");
        assert_eq!(s.state(), SessionState::FinishedSummary);
        assert_eq!(score, Score { correct: 3, total: 5 });
        assert_eq!(score.percentage(), 60);
    }

    #[test]
    fn stale_tick_is_ignored() {
        let mut s = session(1, TimerConfig::per_question(10));
        let old = Tick { attempt: s.attempt() };
        s.finish();
        s.retake();

        s.apply_tick(old);
        assert_eq!(s.remaining_seconds(), Some(10));

        s.apply_tick(Tick { attempt: s.attempt() });
        assert_eq!(s.remaining_seconds(), Some(9));
    }

    #[test]
    fn retake_resets_answers_and_keeps_questions() {
        let mut s = session(3, TimerConfig::total(1));
        let ids: Vec<u32> = s.questions().ids().collect();
        answer_current(&mut s, true);
        s.next();
        answer_current(&mut s, false);
        s.tick();
        s.finish();

        s.retake();
        assert_eq!(s.state(), SessionState::Active);
        assert!(s.answers().is_empty());
        assert_eq!(s.pointer(), 0);
        assert_eq!(s.remaining_seconds(), Some(60));
        assert_eq!(s.questions().ids().collect::<Vec<_>>(), ids);
        assert!(s.finish_reason().is_none());
    }

    #[test]
    fn snapshot_reports_answered_flags() {
        let mut s = session(3, TimerConfig::off());
        s.next();
        answer_current(&mut s, true);

        let snap = s.snapshot();
        assert_eq!(snap.answered, vec![false, true, false]);
        assert_eq!(snap.pointer, 1);
        assert!(snap.score.is_none());

        s.finish();
        let snap = s.snapshot();
        assert_eq!(snap.score, Some(Score { correct: 1, total: 3 }));
        assert_eq!(snap.finish_reason, Some(FinishReason::Submitted));
    }

    #[test]
    fn review_entries_mark_skipped_as_incorrect() {
        let mut s = session(2, TimerConfig::off());
        answer_current(&mut s, true);
        assert!(s.review_entries().is_empty());
        s.finish();

        let entries = s.review_entries();
        assert_eq!(entries.len(), 2);
        assert!(entries[0].is_correct);
        assert_eq!(entries[1].selected, None);
        assert!(!entries[1].is_correct);
    }

    #[test]
    fn format_clock_pads_seconds() {
        assert_eq!(format_clock(300), "5:00");
        assert_eq!(format_clock(65), "1:05");
        assert_eq!(format_clock(9), "0:09");
    }
}
