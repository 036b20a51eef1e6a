use std::sync::Arc;

use async_trait::async_trait;

use studymate::{
    app_state::AppState,
    config::Config,
    errors::{AppError, AppResult},
    models::domain::{FileData, Identity, Language, QuizQuestion, QuizSet, TimerConfig},
    models::dto::{
        quiz_dto::{parse_generated_quiz, GeneratedQuestionDto},
        response::{FinishReason, SessionState},
    },
    repositories::MemoryKvStore,
    services::{
        model_service::{DocumentIntelligence, StudySource},
        quiz_session_service::QuizSession,
        quiz_timer::Tick,
        study_service::Completion,
    },
};

fn quiz(count: u32) -> QuizSet {
    let questions = (1..=count)
        .map(|id| {
            QuizQuestion::new(
                id,
                &format!("Which organelle is #{}?", id),
                ["Nucleus", "Ribosome", "Mitochondrion", "Vacuole"],
                2,
                "It produces ATP.",
            )
        })
        .collect();
    QuizSet::new(questions).unwrap()
}

/// Answers the way a well-behaved model would, serialized and parsed
/// through the same path as real responses.
struct EchoProvider;

#[async_trait]
impl DocumentIntelligence for EchoProvider {
    async fn extract_text(&self, file: &FileData) -> AppResult<String> {
        Ok(format!("text of {}", file.name))
    }

    async fn summarize(&self, source: &StudySource, language: Language) -> AppResult<String> {
        match source {
            StudySource::Text(text) => Ok(format!("## {} ({})", text, language.code())),
            StudySource::File(file) => Ok(format!("## {} ({})", file.name, language.code())),
        }
    }

    async fn generate_quiz(
        &self,
        _source: &StudySource,
        count: u32,
        _language: Language,
    ) -> AppResult<QuizSet> {
        let dtos: Vec<GeneratedQuestionDto> =
            quiz(count).questions().iter().map(GeneratedQuestionDto::from).collect();
        let raw = format!("```json\n{}\n```", serde_json::to_string(&dtos).unwrap());
        parse_generated_quiz(&raw)
    }
}

fn app() -> AppState {
    let mut config = Config::from_env();
    config.default_question_count = 5;
    config.max_guest_summaries = 2;
    config.max_guest_questions = 10;
    AppState::with_store(config, Arc::new(MemoryKvStore::unbounded()))
}

#[test]
fn sixty_percent_quiz_from_the_walkthrough() {
    let mut session = QuizSession::new(quiz(5), TimerConfig::off()).unwrap();

    for (i, answer) in [2, 2, 2, 0, 0].into_iter().enumerate() {
        assert_eq!(session.pointer(), i);
        assert!(session.select_current(answer));
        session.next();
    }

    assert_eq!(session.state(), SessionState::FinishedSummary);
    assert_eq!(session.finish_reason(), Some(FinishReason::Completed));
    let score = session.score().unwrap();
    assert_eq!((score.correct, score.total), (3, 5));
    assert_eq!(score.percentage(), 60);
    assert!(score.passed());
}

#[test]
fn countdown_expiry_finishes_and_stale_ticks_are_ignored() {
    let mut session = QuizSession::new(quiz(2), TimerConfig::per_question(2)).unwrap();
    let first_attempt = session.attempt();
    assert_eq!(session.remaining_seconds(), Some(4));

    session.retake();
    assert_eq!(
        session.apply_tick(Tick {
            attempt: first_attempt
        }),
        SessionState::Active
    );
    assert_eq!(session.remaining_seconds(), Some(4));

    for _ in 0..4 {
        session.apply_tick(Tick {
            attempt: session.attempt(),
        });
    }
    assert_eq!(session.state(), SessionState::FinishedSummary);
    assert_eq!(session.finish_reason(), Some(FinishReason::TimeExpired));
    assert_eq!(session.score().unwrap().correct, 0);
}

#[test]
fn malformed_provider_quiz_is_rejected() {
    let raw = r#"[{"id":1,"question":"Q","options":["a","b","c"],"correctAnswerIndex":0,"explanation":"e"}]"#;
    let err = parse_generated_quiz(raw).unwrap_err();
    assert!(matches!(err, AppError::GenerationFailed(_)));

    let duplicate = r#"[
        {"id":1,"question":"Q1","options":["a","b","c","d"],"correctAnswerIndex":0,"explanation":"e"},
        {"id":1,"question":"Q2","options":["a","b","c","d"],"correctAnswerIndex":1,"explanation":"e"}
    ]"#;
    assert!(parse_generated_quiz(duplicate).is_err());
}

#[tokio::test]
async fn guest_flow_summarize_quiz_and_save() {
    let app = app();
    let service = app.study_service_with(Arc::new(EchoProvider));
    let mut workspace = app.load_workspace();
    workspace.sign_in(Identity::guest());
    workspace.set_language(Language::En);
    workspace.select_file(FileData::new(b"%PDF".to_vec(), "application/pdf", "cells.pdf"));

    let outcome = service.summarize(&mut workspace).await.unwrap();
    assert_eq!(outcome, Completion::Applied);
    assert_eq!(workspace.summary(), Some("## cells.pdf (en)"));

    let outcome = service.generate_quiz(&mut workspace).await.unwrap();
    assert_eq!(outcome, Completion::Applied);
    assert_eq!(workspace.quota().usage().questions_count, 5);

    let session = workspace.start_quiz_session().unwrap();
    assert_eq!(session.questions().len(), 5);

    service.save_to_history(&workspace).unwrap();
    let saved = app.history_service.list("guest").unwrap();
    assert_eq!(saved.len(), 1);
    assert_eq!(saved[0].file_name, "cells.pdf");
    assert!(saved[0].quiz.is_some());

    // 5 used + 6 requested exceeds the guest question limit
    workspace.set_question_count(6);
    let err = service.generate_quiz(&mut workspace).await.unwrap_err();
    assert_eq!(err.error_code(), "QUOTA_EXCEEDED");
}

#[tokio::test]
async fn guest_usage_survives_restart() {
    let app = app();
    let service = app.study_service_with(Arc::new(EchoProvider));
    let mut workspace = app.load_workspace();
    workspace.sign_in(Identity::guest());
    workspace.select_file(FileData::new(b"%PDF".to_vec(), "application/pdf", "cells.pdf"));
    workspace.use_edited_text("edited notes");

    service.summarize(&mut workspace).await.unwrap();
    service.summarize(&mut workspace).await.unwrap();
    assert!(app.save_workspace(&workspace).unwrap());

    let mut resumed = app.load_workspace();
    assert_eq!(resumed.quota().usage().summaries_count, 2);
    assert!(resumed.is_using_edited_text());
    assert!(service.summarize(&mut resumed).await.is_err());
}

#[tokio::test]
async fn guest_limit_holds_when_the_upload_does_not_fit_the_store() {
    let mut config = Config::from_env();
    config.max_guest_summaries = 2;
    let app = AppState::with_store(config, Arc::new(MemoryKvStore::with_capacity(5 * 1024 * 1024)));
    let service = app.study_service_with(Arc::new(EchoProvider));
    let upload = FileData::new(vec![b'%'; 4 * 1024 * 1024], "application/pdf", "textbook.pdf");

    let mut outcomes = Vec::new();
    for _ in 0..3 {
        let mut workspace = app.load_workspace();
        if workspace.user().is_none() {
            workspace.sign_in(Identity::guest());
        }
        if workspace.current_file() != Some(&upload) {
            workspace.select_file(upload.clone());
        }
        outcomes.push(service.summarize(&mut workspace).await.is_ok());
        app.save_workspace(&workspace).unwrap();
    }

    assert_eq!(outcomes, vec![true, true, false]);
    assert_eq!(app.load_workspace().quota().usage().summaries_count, 2);
}

#[tokio::test]
async fn members_are_not_limited() {
    let app = app();
    let service = app.study_service_with(Arc::new(EchoProvider));
    let mut workspace = app.load_workspace();
    workspace.sign_in(Identity::member("u-9", "Lee"));
    workspace.select_file(FileData::new(b"%PDF".to_vec(), "application/pdf", "cells.pdf"));
    workspace.set_question_count(25);

    for _ in 0..3 {
        service.summarize(&mut workspace).await.unwrap();
    }
    service.generate_quiz(&mut workspace).await.unwrap();
    assert_eq!(workspace.quiz().map(|q| q.len()), Some(25));
}
