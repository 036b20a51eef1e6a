use std::sync::Arc;

use crate::{
    errors::{AppError, AppResult},
    models::domain::{
        FileData, HistoryItem, Identity, Language, QuizSet, SessionSnapshot, TimerConfig,
        ViewState,
    },
    services::{
        guest_quota_service::{Admission, GenerationKind, GuestQuotaGate, QuotaLimits},
        history_service::{HistoryService, SaveOutcome},
        model_service::{DocumentIntelligence, StudySource},
        quiz_session_service::QuizSession,
    },
};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RequestKind {
    Extract,
    Summary,
    Quiz,
}

impl RequestKind {
    fn quota_kind(&self) -> Option<GenerationKind> {
        match self {
            RequestKind::Extract => None,
            RequestKind::Summary => Some(GenerationKind::Summary),
            RequestKind::Quiz => Some(GenerationKind::Quiz),
        }
    }
}

/// Identifies one outstanding provider call. Only the latest ticket may
/// complete; anything older is a stale response.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct GenerationTicket {
    id: u64,
    pub kind: RequestKind,
    pub cost: u32,
}

/// Everything needed to make the provider call for a ticket.
#[derive(Debug, Clone)]
pub struct PendingRequest {
    pub ticket: GenerationTicket,
    pub source: StudySource,
    pub language: Language,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Completion {
    Applied,
    Discarded,
    Failed(AppError),
}

fn failure_message(language: Language) -> &'static str {
    match language {
        Language::Ar => "فشل في معالجة الطلب. يرجى المحاولة مرة أخرى.",
        Language::En => "Failed to process request. Please try again.",
    }
}

/// The study session owned by the front end: identity, uploaded content,
/// generated artifacts, settings and the current screen.
#[derive(Debug, Clone)]
pub struct StudyWorkspace {
    user: Option<Identity>,
    quota: GuestQuotaGate,
    current_file: Option<FileData>,
    extracted_text: String,
    is_using_edited_text: bool,
    language: Language,
    question_count: u32,
    timer: TimerConfig,
    summary: Option<String>,
    quiz: Option<QuizSet>,
    view: ViewState,
    error_message: Option<String>,
    pending: Option<GenerationTicket>,
    next_ticket: u64,
}

impl StudyWorkspace {
    pub fn new(limits: QuotaLimits, question_count: u32) -> Self {
        Self {
            user: None,
            quota: GuestQuotaGate::new(limits, Default::default()),
            current_file: None,
            extracted_text: String::new(),
            is_using_edited_text: false,
            language: Language::default(),
            question_count,
            timer: TimerConfig::default(),
            summary: None,
            quiz: None,
            view: ViewState::Idle,
            error_message: None,
            pending: None,
            next_ticket: 0,
        }
    }

    pub fn sign_in(&mut self, identity: Identity) {
        log::info!("Signed in as {}", identity.id);
        self.user = Some(identity);
        self.view = ViewState::Idle;
    }

    /// Signs in `identity`, starting a fresh session only when it is a
    /// different account. Returns `true` when the previous session was
    /// dropped.
    pub fn switch_identity(&mut self, identity: Identity) -> bool {
        let dropped = match &self.user {
            Some(current) if current.same_account(&identity) => false,
            Some(_) => {
                self.logout();
                true
            }
            None => false,
        };
        self.user = Some(identity);
        dropped
    }

    /// Drops the identity and content; a later guest starts with fresh quota.
    pub fn logout(&mut self) {
        self.user = None;
        self.reset();
        self.quota.reset();
    }

    pub fn select_file(&mut self, file: FileData) {
        self.current_file = Some(file);
        self.is_using_edited_text = false;
        self.extracted_text.clear();
        self.error_message = None;
        self.view = ViewState::Idle;
    }

    /// Clears the uploaded content and any outstanding request.
    pub fn reset(&mut self) {
        self.current_file = None;
        self.extracted_text.clear();
        self.is_using_edited_text = false;
        self.summary = None;
        self.quiz = None;
        self.error_message = None;
        self.pending = None;
        self.view = ViewState::Idle;
    }

    /// Leaving a screen abandons any outstanding request.
    pub fn back_to_menu(&mut self) {
        if self.pending.take().is_some() {
            log::debug!("Abandoning outstanding generation request");
        }
        self.view = ViewState::Idle;
    }

    pub fn open_quiz_config(&mut self) {
        self.view = ViewState::QuizConfig;
    }

    pub fn open_history(&mut self) {
        self.view = ViewState::HistoryView;
    }

    pub fn set_language(&mut self, language: Language) {
        self.language = language;
    }

    pub fn set_question_count(&mut self, count: u32) {
        self.question_count = count.max(1);
    }

    pub fn set_timer(&mut self, timer: TimerConfig) {
        self.timer = timer;
    }

    /// Opens the editor directly when text was already extracted.
    pub fn open_editor(&mut self) -> bool {
        if self.extracted_text.is_empty() {
            return false;
        }
        self.view = ViewState::EditText;
        true
    }

    pub fn use_edited_text(&mut self, text: &str) {
        self.extracted_text = text.to_string();
        self.is_using_edited_text = true;
        self.view = ViewState::Idle;
    }

    pub fn cancel_edit(&mut self) {
        if !self.is_using_edited_text {
            self.extracted_text.clear();
        }
        self.view = ViewState::Idle;
    }

    fn source(&self) -> Option<StudySource> {
        if self.is_using_edited_text && !self.extracted_text.is_empty() {
            return Some(StudySource::Text(self.extracted_text.clone()));
        }
        self.current_file.clone().map(StudySource::File)
    }

    /// Admits a generation request and enters `Processing`.
    ///
    /// A quota denial is returned before anything changes.
    pub fn begin_generation(&mut self, kind: RequestKind) -> AppResult<PendingRequest> {
        let identity = self
            .user
            .as_ref()
            .ok_or_else(|| AppError::ValidationError("Sign in or continue as guest first".to_string()))?;

        let source = match kind {
            RequestKind::Extract => self.current_file.clone().map(StudySource::File),
            _ => self.source(),
        }
        .ok_or_else(|| AppError::ValidationError("Upload a file first".to_string()))?;

        let cost = match kind {
            RequestKind::Quiz => self.question_count,
            _ => 1,
        };
        if let Some(quota_kind) = kind.quota_kind() {
            if let Admission::Denied(limit) = self.quota.check_allowed(identity, quota_kind, cost) {
                return Err(AppError::QuotaExceeded(limit));
            }
        }

        self.next_ticket += 1;
        let ticket = GenerationTicket {
            id: self.next_ticket,
            kind,
            cost,
        };
        self.pending = Some(ticket);
        self.error_message = None;
        self.view = ViewState::Processing;

        Ok(PendingRequest {
            ticket,
            source,
            language: self.language,
        })
    }

    fn accept(&mut self, ticket: GenerationTicket) -> bool {
        if self.pending != Some(ticket) {
            log::info!("Discarding stale {:?} response", ticket.kind);
            return false;
        }
        self.pending = None;
        true
    }

    fn fail(&mut self, err: AppError) -> Completion {
        log::error!("Generation failed: {}", err);
        self.error_message = Some(failure_message(self.language).to_string());
        self.view = ViewState::Error;
        Completion::Failed(err)
    }

    pub fn complete_extraction(&mut self, ticket: GenerationTicket, result: AppResult<String>) -> Completion {
        if !self.accept(ticket) {
            return Completion::Discarded;
        }
        match result {
            Ok(text) => {
                self.extracted_text = text;
                self.view = ViewState::EditText;
                Completion::Applied
            }
            Err(err) => self.fail(err),
        }
    }

    pub fn complete_summary(&mut self, ticket: GenerationTicket, result: AppResult<String>) -> Completion {
        if !self.accept(ticket) {
            return Completion::Discarded;
        }
        match result {
            Ok(summary) => {
                self.record_usage(ticket);
                self.summary = Some(summary);
                self.view = ViewState::SummaryView;
                Completion::Applied
            }
            Err(err) => self.fail(err),
        }
    }

    pub fn complete_quiz(&mut self, ticket: GenerationTicket, result: AppResult<QuizSet>) -> Completion {
        if !self.accept(ticket) {
            return Completion::Discarded;
        }
        match result {
            Ok(quiz) if quiz.is_empty() => self.fail(AppError::GenerationFailed(
                "Quiz response contained no questions".to_string(),
            )),
            Ok(quiz) => {
                self.record_usage(ticket);
                self.quiz = Some(quiz);
                self.view = ViewState::QuizView;
                Completion::Applied
            }
            Err(err) => self.fail(err),
        }
    }

    fn record_usage(&mut self, ticket: GenerationTicket) {
        if let (Some(user), Some(kind)) = (self.user.as_ref(), ticket.kind.quota_kind()) {
            self.quota.record(user, kind, ticket.cost);
        }
    }

    pub fn start_quiz_session(&mut self) -> AppResult<QuizSession> {
        let quiz = self
            .quiz
            .clone()
            .ok_or_else(|| AppError::NotFound("No quiz has been generated yet".to_string()))?;
        let session = QuizSession::new(quiz, self.timer)?;
        self.view = ViewState::QuizView;
        Ok(session)
    }

    /// Builds a history entry from the current artifacts.
    pub fn history_item(&self) -> AppResult<HistoryItem> {
        let user = self
            .user
            .as_ref()
            .ok_or_else(|| AppError::ValidationError("Sign in to save history".to_string()))?;
        let file = self
            .current_file
            .clone()
            .ok_or_else(|| AppError::ValidationError("Nothing to save yet".to_string()))?;
        Ok(HistoryItem::new(
            &user.id,
            file,
            &self.extracted_text,
            self.summary.as_deref(),
            self.quiz.as_ref(),
            self.language,
        ))
    }

    pub fn load_history_item(&mut self, item: HistoryItem) {
        self.is_using_edited_text = !item.extracted_text.is_empty();
        self.current_file = Some(item.file_data);
        self.extracted_text = item.extracted_text;
        self.summary = item.summary;
        self.quiz = item.quiz;
        self.language = item.language;
        self.pending = None;
        self.view = ViewState::Idle;
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            user: self.user.clone(),
            guest_usage: self.quota.usage(),
            current_file: self.current_file.clone(),
            extracted_text: self.extracted_text.clone(),
            is_using_edited_text: self.is_using_edited_text,
            language: self.language,
            question_count: self.question_count,
            timer: self.timer,
            summary: self.summary.clone(),
            quiz: self.quiz.clone(),
            view: self.view,
        }
    }

    /// A snapshot taken mid-request comes back as `Idle`; the request
    /// itself is gone.
    pub fn restore(limits: QuotaLimits, snapshot: SessionSnapshot) -> Self {
        let view = match snapshot.view {
            ViewState::Processing => ViewState::Idle,
            other => other,
        };
        let mut workspace = Self::new(limits, snapshot.question_count.max(1));
        workspace.user = snapshot.user;
        workspace.quota = GuestQuotaGate::new(limits, snapshot.guest_usage);
        workspace.current_file = snapshot.current_file;
        workspace.extracted_text = snapshot.extracted_text;
        workspace.is_using_edited_text = snapshot.is_using_edited_text;
        workspace.language = snapshot.language;
        workspace.timer = snapshot.timer;
        workspace.summary = snapshot.summary;
        workspace.quiz = snapshot.quiz;
        workspace.view = view;
        workspace
    }

    pub fn user(&self) -> Option<&Identity> {
        self.user.as_ref()
    }

    pub fn quota(&self) -> &GuestQuotaGate {
        &self.quota
    }

    pub fn current_file(&self) -> Option<&FileData> {
        self.current_file.as_ref()
    }

    pub fn extracted_text(&self) -> &str {
        &self.extracted_text
    }

    pub fn is_using_edited_text(&self) -> bool {
        self.is_using_edited_text
    }

    pub fn language(&self) -> Language {
        self.language
    }

    pub fn question_count(&self) -> u32 {
        self.question_count
    }

    pub fn timer(&self) -> TimerConfig {
        self.timer
    }

    pub fn summary(&self) -> Option<&str> {
        self.summary.as_deref()
    }

    pub fn quiz(&self) -> Option<&QuizSet> {
        self.quiz.as_ref()
    }

    pub fn view(&self) -> ViewState {
        self.view
    }

    pub fn error_message(&self) -> Option<&str> {
        self.error_message.as_deref()
    }

    pub fn is_processing(&self) -> bool {
        self.pending.is_some()
    }
}

/// Runs provider calls against a workspace and saves results to history.
pub struct StudyService {
    provider: Arc<dyn DocumentIntelligence>,
    history: Arc<HistoryService>,
}

impl StudyService {
    pub fn new(provider: Arc<dyn DocumentIntelligence>, history: Arc<HistoryService>) -> Self {
        Self { provider, history }
    }

    /// Extracts text for the editor, reusing earlier extraction.
    pub async fn extract_text(&self, workspace: &mut StudyWorkspace) -> AppResult<Completion> {
        if workspace.open_editor() {
            return Ok(Completion::Applied);
        }
        let request = workspace.begin_generation(RequestKind::Extract)?;
        let result = match &request.source {
            StudySource::File(file) => self.provider.extract_text(file).await,
            StudySource::Text(text) => Ok(text.clone()),
        };
        Ok(workspace.complete_extraction(request.ticket, result))
    }

    pub async fn summarize(&self, workspace: &mut StudyWorkspace) -> AppResult<Completion> {
        let request = workspace.begin_generation(RequestKind::Summary)?;
        let result = self.provider.summarize(&request.source, request.language).await;
        Ok(workspace.complete_summary(request.ticket, result))
    }

    pub async fn generate_quiz(&self, workspace: &mut StudyWorkspace) -> AppResult<Completion> {
        let request = workspace.begin_generation(RequestKind::Quiz)?;
        let result = self
            .provider
            .generate_quiz(&request.source, request.ticket.cost, request.language)
            .await;
        Ok(workspace.complete_quiz(request.ticket, result))
    }

    pub fn save_to_history(&self, workspace: &StudyWorkspace) -> AppResult<SaveOutcome> {
        let item = workspace.history_item()?;
        self.history.save(item)
    }

    pub fn history(&self) -> &HistoryService {
        &self.history
    }
}
