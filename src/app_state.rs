use std::sync::Arc;

use crate::{
    config::Config,
    errors::{AppError, AppResult},
    models::domain::SessionSnapshot,
    repositories::{FileKvStore, KeyValueStore, KvHistoryRepository, SessionRepository},
    services::{
        guest_quota_service::QuotaLimits,
        history_service::HistoryService,
        model_service::{DocumentIntelligence, GeminiModelService},
        study_service::{StudyService, StudyWorkspace},
    },
};

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub history_service: Arc<HistoryService>,
    pub session_repository: Arc<SessionRepository>,
}

impl AppState {
    /// Opens the on-disk store under `config.storage_dir`.
    pub fn new(config: Config) -> AppResult<Self> {
        config.validate()?;
        let store = FileKvStore::open(&config.storage_dir, config.storage_capacity_bytes)?;
        Ok(Self::with_store(config, Arc::new(store)))
    }

    pub fn with_store(config: Config, store: Arc<dyn KeyValueStore>) -> Self {
        let history_repository = Arc::new(KvHistoryRepository::new(store.clone()));
        let history_service = Arc::new(HistoryService::new(history_repository));
        let session_repository = Arc::new(SessionRepository::new(store));

        Self {
            history_service,
            session_repository,
            config: Arc::new(config),
        }
    }

    /// The provider is only built when a command needs it, so history
    /// commands work without an API key.
    pub fn study_service(&self) -> AppResult<StudyService> {
        let provider = GeminiModelService::new(&self.config)?;
        Ok(self.study_service_with(Arc::new(provider)))
    }

    pub fn study_service_with(&self, provider: Arc<dyn DocumentIntelligence>) -> StudyService {
        StudyService::new(provider, self.history_service.clone())
    }

    pub fn quota_limits(&self) -> QuotaLimits {
        QuotaLimits::from(self.config.as_ref())
    }

    /// Resumes the saved workspace, or starts a fresh one. Guest usage is
    /// read from its own record, which wins over the snapshot's copy.
    pub fn load_workspace(&self) -> StudyWorkspace {
        let mut snapshot = self
            .session_repository
            .restore()
            .unwrap_or_else(|| SessionSnapshot {
                question_count: self.config.default_question_count,
                ..Default::default()
            });
        if let Some(usage) = self.session_repository.restore_usage() {
            snapshot.guest_usage = usage;
        }
        StudyWorkspace::restore(self.quota_limits(), snapshot)
    }

    /// Usage is written first and must land; the snapshot itself is best
    /// effort, reported by the returned flag.
    pub fn save_workspace(&self, workspace: &StudyWorkspace) -> AppResult<bool> {
        self.session_repository
            .save_usage(&workspace.quota().usage())
            .map_err(|e| {
                log::error!("Guest usage not saved: {}", e);
                AppError::from(e)
            })?;
        Ok(self.session_repository.save(&workspace.snapshot()))
    }
}
