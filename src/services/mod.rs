pub mod guest_quota_service;
pub mod history_service;
pub mod model_service;
pub mod quiz_session_service;
pub mod quiz_timer;
pub mod study_service;
