use std::env;
use std::path::PathBuf;

use secrecy::{ExposeSecret, SecretString};

use crate::errors::{AppError, AppResult};

const MIB: usize = 1024 * 1024;

#[derive(Clone, Debug)]
pub struct Config {
    pub gemini_api_key: SecretString,
    pub gemini_model: String,
    pub gemini_base_url: String,
    pub storage_dir: PathBuf,
    pub storage_capacity_bytes: usize,
    pub max_guest_summaries: u32,
    pub max_guest_questions: u32,
    pub max_upload_bytes: usize,
    pub default_question_count: u32,
    pub request_timeout_secs: u64,
}

fn env_or<T: std::str::FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

impl Config {
    pub fn from_env() -> Self {
        Self {
            gemini_api_key: SecretString::from(env::var("GEMINI_API_KEY").unwrap_or_default()),
            gemini_model: env::var("GEMINI_MODEL")
                .unwrap_or_else(|_| "gemini-2.5-flash".to_string()),
            gemini_base_url: env::var("GEMINI_BASE_URL").unwrap_or_else(|_| {
                "https://generativelanguage.googleapis.com/v1beta".to_string()
            }),
            storage_dir: env::var("STUDYMATE_STORAGE_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from(".studymate")),
            storage_capacity_bytes: env_or("STUDYMATE_STORAGE_CAPACITY_BYTES", 5 * MIB),
            max_guest_summaries: env_or("STUDYMATE_MAX_GUEST_SUMMARIES", 2),
            max_guest_questions: env_or("STUDYMATE_MAX_GUEST_QUESTIONS", 10),
            max_upload_bytes: env_or("STUDYMATE_MAX_UPLOAD_BYTES", 10 * MIB),
            default_question_count: env_or("STUDYMATE_DEFAULT_QUESTION_COUNT", 10),
            request_timeout_secs: env_or("STUDYMATE_REQUEST_TIMEOUT_SECS", 120),
        }
    }

    /// Checks the limits that every command relies on.
    pub fn validate(&self) -> AppResult<()> {
        if self.storage_capacity_bytes == 0 {
            return Err(AppError::ConfigError(
                "STUDYMATE_STORAGE_CAPACITY_BYTES must be greater than zero".to_string(),
            ));
        }
        if self.max_upload_bytes == 0 {
            return Err(AppError::ConfigError(
                "STUDYMATE_MAX_UPLOAD_BYTES must be greater than zero".to_string(),
            ));
        }
        if self.max_guest_summaries == 0 || self.max_guest_questions == 0 {
            return Err(AppError::ConfigError(
                "STUDYMATE_MAX_GUEST_SUMMARIES and STUDYMATE_MAX_GUEST_QUESTIONS must be greater than zero"
                    .to_string(),
            ));
        }
        if self.default_question_count == 0 {
            return Err(AppError::ConfigError(
                "STUDYMATE_DEFAULT_QUESTION_COUNT must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }

    /// Required before any call to the document provider.
    pub fn validate_provider(&self) -> AppResult<()> {
        if self.gemini_api_key.expose_secret().trim().is_empty() {
            return Err(AppError::ConfigError(
                "GEMINI_API_KEY is missing. Set it in the environment or a .env file.".to_string(),
            ));
        }
        Ok(())
    }

    #[cfg(test)]
    pub fn test_config() -> Self {
        Self {
            gemini_api_key: SecretString::from("test_api_key".to_string()),
            gemini_model: "gemini-test".to_string(),
            gemini_base_url: "http://127.0.0.1:9".to_string(),
            storage_dir: PathBuf::from("target/studymate-test"),
            storage_capacity_bytes: 64 * 1024,
            max_guest_summaries: 2,
            max_guest_questions: 10,
            max_upload_bytes: MIB,
            default_question_count: 5,
            request_timeout_secs: 5,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_from_env_with_defaults() {
        let config = Config::from_env();

        assert!(!config.gemini_model.is_empty());
        assert!(config.storage_capacity_bytes > 0);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_test_config() {
        let config = Config::test_config();

        assert_eq!(config.max_guest_summaries, 2);
        assert_eq!(config.max_guest_questions, 10);
        assert!(config.validate_provider().is_ok());
    }

    #[test]
    fn test_validate_rejects_zero_capacity() {
        let mut config = Config::test_config();
        config.storage_capacity_bytes = 0;

        let err = config.validate().unwrap_err();
        assert_eq!(err.error_code(), "CONFIG_ERROR");
    }

    #[test]
    fn test_validate_rejects_zero_guest_limits() {
        let mut config = Config::test_config();
        config.max_guest_questions = 0;
        assert_eq!(config.validate().unwrap_err().error_code(), "CONFIG_ERROR");

        let mut config = Config::test_config();
        config.max_guest_summaries = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_provider_rejects_blank_key() {
        let mut config = Config::test_config();
        config.gemini_api_key = SecretString::from("  ".to_string());

        assert!(config.validate_provider().is_err());
    }
}
