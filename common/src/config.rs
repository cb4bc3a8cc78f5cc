//! Global application configuration.
//!
//! `AppConfig` is a lazily initialized singleton loaded from `.env` and the
//! process environment. Every value has a default except the OpenAI key,
//! which is only required once a real model call is made.

use once_cell::sync::OnceCell;
use std::env;

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub project_name: String,
    pub log_level: String,
    pub log_file: String,
    pub log_to_stdout: bool,
    /// SQLite file path or a full DSN (`sqlite:`, `postgres://`, ...).
    pub database_path: String,
    pub openai_api_key: String,
    pub openai_api_base: String,
    /// First model tried for every grading request.
    pub primary_model: String,
    /// Tried once if the primary fails. Blank disables the fallback.
    pub fallback_model: String,
    /// Grading requests a `free` plan user gets per calendar day.
    pub free_daily_limit: i32,
    pub model_timeout_secs: u64,
}

static CONFIG: OnceCell<AppConfig> = OnceCell::new();

impl AppConfig {
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();

        Self {
            project_name: env::var("PROJECT_NAME").unwrap_or_else(|_| "aigrader".into()),
            log_level: env::var("LOG_LEVEL").unwrap_or_else(|_| "info".into()),
            log_file: env::var("LOG_FILE").unwrap_or_else(|_| "logs/aigrader.log".into()),
            log_to_stdout: env::var("LOG_TO_STDOUT").unwrap_or_else(|_| "true".into()) == "true",
            database_path: env::var("DATABASE_PATH").unwrap_or_else(|_| "data/aigrader.db".into()),
            openai_api_key: env::var("OPENAI_API_KEY").unwrap_or_default(),
            openai_api_base: env::var("OPENAI_API_BASE")
                .unwrap_or_else(|_| "https://api.openai.com/v1".into()),
            primary_model: env::var("OPENAI_PRIMARY_MODEL").unwrap_or_else(|_| "gpt-4o".into()),
            fallback_model: env::var("OPENAI_FALLBACK_MODEL")
                .unwrap_or_else(|_| "gpt-4o-mini".into()),
            free_daily_limit: env::var("FREE_DAILY_LIMIT")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(5),
            model_timeout_secs: env::var("MODEL_TIMEOUT_SECS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(60),
        }
    }

    /// Returns the global configuration, loading it on first access.
    pub fn global() -> &'static Self {
        CONFIG.get_or_init(AppConfig::from_env)
    }
}
