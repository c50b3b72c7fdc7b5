//! Pre-flight checks before expensive operations.
//!
//! Validates that required keys and configuration are available
//! before starting operations that would otherwise fail midway.

use crate::config::{Settings, StorageBackend};
use crate::error::{Result, TubesageError};

/// Requirements for different operations.
#[derive(Debug, Clone, Copy)]
pub enum Operation {
    /// Processing needs both API keys and a usable store.
    Process,
    /// Asking questions needs the OpenAI key and a usable store.
    Ask,
}

/// Run pre-flight checks for the given operation.
///
/// Returns Ok(()) if all checks pass, or an error describing what's missing.
pub fn check(operation: Operation, settings: &Settings) -> Result<()> {
    check_with(operation, settings, |key| std::env::var(key).ok())
}

fn check_with<F>(operation: Operation, settings: &Settings, env: F) -> Result<()>
where
    F: Fn(&str) -> Option<String>,
{
    check_openai_key(env("OPENAI_API_KEY"))?;
    if let Operation::Process = operation {
        check_youtube_key(settings)?;
    }
    check_storage(settings)
}

/// Check if OpenAI API key is configured.
fn check_openai_key(value: Option<String>) -> Result<()> {
    match value {
        Some(key) if !key.is_empty() => Ok(()),
        Some(_) => Err(TubesageError::Config(
            "OPENAI_API_KEY is empty. Set it with: export OPENAI_API_KEY='sk-...'".to_string(),
        )),
        None => Err(TubesageError::Config(
            "OPENAI_API_KEY not set. Set it with: export OPENAI_API_KEY='sk-...'".to_string(),
        )),
    }
}

fn check_youtube_key(settings: &Settings) -> Result<()> {
    match settings.youtube.api_key.as_deref() {
        Some(key) if !key.is_empty() => Ok(()),
        _ => Err(TubesageError::Config(
            "YOUTUBE_API_KEY not set. Export it or run: tubesage config set youtube.api_key <KEY>"
                .to_string(),
        )),
    }
}

/// The relational backend cannot start without a connection string.
fn check_storage(settings: &Settings) -> Result<()> {
    if let Ok(StorageBackend::Relational) = settings.storage.backend.parse() {
        settings.relational_path()?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn env_with_openai(key: &str) -> Option<String> {
        (key == "OPENAI_API_KEY").then(|| "sk-test".to_string())
    }

    #[test]
    fn test_ask_needs_only_openai() {
        let settings = Settings::default();
        assert!(check_with(Operation::Ask, &settings, env_with_openai).is_ok());
        assert!(check_with(Operation::Ask, &settings, |_| None).is_err());
    }

    #[test]
    fn test_process_needs_youtube_key() {
        let mut settings = Settings::default();
        assert!(check_with(Operation::Process, &settings, env_with_openai).is_err());

        settings.youtube.api_key = Some("yt".to_string());
        assert!(check_with(Operation::Process, &settings, env_with_openai).is_ok());
    }

    #[test]
    fn test_relational_needs_database_url() {
        let mut settings = Settings::default();
        settings.storage.backend = "relational".to_string();
        settings.storage.database_url = String::new();
        assert!(matches!(
            check_with(Operation::Ask, &settings, env_with_openai),
            Err(TubesageError::Config(_))
        ));
    }
}
