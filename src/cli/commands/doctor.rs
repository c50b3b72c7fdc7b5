//! Doctor command - verify API keys, storage and configuration.

use crate::cli::{mask_secret, Output};
use crate::config::{Settings, StorageBackend};
use crate::vector_store::create_store;
use console::style;
use std::path::{Path, PathBuf};

/// Check result for a single item.
#[derive(Debug)]
pub struct CheckResult {
    pub name: String,
    pub status: CheckStatus,
    pub message: String,
    pub hint: Option<String>,
}

#[derive(Debug, PartialEq)]
pub enum CheckStatus {
    Ok,
    Warning,
    Error,
}

impl CheckResult {
    fn ok(name: &str, message: &str) -> Self {
        Self {
            name: name.to_string(),
            status: CheckStatus::Ok,
            message: message.to_string(),
            hint: None,
        }
    }

    fn warning(name: &str, message: &str, hint: &str) -> Self {
        Self {
            name: name.to_string(),
            status: CheckStatus::Warning,
            message: message.to_string(),
            hint: Some(hint.to_string()),
        }
    }

    fn error(name: &str, message: &str, hint: &str) -> Self {
        Self {
            name: name.to_string(),
            status: CheckStatus::Error,
            message: message.to_string(),
            hint: Some(hint.to_string()),
        }
    }

    fn print(&self) {
        let icon = match self.status {
            CheckStatus::Ok => style("✓").green(),
            CheckStatus::Warning => style("!").yellow(),
            CheckStatus::Error => style("✗").red(),
        };

        println!("  {} {} - {}", icon, style(&self.name).bold(), self.message);

        if let Some(hint) = &self.hint {
            println!("    {} {}", style("→").dim(), style(hint).dim());
        }
    }
}

/// Run all diagnostic checks.
pub async fn run_doctor(settings: &Settings, config_path: &Path) -> anyhow::Result<()> {
    Output::header("Tubesage Doctor");
    println!();
    println!("Checking API keys, storage and configuration...\n");

    let mut checks = Vec::new();

    println!("{}", style("API Configuration").bold());
    let key_checks = vec![
        check_openai_api_key(std::env::var("OPENAI_API_KEY").ok()),
        check_youtube_api_key(settings),
    ];
    for check in &key_checks {
        check.print();
    }
    checks.extend(key_checks);

    println!();

    println!("{}", style("Storage").bold());
    let storage_checks = check_storage(settings).await;
    for check in &storage_checks {
        check.print();
    }
    checks.extend(storage_checks);

    println!();

    println!("{}", style("Configuration").bold());
    let config_checks = vec![check_config_file(config_path), check_data_dir(settings)];
    for check in &config_checks {
        check.print();
    }
    checks.extend(config_checks);

    println!();

    let errors = checks.iter().filter(|c| c.status == CheckStatus::Error).count();
    let warnings = checks.iter().filter(|c| c.status == CheckStatus::Warning).count();

    if errors > 0 {
        Output::error(&format!(
            "{} error(s) found. Please fix them before using Tubesage.",
            errors
        ));
        std::process::exit(1);
    } else if warnings > 0 {
        Output::warning(&format!("All checks passed with {} warning(s).", warnings));
    } else {
        Output::success("All checks passed! Tubesage is ready to use.");
    }

    Ok(())
}

/// Check if OpenAI API key is configured.
fn check_openai_api_key(value: Option<String>) -> CheckResult {
    match value {
        Some(key) if key.starts_with("sk-") && key.len() > 20 => {
            CheckResult::ok("OPENAI_API_KEY", &format!("configured ({})", mask_secret(&key)))
        }
        Some(key) if key.is_empty() => CheckResult::error(
            "OPENAI_API_KEY",
            "empty",
            "Set with: export OPENAI_API_KEY='sk-...'",
        ),
        Some(_) => CheckResult::warning(
            "OPENAI_API_KEY",
            "set but format looks unusual",
            "Expected format: sk-... (OpenAI API key)",
        ),
        None => CheckResult::error(
            "OPENAI_API_KEY",
            "not set",
            "Set with: export OPENAI_API_KEY='sk-...'",
        ),
    }
}

/// Check the YouTube Data API key (from config or `YOUTUBE_API_KEY`).
fn check_youtube_api_key(settings: &Settings) -> CheckResult {
    match settings.youtube.api_key.as_deref() {
        Some(key) if !key.is_empty() => {
            CheckResult::ok("YOUTUBE_API_KEY", &format!("configured ({})", mask_secret(key)))
        }
        _ => CheckResult::warning(
            "YOUTUBE_API_KEY",
            "not set (needed by process and channel)",
            "Set with: export YOUTUBE_API_KEY='...' or tubesage config set youtube.api_key <KEY>",
        ),
    }
}

/// Check backend selection and that the store opens.
async fn check_storage(settings: &Settings) -> Vec<CheckResult> {
    let mut results = Vec::new();
    let name = settings.storage.backend.as_str();

    let location: Option<PathBuf> = match name.parse::<StorageBackend>() {
        Ok(StorageBackend::Vector) => {
            results.push(CheckResult::ok("Backend", "vector collection"));
            Some(settings.vector_path())
        }
        Ok(StorageBackend::Relational) => match settings.relational_path() {
            Ok(path) => {
                results.push(CheckResult::ok("Backend", "relational tables"));
                Some(path)
            }
            Err(e) => {
                results.push(CheckResult::error(
                    "Backend",
                    &e.to_string(),
                    "Set with: export DATABASE_URL='sqlite://path/to/videos.db'",
                ));
                return results;
            }
        },
        Err(_) => {
            results.push(CheckResult::warning(
                "Backend",
                &format!("'{}' is not supported; summaries will not be stored", name),
                "Use DB_TYPE=vector or DB_TYPE=relational",
            ));
            None
        }
    };

    if let Some(path) = location {
        let existed = path.exists();
        match create_store(settings) {
            Ok(store) => {
                let videos = store.list_videos().await.map(|v| v.len()).unwrap_or(0);
                let size = std::fs::metadata(&path)
                    .map(|m| format_size(m.len()))
                    .unwrap_or_else(|_| "unknown size".to_string());
                let note = if existed { "" } else { ", created" };
                results.push(CheckResult::ok(
                    "Database",
                    &format!("{} ({}, {} videos{})", path.display(), size, videos, note),
                ));
            }
            Err(e) => results.push(CheckResult::error(
                "Database",
                &format!("{}: {}", path.display(), e),
                "Check that the directory is writable",
            )),
        }
    }

    results
}

/// Check if config file exists.
fn check_config_file(config_path: &Path) -> CheckResult {
    if config_path.exists() {
        CheckResult::ok("Config file", &format!("{}", config_path.display()))
    } else {
        CheckResult::warning(
            "Config file",
            "using defaults",
            "Create with: tubesage config set <key> <value>",
        )
    }
}

/// Check the data directory.
fn check_data_dir(settings: &Settings) -> CheckResult {
    let data_dir = settings.data_dir();
    if data_dir.exists() {
        CheckResult::ok("Data directory", &format!("{}", data_dir.display()))
    } else {
        CheckResult::warning(
            "Data directory",
            &format!("{} (will be created)", data_dir.display()),
            "Directory will be created on first use",
        )
    }
}

/// Format file size in human-readable format.
fn format_size(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;
    const GB: u64 = MB * 1024;

    if bytes >= GB {
        format!("{:.1} GB", bytes as f64 / GB as f64)
    } else if bytes >= MB {
        format!("{:.1} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.1} KB", bytes as f64 / KB as f64)
    } else {
        format!("{} B", bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_check_result_error() {
        let result = CheckResult::error("test", "failed", "fix it");
        assert_eq!(result.status, CheckStatus::Error);
        assert_eq!(result.hint, Some("fix it".to_string()));
    }

    #[test]
    fn test_openai_key_states() {
        assert_eq!(check_openai_api_key(None).status, CheckStatus::Error);
        assert_eq!(check_openai_api_key(Some(String::new())).status, CheckStatus::Error);
        assert_eq!(check_openai_api_key(Some("abc".to_string())).status, CheckStatus::Warning);
        let ok = check_openai_api_key(Some("sk-proj-0123456789abcdefghij".to_string()));
        assert_eq!(ok.status, CheckStatus::Ok);
        assert!(!ok.message.contains("0123456789"));
    }

    #[tokio::test]
    async fn test_storage_checks() {
        let dir = tempfile::tempdir().unwrap();
        let mut settings = Settings::default();
        settings.storage.vector_path = dir.path().join("vectors.db").display().to_string();

        let results = check_storage(&settings).await;
        assert!(results.iter().all(|r| r.status == CheckStatus::Ok));

        settings.storage.backend = "relational".to_string();
        settings.storage.database_url = String::new();
        let results = check_storage(&settings).await;
        assert_eq!(results[0].status, CheckStatus::Error);

        settings.storage.backend = "mongo".to_string();
        let results = check_storage(&settings).await;
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].status, CheckStatus::Warning);
    }

    #[test]
    fn test_format_size() {
        assert_eq!(format_size(500), "500 B");
        assert_eq!(format_size(1024), "1.0 KB");
        assert_eq!(format_size(1024 * 1024), "1.0 MB");
        assert_eq!(format_size(1024 * 1024 * 1024), "1.0 GB");
    }
}
