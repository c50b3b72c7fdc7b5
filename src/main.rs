//! Tubesage CLI entry point.

use anyhow::Result;
use clap::Parser;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};
use tubesage::cli::{commands, Cli, Commands};
use tubesage::config::Settings;
use tubesage::vector_store::{create_store, VectorStore};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config_path = cli
        .config
        .as_deref()
        .map(Settings::expand_path)
        .unwrap_or_else(Settings::default_config_path);

    // Load configuration; environment variables win over the file
    let mut settings = Settings::load_from(Some(&config_path))?;
    settings.apply_env();

    // Initialize logging
    let log_level = match cli.verbose {
        0 => settings.general.log_level.clone(),
        1 => "info".to_string(),
        2 => "debug".to_string(),
        _ => "trace".to_string(),
    };

    tracing_subscriber::registry()
        .with(EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| format!("tubesage={}", log_level)),
        ))
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .init();

    // Execute command
    match &cli.command {
        Commands::Doctor => {
            commands::run_doctor(&settings, &config_path).await?;
        }

        Commands::Config { action } => {
            commands::run_config(action, config_path.clone())?;
        }

        Commands::Process { inputs } => {
            let store = open_store(&settings)?;
            commands::run_process(inputs, settings, store).await?;
        }

        Commands::Channel { channel_id, limit } => {
            let store = open_store(&settings)?;
            commands::run_channel(channel_id, *limit, settings, store).await?;
        }

        Commands::Ask {
            question,
            video,
            threshold,
            no_threshold,
        } => {
            let store = open_store(&settings)?;
            commands::run_ask(question, video.clone(), *threshold, *no_threshold, settings, store).await?;
        }

        Commands::Chat { video } => {
            let store = open_store(&settings)?;
            commands::run_chat(video.clone(), settings, store).await?;
        }

        Commands::List { chunks, video } => {
            let store = open_store(&settings)?;
            commands::run_list(*chunks, video.clone(), store).await?;
        }
    }

    Ok(())
}

/// Open the configured store once for the whole command.
fn open_store(settings: &Settings) -> Result<Arc<dyn VectorStore>> {
    std::fs::create_dir_all(settings.data_dir())?;
    Ok(create_store(settings)?)
}
