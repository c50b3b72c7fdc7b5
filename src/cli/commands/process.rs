//! Process and channel command implementations.

use crate::catalog::extract_video_id;
use crate::cli::preflight::{self, Operation};
use crate::cli::Output;
use crate::config::Settings;
use crate::orchestrator::{BatchReport, Pipeline};
use crate::vector_store::VectorStore;
use anyhow::Result;
use std::sync::Arc;

/// Run the process command.
pub async fn run_process(
    inputs: &[String],
    settings: Settings,
    store: Arc<dyn VectorStore>,
) -> Result<()> {
    if let Err(e) = preflight::check(Operation::Process, &settings) {
        Output::error(&format!("{}", e));
        Output::info("Run 'tubesage doctor' for detailed diagnostics.");
        return Err(e.into());
    }

    let pipeline = Pipeline::new(&settings, store)?;

    let mut video_ids = Vec::with_capacity(inputs.len());
    let mut invalid = Vec::new();
    for input in inputs {
        match extract_video_id(input) {
            Some(video_id) => video_ids.push(video_id),
            None => {
                Output::warning(&format!("Not a YouTube video ID or URL: {}", input));
                invalid.push((input.clone(), "invalid video ID".to_string()));
            }
        }
    }

    let progress = Output::progress_bar(video_ids.len() as u64, "Processing videos");
    let mut batch = pipeline
        .process_batch_with(&video_ids, |video_id| {
            progress.set_message(video_id.to_string());
            progress.inc(1);
        })
        .await;
    progress.finish_and_clear();
    batch.failed.extend(invalid);

    print_batch(&batch);
    Ok(())
}

/// Run the channel command.
pub async fn run_channel(
    channel_id: &str,
    limit: Option<usize>,
    settings: Settings,
    store: Arc<dyn VectorStore>,
) -> Result<()> {
    if let Err(e) = preflight::check(Operation::Process, &settings) {
        Output::error(&format!("{}", e));
        Output::info("Run 'tubesage doctor' for detailed diagnostics.");
        return Err(e.into());
    }

    let pipeline = Pipeline::new(&settings, store)?;
    let spinner = Output::spinner(&format!("Processing channel {}...", channel_id));

    match pipeline.process_channel(channel_id, limit).await {
        Ok(batch) => {
            spinner.finish_and_clear();
            if batch.total() == 0 {
                Output::warning(&format!("Channel {} has no videos.", channel_id));
            }
            print_batch(&batch);
            Ok(())
        }
        Err(e) => {
            spinner.finish_and_clear();
            Output::error(&format!("Failed to list channel videos: {}", e));
            Err(e.into())
        }
    }
}

fn print_batch(batch: &BatchReport) {
    for report in &batch.processed {
        let skipped = if report.chunks_skipped > 0 {
            format!(", {} skipped", report.chunks_skipped)
        } else {
            String::new()
        };
        Output::success(&format!(
            "Stored '{}' ({} chunks{})",
            report.title, report.chunks_stored, skipped
        ));
    }
    for video_id in &batch.already_processed {
        Output::info(&format!("{} is already processed", video_id));
    }
    for (video_id, reason) in &batch.failed {
        Output::error(&format!("{} failed: {}", video_id, reason));
    }

    if batch.total() > 1 {
        println!();
        Output::kv("Processed", &batch.processed.len().to_string());
        Output::kv("Already processed", &batch.already_processed.len().to_string());
        Output::kv("Failed", &batch.failed.len().to_string());
    }
}
