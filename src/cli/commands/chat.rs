//! Interactive chat command.

use super::ask::build_engine;
use crate::cli::preflight::{self, Operation};
use crate::cli::Output;
use crate::config::Settings;
use crate::rag::{format_references_for_display, ChatSession, QueryOptions};
use crate::vector_store::VectorStore;
use anyhow::Result;
use console::style;
use std::io::{self, BufRead, Write};
use std::sync::Arc;

/// Run the interactive chat command.
pub async fn run_chat(
    video: Option<String>,
    settings: Settings,
    store: Arc<dyn VectorStore>,
) -> Result<()> {
    if let Err(e) = preflight::check(Operation::Ask, &settings) {
        Output::error(&format!("{}", e));
        Output::info("Run 'tubesage doctor' for detailed diagnostics.");
        return Err(e.into());
    }

    let engine = build_engine(&settings, store)?;
    let options = QueryOptions {
        video_filter: video,
        distance_threshold: settings.rag.distance_threshold,
    };
    let mut chat = ChatSession::new(&engine, options);

    println!("\n{}", style("Tubesage Chat").bold().cyan());
    println!(
        "{}\n",
        style("Type your questions, or 'exit' to quit. Use 'clear' to reset conversation.").dim()
    );

    let stdin = io::stdin();
    let mut stdout = io::stdout();

    loop {
        print!("{} ", style("You:").green().bold());
        stdout.flush()?;

        let mut input = String::new();
        if stdin.lock().read_line(&mut input)? == 0 {
            break;
        }

        let input = input.trim();

        if input.is_empty() {
            continue;
        }

        if input.eq_ignore_ascii_case("exit") || input.eq_ignore_ascii_case("quit") {
            Output::info("Goodbye!");
            break;
        }

        if input.eq_ignore_ascii_case("clear") {
            chat.clear();
            Output::info("Conversation history cleared.");
            continue;
        }

        match chat.send(input).await {
            Ok(response) => {
                println!(
                    "\n{} {}\n",
                    style("Tubesage:").cyan().bold(),
                    response.display_answer()
                );
                if !response.references.is_empty() {
                    println!("{}\n", style(format_references_for_display(&response.references)).dim());
                }
            }
            Err(e) => {
                Output::error(&format!("Error: {}", e));
            }
        }
    }

    Ok(())
}
