//! Video and chunk summarization.
//!
//! Full transcripts are summarized map-reduce style: the text is cut into
//! pieces the model can take in one call, each piece is summarized, and the
//! partial summaries are merged until a single summary remains.

use crate::config::Prompts;
use crate::error::{Result, TubesageError};
use crate::llm::ChatModel;
use std::collections::HashMap;
use std::sync::Arc;
use text_splitter::TextSplitter;
use tracing::{debug, info, instrument};

/// Summarizes transcripts with a chat model.
pub struct Summarizer {
    chat: Arc<dyn ChatModel>,
    prompts: Prompts,
    map_chunk_size: usize,
}

impl Summarizer {
    pub fn new(chat: Arc<dyn ChatModel>, prompts: Prompts, map_chunk_size: usize) -> Self {
        Self {
            chat,
            prompts,
            map_chunk_size: map_chunk_size.max(1),
        }
    }

    /// Summarize a whole video transcript.
    #[instrument(skip(self, text), fields(len = text.len()))]
    pub async fn summarize_video(&self, text: &str) -> Result<String> {
        if text.trim().is_empty() {
            return Err(TubesageError::InvalidInput("transcript has no text".to_string()));
        }

        let splitter = TextSplitter::new(self.map_chunk_size);
        let pieces: Vec<&str> = splitter.chunks(text).collect();
        info!("Summarizing transcript in {} pieces", pieces.len());

        let mut partials = Vec::with_capacity(pieces.len());
        for piece in pieces {
            partials.push(self.ask(&self.prompts.summary.map, piece).await?);
        }

        while partials.len() > 1 {
            debug!("Reducing {} partial summaries", partials.len());
            let mut next = Vec::new();
            for group in self.group_for_reduce(&partials) {
                next.push(self.ask(&self.prompts.summary.reduce, &group.join("\n\n")).await?);
            }
            partials = next;
        }

        partials
            .pop()
            .ok_or_else(|| TubesageError::Llm("no summary produced".to_string()))
    }

    /// Summarize one retrieval chunk.
    pub async fn summarize_chunk(&self, text: &str) -> Result<String> {
        self.ask(&self.prompts.summary.chunk, text).await
    }

    /// Pack partial summaries into groups of at most `map_chunk_size` characters.
    ///
    /// Every group holds at least two entries so each round shrinks the list.
    fn group_for_reduce<'a>(&self, partials: &'a [String]) -> Vec<Vec<&'a str>> {
        let mut groups: Vec<Vec<&str>> = Vec::new();
        let mut current: Vec<&str> = Vec::new();
        let mut size = 0;

        for partial in partials {
            if current.len() >= 2 && size + partial.len() > self.map_chunk_size {
                groups.push(std::mem::take(&mut current));
                size = 0;
            }
            size += partial.len();
            current.push(partial);
        }
        match groups.last_mut() {
            Some(last) if current.len() == 1 => last.append(&mut current),
            _ => groups.push(current),
        }
        groups
    }

    async fn ask(&self, template: &str, text: &str) -> Result<String> {
        let mut vars = HashMap::new();
        vars.insert("text".to_string(), text.to_string());
        let prompt = self.prompts.render_with_custom(template, &vars);
        let reply = self.chat.complete(None, &prompt).await?;
        Ok(reply.trim().to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::ScriptedChat;

    #[tokio::test]
    async fn test_short_transcript_is_one_call() {
        let chat = Arc::new(ScriptedChat::summarizing());
        let summarizer = Summarizer::new(chat.clone(), Prompts::default(), 1000);

        let summary = summarizer.summarize_video("a short talk about rust").await.unwrap();
        assert!(summary.starts_with("summary of"));
        assert_eq!(chat.prompt_count(), 1);
        assert!(chat.last_prompt().unwrap().contains("a short talk about rust"));
    }

    #[tokio::test]
    async fn test_long_transcript_is_mapped_then_reduced() {
        let chat = Arc::new(ScriptedChat::new(|prompt| {
            if prompt.contains("Combine them") {
                Ok("FINAL".to_string())
            } else {
                Ok("part".to_string())
            }
        }));
        let summarizer = Summarizer::new(chat.clone(), Prompts::default(), 200);

        let text = "word ".repeat(300);
        let summary = summarizer.summarize_video(&text).await.unwrap();

        assert_eq!(summary, "FINAL");
        // several map calls, then a single reduce over the short partials
        assert!(chat.prompt_count() >= 9);
        assert!(chat.last_prompt().unwrap().contains("Combine them"));
        let reduces = chat
            .prompts
            .lock()
            .unwrap()
            .iter()
            .filter(|p| p.contains("Combine them"))
            .count();
        assert_eq!(reduces, 1);
    }

    #[tokio::test]
    async fn test_chunk_prompt_mentions_music() {
        let chat = Arc::new(ScriptedChat::summarizing());
        let summarizer = Summarizer::new(chat.clone(), Prompts::default(), 1000);

        summarizer.summarize_chunk("[Music] hello there").await.unwrap();
        let prompt = chat.last_prompt().unwrap();
        assert!(prompt.contains("Summarize this video chunk: [Music] hello there"));
    }

    #[tokio::test]
    async fn test_empty_transcript_is_rejected() {
        let chat = Arc::new(ScriptedChat::summarizing());
        let summarizer = Summarizer::new(chat.clone(), Prompts::default(), 1000);
        assert!(summarizer.summarize_video("   ").await.is_err());
        assert_eq!(chat.prompt_count(), 0);
    }

    #[tokio::test]
    async fn test_llm_failure_propagates() {
        let chat = Arc::new(ScriptedChat::new(|_| Err(TubesageError::Llm("rate limited".to_string()))));
        let summarizer = Summarizer::new(chat, Prompts::default(), 1000);
        assert!(matches!(
            summarizer.summarize_chunk("text").await,
            Err(TubesageError::Llm(_))
        ));
    }

    #[test]
    fn test_group_for_reduce_always_shrinks() {
        let chat = Arc::new(ScriptedChat::summarizing());
        let summarizer = Summarizer::new(chat, Prompts::default(), 10);
        let partials: Vec<String> = (0..5).map(|i| format!("partial-{}", i)).collect();

        let groups = summarizer.group_for_reduce(&partials);
        assert!(groups.len() < partials.len());
        assert!(groups.iter().all(|g| g.len() >= 2));
        assert_eq!(groups.iter().map(Vec::len).sum::<usize>(), 5);
    }
}
