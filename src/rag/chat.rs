//! Multi-turn question answering.

use super::response::{QueryEngine, QueryOptions, QueryResponse};
use crate::error::Result;
use std::collections::VecDeque;

/// Number of question/answer turns kept for context.
const MAX_TURNS: usize = 10;

struct Turn {
    question: String,
    answer: String,
}

/// A conversation over the stored videos.
pub struct ChatSession<'a> {
    engine: &'a QueryEngine,
    options: QueryOptions,
    history: VecDeque<Turn>,
    max_turns: usize,
}

impl<'a> ChatSession<'a> {
    pub fn new(engine: &'a QueryEngine, options: QueryOptions) -> Self {
        Self {
            engine,
            options,
            history: VecDeque::new(),
            max_turns: MAX_TURNS,
        }
    }

    pub fn with_max_turns(mut self, max_turns: usize) -> Self {
        self.max_turns = max_turns.max(1);
        self
    }

    /// Ask the next question, remembering the exchange.
    pub async fn send(&mut self, question: &str) -> Result<QueryResponse> {
        let history = self.render_history();
        let response = self
            .engine
            .ask_with_history(question, &self.options, &history)
            .await?;

        self.history.push_back(Turn {
            question: question.to_string(),
            answer: response.display_answer(),
        });
        while self.history.len() > self.max_turns {
            self.history.pop_front();
        }

        Ok(response)
    }

    /// Forget earlier turns.
    pub fn clear(&mut self) {
        self.history.clear();
    }

    pub fn turns(&self) -> usize {
        self.history.len()
    }

    fn render_history(&self) -> String {
        self.history
            .iter()
            .map(|t| format!("User: {}\nAssistant: {}", t.question, t.answer))
            .collect::<Vec<_>>()
            .join("\n")
    }
}
