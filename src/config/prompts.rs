//! Prompt templates for Tubesage.
//!
//! Prompts can be customized by placing a `prompts.toml` in the custom prompts directory.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;

/// Marker the answer model appends when the context does not cover the question.
pub const TOPIC_NOT_FOUND: &str = "<TOPIC_NOT_FOUND>";

/// Collection of all prompt templates.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
#[derive(Default)]
pub struct Prompts {
    pub summary: SummaryPrompts,
    pub rag: RagPrompts,
    /// Custom variables from config, available in all prompts.
    #[serde(skip)]
    pub variables: HashMap<String, String>,
}

/// Prompts for video and chunk summaries.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SummaryPrompts {
    /// Map step: summarize one piece of a long transcript.
    pub map: String,
    /// Reduce step: merge partial summaries.
    pub reduce: String,
    /// Summary of a single retrieval chunk.
    pub chunk: String,
}

impl Default for SummaryPrompts {
    fn default() -> Self {
        Self {
            map: r#"Write a concise summary of the following:


"{{text}}"


CONCISE SUMMARY:"#
                .to_string(),

            reduce: r#"The following are summaries of consecutive parts of one video transcript:

{{text}}

Combine them into a single concise summary of the whole video.

CONCISE SUMMARY:"#
                .to_string(),

            chunk: r#"Summarize this video chunk: {{text}}

Instructions:
- Avoid [Music] as it indicates that music is played"#
                .to_string(),
        }
    }
}

/// Prompts for question answering.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RagPrompts {
    pub system: String,
    pub user: String,
}

impl Default for RagPrompts {
    fn default() -> Self {
        Self {
            system: r#"You answer questions about YouTube videos using only the transcript summaries you are given.
Never add information that is not in the supplied context."#
                .to_string(),

            user: r#"Answer the question based strictly on the following context. Do not include any information outside of this context.
If the context does not address the question, say so briefly and end your reply with {{sentinel}}.

Context:
{{context}}

Question: {{question}}
Answer in a helpful and concise manner. Use bullets for multi-point answers."#
                .to_string(),
        }
    }
}

impl Prompts {
    /// Load prompts, with an optional custom directory and custom variables.
    pub fn load(
        custom_dir: Option<&str>,
        custom_variables: Option<&HashMap<String, String>>,
    ) -> crate::error::Result<Self> {
        let mut prompts = Prompts::default();

        if let Some(dir) = custom_dir {
            let path = PathBuf::from(shellexpand::tilde(dir).to_string()).join("prompts.toml");
            if path.exists() {
                let content = std::fs::read_to_string(&path)?;
                prompts = toml::from_str(&content)?;
            }
        }

        if let Some(vars) = custom_variables {
            prompts.variables = vars.clone();
        }

        Ok(prompts)
    }

    /// Render a prompt template with the given variables.
    pub fn render(template: &str, vars: &HashMap<String, String>) -> String {
        let mut result = template.to_string();
        for (key, value) in vars {
            result = result.replace(&format!("{{{{{}}}}}", key), value);
        }
        result
    }

    /// Render a prompt template with both provided variables and custom config variables.
    /// Provided variables take precedence over custom config variables.
    pub fn render_with_custom(&self, template: &str, vars: &HashMap<String, String>) -> String {
        let mut merged = self.variables.clone();
        merged.insert("sentinel".to_string(), TOPIC_NOT_FOUND.to_string());
        for (key, value) in vars {
            merged.insert(key.clone(), value.clone());
        }
        Self::render(template, &merged)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_prompts() {
        let prompts = Prompts::default();
        assert!(prompts.summary.chunk.contains("{{text}}"));
        assert!(prompts.rag.user.contains("{{context}}"));
        assert!(prompts.rag.user.contains("{{sentinel}}"));
    }

    #[test]
    fn test_render_template() {
        let template = "Hello {{name}}, you have {{count}} messages.";
        let mut vars = HashMap::new();
        vars.insert("name".to_string(), "Alice".to_string());
        vars.insert("count".to_string(), "5".to_string());

        let result = Prompts::render(template, &vars);
        assert_eq!(result, "Hello Alice, you have 5 messages.");
    }

    #[test]
    fn test_render_fills_sentinel() {
        let prompts = Prompts::default();
        let rendered = prompts.render_with_custom("end with {{sentinel}}", &HashMap::new());
        assert_eq!(rendered, format!("end with {}", TOPIC_NOT_FOUND));
    }

    #[test]
    fn test_custom_prompt_file() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("prompts.toml"),
            "[summary]\nchunk = \"Short: {{text}}\"\n",
        )
        .unwrap();

        let prompts = Prompts::load(dir.path().to_str(), None).unwrap();
        assert_eq!(prompts.summary.chunk, "Short: {{text}}");
        // untouched sections keep their defaults
        assert!(prompts.rag.user.contains("{{question}}"));
    }
}
