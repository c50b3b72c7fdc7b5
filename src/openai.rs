//! OpenAI client construction shared by the embedder and the chat model.

use crate::error::{Result, TubesageError};
use async_openai::{config::OpenAIConfig, Client};
use std::time::Duration;

/// Timeout for OpenAI API requests (2 minutes).
const REQUEST_TIMEOUT_SECS: u64 = 120;

/// Create an OpenAI client with the request timeout applied.
///
/// The API key is taken from `OPENAI_API_KEY`.
pub fn create_client() -> Result<Client<OpenAIConfig>> {
    let http_client = reqwest::Client::builder()
        .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
        .build()
        .map_err(|e| TubesageError::Config(format!("Failed to create HTTP client: {}", e)))?;

    Ok(Client::with_config(OpenAIConfig::default()).with_http_client(http_client))
}
