//! Single-prompt text generation on top of an [`LlmClient`].

use std::sync::Arc;

use thiserror::Error;

use super::{ChatMessage, ChatOptions, LlmClient, LlmError};

/// Failure of one generation call.
#[derive(Debug, Clone, Error)]
#[error("{0}")]
pub struct GenerationError(#[from] pub LlmError);

/// Per-call generation settings.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GenerationOptions {
    pub max_output_tokens: u64,
    pub temperature: f64,
}

impl From<GenerationOptions> for ChatOptions {
    fn from(options: GenerationOptions) -> Self {
        ChatOptions {
            temperature: Some(options.temperature),
            max_tokens: Some(options.max_output_tokens),
        }
    }
}

/// Turns a prompt into text with one chat-completion call.
///
/// Cheap to clone; the underlying client is shared.
#[derive(Clone)]
pub struct TextGenerator {
    client: Arc<dyn LlmClient>,
    model: String,
}

impl TextGenerator {
    pub fn new(client: Arc<dyn LlmClient>, model: impl Into<String>) -> Self {
        Self {
            client,
            model: model.into(),
        }
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    /// Generate text for `prompt`. A missing or blank completion is an error.
    pub async fn generate(
        &self,
        prompt: &str,
        options: GenerationOptions,
    ) -> Result<String, GenerationError> {
        let messages = [ChatMessage::user(prompt)];
        let response = self
            .client
            .chat_completion(&self.model, &messages, options.into())
            .await?;

        if let Some(usage) = &response.usage {
            tracing::debug!(
                "Generation used {} prompt + {} completion tokens (model={})",
                usage.prompt_tokens,
                usage.completion_tokens,
                response.model.as_deref().unwrap_or(&self.model)
            );
        }

        match response.content {
            Some(text) if !text.trim().is_empty() => Ok(text),
            _ => Err(LlmError::empty_response(format!(
                "Model returned no content (finish_reason: {})",
                response.finish_reason.as_deref().unwrap_or("unknown")
            ))
            .into()),
        }
    }
}
