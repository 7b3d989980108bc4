//! Style editing delegated to a remote style-editor agent.
//!
//! Any failure of the remote call degrades to the unedited text instead of
//! failing the task.

use async_trait::async_trait;

use super::style::{StyleEdit, StyleEditor, StyleOutcome};
use crate::a2a::client::{completed_text, A2aClient, RemoteAgentError};
use crate::llm::GenerationError;
use crate::pipeline::{Skill, TEXT_EDITED_PREFIX};

pub struct RemoteStyleEditor {
    client: A2aClient,
}

impl RemoteStyleEditor {
    pub fn new(client: A2aClient) -> Self {
        Self { client }
    }

    async fn request_edit(&self, text: &str) -> Result<String, RemoteAgentError> {
        let task = self.client.send_text(text, Some(Skill::EditStyle)).await?;
        let reply = completed_text(&task)?;
        // The remote agent wraps its result in its own completion message.
        let edited = reply.strip_prefix(TEXT_EDITED_PREFIX).unwrap_or(&reply);
        Ok(edited.trim().to_string())
    }
}

#[async_trait]
impl StyleEditor for RemoteStyleEditor {
    fn name(&self) -> &str {
        "remote"
    }

    async fn edit_style(&self, text: &str) -> Result<StyleOutcome, GenerationError> {
        match self.request_edit(text).await {
            Ok(edited) if !edited.is_empty() => Ok(StyleOutcome::Edited(StyleEdit {
                original_text: text.to_string(),
                edited_text: edited,
            })),
            Ok(_) => Ok(self.degrade(text, RemoteAgentError::MissingText)),
            Err(e) => Ok(self.degrade(text, e)),
        }
    }
}

impl RemoteStyleEditor {
    fn degrade(&self, text: &str, error: RemoteAgentError) -> StyleOutcome {
        tracing::warn!(
            "Style editor at {} unavailable, returning unedited text: {}",
            self.client.base_url(),
            error
        );
        StyleOutcome::Unedited {
            original_text: text.to_string(),
            reason: error.to_string(),
        }
    }
}
