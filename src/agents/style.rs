//! Style editing stage and the interface the orchestrator edits through.

use async_trait::async_trait;

use crate::llm::{GenerationError, GenerationOptions, TextGenerator};

/// Text before and after a style edit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StyleEdit {
    pub original_text: String,
    pub edited_text: String,
}

/// What a [`StyleEditor`] produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StyleOutcome {
    Edited(StyleEdit),
    /// The editor could not run; the text is handed back untouched.
    Unedited { original_text: String, reason: String },
}

/// Something that can improve the style of a text.
///
/// A `GenerationError` fails the task. Implementations that degrade
/// instead of failing return [`StyleOutcome::Unedited`].
#[async_trait]
pub trait StyleEditor: Send + Sync {
    /// Short name used in logs.
    fn name(&self) -> &str;

    async fn edit_style(&self, text: &str) -> Result<StyleOutcome, GenerationError>;
}

/// In-process editor backed by the text generator.
#[derive(Clone)]
pub struct LocalStyleEditor {
    generator: TextGenerator,
    options: GenerationOptions,
}

impl LocalStyleEditor {
    pub fn new(generator: TextGenerator, options: GenerationOptions) -> Self {
        Self { generator, options }
    }

    pub async fn edit(&self, text: &str) -> Result<StyleEdit, GenerationError> {
        let edited = self
            .generator
            .generate(&style_prompt(text), self.options)
            .await?;

        Ok(StyleEdit {
            original_text: text.to_string(),
            edited_text: edited.trim().to_string(),
        })
    }
}

#[async_trait]
impl StyleEditor for LocalStyleEditor {
    fn name(&self) -> &str {
        "local"
    }

    async fn edit_style(&self, text: &str) -> Result<StyleOutcome, GenerationError> {
        self.edit(text).await.map(StyleOutcome::Edited)
    }
}

/// Used by an essay writer with no style editor to delegate to.
#[derive(Debug, Clone, Copy, Default)]
pub struct DisabledStyleEditor;

#[async_trait]
impl StyleEditor for DisabledStyleEditor {
    fn name(&self) -> &str {
        "disabled"
    }

    async fn edit_style(&self, text: &str) -> Result<StyleOutcome, GenerationError> {
        Ok(StyleOutcome::Unedited {
            original_text: text.to_string(),
            reason: "no style editor configured".to_string(),
        })
    }
}

pub(crate) fn style_prompt(text: &str) -> String {
    format!(
        "Edit the following text for better clarity and style while preserving the original meaning:\n\n{}",
        text
    )
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::llm::testing::ScriptedLlm;
    use crate::llm::LlmError;

    fn editor(llm: Arc<ScriptedLlm>) -> LocalStyleEditor {
        LocalStyleEditor::new(
            TextGenerator::new(llm, "gpt-4"),
            GenerationOptions {
                max_output_tokens: 1000,
                temperature: 0.5,
            },
        )
    }

    #[tokio::test]
    async fn test_edit_style() {
        let llm = Arc::new(ScriptedLlm::new(vec![Ok(" Edited text content ".to_string())]));
        let outcome = editor(llm.clone()).edit_style("Original text").await.unwrap();

        assert_eq!(
            outcome,
            StyleOutcome::Edited(StyleEdit {
                original_text: "Original text".to_string(),
                edited_text: "Edited text content".to_string(),
            })
        );
        let calls = llm.calls();
        assert!(calls[0].prompt.ends_with("\n\nOriginal text"));
        assert_eq!(calls[0].options.temperature, Some(0.5));
    }

    #[tokio::test]
    async fn test_edit_empty_text() {
        let llm = Arc::new(ScriptedLlm::new(vec![Ok("Edited empty text".to_string())]));
        let edit = editor(llm).edit("").await.unwrap();
        assert_eq!(edit.original_text, "");
        assert_eq!(edit.edited_text, "Edited empty text");
    }

    #[tokio::test]
    async fn test_local_errors_are_not_degraded() {
        let llm = Arc::new(ScriptedLlm::new(vec![Err(LlmError::network_error(
            "Connection failed".to_string(),
        ))]));
        let err = editor(llm).edit_style("text").await.unwrap_err();
        assert!(err.to_string().contains("Connection failed"));
    }

    #[tokio::test]
    async fn test_disabled_editor_returns_text_unchanged() {
        let outcome = DisabledStyleEditor.edit_style("essay").await.unwrap();
        assert!(matches!(
            outcome,
            StyleOutcome::Unedited { ref original_text, .. } if original_text == "essay"
        ));
    }
}
