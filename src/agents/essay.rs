//! Essay writing stage.

use crate::llm::{GenerationError, GenerationOptions, TextGenerator};

/// Essay produced for a topic.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Essay {
    pub topic: String,
    pub essay_text: String,
}

/// Writes an essay on a topic with one generation call.
#[derive(Clone)]
pub struct EssayProducer {
    generator: TextGenerator,
    options: GenerationOptions,
}

impl EssayProducer {
    pub fn new(generator: TextGenerator, options: GenerationOptions) -> Self {
        Self { generator, options }
    }

    /// The topic is embedded verbatim; empty topics are not rejected here.
    pub async fn produce_essay(&self, topic: &str) -> Result<Essay, GenerationError> {
        let text = self
            .generator
            .generate(&essay_prompt(topic), self.options)
            .await?;

        Ok(Essay {
            topic: topic.to_string(),
            essay_text: text.trim().to_string(),
        })
    }
}

pub(crate) fn essay_prompt(topic: &str) -> String {
    format!(
        "Write a well-structured essay on the topic: {}. Make it informative and engaging.",
        topic
    )
}
