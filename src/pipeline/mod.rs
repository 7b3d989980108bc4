//! Essay pipeline: the skills an agent exposes and the orchestrator that
//! drives a task through them.

mod orchestrator;

pub use orchestrator::{PipelineError, PipelineOrchestrator};

use serde::{Deserialize, Serialize};

use crate::a2a::types::MessageSendParams;

/// A named capability an agent exposes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Skill {
    /// Topic in, essay written and then style-edited out.
    WriteEssay,
    /// Text in, style-edited text out.
    EditStyle,
}

impl Skill {
    pub fn id(self) -> &'static str {
        match self {
            Skill::WriteEssay => "write_essay",
            Skill::EditStyle => "edit_style",
        }
    }

    /// Parse a skill id. Unknown ids are treated as unspecified.
    pub fn from_id(id: &str) -> Option<Self> {
        match id {
            "write_essay" => Some(Skill::WriteEssay),
            "edit_style" => Some(Skill::EditStyle),
            _ => None,
        }
    }

    pub fn display_name(self) -> &'static str {
        match self {
            Skill::WriteEssay => "Write Essay",
            Skill::EditStyle => "Edit Style",
        }
    }

    pub fn description(self) -> &'static str {
        match self {
            Skill::WriteEssay => "Generates an essay on a given topic",
            Skill::EditStyle => "Improves the style of given text",
        }
    }

    pub fn tags(self) -> &'static [&'static str] {
        match self {
            Skill::WriteEssay => &["writing", "essay"],
            Skill::EditStyle => &["editing", "style"],
        }
    }
}

impl std::fmt::Display for Skill {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.id())
    }
}

/// One inbound unit of work as the orchestrator sees it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineTask {
    pub task_id: String,
    pub context_id: String,
    /// Topic or text to edit. `None` when the first part carried no text.
    pub input: Option<String>,
    pub skill: Option<Skill>,
}

impl PipelineTask {
    pub fn new(
        task_id: impl Into<String>,
        context_id: impl Into<String>,
        input: Option<String>,
        skill: Option<Skill>,
    ) -> Self {
        Self {
            task_id: task_id.into(),
            context_id: context_id.into(),
            input,
            skill,
        }
    }

    /// Build from a `message/send` request for an already stored task.
    ///
    /// Only the first part is read. An empty text part is still input.
    pub fn from_params(task_id: &str, context_id: &str, params: &MessageSendParams) -> Self {
        let input = params.message.first_text().map(str::to_string);
        let skill = params.skill_id().and_then(Skill::from_id);
        Self::new(task_id, context_id, input, skill)
    }
}

/// Terminal result of one orchestrator run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PipelineOutcome {
    Completed { final_text: String },
    Failed { error_message: String },
    Canceled,
}

pub(crate) fn essay_edited_message(topic: &str, edited: &str) -> String {
    format!("Essay on topic '{}' written and edited:\n\n{}", topic, edited)
}

pub(crate) fn essay_unedited_message(topic: &str, essay: &str) -> String {
    format!("Essay on topic '{}':\n\n{}", topic, essay)
}

/// Prefix of the completion message for the `edit_style` skill.
pub(crate) const TEXT_EDITED_PREFIX: &str = "Text edited:\n\n";

pub(crate) fn text_edited_message(edited: &str) -> String {
    format!("{}{}", TEXT_EDITED_PREFIX, edited)
}

pub(crate) fn failure_message(error: &dyn std::fmt::Display) -> String {
    format!("Error: {}", error)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::a2a::types::{Message, Part};
    use serde_json::json;

    fn params(message: Message, metadata: Option<serde_json::Value>) -> MessageSendParams {
        MessageSendParams {
            message,
            configuration: None,
            metadata,
        }
    }

    #[test]
    fn test_skill_ids_round_trip() {
        for skill in [Skill::WriteEssay, Skill::EditStyle] {
            assert_eq!(Skill::from_id(skill.id()), Some(skill));
        }
        assert_eq!(Skill::from_id("translate"), None);
    }

    #[test]
    fn test_task_from_params() {
        let p = params(
            Message::user_text("quantum computers"),
            Some(json!({"skill_id": "write_essay"})),
        );
        let task = PipelineTask::from_params("t1", "c1", &p);
        assert_eq!(task.input.as_deref(), Some("quantum computers"));
        assert_eq!(task.skill, Some(Skill::WriteEssay));
    }

    #[test]
    fn test_missing_text_is_no_input() {
        let mut message = Message::user_text("");
        let task = PipelineTask::from_params("t1", "c1", &params(message.clone(), None));
        assert_eq!(task.input.as_deref(), Some(""));

        message.parts.clear();
        let task = PipelineTask::from_params("t1", "c1", &params(message.clone(), None));
        assert_eq!(task.input, None);

        message.parts.push(Part {
            kind: "file".to_string(),
            text: None,
            metadata: None,
        });
        let task = PipelineTask::from_params("t1", "c1", &params(message, None));
        assert_eq!(task.input, None);
    }

    #[test]
    fn test_unknown_skill_is_unspecified() {
        let p = params(Message::user_text("x"), Some(json!({"skill_id": "translate"})));
        assert_eq!(PipelineTask::from_params("t", "c", &p).skill, None);
    }
}
