//! Task orchestrator: drives one task through the essay and style stages
//! and reports exactly one terminal status.

use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures::FutureExt;
use thiserror::Error;

use super::{
    essay_edited_message, essay_unedited_message, failure_message, text_edited_message,
    PipelineOutcome, PipelineTask, Skill,
};
use crate::agents::{EssayProducer, StyleEditor, StyleOutcome};
use crate::llm::GenerationError;
use crate::task::{TaskEventSink, TaskState, TaskStatusUpdate};

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error(transparent)]
    Generation(#[from] GenerationError),

    #[error("Style editor unavailable: {0}")]
    StyleUnavailable(String),

    #[error("Pipeline panicked: {0}")]
    Panicked(String),
}

/// Stateless across tasks; share it behind an `Arc`.
pub struct PipelineOrchestrator {
    essay: EssayProducer,
    style: Arc<dyn StyleEditor>,
    skills: Vec<Skill>,
    default_skill: Skill,
}

impl PipelineOrchestrator {
    /// Orchestrator exposing both skills, defaulting to `write_essay`.
    pub fn new(essay: EssayProducer, style: Arc<dyn StyleEditor>) -> Self {
        Self::with_skills(
            essay,
            style,
            vec![Skill::WriteEssay, Skill::EditStyle],
            Skill::WriteEssay,
        )
    }

    /// Restrict the advertised skills. `default_skill` is always included.
    pub fn with_skills(
        essay: EssayProducer,
        style: Arc<dyn StyleEditor>,
        mut skills: Vec<Skill>,
        default_skill: Skill,
    ) -> Self {
        if !skills.contains(&default_skill) {
            skills.insert(0, default_skill);
        }
        Self {
            essay,
            style,
            skills,
            default_skill,
        }
    }

    pub fn skills(&self) -> &[Skill] {
        &self.skills
    }

    /// Requested skill when this agent offers it, otherwise the default.
    pub fn resolve_skill(&self, requested: Option<Skill>) -> Skill {
        match requested {
            Some(skill) if self.skills.contains(&skill) => skill,
            Some(skill) => {
                tracing::debug!(
                    "Skill {} not offered, falling back to {}",
                    skill,
                    self.default_skill
                );
                self.default_skill
            }
            None => self.default_skill,
        }
    }

    /// Run a task to completion.
    ///
    /// Returns `None` without emitting anything when the task has no input.
    /// Otherwise emits `working` followed by exactly one terminal status, and
    /// never propagates a producer failure.
    pub async fn handle(
        &self,
        task: &PipelineTask,
        sink: &dyn TaskEventSink,
    ) -> Option<PipelineOutcome> {
        let Some(input) = task.input.as_deref() else {
            tracing::debug!("Task {} has no text input, dropping", task.task_id);
            return None;
        };

        sink.emit(self.update(task, TaskState::Working, None)).await;

        let skill = self.resolve_skill(task.skill);
        tracing::info!(
            "Task {} running {} (style editor: {})",
            task.task_id,
            skill,
            self.style.name()
        );

        let result = AssertUnwindSafe(self.run(skill, input))
            .catch_unwind()
            .await
            .unwrap_or_else(|panic| Err(PipelineError::Panicked(panic_text(panic.as_ref()))));

        let outcome = match result {
            Ok(final_text) => {
                tracing::info!("Task {} completed", task.task_id);
                sink.emit(self.update(task, TaskState::Completed, Some(final_text.clone())))
                    .await;
                PipelineOutcome::Completed { final_text }
            }
            Err(e) => {
                tracing::error!("Task {} failed: {}", task.task_id, e);
                let error_message = failure_message(&e);
                sink.emit(self.update(task, TaskState::Failed, Some(error_message.clone())))
                    .await;
                PipelineOutcome::Failed { error_message }
            }
        };
        Some(outcome)
    }

    /// Report the task as canceled. Work already in flight is not interrupted.
    pub async fn cancel(&self, task: &PipelineTask, sink: &dyn TaskEventSink) -> PipelineOutcome {
        tracing::info!("Task {} canceled", task.task_id);
        sink.emit(self.update(task, TaskState::Canceled, None)).await;
        PipelineOutcome::Canceled
    }

    async fn run(&self, skill: Skill, input: &str) -> Result<String, PipelineError> {
        match skill {
            Skill::WriteEssay => {
                let essay = self.essay.produce_essay(input).await?;
                match self.style.edit_style(&essay.essay_text).await? {
                    StyleOutcome::Edited(edit) => {
                        Ok(essay_edited_message(&essay.topic, &edit.edited_text))
                    }
                    StyleOutcome::Unedited { original_text, .. } => {
                        Ok(essay_unedited_message(&essay.topic, &original_text))
                    }
                }
            }
            Skill::EditStyle => match self.style.edit_style(input).await? {
                StyleOutcome::Edited(edit) => Ok(text_edited_message(&edit.edited_text)),
                StyleOutcome::Unedited { reason, .. } => {
                    Err(PipelineError::StyleUnavailable(reason))
                }
            },
        }
    }

    fn update(
        &self,
        task: &PipelineTask,
        state: TaskState,
        message: Option<String>,
    ) -> TaskStatusUpdate {
        TaskStatusUpdate::new(
            task.task_id.clone(),
            task.context_id.clone(),
            state,
            message,
        )
    }
}

fn panic_text(panic: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use async_trait::async_trait;

    use super::*;
    use crate::agents::{DisabledStyleEditor, LocalStyleEditor};
    use crate::llm::testing::ScriptedLlm;
    use crate::llm::{GenerationOptions, LlmError, TextGenerator};

    #[derive(Default)]
    struct RecordingSink {
        updates: Mutex<Vec<TaskStatusUpdate>>,
    }

    impl RecordingSink {
        fn states(&self) -> Vec<TaskState> {
            self.updates.lock().unwrap().iter().map(|u| u.state).collect()
        }

        fn last_message(&self) -> Option<String> {
            self.updates.lock().unwrap().last().and_then(|u| u.message.clone())
        }
    }

    #[async_trait]
    impl TaskEventSink for RecordingSink {
        async fn emit(&self, update: TaskStatusUpdate) {
            self.updates.lock().unwrap().push(update);
        }
    }

    struct PanickingEditor;

    #[async_trait]
    impl StyleEditor for PanickingEditor {
        fn name(&self) -> &str {
            "panicking"
        }

        async fn edit_style(&self, _text: &str) -> Result<StyleOutcome, GenerationError> {
            panic!("editor exploded")
        }
    }

    const ESSAY: GenerationOptions = GenerationOptions {
        max_output_tokens: 1000,
        temperature: 0.7,
    };
    const EDIT: GenerationOptions = GenerationOptions {
        max_output_tokens: 1000,
        temperature: 0.5,
    };

    fn monolithic(llm: Arc<ScriptedLlm>) -> PipelineOrchestrator {
        let generator = TextGenerator::new(llm, "gpt-4");
        PipelineOrchestrator::new(
            EssayProducer::new(generator.clone(), ESSAY),
            Arc::new(LocalStyleEditor::new(generator, EDIT)),
        )
    }

    fn with_editor(llm: Arc<ScriptedLlm>, style: Arc<dyn StyleEditor>) -> PipelineOrchestrator {
        PipelineOrchestrator::new(
            EssayProducer::new(TextGenerator::new(llm, "gpt-4"), ESSAY),
            style,
        )
    }

    fn task(input: Option<&str>, skill: Option<Skill>) -> PipelineTask {
        PipelineTask::new("task-1", "ctx-1", input.map(str::to_string), skill)
    }

    #[tokio::test]
    async fn test_write_essay_then_edit() {
        let llm = Arc::new(ScriptedLlm::new(vec![
            Ok("Raw essay about qubits.".to_string()),
            Ok("Polished essay about qubits.".to_string()),
        ]));
        let orchestrator = monolithic(llm.clone());
        let sink = RecordingSink::default();

        let outcome = orchestrator
            .handle(&task(Some("quantum computers"), Some(Skill::WriteEssay)), &sink)
            .await;

        assert_eq!(sink.states(), vec![TaskState::Working, TaskState::Completed]);
        let message = sink.last_message().unwrap();
        assert!(message.contains("quantum computers"));
        assert!(message.contains("Polished essay about qubits."));
        assert!(matches!(outcome, Some(PipelineOutcome::Completed { .. })));

        // Essay first, then the edit of exactly that essay.
        let calls = llm.calls();
        assert_eq!(calls.len(), 2);
        assert!(calls[0].prompt.contains("quantum computers"));
        assert!(calls[1].prompt.ends_with("Raw essay about qubits."));
    }

    #[tokio::test]
    async fn test_unspecified_skill_writes_essay() {
        let llm = Arc::new(ScriptedLlm::new(vec![
            Ok("essay".to_string()),
            Ok("edited".to_string()),
        ]));
        let sink = RecordingSink::default();
        monolithic(llm.clone()).handle(&task(Some("cats"), None), &sink).await;

        assert_eq!(llm.calls().len(), 2);
        assert_eq!(
            sink.last_message().unwrap(),
            "Essay on topic 'cats' written and edited:\n\nedited"
        );
    }

    #[tokio::test]
    async fn test_edit_style_only() {
        let llm = Arc::new(ScriptedLlm::new(vec![Ok("This text is improved.".to_string())]));
        let sink = RecordingSink::default();

        monolithic(llm.clone())
            .handle(&task(Some("This is bad text."), Some(Skill::EditStyle)), &sink)
            .await;

        assert_eq!(sink.states(), vec![TaskState::Working, TaskState::Completed]);
        assert!(sink.last_message().unwrap().contains("improved."));
        assert_eq!(llm.calls().len(), 1);
    }

    #[tokio::test]
    async fn test_essay_failure_reports_failed() {
        let llm = Arc::new(ScriptedLlm::new(vec![Err(LlmError::rate_limited(
            "quota exceeded".to_string(),
        ))]));
        let sink = RecordingSink::default();

        let outcome = monolithic(llm.clone())
            .handle(&task(Some("topic"), Some(Skill::WriteEssay)), &sink)
            .await;

        assert_eq!(sink.states(), vec![TaskState::Working, TaskState::Failed]);
        let message = sink.last_message().unwrap();
        assert!(message.starts_with("Error: "));
        assert!(message.contains("quota exceeded"));
        assert!(matches!(outcome, Some(PipelineOutcome::Failed { .. })));
        // The edit stage never ran.
        assert_eq!(llm.calls().len(), 1);
    }

    #[tokio::test]
    async fn test_local_edit_failure_fails_task() {
        let llm = Arc::new(ScriptedLlm::new(vec![
            Ok("essay".to_string()),
            Err(LlmError::server_error(500, "boom".to_string())),
        ]));
        let sink = RecordingSink::default();

        monolithic(llm)
            .handle(&task(Some("topic"), None), &sink)
            .await;

        assert_eq!(sink.states(), vec![TaskState::Working, TaskState::Failed]);
        // No partial essay leaks into the failure.
        assert!(!sink.last_message().unwrap().contains("essay"));
    }

    #[tokio::test]
    async fn test_unedited_essay_is_still_completed() {
        let llm = Arc::new(ScriptedLlm::new(vec![Ok("raw essay".to_string())]));
        let sink = RecordingSink::default();

        with_editor(llm, Arc::new(DisabledStyleEditor))
            .handle(&task(Some("rivers"), None), &sink)
            .await;

        assert_eq!(sink.states(), vec![TaskState::Working, TaskState::Completed]);
        assert_eq!(
            sink.last_message().unwrap(),
            "Essay on topic 'rivers':\n\nraw essay"
        );
    }

    #[tokio::test]
    async fn test_unedited_edit_request_fails() {
        let llm = Arc::new(ScriptedLlm::new(vec![]));
        let sink = RecordingSink::default();

        with_editor(llm, Arc::new(DisabledStyleEditor))
            .handle(&task(Some("text"), Some(Skill::EditStyle)), &sink)
            .await;

        assert_eq!(sink.states(), vec![TaskState::Working, TaskState::Failed]);
    }

    #[tokio::test]
    async fn test_cancel_without_handle() {
        let orchestrator = monolithic(Arc::new(ScriptedLlm::new(vec![])));
        let sink = RecordingSink::default();

        let outcome = orchestrator.cancel(&task(Some("topic"), None), &sink).await;

        assert_eq!(outcome, PipelineOutcome::Canceled);
        assert_eq!(sink.states(), vec![TaskState::Canceled]);
    }

    #[tokio::test]
    async fn test_missing_input_is_dropped_silently() {
        let llm = Arc::new(ScriptedLlm::new(vec![]));
        let sink = RecordingSink::default();

        let outcome = monolithic(llm.clone()).handle(&task(None, None), &sink).await;

        assert!(outcome.is_none());
        assert!(sink.states().is_empty());
        assert!(llm.calls().is_empty());
    }

    #[tokio::test]
    async fn test_empty_topic_is_still_processed() {
        let llm = Arc::new(ScriptedLlm::new(vec![
            Ok("An essay about nothing.".to_string()),
            Ok("A better essay about nothing.".to_string()),
        ]));
        let sink = RecordingSink::default();

        let outcome = monolithic(llm.clone())
            .handle(&task(Some(""), None), &sink)
            .await;

        assert_eq!(sink.states(), vec![TaskState::Working, TaskState::Completed]);
        assert_eq!(
            sink.last_message().unwrap(),
            "Essay on topic '' written and edited:\n\nA better essay about nothing."
        );
        assert!(matches!(outcome, Some(PipelineOutcome::Completed { .. })));
        assert_eq!(llm.calls().len(), 2);
    }

    #[tokio::test]
    async fn test_panic_becomes_failed() {
        let llm = Arc::new(ScriptedLlm::new(vec![Ok("essay".to_string())]));
        let sink = RecordingSink::default();

        with_editor(llm, Arc::new(PanickingEditor))
            .handle(&task(Some("topic"), None), &sink)
            .await;

        assert_eq!(sink.states(), vec![TaskState::Working, TaskState::Failed]);
        assert!(sink.last_message().unwrap().contains("editor exploded"));
    }

    #[test]
    fn test_resolve_skill() {
        let llm = Arc::new(ScriptedLlm::new(vec![]));
        let generator = TextGenerator::new(llm, "gpt-4");
        let editor_only = PipelineOrchestrator::with_skills(
            EssayProducer::new(generator.clone(), ESSAY),
            Arc::new(LocalStyleEditor::new(generator, EDIT)),
            vec![Skill::EditStyle],
            Skill::EditStyle,
        );

        assert_eq!(editor_only.resolve_skill(None), Skill::EditStyle);
        assert_eq!(editor_only.resolve_skill(Some(Skill::WriteEssay)), Skill::EditStyle);
        assert_eq!(editor_only.skills(), &[Skill::EditStyle]);
    }
}
