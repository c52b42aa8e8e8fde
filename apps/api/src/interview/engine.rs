//! Async driver around the controller: takes the lock to begin a turn,
//! releases it for the model call, and takes it again to apply the result.
//!
//! The call and its completion run on a spawned task, so a request that is
//! dropped mid-call (tab closed, client gone) still lands its result.

use std::sync::Arc;

use chrono::Utc;
use serde::Serialize;
use tokio::sync::Mutex;
use tracing::error;
use uuid::Uuid;

use crate::interview::controller::{
    Controller, Dispatch, EngineError, EngineSettings, Phase, TurnOutcome,
};
use crate::interview::session::{ExportDocument, SessionState};
use crate::llm_client::ModelBackend;

/// Point-in-time copy of everything the presenter needs.
#[derive(Debug, Clone, Serialize)]
pub struct Snapshot {
    pub state: SessionState,
    pub phase: Phase,
    pub draft: Option<String>,
    pub last_error: Option<String>,
    pub notice: Option<String>,
    pub placeholder_text: String,
}

pub struct Engine {
    controller: Arc<Mutex<Controller>>,
    model: Arc<dyn ModelBackend>,
    settings: EngineSettings,
}

impl Engine {
    pub fn new(settings: EngineSettings, model: Arc<dyn ModelBackend>) -> Self {
        Self {
            controller: Arc::new(Mutex::new(Controller::new(settings.clone(), Utc::now()))),
            model,
            settings,
        }
    }

    pub async fn submit(&self, text: &str) -> Result<TurnOutcome, EngineError> {
        let dispatch = self.controller.lock().await.begin_submit(text, Utc::now())?;
        self.run(dispatch).await
    }

    pub async fn retry(&self) -> Result<TurnOutcome, EngineError> {
        let dispatch = self.controller.lock().await.begin_retry(Utc::now())?;
        self.run(dispatch).await
    }

    async fn run(&self, dispatch: Dispatch) -> Result<TurnOutcome, EngineError> {
        let model = Arc::clone(&self.model);
        let controller = Arc::clone(&self.controller);
        let step = dispatch.step.number();

        let task = tokio::spawn(async move {
            let result = model.call(&dispatch.system, &dispatch.user_message).await;
            let mut controller = controller.lock().await;
            controller.complete_call(&dispatch, result, Utc::now())
        });

        task.await.unwrap_or_else(|e| {
            error!("Model task for step {step} did not finish: {e}");
            Err(EngineError::TaskFailed(e.to_string()))
        })
    }

    /// Throws the current session away, like reloading the page.
    pub async fn restart(&self) {
        *self.controller.lock().await = Controller::new(self.settings.clone(), Utc::now());
    }

    pub async fn snapshot(&self) -> Snapshot {
        let controller = self.controller.lock().await;
        Snapshot {
            state: controller.state().clone(),
            phase: controller.phase(),
            draft: controller.draft().map(String::from),
            last_error: controller.last_error().map(String::from),
            notice: controller.notice().map(String::from),
            placeholder_text: controller.settings().placeholder_text.clone(),
        }
    }

    /// Export document plus the id of the session it describes, read
    /// under one lock so a concurrent restart cannot mix the two.
    pub async fn export(&self) -> (Uuid, ExportDocument) {
        let controller = self.controller.lock().await;
        let state = controller.state();
        (
            state.session_id,
            state.export(&self.settings.form_version, self.model.model_name()),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interview::session::{InvitationOption, Step};
    use crate::llm_client::mock::MockModel;
    use crate::llm_client::{LlmError, ModelBackend, ModelReply};
    use async_trait::async_trait;
    use std::time::Duration;
    use tokio::sync::Notify;

    /// Holds each call until the test releases it.
    #[derive(Clone)]
    struct GatedModel {
        gate: Arc<Notify>,
        inner: MockModel,
    }

    #[async_trait]
    impl ModelBackend for GatedModel {
        async fn call(&self, system: &str, user_message: &str) -> Result<ModelReply, LlmError> {
            self.gate.notified().await;
            self.inner.call(system, user_message).await
        }

        fn model_name(&self) -> &str {
            self.inner.model_name()
        }
    }

    async fn wait_while_in_flight(engine: &Engine) -> Snapshot {
        for _ in 0..200 {
            let snap = engine.snapshot().await;
            if snap.phase != Phase::AwaitModel {
                return snap;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        panic!("model call never completed");
    }

    const ANSWER: &str = "I am a third-year student looking at data roles.";

    fn settings() -> EngineSettings {
        EngineSettings {
            form_version: "1.0".to_string(),
            dates_placeholder: "Nov 3-7".to_string(),
            link_placeholder: "https://example.edu/signup".to_string(),
            placeholder_text: "Type here".to_string(),
        }
    }

    fn routed(reaction: &str, next: &str) -> String {
        serde_json::json!({
            "student_reaction": reaction,
            "next_question_id": next,
            "routing_rationale": "matched"
        })
        .to_string()
    }

    fn engine(model: &MockModel) -> Engine {
        Engine::new(settings(), Arc::new(model.clone()))
    }

    #[tokio::test]
    async fn test_happy_path_all_parseable() {
        let model = MockModel::new()
            .reply(routed("You know what you want.", "q2_strategic"))
            .reply(routed("Strong evidence.", "q3_already_strategic"))
            .reply(routed("What should employers understand about you?", ""))
            .reply("## Draft\nYou turn messy data into decisions.")
            .reply("## Your Positioning Statement\nI turn data into decisions.\n\nINVITATION_OPTION: B");
        let engine = engine(&model);

        for _ in 0..5 {
            engine.submit(ANSWER).await.unwrap();
        }

        let (_, doc) = engine.export().await;
        assert_eq!(doc.path_taken.q1, "q1_situation");
        assert_eq!(doc.path_taken.q2.as_deref(), Some("q2_strategic"));
        assert_eq!(doc.path_taken.q3.as_deref(), Some("q3_already_strategic"));
        assert_eq!(doc.invitation_option, Some(InvitationOption::B));
        assert_eq!(doc.conversation.len(), 5);
        assert!(doc.duration_seconds.unwrap() >= 0);
        assert_eq!(doc.metadata.model_used, "mock-model");
        assert_eq!(doc.metadata.total_input_tokens, 500);
        assert_eq!(doc.conversation[3].question_text, "(Prompted by Q3 reaction)");
        assert_eq!(doc.conversation[4].question_text, "(Prompted by Q4 synthesis)");
        assert!(doc.conversation[3].question_id.is_none());
        assert_eq!(model.call_count(), 5);
    }

    #[tokio::test]
    async fn test_fenced_json_routes_turn_one() {
        let model = MockModel::new().reply(
            "```json\n{\"student_reaction\":\"ok\",\"next_question_id\":\"q2_paralyzed\",\"routing_rationale\":\"x\"}\n```",
        );
        let engine = engine(&model);
        engine.submit(ANSWER).await.unwrap();

        let snap = engine.snapshot().await;
        assert_eq!(snap.state.reaction(Step::One), Some("ok"));
        assert_eq!(
            snap.state.selected_questions.q2.as_deref(),
            Some("q2_paralyzed")
        );
    }

    #[tokio::test]
    async fn test_unparseable_routing_falls_back_to_default() {
        let model = MockModel::new()
            .reply(routed("fine", "q2_strategic"))
            .reply("sorry, I can't");
        let engine = engine(&model);
        engine.submit(ANSWER).await.unwrap();
        engine.submit(ANSWER).await.unwrap();

        let snap = engine.snapshot().await;
        assert_eq!(snap.state.reaction(Step::Two), Some("sorry, I can't"));
        assert_eq!(
            snap.state.selected_questions.q3.as_deref(),
            Some("q3_credentials_only")
        );
        assert!(snap.state.routing_rationales["q3"].contains("Fallback"));
    }

    #[tokio::test]
    async fn test_missing_invitation_tag_defaults_to_a() {
        let model = MockModel::new()
            .reply(routed("a", "q2_strategic"))
            .reply(routed("b", "q3_no_network"))
            .reply(routed("c?", ""))
            .reply("## Draft")
            .reply("## Final\nNo trailer at all.");
        let engine = engine(&model);
        for _ in 0..5 {
            engine.submit(ANSWER).await.unwrap();
        }

        let snap = engine.snapshot().await;
        assert_eq!(snap.state.invitation_option, Some(InvitationOption::A));
        assert!(!snap
            .state
            .reaction(Step::Five)
            .unwrap()
            .contains("INVITATION_OPTION"));
    }

    #[tokio::test]
    async fn test_transient_error_then_retry_advances_once() {
        let model = MockModel::new()
            .reply_with_usage(routed("a", "q2_strategic"), 10, 1)
            .reply_with_usage(routed("b", "q3_no_network"), 10, 1)
            .fail(500, "upstream exploded")
            .reply_with_usage(routed("c?", ""), 7, 3);
        let engine = engine(&model);
        engine.submit(ANSWER).await.unwrap();
        engine.submit(ANSWER).await.unwrap();

        let third = "My third answer is long enough to pass the guard.";
        assert!(matches!(
            engine.submit(third).await,
            Err(EngineError::Model(_))
        ));
        let snap = engine.snapshot().await;
        assert_eq!(snap.state.current_step, Step::Three);
        assert_eq!(snap.draft.as_deref(), Some(third));
        assert!(snap.last_error.is_some());

        assert_eq!(engine.retry().await.unwrap(), TurnOutcome::Advanced(Step::Four));

        let (_, doc) = engine.export().await;
        assert_eq!(doc.conversation.len(), 3);
        assert_eq!(doc.conversation[2].student_response, third);
        assert_eq!(doc.metadata.total_input_tokens, 27);
        assert_eq!(doc.metadata.total_output_tokens, 5);
        assert_eq!(model.calls()[3].user_message, third);
    }

    #[tokio::test]
    async fn test_short_input_dispatches_nothing() {
        let model = MockModel::new().reply(routed("a", "q2_strategic"));
        let engine = engine(&model);

        assert!(matches!(
            engine.submit("ten chars!").await,
            Err(EngineError::InputTooShort { .. })
        ));
        assert_eq!(model.call_count(), 0);
        assert_eq!(engine.snapshot().await.state.current_step, Step::One);
    }

    #[tokio::test]
    async fn test_restart_starts_a_fresh_session() {
        let model = MockModel::new().reply(routed("a", "q2_strategic"));
        let engine = engine(&model);
        engine.submit(ANSWER).await.unwrap();
        let before = engine.snapshot().await.state.session_id;

        engine.restart().await;
        let snap = engine.snapshot().await;
        assert_ne!(snap.state.session_id, before);
        assert_eq!(snap.state.current_step, Step::One);
        assert!(snap.state.responses.is_empty());
    }

    #[tokio::test]
    async fn test_dropped_request_still_fails_cleanly_and_can_retry() {
        let gate = Arc::new(Notify::new());
        let model = GatedModel {
            gate: gate.clone(),
            inner: MockModel::new()
                .fail(500, "upstream exploded")
                .reply(routed("a", "q2_strategic")),
        };
        let engine = Engine::new(settings(), Arc::new(model.clone()));

        let dropped = tokio::time::timeout(Duration::from_millis(20), engine.submit(ANSWER)).await;
        assert!(dropped.is_err());
        assert_eq!(engine.snapshot().await.phase, Phase::AwaitModel);

        gate.notify_one();
        let snap = wait_while_in_flight(&engine).await;
        assert_eq!(snap.phase, Phase::AwaitInput);
        assert_eq!(snap.draft.as_deref(), Some(ANSWER));
        assert!(snap.last_error.is_some());

        gate.notify_one();
        assert_eq!(engine.retry().await.unwrap(), TurnOutcome::Advanced(Step::Two));
        assert_eq!(model.inner.call_count(), 2);
    }

    #[tokio::test]
    async fn test_dropped_request_still_lands_a_successful_reply() {
        let gate = Arc::new(Notify::new());
        let model = GatedModel {
            gate: gate.clone(),
            inner: MockModel::new().reply(routed("Landed.", "q2_pivoting")),
        };
        let engine = Engine::new(settings(), Arc::new(model));

        let dropped = tokio::time::timeout(Duration::from_millis(20), engine.submit(ANSWER)).await;
        assert!(dropped.is_err());

        gate.notify_one();
        let snap = wait_while_in_flight(&engine).await;
        assert_eq!(snap.state.current_step, Step::Two);
        assert_eq!(snap.state.reaction(Step::One), Some("Landed."));
        assert_eq!(snap.state.response(Step::One), Some(ANSWER));
    }

    #[tokio::test]
    async fn test_export_reports_the_session_it_describes() {
        let engine = engine(&MockModel::new());
        engine.restart().await;
        let (id, doc) = engine.export().await;
        assert_eq!(id, engine.snapshot().await.state.session_id);
        assert!(doc.conversation.is_empty());
    }
}
