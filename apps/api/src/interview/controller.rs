//! Conversation Controller — the five-turn state machine.
//!
//! Each turn is two halves: `begin_submit` (guard, flip to `AwaitModel`,
//! assemble the prompt) and `complete_call` (apply the model result). The
//! async engine holds the lock for each half but never across the model call,
//! so the phase flag is what keeps at most one call in flight.

use chrono::{DateTime, Utc};
use serde::Serialize;
use thiserror::Error;
use tracing::{info, warn};
use uuid::Uuid;

use crate::interview::prompts::{assemble, template_for, PromptValues};
use crate::interview::questions::{self, DEFAULT_Q2_ID, DEFAULT_Q3_ID};
use crate::interview::replies::{parse_deliverable, parse_routing};
use crate::interview::session::{SessionState, Step};
use crate::llm_client::{LlmError, ModelReply};

/// Minimum trimmed response length before a turn may be submitted.
pub const MIN_RESPONSE_CHARS: usize = 20;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("Response must be at least {min} characters (got {actual})")]
    InputTooShort { min: usize, actual: usize },

    #[error("A response is already being processed")]
    CallInFlight,

    #[error("The interview is already complete")]
    SessionComplete,

    #[error("There is no failed response to retry")]
    NothingToRetry,

    #[error("Model call failed: {0}")]
    Model(#[from] LlmError),

    #[error("Model returned no usable reply for step {step}")]
    EmptyReaction { step: u8 },

    #[error("Model call task failed: {0}")]
    TaskFailed(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    AwaitInput,
    AwaitModel,
    Done,
}

/// Interview-relevant slice of the process configuration, frozen per engine.
#[derive(Debug, Clone)]
pub struct EngineSettings {
    pub form_version: String,
    pub dates_placeholder: String,
    pub link_placeholder: String,
    pub placeholder_text: String,
}

/// An outbound call the engine must make on the controller's behalf.
#[derive(Debug, Clone)]
pub struct Dispatch {
    pub session_id: Uuid,
    pub step: Step,
    pub system: String,
    pub user_message: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TurnOutcome {
    Advanced(Step),
    Completed,
    /// The result belonged to a session or step that is no longer waiting.
    Discarded,
}

pub struct Controller {
    settings: EngineSettings,
    state: SessionState,
    phase: Phase,
    draft: Option<String>,
    pending_submit: Option<DateTime<Utc>>,
    last_error: Option<String>,
    /// Why the last submit was refused before dispatch.
    notice: Option<String>,
}

pub fn meets_min_length(text: &str) -> bool {
    text.trim().chars().count() >= MIN_RESPONSE_CHARS
}

impl Controller {
    pub fn new(settings: EngineSettings, now: DateTime<Utc>) -> Self {
        let state = SessionState::new(now);
        info!("Started interview session {}", state.session_id);
        Self {
            settings,
            state,
            phase: Phase::AwaitInput,
            draft: None,
            pending_submit: None,
            last_error: None,
            notice: None,
        }
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn settings(&self) -> &EngineSettings {
        &self.settings
    }

    /// Input preserved from a submitted or failed turn.
    pub fn draft(&self) -> Option<&str> {
        self.draft.as_deref()
    }

    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    pub fn notice(&self) -> Option<&str> {
        self.notice.as_deref()
    }

    /// Accepts the student's text for the current step and returns the call to make.
    pub fn begin_submit(&mut self, text: &str, now: DateTime<Utc>) -> Result<Dispatch, EngineError> {
        self.ensure_accepting()?;

        // The text is kept either way so a refused submit never loses it
        self.draft = Some(text.to_string());

        let actual = text.trim().chars().count();
        if actual < MIN_RESPONSE_CHARS {
            let err = EngineError::InputTooShort {
                min: MIN_RESPONSE_CHARS,
                actual,
            };
            self.last_error = None;
            self.notice = Some(err.to_string());
            return Err(err);
        }

        Ok(self.dispatch(now))
    }

    /// Re-dispatches the preserved input after a failed call.
    pub fn begin_retry(&mut self, now: DateTime<Utc>) -> Result<Dispatch, EngineError> {
        self.ensure_accepting()?;
        if self.last_error.is_none() || self.draft.is_none() {
            return Err(EngineError::NothingToRetry);
        }
        Ok(self.dispatch(now))
    }

    fn ensure_accepting(&self) -> Result<(), EngineError> {
        match self.phase {
            Phase::AwaitInput => Ok(()),
            Phase::AwaitModel => Err(EngineError::CallInFlight),
            Phase::Done => Err(EngineError::SessionComplete),
        }
    }

    fn dispatch(&mut self, now: DateTime<Utc>) -> Dispatch {
        let step = self.state.current_step;
        let user_message = self.draft.clone().unwrap_or_default();
        let system = assemble(template_for(step), &self.prompt_values(&user_message));

        self.phase = Phase::AwaitModel;
        self.pending_submit = Some(now);
        self.last_error = None;
        self.notice = None;
        info!("Dispatching step {} for session {}", step.number(), self.state.session_id);

        Dispatch {
            session_id: self.state.session_id,
            step,
            system,
            user_message,
        }
    }

    /// Values for every turn up to and including the current one, read from
    /// the live state at dispatch time.
    fn prompt_values(&self, pending_response: &str) -> PromptValues {
        let current = self.state.current_step;
        let mut values = PromptValues::new();

        for step in Step::ALL.into_iter().filter(|s| *s < current) {
            if let Some(response) = self.state.response(step) {
                values.insert(response_key(step), response.to_string());
            }
            if let Some(reaction) = self.state.reaction(step) {
                values.insert(reaction_key(step), reaction.to_string());
            }
        }
        values.insert(response_key(current), pending_response.to_string());

        if current >= Step::Two {
            if let Some(id) = self.state.question_id(Step::Two) {
                values.insert("q2_question_id", id.to_string());
                values.insert("q2_question_text", self.state.question_text(Step::Two));
            }
        }
        if current >= Step::Three {
            if let Some(id) = self.state.question_id(Step::Three) {
                values.insert("q3_question_id", id.to_string());
                values.insert("q3_question_text", self.state.question_text(Step::Three));
            }
        }
        if current == Step::Five {
            values.insert("DATES_PLACEHOLDER", self.settings.dates_placeholder.clone());
            values.insert("LINK_PLACEHOLDER", self.settings.link_placeholder.clone());
        }

        values
    }

    /// Applies the result of a dispatched call.
    pub fn complete_call(
        &mut self,
        dispatch: &Dispatch,
        result: Result<ModelReply, LlmError>,
        now: DateTime<Utc>,
    ) -> Result<TurnOutcome, EngineError> {
        if dispatch.session_id != self.state.session_id
            || dispatch.step != self.state.current_step
            || self.phase != Phase::AwaitModel
        {
            warn!(
                "Discarding model result for session {} step {}",
                dispatch.session_id,
                dispatch.step.number()
            );
            return Ok(TurnOutcome::Discarded);
        }

        let reply = match result {
            Ok(reply) => reply,
            Err(e) => return Err(self.fail(EngineError::Model(e))),
        };

        let step = dispatch.step;
        let reaction = match step {
            Step::One | Step::Two | Step::Three => {
                let default_next = match step {
                    Step::One => DEFAULT_Q2_ID,
                    _ => DEFAULT_Q3_ID,
                };
                let routing = parse_routing(&reply.content, default_next);
                if routing.student_reaction.trim().is_empty() {
                    return Err(self.fail(EngineError::EmptyReaction { step: step.number() }));
                }
                if routing.is_fallback() {
                    warn!("Step {} reply was not JSON; using fallback routing", step.number());
                }
                if let Some(next) = step.next().filter(|_| step != Step::Three) {
                    self.select_next_question(next, routing.next_question_id.as_deref(), default_next);
                    self.state
                        .routing_rationales
                        .insert(next.key().to_string(), routing.routing_rationale);
                }
                routing.student_reaction
            }
            Step::Four => {
                if reply.content.trim().is_empty() {
                    return Err(self.fail(EngineError::EmptyReaction { step: 4 }));
                }
                reply.content.clone()
            }
            Step::Five => {
                let deliverable = parse_deliverable(&reply.content);
                if deliverable.text.trim().is_empty() {
                    return Err(self.fail(EngineError::EmptyReaction { step: 5 }));
                }
                self.state.invitation_option = Some(deliverable.invitation_option);
                deliverable.text
            }
        };

        let key = step.key().to_string();
        self.state
            .responses
            .insert(key.clone(), self.draft.take().unwrap_or_default());
        self.state.ai_reactions.insert(key.clone(), reaction);
        if let Some(submitted) = self.pending_submit.take() {
            self.state.timestamps.submits.insert(key, submitted);
        }
        self.state.token_usage.input += u64::from(reply.usage.input_tokens);
        self.state.token_usage.output += u64::from(reply.usage.output_tokens);
        self.last_error = None;

        match step.next() {
            Some(next) => {
                self.state.current_step = next;
                self.phase = Phase::AwaitInput;
                info!(
                    "Session {} advanced to step {}",
                    self.state.session_id,
                    next.number()
                );
                Ok(TurnOutcome::Advanced(next))
            }
            None => {
                self.state.timestamps.end = Some(now);
                self.state.complete = true;
                self.phase = Phase::Done;
                info!(
                    "Session {} complete with invitation option {:?}",
                    self.state.session_id, self.state.invitation_option
                );
                Ok(TurnOutcome::Completed)
            }
        }
    }

    /// Freezes the branch for `next`, falling back to the default when the
    /// model named nothing or something outside that step's bank.
    fn select_next_question(&mut self, next: Step, chosen: Option<&str>, default_id: &str) {
        let id = match chosen {
            Some(id) if questions::is_valid_at_step(id, next.number()) => id,
            other => {
                warn!(
                    "Model chose {:?} for step {}; using default {}",
                    other,
                    next.number(),
                    default_id
                );
                default_id
            }
        };
        match next {
            Step::Two => self.state.selected_questions.q2 = Some(id.to_string()),
            Step::Three => self.state.selected_questions.q3 = Some(id.to_string()),
            _ => {}
        }
    }

    /// Returns to input with the draft intact so the student can retry.
    fn fail(&mut self, err: EngineError) -> EngineError {
        warn!(
            "Step {} failed for session {}: {err}",
            self.state.current_step.number(),
            self.state.session_id
        );
        self.phase = Phase::AwaitInput;
        self.pending_submit = None;
        self.last_error = Some(err.to_string());
        err
    }
}

fn response_key(step: Step) -> &'static str {
    match step {
        Step::One => "q1_response",
        Step::Two => "q2_response",
        Step::Three => "q3_response",
        Step::Four => "q4_response",
        Step::Five => "q5_response",
    }
}

fn reaction_key(step: Step) -> &'static str {
    match step {
        Step::One => "q1_ai_reaction",
        Step::Two => "q2_ai_reaction",
        Step::Three => "q3_ai_reaction",
        Step::Four => "q4_ai_reaction",
        // No template consumes the final reaction
        Step::Five => "q5_ai_reaction",
    }
}
