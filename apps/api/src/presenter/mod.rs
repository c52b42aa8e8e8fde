//! Presenter — turns an engine snapshot into the progressive-disclosure view:
//! progress indicator, active card, timeline of past turns, and the final
//! deliverable card. `page` renders that view as HTML.

pub mod markdown;
pub mod page;

use serde::Serialize;

use crate::interview::controller::MIN_RESPONSE_CHARS;
use crate::interview::session::{InvitationOption, Step};
use crate::interview::{Phase, Snapshot};
use markdown::{excerpt, render_markdown};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StepStatus {
    Upcoming,
    Active,
    Done,
}

#[derive(Debug, Clone, Serialize)]
pub struct StepIndicator {
    pub step: Step,
    pub label: &'static str,
    pub status: StepStatus,
}

#[derive(Debug, Clone, Serialize)]
pub struct ActiveCard {
    pub step: Step,
    pub label: &'static str,
    /// Blank for turns 4 and 5; their prompt is the coach's last reply.
    pub question_text: String,
    pub coach_reply_html: Option<String>,
    pub draft: String,
    pub locked: bool,
    pub error: Option<String>,
    /// Refused-submit message; shown without a retry action.
    pub notice: Option<String>,
    pub min_chars: usize,
    pub placeholder_text: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct TimelineCard {
    pub step: Step,
    pub label: &'static str,
    pub excerpt: String,
    pub question_text: String,
    pub response: String,
    pub reaction_html: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct DeliverableCard {
    /// Markdown source; exactly what the copy action writes.
    pub source: String,
    pub html: String,
    pub invitation_option: Option<InvitationOption>,
}

#[derive(Debug, Clone, Serialize)]
pub struct PageView {
    pub progress: Vec<StepIndicator>,
    pub active: Option<ActiveCard>,
    pub timeline: Vec<TimelineCard>,
    pub deliverable: Option<DeliverableCard>,
    pub complete: bool,
}

pub fn build_view(snapshot: &Snapshot) -> PageView {
    let state = &snapshot.state;
    let current = state.current_step;

    let progress = Step::ALL
        .into_iter()
        .map(|step| StepIndicator {
            step,
            label: step.label(),
            status: if state.complete || step < current {
                StepStatus::Done
            } else if step == current {
                StepStatus::Active
            } else {
                StepStatus::Upcoming
            },
        })
        .collect();

    let timeline = state
        .turn_records()
        .into_iter()
        .map(|record| TimelineCard {
            step: record.step,
            label: record.step.label(),
            excerpt: excerpt(&record.student_response),
            question_text: record.question_text,
            response: record.student_response,
            reaction_html: render_markdown(&record.ai_reaction),
        })
        .collect();

    let active = (!state.complete).then(|| ActiveCard {
        step: current,
        label: current.label(),
        question_text: match current {
            Step::One | Step::Two | Step::Three => state.question_text(current),
            Step::Four | Step::Five => String::new(),
        },
        coach_reply_html: Step::from_number(current.number() - 1)
            .and_then(|previous| state.reaction(previous))
            .map(render_markdown),
        draft: snapshot.draft.clone().unwrap_or_default(),
        locked: snapshot.phase == Phase::AwaitModel,
        error: snapshot.last_error.clone(),
        notice: snapshot.notice.clone(),
        min_chars: MIN_RESPONSE_CHARS,
        placeholder_text: snapshot.placeholder_text.clone(),
    });

    let deliverable = state
        .reaction(Step::Five)
        .filter(|_| state.complete)
        .map(|source| DeliverableCard {
            source: source.to_string(),
            html: render_markdown(source),
            invitation_option: state.invitation_option,
        });

    PageView {
        progress,
        active,
        timeline,
        deliverable,
        complete: state.complete,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    use crate::interview::session::SessionState;

    fn snapshot(state: SessionState, phase: Phase) -> Snapshot {
        Snapshot {
            state,
            phase,
            draft: None,
            last_error: None,
            notice: None,
            placeholder_text: "Type here".to_string(),
        }
    }

    fn answer(state: &mut SessionState, step: Step, response: &str, reaction: &str) {
        state.responses.insert(step.key().into(), response.into());
        state.ai_reactions.insert(step.key().into(), reaction.into());
    }

    fn active_count(view: &PageView) -> usize {
        view.progress
            .iter()
            .filter(|s| s.status == StepStatus::Active)
            .count()
    }

    #[test]
    fn test_fresh_session_view() {
        let view = build_view(&snapshot(SessionState::new(Utc::now()), Phase::AwaitInput));
        assert_eq!(active_count(&view), 1);
        assert_eq!(view.progress[0].status, StepStatus::Active);
        assert_eq!(view.progress[4].status, StepStatus::Upcoming);
        let card = view.active.unwrap();
        assert!(card.question_text.starts_with("Where are you right now"));
        assert!(card.coach_reply_html.is_none());
        assert!(!card.locked);
        assert!(view.timeline.is_empty());
        assert!(view.deliverable.is_none());
    }

    #[test]
    fn test_mid_session_view() {
        let mut state = SessionState::new(Utc::now());
        answer(&mut state, Step::One, &"a".repeat(200), "Nice **start**");
        state.selected_questions.q2 = Some("q2_paralyzed".into());
        state.current_step = Step::Two;

        let view = build_view(&snapshot(state, Phase::AwaitModel));
        assert_eq!(active_count(&view), 1);
        assert_eq!(view.progress[0].status, StepStatus::Done);
        assert_eq!(view.progress[1].status, StepStatus::Active);

        let card = view.active.unwrap();
        assert!(card.locked);
        assert!(card.question_text.contains("lost track of time"));
        assert_eq!(
            card.coach_reply_html.as_deref(),
            Some("<p>Nice <strong>start</strong></p>\n")
        );

        assert_eq!(view.timeline.len(), 1);
        assert_eq!(view.timeline[0].excerpt.chars().count(), 121);
        assert_eq!(view.timeline[0].response.len(), 200);
    }

    #[test]
    fn test_late_turns_have_blank_question() {
        let mut state = SessionState::new(Utc::now());
        state.current_step = Step::Four;
        let view = build_view(&snapshot(state, Phase::AwaitInput));
        assert_eq!(view.active.unwrap().question_text, "");
    }

    #[test]
    fn test_complete_view_has_deliverable_and_no_active_step() {
        let mut state = SessionState::new(Utc::now());
        for step in Step::ALL {
            answer(&mut state, step, "response text", "## Final\nBody");
        }
        state.current_step = Step::Five;
        state.complete = true;
        state.invitation_option = Some(InvitationOption::B);

        let view = build_view(&snapshot(state.clone(), Phase::Done));
        assert_eq!(active_count(&view), 0);
        assert!(view.progress.iter().all(|s| s.status == StepStatus::Done));
        assert!(view.active.is_none());
        assert_eq!(view.timeline.len(), 5);

        let deliverable = view.deliverable.unwrap();
        assert_eq!(deliverable.source, state.reaction(Step::Five).unwrap());
        assert_eq!(deliverable.html, render_markdown(&deliverable.source));
    }
}
