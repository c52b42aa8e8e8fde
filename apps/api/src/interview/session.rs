//! Session state for one interview, the per-turn records derived from it,
//! and the downloadable export document.
//!
//! Only the controller mutates a `SessionState`; everything else reads clones.

use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Serialize, Serializer};
use tracing::warn;
use uuid::Uuid;

use crate::interview::questions;

pub const Q4_QUESTION_SENTINEL: &str = "(Prompted by Q3 reaction)";
pub const Q5_QUESTION_SENTINEL: &str = "(Prompted by Q4 synthesis)";

// ────────────────────────────────────────────────────────────────────────────
// Step
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Step {
    One,
    Two,
    Three,
    Four,
    Five,
}

impl Step {
    pub const ALL: [Step; 5] = [Step::One, Step::Two, Step::Three, Step::Four, Step::Five];

    pub fn number(self) -> u8 {
        match self {
            Step::One => 1,
            Step::Two => 2,
            Step::Three => 3,
            Step::Four => 4,
            Step::Five => 5,
        }
    }

    pub fn from_number(n: u8) -> Option<Step> {
        Step::ALL.into_iter().find(|s| s.number() == n)
    }

    /// State key for this turn: `q1` … `q5`.
    pub fn key(self) -> &'static str {
        match self {
            Step::One => "q1",
            Step::Two => "q2",
            Step::Three => "q3",
            Step::Four => "q4",
            Step::Five => "q5",
        }
    }

    pub fn next(self) -> Option<Step> {
        Step::from_number(self.number() + 1)
    }

    pub fn label(self) -> &'static str {
        match self {
            Step::One => "Your Situation",
            Step::Two => "Your Direction",
            Step::Three => "Your Evidence",
            Step::Four => "Synthesis",
            Step::Five => "Positioning Statement",
        }
    }
}

impl Serialize for Step {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u8(self.number())
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Invitation option
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum InvitationOption {
    A,
    B,
    C,
}

impl InvitationOption {
    pub fn from_letter(letter: char) -> Option<Self> {
        match letter.to_ascii_uppercase() {
            'A' => Some(Self::A),
            'B' => Some(Self::B),
            'C' => Some(Self::C),
            _ => None,
        }
    }
}

impl fmt::Display for InvitationOption {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let letter = match self {
            Self::A => "A",
            Self::B => "B",
            Self::C => "C",
        };
        f.write_str(letter)
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Session state
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize)]
pub struct SelectedQuestions {
    pub q1: String,
    pub q2: Option<String>,
    pub q3: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct Timestamps {
    pub start: DateTime<Utc>,
    /// `qK_submit` for every completed turn.
    pub submits: BTreeMap<String, DateTime<Utc>>,
    pub end: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct TokenUsage {
    pub input: u64,
    pub output: u64,
}

#[derive(Debug, Clone, Serialize)]
pub struct SessionState {
    pub session_id: Uuid,
    pub current_step: Step,
    pub responses: BTreeMap<String, String>,
    pub ai_reactions: BTreeMap<String, String>,
    pub selected_questions: SelectedQuestions,
    pub routing_rationales: BTreeMap<String, String>,
    pub timestamps: Timestamps,
    pub invitation_option: Option<InvitationOption>,
    pub token_usage: TokenUsage,
    pub complete: bool,
}

impl SessionState {
    pub fn new(now: DateTime<Utc>) -> Self {
        Self {
            session_id: Uuid::new_v4(),
            current_step: Step::One,
            responses: BTreeMap::new(),
            ai_reactions: BTreeMap::new(),
            selected_questions: SelectedQuestions {
                q1: questions::opening().id.to_string(),
                q2: None,
                q3: None,
            },
            routing_rationales: BTreeMap::new(),
            timestamps: Timestamps {
                start: now,
                submits: BTreeMap::new(),
                end: None,
            },
            invitation_option: None,
            token_usage: TokenUsage::default(),
            complete: false,
        }
    }

    pub fn response(&self, step: Step) -> Option<&str> {
        self.responses.get(step.key()).map(String::as_str)
    }

    pub fn reaction(&self, step: Step) -> Option<&str> {
        self.ai_reactions.get(step.key()).map(String::as_str)
    }

    pub fn is_answered(&self, step: Step) -> bool {
        self.responses.contains_key(step.key()) && self.ai_reactions.contains_key(step.key())
    }

    /// The bank id for a routed turn (1–3); `None` for 4–5 or an unrouted turn.
    pub fn question_id(&self, step: Step) -> Option<&str> {
        match step {
            Step::One => Some(self.selected_questions.q1.as_str()),
            Step::Two => self.selected_questions.q2.as_deref(),
            Step::Three => self.selected_questions.q3.as_deref(),
            Step::Four | Step::Five => None,
        }
    }

    /// Question text as shown to the student and recorded on export.
    pub fn question_text(&self, step: Step) -> String {
        match step {
            Step::Four => Q4_QUESTION_SENTINEL.to_string(),
            Step::Five => Q5_QUESTION_SENTINEL.to_string(),
            _ => match self.question_id(step) {
                Some(id) => match questions::get(id) {
                    Some(q) => q.text.to_string(),
                    None => {
                        warn!("Question id '{id}' is not in the bank");
                        String::new()
                    }
                },
                None => String::new(),
            },
        }
    }

    /// One record per answered turn, in step order.
    pub fn turn_records(&self) -> Vec<TurnRecord> {
        Step::ALL
            .into_iter()
            .filter(|step| self.is_answered(*step))
            .map(|step| TurnRecord {
                step,
                question_id: self.question_id(step).map(String::from),
                question_text: self.question_text(step),
                student_response: self.response(step).unwrap_or_default().to_string(),
                ai_reaction: self.reaction(step).unwrap_or_default().to_string(),
                timestamp: self.timestamps.submits.get(step.key()).copied(),
                routing: self.routing_for(step),
            })
            .collect()
    }

    fn routing_for(&self, step: Step) -> Option<Routing> {
        let next = match step {
            Step::One | Step::Two => step.next()?,
            _ => return None,
        };
        let next_question_id = self.question_id(next)?.to_string();
        Some(Routing {
            next_question_id,
            rationale: self
                .routing_rationales
                .get(next.key())
                .cloned()
                .unwrap_or_default(),
        })
    }

    pub fn export(&self, form_version: &str, model_used: &str) -> ExportDocument {
        let duration_seconds = self.timestamps.end.map(|end| {
            let millis = (end - self.timestamps.start).num_milliseconds();
            (millis as f64 / 1000.0).round() as i64
        });

        ExportDocument {
            timestamp_start: self.timestamps.start,
            timestamp_end: self.timestamps.end,
            duration_seconds,
            path_taken: PathTaken {
                q1: self.selected_questions.q1.clone(),
                q2: self.selected_questions.q2.clone(),
                q3: self.selected_questions.q3.clone(),
            },
            conversation: self.turn_records(),
            invitation_option: self.invitation_option,
            metadata: ExportMetadata {
                form_version: form_version.to_string(),
                model_used: model_used.to_string(),
                total_input_tokens: self.token_usage.input,
                total_output_tokens: self.token_usage.output,
            },
        }
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Turn records and export
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Routing {
    pub next_question_id: String,
    pub rationale: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct TurnRecord {
    pub step: Step,
    pub question_id: Option<String>,
    pub question_text: String,
    pub student_response: String,
    pub ai_reaction: String,
    pub timestamp: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub routing: Option<Routing>,
}

#[derive(Debug, Clone, Serialize)]
pub struct PathTaken {
    pub q1: String,
    pub q2: Option<String>,
    pub q3: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ExportMetadata {
    pub form_version: String,
    pub model_used: String,
    pub total_input_tokens: u64,
    pub total_output_tokens: u64,
}

#[derive(Debug, Clone, Serialize)]
pub struct ExportDocument {
    pub timestamp_start: DateTime<Utc>,
    pub timestamp_end: Option<DateTime<Utc>>,
    pub duration_seconds: Option<i64>,
    pub path_taken: PathTaken,
    pub conversation: Vec<TurnRecord>,
    pub invitation_option: Option<InvitationOption>,
    pub metadata: ExportMetadata,
}
