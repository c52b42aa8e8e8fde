//! Question Bank — the fixed opening question plus the step-2 and step-3 branches.
//!
//! The model picks the next branch by id; the id sets below are the closed
//! menus it may choose from. The bank is never mutated.

use serde::Serialize;

pub const OPENING_QUESTION_ID: &str = "q1_situation";

/// Used when the model's step-2 choice is missing or unknown.
pub const DEFAULT_Q2_ID: &str = "q2_active_unfocused";
/// Used when the model's step-3 choice is missing or unknown.
pub const DEFAULT_Q3_ID: &str = "q3_credentials_only";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Question {
    pub id: &'static str,
    pub step: u8,
    pub text: &'static str,
    pub fixed: bool,
}

const fn branch(id: &'static str, step: u8, text: &'static str) -> Question {
    Question {
        id,
        step,
        text,
        fixed: false,
    }
}

static BANK: &[Question] = &[
    Question {
        id: OPENING_QUESTION_ID,
        step: 1,
        text: "Where are you right now in your career search? Describe your situation \
               in a few sentences: what you are studying, what kind of work you are \
               aiming for, and what you have done about it so far.",
        fixed: true,
    },
    branch(
        "q2_strategic",
        2,
        "You seem to have a clear target. What is the specific role or organization \
         you are aiming for, and what makes you confident it is the right fit?",
    ),
    branch(
        "q2_active_unfocused",
        2,
        "You are clearly putting in effort. If you had to narrow your search to one \
         kind of role this month, which would it be, and what is stopping you from \
         committing to it?",
    ),
    branch(
        "q2_paralyzed",
        2,
        "It sounds like it is hard to know where to start. Think of one moment in a \
         class, job, or project where you lost track of time. What were you doing?",
    ),
    branch(
        "q2_pivoting",
        2,
        "You are moving away from one path toward another. What is pulling you toward \
         the new direction, and what from your old path do you want to carry with you?",
    ),
    branch(
        "q2_exploring",
        2,
        "You are still exploring, which is fine. Name two or three fields you are \
         curious about. What have you actually tried to learn about each?",
    ),
    branch(
        "q3_already_strategic",
        3,
        "Tell me about the strongest piece of evidence you could show a hiring manager \
         today: a project, result, or experience that proves you can do this work.",
    ),
    branch(
        "q3_credentials_only",
        3,
        "Beyond your degree and coursework, what have you built, fixed, led, or \
         improved? Describe one concrete thing and what changed because of you.",
    ),
    branch(
        "q3_no_network",
        3,
        "Who do you know, even loosely, who works near the field you want? Describe \
         your last real conversation with someone in that world.",
    ),
    branch(
        "q3_unclear_value",
        3,
        "When classmates or coworkers come to you for help, what do they usually ask \
         about? Give a recent example.",
    ),
    branch(
        "q3_mixed_signals",
        3,
        "You have described a few different directions. Which piece of your past \
         experience would matter in every one of them, and why?",
    ),
];

/// Looks a question up by id.
pub fn get(id: &str) -> Option<&'static Question> {
    BANK.iter().find(|q| q.id == id)
}

/// All questions at a step, in catalog order.
pub fn all_at_step(step: u8) -> Vec<&'static Question> {
    BANK.iter().filter(|q| q.step == step).collect()
}

/// True when `id` names a question at exactly `step`.
pub fn is_valid_at_step(id: &str, step: u8) -> bool {
    all_at_step(step).iter().any(|q| q.id == id)
}

pub fn opening() -> &'static Question {
    &BANK[0]
}
