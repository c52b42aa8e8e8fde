//! Peer Discussion Helper — a stateless, single-shot question generator for
//! discussion boards. Shares the resilient JSON extraction of the interview.

pub mod handlers;
pub mod prompts;

use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{info, warn};

use crate::errors::AppError;
use crate::llm_client::parse::extract_json;
use crate::llm_client::ModelBackend;
use prompts::{PEER_DISCUSSION_PROMPT_TEMPLATE, PEER_DISCUSSION_SYSTEM};

pub const MAX_RESPONSE_CHARS: usize = 3000;
pub const DEFAULT_QUESTION_COUNT: usize = 3;
pub const FALLBACK_OBSERVATION: &str = "Here are some thoughts on this response.";

static FIELD_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\{(course|context|num_questions|prompt|response)\}").expect("peer field regex")
});

#[derive(Debug, Clone, Deserialize)]
pub struct PeerDiscussionRequest {
    pub prompt: String,
    pub response: String,
    #[serde(default)]
    pub context: Option<String>,
    #[serde(default)]
    pub course: Option<String>,
    #[serde(default, rename = "numQuestions")]
    pub num_questions: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PeerDiscussionResponse {
    pub questions: Vec<String>,
    pub observation: String,
}

/// Clamps the requested count to 1..=5, defaulting to 3.
pub fn question_count(requested: Option<i64>) -> usize {
    requested.map_or(DEFAULT_QUESTION_COUNT, |n| n.clamp(1, 5) as usize)
}

/// First `MAX_RESPONSE_CHARS` characters of the classmate's response.
pub fn trim_response(response: &str) -> String {
    response.chars().take(MAX_RESPONSE_CHARS).collect()
}

pub async fn generate_peer_questions(
    llm: &dyn ModelBackend,
    request: &PeerDiscussionRequest,
) -> Result<PeerDiscussionResponse, AppError> {
    if request.prompt.trim().is_empty() || request.response.trim().is_empty() {
        return Err(AppError::Validation(
            "prompt and response are both required".to_string(),
        ));
    }

    let count = question_count(request.num_questions);
    let prompt = fill_prompt(request, count);

    let reply = llm
        .call(PEER_DISCUSSION_SYSTEM, &prompt)
        .await
        .map_err(|e| AppError::Llm(format!("Peer discussion call failed: {e}")))?;

    let parsed = parse_peer_reply(&reply.content, count)?;
    info!("Generated {} peer discussion questions", parsed.questions.len());
    Ok(parsed)
}

/// Fills the template in one pass; text supplied by students is never
/// rescanned for fields.
fn fill_prompt(request: &PeerDiscussionRequest, count: usize) -> String {
    FIELD_RE
        .replace_all(PEER_DISCUSSION_PROMPT_TEMPLATE, |caps: &Captures| match &caps[1] {
            "course" => request
                .course
                .as_deref()
                .unwrap_or("(not specified)")
                .to_string(),
            "context" => request.context.as_deref().unwrap_or("(none)").to_string(),
            "num_questions" => count.to_string(),
            "prompt" => request.prompt.clone(),
            _ => trim_response(&request.response),
        })
        .into_owned()
}

/// Extracts `{questions, observation}` from the model's reply.
///
/// Unrecoverable text becomes a single "question" with a stock observation.
/// A recovered object whose `questions` is missing, not an array, or empty
/// is a bad gateway.
pub fn parse_peer_reply(raw: &str, count: usize) -> Result<PeerDiscussionResponse, AppError> {
    let Some(object) = extract_json(raw, |v: &Value| v.is_object()) else {
        warn!("Peer discussion reply was not JSON; returning raw text");
        return Ok(PeerDiscussionResponse {
            questions: vec![raw.trim().to_string()],
            observation: FALLBACK_OBSERVATION.to_string(),
        });
    };

    let questions: Vec<String> = match object.get("questions").and_then(Value::as_array) {
        Some(items) if !items.is_empty() => items
            .iter()
            .map(|q| match q.as_str() {
                Some(s) => s.to_string(),
                None => q.to_string(),
            })
            .take(count)
            .collect(),
        _ => {
            return Err(AppError::BadGateway(
                "Model response did not contain a non-empty questions array".to_string(),
            ))
        }
    };

    if questions.len() < count {
        warn!("Asked for {count} questions, model returned {}", questions.len());
    }

    let observation = object
        .get("observation")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string();

    Ok(PeerDiscussionResponse {
        questions,
        observation,
    })
}
