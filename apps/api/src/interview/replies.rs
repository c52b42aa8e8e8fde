//! Parsers for model replies: the JSON routing reply (turns 1–3) and the
//! plaintext deliverable with its hidden `INVITATION_OPTION` trailer (turn 5).

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::interview::session::InvitationOption;
use crate::llm_client::parse::extract_json;

pub const FALLBACK_RATIONALE: &str = "Fallback — could not parse JSON from AI response.";

static INVITATION_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)^INVITATION_OPTION:\s*([ABC])").expect("invitation regex"));

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoutingReply {
    pub student_reaction: String,
    #[serde(default)]
    pub next_question_id: Option<String>,
    #[serde(default)]
    pub routing_rationale: String,
}

impl RoutingReply {
    pub fn is_fallback(&self) -> bool {
        self.routing_rationale == FALLBACK_RATIONALE
    }
}

/// Parses a turn 1–3 reply. Never fails: when no JSON object with a
/// non-empty `student_reaction` can be recovered, the trimmed raw text
/// becomes the reaction and `default_next` the routing choice.
pub fn parse_routing(raw: &str, default_next: &str) -> RoutingReply {
    extract_json(raw, |r: &RoutingReply| !r.student_reaction.trim().is_empty()).unwrap_or_else(
        || RoutingReply {
            student_reaction: raw.trim().to_string(),
            next_question_id: Some(default_next.to_string()),
            routing_rationale: FALLBACK_RATIONALE.to_string(),
        },
    )
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Deliverable {
    pub text: String,
    pub invitation_option: InvitationOption,
}

/// Splits the turn-5 body into display text and invitation tier.
///
/// Every trailer line is removed (so the parse is idempotent); the last one
/// decides the option. No trailer means option A.
pub fn parse_deliverable(raw: &str) -> Deliverable {
    let mut option = None;
    let mut kept: Vec<&str> = Vec::new();

    for line in raw.lines() {
        match INVITATION_RE.captures(line.trim_start()) {
            Some(caps) => option = caps[1].chars().next().and_then(InvitationOption::from_letter),
            None => kept.push(line),
        }
    }

    Deliverable {
        text: kept.join("\n").trim_end().to_string(),
        invitation_option: option.unwrap_or(InvitationOption::A),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reply(reaction: &str, next: Option<&str>, why: &str) -> RoutingReply {
        RoutingReply {
            student_reaction: reaction.to_string(),
            next_question_id: next.map(String::from),
            routing_rationale: why.to_string(),
        }
    }

    #[test]
    fn test_clean_json_round_trips() {
        let original = reply("Nice focus.", Some("q2_strategic"), "named a role");
        let raw = serde_json::to_string(&original).unwrap();
        assert_eq!(parse_routing(&raw, "q2_active_unfocused"), original);
    }

    #[test]
    fn test_fenced_json_is_recovered() {
        let raw = "```json\n{\"student_reaction\":\"ok\",\"next_question_id\":\"q2_paralyzed\",\"routing_rationale\":\"x\"}\n```";
        let parsed = parse_routing(raw, "q2_active_unfocused");
        assert_eq!(parsed, reply("ok", Some("q2_paralyzed"), "x"));
        assert!(!parsed.is_fallback());
    }

    #[test]
    fn test_json_wrapped_in_prose_is_recovered() {
        let raw = "Here is my answer:\n{\"student_reaction\":\"Good\",\"next_question_id\":\"q3_no_network\",\"routing_rationale\":\"r\"}\nThanks!";
        let parsed = parse_routing(raw, "q3_credentials_only");
        assert_eq!(parsed.next_question_id.as_deref(), Some("q3_no_network"));
    }

    #[test]
    fn test_unparseable_text_falls_back() {
        let parsed = parse_routing("  sorry, I can't  ", "q3_credentials_only");
        assert_eq!(parsed.student_reaction, "sorry, I can't");
        assert_eq!(parsed.next_question_id.as_deref(), Some("q3_credentials_only"));
        assert!(parsed.is_fallback());
    }

    #[test]
    fn test_empty_reaction_json_falls_back() {
        let raw = r#"{"student_reaction":"","next_question_id":"q2_strategic"}"#;
        let parsed = parse_routing(raw, "q2_active_unfocused");
        assert!(parsed.is_fallback());
        assert_eq!(parsed.student_reaction, raw);
    }

    #[test]
    fn test_null_next_id_and_missing_rationale_are_accepted() {
        let parsed = parse_routing(r#"{"student_reaction":"ok","next_question_id":null}"#, "d");
        assert_eq!(parsed, reply("ok", None, ""));
    }

    #[test]
    fn test_deliverable_trailer_is_stripped() {
        let parsed = parse_deliverable("## Statement\nI build things.\n\nINVITATION_OPTION: B\n");
        assert_eq!(parsed.text, "## Statement\nI build things.");
        assert_eq!(parsed.invitation_option, InvitationOption::B);
    }

    #[test]
    fn test_deliverable_trailer_is_case_insensitive() {
        let parsed = parse_deliverable("Body\ninvitation_option:   c");
        assert_eq!(parsed.invitation_option, InvitationOption::C);
        assert_eq!(parsed.text, "Body");
    }

    #[test]
    fn test_deliverable_last_trailer_wins() {
        let parsed = parse_deliverable("INVITATION_OPTION: C\nBody\nINVITATION_OPTION: B");
        assert_eq!(parsed.invitation_option, InvitationOption::B);
        assert!(!parsed.text.contains("INVITATION_OPTION"));
    }

    #[test]
    fn test_deliverable_without_trailer_defaults_to_a() {
        let parsed = parse_deliverable("## Statement\nNo tag here.   \n\n");
        assert_eq!(parsed.invitation_option, InvitationOption::A);
        assert_eq!(parsed.text, "## Statement\nNo tag here.");
    }

    #[test]
    fn test_deliverable_parse_is_idempotent() {
        let once = parse_deliverable("Body\nINVITATION_OPTION: C\nINVITATION_OPTION: B");
        let twice = parse_deliverable(&once.text);
        assert_eq!(once.text, twice.text);
    }

    #[test]
    fn test_mid_sentence_mention_is_not_a_trailer() {
        let parsed = parse_deliverable("We will set INVITATION_OPTION: B later");
        assert_eq!(parsed.invitation_option, InvitationOption::A);
        assert_eq!(parsed.text, "We will set INVITATION_OPTION: B later");
    }
}
