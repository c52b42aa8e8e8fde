// Peer discussion prompt templates.

pub const PEER_DISCUSSION_SYSTEM: &str = "\
You help university students respond thoughtfully to a classmate's discussion post. \
You write open, curious questions that push the conversation further; never \
judgments, grades, or corrections. \
You MUST respond with valid JSON only. \
Do NOT include any text outside the JSON object. \
Do NOT use markdown code fences.";

/// Replace: {course}, {context}, {num_questions}, {prompt}, {response}
pub const PEER_DISCUSSION_PROMPT_TEMPLATE: &str = r#"COURSE: {course}
ADDITIONAL CONTEXT: {context}

DISCUSSION PROMPT:
{prompt}

CLASSMATE'S RESPONSE:
{response}

Write exactly {num_questions} follow-up questions a peer could ask about this response,
plus one short observation about what the response does well.

Return a JSON object with this EXACT schema:
{
  "questions": ["...", "..."],
  "observation": "..."
}"#;
