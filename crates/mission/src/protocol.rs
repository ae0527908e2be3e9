//! Protocol codec — mission state in, proposal out.
//!
//! The encoder serializes mission state, the catalog summary, and the
//! last observation into a deterministic prompt. The decoder holds the
//! model to a strict schema: the reply must contain exactly one JSON
//! object matching exactly one `Proposal` variant; everything else is a
//! `MalformedProposal` the loop recovers from with a bounded re-prompt.

use overwatch_core::error::PlannerError;
use overwatch_core::mission::{MissionLogEvent, MissionState};
use overwatch_core::proposal::Proposal;
use overwatch_security::sanitize;

/// How many recent log events ride along in the prompt. The full log
/// stays on disk; the planner only needs the tail.
const HISTORY_WINDOW: usize = 3;

/// Everything the encoder needs for one iteration.
pub struct PromptContext<'a> {
    pub state: &'a MissionState,
    pub catalog_summary: &'a str,
    pub recent_events: &'a [MissionLogEvent],
    pub last_observation: &'a str,
    /// Error notice from a failed decode, present on re-prompts.
    pub retry_notice: Option<&'a str>,
    /// Operator secrets that must never appear in the prompt body.
    pub secrets: &'a [&'a str],
}

/// Build the deterministic prompt for one iteration.
pub fn encode_prompt(ctx: &PromptContext<'_>) -> String {
    let mut prompt = String::new();

    prompt.push_str("You are the planning engine of a supervised reconnaissance controller.\n");
    prompt.push_str("A human operator reviews and authorizes every action you propose.\n\n");

    prompt.push_str(&format!("Target: {}\n", ctx.state.target));
    prompt.push_str(&format!("Objective: {}\n", ctx.state.objective));
    prompt.push_str(&format!("Phase: {}\n", ctx.state.phase));
    prompt.push_str(&format!("Steps completed: {}\n\n", ctx.state.steps_completed));

    if !ctx.state.footprint.is_empty() {
        prompt.push_str("Footprint so far:\n");
        for (host, services) in &ctx.state.footprint {
            let summary: Vec<String> = services
                .iter()
                .map(|s| format!("{}/{} {}", s.port, s.proto, s.service))
                .collect();
            prompt.push_str(&format!("- {}: {}\n", host, summary.join(", ")));
        }
        prompt.push('\n');
    }

    prompt.push_str("Available arsenal:\n");
    prompt.push_str(ctx.catalog_summary);
    prompt.push_str("\n\n");

    if !ctx.recent_events.is_empty() {
        prompt.push_str("Recent history:\n");
        for event in ctx.recent_events.iter().rev().take(HISTORY_WINDOW).rev() {
            prompt.push_str(&format!(
                "- [{}] {}: {}\n",
                event.iteration,
                event.proposal.kind(),
                first_line(&event.observation.text)
            ));
        }
        prompt.push('\n');
    }

    prompt.push_str(&format!("Last observation:\n{}\n\n", ctx.last_observation));

    if let Some(notice) = ctx.retry_notice {
        prompt.push_str(&format!(
            "Your previous reply was rejected: {notice}\nReply again, following the schema exactly.\n\n"
        ));
    }

    prompt.push_str(
        "Reply with a single JSON object and nothing else. Exactly one of:\n\
         {\"action\":\"EXECUTE\",\"command\":\"<arsenal name>\",\"args\":{\"<slot>\":\"<value>\"},\"rationale\":\"<why>\"}\n\
         {\"action\":\"REGISTER_TOOL\",\"name\":\"<new name>\",\"raw_command\":\"<command with {slot} placeholders>\",\"rationale\":\"<why>\"}\n\
         {\"action\":\"CONCLUDE\",\"summary\":\"<mission summary>\"}\n",
    );

    sanitize(&prompt, ctx.secrets)
}

fn first_line(text: &str) -> &str {
    text.lines().next().unwrap_or("")
}

/// Decode the model's raw reply into a proposal.
///
/// Takes the outermost JSON object in the reply (models love to wrap
/// JSON in prose or fences) and parses it strictly: the key set must be
/// exactly the chosen variant's fields — a reply that mixes variants or
/// smuggles extra fields is malformed, not guessed at.
pub fn decode_proposal(raw: &str) -> Result<Proposal, PlannerError> {
    let malformed = |reason: String| PlannerError::MalformedProposal { reason };

    let start = raw
        .find('{')
        .ok_or_else(|| malformed("no JSON object in reply".into()))?;
    let end = raw
        .rfind('}')
        .filter(|&end| end >= start)
        .ok_or_else(|| malformed("no JSON object in reply".into()))?;

    let value: serde_json::Value = serde_json::from_str(&raw[start..=end])
        .map_err(|e| malformed(e.to_string()))?;
    let object = value
        .as_object()
        .ok_or_else(|| malformed("reply is not a JSON object".into()))?;

    let action = object
        .get("action")
        .and_then(|v| v.as_str())
        .ok_or_else(|| malformed("missing 'action' tag".into()))?;

    let allowed: &[&str] = match action {
        "EXECUTE" => &["action", "command", "args", "rationale"],
        "REGISTER_TOOL" => &["action", "name", "raw_command", "rationale"],
        "CONCLUDE" => &["action", "summary"],
        other => return Err(malformed(format!("unknown action '{other}'"))),
    };

    for key in object.keys() {
        if !allowed.contains(&key.as_str()) {
            return Err(malformed(format!("unexpected field '{key}' for {action}")));
        }
    }

    serde_json::from_value::<Proposal>(value).map_err(|e| malformed(e.to_string()))
}
