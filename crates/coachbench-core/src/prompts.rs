//! Prompt text for every model pass

use crate::gateway::ChatMessage;
use crate::profile::{BucketKind, BucketProfile, DiscoveryProfile};
use crate::scenario::Scenario;
use crate::text::truncate_chars;
use crate::transcript::DiscoveryStage;

/// Lexical marker the final discovery answer must open with
pub const WHY_MARKER: &str = "Your Why is to";

/// Causal clause the purpose statement must contain
pub const CAUSAL_CLAUSE: &str = "so that";

const NOTE_LIMIT: usize = 240;
const RECENT_NOTES: usize = 6;

fn stage_goal(stage: DiscoveryStage) -> &'static str {
    match stage {
        DiscoveryStage::Intro => {
            "Build rapport. Learn who they are and what brought them here. Ask one open question."
        }
        DiscoveryStage::EnergyMap => {
            "Map what gives and drains their energy. Ask about concrete recent moments, one question at a time."
        }
        DiscoveryStage::Stories => {
            "Draw out two or three specific stories where they felt most alive or proud. Probe for what made them matter."
        }
        DiscoveryStage::YourWhy => {
            "Reflect the pattern across their stories back to them and test a draft purpose with them."
        }
    }
}

fn session_notes(notes: &[String]) -> String {
    if notes.is_empty() {
        return "(nothing yet)".to_string();
    }
    let start = notes.len().saturating_sub(RECENT_NOTES);
    notes[start..]
        .iter()
        .map(|n| format!("- {}", truncate_chars(n, NOTE_LIMIT)))
        .collect::<Vec<_>>()
        .join("\n")
}

pub fn discovery_system(stage: DiscoveryStage, exchange: u32, total: u32, notes: &[String]) -> String {
    format!(
        "You are a warm, skilled purpose coach running a structured discovery session.\n\
         Stage: {stage} (exchange {exchange} of {total}).\n\
         Goal for this stage: {goal}\n\
         Keep replies under 120 words. Ask at most one question. Never lecture.\n\n\
         What the client has said so far:\n{notes}",
        stage = stage.as_str(),
        goal = stage_goal(stage),
        notes = session_notes(notes),
    )
}

/// Stricter prompt for the last discovery exchange
pub fn discovery_completion_system(notes: &[String]) -> String {
    format!(
        "You are a purpose coach closing a discovery session. This is the final turn.\n\
         Deliver the client's purpose statement now. Requirements:\n\
         1. Begin your reply with exactly \"{marker}\".\n\
         2. Use one sentence of the form \"{marker} <contribution> {clause} <impact>.\"\n\
         3. Follow with at most two sentences explaining which stories it came from.\n\
         4. Do not ask any question. Do not end with a question mark.\n\n\
         What the client has said:\n{notes}",
        marker = WHY_MARKER,
        clause = CAUSAL_CLAUSE,
        notes = session_notes(notes),
    )
}

pub fn extraction_messages(transcript: &str) -> Vec<ChatMessage> {
    vec![
        ChatMessage::system(
            "You extract structured data from coaching transcripts. Reply with one JSON object only.",
        ),
        ChatMessage::user(format!(
            "From the discovery transcript below, return JSON with these fields:\n\
             {{\n  \"summary\": string,\n  \"patterns\": [string],\n  \"why_statement\": string,\n  \
             \"why_explanation\": string,\n  \"loves\": [string],\n  \"good_at\": [string]\n}}\n\
             Use only what the client actually said.\n\n# Transcript\n{}",
            transcript
        )),
    ]
}

pub fn bucket_system(
    kind: BucketKind,
    discovery: &DiscoveryProfile,
    answers: u32,
    min_items: usize,
) -> String {
    let known = discovery.items_for(kind);
    let known = if known.is_empty() {
        "(none)".to_string()
    } else {
        known.join("; ")
    };
    format!(
        "You are a purpose coach helping the client fill the \"{topic}\" bucket.\n\
         Aim for at least {min_items} distinct, concrete items. Collected answers so far: {answers}.\n\
         Already known from discovery: {known}\n\
         Purpose statement so far: {purpose}\n\
         Ask one focused question per reply and briefly reflect what you heard.",
        topic = kind.topic(),
        purpose = if discovery.purpose_statement.is_empty() {
            "(not yet stated)"
        } else {
            discovery.purpose_statement.as_str()
        },
    )
}

fn bucket_shape(kind: BucketKind) -> &'static str {
    match kind {
        BucketKind::Love => r#"{"loves": [string], "summary": string}"#,
        BucketKind::GoodAt => {
            r#"{"skills": [{"skill": string, "evidence": string}], "summary": string}"#
        }
        BucketKind::WorldNeeds => {
            r#"{"causes": [string], "problems": [string], "summary": string}"#
        }
        BucketKind::PaidFor => {
            r#"{"offers": [{"offer": string, "audience": string}], "market_summary": string}"#
        }
    }
}

pub fn bucket_summary_messages(kind: BucketKind, material: &str) -> Vec<ChatMessage> {
    vec![
        ChatMessage::system(
            "You summarize coaching notes into JSON. Reply with one JSON object only.",
        ),
        ChatMessage::user(format!(
            "Summarize the client's \"{}\" bucket from the material below.\n\
             Return JSON shaped exactly as:\n{}\n\n# Material\n{}",
            kind.topic(),
            bucket_shape(kind),
            material
        )),
    ]
}

pub fn overlap_messages(profile: &BucketProfile) -> Vec<ChatMessage> {
    vec![
        ChatMessage::system(
            "You combine purpose buckets into overlap areas. Reply with one JSON object only.",
        ),
        ChatMessage::user(format!(
            "Given the four buckets below, describe the overlaps:\n\
             - passion: love + good at\n- mission: love + world needs\n\
             - profession: good at + paid for\n- vocation: world needs + paid for\n\
             Return JSON: {{\"passion\": {{\"bullets\": [string], \"summary\": string}}, \
             \"mission\": {{..}}, \"profession\": {{..}}, \"vocation\": {{..}}}}\n\n# Buckets\n{}",
            profile.render()
        )),
    ]
}

pub fn decision_system(profile: &BucketProfile, discovery: &DiscoveryProfile) -> String {
    format!(
        "You are a purpose coach in a short decision consultation. The client brings a concrete decision.\n\
         Ground every recommendation in their profile below and name the trade-offs plainly.\n\
         Keep replies under 150 words.\n\n\
         Purpose statement: {}\n\n{}",
        if discovery.purpose_statement.is_empty() {
            "(none)"
        } else {
            discovery.purpose_statement.as_str()
        },
        profile.render()
    )
}

fn bullet_block(title: &str, items: &[String]) -> String {
    if items.is_empty() {
        return String::new();
    }
    let body = items
        .iter()
        .map(|i| format!("- {}", i))
        .collect::<Vec<_>>()
        .join("\n");
    format!("{}:\n{}\n", title, body)
}

/// System prompt for the synthetic user
pub fn persona_system(scenario: &Scenario, focus: &str) -> String {
    format!(
        "You are role-playing a human client talking to a coach. Stay in character.\n\n\
         Persona: {persona}\n{constraints}{goals}{conflicts}{red_lines}\n\
         Current topic: {focus}\n\n\
         Rules:\n\
         - Answer only as the client, in first person, in 1 to 4 sentences.\n\
         - Never ask the coach questions.\n\
         - Never give advice or coach yourself.\n\
         - Never repeat, summarize or build on the coach's wording.\n\
         - Share concrete details from your life consistent with the persona.",
        persona = scenario.persona,
        constraints = bullet_block("Constraints", &scenario.constraints),
        goals = bullet_block("Goals", &scenario.goals),
        conflicts = bullet_block("Inner conflicts", &scenario.conflicts),
        red_lines = bullet_block("Never say or agree to", &scenario.red_lines),
    )
}

pub fn discovery_focus(stage: DiscoveryStage) -> &'static str {
    match stage {
        DiscoveryStage::Intro => "introducing yourself and why you came",
        DiscoveryStage::EnergyMap => "what energizes and drains you",
        DiscoveryStage::Stories => "specific stories from your life",
        DiscoveryStage::YourWhy => "reacting honestly to the coach's reflections",
    }
}

pub fn decision_focus(question: &str) -> String {
    format!("DECISION CONSULTATION about: {}", question)
}
