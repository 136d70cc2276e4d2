//! Follow-up conversation between a technician and the assistant.
//!
//! The first message is the technician's initial note. Every later message is
//! either an assistant follow-up question or the technician's answer, in the
//! order they were exchanged.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    #[serde(alias = "user", alias = "tech")]
    Technician,
    #[serde(alias = "ai")]
    Assistant,
}

impl ChatRole {
    pub fn label(self) -> &'static str {
        match self {
            ChatRole::Technician => "Technician",
            ChatRole::Assistant => "Assistant",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: ChatRole,
    pub content: String,
}

#[cfg(test)]
impl ChatMessage {
    pub fn technician(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::Technician,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::Assistant,
            content: content.into(),
        }
    }
}

/// Renders everything after the initial note as numbered turns.
/// Returns an empty string when there has been no follow-up yet.
pub fn format_follow_up_turns(messages: &[ChatMessage]) -> String {
    messages
        .iter()
        .skip(1)
        .enumerate()
        .map(|(i, msg)| format!("Turn {} - {}: {}", i + 1, msg.role.label(), msg.content))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Renders the whole conversation as `Role | message` lines.
pub fn format_transcript(messages: &[ChatMessage]) -> String {
    messages
        .iter()
        .map(|msg| format!("{} | {}", msg.role.label(), msg.content))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Follow-up history for a prompt: numbered turns, then any legacy
/// free-text Q&A table the client sent instead of messages.
pub fn follow_up_context(messages: &[ChatMessage], answers_table: &str) -> String {
    let turns = format_follow_up_turns(messages);
    let answers = answers_table.trim();
    match (turns.is_empty(), answers.is_empty()) {
        (true, true) => "None yet.".to_string(),
        (false, true) => turns,
        (true, false) => answers.to_string(),
        (false, false) => format!("{turns}\n{answers}"),
    }
}
