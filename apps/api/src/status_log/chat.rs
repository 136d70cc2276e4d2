use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

use crate::assistant::allocation::WorkStatusInput;
use crate::errors::AppError;
use crate::models::logs::ChatTranscript;
use crate::models::now_timestamp;
use crate::store::{CsvStore, Table};

#[derive(Debug, Deserialize)]
pub struct ChatSubmission {
    /// `speaker | message` lines.
    #[serde(alias = "conversation_tech_ai_client_table")]
    pub conversation_table: String,
    pub work_order_id: String,
    pub work_status: WorkStatusInput,
}

#[derive(Debug, Serialize)]
pub struct ChatSubmissionResponse {
    pub success: bool,
    pub message: String,
    pub conversation_id: String,
}

/// Groups `speaker | message` lines by speaker, keeping each speaker's
/// messages in order. Lines without a pipe are ignored, and so is a first
/// line whose message column is just `ai` or `tech` (a header row).
pub fn parse_conversation_table(table: &str) -> BTreeMap<String, Vec<String>> {
    let mut grouped: BTreeMap<String, Vec<String>> = BTreeMap::new();

    for (i, line) in table.trim().lines().enumerate() {
        let Some((speaker, message)) = line.split_once('|') else {
            continue;
        };
        let speaker = speaker.trim();
        let message = message.trim();

        if i == 0 && matches!(message.to_lowercase().as_str(), "ai" | "tech") {
            continue;
        }

        grouped
            .entry(speaker.to_string())
            .or_default()
            .push(message.to_string());
    }

    grouped
}

pub fn save_conversation(
    store: &CsvStore,
    submission: ChatSubmission,
) -> Result<ChatSubmissionResponse, AppError> {
    let grouped = parse_conversation_table(&submission.conversation_table);
    if grouped.is_empty() {
        return Err(AppError::Validation(
            "conversation table has no `speaker | message` lines".to_string(),
        ));
    }

    let conversation = serde_json::to_string(&grouped)
        .map_err(|e| AppError::Internal(anyhow::anyhow!("encoding conversation: {e}")))?;
    let conversation_id = Uuid::new_v4().to_string();
    let created_at = now_timestamp();

    let transcript = store.insert_with_id(Table::StatusLogChat, |id| ChatTranscript {
        id,
        conversation_id: conversation_id.clone(),
        work_order_id: submission.work_order_id,
        work_status: submission.work_status.to_storage_string(),
        conversation,
        created_at,
    })?;

    info!(
        "Saved conversation {} for work order '{}' ({} speakers)",
        transcript.conversation_id,
        transcript.work_order_id,
        grouped.len()
    );

    Ok(ChatSubmissionResponse {
        success: true,
        message: "Conversation saved successfully.".to_string(),
        conversation_id,
    })
}
