//! Rewriting technician notes for people outside the field team: a
//! Cause-Action-Result report for the asset owner's records, and a short
//! plain-language summary for the client.

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::assistant::allocation::WorkStatusInput;
use crate::assistant::context::{ContextFields, WorkOrderContext};
use crate::assistant::conversation::{format_transcript, ChatMessage};
use crate::assistant::prompts::{
    facts_only, fill_template, json_system, CAR_INSTRUCTIONS, CAR_PROMPT_TEMPLATE, CAR_SYSTEM,
    CLIENT_SUMMARY_INSTRUCTIONS, CLIENT_SUMMARY_PROMPT_TEMPLATE, CLIENT_SUMMARY_SYSTEM,
};
use crate::errors::AppError;
use crate::llm_client::{call_json, CallOptions, LanguageModel};
use crate::store::CsvStore;

const CAR_OPTIONS: CallOptions = CallOptions {
    max_tokens: 800,
    temperature: 0.3,
};

const CLIENT_SUMMARY_OPTIONS: CallOptions = CallOptions {
    max_tokens: 400,
    temperature: 0.1,
};

#[derive(Debug, Deserialize)]
pub struct CarRequest {
    pub completion_notes: String,
    #[serde(flatten)]
    pub context: ContextFields,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CarReport {
    pub cause: String,
    pub action: String,
    pub result: String,
}

#[derive(Debug, Deserialize)]
pub struct ClientSummaryRequest {
    #[serde(default)]
    pub messages: Vec<ChatMessage>,
    /// `Person | message` lines, for callers that keep the chat as text.
    #[serde(default, alias = "conversation_tech_ai_client_table")]
    pub conversation_table: String,
    #[serde(default)]
    pub work_status: Option<WorkStatusInput>,
    #[serde(flatten)]
    pub context: ContextFields,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClientSummary {
    pub summary: String,
    pub notes: String,
}

pub async fn convert_to_car(
    llm: &dyn LanguageModel,
    store: &CsvStore,
    req: CarRequest,
) -> Result<CarReport, AppError> {
    let context = WorkOrderContext::load(store, req.context).await?;
    generate_car(llm, &context, &req.completion_notes).await
}

/// CAR report from the final notes plus the earlier logs in `context`.
pub async fn generate_car(
    llm: &dyn LanguageModel,
    context: &WorkOrderContext,
    completion_notes: &str,
) -> Result<CarReport, AppError> {
    let notes = completion_notes.trim();
    if notes.is_empty() {
        return Err(AppError::Validation(
            "completion_notes cannot be empty".to_string(),
        ));
    }

    let prompt = fill_template(
        CAR_PROMPT_TEMPLATE,
        &[
            ("work_order_type", context.work_order_type.as_str()),
            ("description", context.description.as_str()),
            ("plant", context.plant.as_str()),
            ("previous_logs", context.previous_logs.as_str()),
            ("instructions", CAR_INSTRUCTIONS),
            ("facts_only", facts_only()),
            ("completion_notes", notes),
        ],
    );

    let report: CarReport = call_json(llm, &prompt, &json_system(CAR_SYSTEM), CAR_OPTIONS)
        .await
        .map_err(|e| AppError::llm("CAR conversion", e))?;

    if [&report.cause, &report.action, &report.result]
        .iter()
        .all(|field| field.trim().is_empty())
    {
        return Err(AppError::Llm("CAR conversion returned an empty report".to_string()));
    }

    info!("CAR report generated ({} chars of notes)", notes.len());
    Ok(report)
}

pub async fn convert_to_client_summary(
    llm: &dyn LanguageModel,
    store: &CsvStore,
    req: ClientSummaryRequest,
) -> Result<ClientSummary, AppError> {
    let conversation = if req.messages.is_empty() {
        req.conversation_table.trim().to_string()
    } else {
        format_transcript(&req.messages)
    };
    if conversation.is_empty() {
        return Err(AppError::Validation(
            "a conversation is required: send messages or conversation_table".to_string(),
        ));
    }

    let contribution = match &req.work_status {
        Some(status) => {
            status.validate().map_err(AppError::Validation)?;
            status.contribution_summary()
        }
        None => "Not specified".to_string(),
    };
    let context = WorkOrderContext::load(store, req.context).await?;

    let prompt = fill_template(
        CLIENT_SUMMARY_PROMPT_TEMPLATE,
        &[
            ("work_order_type", context.work_order_type.as_str()),
            ("contribution", contribution.as_str()),
            ("description", context.description.as_str()),
            ("plant", context.plant.as_str()),
            ("instructions", CLIENT_SUMMARY_INSTRUCTIONS),
            ("facts_only", facts_only()),
            ("conversation", conversation.as_str()),
        ],
    );

    call_json(
        llm,
        &prompt,
        &json_system(CLIENT_SUMMARY_SYSTEM),
        CLIENT_SUMMARY_OPTIONS,
    )
    .await
    .map_err(|e| AppError::llm("Client summary", e))
}
