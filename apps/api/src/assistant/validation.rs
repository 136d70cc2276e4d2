use serde::{Deserialize, Serialize};
use tracing::info;

use crate::assistant::allocation::WorkStatusInput;
use crate::assistant::context::{ContextFields, WorkOrderContext};
use crate::assistant::conversation::{follow_up_context, ChatMessage};
use crate::assistant::prompts::{
    facts_only, fill_template, hold_reason_guideline, json_system, work_order_type_guideline,
    work_status_guideline, HOLD_REASON_PROMPT_TEMPLATE, HOLD_REASON_SYSTEM,
    HOLD_REASON_VALIDATION_INSTRUCTIONS, WORK_LOG_PROMPT_TEMPLATE, WORK_LOG_SYSTEM,
    WORK_LOG_VALIDATION_INSTRUCTIONS,
};
use crate::errors::AppError;
use crate::llm_client::{call_json, CallOptions, LanguageModel};
use crate::store::CsvStore;

/// Follow-up questions returned per round, at most.
pub const MAX_FOLLOW_UP_QUESTIONS: usize = 2;

const VALIDATION_OPTIONS: CallOptions = CallOptions {
    max_tokens: 300,
    temperature: 0.1,
};

#[derive(Debug, Deserialize)]
pub struct WorkLogValidationRequest {
    #[serde(default)]
    pub operational_log: String,
    pub work_status: WorkStatusInput,
    /// Initial note first, then follow-up questions and answers.
    #[serde(default)]
    pub messages: Vec<ChatMessage>,
    #[serde(default)]
    pub follow_up_questions_answers_table: String,
    #[serde(flatten)]
    pub context: ContextFields,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkLogValidation {
    pub valid: bool,
    #[serde(default)]
    pub missing: String,
    #[serde(default)]
    pub follow_up_questions: Vec<String>,
}

#[derive(Debug, Deserialize)]
pub struct HoldReasonValidationRequest {
    /// Hold category picked by the technician, e.g. `Parts` or `Weather`.
    pub hold_reason: String,
    #[serde(default)]
    pub messages: Vec<ChatMessage>,
    #[serde(default)]
    pub follow_up_questions_answers_table: String,
    #[serde(flatten)]
    pub context: ContextFields,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HoldReasonValidation {
    pub valid: bool,
    #[serde(default)]
    pub missing: String,
    #[serde(default)]
    pub follow_up_questions: Vec<String>,
    #[serde(default)]
    pub hold_reason_analysis: String,
    #[serde(default)]
    pub recommended_actions: String,
}

/// Checks whether a technician's log covers what the work order type and
/// the statuses worked require, asking follow-up questions when it does not.
pub async fn validate_work_log(
    llm: &dyn LanguageModel,
    store: &CsvStore,
    req: WorkLogValidationRequest,
) -> Result<WorkLogValidation, AppError> {
    req.work_status.validate().map_err(AppError::Validation)?;
    let initial_log = initial_note(&req.operational_log, &req.messages).ok_or_else(|| {
        AppError::Validation("operational_log cannot be empty".to_string())
    })?;

    let context = WorkOrderContext::load(store, req.context).await?;
    let prompt = build_work_log_prompt(
        &context,
        &req.work_status,
        &initial_log,
        &follow_up_context(&req.messages, &req.follow_up_questions_answers_table),
    );

    let mut verdict: WorkLogValidation = call_json(
        llm,
        &prompt,
        &json_system(WORK_LOG_SYSTEM),
        VALIDATION_OPTIONS,
    )
    .await
    .map_err(|e| AppError::llm("Work log validation", e))?;

    settle_questions(verdict.valid, &verdict.missing, &mut verdict.follow_up_questions);
    info!(
        "Work log validation: valid={} questions={}",
        verdict.valid,
        verdict.follow_up_questions.len()
    );
    Ok(verdict)
}

/// Checks whether a hold reason explains what blocks the work and what
/// releases it.
pub async fn validate_hold_reason(
    llm: &dyn LanguageModel,
    store: &CsvStore,
    req: HoldReasonValidationRequest,
) -> Result<HoldReasonValidation, AppError> {
    let category = req.hold_reason.trim();
    if category.is_empty() {
        return Err(AppError::Validation("hold_reason cannot be empty".to_string()));
    }

    let context = WorkOrderContext::load(store, req.context).await?;
    let hold_reason = match req.messages.first() {
        Some(first) if !first.content.trim().is_empty() => {
            format!("{category} - {}", first.content.trim())
        }
        _ => category.to_string(),
    };
    let conversation = follow_up_context(&req.messages, &req.follow_up_questions_answers_table);
    let prompt = fill_template(
        HOLD_REASON_PROMPT_TEMPLATE,
        &[
            ("work_order_type", context.work_order_type.as_str()),
            ("description", context.description.as_str()),
            ("plant", context.plant.as_str()),
            ("previous_logs", context.previous_logs.as_str()),
            ("hold_requirements", hold_reason_guideline(category)),
            ("validation_instructions", HOLD_REASON_VALIDATION_INSTRUCTIONS),
            ("hold_reason", hold_reason.as_str()),
            ("conversation", conversation.as_str()),
        ],
    );

    let mut verdict: HoldReasonValidation = call_json(
        llm,
        &prompt,
        &json_system(HOLD_REASON_SYSTEM),
        VALIDATION_OPTIONS,
    )
    .await
    .map_err(|e| AppError::llm("Hold reason validation", e))?;

    settle_questions(verdict.valid, &verdict.missing, &mut verdict.follow_up_questions);
    info!(
        "Hold reason validation ({category}): valid={} questions={}",
        verdict.valid,
        verdict.follow_up_questions.len()
    );
    Ok(verdict)
}

fn build_work_log_prompt(
    context: &WorkOrderContext,
    work_status: &WorkStatusInput,
    initial_log: &str,
    conversation: &str,
) -> String {
    let status_guidelines = work_status
        .significant_shares()
        .iter()
        .map(|share| {
            format!(
                "{} Percentage of allocated time for this status: {}%",
                work_status_guideline(&share.status),
                share.percentage
            )
        })
        .collect::<Vec<_>>()
        .join("\n");

    let contribution = work_status.contribution_summary();
    fill_template(
        WORK_LOG_PROMPT_TEMPLATE,
        &[
            ("work_order_type", context.work_order_type.as_str()),
            ("contribution", contribution.as_str()),
            ("description", context.description.as_str()),
            ("plant", context.plant.as_str()),
            ("previous_logs", context.previous_logs.as_str()),
            ("type_guidelines", work_order_type_guideline(&context.work_order_type)),
            ("status_guidelines", status_guidelines.as_str()),
            ("validation_instructions", WORK_LOG_VALIDATION_INSTRUCTIONS),
            ("facts_only", facts_only()),
            ("operational_log", initial_log),
            ("conversation", conversation),
        ],
    )
}

/// The technician's initial note: the explicit log, else the first message.
fn initial_note(operational_log: &str, messages: &[ChatMessage]) -> Option<String> {
    let log = operational_log.trim();
    if !log.is_empty() {
        return Some(log.to_string());
    }
    messages
        .first()
        .map(|m| m.content.trim())
        .filter(|c| !c.is_empty())
        .map(str::to_string)
}

/// A valid answer carries no questions; an invalid one carries one or two.
fn settle_questions(valid: bool, missing: &str, questions: &mut Vec<String>) {
    if valid {
        questions.clear();
        return;
    }
    questions.retain(|q| !q.trim().is_empty());
    questions.truncate(MAX_FOLLOW_UP_QUESTIONS);
    if questions.is_empty() {
        let missing = missing.trim();
        questions.push(if missing.is_empty() {
            "Can you add more detail on what you found and what you did?".to_string()
        } else {
            format!("Can you add the missing details: {missing}?")
        });
    }
}
