use axum::{
    extract::{Path, State},
    Json,
};
use serde::Serialize;

use crate::errors::AppError;
use crate::models::logs::WorkStatusLog;
use crate::models::technician::WorkStatusType;
use crate::state::AppState;
use crate::status_log::chat::{save_conversation, ChatSubmission, ChatSubmissionResponse};
use crate::status_log::submission::{
    submit_work_status, work_status_logs, SubmissionResponse, WorkStatusSubmission,
};
use crate::store::Table;

#[derive(Serialize)]
pub struct WorkStatusLogsResponse {
    pub work_status_logs: Vec<WorkStatusLog>,
}

#[derive(Serialize)]
pub struct WorkStatusTypesResponse {
    pub work_status_types: Vec<WorkStatusType>,
}

/// GET /work-status-types
pub async fn handle_work_status_types(
    State(state): State<AppState>,
) -> Result<Json<WorkStatusTypesResponse>, AppError> {
    let work_status_types = state
        .store
        .blocking(|store| store.read_all(Table::WorkStatusTypes))
        .await?;
    Ok(Json(WorkStatusTypesResponse { work_status_types }))
}

/// POST /submit-work-status
pub async fn handle_submit_work_status(
    State(state): State<AppState>,
    Json(req): Json<WorkStatusSubmission>,
) -> Result<Json<SubmissionResponse>, AppError> {
    let response = state
        .store
        .blocking(move |store| submit_work_status(store, req))
        .await?;
    Ok(Json(response))
}

/// GET /work-status-logs/:work_order_id
pub async fn handle_work_status_logs(
    State(state): State<AppState>,
    Path(work_order_id): Path<String>,
) -> Result<Json<WorkStatusLogsResponse>, AppError> {
    let work_status_logs = state
        .store
        .blocking(move |store| work_status_logs(store, &work_order_id))
        .await?;
    Ok(Json(WorkStatusLogsResponse { work_status_logs }))
}

/// POST /submit-chat
pub async fn handle_submit_chat(
    State(state): State<AppState>,
    Json(req): Json<ChatSubmission>,
) -> Result<Json<ChatSubmissionResponse>, AppError> {
    let response = state
        .store
        .blocking(move |store| save_conversation(store, req))
        .await?;
    Ok(Json(response))
}
