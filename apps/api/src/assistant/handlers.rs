use axum::{extract::State, Json};

use crate::assistant::car::{
    convert_to_car, convert_to_client_summary, CarReport, CarRequest, ClientSummary,
    ClientSummaryRequest,
};
use crate::assistant::validation::{
    validate_hold_reason, validate_work_log, HoldReasonValidation, HoldReasonValidationRequest,
    WorkLogValidation, WorkLogValidationRequest,
};
use crate::errors::AppError;
use crate::state::AppState;

/// POST /validate-work-status
pub async fn handle_validate_work_status(
    State(state): State<AppState>,
    Json(req): Json<WorkLogValidationRequest>,
) -> Result<Json<WorkLogValidation>, AppError> {
    let verdict = validate_work_log(state.llm.as_ref(), &state.store, req).await?;
    Ok(Json(verdict))
}

/// POST /validate-reason-for-hold
pub async fn handle_validate_reason_for_hold(
    State(state): State<AppState>,
    Json(req): Json<HoldReasonValidationRequest>,
) -> Result<Json<HoldReasonValidation>, AppError> {
    let verdict = validate_hold_reason(state.llm.as_ref(), &state.store, req).await?;
    Ok(Json(verdict))
}

/// POST /convert-to-car
pub async fn handle_convert_to_car(
    State(state): State<AppState>,
    Json(req): Json<CarRequest>,
) -> Result<Json<CarReport>, AppError> {
    Ok(Json(convert_to_car(state.llm.as_ref(), &state.store, req).await?))
}

/// POST /convert-to-client-summary
pub async fn handle_convert_to_client_summary(
    State(state): State<AppState>,
    Json(req): Json<ClientSummaryRequest>,
) -> Result<Json<ClientSummary>, AppError> {
    Ok(Json(
        convert_to_client_summary(state.llm.as_ref(), &state.store, req).await?,
    ))
}
