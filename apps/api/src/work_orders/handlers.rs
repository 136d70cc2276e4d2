use axum::{
    extract::{Path, State},
    Json,
};
use serde::Serialize;

use crate::errors::AppError;
use crate::models::technician::Technician;
use crate::models::work_order::WorkOrder;
use crate::state::AppState;
use crate::store::Table;
use crate::work_orders::completion::{submit_completion, CompletionRequest, CompletionResponse};
use crate::work_orders::queries::{
    all_work_orders_for_tech, complete_work_order, find_work_order, hold_work_order,
    work_orders_for_tech_on, HoldRequest, HoldResponse, StatusChangeResponse, WorkOrderListing,
};
use crate::work_orders::stats::{
    suggested_labor_hours, technician_statistics, SuggestedHours, TechnicianStatistics,
};

#[derive(Serialize)]
pub struct TechniciansResponse {
    pub technicians: Vec<Technician>,
}

/// GET /technicians
pub async fn handle_technicians(
    State(state): State<AppState>,
) -> Result<Json<TechniciansResponse>, AppError> {
    let technicians = state
        .store
        .blocking(|store| store.read_all(Table::Technicians))
        .await?;
    Ok(Json(TechniciansResponse { technicians }))
}

/// GET /technicians/:tech_name/statistics
pub async fn handle_technician_statistics(
    State(state): State<AppState>,
    Path(tech_name): Path<String>,
) -> Result<Json<TechnicianStatistics>, AppError> {
    let orders: Vec<WorkOrder> = state
        .store
        .blocking(|store| store.read_all(Table::WorkOrders))
        .await?;
    Ok(Json(technician_statistics(&orders, &tech_name)))
}

/// GET /technicians/:tech_name/work-orders
pub async fn handle_technician_work_orders(
    State(state): State<AppState>,
    Path(tech_name): Path<String>,
) -> Result<Json<WorkOrderListing>, AppError> {
    let listing = state
        .store
        .blocking(move |store| all_work_orders_for_tech(store, &tech_name))
        .await?;
    Ok(Json(listing))
}

/// GET /technicians/:tech_name/work-orders/:work_date
pub async fn handle_technician_work_orders_on(
    State(state): State<AppState>,
    Path((tech_name, work_date)): Path<(String, String)>,
) -> Result<Json<WorkOrderListing>, AppError> {
    let listing = state
        .store
        .blocking(move |store| work_orders_for_tech_on(store, &tech_name, &work_date))
        .await?;
    Ok(Json(listing))
}

/// GET /work-orders
/// Work orders for the technician configured as `DEFAULT_TECH_NAME`.
pub async fn handle_default_work_orders(
    State(state): State<AppState>,
) -> Result<Json<WorkOrderListing>, AppError> {
    let tech_name = state.config.default_tech_name.trim().to_string();
    if tech_name.is_empty() {
        return Err(AppError::Validation(
            "No default technician configured; set DEFAULT_TECH_NAME or use /technicians/:tech_name/work-orders"
                .to_string(),
        ));
    }
    let listing = state
        .store
        .blocking(move |store| all_work_orders_for_tech(store, &tech_name))
        .await?;
    Ok(Json(listing))
}

/// PUT /work-orders/:work_order_id/complete
pub async fn handle_complete_work_order(
    State(state): State<AppState>,
    Path(work_order_id): Path<String>,
) -> Result<Json<StatusChangeResponse>, AppError> {
    let response = state
        .store
        .blocking(move |store| complete_work_order(store, &work_order_id))
        .await?;
    Ok(Json(response))
}

/// PUT /work-orders/:work_order_id/hold
pub async fn handle_hold_work_order(
    State(state): State<AppState>,
    Path(work_order_id): Path<String>,
    Json(req): Json<HoldRequest>,
) -> Result<Json<HoldResponse>, AppError> {
    let response = state
        .store
        .blocking(move |store| hold_work_order(store, &work_order_id, req))
        .await?;
    Ok(Json(response))
}

/// GET /work-orders/:work_order_id/suggested-hours
pub async fn handle_suggested_hours(
    State(state): State<AppState>,
    Path(work_order_id): Path<String>,
) -> Result<Json<SuggestedHours>, AppError> {
    let (target, orders) = state
        .store
        .blocking(move |store| -> Result<_, AppError> {
            let target = find_work_order(store, &work_order_id)?;
            let orders: Vec<WorkOrder> = store.read_all(Table::WorkOrders)?;
            Ok((target, orders))
        })
        .await?;
    let others = orders
        .iter()
        .filter(|wo| wo.work_order_id != target.work_order_id);

    let wo_type = Some(target.wo_type.as_str()).filter(|t| !t.trim().is_empty());
    let (suggested_hours, sample_size) =
        suggested_labor_hours(others, wo_type, Some(&target.description));

    Ok(Json(SuggestedHours {
        work_order_id: target.work_order_id,
        wo_type: target.wo_type,
        suggested_hours,
        sample_size,
    }))
}

/// POST /work-orders/:work_order_id/completion
pub async fn handle_submit_completion(
    State(state): State<AppState>,
    Path(work_order_id): Path<String>,
    Json(req): Json<CompletionRequest>,
) -> Result<Json<CompletionResponse>, AppError> {
    let response =
        submit_completion(state.llm.as_ref(), &state.store, &work_order_id, req).await?;
    Ok(Json(response))
}
