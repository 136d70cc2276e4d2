pub mod health;

use axum::{
    routing::{get, post, put},
    Router,
};

use crate::assistant::handlers as assistant;
use crate::state::AppState;
use crate::status_log::handlers as status_log;
use crate::work_orders::handlers as work_orders;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_handler))
        .route("/config", get(health::config_handler))
        // Technicians and reference data
        .route("/technicians", get(work_orders::handle_technicians))
        .route(
            "/technicians/:tech_name/statistics",
            get(work_orders::handle_technician_statistics),
        )
        .route(
            "/technicians/:tech_name/work-orders",
            get(work_orders::handle_technician_work_orders),
        )
        .route(
            "/technicians/:tech_name/work-orders/:work_date",
            get(work_orders::handle_technician_work_orders_on),
        )
        .route(
            "/work-status-types",
            get(status_log::handle_work_status_types),
        )
        // Work orders
        .route("/work-orders", get(work_orders::handle_default_work_orders))
        .route(
            "/work-orders/:work_order_id/complete",
            put(work_orders::handle_complete_work_order),
        )
        .route(
            "/work-orders/:work_order_id/hold",
            put(work_orders::handle_hold_work_order),
        )
        .route(
            "/work-orders/:work_order_id/suggested-hours",
            get(work_orders::handle_suggested_hours),
        )
        .route(
            "/work-orders/:work_order_id/completion",
            post(work_orders::handle_submit_completion),
        )
        // Status logs and chat
        .route(
            "/work-status-logs/:work_order_id",
            get(status_log::handle_work_status_logs),
        )
        .route(
            "/submit-work-status",
            post(status_log::handle_submit_work_status),
        )
        .route("/submit-chat", post(status_log::handle_submit_chat))
        // Assistant
        .route(
            "/validate-work-status",
            post(assistant::handle_validate_work_status),
        )
        .route(
            "/validate-reason-for-hold",
            post(assistant::handle_validate_reason_for_hold),
        )
        .route("/convert-to-car", post(assistant::handle_convert_to_car))
        .route(
            "/convert-to-client-summary",
            post(assistant::handle_convert_to_client_summary),
        )
        .with_state(state)
}
