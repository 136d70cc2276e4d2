use serde::{Deserialize, Serialize};
use tracing::info;

use crate::errors::AppError;
use crate::models::logs::HoldNote;
use crate::models::work_order::{StatusClass, WorkOrder, WorkOrderStatus};
use crate::models::{now_timestamp, parse_work_date};
use crate::store::{CsvStore, Table};

#[derive(Debug, Serialize)]
pub struct WorkOrderListing {
    pub work_orders: Vec<WorkOrder>,
    pub total_pending: usize,
    pub total_completed: usize,
    pub total_on_hold: usize,
}

impl WorkOrderListing {
    fn from_orders(work_orders: Vec<WorkOrder>) -> Self {
        let count = |class: StatusClass| {
            work_orders
                .iter()
                .filter(|wo| wo.status_class() == class)
                .count()
        };
        Self {
            total_pending: count(StatusClass::Pending),
            total_completed: count(StatusClass::Completed),
            total_on_hold: count(StatusClass::OnHold),
            work_orders,
        }
    }
}

/// Work orders assigned to `tech_name` on `work_date` (`YYYY-MM-DD`).
pub fn work_orders_for_tech_on(
    store: &CsvStore,
    tech_name: &str,
    work_date: &str,
) -> Result<WorkOrderListing, AppError> {
    parse_work_date(work_date)?;
    let orders = store
        .read_all::<WorkOrder>(Table::WorkOrders)?
        .into_iter()
        .filter(|wo| wo.tech_name == tech_name && wo.work_date == work_date)
        .collect();
    Ok(WorkOrderListing::from_orders(orders))
}

pub fn all_work_orders_for_tech(
    store: &CsvStore,
    tech_name: &str,
) -> Result<WorkOrderListing, AppError> {
    let orders = store
        .read_all::<WorkOrder>(Table::WorkOrders)?
        .into_iter()
        .filter(|wo| wo.tech_name == tech_name)
        .collect();
    Ok(WorkOrderListing::from_orders(orders))
}

/// First row with the given external work order id.
pub fn find_work_order(store: &CsvStore, work_order_id: &str) -> Result<WorkOrder, AppError> {
    store
        .read_all::<WorkOrder>(Table::WorkOrders)?
        .into_iter()
        .find(|wo| wo.work_order_id == work_order_id)
        .ok_or_else(|| not_found(work_order_id))
}

/// Sets the status on every row carrying `work_order_id` (an order spread
/// over several days has one row per day). Returns the first updated row.
pub fn set_work_order_status(
    store: &CsvStore,
    work_order_id: &str,
    status: WorkOrderStatus,
) -> Result<WorkOrder, AppError> {
    let now = now_timestamp();
    let updated = store.update(Table::WorkOrders, |rows: &mut Vec<WorkOrder>| {
        let mut first = None;
        for wo in rows.iter_mut().filter(|wo| wo.work_order_id == work_order_id) {
            wo.set_status(status, &now);
            if first.is_none() {
                first = Some(wo.clone());
            }
        }
        first
    })?;

    let updated = updated.ok_or_else(|| not_found(work_order_id))?;
    info!("Work order {} set to {}", work_order_id, status.as_str());
    Ok(updated)
}

#[derive(Debug, Serialize)]
pub struct StatusChangeResponse {
    pub message: String,
    pub work_order_id: String,
    pub status: String,
}

pub fn complete_work_order(
    store: &CsvStore,
    work_order_id: &str,
) -> Result<StatusChangeResponse, AppError> {
    let wo = set_work_order_status(store, work_order_id, WorkOrderStatus::Completed)?;
    Ok(StatusChangeResponse {
        message: format!("Work order {work_order_id} marked as completed"),
        work_order_id: wo.work_order_id,
        status: wo.status,
    })
}

#[derive(Debug, Deserialize)]
pub struct HoldRequest {
    pub hold_reason: String,
    #[serde(default)]
    pub notes: String,
    #[serde(default)]
    pub tech_name: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct HoldResponse {
    pub message: String,
    pub work_order_id: String,
    pub status: String,
    pub hold_note_id: u64,
}

/// Puts a work order on hold and records why.
pub fn hold_work_order(
    store: &CsvStore,
    work_order_id: &str,
    req: HoldRequest,
) -> Result<HoldResponse, AppError> {
    let hold_reason = req.hold_reason.trim();
    if hold_reason.is_empty() {
        return Err(AppError::Validation("hold_reason cannot be empty".to_string()));
    }

    // Note before status: an `On Hold` order always has its hold note.
    let wo = find_work_order(store, work_order_id)?;
    let tech_name = req
        .tech_name
        .filter(|name| !name.trim().is_empty())
        .unwrap_or_else(|| wo.tech_name.clone());
    let created_at = now_timestamp();

    let note = store.insert_with_id(Table::HoldNotes, |id| HoldNote {
        id,
        work_order_id: wo.work_order_id.clone(),
        tech_name,
        hold_reason: hold_reason.to_string(),
        notes: req.notes,
        created_at,
    })?;
    let wo = set_work_order_status(store, work_order_id, WorkOrderStatus::OnHold)?;

    Ok(HoldResponse {
        message: format!("Work order {work_order_id} put on hold"),
        work_order_id: wo.work_order_id,
        status: wo.status,
        hold_note_id: note.id,
    })
}

fn not_found(work_order_id: &str) -> AppError {
    AppError::NotFound(format!("Work order {work_order_id} not found"))
}

#[cfg(test)]
pub(crate) mod fixtures {
    use super::*;

    pub fn work_order(id: u64, wo_id: &str, tech: &str, date: &str, status: &str) -> WorkOrder {
        WorkOrder {
            id,
            work_order_id: wo_id.to_string(),
            tech_name: tech.to_string(),
            work_date: date.to_string(),
            status: status.to_string(),
            description: "Inverter 3 offline".to_string(),
            wo_type: "Corrective".to_string(),
            plant: "Sunfield".to_string(),
            hours: Some(4.0),
            ..Default::default()
        }
    }

    /// Three orders for Jane across two days and one for Sam.
    pub fn seed(store: &CsvStore) {
        store
            .write_all(
                Table::WorkOrders,
                &[
                    work_order(1, "WO-100", "Jane Doe", "2024-03-27", "Pending"),
                    work_order(2, "WO-101", "Jane Doe", "2024-03-27", "closed"),
                    work_order(3, "WO-102", "Jane Doe", "2024-03-28", "On Hold"),
                    work_order(4, "WO-200", "Sam Lee", "2024-03-27", "Open"),
                ],
            )
            .unwrap();
    }
}
