use serde::{Deserialize, Serialize};

use crate::store::Record;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkOrder {
    pub id: u64,
    pub work_order_id: String,
    pub tech_name: String,
    pub work_date: String,
    pub status: String,
    pub description: String,
    pub wo_type: String,
    pub time_type: String,
    pub asset_description: String,
    pub asset_id: String,
    pub plant: String,
    #[serde(deserialize_with = "csv::invalid_option")]
    pub hours: Option<f64>,
    pub created_at: String,
    pub updated_at: String,
}

impl Record for WorkOrder {
    fn id(&self) -> u64 {
        self.id
    }
}

impl WorkOrder {
    pub fn status_class(&self) -> StatusClass {
        StatusClass::of(&self.status)
    }

    pub fn set_status(&mut self, status: WorkOrderStatus, now: &str) {
        self.status = status.as_str().to_string();
        self.updated_at = now.to_string();
    }
}

/// Status values this service writes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkOrderStatus {
    Completed,
    OnHold,
}

impl WorkOrderStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            WorkOrderStatus::Completed => "Completed",
            WorkOrderStatus::OnHold => "On Hold",
        }
    }
}

/// Buckets for the free-form status strings found in imported data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StatusClass {
    Pending,
    Completed,
    OnHold,
    Other,
}

impl StatusClass {
    pub fn of(status: &str) -> Self {
        match status.trim().to_lowercase().as_str() {
            "pending" | "open" | "assigned" | "in_progress" | "working" => StatusClass::Pending,
            "completed" | "closed" | "finished" => StatusClass::Completed,
            "on hold" | "on_hold" | "hold" => StatusClass::OnHold,
            _ => StatusClass::Other,
        }
    }
}
