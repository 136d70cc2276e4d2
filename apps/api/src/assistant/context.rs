use serde::Deserialize;

use crate::errors::AppError;
use crate::status_log::submission::{status_notes_table, work_status_logs};
use crate::store::CsvStore;
use crate::work_orders::queries::find_work_order;

pub const NO_PREVIOUS_LOGS: &str = "No previous logs recorded.";

/// Work order details a caller may send with an assistant request.
/// Anything left out is filled from the stored work order when
/// `work_order_id` is given.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ContextFields {
    pub work_order_id: Option<String>,
    pub work_order_type: String,
    pub work_order_description: String,
    pub plant: String,
    #[serde(alias = "wo_status_and_notes_with_time_allocation_table")]
    pub wo_status_and_notes_table: Option<String>,
}

/// Fully resolved work order context for a prompt.
#[derive(Debug, Clone, PartialEq)]
pub struct WorkOrderContext {
    pub work_order_type: String,
    pub description: String,
    pub plant: String,
    pub previous_logs: String,
}

impl WorkOrderContext {
    pub fn resolve(store: &CsvStore, fields: ContextFields) -> Result<Self, AppError> {
        let work_order_id = fields
            .work_order_id
            .as_deref()
            .map(str::trim)
            .filter(|id| !id.is_empty());

        let stored = match work_order_id {
            Some(id) => Some(find_work_order(store, id)?),
            None => None,
        };

        let previous_logs = match non_empty(fields.wo_status_and_notes_table) {
            Some(table) => table,
            None => match work_order_id {
                Some(id) => {
                    let logs = work_status_logs(store, id)?;
                    if logs.is_empty() {
                        NO_PREVIOUS_LOGS.to_string()
                    } else {
                        status_notes_table(&logs)
                    }
                }
                None => NO_PREVIOUS_LOGS.to_string(),
            },
        };

        let stored = stored.unwrap_or_default();
        Ok(Self {
            work_order_type: pick(fields.work_order_type, stored.wo_type),
            description: pick(fields.work_order_description, stored.description),
            plant: pick(fields.plant, stored.plant),
            previous_logs,
        })
    }

    /// [`resolve`](Self::resolve) on the store's blocking pool.
    pub async fn load(store: &CsvStore, fields: ContextFields) -> Result<Self, AppError> {
        store
            .blocking(move |store| Self::resolve(store, fields))
            .await
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

fn pick(provided: String, stored: String) -> String {
    if provided.trim().is_empty() {
        stored
    } else {
        provided
    }
}
