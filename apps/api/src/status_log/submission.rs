use serde::{Deserialize, Serialize};
use tracing::info;

use crate::assistant::allocation::WorkStatusInput;
use crate::errors::AppError;
use crate::models::logs::WorkStatusLog;
use crate::models::{now_timestamp, parse_work_date};
use crate::store::{CsvStore, Table};

#[derive(Debug, Deserialize)]
pub struct WorkStatusSubmission {
    pub tech_name: String,
    pub work_date: String,
    pub work_status: WorkStatusInput,
    #[serde(default)]
    pub start_time: String,
    #[serde(default)]
    pub end_time: String,
    /// Hours.
    pub time_spent: f64,
    #[serde(default)]
    pub notes: String,
    #[serde(default)]
    pub summary: String,
    #[serde(default)]
    pub work_order_id: Option<String>,
    #[serde(default)]
    pub complete_flag: bool,
}

#[derive(Debug, Serialize)]
pub struct SubmissionResponse {
    pub message: String,
    pub log_id: u64,
    pub tech_name: String,
    pub work_date: String,
}

pub fn submit_work_status(
    store: &CsvStore,
    submission: WorkStatusSubmission,
) -> Result<SubmissionResponse, AppError> {
    parse_work_date(&submission.work_date)?;

    if submission.tech_name.trim().is_empty() {
        return Err(AppError::Validation("tech_name cannot be empty".to_string()));
    }
    if !submission.time_spent.is_finite() || submission.time_spent < 0.0 {
        return Err(AppError::Validation(
            "time_spent must be a non-negative number of hours".to_string(),
        ));
    }
    submission
        .work_status
        .validate()
        .map_err(AppError::Validation)?;

    let now = now_timestamp();
    let WorkStatusSubmission {
        tech_name,
        work_date,
        work_status,
        start_time,
        end_time,
        time_spent,
        notes,
        summary,
        work_order_id,
        complete_flag,
    } = submission;

    let log = store.insert_with_id(Table::WorkStatusLogs, |id| WorkStatusLog {
        id,
        tech_name,
        work_date,
        work_status: work_status.to_storage_string(),
        start_time,
        end_time,
        time_spent: Some(time_spent),
        notes,
        summary,
        work_order_id: work_order_id.unwrap_or_default(),
        complete_flag,
        created_at: now.clone(),
        updated_at: now.clone(),
    })?;

    info!(
        "Work status log {} saved for {} on {} (work order '{}')",
        log.id, log.tech_name, log.work_date, log.work_order_id
    );

    Ok(SubmissionResponse {
        message: "Work status submitted successfully".to_string(),
        log_id: log.id,
        tech_name: log.tech_name,
        work_date: log.work_date,
    })
}

/// Logs for one work order, oldest first.
pub fn work_status_logs(
    store: &CsvStore,
    work_order_id: &str,
) -> Result<Vec<WorkStatusLog>, AppError> {
    let mut logs: Vec<WorkStatusLog> = store
        .read_all::<WorkStatusLog>(Table::WorkStatusLogs)?
        .into_iter()
        .filter(|log| log.work_order_id == work_order_id)
        .collect();
    logs.sort_by(|a, b| {
        (&a.work_date, &a.start_time, a.id).cmp(&(&b.work_date, &b.start_time, b.id))
    });
    Ok(logs)
}

/// Renders logs as `date | status | hours | notes` lines, the context the
/// assistant gets about earlier work on the same order.
pub fn status_notes_table(logs: &[WorkStatusLog]) -> String {
    logs.iter()
        .map(|log| {
            let status = describe_status(&log.work_status);
            let hours = log
                .time_spent
                .map(|h| format!("{h} h"))
                .unwrap_or_else(|| "n/a".to_string());
            let notes = log.notes.replace(['\r', '\n'], " ");
            format!("{} | {} | {} | {}", log.work_date, status, hours, notes.trim())
        })
        .collect::<Vec<_>>()
        .join("\n")
}

fn describe_status(stored: &str) -> String {
    match WorkStatusInput::from_storage_string(stored) {
        WorkStatusInput::Single(name) => name,
        allocation => allocation
            .shares()
            .iter()
            .map(|s| format!("{} {}%", s.status, s.percentage))
            .collect::<Vec<_>>()
            .join(", "),
    }
}
