use serde::{Deserialize, Serialize};
use tracing::info;

use crate::assistant::car::{generate_car, CarReport};
use crate::assistant::context::{ContextFields, WorkOrderContext};
use crate::errors::AppError;
use crate::llm_client::LanguageModel;
use crate::models::logs::CompletionNote;
use crate::models::work_order::WorkOrderStatus;
use crate::models::{now_timestamp, parse_work_date};
use crate::store::{CsvStore, Table};
use crate::work_orders::queries::{find_work_order, set_work_order_status};

#[derive(Debug, Deserialize)]
pub struct CompletionRequest {
    pub completion_notes: String,
    #[serde(default)]
    pub tech_name: Option<String>,
    /// Defaults to today.
    #[serde(default)]
    pub work_date: Option<String>,
    #[serde(default, alias = "wo_status_and_notes_with_time_allocation_table")]
    pub wo_status_and_notes_table: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct CompletionResponse {
    pub message: String,
    pub work_order_id: String,
    pub status: String,
    pub completion_note_id: u64,
    pub car: CarReport,
}

/// Closes out a work order: CAR report from the final notes and earlier
/// logs, a stored completion note, and status `Completed`.
///
/// Nothing is written if the CAR conversion fails. The completion note is
/// stored before the status changes.
pub async fn submit_completion(
    llm: &dyn LanguageModel,
    store: &CsvStore,
    work_order_id: &str,
    req: CompletionRequest,
) -> Result<CompletionResponse, AppError> {
    let work_date = match req.work_date.as_deref().map(str::trim) {
        Some(date) if !date.is_empty() => parse_work_date(date)?,
        _ => chrono::Utc::now().date_naive(),
    };
    let lookup_id = work_order_id.to_string();
    let previous_logs = req.wo_status_and_notes_table;
    let (work_order, context) = store
        .blocking(move |store| -> Result<_, AppError> {
            let work_order = find_work_order(store, &lookup_id)?;
            let context = WorkOrderContext::resolve(
                store,
                ContextFields {
                    work_order_id: Some(lookup_id),
                    wo_status_and_notes_table: previous_logs,
                    ..Default::default()
                },
            )?;
            Ok((work_order, context))
        })
        .await?;
    let car = generate_car(llm, &context, &req.completion_notes).await?;

    let tech_name = req
        .tech_name
        .filter(|name| !name.trim().is_empty())
        .unwrap_or_else(|| work_order.tech_name.clone());
    let row = CompletionNote {
        id: 0,
        work_order_id: work_order.work_order_id.clone(),
        tech_name,
        work_date: work_date.format("%Y-%m-%d").to_string(),
        completion_notes: req.completion_notes.trim().to_string(),
        cause: car.cause.clone(),
        action: car.action.clone(),
        result: car.result.clone(),
        wo_type: context.work_order_type,
        plant: context.plant,
        created_at: now_timestamp(),
    };

    // Note before status: a `Completed` order always has its completion note.
    let (note, updated) = store
        .blocking(move |store| -> Result<_, AppError> {
            let note = store.insert_with_id(Table::CompletionNotes, |id| CompletionNote {
                id,
                ..row
            })?;
            let updated =
                set_work_order_status(store, &note.work_order_id, WorkOrderStatus::Completed)?;
            Ok((note, updated))
        })
        .await?;
    info!(
        "Completion note {} stored for work order {}",
        note.id, updated.work_order_id
    );

    Ok(CompletionResponse {
        message: format!("Work order {work_order_id} completed"),
        work_order_id: updated.work_order_id,
        status: updated.status,
        completion_note_id: note.id,
        car,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm_client::testing::ScriptedModel;
    use crate::llm_client::LlmError;
    use crate::work_orders::queries::fixtures::seed;
    use tempfile::TempDir;

    const CAR_REPLY: &str = r#"{"cause": "Ground fault.", "action": "Replaced MC4.", "result": "Online."}"#;

    fn seeded() -> (TempDir, CsvStore) {
        let dir = TempDir::new().unwrap();
        let store = CsvStore::new(dir.path());
        seed(&store);
        (dir, store)
    }

    fn request(notes: &str) -> CompletionRequest {
        CompletionRequest {
            completion_notes: notes.to_string(),
            tech_name: None,
            work_date: Some("2024-03-29".to_string()),
            wo_status_and_notes_table: None,
        }
    }

    #[tokio::test]
    async fn test_completion_stores_car_and_completes() {
        let (_dir, store) = seeded();
        let llm = ScriptedModel::replying(&[CAR_REPLY]);

        let response = submit_completion(&llm, &store, "WO-100", request("Swapped MC4"))
            .await
            .unwrap();
        assert_eq!(response.status, "Completed");
        assert_eq!(response.car.action, "Replaced MC4.");

        let notes: Vec<CompletionNote> = store.read_all(Table::CompletionNotes).unwrap();
        assert_eq!(notes.len(), 1);
        assert_eq!(notes[0].tech_name, "Jane Doe");
        assert_eq!(notes[0].work_date, "2024-03-29");
        assert_eq!(notes[0].wo_type, "Corrective");
        assert_eq!(notes[0].result, "Online.");
        assert_eq!(find_work_order(&store, "WO-100").unwrap().status, "Completed");
    }

    #[tokio::test]
    async fn test_llm_failure_leaves_order_untouched() {
        let (_dir, store) = seeded();
        let llm = ScriptedModel::failing(LlmError::EmptyContent);

        let err = submit_completion(&llm, &store, "WO-100", request("Swapped MC4"))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Llm(_)));
        assert_eq!(find_work_order(&store, "WO-100").unwrap().status, "Pending");
        let notes: Vec<CompletionNote> = store.read_all(Table::CompletionNotes).unwrap();
        assert!(notes.is_empty());
    }

    #[tokio::test]
    async fn test_unknown_work_order_is_not_found() {
        let (_dir, store) = seeded();
        let llm = ScriptedModel::replying(&[CAR_REPLY]);
        let err = submit_completion(&llm, &store, "WO-999", request("Done"))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
        assert!(llm.calls().is_empty());
    }

    #[tokio::test]
    async fn test_bad_work_date_is_rejected() {
        let (_dir, store) = seeded();
        let llm = ScriptedModel::replying(&[CAR_REPLY]);
        let mut req = request("Done");
        req.work_date = Some("29-03-2024".to_string());
        let err = submit_completion(&llm, &store, "WO-100", req).await.unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }
}
