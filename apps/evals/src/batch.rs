//! Batch runs over the dataset: client summaries per conversation, then CAR
//! reports per work order and note quality built from those summaries.

use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use tracing::{info, warn};

use crate::dataset::{clean_text, parse_work_pct, DatasetRow, WorkOrderMeta};
use crate::service::{Message, ServiceClient};

/// Work orders converted per CAR run.
pub const CAR_WORK_ORDER_LIMIT: usize = 8;
pub const NOTE_QUALITIES: [&str; 3] = ["Bad", "Average", "Good"];

/// Row of `test_summary_output.csv`. Also read back as CAR input.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SummaryOutput {
    pub conversation_id: String,
    pub work_order_id: String,
    pub tech_name: String,
    pub wo_type: String,
    pub plant: String,
    pub work_order_description: String,
    /// Allocation object as JSON text.
    pub work_status: String,
    pub tech_note_type: String,
    pub conversation_length: usize,
    pub success: bool,
    pub summary: String,
    pub notes: String,
    pub error_message: String,
}

/// Row of `test_completion_notes.csv`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct CompletionNoteRow {
    pub conversation_id: String,
    pub work_order_id: String,
    pub tech_notes_type: String,
    pub completion_notes: String,
    pub tech_name: String,
    pub wo_type: String,
    pub plant: String,
    pub description: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct CarOutput {
    pub work_order_id: String,
    pub tech_note_type: String,
    pub tech_name: String,
    pub wo_type: String,
    pub plant: String,
    pub description: String,
    pub completion_notes: String,
    pub conversation_count: usize,
    pub work_status_table: String,
    pub car_cause: String,
    pub car_action: String,
    pub car_result: String,
    pub success: bool,
    pub error_message: String,
}

/// Technician answers and assistant questions in dataset order. The
/// `success`/`failure` labels are not questions and are skipped.
pub fn conversation_messages(rows: &[DatasetRow]) -> Vec<Message> {
    let mut messages = Vec::new();
    for row in rows {
        let answer = row.answer.trim();
        if !answer.is_empty() {
            messages.push(Message::technician(answer));
        }
        let question = row.follow_up_label.trim();
        if !question.is_empty()
            && !question.eq_ignore_ascii_case("success")
            && !question.eq_ignore_ascii_case("failure")
        {
            messages.push(Message::assistant(question));
        }
    }
    messages
}

pub async fn summarize_conversation(
    service: &ServiceClient,
    conversation_id: &str,
    rows: &[DatasetRow],
    work_orders: &HashMap<String, WorkOrderMeta>,
) -> Option<SummaryOutput> {
    let first = rows.first()?;
    let work_order_id = first.work_order_id();
    let meta = work_orders.get(work_order_id);
    let messages = conversation_messages(rows);

    let description = meta
        .map(|wo| wo.description.clone())
        .unwrap_or_else(|| first.wo_description.clone());
    let wo_type = meta
        .map(|wo| wo.wo_type.clone())
        .unwrap_or_else(|| first.wo_type.clone());
    let plant = meta.map(|wo| wo.plant.clone()).unwrap_or_default();
    let work_status =
        parse_work_pct(&first.work_pct).unwrap_or_else(|| json!({"Work": {"percentage": 100}}));

    let payload = json!({
        "messages": messages,
        "work_order_description": description,
        "work_status": work_status,
        "plant": plant,
        "work_order_type": wo_type,
    });
    let (summary, notes, error_message) = match service.convert_to_client_summary(&payload).await {
        Ok(reply) => (reply.summary, reply.notes, String::new()),
        Err(e) => {
            warn!("Conversation {conversation_id}: {e:#}");
            (String::new(), String::new(), e.to_string())
        }
    };

    Some(SummaryOutput {
        conversation_id: conversation_id.to_string(),
        work_order_id: work_order_id.to_string(),
        tech_name: first.tech_name.clone(),
        wo_type,
        plant,
        work_order_description: description,
        work_status: work_status.to_string(),
        tech_note_type: first.tech_notes_type.clone(),
        conversation_length: messages.len(),
        success: error_message.is_empty() && !summary.is_empty() && !notes.is_empty(),
        summary,
        notes,
        error_message,
    })
}

pub async fn run_client_summaries(
    service: &ServiceClient,
    conversations: &[(String, Vec<DatasetRow>)],
    work_orders: &HashMap<String, WorkOrderMeta>,
) -> Vec<SummaryOutput> {
    let mut outputs = Vec::new();
    for (conversation_id, rows) in conversations {
        if let Some(output) =
            summarize_conversation(service, conversation_id, rows, work_orders).await
        {
            info!(
                "Conversation {conversation_id}: {}",
                if output.success { "ok" } else { "failed" }
            );
            outputs.push(output);
        }
    }
    outputs
}

/// `Date | Tech Name | Time allocation | Notes | Summary` table from the
/// client summaries of one note quality.
pub fn work_status_table(summaries: &[&SummaryOutput], note_type: &str) -> String {
    let logs: Vec<&&SummaryOutput> = summaries
        .iter()
        .filter(|s| s.tech_note_type == note_type)
        .collect();
    if logs.is_empty() {
        return format!(
            "No work logs found for this work order and tech note type: {note_type}."
        );
    }

    let mut table = String::from("Date | Tech Name | Time allocation | Notes | Summary\n");
    for log in logs {
        // Conversation ids stand in for dates.
        let date = format!(
            "2024-{:02}-01",
            log.conversation_id.trim().parse::<u32>().unwrap_or_default()
        );
        let allocation = serde_json::from_str::<Map<String, Value>>(&log.work_status)
            .map(|map| {
                map.iter()
                    .map(|(status, share)| {
                        format!("{status}: {}%", share["percentage"].as_i64().unwrap_or(0))
                    })
                    .collect::<Vec<_>>()
                    .join(", ")
            })
            .unwrap_or_default();
        table.push_str(&format!(
            "{date} | {} | {allocation} | {} | {}\n",
            log.tech_name,
            clean_text(&log.notes),
            clean_text(&log.summary)
        ));
    }
    table
}

/// First work orders (by id) that have both summaries and completion notes.
pub fn car_work_orders<'a>(
    summaries: &'a [SummaryOutput],
    completions: &'a [CompletionNoteRow],
) -> BTreeMap<&'a str, (Vec<&'a SummaryOutput>, Vec<&'a CompletionNoteRow>)> {
    let mut by_order: BTreeMap<&str, (Vec<&SummaryOutput>, Vec<&CompletionNoteRow>)> =
        BTreeMap::new();
    for summary in summaries {
        by_order
            .entry(summary.work_order_id.as_str())
            .or_default()
            .0
            .push(summary);
    }
    for note in completions {
        if let Some(entry) = by_order.get_mut(note.work_order_id.as_str()) {
            entry.1.push(note);
        }
    }
    by_order
        .into_iter()
        .filter(|(_, (_, notes))| !notes.is_empty())
        .take(CAR_WORK_ORDER_LIMIT)
        .collect()
}

pub async fn run_car(
    service: &ServiceClient,
    summaries: &[SummaryOutput],
    completions: &[CompletionNoteRow],
    dataset: &[DatasetRow],
) -> Vec<CarOutput> {
    let mut outputs = Vec::new();
    for (work_order_id, (logs, notes)) in car_work_orders(summaries, completions) {
        let first_row = dataset.iter().find(|r| r.work_order_id() == work_order_id);
        for note_type in NOTE_QUALITIES {
            let Some(note) = notes.iter().find(|n| n.tech_notes_type == note_type) else {
                info!("{work_order_id}: no {note_type} completion note, skipping");
                continue;
            };
            let table = work_status_table(&logs, note_type);
            let payload = json!({
                "completion_notes": note.completion_notes,
                "wo_status_and_notes_with_time_allocation_table": table,
                "work_order_description": first_row.map(|r| r.wo_description.as_str()).unwrap_or_default(),
                "work_order_type": first_row.map(|r| r.wo_type.as_str()).unwrap_or_default(),
            });

            let (cause, action, result, error_message) =
                match service.convert_to_car(&payload).await {
                    Ok(car) => (car.cause, car.action, car.result, String::new()),
                    Err(e) => {
                        warn!("{work_order_id} ({note_type}): {e:#}");
                        (String::new(), String::new(), String::new(), e.to_string())
                    }
                };
            let success = error_message.is_empty()
                && !cause.is_empty()
                && !action.is_empty()
                && !result.is_empty();

            outputs.push(CarOutput {
                work_order_id: work_order_id.to_string(),
                tech_note_type: note_type.to_string(),
                tech_name: note.tech_name.clone(),
                wo_type: note.wo_type.clone(),
                plant: note.plant.clone(),
                description: note.description.clone(),
                completion_notes: clean_text(&note.completion_notes),
                conversation_count: logs.iter().filter(|l| l.tech_note_type == note_type).count(),
                work_status_table: clean_text(&table),
                car_cause: clean_text(&cause),
                car_action: clean_text(&action),
                car_result: clean_text(&result),
                success,
                error_message: clean_text(&error_message),
            });
        }
    }
    outputs
}
