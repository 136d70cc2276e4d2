//! Replays labeled work-log conversations against `/validate-work-status`.
//!
//! Each conversation starts from the technician's initial note. After every
//! turn the service's follow-up question and the technician's next answer
//! from the dataset are threaded into the history, so later turns are judged
//! with the same context a technician would have built up in the app.

use std::collections::HashMap;

use serde::Serialize;
use serde_json::{json, Value};
use tracing::{info, warn};

use crate::dataset::{parse_work_pct, DatasetRow, WorkOrderMeta};
use crate::grader::Grader;
use crate::service::{Message, ServiceClient, Validation};

/// Minimum similarity for a generated follow-up to match the labeled one.
pub const SIMILARITY_THRESHOLD: f64 = 0.60;

/// What the dataset says the service should answer after a turn.
#[derive(Debug, Clone, PartialEq)]
pub struct Expected {
    pub valid: bool,
    /// Empty when the label is only `success` or `failure`.
    pub follow_up: String,
}

impl Expected {
    pub fn from_label(label: &str) -> Self {
        let label = label.trim();
        if label.eq_ignore_ascii_case("success") {
            Expected {
                valid: true,
                follow_up: String::new(),
            }
        } else if label.eq_ignore_ascii_case("failure") {
            Expected {
                valid: false,
                follow_up: String::new(),
            }
        } else {
            Expected {
                valid: false,
                follow_up: label.to_string(),
            }
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct RowResult {
    pub id: String,
    pub conversation_id: String,
    pub tech_notes_type: String,
    pub work_order_id: String,
    pub tech_name: String,
    pub wo_type: String,
    pub plant: String,
    pub work_order_description: String,
    pub operational_log: String,
    pub expected_valid: bool,
    pub returned_valid: bool,
    pub expected_follow_up: String,
    pub returned_follow_up: String,
    pub similarity: Option<f64>,
    pub pass: bool,
    pub notes: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct SummaryRow {
    pub id: String,
    pub conversation_id: String,
    pub work_order_id: String,
    pub tech_name: String,
    pub wo_type: String,
    #[serde(rename = "Tech Notes Type")]
    pub tech_notes_type: String,
    pub pass: bool,
    pub reason: String,
}

/// Payload for one turn. The first message in `history` is the initial note.
fn turn_payload(row: &DatasetRow, history: &[Message], meta: Option<&WorkOrderMeta>) -> Value {
    let work_status_name = meta
        .map(|wo| wo.wo_type.trim())
        .filter(|t| !t.is_empty())
        .or_else(|| Some(row.wo_type.trim()).filter(|t| !t.is_empty()))
        .unwrap_or("Work");
    let work_status =
        parse_work_pct(&row.work_pct).unwrap_or_else(|| Value::String(work_status_name.to_string()));

    let mut payload = json!({
        "work_status": work_status,
        "messages": history,
    });
    let work_order_id = row.work_order_id();
    if meta.is_some() {
        payload["work_order_id"] = json!(work_order_id);
    } else {
        payload["work_order_type"] = json!(row.wo_type.trim());
        payload["work_order_description"] = json!(row.wo_description.trim());
    }
    payload
}

/// Judges one turn's reply against its label.
pub async fn judge_turn(
    grader: &Grader,
    expected: &Expected,
    returned: &Validation,
) -> (bool, Option<f64>, Vec<String>) {
    let mut pass = true;
    let mut notes = Vec::new();
    if expected.valid != returned.valid {
        pass = false;
        notes.push(format!(
            "valid mismatch: expected={} got={}",
            expected.valid, returned.valid
        ));
    }

    let mut similarity = None;
    if !expected.follow_up.is_empty() {
        let score = grader
            .similarity(&expected.follow_up, &returned.follow_up())
            .await;
        similarity = Some(score);
        if score < SIMILARITY_THRESHOLD {
            pass = false;
            notes.push(format!("follow_up similarity too low: {score:.2}"));
        }
    }
    (pass, similarity, notes)
}

pub async fn evaluate_conversation(
    service: &ServiceClient,
    grader: &Grader,
    rows: &[DatasetRow],
    work_orders: &HashMap<String, WorkOrderMeta>,
) -> Vec<RowResult> {
    let mut results = Vec::with_capacity(rows.len());
    let mut history: Vec<Message> = Vec::new();

    for (idx, row) in rows.iter().enumerate() {
        if idx == 0 {
            history.push(Message::technician(row.answer.trim()));
        }
        let meta = work_orders.get(row.work_order_id());
        let expected = Expected::from_label(&row.follow_up_label);
        let payload = turn_payload(row, &history, meta);

        let (returned, mut notes) = match service.validate_work_status(&payload).await {
            Ok(verdict) => (verdict, Vec::new()),
            Err(e) => {
                warn!("Conversation {} row {}: {e:#}", row.conversation_id, row.id);
                (Validation::default(), vec![format!("request failed: {e}")])
            }
        };
        let (pass, similarity, judge_notes) = judge_turn(grader, &expected, &returned).await;
        notes.extend(judge_notes);

        let db_tech = meta.map(|wo| wo.tech_name.trim()).unwrap_or_default();
        let ds_tech = row.tech_name.trim();
        if !db_tech.is_empty() && !ds_tech.is_empty() && !db_tech.eq_ignore_ascii_case(ds_tech) {
            notes.push(format!("db tech mismatch: {db_tech} vs {ds_tech}"));
        }

        let returned_follow_up = returned.follow_up();
        results.push(RowResult {
            id: row.id.clone(),
            conversation_id: row.conversation_id.clone(),
            tech_notes_type: row.tech_notes_type.clone(),
            work_order_id: row.work_order_id().to_string(),
            tech_name: (if ds_tech.is_empty() { db_tech } else { ds_tech }).to_string(),
            wo_type: meta
                .map(|wo| wo.wo_type.clone())
                .unwrap_or_else(|| row.wo_type.clone()),
            plant: meta.map(|wo| wo.plant.clone()).unwrap_or_default(),
            work_order_description: meta
                .map(|wo| wo.description.clone())
                .unwrap_or_else(|| row.wo_description.clone()),
            operational_log: row.answer.trim().to_string(),
            expected_valid: expected.valid,
            returned_valid: returned.valid,
            expected_follow_up: expected.follow_up,
            returned_follow_up: returned_follow_up.clone(),
            similarity,
            pass,
            notes: notes.join("; "),
        });

        if !returned_follow_up.is_empty() {
            history.push(Message::assistant(returned_follow_up));
        }
        if let Some(next) = rows.get(idx + 1) {
            let answer = next.answer.trim();
            if !answer.is_empty() {
                history.push(Message::technician(answer));
            }
        }
    }
    results
}

/// Why a row failed, in the words the evaluation reports use.
pub fn failure_reason(result: &RowResult) -> String {
    if let Some(score) = result.similarity.filter(|s| *s < SIMILARITY_THRESHOLD) {
        return format!(
            "%mismatch between follow ups (sim={}%)",
            (score * 100.0).round() as i64
        );
    }
    match (result.expected_valid, result.returned_valid) {
        (true, false) => "Conversation didn't end valid on time".to_string(),
        (false, true) => "conversation ended before time".to_string(),
        _ => "failed".to_string(),
    }
}

pub fn summarize(results: &[RowResult]) -> Vec<SummaryRow> {
    results
        .iter()
        .map(|r| SummaryRow {
            id: r.id.clone(),
            conversation_id: r.conversation_id.clone(),
            work_order_id: r.work_order_id.clone(),
            tech_name: r.tech_name.clone(),
            wo_type: r.wo_type.clone(),
            tech_notes_type: r.tech_notes_type.clone(),
            pass: r.pass,
            reason: if r.pass { String::new() } else { failure_reason(r) },
        })
        .collect()
}

/// Runs every conversation and returns the row results.
pub async fn run(
    service: &ServiceClient,
    grader: &Grader,
    conversations: &[(String, Vec<DatasetRow>)],
    work_orders: &HashMap<String, WorkOrderMeta>,
) -> Vec<RowResult> {
    let mut results = Vec::new();
    for (conversation_id, rows) in conversations {
        let rows = evaluate_conversation(service, grader, rows, work_orders).await;
        let passed = rows.iter().filter(|r| r.pass).count();
        info!(
            "Conversation {conversation_id}: {passed}/{} turns passed",
            rows.len()
        );
        results.extend(rows);
    }
    results
}
