//! Hold-reason conversations against `/validate-reason-for-hold`.
//!
//! For every work order in the dataset, nine cases are built: a bad, an
//! average and a good explanation for each of three hold types. Each case
//! runs for up to three turns. When the service asks a follow-up question,
//! the grader model answers it as the technician would.

use std::collections::HashMap;

use serde::Serialize;
use serde_json::json;
use tracing::{info, warn};

use crate::dataset::{clean_text, WorkOrderMeta};
use crate::grader::{Grader, HoldAnswerContext};
use crate::service::{Message, ServiceClient};

pub const MAX_TURNS: usize = 3;

/// Equipment, part and process named in earlier notes, used to make the
/// case texts specific to the work order.
#[derive(Debug, Clone, PartialEq)]
pub struct NotesContext {
    pub equipment: &'static str,
    pub part: &'static str,
    pub process: &'static str,
}

pub fn extract_context(notes: &str) -> NotesContext {
    let text = notes.to_lowercase();
    let has = |needles: &[&str]| needles.iter().any(|n| text.contains(n));

    let equipment = if has(&["string power controller", "spc"]) {
        "String Power Controller"
    } else if has(&["network control unit", "ncu"]) {
        "Network Control Unit"
    } else if has(&["inverter", "inv "]) {
        "Inverter"
    } else if has(&["line break device", "lbd"]) {
        "Line Break Device"
    } else {
        "equipment"
    };

    let part = if has(&["mc4"]) {
        "MC4 connector"
    } else if has(&["contactor"]) {
        "DC Contactor"
    } else if has(&["board"]) {
        "control/communication board"
    } else if has(&["module"]) {
        "PV modules"
    } else {
        "component"
    };

    let process = if has(&["reconnect"]) {
        "reconnection"
    } else if has(&["replace", "swap"]) {
        "replacement"
    } else if has(&["claim", "warranty"]) {
        "warranty claim"
    } else if has(&["inspect", "troubleshoot"]) {
        "inspection/troubleshooting"
    } else {
        "action"
    };

    NotesContext {
        equipment,
        part,
        process,
    }
}

#[derive(Debug, Clone)]
pub struct HoldCase {
    pub label: &'static str,
    pub hold_reason_type: &'static str,
    pub hold_reason: String,
    pub work_order_id: String,
    pub work_order_type: String,
    pub work_order_description: String,
    pub plant: String,
    pub previous_logs: String,
}

/// Bad, average and good explanations for warranty, parts and other holds.
pub fn build_cases(work_order_id: &str, meta: &WorkOrderMeta, notes: &str) -> Vec<HoldCase> {
    let ctx = extract_context(notes);
    let (eqp, part, plant) = (ctx.equipment, ctx.part, meta.plant.as_str());

    let texts: [(&str, &str, String); 9] = [
        ("Bad", "Warranty", "Waiting for warranty claim".to_string()),
        (
            "Average",
            "Warranty",
            format!("Warranty claim submitted to OEM for {eqp} {part} ETA unknown."),
        ),
        (
            "Good",
            "Warranty",
            format!(
                "Warranty hold for {eqp} {part}. Claim submitted to OEM; \
                 awaiting approval and RMA shipment. ETA 3-5 business days."
            ),
        ),
        ("Bad", "Parts unavailable", "Waiting for Parts".to_string()),
        (
            "Average",
            "Parts unavailable",
            format!("Parts request submitted for {eqp}; supplier confirmation pending."),
        ),
        (
            "Good",
            "Parts unavailable",
            format!(
                "Parts hold: {part} for {eqp}. Item(s) listed on PO; supplier confirmed. \
                 ETA 2025-10-05. Work resumes after arrival."
            ),
        ),
        ("Bad", "Others", format!("Access/weather hold at {plant}")),
        (
            "Average",
            "Others",
            format!("Site access restricted at {plant}; awaiting clearance to resume work on {eqp}."),
        ),
        (
            "Good",
            "Others",
            format!(
                "Access hold at {plant} due to safety lockout. Work on {eqp} will resume after \
                 client safety inspection tomorrow 10:00 AM; ETA 2025-09-26 10:00 AM. \
                 Waiting for client approval."
            ),
        ),
    ];

    let work_order_type = Some(meta.wo_type.trim())
        .filter(|t| !t.is_empty())
        .unwrap_or("Corrective");
    texts
        .into_iter()
        .map(|(label, hold_reason_type, hold_reason)| HoldCase {
            label,
            hold_reason_type,
            hold_reason,
            work_order_id: work_order_id.to_string(),
            work_order_type: work_order_type.to_string(),
            work_order_description: meta.description.clone(),
            plant: meta.plant.clone(),
            previous_logs: format!("No previous logs for {work_order_id} at {plant}"),
        })
        .collect()
}

#[derive(Debug, Clone, Serialize)]
pub struct HoldTurnResult {
    pub id: String,
    pub turn: usize,
    pub label: String,
    pub work_order_id: String,
    pub hold_reason_type: String,
    pub input_hold_reason: String,
    pub work_order_type: String,
    pub work_order_description: String,
    pub plant: String,
    pub response_valid: Option<bool>,
    pub follow_up_question: String,
    pub error_message: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct HoldCaseSummary {
    pub case_id: usize,
    pub label: String,
    pub hold_reason_type: String,
    pub work_order_id: String,
    pub turns: usize,
    pub ended_valid: bool,
}

pub async fn run_case(
    service: &ServiceClient,
    grader: &Grader,
    case_id: usize,
    case: &HoldCase,
) -> Vec<HoldTurnResult> {
    let mut results = Vec::new();
    let mut messages = vec![Message::technician(case.hold_reason.clone())];
    let mut turn_input = case.hold_reason.clone();

    for turn in 1..=MAX_TURNS {
        let payload = json!({
            "hold_reason": case.hold_reason_type,
            "messages": messages,
            "work_order_type": case.work_order_type,
            "work_order_description": case.work_order_description,
            "plant": case.plant,
            "wo_status_and_notes_with_time_allocation_table": case.previous_logs,
        });
        let (valid, question, error) = match service.validate_reason_for_hold(&payload).await {
            Ok(verdict) => (Some(verdict.valid), verdict.follow_up(), String::new()),
            Err(e) => {
                warn!("Hold case {case_id} turn {turn}: {e:#}");
                (None, String::new(), e.to_string())
            }
        };

        results.push(HoldTurnResult {
            id: format!("{case_id}_{turn}"),
            turn,
            label: case.label.to_string(),
            work_order_id: case.work_order_id.clone(),
            hold_reason_type: case.hold_reason_type.to_string(),
            input_hold_reason: clean_text(&turn_input),
            work_order_type: case.work_order_type.clone(),
            work_order_description: case.work_order_description.clone(),
            plant: case.plant.clone(),
            response_valid: valid,
            follow_up_question: question.clone(),
            error_message: error,
        });

        if valid == Some(true) || question.is_empty() || turn == MAX_TURNS {
            break;
        }

        let answer = grader
            .technician_answer(
                HoldAnswerContext {
                    hold_reason: &case.hold_reason,
                    hold_reason_type: case.hold_reason_type,
                    work_order_description: &case.work_order_description,
                    plant: &case.plant,
                },
                &question,
            )
            .await;
        messages.push(Message::assistant(question));
        messages.push(Message::technician(answer.clone()));
        turn_input = answer;
    }
    results
}

pub fn summarize(results: &[HoldTurnResult]) -> Vec<HoldCaseSummary> {
    let mut order: Vec<usize> = Vec::new();
    let mut last: HashMap<usize, &HoldTurnResult> = HashMap::new();
    for r in results {
        let case_id = case_of(&r.id);
        if !last.contains_key(&case_id) {
            order.push(case_id);
        }
        last.insert(case_id, r);
    }
    order
        .into_iter()
        .filter_map(|case_id| last.get(&case_id).map(|r| (case_id, *r)))
        .map(|(case_id, r)| HoldCaseSummary {
            case_id,
            label: r.label.clone(),
            hold_reason_type: r.hold_reason_type.clone(),
            work_order_id: r.work_order_id.clone(),
            turns: r.turn,
            ended_valid: r.response_valid == Some(true),
        })
        .collect()
}

fn case_of(turn_id: &str) -> usize {
    turn_id
        .split('_')
        .next()
        .and_then(|id| id.parse().ok())
        .unwrap_or_default()
}

pub async fn run(service: &ServiceClient, grader: &Grader, cases: &[HoldCase]) -> Vec<HoldTurnResult> {
    let mut results = Vec::new();
    for (idx, case) in cases.iter().enumerate() {
        let turns = run_case(service, grader, idx + 1, case).await;
        info!(
            "Hold case {} ({} / {}): {} turn(s)",
            idx + 1,
            case.hold_reason_type,
            case.label,
            turns.len()
        );
        results.extend(turns);
    }
    results
}
