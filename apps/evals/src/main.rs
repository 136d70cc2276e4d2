mod batch;
mod config;
mod dataset;
mod grader;
mod hold_reason;
mod service;
mod work_log;

use std::collections::{BTreeSet, HashMap};
use std::env;
use std::path::Path;
use std::process::ExitCode;

use anyhow::Result;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::batch::{CompletionNoteRow, SummaryOutput};
use crate::config::EvalConfig;
use crate::dataset::{group_by_conversation, load_work_orders, read_rows, write_rows, DatasetRow};
use crate::grader::Grader;
use crate::service::ServiceClient;

const DATASET: &str = "test_data.csv";
const SUMMARY_OUTPUT: &str = "test_summary_output.csv";
const COMPLETION_NOTES: &str = "test_completion_notes.csv";

const USAGE: &str = "usage: field-services-evals <command>

commands:
  work-log        replay labeled work-log conversations and grade the follow-ups
  hold-reason     run simulated hold conversations for every dataset work order
  client-summary  convert every dataset conversation to a client summary
  car             build CAR reports from client summaries and completion notes";

/// Outcome of a command that ran to completion.
enum Outcome {
    Passed,
    Failures(usize),
}

#[tokio::main]
async fn main() -> ExitCode {
    let cmd = env::args().nth(1).unwrap_or_else(|| "help".to_string());
    if matches!(cmd.as_str(), "help" | "-h" | "--help") {
        println!("{USAGE}");
        return ExitCode::SUCCESS;
    }

    let config = match EvalConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("{e:#}");
            return ExitCode::FAILURE;
        }
    };

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!("{}={}", env!("CARGO_CRATE_NAME"), &config.rust_log))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let outcome = match cmd.as_str() {
        "work-log" => run_work_log(&config).await,
        "hold-reason" => run_hold_reason(&config).await,
        "client-summary" => run_client_summary(&config).await,
        "car" => run_car(&config).await,
        other => {
            eprintln!("unknown command: {other}\n\n{USAGE}");
            return ExitCode::FAILURE;
        }
    };

    match outcome {
        Ok(Outcome::Passed) => ExitCode::SUCCESS,
        Ok(Outcome::Failures(count)) => {
            error!("{count} row(s) failed");
            ExitCode::from(2)
        }
        Err(e) => {
            error!("{e:#}");
            ExitCode::FAILURE
        }
    }
}

async fn run_work_log(config: &EvalConfig) -> Result<Outcome> {
    let service = ServiceClient::new(&config.api_url)?;
    let grader = Grader::new(config.anthropic_api_key.clone())?;
    let rows: Vec<DatasetRow> = read_rows(&config.eval_dir.join(DATASET))?;
    let work_orders = load_work_orders(&config.data_dir.join("work_orders.csv"))?;
    let conversations = group_by_conversation(rows);
    info!(
        "Replaying {} conversation(s) against {}",
        conversations.len(),
        config.api_url
    );

    let results = work_log::run(&service, &grader, &conversations, &work_orders).await;
    write_rows(&config.eval_dir.join("evals_results.csv"), &results)?;
    write_rows(
        &config.eval_dir.join("evals_results_summary.csv"),
        &work_log::summarize(&results),
    )?;

    let failed = results.iter().filter(|r| !r.pass).count();
    info!("{}/{} turns passed", results.len() - failed, results.len());
    Ok(if failed == 0 {
        Outcome::Passed
    } else {
        Outcome::Failures(failed)
    })
}

async fn run_hold_reason(config: &EvalConfig) -> Result<Outcome> {
    let service = ServiceClient::new(&config.api_url)?;
    let grader = Grader::new(config.anthropic_api_key.clone())?;
    let rows: Vec<DatasetRow> = read_rows(&config.eval_dir.join(DATASET))?;
    let work_orders = load_work_orders(&config.data_dir.join("work_orders.csv"))?;
    let notes = longest_notes(&config.eval_dir.join(SUMMARY_OUTPUT))?;

    let targets: BTreeSet<&str> = rows.iter().map(DatasetRow::work_order_id).collect();
    let mut cases = Vec::new();
    for work_order_id in targets {
        let Some(meta) = work_orders.get(work_order_id) else {
            info!("{work_order_id} not in work_orders.csv, skipping");
            continue;
        };
        let earlier = notes.get(work_order_id).map(String::as_str).unwrap_or_default();
        cases.extend(hold_reason::build_cases(work_order_id, meta, earlier));
    }
    info!("Running {} hold case(s)", cases.len());

    let results = hold_reason::run(&service, &grader, &cases).await;
    write_rows(&config.eval_dir.join("hold_reason_test_data.csv"), &results)?;
    write_rows(
        &config.eval_dir.join("hold_reason_summary.csv"),
        &hold_reason::summarize(&results),
    )?;
    Ok(Outcome::Passed)
}

/// Longest `summary. notes` text per work order from an earlier
/// client-summary run. A missing file gives no notes.
fn longest_notes(path: &Path) -> Result<HashMap<String, String>> {
    let mut by_order: HashMap<String, String> = HashMap::new();
    if !path.exists() {
        return Ok(by_order);
    }
    for row in read_rows::<SummaryOutput>(path)? {
        let text = format!("{}. {}", row.summary.trim(), row.notes.trim());
        let entry = by_order.entry(row.work_order_id).or_default();
        if text.len() > entry.len() {
            *entry = text;
        }
    }
    Ok(by_order)
}

async fn run_client_summary(config: &EvalConfig) -> Result<Outcome> {
    let service = ServiceClient::new(&config.api_url)?;
    let rows: Vec<DatasetRow> = read_rows(&config.eval_dir.join(DATASET))?;
    let work_orders = load_work_orders(&config.data_dir.join("work_orders.csv"))?;
    let conversations = group_by_conversation(rows);

    let outputs = batch::run_client_summaries(&service, &conversations, &work_orders).await;
    write_rows(&config.eval_dir.join(SUMMARY_OUTPUT), &outputs)?;
    let failed = outputs.iter().filter(|o| !o.success).count();
    info!("{}/{} summaries generated", outputs.len() - failed, outputs.len());
    Ok(Outcome::Passed)
}

async fn run_car(config: &EvalConfig) -> Result<Outcome> {
    let service = ServiceClient::new(&config.api_url)?;
    let summaries: Vec<SummaryOutput> = read_rows(&config.eval_dir.join(SUMMARY_OUTPUT))?;
    let completions: Vec<CompletionNoteRow> =
        read_rows(&config.eval_dir.join(COMPLETION_NOTES))?;
    let dataset: Vec<DatasetRow> = read_rows(&config.eval_dir.join(DATASET))?;

    let outputs = batch::run_car(&service, &summaries, &completions, &dataset).await;
    write_rows(&config.eval_dir.join("CAR_completion.csv"), &outputs)?;
    let failed = outputs.iter().filter(|o| !o.success).count();
    info!("{}/{} CAR reports generated", outputs.len() - failed, outputs.len());
    Ok(Outcome::Passed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_longest_notes_per_work_order() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join(SUMMARY_OUTPUT);
        let rows = [
            SummaryOutput {
                work_order_id: "WO-1".to_string(),
                summary: "Short".to_string(),
                notes: "n".to_string(),
                ..Default::default()
            },
            SummaryOutput {
                work_order_id: "WO-1".to_string(),
                summary: "Inverter 3 reset".to_string(),
                notes: "NCU board swapped".to_string(),
                ..Default::default()
            },
        ];
        write_rows(&path, &rows).unwrap();

        let notes = longest_notes(&path).unwrap();
        assert_eq!(notes["WO-1"], "Inverter 3 reset. NCU board swapped");
        assert!(longest_notes(&dir.path().join("missing.csv"))
            .unwrap()
            .is_empty());
    }
}
