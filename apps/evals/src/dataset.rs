//! Labeled conversation datasets and the CSV files the runs write.

use std::collections::HashMap;
use std::fs::File;
use std::path::Path;

use anyhow::{Context, Result};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::{json, Map, Value};

/// One technician turn from `test_data.csv`. Rows sharing a
/// `conversation_id` form one thread, in file order.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct DatasetRow {
    pub id: String,
    pub conversation_id: String,
    #[serde(rename = "Tech Notes Type", alias = "tech_note_type")]
    pub tech_notes_type: String,
    #[serde(rename = "Work order")]
    pub work_order: String,
    #[serde(rename = "Tech_name")]
    pub tech_name: String,
    #[serde(rename = "WO_Type")]
    pub wo_type: String,
    #[serde(rename = "WO_Describtion")]
    pub wo_description: String,
    #[serde(rename = "Work_pct")]
    pub work_pct: String,
    #[serde(rename = "Answer")]
    pub answer: String,
    /// `success`, `failure`, or the follow-up question the assistant should
    /// have asked after this turn.
    #[serde(rename = "Follow up question")]
    pub follow_up_label: String,
}

impl DatasetRow {
    pub fn work_order_id(&self) -> &str {
        self.work_order.trim().trim_matches('"')
    }
}

/// The columns of the service's `work_orders.csv` the runs need.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct WorkOrderMeta {
    pub work_order_id: String,
    pub tech_name: String,
    pub wo_type: String,
    pub plant: String,
    pub description: String,
}

pub fn read_rows<T: DeserializeOwned>(path: &Path) -> Result<Vec<T>> {
    let file = File::open(path).with_context(|| format!("Dataset not found at {}", path.display()))?;
    let mut reader = csv::Reader::from_reader(file);
    let mut rows = Vec::new();
    for row in reader.deserialize() {
        rows.push(row.with_context(|| format!("Bad row in {}", path.display()))?);
    }
    Ok(rows)
}

pub fn write_rows<T: Serialize>(path: &Path, rows: &[T]) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create {}", parent.display()))?;
    }
    let mut writer =
        csv::Writer::from_path(path).with_context(|| format!("Failed to write {}", path.display()))?;
    for row in rows {
        writer.serialize(row)?;
    }
    writer.flush()?;
    Ok(())
}

/// Work orders by id. A missing table is an empty index.
pub fn load_work_orders(path: &Path) -> Result<HashMap<String, WorkOrderMeta>> {
    if !path.exists() {
        return Ok(HashMap::new());
    }
    Ok(read_rows::<WorkOrderMeta>(path)?
        .into_iter()
        .map(|wo| (wo.work_order_id.clone(), wo))
        .collect())
}

/// Groups rows by `conversation_id`, keeping the order in which each
/// conversation first appears and the row order inside it.
pub fn group_by_conversation(rows: Vec<DatasetRow>) -> Vec<(String, Vec<DatasetRow>)> {
    let mut groups: Vec<(String, Vec<DatasetRow>)> = Vec::new();
    for row in rows {
        match groups.iter_mut().find(|(id, _)| *id == row.conversation_id) {
            Some((_, group)) => group.push(row),
            None => groups.push((row.conversation_id.clone(), vec![row])),
        }
    }
    groups
}

/// Parses `{Trouble shooting: 50%, Repair Work: 50%}` into the allocation
/// object the service accepts. `None` when nothing parses.
pub fn parse_work_pct(raw: &str) -> Option<Value> {
    let inner = raw.trim();
    let inner = inner
        .strip_prefix('{')
        .and_then(|s| s.strip_suffix('}'))
        .unwrap_or(inner);

    let mut allocation = Map::new();
    for part in inner.split(',') {
        let Some((label, value)) = part.split_once(':') else {
            continue;
        };
        let label = label.trim();
        let value = value.trim().trim_end_matches(['%', ' ']);
        let Ok(pct) = value.parse::<f64>() else {
            continue;
        };
        if !label.is_empty() {
            allocation.insert(label.to_string(), json!({ "percentage": pct.trunc() as i64 }));
        }
    }
    (!allocation.is_empty()).then_some(Value::Object(allocation))
}

/// Flattens text for a single CSV cell.
pub fn clean_text(text: &str) -> String {
    text.replace('\n', " ").replace('"', "'").trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn row(conversation_id: &str, answer: &str) -> DatasetRow {
        DatasetRow {
            conversation_id: conversation_id.to_string(),
            answer: answer.to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn test_grouping_keeps_first_appearance_order() {
        let groups = group_by_conversation(vec![
            row("2", "a"),
            row("1", "b"),
            row("2", "c"),
        ]);
        let ids: Vec<&str> = groups.iter().map(|(id, _)| id.as_str()).collect();
        assert_eq!(ids, vec!["2", "1"]);
        let answers: Vec<&str> = groups[0].1.iter().map(|r| r.answer.as_str()).collect();
        assert_eq!(answers, vec!["a", "c"]);
    }

    #[test]
    fn test_parse_work_pct() {
        let parsed = parse_work_pct("{Trouble shooting: 50%, Repair Work: 50.5 %}").unwrap();
        assert_eq!(parsed["Trouble shooting"]["percentage"], 50);
        assert_eq!(parsed["Repair Work"]["percentage"], 50);
    }

    #[test]
    fn test_parse_work_pct_rejects_garbage() {
        assert!(parse_work_pct("").is_none());
        assert!(parse_work_pct("{}").is_none());
        assert!(parse_work_pct("{Work: lots}").is_none());
    }

    #[test]
    fn test_dataset_headers_map_to_fields() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("test_data.csv");
        std::fs::write(
            &path,
            "id,conversation_id,Tech Notes Type,Work order,Tech_name,WO_Type,WO_Describtion,Work_pct,Answer,Follow up question\n\
             1,7,Bad,\"\"\"WO-1\"\"\",Jane,Corrective,Inverter down,{Work: 100%},Reset it,Which inverter?\n",
        )
        .unwrap();
        let rows: Vec<DatasetRow> = read_rows(&path).unwrap();
        assert_eq!(rows[0].work_order_id(), "WO-1");
        assert_eq!(rows[0].tech_notes_type, "Bad");
        assert_eq!(rows[0].follow_up_label, "Which inverter?");
    }

    #[test]
    fn test_missing_work_order_table_is_empty() {
        let dir = TempDir::new().unwrap();
        let index = load_work_orders(&dir.path().join("work_orders.csv")).unwrap();
        assert!(index.is_empty());
    }
}
