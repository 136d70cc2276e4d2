use serde::{Deserialize, Serialize};

use crate::models::flexible_bool;
use crate::store::Record;

/// One time entry logged by a technician against a work order.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkStatusLog {
    pub id: u64,
    pub tech_name: String,
    pub work_date: String,
    /// Single status name, or a JSON object of status name to percentage.
    pub work_status: String,
    pub start_time: String,
    pub end_time: String,
    #[serde(deserialize_with = "csv::invalid_option")]
    pub time_spent: Option<f64>,
    pub notes: String,
    pub summary: String,
    pub work_order_id: String,
    #[serde(deserialize_with = "flexible_bool")]
    pub complete_flag: bool,
    pub created_at: String,
    pub updated_at: String,
}

impl Record for WorkStatusLog {
    fn id(&self) -> u64 {
        self.id
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CompletionNote {
    pub id: u64,
    pub work_order_id: String,
    pub tech_name: String,
    pub work_date: String,
    pub completion_notes: String,
    pub cause: String,
    pub action: String,
    pub result: String,
    pub wo_type: String,
    pub plant: String,
    pub created_at: String,
}

impl Record for CompletionNote {
    fn id(&self) -> u64 {
        self.id
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct HoldNote {
    pub id: u64,
    pub work_order_id: String,
    pub tech_name: String,
    pub hold_reason: String,
    pub notes: String,
    pub created_at: String,
}

impl Record for HoldNote {
    fn id(&self) -> u64 {
        self.id
    }
}

/// A saved technician/assistant conversation. `conversation` is a JSON
/// object mapping each speaker to the messages they sent, in order.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ChatTranscript {
    pub id: u64,
    pub conversation_id: String,
    pub work_order_id: String,
    pub work_status: String,
    pub conversation: String,
    pub created_at: String,
}

impl Record for ChatTranscript {
    fn id(&self) -> u64 {
        self.id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_log_reads_capitalized_flags() {
        let data = "\
id,tech_name,work_date,work_status,time_spent,notes,work_order_id,complete_flag
4,Jane Doe,2024-03-27,Troubleshooting,2.5,Checked inverter,WO-100,True
5,Jane Doe,2024-03-28,Work,,Replaced fuse,WO-100,
";
        let mut reader = csv::Reader::from_reader(data.as_bytes());
        let rows: Vec<WorkStatusLog> = reader.deserialize().collect::<Result<_, _>>().unwrap();

        assert_eq!(rows.len(), 2);
        assert!(rows[0].complete_flag);
        assert_eq!(rows[0].time_spent, Some(2.5));
        assert!(!rows[1].complete_flag);
        assert_eq!(rows[1].time_spent, None);
        // Columns absent from the file fall back to defaults.
        assert_eq!(rows[1].summary, "");
    }

    #[test]
    fn test_status_log_rejects_garbage_flag() {
        let data = "id,complete_flag\n1,maybe\n";
        let mut reader = csv::Reader::from_reader(data.as_bytes());
        let result: Result<Vec<WorkStatusLog>, _> = reader.deserialize().collect();
        assert!(result.is_err());
    }
}
