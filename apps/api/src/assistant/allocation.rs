//! Work status allocation: how a technician's time on one log entry splits
//! across work status types.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Shares at or below this percentage are ignored when building prompts.
pub const SIGNIFICANT_SHARE_PCT: f64 = 10.0;

/// Either a single status name (100% of the time) or a map of status name
/// to percentage. Percentages may also arrive as `{"percentage": 40}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum WorkStatusInput {
    Single(String),
    Allocation(BTreeMap<String, AllocationValue>),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AllocationValue {
    Percent(f64),
    Detailed { percentage: f64 },
}

impl AllocationValue {
    pub fn percentage(&self) -> f64 {
        match self {
            AllocationValue::Percent(p) => *p,
            AllocationValue::Detailed { percentage } => *percentage,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct StatusShare {
    pub status: String,
    pub percentage: f64,
}

impl WorkStatusInput {
    pub fn shares(&self) -> Vec<StatusShare> {
        match self {
            WorkStatusInput::Single(status) => vec![StatusShare {
                status: status.trim().to_string(),
                percentage: 100.0,
            }],
            WorkStatusInput::Allocation(map) => map
                .iter()
                .map(|(status, value)| StatusShare {
                    status: status.trim().to_string(),
                    percentage: value.percentage(),
                })
                .collect(),
        }
    }

    /// Shares above `SIGNIFICANT_SHARE_PCT`, in status-name order.
    pub fn significant_shares(&self) -> Vec<StatusShare> {
        self.shares()
            .into_iter()
            .filter(|s| s.percentage > SIGNIFICANT_SHARE_PCT)
            .collect()
    }

    /// Checks names and percentages. Returns a human-readable reason on failure.
    pub fn validate(&self) -> Result<(), String> {
        let shares = self.shares();
        if shares.is_empty() {
            return Err("work_status must name at least one status".to_string());
        }
        if shares.iter().any(|s| s.status.is_empty()) {
            return Err("work_status names cannot be empty".to_string());
        }
        if let Some(bad) = shares
            .iter()
            .find(|s| !s.percentage.is_finite() || !(0.0..=100.0).contains(&s.percentage))
        {
            return Err(format!(
                "percentage for '{}' must be between 0 and 100",
                bad.status
            ));
        }
        if self.significant_shares().is_empty() {
            return Err(format!(
                "work_status must allocate more than {SIGNIFICANT_SHARE_PCT}% to at least one status"
            ));
        }
        Ok(())
    }

    /// One `Status - N%` line per significant share.
    pub fn contribution_summary(&self) -> String {
        self.significant_shares()
            .iter()
            .map(|s| format!("{} - {}%", s.status, s.percentage))
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// The form stored in the `work_status` CSV column.
    pub fn to_storage_string(&self) -> String {
        match self {
            WorkStatusInput::Single(status) => status.trim().to_string(),
            WorkStatusInput::Allocation(_) => serde_json::to_string(self).unwrap_or_default(),
        }
    }

    /// Inverse of `to_storage_string`; anything that is not a JSON object
    /// is a single status name.
    pub fn from_storage_string(raw: &str) -> Self {
        let raw = raw.trim();
        if raw.starts_with('{') {
            if let Ok(parsed) = serde_json::from_str::<WorkStatusInput>(raw) {
                return parsed;
            }
        }
        WorkStatusInput::Single(raw.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(json: &str) -> WorkStatusInput {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn test_single_status_is_full_share() {
        let input = parse(r#""Troubleshooting""#);
        assert_eq!(
            input.shares(),
            vec![StatusShare {
                status: "Troubleshooting".to_string(),
                percentage: 100.0
            }]
        );
    }

    #[test]
    fn test_allocation_accepts_plain_and_detailed_values() {
        let input = parse(r#"{"Troubleshooting": 60, "Work": {"percentage": 40}}"#);
        let shares = input.shares();
        assert_eq!(shares.len(), 2);
        assert_eq!(shares[0].percentage, 60.0);
        assert_eq!(shares[1].percentage, 40.0);
    }

    #[test]
    fn test_small_shares_are_dropped() {
        let input = parse(r#"{"Delay": 10, "Work": 90}"#);
        let significant = input.significant_shares();
        assert_eq!(significant.len(), 1);
        assert_eq!(significant[0].status, "Work");
    }

    #[test]
    fn test_contribution_summary_lists_significant_shares() {
        let input = parse(r#"{"Training": 5, "Troubleshooting": 60, "Work": 35}"#);
        assert_eq!(
            input.contribution_summary(),
            "Troubleshooting - 60%\nWork - 35%"
        );
    }

    #[test]
    fn test_validate_rejects_all_insignificant() {
        let input = parse(r#"{"Delay": 5, "Work": 10}"#);
        assert!(input.validate().unwrap_err().contains("more than 10%"));
    }

    #[test]
    fn test_validate_rejects_out_of_range() {
        let input = parse(r#"{"Work": 140}"#);
        assert!(input.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_blank_name() {
        assert!(parse(r#""  ""#).validate().is_err());
    }

    #[test]
    fn test_storage_string_round_trip_for_allocation() {
        let input = parse(r#"{"Troubleshooting": 60, "Work": 40}"#);
        let stored = input.to_storage_string();
        assert_eq!(WorkStatusInput::from_storage_string(&stored), input);
    }

    #[test]
    fn test_storage_string_for_single_is_plain_name() {
        let input = parse(r#""Warranty_Support""#);
        assert_eq!(input.to_storage_string(), "Warranty_Support");
        assert_eq!(
            WorkStatusInput::from_storage_string("Warranty_Support"),
            input
        );
    }
}
