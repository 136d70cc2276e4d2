use std::collections::HashSet;

use serde::Serialize;

use crate::models::work_order::WorkOrder;

/// Used when there is no comparable work order with recorded hours.
pub const DEFAULT_SUGGESTED_HOURS: f64 = 8.0;

/// Description words at or below this length are too generic to match on.
const MIN_KEYWORD_LEN: usize = 3;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TechnicianStatistics {
    pub technician_name: String,
    pub total_assigned: usize,
    pub total_hours: f64,
    pub corrective_work: usize,
}

pub fn technician_statistics(orders: &[WorkOrder], tech_name: &str) -> TechnicianStatistics {
    let mine: Vec<&WorkOrder> = orders.iter().filter(|wo| wo.tech_name == tech_name).collect();

    let total_assigned = mine
        .iter()
        .map(|wo| wo.work_order_id.as_str())
        .collect::<HashSet<_>>()
        .len();
    let total_hours: f64 = mine.iter().filter_map(|wo| wo.hours).sum();
    let corrective_work = mine
        .iter()
        .filter(|wo| wo.wo_type.trim().eq_ignore_ascii_case("corrective"))
        .count();

    TechnicianStatistics {
        technician_name: tech_name.to_string(),
        total_assigned,
        total_hours: round1(total_hours),
        corrective_work,
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SuggestedHours {
    pub work_order_id: String,
    pub wo_type: String,
    pub suggested_hours: f64,
    /// How many earlier work orders the suggestion averages over.
    pub sample_size: usize,
}

/// Average recorded hours of comparable work orders.
///
/// Candidates are rows with known hours, narrowed to `wo_type` when given.
/// If `description` has keywords (words longer than three characters) and
/// at least one candidate description contains one of them, only those
/// candidates count. The mean is rounded to one decimal.
pub fn suggested_labor_hours<'a, I>(
    candidates: I,
    wo_type: Option<&str>,
    description: Option<&str>,
) -> (f64, usize)
where
    I: IntoIterator<Item = &'a WorkOrder>,
{
    let mut pool: Vec<(&WorkOrder, f64)> = candidates
        .into_iter()
        .filter_map(|wo| wo.hours.map(|h| (wo, h)))
        .filter(|(wo, _)| wo_type.map_or(true, |t| wo.wo_type == t))
        .collect();

    let keywords: Vec<String> = description
        .unwrap_or_default()
        .split_whitespace()
        .filter(|w| w.chars().count() > MIN_KEYWORD_LEN)
        .map(str::to_lowercase)
        .collect();

    if !keywords.is_empty() {
        let similar: Vec<(&WorkOrder, f64)> = pool
            .iter()
            .copied()
            .filter(|(wo, _)| {
                let text = wo.description.to_lowercase();
                keywords.iter().any(|k| text.contains(k.as_str()))
            })
            .collect();
        if !similar.is_empty() {
            pool = similar;
        }
    }

    if pool.is_empty() {
        return (DEFAULT_SUGGESTED_HOURS, 0);
    }
    let mean = pool.iter().map(|(_, h)| h).sum::<f64>() / pool.len() as f64;
    (round1(mean), pool.len())
}

fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

#[cfg(test)]
mod tests {
    use super::*;

    fn wo(wo_id: &str, tech: &str, wo_type: &str, description: &str, hours: Option<f64>) -> WorkOrder {
        WorkOrder {
            work_order_id: wo_id.to_string(),
            tech_name: tech.to_string(),
            wo_type: wo_type.to_string(),
            description: description.to_string(),
            hours,
            ..Default::default()
        }
    }

    fn history() -> Vec<WorkOrder> {
        vec![
            wo("WO-1", "Jane", "Corrective", "Inverter 3 offline", Some(4.0)),
            wo("WO-1", "Jane", "Corrective", "Inverter 3 offline", Some(2.25)),
            wo("WO-2", "Jane", "Preventive", "Annual combiner inspection", Some(6.0)),
            wo("WO-3", "Sam", "Corrective", "Tracker motor fault", Some(3.0)),
            wo("WO-4", "Sam", "Corrective", "Inverter 7 offline", None),
        ]
    }

    #[test]
    fn test_statistics_count_distinct_orders() {
        let stats = technician_statistics(&history(), "Jane");
        assert_eq!(
            stats,
            TechnicianStatistics {
                technician_name: "Jane".to_string(),
                total_assigned: 2,
                total_hours: 12.3,
                corrective_work: 2,
            }
        );
    }

    #[test]
    fn test_statistics_for_unknown_tech_are_zero() {
        let stats = technician_statistics(&history(), "Nobody");
        assert_eq!(stats.total_assigned, 0);
        assert_eq!(stats.total_hours, 0.0);
    }

    #[test]
    fn test_suggestion_narrows_by_keyword() {
        let history = history();
        let (hours, n) =
            suggested_labor_hours(&history, Some("Corrective"), Some("Inverter 9 offline"));
        // WO-4 matches but has no hours.
        assert_eq!(n, 2);
        assert_eq!(hours, 3.1);
    }

    #[test]
    fn test_suggestion_keeps_type_pool_when_no_keyword_matches() {
        let history = history();
        let (hours, n) =
            suggested_labor_hours(&history, Some("Corrective"), Some("Fence repair needed"));
        assert_eq!(n, 3);
        assert_eq!(hours, 3.1);
    }

    #[test]
    fn test_short_words_are_not_keywords() {
        let history = history();
        let (_, n) = suggested_labor_hours(&history, None, Some("fix the box"));
        assert_eq!(n, 4);
    }

    #[test]
    fn test_suggestion_defaults_when_nothing_matches_type() {
        let history = history();
        let (hours, n) = suggested_labor_hours(&history, Some("Project"), None);
        assert_eq!((hours, n), (DEFAULT_SUGGESTED_HOURS, 0));
    }
}
