pub mod logs;
pub mod technician;
pub mod work_order;

use chrono::NaiveDate;
use serde::{Deserialize, Deserializer};

use crate::errors::AppError;

/// Timestamp format used in every `created_at` / `updated_at` column.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

pub fn now_timestamp() -> String {
    chrono::Utc::now().format(TIMESTAMP_FORMAT).to_string()
}

/// Work dates are always `YYYY-MM-DD`.
pub fn parse_work_date(raw: &str) -> Result<NaiveDate, AppError> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d")
        .map_err(|_| AppError::Validation("Invalid date format. Use YYYY-MM-DD".to_string()))
}

/// Accepts `true`/`false` in any case, `1`/`0`, `yes`/`no`, and blank as false.
/// Older rows carry capitalized `True`/`False`.
pub(crate) fn flexible_bool<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    match raw.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" => Ok(true),
        "false" | "0" | "no" | "" => Ok(false),
        other => Err(serde::de::Error::custom(format!(
            "invalid boolean value '{other}'"
        ))),
    }
}
