use serde::{Deserialize, Serialize};

use crate::store::Record;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Technician {
    pub id: u64,
    pub tech_name: String,
    pub owner_id: String,
    pub email: String,
    pub phone: String,
    pub specialization: String,
    pub hire_date: String,
    pub status: String,
    pub created_at: String,
    pub updated_at: String,
}

impl Record for Technician {
    fn id(&self) -> u64 {
        self.id
    }
}

/// A selectable work status, e.g. `Troubleshooting` or `Warranty_Support`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkStatusType {
    pub status_type: String,
    pub description: String,
}
