use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A row of the `entries` table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Entry {
    /// Assigned by the database when the entry is flushed; `None` until then.
    pub id: Option<i64>,
    pub description: String,
    pub created_at: DateTime<Utc>,
}

impl Entry {
    pub fn new(description: impl Into<String>) -> Self {
        Entry {
            id: None,
            description: description.into(),
            created_at: Utc::now(),
        }
    }
}
