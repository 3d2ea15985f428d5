use chrono::{DateTime, Utc};
use serde::Serialize;

/// A stored blob and the time it was last written.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct KvEntry {
    pub key: String,
    pub value: String,
    pub updated_at: DateTime<Utc>,
}
