//! Indexed record and thin-search result types.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::IndexTime;

/// A record as the index sees it: identity, path, visibility markers, and
/// the indexed fields. The full payload is only attached when a body
/// resolver runs over the chunk.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexedRecord {
    pub uuid: String,
    pub path: String,
    /// Absent for records whose ingest has not settled; a body resolver
    /// may backfill it from its `{uuid -> indexTime}` map.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub index_time: Option<IndexTime>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub last_modified: Option<DateTime<Utc>>,
    /// Whether this is the latest version at its path.
    #[serde(default = "default_current")]
    pub current: bool,
    #[serde(default)]
    pub deleted: bool,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub fields: BTreeMap<String, Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub payload: Option<String>,
}

fn default_current() -> bool {
    true
}

impl IndexedRecord {
    pub fn new(
        uuid: impl Into<String>,
        path: impl Into<String>,
        index_time: Option<IndexTime>,
    ) -> Self {
        Self {
            uuid: uuid.into(),
            path: path.into(),
            index_time,
            last_modified: None,
            current: true,
            deleted: false,
            fields: BTreeMap::new(),
            payload: None,
        }
    }

    pub fn with_field(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.fields.entry(name.into()).or_default().push(value.into());
        self
    }

    pub fn with_last_modified(mut self, at: DateTime<Utc>) -> Self {
        self.last_modified = Some(at);
        self
    }

    pub fn deleted(mut self) -> Self {
        self.deleted = true;
        self
    }
}

/// Result of a thin search: the total match count and the requested
/// result window. Probes consume `total` and at most one record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ThinResults {
    pub total: u64,
    pub records: Vec<IndexedRecord>,
}

impl ThinResults {
    pub fn empty() -> Self {
        Self {
            total: 0,
            records: Vec::new(),
        }
    }
}
