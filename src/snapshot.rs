//! Snapshot records as returned by the listing API.
//!
//! Records are read-only views: the engine filters, orders and deletes
//! them but never mutates one.

use chrono::{DateTime, Utc};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tag {
    pub key: String,
    pub value: String,
}

impl Tag {
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Tag {
            key: key.into(),
            value: value.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Snapshot {
    pub id: String,
    pub description: Option<String>,
    pub start_time: DateTime<Utc>,
    /// Size of the source volume in GiB.
    pub volume_size: Option<i32>,
    pub encrypted: bool,
    pub owner_id: Option<String>,
    pub owner_alias: Option<String>,
    pub progress: Option<String>,
    pub state: Option<String>,
    pub storage_tier: Option<String>,
    pub volume_id: Option<String>,
    pub tags: Vec<Tag>,
}

impl Snapshot {
    pub fn new(id: impl Into<String>, start_time: DateTime<Utc>) -> Self {
        Snapshot {
            id: id.into(),
            start_time,
            ..Default::default()
        }
    }

    pub fn with_tag(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.tags.push(Tag::new(key, value));
        self
    }
}

/// A snapshot whose delete call failed, paired with the cause.
#[derive(Debug)]
pub struct FailedSnapshot {
    pub snapshot: Snapshot,
    pub error: anyhow::Error,
}
