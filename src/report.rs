//! Plan and result tables.
//!
//! Columns follow a fixed property order; the caller picks which ones to
//! show and which tag keys the Tags column lists.

use crate::snapshot::{FailedSnapshot, Snapshot};
use chrono::SecondsFormat;
use clap::ValueEnum;
use std::collections::{BTreeMap, BTreeSet};

const COLUMN_PADDING: usize = 4;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, ValueEnum)]
pub enum Property {
    #[value(name = "Description")]
    Description,
    #[value(name = "Encrypted")]
    Encrypted,
    #[value(name = "OwnerAlias")]
    OwnerAlias,
    #[value(name = "OwnerId")]
    OwnerId,
    #[value(name = "Progress")]
    Progress,
    #[value(name = "SnapshotId")]
    SnapshotId,
    #[value(name = "StartTime")]
    StartTime,
    #[value(name = "State")]
    State,
    #[value(name = "StorageTier")]
    StorageTier,
    #[value(name = "VolumeId")]
    VolumeId,
    #[value(name = "VolumeSize")]
    VolumeSize,
    #[value(name = "Tags")]
    Tags,
}

impl Property {
    pub fn parse(name: &str) -> anyhow::Result<Self> {
        Property::from_str(name.trim(), false)
            .map_err(|_| anyhow::anyhow!("Unknown snapshot property: {}", name))
    }

    fn header(self) -> &'static str {
        match self {
            Property::Description => "Description",
            Property::Encrypted => "Encrypted",
            Property::OwnerAlias => "OwnerAlias",
            Property::OwnerId => "OwnerId",
            Property::Progress => "Progress",
            Property::SnapshotId => "SnapshotId",
            Property::StartTime => "StartTime",
            Property::State => "State",
            Property::StorageTier => "StorageTier",
            Property::VolumeId => "VolumeId",
            Property::VolumeSize => "VolumeSize",
            Property::Tags => "Tags",
        }
    }
}

/// Which properties and tag keys to print.
#[derive(Debug, Clone)]
pub struct Columns {
    properties: BTreeSet<Property>,
    tag_keys: BTreeSet<String>,
}

impl Columns {
    /// No properties means all of them; no tag keys means every tag.
    pub fn new(properties: &[Property], tag_keys: &[String]) -> Self {
        let properties = if properties.is_empty() {
            Property::value_variants().iter().copied().collect()
        } else {
            properties.iter().copied().collect()
        };
        Columns {
            properties,
            tag_keys: tag_keys.iter().map(|k| k.trim().to_string()).collect(),
        }
    }

    fn header(&self) -> Vec<String> {
        self.properties.iter().map(|p| p.header().to_string()).collect()
    }

    fn row(&self, snapshot: &Snapshot) -> Vec<String> {
        self.properties
            .iter()
            .map(|p| self.cell(*p, snapshot))
            .collect()
    }

    fn cell(&self, property: Property, snapshot: &Snapshot) -> String {
        let text = |v: &Option<String>| v.clone().unwrap_or_default();
        match property {
            Property::Description => text(&snapshot.description),
            Property::Encrypted => snapshot.encrypted.to_string(),
            Property::OwnerAlias => text(&snapshot.owner_alias),
            Property::OwnerId => text(&snapshot.owner_id),
            Property::Progress => text(&snapshot.progress),
            Property::SnapshotId => snapshot.id.clone(),
            Property::StartTime => snapshot
                .start_time
                .to_rfc3339_opts(SecondsFormat::Secs, true),
            Property::State => text(&snapshot.state),
            Property::StorageTier => text(&snapshot.storage_tier),
            Property::VolumeId => text(&snapshot.volume_id),
            Property::VolumeSize => snapshot
                .volume_size
                .map(|s| s.to_string())
                .unwrap_or_default(),
            Property::Tags => self.tags_cell(snapshot),
        }
    }

    fn tags_cell(&self, snapshot: &Snapshot) -> String {
        let shown: BTreeMap<&str, &str> = snapshot
            .tags
            .iter()
            .filter(|t| self.tag_keys.is_empty() || self.tag_keys.contains(&t.key))
            .map(|t| (t.key.as_str(), t.value.as_str()))
            .collect();
        shown
            .iter()
            .map(|(k, v)| format!("\"{k}\":\"{v}\""))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

pub fn render_plan(snapshots: &[Snapshot], columns: &Columns) -> String {
    let mut rows = vec![columns.header()];
    rows.extend(snapshots.iter().map(|s| columns.row(s)));

    let mut output = render_table(&rows);
    output.push_str(&format!("\nPlan: {} to delete.\n\n", snapshots.len()));
    output
}

pub fn render_result(successful: &[Snapshot], failed: &[FailedSnapshot], columns: &Columns) -> String {
    let mut header = vec!["Result".to_string()];
    header.extend(columns.header());
    header.push("error".to_string());
    let mut rows = vec![header];

    for snapshot in successful {
        let mut row = vec!["successful".to_string()];
        row.extend(columns.row(snapshot));
        row.push("-".to_string());
        rows.push(row);
    }
    for failure in failed {
        let mut row = vec!["failed".to_string()];
        row.extend(columns.row(&failure.snapshot));
        row.push(format!("{:#}", failure.error));
        rows.push(row);
    }

    let mut output = render_table(&rows);
    output.push_str(&format!(
        "\nResult: {} to successful, {} to failed.\n\n",
        successful.len(),
        failed.len()
    ));
    output
}

/// Left-aligned columns, each padded to its widest cell.
fn render_table(rows: &[Vec<String>]) -> String {
    let mut widths: Vec<usize> = Vec::new();
    for row in rows {
        for (i, cell) in row.iter().enumerate() {
            let len = cell.chars().count();
            match widths.get_mut(i) {
                Some(width) => *width = (*width).max(len),
                None => widths.push(len),
            }
        }
    }

    let mut output = String::new();
    for row in rows {
        let mut line = String::new();
        for (cell, width) in row.iter().zip(&widths) {
            line.push_str(&format!("{:<w$}", cell, w = width + COLUMN_PADDING));
        }
        output.push_str(line.trim_end());
        output.push('\n');
    }
    output
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn snapshot(id: &str) -> Snapshot {
        Snapshot::new(id, Utc.with_ymd_and_hms(2024, 1, 2, 3, 4, 5).unwrap())
            .with_tag("Name", "foo")
            .with_tag("Env", "qa")
    }

    #[test]
    fn empty_selection_means_every_property() {
        let columns = Columns::new(&[], &[]);
        assert_eq!(columns.header().len(), Property::value_variants().len());
        assert_eq!(columns.header()[0], "Description");
        assert_eq!(columns.header()[11], "Tags");
    }

    #[test]
    fn selected_properties_keep_fixed_order() {
        let columns = Columns::new(&[Property::StartTime, Property::SnapshotId], &[]);
        assert_eq!(columns.header(), vec!["SnapshotId", "StartTime"]);
        assert_eq!(
            columns.row(&snapshot("snap-1")),
            vec!["snap-1", "2024-01-02T03:04:05Z"]
        );
    }

    #[test]
    fn tags_cell_sorted_and_limited() {
        let all = Columns::new(&[Property::Tags], &[]);
        assert_eq!(all.row(&snapshot("s")), vec![r#""Env":"qa" "Name":"foo""#]);

        let named = Columns::new(&[Property::Tags], &[" Name ".to_string()]);
        assert_eq!(named.row(&snapshot("s")), vec![r#""Name":"foo""#]);
    }

    #[test]
    fn plan_table_is_aligned() {
        let columns = Columns::new(&[Property::SnapshotId, Property::Encrypted], &[]);
        let output = render_plan(&[snapshot("snap-1")], &columns);
        assert_eq!(
            output,
            "Encrypted    SnapshotId\nfalse        snap-1\n\nPlan: 1 to delete.\n\n"
        );
    }

    #[test]
    fn result_table_lists_failures_last() {
        let columns = Columns::new(&[Property::SnapshotId], &[]);
        let failed = vec![FailedSnapshot {
            snapshot: snapshot("snap-2"),
            error: anyhow::anyhow!("denied"),
        }];
        let output = render_result(&[snapshot("snap-1")], &failed, &columns);
        let lines: Vec<&str> = output.lines().collect();
        assert_eq!(lines[0], "Result        SnapshotId    error");
        assert_eq!(lines[1], "successful    snap-1        -");
        assert_eq!(lines[2], "failed        snap-2        denied");
        assert!(output.ends_with("Result: 1 to successful, 1 to failed.\n\n"));
    }

    #[test]
    fn parses_property_names() {
        assert_eq!(Property::parse(" VolumeId ").unwrap(), Property::VolumeId);
        assert!(Property::parse("Size").is_err());
    }
}
