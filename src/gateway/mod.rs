//! The narrow cloud surface the engine depends on.

pub mod ec2;

use crate::snapshot::Snapshot;
use crate::tags::TagFilter;
use anyhow::Result;
use tokio_util::sync::CancellationToken;

pub use ec2::{AwsConfig, Ec2Gateway};

pub trait SnapshotGateway {
    /// List every snapshot matching `filters`, walking all pages before
    /// returning. Any page error fails the whole listing.
    fn list_snapshots(
        &mut self,
        cancel: &CancellationToken,
        filters: &[TagFilter],
    ) -> Result<Vec<Snapshot>>;

    /// Delete one snapshot by id.
    fn delete_snapshot(&mut self, cancel: &CancellationToken, snapshot_id: &str) -> Result<()>;
}
