//! Bulk deletion of EBS snapshots selected by age and tags.

pub mod bulk;
pub mod clock;
pub mod config;
pub mod error;
pub mod filter;
pub mod gateway;
pub mod report;
pub mod snapshot;
pub mod tags;

pub use bulk::{BulkDelete, BulkDeleteConfig, Hooks, NoHooks};
pub use clock::{Clock, FixedClock, SystemClock};
pub use error::ConfigError;
pub use gateway::{AwsConfig, Ec2Gateway, SnapshotGateway};
pub use snapshot::{FailedSnapshot, Snapshot, Tag};
