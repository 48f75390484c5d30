//! Bulk-delete engine.
//!
//! A run goes list -> filter -> sort -> (plan stop | delete) and reports its
//! progress only through [`Hooks`]. Any hook error aborts the run with that
//! error. Deletions already made are never undone.

use crate::clock::{Clock, SystemClock};
use crate::error::ConfigError;
use crate::filter;
use crate::gateway::{AwsConfig, Ec2Gateway, SnapshotGateway};
use crate::snapshot::{FailedSnapshot, Snapshot};
use crate::tags::{self, TagFilters};
use anyhow::Result;
use tokio_util::sync::CancellationToken;

/// Inputs for one bulk-delete run.
#[derive(Debug, Clone, Default)]
pub struct BulkDeleteConfig {
    pub aws: AwsConfig,
    /// Dry run: select and report, never delete.
    pub plan: bool,
    /// Retention period in days; `0` disables the age criterion.
    pub age: u32,
    /// Raw `key=value` tag filters.
    pub tags: Vec<String>,
}

impl BulkDeleteConfig {
    fn has_age_or_tags(&self) -> bool {
        self.age > 0 || !self.tags.is_empty()
    }
}

/// Observer for the stages of a run. Every method defaults to a no-op.
#[allow(unused_variables)]
pub trait Hooks {
    fn before_list(&mut self) -> Result<()> {
        Ok(())
    }

    /// Receives the filtered, sorted selection. Called in plan mode too.
    fn after_list(&mut self, snapshots: &[Snapshot]) -> Result<()> {
        Ok(())
    }

    fn before_delete(&mut self, snapshots: &[Snapshot]) -> Result<()> {
        Ok(())
    }

    /// Called after each successful delete. An error here stops the loop;
    /// the snapshot just deleted stays recorded as successful.
    fn snapshot_deleted(&mut self, snapshot: &Snapshot) -> Result<()> {
        Ok(())
    }

    fn after_delete(&mut self, successful: &[Snapshot], failed: &[FailedSnapshot]) -> Result<()> {
        Ok(())
    }
}

/// Hooks that observe nothing.
pub struct NoHooks;

impl Hooks for NoHooks {}

pub struct BulkDelete<G> {
    age: u32,
    tags: TagFilters,
    plan: bool,
    gateway: G,
    clock: Box<dyn Clock>,
}

impl BulkDelete<Ec2Gateway> {
    /// Validate `config` and connect to EC2.
    pub fn new(config: &BulkDeleteConfig) -> Result<Self> {
        let tags = validate(config)?;
        let gateway = Ec2Gateway::new(&config.aws)?;
        Ok(Self::assemble(config, tags, gateway))
    }
}

impl<G: SnapshotGateway> BulkDelete<G> {
    /// Validate `config` and run against an existing gateway.
    pub fn with_gateway(config: &BulkDeleteConfig, gateway: G) -> Result<Self> {
        let tags = validate(config)?;
        Ok(Self::assemble(config, tags, gateway))
    }

    fn assemble(config: &BulkDeleteConfig, tags: TagFilters, gateway: G) -> Self {
        BulkDelete {
            age: config.age,
            tags,
            plan: config.plan,
            gateway,
            clock: Box::new(SystemClock),
        }
    }

    pub fn with_clock(mut self, clock: impl Clock + 'static) -> Self {
        self.clock = Box::new(clock);
        self
    }

    pub fn age(&self) -> u32 {
        self.age
    }

    pub fn tags(&self) -> &TagFilters {
        &self.tags
    }

    pub fn is_plan(&self) -> bool {
        self.plan
    }

    pub fn gateway(&self) -> &G {
        &self.gateway
    }

    pub fn run(&mut self, cancel: &CancellationToken) -> Result<()> {
        self.run_with_hooks(cancel, &mut NoHooks)
    }

    pub fn run_with_hooks(&mut self, cancel: &CancellationToken, hooks: &mut dyn Hooks) -> Result<()> {
        let now = self.clock.now();

        hooks.before_list()?;
        let listed = self
            .gateway
            .list_snapshots(cancel, &tags::to_filters(&self.tags))?;
        let snapshots = filter::select(listed, now, self.age, &self.tags);
        hooks.after_list(&snapshots)?;

        if self.plan {
            return Ok(());
        }

        hooks.before_delete(&snapshots)?;
        let (successful, failed) = self.delete_all(cancel, snapshots, hooks)?;
        hooks.after_delete(&successful, &failed)
    }

    fn delete_all(
        &mut self,
        cancel: &CancellationToken,
        snapshots: Vec<Snapshot>,
        hooks: &mut dyn Hooks,
    ) -> Result<(Vec<Snapshot>, Vec<FailedSnapshot>)> {
        let mut successful = Vec::new();
        let mut failed = Vec::new();
        for snapshot in snapshots {
            if let Err(error) = self.gateway.delete_snapshot(cancel, &snapshot.id) {
                failed.push(FailedSnapshot { snapshot, error });
                continue;
            }
            successful.push(snapshot);
            hooks.snapshot_deleted(&successful[successful.len() - 1])?;
        }
        Ok((successful, failed))
    }
}

fn validate(config: &BulkDeleteConfig) -> Result<TagFilters, ConfigError> {
    if !config.has_age_or_tags() {
        return Err(ConfigError::MissingCriteria);
    }
    tags::parse_tags(&config.tags)
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Unreachable;

    impl SnapshotGateway for Unreachable {
        fn list_snapshots(&mut self, _: &CancellationToken, _: &[tags::TagFilter]) -> Result<Vec<Snapshot>> {
            anyhow::bail!("not expected")
        }

        fn delete_snapshot(&mut self, _: &CancellationToken, _: &str) -> Result<()> {
            anyhow::bail!("not expected")
        }
    }

    fn config(age: u32, tags: &[&str], plan: bool) -> BulkDeleteConfig {
        BulkDeleteConfig {
            age,
            tags: tags.iter().map(|t| t.to_string()).collect(),
            plan,
            ..Default::default()
        }
    }

    fn config_error(config: &BulkDeleteConfig) -> ConfigError {
        let err = BulkDelete::with_gateway(config, Unreachable).err().unwrap();
        err.downcast::<ConfigError>().unwrap()
    }

    #[test]
    fn needs_age_or_tags() {
        assert!(config(10, &[], false).has_age_or_tags());
        assert!(config(0, &["Name=foo"], false).has_age_or_tags());
        assert!(config(10, &["Name=foo"], false).has_age_or_tags());
        assert!(!config(0, &[], false).has_age_or_tags());
    }

    #[test]
    fn rejects_empty_criteria() {
        assert_eq!(config_error(&config(0, &[], false)), ConfigError::MissingCriteria);
    }

    #[test]
    fn rejects_invalid_tags() {
        assert_eq!(
            config_error(&config(0, &["Name="], false)),
            ConfigError::InvalidTag("Name=".to_string())
        );
    }

    #[test]
    fn keeps_validated_settings() {
        let engine = BulkDelete::with_gateway(&config(10, &["Name=foo"], true), Unreachable).unwrap();
        assert_eq!(engine.age(), 10);
        assert_eq!(engine.tags().get("Name").map(String::as_str), Some("foo"));
        assert!(engine.is_plan());

        let engine = BulkDelete::with_gateway(&config(10, &[], false), Unreachable).unwrap();
        assert!(engine.tags().is_empty());
        assert!(!engine.is_plan());
    }

    #[test]
    fn listing_error_aborts_run() {
        let mut engine = BulkDelete::with_gateway(&config(1, &[], false), Unreachable).unwrap();
        let err = engine.run(&CancellationToken::new()).unwrap_err();
        assert_eq!(err.to_string(), "not expected");
    }
}
