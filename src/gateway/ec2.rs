use super::SnapshotGateway;
use crate::snapshot::{Snapshot, Tag};
use crate::tags::TagFilter;
use anyhow::{Context, Result, anyhow, bail};
use aws_config::{BehaviorVersion, Region};
use aws_sdk_ec2::Client;
use aws_sdk_ec2::config::Credentials;
use aws_sdk_ec2::types::{self, Filter};
use chrono::{DateTime, Utc};
use log::debug;
use std::future::Future;
use std::time::Duration;
use tokio::runtime::{Builder, Runtime};
use tokio_util::sync::CancellationToken;

const CREDENTIALS_PROVIDER_NAME: &str = "ebsnap";

/// Connection settings for the EC2 API.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AwsConfig {
    pub region: String,
    pub profile: Option<String>,
    pub access_key_id: Option<String>,
    pub secret_access_key: Option<String>,
    pub session_token: Option<String>,
    /// Per-request timeout. `None` leaves requests unbounded.
    pub timeout: Option<Duration>,
}

impl AwsConfig {
    /// Static credentials are used only when both halves of the key are set.
    pub fn has_access_keys(&self) -> bool {
        let present = |v: &Option<String>| v.as_deref().is_some_and(|s| !s.is_empty());
        present(&self.access_key_id) && present(&self.secret_access_key)
    }

    fn static_credentials(&self) -> Option<Credentials> {
        if !self.has_access_keys() {
            return None;
        }
        Some(Credentials::new(
            self.access_key_id.clone().unwrap_or_default(),
            self.secret_access_key.clone().unwrap_or_default(),
            self.session_token.clone().filter(|t| !t.is_empty()),
            None,
            CREDENTIALS_PROVIDER_NAME,
        ))
    }
}

/// [`SnapshotGateway`] backed by the AWS SDK.
///
/// The SDK is async; every call is driven to completion on a private
/// current-thread runtime so the engine stays sequential.
///
/// Listing is limited to snapshots owned by the calling account
/// (`OwnerIds = ["self"]`); public and shared snapshots are never selected.
pub struct Ec2Gateway {
    runtime: Runtime,
    client: Client,
    timeout: Option<Duration>,
}

impl Ec2Gateway {
    pub fn new(config: &AwsConfig) -> Result<Self> {
        let runtime = Builder::new_current_thread()
            .enable_all()
            .build()
            .context("Failed to build async runtime for the EC2 client")?;

        let mut loader = aws_config::defaults(BehaviorVersion::latest())
            .region(Region::new(config.region.clone()));
        if let Some(profile) = config.profile.as_deref().filter(|p| !p.is_empty()) {
            debug!("Using AWS profile {}", profile);
            loader = loader.profile_name(profile);
        }
        if let Some(credentials) = config.static_credentials() {
            debug!("Using static AWS credentials");
            loader = loader.credentials_provider(credentials);
        }
        let sdk_config = runtime.block_on(loader.load());

        Ok(Ec2Gateway {
            runtime,
            client: Client::new(&sdk_config),
            timeout: config.timeout,
        })
    }

    fn call<T, F>(&self, cancel: &CancellationToken, request: F) -> Result<T>
    where
        F: Future<Output = Result<T>>,
    {
        let timeout = self.timeout;
        self.runtime.block_on(async {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => bail!("operation cancelled"),
                result = bounded(timeout, request) => result,
            }
        })
    }
}

async fn bounded<T, F>(timeout: Option<Duration>, request: F) -> Result<T>
where
    F: Future<Output = Result<T>>,
{
    match timeout {
        Some(limit) => tokio::time::timeout(limit, request).await.map_err(|_| {
            anyhow!(
                "request timed out after {}",
                humantime::format_duration(limit)
            )
        })?,
        None => request.await,
    }
}

impl SnapshotGateway for Ec2Gateway {
    fn list_snapshots(
        &mut self,
        cancel: &CancellationToken,
        filters: &[TagFilter],
    ) -> Result<Vec<Snapshot>> {
        let filters: Vec<Filter> = filters
            .iter()
            .map(|f| {
                Filter::builder()
                    .name(&f.name)
                    .set_values(Some(f.values.clone()))
                    .build()
            })
            .collect();
        let request = self
            .client
            .describe_snapshots()
            .owner_ids("self")
            .set_filters((!filters.is_empty()).then_some(filters));

        self.call(cancel, async move {
            let mut pages = request.into_paginator().send();
            let mut snapshots = Vec::new();
            let mut page_number = 0;
            while let Some(page) = pages.next().await {
                let page = page.context("Failed to describe snapshots")?;
                page_number += 1;
                debug!(
                    "Fetched snapshot page {} with {} snapshot(s)",
                    page_number,
                    page.snapshots().len()
                );
                snapshots.extend(page.snapshots().iter().map(to_snapshot));
            }
            Ok(snapshots)
        })
    }

    fn delete_snapshot(&mut self, cancel: &CancellationToken, snapshot_id: &str) -> Result<()> {
        debug!("Deleting snapshot: {}", snapshot_id);
        let request = self.client.delete_snapshot().snapshot_id(snapshot_id);
        self.call(cancel, async move {
            request
                .send()
                .await
                .map(|_| ())
                .context(format!("Failed to delete snapshot {}", snapshot_id))
        })
    }
}

fn to_snapshot(snapshot: &types::Snapshot) -> Snapshot {
    let owned = |v: Option<&str>| v.map(str::to_string);
    Snapshot {
        id: snapshot.snapshot_id().unwrap_or_default().to_string(),
        description: owned(snapshot.description()),
        start_time: snapshot
            .start_time()
            .and_then(|t| DateTime::<Utc>::from_timestamp(t.secs(), t.subsec_nanos()))
            .unwrap_or_default(),
        volume_size: snapshot.volume_size(),
        encrypted: snapshot.encrypted().unwrap_or(false),
        owner_id: owned(snapshot.owner_id()),
        owner_alias: owned(snapshot.owner_alias()),
        progress: owned(snapshot.progress()),
        state: snapshot.state().map(|s| s.as_str().to_string()),
        storage_tier: snapshot.storage_tier().map(|t| t.as_str().to_string()),
        volume_id: owned(snapshot.volume_id()),
        tags: snapshot
            .tags()
            .iter()
            .map(|t| Tag::new(t.key().unwrap_or_default(), t.value().unwrap_or_default()))
            .collect(),
    }
}
