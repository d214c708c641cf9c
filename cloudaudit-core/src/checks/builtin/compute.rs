use async_trait::async_trait;
use cloudaudit_model::CheckFamily;
use futures::future::join_all;
use serde_json::json;
use tracing::debug;

use crate::checks::{Check, CheckContext, CheckOutcome, FindingDraft};
use crate::error::CheckError;
use crate::provider::Instance;

#[derive(Debug, Clone, Copy, Default)]
pub struct InstanceLabels;

#[async_trait]
impl Check for InstanceLabels {
    fn name(&self) -> &str {
        "Instance Labels"
    }

    async fn run(
        &self,
        ctx: &CheckContext<'_>,
    ) -> Result<CheckOutcome, CheckError> {
        let instances =
            ctx.api.list_instances(ctx.credential, ctx.project).await?;
        if instances.is_empty() {
            return Ok(CheckOutcome::not_applicable("0 instances"));
        }

        let unlabeled: Vec<FindingDraft> = instances
            .iter()
            .filter(|i| i.labels.is_empty())
            .map(|i| {
                FindingDraft::new(
                    self.name(),
                    &i.name,
                    false,
                    format!("Instance {} has no labels", i.name),
                )
                .recommend("add cost-allocation labels (team, environment)")
                .check_type("missing_labels")
            })
            .collect();

        if unlabeled.is_empty() {
            return Ok(CheckOutcome::from_drafts(vec![FindingDraft::new(
                self.name(),
                ctx.project.as_str(),
                true,
                format!("All {} instances carry labels", instances.len()),
            )]));
        }
        Ok(CheckOutcome::from_drafts(unlabeled))
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct DiskEncryption;

#[async_trait]
impl Check for DiskEncryption {
    fn name(&self) -> &str {
        "Disk Encryption"
    }

    async fn run(
        &self,
        ctx: &CheckContext<'_>,
    ) -> Result<CheckOutcome, CheckError> {
        let disks = ctx.api.list_disks(ctx.credential, ctx.project).await?;
        if disks.is_empty() {
            return Ok(CheckOutcome::not_applicable("0 disks"));
        }

        let unencrypted: Vec<FindingDraft> = disks
            .iter()
            .filter(|d| !d.has_customer_managed_key())
            .map(|d| {
                FindingDraft::new(
                    self.name(),
                    &d.name,
                    false,
                    format!(
                        "Disk {} is not encrypted with a customer key",
                        d.name
                    ),
                )
                .recommend("recreate the disk with a customer-managed key")
                .family(CheckFamily::DataProtection)
                .check_type("unencrypted_disk")
            })
            .collect();

        if unencrypted.is_empty() {
            return Ok(CheckOutcome::from_drafts(vec![FindingDraft::new(
                self.name(),
                ctx.project.as_str(),
                true,
                format!("All {} disks use customer-managed keys", disks.len()),
            )]));
        }
        Ok(CheckOutcome::from_drafts(unencrypted))
    }
}

const CPU_METRIC: &str = "compute.googleapis.com/instance/cpu/utilization";
const MEMORY_METRIC: &str = "agent.googleapis.com/memory/percent_used";
const DISK_METRIC: &str =
    "compute.googleapis.com/instance/disk/read_bytes_count";
const NETWORK_METRIC: &str =
    "compute.googleapis.com/instance/network/received_bytes_count";

/// Averages of the four utilisation series for one instance. A series that
/// could not be fetched or had no points is `None`.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct UtilizationSample {
    pub cpu_percent: Option<f64>,
    pub memory_percent: Option<f64>,
    pub disk_read_bytes: Option<f64>,
    pub network_received_bytes: Option<f64>,
}

fn average(points: &[f64]) -> Option<f64> {
    if points.is_empty() {
        None
    } else {
        Some(points.iter().sum::<f64>() / points.len() as f64)
    }
}

/// Flags running instances whose average CPU or memory utilisation is
/// below the threshold.
#[derive(Debug, Clone, Copy)]
pub struct InstanceUtilization {
    pub threshold_percent: f64,
    pub window_minutes: i64,
}

impl Default for InstanceUtilization {
    fn default() -> Self {
        Self {
            threshold_percent: 10.0,
            window_minutes: 60,
        }
    }
}

impl InstanceUtilization {
    /// Fetch the four series concurrently and reduce each to its average.
    async fn sample(
        &self,
        ctx: &CheckContext<'_>,
        instance: &Instance,
    ) -> Result<UtilizationSample, CheckError> {
        let filters: Vec<String> =
            [CPU_METRIC, MEMORY_METRIC, DISK_METRIC, NETWORK_METRIC]
                .iter()
                .map(|metric| {
                    format!(
                        "metric.type = \"{metric}\" AND \
                         resource.labels.instance_id = \"{}\"",
                        instance.id
                    )
                })
                .collect();

        let results = join_all(filters.iter().map(|filter| {
            ctx.api.metric_points(
                ctx.credential,
                ctx.project,
                filter,
                self.window_minutes,
            )
        }))
        .await;

        let mut averages = [None; 4];
        for (slot, result) in averages.iter_mut().zip(results) {
            match result {
                Ok(points) => *slot = average(&points),
                Err(err) if err.is_unauthorized() => return Err(err),
                Err(err) => {
                    debug!(
                        instance = %instance.name,
                        error = %err.message,
                        "metric unavailable"
                    );
                }
            }
        }

        let [cpu, memory, disk, network] = averages;
        Ok(UtilizationSample {
            cpu_percent: cpu.map(|fraction| fraction * 100.0),
            memory_percent: memory,
            disk_read_bytes: disk,
            network_received_bytes: network,
        })
    }
}

#[async_trait]
impl Check for InstanceUtilization {
    fn name(&self) -> &str {
        "Instance Utilization"
    }

    async fn run(
        &self,
        ctx: &CheckContext<'_>,
    ) -> Result<CheckOutcome, CheckError> {
        let instances =
            ctx.api.list_instances(ctx.credential, ctx.project).await?;
        let running: Vec<&Instance> =
            instances.iter().filter(|i| i.is_running()).collect();
        if running.is_empty() {
            return Ok(CheckOutcome::not_applicable("0 running instances"));
        }

        let mut drafts = Vec::new();
        for instance in running {
            let sample = self.sample(ctx, instance).await?;
            let details = json!({
                "zone": instance.zone_name(),
                "machineType": instance.machine_type,
                "cpuPercent": sample.cpu_percent,
                "memoryPercent": sample.memory_percent,
                "diskReadBytes": sample.disk_read_bytes,
                "networkReceivedBytes": sample.network_received_bytes,
            });

            if let Some(cpu) =
                sample.cpu_percent.filter(|v| *v < self.threshold_percent)
            {
                drafts.push(
                    FindingDraft::new(
                        self.name(),
                        &instance.name,
                        false,
                        format!("Low CPU utilization: {cpu:.1}%"),
                    )
                    .recommend("downsize the machine type or schedule shutdown")
                    .check_type("low_cpu_utilization")
                    .details(details.clone()),
                );
            }
            if let Some(memory) =
                sample.memory_percent.filter(|v| *v < self.threshold_percent)
            {
                drafts.push(
                    FindingDraft::new(
                        self.name(),
                        &instance.name,
                        false,
                        format!("Low memory utilization: {memory:.1}%"),
                    )
                    .recommend("switch to a machine type with less memory")
                    .check_type("low_memory_utilization")
                    .details(details),
                );
            }
        }

        if drafts.is_empty() {
            drafts.push(FindingDraft::new(
                self.name(),
                ctx.project.as_str(),
                true,
                "Running instances are above the utilisation threshold",
            ));
        }
        Ok(CheckOutcome::from_drafts(drafts))
    }
}
