//! Per-cluster data gathering
//!
//! Walks every cluster the directory knows about, one at a time, and turns
//! its container instances and replica services into a `ClusterSnapshot`.

use crate::error::Result;
use crate::usage::{self, ClusterUsageTotal, ContainerReservation, InstanceInfo, ServiceSizeInfo};
use async_trait::async_trait;
use indicatif::ProgressBar;
use serde::Serialize;
use tracing::{debug, info};

/// What `describe_services` tells us about one service
#[derive(Debug, Clone, PartialEq)]
pub struct ServiceDescription {
    pub arn: String,
    pub task_definition: Option<String>,
    pub running_count: u64,
}

/// Read-only view of the container orchestrator
///
/// Implementations handle pagination and batching themselves.
#[async_trait]
pub trait ClusterDirectory: Send + Sync {
    /// ARNs of every cluster in the region
    async fn list_clusters(&self) -> Result<Vec<String>>;

    /// Capacity of every container instance registered to `cluster`
    async fn container_instances(&self, cluster: &str) -> Result<Vec<InstanceInfo>>;

    /// ARNs of the replica-scheduled services in `cluster`
    async fn replica_services(&self, cluster: &str) -> Result<Vec<String>>;

    async fn describe_services(
        &self,
        cluster: &str,
        services: &[String],
    ) -> Result<Vec<ServiceDescription>>;

    /// Container reservations of a task definition
    async fn task_containers(&self, task_definition: &str) -> Result<Vec<ContainerReservation>>;
}

/// Everything gathered for one cluster
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClusterSnapshot {
    pub name: String,
    /// `None` when the cluster has no container instances
    pub usage: Option<ClusterUsageTotal>,
    /// Running services only, sorted by name
    pub services: Vec<ServiceSizeInfo>,
}

/// Last path segment of an ARN (`arn:...:cluster/prod` -> `prod`)
pub fn arn_short_name(arn: &str) -> &str {
    arn.rsplit('/').next().unwrap_or(arn)
}

/// Gather instance usage and service sizing for one cluster
pub async fn gather_cluster<D>(
    directory: &D,
    cluster_arn: &str,
    fudge_factor: f64,
) -> Result<ClusterSnapshot>
where
    D: ClusterDirectory + ?Sized,
{
    let name = arn_short_name(cluster_arn).to_string();

    let instances = directory.container_instances(cluster_arn).await?;
    debug!("Cluster {} has {} container instances", name, instances.len());
    let usage = usage::aggregate(&instances);

    let service_arns = directory.replica_services(cluster_arn).await?;
    let mut services = Vec::new();
    if !service_arns.is_empty() {
        for description in directory.describe_services(cluster_arn, &service_arns).await? {
            if description.running_count == 0 {
                debug!("Skipping {}: no running tasks", description.arn);
                continue;
            }
            let Some(task_definition) = description.task_definition.as_deref() else {
                debug!("Skipping {}: no task definition", description.arn);
                continue;
            };
            let containers = directory.task_containers(task_definition).await?;
            if let Some(info) = ServiceSizeInfo::from_task(
                arn_short_name(&description.arn),
                description.running_count,
                &containers,
                fudge_factor,
            ) {
                services.push(info);
            }
        }
    }
    services.sort_by(|a, b| a.name.cmp(&b.name));

    info!(
        "Cluster {}: {} instances, {} running services",
        name,
        usage.as_ref().map(|u| u.instance_count).unwrap_or(0),
        services.len()
    );

    Ok(ClusterSnapshot {
        name,
        usage,
        services,
    })
}

/// Gather every cluster, sequentially, sorted by cluster name
pub async fn gather_all<D>(
    directory: &D,
    fudge_factor: f64,
    progress: Option<&ProgressBar>,
) -> Result<Vec<ClusterSnapshot>>
where
    D: ClusterDirectory + ?Sized,
{
    let clusters = directory.list_clusters().await?;
    info!("Found {} ECS clusters", clusters.len());

    let mut snapshots = Vec::with_capacity(clusters.len());
    for cluster_arn in &clusters {
        if let Some(pb) = progress {
            pb.set_message(format!(
                "Gathering info for ECS cluster {}",
                arn_short_name(cluster_arn)
            ));
        }
        snapshots.push(gather_cluster(directory, cluster_arn, fudge_factor).await?);
    }

    snapshots.sort_by(|a, b| a.name.cmp(&b.name));
    Ok(snapshots)
}
