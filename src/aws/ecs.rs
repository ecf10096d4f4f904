//! ECS-backed `ClusterDirectory`

use super::helpers::{
    container_definition_to_reservation, container_instance_to_info, service_to_description,
};
use super::sdk_error;
use crate::error::{CompareError, Result};
use crate::gather::{ClusterDirectory, ServiceDescription};
use crate::retry::{ExponentialBackoffPolicy, RetryPolicy};
use crate::usage::{ContainerReservation, InstanceInfo};
use async_trait::async_trait;
use aws_config::SdkConfig;
use aws_sdk_ecs::types::SchedulingStrategy;
use aws_sdk_ecs::Client as EcsClient;
use tracing::debug;

/// DescribeContainerInstances accepts at most 100 ARNs per call
const DESCRIBE_INSTANCES_BATCH: usize = 100;
/// DescribeServices accepts at most 10 services per call
const DESCRIBE_SERVICES_BATCH: usize = 10;

pub struct EcsDirectory {
    client: EcsClient,
}

impl EcsDirectory {
    pub fn new(sdk_config: &SdkConfig) -> Self {
        Self {
            client: EcsClient::new(sdk_config),
        }
    }
}

#[async_trait]
impl ClusterDirectory for EcsDirectory {
    async fn list_clusters(&self) -> Result<Vec<String>> {
        ExponentialBackoffPolicy::for_cloud_api()
            .execute_with_retry(|| async {
                self.client
                    .list_clusters()
                    .into_paginator()
                    .items()
                    .send()
                    .try_collect()
                    .await
                    .map_err(|e| sdk_error("Failed to list ECS clusters", e))
            })
            .await
    }

    async fn container_instances(&self, cluster: &str) -> Result<Vec<InstanceInfo>> {
        let arns: Vec<String> = ExponentialBackoffPolicy::for_cloud_api()
            .execute_with_retry(|| async {
                self.client
                    .list_container_instances()
                    .cluster(cluster)
                    .into_paginator()
                    .items()
                    .send()
                    .try_collect()
                    .await
                    .map_err(|e| {
                        sdk_error(
                            format!("Failed to list container instances for {}", cluster),
                            e,
                        )
                    })
            })
            .await?;

        let mut instances = Vec::with_capacity(arns.len());
        for batch in arns.chunks(DESCRIBE_INSTANCES_BATCH) {
            let response = ExponentialBackoffPolicy::for_cloud_api()
                .execute_with_retry(|| async {
                    self.client
                        .describe_container_instances()
                        .cluster(cluster)
                        .set_container_instances(Some(batch.to_vec()))
                        .send()
                        .await
                        .map_err(|e| {
                            sdk_error(
                                format!("Failed to describe container instances for {}", cluster),
                                e,
                            )
                        })
                })
                .await?;
            instances.extend(
                response
                    .container_instances()
                    .iter()
                    .map(container_instance_to_info),
            );
        }
        Ok(instances)
    }

    async fn replica_services(&self, cluster: &str) -> Result<Vec<String>> {
        ExponentialBackoffPolicy::for_cloud_api()
            .execute_with_retry(|| async {
                self.client
                    .list_services()
                    .cluster(cluster)
                    .scheduling_strategy(SchedulingStrategy::Replica)
                    .into_paginator()
                    .items()
                    .send()
                    .try_collect()
                    .await
                    .map_err(|e| {
                        sdk_error(
                            format!("Failed to list services for {}", cluster),
                            e,
                        )
                    })
            })
            .await
    }

    async fn describe_services(
        &self,
        cluster: &str,
        services: &[String],
    ) -> Result<Vec<ServiceDescription>> {
        let mut descriptions = Vec::with_capacity(services.len());
        for batch in services.chunks(DESCRIBE_SERVICES_BATCH) {
            let response = ExponentialBackoffPolicy::for_cloud_api()
                .execute_with_retry(|| async {
                    self.client
                        .describe_services()
                        .cluster(cluster)
                        .set_services(Some(batch.to_vec()))
                        .send()
                        .await
                        .map_err(|e| {
                            sdk_error(
                                format!("Failed to describe services for {}", cluster),
                                e,
                            )
                        })
                })
                .await?;
            for failure in response.failures() {
                debug!(
                    "DescribeServices failure for {:?}: {:?}",
                    failure.arn(),
                    failure.reason()
                );
            }
            descriptions.extend(response.services().iter().map(service_to_description));
        }
        Ok(descriptions)
    }

    async fn task_containers(&self, task_definition: &str) -> Result<Vec<ContainerReservation>> {
        let response = ExponentialBackoffPolicy::for_cloud_api()
            .execute_with_retry(|| async {
                self.client
                    .describe_task_definition()
                    .task_definition(task_definition)
                    .send()
                    .await
                    .map_err(|e| {
                        sdk_error(
                            format!("Failed to describe task definition {}", task_definition),
                            e,
                        )
                    })
            })
            .await?;

        let definition =
            response
                .task_definition()
                .ok_or_else(|| CompareError::ResourceNotFound {
                    resource_type: "task definition".to_string(),
                    resource_id: task_definition.to_string(),
                })?;
        Ok(definition
            .container_definitions()
            .iter()
            .map(container_definition_to_reservation)
            .collect())
    }
}
