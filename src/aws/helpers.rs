//! Conversion from ECS SDK types to crate types

use crate::gather::ServiceDescription;
use crate::usage::{ContainerReservation, InstanceInfo};
use aws_sdk_ecs::types::{Attribute, ContainerDefinition, ContainerInstance, Resource, Service};

const INSTANCE_TYPE_ATTRIBUTE: &str = "ecs.instance-type";

fn attribute_value<'a>(attributes: &'a [Attribute], name: &str) -> Option<&'a str> {
    attributes
        .iter()
        .find(|a| a.name() == name)
        .and_then(|a| a.value())
}

fn integer_resource(resources: &[Resource], name: &str) -> u64 {
    resources
        .iter()
        .find(|r| r.name() == Some(name))
        .map(|r| r.integer_value().max(0) as u64)
        .unwrap_or(0)
}

fn non_negative(value: Option<i32>) -> Option<u64> {
    value.filter(|v| *v >= 0).map(|v| v as u64)
}

pub(super) fn container_instance_to_info(instance: &ContainerInstance) -> InstanceInfo {
    let remaining = instance.remaining_resources();
    let registered = instance.registered_resources();
    InstanceInfo {
        instance_type: attribute_value(instance.attributes(), INSTANCE_TYPE_ATTRIBUTE)
            .map(str::to_string),
        remaining_cpu: integer_resource(remaining, "CPU"),
        total_cpu: integer_resource(registered, "CPU"),
        remaining_memory: integer_resource(remaining, "MEMORY"),
        total_memory: integer_resource(registered, "MEMORY"),
    }
}

pub(super) fn container_definition_to_reservation(
    container: &ContainerDefinition,
) -> ContainerReservation {
    ContainerReservation {
        cpu: non_negative(Some(container.cpu())),
        memory: non_negative(container.memory()),
        memory_reservation: non_negative(container.memory_reservation()),
    }
}

pub(super) fn service_to_description(service: &Service) -> ServiceDescription {
    ServiceDescription {
        arn: service
            .service_arn()
            .or(service.service_name())
            .unwrap_or_default()
            .to_string(),
        task_definition: service.task_definition().map(str::to_string),
        running_count: service.running_count().max(0) as u64,
    }
}
