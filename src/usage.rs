//! Cluster and service usage aggregation
//!
//! Container instances are folded into one `ClusterUsageTotal` per cluster.
//! Services are reduced to the reservations of their task definition and
//! sized for Fargate.

use crate::sizing::{self, SizeTier};
use serde::Serialize;
use std::ops::AddAssign;
use tracing::warn;

/// CPU and memory of one ECS container instance
///
/// CPU in ECS CPU units (1024 per vCPU), memory in MB.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct InstanceInfo {
    pub instance_type: Option<String>,
    pub remaining_cpu: u64,
    pub total_cpu: u64,
    pub remaining_memory: u64,
    pub total_memory: u64,
}

/// Summed capacity of every container instance in a cluster
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ClusterUsageTotal {
    /// Type of the last instance folded in
    pub instance_type: String,
    pub instance_count: u64,
    pub remaining_cpu: u64,
    pub total_cpu: u64,
    pub remaining_memory: u64,
    pub total_memory: u64,
    /// More than one instance type was seen; `instance_type` only shows the last
    pub mixed_instance_types: bool,
}

impl ClusterUsageTotal {
    /// Fold one instance into the running total
    pub fn add_instance(&mut self, info: &InstanceInfo) {
        let instance_type = info.instance_type.clone().unwrap_or_default();
        if self.instance_count > 0 && self.instance_type != instance_type {
            self.mixed_instance_types = true;
        }
        self.instance_type = instance_type;
        self.instance_count += 1;
        self.remaining_cpu += info.remaining_cpu;
        self.total_cpu += info.total_cpu;
        self.remaining_memory += info.remaining_memory;
        self.total_memory += info.total_memory;
    }

    pub fn used_cpu(&self) -> u64 {
        self.total_cpu.saturating_sub(self.remaining_cpu)
    }

    pub fn used_memory(&self) -> u64 {
        self.total_memory.saturating_sub(self.remaining_memory)
    }
}

impl AddAssign<&ClusterUsageTotal> for ClusterUsageTotal {
    /// Combine two partial totals; the right-hand side's type wins if it has instances
    fn add_assign(&mut self, rhs: &ClusterUsageTotal) {
        if rhs.instance_count == 0 {
            return;
        }
        self.mixed_instance_types |= rhs.mixed_instance_types
            || (self.instance_count > 0 && self.instance_type != rhs.instance_type);
        self.instance_type = rhs.instance_type.clone();
        self.instance_count += rhs.instance_count;
        self.remaining_cpu += rhs.remaining_cpu;
        self.total_cpu += rhs.total_cpu;
        self.remaining_memory += rhs.remaining_memory;
        self.total_memory += rhs.total_memory;
    }
}

/// Aggregate a cluster's container instances
///
/// Returns `None` for a cluster without instances; such clusters get no
/// EC2 or comparison row.
pub fn aggregate<'a, I>(instances: I) -> Option<ClusterUsageTotal>
where
    I: IntoIterator<Item = &'a InstanceInfo>,
{
    let total = instances
        .into_iter()
        .fold(ClusterUsageTotal::default(), |mut total, info| {
            total.add_instance(info);
            total
        });

    if total.instance_count == 0 {
        return None;
    }
    if total.mixed_instance_types {
        warn!(
            "Cluster mixes instance types; pricing all {} instances as {}",
            total.instance_count, total.instance_type
        );
    }
    Some(total)
}

/// Reservation of one container in a task definition
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ContainerReservation {
    pub cpu: Option<u64>,
    /// Hard limit (`memory`)
    pub memory: Option<u64>,
    /// Soft limit (`memoryReservation`)
    pub memory_reservation: Option<u64>,
}

impl ContainerReservation {
    /// Memory the scheduler reserves for this container
    pub fn reserved_memory(&self) -> u64 {
        self.memory_reservation.or(self.memory).unwrap_or(0)
    }
}

/// Sum CPU units and memory MB over all containers of a task
pub fn task_reservation(containers: &[ContainerReservation]) -> (u64, u64) {
    containers.iter().fold((0, 0), |(cpu, memory), container| {
        (
            cpu + container.cpu.unwrap_or(0),
            memory + container.reserved_memory(),
        )
    })
}

/// A running ECS service sized for Fargate
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ServiceSizeInfo {
    pub name: String,
    pub running_task_count: u64,
    pub requested_cpu_units: u64,
    pub requested_memory_mb: u64,
    /// `None` when no Fargate size is big enough
    pub size: Option<SizeTier>,
}

impl ServiceSizeInfo {
    /// Size a service from its task definition
    ///
    /// Returns `None` for services with no running tasks, since they cost nothing.
    pub fn from_task(
        name: impl Into<String>,
        running_task_count: u64,
        containers: &[ContainerReservation],
        fudge_factor: f64,
    ) -> Option<Self> {
        if running_task_count == 0 {
            return None;
        }
        let name = name.into();
        let (cpu, memory) = task_reservation(containers);
        let size = sizing::normalize(cpu, memory, fudge_factor);
        if size.is_none() {
            warn!(
                "Service {} ({} CPU units, {} MB) exceeds every Fargate size",
                name, cpu, memory
            );
        }
        Some(Self {
            name,
            running_task_count,
            requested_cpu_units: cpu,
            requested_memory_mb: memory,
            size,
        })
    }

    pub fn normalized_vcpu(&self) -> Option<f64> {
        self.size.map(|s| s.vcpu)
    }

    pub fn normalized_memory_gb(&self) -> Option<f64> {
        self.size.map(|s| s.memory_gb)
    }
}
