//! Fargate task size normalization
//!
//! Fargate only runs tasks in a fixed set of (vCPU, memory) combinations.
//! An ECS-on-EC2 service reserves arbitrary CPU units and memory MB, so to
//! price it on Fargate we pick the smallest combination that holds it.

use serde::Serialize;

/// CPU units per vCPU and MB per GB, as ECS counts them
pub const UNITS_PER_VCPU: f64 = 1024.0;
pub const MB_PER_GB: f64 = 1024.0;

/// One vCPU group of the Fargate size catalog
struct TierGroup {
    vcpu: f64,
    memory_gb: &'static [f64],
}

// Ascending by vcpu, memory ascending within each group.
const TIERS: [TierGroup; 5] = [
    TierGroup {
        vcpu: 0.25,
        memory_gb: &[0.5, 1.0, 2.0],
    },
    TierGroup {
        vcpu: 0.5,
        memory_gb: &[1.0, 2.0, 3.0],
    },
    TierGroup {
        vcpu: 1.0,
        memory_gb: &[2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0],
    },
    TierGroup {
        vcpu: 2.0,
        memory_gb: &[
            4.0, 5.0, 6.0, 7.0, 8.0, 9.0, 10.0, 11.0, 12.0, 13.0, 14.0, 15.0, 16.0,
        ],
    },
    TierGroup {
        vcpu: 4.0,
        memory_gb: &[
            8.0, 9.0, 10.0, 11.0, 12.0, 13.0, 14.0, 15.0, 16.0, 17.0, 18.0, 19.0, 20.0, 21.0,
            22.0, 23.0, 24.0, 25.0, 26.0, 27.0, 28.0, 29.0, 30.0,
        ],
    },
];

/// A Fargate (vCPU, GB) combination
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize)]
pub struct SizeTier {
    pub vcpu: f64,
    pub memory_gb: f64,
}

/// Every size in the catalog, smallest first
pub fn all_tiers() -> impl Iterator<Item = SizeTier> {
    TIERS.iter().flat_map(|group| {
        group.memory_gb.iter().map(move |&memory_gb| SizeTier {
            vcpu: group.vcpu,
            memory_gb,
        })
    })
}

/// Turn a percentage into the multiplier `normalize` expects (5 -> 1.05)
pub fn fudge_factor_from_percent(percent: f64) -> f64 {
    1.0 + percent / 100.0
}

/// Pick the smallest Fargate size that holds `cpu_units` and `memory_mb`
///
/// Both comparisons are strict: a task reserving exactly 1 vCPU does not
/// fit the 1 vCPU group. `fudge_factor` (>= 1.0) stretches only the CPU
/// threshold, so a task slightly over a group's vCPU can still land in it.
///
/// Returns `None` when no size is large enough.
pub fn normalize(cpu_units: u64, memory_mb: u64, fudge_factor: f64) -> Option<SizeTier> {
    let required_vcpu = cpu_units as f64 / UNITS_PER_VCPU;
    let required_gb = memory_mb as f64 / MB_PER_GB;

    TIERS
        .iter()
        .filter(|group| required_vcpu < group.vcpu * fudge_factor)
        .find_map(|group| {
            group
                .memory_gb
                .iter()
                .find(|&&option| required_gb < option)
                .map(|&memory_gb| SizeTier {
                    vcpu: group.vcpu,
                    memory_gb,
                })
        })
}
