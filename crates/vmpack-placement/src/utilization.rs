//! Host utilization estimate.
//!
//! A host is considered as full as its most saturated dimension, so the
//! reported figure is the larger of the CPU and RAM percentages.

use serde::{Deserialize, Serialize};

/// A CPU/RAM pair used both for host capacity and VM demand.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Resources {
    pub cpu: u64,
    pub ram: u64,
}

impl Resources {
    pub const fn new(cpu: u64, ram: u64) -> Self {
        Self { cpu, ram }
    }

    /// Combined size, used as the sort key for hosts and VMs.
    pub fn total(&self) -> u64 {
        self.cpu.saturating_add(self.ram)
    }

    pub fn saturating_add(&self, other: &Resources) -> Resources {
        Resources {
            cpu: self.cpu.saturating_add(other.cpu),
            ram: self.ram.saturating_add(other.ram),
        }
    }

    /// True if `self` fits inside `capacity` in both dimensions.
    pub fn fits_within(&self, capacity: &Resources) -> bool {
        self.cpu <= capacity.cpu && self.ram <= capacity.ram
    }
}

/// Utilization of `capacity` by `allocated`, in percent.
///
/// A zero-capacity dimension contributes 0.
pub fn utilization(capacity: &Resources, allocated: &Resources) -> f64 {
    let cpu_pct = percent(allocated.cpu, capacity.cpu);
    let ram_pct = percent(allocated.ram, capacity.ram);
    cpu_pct.max(ram_pct)
}

fn percent(used: u64, total: u64) -> f64 {
    if total == 0 {
        0.0
    } else {
        used as f64 / total as f64 * 100.0
    }
}
