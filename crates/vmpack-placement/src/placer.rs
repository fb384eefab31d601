//! Placement engine — greedy, migration-aware bin-packing.
//!
//! Given a set of hosts, the VMs to place, and where those VMs currently
//! run, the placer decides:
//! 1. Which host each VM lands on (using the scorer)
//! 2. Which VMs must migrate away from their previous host
//! 3. Which VMs cannot be placed at all
//!
//! VMs are visited largest first and hosts are evaluated largest first,
//! both with stable sorts, so equal sizes keep input order. A VM is
//! committed once and never reconsidered.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::config::ScoringWeights;
use crate::scorer::{CandidateContext, HostScore, Residency, score_host};
use crate::utilization::Resources;

/// Host id → capacity.
pub type Hosts = IndexMap<String, Resources>;

/// VM id → demand.
pub type Vms = IndexMap<String, Resources>;

/// Host id → (VM id → demand) as it was before this run.
pub type PreviousPlacement = IndexMap<String, IndexMap<String, Resources>>;

/// VM id → preferred host id.
pub type Affinity = IndexMap<String, String>;

/// A VM moving between hosts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Migration {
    pub from: String,
    pub to: String,
}

/// Result of one placement run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PlacementOutcome {
    /// Host id → VM ids in commit order. Every input host is present.
    pub allocation: IndexMap<String, Vec<String>>,
    /// VM id → move from its previous host.
    pub migrations: IndexMap<String, Migration>,
    /// VMs no host could accommodate, in processing order.
    pub failures: Vec<String>,
}

impl PlacementOutcome {
    /// Host a VM was placed on, if any.
    pub fn host_of(&self, vm: &str) -> Option<&str> {
        self.allocation
            .iter()
            .find(|(_, vms)| vms.iter().any(|v| v == vm))
            .map(|(host, _)| host.as_str())
    }

    pub fn placed_count(&self) -> usize {
        self.allocation.values().map(Vec::len).sum()
    }

    /// Hosts with at least one VM.
    pub fn hosts_used(&self) -> usize {
        self.allocation.values().filter(|vms| !vms.is_empty()).count()
    }
}

/// Running bookkeeping for one host during a run.
struct HostSlot<'a> {
    id: &'a str,
    capacity: Resources,
    allocated: Resources,
    vms: Vec<&'a str>,
}

/// Place `vms` onto `hosts` with default weights and no affinities.
pub fn allocate(hosts: &Hosts, vms: &Vms, previous: &PreviousPlacement) -> PlacementOutcome {
    allocate_with(
        hosts,
        vms,
        previous,
        &Affinity::new(),
        &ScoringWeights::default(),
    )
}

/// Place `vms` onto `hosts`.
///
/// Callers must ensure each VM appears in at most one bucket of
/// `previous`; if it appears in several, the first bucket wins.
pub fn allocate_with(
    hosts: &Hosts,
    vms: &Vms,
    previous: &PreviousPlacement,
    affinity: &Affinity,
    weights: &ScoringWeights,
) -> PlacementOutcome {
    let mut slots: Vec<HostSlot<'_>> = hosts
        .iter()
        .map(|(id, capacity)| HostSlot {
            id: id.as_str(),
            capacity: *capacity,
            allocated: Resources::default(),
            vms: Vec::new(),
        })
        .collect();
    // Stable: equal-sized hosts keep input order.
    slots.sort_by(|a, b| b.capacity.total().cmp(&a.capacity.total()));

    let mut order: Vec<(&String, &Resources)> = vms.iter().collect();
    order.sort_by(|a, b| b.1.total().cmp(&a.1.total()));

    let mut migrations = IndexMap::new();
    let mut failures = Vec::new();

    for (vm, demand) in order {
        let original = original_host(previous, vm);
        let preferred = affinity.get(vm.as_str()).map(String::as_str);

        let mut best: Option<(usize, HostScore)> = None;
        for (idx, slot) in slots.iter().enumerate() {
            let candidate = slot.allocated.saturating_add(demand);
            let ctx = CandidateContext {
                residency: Residency::for_candidate(original, slot.id),
                opens_host: slot.vms.is_empty(),
                affinity_target: preferred == Some(slot.id),
            };
            let Some(scored) = score_host(&slot.capacity, &candidate, &ctx, weights) else {
                continue;
            };
            // Strictly greater: the first host evaluated wins ties.
            if best.as_ref().is_none_or(|(_, b)| scored.score > b.score) {
                best = Some((idx, scored));
            }
        }

        let Some((idx, scored)) = best else {
            warn!(vm = %vm, cpu = demand.cpu, ram = demand.ram, "could not place vm — insufficient capacity");
            failures.push(vm.clone());
            continue;
        };

        let slot = &mut slots[idx];
        slot.allocated = slot.allocated.saturating_add(demand);
        slot.vms.push(vm.as_str());
        debug!(
            vm = %vm,
            host = slot.id,
            score = scored.score,
            utilization = scored.utilization,
            "placed vm"
        );

        if let Some(from) = original.filter(|from| *from != slot.id) {
            debug!(vm = %vm, from, to = slot.id, "vm migrates");
            migrations.insert(
                vm.clone(),
                Migration {
                    from: from.to_string(),
                    to: slot.id.to_string(),
                },
            );
        }
    }

    // Report hosts in input order, VMs in commit order.
    let mut allocation: IndexMap<String, Vec<String>> =
        hosts.keys().map(|h| (h.clone(), Vec::new())).collect();
    for slot in &slots {
        if let Some(list) = allocation.get_mut(slot.id) {
            list.extend(slot.vms.iter().map(|v| v.to_string()));
        }
    }

    info!(
        hosts = hosts.len(),
        vms = vms.len(),
        failures = failures.len(),
        migrations = migrations.len(),
        "placement complete"
    );

    PlacementOutcome {
        allocation,
        migrations,
        failures,
    }
}

/// First previous host (in iteration order) holding `vm`.
fn original_host<'a>(previous: &'a PreviousPlacement, vm: &str) -> Option<&'a str> {
    previous
        .iter()
        .find(|(_, bucket)| bucket.contains_key(vm))
        .map(|(host, _)| host.as_str())
}
