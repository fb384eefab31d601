//! Placement requests and responses.
//!
//! Bridges the JSON wire format (hosts, VM demands, the previous placement,
//! and an add/remove diff) to the placer's inputs, and renders the
//! outcome back out together with run statistics.

use std::collections::HashSet;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::config::ScoringWeights;
use crate::error::{PlacementError, PlacementResult};
use crate::placer::{
    Affinity, Hosts, Migration, PlacementOutcome, PreviousPlacement, Vms, allocate_with,
};
use crate::scorer::placement_score;
use crate::utilization::{Resources, utilization};

/// A placement request as read from JSON.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PlacementRequest {
    pub hosts: Hosts,
    pub virtual_machines: Vms,
    /// Host id → VM ids running there before this run.
    #[serde(default)]
    pub previous_allocations: IndexMap<String, Vec<String>>,
    /// VM id → preferred host id.
    #[serde(default)]
    pub affinity: Affinity,
    #[serde(default)]
    pub diff: Diff,
}

/// Changes to the VM set relative to the previous placement.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Diff {
    /// VMs that are new in this run, even if listed as previously placed.
    #[serde(default)]
    pub add: DiffEntries,
    /// VMs that are gone and must not be placed.
    #[serde(default)]
    pub remove: DiffEntries,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DiffEntries {
    #[serde(default)]
    pub virtual_machines: Vec<String>,
}

/// The placer's inputs derived from a request.
#[derive(Debug, Clone)]
pub struct PlacementInputs {
    pub hosts: Hosts,
    pub vms: Vms,
    pub previous: PreviousPlacement,
    pub affinity: Affinity,
}

impl PlacementRequest {
    pub fn from_json(content: &str) -> PlacementResult<Self> {
        Ok(serde_json::from_str(content)?)
    }

    /// Reject structurally malformed requests.
    pub fn validate(&self) -> PlacementResult<()> {
        let mut seen: IndexMap<&str, &str> = IndexMap::new();
        for (host, vms) in &self.previous_allocations {
            for vm in vms {
                self.require_vm(vm, "previous_allocations")?;
                if let Some(first) = seen.insert(vm.as_str(), host.as_str()) {
                    return Err(PlacementError::DuplicatePlacement {
                        vm: vm.clone(),
                        first: first.to_string(),
                        second: host.clone(),
                    });
                }
            }
        }

        for (vm, host) in &self.affinity {
            self.require_vm(vm, "affinity")?;
            if !self.hosts.contains_key(host) {
                return Err(PlacementError::UnknownHost {
                    host: host.clone(),
                    context: "affinity",
                });
            }
        }

        for vm in &self.diff.add.virtual_machines {
            self.require_vm(vm, "diff.add")?;
        }
        let removed: HashSet<&str> = self
            .diff
            .remove
            .virtual_machines
            .iter()
            .map(String::as_str)
            .collect();
        for vm in &self.diff.remove.virtual_machines {
            self.require_vm(vm, "diff.remove")?;
        }
        if let Some(vm) = self
            .diff
            .add
            .virtual_machines
            .iter()
            .find(|vm| removed.contains(vm.as_str()))
        {
            return Err(PlacementError::ConflictingDiff(vm.clone()));
        }

        Ok(())
    }

    fn require_vm(&self, vm: &str, context: &'static str) -> PlacementResult<()> {
        if self.virtual_machines.contains_key(vm) {
            Ok(())
        } else {
            Err(PlacementError::UnknownVm {
                vm: vm.to_string(),
                context,
            })
        }
    }

    /// Validate and convert into the placer's inputs.
    ///
    /// Removed VMs leave the run entirely; added VMs are treated as new.
    pub fn into_inputs(self) -> PlacementResult<PlacementInputs> {
        self.validate()?;

        let removed: HashSet<String> = self.diff.remove.virtual_machines.into_iter().collect();
        let added: HashSet<String> = self.diff.add.virtual_machines.into_iter().collect();

        let vms: Vms = self
            .virtual_machines
            .into_iter()
            .filter(|(vm, _)| !removed.contains(vm))
            .collect();

        let previous: PreviousPlacement = self
            .previous_allocations
            .into_iter()
            .map(|(host, ids)| {
                let bucket: IndexMap<String, Resources> = ids
                    .into_iter()
                    .filter(|vm| !added.contains(vm))
                    .filter_map(|vm| vms.get(&vm).map(|demand| (vm, *demand)))
                    .collect();
                (host, bucket)
            })
            .filter(|(_, bucket)| !bucket.is_empty())
            .collect();

        let affinity: Affinity = self
            .affinity
            .into_iter()
            .filter(|(vm, _)| vms.contains_key(vm))
            .collect();

        Ok(PlacementInputs {
            hosts: self.hosts,
            vms,
            previous,
            affinity,
        })
    }
}

/// A placement response as written to JSON.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlacementResponse {
    pub allocations: IndexMap<String, Vec<String>>,
    pub allocation_failures: Vec<String>,
    pub migrations: IndexMap<String, Migration>,
}

impl From<PlacementOutcome> for PlacementResponse {
    fn from(outcome: PlacementOutcome) -> Self {
        Self {
            allocations: outcome.allocation,
            allocation_failures: outcome.failures,
            migrations: outcome.migrations,
        }
    }
}

/// Summary figures for a finished run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlacementStats {
    /// Mean utilization over all hosts in percent; idle hosts count as 0.
    pub average_utilization: f64,
    /// Curve value at the average utilization.
    pub efficiency: Option<f64>,
    pub migration_count: usize,
    /// Squared migration count.
    pub migration_cost: usize,
    pub hosts_used: usize,
}

impl PlacementStats {
    pub fn compute(hosts: &Hosts, vms: &Vms, outcome: &PlacementOutcome) -> Self {
        let total: f64 = hosts
            .iter()
            .map(|(host, capacity)| {
                let placed = outcome
                    .allocation
                    .get(host)
                    .map(|ids| {
                        ids.iter()
                            .filter_map(|vm| vms.get(vm))
                            .fold(Resources::default(), |acc, d| acc.saturating_add(d))
                    })
                    .unwrap_or_default();
                utilization(capacity, &placed)
            })
            .sum();
        let average_utilization = if hosts.is_empty() {
            0.0
        } else {
            total / hosts.len() as f64
        };

        let migration_count = outcome.migrations.len();
        Self {
            average_utilization,
            efficiency: placement_score(average_utilization / 100.0),
            migration_count,
            migration_cost: migration_count.pow(2),
            hosts_used: outcome.hosts_used(),
        }
    }
}

/// Full pipeline: validate, convert, place, summarize.
pub fn run(
    request: PlacementRequest,
    weights: &ScoringWeights,
) -> PlacementResult<(PlacementResponse, PlacementStats)> {
    let inputs = request.into_inputs()?;
    let outcome = allocate_with(
        &inputs.hosts,
        &inputs.vms,
        &inputs.previous,
        &inputs.affinity,
        weights,
    );
    let stats = PlacementStats::compute(&inputs.hosts, &inputs.vms, &outcome);
    Ok((outcome.into(), stats))
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"{
        "$schema": "resources/input.schema.json",
        "hosts": {
            "host1": { "cpu": 24, "ram": 512 },
            "host2": { "cpu": 32, "ram": 768 }
        },
        "virtual_machines": {
            "vm1": { "cpu": 2, "ram": 4 },
            "vm2": { "cpu": 3, "ram": 7 },
            "vm3": { "cpu": 128, "ram": 1024 }
        },
        "diff": {
            "add": { "virtual_machines": ["vm3"] }
        }
    }"#;

    fn request(previous: &[(&str, &[&str])]) -> PlacementRequest {
        let mut req = PlacementRequest::from_json(SAMPLE).unwrap();
        req.diff = Diff::default();
        req.previous_allocations = previous
            .iter()
            .map(|(h, vms)| (h.to_string(), vms.iter().map(|v| v.to_string()).collect()))
            .collect();
        req
    }

    #[test]
    fn parses_sample_request() {
        let req = PlacementRequest::from_json(SAMPLE).unwrap();
        assert_eq!(req.hosts.len(), 2);
        assert_eq!(req.virtual_machines["vm3"], Resources::new(128, 1024));
        assert_eq!(req.diff.add.virtual_machines, vec!["vm3".to_string()]);
        assert!(req.previous_allocations.is_empty());
        assert!(req.affinity.is_empty());
    }

    #[test]
    fn preserves_host_order() {
        let req = PlacementRequest::from_json(SAMPLE).unwrap();
        let keys: Vec<&str> = req.hosts.keys().map(String::as_str).collect();
        assert_eq!(keys, vec!["host1", "host2"]);
    }

    #[test]
    fn rejects_missing_resource_field() {
        let err = PlacementRequest::from_json(r#"{"hosts": {"h": {"cpu": 1}}, "virtual_machines": {}}"#)
            .unwrap_err();
        assert!(matches!(err, PlacementError::Request(_)));
    }

    #[test]
    fn rejects_negative_demand() {
        let err = PlacementRequest::from_json(
            r#"{"hosts": {}, "virtual_machines": {"v": {"cpu": -1, "ram": 2}}}"#,
        )
        .unwrap_err();
        assert!(matches!(err, PlacementError::Request(_)));
    }

    #[test]
    fn rejects_duplicate_previous_placement() {
        let req = request(&[("host1", &["vm1"]), ("host2", &["vm1"])]);
        let err = req.validate().unwrap_err();
        match err {
            PlacementError::DuplicatePlacement { vm, first, second } => {
                assert_eq!(vm, "vm1");
                assert_eq!(first, "host1");
                assert_eq!(second, "host2");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn rejects_unknown_previous_vm() {
        let req = request(&[("host1", &["ghost"])]);
        assert!(matches!(
            req.validate(),
            Err(PlacementError::UnknownVm { context: "previous_allocations", .. })
        ));
    }

    #[test]
    fn rejects_affinity_to_unknown_host() {
        let mut req = request(&[]);
        req.affinity.insert("vm1".to_string(), "nowhere".to_string());
        assert!(matches!(req.validate(), Err(PlacementError::UnknownHost { .. })));
    }

    #[test]
    fn rejects_conflicting_diff() {
        let mut req = request(&[]);
        req.diff.add.virtual_machines.push("vm2".to_string());
        req.diff.remove.virtual_machines.push("vm2".to_string());
        assert!(matches!(req.validate(), Err(PlacementError::ConflictingDiff(vm)) if vm == "vm2"));
    }

    #[test]
    fn removed_vms_leave_the_run() {
        let mut req = request(&[("host1", &["vm1", "vm2"])]);
        req.diff.remove.virtual_machines.push("vm2".to_string());

        let inputs = req.into_inputs().unwrap();

        assert!(!inputs.vms.contains_key("vm2"));
        assert_eq!(inputs.previous["host1"].len(), 1);
        assert!(inputs.previous["host1"].contains_key("vm1"));
    }

    #[test]
    fn added_vms_are_new() {
        let mut req = request(&[("host2", &["vm1", "vm2"])]);
        req.diff.add.virtual_machines.push("vm2".to_string());

        let inputs = req.into_inputs().unwrap();

        assert!(inputs.vms.contains_key("vm2"));
        assert!(!inputs.previous["host2"].contains_key("vm2"));
        assert_eq!(inputs.previous["host2"]["vm1"], Resources::new(2, 4));
    }

    #[test]
    fn sample_run_matches_expected_outcome() {
        let req = PlacementRequest::from_json(SAMPLE).unwrap();
        let (resp, stats) = run(req, &ScoringWeights::default()).unwrap();

        assert_eq!(resp.allocation_failures, vec!["vm3".to_string()]);
        assert!(resp.migrations.is_empty());
        assert_eq!(resp.allocations["host1"], vec!["vm2".to_string(), "vm1".to_string()]);
        assert!(resp.allocations["host2"].is_empty());
        assert_eq!(stats.migration_count, 0);
        assert_eq!(stats.migration_cost, 0);
        assert_eq!(stats.hosts_used, 1);
    }

    #[test]
    fn previous_placement_is_kept() {
        let req = request(&[("host2", &["vm1", "vm2"])]);
        let (resp, stats) = run(req, &ScoringWeights::default()).unwrap();

        assert_eq!(resp.allocations["host2"], vec!["vm2".to_string(), "vm1".to_string()]);
        assert_eq!(stats.migration_count, 0);
    }

    #[test]
    fn stats_average_over_all_hosts() {
        let hosts: Hosts = [
            ("a".to_string(), Resources::new(10, 10)),
            ("b".to_string(), Resources::new(10, 10)),
        ]
        .into_iter()
        .collect();
        let vms: Vms = [("v".to_string(), Resources::new(5, 2))].into_iter().collect();
        let mut outcome = PlacementOutcome::default();
        outcome.allocation.insert("a".to_string(), vec!["v".to_string()]);
        outcome.allocation.insert("b".to_string(), Vec::new());
        outcome.migrations.insert(
            "v".to_string(),
            Migration {
                from: "b".to_string(),
                to: "a".to_string(),
            },
        );
        outcome.migrations.insert(
            "w".to_string(),
            Migration {
                from: "b".to_string(),
                to: "a".to_string(),
            },
        );

        let stats = PlacementStats::compute(&hosts, &vms, &outcome);

        assert!((stats.average_utilization - 25.0).abs() < 1e-9);
        assert_eq!(stats.efficiency, placement_score(0.25));
        assert_eq!(stats.migration_count, 2);
        assert_eq!(stats.migration_cost, 4);
        assert_eq!(stats.hosts_used, 1);
    }

    #[test]
    fn stats_with_no_hosts() {
        let stats = PlacementStats::compute(&Hosts::new(), &Vms::new(), &PlacementOutcome::default());
        assert_eq!(stats.average_utilization, 0.0);
        assert_eq!(stats.hosts_used, 0);
    }

    #[test]
    fn response_serializes_wire_names() {
        let req = PlacementRequest::from_json(SAMPLE).unwrap();
        let (resp, _) = run(req, &ScoringWeights::default()).unwrap();
        let json = serde_json::to_value(&resp).unwrap();

        assert!(json.get("allocations").is_some());
        assert_eq!(json["allocation_failures"][0], "vm3");
        assert!(json["migrations"].as_object().unwrap().is_empty());
    }
}
