//! Host scoring for placement decisions.
//!
//! A candidate host is scored by how desirable its utilization would be
//! after accepting the VM, then adjusted for:
//! - **Migration**: leaving the VM's previous host costs a penalty
//! - **Consolidation**: opening an idle host costs a penalty
//! - **Stickiness**: staying on the previous host earns a bonus
//! - **Affinity**: landing on a caller-requested host earns a bonus

use serde::{Deserialize, Serialize};

use crate::config::ScoringWeights;
use crate::utilization::{Resources, utilization};

const CURVE_OFFSET: f64 = -0.67459;
const CURVE_SCALE: f64 = 42.38075;

/// Desirability of running a host at utilization `u` (a fraction).
///
/// `f(u) = -0.67459 + 42.38075 / (5.96 - 2.5u) * exp(-2 * ln(2.96 - 2.5u)^2)`
///
/// Close to zero for an idle host, peaks around 78% and falls off towards
/// saturation. Returns `None` outside the curve's domain.
pub fn placement_score(u: f64) -> Option<f64> {
    let log_arg = -2.5 * u + 2.96;
    let denom = -2.5 * u + 5.96;
    if !(log_arg > 0.0 && denom > 0.0) {
        return None;
    }
    let ln = log_arg.ln();
    Some(CURVE_OFFSET + (CURVE_SCALE / denom) * (-2.0 * ln * ln).exp())
}

/// How the VM being placed relates to its previous placement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Residency {
    /// The VM had no previous host.
    New,
    /// The candidate is the VM's previous host.
    Resident,
    /// The VM had a previous host and the candidate is a different one.
    Migrating,
}

impl Residency {
    pub fn for_candidate(original_host: Option<&str>, candidate: &str) -> Self {
        match original_host {
            None => Residency::New,
            Some(h) if h == candidate => Residency::Resident,
            Some(_) => Residency::Migrating,
        }
    }
}

/// Per-candidate facts the score depends on besides utilization.
#[derive(Debug, Clone, Copy)]
pub struct CandidateContext {
    pub residency: Residency,
    /// The host holds no VMs yet in this run.
    pub opens_host: bool,
    /// The host is the VM's requested affinity target.
    pub affinity_target: bool,
}

/// Scored candidate, with its components kept for debugging.
#[derive(Debug, Clone, PartialEq)]
pub struct HostScore {
    /// Total score (higher = better).
    pub score: f64,
    /// Utilization fraction after accepting the VM.
    pub utilization: f64,
    /// Curve value before adjustments.
    pub base: f64,
    /// Sum of penalties and bonuses.
    pub adjustment: f64,
}

/// Score a host whose tally would become `candidate_allocated`.
///
/// Returns `None` when the host is infeasible: over capacity in either
/// dimension, above 100% utilization, or outside the curve's domain.
pub fn score_host(
    capacity: &Resources,
    candidate_allocated: &Resources,
    ctx: &CandidateContext,
    weights: &ScoringWeights,
) -> Option<HostScore> {
    if !candidate_allocated.fits_within(capacity) {
        return None;
    }

    let u = utilization(capacity, candidate_allocated) / 100.0;
    if u > 1.0 {
        return None;
    }
    let base = placement_score(u)?;

    let mut adjustment = 0.0;
    match ctx.residency {
        Residency::Migrating => {
            // One decision moves at most one VM.
            let migrations: f64 = 1.0;
            adjustment -= weights.migration_penalty * migrations.powi(2);
        }
        Residency::Resident => adjustment += weights.stickiness_bonus,
        Residency::New => {}
    }
    if ctx.opens_host {
        adjustment -= weights.open_host_penalty;
    }
    if ctx.affinity_target {
        adjustment += weights.affinity_bonus;
    }

    Some(HostScore {
        score: base + adjustment,
        utilization: u,
        base,
        adjustment,
    })
}
