//! vmpack placement engine — consolidation-aware, migration-aware VM placement.
//!
//! Given hosts with CPU/RAM capacity, VMs with CPU/RAM demand, and where
//! those VMs ran before, this crate computes a new placement that fits
//! every host's capacity, prefers packing hosts towards a target
//! utilization, and avoids moving VMs unless it pays off.
//!
//! # Components
//!
//! - **`utilization`** — Bottleneck utilization of a host
//! - **`scorer`** — Utilization curve plus migration/consolidation/stickiness adjustments
//! - **`placer`** — Greedy largest-first allocator
//! - **`config`** — Scoring weights, loadable from TOML
//! - **`request`** — JSON request/response model, diff handling, run statistics

pub mod config;
pub mod error;
pub mod placer;
pub mod request;
pub mod scorer;
pub mod utilization;

pub use config::ScoringWeights;
pub use error::{PlacementError, PlacementResult};
pub use placer::{Affinity, Hosts, Migration, PlacementOutcome, PreviousPlacement, Vms, allocate, allocate_with};
pub use request::{PlacementInputs, PlacementRequest, PlacementResponse, PlacementStats, run};
pub use scorer::{CandidateContext, HostScore, Residency, placement_score, score_host};
pub use utilization::{Resources, utilization};
