//! Scoring weights, optionally loaded from a TOML file.
//!
//! ```toml
//! migration_penalty = 1.0
//! open_host_penalty = 5.0
//! stickiness_bonus = 10.0
//! affinity_bonus = 100.0
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{PlacementError, PlacementResult};

/// Adjustments applied on top of the utilization curve.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoringWeights {
    /// Subtracted (times migrations²) when a VM would leave its previous host.
    pub migration_penalty: f64,
    /// Subtracted when the candidate host holds no VMs yet in this run.
    pub open_host_penalty: f64,
    /// Added when the candidate is the VM's previous host.
    pub stickiness_bonus: f64,
    /// Added when the candidate is the VM's requested affinity host.
    pub affinity_bonus: f64,
}

impl Default for ScoringWeights {
    fn default() -> Self {
        Self {
            migration_penalty: 1.0,
            open_host_penalty: 5.0,
            stickiness_bonus: 10.0,
            affinity_bonus: 100.0,
        }
    }
}

impl ScoringWeights {
    pub fn from_toml_str(content: &str) -> PlacementResult<Self> {
        Ok(toml::from_str(content)?)
    }

    pub fn from_file(path: &Path) -> PlacementResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|source| PlacementError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_toml_str(&content)
    }
}
