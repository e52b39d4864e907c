//! Pose graph construction settings.

use serde::{Deserialize, Serialize};

/// Node featurization and labeling.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct NodeConfig {
    /// Ordered score names used as node features. Empty selects every
    /// feature present in the training set.
    #[serde(default)]
    pub features: Vec<String>,

    /// Docking programs encoded one-hot after the score columns.
    #[serde(default)]
    pub programs: Vec<String>,

    /// RMSD (Å) to the reference at or below which a pose is a correct binding mode.
    #[serde(default = "default_label_cutoff")]
    pub label_cutoff: f64,
}

fn default_label_cutoff() -> f64 {
    2.0
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            features: Vec::new(),
            programs: Vec::new(),
            label_cutoff: default_label_cutoff(),
        }
    }
}

/// Edge construction between poses of the same system.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EdgeConfig {
    /// Pose–pose RMSD (Å) at or below which two poses are connected.
    #[serde(default = "default_edge_cutoff")]
    pub cutoff: f64,

    /// Keep at most this many closest neighbors per pose (0 keeps all).
    #[serde(default)]
    pub max_neighbors: usize,

    /// Ignore hydrogens when comparing poses.
    #[serde(default = "default_heavy_atoms_only")]
    pub heavy_atoms_only: bool,
}

fn default_edge_cutoff() -> f64 {
    2.0
}
fn default_heavy_atoms_only() -> bool {
    true
}

impl Default for EdgeConfig {
    fn default() -> Self {
        Self {
            cutoff: default_edge_cutoff(),
            max_neighbors: 0,
            heavy_atoms_only: default_heavy_atoms_only(),
        }
    }
}
