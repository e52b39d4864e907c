use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::atom::{Atom, Bond};

/// One docked conformation of a ligand.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Pose {
    /// Docking program that produced the pose.
    pub program: String,
    /// Scores attached to the pose, keyed by name.
    #[serde(default)]
    pub features: BTreeMap<String, f64>,
    /// RMSD (Å) to the reference ligand, when known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rmsd: Option<f64>,
    #[serde(default)]
    pub atoms: Vec<Atom>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub bonds: Vec<Bond>,
}

impl Pose {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            ..Self::default()
        }
    }

    pub fn with_feature(mut self, name: impl Into<String>, value: f64) -> Self {
        self.features.insert(name.into(), value);
        self
    }

    pub fn with_rmsd(mut self, rmsd: f64) -> Self {
        self.rmsd = Some(rmsd);
        self
    }

    pub fn with_atoms(mut self, atoms: Vec<Atom>) -> Self {
        self.atoms = atoms;
        self
    }

    #[inline]
    pub fn atom_count(&self) -> usize {
        self.atoms.len()
    }

    pub fn feature(&self, name: &str) -> Option<f64> {
        self.features.get(name).copied()
    }

    /// Whether the pose lies within `cutoff` Å of the reference; `None` if unknown.
    pub fn is_correct(&self, cutoff: f64) -> Option<bool> {
        self.rmsd.map(|r| r <= cutoff)
    }
}
