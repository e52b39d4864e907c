//! Pose graphs: one node per docked pose, edges between poses that sit
//! within an RMSD cutoff of each other.
//!
//! [`GraphBuilder`] holds everything needed to featurize a system the same
//! way at training and at prediction time: the resolved [`FeatureSpec`],
//! the fitted [`Normalizer`], and the edge and labeling settings.

mod error;
mod features;
mod rmsd;

pub use error::Error;
pub use features::{FeatureSpec, Normalizer};
pub use rmsd::{RmsdError, pose_rmsd};

use ndarray::Array2;

use crate::config::{DbxConfig, EdgeConfig};
use crate::model::system::{Dataset, LigandSystem};

/// Featurized graph of one docked system.
#[derive(Debug, Clone, PartialEq)]
pub struct PoseGraph {
    pub id: String,
    /// Normalized node features, one row per pose.
    pub features: Array2<f64>,
    /// Sorted, symmetric adjacency without self loops.
    pub neighbors: Vec<Vec<usize>>,
    /// Correct-pose labels; present only when every pose has a reference RMSD.
    pub labels: Option<Vec<bool>>,
    pub pkd: Option<f64>,
    pub programs: Vec<String>,
}

impl PoseGraph {
    #[inline]
    pub fn node_count(&self) -> usize {
        self.features.nrows()
    }

    /// Number of undirected edges.
    pub fn edge_count(&self) -> usize {
        self.neighbors.iter().map(Vec::len).sum::<usize>() / 2
    }

    pub fn positive_count(&self) -> usize {
        self.labels
            .as_ref()
            .map_or(0, |l| l.iter().filter(|&&b| b).count())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct GraphBuilder {
    pub spec: FeatureSpec,
    pub normalizer: Normalizer,
    pub edge: EdgeConfig,
    pub label_cutoff: f64,
}

impl GraphBuilder {
    pub fn new(spec: FeatureSpec, normalizer: Normalizer, config: &DbxConfig) -> Self {
        Self {
            spec,
            normalizer,
            edge: config.edge.clone(),
            label_cutoff: config.node.label_cutoff,
        }
    }

    /// Resolves the feature layout and fits the normalizer on every pose of
    /// `train`.
    pub fn fit(config: &DbxConfig, train: &Dataset) -> Result<Self, Error> {
        let spec = FeatureSpec::resolve(&config.node, train)?;

        let mut rows = Vec::with_capacity(train.pose_count());
        for system in &train.systems {
            for (index, pose) in system.poses.iter().enumerate() {
                rows.push(spec.scores(&system.id, index, pose)?);
            }
        }
        let normalizer = Normalizer::fit(&spec.names, &rows)?;

        log::debug!(
            "feature layout: {} score columns, {} program columns, fitted on {} poses",
            spec.names.len(),
            spec.programs.len(),
            rows.len()
        );
        Ok(Self::new(spec, normalizer, config))
    }

    pub fn build(&self, system: &LigandSystem) -> Result<PoseGraph, Error> {
        let n = system.pose_count();
        if n == 0 {
            return Err(Error::EmptySystem(system.id.clone()));
        }

        let width = self.spec.width();
        let mut features = Array2::<f64>::zeros((n, width));
        for (index, pose) in system.poses.iter().enumerate() {
            let mut row = self.spec.scores(&system.id, index, pose)?;
            self.normalizer.transform(&mut row)?;
            row.extend(self.spec.one_hot(&pose.program));
            for (k, value) in row.into_iter().enumerate() {
                features[[index, k]] = value;
            }
        }

        let labels = system
            .poses
            .iter()
            .map(|p| p.is_correct(self.label_cutoff))
            .collect::<Option<Vec<bool>>>();

        Ok(PoseGraph {
            id: system.id.clone(),
            features,
            neighbors: self.neighbors(system)?,
            labels,
            pkd: system.pkd,
            programs: system.poses.iter().map(|p| p.program.clone()).collect(),
        })
    }

    /// Builds every system, stopping at the first failure.
    pub fn build_all(&self, dataset: &Dataset) -> Result<Vec<PoseGraph>, Error> {
        dataset.systems.iter().map(|s| self.build(s)).collect()
    }

    fn neighbors(&self, system: &LigandSystem) -> Result<Vec<Vec<usize>>, Error> {
        let n = system.pose_count();
        let mut distance = vec![vec![0.0; n]; n];
        for i in 0..n {
            for j in (i + 1)..n {
                let d = pose_rmsd(
                    &system.poses[i],
                    &system.poses[j],
                    self.edge.heavy_atoms_only,
                )
                .map_err(|source| Error::AtomMismatch {
                    system: system.id.clone(),
                    first: i,
                    second: j,
                    source,
                })?;
                distance[i][j] = d;
                distance[j][i] = d;
            }
        }
        Ok(connect(&distance, self.edge.cutoff, self.edge.max_neighbors))
    }
}

/// Thresholded, optionally k-capped, symmetric adjacency from a distance matrix.
fn connect(distance: &[Vec<f64>], cutoff: f64, max_neighbors: usize) -> Vec<Vec<usize>> {
    let n = distance.len();
    let mut adjacency = vec![vec![false; n]; n];

    for i in 0..n {
        let mut candidates: Vec<usize> = (0..n)
            .filter(|&j| j != i && distance[i][j] <= cutoff)
            .collect();
        if max_neighbors > 0 && candidates.len() > max_neighbors {
            candidates.sort_by(|&a, &b| distance[i][a].total_cmp(&distance[i][b]).then(a.cmp(&b)));
            candidates.truncate(max_neighbors);
        }
        for j in candidates {
            adjacency[i][j] = true;
            adjacency[j][i] = true;
        }
    }

    adjacency
        .iter()
        .map(|row| (0..n).filter(|&j| row[j]).collect())
        .collect()
}
