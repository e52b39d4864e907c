//! Node feature layout and z-score normalization.

use serde::{Deserialize, Serialize};

use super::error::Error;
use crate::config::NodeConfig;
use crate::model::pose::Pose;
use crate::model::system::Dataset;

const MIN_STD: f64 = 1e-12;

/// Ordered node feature columns: score names, then a program one-hot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureSpec {
    pub names: Vec<String>,
    pub programs: Vec<String>,
}

impl FeatureSpec {
    /// Uses the configured names when given, otherwise every score present
    /// in `dataset`.
    pub fn resolve(node: &NodeConfig, dataset: &Dataset) -> Result<Self, Error> {
        let names = if node.features.is_empty() {
            dataset.feature_names()
        } else {
            node.features.clone()
        };
        let spec = Self {
            names,
            programs: node.programs.clone(),
        };
        if spec.width() == 0 {
            return Err(Error::NoFeatures);
        }
        Ok(spec)
    }

    /// Number of input columns seen by the network.
    #[inline]
    pub fn width(&self) -> usize {
        self.names.len() + self.programs.len()
    }

    /// Raw score columns of one pose, in layout order.
    pub fn scores(&self, system: &str, index: usize, pose: &Pose) -> Result<Vec<f64>, Error> {
        self.names
            .iter()
            .map(|name| {
                let value = pose.feature(name).ok_or_else(|| Error::MissingFeature {
                    system: system.to_string(),
                    pose: index,
                    feature: name.clone(),
                })?;
                if !value.is_finite() {
                    return Err(Error::NonFiniteFeature {
                        system: system.to_string(),
                        pose: index,
                        feature: name.clone(),
                    });
                }
                Ok(value)
            })
            .collect()
    }

    /// One-hot program columns; unknown programs encode to zeros.
    pub fn one_hot(&self, program: &str) -> Vec<f64> {
        self.programs
            .iter()
            .map(|p| if p == program { 1.0 } else { 0.0 })
            .collect()
    }
}

/// Per-column z-scoring fitted on the training poses.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Normalizer {
    pub names: Vec<String>,
    pub mean: Vec<f64>,
    pub std: Vec<f64>,
}

impl Normalizer {
    /// Leaves every column unchanged.
    pub fn identity(names: &[String]) -> Self {
        Self {
            names: names.to_vec(),
            mean: vec![0.0; names.len()],
            std: vec![1.0; names.len()],
        }
    }

    /// Fits column means and population standard deviations. Columns that
    /// are constant keep a unit scale.
    pub fn fit(names: &[String], rows: &[Vec<f64>]) -> Result<Self, Error> {
        let width = names.len();
        if let Some(row) = rows.iter().find(|r| r.len() != width) {
            return Err(Error::WidthMismatch {
                expected: width,
                found: row.len(),
            });
        }
        if rows.is_empty() {
            return Ok(Self::identity(names));
        }

        let n = rows.len() as f64;
        let mut mean = vec![0.0; width];
        for row in rows {
            for (m, v) in mean.iter_mut().zip(row) {
                *m += v;
            }
        }
        mean.iter_mut().for_each(|m| *m /= n);

        let mut std = vec![0.0; width];
        for row in rows {
            for ((s, v), m) in std.iter_mut().zip(row).zip(&mean) {
                *s += (v - m).powi(2);
            }
        }
        for s in &mut std {
            *s = (*s / n).sqrt();
            if *s < MIN_STD {
                *s = 1.0;
            }
        }

        Ok(Self {
            names: names.to_vec(),
            mean,
            std,
        })
    }

    pub fn transform(&self, row: &mut [f64]) -> Result<(), Error> {
        if row.len() != self.mean.len() {
            return Err(Error::WidthMismatch {
                expected: self.mean.len(),
                found: row.len(),
            });
        }
        for ((v, m), s) in row.iter_mut().zip(&self.mean).zip(&self.std) {
            *v = (*v - m) / s;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::system::LigandSystem;

    fn names(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn resolve_prefers_configured_names() {
        let mut system = LigandSystem::new("s");
        system.poses.push(Pose::new("vina").with_feature("b", 1.0).with_feature("a", 2.0));
        let dataset = Dataset::new(vec![system]);

        let spec = FeatureSpec::resolve(&NodeConfig::default(), &dataset).expect("resolve");
        assert_eq!(spec.names, names(&["a", "b"]));

        let node = NodeConfig {
            features: names(&["b"]),
            programs: names(&["vina", "dock"]),
            ..NodeConfig::default()
        };
        let spec = FeatureSpec::resolve(&node, &dataset).expect("resolve");
        assert_eq!(spec.names, names(&["b"]));
        assert_eq!(spec.width(), 3);
        assert_eq!(spec.one_hot("dock"), vec![0.0, 1.0]);
        assert_eq!(spec.one_hot("glide"), vec![0.0, 0.0]);
    }

    #[test]
    fn resolve_without_any_columns_fails() {
        let dataset = Dataset::new(vec![LigandSystem::new("s")]);
        assert!(matches!(
            FeatureSpec::resolve(&NodeConfig::default(), &dataset),
            Err(Error::NoFeatures)
        ));
    }

    #[test]
    fn missing_score_is_reported_with_location() {
        let spec = FeatureSpec {
            names: names(&["vina"]),
            programs: Vec::new(),
        };
        let err = spec.scores("1abc", 3, &Pose::new("dock")).unwrap_err();
        assert!(matches!(
            err,
            Error::MissingFeature { ref system, pose: 3, ref feature } if system == "1abc" && feature == "vina"
        ));
    }

    #[test]
    fn normalizer_uses_population_std_and_guards_constant_columns() {
        let rows = vec![vec![1.0, 5.0], vec![3.0, 5.0]];
        let norm = Normalizer::fit(&names(&["x", "c"]), &rows).expect("fit");
        assert_eq!(norm.mean, vec![2.0, 5.0]);
        assert_eq!(norm.std, vec![1.0, 1.0]);

        let mut row = vec![3.0, 5.0];
        norm.transform(&mut row).expect("transform");
        assert_eq!(row, vec![1.0, 0.0]);
    }

    #[test]
    fn transform_rejects_wrong_width() {
        let norm = Normalizer::identity(&names(&["x"]));
        let mut row = vec![1.0, 2.0];
        assert!(matches!(
            norm.transform(&mut row),
            Err(Error::WidthMismatch { expected: 1, found: 2 })
        ));
    }
}
