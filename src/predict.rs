//! Scoring and ranking the poses of unseen systems with a trained model.

use std::io::Write;
use std::path::Path;

use crate::error::Error;
use crate::gnn::{DbxModel, SavedModel};
use crate::graph::GraphBuilder;
use crate::io::{self, PoseRow, SystemRow};
use crate::model::system::{Dataset, LigandSystem};
use crate::train::{Metrics, Outcome};

#[derive(Debug, Clone, PartialEq)]
pub struct PosePrediction {
    /// Position of the pose in its system.
    pub index: usize,
    pub program: String,
    /// Probability that the pose is a correct binding mode.
    pub probability: f64,
    /// 1-based rank by descending probability.
    pub rank: usize,
    pub rmsd: Option<f64>,
    pub correct: Option<bool>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SystemPrediction {
    pub id: String,
    /// Predictions in input pose order.
    pub poses: Vec<PosePrediction>,
    /// Index of the rank-1 pose.
    pub top_pose: usize,
    pub predicted_pkd: Option<f64>,
    pub pkd: Option<f64>,
}

impl SystemPrediction {
    /// Poses sorted by rank.
    pub fn ranked(&self) -> Vec<&PosePrediction> {
        let mut ranked: Vec<_> = self.poses.iter().collect();
        ranked.sort_by_key(|p| p.rank);
        ranked
    }

    pub fn pose_rows(&self) -> Vec<PoseRow> {
        self.poses
            .iter()
            .map(|p| PoseRow {
                system: self.id.clone(),
                pose: p.index,
                program: p.program.clone(),
                probability: p.probability,
                rank: p.rank,
                rmsd: p.rmsd,
                correct: p.correct,
            })
            .collect()
    }

    pub fn system_row(&self) -> SystemRow {
        SystemRow {
            system: self.id.clone(),
            poses: self.poses.len(),
            top_pose: self.top_pose,
            top_probability: self
                .poses
                .get(self.top_pose)
                .map_or(0.0, |p| p.probability),
            predicted_pkd: self.predicted_pkd,
            pkd: self.pkd,
        }
    }

    fn outcome(&self) -> Outcome {
        Outcome {
            probabilities: self.poses.iter().map(|p| p.probability).collect(),
            labels: self.poses.iter().map(|p| p.correct).collect(),
            predicted_pkd: self.predicted_pkd,
            pkd: self.pkd,
        }
    }
}

/// Ranks from probabilities: descending, ties broken by pose index.
pub fn ranks(probabilities: &[f64]) -> Vec<usize> {
    let mut order: Vec<usize> = (0..probabilities.len()).collect();
    order.sort_by(|&a, &b| {
        probabilities[b]
            .total_cmp(&probabilities[a])
            .then(a.cmp(&b))
    });
    let mut ranks = vec![0; probabilities.len()];
    for (position, &index) in order.iter().enumerate() {
        ranks[index] = position + 1;
    }
    ranks
}

pub struct Predictor {
    builder: GraphBuilder,
    model: DbxModel,
}

impl Predictor {
    pub fn new(saved: SavedModel) -> Result<Self, Error> {
        let (builder, model) = saved.into_parts()?;
        Ok(Self { builder, model })
    }

    pub fn load(path: &Path) -> Result<Self, Error> {
        Self::new(SavedModel::load(path)?)
    }

    pub fn predicts_affinity(&self) -> bool {
        self.model.predicts_affinity()
    }

    pub fn predict_system(&self, system: &LigandSystem) -> Result<SystemPrediction, Error> {
        let graph = self.builder.build(system)?;
        let forward = self.model.forward(&graph)?;
        let ranks = ranks(&forward.probabilities);

        let poses: Vec<PosePrediction> = system
            .poses
            .iter()
            .zip(forward.probabilities.iter().zip(&ranks))
            .enumerate()
            .map(|(index, (pose, (&probability, &rank)))| PosePrediction {
                index,
                program: pose.program.clone(),
                probability,
                rank,
                rmsd: pose.rmsd,
                correct: pose.is_correct(self.builder.label_cutoff),
            })
            .collect();
        let top_pose = ranks.iter().position(|&r| r == 1).unwrap_or(0);

        Ok(SystemPrediction {
            id: system.id.clone(),
            poses,
            top_pose,
            predicted_pkd: forward.pkd,
            pkd: system.pkd,
        })
    }

    pub fn predict(&self, dataset: &Dataset) -> Result<Vec<SystemPrediction>, Error> {
        let predictions = dataset
            .systems
            .iter()
            .map(|s| self.predict_system(s))
            .collect::<Result<Vec<_>, _>>()?;
        log::info!("scored {} poses in {} systems", dataset.pose_count(), predictions.len());
        Ok(predictions)
    }
}

/// Training-style metrics over predictions; `None` when no system carries
/// any ground truth.
pub fn summarize(predictions: &[SystemPrediction]) -> Option<Metrics> {
    let outcomes: Vec<Outcome> = predictions.iter().map(SystemPrediction::outcome).collect();
    let metrics = Metrics::compute(&outcomes);
    (!metrics.is_empty()).then_some(metrics)
}

/// Writes the `top` best poses of `system` (all when `None`) in rank order,
/// tagging each with its probability, rank and predicted pKd.
pub fn write_ranked_sdf<W: Write>(
    mut writer: W,
    system: &LigandSystem,
    prediction: &SystemPrediction,
    top: Option<usize>,
) -> Result<(), io::Error> {
    let limit = top.unwrap_or(usize::MAX);
    // the measured affinity travels once per system, on its first record
    let mut pkd_item = system.pkd.map(|pkd| ("pkd".to_string(), pkd.to_string()));
    for pred in prediction.ranked().into_iter().take(limit) {
        let Some(pose) = system.poses.get(pred.index) else {
            continue;
        };
        let mut extra = Vec::with_capacity(4);
        extra.extend(pkd_item.take());
        extra.push(("dbx2_probability".to_string(), format!("{:.4}", pred.probability)));
        extra.push(("dbx2_rank".to_string(), pred.rank.to_string()));
        if let Some(pkd) = prediction.predicted_pkd {
            extra.push(("dbx2_pkd".to_string(), format!("{pkd:.3}")));
        }
        io::write_sdf_pose(&mut writer, &system.id, pose, &extra)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DbxConfig;
    use crate::model::{atom::Atom, pose::Pose};
    use std::io::Cursor;

    fn system() -> LigandSystem {
        let mut system = LigandSystem::new("1abc");
        system.pkd = Some(7.0);
        for (x, score, rmsd) in [(0.0, -9.0, 0.8), (0.5, -8.0, 1.9), (6.0, -5.0, 7.5)] {
            system.poses.push(
                Pose::new("vina")
                    .with_feature("vina", score)
                    .with_rmsd(rmsd)
                    .with_atoms(vec![
                        Atom::new("C", [x, 0.0, 0.0]),
                        Atom::new("N", [x, 1.4, 0.0]),
                    ]),
            );
        }
        system
    }

    fn predictor() -> Predictor {
        let config = DbxConfig::default();
        let dataset = Dataset::new(vec![system()]);
        let builder = GraphBuilder::fit(&config, &dataset).expect("fit");
        let model = DbxModel::new(&config.gnn, builder.spec.width(), true, 1.0, 3);
        Predictor::new(SavedModel::new(&config, &builder, &model)).expect("predictor")
    }

    #[test]
    fn ranks_break_ties_by_index() {
        assert_eq!(ranks(&[0.2, 0.9, 0.2, 0.5]), vec![3, 1, 4, 2]);
        assert!(ranks(&[]).is_empty());
    }

    #[test]
    fn prediction_ranks_every_pose() {
        let pred = predictor().predict_system(&system()).expect("predict");
        assert_eq!(pred.poses.len(), 3);

        let mut seen: Vec<usize> = pred.poses.iter().map(|p| p.rank).collect();
        seen.sort_unstable();
        assert_eq!(seen, vec![1, 2, 3]);
        assert_eq!(pred.poses[pred.top_pose].rank, 1);

        let ranked = pred.ranked();
        assert!(ranked.windows(2).all(|w| w[0].probability >= w[1].probability));
        assert_eq!(
            pred.poses.iter().map(|p| p.correct).collect::<Vec<_>>(),
            vec![Some(true), Some(true), Some(false)]
        );
        assert!(pred.predicted_pkd.is_some());
        assert_eq!(pred.system_row().poses, 3);
    }

    #[test]
    fn summarize_needs_ground_truth() {
        let p = predictor();
        let pred = p.predict_system(&system()).expect("predict");
        let metrics = summarize(std::slice::from_ref(&pred)).expect("metrics");
        assert!(metrics.auc.is_some());
        assert!(metrics.rmse.is_some());

        let mut unlabeled = system();
        unlabeled.pkd = None;
        for pose in &mut unlabeled.poses {
            pose.rmsd = None;
        }
        let pred = p.predict_system(&unlabeled).expect("predict");
        assert_eq!(summarize(&[pred]), None);
    }

    #[test]
    fn ranked_sdf_respects_top_limit() {
        let p = predictor();
        let sys = system();
        let pred = p.predict_system(&sys).expect("predict");

        let mut buf = Vec::new();
        write_ranked_sdf(&mut buf, &sys, &pred, Some(2)).expect("write");
        let records = io::read_sdf_records(Cursor::new(buf)).expect("read back");
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].data_item("dbx2_rank"), Some("1"));
        assert_eq!(records[1].data_item("dbx2_rank"), Some("2"));
    }

    #[test]
    fn ranked_sdf_reads_back_as_the_input_system() {
        let p = predictor();
        let sys = system();
        let pred = p.predict_system(&sys).expect("predict");

        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("1abc.sdf");
        let mut buf = Vec::new();
        write_ranked_sdf(&mut buf, &sys, &pred, None).expect("write");
        std::fs::write(&path, &buf).expect("save");

        let records = io::read_sdf_records(Cursor::new(buf)).expect("read back");
        assert_eq!(records[0].data_item("pkd"), Some("7"));
        assert_eq!(records[1].data_item("pkd"), None);

        let reread = io::read_sdf_system(&path).expect("read system");
        assert_eq!(reread.pkd, Some(7.0));
        assert_eq!(reread.pose_count(), 3);
        for pose in &reread.poses {
            let names: Vec<&str> = pose.features.iter().map(|(n, _)| n.as_str()).collect();
            assert_eq!(names, vec!["vina"]);
        }
        assert!(p.predict_system(&reread).is_ok());
    }
}
