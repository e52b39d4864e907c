//! Graph neural network rescoring of docking poses.
//!
//! `dockbox2` treats the poses that one or more docking programs produce for
//! a ligand as the nodes of a graph, connecting poses that lie within an
//! RMSD cutoff of each other. A GraphSAGE network then scores every pose as
//! a correct or incorrect binding mode and, optionally, predicts the
//! system's binding affinity (pKd) from a pooled graph embedding.
//!
//! # Features
//!
//! - **Pose graphs** — Node features from docking scores (z-scored) and a
//!   one-hot docking program; edges from in-place pose–pose RMSD
//! - **GraphSAGE** — Mean, max-pool and attention aggregators with
//!   hand-derived gradients
//! - **Training** — Pos-weighted BCE plus pKd regression, Adam or SGD,
//!   seeded minibatches, early stopping
//! - **I/O** — JSON datasets, multi-record SDF poses, CSV reports and a
//!   single-file JSON model bundle
//!
//! # Quick Start
//!
//! ```
//! use dockbox2::{Atom, Dataset, DbxConfig, DbxModel, GraphBuilder, LigandSystem, Pose};
//! use dockbox2::{Predictor, SavedModel, Trainer};
//!
//! // Three poses of one ligand: two close to the crystal pose, one far away
//! let mut system = LigandSystem::new("1abc");
//! system.pkd = Some(6.8);
//! for (x, score, rmsd) in [(0.0, -9.1, 0.7), (0.6, -8.4, 1.5), (7.0, -6.2, 8.3)] {
//!     system.poses.push(
//!         Pose::new("vina")
//!             .with_feature("vina", score)
//!             .with_rmsd(rmsd)
//!             .with_atoms(vec![Atom::new("C", [x, 0.0, 0.0]), Atom::new("O", [x, 1.2, 0.0])]),
//!     );
//! }
//! let dataset = Dataset::new(vec![system]);
//!
//! let mut config = DbxConfig::default();
//! config.training.epochs = 5;
//!
//! let builder = GraphBuilder::fit(&config, &dataset)?;
//! let graphs = builder.build_all(&dataset)?;
//! assert_eq!(graphs[0].edge_count(), 1);
//!
//! let model = DbxModel::new(
//!     &config.gnn,
//!     builder.spec.width(),
//!     config.loss.task.predicts_affinity(),
//!     config.training.init_scale,
//!     config.training.seed,
//! );
//! let outcome = Trainer::new(&config, model).fit(&graphs, &[])?;
//! assert_eq!(outcome.history.len(), 5);
//!
//! let predictor = Predictor::new(SavedModel::new(&config, &builder, &outcome.model))?;
//! let prediction = predictor.predict_system(&dataset.systems[0])?;
//! assert_eq!(prediction.poses[prediction.top_pose].rank, 1);
//! assert!(prediction.predicted_pkd.is_some());
//! # Ok::<(), dockbox2::Error>(())
//! ```
//!
//! # Module Organization
//!
//! - [`io`] — Dataset, SDF and CSV reading and writing
//! - [`DbxConfig`] — TOML configuration of graphs, network and training
//! - [`GraphBuilder`] — Featurization of docked systems into [`PoseGraph`]s
//! - [`DbxModel`] / [`Trainer`] — Network, optimizers and training loop
//! - [`split`] — Stratified train/validation split by system
//! - [`Predictor`] — Pose ranking and affinity prediction from a [`SavedModel`]

mod config;
mod error;
mod gnn;
mod graph;
mod model;
mod predict;
mod split;
mod train;

pub mod io;

pub use error::Error;

pub use model::atom::{Atom, Bond};
pub use model::pose::Pose;
pub use model::system::{Dataset, LigandSystem};

pub use config::{
    Activation, Aggregator, DbxConfig, EdgeConfig, GnnConfig, LossConfig, NodeConfig,
    OptimizerConfig, OptimizerKind, Readout, Task, TrainingConfig,
};

pub use graph::{FeatureSpec, GraphBuilder, Normalizer, PoseGraph, RmsdError, pose_rmsd};

pub use gnn::{
    Adam, DbxModel, Forward, Optimizer, ParamKind, Params, SavedModel, Sgd, Upstream, VERSION,
    optimizer_from_config,
};

pub use train::{
    EpochRecord, Evaluation, GraphLoss, Metrics, Outcome, TrainOutcome, Trainer, evaluate,
    graph_loss, pearson, rmse, roc_auc, success_rate,
};

pub use split::{SplitConfig, Stratify, split, validation_count};

pub use predict::{
    PosePrediction, Predictor, SystemPrediction, ranks, summarize, write_ranked_sdf,
};

pub use config::Error as ConfigError;
pub use gnn::Error as GnnError;
pub use graph::Error as GraphError;
pub use split::Error as SplitError;
pub use train::Error as TrainError;
