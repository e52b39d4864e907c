//! Training and evaluation of [`DbxModel`](crate::gnn::DbxModel) on pose graphs.
//!
//! Each graph contributes a pos-weighted binary cross-entropy over its
//! poses (when RMSD labels exist) and a squared pKd error (when the model
//! predicts affinity and the system has a pKd). [`Trainer`] runs seeded
//! minibatch epochs and keeps the parameters with the lowest monitored loss.

mod error;
mod loss;
mod metrics;
mod trainer;

pub use error::Error;
pub use loss::{GraphLoss, graph_loss};
pub use metrics::{Metrics, Outcome, pearson, rmse, roc_auc, success_rate};
pub use trainer::{EpochRecord, Evaluation, TrainOutcome, Trainer, evaluate};
