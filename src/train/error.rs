use thiserror::Error;

use crate::config::Task;

#[derive(Debug, Error)]
pub enum Error {
    #[error("training set is empty")]
    EmptyTrainingSet,

    #[error("no training graph has targets for task '{0}' (missing RMSD or pKd values?)")]
    NoLabels(Task),

    #[error("parameters became non-finite during epoch {0} (try a smaller learning rate)")]
    Diverged(usize),

    #[error(transparent)]
    Model(#[from] crate::gnn::Error),
}
