use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("I/O operation failed: {source}")]
    Io {
        #[from]
        source: std::io::Error,
    },

    #[error("invalid model file: {0}")]
    Json(#[from] serde_json::Error),

    #[error("graph has {found} feature columns but the model expects {expected}")]
    InputWidth { expected: usize, found: usize },

    #[error("graph has {nodes} nodes but {lists} neighbor lists")]
    Adjacency { nodes: usize, lists: usize },

    #[error("graph '{0}' has no nodes")]
    EmptyGraph(String),

    #[error("parameter tensor {index} has shape {found:?}, expected {expected:?}")]
    ShapeMismatch {
        index: usize,
        expected: (usize, usize),
        found: (usize, usize),
    },

    #[error("model has {found} parameter tensors, expected {expected}")]
    TensorCount { expected: usize, found: usize },

    #[error("normalizer has {mean} means and {std} scales for {expected} feature columns")]
    NormalizerWidth {
        expected: usize,
        mean: usize,
        std: usize,
    },

    #[error("normalizer for feature '{column}' needs a finite mean and a positive scale")]
    NormalizerScale { column: String },

    #[error("model file carries invalid configuration: {0}")]
    Config(#[from] crate::config::Error),
}
