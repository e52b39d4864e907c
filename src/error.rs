use thiserror::Error;

/// Any failure raised by the library.
#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Io(#[from] crate::io::Error),

    #[error(transparent)]
    Config(#[from] crate::config::Error),

    #[error(transparent)]
    Graph(#[from] crate::graph::Error),

    #[error(transparent)]
    Model(#[from] crate::gnn::Error),

    #[error(transparent)]
    Train(#[from] crate::train::Error),

    #[error(transparent)]
    Split(#[from] crate::split::Error),
}
