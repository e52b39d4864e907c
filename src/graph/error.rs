//! Error types for pose graph construction.

use thiserror::Error;

use super::rmsd::RmsdError;

/// Errors raised while turning docked systems into pose graphs.
#[derive(Debug, Error)]
pub enum Error {
    /// The system has no poses to build nodes from.
    #[error("system '{0}' has no poses")]
    EmptySystem(String),

    /// A pose lacks a score column the feature layout requires.
    #[error("pose {pose} of system '{system}' has no '{feature}' score")]
    MissingFeature {
        system: String,
        pose: usize,
        feature: String,
    },

    /// A score is NaN or infinite.
    #[error("pose {pose} of system '{system}' has a non-finite '{feature}' score")]
    NonFiniteFeature {
        system: String,
        pose: usize,
        feature: String,
    },

    /// Two poses of the same system cannot be compared atom by atom.
    #[error("cannot compare poses {first} and {second} of system '{system}'")]
    AtomMismatch {
        system: String,
        first: usize,
        second: usize,
        #[source]
        source: RmsdError,
    },

    /// No feature columns are available for the node layout.
    #[error("no node features selected (dataset has no scores and no programs are configured)")]
    NoFeatures,

    /// Normalizer and feature layout disagree on the number of columns.
    #[error("normalizer covers {expected} columns but {found} were given")]
    WidthMismatch { expected: usize, found: usize },
}
