//! Graph neural network over pose graphs.
//!
//! Node embeddings come from a stack of GraphSAGE layers
//! ([`Aggregator`](crate::Aggregator) selects mean, max-pool or attention
//! aggregation). A linear head turns each final embedding into the logit of
//! the pose being a correct binding mode; when affinity is predicted, a
//! mean or max readout feeds a small MLP that outputs the system's pKd.
//!
//! Gradients are derived by hand in [`DbxModel::backward`] and checked
//! against finite differences in the tests.

mod activation;
mod bundle;
mod error;
mod model;
mod optim;
mod params;
mod sage;

pub use activation::{sigmoid, softplus};
pub use bundle::{SavedModel, VERSION};
pub use error::Error;
pub use model::{DbxModel, Forward, Upstream};
pub use optim::{Adam, Optimizer, Sgd, from_config as optimizer_from_config};
pub use params::{ParamKind, Params};
