//! Graph neural network architecture settings.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Neighborhood aggregation used by every SAGE layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Aggregator {
    /// Average of neighbor embeddings.
    #[default]
    Mean,
    /// Element-wise max over a learned transform of neighbor embeddings.
    Maxpool,
    /// Attention-weighted sum over the neighborhood, self included.
    Attention,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Activation {
    #[default]
    Relu,
    LeakyRelu,
    Tanh,
    Linear,
}

/// Pooling of node embeddings into a graph embedding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Readout {
    #[default]
    Mean,
    Max,
}

impl fmt::Display for Aggregator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Aggregator::Mean => write!(f, "mean"),
            Aggregator::Maxpool => write!(f, "maxpool"),
            Aggregator::Attention => write!(f, "attention"),
        }
    }
}

impl fmt::Display for Activation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Activation::Relu => write!(f, "relu"),
            Activation::LeakyRelu => write!(f, "leaky_relu"),
            Activation::Tanh => write!(f, "tanh"),
            Activation::Linear => write!(f, "linear"),
        }
    }
}

impl fmt::Display for Readout {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Readout::Mean => write!(f, "mean"),
            Readout::Max => write!(f, "max"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GnnConfig {
    /// Number of SAGE layers.
    #[serde(default = "default_depth")]
    pub depth: usize,
    /// Width of every node embedding.
    #[serde(default = "default_hidden")]
    pub hidden: usize,
    #[serde(default)]
    pub aggregator: Aggregator,
    #[serde(default)]
    pub activation: Activation,
    /// L2-normalize node embeddings after each layer.
    #[serde(default = "default_normalize")]
    pub normalize: bool,
    #[serde(default)]
    pub readout: Readout,
    /// Width of the hidden layer of the affinity regressor.
    #[serde(default = "default_regressor_hidden")]
    pub regressor_hidden: usize,
}

fn default_depth() -> usize {
    2
}
fn default_hidden() -> usize {
    32
}
fn default_normalize() -> bool {
    true
}
fn default_regressor_hidden() -> usize {
    16
}

impl Default for GnnConfig {
    fn default() -> Self {
        Self {
            depth: default_depth(),
            hidden: default_hidden(),
            aggregator: Aggregator::default(),
            activation: Activation::default(),
            normalize: default_normalize(),
            readout: Readout::default(),
            regressor_hidden: default_regressor_hidden(),
        }
    }
}
