//! Loss, optimizer and training loop settings.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Prediction targets the model is trained for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Task {
    /// Pose classification only.
    BindingMode,
    /// Affinity regression only.
    Affinity,
    #[default]
    Both,
}

impl Task {
    pub fn predicts_binding_mode(self) -> bool {
        matches!(self, Task::BindingMode | Task::Both)
    }

    pub fn predicts_affinity(self) -> bool {
        matches!(self, Task::Affinity | Task::Both)
    }
}

impl fmt::Display for Task {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Task::BindingMode => write!(f, "binding mode"),
            Task::Affinity => write!(f, "affinity"),
            Task::Both => write!(f, "binding mode + affinity"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LossConfig {
    #[serde(default)]
    pub task: Task,
    #[serde(default = "default_classification_weight")]
    pub classification_weight: f64,
    #[serde(default = "default_regression_weight")]
    pub regression_weight: f64,
    /// Weight of correct poses in the binary cross-entropy.
    #[serde(default = "default_pos_weight")]
    pub pos_weight: f64,
}

fn default_classification_weight() -> f64 {
    1.0
}
fn default_regression_weight() -> f64 {
    0.1
}
fn default_pos_weight() -> f64 {
    1.0
}

impl Default for LossConfig {
    fn default() -> Self {
        Self {
            task: Task::default(),
            classification_weight: default_classification_weight(),
            regression_weight: default_regression_weight(),
            pos_weight: default_pos_weight(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OptimizerKind {
    Sgd,
    #[default]
    Adam,
}

impl fmt::Display for OptimizerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OptimizerKind::Sgd => write!(f, "SGD"),
            OptimizerKind::Adam => write!(f, "Adam"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct OptimizerConfig {
    #[serde(default)]
    pub kind: OptimizerKind,
    #[serde(default = "default_learning_rate")]
    pub learning_rate: f64,
    /// L2 penalty applied to weight matrices (biases excluded).
    #[serde(default)]
    pub weight_decay: f64,
    #[serde(default = "default_beta1")]
    pub beta1: f64,
    #[serde(default = "default_beta2")]
    pub beta2: f64,
    #[serde(default = "default_epsilon")]
    pub epsilon: f64,
}

fn default_learning_rate() -> f64 {
    1e-3
}
fn default_beta1() -> f64 {
    0.9
}
fn default_beta2() -> f64 {
    0.999
}
fn default_epsilon() -> f64 {
    1e-8
}

impl Default for OptimizerConfig {
    fn default() -> Self {
        Self {
            kind: OptimizerKind::default(),
            learning_rate: default_learning_rate(),
            weight_decay: 0.0,
            beta1: default_beta1(),
            beta2: default_beta2(),
            epsilon: default_epsilon(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TrainingConfig {
    #[serde(default = "default_epochs")]
    pub epochs: usize,
    /// Graphs per optimizer step.
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
    /// Epochs without improvement before stopping (0 disables early stopping).
    #[serde(default)]
    pub patience: usize,
    #[serde(default = "default_seed")]
    pub seed: u64,
    /// Multiplier on the Glorot initialization range.
    #[serde(default = "default_init_scale")]
    pub init_scale: f64,
}

fn default_epochs() -> usize {
    100
}
fn default_batch_size() -> usize {
    8
}
fn default_seed() -> u64 {
    42
}
fn default_init_scale() -> f64 {
    1.0
}

impl Default for TrainingConfig {
    fn default() -> Self {
        Self {
            epochs: default_epochs(),
            batch_size: default_batch_size(),
            patience: 0,
            seed: default_seed(),
            init_scale: default_init_scale(),
        }
    }
}
