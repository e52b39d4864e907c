//! Configuration for pose graph construction, the network and training.
//!
//! A configuration is read from TOML. Every field carries a default, so an
//! empty document is a complete configuration:
//!
//! - [`DbxConfig`] — Root configuration, one table per concern
//! - [`NodeConfig`] / [`EdgeConfig`] — Pose graph featurization
//! - [`GnnConfig`] — Network architecture
//! - [`LossConfig`] / [`OptimizerConfig`] / [`TrainingConfig`] — Training
//!
//! # Examples
//!
//! ```
//! use dockbox2::{Aggregator, DbxConfig, Task};
//!
//! let config = DbxConfig::from_toml_str(
//!     r#"
//!     [gnn]
//!     aggregator = "attention"
//!
//!     [loss]
//!     task = "binding_mode"
//!     "#,
//! )?;
//!
//! assert_eq!(config.gnn.aggregator, Aggregator::Attention);
//! assert_eq!(config.loss.task, Task::BindingMode);
//! assert_eq!(config.gnn.depth, 2);
//! # Ok::<(), dockbox2::ConfigError>(())
//! ```

mod error;
mod graph;
mod network;
mod training;

pub use error::Error;
pub use graph::{EdgeConfig, NodeConfig};
pub use network::{Activation, Aggregator, GnnConfig, Readout};
pub use training::{LossConfig, OptimizerConfig, OptimizerKind, Task, TrainingConfig};

use std::path::Path;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DbxConfig {
    #[serde(default)]
    pub node: NodeConfig,
    #[serde(default)]
    pub edge: EdgeConfig,
    #[serde(default)]
    pub gnn: GnnConfig,
    #[serde(default)]
    pub loss: LossConfig,
    #[serde(default)]
    pub optimizer: OptimizerConfig,
    #[serde(default)]
    pub training: TrainingConfig,
}

impl DbxConfig {
    /// Parses and validates a TOML document.
    pub fn from_toml_str(text: &str) -> Result<Self, Error> {
        let config: DbxConfig = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Reads, parses and validates a TOML file.
    pub fn load(path: &Path) -> Result<Self, Error> {
        let text = std::fs::read_to_string(path).map_err(|source| Error::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&text)
    }

    pub fn validate(&self) -> Result<(), Error> {
        positive("node.label_cutoff", self.node.label_cutoff)?;
        positive("edge.cutoff", self.edge.cutoff)?;

        at_least_one("gnn.depth", self.gnn.depth)?;
        at_least_one("gnn.hidden", self.gnn.hidden)?;
        at_least_one("gnn.regressor_hidden", self.gnn.regressor_hidden)?;

        non_negative("loss.classification_weight", self.loss.classification_weight)?;
        non_negative("loss.regression_weight", self.loss.regression_weight)?;
        positive("loss.pos_weight", self.loss.pos_weight)?;

        let task = self.loss.task;
        let cls_active = task.predicts_binding_mode() && self.loss.classification_weight > 0.0;
        let reg_active = task.predicts_affinity() && self.loss.regression_weight > 0.0;
        if !cls_active && !reg_active {
            return Err(Error::invalid(
                "loss",
                format!("task '{task}' has no loss term with a positive weight"),
            ));
        }

        positive("optimizer.learning_rate", self.optimizer.learning_rate)?;
        non_negative("optimizer.weight_decay", self.optimizer.weight_decay)?;
        unit_interval("optimizer.beta1", self.optimizer.beta1)?;
        unit_interval("optimizer.beta2", self.optimizer.beta2)?;
        positive("optimizer.epsilon", self.optimizer.epsilon)?;

        at_least_one("training.batch_size", self.training.batch_size)?;
        positive("training.init_scale", self.training.init_scale)?;

        Ok(())
    }
}

fn positive(field: &'static str, value: f64) -> Result<(), Error> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(Error::invalid(field, format!("must be > 0 (got {value})")))
    }
}

fn non_negative(field: &'static str, value: f64) -> Result<(), Error> {
    if value.is_finite() && value >= 0.0 {
        Ok(())
    } else {
        Err(Error::invalid(field, format!("must be >= 0 (got {value})")))
    }
}

fn unit_interval(field: &'static str, value: f64) -> Result<(), Error> {
    if (0.0..1.0).contains(&value) {
        Ok(())
    } else {
        Err(Error::invalid(field, format!("must be in [0, 1) (got {value})")))
    }
}

fn at_least_one(field: &'static str, value: usize) -> Result<(), Error> {
    if value >= 1 {
        Ok(())
    } else {
        Err(Error::invalid(field, "must be at least 1"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_document_yields_defaults() {
        let config = DbxConfig::from_toml_str("").expect("parse");
        assert_eq!(config, DbxConfig::default());
        assert_eq!(config.node.label_cutoff, 2.0);
        assert_eq!(config.edge.cutoff, 2.0);
        assert!(config.edge.heavy_atoms_only);
        assert_eq!(config.gnn.aggregator, Aggregator::Mean);
        assert_eq!(config.gnn.activation, Activation::Relu);
        assert_eq!(config.loss.task, Task::Both);
        assert_eq!(config.optimizer.kind, OptimizerKind::Adam);
        assert_eq!(config.training.epochs, 100);
        assert_eq!(config.training.seed, 42);
    }

    #[test]
    fn partial_tables_keep_remaining_defaults() {
        let config = DbxConfig::from_toml_str(
            r#"
            [node]
            features = ["vina", "dock"]

            [edge]
            max_neighbors = 4

            [gnn]
            activation = "leaky_relu"
            readout = "max"

            [optimizer]
            kind = "sgd"
            learning_rate = 0.05
            "#,
        )
        .expect("parse");

        assert_eq!(config.node.features, vec!["vina", "dock"]);
        assert_eq!(config.edge.max_neighbors, 4);
        assert_eq!(config.edge.cutoff, 2.0);
        assert_eq!(config.gnn.activation, Activation::LeakyRelu);
        assert_eq!(config.gnn.readout, Readout::Max);
        assert_eq!(config.gnn.hidden, 32);
        assert_eq!(config.optimizer.kind, OptimizerKind::Sgd);
        assert_eq!(config.optimizer.learning_rate, 0.05);
    }

    #[test]
    fn unknown_keys_are_rejected() {
        let err = DbxConfig::from_toml_str("[gnn]\nlayers = 3\n").unwrap_err();
        assert!(matches!(err, Error::Parse(_)));
    }

    #[test]
    fn invalid_values_name_the_field() {
        let err = DbxConfig::from_toml_str("[gnn]\ndepth = 0\n").unwrap_err();
        assert!(matches!(err, Error::Invalid { field: "gnn.depth", .. }));

        let err = DbxConfig::from_toml_str("[optimizer]\nbeta2 = 1.0\n").unwrap_err();
        assert!(matches!(err, Error::Invalid { field: "optimizer.beta2", .. }));

        let err = DbxConfig::from_toml_str("[edge]\ncutoff = -1.0\n").unwrap_err();
        assert!(matches!(err, Error::Invalid { field: "edge.cutoff", .. }));
    }

    #[test]
    fn task_without_weighted_loss_is_rejected() {
        let err = DbxConfig::from_toml_str(
            "[loss]\ntask = \"affinity\"\nregression_weight = 0.0\n",
        )
        .unwrap_err();
        assert!(matches!(err, Error::Invalid { field: "loss", .. }));
    }

    #[test]
    fn missing_file_keeps_io_failure_as_cause() {
        let dir = tempfile::tempdir().expect("tempdir");
        let err = DbxConfig::load(&dir.path().join("absent.toml")).unwrap_err();

        assert!(matches!(err, Error::Read { .. }));
        let cause = std::error::Error::source(&err).expect("cause").to_string();
        assert!(!err.to_string().contains(&cause));
    }

    #[test]
    fn roundtrips_through_toml() {
        let mut config = DbxConfig::default();
        config.gnn.aggregator = Aggregator::Maxpool;
        config.node.programs = vec!["vina".into()];
        let text = toml::to_string(&config).expect("serialize");
        let parsed = DbxConfig::from_toml_str(&text).expect("parse");
        assert_eq!(parsed, config);
    }
}
