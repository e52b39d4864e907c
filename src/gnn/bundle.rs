//! Self-contained model file: configuration, feature layout, normalizer
//! and trained parameters, stored as JSON.

use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::Path;

use serde::{Deserialize, Serialize};

use super::error::Error;
use super::model::DbxModel;
use super::params::Params;
use crate::config::DbxConfig;
use crate::graph::{FeatureSpec, GraphBuilder, Normalizer};

/// Version of this crate, written into every model file.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SavedModel {
    pub version: String,
    pub config: DbxConfig,
    pub features: FeatureSpec,
    pub normalizer: Normalizer,
    pub params: Params,
}

impl SavedModel {
    pub fn new(config: &DbxConfig, builder: &GraphBuilder, model: &DbxModel) -> Self {
        Self {
            version: VERSION.to_string(),
            config: config.clone(),
            features: builder.spec.clone(),
            normalizer: builder.normalizer.clone(),
            params: model.params.clone(),
        }
    }

    pub fn from_reader<R: Read>(reader: R) -> Result<Self, Error> {
        let saved: SavedModel = serde_json::from_reader(reader)?;
        if saved.version != VERSION {
            log::warn!(
                "model file was written by version {} (running {})",
                saved.version,
                VERSION
            );
        }
        Ok(saved)
    }

    pub fn to_writer<W: Write>(&self, writer: W) -> Result<(), Error> {
        serde_json::to_writer_pretty(writer, self)?;
        Ok(())
    }

    pub fn load(path: &Path) -> Result<Self, Error> {
        Self::from_reader(BufReader::new(File::open(path)?))
    }

    pub fn save(&self, path: &Path) -> Result<(), Error> {
        let mut writer = BufWriter::new(File::create(path)?);
        self.to_writer(&mut writer)?;
        writer.flush()?;
        Ok(())
    }

    /// Rebuilds the graph builder and network, validating the stored
    /// configuration and every parameter shape.
    pub fn into_parts(self) -> Result<(GraphBuilder, DbxModel), Error> {
        self.config.validate()?;
        check_normalizer(&self.features, &self.normalizer)?;
        let affinity = self.config.loss.task.predicts_affinity();
        let model = DbxModel::from_params(
            &self.config.gnn,
            self.features.width(),
            affinity,
            self.params,
        )?;
        let builder = GraphBuilder::new(self.features, self.normalizer, &self.config);
        Ok((builder, model))
    }
}

/// The normalizer must scale exactly the score columns, each by a usable factor.
fn check_normalizer(features: &FeatureSpec, normalizer: &Normalizer) -> Result<(), Error> {
    let expected = features.names.len();
    if normalizer.mean.len() != expected || normalizer.std.len() != expected {
        return Err(Error::NormalizerWidth {
            expected,
            mean: normalizer.mean.len(),
            std: normalizer.std.len(),
        });
    }

    let columns = features.names.iter().zip(&normalizer.mean).zip(&normalizer.std);
    for ((column, mean), std) in columns {
        if !mean.is_finite() || !std.is_finite() || *std <= 0.0 {
            return Err(Error::NormalizerScale {
                column: column.clone(),
            });
        }
    }
    Ok(())
}
