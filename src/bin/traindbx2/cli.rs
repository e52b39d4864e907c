use std::path::PathBuf;

use clap::{Args, Parser};

use dockbox2::DbxConfig;

use crate::shared::io::InputFormat;
use crate::shared::logging::LogOptions;

#[derive(Parser)]
#[command(
    name = "traindbx2",
    about = "Train a pose graph network on docked systems",
    version,
    before_help = crate::shared::display::banner_for_help()
)]
pub struct Cli {
    /// TOML configuration (defaults for every missing field)
    #[arg(short, long, value_name = "CONFIG")]
    pub config: Option<PathBuf>,

    /// Training dataset: a JSON file, an SDF file or a directory of SDF files
    #[arg(short, long, value_name = "TRAIN")]
    pub train: PathBuf,

    /// Validation dataset, monitored for model selection and early stopping
    #[arg(long, value_name = "VAL")]
    pub val: Option<PathBuf>,

    /// Dataset format (inferred from the extension if omitted)
    #[arg(long, value_name = "FORMAT")]
    pub infmt: Option<InputFormat>,

    /// Model bundle to write
    #[arg(short, long, value_name = "MODEL.json")]
    pub output: PathBuf,

    /// Per-epoch loss and metrics as CSV
    #[arg(long, value_name = "CSV")]
    pub history: Option<PathBuf>,

    #[command(flatten)]
    pub overrides: Overrides,

    #[command(flatten)]
    pub log: LogOptions,
}

/// Command-line values that take precedence over the configuration file.
#[derive(Args)]
#[command(next_help_heading = "Overrides")]
pub struct Overrides {
    /// Maximum number of epochs
    #[arg(long, value_name = "N")]
    pub epochs: Option<usize>,

    /// Optimizer learning rate
    #[arg(long, value_name = "LR")]
    pub learning_rate: Option<f64>,

    /// Seed for initialization and shuffling
    #[arg(long, value_name = "SEED")]
    pub seed: Option<u64>,
}

impl Overrides {
    pub fn apply(&self, config: &mut DbxConfig) {
        if let Some(epochs) = self.epochs {
            config.training.epochs = epochs;
        }
        if let Some(lr) = self.learning_rate {
            config.optimizer.learning_rate = lr;
        }
        if let Some(seed) = self.seed {
            config.training.seed = seed;
        }
    }
}

pub fn parse() -> Cli {
    Cli::parse()
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn command_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn overrides_replace_only_given_values() {
        let cli = Cli::try_parse_from([
            "traindbx2",
            "-t",
            "train.json",
            "-o",
            "model.json",
            "--epochs",
            "7",
            "--seed",
            "3",
        ])
        .expect("parse");

        let mut config = DbxConfig::default();
        cli.overrides.apply(&mut config);

        assert_eq!(config.training.epochs, 7);
        assert_eq!(config.training.seed, 3);
        assert_eq!(
            config.optimizer.learning_rate,
            DbxConfig::default().optimizer.learning_rate
        );
    }

    #[test]
    fn output_is_required() {
        assert!(Cli::try_parse_from(["traindbx2", "-t", "train.json"]).is_err());
    }
}
