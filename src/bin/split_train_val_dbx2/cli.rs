use std::path::PathBuf;

use clap::{Args, Parser, ValueEnum};

use dockbox2::{SplitConfig, Stratify};

use crate::shared::io::InputFormat;
use crate::shared::logging::LogOptions;

#[derive(Parser)]
#[command(
    name = "split_train_val_dbx2",
    about = "Split a docking dataset into training and validation systems",
    version,
    before_help = crate::shared::display::banner_for_help()
)]
pub struct Cli {
    /// Dataset: a JSON file, an SDF file or a directory of SDF files
    #[arg(short, long, value_name = "DATASET")]
    pub input: PathBuf,

    /// Dataset format (inferred from the extension if omitted)
    #[arg(long, value_name = "FORMAT")]
    pub infmt: Option<InputFormat>,

    /// JSON file receiving the training systems
    #[arg(long, value_name = "FILE")]
    pub train: PathBuf,

    /// JSON file receiving the validation systems
    #[arg(long, value_name = "FILE")]
    pub val: PathBuf,

    #[command(flatten)]
    pub split: SplitOptions,

    #[command(flatten)]
    pub log: LogOptions,
}

#[derive(Args)]
#[command(next_help_heading = "Split")]
pub struct SplitOptions {
    /// Fraction of systems placed in the validation set
    #[arg(long, value_name = "F", default_value = "0.2")]
    pub val_fraction: f64,

    /// Random seed for the shuffle
    #[arg(long, value_name = "SEED", default_value = "42")]
    pub seed: u64,

    /// Grouping kept balanced between the two sets
    #[arg(long, value_name = "MODE", default_value = "none")]
    pub stratify: StratifyMode,

    /// Number of pKd quantile bins (affinity stratification)
    #[arg(long, value_name = "N", default_value = "4")]
    pub bins: usize,

    /// RMSD (Å) at or below which a pose counts as correct
    #[arg(long, value_name = "Å", default_value = "2.0")]
    pub label_cutoff: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum StratifyMode {
    /// Plain random split
    None,
    /// Balance pKd quantile bins
    Affinity,
    /// Balance systems with and without a correct pose
    BindingMode,
}

impl SplitOptions {
    pub fn to_config(&self) -> SplitConfig {
        let stratify = match self.stratify {
            StratifyMode::None => Stratify::None,
            StratifyMode::Affinity => Stratify::Affinity { bins: self.bins },
            StratifyMode::BindingMode => Stratify::BindingMode,
        };
        SplitConfig {
            val_fraction: self.val_fraction,
            seed: self.seed,
            stratify,
            label_cutoff: self.label_cutoff,
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
    fn defaults_match_library_defaults() {
        let cli = Cli::try_parse_from([
            "split_train_val_dbx2",
            "-i",
            "all.json",
            "--train",
            "train.json",
            "--val",
            "val.json",
        ])
        .expect("parse");
        assert_eq!(cli.split.to_config(), SplitConfig::default());
    }

    #[test]
    fn affinity_stratification_takes_bins() {
        let cli = Cli::try_parse_from([
            "split_train_val_dbx2",
            "-i",
            "all.json",
            "--train",
            "t.json",
            "--val",
            "v.json",
            "--stratify",
            "affinity",
            "--bins",
            "3",
        ])
        .expect("parse");
        assert_eq!(cli.split.to_config().stratify, Stratify::Affinity { bins: 3 });
    }
}
