use std::path::PathBuf;

use clap::Parser;

use crate::shared::io::InputFormat;
use crate::shared::logging::LogOptions;

#[derive(Parser)]
#[command(
    name = "rundbx2",
    about = "Rank docked poses and predict affinities with a trained model",
    version,
    before_help = crate::shared::display::banner_for_help()
)]
pub struct Cli {
    /// Model bundle written by traindbx2
    #[arg(short, long, value_name = "MODEL.json")]
    pub model: PathBuf,

    /// Dataset: a JSON file, an SDF file or a directory of SDF files
    #[arg(short, long, value_name = "DATASET")]
    pub input: PathBuf,

    /// Dataset format (inferred from the extension if omitted)
    #[arg(long, value_name = "FORMAT")]
    pub infmt: Option<InputFormat>,

    /// Per-pose probabilities and ranks as CSV (stdout when no output is given)
    #[arg(long, value_name = "CSV")]
    pub poses: Option<PathBuf>,

    /// Per-system top pose and predicted pKd as CSV
    #[arg(long, value_name = "CSV")]
    pub systems: Option<PathBuf>,

    /// Ranked poses of every system as SDF
    #[arg(long, value_name = "OUT.sdf")]
    pub sdf: Option<PathBuf>,

    /// Number of best poses per system written to --sdf (all if omitted)
    #[arg(long, value_name = "N", requires = "sdf")]
    pub top: Option<usize>,

    #[command(flatten)]
    pub log: LogOptions,
}

impl Cli {
    /// Pose CSV destination: the given path, stdout (`Some(None)`) when no
    /// output of any kind was requested, otherwise none.
    pub fn pose_target(&self) -> Option<Option<&std::path::Path>> {
        match (&self.poses, &self.systems, &self.sdf) {
            (Some(path), _, _) => Some(Some(path.as_path())),
            (None, None, None) => Some(None),
            _ => None,
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

    fn parse(args: &[&str]) -> Cli {
        let mut argv = vec!["rundbx2", "-m", "model.json", "-i", "data.json"];
        argv.extend_from_slice(args);
        Cli::try_parse_from(argv).expect("parse")
    }

    #[test]
    fn command_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn poses_go_to_stdout_without_outputs() {
        assert_eq!(parse(&[]).pose_target(), Some(None));
    }

    #[test]
    fn explicit_pose_file_wins() {
        let cli = parse(&["--poses", "p.csv", "--sdf", "out.sdf"]);
        assert_eq!(
            cli.pose_target(),
            Some(Some(std::path::Path::new("p.csv")))
        );
    }

    #[test]
    fn other_outputs_suppress_stdout() {
        assert_eq!(parse(&["--systems", "s.csv"]).pose_target(), None);
    }

    #[test]
    fn top_requires_sdf() {
        let argv = ["rundbx2", "-m", "m.json", "-i", "d.json", "--top", "3"];
        assert!(Cli::try_parse_from(argv).is_err());
    }
}
