use std::io::{self, Write};

use anyhow::Error;

use dockbox2::io::Error as IoError;
use dockbox2::{ConfigError, Error as DbxError, GnnError, GraphError, SplitError, TrainError};

use crate::shared::text::wrap;

#[rustfmt::skip]
pub fn print_error(err: &Error) {
    let mut stderr = io::stderr().lock();

    let _ = writeln!(stderr);
    let _ = writeln!(stderr, "   ╔══════════════════════════════════════════════════════════════╗");
    let _ = writeln!(stderr, "   ║  ✗ Error                                                     ║");
    let _ = writeln!(stderr, "   ╟──────────────────────────────────────────────────────────────╢");

    for line in wrap(&err.to_string(), 59) {
        let _ = writeln!(stderr, "   ║  {:<59} ║", line);
    }

    for cause in err.chain().skip(1) {
        let _ = writeln!(stderr, "   ╟──────────────────────────────────────────────────────────────╢");
        let _ = writeln!(stderr, "   ║  Caused by:                                                  ║");
        for line in wrap(&cause.to_string(), 57) {
            let _ = writeln!(stderr, "   ║    {:<57} ║", line);
        }
    }

    if let Some(hints) = HintCollector::collect(err) {
        let _ = writeln!(stderr, "   ╟──────────────────────────────────────────────────────────────╢");
        let _ = writeln!(stderr, "   ║  Hints:                                                      ║");
        for hint in hints {
            let wrapped = wrap(&hint, 55);
            if let Some((first, rest)) = wrapped.split_first() {
                let _ = writeln!(stderr, "   ║    • {:<55} ║", first);
                for line in rest {
                    let _ = writeln!(stderr, "   ║      {:<55} ║", line);
                }
            }
        }
    }

    let _ = writeln!(stderr, "   ╚══════════════════════════════════════════════════════════════╝");
    let _ = writeln!(stderr);
}

struct HintCollector {
    hints: Vec<String>,
    has_typed_hints: bool,
}

impl HintCollector {
    fn collect(err: &Error) -> Option<Vec<String>> {
        let mut collector = Self {
            hints: Vec::new(),
            has_typed_hints: false,
        };

        // Library errors may sit below anyhow context, so walk the chain.
        for cause in err.chain() {
            if let Some(e) = cause.downcast_ref::<DbxError>() {
                collector.collect_library_hints(e);
            } else if let Some(e) = cause.downcast_ref::<IoError>() {
                collector.collect_io_hints(e);
            } else if let Some(e) = cause.downcast_ref::<ConfigError>() {
                collector.collect_config_hints(e);
            } else if let Some(e) = cause.downcast_ref::<GraphError>() {
                collector.collect_graph_hints(e);
            } else if let Some(e) = cause.downcast_ref::<GnnError>() {
                collector.collect_model_hints(e);
            } else if let Some(e) = cause.downcast_ref::<TrainError>() {
                collector.collect_train_hints(e);
            } else if let Some(e) = cause.downcast_ref::<SplitError>() {
                collector.collect_split_hints(e);
            } else {
                continue;
            }
            break;
        }

        if !collector.has_typed_hints {
            collector.collect_fallback_hints(err);
        }

        if collector.hints.is_empty() {
            None
        } else {
            Some(collector.hints)
        }
    }

    fn add(&mut self, hint: impl Into<String>) {
        self.hints.push(hint.into());
    }

    fn mark_typed(&mut self) {
        self.has_typed_hints = true;
    }

    fn collect_library_hints(&mut self, err: &DbxError) {
        match err {
            DbxError::Io(e) => self.collect_io_hints(e),
            DbxError::Config(e) => self.collect_config_hints(e),
            DbxError::Graph(e) => self.collect_graph_hints(e),
            DbxError::Model(e) => self.collect_model_hints(e),
            DbxError::Train(e) => self.collect_train_hints(e),
            DbxError::Split(e) => self.collect_split_hints(e),
        }
    }

    fn collect_io_hints(&mut self, err: &IoError) {
        self.mark_typed();

        match err {
            IoError::Io { source } => self.collect_std_io_hints(source),

            IoError::Json(_) => {
                self.add("The dataset must be a JSON object with a 'systems' array");
                self.add("Each system needs an 'id'; poses need a 'program'");
            }

            IoError::Csv(_) => {
                self.add("Check that the report path is writable");
            }

            IoError::Parse { line, .. } => {
                self.add(format!("Inspect the SDF file around line {line}"));
                self.add("Records must be V2000 molblocks terminated by '$$$$'");
                self.add("Score data items must hold a single number");
            }

            IoError::UnsupportedFormat(format) => {
                self.add(format!("{format} files cannot be read as datasets"));
                self.add("Supported dataset inputs: .json, .sdf or a directory of .sdf files");
            }

            IoError::UnknownFormat(_) => {
                self.add("The file extension does not name a dataset format");
                self.add("Pass --infmt json or --infmt sdf");
            }

            IoError::DuplicateSystem(id) => {
                self.add(format!("Rename or remove one of the '{id}' systems"));
                self.add("System ids must be unique within a dataset");
            }

            IoError::EmptyInput(_) => {
                self.add("A directory input must contain .sdf files, one per system");
            }
        }
    }

    fn collect_std_io_hints(&mut self, source: &std::io::Error) {
        use std::io::ErrorKind;

        match source.kind() {
            ErrorKind::NotFound => {
                self.add("File or directory not found");
                self.add("Check the path spelling and ensure the file exists");
            }

            ErrorKind::PermissionDenied => {
                self.add("Permission denied accessing the file");
                self.add("Check file permissions with `ls -la`");
            }

            ErrorKind::InvalidData | ErrorKind::UnexpectedEof => {
                self.add("File contains invalid or truncated data");
            }

            ErrorKind::BrokenPipe => {
                self.add("Output consumer terminated early");
                self.add("This may occur when piping to commands like `head`");
            }

            _ => {
                self.add("Check file path, permissions, and disk space");
            }
        }
    }

    fn collect_config_hints(&mut self, err: &ConfigError) {
        self.mark_typed();

        match err {
            ConfigError::Read { .. } => {
                self.add("Check that the configuration path passed with -c exists");
            }

            ConfigError::Parse(_) => {
                self.add("The configuration must be valid TOML");
                self.add("Allowed tables: node, edge, gnn, loss, optimizer, training");
                self.add("Unknown keys are rejected; check the spelling of each field");
            }

            ConfigError::Invalid { field, .. } => {
                self.add(format!("Fix the value of '{field}' in the configuration"));
                if *field == "loss" {
                    self.add("Give the selected task a positive loss weight");
                }
            }
        }
    }

    fn collect_graph_hints(&mut self, err: &GraphError) {
        self.mark_typed();

        match err {
            GraphError::EmptySystem(_) => {
                self.add("Every system needs at least one docked pose");
            }

            GraphError::MissingFeature { feature, .. } => {
                self.add(format!("Every pose must carry a '{feature}' score"));
                self.add("Restrict node.features to scores present on all poses");
            }

            GraphError::NonFiniteFeature { .. } => {
                self.add("Remove or rescore poses with NaN or infinite scores");
            }

            GraphError::AtomMismatch { .. } => {
                self.add("All poses of a system must list the same atoms in the same order");
                self.add("Set edge.heavy_atoms_only if poses differ only in hydrogens");
            }

            GraphError::NoFeatures => {
                self.add("Add docking scores to the poses or list node.programs");
            }

            GraphError::WidthMismatch { .. } => {
                self.add("The model file is inconsistent; retrain and save it again");
            }
        }
    }

    fn collect_model_hints(&mut self, err: &GnnError) {
        self.mark_typed();

        match err {
            GnnError::Io { source } => self.collect_std_io_hints(source),

            GnnError::Json(_) => {
                self.add("The model file is not a dockbox2 model bundle");
                self.add("Model bundles are written by traindbx2 -o <MODEL.json>");
            }

            GnnError::InputWidth { .. } => {
                self.add("The dataset's scores do not match those the model was trained on");
            }

            GnnError::ShapeMismatch { .. } | GnnError::TensorCount { .. } => {
                self.add("The parameters do not fit the stored architecture");
                self.add("The file may be truncated or edited by hand; retrain the model");
            }

            GnnError::Config(_) => {
                self.add("The configuration stored in the model file is invalid");
            }

            GnnError::NormalizerWidth { .. } | GnnError::NormalizerScale { .. } => {
                self.add("The stored feature normalizer is damaged; retrain the model");
            }

            GnnError::Adjacency { .. } | GnnError::EmptyGraph(_) => {
                self.add("Every system needs at least one docked pose");
            }
        }
    }

    fn collect_train_hints(&mut self, err: &TrainError) {
        self.mark_typed();

        match err {
            TrainError::EmptyTrainingSet => {
                self.add("The training dataset has no systems");
            }

            TrainError::NoLabels(task) => {
                self.add(format!("Task '{task}' needs reference values to learn from"));
                self.add("Binding mode labels come from pose 'rmsd' values");
                self.add("Affinity targets come from system 'pkd' values");
            }

            TrainError::Diverged(_) => {
                self.add("Lower --learning-rate or optimizer.learning_rate");
                self.add("Extreme docking scores can also destabilize training");
            }

            TrainError::Model(e) => self.collect_model_hints(e),
        }
    }

    fn collect_split_hints(&mut self, err: &SplitError) {
        self.mark_typed();

        match err {
            SplitError::InvalidFraction(_) => {
                self.add("--val-fraction must be at least 0 and below 1");
            }

            SplitError::NoBins => {
                self.add("Pass --bins with a value of at least 1");
            }

            SplitError::InvalidCutoff(_) => {
                self.add("--label-cutoff is an RMSD in Å and must be above 0");
            }
        }
    }

    fn collect_fallback_hints(&mut self, err: &Error) {
        let msg = error_chain_text(err);

        if msg.contains("no such file") || msg.contains("not found") {
            self.add("Check that the file path is correct");
            self.add("Verify the file exists and is readable");
            return;
        }

        if msg.contains("permission denied") {
            self.add("Check file permissions with `ls -la`");
            self.add("Ensure you have the required access rights");
        }
    }
}

fn error_chain_text(err: &Error) -> String {
    err.chain()
        .map(|cause| cause.to_string())
        .collect::<Vec<_>>()
        .join("\n")
        .to_lowercase()
}
