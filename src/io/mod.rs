//! Reading and writing docking datasets and prediction reports.
//!
//! Datasets come either as the native JSON serialization of [`Dataset`] or
//! as SDF files, one file per system and one record per pose, with docking
//! scores carried in SD data items. Reports are written as CSV.

use std::fmt;
use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::{Path, PathBuf};

pub mod error;
pub mod report;

mod sdf {
    pub mod reader;
    pub mod writer;
}

pub use error::Error;
pub use report::{
    HistoryRow, PoseRow, SystemRow, write_history, write_pose_rows, write_system_rows,
};
pub use sdf::reader::{SdfRecord, read_records as read_sdf_records};
pub use sdf::writer::write_pose as write_sdf_pose;

use crate::model::system::{Dataset, LigandSystem};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    Json,
    Sdf,
    Csv,
}

impl Format {
    /// Infers a format from a file extension.
    pub fn from_path(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?.to_lowercase();
        match ext.as_str() {
            "json" => Some(Format::Json),
            "sdf" | "sd" | "mol" => Some(Format::Sdf),
            "csv" => Some(Format::Csv),
            _ => None,
        }
    }
}

impl fmt::Display for Format {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Format::Json => write!(f, "JSON"),
            Format::Sdf => write!(f, "SDF"),
            Format::Csv => write!(f, "CSV"),
        }
    }
}

pub fn read_json<R: Read>(reader: R) -> Result<Dataset, Error> {
    let dataset: Dataset = serde_json::from_reader(reader)?;
    check_unique_ids(&dataset)?;
    Ok(dataset)
}

pub fn write_json<W: Write>(writer: W, dataset: &Dataset) -> Result<(), Error> {
    serde_json::to_writer_pretty(writer, dataset)?;
    Ok(())
}

/// Reads a single SDF file as one system named after the file stem.
pub fn read_sdf_system(path: &Path) -> Result<LigandSystem, Error> {
    let id = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let file = File::open(path)?;
    sdf::reader::read_system(BufReader::new(file), &id)
}

/// Reads a dataset from a JSON file, a single SDF file, or a directory of
/// SDF files (one system per file, sorted by file name).
///
/// `format` overrides extension-based detection for plain files. A JSON
/// file may list no systems, as written for an empty validation split; a
/// directory without SDF files is an error.
pub fn read_dataset(path: &Path, format: Option<Format>) -> Result<Dataset, Error> {
    let dataset = if path.is_dir() {
        let dataset = read_sdf_directory(path)?;
        if dataset.is_empty() {
            return Err(Error::EmptyInput(path.to_path_buf()));
        }
        dataset
    } else {
        let format = format
            .or_else(|| Format::from_path(path))
            .ok_or_else(|| Error::UnknownFormat(path.to_path_buf()))?;
        match format {
            Format::Json => read_json(BufReader::new(File::open(path)?))?,
            Format::Sdf => Dataset::new(vec![read_sdf_system(path)?]),
            Format::Csv => return Err(Error::UnsupportedFormat(format)),
        }
    };

    check_unique_ids(&dataset)?;
    Ok(dataset)
}

/// Writes a dataset as pretty-printed JSON.
pub fn write_dataset(path: &Path, dataset: &Dataset) -> Result<(), Error> {
    let mut writer = BufWriter::new(File::create(path)?);
    write_json(&mut writer, dataset)?;
    writer.flush()?;
    Ok(())
}

fn read_sdf_directory(dir: &Path) -> Result<Dataset, Error> {
    let mut paths: Vec<PathBuf> = fs::read_dir(dir)?
        .map(|entry| entry.map(|e| e.path()))
        .collect::<Result<_, _>>()?;
    paths.retain(|p| p.is_file() && Format::from_path(p) == Some(Format::Sdf));
    paths.sort();

    let systems = paths
        .iter()
        .map(|p| read_sdf_system(p))
        .collect::<Result<Vec<_>, _>>()?;

    log::debug!("read {} SDF systems from {}", systems.len(), dir.display());
    Ok(Dataset::new(systems))
}

fn check_unique_ids(dataset: &Dataset) -> Result<(), Error> {
    match dataset.find_duplicate_id() {
        Some(id) => Err(Error::DuplicateSystem(id.to_string())),
        None => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{atom::Atom, pose::Pose};
    use std::io::Cursor;

    fn sample_dataset() -> Dataset {
        let mut system = LigandSystem::new("1abc");
        system.pkd = Some(7.1);
        system.poses.push(
            Pose::new("vina")
                .with_feature("vina", -9.0)
                .with_rmsd(0.8)
                .with_atoms(vec![Atom::new("C", [0.0, 0.0, 0.0])]),
        );
        Dataset::new(vec![system])
    }

    #[test]
    fn infers_formats_from_extensions() {
        assert_eq!(Format::from_path(Path::new("a.JSON")), Some(Format::Json));
        assert_eq!(Format::from_path(Path::new("a.sdf")), Some(Format::Sdf));
        assert_eq!(Format::from_path(Path::new("a.csv")), Some(Format::Csv));
        assert_eq!(Format::from_path(Path::new("a.pdb")), None);
        assert_eq!(Format::from_path(Path::new("noext")), None);
    }

    #[test]
    fn json_dataset_roundtrip() {
        let dataset = sample_dataset();
        let mut buf = Vec::new();
        write_json(&mut buf, &dataset).expect("write json");
        let parsed = read_json(Cursor::new(buf)).expect("read json");
        assert_eq!(parsed, dataset);
    }

    #[test]
    fn json_defaults_missing_fields() {
        let text = r#"{"systems": [{"id": "x", "poses": [{"program": "dock"}]}]}"#;
        let parsed = read_json(Cursor::new(text)).expect("read json");
        let pose = &parsed.systems[0].poses[0];
        assert!(parsed.systems[0].pkd.is_none());
        assert!(pose.features.is_empty());
        assert!(pose.rmsd.is_none());
        assert!(pose.atoms.is_empty());
    }

    #[test]
    fn rejects_duplicate_system_ids() {
        let text = r#"{"systems": [{"id": "x"}, {"id": "x"}]}"#;
        let err = read_json(Cursor::new(text)).unwrap_err();
        assert!(matches!(err, Error::DuplicateSystem(id) if id == "x"));
    }

    #[test]
    fn reads_directory_of_sdf_files_sorted_by_name() {
        let dir = tempfile::tempdir().expect("tempdir");
        let pose = Pose::new("vina")
            .with_feature("vina", -6.0)
            .with_atoms(vec![Atom::new("C", [0.0, 0.0, 0.0])]);

        for name in ["b_sys", "a_sys"] {
            let file = File::create(dir.path().join(format!("{name}.sdf"))).expect("create");
            write_sdf_pose(file, name, &pose, &[]).expect("write");
        }
        fs::write(dir.path().join("notes.txt"), "ignored").expect("write notes");

        let dataset = read_dataset(dir.path(), None).expect("read dir");
        let ids: Vec<_> = dataset.systems.iter().map(|s| s.id.as_str()).collect();
        assert_eq!(ids, vec!["a_sys", "b_sys"]);
    }

    #[test]
    fn empty_directory_is_an_error() {
        let dir = tempfile::tempdir().expect("tempdir");
        let err = read_dataset(dir.path(), None).unwrap_err();
        assert!(matches!(err, Error::EmptyInput(_)));
    }

    #[test]
    fn empty_validation_split_reads_back() {
        let dir = tempfile::tempdir().expect("tempdir");
        let config = crate::split::SplitConfig::default();
        let (train, val) = crate::split::split(&sample_dataset(), &config).expect("split");
        assert!(val.is_empty());

        let train_path = dir.path().join("train.json");
        let val_path = dir.path().join("val.json");
        write_dataset(&train_path, &train).expect("write train");
        write_dataset(&val_path, &val).expect("write val");

        assert_eq!(read_dataset(&train_path, None).expect("read train").len(), 1);
        assert!(read_dataset(&val_path, None).expect("read val").is_empty());
    }

    #[test]
    fn csv_is_not_a_dataset_format() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("poses.csv");
        fs::write(&path, "system,pose\n").expect("write csv");

        assert!(matches!(
            read_dataset(&path, None).unwrap_err(),
            Error::UnsupportedFormat(Format::Csv)
        ));
    }

    #[test]
    fn unknown_extension_requires_explicit_format() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("data.txt");
        write_dataset(&path, &sample_dataset()).expect("write");

        assert!(matches!(
            read_dataset(&path, None).unwrap_err(),
            Error::UnknownFormat(_)
        ));
        let dataset = read_dataset(&path, Some(Format::Json)).expect("read with override");
        assert_eq!(dataset.len(), 1);
    }
}
