//! CSV reports for predictions and training history.

use std::io::Write;

use serde::Serialize;

use super::error::Error;

/// Per-pose prediction row.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PoseRow {
    pub system: String,
    pub pose: usize,
    pub program: String,
    pub probability: f64,
    pub rank: usize,
    pub rmsd: Option<f64>,
    pub correct: Option<bool>,
}

/// Per-system prediction row.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SystemRow {
    pub system: String,
    pub poses: usize,
    pub top_pose: usize,
    pub top_probability: f64,
    pub predicted_pkd: Option<f64>,
    pub pkd: Option<f64>,
}

/// One training epoch; absent metrics are written as empty cells.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HistoryRow {
    pub epoch: usize,
    pub train_loss: f64,
    pub val_loss: f64,
    pub val_auc: Option<f64>,
    pub val_success_rate: Option<f64>,
    pub val_pearson: Option<f64>,
    pub val_rmse: Option<f64>,
}

fn write_rows<W: Write, T: Serialize>(writer: W, rows: &[T]) -> Result<(), Error> {
    let mut csv = csv::Writer::from_writer(writer);
    for row in rows {
        csv.serialize(row)?;
    }
    csv.flush()?;
    Ok(())
}

pub fn write_pose_rows<W: Write>(writer: W, rows: &[PoseRow]) -> Result<(), Error> {
    write_rows(writer, rows)
}

pub fn write_system_rows<W: Write>(writer: W, rows: &[SystemRow]) -> Result<(), Error> {
    write_rows(writer, rows)
}

pub fn write_history<W: Write>(writer: W, rows: &[HistoryRow]) -> Result<(), Error> {
    write_rows(writer, rows)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pose_rows_have_header_and_empty_optional_cells() {
        let rows = vec![
            PoseRow {
                system: "1abc".into(),
                pose: 0,
                program: "vina".into(),
                probability: 0.75,
                rank: 1,
                rmsd: Some(1.5),
                correct: Some(true),
            },
            PoseRow {
                system: "1abc".into(),
                pose: 1,
                program: "dock".into(),
                probability: 0.25,
                rank: 2,
                rmsd: None,
                correct: None,
            },
        ];

        let mut buf = Vec::new();
        write_pose_rows(&mut buf, &rows).expect("write csv");
        let text = String::from_utf8(buf).expect("utf8");
        let lines: Vec<_> = text.lines().collect();

        assert_eq!(lines[0], "system,pose,program,probability,rank,rmsd,correct");
        assert_eq!(lines[1], "1abc,0,vina,0.75,1,1.5,true");
        assert_eq!(lines[2], "1abc,1,dock,0.25,2,,");
    }

    #[test]
    fn history_rows_serialize_missing_metrics_as_empty() {
        let rows = vec![HistoryRow {
            epoch: 3,
            train_loss: 0.5,
            val_loss: 0.625,
            val_auc: Some(0.875),
            val_success_rate: None,
            val_pearson: None,
            val_rmse: Some(1.25),
        }];

        let mut buf = Vec::new();
        write_history(&mut buf, &rows).expect("write csv");
        let text = String::from_utf8(buf).expect("utf8");
        assert_eq!(text.lines().nth(1), Some("3,0.5,0.625,0.875,,,1.25"));
    }
}
