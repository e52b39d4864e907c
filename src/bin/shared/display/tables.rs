use std::collections::BTreeMap;
use std::io::{self, Write};

use dockbox2::{Dataset, EpochRecord, Metrics, SystemPrediction};

use crate::shared::text::{metric, truncate};

const INDENT: &str = "      ";

const BOX_INNER_WIDTH: usize = 62;
const SAFE_TABLE_WIDTH: usize = BOX_INNER_WIDTH - INDENT.len();

const MAX_ROWS: usize = 15;

pub fn print_dataset_summary(title: &str, dataset: &Dataset, label_cutoff: f64) {
    let with_pkd = dataset.systems.iter().filter(|s| s.pkd.is_some()).count();
    let with_correct = dataset
        .systems
        .iter()
        .filter(|s| s.has_correct_pose(label_cutoff) == Some(true))
        .count();

    let rows = vec![
        ("Systems", dataset.len().to_string()),
        ("Poses", dataset.pose_count().to_string()),
        ("Programs", dataset.programs().join(", ")),
        ("Score columns", dataset.feature_names().len().to_string()),
        ("With pKd", with_pkd.to_string()),
        ("With correct pose", with_correct.to_string()),
    ];

    print_kv_table(&mut io::stderr().lock(), title, &rows);
}

pub fn print_program_distribution(dataset: &Dataset) {
    let mut counts: BTreeMap<&str, usize> = BTreeMap::new();
    for pose in dataset.systems.iter().flat_map(|s| &s.poses) {
        *counts.entry(pose.program.as_str()).or_insert(0) += 1;
    }

    let mut sorted: Vec<(String, usize)> = counts
        .into_iter()
        .map(|(program, count)| (program.to_string(), count))
        .collect();
    sorted.sort_by(|a, b| b.1.cmp(&a.1));

    print_distribution_table(
        &mut io::stderr().lock(),
        "Poses per Program",
        &sorted,
        dataset.pose_count(),
    );
}

pub fn print_split_summary(train: &Dataset, val: &Dataset) {
    let total = train.len() + val.len();
    let share = |n: usize| {
        if total == 0 {
            0.0
        } else {
            100.0 * n as f64 / total as f64
        }
    };

    let rows = vec![
        (
            "Training",
            format!("{} systems ({:.1}%)", train.len(), share(train.len())),
        ),
        (
            "Validation",
            format!("{} systems ({:.1}%)", val.len(), share(val.len())),
        ),
        ("Training poses", train.pose_count().to_string()),
        ("Validation poses", val.pose_count().to_string()),
    ];

    print_kv_table(&mut io::stderr().lock(), "Split Summary", &rows);
}

pub fn print_metrics(title: &str, metrics: &Metrics) {
    let rows = vec![
        ("ROC AUC", metric(metrics.auc, 3)),
        (
            "Success rate",
            metrics
                .success_rate
                .map_or_else(|| "—".to_string(), |r| format!("{:.1} %", 100.0 * r)),
        ),
        ("Pearson r (pKd)", metric(metrics.pearson, 3)),
        ("RMSE (pKd)", metric(metrics.rmse, 3)),
    ];

    print_kv_table(&mut io::stderr().lock(), title, &rows);
}

/// The last epochs of a run; the epoch the model was kept from is starred.
pub fn print_history(history: &[EpochRecord], best_epoch: usize) {
    let mut out = io::stderr().lock();

    let _ = writeln!(out, "{INDENT}┌─ Training History ─┐");
    let _ = writeln!(out, "{INDENT}┌────────┬────────────┬────────────┬─────────┐");
    let _ = writeln!(out, "{INDENT}│ Epoch  │ Train loss │   Val loss │     AUC │");
    let _ = writeln!(out, "{INDENT}├────────┼────────────┼────────────┼─────────┤");

    let skipped = history.len().saturating_sub(MAX_ROWS);
    if skipped > 0 {
        let _ = writeln!(
            out,
            "{INDENT}│ {:<6} │ {:>10} │ {:>10} │ {:>7} │",
            "...",
            format!("({skipped})"),
            "",
            ""
        );
    }
    for record in &history[skipped..] {
        let marker = if record.epoch == best_epoch { "*" } else { " " };
        let _ = writeln!(
            out,
            "{INDENT}│ {:>5}{} │ {:>10.4} │ {:>10.4} │ {:>7} │",
            record.epoch,
            marker,
            record.train_loss,
            record.val_loss,
            metric(record.metrics.auc, 3)
        );
    }

    let _ = writeln!(out, "{INDENT}└────────┴────────────┴────────────┴─────────┘");
}

pub fn print_rankings(predictions: &[SystemPrediction]) {
    let mut out = io::stderr().lock();

    let _ = writeln!(out, "{INDENT}┌─ Top Poses ─┐");
    let _ = writeln!(out, "{INDENT}┌──────────────────┬──────┬─────────────┬────────┐");
    let _ = writeln!(out, "{INDENT}│ System           │ Pose │ Probability │    pKd │");
    let _ = writeln!(out, "{INDENT}├──────────────────┼──────┼─────────────┼────────┤");

    for prediction in predictions.iter().take(MAX_ROWS) {
        let probability = prediction
            .poses
            .get(prediction.top_pose)
            .map_or(0.0, |p| p.probability);
        let _ = writeln!(
            out,
            "{INDENT}│ {:<16} │ {:>4} │ {:>11.4} │ {:>6} │",
            truncate(&prediction.id, 16),
            prediction.top_pose,
            probability,
            metric(prediction.predicted_pkd, 2)
        );
    }
    if predictions.len() > MAX_ROWS {
        let _ = writeln!(
            out,
            "{INDENT}│ {:<16} │ {:>4} │ {:>11} │ {:>6} │",
            format!("({} more)", predictions.len() - MAX_ROWS),
            "",
            "",
            ""
        );
    }

    let _ = writeln!(out, "{INDENT}└──────────────────┴──────┴─────────────┴────────┘");
}

fn print_distribution_table(
    out: &mut impl Write,
    title: &str,
    data: &[(String, usize)],
    total: usize,
) {
    let name_w = 10usize;
    let count_w = 8usize;
    let sep_overhead = 6;
    let dist_w = SAFE_TABLE_WIDTH.saturating_sub(name_w + count_w + sep_overhead);
    let max_bar_width = dist_w.saturating_sub(8).min(20);

    let name_line = "─".repeat(name_w + 2);
    let count_line = "─".repeat(count_w + 2);
    let dist_line = "─".repeat(dist_w + 2);

    let _ = writeln!(
        out,
        "{INDENT}┌─ {} ─┐",
        truncate(title, SAFE_TABLE_WIDTH - 6)
    );
    let _ = writeln!(out, "{INDENT}┌{name_line}┬{count_line}┬{dist_line}┐");
    let _ = writeln!(
        out,
        "{INDENT}│ {:<name_w$} │ {:>count_w$} │ {:<dist_w$} │",
        "Program", "Poses", "Distribution"
    );
    let _ = writeln!(out, "{INDENT}├{name_line}┼{count_line}┼{dist_line}┤");

    for (name, count) in data.iter().take(MAX_ROWS) {
        let pct = if total == 0 {
            0.0
        } else {
            *count as f64 / total as f64 * 100.0
        };
        let dist_cell = format!("{}  {:>5.1}%", make_bar(pct, max_bar_width), pct);
        let _ = writeln!(
            out,
            "{INDENT}│ {:<name_w$} │ {:>count_w$} │ {:<dist_w$} │",
            truncate(name, name_w),
            count,
            dist_cell
        );
    }

    if data.len() > MAX_ROWS {
        let _ = writeln!(
            out,
            "{INDENT}│ {:<name_w$} │ {:>count_w$} │ {:<dist_w$} │",
            "...",
            "...",
            format!("({} more programs)", data.len() - MAX_ROWS)
        );
    }

    let _ = writeln!(out, "{INDENT}└{name_line}┴{count_line}┴{dist_line}┘");
}

fn print_kv_table(out: &mut impl Write, title: &str, rows: &[(&str, String)]) {
    let key_w = 18usize;
    let sep_overhead = 6;
    let val_w = SAFE_TABLE_WIDTH.saturating_sub(key_w + sep_overhead);

    let k_line = "─".repeat(key_w + 2);
    let v_line = "─".repeat(val_w + 2);

    let _ = writeln!(
        out,
        "{INDENT}┌─ {} ─┐",
        truncate(title, SAFE_TABLE_WIDTH - 6)
    );
    let _ = writeln!(out, "{INDENT}┌{k_line}┬{v_line}┐");
    for (key, val) in rows {
        let _ = writeln!(
            out,
            "{INDENT}│ {:<key_w$} │ {:>val_w$} │",
            truncate(key, key_w),
            truncate(val, val_w)
        );
    }
    let _ = writeln!(out, "{INDENT}└{k_line}┴{v_line}┘");
}

fn make_bar(pct: f64, max_width: usize) -> String {
    let filled = (((pct / 100.0) * max_width as f64).round() as usize).min(max_width);
    format!("{}{}", "█".repeat(filled), "░".repeat(max_width - filled))
}
