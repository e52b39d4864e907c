use std::io::Write;
use std::path::Path;
use std::process::ExitCode;

use anyhow::{Context as _, Result};

use dockbox2::io::{PoseRow, SystemRow, write_pose_rows, write_system_rows};
use dockbox2::{Dataset, Predictor, SystemPrediction, summarize, write_ranked_sdf};

mod cli;
#[path = "../shared/mod.rs"]
mod shared;

use shared::display::{self, Context, Progress};
use shared::io::{create_output, load_dataset};

const TOTAL_STEPS: u8 = 4;

fn main() -> ExitCode {
    let cli = cli::parse();
    cli.log.init();

    let ctx = Context::detect().with_quiet(cli.log.quiet);
    if ctx.interactive {
        display::print_banner("Pose ranking");
    }

    match run(cli, ctx) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            display::print_error(&e);
            ExitCode::FAILURE
        }
    }
}

fn run(cli: cli::Cli, ctx: Context) -> Result<()> {
    let mut progress = Progress::new(ctx.interactive, TOTAL_STEPS);

    progress.step("Loading model");
    let predictor = Predictor::load(&cli.model)
        .with_context(|| format!("Failed to load model: {}", cli.model.display()))?;
    progress.complete_step(
        "Loading model",
        &[format!(
            "affinity head: {}",
            if predictor.predicts_affinity() { "yes" } else { "no" }
        )],
    );

    progress.step("Reading dataset");
    let dataset = load_dataset(&cli.input, cli.infmt)?;
    progress.complete_step(
        "Reading dataset",
        &[format!(
            "{} systems, {} poses",
            dataset.len(),
            dataset.pose_count()
        )],
    );

    progress.step("Scoring poses");
    let predictions = predictor.predict(&dataset).context("Scoring failed")?;
    progress.complete_step(
        "Scoring poses",
        &[format!("{} systems ranked", predictions.len())],
    );
    if ctx.interactive {
        display::print_rankings(&predictions);
    }
    if let Some(metrics) = summarize(&predictions) {
        log::info!(
            "auc={:?} success_rate={:?} pearson={:?} rmse={:?}",
            metrics.auc,
            metrics.success_rate,
            metrics.pearson,
            metrics.rmse
        );
        if ctx.interactive {
            display::print_metrics("Agreement with Reference", &metrics);
        }
    }

    progress.step("Writing results");
    let written = write_outputs(&cli, &dataset, &predictions)?;
    progress.complete_step("Writing results", &written);

    progress.finish("Ranking complete");
    Ok(())
}

fn write_outputs(
    cli: &cli::Cli,
    dataset: &Dataset,
    predictions: &[SystemPrediction],
) -> Result<Vec<String>> {
    let mut written = Vec::new();

    if let Some(target) = cli.pose_target() {
        let rows: Vec<PoseRow> = predictions
            .iter()
            .flat_map(SystemPrediction::pose_rows)
            .collect();
        let output = create_output(target)?;
        write_pose_rows(output, &rows).context("Failed to write pose report")?;
        written.push(format!("poses → {}", describe(target)));
    }

    if let Some(path) = &cli.systems {
        let rows: Vec<SystemRow> = predictions.iter().map(SystemPrediction::system_row).collect();
        let output = create_output(Some(path))?;
        write_system_rows(output, &rows).context("Failed to write system report")?;
        written.push(format!("systems → {}", path.display()));
    }

    if let Some(path) = &cli.sdf {
        let mut output = create_output(Some(path))?;
        for (system, prediction) in dataset.systems.iter().zip(predictions) {
            write_ranked_sdf(&mut output, system, prediction, cli.top)
                .with_context(|| format!("Failed to write poses of '{}'", system.id))?;
        }
        output.flush()?;
        written.push(format!("ranked poses → {}", path.display()));
    }

    Ok(written)
}

fn describe(target: Option<&Path>) -> String {
    target.map_or_else(|| "stdout".to_string(), |p| p.display().to_string())
}
