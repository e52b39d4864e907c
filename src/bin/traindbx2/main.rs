use std::path::Path;
use std::process::ExitCode;

use anyhow::{Context as _, Result};

use dockbox2::io::{HistoryRow, write_history};
use dockbox2::{Dataset, DbxConfig, DbxModel, GraphBuilder, SavedModel, Trainer};

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
        display::print_banner("Model training");
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
    let config = load_config(&cli)?;
    let mut progress = Progress::new(ctx.interactive, TOTAL_STEPS);

    progress.step("Reading datasets");
    let train = load_dataset(&cli.train, cli.infmt)?;
    let val = match &cli.val {
        Some(path) => load_dataset(path, cli.infmt)?,
        None => Dataset::default(),
    };
    progress.complete_step(
        "Reading datasets",
        &[
            format!("train: {} systems, {} poses", train.len(), train.pose_count()),
            format!("val:   {} systems, {} poses", val.len(), val.pose_count()),
        ],
    );
    if ctx.interactive {
        display::print_dataset_summary("Training Set", &train, config.node.label_cutoff);
        display::print_program_distribution(&train);
    }

    progress.step("Building pose graphs");
    let builder = GraphBuilder::fit(&config, &train).context("Failed to featurize training set")?;
    let train_graphs = builder
        .build_all(&train)
        .context("Failed to build training graphs")?;
    let val_graphs = builder
        .build_all(&val)
        .context("Failed to build validation graphs")?;
    let edges: usize = train_graphs.iter().map(|g| g.edge_count()).sum();
    progress.complete_step(
        "Building pose graphs",
        &[
            format!("{} node features", builder.spec.width()),
            format!("{edges} training edges at {:.1} Å", config.edge.cutoff),
        ],
    );

    progress.step("Training");
    let model = DbxModel::new(
        &config.gnn,
        builder.spec.width(),
        config.loss.task.predicts_affinity(),
        config.training.init_scale,
        config.training.seed,
    );
    let parameters = model.params.count();
    let bar = progress.epochs(config.training.epochs);
    let outcome = Trainer::new(&config, model)
        .fit_with(&train_graphs, &val_graphs, |record| bar.record(record))
        .context("Training failed")?;
    bar.finish();
    progress.complete_step(
        "Training",
        &[
            format!("{} epochs, {parameters} parameters", outcome.history.len()),
            format!("best epoch: {}", outcome.best_epoch),
        ],
    );
    if ctx.interactive && !outcome.history.is_empty() {
        display::print_history(&outcome.history, outcome.best_epoch);
        if let Some(best) = outcome
            .history
            .iter()
            .find(|r| r.epoch == outcome.best_epoch)
        {
            display::print_metrics("Best Epoch Metrics", &best.metrics);
        }
    }

    progress.step("Writing model");
    SavedModel::new(&config, &builder, &outcome.model)
        .save(&cli.output)
        .with_context(|| format!("Failed to write model: {}", cli.output.display()))?;
    let mut written = vec![format!("model → {}", cli.output.display())];
    if let Some(path) = &cli.history {
        let rows: Vec<HistoryRow> = outcome.history.iter().map(HistoryRow::from).collect();
        write_csv_history(path, &rows)?;
        written.push(format!("history → {}", path.display()));
    }
    progress.complete_step("Writing model", &written);

    log::info!("saved model to {}", cli.output.display());
    progress.finish("Training complete");
    Ok(())
}

fn load_config(cli: &cli::Cli) -> Result<DbxConfig> {
    let mut config = match &cli.config {
        Some(path) => DbxConfig::load(path)?,
        None => DbxConfig::default(),
    };
    cli.overrides.apply(&mut config);
    config
        .validate()
        .context("Invalid value given on the command line")?;
    Ok(config)
}

fn write_csv_history(path: &Path, rows: &[HistoryRow]) -> Result<()> {
    let output = create_output(Some(path))?;
    write_history(output, rows)
        .with_context(|| format!("Failed to write history: {}", path.display()))
}
