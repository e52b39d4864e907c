use std::process::ExitCode;

use anyhow::{Context as _, Result};

use dockbox2::io::write_dataset;

mod cli;
#[path = "../shared/mod.rs"]
mod shared;

use shared::display::{self, Context, Progress};
use shared::io::load_dataset;

const TOTAL_STEPS: u8 = 3;

fn main() -> ExitCode {
    let cli = cli::parse();
    cli.log.init();

    let ctx = Context::detect().with_quiet(cli.log.quiet);
    if ctx.interactive {
        display::print_banner("Train/validation split");
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
    let config = cli.split.to_config();
    let mut progress = Progress::new(ctx.interactive, TOTAL_STEPS);

    progress.step("Reading dataset");
    let dataset = load_dataset(&cli.input, cli.infmt)?;
    progress.complete_step(
        "Reading dataset",
        &[format!("{} systems from {}", dataset.len(), cli.input.display())],
    );
    if ctx.interactive {
        display::print_dataset_summary("Dataset", &dataset, config.label_cutoff);
    }

    progress.step("Splitting systems");
    let (train, val) = dockbox2::split(&dataset, &config).context("Failed to split dataset")?;
    progress.complete_step(
        "Splitting systems",
        &[
            format!("stratify: {:?}", config.stratify),
            format!("seed: {}", config.seed),
        ],
    );
    if ctx.interactive {
        display::print_split_summary(&train, &val);
    }
    if val.is_empty() {
        log::warn!(
            "validation set is empty ({} systems, fraction {}); {} lists no systems",
            dataset.len(),
            config.val_fraction,
            cli.val.display()
        );
    }

    progress.step("Writing datasets");
    write_dataset(&cli.train, &train)
        .with_context(|| format!("Failed to write {}", cli.train.display()))?;
    write_dataset(&cli.val, &val)
        .with_context(|| format!("Failed to write {}", cli.val.display()))?;
    progress.complete_step(
        "Writing datasets",
        &[
            format!("train → {}", cli.train.display()),
            format!("val   → {}", cli.val.display()),
        ],
    );

    log::info!(
        "wrote {} training and {} validation systems",
        train.len(),
        val.len()
    );
    progress.finish("Split complete");
    Ok(())
}
