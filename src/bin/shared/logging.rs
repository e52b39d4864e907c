use log::LevelFilter;

/// Installs the `env_logger` backend.
///
/// `RUST_LOG` wins when set; otherwise the level follows the number of `-v`
/// flags, starting from warnings. `--quiet` keeps only errors.
pub fn init(verbose: u8, quiet: bool) {
    let level = if quiet {
        LevelFilter::Error
    } else {
        match verbose {
            0 => LevelFilter::Warn,
            1 => LevelFilter::Info,
            2 => LevelFilter::Debug,
            _ => LevelFilter::Trace,
        }
    };

    let mut builder = env_logger::Builder::new();
    builder.filter_level(level).format_timestamp(None);
    if let Ok(spec) = std::env::var("RUST_LOG") {
        builder.parse_filters(&spec);
    }
    let _ = builder.try_init();
}

/// Verbosity flags shared by every executable.
#[derive(clap::Args)]
#[command(next_help_heading = "Output")]
pub struct LogOptions {
    /// Suppress progress output (for scripting)
    #[arg(short, long)]
    pub quiet: bool,

    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,
}

impl LogOptions {
    pub fn init(&self) {
        init(self.verbose, self.quiet);
    }
}
