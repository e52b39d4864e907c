use std::io::{self, Write};
use std::sync::LazyLock;

const VERSION: &str = env!("CARGO_PKG_VERSION");

const BANNER_ART: &str = r#"
   ╔╦╗╔═╗╔═╗╦╔═╔╗ ╔═╗═╗ ╦  ┌─┐
    ║║║ ║║  ╠╩╗╠╩╗║ ║╔╩╦╝  ┌─┘
   ═╩╝╚═╝╚═╝╩ ╩╚═╝╚═╝╩ ╚═  └─┘

   ───────────────────────────────────────────────────────────
     Graph neural network rescoring of docking poses
   ───────────────────────────────────────────────────────────
   "#;

static BANNER_FOR_HELP: LazyLock<String> = LazyLock::new(|| format!("\n{BANNER_ART}"));

pub fn banner_for_help() -> &'static str {
    &BANNER_FOR_HELP
}

/// Prints the banner with the name of the running tool.
pub fn print_banner(tool: &str) {
    let mut stderr = io::stderr().lock();
    let _ = writeln!(stderr);
    let _ = writeln!(stderr, "{BANNER_ART}");
    let _ = writeln!(stderr, "   {tool:<51}v{VERSION}");
    let _ = writeln!(stderr);
}
