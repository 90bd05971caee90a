// Entrypoint for the CLI application.
// - Keeps `main` small: set up logging, parse arguments, run the command.
// - Any error is printed once and turns into exit status 1.

use std::io::IsTerminal;

use clap::Parser;
use fizzy_cli::cli::{self, Cli};
use fizzy_cli::ui;
use tracing_subscriber::EnvFilter;

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    if let Err(e) = cli::run(cli) {
        ui::error(&format!("{:#}", e));
        std::process::exit(1);
    }
}

/// Logs go to stderr so `--json` output stays clean. `FIZZY_LOG` takes
/// precedence over `-v`.
fn init_tracing(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_env("FIZZY_LOG").unwrap_or_else(|_| EnvFilter::new(level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_ansi(std::io::stderr().is_terminal())
        .with_target(false)
        .init();
}
