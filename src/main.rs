use clap::Parser;
use std::process::ExitCode;
use taxon::cli::{Cli, run_cli};
use taxon::output::OutputFormatter;
use tracing_subscriber::EnvFilter;

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match run_cli(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            OutputFormatter::error(&format!("Error: {}", e));
            ExitCode::FAILURE
        }
    }
}

/// Diagnostics go to stderr. RUST_LOG takes precedence over -v.
fn init_tracing(verbose: u8) {
    let default_filter = match verbose {
        0 => "off",
        1 => "taxon=info",
        _ => "taxon=debug",
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter)),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}
