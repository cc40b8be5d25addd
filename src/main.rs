use clap::Parser;
use tracing_subscriber::EnvFilter;

use mindmetric::cli::{self, Cli};
use mindmetric::config;

fn main() {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(config::default_log_filter())),
        )
        .init();

    tracing::debug!("Mindmetric starting v{}", config::APP_VERSION);

    let cli = Cli::parse();
    if let Err(e) = cli::run(cli) {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}
