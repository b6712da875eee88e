//! Path Defense - Development Tools

use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "td-tools")]
#[command(about = "Development tools for Path Defense")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate map catalogs
    Validate {
        /// Directory of RON map catalogs
        #[arg(default_value = "assets/maps")]
        path: String,
    },
}

fn main() {
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Validate { path } => {
            tracing::info!("Validating map catalogs in: {path}");
            match td_tools::validate::validate_maps_directory(std::path::Path::new(&path)) {
                Ok(report) if report.is_clean() => {
                    tracing::info!(
                        files = report.files,
                        maps = report.maps,
                        "Validation passed"
                    );
                }
                Ok(report) => {
                    for problem in &report.problems {
                        tracing::error!("{problem}");
                    }
                    tracing::error!(problems = report.problems.len(), "Validation failed");
                    std::process::exit(1);
                }
                Err(e) => {
                    tracing::error!("Validation failed: {e}");
                    std::process::exit(1);
                }
            }
        }
    }
}
