/// Mesh LOD publisher main entry point
use clap::Parser;
use mesh_lod_publisher::batch::{AssetOutcome, BatchDriver};
use mesh_lod_publisher::cli::CliArgs;
use mesh_lod_publisher::config::PublisherConfig;
use mesh_lod_publisher::error::ConfigError;
use mesh_lod_publisher::logging::init_logging;
use std::process::ExitCode;
use tracing::{error, info, warn};

fn main() -> ExitCode {
    let args = CliArgs::parse();

    let config = match load_config(&args) {
        Ok(config) => config,
        Err(err) => {
            init_logging("info");
            error!("{}", err);
            return ExitCode::FAILURE;
        }
    };
    init_logging(&config.log_level);

    let driver = BatchDriver::new(config);
    let report = match driver.run(&args.input) {
        Ok(report) => report,
        Err(err) => {
            error!("{}", err);
            return ExitCode::FAILURE;
        }
    };

    for outcome in &report.outcomes {
        match outcome {
            AssetOutcome::Published { name, manifest, .. } => {
                info!("Published {} ({})", name, manifest.display())
            }
            AssetOutcome::AlreadyPublished { name } => info!("Already published {}", name),
            AssetOutcome::Skipped { dir, reason } => {
                warn!("Skipped {}: {}", dir.display(), reason)
            }
            AssetOutcome::Failed { name, error } => error!("Failed {}: {}", name, error),
        }
    }
    info!("Output: {}", report.output_root.display());

    ExitCode::SUCCESS
}

/// Reads the optional RON file, then applies command-line overrides.
fn load_config(args: &CliArgs) -> Result<PublisherConfig, ConfigError> {
    let mut config = match &args.config {
        Some(path) => PublisherConfig::load(path)?,
        None => PublisherConfig::default(),
    };
    config.apply_cli_overrides(args);
    config.validate()?;
    Ok(config)
}
