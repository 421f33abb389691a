/// Command-line arguments for the publisher
use crate::config::PublisherConfig;
use clap::Parser;
use std::path::PathBuf;

/// Publishes folders of textured OBJ models as multi-resolution glTF
/// packages with a viewer manifest.
///
/// Output is written next to the input root, under
/// `published/<timestamp>_Output_GlTF`.
#[derive(Parser, Debug)]
#[command(name = "mesh-lod-publisher", version)]
pub struct CliArgs {
    /// Root folder containing one sub-folder per model and a `.svx.json` template.
    pub input: PathBuf,

    /// RON configuration file.
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Directory holding the external tools, prepended to PATH.
    #[arg(long)]
    pub tool_path: Option<PathBuf>,

    /// Number of models processed concurrently.
    #[arg(long)]
    pub workers: Option<usize>,

    /// Timeout for each external tool invocation, in seconds.
    #[arg(long)]
    pub timeout: Option<u64>,

    /// Log level (error, warn, info, debug, trace).
    #[arg(long)]
    pub log_level: Option<String>,
}

impl PublisherConfig {
    /// Apply CLI overrides to a loaded config.
    pub fn apply_cli_overrides(&mut self, args: &CliArgs) {
        if let Some(ref path) = args.tool_path {
            self.tool_path = Some(path.clone());
        }
        if let Some(workers) = args.workers {
            self.workers = workers;
        }
        if let Some(timeout) = args.timeout {
            self.tool_timeout_secs = timeout;
        }
        if let Some(ref level) = args.log_level {
            self.log_level = level.clone();
        }
    }
}
