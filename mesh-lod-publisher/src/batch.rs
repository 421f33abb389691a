/// Batch publishing of every asset folder under an input root
use crate::asset::{SourceAsset, discover_asset_dirs};
use crate::config::PublisherConfig;
use crate::converter::{Obj2GltfConverter, PackageConverter};
use crate::error::{ConfigError, PersistenceError, PublishError, Result, ValidationError};
use crate::manifest::{Manifest, ManifestAssembler};
use crate::pipeline::{DerivedArtifact, LodPipeline};
use crate::simplifier::{MeshLabSimplifier, MeshSimplifier};
use constants::files::{
    INTERMEDIATE_EXTENSIONS, OUTPUT_ROOT_SUFFIX, PUBLISHED_DIR_NAME, TEMPLATE_FILE_NAME,
};
use indicatif::{ProgressBar, ProgressStyle};
use rayon::prelude::*;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::time::{Instant, SystemTime, UNIX_EPOCH};
use tracing::{debug, error, info, warn};

/// What happened to one asset directory.
#[derive(Debug)]
pub enum AssetOutcome {
    Published {
        name: String,
        manifest: PathBuf,
        artifacts: Vec<DerivedArtifact>,
    },
    /// The output directory already existed; nothing was touched.
    AlreadyPublished { name: String },
    /// The directory is not a usable asset.
    Skipped { dir: PathBuf, reason: ValidationError },
    /// Derivation or persistence failed; the output directory was removed.
    Failed { name: String, error: PublishError },
}

/// Summary of a batch run.
#[derive(Debug)]
pub struct BatchReport {
    pub output_root: PathBuf,
    pub outcomes: Vec<AssetOutcome>,
}

impl BatchReport {
    pub fn published(&self) -> usize {
        self.count(|o| matches!(o, AssetOutcome::Published { .. }))
    }

    pub fn already_published(&self) -> usize {
        self.count(|o| matches!(o, AssetOutcome::AlreadyPublished { .. }))
    }

    pub fn skipped(&self) -> usize {
        self.count(|o| matches!(o, AssetOutcome::Skipped { .. }))
    }

    pub fn failed(&self) -> usize {
        self.count(|o| matches!(o, AssetOutcome::Failed { .. }))
    }

    fn count(&self, predicate: impl Fn(&AssetOutcome) -> bool) -> usize {
        self.outcomes.iter().filter(|o| predicate(o)).count()
    }
}

/// Drives discovery, per-asset derivation, manifest persistence and cleanup.
/// Assets are isolated from each other: one asset's failure never stops the batch.
pub struct BatchDriver {
    config: PublisherConfig,
    simplifier: Box<dyn MeshSimplifier>,
    converter: Box<dyn PackageConverter>,
}

impl BatchDriver {
    /// Driver backed by MeshLab and obj2gltf as configured.
    pub fn new(config: PublisherConfig) -> Self {
        let timeout = config.tool_timeout();
        let simplifier = MeshLabSimplifier::new(
            &config.simplifier_program,
            config.tool_path.as_deref(),
            timeout,
        );
        let converter = Obj2GltfConverter::new(
            &config.converter_program,
            config.tool_path.as_deref(),
            timeout,
        );
        Self::with_tools(config, Box::new(simplifier), Box::new(converter))
    }

    pub fn with_tools(
        config: PublisherConfig,
        simplifier: Box<dyn MeshSimplifier>,
        converter: Box<dyn PackageConverter>,
    ) -> Self {
        Self {
            config,
            simplifier,
            converter,
        }
    }

    pub fn config(&self) -> &PublisherConfig {
        &self.config
    }

    /// Publishes `input_root` into a fresh timestamped output root created
    /// next to it, under `published/`.
    /// Configuration and template problems are reported before anything is created.
    pub fn run(&self, input_root: &Path) -> Result<BatchReport> {
        let input_root = canonical_input_root(input_root)?;
        let template = self.load_template(&input_root)?;
        let output_root = create_output_root(&input_root)?;
        self.publish(&input_root, &output_root, &template)
    }

    /// Publishes `input_root` into an existing or new output root.
    /// Assets whose output directory already exists are left alone.
    pub fn publish_into(&self, input_root: &Path, output_root: &Path) -> Result<BatchReport> {
        let input_root = canonical_input_root(input_root)?;
        let template = self.load_template(&input_root)?;
        fs::create_dir_all(output_root).map_err(|source| ConfigError::OutputRoot {
            path: output_root.to_path_buf(),
            source,
        })?;
        self.publish(&input_root, output_root, &template)
    }

    /// Loads the template from the input root and checks it against the tiers.
    fn load_template(&self, input_root: &Path) -> Result<Manifest> {
        self.config.validate()?;
        let template = Manifest::load(&input_root.join(TEMPLATE_FILE_NAME))?;
        template.validate_tiers(&self.config.tiers)?;
        Ok(template)
    }

    fn publish(
        &self,
        input_root: &Path,
        output_root: &Path,
        template: &Manifest,
    ) -> Result<BatchReport> {
        info!(
            "Publishing {} into {}",
            input_root.display(),
            output_root.display()
        );
        let start_time = Instant::now();

        let asset_dirs = discover_asset_dirs(input_root)?;
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(self.config.worker_count())
            .build()
            .map_err(ConfigError::from)?;

        let pb = ProgressBar::new(asset_dirs.len() as u64);
        pb.set_style(
            ProgressStyle::default_bar()
                .template("[{bar:40.green/blue}] {pos}/{len} assets ({percent}%) {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_bar())
                .progress_chars("█▉▊▋▌▍▎▏"),
        );
        pb.set_message("Publishing assets");

        let outcomes: Vec<AssetOutcome> = pool.install(|| {
            asset_dirs
                .par_iter()
                .map(|dir| {
                    let outcome = self.publish_asset(dir, output_root, template);
                    pb.inc(1);
                    outcome
                })
                .collect()
        });

        pb.finish_with_message("Assets processed");

        let report = BatchReport {
            output_root: output_root.to_path_buf(),
            outcomes,
        };
        info!(
            "Batch finished in {:.2}s: {} published, {} already published, {} skipped, {} failed",
            start_time.elapsed().as_secs_f64(),
            report.published(),
            report.already_published(),
            report.skipped(),
            report.failed()
        );
        Ok(report)
    }

    /// Validates, derives and persists one asset directory.
    fn publish_asset(&self, dir: &Path, output_root: &Path, template: &Manifest) -> AssetOutcome {
        let asset = match SourceAsset::resolve(dir, &self.config.texture_extensions) {
            Ok(asset) => asset,
            Err(reason) => {
                warn!("Skipping {}: {}", dir.display(), reason);
                return AssetOutcome::Skipped {
                    dir: dir.to_path_buf(),
                    reason,
                };
            }
        };

        // Creation is the claim on the asset: an existing directory means done.
        let output_dir = output_root.join(&asset.name);
        match fs::create_dir(&output_dir) {
            Ok(()) => {}
            Err(err) if err.kind() == ErrorKind::AlreadyExists => {
                info!("{} already published, skipping", asset.name);
                return AssetOutcome::AlreadyPublished { name: asset.name };
            }
            Err(source) => {
                let error = PersistenceError::Io {
                    path: output_dir,
                    source,
                };
                error!("{}: {}", asset.name, error);
                return AssetOutcome::Failed {
                    name: asset.name,
                    error: error.into(),
                };
            }
        }

        match self.derive_and_save(&asset, &output_dir, template) {
            Ok((manifest, artifacts)) => AssetOutcome::Published {
                name: asset.name,
                manifest,
                artifacts,
            },
            Err(error) => {
                error!("{} failed: {}", asset.name, error);
                if let Err(err) = fs::remove_dir_all(&output_dir) {
                    warn!("Failed to remove {}: {}", output_dir.display(), err);
                }
                AssetOutcome::Failed {
                    name: asset.name,
                    error,
                }
            }
        }
    }

    fn derive_and_save(
        &self,
        asset: &SourceAsset,
        output_dir: &Path,
        template: &Manifest,
    ) -> Result<(PathBuf, Vec<DerivedArtifact>)> {
        let mut assembler = ManifestAssembler::new(template);
        let output = LodPipeline::new(
            &self.config.tiers,
            self.simplifier.as_ref(),
            self.converter.as_ref(),
        )
        .run(asset, output_dir, &mut assembler)?;

        let manifest = assembler.save(output_dir, &self.config.tiers)?;
        purge_intermediates(output_dir)?;
        Ok((manifest, output.artifacts))
    }
}

fn canonical_input_root(input_root: &Path) -> Result<PathBuf> {
    let canonical = input_root
        .canonicalize()
        .map_err(|_| ConfigError::InputNotFound(input_root.to_path_buf()))?;
    if !canonical.is_dir() {
        return Err(ConfigError::InputNotFound(input_root.to_path_buf()).into());
    }
    Ok(canonical)
}

/// Creates `<parent>/published/<unix micros>_Output_GlTF`.
/// The output root is never inside the input root.
fn create_output_root(input_root: &Path) -> Result<PathBuf> {
    let parent = input_root
        .parent()
        .ok_or_else(|| ConfigError::NoOutputParent(input_root.to_path_buf()))?;
    let published = parent.join(PUBLISHED_DIR_NAME);
    let output_err = |path: &Path| {
        let path = path.to_path_buf();
        move |source: std::io::Error| ConfigError::OutputRoot { path, source }
    };

    fs::create_dir_all(&published).map_err(output_err(&published))?;

    let stamp = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_micros())
        .unwrap_or_default();
    let output_root = published.join(format!("{}{}", stamp, OUTPUT_ROOT_SUFFIX));
    fs::create_dir(&output_root).map_err(output_err(&output_root))?;

    debug!("Created output root {}", output_root.display());
    Ok(output_root)
}

/// Deletes intermediate tier files, leaving packages and the manifest.
/// Returns the number of files removed.
pub fn purge_intermediates(output_dir: &Path) -> std::result::Result<usize, PersistenceError> {
    let io_err = |path: &Path| {
        let path = path.to_path_buf();
        move |source: std::io::Error| PersistenceError::Io { path, source }
    };

    let mut removed = 0;
    for entry in fs::read_dir(output_dir).map_err(io_err(output_dir))? {
        let path = entry.map_err(io_err(output_dir))?.path();
        let intermediate = path.is_file()
            && path
                .extension()
                .map(|ext| {
                    let ext = ext.to_string_lossy().to_lowercase();
                    INTERMEDIATE_EXTENSIONS.contains(&ext.as_str())
                })
                .unwrap_or(false);
        if intermediate {
            fs::remove_file(&path).map_err(io_err(&path))?;
            removed += 1;
        }
    }

    debug!("Purged {} intermediate files from {}", removed, output_dir.display());
    Ok(removed)
}
