/// Per-asset level-of-detail derivation
use crate::asset::SourceAsset;
use crate::bounds::{BoundingBox, measure_bounds, measure_mesh};
use crate::config::TierSpec;
use crate::converter::{ConvertRequest, PackageConverter};
use crate::error::{ConfigError, PersistenceError, Result};
use crate::manifest::ManifestAssembler;
use crate::material::{locate_material, rewrite_texture_reference};
use crate::simplifier::{MeshSimplifier, SimplifyRequest};
use crate::texture::resize_texture;
use constants::files::{MESH_EXTENSION, PACKAGE_EXTENSION, TIER_TEXTURE_EXTENSION};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{debug, info};

/// One packaged tier, recorded once the tier has fully completed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DerivedArtifact {
    pub tier: String,
    /// Packaged `.glb` file.
    pub path: PathBuf,
    pub byte_size: u64,
    /// Faces actually present in the simplified mesh.
    pub face_count: u64,
    pub image_size: u32,
}

/// Result of deriving every tier of one asset.
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineOutput {
    pub bounds: BoundingBox,
    pub artifacts: Vec<DerivedArtifact>,
}

/// Derives every configured tier of a source asset into an output directory.
/// Each tier starts from the source asset files, never from another tier.
pub struct LodPipeline<'a> {
    tiers: &'a [TierSpec],
    simplifier: &'a dyn MeshSimplifier,
    converter: &'a dyn PackageConverter,
}

impl<'a> LodPipeline<'a> {
    pub fn new(
        tiers: &'a [TierSpec],
        simplifier: &'a dyn MeshSimplifier,
        converter: &'a dyn PackageConverter,
    ) -> Self {
        Self {
            tiers,
            simplifier,
            converter,
        }
    }

    /// Runs all tiers in order, recording each into the manifest, then
    /// measures the shared bounding box from the first tier's mesh.
    /// The first failing step aborts the remaining tiers.
    pub fn run(
        &self,
        asset: &SourceAsset,
        output_dir: &Path,
        assembler: &mut ManifestAssembler,
    ) -> Result<PipelineOutput> {
        let first_tier = self.tiers.first().ok_or(ConfigError::NoTiers)?;
        let start_time = Instant::now();

        let mut artifacts = Vec::with_capacity(self.tiers.len());
        for tier in self.tiers {
            let artifact = self.derive_tier(asset, tier, output_dir)?;
            assembler.update(
                &artifact.tier,
                &artifact.path,
                artifact.face_count,
                artifact.image_size,
            )?;
            artifacts.push(artifact);
        }

        // Bounds come from the cheapest mesh; all tiers share the same extent.
        let first_mesh = tier_path(output_dir, &asset.name, first_tier, MESH_EXTENSION);
        let bounds = measure_bounds(&first_mesh)?;
        assembler.update_bounds(bounds)?;

        info!(
            "Derived {} tiers of {} in {:.2}s",
            artifacts.len(),
            asset.name,
            start_time.elapsed().as_secs_f64()
        );
        Ok(PipelineOutput { bounds, artifacts })
    }

    /// Simplify, resize, rewrite the material, then package one tier.
    fn derive_tier(
        &self,
        asset: &SourceAsset,
        tier: &TierSpec,
        output_dir: &Path,
    ) -> Result<DerivedArtifact> {
        info!(
            "{}: tier {} ({} faces, {}px)",
            asset.name, tier.name, tier.face_count, tier.resolution
        );

        let mesh_path = tier_path(output_dir, &asset.name, tier, MESH_EXTENSION);
        let image_path = tier_path(output_dir, &asset.name, tier, TIER_TEXTURE_EXTENSION);
        let package_path = tier_path(output_dir, &asset.name, tier, PACKAGE_EXTENSION);

        let simplified = self.simplifier.simplify(&SimplifyRequest {
            input: asset.mesh.clone(),
            output: mesh_path.clone(),
            target_faces: tier.face_count,
            preserve_boundary: true,
            preserve_texture: true,
        })?;
        if !simplified.diagnostics.is_empty() {
            debug!("Simplifier output:\n{}", simplified.diagnostics);
        }

        resize_texture(&asset.texture, &image_path, tier.resolution)?;

        let material_path = locate_material(&mesh_path)?;
        rewrite_texture_reference(&material_path, &image_path)?;

        self.converter
            .convert(&ConvertRequest::new(&mesh_path, &package_path))?;

        let measurement = measure_mesh(&mesh_path)?;
        let byte_size = fs::metadata(&package_path)
            .map_err(|source| PersistenceError::Io {
                path: package_path.clone(),
                source,
            })?
            .len();

        debug!(
            "{}: {} faces achieved for target {}",
            tier.name, measurement.face_count, tier.face_count
        );

        Ok(DerivedArtifact {
            tier: tier.name.clone(),
            path: package_path,
            byte_size,
            face_count: measurement.face_count,
            image_size: tier.resolution,
        })
    }
}

/// `<output_dir>/<asset>-<faces>-<resolution>-<suffix>.<extension>`
pub fn tier_path(
    output_dir: &Path,
    asset_name: &str,
    tier: &TierSpec,
    extension: &str,
) -> PathBuf {
    output_dir.join(format!("{}.{}", tier.file_stem(asset_name), extension))
}
