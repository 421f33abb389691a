/// Viewer manifest model and per-asset manifest assembly
use crate::bounds::BoundingBox;
use crate::config::TierSpec;
use crate::error::{ConfigError, PersistenceError, PublishError};
use constants::files::MANIFEST_SUFFIX;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Voyager scene document. Only the fields the publisher writes are typed;
/// everything else in the template is carried through untouched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Manifest {
    #[serde(default)]
    pub models: Vec<ModelRecord>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// The published model: shared bounds plus one derivative per quality tier.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelRecord {
    #[serde(
        rename = "boundingBox",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub bounding_box: Option<BoundingBox>,
    #[serde(default)]
    pub derivatives: Vec<DerivativeRecord>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DerivativeRecord {
    pub quality: String,
    #[serde(default)]
    pub assets: Vec<AssetRecord>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssetRecord {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uri: Option<String>,
    #[serde(rename = "byteSize", default, skip_serializing_if = "Option::is_none")]
    pub byte_size: Option<u64>,
    #[serde(rename = "numFaces", default, skip_serializing_if = "Option::is_none")]
    pub num_faces: Option<u64>,
    #[serde(rename = "imageSize", default, skip_serializing_if = "Option::is_none")]
    pub image_size: Option<u32>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Manifest {
    /// Loads the manifest template from disk.
    /// A missing template is a configuration error.
    pub fn load(template_path: &Path) -> Result<Self, ConfigError> {
        if !template_path.is_file() {
            return Err(ConfigError::MissingTemplate(template_path.to_path_buf()));
        }

        let contents = fs::read_to_string(template_path).map_err(|source| ConfigError::Read {
            path: template_path.to_path_buf(),
            source,
        })?;

        let manifest: Manifest =
            serde_json::from_str(&contents).map_err(|source| ConfigError::TemplateParse {
                path: template_path.to_path_buf(),
                source,
            })?;

        debug!(
            "Loaded manifest template {} with {} derivatives",
            template_path.display(),
            manifest.derivatives().len()
        );
        Ok(manifest)
    }

    /// Checks that the template declares exactly one derivative, with an
    /// asset entry, for every configured tier.
    pub fn validate_tiers(&self, tiers: &[TierSpec]) -> Result<(), ConfigError> {
        if self.models.is_empty() {
            return Err(ConfigError::MissingModel);
        }

        for tier in tiers {
            let mut matching = self.derivatives().iter().filter(|d| d.quality == tier.name);
            let derivative = matching
                .next()
                .ok_or_else(|| ConfigError::TierNotInTemplate(tier.name.clone()))?;
            if matching.next().is_some() {
                return Err(ConfigError::DuplicateDerivative(tier.name.clone()));
            }
            if derivative.assets.is_empty() {
                return Err(ConfigError::DerivativeWithoutAsset(tier.name.clone()));
            }
        }

        Ok(())
    }

    pub fn derivatives(&self) -> &[DerivativeRecord] {
        self.models
            .first()
            .map(|m| m.derivatives.as_slice())
            .unwrap_or_default()
    }

    pub fn derivative(&self, quality: &str) -> Option<&DerivativeRecord> {
        self.derivatives().iter().find(|d| d.quality == quality)
    }

    pub fn bounding_box(&self) -> Option<BoundingBox> {
        self.models.first().and_then(|m| m.bounding_box)
    }

    /// Manifest path for an asset output directory: `<dir>/<dirname>.svx.json`.
    pub fn path_for(output_dir: &Path) -> PathBuf {
        let name = output_dir
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();
        output_dir.join(format!("{}{}", name, MANIFEST_SUFFIX))
    }
}

/// Owns one asset's copy of the manifest while its tiers are derived.
/// All mutation of the manifest goes through this type.
#[derive(Debug, Clone)]
pub struct ManifestAssembler {
    manifest: Manifest,
    updated: BTreeSet<String>,
    bounds_set: bool,
}

impl ManifestAssembler {
    pub fn new(template: &Manifest) -> Self {
        Self {
            manifest: template.clone(),
            updated: BTreeSet::new(),
            bounds_set: false,
        }
    }

    pub fn manifest(&self) -> &Manifest {
        &self.manifest
    }

    /// Records a packaged tier in the derivative whose quality equals `tier_name`.
    /// The byte size is read from disk; the uri is the artifact's file name.
    pub fn update(
        &mut self,
        tier_name: &str,
        artifact_path: &Path,
        face_count: u64,
        image_size: u32,
    ) -> Result<(), PublishError> {
        let byte_size = fs::metadata(artifact_path)
            .map_err(|source| PersistenceError::Io {
                path: artifact_path.to_path_buf(),
                source,
            })?
            .len();
        let uri = artifact_path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();

        let asset = self
            .manifest
            .models
            .first_mut()
            .and_then(|m| m.derivatives.iter_mut().find(|d| d.quality == tier_name))
            .ok_or_else(|| ConfigError::TierNotInTemplate(tier_name.to_string()))?
            .assets
            .first_mut()
            .ok_or_else(|| ConfigError::DerivativeWithoutAsset(tier_name.to_string()))?;

        asset.uri = Some(uri);
        asset.byte_size = Some(byte_size);
        asset.num_faces = Some(face_count);
        asset.image_size = Some(image_size);

        self.updated.insert(tier_name.to_string());
        debug!(
            "Manifest {}: {} bytes, {} faces, {}px",
            tier_name, byte_size, face_count, image_size
        );
        Ok(())
    }

    /// Stores the shared bounding box on the model record.
    pub fn update_bounds(&mut self, bounds: BoundingBox) -> Result<(), PublishError> {
        let model = self
            .manifest
            .models
            .first_mut()
            .ok_or(ConfigError::MissingModel)?;
        model.bounding_box = Some(bounds);
        self.bounds_set = true;
        Ok(())
    }

    /// Tiers (and the bounding box) not yet written by this assembler.
    pub fn missing(&self, tiers: &[TierSpec]) -> Vec<String> {
        let mut missing: Vec<String> = tiers
            .iter()
            .filter(|t| !self.updated.contains(&t.name))
            .map(|t| t.name.clone())
            .collect();
        if !self.bounds_set {
            missing.push("boundingBox".to_string());
        }
        missing
    }

    /// Writes `<output_dir>/<dirname>.svx.json`.
    /// Refuses to persist a manifest that is missing any configured tier.
    pub fn save(&self, output_dir: &Path, tiers: &[TierSpec]) -> Result<PathBuf, PublishError> {
        let missing = self.missing(tiers);
        if !missing.is_empty() {
            return Err(PersistenceError::Incomplete { missing }.into());
        }

        let manifest_path = Manifest::path_for(output_dir);
        let manifest_json =
            serde_json::to_string_pretty(&self.manifest).map_err(PersistenceError::from)?;
        fs::write(&manifest_path, manifest_json).map_err(|source| PersistenceError::Io {
            path: manifest_path.clone(),
            source,
        })?;

        info!("Generated manifest: {}", manifest_path.display());
        Ok(manifest_path)
    }
}
