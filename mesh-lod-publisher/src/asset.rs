/// Source asset discovery and companion file validation
use crate::error::{CompanionKind, ConfigError, ValidationError};
use constants::files::{MATERIAL_EXTENSION, MESH_EXTENSION};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// A source directory holding one textured mesh.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceAsset {
    /// Source directory.
    pub dir: PathBuf,
    /// Filesystem-safe name used for the output directory and tier files.
    pub name: String,
    pub mesh: PathBuf,
    pub material: PathBuf,
    pub texture: PathBuf,
}

impl SourceAsset {
    /// Resolves the mesh, material and texture of an asset directory.
    /// Each kind must be present exactly once.
    pub fn resolve(dir: &Path, texture_extensions: &[String]) -> Result<Self, ValidationError> {
        let folder_name = dir
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();
        let name = output_dir_name(&folder_name)?;

        let files = visible_files(dir).map_err(|source| ValidationError::Unreadable {
            dir: dir.to_path_buf(),
            source,
        })?;
        let meshes = with_extensions(&files, &[MESH_EXTENSION]);
        let materials = with_extensions(&files, &[MATERIAL_EXTENSION]);
        let textures = with_extensions(&files, texture_extensions);

        let kinds = [
            (CompanionKind::Mesh, meshes),
            (CompanionKind::Material, materials),
            (CompanionKind::Texture, textures),
        ];

        // Report missing companions before ambiguous ones.
        for (kind, candidates) in &kinds {
            if candidates.is_empty() {
                return Err(ValidationError::MissingCompanion {
                    dir: dir.to_path_buf(),
                    kind: *kind,
                });
            }
        }

        let [mesh, material, texture] = kinds.map(|(kind, mut candidates)| {
            if candidates.len() > 1 {
                Err(ValidationError::AmbiguousCompanion {
                    dir: dir.to_path_buf(),
                    kind,
                    count: candidates.len(),
                })
            } else {
                Ok(candidates.remove(0))
            }
        });

        Ok(Self {
            dir: dir.to_path_buf(),
            name,
            mesh: mesh?,
            material: material?,
            texture: texture?,
        })
    }
}

/// Finds candidate asset directories directly under `root`.
/// A candidate is a non-hidden subdirectory containing at least one mesh file.
pub fn discover_asset_dirs(root: &Path) -> Result<Vec<PathBuf>, ConfigError> {
    let read_err = |source: std::io::Error| ConfigError::Read {
        path: root.to_path_buf(),
        source,
    };

    let mut candidates = Vec::new();
    for entry in fs::read_dir(root).map_err(read_err)? {
        let path = entry.map_err(read_err)?.path();
        if !path.is_dir() || is_hidden(&path) {
            continue;
        }

        match visible_files(&path) {
            Ok(files) if with_extensions(&files, &[MESH_EXTENSION]).is_empty() => {
                debug!("Ignoring {}: no mesh file", path.display());
                continue;
            }
            Ok(_) => {}
            // Kept as a candidate so validation reports the read error.
            Err(err) => warn!("Unable to list {}: {}", path.display(), err),
        }
        candidates.push(path);
    }

    candidates.sort();

    info!("Found {} candidate assets in {}", candidates.len(), root.display());
    for (i, candidate) in candidates.iter().enumerate() {
        debug!("  {}: {}", i, candidate.display());
    }

    Ok(candidates)
}

/// Strips every character that is not alphanumeric or an underscore.
/// Downstream converters reject spaces and punctuation in file names.
pub fn output_dir_name(folder_name: &str) -> Result<String, ValidationError> {
    let name: String = folder_name
        .chars()
        .filter(|c| c.is_alphanumeric() || *c == '_')
        .collect();

    if name.is_empty() {
        return Err(ValidationError::UnsafeName(folder_name.to_string()));
    }
    Ok(name)
}

fn is_hidden(path: &Path) -> bool {
    path.file_name()
        .map(|n| n.to_string_lossy().starts_with('.'))
        .unwrap_or(false)
}

/// Non-hidden regular files of a directory, sorted.
fn visible_files(dir: &Path) -> std::io::Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        if path.is_file() && !is_hidden(&path) {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

fn with_extensions<S: AsRef<str>>(files: &[PathBuf], extensions: &[S]) -> Vec<PathBuf> {
    files
        .iter()
        .filter(|path| {
            path.extension()
                .map(|ext| {
                    let ext = ext.to_string_lossy();
                    extensions
                        .iter()
                        .any(|wanted| ext.eq_ignore_ascii_case(wanted.as_ref()))
                })
                .unwrap_or(false)
        })
        .cloned()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PublisherConfig;

    fn touch(dir: &Path, name: &str) {
        fs::write(dir.join(name), b"").unwrap();
    }

    fn asset_dir(root: &Path, name: &str, files: &[&str]) -> PathBuf {
        let dir = root.join(name);
        fs::create_dir(&dir).unwrap();
        for file in files {
            touch(&dir, file);
        }
        dir
    }

    fn extensions() -> Vec<String> {
        PublisherConfig::default().texture_extensions
    }

    #[test]
    fn test_output_dir_name() {
        assert_eq!(output_dir_name("Old Chair (v2)").unwrap(), "OldChairv2");
        assert_eq!(output_dir_name("vase_01").unwrap(), "vase_01");
        assert!(matches!(
            output_dir_name("-- !"),
            Err(ValidationError::UnsafeName(_))
        ));
    }

    #[test]
    fn test_resolve_complete_asset() {
        let root = tempfile::tempdir().unwrap();
        let dir = asset_dir(
            root.path(),
            "Old Chair",
            &["chair.obj", "chair.mtl", "Chair.PNG", ".DS_Store", "notes.txt"],
        );

        let asset = SourceAsset::resolve(&dir, &extensions()).unwrap();
        assert_eq!(asset.name, "OldChair");
        assert_eq!(asset.mesh, dir.join("chair.obj"));
        assert_eq!(asset.material, dir.join("chair.mtl"));
        assert_eq!(asset.texture, dir.join("Chair.PNG"));
    }

    #[test]
    fn test_missing_material() {
        let root = tempfile::tempdir().unwrap();
        let dir = asset_dir(root.path(), "vase", &["vase.obj", "vase.jpg"]);

        let err = SourceAsset::resolve(&dir, &extensions()).unwrap_err();
        assert!(matches!(
            err,
            ValidationError::MissingCompanion {
                kind: CompanionKind::Material,
                ..
            }
        ));
    }

    #[test]
    fn test_missing_reported_before_ambiguous() {
        let root = tempfile::tempdir().unwrap();
        let dir = asset_dir(root.path(), "lamp", &["a.obj", "b.obj", "lamp.mtl"]);

        let err = SourceAsset::resolve(&dir, &extensions()).unwrap_err();
        assert!(matches!(
            err,
            ValidationError::MissingCompanion {
                kind: CompanionKind::Texture,
                ..
            }
        ));
    }

    #[test]
    fn test_ambiguous_texture() {
        let root = tempfile::tempdir().unwrap();
        let dir = asset_dir(
            root.path(),
            "lamp",
            &["lamp.obj", "lamp.mtl", "diffuse.png", "normal.jpg"],
        );

        let err = SourceAsset::resolve(&dir, &extensions()).unwrap_err();
        assert!(matches!(
            err,
            ValidationError::AmbiguousCompanion {
                kind: CompanionKind::Texture,
                count: 2,
                ..
            }
        ));
    }

    #[test]
    fn test_unlistable_directory_is_reported_as_unreadable() {
        let root = tempfile::tempdir().unwrap();
        let not_a_dir = root.path().join("chair");
        touch(root.path(), "chair");

        let err = SourceAsset::resolve(&not_a_dir, &extensions()).unwrap_err();
        assert!(matches!(err, ValidationError::Unreadable { dir, .. } if dir == not_a_dir));
    }

    #[test]
    fn test_discover_asset_dirs() {
        let root = tempfile::tempdir().unwrap();
        asset_dir(root.path(), "vase", &["vase.obj"]);
        asset_dir(root.path(), "chair", &["chair.OBJ", "chair.mtl"]);
        asset_dir(root.path(), "docs", &["readme.md"]);
        asset_dir(root.path(), ".cache", &["stale.obj"]);
        touch(root.path(), "loose.obj");
        touch(root.path(), ".svx.json");

        let dirs = discover_asset_dirs(root.path()).unwrap();
        assert_eq!(dirs, vec![root.path().join("chair"), root.path().join("vase")]);
    }

    #[test]
    fn test_discover_missing_root() {
        let root = tempfile::tempdir().unwrap();
        assert!(matches!(
            discover_asset_dirs(&root.path().join("absent")),
            Err(ConfigError::Read { .. })
        ));
    }
}
