/// Publisher configuration with defaults and RON persistence
use crate::error::ConfigError;
use constants::files::TEXTURE_EXTENSIONS;
use constants::tiers::DEFAULT_TIERS;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// One quality level produced for every source asset.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TierSpec {
    /// Quality name, matched against the manifest derivative `quality`.
    pub name: String,
    /// Target face count handed to the simplifier.
    pub face_count: u32,
    /// Square texture resolution in pixels.
    pub resolution: u32,
    /// File name suffix; the lower-cased name when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub suffix: Option<String>,
}

impl TierSpec {
    pub fn new(name: &str, face_count: u32, resolution: u32) -> Self {
        Self {
            name: name.to_string(),
            face_count,
            resolution,
            suffix: None,
        }
    }

    pub fn suffix(&self) -> String {
        self.suffix
            .clone()
            .unwrap_or_else(|| self.name.to_lowercase())
    }

    /// File stem for this tier's outputs: `<asset>-<faces>-<resolution>-<suffix>`.
    pub fn file_stem(&self, asset_name: &str) -> String {
        format!(
            "{}-{}-{}-{}",
            asset_name,
            self.face_count,
            self.resolution,
            self.suffix()
        )
    }
}

/// Top-level publisher configuration.
/// Loaded once at startup and passed by reference into the batch driver.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct PublisherConfig {
    /// Directory prepended to PATH for the external tools.
    pub tool_path: Option<PathBuf>,
    /// Mesh simplifier executable.
    pub simplifier_program: String,
    /// Packaging converter executable.
    pub converter_program: String,
    /// Per-invocation timeout for external tools, in seconds.
    pub tool_timeout_secs: u64,
    /// Number of assets processed concurrently.
    pub workers: usize,
    /// Accepted source texture extensions.
    pub texture_extensions: Vec<String>,
    /// Log filter (e.g. "info", "debug,mesh_lod_publisher=trace").
    pub log_level: String,
    /// Ordered tier list. The first tier is used to measure bounds.
    pub tiers: Vec<TierSpec>,
}

impl Default for PublisherConfig {
    fn default() -> Self {
        Self {
            tool_path: None,
            simplifier_program: "meshlabserver".to_string(),
            converter_program: "obj2gltf".to_string(),
            tool_timeout_secs: 600,
            workers: 1,
            texture_extensions: TEXTURE_EXTENSIONS.iter().map(|e| e.to_string()).collect(),
            log_level: "info".to_string(),
            tiers: DEFAULT_TIERS
                .iter()
                .map(|t| TierSpec::new(t.name, t.face_count, t.resolution))
                .collect(),
        }
    }
}

impl PublisherConfig {
    /// Loads configuration from a RON file.
    /// Missing fields fall back to their defaults.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_ron(&contents).map_err(|source| ConfigError::ConfigParse {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn from_ron(contents: &str) -> Result<Self, ron::error::SpannedError> {
        ron::from_str(contents)
    }

    /// Rejects tier lists the pipeline cannot honour.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.tiers.is_empty() {
            return Err(ConfigError::NoTiers);
        }

        let mut seen = HashSet::new();
        let mut stems = HashSet::new();
        for tier in &self.tiers {
            if !seen.insert(tier.name.as_str()) {
                return Err(ConfigError::DuplicateTier(tier.name.clone()));
            }
            let suffix = tier.suffix();
            if suffix.is_empty() || !suffix.chars().all(is_file_name_char) {
                return Err(ConfigError::InvalidTier {
                    name: tier.name.clone(),
                    reason: "suffix must only contain letters, digits, '_' or '-'",
                });
            }
            // Compared case-insensitively, as on case-insensitive filesystems.
            if !stems.insert(tier.file_stem("").to_lowercase()) {
                return Err(ConfigError::InvalidTier {
                    name: tier.name.clone(),
                    reason: "file names collide with another tier",
                });
            }
            if tier.face_count == 0 {
                return Err(ConfigError::InvalidTier {
                    name: tier.name.clone(),
                    reason: "face count must be positive",
                });
            }
            if tier.resolution == 0 {
                return Err(ConfigError::InvalidTier {
                    name: tier.name.clone(),
                    reason: "resolution must be positive",
                });
            }
        }

        Ok(())
    }

    pub fn tool_timeout(&self) -> Duration {
        Duration::from_secs(self.tool_timeout_secs)
    }

    /// Worker count clamped to at least one thread.
    pub fn worker_count(&self) -> usize {
        self.workers.max(1)
    }
}

fn is_file_name_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_' || c == '-'
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_tiers() {
        let config = PublisherConfig::default();
        let tiers: Vec<(&str, u32, u32)> = config
            .tiers
            .iter()
            .map(|t| (t.name.as_str(), t.face_count, t.resolution))
            .collect();
        assert_eq!(
            tiers,
            vec![
                ("Thumb", 2000, 512),
                ("High", 15000, 4096),
                ("Medium", 15000, 2048),
                ("Low", 15000, 1024),
            ]
        );
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_tier_file_stem() {
        let tier = TierSpec::new("Medium", 15000, 2048);
        assert_eq!(tier.file_stem("chair"), "chair-15000-2048-medium");

        let custom = TierSpec {
            suffix: Some("mid".to_string()),
            ..tier
        };
        assert_eq!(custom.file_stem("chair"), "chair-15000-2048-mid");
    }

    #[test]
    fn test_partial_ron_uses_defaults() {
        let config = PublisherConfig::from_ron(
            r#"(
                workers: 4,
                tiers: [
                    (name: "Thumb", face_count: 500, resolution: 256),
                    (name: "Preview", face_count: 5000, resolution: 1024, suffix: Some("preview")),
                ],
            )"#,
        )
        .unwrap();

        assert_eq!(config.workers, 4);
        assert_eq!(config.tiers.len(), 2);
        assert_eq!(config.tiers[1].suffix(), "preview");
        assert_eq!(config.converter_program, "obj2gltf");
        assert_eq!(config.tool_timeout(), Duration::from_secs(600));
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("publisher.ron");
        std::fs::write(&path, "(tool_timeout_secs: 30, log_level: \"debug\")").unwrap();

        let config = PublisherConfig::load(&path).unwrap();
        assert_eq!(config.tool_timeout_secs, 30);
        assert_eq!(config.log_level, "debug");
        assert_eq!(config.tiers, PublisherConfig::default().tiers);
    }

    #[test]
    fn test_load_reports_parse_errors() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.ron");
        std::fs::write(&path, "(workers: \"many\")").unwrap();

        let err = PublisherConfig::load(&path).unwrap_err();
        assert!(matches!(err, ConfigError::ConfigParse { .. }));
    }

    #[test]
    fn test_validate_rejects_bad_tiers() {
        let mut config = PublisherConfig::default();
        config.tiers.clear();
        assert!(matches!(config.validate(), Err(ConfigError::NoTiers)));

        let mut config = PublisherConfig::default();
        config.tiers.push(TierSpec::new("High", 1000, 256));
        assert!(matches!(
            config.validate(),
            Err(ConfigError::DuplicateTier(name)) if name == "High"
        ));

        let mut config = PublisherConfig::default();
        config.tiers[0].resolution = 0;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidTier { .. })
        ));
    }

    #[test]
    fn test_validate_rejects_colliding_tier_files() {
        let mut config = PublisherConfig::default();
        config.tiers.push(TierSpec::new("high", 15000, 4096));
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidTier { name, .. }) if name == "high"
        ));

        let mut config = PublisherConfig::default();
        config.tiers[3].suffix = Some("medium".to_string());
        config.tiers[3].resolution = 2048;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidTier { name, .. }) if name == "Low"
        ));
    }

    #[test]
    fn test_validate_rejects_unsafe_suffix() {
        for suffix in ["../escape", "a/b", "a\\b", "", "very high"] {
            let mut config = PublisherConfig::default();
            config.tiers[0].suffix = Some(suffix.to_string());
            assert!(
                matches!(config.validate(), Err(ConfigError::InvalidTier { .. })),
                "suffix {suffix:?} accepted"
            );
        }
    }

    #[test]
    fn test_worker_count_is_at_least_one() {
        let config = PublisherConfig {
            workers: 0,
            ..PublisherConfig::default()
        };
        assert_eq!(config.worker_count(), 1);
    }
}
