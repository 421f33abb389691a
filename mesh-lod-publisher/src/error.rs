/// Error taxonomy for batch publishing
use std::path::PathBuf;
use std::time::Duration;

pub type Result<T> = std::result::Result<T, PublishError>;

/// Fatal problems with the invocation, the configuration or the template.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("input root does not exist: {0}")]
    InputNotFound(PathBuf),

    #[error("unable to find manifest template {0}")]
    MissingTemplate(PathBuf),

    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse manifest template {path}: {source}")]
    TemplateParse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("failed to parse config {path}: {source}")]
    ConfigParse {
        path: PathBuf,
        #[source]
        source: ron::error::SpannedError,
    },

    #[error("manifest template has no model record")]
    MissingModel,

    #[error("tier {0} has no derivative in the manifest template")]
    TierNotInTemplate(String),

    #[error("tier {0} appears in more than one manifest derivative")]
    DuplicateDerivative(String),

    #[error("derivative {0} in the manifest template has no asset entry")]
    DerivativeWithoutAsset(String),

    #[error("no tiers configured")]
    NoTiers,

    #[error("tier {0} is configured more than once")]
    DuplicateTier(String),

    #[error("tier {name} is invalid: {reason}")]
    InvalidTier { name: String, reason: &'static str },

    #[error("input root {0} has no parent directory to publish next to")]
    NoOutputParent(PathBuf),

    #[error("failed to create output root {path}: {source}")]
    OutputRoot {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to build worker pool: {0}")]
    WorkerPool(#[from] rayon::ThreadPoolBuildError),
}

/// Which companion file of a source asset a validation error refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompanionKind {
    Mesh,
    Material,
    Texture,
}

impl std::fmt::Display for CompanionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CompanionKind::Mesh => write!(f, "mesh"),
            CompanionKind::Material => write!(f, "material"),
            CompanionKind::Texture => write!(f, "texture"),
        }
    }
}

/// An asset directory that cannot be processed as-is. The asset is skipped.
#[derive(Debug, thiserror::Error)]
pub enum ValidationError {
    #[error("{dir} has no {kind} file")]
    MissingCompanion { dir: PathBuf, kind: CompanionKind },

    #[error("{dir} has {count} {kind} files, expected exactly one")]
    AmbiguousCompanion {
        dir: PathBuf,
        kind: CompanionKind,
        count: usize,
    },

    #[error("folder name {0:?} has no filesystem-safe characters")]
    UnsafeName(String),

    #[error("failed to list {dir}: {source}")]
    Unreadable {
        dir: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("material {0} has no texture reference")]
    NoTextureReference(PathBuf),

    #[error("material {0} references more than one texture")]
    MultipleTextures(PathBuf),
}

/// Failure of an external tool or of an in-process derivation step.
#[derive(Debug, thiserror::Error)]
pub enum ToolError {
    #[error("unable to find {0}")]
    MissingInput(PathBuf),

    #[error("failed to start {tool}: {source}")]
    Spawn {
        tool: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{tool} exited with status {status:?}: {diagnostics}")]
    Failed {
        tool: String,
        status: Option<i32>,
        diagnostics: String,
    },

    #[error("{tool} did not finish within {timeout:?}")]
    TimedOut { tool: String, timeout: Duration },

    #[error("{tool} reported success but {path} was not produced")]
    MissingOutput { tool: String, path: PathBuf },

    #[error("image error on {path}: {source}")]
    Image {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },

    #[error("failed to load mesh {path}: {source}")]
    Mesh {
        path: PathBuf,
        #[source]
        source: tobj::LoadError,
    },

    #[error("mesh {0} has no geometry")]
    EmptyMesh(PathBuf),

    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Failure while persisting the manifest or touching published artifacts.
#[derive(Debug, thiserror::Error)]
pub enum PersistenceError {
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to serialise manifest: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("manifest is incomplete, missing: {}", .missing.join(", "))]
    Incomplete { missing: Vec<String> },
}

/// Any error raised while publishing.
/// Configuration errors abort the batch before anything is written; every
/// other kind is scoped to a single asset.
#[derive(Debug, thiserror::Error)]
pub enum PublishError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Tool(#[from] ToolError),

    #[error(transparent)]
    Persistence(#[from] PersistenceError),
}

impl PublishError {
    /// Whether the error should stop the whole batch rather than one asset.
    pub fn is_fatal(&self) -> bool {
        matches!(self, PublishError::Config(_))
    }
}
