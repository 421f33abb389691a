/// Geometry file extension discovered under the input root
pub const MESH_EXTENSION: &str = "obj";

/// Material definition extension paired with each geometry file
pub const MATERIAL_EXTENSION: &str = "mtl";

/// Texture image extensions accepted for a source asset
pub const TEXTURE_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg"];

/// Extension used for every resized tier texture
pub const TIER_TEXTURE_EXTENSION: &str = "png";

/// Packaged binary container consumed by the viewer
pub const PACKAGE_EXTENSION: &str = "glb";

/// Manifest template expected at the root of the input directory
pub const TEMPLATE_FILE_NAME: &str = ".svx.json";

/// Suffix of every per-asset manifest
pub const MANIFEST_SUFFIX: &str = ".svx.json";

/// Directory created next to the input root that collects batch outputs
pub const PUBLISHED_DIR_NAME: &str = "published";

/// Suffix appended to the timestamp of each batch output root
pub const OUTPUT_ROOT_SUFFIX: &str = "_Output_GlTF";

/// Working files removed from an asset directory once its manifest is saved
pub const INTERMEDIATE_EXTENSIONS: &[&str] = &["obj", "mtl", "png", "jpg", "jpeg", "log", "mlx"];
