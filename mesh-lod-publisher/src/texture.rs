/// Texture tier resizing
use crate::error::ToolError;
use image::GenericImageView;
use image::imageops::FilterType;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Writes a `size` x `size` copy of `source` to `target`.
/// The output format follows the target extension.
pub fn resize_texture(source: &Path, target: &Path, size: u32) -> Result<PathBuf, ToolError> {
    if !source.exists() {
        return Err(ToolError::MissingInput(source.to_path_buf()));
    }

    let image = image::open(source).map_err(|source_err| ToolError::Image {
        path: source.to_path_buf(),
        source: source_err,
    })?;

    let (width, height) = image.dimensions();
    debug!(
        "Resizing {} ({}x{}) to {}x{}",
        source.display(),
        width,
        height,
        size,
        size
    );

    image
        .resize_exact(size, size, FilterType::CatmullRom)
        .save(target)
        .map_err(|source| ToolError::Image {
            path: target.to_path_buf(),
            source,
        })?;

    Ok(target.to_path_buf())
}
