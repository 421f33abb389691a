/// Material definition texture reference rewriting
use crate::error::{PublishError, ToolError, ValidationError};
use constants::files::MATERIAL_EXTENSION;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

const DIFFUSE_MAP_KEYWORD: &str = "map_Kd";

/// Finds the material file written alongside a tier mesh.
/// Looks for `<stem>.mtl` then `<file>.mtl`; the first that exists wins.
pub fn locate_material(mesh_path: &Path) -> Result<PathBuf, ToolError> {
    let mut candidates = vec![mesh_path.with_extension(MATERIAL_EXTENSION)];
    if let Some(file_name) = mesh_path.file_name() {
        let mut appended = file_name.to_os_string();
        appended.push(".");
        appended.push(MATERIAL_EXTENSION);
        candidates.push(mesh_path.with_file_name(appended));
    }

    let mut found = candidates.into_iter().filter(|c| c.is_file());
    match (found.next(), found.next()) {
        (Some(path), None) => Ok(path),
        (Some(first), Some(_)) => {
            debug!("Several materials next to {}", mesh_path.display());
            Ok(first)
        }
        (None, _) => Err(ToolError::MissingInput(
            mesh_path.with_extension(MATERIAL_EXTENSION),
        )),
    }
}

/// Points every diffuse texture directive of a material at `image_path`.
///
/// Only the file name of the image is written, so the material and image
/// must live in the same directory. The material must reference exactly one
/// texture; anything else would make the rewrite ambiguous.
pub fn rewrite_texture_reference(
    material_path: &Path,
    image_path: &Path,
) -> Result<(), PublishError> {
    if !material_path.exists() {
        return Err(ToolError::MissingInput(material_path.to_path_buf()).into());
    }

    let contents = fs::read_to_string(material_path).map_err(|source| ToolError::Io {
        path: material_path.to_path_buf(),
        source,
    })?;

    let image_name = image_path
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .ok_or_else(|| ToolError::MissingInput(image_path.to_path_buf()))?;

    let rewritten = rewrite_contents(&contents, &image_name)
        .map_err(|err| err.with_path(material_path))?;

    fs::write(material_path, rewritten).map_err(|source| ToolError::Io {
        path: material_path.to_path_buf(),
        source,
    })?;

    debug!(
        "Rewrote {} to reference {}",
        material_path.display(),
        image_name
    );
    Ok(())
}

#[derive(Debug)]
enum RewriteError {
    NoTexture,
    MultipleTextures,
}

impl RewriteError {
    fn with_path(self, path: &Path) -> ValidationError {
        match self {
            RewriteError::NoTexture => ValidationError::NoTextureReference(path.to_path_buf()),
            RewriteError::MultipleTextures => ValidationError::MultipleTextures(path.to_path_buf()),
        }
    }
}

fn rewrite_contents(contents: &str, image_name: &str) -> Result<String, RewriteError> {
    let mut referenced: Option<&str> = None;
    let mut output = String::with_capacity(contents.len());

    for line in contents.lines() {
        let trimmed = line.trim_start();
        let is_diffuse_map = trimmed
            .split_whitespace()
            .next()
            .is_some_and(|keyword| keyword == DIFFUSE_MAP_KEYWORD);

        if is_diffuse_map {
            // The texture name is the last token; options may precede it.
            let texture = trimmed.split_whitespace().last().unwrap_or_default();
            match referenced {
                Some(previous) if previous != texture => {
                    return Err(RewriteError::MultipleTextures);
                }
                _ => referenced = Some(texture),
            }

            let indent = &line[..line.len() - trimmed.len()];
            output.push_str(indent);
            output.push_str(DIFFUSE_MAP_KEYWORD);
            output.push(' ');
            output.push_str(image_name);
        } else {
            output.push_str(line);
        }
        output.push('\n');
    }

    if referenced.is_none() {
        return Err(RewriteError::NoTexture);
    }

    Ok(output)
}

#[cfg(test)]
mod tests {
    use super::*;

    const CHAIR_MTL: &str = "\
# exported material
newmtl material_0
Ka 0.2 0.2 0.2
Kd 1.0 1.0 1.0
  map_Kd chair.png
";

    #[test]
    fn test_rewrite_keeps_other_lines() {
        let rewritten = rewrite_contents(CHAIR_MTL, "chair-2000-512-thumb.png")
            .unwrap();
        assert_eq!(
            rewritten,
            "# exported material\nnewmtl material_0\nKa 0.2 0.2 0.2\nKd 1.0 1.0 1.0\n  map_Kd chair-2000-512-thumb.png\n"
        );
    }

    #[test]
    fn test_rewrite_same_texture_in_several_materials() {
        let mtl = "newmtl a\nmap_Kd tex.png\nnewmtl b\nmap_Kd -bm 1 tex.png\n";
        let rewritten = rewrite_contents(mtl, "new.png").unwrap();
        assert_eq!(rewritten.matches("map_Kd new.png").count(), 2);
    }

    #[test]
    fn test_rewrite_rejects_multiple_textures() {
        let mtl = "newmtl a\nmap_Kd wood.png\nnewmtl b\nmap_Kd metal.png\n";
        assert!(matches!(
            rewrite_contents(mtl, "new.png"),
            Err(RewriteError::MultipleTextures)
        ));
    }

    #[test]
    fn test_rewrite_requires_texture() {
        assert!(matches!(
            rewrite_contents("newmtl a\nKd 1 1 1\n", "new.png"),
            Err(RewriteError::NoTexture)
        ));
    }

    #[test]
    fn test_map_kd_prefix_is_not_a_diffuse_map() {
        // map_Kd_extra is a different keyword and must stay as-is.
        let mtl = "map_Kd_extra keep.png\nmap_Kd tex.png\n";
        let rewritten = rewrite_contents(mtl, "new.png").unwrap();
        assert!(rewritten.starts_with("map_Kd_extra keep.png\n"));
    }

    #[test]
    fn test_rewrite_file_in_place() {
        let dir = tempfile::tempdir().unwrap();
        let mtl = dir.path().join("chair-2000-512-thumb.obj.mtl");
        fs::write(&mtl, CHAIR_MTL).unwrap();

        rewrite_texture_reference(&mtl, &dir.path().join("chair-2000-512-thumb.png")).unwrap();
        let contents = fs::read_to_string(&mtl).unwrap();
        assert!(contents.contains("map_Kd chair-2000-512-thumb.png"));
        assert!(!contents.contains("chair.png"));
    }

    #[test]
    fn test_rewrite_missing_material() {
        let dir = tempfile::tempdir().unwrap();
        let err = rewrite_texture_reference(&dir.path().join("x.mtl"), Path::new("x.png"))
            .unwrap_err();
        assert!(matches!(err, PublishError::Tool(ToolError::MissingInput(_))));
    }

    #[test]
    fn test_locate_material_by_base_name() {
        let dir = tempfile::tempdir().unwrap();
        let mesh = dir.path().join("chair-2000-512-thumb.obj");

        assert!(matches!(
            locate_material(&mesh),
            Err(ToolError::MissingInput(_))
        ));

        let appended = dir.path().join("chair-2000-512-thumb.obj.mtl");
        fs::write(&appended, CHAIR_MTL).unwrap();
        assert_eq!(locate_material(&mesh).unwrap(), appended);

        let stem = dir.path().join("chair-2000-512-thumb.mtl");
        fs::write(&stem, CHAIR_MTL).unwrap();
        assert_eq!(locate_material(&mesh).unwrap(), stem);
    }
}
