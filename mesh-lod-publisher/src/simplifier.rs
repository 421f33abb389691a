/// Mesh simplification through MeshLab
use crate::error::ToolError;
use crate::tools::{ToolCommand, ToolOutput};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::info;

/// One simplification job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SimplifyRequest {
    pub input: PathBuf,
    pub output: PathBuf,
    pub target_faces: u32,
    /// Keep open mesh borders fixed while collapsing edges.
    pub preserve_boundary: bool,
    /// Carry texture coordinates (and the material) into the output.
    pub preserve_texture: bool,
}

/// Reduces a mesh to a target face budget.
pub trait MeshSimplifier: Send + Sync {
    fn simplify(&self, request: &SimplifyRequest) -> Result<ToolOutput, ToolError>;
}

/// Runs `meshlabserver` with a generated quadric edge collapse filter script.
#[derive(Debug, Clone)]
pub struct MeshLabSimplifier {
    program: String,
    tool_path: Option<PathBuf>,
    timeout: Duration,
}

impl MeshLabSimplifier {
    pub fn new(program: &str, tool_path: Option<&Path>, timeout: Duration) -> Self {
        Self {
            program: program.to_string(),
            tool_path: tool_path.map(Path::to_path_buf),
            timeout,
        }
    }
}

impl MeshSimplifier for MeshLabSimplifier {
    fn simplify(&self, request: &SimplifyRequest) -> Result<ToolOutput, ToolError> {
        if !request.input.exists() {
            return Err(ToolError::MissingInput(request.input.clone()));
        }

        info!(
            "Simplifying {} to {} faces",
            request.input.display(),
            request.target_faces
        );

        let script_path = request.output.with_extension("mlx");
        fs::write(&script_path, filter_script(request)).map_err(|source| ToolError::Io {
            path: script_path.clone(),
            source,
        })?;

        let mut command = ToolCommand::new(&self.program)
            .arg("-i")
            .arg(&request.input)
            .arg("-o")
            .arg(&request.output)
            .arg("-s")
            .arg(&script_path);
        if request.preserve_texture {
            // Save wedge texture coordinates so the material survives.
            command = command.args(["-m", "wt"]);
        }

        command
            .tool_path(self.tool_path.as_deref())
            .timeout(self.timeout)
            .log_to(&request.output.with_extension("simplify.log"))
            .run(&request.output)
    }
}

/// Builds the MeshLab filter script for a request.
pub fn filter_script(request: &SimplifyRequest) -> String {
    let filter_name = if request.preserve_texture {
        "Simplification: Quadric Edge Collapse Decimation (with texture)"
    } else {
        "Simplification: Quadric Edge Collapse Decimation"
    };

    let mut params = vec![
        param("RichInt", "TargetFaceNum", &request.target_faces.to_string()),
        param("RichFloat", "TargetPerc", "0"),
        param("RichFloat", "QualityThr", "0.3"),
        param("RichBool", "PreserveBoundary", bool_str(request.preserve_boundary)),
        param("RichFloat", "BoundaryWeight", "1"),
        param("RichBool", "OptimalPlacement", "true"),
        param("RichBool", "PreserveNormal", "true"),
        param("RichBool", "PlanarQuadric", "true"),
    ];
    if request.preserve_texture {
        params.insert(3, param("RichFloat", "Extratcoordw", "1"));
    } else {
        params.push(param("RichBool", "PreserveTopology", "false"));
        params.push(param("RichBool", "QualityWeight", "false"));
        params.push(param("RichBool", "AutoClean", "true"));
        params.push(param("RichBool", "Selected", "false"));
    }

    let mut script = String::from("<!DOCTYPE FilterScript>\n<FilterScript>\n");
    script.push_str(&format!(" <filter name=\"{}\">\n", filter_name));
    for line in params {
        script.push_str(&line);
    }
    script.push_str(" </filter>\n</FilterScript>\n");
    script
}

fn param(kind: &str, name: &str, value: &str) -> String {
    format!(
        "  <Param type=\"{}\" value=\"{}\" name=\"{}\"/>\n",
        kind, value, name
    )
}

fn bool_str(value: bool) -> &'static str {
    if value { "true" } else { "false" }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(preserve_texture: bool) -> SimplifyRequest {
        SimplifyRequest {
            input: PathBuf::from("chair/chair.obj"),
            output: PathBuf::from("out/chair-2000-512-thumb.obj"),
            target_faces: 2000,
            preserve_boundary: true,
            preserve_texture,
        }
    }

    #[test]
    fn test_textured_filter_script() {
        let script = filter_script(&request(true));
        assert!(script.starts_with("<!DOCTYPE FilterScript>"));
        assert!(script.contains("Quadric Edge Collapse Decimation (with texture)"));
        assert!(script.contains("value=\"2000\" name=\"TargetFaceNum\""));
        assert!(script.contains("value=\"true\" name=\"PreserveBoundary\""));
        assert!(script.contains("name=\"Extratcoordw\""));
        assert!(!script.contains("AutoClean"));
    }

    #[test]
    fn test_untextured_filter_script() {
        let mut req = request(false);
        req.preserve_boundary = false;
        let script = filter_script(&req);
        assert!(script.contains("name=\"Simplification: Quadric Edge Collapse Decimation\""));
        assert!(script.contains("value=\"false\" name=\"PreserveBoundary\""));
        assert!(!script.contains("Extratcoordw"));
    }

    #[test]
    fn test_missing_input_is_reported_before_spawning() {
        let simplifier = MeshLabSimplifier::new("meshlabserver", None, Duration::from_secs(1));
        let err = simplifier.simplify(&request(true)).unwrap_err();
        assert!(matches!(err, ToolError::MissingInput(path) if path == PathBuf::from("chair/chair.obj")));
    }

    #[cfg(unix)]
    #[test]
    fn test_invokes_meshlab_with_script() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let bin = dir.path().join("bin");
        fs::create_dir(&bin).unwrap();
        // Records its arguments and writes the requested output mesh.
        let fake = bin.join("meshlabserver");
        fs::write(
            &fake,
            "#!/bin/sh\necho \"$@\" > \"$4.args\"\nprintf 'v 0 0 0\\nv 1 0 0\\nv 0 1 0\\nf 1 2 3\\n' > \"$4\"\n",
        )
        .unwrap();
        fs::set_permissions(&fake, fs::Permissions::from_mode(0o755)).unwrap();

        let input = dir.path().join("chair.obj");
        fs::write(&input, "v 0 0 0\nv 1 0 0\nv 0 1 0\nf 1 2 3\n").unwrap();
        let output = dir.path().join("chair-2000-512-thumb.obj");

        let simplifier = MeshLabSimplifier::new("meshlabserver", Some(&bin), Duration::from_secs(10));
        let result = simplifier
            .simplify(&SimplifyRequest {
                input: input.clone(),
                output: output.clone(),
                target_faces: 2000,
                preserve_boundary: true,
                preserve_texture: true,
            })
            .unwrap();

        assert_eq!(result.produced, output);
        let args = fs::read_to_string(dir.path().join("chair-2000-512-thumb.obj.args")).unwrap();
        assert!(args.contains("-s"));
        assert!(args.trim_end().ends_with("-m wt"));
        assert!(dir.path().join("chair-2000-512-thumb.mlx").exists());
        assert!(dir.path().join("chair-2000-512-thumb.simplify.log").exists());
    }
}
