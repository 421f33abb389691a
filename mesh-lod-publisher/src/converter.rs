/// Packaging of textured OBJ tiers into binary glTF
use crate::error::ToolError;
use crate::tools::{ToolCommand, ToolOutput};
use constants::coordinate_system::UP_AXIS;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::info;

/// One packaging job. The material and texture are resolved by the
/// converter from the mesh's own references.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConvertRequest {
    pub input: PathBuf,
    pub output: PathBuf,
    pub input_up_axis: String,
    pub output_up_axis: String,
}

impl ConvertRequest {
    /// Request with the fixed axis convention: no coordinate reinterpretation.
    pub fn new(input: &Path, output: &Path) -> Self {
        Self {
            input: input.to_path_buf(),
            output: output.to_path_buf(),
            input_up_axis: UP_AXIS.to_string(),
            output_up_axis: UP_AXIS.to_string(),
        }
    }
}

/// Serialises a textured mesh into the viewer's binary container.
pub trait PackageConverter: Send + Sync {
    fn convert(&self, request: &ConvertRequest) -> Result<ToolOutput, ToolError>;
}

/// Runs the `obj2gltf` command-line converter.
#[derive(Debug, Clone)]
pub struct Obj2GltfConverter {
    program: String,
    tool_path: Option<PathBuf>,
    timeout: Duration,
}

impl Obj2GltfConverter {
    pub fn new(program: &str, tool_path: Option<&Path>, timeout: Duration) -> Self {
        Self {
            program: program.to_string(),
            tool_path: tool_path.map(Path::to_path_buf),
            timeout,
        }
    }

    fn command(&self, request: &ConvertRequest) -> ToolCommand {
        ToolCommand::new(&self.program)
            .arg("-i")
            .arg(&request.input)
            .arg("-o")
            .arg(&request.output)
            .arg("--inputUpAxis")
            .arg(&request.input_up_axis)
            .arg("--outputUpAxis")
            .arg(&request.output_up_axis)
            .tool_path(self.tool_path.as_deref())
            .timeout(self.timeout)
            .log_to(&request.output.with_extension("convert.log"))
    }
}

impl PackageConverter for Obj2GltfConverter {
    fn convert(&self, request: &ConvertRequest) -> Result<ToolOutput, ToolError> {
        if !request.input.exists() {
            return Err(ToolError::MissingInput(request.input.clone()));
        }

        info!(
            "Converting {} to {}",
            request.input.display(),
            request.output.display()
        );
        self.command(request).run(&request.output)
    }
}
