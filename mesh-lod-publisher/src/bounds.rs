/// Mesh bounding box tracking and measurement
use crate::error::ToolError;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Axis-aligned bounds in model space, serialised as `{"min": [..], "max": [..]}`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub min: [f64; 3],
    pub max: [f64; 3],
}

impl Default for BoundingBox {
    fn default() -> Self {
        Self::new()
    }
}

impl BoundingBox {
    /// Create new bounds initialised to infinity values
    pub fn new() -> Self {
        Self {
            min: [f64::INFINITY; 3],
            max: [f64::NEG_INFINITY; 3],
        }
    }

    /// Update bounds with a new point
    pub fn update(&mut self, x: f64, y: f64, z: f64) {
        for (axis, value) in [x, y, z].into_iter().enumerate() {
            self.min[axis] = self.min[axis].min(value);
            self.max[axis] = self.max[axis].max(value);
        }
    }

    /// Grow these bounds to enclose another box
    pub fn merge(&mut self, other: &BoundingBox) {
        for axis in 0..3 {
            self.min[axis] = self.min[axis].min(other.min[axis]);
            self.max[axis] = self.max[axis].max(other.max[axis]);
        }
    }

    /// True once at least one point has been added
    pub fn is_valid(&self) -> bool {
        (0..3).all(|axis| self.min[axis] <= self.max[axis])
    }

    /// Get model space dimensions
    pub fn dimensions(&self) -> (f64, f64, f64) {
        (
            self.max[0] - self.min[0],
            self.max[1] - self.min[1],
            self.max[2] - self.min[2],
        )
    }

    pub fn center(&self) -> [f64; 3] {
        [
            (self.min[0] + self.max[0]) * 0.5,
            (self.min[1] + self.max[1]) * 0.5,
            (self.min[2] + self.max[2]) * 0.5,
        ]
    }
}

/// Geometry statistics read back from a derived mesh file.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MeshMeasurement {
    pub bounds: BoundingBox,
    /// Triangle count after triangulating every face.
    pub face_count: u64,
}

/// Loads an OBJ mesh and measures its bounds and face count.
/// Material libraries referenced by the mesh are not required.
pub fn measure_mesh(path: &Path) -> Result<MeshMeasurement, ToolError> {
    if !path.exists() {
        return Err(ToolError::MissingInput(path.to_path_buf()));
    }

    let options = tobj::LoadOptions {
        triangulate: true,
        ..Default::default()
    };
    let (models, _materials) = tobj::load_obj(path, &options).map_err(|source| ToolError::Mesh {
        path: path.to_path_buf(),
        source,
    })?;

    let mut bounds = BoundingBox::new();
    let mut face_count = 0u64;

    for model in &models {
        let mesh = &model.mesh;
        for position in mesh.positions.chunks_exact(3) {
            bounds.update(
                f64::from(position[0]),
                f64::from(position[1]),
                f64::from(position[2]),
            );
        }
        face_count += (mesh.indices.len() / 3) as u64;
    }

    if !bounds.is_valid() {
        return Err(ToolError::EmptyMesh(path.to_path_buf()));
    }

    Ok(MeshMeasurement { bounds, face_count })
}

/// Computes the axis-aligned bounding box of an OBJ mesh.
pub fn measure_bounds(path: &Path) -> Result<BoundingBox, ToolError> {
    measure_mesh(path).map(|m| m.bounds)
}

#[cfg(test)]
mod tests {
    use super::*;

    const CUBE_QUADS: &str = "\
v -1 -2 -3
v 1 -2 -3
v 1 2 -3
v -1 2 -3
v -1 -2 3
v 1 -2 3
v 1 2 3
v -1 2 3
f 1 2 3 4
f 5 6 7 8
f 1 2 6 5
f 2 3 7 6
f 3 4 8 7
f 4 1 5 8
";

    #[test]
    fn test_new_bounds_are_invalid_until_updated() {
        let mut bounds = BoundingBox::new();
        assert!(!bounds.is_valid());

        bounds.update(1.0, 2.0, 3.0);
        assert!(bounds.is_valid());
        assert_eq!(bounds.dimensions(), (0.0, 0.0, 0.0));
    }

    #[test]
    fn test_update_and_merge() {
        let mut a = BoundingBox::new();
        a.update(0.0, 0.0, 0.0);
        a.update(1.0, -1.0, 2.0);

        let mut b = BoundingBox::new();
        b.update(-4.0, 5.0, 1.0);

        a.merge(&b);
        assert_eq!(a.min, [-4.0, -1.0, 0.0]);
        assert_eq!(a.max, [1.0, 5.0, 2.0]);
        assert_eq!(a.center(), [-1.5, 2.0, 1.0]);
    }

    #[test]
    fn test_serialises_as_min_max_arrays() {
        let bounds = BoundingBox {
            min: [-1.0, 0.0, 0.5],
            max: [1.0, 2.0, 3.5],
        };
        let json = serde_json::to_value(bounds).unwrap();
        assert_eq!(
            json,
            serde_json::json!({ "min": [-1.0, 0.0, 0.5], "max": [1.0, 2.0, 3.5] })
        );
    }

    #[test]
    fn test_measure_mesh_counts_triangulated_faces() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cube.obj");
        std::fs::write(&path, CUBE_QUADS).unwrap();

        let measurement = measure_mesh(&path).unwrap();
        assert_eq!(measurement.face_count, 12);
        assert_eq!(measurement.bounds.min, [-1.0, -2.0, -3.0]);
        assert_eq!(measurement.bounds.max, [1.0, 2.0, 3.0]);
        assert_eq!(measure_bounds(&path).unwrap(), measurement.bounds);
    }

    #[test]
    fn test_measure_missing_mesh() {
        let dir = tempfile::tempdir().unwrap();
        let err = measure_mesh(&dir.path().join("absent.obj")).unwrap_err();
        assert!(matches!(err, ToolError::MissingInput(_)));
    }

    #[test]
    fn test_measure_empty_mesh() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("empty.obj");
        std::fs::write(&path, "# nothing here\n").unwrap();

        let err = measure_mesh(&path).unwrap_err();
        assert!(matches!(
            err,
            ToolError::EmptyMesh(_) | ToolError::Mesh { .. }
        ));
    }
}
