//! # Geometry
//!
//! CPU-side mesh data and the generators/loaders that produce it.
//!
//! - [`primitives`]: plane, cube, sphere, spot light cone and the full-screen quad
//! - [`obj`]: Wavefront OBJ import through `tobj`
//!
//! ```no_run
//! use penumbra::gfx::geometry::{generate_plane, generate_sphere};
//!
//! let floor = generate_plane(20.0, 20.0, 1, 1);
//! let ball = generate_sphere(32, 16);
//! assert!(floor.validate().is_ok() && ball.validate().is_ok());
//! ```

pub mod obj;
pub mod primitives;

pub use obj::{load_obj, parse_obj};
pub use primitives::*;

use cgmath::{InnerSpace, Point3, Vector3, Zero};

use crate::errors::{RenderError, Result};

/// Mesh data ready for GPU upload
///
/// Every attribute stream is either empty or holds exactly one element per
/// position.
#[derive(Debug, Clone, PartialEq)]
pub struct GeometryData {
    /// Vertex positions (x, y, z)
    pub positions: Vec<[f32; 3]>,
    /// Normal vectors (x, y, z)
    pub normals: Vec<[f32; 3]>,
    /// Texture coordinates (u, v)
    pub tex_coords: Vec<[f32; 2]>,
    /// Element indices (counter-clockwise winding for triangles)
    pub indices: Vec<u32>,
    pub topology: wgpu::PrimitiveTopology,
}

impl Default for GeometryData {
    fn default() -> Self {
        Self::new()
    }
}

impl GeometryData {
    /// Create a new empty triangle list
    pub fn new() -> Self {
        Self {
            positions: Vec::new(),
            normals: Vec::new(),
            tex_coords: Vec::new(),
            indices: Vec::new(),
            topology: wgpu::PrimitiveTopology::TriangleList,
        }
    }

    pub fn vertex_count(&self) -> usize {
        self.positions.len()
    }

    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }

    /// Checks the invariants a drawable relies on
    ///
    /// Every index must address an existing vertex and every non-empty
    /// attribute stream must match the position count.
    pub fn validate(&self) -> Result<()> {
        let vertex_count = self.positions.len();

        if vertex_count == 0 {
            return Err(RenderError::InvalidMesh("mesh has no positions".into()));
        }
        if self.indices.is_empty() {
            return Err(RenderError::InvalidMesh("mesh has no indices".into()));
        }
        if !self.normals.is_empty() && self.normals.len() != vertex_count {
            return Err(RenderError::InvalidMesh(format!(
                "{} normals for {} positions",
                self.normals.len(),
                vertex_count
            )));
        }
        if !self.tex_coords.is_empty() && self.tex_coords.len() != vertex_count {
            return Err(RenderError::InvalidMesh(format!(
                "{} texture coordinates for {} positions",
                self.tex_coords.len(),
                vertex_count
            )));
        }
        if let Some(&index) = self.indices.iter().find(|&&i| i as usize >= vertex_count) {
            return Err(RenderError::InvalidMesh(format!(
                "index {} out of range for {} vertices",
                index, vertex_count
            )));
        }
        if self.topology == wgpu::PrimitiveTopology::TriangleList && self.indices.len() % 3 != 0 {
            return Err(RenderError::InvalidMesh(format!(
                "{} indices do not form whole triangles",
                self.indices.len()
            )));
        }

        Ok(())
    }

    /// Replaces the normals with area-weighted vertex normals
    pub fn compute_vertex_normals(&mut self) {
        let mut normals = vec![Vector3::<f32>::zero(); self.positions.len()];

        for triangle in self.indices.chunks_exact(3) {
            let [i0, i1, i2] = [triangle[0] as usize, triangle[1] as usize, triangle[2] as usize];
            if i0 >= normals.len() || i1 >= normals.len() || i2 >= normals.len() {
                continue;
            }
            let v0 = Vector3::from(self.positions[i0]);
            let v1 = Vector3::from(self.positions[i1]);
            let v2 = Vector3::from(self.positions[i2]);
            let face_normal = (v1 - v0).cross(v2 - v0);
            for i in [i0, i1, i2] {
                normals[i] += face_normal;
            }
        }

        self.normals = normals
            .into_iter()
            .map(|n| {
                if n.magnitude2() > 0.0 {
                    n.normalize().into()
                } else {
                    [0.0, 1.0, 0.0]
                }
            })
            .collect();
    }

    /// Fills in normals when the stream is missing
    pub fn ensure_normals(&mut self) {
        if self.normals.len() != self.positions.len() {
            self.compute_vertex_normals();
        }
    }

    /// Appends `other`, offsetting its indices
    pub fn append(&mut self, other: &GeometryData) {
        let offset = self.positions.len() as u32;
        let had_vertices = offset > 0;

        // A stream survives only if both sides carry it
        if had_vertices && self.normals.is_empty() != other.normals.is_empty() {
            self.normals.clear();
        } else {
            self.normals.extend_from_slice(&other.normals);
        }
        if had_vertices && self.tex_coords.is_empty() != other.tex_coords.is_empty() {
            self.tex_coords.clear();
        } else {
            self.tex_coords.extend_from_slice(&other.tex_coords);
        }

        self.positions.extend_from_slice(&other.positions);
        self.indices.extend(other.indices.iter().map(|i| i + offset));
    }

    /// Axis-aligned bounds of the positions, `None` for an empty mesh
    pub fn bounding_box(&self) -> Option<Aabb> {
        let mut iter = self.positions.iter();
        let first = Point3::from(*iter.next()?);
        let mut aabb = Aabb {
            min: first,
            max: first,
        };
        for p in iter {
            aabb.min.x = aabb.min.x.min(p[0]);
            aabb.min.y = aabb.min.y.min(p[1]);
            aabb.min.z = aabb.min.z.min(p[2]);
            aabb.max.x = aabb.max.x.max(p[0]);
            aabb.max.y = aabb.max.y.max(p[1]);
            aabb.max.z = aabb.max.z.max(p[2]);
        }
        Some(aabb)
    }
}

/// Axis-aligned bounding box
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Aabb {
    pub min: Point3<f32>,
    pub max: Point3<f32>,
}

impl Aabb {
    pub fn center(&self) -> Point3<f32> {
        Point3::new(
            0.5 * (self.min.x + self.max.x),
            0.5 * (self.min.y + self.max.y),
            0.5 * (self.min.z + self.max.z),
        )
    }

    pub fn extent(&self) -> Vector3<f32> {
        self.max - self.min
    }

    /// Radius of the sphere around [`Aabb::center`] enclosing the box
    pub fn bounding_radius(&self) -> f32 {
        0.5 * self.extent().magnitude()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn triangle() -> GeometryData {
        GeometryData {
            positions: vec![[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0]],
            indices: vec![0, 1, 2],
            ..Default::default()
        }
    }

    #[test]
    fn test_validate_accepts_well_formed_mesh() {
        assert!(triangle().validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_out_of_range_index() {
        let mut data = triangle();
        data.indices[2] = 3;
        assert!(matches!(data.validate(), Err(RenderError::InvalidMesh(_))));
    }

    #[test]
    fn test_validate_rejects_mismatched_streams() {
        let mut data = triangle();
        data.normals = vec![[0.0, 0.0, 1.0]; 2];
        assert!(matches!(data.validate(), Err(RenderError::InvalidMesh(_))));

        let mut data = triangle();
        data.tex_coords = vec![[0.0, 0.0]; 4];
        assert!(matches!(data.validate(), Err(RenderError::InvalidMesh(_))));
    }

    #[test]
    fn test_validate_rejects_empty_mesh() {
        assert!(GeometryData::new().validate().is_err());
    }

    #[test]
    fn test_compute_vertex_normals() {
        let mut data = triangle();
        data.compute_vertex_normals();
        assert_eq!(data.normals.len(), 3);
        for n in &data.normals {
            assert!((n[2] - 1.0).abs() < 1e-6);
        }
    }

    #[test]
    fn test_append_offsets_indices() {
        let mut data = triangle();
        data.append(&triangle());
        assert_eq!(data.vertex_count(), 6);
        assert_eq!(&data.indices[3..], &[3, 4, 5]);
        assert!(data.validate().is_ok());
    }

    #[test]
    fn test_bounding_box() {
        let aabb = triangle().bounding_box().unwrap();
        assert_eq!(aabb.min, Point3::new(0.0, 0.0, 0.0));
        assert_eq!(aabb.max, Point3::new(1.0, 1.0, 0.0));
        assert_eq!(aabb.center(), Point3::new(0.5, 0.5, 0.0));
        assert!((aabb.bounding_radius() - 0.5 * 2.0_f32.sqrt()).abs() < 1e-6);
        assert!(GeometryData::new().bounding_box().is_none());
    }
}
