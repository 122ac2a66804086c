//! Wavefront OBJ import
//!
//! Faces are triangulated and every distinct position/normal/texcoord
//! combination becomes one vertex. All models of a file are merged into a
//! single [`GeometryData`]; materials are ignored since objects carry a flat
//! diffuse colour.

use std::io::BufRead;
use std::path::Path;

use log::debug;

use super::GeometryData;
use crate::errors::{RenderError, Result};

fn load_options() -> tobj::LoadOptions {
    tobj::LoadOptions {
        triangulate: true,
        single_index: true,
        ..Default::default()
    }
}

/// Loads an OBJ file from disk
pub fn load_obj(path: impl AsRef<Path>) -> Result<GeometryData> {
    let path = path.as_ref();
    let (models, _materials) = tobj::load_obj(path, &load_options())?;
    debug!("Loaded {} model(s) from {}", models.len(), path.display());
    geometry_from_models(&models)
}

/// Parses OBJ data from a reader; `mtllib` statements are ignored
pub fn parse_obj(reader: &mut impl BufRead) -> Result<GeometryData> {
    let (models, _materials) =
        tobj::load_obj_buf(reader, &load_options(), |_| Err(tobj::LoadError::OpenFileFailed))?;
    geometry_from_models(&models)
}

fn geometry_from_models(models: &[tobj::Model]) -> Result<GeometryData> {
    let mut data = GeometryData::new();

    for model in models {
        let mesh = &model.mesh;
        let part = GeometryData {
            positions: mesh
                .positions
                .chunks_exact(3)
                .map(|p| [p[0], p[1], p[2]])
                .collect(),
            normals: mesh
                .normals
                .chunks_exact(3)
                .map(|n| [n[0], n[1], n[2]])
                .collect(),
            tex_coords: mesh
                .texcoords
                .chunks_exact(2)
                .map(|t| [t[0], 1.0 - t[1]])
                .collect(),
            indices: mesh.indices.clone(),
            topology: wgpu::PrimitiveTopology::TriangleList,
        };

        debug!(
            "OBJ model '{}': {} vertices, {} triangles",
            model.name,
            part.vertex_count(),
            part.triangle_count()
        );
        data.append(&part);
    }

    if data.positions.is_empty() {
        return Err(RenderError::InvalidMesh("OBJ file contains no geometry".into()));
    }

    data.ensure_normals();
    data.validate()?;
    Ok(data)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    const QUAD_WITH_NORMALS: &str = "\
o quad
v 0 0 0
v 1 0 0
v 1 1 0
v 0 1 0
vn 0 0 1
vn 0 0 -1
f 1//1 2//1 3//1
f 3//1 4//1 1//1
f 1//2 3//2 2//2
";

    #[test]
    fn test_deduplicates_vertex_normal_pairs() {
        let data = parse_obj(&mut Cursor::new(QUAD_WITH_NORMALS)).unwrap();

        // Four corners with the front normal, three of them again with the back normal
        assert_eq!(data.vertex_count(), 7);
        assert_eq!(data.triangle_count(), 3);
        assert_eq!(data.normals.len(), data.positions.len());
        assert!(data.validate().is_ok());
    }

    #[test]
    fn test_missing_normals_are_computed() {
        let src = "v 0 0 0\nv 1 0 0\nv 0 0 -1\nf 1 2 3\n";
        let data = parse_obj(&mut Cursor::new(src)).unwrap();
        assert_eq!(data.normals.len(), 3);
        for n in &data.normals {
            assert!((n[1] - 1.0).abs() < 1e-6);
        }
    }

    #[test]
    fn test_quads_are_triangulated() {
        let src = "v 0 0 0\nv 1 0 0\nv 1 1 0\nv 0 1 0\nf 1 2 3 4\n";
        let data = parse_obj(&mut Cursor::new(src)).unwrap();
        assert_eq!(data.triangle_count(), 2);
    }

    #[test]
    fn test_empty_file_is_rejected() {
        assert!(parse_obj(&mut Cursor::new("# nothing here\n")).is_err());
    }

    #[test]
    fn test_missing_file_is_an_error() {
        assert!(matches!(
            load_obj("/definitely/not/here.obj"),
            Err(RenderError::ObjLoad(_))
        ));
    }
}
