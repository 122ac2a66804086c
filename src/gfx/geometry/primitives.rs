//! # Primitive Shape Generation
//!
//! Y-up, right-handed, counter-clockwise front faces. All closed shapes have
//! outward facing triangles and per-vertex normals.

use super::GeometryData;
use std::f32::consts::PI;

/// Generate a unit cube centered at the origin
///
/// Vertices range from -0.5 to 0.5 on all axes, four per face so every face
/// gets a flat normal.
pub fn generate_cube() -> GeometryData {
    // (normal, tangent); the bitangent is normal x tangent
    const FACES: [([f32; 3], [f32; 3]); 6] = [
        ([0.0, 0.0, 1.0], [1.0, 0.0, 0.0]),
        ([0.0, 0.0, -1.0], [-1.0, 0.0, 0.0]),
        ([1.0, 0.0, 0.0], [0.0, 0.0, -1.0]),
        ([-1.0, 0.0, 0.0], [0.0, 0.0, 1.0]),
        ([0.0, 1.0, 0.0], [1.0, 0.0, 0.0]),
        ([0.0, -1.0, 0.0], [1.0, 0.0, 0.0]),
    ];
    const CORNERS: [(f32, f32); 4] = [(-0.5, -0.5), (0.5, -0.5), (0.5, 0.5), (-0.5, 0.5)];

    let mut data = GeometryData::new();

    for (n, t) in FACES {
        let b = [
            n[1] * t[2] - n[2] * t[1],
            n[2] * t[0] - n[0] * t[2],
            n[0] * t[1] - n[1] * t[0],
        ];
        let base = data.positions.len() as u32;

        for (u, v) in CORNERS {
            data.positions.push([
                0.5 * n[0] + u * t[0] + v * b[0],
                0.5 * n[1] + u * t[1] + v * b[1],
                0.5 * n[2] + u * t[2] + v * b[2],
            ]);
            data.normals.push(n);
            data.tex_coords.push([u + 0.5, 0.5 - v]);
        }

        data.indices
            .extend_from_slice(&[base, base + 1, base + 2, base + 2, base + 3, base]);
    }

    data
}

/// Generate a UV sphere with specified resolution
///
/// # Arguments
/// * `longitude_segments` - Number of vertical segments (longitude lines)
/// * `latitude_segments` - Number of horizontal segments (latitude lines)
///
/// Returns a sphere of radius 1.0 centered at the origin.
pub fn generate_sphere(longitude_segments: u32, latitude_segments: u32) -> GeometryData {
    let mut data = GeometryData::new();

    let long_segs = longitude_segments.max(3);
    let lat_segs = latitude_segments.max(2);

    for lat in 0..=lat_segs {
        let theta = lat as f32 * PI / lat_segs as f32;
        let (sin_theta, cos_theta) = theta.sin_cos();

        for long in 0..=long_segs {
            let phi = long as f32 * 2.0 * PI / long_segs as f32;
            let (sin_phi, cos_phi) = phi.sin_cos();

            let p = [sin_theta * cos_phi, cos_theta, sin_theta * sin_phi];
            data.positions.push(p);
            data.normals.push(p);
            data.tex_coords
                .push([long as f32 / long_segs as f32, lat as f32 / lat_segs as f32]);
        }
    }

    for lat in 0..lat_segs {
        for long in 0..long_segs {
            let first = lat * (long_segs + 1) + long;
            let second = first + long_segs + 1;

            data.indices
                .extend_from_slice(&[first, first + 1, second, second, first + 1, second + 1]);
        }
    }

    data
}

/// Generate a plane in the XZ plane facing +Y
///
/// # Arguments
/// * `width` - Extent along X
/// * `depth` - Extent along Z
/// * `width_segments` - Number of subdivisions along X
/// * `depth_segments` - Number of subdivisions along Z
pub fn generate_plane(width: f32, depth: f32, width_segments: u32, depth_segments: u32) -> GeometryData {
    let mut data = GeometryData::new();

    let w_segs = width_segments.max(1);
    let d_segs = depth_segments.max(1);

    for z in 0..=d_segs {
        let v = z as f32 / d_segs as f32;
        for x in 0..=w_segs {
            let u = x as f32 / w_segs as f32;
            data.positions.push([(u - 0.5) * width, 0.0, (v - 0.5) * depth]);
            data.normals.push([0.0, 1.0, 0.0]);
            data.tex_coords.push([u, v]);
        }
    }

    for z in 0..d_segs {
        for x in 0..w_segs {
            let i = z * (w_segs + 1) + x;
            let next_row = i + w_segs + 1;

            data.indices
                .extend_from_slice(&[i, next_row, i + 1, next_row, next_row + 1, i + 1]);
        }
    }

    data
}

/// Generate a closed cone with its tip at the origin, opening towards -Z
///
/// The base ring of `segments` vertices lies at `z = -length`, followed by
/// the tip and the centre of the base cap. Side triangles run
/// `(ring[i], tip, ring[i + 1])`, cap triangles `(centre, ring[i], ring[i + 1])`,
/// and all of them face out of the volume. No normals are generated; the cone
/// only bounds a light volume.
pub fn generate_cone(base_radius: f32, length: f32, segments: u32) -> GeometryData {
    let segments = segments.max(3);
    let mut data = GeometryData::new();

    for i in 0..segments {
        let beta = i as f32 * 2.0 * PI / segments as f32;
        let (sin_beta, cos_beta) = beta.sin_cos();
        data.positions
            .push([base_radius * sin_beta, base_radius * cos_beta, -length]);
    }
    data.positions.push([0.0, 0.0, 0.0]);
    data.positions.push([0.0, 0.0, -length]);

    let tip = segments;
    let centre = segments + 1;
    for i in 0..segments {
        data.indices.extend_from_slice(&[i, tip, (i + 1) % segments]);
    }
    for i in 0..segments {
        data.indices.extend_from_slice(&[centre, i, (i + 1) % segments]);
    }

    data
}

/// Two triangles covering clip space
///
/// Texture coordinates follow wgpu's convention: (0, 0) is the top-left
/// corner, so clip space (-1, -1) maps to (0, 1).
pub fn generate_fullscreen_quad() -> GeometryData {
    GeometryData {
        positions: vec![
            [-1.0, -1.0, 0.0],
            [1.0, -1.0, 0.0],
            [1.0, 1.0, 0.0],
            [-1.0, 1.0, 0.0],
        ],
        normals: Vec::new(),
        tex_coords: vec![[0.0, 1.0], [1.0, 1.0], [1.0, 0.0], [0.0, 0.0]],
        indices: vec![0, 1, 2, 2, 3, 0],
        topology: wgpu::PrimitiveTopology::TriangleList,
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use cgmath::{InnerSpace, Vector3};
    use rand::Rng;

    /// Counts triangles whose geometric normal points towards `center`
    pub(crate) fn inward_facing_triangles(data: &GeometryData, center: Vector3<f32>) -> usize {
        data.indices
            .chunks_exact(3)
            .filter(|t| {
                let a = Vector3::from(data.positions[t[0] as usize]);
                let b = Vector3::from(data.positions[t[1] as usize]);
                let c = Vector3::from(data.positions[t[2] as usize]);
                let n = (b - a).cross(c - a);
                // Skip degenerate triangles (sphere poles)
                if n.magnitude2() < 1e-12 {
                    return false;
                }
                let centroid = (a + b + c) / 3.0;
                n.dot(centroid - center) < 0.0
            })
            .count()
    }

    #[test]
    fn test_cube_generation() {
        let cube = generate_cube();
        assert_eq!(cube.vertex_count(), 24);
        assert_eq!(cube.triangle_count(), 12);
        assert!(cube.validate().is_ok());
        assert_eq!(inward_facing_triangles(&cube, Vector3::new(0.0, 0.0, 0.0)), 0);

        for p in &cube.positions {
            assert!(p.iter().all(|c| (c.abs() - 0.5).abs() < 1e-6));
        }
    }

    #[test]
    fn test_sphere_generation() {
        let sphere = generate_sphere(16, 8);
        assert_eq!(sphere.vertex_count(), 17 * 9);
        assert_eq!(sphere.triangle_count(), 16 * 8 * 2);
        assert!(sphere.validate().is_ok());
        assert_eq!(inward_facing_triangles(&sphere, Vector3::new(0.0, 0.0, 0.0)), 0);
    }

    #[test]
    fn test_random_sphere_resolutions_are_valid() {
        let mut rng = rand::rng();
        for _ in 0..20 {
            let long = rng.random_range(0..64);
            let lat = rng.random_range(0..32);
            let sphere = generate_sphere(long, lat);
            assert!(sphere.validate().is_ok(), "{}x{}", long, lat);
            for n in &sphere.normals {
                assert!((Vector3::from(*n).magnitude() - 1.0).abs() < 1e-5);
            }
        }
    }

    #[test]
    fn test_plane_generation() {
        let plane = generate_plane(20.0, 10.0, 4, 2);
        assert_eq!(plane.vertex_count(), 5 * 3);
        assert_eq!(plane.triangle_count(), 4 * 2 * 2);
        assert!(plane.validate().is_ok());

        let aabb = plane.bounding_box().unwrap();
        assert_eq!(aabb.min.x, -10.0);
        assert_eq!(aabb.max.z, 5.0);

        // All triangles face +Y
        for t in plane.indices.chunks_exact(3) {
            let a = Vector3::from(plane.positions[t[0] as usize]);
            let b = Vector3::from(plane.positions[t[1] as usize]);
            let c = Vector3::from(plane.positions[t[2] as usize]);
            assert!((b - a).cross(c - a).y > 0.0);
        }
    }

    #[test]
    fn test_cone_faces_point_outward() {
        let cone = generate_cone(2.0, 10.0, 16);
        assert_eq!(cone.vertex_count(), 18);
        assert_eq!(cone.triangle_count(), 32);
        assert!(cone.validate().is_ok());

        // Reference point on the axis, inside the volume
        assert_eq!(inward_facing_triangles(&cone, Vector3::new(0.0, 0.0, -5.0)), 0);
        assert_eq!(cone.positions[16], [0.0, 0.0, 0.0]);
        for p in &cone.positions[..16] {
            assert_eq!(p[2], -10.0);
            assert!((p[0].hypot(p[1]) - 2.0).abs() < 1e-5);
        }
        assert_eq!(cone.positions[17], [0.0, 0.0, -10.0]);
    }

    #[test]
    fn test_cone_is_closed() {
        // Every edge is shared by exactly two triangles, so rays leaving
        // through the base still hit a face
        let cone = generate_cone(3.0, 4.0, 12);
        let mut edges = std::collections::HashMap::new();
        for t in cone.indices.chunks_exact(3) {
            for (a, b) in [(t[0], t[1]), (t[1], t[2]), (t[2], t[0])] {
                *edges.entry((a.min(b), a.max(b))).or_insert(0) += 1;
            }
        }
        assert!(edges.values().all(|&count| count == 2));

        // The cap faces away from the tip
        let cap_faces = cone.indices[3 * 12..]
            .chunks_exact(3)
            .map(|t| {
                let a = Vector3::from(cone.positions[t[0] as usize]);
                let b = Vector3::from(cone.positions[t[1] as usize]);
                let c = Vector3::from(cone.positions[t[2] as usize]);
                (b - a).cross(c - a)
            })
            .filter(|n| n.z < 0.0)
            .count();
        assert_eq!(cap_faces, 12);
    }

    #[test]
    fn test_fullscreen_quad_texcoords() {
        let quad = generate_fullscreen_quad();
        assert!(quad.validate().is_ok());
        for (p, tc) in quad.positions.iter().zip(&quad.tex_coords) {
            assert_eq!(tc[0], p[0] * 0.5 + 0.5);
            assert_eq!(tc[1], 0.5 - p[1] * 0.5);
        }
    }
}
