use cgmath::{perspective, EuclideanSpace, Matrix4, Point3, Rad, SquareMatrix, Vector3};
use log::warn;

/// Maps OpenGL clip space depth (-1..1) onto wgpu's 0..1 range
#[rustfmt::skip]
pub const OPENGL_TO_WGPU_MATRIX: Matrix4<f32> = Matrix4::new(
    1.0, 0.0, 0.0, 0.0,
    0.0, 1.0, 0.0, 0.0,
    0.0, 0.0, 0.5, 0.5,
    0.0, 0.0, 0.0, 1.0,
);

/// Right-handed perspective projection producing wgpu clip space
pub fn perspective_projection(fovy: Rad<f32>, aspect: f32, znear: f32, zfar: f32) -> Matrix4<f32> {
    OPENGL_TO_WGPU_MATRIX * perspective(fovy, aspect, znear, zfar)
}

/// Right-handed view matrix looking from `eye` at `target`
pub fn look_at(eye: Point3<f32>, target: Point3<f32>, up: Vector3<f32>) -> Matrix4<f32> {
    Matrix4::look_at_rh(eye, target, up)
}

/// Inverts `matrix`, falling back to identity for singular input
pub fn invert_or_identity(matrix: &Matrix4<f32>) -> Matrix4<f32> {
    matrix.invert().unwrap_or_else(|| {
        warn!("Attempted to invert a singular matrix, using identity");
        Matrix4::identity()
    })
}

pub fn convert_matrix4_to_array(matrix4: Matrix4<f32>) -> [[f32; 4]; 4] {
    matrix4.into()
}

/// Projection and view pair the scene renders with
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Camera {
    pub projection: Matrix4<f32>,
    pub view: Matrix4<f32>,
}

impl Default for Camera {
    fn default() -> Self {
        Self {
            projection: perspective_projection(Rad(std::f32::consts::FRAC_PI_3), 4.0 / 3.0, 0.01, 100.0),
            view: Matrix4::identity(),
        }
    }
}

impl Camera {
    pub fn set_perspective(&mut self, fovy: Rad<f32>, aspect: f32, znear: f32, zfar: f32) {
        self.projection = perspective_projection(fovy, aspect, znear, zfar);
    }

    pub fn set_look_at(&mut self, eye: Point3<f32>, target: Point3<f32>, up: Vector3<f32>) {
        self.view = look_at(eye, target, up);
    }

    /// World space eye position recovered from the view matrix
    pub fn eye(&self) -> Point3<f32> {
        Point3::from_vec(invert_or_identity(&self.view).w.truncate())
    }

    pub fn uniform(&self) -> ViewUniform {
        ViewUniform::new(&self.projection, &self.view)
    }
}

/// Per-view shader constants
///
/// Shared by the camera and every shadow-casting light, one buffer per view.
#[repr(C)]
#[derive(Copy, Clone, bytemuck::Pod, bytemuck::Zeroable, Debug, PartialEq)]
pub struct ViewUniform {
    pub projection: [[f32; 4]; 4],
    pub view: [[f32; 4]; 4],
    pub inv_projection: [[f32; 4]; 4],
    pub inv_view: [[f32; 4]; 4],
}

impl Default for ViewUniform {
    fn default() -> Self {
        Self::new(&Matrix4::identity(), &Matrix4::identity())
    }
}

impl ViewUniform {
    pub fn new(projection: &Matrix4<f32>, view: &Matrix4<f32>) -> Self {
        Self {
            projection: convert_matrix4_to_array(*projection),
            view: convert_matrix4_to_array(*view),
            inv_projection: convert_matrix4_to_array(invert_or_identity(projection)),
            inv_view: convert_matrix4_to_array(invert_or_identity(view)),
        }
    }
}

/// Reconstructs the eye space position of a fragment
///
/// `uv` is in texture space (origin top-left), `depth` the stored 0..1 depth.
/// Mirrors the reconstruction done by the lighting and depth of field shaders.
pub fn eye_position_from_depth(
    inv_projection: &Matrix4<f32>,
    uv: [f32; 2],
    depth: f32,
) -> Vector3<f32> {
    let ndc = cgmath::Vector4::new(uv[0] * 2.0 - 1.0, 1.0 - uv[1] * 2.0, depth, 1.0);
    let pos = inv_projection * ndc;
    pos.truncate() / pos.w
}

#[cfg(test)]
mod tests {
    use super::*;
    use cgmath::{Deg, InnerSpace, Transform};

    #[test]
    fn test_projection_maps_depth_to_unit_range() {
        let proj = perspective_projection(Deg(60.0).into(), 1.0, 1.0, 100.0);
        let near = proj.transform_point(Point3::new(0.0, 0.0, -1.0));
        let far = proj.transform_point(Point3::new(0.0, 0.0, -100.0));
        assert!(near.z.abs() < 1e-5);
        assert!((far.z - 1.0).abs() < 1e-4);
    }

    #[test]
    fn test_eye_position_round_trip() {
        let proj = perspective_projection(Deg(60.0).into(), 4.0 / 3.0, 0.01, 100.0);
        let inv = invert_or_identity(&proj);

        let eye = Point3::new(0.4, -0.3, -5.0);
        let clip = proj.transform_point(eye);
        let uv = [clip.x * 0.5 + 0.5, 0.5 - clip.y * 0.5];

        let rebuilt = eye_position_from_depth(&inv, uv, clip.z);
        assert!((rebuilt - eye.to_vec()).magnitude() < 1e-3);
    }

    #[test]
    fn test_camera_eye_from_view() {
        let mut camera = Camera::default();
        camera.set_look_at(
            Point3::new(1.0, 3.0, -6.0),
            Point3::new(0.0, 0.6, 0.7),
            Vector3::unit_y(),
        );
        let eye = camera.eye();
        assert!((eye - Point3::new(1.0, 3.0, -6.0)).magnitude() < 1e-4);
    }

    #[test]
    fn test_singular_inverse_falls_back_to_identity() {
        let zero = Matrix4::from_scale(0.0);
        assert_eq!(invert_or_identity(&zero), Matrix4::identity());
    }
}
