use std::sync::Arc;

use cgmath::{Deg, Matrix, Matrix4, SquareMatrix, Vector3};

use crate::errors::Result;
use crate::gfx::camera::camera_utils::{convert_matrix4_to_array, invert_or_identity};
use crate::gfx::geometry::GeometryData;
use crate::gfx::rendering::context::GpuContext;
use crate::gfx::resources::mesh::{Attribute, Drawable};
use crate::wgpu_utils::UniformBuffer;

/// Per-object constants of the geometry and shadow passes
#[repr(C)]
#[derive(Copy, Clone, bytemuck::Pod, bytemuck::Zeroable, Debug, PartialEq)]
pub struct ObjectUniform {
    pub model: [[f32; 4]; 4],
    /// Inverse transpose of `model`, for normals
    pub normal_model: [[f32; 4]; 4],
    pub color: [f32; 4],
}

impl ObjectUniform {
    pub fn new(model: &Matrix4<f32>, color: [f32; 4]) -> Self {
        Self {
            model: convert_matrix4_to_array(*model),
            normal_model: convert_matrix4_to_array(invert_or_identity(model).transpose()),
            color,
        }
    }
}

/// A drawable with a model matrix and a flat diffuse colour
pub struct Object {
    drawable: Drawable,
    model: Matrix4<f32>,
    color: [f32; 4],
    uniform: UniformBuffer<ObjectUniform>,
    bind_group: wgpu::BindGroup,
}

impl Object {
    /// Uploads `geometry` and places it at the origin
    pub fn new(ctx: &Arc<GpuContext>, geometry: &GeometryData, color: [f32; 4]) -> Result<Self> {
        let drawable = Drawable::new(&ctx.device, geometry, "Object")?;
        Ok(Self::from_drawable(ctx, drawable, color))
    }

    pub fn from_drawable(ctx: &Arc<GpuContext>, drawable: Drawable, color: [f32; 4]) -> Self {
        let model = Matrix4::identity();
        let uniform = UniformBuffer::new_with_data(&ctx.device, &ObjectUniform::new(&model, color));
        let bind_group = uniform.bind_group(&ctx.device, &ctx.layouts.object, "Object Bind Group");

        Self {
            drawable,
            model,
            color,
            uniform,
            bind_group,
        }
    }

    pub fn drawable(&self) -> &Drawable {
        &self.drawable
    }

    pub fn model_matrix(&self) -> Matrix4<f32> {
        self.model
    }

    pub fn set_model_matrix(&mut self, model: Matrix4<f32>) {
        self.model = model;
    }

    /// Replaces the model matrix with a translation
    pub fn set_translation(&mut self, translation: Vector3<f32>) {
        self.model = Matrix4::from_translation(translation);
    }

    /// Translation, rotation about Y and uniform scale, applied as T * R * S
    pub fn set_transform_trs(&mut self, translation: Vector3<f32>, rotation_y: Deg<f32>, scale: f32) {
        self.model = Matrix4::from_translation(translation)
            * Matrix4::from_angle_y(rotation_y)
            * Matrix4::from_scale(scale);
    }

    pub fn color(&self) -> [f32; 4] {
        self.color
    }

    pub fn set_color(&mut self, color: [f32; 4]) {
        self.color = color;
    }

    pub fn uniform(&self) -> ObjectUniform {
        ObjectUniform::new(&self.model, self.color)
    }

    /// Uploads model matrix and colour if they changed since the last call
    pub(crate) fn sync(&mut self, queue: &wgpu::Queue) {
        let content = self.uniform();
        self.uniform.update_content(queue, content);
    }

    /// Binds the object constants to group 1 and draws `attributes`
    pub(crate) fn draw(&self, pass: &mut wgpu::RenderPass<'_>, attributes: &[Attribute]) {
        pass.set_bind_group(1, &self.bind_group, &[]);
        self.drawable.draw(pass, attributes);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cgmath::{InnerSpace, Vector4};

    #[test]
    fn test_uniform_of_identity() {
        let uniform = ObjectUniform::new(&Matrix4::identity(), [1.0, 0.5, 0.25, 1.0]);
        let identity = convert_matrix4_to_array(Matrix4::identity());
        assert_eq!(uniform.model, identity);
        assert_eq!(uniform.normal_model, identity);
        assert_eq!(uniform.color, [1.0, 0.5, 0.25, 1.0]);
    }

    #[test]
    fn test_normal_matrix_keeps_normals_perpendicular() {
        let model = Matrix4::from_nonuniform_scale(2.0, 0.5, 1.0);
        let uniform = ObjectUniform::new(&model, [1.0; 4]);
        let normal_model = Matrix4::from(uniform.normal_model);

        // Tangent and normal of the plane x + y = 0
        let tangent = model * Vector4::new(1.0, -1.0, 0.0, 0.0);
        let normal = normal_model * Vector4::new(1.0, 1.0, 0.0, 0.0);
        assert!(tangent.truncate().dot(normal.truncate()).abs() < 1e-5);
    }
}
