//! Shadow casting spot light
//!
//! The light's opening angle is chosen so the cone just encloses a bounding
//! sphere of the scene around the look-at target. Its contribution is drawn
//! as a cone mesh covering the lit volume, so only pixels that can receive
//! light run the lighting shader.

use std::sync::Arc;

use cgmath::{InnerSpace, Matrix4, MetricSpace, Point3, Rad, Transform, Vector3, Vector4};
use log::{debug, warn};

use crate::errors::Result;
use crate::gfx::camera::camera_utils::{
    convert_matrix4_to_array, invert_or_identity, look_at, perspective_projection,
};
use crate::gfx::geometry::{generate_cone, GeometryData};
use crate::gfx::rendering::context::GpuContext;
use crate::gfx::rendering::gbuffer::GBuffer;
use crate::gfx::rendering::pipeline::{PipelineConfig, PipelineFactory};
use crate::gfx::rendering::shadow_map::ShadowMap;
use crate::gfx::resources::mesh::{Attribute, Drawable};
use crate::gfx::shading::smoothstep;
use crate::wgpu_utils::{binding_types, BindGroupLayoutBuilder, UniformBuffer};

use super::{DepthPass, Light, ADDITIVE, LIGHTING_FORMAT};

/// Falloff starts at this fraction of the half angle
pub const INNER_FALLOFF: f32 = 0.7;
/// Falloff reaches zero at this fraction of the half angle
pub const OUTER_FALLOFF: f32 = 0.8;
/// Subtracted from the projected depth before the shadow comparison
pub const SHADOW_BIAS: f32 = 0.02;
pub const SPECULAR_EXPONENT: f32 = 16.0;
pub const CONE_SEGMENTS: u32 = 16;
pub const CONE_LENGTH: f32 = 10.0;
/// Near and far planes of the shadow projection
pub const SHADOW_NEAR: f32 = 1.0;
pub const SHADOW_FAR: f32 = 100.0;

#[repr(C)]
#[derive(Copy, Clone, bytemuck::Pod, bytemuck::Zeroable, Debug)]
struct SpotUniform {
    cone_clip: [[f32; 4]; 4],
    inv_projection: [[f32; 4]; 4],
    shadow_matrix: [[f32; 4]; 4],
    position_angle: [f32; 4],
    direction: [f32; 4],
    color: [f32; 4],
    params: [f32; 4],
}

/// Half opening angle of a light at `position` aimed at `target` whose cone
/// encloses a sphere of `radius` around the target
///
/// The ratio is clamped below 1 for a light inside the sphere.
pub fn spot_half_angle(position: Point3<f32>, target: Point3<f32>, radius: f32) -> f32 {
    let distance = position.distance(target);
    let ratio = radius / distance;
    if ratio >= 1.0 {
        warn!(
            "Spot light at distance {} lies inside its bounding sphere of radius {}",
            distance, radius
        );
    }
    ratio.clamp(0.0, 0.999).asin()
}

/// Cone falloff for a ray at `angle` from the axis of a light with half angle `alpha`
///
/// 1 inside `0.7 alpha`, 0 beyond `0.8 alpha`, smooth in between.
pub fn cone_attenuation(angle: f32, alpha: f32) -> f32 {
    1.0 - smoothstep(alpha * INNER_FALLOFF, alpha * OUTER_FALLOFF, angle)
}

/// Light volume mesh in world space
///
/// Built in light view space (tip at the origin, opening along -Z) and moved
/// to world space with the inverse light view matrix.
pub fn spot_cone_geometry(alpha: f32, inverse_view: &Matrix4<f32>) -> GeometryData {
    let mut cone = generate_cone(CONE_LENGTH * alpha.sin(), CONE_LENGTH, CONE_SEGMENTS);
    for p in &mut cone.positions {
        *p = inverse_view.transform_point(Point3::from(*p)).into();
    }
    cone
}

pub struct SpotLight {
    ctx: Arc<GpuContext>,
    position: Point3<f32>,
    direction: Vector3<f32>,
    color: Vector3<f32>,
    alpha: f32,
    projection: Matrix4<f32>,
    view: Matrix4<f32>,
    shadow_map: ShadowMap,
    cone: Drawable,
    uniform: UniformBuffer<SpotUniform>,
    uniform_bind_group: wgpu::BindGroup,
    pipeline: wgpu::RenderPipeline,
}

impl SpotLight {
    /// Creates a light at `position` looking at `target`
    ///
    /// `scene_radius` bounds the scene around `target` and sets the opening
    /// angle. The shadow map size comes from the context's configuration.
    pub fn new(
        ctx: &Arc<GpuContext>,
        position: Point3<f32>,
        target: Point3<f32>,
        up: Vector3<f32>,
        scene_radius: f32,
        color: Vector3<f32>,
    ) -> Result<Self> {
        Self::with_shadow_map_size(
            ctx,
            position,
            target,
            up,
            scene_radius,
            color,
            ctx.config.shadow_map_size,
        )
    }

    #[allow(clippy::too_many_arguments)]
    pub fn with_shadow_map_size(
        ctx: &Arc<GpuContext>,
        position: Point3<f32>,
        target: Point3<f32>,
        up: Vector3<f32>,
        scene_radius: f32,
        color: Vector3<f32>,
        shadow_map_size: u32,
    ) -> Result<Self> {
        let alpha = spot_half_angle(position, target, scene_radius);
        let projection = perspective_projection(Rad(2.0 * alpha), 1.0, SHADOW_NEAR, SHADOW_FAR);
        let view = look_at(position, target, up);
        let direction = (target - position).normalize();

        let shadow_layout = ShadowMap::bind_group_layout(&ctx.device);
        let shadow_map = ShadowMap::new(ctx, &shadow_layout, shadow_map_size)?;

        let cone = Drawable::new(
            &ctx.device,
            &spot_cone_geometry(alpha, &invert_or_identity(&view)),
            "Spot Light Cone",
        )?;

        let uniform_layout = BindGroupLayoutBuilder::new()
            .next_binding_rendering(binding_types::uniform())
            .create(&ctx.device, "Spot Light Bind Group Layout");
        let uniform = UniformBuffer::new(&ctx.device);
        let uniform_bind_group = uniform.bind_group(
            &ctx.device,
            &uniform_layout,
            "Spot Light Bind Group",
        );

        // Only back faces are rasterised so the volume is still covered
        // when the camera is inside the cone
        let pipeline = PipelineFactory::new(ctx.clone()).create_with_shader(
            "spot_light",
            include_str!("spot.wgsl"),
            PipelineConfig::default()
                .with_label("Spot Light")
                .with_vertex_attributes(vec![Attribute::Position])
                .with_cull_mode(Some(wgpu::Face::Front))
                .with_color_target(LIGHTING_FORMAT, Some(ADDITIVE))
                .with_bind_group_layouts(vec![
                    ctx.layouts.gbuffer.layout.clone(),
                    uniform_layout.layout.clone(),
                    shadow_layout.layout.clone(),
                ]),
        )?;

        debug!(
            "Created spot light at {:?}, half angle {:.3} rad, shadow map {}",
            position, alpha, shadow_map_size
        );

        Ok(Self {
            ctx: ctx.clone(),
            position,
            direction,
            color,
            alpha,
            projection,
            view,
            shadow_map,
            cone,
            uniform,
            uniform_bind_group,
            pipeline,
        })
    }

    pub fn position(&self) -> Point3<f32> {
        self.position
    }

    pub fn direction(&self) -> Vector3<f32> {
        self.direction
    }

    pub fn color(&self) -> Vector3<f32> {
        self.color
    }

    /// Half opening angle in radians
    pub fn half_angle(&self) -> f32 {
        self.alpha
    }

    pub fn projection(&self) -> Matrix4<f32> {
        self.projection
    }

    pub fn view(&self) -> Matrix4<f32> {
        self.view
    }

    pub fn shadow_map(&self) -> &ShadowMap {
        &self.shadow_map
    }

    fn shader_constants(&self, projection: &Matrix4<f32>, view: &Matrix4<f32>) -> SpotUniform {
        let eye_position = view * self.position.to_homogeneous();
        let eye_direction = view * self.direction.extend(0.0);
        let shadow_matrix = self.projection * self.view * invert_or_identity(view);

        SpotUniform {
            cone_clip: convert_matrix4_to_array(projection * view),
            inv_projection: convert_matrix4_to_array(invert_or_identity(projection)),
            shadow_matrix: convert_matrix4_to_array(shadow_matrix),
            position_angle: [eye_position.x, eye_position.y, eye_position.z, self.alpha],
            direction: eye_direction.truncate().normalize().extend(0.0).into(),
            color: Vector4::new(self.color.x, self.color.y, self.color.z, 1.0).into(),
            params: [INNER_FALLOFF, OUTER_FALLOFF, SHADOW_BIAS, SPECULAR_EXPONENT],
        }
    }
}

impl Light for SpotLight {
    fn label(&self) -> &str {
        "spot"
    }

    fn needs_depth_pass(&self) -> bool {
        true
    }

    fn begin_depth_pass<'e>(&self, encoder: &'e mut wgpu::CommandEncoder) -> Option<DepthPass<'e>> {
        Some(DepthPass {
            pass: self.shadow_map.begin_depth_pass(encoder),
            projection: self.projection,
            view: self.view,
        })
    }

    fn end_depth_pass(&self, pass: DepthPass<'_>) {
        self.shadow_map.end_depth_pass(pass.pass);
    }

    fn render(
        &mut self,
        pass: &mut wgpu::RenderPass<'_>,
        gbuffer: &GBuffer,
        projection: &Matrix4<f32>,
        view: &Matrix4<f32>,
    ) {
        let constants = self.shader_constants(projection, view);
        self.uniform.update_content(&self.ctx.queue, constants);

        pass.set_pipeline(&self.pipeline);
        pass.set_bind_group(0, gbuffer.bind_group(), &[]);
        pass.set_bind_group(1, &self.uniform_bind_group, &[]);
        pass.set_bind_group(2, self.shadow_map.bind_group(), &[]);
        self.cone.draw(pass, &[Attribute::Position]);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gfx::geometry::primitives::tests::inward_facing_triangles;
    use cgmath::{EuclideanSpace, SquareMatrix};

    #[test]
    fn test_half_angle_encloses_sphere() {
        let alpha = spot_half_angle(Point3::new(0.0, 3.0, 0.0), Point3::new(0.0, 0.0, 0.0), 2.0);
        assert!((alpha - (2.0f32 / 3.0).asin()).abs() < 1e-6);

        // Light inside the sphere still yields a finite angle
        let alpha = spot_half_angle(Point3::new(0.0, 1.0, 0.0), Point3::new(0.0, 0.0, 0.0), 2.0);
        assert!(alpha.is_finite() && alpha < std::f32::consts::FRAC_PI_2);
    }

    #[test]
    fn test_cone_attenuation_falloff() {
        let alpha = 0.6;
        assert_eq!(cone_attenuation(0.0, alpha), 1.0);
        let mid = cone_attenuation(0.75 * alpha, alpha);
        assert!(mid > 0.0 && mid < 1.0);
        assert_eq!(cone_attenuation(alpha, alpha), 0.0);
        assert_eq!(cone_attenuation(0.8 * alpha, alpha), 0.0);
    }

    #[test]
    fn test_cone_attenuation_is_monotonic() {
        let alpha = 0.5;
        let mut previous = 1.0;
        for i in 0..=100 {
            let a = cone_attenuation(alpha * i as f32 / 100.0, alpha);
            assert!(a <= previous + 1e-6);
            previous = a;
        }
    }

    #[test]
    fn test_cone_geometry_in_world_space() {
        let position = Point3::new(0.0, 3.0, -2.0);
        let target = Point3::new(0.0, 0.0, -2.0);
        let view = look_at(position, target, Vector3::new(0.0, 0.0, -1.0));
        let alpha = spot_half_angle(position, target, 2.0);

        let cone = spot_cone_geometry(alpha, &view.invert().unwrap());
        assert!(cone.validate().is_ok());

        // Tip at the light, base ring below it along the light direction
        let tip = Point3::from(cone.positions[CONE_SEGMENTS as usize]);
        assert!(tip.distance(position) < 1e-4);
        for p in &cone.positions[..CONE_SEGMENTS as usize] {
            assert!((p[1] - (3.0 - CONE_LENGTH)).abs() < 1e-4);
        }

        // Base cap centred on the axis closes the volume
        let cap = Point3::from(cone.positions[CONE_SEGMENTS as usize + 1]);
        let expected = position + Vector3::new(0.0, -CONE_LENGTH, 0.0);
        assert!(cap.distance(expected) < 1e-4);

        let axis_point = position + Vector3::new(0.0, -CONE_LENGTH * 0.5, 0.0);
        assert_eq!(inward_facing_triangles(&cone, axis_point.to_vec()), 0);
    }
}
