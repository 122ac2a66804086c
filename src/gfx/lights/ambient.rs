use std::sync::Arc;

use cgmath::Matrix4;

use crate::errors::Result;
use crate::gfx::rendering::context::GpuContext;
use crate::gfx::rendering::gbuffer::GBuffer;
use crate::gfx::rendering::pipeline::{PipelineConfig, PipelineFactory, FULLSCREEN_VS};
use crate::gfx::resources::mesh::Attribute;
use crate::wgpu_utils::{binding_types, BindGroupLayoutBuilder, UniformBuffer};

use super::{DepthPass, Light, ADDITIVE, LIGHTING_FORMAT};

/// Fraction of the albedo every surface receives without direct light
pub const AMBIENT_FACTOR: f32 = 0.2;

#[repr(C)]
#[derive(Copy, Clone, bytemuck::Pod, bytemuck::Zeroable, Debug)]
struct AmbientUniform {
    factor: [f32; 4],
}

/// Uniform ambient term over the whole screen
///
/// Casts no shadows and ignores the camera.
pub struct AmbientLight {
    ctx: Arc<GpuContext>,
    pipeline: wgpu::RenderPipeline,
    bind_group: wgpu::BindGroup,
    _uniform: UniformBuffer<AmbientUniform>,
}

impl AmbientLight {
    pub fn new(ctx: &Arc<GpuContext>) -> Result<Self> {
        let layout = BindGroupLayoutBuilder::new()
            .next_binding_fragment(binding_types::uniform())
            .create(&ctx.device, "Ambient Bind Group Layout");

        let uniform = UniformBuffer::new_with_data(
            &ctx.device,
            &AmbientUniform {
                factor: [AMBIENT_FACTOR, 0.0, 0.0, 0.0],
            },
        );

        let bind_group = uniform.bind_group(&ctx.device, &layout, "Ambient Bind Group");

        let source = format!("{}\n{}", FULLSCREEN_VS, include_str!("ambient.wgsl"));
        let pipeline = PipelineFactory::new(ctx.clone()).create_with_shader(
            "ambient",
            &source,
            PipelineConfig::fullscreen("ambient", LIGHTING_FORMAT, Some(ADDITIVE))
                .with_label("Ambient Light")
                .with_bind_group_layouts(vec![
                    ctx.layouts.gbuffer.layout.clone(),
                    layout.layout.clone(),
                ]),
        )?;

        Ok(Self {
            ctx: ctx.clone(),
            pipeline,
            bind_group,
            _uniform: uniform,
        })
    }

    /// Contribution for a surface of colour `albedo`
    pub fn contribution(albedo: [f32; 4]) -> [f32; 4] {
        albedo.map(|c| AMBIENT_FACTOR * c)
    }
}

impl Light for AmbientLight {
    fn label(&self) -> &str {
        "ambient"
    }

    fn needs_depth_pass(&self) -> bool {
        false
    }

    fn begin_depth_pass<'e>(&self, _encoder: &'e mut wgpu::CommandEncoder) -> Option<DepthPass<'e>> {
        None
    }

    fn render(
        &mut self,
        pass: &mut wgpu::RenderPass<'_>,
        gbuffer: &GBuffer,
        _projection: &Matrix4<f32>,
        _view: &Matrix4<f32>,
    ) {
        pass.set_pipeline(&self.pipeline);
        pass.set_bind_group(0, gbuffer.bind_group(), &[]);
        pass.set_bind_group(1, &self.bind_group, &[]);
        self.ctx
            .fullscreen_quad
            .draw(pass, &[Attribute::Position, Attribute::TexCoord]);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_contribution_is_fifth_of_albedo() {
        assert_eq!(
            AmbientLight::contribution([1.0, 0.5, 0.0, 1.0]),
            [0.2, 0.1, 0.0, 0.2]
        );
    }
}
