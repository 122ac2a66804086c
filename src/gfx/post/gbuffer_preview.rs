//! Debug view of the G-buffer contents, side by side

use std::sync::Arc;

use cgmath::Matrix4;

use crate::errors::Result;
use crate::gfx::rendering::context::GpuContext;
use crate::gfx::rendering::gbuffer::GBuffer;
use crate::gfx::rendering::pipeline::{PipelineConfig, PipelineFactory, FULLSCREEN_VS};
use crate::gfx::resources::render_target::RenderTarget;

use super::{fullscreen_pass, PostProcessFilter, FILTER_FORMAT};

/// Exponent applied to stored depth so nearby geometry is distinguishable
pub const DEPTH_EXPONENT: f32 = 16.0;

/// What the preview shows at horizontal texture coordinate `u`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PreviewColumn {
    Albedo,
    Depth,
    Normal,
}

impl PreviewColumn {
    pub fn at(u: f32) -> Self {
        match (u * 3.0) as i32 {
            i32::MIN..=0 => PreviewColumn::Albedo,
            1 => PreviewColumn::Depth,
            _ => PreviewColumn::Normal,
        }
    }
}

/// Displayed grey level for a stored depth value
pub fn preview_depth(depth: f32) -> f32 {
    depth.powf(DEPTH_EXPONENT)
}

/// Displayed colour for an eye space normal
pub fn preview_normal(n: [f32; 3]) -> [f32; 3] {
    n.map(|c| c * 0.5 + 0.5)
}

/// Replaces the image with albedo, depth and normal columns
///
/// Ignores its input, so it is normally registered last.
pub struct GBufferPreview {
    ctx: Arc<GpuContext>,
    output: RenderTarget,
    pipeline: wgpu::RenderPipeline,
}

impl GBufferPreview {
    pub fn new(ctx: &Arc<GpuContext>, width: u32, height: u32) -> Result<Self> {
        let output = RenderTarget::new(ctx, width, height, FILTER_FORMAT, "GBuffer Preview")?;

        let source = format!("{}\n{}", FULLSCREEN_VS, include_str!("gbuffer_preview.wgsl"));
        let pipeline = PipelineFactory::new(ctx.clone()).create_with_shader(
            "gbuffer_preview",
            &source,
            PipelineConfig::fullscreen("gbuffer_preview", FILTER_FORMAT, None)
                .with_label("GBuffer Preview")
                .with_bind_group_layouts(vec![ctx.layouts.gbuffer.layout.clone()]),
        )?;

        Ok(Self {
            ctx: ctx.clone(),
            output,
            pipeline,
        })
    }
}

impl PostProcessFilter for GBufferPreview {
    fn label(&self) -> &str {
        "gbuffer_preview"
    }

    fn apply(
        &mut self,
        encoder: &mut wgpu::CommandEncoder,
        gbuffer: &GBuffer,
        _input: &wgpu::TextureView,
        _projection: &Matrix4<f32>,
        _view: &Matrix4<f32>,
    ) -> wgpu::TextureView {
        fullscreen_pass(
            &self.ctx,
            encoder,
            self.output.view(),
            "GBuffer Preview",
            &self.pipeline,
            &[gbuffer.bind_group()],
        );
        self.output.view().clone()
    }

    fn resize(&mut self, width: u32, height: u32) -> Result<()> {
        self.output = RenderTarget::new(&self.ctx, width, height, FILTER_FORMAT, "GBuffer Preview")?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_columns() {
        assert_eq!(PreviewColumn::at(0.1), PreviewColumn::Albedo);
        assert_eq!(PreviewColumn::at(0.5), PreviewColumn::Depth);
        assert_eq!(PreviewColumn::at(0.9), PreviewColumn::Normal);
        assert_eq!(PreviewColumn::at(1.0), PreviewColumn::Normal);
    }

    #[test]
    fn test_preview_values() {
        assert_eq!(preview_depth(1.0), 1.0);
        assert!(preview_depth(0.9) < 0.2);
        assert_eq!(preview_normal([0.0, 1.0, -1.0]), [0.5, 1.0, 0.0]);
    }
}
