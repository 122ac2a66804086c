//! Depth of field
//!
//! Every pixel gathers a 32 tap Poisson disk from the input, scaled by its
//! thin lens circle of confusion. Pixels close to the focal plane keep the
//! input colour unchanged; the blurred average fades in as the circle grows.

use std::sync::Arc;

use cgmath::Matrix4;
use log::debug;

use crate::config::LensConfig;
use crate::errors::Result;
use crate::gfx::camera::camera_utils::{convert_matrix4_to_array, invert_or_identity};
use crate::gfx::rendering::context::GpuContext;
use crate::gfx::rendering::gbuffer::GBuffer;
use crate::gfx::rendering::pipeline::{PipelineConfig, PipelineFactory, FULLSCREEN_VS};
use crate::gfx::resources::render_target::RenderTarget;
use crate::gfx::shading::{mix, smoothstep};
use crate::wgpu_utils::{binding_types, BindGroupLayoutBuilder, UniformBuffer};

use super::{fullscreen_pass, PostProcessFilter, FILTER_FORMAT};

/// Offsets of the gather taps on the unit disk
///
/// A subset of the classic 34-tap Poisson disk gather: its 30 distinct
/// offsets with the repeated entries dropped, padded to 32 with the centre
/// and `(0, -0.5)` so the taps pack into 16 `vec4`s.
pub const DOF_TAPS: [[f32; 2]; 32] = [
    [0.158509, -0.884836],
    [0.475528, -0.654508],
    [0.792547, -0.424181],
    [0.890511, -0.122678],
    [0.769421, 0.250000],
    [0.648330, 0.622678],
    [0.391857, 0.809017],
    [0.000000, 0.809017],
    [-0.391857, 0.809017],
    [-0.648331, 0.622678],
    [-0.769421, 0.250000],
    [-0.890511, -0.122678],
    [-0.158509, -0.884836],
    [-0.475528, -0.654509],
    [-0.792547, -0.424181],
    [0.000000, -1.000000],
    [0.951056, -0.309017],
    [0.587785, 0.809017],
    [-0.587785, 0.809017],
    [-0.951057, -0.309017],
    [0.317019, -0.769672],
    [0.634038, -0.539345],
    [0.829966, 0.063661],
    [0.708876, 0.436339],
    [0.195928, 0.809017],
    [-0.195929, 0.809017],
    [-0.708876, 0.436339],
    [-0.829966, 0.063661],
    [-0.317019, -0.769672],
    [-0.634038, -0.539345],
    [0.000000, 0.000000],
    [0.000000, -0.500000],
];

#[repr(C)]
#[derive(Copy, Clone, bytemuck::Pod, bytemuck::Zeroable, Debug)]
struct DofUniform {
    inv_projection: [[f32; 4]; 4],
    lens: [f32; 4],
    blend: [f32; 4],
    taps: [[f32; 4]; 16],
}

impl DofUniform {
    fn new(lens: &LensConfig, projection: &Matrix4<f32>) -> Self {
        let mut taps = [[0.0; 4]; 16];
        for (pair, chunk) in taps.iter_mut().zip(DOF_TAPS.chunks_exact(2)) {
            *pair = [chunk[0][0], chunk[0][1], chunk[1][0], chunk[1][1]];
        }

        Self {
            inv_projection: convert_matrix4_to_array(invert_or_identity(projection)),
            lens: [
                lens.aperture,
                lens.focal_length(),
                lens.focus_distance,
                lens.max_coc,
            ],
            blend: [lens.sharp_coc, lens.full_coc, 0.0, 0.0],
            taps,
        }
    }
}

/// Thin lens circle of confusion for a point at eye distance `z`, clamped to `max_coc`
pub fn circle_of_confusion(lens: &LensConfig, z: f32) -> f32 {
    let f = lens.focal_length();
    let focus = lens.focus_distance;
    let coc = (lens.aperture * f * (focus - z) / (focus * (z - f))).abs();
    coc.min(lens.max_coc)
}

/// Final colour channel for an input `color` and the tap average `blurred`
pub fn dof_blend(lens: &LensConfig, coc: f32, color: f32, blurred: f32) -> f32 {
    let weight = smoothstep(lens.sharp_coc, lens.full_coc, coc);
    if weight <= 0.0 {
        return color;
    }
    mix(color, blurred, weight)
}

pub struct DofFilter {
    ctx: Arc<GpuContext>,
    lens: LensConfig,
    output: RenderTarget,
    pipeline: wgpu::RenderPipeline,
    uniform: UniformBuffer<DofUniform>,
    uniform_bind_group: wgpu::BindGroup,
}

impl DofFilter {
    /// Filter focused at `focus_distance` with the default lens
    pub fn new(ctx: &Arc<GpuContext>, width: u32, height: u32, focus_distance: f32) -> Result<Self> {
        Self::with_lens(
            ctx,
            width,
            height,
            LensConfig::default().with_focus_distance(focus_distance),
        )
    }

    pub fn with_lens(ctx: &Arc<GpuContext>, width: u32, height: u32, lens: LensConfig) -> Result<Self> {
        let output = RenderTarget::new(ctx, width, height, FILTER_FORMAT, "DoF Output")?;

        let uniform_layout = BindGroupLayoutBuilder::new()
            .next_binding_fragment(binding_types::uniform())
            .create(&ctx.device, "DoF Bind Group Layout");
        let uniform = UniformBuffer::new(&ctx.device);
        let uniform_bind_group = uniform.bind_group(&ctx.device, &uniform_layout, "DoF Bind Group");

        let source = format!("{}\n{}", FULLSCREEN_VS, include_str!("dof.wgsl"));
        let pipeline = PipelineFactory::new(ctx.clone()).create_with_shader(
            "dof",
            &source,
            PipelineConfig::fullscreen("dof", FILTER_FORMAT, None)
                .with_label("Depth of Field")
                .with_bind_group_layouts(vec![
                    ctx.layouts.gbuffer.layout.clone(),
                    ctx.layouts.texture.layout.clone(),
                    uniform_layout.layout.clone(),
                ]),
        )?;

        debug!("Created DoF filter, focus distance {}", lens.focus_distance);

        Ok(Self {
            ctx: ctx.clone(),
            lens,
            output,
            pipeline,
            uniform,
            uniform_bind_group,
        })
    }

    pub fn lens(&self) -> &LensConfig {
        &self.lens
    }

    pub fn set_focus_distance(&mut self, focus_distance: f32) {
        self.lens.focus_distance = focus_distance;
    }

    pub fn output(&self) -> &RenderTarget {
        &self.output
    }
}

impl PostProcessFilter for DofFilter {
    fn label(&self) -> &str {
        "dof"
    }

    fn apply(
        &mut self,
        encoder: &mut wgpu::CommandEncoder,
        gbuffer: &GBuffer,
        input: &wgpu::TextureView,
        projection: &Matrix4<f32>,
        _view: &Matrix4<f32>,
    ) -> wgpu::TextureView {
        self.uniform
            .update_content(&self.ctx.queue, DofUniform::new(&self.lens, projection));
        let input_group = self.ctx.texture_bind_group(input, "DoF Input");

        fullscreen_pass(
            &self.ctx,
            encoder,
            self.output.view(),
            "Depth of Field",
            &self.pipeline,
            &[gbuffer.bind_group(), &input_group, &self.uniform_bind_group],
        );
        self.output.view().clone()
    }

    fn resize(&mut self, width: u32, height: u32) -> Result<()> {
        self.output = RenderTarget::new(&self.ctx, width, height, FILTER_FORMAT, "DoF Output")?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_in_focus_passes_through() {
        let lens = LensConfig::default();
        let coc = circle_of_confusion(&lens, lens.focus_distance);
        assert!(coc < 1e-6);
        assert_eq!(dof_blend(&lens, coc, 0.37, 0.9), 0.37);
    }

    #[test]
    fn test_coc_grows_away_from_focus() {
        let lens = LensConfig::default();
        let near = circle_of_confusion(&lens, 2.5);
        let nearer = circle_of_confusion(&lens, 2.0);
        let far = circle_of_confusion(&lens, 6.0);
        assert!(nearer > near && near > 0.0);
        assert!(far > 0.0);
    }

    #[test]
    fn test_coc_is_clamped() {
        let lens = LensConfig::default();
        // Just beyond the focal length the unclamped circle diverges
        let coc = circle_of_confusion(&lens, lens.focal_length() + 1e-4);
        assert_eq!(coc, lens.max_coc);
        assert!(circle_of_confusion(&lens, 100.0) <= lens.max_coc);
    }

    #[test]
    fn test_large_coc_uses_tap_average() {
        let lens = LensConfig::default();
        assert_eq!(dof_blend(&lens, lens.max_coc, 0.37, 0.9), 0.9);

        let mid = dof_blend(&lens, 0.5 * (lens.sharp_coc + lens.full_coc), 0.0, 1.0);
        assert!(mid > 0.0 && mid < 1.0);
    }

    #[test]
    fn test_taps_are_distinct() {
        for (i, a) in DOF_TAPS.iter().enumerate() {
            for b in &DOF_TAPS[i + 1..] {
                assert!((a[0] - b[0]).abs() + (a[1] - b[1]).abs() > 1e-4, "{:?} repeats", a);
            }
        }
    }

    #[test]
    fn test_taps_lie_on_unit_disk() {
        for tap in DOF_TAPS {
            assert!(tap[0] * tap[0] + tap[1] * tap[1] <= 1.0 + 1e-5);
        }
    }

    #[test]
    fn test_uniform_packs_taps_in_pairs() {
        let uniform = DofUniform::new(&LensConfig::default(), &Matrix4::from_scale(1.0));
        assert_eq!(uniform.taps[0], [0.158509, -0.884836, 0.475528, -0.654508]);
        assert_eq!(uniform.taps[15], [0.0, 0.0, 0.0, -0.5]);
        assert!((uniform.lens[1] - 1.2).abs() < 1e-6);
    }
}
