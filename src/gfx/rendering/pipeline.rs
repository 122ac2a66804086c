//! Render pipeline creation
//!
//! [`PipelineConfig`] describes a pipeline with builder methods;
//! [`PipelineFactory`] compiles WGSL modules and turns configs into
//! pipelines, reporting failures as [`RenderError`] instead of panicking.

use std::collections::HashMap;
use std::sync::Arc;

use log::{debug, error};
use wgpu::*;

use crate::errors::{RenderError, Result};
use crate::gfx::resources::mesh::Attribute;

use super::context::GpuContext;

/// Vertex stage `vs_fullscreen` shared by all full-screen passes
pub const FULLSCREEN_VS: &str = include_str!("fullscreen.wgsl");

/// Configuration for creating a render pipeline
///
/// Defines all parameters needed to create a wgpu render pipeline,
/// including shaders, bind group layouts, and render state.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub label: String,
    pub shader: String,
    pub vs_entry: String,
    pub fs_entry: String,
    pub bind_group_layouts: Vec<BindGroupLayout>,
    /// Vertex streams, bound to consecutive slots and locations
    pub vertex_attributes: Vec<Attribute>,
    pub primitive_topology: PrimitiveTopology,
    pub cull_mode: Option<Face>,
    pub depth_stencil: Option<DepthStencilState>,
    pub color_targets: Vec<Option<ColorTargetState>>,
    /// Depth-only pipelines have no fragment stage
    pub vertex_only: bool,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            label: "Default Pipeline".to_string(),
            shader: "shader".to_string(),
            vs_entry: "vs_main".to_string(),
            fs_entry: "fs_main".to_string(),
            bind_group_layouts: Vec::new(),
            vertex_attributes: vec![Attribute::Position],
            primitive_topology: PrimitiveTopology::TriangleList,
            cull_mode: Some(Face::Back),
            depth_stencil: None,
            color_targets: Vec::new(),
            vertex_only: false,
        }
    }
}

impl PipelineConfig {
    /// Creates a new config with a specific shader
    pub fn default_with_shader(shader: &str) -> Self {
        Self {
            shader: shader.to_string(),
            ..Default::default()
        }
    }

    /// Full-screen pass: quad streams, no culling, one colour target
    ///
    /// The shader must include [`FULLSCREEN_VS`] and define `fs_main`.
    pub fn fullscreen(shader: &str, format: TextureFormat, blend: Option<BlendState>) -> Self {
        Self::default_with_shader(shader)
            .with_entry_points("vs_fullscreen", "fs_main")
            .with_vertex_attributes(vec![Attribute::Position, Attribute::TexCoord])
            .with_cull_mode(None)
            .with_color_target(format, blend)
    }

    pub fn with_label(mut self, label: &str) -> Self {
        self.label = label.to_owned();
        self
    }

    pub fn with_cull_mode(mut self, face: Option<Face>) -> Self {
        self.cull_mode = face;
        self
    }

    pub fn with_vertex_only(mut self) -> Self {
        self.vertex_only = true;
        self.color_targets.clear();
        self
    }

    /// Sets the shader for this pipeline (builder pattern)
    pub fn with_shader(mut self, shader: &str) -> Self {
        self.shader = shader.to_string();
        self
    }

    pub fn with_entry_points(mut self, vs_entry: &str, fs_entry: &str) -> Self {
        self.vs_entry = vs_entry.to_owned();
        self.fs_entry = fs_entry.to_owned();
        self
    }

    /// Sets all bind group layouts at once (builder pattern)
    pub fn with_bind_group_layouts(mut self, layouts: Vec<BindGroupLayout>) -> Self {
        self.bind_group_layouts = layouts;
        self
    }

    pub fn with_vertex_attributes(mut self, attributes: Vec<Attribute>) -> Self {
        self.vertex_attributes = attributes;
        self
    }

    /// Enables depth testing against an attachment of `format`
    pub fn with_depth(mut self, format: TextureFormat, write: bool, compare: CompareFunction) -> Self {
        self.depth_stencil = Some(DepthStencilState {
            format,
            depth_write_enabled: write,
            depth_compare: compare,
            stencil: StencilState::default(),
            bias: DepthBiasState::default(),
        });
        self
    }

    /// Sets color targets for this pipeline (builder pattern)
    pub fn with_color_targets(mut self, targets: Vec<Option<ColorTargetState>>) -> Self {
        self.color_targets = targets;
        self
    }

    /// Replaces the colour targets with a single one
    pub fn with_color_target(self, format: TextureFormat, blend: Option<BlendState>) -> Self {
        self.with_color_targets(vec![Some(ColorTargetState {
            format,
            blend,
            write_mask: ColorWrites::ALL,
        })])
    }

    /// Sets primitive topology for this pipeline (builder pattern)
    pub fn with_primitive_topology(mut self, topology: PrimitiveTopology) -> Self {
        self.primitive_topology = topology;
        self
    }
}

/// Compiles shaders and creates pipelines inside validation error scopes
pub struct PipelineFactory {
    ctx: Arc<GpuContext>,
    shader_modules: HashMap<String, ShaderModule>,
}

impl PipelineFactory {
    pub fn new(ctx: Arc<GpuContext>) -> Self {
        Self {
            ctx,
            shader_modules: HashMap::new(),
        }
    }

    /// Loads and compiles a WGSL shader module under `name`
    ///
    /// On failure the error carries a line-numbered listing of `source` and
    /// the compiler log.
    pub fn load_shader(&mut self, name: &str, source: &str) -> Result<()> {
        let (module, error) = self.ctx.capture_validation(|device| {
            device.create_shader_module(ShaderModuleDescriptor {
                label: Some(name),
                source: ShaderSource::Wgsl(source.into()),
            })
        });

        if let Some(log) = error {
            error!("Shader '{}' failed to compile", name);
            return Err(RenderError::ShaderCompilation {
                label: name.to_owned(),
                listing: numbered_listing(source),
                log,
            });
        }

        debug!("Compiled shader '{}'", name);
        self.shader_modules.insert(name.to_string(), module);
        Ok(())
    }

    pub fn has_shader(&self, name: &str) -> bool {
        self.shader_modules.contains_key(name)
    }

    /// Creates a render pipeline from configuration
    pub fn create_pipeline(&self, config: &PipelineConfig) -> Result<RenderPipeline> {
        let shader = self.shader_modules.get(&config.shader).ok_or_else(|| {
            RenderError::PipelineCreation {
                label: config.label.clone(),
                log: format!("shader '{}' not loaded", config.shader),
            }
        })?;

        let vertex_buffers = Attribute::layouts(&config.vertex_attributes);

        let (pipeline, error) = self.ctx.capture_validation(|device| {
            let bind_group_layout_refs: Vec<&BindGroupLayout> =
                config.bind_group_layouts.iter().collect();
            let pipeline_layout = device.create_pipeline_layout(&PipelineLayoutDescriptor {
                label: Some(&format!("{} Layout", config.label)),
                bind_group_layouts: &bind_group_layout_refs,
                push_constant_ranges: &[],
            });

            let fragment = if config.vertex_only {
                None
            } else {
                Some(FragmentState {
                    module: shader,
                    entry_point: Some(&config.fs_entry),
                    targets: &config.color_targets,
                    compilation_options: PipelineCompilationOptions::default(),
                })
            };

            device.create_render_pipeline(&RenderPipelineDescriptor {
                label: Some(&config.label),
                layout: Some(&pipeline_layout),
                vertex: VertexState {
                    module: shader,
                    entry_point: Some(&config.vs_entry),
                    buffers: &vertex_buffers,
                    compilation_options: PipelineCompilationOptions::default(),
                },
                fragment,
                primitive: PrimitiveState {
                    topology: config.primitive_topology,
                    strip_index_format: None,
                    front_face: FrontFace::Ccw,
                    cull_mode: config.cull_mode,
                    polygon_mode: PolygonMode::Fill,
                    unclipped_depth: false,
                    conservative: false,
                },
                depth_stencil: config.depth_stencil.clone(),
                multisample: MultisampleState::default(),
                multiview: None,
                cache: None,
            })
        });

        if let Some(log) = error {
            error!("Pipeline '{}' failed validation", config.label);
            return Err(RenderError::PipelineCreation {
                label: config.label.clone(),
                log,
            });
        }

        debug!("Created pipeline '{}'", config.label);
        Ok(pipeline)
    }

    /// Compiles `source` under `name` if needed and creates one pipeline from it
    pub fn create_with_shader(
        &mut self,
        name: &str,
        source: &str,
        config: PipelineConfig,
    ) -> Result<RenderPipeline> {
        if !self.has_shader(name) {
            self.load_shader(name, source)?;
        }
        self.create_pipeline(&config.with_shader(name))
    }
}

/// Prefixes every line of `source` with its 1-based line number
pub fn numbered_listing(source: &str) -> String {
    source
        .lines()
        .enumerate()
        .map(|(i, line)| format!("{:4}: {}", i + 1, line))
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_numbered_listing() {
        let listing = numbered_listing("fn a() {}\nfn b() {}");
        assert_eq!(listing, "   1: fn a() {}\n   2: fn b() {}");
    }

    #[test]
    fn test_fullscreen_config() {
        let config = PipelineConfig::fullscreen("blit", TextureFormat::Rgba8Unorm, None);
        assert_eq!(config.cull_mode, None);
        assert_eq!(
            config.vertex_attributes,
            vec![Attribute::Position, Attribute::TexCoord]
        );
        assert_eq!(config.color_targets.len(), 1);
        assert!(config.depth_stencil.is_none());
    }

    #[test]
    fn test_vertex_only_drops_color_targets() {
        let config = PipelineConfig::default()
            .with_color_target(TextureFormat::Rgba8Unorm, None)
            .with_vertex_only();
        assert!(config.vertex_only);
        assert!(config.color_targets.is_empty());
    }
}
