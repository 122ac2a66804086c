use std::sync::Arc;

use cgmath::{Matrix4, Point3, Rad, Vector3};
use log::{debug, trace, warn};

use crate::errors::{RenderError, Result};
use crate::gfx::camera::camera_utils::{Camera, ViewUniform};
use crate::gfx::lights::Light;
use crate::gfx::post::PostProcessFilter;
use crate::gfx::rendering::context::GpuContext;
use crate::gfx::rendering::frame_plan::{FramePlan, Pass};
use crate::gfx::rendering::gbuffer::GBuffer;
use crate::gfx::rendering::pipeline::{PipelineConfig, PipelineFactory, FULLSCREEN_VS};
use crate::gfx::rendering::shadow_map::ShadowMap;
use crate::gfx::resources::mesh::Attribute;
use crate::gfx::resources::render_target::{begin_color_pass, RenderTarget};
use crate::wgpu_utils::UniformBuffer;

use super::object::Object;

/// View constants for one pass, with the bind group exposing them
struct ViewSlot {
    uniform: UniformBuffer<ViewUniform>,
    bind_group: wgpu::BindGroup,
}

impl ViewSlot {
    fn new(ctx: &GpuContext) -> Self {
        let uniform = UniformBuffer::new(&ctx.device);
        let bind_group = uniform.bind_group(&ctx.device, &ctx.layouts.view, "View Bind Group");
        Self {
            uniform,
            bind_group,
        }
    }
}

/// Objects, lights and post filters, rendered as one deferred frame
///
/// Everything is append-only and kept in registration order; every frame
/// walks the lists in that order.
pub struct Scene {
    ctx: Arc<GpuContext>,
    width: u32,
    height: u32,
    objects: Vec<Object>,
    lights: Vec<Box<dyn Light>>,
    filters: Vec<Box<dyn PostProcessFilter>>,
    camera: Camera,
    gbuffer: GBuffer,
    output: RenderTarget,
    // Slot 0 is the camera, then one per shadow pass of the frame
    views: Vec<ViewSlot>,
    geometry_pipeline: wgpu::RenderPipeline,
    shadow_pipeline: wgpu::RenderPipeline,
    blit_pipeline: wgpu::RenderPipeline,
    last_frame: Option<FramePlan>,
}

impl Scene {
    pub fn new(ctx: &Arc<GpuContext>, width: u32, height: u32) -> Result<Self> {
        let gbuffer = GBuffer::new(ctx, width, height)?;
        let output = RenderTarget::new_hdr(ctx, width, height, "Lighting Output")?;

        let mut factory = PipelineFactory::new(ctx.clone());
        factory.load_shader("geometry", include_str!("geometry.wgsl"))?;
        factory.load_shader("shadow_pass", include_str!("shadow_pass.wgsl"))?;
        factory.load_shader(
            "blit",
            &format!("{}\n{}", FULLSCREEN_VS, include_str!("blit.wgsl")),
        )?;

        let view_object_layouts = vec![
            ctx.layouts.view.layout.clone(),
            ctx.layouts.object.layout.clone(),
        ];

        let geometry_pipeline = factory.create_pipeline(
            &PipelineConfig::default_with_shader("geometry")
                .with_label("Geometry Pass")
                .with_bind_group_layouts(view_object_layouts.clone())
                .with_vertex_attributes(vec![Attribute::Position, Attribute::Normal])
                .with_depth(GBuffer::DEPTH_FORMAT, true, wgpu::CompareFunction::Less)
                .with_color_targets(GBuffer::color_targets()),
        )?;

        let shadow_pipeline = factory.create_pipeline(
            &PipelineConfig::default_with_shader("shadow_pass")
                .with_label("Shadow Pass")
                .with_bind_group_layouts(view_object_layouts)
                .with_vertex_attributes(vec![Attribute::Position])
                .with_depth(ShadowMap::FORMAT, true, wgpu::CompareFunction::Less)
                .with_vertex_only(),
        )?;

        let blit_pipeline = factory.create_pipeline(
            &PipelineConfig::fullscreen("blit", ctx.output_format, None)
                .with_label("Present Blit")
                .with_bind_group_layouts(vec![ctx.layouts.texture.layout.clone()]),
        )?;

        debug!("Created scene {}x{}", width, height);

        Ok(Self {
            ctx: ctx.clone(),
            width,
            height,
            objects: Vec::new(),
            lights: Vec::new(),
            filters: Vec::new(),
            camera: Camera::default(),
            gbuffer,
            output,
            views: vec![ViewSlot::new(ctx)],
            geometry_pipeline,
            shadow_pipeline,
            blit_pipeline,
            last_frame: None,
        })
    }

    /// Adds an object; it must carry position and normal streams
    ///
    /// Returns the object's index.
    pub fn add_object(&mut self, object: Object) -> Result<usize> {
        for attribute in [Attribute::Position, Attribute::Normal] {
            if !object.drawable().has_attribute(attribute) {
                return Err(RenderError::InvalidMesh(format!(
                    "scene objects need a {:?} stream",
                    attribute
                )));
            }
        }
        self.objects.push(object);
        Ok(self.objects.len() - 1)
    }

    pub fn add_light<L: Light + 'static>(&mut self, light: L) -> usize {
        debug!("Adding {} light", light.label());
        self.lights.push(Box::new(light));
        self.lights.len() - 1
    }

    pub fn add_post_filter<F: PostProcessFilter + 'static>(&mut self, filter: F) -> usize {
        debug!("Adding {} filter", filter.label());
        self.filters.push(Box::new(filter));
        self.filters.len() - 1
    }

    pub fn set_camera_perspective(&mut self, fovy: impl Into<Rad<f32>>, aspect: f32, near: f32, far: f32) {
        self.camera.set_perspective(fovy.into(), aspect, near, far);
    }

    pub fn set_camera_look_at(&mut self, eye: Point3<f32>, target: Point3<f32>, up: Vector3<f32>) {
        self.camera.set_look_at(eye, target, up);
    }

    pub fn set_camera_projection(&mut self, projection: Matrix4<f32>) {
        self.camera.projection = projection;
    }

    pub fn set_camera_view(&mut self, view: Matrix4<f32>) {
        self.camera.view = view;
    }

    pub fn camera_projection(&self) -> Matrix4<f32> {
        self.camera.projection
    }

    pub fn camera_view(&self) -> Matrix4<f32> {
        self.camera.view
    }

    pub fn camera(&self) -> &Camera {
        &self.camera
    }

    pub fn objects(&self) -> &[Object] {
        &self.objects
    }

    pub fn object_mut(&mut self, index: usize) -> Option<&mut Object> {
        self.objects.get_mut(index)
    }

    pub fn light_count(&self) -> usize {
        self.lights.len()
    }

    pub fn filter_count(&self) -> usize {
        self.filters.len()
    }

    /// Light labels in registration order
    pub fn light_labels(&self) -> Vec<&str> {
        self.lights.iter().map(|l| l.label()).collect()
    }

    /// Filter labels in registration order
    pub fn filter_labels(&self) -> Vec<&str> {
        self.filters.iter().map(|f| f.label()).collect()
    }

    pub fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    pub fn gbuffer(&self) -> &GBuffer {
        &self.gbuffer
    }

    /// Lighting accumulation target
    pub fn output(&self) -> &RenderTarget {
        &self.output
    }

    pub fn context(&self) -> &Arc<GpuContext> {
        &self.ctx
    }

    /// Passes the next call to [`Scene::render`] will execute
    pub fn frame_plan(&self) -> FramePlan {
        FramePlan::build(
            self.lights.iter().map(|l| l.needs_depth_pass()),
            self.filters.len(),
        )
    }

    /// Plan executed by the most recent frame
    pub fn last_frame(&self) -> Option<&FramePlan> {
        self.last_frame.as_ref()
    }

    /// Recreates the G-buffer, the lighting target and every filter target
    pub fn resize(&mut self, width: u32, height: u32) -> Result<()> {
        if (width, height) == (self.width, self.height) {
            return Ok(());
        }
        self.gbuffer = GBuffer::new(&self.ctx, width, height)?;
        self.output = RenderTarget::new_hdr(&self.ctx, width, height, "Lighting Output")?;
        for filter in &mut self.filters {
            filter.resize(width, height)?;
        }
        self.width = width;
        self.height = height;
        debug!("Resized scene to {}x{}", width, height);
        Ok(())
    }

    /// Records and submits one frame, presenting into `target`
    ///
    /// `target` must have the context's output format.
    pub fn render(&mut self, target: &wgpu::TextureView) {
        let plan = self.frame_plan();
        trace!("Frame plan: {}", plan);

        let queue = &self.ctx.queue;
        for object in &mut self.objects {
            object.sync(queue);
        }

        let shadow_passes = plan.shadow_lights().count();
        while self.views.len() < 1 + shadow_passes {
            self.views.push(ViewSlot::new(&self.ctx));
        }
        self.views[0].uniform.update_content(queue, self.camera.uniform());

        let projection = self.camera.projection;
        let view = self.camera.view;

        let mut encoder = self
            .ctx
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Frame Encoder"),
            });

        let mut next_view_slot = 1;
        let mut current = self.output.view().clone();

        for pass in plan.passes() {
            trace!("Pass {}", pass);
            match *pass {
                Pass::Shadow { light } => {
                    let light = &self.lights[light];
                    let Some(mut depth) = light.begin_depth_pass(&mut encoder) else {
                        warn!("Light '{}' has no depth target, skipping shadow pass", light.label());
                        continue;
                    };

                    let slot = &mut self.views[next_view_slot];
                    next_view_slot += 1;
                    slot.uniform
                        .update_content(queue, ViewUniform::new(&depth.projection, &depth.view));

                    depth.pass.set_pipeline(&self.shadow_pipeline);
                    depth.pass.set_bind_group(0, &slot.bind_group, &[]);
                    for object in &self.objects {
                        object.draw(&mut depth.pass, &[Attribute::Position]);
                    }
                    light.end_depth_pass(depth);
                }
                Pass::Geometry => {
                    let mut geometry = self.gbuffer.begin_write(&mut encoder);
                    geometry.set_pipeline(&self.geometry_pipeline);
                    geometry.set_bind_group(0, &self.views[0].bind_group, &[]);
                    for object in &self.objects {
                        object.draw(&mut geometry, &[Attribute::Position, Attribute::Normal]);
                    }
                    self.gbuffer.end_write(geometry);
                }
                Pass::Lighting { .. } => {
                    let mut lighting = self.output.begin_pass(&mut encoder);
                    for light in &mut self.lights {
                        light.render(&mut lighting, &self.gbuffer, &projection, &view);
                    }
                }
                Pass::Filter { filter } => {
                    current = self.filters[filter].apply(
                        &mut encoder,
                        &self.gbuffer,
                        &current,
                        &projection,
                        &view,
                    );
                }
                Pass::Present => {
                    let source = self.ctx.texture_bind_group(&current, "Present Source");
                    let mut present = begin_color_pass(&mut encoder, target, "Present");
                    present.set_pipeline(&self.blit_pipeline);
                    present.set_bind_group(0, &source, &[]);
                    self.ctx
                        .fullscreen_quad
                        .draw(&mut present, &[Attribute::Position, Attribute::TexCoord]);
                }
            }
        }

        self.ctx.queue.submit(std::iter::once(encoder.finish()));
        self.last_frame = Some(plan);
    }
}
