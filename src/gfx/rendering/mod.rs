//! Core rendering functionality
//!
//! Device context, pipeline creation, the G-buffer and shadow map targets,
//! the per-frame pass plan and the window-facing render engine.

pub mod context;
pub mod frame_plan;
pub mod gbuffer;
pub mod pipeline;
pub mod render_engine;
pub mod shadow_map;

// Re-export main types
pub use context::GpuContext;
pub use frame_plan::{FramePlan, Pass};
pub use gbuffer::GBuffer;
pub use pipeline::{PipelineConfig, PipelineFactory};
pub use render_engine::RenderEngine;
pub use shadow_map::ShadowMap;
