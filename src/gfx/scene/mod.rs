//! # Scene
//!
//! The [`Scene`] owns everything one frame draws: [`Object`]s, lights and
//! post filters, plus the camera, the G-buffer and the lighting target.
//!
//! ```no_run
//! use penumbra::prelude::*;
//!
//! # fn main() -> penumbra::errors::Result<()> {
//! let ctx = GpuContext::new_headless(wgpu::TextureFormat::Rgba8Unorm, RendererConfig::default())?;
//! let mut scene = Scene::new(&ctx, 640, 480)?;
//! scene.add_object(Object::new(&ctx, &generate_sphere(32, 16), [1.0; 4])?)?;
//! scene.add_light(AmbientLight::new(&ctx)?);
//! # Ok(())
//! # }
//! ```

pub mod object;
pub mod scene;

// Re-export main types
pub use object::{Object, ObjectUniform};
pub use scene::Scene;
