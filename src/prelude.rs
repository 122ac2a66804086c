//! # Penumbra Prelude
//!
//! Commonly used types in one import.
//!
//! ```rust
//! use penumbra::prelude::*;
//! ```

pub use crate::app::{FrameInfo, PenumbraApp};
pub use crate::config::{BloomConfig, LensConfig, RendererConfig};
pub use crate::errors::{RenderError, Result};

pub use crate::gfx::camera::{Camera, OrbitCamera};
pub use crate::gfx::geometry::{
    generate_cone, generate_cube, generate_plane, generate_sphere, load_obj, GeometryData,
};
pub use crate::gfx::lights::{AmbientLight, Light, SpotLight};
pub use crate::gfx::post::{BlurFilter, DofFilter, GBufferPreview, PostProcessFilter};
pub use crate::gfx::rendering::{FramePlan, GpuContext, Pass, RenderEngine};
pub use crate::gfx::resources::{read_texture, RenderTarget};
pub use crate::gfx::scene::{Object, Scene};

pub use cgmath::{Deg, Matrix4, Point3, Rad, Vector3};
