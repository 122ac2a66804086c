//! Penumbra
//!
//! A deferred shading renderer built on wgpu: shadowed spot lights
//! accumulated over a G-buffer, followed by screen-space post filters.

pub mod app;
pub mod config;
pub mod errors;
pub mod gfx;
pub mod prelude;
pub mod wgpu_utils;

// Re-export main types for convenience
pub use app::PenumbraApp;
pub use config::RendererConfig;
pub use errors::{RenderError, Result};
