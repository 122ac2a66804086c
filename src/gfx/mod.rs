//! # Graphics Module
//!
//! Everything between mesh data and presented pixels.
//!
//! ## Architecture Overview
//!
//! - **Camera** ([`camera`]) - projection/view pairs and the demo orbit path
//! - **Geometry** ([`geometry`]) - CPU meshes: primitives and OBJ import
//! - **Resources** ([`resources`]) - textures, render targets, GPU meshes
//! - **Rendering** ([`rendering`]) - device context, pipelines, G-buffer,
//!   shadow maps, frame plan and the window render engine
//! - **Lights** ([`lights`]) - ambient and shadowed spot lights
//! - **Post processing** ([`post`]) - depth of field, bloom, G-buffer preview
//! - **Scene** ([`scene`]) - objects, lights and filters rendered per frame
//!
//! ## Frame
//!
//! Each call to [`Scene::render`] runs, in order: one depth pass per
//! shadow casting light, the geometry pass into the G-buffer, the additive
//! lighting pass, every post filter, and a blit into the presented view.
//!
//! [`Scene::render`]: scene::Scene::render

pub mod camera;
pub mod geometry;
pub mod lights;
pub mod post;
pub mod rendering;
pub mod resources;
pub mod scene;
pub mod shading;

// Re-export commonly used types
pub use camera::OrbitCamera;
pub use rendering::render_engine::RenderEngine;
