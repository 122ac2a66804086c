//! Error Types
//!
//! Every setup step of the renderer (device creation, shader compilation,
//! render target allocation, mesh upload) returns [`Result<T>`]. None of these
//! errors is recoverable at runtime: the caller aborts scene construction and
//! reports the diagnostic. The only per-frame error is a surface that cannot
//! hand out textures any more.

use thiserror::Error;

/// The error type for the penumbra renderer.
#[derive(Error, Debug)]
pub enum RenderError {
    // ========================================================================
    // GPU & Surface Errors
    // ========================================================================
    /// No compatible GPU adapter was found.
    #[error("Failed to request WGPU adapter: {0}")]
    AdapterRequestFailed(#[from] wgpu::RequestAdapterError),

    /// Failed to create the GPU device.
    #[error("Failed to create WGPU device: {0}")]
    DeviceCreateFailed(#[from] wgpu::RequestDeviceError),

    /// Failed to create a presentation surface for the window.
    #[error("Failed to create surface: {0}")]
    SurfaceCreateFailed(#[from] wgpu::CreateSurfaceError),

    /// The surface has no texture format the renderer can present to.
    #[error("Surface is not supported by the adapter")]
    SurfaceUnsupported,

    /// Acquiring the next surface texture failed beyond recovery.
    #[error("Surface error: {0}")]
    Surface(#[from] wgpu::SurfaceError),

    /// Event loop error (winit).
    #[error("Event loop error: {0}")]
    EventLoop(#[from] winit::error::EventLoopError),

    /// Window creation failed.
    #[error("Window creation failed: {0}")]
    WindowCreate(#[from] winit::error::OsError),

    // ========================================================================
    // Shader & Pipeline Errors
    // ========================================================================
    /// A shader module failed to compile.
    ///
    /// `listing` is the numbered source, `log` the compiler output.
    #[error("Error compiling shader '{label}':\n{listing}\n{log}")]
    ShaderCompilation {
        label: String,
        listing: String,
        log: String,
    },

    /// A render pipeline failed validation (interface mismatch, bad layout).
    #[error("Error creating pipeline '{label}': {log}")]
    PipelineCreation { label: String, log: String },

    // ========================================================================
    // Render Target Errors
    // ========================================================================
    /// A render target could not be created with the requested attachments.
    #[error("Render target '{label}' is incomplete: {log}")]
    IncompleteTarget { label: String, log: String },

    // ========================================================================
    // Geometry Errors
    // ========================================================================
    /// Mesh data violates the drawable invariants.
    #[error("Invalid mesh: {0}")]
    InvalidMesh(String),

    /// OBJ parsing error.
    #[error("OBJ load error: {0}")]
    ObjLoad(#[from] tobj::LoadError),

    // ========================================================================
    // Readback Errors
    // ========================================================================
    /// Copying a texture back to the CPU failed.
    #[error("Texture readback failed: {0}")]
    Readback(String),

    /// File I/O error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Alias for `Result<T, RenderError>`.
pub type Result<T> = std::result::Result<T, RenderError>;
