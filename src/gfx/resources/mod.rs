pub mod mesh;
pub mod render_target;
pub mod texture_resource;

pub use mesh::{Attribute, Drawable};
pub use render_target::{read_texture, RenderTarget};
pub use texture_resource::TextureResource;
