//! Dynamic atlas: runtime packing of small sprite textures into shared pages
//! so sprites that would each need their own texture binding batch together.
//!
//! Packing is best effort. A frame that does not fit keeps its own texture
//! and still renders, in its own draw batch.

#[allow(clippy::module_inception)]
mod atlas;
mod manager;
mod texture;

pub use atlas::{Atlas, AtlasPlacement, SPACE};
pub use manager::{AtlasConfig, DynamicAtlasManager};
pub use texture::AtlasTexture;
