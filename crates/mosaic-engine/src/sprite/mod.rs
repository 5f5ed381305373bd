//! Sprite frames and the sprite component.
//!
//! A [`SpriteFrame`] describes a region of a [`Texture2D`] and precomputes
//! the UV tables the assemblers consume. Frames are shared as
//! [`SharedSpriteFrame`] because the dynamic atlas rewrites them in place.

mod component;
mod frame;

pub use component::{FillType, Sprite, SpriteType};
pub use frame::{Insets, OriginalFrame, SharedSpriteFrame, SpriteFrame, TrimmedBorder};

pub use crate::texture::{Texture2D, TextureId};
