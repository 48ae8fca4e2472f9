//! Backend-agnostic rendering of a mark set.
//!
//! - [`RenderBackend`] is what a concrete drawing surface implements.
//! - [`PointInstance`] is the per-mark GPU record, carrying shader
//!   interpolation segments for preloadable channels.
//! - [`Scatterplot`] runs the per-tick loop against a [`MarkSet`].
//! - [`TexturePool`] owns the shared point sprite.
//!
//! [`MarkSet`]: crate::marks::MarkSet

mod backend;
mod instance;
mod scatterplot;
mod texture_pool;

pub use backend::{drawn_attributes, DecorationDraw, RenderBackend};
pub use instance::{rgb, PointInstance, PreloadChannels, Segment};
pub use scatterplot::Scatterplot;
pub use texture_pool::{TextureLease, TexturePool};
