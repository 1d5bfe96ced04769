//! Recast Frame Compositor
//!
//! The four pixel operations applied to every output frame, in order:
//! zoom crop+resize, cursor-region blur (erasing the native OS cursor),
//! click glow, and stylized-cursor sprite overlay. Sprites come from an
//! append-only load-once cache so the per-frame path never touches disk.

pub mod compose;
pub mod sprite;

pub use compose::compose;
pub use sprite::SpriteCache;
