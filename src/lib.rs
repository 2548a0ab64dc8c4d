//! Interactive node-link scene engine.
//!
//! Builds a layered display tree from a graph source, keeps it synchronized
//! through graph mutation events, and runs style resolution, level-of-detail,
//! viewport culling and pointer interaction over it. Rendering backends plug
//! in through [`TextureFactory`]; [`snapshot::render_svg`] gives a headless
//! vector rendition of whatever the scene would currently paint.

pub mod color;
pub mod edge;
pub mod error;
pub mod geometry;
pub mod graph;
pub mod node;
pub mod scene;
pub mod snapshot;
pub mod stage;
pub mod style;
pub mod texture;
pub mod viewport;

pub use color::*;
pub use edge::*;
pub use error::*;
pub use geometry::*;
pub use graph::*;
pub use node::*;
pub use scene::*;
pub use snapshot::*;
pub use stage::*;
pub use style::*;
pub use texture::*;
pub use viewport::*;

pub use anyhow::{Context, Result, anyhow, bail};
