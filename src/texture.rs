use log::trace;
use std::cell::Cell;
use std::collections::HashMap;
use std::rc::Rc;

use crate::*;

/// What a texture depicts, carried on the handle so exporters can pick an
/// output primitive without consulting the factory.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextureKind {
    Circle,
    Ring,
    Arrow,
    Text,
    Icon,
}

/// Instructions for rasterizing one texture.
#[derive(Debug, Clone, PartialEq)]
pub enum TextureSpec {
    Circle { size: f32 },
    Ring { size: f32, border_width: f32 },
    Arrow { size: f32 },
    Text { kind: TextKind, font_family: String, font_size: f32, content: String },
    Icon { url: String, width: f32, height: f32 },
}

impl TextureSpec {
    pub fn kind(&self) -> TextureKind {
        match self {
            TextureSpec::Circle { .. } => TextureKind::Circle,
            TextureSpec::Ring { .. } => TextureKind::Ring,
            TextureSpec::Arrow { .. } => TextureKind::Arrow,
            TextureSpec::Text { .. } => TextureKind::Text,
            TextureSpec::Icon { .. } => TextureKind::Icon,
        }
    }
}

/// Handle to a rasterized texture, carrying the spec that produced it so
/// exporters can re-derive vector output without consulting the factory.
/// The factory owns the backing resource until
/// [`TextureFactory::destroy`] is called with the handle.
#[derive(Debug, Clone, PartialEq)]
pub struct Texture {
    pub id: u64,
    pub spec: TextureSpec,
    pub width: f32,
    pub height: f32,
}

impl Texture {
    pub fn kind(&self) -> TextureKind {
        self.spec.kind()
    }
}

/// Rasterization backend. Rendering hosts hand the scene an implementation
/// that talks to their GPU or canvas; headless use gets [`MeasureFactory`].
pub trait TextureFactory {
    fn generate(&mut self, spec: &TextureSpec) -> Texture;
    fn destroy(&mut self, texture: Texture);
}

/// Keyed store of generated textures.
///
/// Visual updates ask for textures by a key encoding every input of the
/// raster (`"NODE_CIRCLE::15"`), so repeated styles share one texture and
/// the factory runs only on actual misses. Dropping an entry destroys the
/// backing texture exactly once.
pub struct TextureCache {
    factory: Box<dyn TextureFactory>,
    textures: HashMap<String, Texture>,
}

impl TextureCache {
    pub fn new(factory: Box<dyn TextureFactory>) -> Self {
        Self { factory, textures: HashMap::new() }
    }

    pub fn get_or_create(&mut self, key: &str, build: impl FnOnce() -> TextureSpec) -> Texture {
        if let Some(texture) = self.textures.get(key) {
            return texture.clone();
        }
        let spec = build();
        trace!("texture cache miss for {key:?}");
        let texture = self.factory.generate(&spec);
        self.textures.insert(key.to_string(), texture.clone());
        texture
    }

    pub fn remove(&mut self, key: &str) {
        if let Some(texture) = self.textures.remove(key) {
            self.factory.destroy(texture);
        }
    }

    pub fn clear(&mut self) {
        for (_, texture) in self.textures.drain() {
            self.factory.destroy(texture);
        }
    }

    /// Final teardown. Equivalent to [`clear`](Self::clear); kept separate so
    /// call sites read as destruction rather than reuse.
    pub fn destroy(&mut self) {
        self.clear();
    }

    pub fn len(&self) -> usize {
        self.textures.len()
    }

    pub fn is_empty(&self) -> bool {
        self.textures.is_empty()
    }
}

/// Shared tallies of factory activity, for asserting teardown behavior.
#[derive(Debug, Clone, Default)]
pub struct FactoryCounters {
    created: Rc<Cell<u64>>,
    destroyed: Rc<Cell<u64>>,
}

impl FactoryCounters {
    pub fn created(&self) -> u64 {
        self.created.get()
    }

    pub fn destroyed(&self) -> u64 {
        self.destroyed.get()
    }
}

/// Factory that rasterizes nothing and instead estimates dimensions, which
/// is enough for layout, hit testing and snapshots without a GPU.
///
/// Text measure is a flat 0.6em advance per character and a 1.2em line
/// height, deliberately font-independent so headless runs are reproducible.
#[derive(Debug, Default)]
pub struct MeasureFactory {
    next_id: u64,
    counters: FactoryCounters,
}

impl MeasureFactory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn counters(&self) -> FactoryCounters {
        self.counters.clone()
    }
}

impl TextureFactory for MeasureFactory {
    fn generate(&mut self, spec: &TextureSpec) -> Texture {
        self.next_id += 1;
        self.counters.created.set(self.counters.created.get() + 1);
        let (width, height) = match spec {
            TextureSpec::Circle { size } => (size * 2.0, size * 2.0),
            TextureSpec::Ring { size, border_width } => {
                let outer = size + border_width;
                (outer * 2.0, outer * 2.0)
            }
            TextureSpec::Arrow { size } => (size * 2.0, size * 2.0),
            TextureSpec::Text { font_size, content, .. } => {
                let advance = content.chars().count().max(1) as f32 * font_size * 0.6;
                (advance, font_size * 1.2)
            }
            TextureSpec::Icon { width, height, .. } => (*width, *height),
        };
        Texture { id: self.next_id, spec: spec.clone(), width, height }
    }

    fn destroy(&mut self, _texture: Texture) {
        self.counters.destroyed.set(self.counters.destroyed.get() + 1);
    }
}
