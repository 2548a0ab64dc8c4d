use slotmap::{SlotMap, new_key_type};

use crate::*;

new_key_type! {
    /// Stable handle to one display object in a [`Stage`].
    pub struct DisplayId;
}

/// Pointer-interaction footprint of a display object.
#[derive(Debug, Clone, PartialEq)]
pub enum HitShape {
    Circle { radius: f32 },
    Polygon { points: Vec<Point> },
}

impl HitShape {
    fn contains(&self, p: Point) -> bool {
        match self {
            HitShape::Circle { radius } => p.x * p.x + p.y * p.y <= radius * radius,
            HitShape::Polygon { points } => polygon_contains(points, p),
        }
    }
}

#[derive(Debug, Clone)]
pub struct SpriteData {
    pub texture: Option<Texture>,
    pub anchor: Point,
    /// Size overrides; `None` falls back to the texture dimensions.
    pub width: Option<f32>,
    pub height: Option<f32>,
    pub tint: u32,
    pub alpha: f32,
}

impl Default for SpriteData {
    fn default() -> Self {
        Self {
            texture: None,
            anchor: Point::default(),
            width: None,
            height: None,
            tint: 0xffffff,
            alpha: 1.0,
        }
    }
}

#[derive(Debug, Clone)]
pub struct PathData {
    pub points: Vec<Point>,
    pub stroke_width: f32,
    pub color: u32,
    pub alpha: f32,
}

impl Default for PathData {
    fn default() -> Self {
        Self { points: Vec::new(), stroke_width: 1.0, color: 0xffffff, alpha: 1.0 }
    }
}

#[derive(Debug, Clone)]
pub enum DisplayKind {
    Group,
    Sprite(SpriteData),
    Path(PathData),
}

/// One node of the display tree.
///
/// `visible` is the logical flag owned by level-of-detail decisions while
/// `culled` is owned by the viewport pass; an object draws only when both
/// agree, so the two systems never fight over a single bit.
#[derive(Debug, Clone)]
pub struct DisplayObject {
    pub parent: Option<DisplayId>,
    pub children: Vec<DisplayId>,
    pub position: Point,
    pub rotation: f32,
    pub visible: bool,
    pub culled: bool,
    pub interactive: bool,
    pub hit_shape: Option<HitShape>,
    pub kind: DisplayKind,
}

impl DisplayObject {
    fn new(kind: DisplayKind) -> Self {
        Self {
            parent: None,
            children: Vec::new(),
            position: Point::default(),
            rotation: 0.0,
            visible: true,
            culled: false,
            interactive: false,
            hit_shape: None,
            kind,
        }
    }
}

/// Retained display tree: a slotmap arena of objects plus an ordered list of
/// root layers. Paint order is root order, then child order within each
/// subtree. All mutators tolerate stale ids by doing nothing, so callers
/// holding handles across drops never fault.
#[derive(Default)]
pub struct Stage {
    objects: SlotMap<DisplayId, DisplayObject>,
    root: Vec<DisplayId>,
}

impl Stage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn new_group(&mut self) -> DisplayId {
        self.objects.insert(DisplayObject::new(DisplayKind::Group))
    }

    pub fn new_sprite(&mut self) -> DisplayId {
        self.objects.insert(DisplayObject::new(DisplayKind::Sprite(SpriteData::default())))
    }

    pub fn new_path(&mut self) -> DisplayId {
        self.objects.insert(DisplayObject::new(DisplayKind::Path(PathData::default())))
    }

    pub fn add_to_root(&mut self, id: DisplayId) {
        self.detach(id);
        self.root.push(id);
    }

    pub fn root(&self) -> &[DisplayId] {
        &self.root
    }

    pub fn object(&self, id: DisplayId) -> Option<&DisplayObject> {
        self.objects.get(id)
    }

    pub fn contains(&self, id: DisplayId) -> bool {
        self.objects.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    /// Append `child` to `parent`, detaching it from any previous parent.
    pub fn add_child(&mut self, parent: DisplayId, child: DisplayId) {
        self.detach(child);
        if !self.objects.contains_key(parent) || !self.objects.contains_key(child) {
            return;
        }
        self.objects[parent].children.push(child);
        self.objects[child].parent = Some(parent);
    }

    /// Insert `child` at `index` within `parent`, clamping to the child count.
    pub fn add_child_at(&mut self, parent: DisplayId, child: DisplayId, index: usize) {
        self.detach(child);
        if !self.objects.contains_key(parent) || !self.objects.contains_key(child) {
            return;
        }
        let index = index.min(self.objects[parent].children.len());
        self.objects[parent].children.insert(index, child);
        self.objects[child].parent = Some(parent);
    }

    pub fn remove_child_at(&mut self, parent: DisplayId, index: usize) -> Option<DisplayId> {
        let parent_obj = self.objects.get_mut(parent)?;
        if index >= parent_obj.children.len() {
            return None;
        }
        let child = parent_obj.children.remove(index);
        if let Some(child_obj) = self.objects.get_mut(child) {
            child_obj.parent = None;
        }
        Some(child)
    }

    pub fn child_index(&self, parent: DisplayId, child: DisplayId) -> Option<usize> {
        self.objects.get(parent)?.children.iter().position(|&c| c == child)
    }

    pub fn children(&self, parent: DisplayId) -> &[DisplayId] {
        self.objects.get(parent).map(|o| o.children.as_slice()).unwrap_or(&[])
    }

    /// Unlink `id` from its parent or the root list without destroying it.
    pub fn detach(&mut self, id: DisplayId) {
        let Some(parent) = self.objects.get(id).and_then(|o| o.parent) else {
            self.root.retain(|&r| r != id);
            return;
        };
        if let Some(parent_obj) = self.objects.get_mut(parent) {
            parent_obj.children.retain(|&c| c != id);
        }
        if let Some(obj) = self.objects.get_mut(id) {
            obj.parent = None;
        }
    }

    /// Detach `id` and drop its whole subtree from the arena.
    pub fn free(&mut self, id: DisplayId) {
        self.detach(id);
        let mut stack = vec![id];
        while let Some(next) = stack.pop() {
            if let Some(obj) = self.objects.remove(next) {
                stack.extend(obj.children);
            }
        }
    }

    pub fn clear(&mut self) {
        self.objects.clear();
        self.root.clear();
    }

    pub fn set_position(&mut self, id: DisplayId, position: Point) {
        if let Some(obj) = self.objects.get_mut(id) {
            obj.position = position;
        }
    }

    pub fn position(&self, id: DisplayId) -> Point {
        self.objects.get(id).map(|o| o.position).unwrap_or_default()
    }

    pub fn set_rotation(&mut self, id: DisplayId, rotation: f32) {
        if let Some(obj) = self.objects.get_mut(id) {
            obj.rotation = rotation;
        }
    }

    pub fn rotation(&self, id: DisplayId) -> f32 {
        self.objects.get(id).map(|o| o.rotation).unwrap_or(0.0)
    }

    pub fn set_visible(&mut self, id: DisplayId, visible: bool) {
        if let Some(obj) = self.objects.get_mut(id) {
            obj.visible = visible;
        }
    }

    pub fn is_visible(&self, id: DisplayId) -> bool {
        self.objects.get(id).map(|o| o.visible).unwrap_or(false)
    }

    pub fn set_culled(&mut self, id: DisplayId, culled: bool) {
        if let Some(obj) = self.objects.get_mut(id) {
            obj.culled = culled;
        }
    }

    pub fn is_culled(&self, id: DisplayId) -> bool {
        self.objects.get(id).map(|o| o.culled).unwrap_or(false)
    }

    pub fn set_interactive(&mut self, id: DisplayId, interactive: bool) {
        if let Some(obj) = self.objects.get_mut(id) {
            obj.interactive = interactive;
        }
    }

    pub fn set_hit_shape(&mut self, id: DisplayId, shape: Option<HitShape>) {
        if let Some(obj) = self.objects.get_mut(id) {
            obj.hit_shape = shape;
        }
    }

    pub fn hit_shape(&self, id: DisplayId) -> Option<&HitShape> {
        self.objects.get(id)?.hit_shape.as_ref()
    }

    pub fn set_texture(&mut self, id: DisplayId, texture: Option<Texture>) {
        if let Some(DisplayKind::Sprite(sprite)) = self.objects.get_mut(id).map(|o| &mut o.kind) {
            sprite.texture = texture;
        }
    }

    pub fn set_anchor(&mut self, id: DisplayId, anchor: Point) {
        if let Some(DisplayKind::Sprite(sprite)) = self.objects.get_mut(id).map(|o| &mut o.kind) {
            sprite.anchor = anchor;
        }
    }

    pub fn set_sprite_width(&mut self, id: DisplayId, width: Option<f32>) {
        if let Some(DisplayKind::Sprite(sprite)) = self.objects.get_mut(id).map(|o| &mut o.kind) {
            sprite.width = width;
        }
    }

    pub fn set_sprite_height(&mut self, id: DisplayId, height: Option<f32>) {
        if let Some(DisplayKind::Sprite(sprite)) = self.objects.get_mut(id).map(|o| &mut o.kind) {
            sprite.height = height;
        }
    }

    /// Tint a sprite or recolor a path stroke.
    pub fn set_tint(&mut self, id: DisplayId, color: u32, alpha: f32) {
        match self.objects.get_mut(id).map(|o| &mut o.kind) {
            Some(DisplayKind::Sprite(sprite)) => {
                sprite.tint = color;
                sprite.alpha = alpha;
            }
            Some(DisplayKind::Path(path)) => {
                path.color = color;
                path.alpha = alpha;
            }
            _ => {}
        }
    }

    pub fn set_path_points(&mut self, id: DisplayId, points: Vec<Point>) {
        if let Some(DisplayKind::Path(path)) = self.objects.get_mut(id).map(|o| &mut o.kind) {
            path.points = points;
        }
    }

    pub fn set_path_stroke(&mut self, id: DisplayId, stroke_width: f32) {
        if let Some(DisplayKind::Path(path)) = self.objects.get_mut(id).map(|o| &mut o.kind) {
            path.stroke_width = stroke_width;
        }
    }

    /// Whether `id` and all of its ancestors are visible and unculled.
    pub fn is_effectively_visible(&self, id: DisplayId) -> bool {
        let mut current = Some(id);
        while let Some(next) = current {
            let Some(obj) = self.objects.get(next) else {
                return false;
            };
            if !obj.visible || obj.culled {
                return false;
            }
            current = obj.parent;
        }
        true
    }

    /// Bounds of `id`'s subtree expressed in its parent's frame, or `None`
    /// for trees with no drawable extent. Rotation is resolved to the
    /// axis-aligned box of the rotated corners.
    pub fn bounds_in_parent(&self, id: DisplayId) -> Option<Rect> {
        let obj = self.objects.get(id)?;
        let mut rect = self.kind_bounds(obj);
        for &child in &obj.children {
            if let Some(child_rect) = self.bounds_in_parent(child) {
                rect = Some(match rect {
                    Some(existing) => existing.union(&child_rect),
                    None => child_rect,
                });
            }
        }
        rect.map(|r| transform_rect(r, obj.rotation, obj.position))
    }

    fn kind_bounds(&self, obj: &DisplayObject) -> Option<Rect> {
        match &obj.kind {
            DisplayKind::Group => None,
            DisplayKind::Sprite(sprite) => {
                let width = sprite.width.or(sprite.texture.as_ref().map(|t| t.width))?;
                let height = sprite.height.or(sprite.texture.as_ref().map(|t| t.height))?;
                Some(Rect::new(-sprite.anchor.x * width, -sprite.anchor.y * height, width, height))
            }
            DisplayKind::Path(path) => {
                let first = path.points.first()?;
                let mut rect = Rect::new(first.x, first.y, 0.0, 0.0);
                for p in &path.points[1..] {
                    rect = rect.union(&Rect::new(p.x, p.y, 0.0, 0.0));
                }
                let half = path.stroke_width / 2.0;
                Some(Rect::new(rect.x - half, rect.y - half, rect.width + half * 2.0, rect.height + half * 2.0))
            }
        }
    }

    /// Topmost interactive child of `parent` containing `point`, where
    /// `point` is in `parent`'s frame. Later children paint on top, so the
    /// scan runs back to front.
    pub fn hit_test_child(&self, parent: DisplayId, point: Point) -> Option<DisplayId> {
        for &child in self.children(parent).iter().rev() {
            let Some(obj) = self.objects.get(child) else {
                continue;
            };
            if !obj.interactive || !obj.visible || obj.culled {
                continue;
            }
            if self.hit_object(child, to_local(point, obj)) {
                return Some(child);
            }
        }
        None
    }

    fn hit_object(&self, id: DisplayId, local: Point) -> bool {
        let Some(obj) = self.objects.get(id) else {
            return false;
        };
        if let Some(shape) = &obj.hit_shape {
            return shape.contains(local);
        }
        if let DisplayKind::Sprite(sprite) = &obj.kind {
            let width = sprite.width.or(sprite.texture.as_ref().map(|t| t.width));
            let height = sprite.height.or(sprite.texture.as_ref().map(|t| t.height));
            if let (Some(width), Some(height)) = (width, height) {
                let rect = Rect::new(-sprite.anchor.x * width, -sprite.anchor.y * height, width, height);
                if rect.contains(local) {
                    return true;
                }
            }
        }
        for &child in &obj.children {
            let Some(child_obj) = self.objects.get(child) else {
                continue;
            };
            if !child_obj.visible || child_obj.culled {
                continue;
            }
            if self.hit_object(child, to_local(local, child_obj)) {
                return true;
            }
        }
        false
    }
}

fn to_local(point: Point, obj: &DisplayObject) -> Point {
    let translated = Point::new(point.x - obj.position.x, point.y - obj.position.y);
    if obj.rotation == 0.0 {
        return translated;
    }
    let (sin, cos) = (-obj.rotation).sin_cos();
    Point::new(translated.x * cos - translated.y * sin, translated.x * sin + translated.y * cos)
}

fn transform_rect(rect: Rect, rotation: f32, position: Point) -> Rect {
    if rotation == 0.0 {
        return Rect::new(rect.x + position.x, rect.y + position.y, rect.width, rect.height);
    }
    let (sin, cos) = rotation.sin_cos();
    let corners = [
        Point::new(rect.x, rect.y),
        Point::new(rect.right(), rect.y),
        Point::new(rect.right(), rect.bottom()),
        Point::new(rect.x, rect.bottom()),
    ];
    let mut out: Option<Rect> = None;
    for corner in corners {
        let rotated = Point::new(
            corner.x * cos - corner.y * sin + position.x,
            corner.x * sin + corner.y * cos + position.y,
        );
        let point_rect = Rect::new(rotated.x, rotated.y, 0.0, 0.0);
        out = Some(match out {
            Some(existing) => existing.union(&point_rect),
            None => point_rect,
        });
    }
    out.unwrap_or_default()
}
