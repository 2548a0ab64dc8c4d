use crate::*;

const MIN_VISIBLE_WORLD: f32 = 1e-3;
const MIN_SCALE_FLOOR: f32 = 1e-6;

/// Camera mapping a world-plane window onto the screen.
///
/// The transform is center plus uniform scale; no rotation. `dirty` is set by
/// every camera change and consumed by the scene's frame-end pass, and
/// `pause` suspends gesture input while a node drag owns the pointer.
pub struct Viewport {
    screen_width: f32,
    screen_height: f32,
    world_width: f32,
    world_height: f32,
    center: Point,
    scale: f32,
    min_scale: Option<f32>,
    max_scale: Option<f32>,
    pub dirty: bool,
    pub pause: bool,
    drag_enabled: bool,
    pinch_enabled: bool,
    wheel_enabled: bool,
    decelerate_enabled: bool,
}

impl Viewport {
    pub fn new(screen_width: f32, screen_height: f32) -> Self {
        Self {
            screen_width,
            screen_height,
            world_width: screen_width,
            world_height: screen_height,
            center: Point::new(screen_width / 2.0, screen_height / 2.0),
            scale: 1.0,
            min_scale: None,
            max_scale: None,
            dirty: true,
            pause: false,
            drag_enabled: false,
            pinch_enabled: false,
            wheel_enabled: false,
            decelerate_enabled: false,
        }
    }

    pub fn drag(mut self) -> Self {
        self.drag_enabled = true;
        self
    }

    pub fn pinch(mut self) -> Self {
        self.pinch_enabled = true;
        self
    }

    pub fn wheel(mut self) -> Self {
        self.wheel_enabled = true;
        self
    }

    pub fn decelerate(mut self) -> Self {
        self.decelerate_enabled = true;
        self
    }

    pub fn clamp_zoom(mut self, min_scale: Option<f32>, max_scale: Option<f32>) -> Self {
        self.min_scale = min_scale;
        self.max_scale = max_scale;
        self
    }

    pub fn scale(&self) -> f32 {
        self.scale
    }

    pub fn center(&self) -> Point {
        self.center
    }

    pub fn screen_width(&self) -> f32 {
        self.screen_width
    }

    pub fn screen_height(&self) -> f32 {
        self.screen_height
    }

    pub fn world_width(&self) -> f32 {
        self.world_width
    }

    pub fn world_height(&self) -> f32 {
        self.world_height
    }

    pub fn drag_enabled(&self) -> bool {
        self.drag_enabled
    }

    pub fn pinch_enabled(&self) -> bool {
        self.pinch_enabled
    }

    pub fn wheel_enabled(&self) -> bool {
        self.wheel_enabled
    }

    pub fn decelerate_enabled(&self) -> bool {
        self.decelerate_enabled
    }

    pub fn set_zoom(&mut self, scale: f32) {
        self.scale = self.clamp_scale(scale);
        self.dirty = true;
    }

    /// Grow or shrink the visible world width by `world_delta`, keeping the
    /// center fixed. Negative deltas zoom in.
    pub fn zoom(&mut self, world_delta: f32) {
        let visible = self.screen_width / self.scale;
        let next_visible = (visible + world_delta).max(MIN_VISIBLE_WORLD);
        self.set_zoom(self.screen_width / next_visible);
    }

    /// Multiply the scale by `factor` while keeping the world point under the
    /// screen-space `anchor` stationary. Entry point for wheel and pinch
    /// gestures; inert while paused or when neither gesture is enabled.
    pub fn zoom_at(&mut self, factor: f32, anchor: Point) {
        if self.pause || (!self.wheel_enabled && !self.pinch_enabled) {
            return;
        }
        let world_anchor = self.to_world(anchor);
        self.set_zoom(self.scale * factor);
        let screen_center = Point::new(self.screen_width / 2.0, self.screen_height / 2.0);
        self.center = Point::new(
            world_anchor.x - (anchor.x - screen_center.x) / self.scale,
            world_anchor.y - (anchor.y - screen_center.y) / self.scale,
        );
        self.dirty = true;
    }

    pub fn set_center(&mut self, center: Point) {
        self.center = center;
        self.dirty = true;
    }

    /// Pan by a screen-space delta, i.e. the camera follows a grab of the
    /// world plane. Inert while paused or when dragging is disabled.
    pub fn pan_by(&mut self, screen_delta: Point) {
        if self.pause || !self.drag_enabled {
            return;
        }
        self.center = Point::new(
            self.center.x - screen_delta.x / self.scale,
            self.center.y - screen_delta.y / self.scale,
        );
        self.dirty = true;
    }

    pub fn resize(
        &mut self,
        screen_width: f32,
        screen_height: f32,
        world_width: Option<f32>,
        world_height: Option<f32>,
    ) {
        self.screen_width = screen_width;
        self.screen_height = screen_height;
        if let Some(world_width) = world_width {
            self.world_width = world_width;
        }
        if let Some(world_height) = world_height {
            self.world_height = world_height;
        }
        self.dirty = true;
    }

    /// Scale so the whole world extent fits on screen, clamped like any
    /// other zoom.
    pub fn fit(&mut self) {
        let scale_x = self.screen_width / self.world_width.max(MIN_VISIBLE_WORLD);
        let scale_y = self.screen_height / self.world_height.max(MIN_VISIBLE_WORLD);
        self.set_zoom(scale_x.min(scale_y));
    }

    pub fn to_world(&self, screen: Point) -> Point {
        Point::new(
            self.center.x + (screen.x - self.screen_width / 2.0) / self.scale,
            self.center.y + (screen.y - self.screen_height / 2.0) / self.scale,
        )
    }

    pub fn to_screen(&self, world: Point) -> Point {
        Point::new(
            (world.x - self.center.x) * self.scale + self.screen_width / 2.0,
            (world.y - self.center.y) * self.scale + self.screen_height / 2.0,
        )
    }

    pub fn screen_rect(&self) -> Rect {
        Rect::new(0.0, 0.0, self.screen_width, self.screen_height)
    }

    fn clamp_scale(&self, scale: f32) -> f32 {
        let mut scale = scale.max(MIN_SCALE_FLOOR);
        if let Some(min) = self.min_scale {
            scale = scale.max(min);
        }
        if let Some(max) = self.max_scale {
            scale = scale.min(max);
        }
        scale
    }
}
