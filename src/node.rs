use crate::*;

const NODE_CIRCLE: &str = "NODE_CIRCLE";
const NODE_CIRCLE_BORDER: &str = "NODE_CIRCLE_BORDER";
const NODE_ICON: &str = "NODE_ICON";
const NODE_LABEL_TEXT: &str = "NODE_LABEL_TEXT";

/// Display objects backing one graph node.
///
/// The node and its label live in separate containers so they can sit on
/// separate layers, and each container has an empty placeholder twin. When a
/// node is hovered or selected, the real containers swap into the front
/// layers and the placeholders hold their back-layer slots so paint order
/// within the layer is preserved for the swap back.
pub struct NodeVisual {
    pub gfx: DisplayId,
    pub label_gfx: DisplayId,
    pub placeholder_gfx: DisplayId,
    pub label_placeholder_gfx: DisplayId,
    circle: DisplayId,
    border: DisplayId,
    icon: DisplayId,
    label_text: DisplayId,
    pub hovered: bool,
    pub selected: bool,
    pub(crate) previous_tap_ms: f64,
}

impl NodeVisual {
    pub fn new(stage: &mut Stage) -> Self {
        let gfx = stage.new_group();
        stage.set_interactive(gfx, true);
        stage.set_hit_shape(gfx, Some(HitShape::Circle { radius: 0.0 }));

        let circle = stage.new_sprite();
        stage.set_anchor(circle, Point::new(0.5, 0.5));
        stage.add_child(gfx, circle);

        let border = stage.new_sprite();
        stage.set_anchor(border, Point::new(0.5, 0.5));
        stage.add_child(gfx, border);

        let icon = stage.new_sprite();
        stage.set_anchor(icon, Point::new(0.5, 0.5));
        stage.add_child(gfx, icon);

        let label_gfx = stage.new_group();
        let label_text = stage.new_sprite();
        stage.set_anchor(label_text, Point::new(0.5, 0.5));
        stage.add_child(label_gfx, label_text);

        let placeholder_gfx = stage.new_group();
        stage.set_visible(placeholder_gfx, false);
        let label_placeholder_gfx = stage.new_group();
        stage.set_visible(label_placeholder_gfx, false);

        Self {
            gfx,
            label_gfx,
            placeholder_gfx,
            label_placeholder_gfx,
            circle,
            border,
            icon,
            label_text,
            hovered: false,
            selected: false,
            previous_tap_ms: f64::NEG_INFINITY,
        }
    }

    /// Both containers track the node's world position; the label offset is
    /// local to its container.
    pub fn update_position(&self, stage: &mut Stage, position: Point) {
        stage.set_position(self.gfx, position);
        stage.set_position(self.label_gfx, position);
    }

    pub fn update_style(
        &self,
        stage: &mut Stage,
        cache: &mut TextureCache,
        style: &NodeStyle,
    ) -> Result<(), SceneError> {
        stage.set_hit_shape(self.gfx, Some(HitShape::Circle { radius: style.outer_size() }));

        let circle_texture = cache.get_or_create(&format!("{NODE_CIRCLE}::{}", style.size), || {
            TextureSpec::Circle { size: style.size }
        });
        stage.set_texture(self.circle, Some(circle_texture));
        let (color, alpha) = parse_color(&style.color)?;
        stage.set_tint(self.circle, color, alpha);

        let border_texture = cache.get_or_create(
            &format!("{NODE_CIRCLE_BORDER}::{}::{}", style.size, style.border.width),
            || TextureSpec::Ring { size: style.size, border_width: style.border.width },
        );
        stage.set_texture(self.border, Some(border_texture));
        let (border_color, border_alpha) = parse_color(&style.border.color)?;
        stage.set_tint(self.border, border_color, border_alpha);

        if let Some(url) = &style.icon.url {
            let width = style.icon.width.unwrap_or(style.size);
            let height = style.icon.height.unwrap_or(style.size);
            let icon_texture = cache.get_or_create(&format!("{NODE_ICON}::{url}"), || {
                TextureSpec::Icon { url: url.clone(), width, height }
            });
            stage.set_texture(self.icon, Some(icon_texture));
            stage.set_sprite_width(self.icon, Some(width));
            stage.set_sprite_height(self.icon, Some(height));
        } else {
            stage.set_texture(self.icon, None);
        }

        let label = &style.label;
        let label_texture = cache.get_or_create(
            &format!(
                "{NODE_LABEL_TEXT}::{}::{}::{}",
                label.font_family, label.font_size, label.content
            ),
            || TextureSpec::Text {
                kind: label.kind,
                font_family: label.font_family.clone(),
                font_size: label.font_size,
                content: label.content.clone(),
            },
        );
        // hang the label below the circle, clear of the rim plus padding
        let offset = style.size + (label_texture.height + label.padding * 2.0) / 2.0;
        stage.set_texture(self.label_text, Some(label_texture));
        let (label_color, label_alpha) = parse_color(&label.color)?;
        stage.set_tint(self.label_text, label_color, label_alpha);
        stage.set_position(self.label_text, Point::new(0.0, offset));

        Ok(())
    }

    /// Apply zoom-step gating. The circle stays on at every step so a node
    /// never disappears entirely.
    pub fn update_visibility(&self, stage: &mut Stage, zoom_step: u8) {
        stage.set_visible(self.border, zoom_step >= 1);
        stage.set_visible(self.icon, zoom_step >= 2);
        stage.set_visible(self.label_text, zoom_step >= 3);
    }

    pub fn circle(&self) -> DisplayId {
        self.circle
    }

    pub fn border(&self) -> DisplayId {
        self.border
    }

    pub fn icon(&self) -> DisplayId {
        self.icon
    }

    pub fn label_text(&self) -> DisplayId {
        self.label_text
    }
}
