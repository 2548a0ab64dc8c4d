use crate::*;

const EDGE_ARROW: &str = "EDGE_ARROW";
const EDGE_LABEL_TEXT: &str = "EDGE_LABEL_TEXT";

pub const ARROW_SIZE: f32 = 5.0;
/// Flattening resolution for quadratic and self-loop curves.
const CURVE_SEGMENTS: u32 = 24;
/// Rim fan-out per curve rank, degrees.
const QUAD_SPREAD_DEGREE: f32 = 15.0;
/// Sag per curve rank, as a fraction of chord length.
const CURVE_HEIGHT_FACTOR: f32 = 0.2;

/// Geometry class an edge renders as.
///
/// Within a bundle of parallel edges the ranks alternate sides, and when the
/// bundle count is odd the last edge stays straight so the bundle is
/// symmetric around the chord.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EdgeShape {
    Straight,
    Quadratic,
    SelfLoop,
}

/// Topology facts that drive one edge's geometry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EdgeTopology {
    pub directed: bool,
    pub self_loop: bool,
    pub parallel_count: u32,
    pub parallel_seq: u32,
}

impl EdgeTopology {
    pub fn shape(self) -> EdgeShape {
        if self.self_loop {
            EdgeShape::SelfLoop
        } else if self.parallel_count <= 1
            || (self.parallel_count % 2 == 1 && self.parallel_seq == self.parallel_count)
        {
            EdgeShape::Straight
        } else {
            EdgeShape::Quadratic
        }
    }

    /// Which side of the chord this rank curves to: even ranks +1, odd -1.
    fn curve_side(self) -> f32 {
        if self.parallel_seq % 2 == 0 { 1.0 } else { -1.0 }
    }

    /// 1-based rank among the edges curving to the same side.
    fn curve_rank(self) -> u32 {
        self.parallel_seq.div_ceil(2)
    }
}

/// Display objects backing one graph edge.
///
/// The container sits at the chord midpoint rotated so local +x runs along
/// the chord; straight geometry is a stretched line sprite and curved
/// geometry a flattened bezier path, only one of which is active per shape.
/// Placeholder twins hold back-layer slots during hover promotion just like
/// nodes.
pub struct EdgeVisual {
    pub gfx: DisplayId,
    pub label_gfx: DisplayId,
    pub placeholder_gfx: DisplayId,
    pub label_placeholder_gfx: DisplayId,
    line: DisplayId,
    line_arrow: DisplayId,
    curve: DisplayId,
    curve_arrow: DisplayId,
    label_text: DisplayId,
    pub hovered: bool,
    shape: EdgeShape,
    /// Perpendicular label shift cached by the position pass for the style
    /// pass: half the sag for quadratics, the signed loop height for loops.
    label_extra: f32,
}

impl EdgeVisual {
    pub fn new(stage: &mut Stage) -> Self {
        let gfx = stage.new_group();
        stage.set_interactive(gfx, true);

        let line = stage.new_sprite();
        stage.set_anchor(line, Point::new(0.5, 0.5));
        stage.add_child(gfx, line);

        let line_arrow = stage.new_sprite();
        stage.set_anchor(line_arrow, Point::new(0.5, 0.5));
        stage.add_child(gfx, line_arrow);

        let curve = stage.new_path();
        stage.add_child(gfx, curve);

        let curve_arrow = stage.new_sprite();
        stage.set_anchor(curve_arrow, Point::new(0.5, 0.5));
        stage.add_child(gfx, curve_arrow);

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
            line,
            line_arrow,
            curve,
            curve_arrow,
            label_text,
            hovered: false,
            shape: EdgeShape::Straight,
            label_extra: 0.0,
        }
    }

    pub fn shape(&self) -> EdgeShape {
        self.shape
    }

    pub fn update_position(
        &mut self,
        stage: &mut Stage,
        source: Point,
        target: Point,
        node_style: &NodeStyle,
        edge_style: &EdgeStyle,
        topology: EdgeTopology,
    ) {
        self.shape = topology.shape();

        let midpoint = source.midpoint(target);
        let rotation = segment_angle(source, target);
        stage.set_position(self.gfx, midpoint);
        stage.set_rotation(self.gfx, rotation);

        let length = source.distance_to(target);
        let outer = node_style.outer_size();

        match self.shape {
            EdgeShape::Straight => {
                // pull the line and arrow off the node rims
                stage.set_sprite_width(self.line, Some((length - outer * 2.0 - 2.0).max(0.0)));
                stage.set_position(self.line, Point::default());
                stage.set_position(
                    self.line_arrow,
                    Point::new(length / 2.0 - outer - ARROW_SIZE, 0.0),
                );
                stage.set_rotation(self.line_arrow, 0.0);

                stage.set_path_points(self.curve, Vec::new());
                stage.set_hit_shape(self.curve, None);

                stage.set_position(self.label_gfx, midpoint);
                stage.set_rotation(self.label_gfx, rotation);
                self.label_extra = 0.0;
            }
            EdgeShape::Quadratic => {
                let side = topology.curve_side();
                let rank = topology.curve_rank() as f32;
                let curve_height = length * CURVE_HEIGHT_FACTOR * rank * side;
                let degree = QUAD_SPREAD_DEGREE * rank * side;

                let local_source = Point::new(-length / 2.0, 0.0);
                let local_target = Point::new(length / 2.0, 0.0);
                let (start, end) =
                    quadratic_fan_endpoints(node_style.size, degree, local_source, local_target);
                let control = Point::new(0.0, curve_height);

                let points = sample_quadratic(start, control, end);
                let hit = polygon_hit_points(edge_style.width / 2.0, &points);
                stage.set_path_points(self.curve, points);
                stage.set_hit_shape(self.curve, Some(HitShape::Polygon { points: hit }));

                let angle = quadratic_angle(1.0, start, control, end);
                stage.set_position(
                    self.curve_arrow,
                    Point::new(end.x - ARROW_SIZE * angle.cos(), end.y - ARROW_SIZE * angle.sin()),
                );
                stage.set_rotation(self.curve_arrow, angle);

                stage.set_sprite_width(self.line, Some(0.0));

                stage.set_position(self.label_gfx, midpoint);
                stage.set_rotation(self.label_gfx, rotation);
                self.label_extra = curve_height / 2.0;
            }
            EdgeShape::SelfLoop => {
                // container sits on the node; the loop lives in local space
                let net = loop_bezier(node_style.size, topology.parallel_seq, Point::default());

                let points = sample_cubic(net);
                let hit = polygon_hit_points(edge_style.width / 2.0, &points);
                stage.set_path_points(self.curve, points);
                stage.set_hit_shape(self.curve, Some(HitShape::Polygon { points: hit }));

                let angle = cubic_angle(1.0, net.start, net.control1, net.control2, net.end);
                stage.set_position(
                    self.curve_arrow,
                    Point::new(
                        net.end.x - ARROW_SIZE * angle.cos(),
                        net.end.y - ARROW_SIZE * angle.sin(),
                    ),
                );
                stage.set_rotation(self.curve_arrow, angle);

                stage.set_sprite_width(self.line, Some(0.0));

                // the label tracks the anchor chord, out beyond the loop
                let anchor_mid = net.start.midpoint(net.end);
                let label_rotation = segment_angle(net.start, net.end);
                stage.set_position(
                    self.label_gfx,
                    Point::new(source.x + anchor_mid.x, source.y + anchor_mid.y),
                );
                stage.set_rotation(self.label_gfx, label_rotation);

                let center = cubic_point(0.5, net.start, net.control1, net.control2, net.end);
                let loop_height = center.distance_to(anchor_mid);
                self.label_extra = -loop_height * label_direction(label_rotation);
            }
        }
        self.place_label(stage, edge_style);
    }

    pub fn update_style(
        &mut self,
        stage: &mut Stage,
        cache: &mut TextureCache,
        edge_style: &EdgeStyle,
        topology: EdgeTopology,
    ) -> Result<(), SceneError> {
        self.shape = topology.shape();
        let (color, alpha) = parse_color(&edge_style.color)?;

        let arrow = match self.shape {
            EdgeShape::Straight => {
                stage.set_sprite_height(self.line, Some(edge_style.width));
                stage.set_tint(self.line, color, alpha);
                self.line_arrow
            }
            EdgeShape::Quadratic | EdgeShape::SelfLoop => {
                stage.set_path_stroke(self.curve, edge_style.width);
                stage.set_tint(self.curve, color, alpha);
                self.curve_arrow
            }
        };
        if topology.directed {
            let arrow_texture = cache
                .get_or_create(EDGE_ARROW, || TextureSpec::Arrow { size: ARROW_SIZE });
            stage.set_texture(arrow, Some(arrow_texture));
            stage.set_tint(arrow, color, alpha);
        }

        let label = &edge_style.label;
        let label_texture = cache.get_or_create(
            &format!(
                "{EDGE_LABEL_TEXT}::{}::{}::{}",
                label.font_family, label.font_size, label.content
            ),
            || TextureSpec::Text {
                kind: label.kind,
                font_family: label.font_family.clone(),
                font_size: label.font_size,
                content: label.content.clone(),
            },
        );
        stage.set_texture(self.label_text, Some(label_texture));
        let (label_color, label_alpha) = parse_color(&label.color)?;
        stage.set_tint(self.label_text, label_color, label_alpha);
        self.place_label(stage, edge_style);

        Ok(())
    }

    /// Offset the label perpendicular to its chord and flip it upright when
    /// the chord points leftward.
    fn place_label(&self, stage: &mut Stage, edge_style: &EdgeStyle) {
        let Some(texture_height) = stage
            .object(self.label_text)
            .and_then(|obj| match &obj.kind {
                DisplayKind::Sprite(sprite) => sprite.texture.as_ref().map(|t| t.height),
                _ => None,
            })
        else {
            return;
        };
        let dir = label_direction(stage.rotation(self.label_gfx));
        let base = (texture_height + edge_style.label.padding * 2.0) / 2.0;
        stage.set_position(self.label_text, Point::new(0.0, self.label_extra - base * dir));
        stage.set_rotation(self.label_text, if dir > 0.0 { 0.0 } else { std::f32::consts::PI });
    }

    /// Apply zoom-step gating; whichever of line and curve is inactive for
    /// the current shape stays hidden regardless of step.
    pub fn update_visibility(&self, stage: &mut Stage, zoom_step: u8) {
        let straight = self.shape == EdgeShape::Straight;
        stage.set_visible(self.line, straight && zoom_step >= 2);
        stage.set_visible(self.line_arrow, straight && zoom_step >= 3);
        stage.set_visible(self.curve, !straight && zoom_step >= 2);
        stage.set_visible(self.curve_arrow, !straight && zoom_step >= 3);
        stage.set_visible(self.label_text, zoom_step >= 3);
    }

    pub fn line(&self) -> DisplayId {
        self.line
    }

    pub fn line_arrow(&self) -> DisplayId {
        self.line_arrow
    }

    pub fn curve(&self) -> DisplayId {
        self.curve
    }

    pub fn curve_arrow(&self) -> DisplayId {
        self.curve_arrow
    }

    pub fn label_text(&self) -> DisplayId {
        self.label_text
    }
}

/// 1 when a label chord reads left to right, -1 when it would render upside
/// down. Bounds are inclusive so vertical chords keep the unflipped frame.
fn label_direction(rotation: f32) -> f32 {
    use std::f32::consts::FRAC_PI_2;
    if (-FRAC_PI_2..=FRAC_PI_2).contains(&rotation) { 1.0 } else { -1.0 }
}

fn sample_quadratic(start: Point, control: Point, end: Point) -> Vec<Point> {
    (0..=CURVE_SEGMENTS)
        .map(|i| quadratic_point(i as f32 / CURVE_SEGMENTS as f32, start, control, end))
        .collect()
}

fn sample_cubic(net: LoopBezier) -> Vec<Point> {
    (0..=CURVE_SEGMENTS)
        .map(|i| {
            cubic_point(i as f32 / CURVE_SEGMENTS as f32, net.start, net.control1, net.control2, net.end)
        })
        .collect()
}
