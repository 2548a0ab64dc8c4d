use serde::{Deserialize, Serialize};
use std::f32::consts::PI;

// Bezier derivative math:
// https://math.stackexchange.com/questions/885292/how-to-take-derivative-of-bezier-function

/// A point in world or screen space. The y axis grows downward.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

impl Point {
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    pub fn distance_to(self, other: Point) -> f32 {
        (other.x - self.x).hypot(other.y - self.y)
    }

    pub fn midpoint(self, other: Point) -> Point {
        Point::new((self.x + other.x) / 2.0, (self.y + other.y) / 2.0)
    }
}

/// An axis-aligned rectangle, `x`/`y` being the top-left corner.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Rect {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl Rect {
    pub fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self { x, y, width, height }
    }

    pub fn from_corners(a: Point, b: Point) -> Self {
        let x = a.x.min(b.x);
        let y = a.y.min(b.y);
        Self::new(x, y, a.x.max(b.x) - x, a.y.max(b.y) - y)
    }

    pub fn right(&self) -> f32 {
        self.x + self.width
    }

    pub fn bottom(&self) -> f32 {
        self.y + self.height
    }

    pub fn contains(&self, p: Point) -> bool {
        p.x >= self.x && p.x <= self.right() && p.y >= self.y && p.y <= self.bottom()
    }

    pub fn intersects(&self, other: &Rect) -> bool {
        self.x <= other.right()
            && other.x <= self.right()
            && self.y <= other.bottom()
            && other.y <= self.bottom()
    }

    pub fn union(&self, other: &Rect) -> Rect {
        let x = self.x.min(other.x);
        let y = self.y.min(other.y);
        Rect::new(
            x,
            y,
            self.right().max(other.right()) - x,
            self.bottom().max(other.bottom()) - y,
        )
    }
}

/// Control net of a cubic self-loop bezier, all points in the node's frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LoopBezier {
    pub start: Point,
    pub control1: Point,
    pub control2: Point,
    pub end: Point,
}

/// Direction angle of the segment from `start` to `end`.
///
/// `atan2` returns the canonical angle 0 for a zero-length segment, which is
/// what degenerate edges rely on.
pub fn segment_angle(start: Point, end: Point) -> f32 {
    (end.y - start.y).atan2(end.x - start.x)
}

pub fn cubic_point(t: f32, s: Point, c1: Point, c2: Point, e: Point) -> Point {
    let u = 1.0 - t;
    Point::new(
        u.powi(3) * s.x + 3.0 * t * u.powi(2) * c1.x + 3.0 * t * t * u * c2.x + t.powi(3) * e.x,
        u.powi(3) * s.y + 3.0 * t * u.powi(2) * c1.y + 3.0 * t * t * u * c2.y + t.powi(3) * e.y,
    )
}

/// Tangent angle of a cubic bezier at `t`, in the same convention as
/// [`segment_angle`] (`-atan2(dx, dy) + pi/2` is `atan2(dy, dx)`).
pub fn cubic_angle(t: f32, s: Point, c1: Point, c2: Point, e: Point) -> f32 {
    let u = 1.0 - t;
    let dx = u.powi(2) * (c1.x - s.x) + 2.0 * t * u * (c2.x - c1.x) + t * t * (e.x - c2.x);
    let dy = u.powi(2) * (c1.y - s.y) + 2.0 * t * u * (c2.y - c1.y) + t * t * (e.y - c2.y);
    -dx.atan2(dy) + 0.5 * PI
}

pub fn quadratic_point(t: f32, s: Point, c: Point, e: Point) -> Point {
    let u = 1.0 - t;
    Point::new(
        u.powi(2) * s.x + 2.0 * u * t * c.x + t * t * e.x,
        u.powi(2) * s.y + 2.0 * u * t * c.y + t * t * e.y,
    )
}

/// Tangent angle of a quadratic bezier at `t`.
pub fn quadratic_angle(t: f32, s: Point, c: Point, e: Point) -> f32 {
    let u = 1.0 - t;
    let dx = 2.0 * u * (c.x - s.x) + 2.0 * t * (e.x - c.x);
    let dy = 2.0 * u * (c.y - s.y) + 2.0 * t * (e.y - c.y);
    -dx.atan2(dy) + 0.5 * PI
}

/// Endpoints of a fanned-out quadratic edge, pulled off the node rims.
///
/// The start swings by `+degree` and the end by the mirrored angle, so a
/// bundle of parallel edges spreads symmetrically around the chord. Note the
/// y offsets share a sign on purpose: both ends swing to the same side.
pub fn quadratic_fan_endpoints(node_size: f32, degree: f32, s: Point, e: Point) -> (Point, Point) {
    let radian = degree / 180.0 * PI;
    (
        Point::new(s.x + node_size * radian.cos(), s.y + node_size * radian.sin()),
        Point::new(e.x - node_size * radian.cos(), e.y + node_size * radian.sin()),
    )
}

/// Self-loop control net for the `parallel_seq`-th loop on a node at `center`.
///
/// The x axis grows rightward and y downward, so anchors start at 270 degrees
/// (top) and end at 180 degrees (left), each rank rotating a further 5 degrees
/// apart so stacked loops stay distinguishable.
pub fn loop_bezier(node_size: f32, parallel_seq: u32, center: Point) -> LoopBezier {
    let rank = (parallel_seq.max(1) - 1) as f32;
    let radian_start = (270.0 + rank * 5.0) / 180.0 * PI;
    let radian_end = (180.0 - rank * 5.0) / 180.0 * PI;

    // loop length curve taken from cytoscape
    let seq = parallel_seq.max(1) as f32;
    let len = 50.0 * seq * (seq / 3.0 + 1.0);

    LoopBezier {
        start: Point::new(
            center.x + node_size * radian_start.cos(),
            center.y + node_size * radian_start.sin(),
        ),
        control1: Point::new(
            center.x + (node_size + len) * radian_start.cos(),
            center.y + (node_size + len) * radian_start.sin(),
        ),
        control2: Point::new(
            center.x + (node_size + len) * radian_end.cos(),
            center.y + (node_size + len) * radian_end.sin(),
        ),
        end: Point::new(
            center.x + node_size * radian_end.cos(),
            center.y + node_size * radian_end.sin(),
        ),
    }
}

/// Expand a polyline into a closed hit polygon of half-width `width`.
///
/// Each sample is offset along the normal of its neighbor window, the
/// mirrored side is appended in reverse, and the first point is repeated to
/// close the ring.
pub fn polygon_hit_points(width: f32, points: &[Point]) -> Vec<Point> {
    let n = points.len();
    if n == 0 {
        return Vec::new();
    }
    let mut output = vec![Point::default(); n * 2];
    for (i, p) in points.iter().enumerate() {
        let prev = if i > 0 { points[i - 1] } else { *p };
        let next = if i + 1 < n { points[i + 1] } else { *p };

        let a = (prev.x - next.x).atan2(next.y - prev.y);
        let delta = Point::new(width * a.cos(), width * a.sin());

        output[i] = Point::new(p.x + delta.x, p.y + delta.y);
        output[2 * n - 1 - i] = Point::new(p.x - delta.x, p.y - delta.y);
    }
    let first = output[0];
    output.push(first);
    output
}

/// Whether `p` lies inside the polygon `points` (even-odd rule).
pub fn polygon_contains(points: &[Point], p: Point) -> bool {
    let mut inside = false;
    let n = points.len();
    if n < 3 {
        return false;
    }
    let mut j = n - 1;
    for i in 0..n {
        let (a, b) = (points[i], points[j]);
        if (a.y > p.y) != (b.y > p.y) && p.x < (b.x - a.x) * (p.y - a.y) / (b.y - a.y) + a.x {
            inside = !inside;
        }
        j = i;
    }
    inside
}
