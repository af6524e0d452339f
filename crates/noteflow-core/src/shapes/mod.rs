//! Shape definitions for the diagram canvas.

mod connector;
mod note;

pub use connector::{ArrowHead, Connector, ConnectorPath, ConnectorStyle, CurveKind, Endpoint};
pub use note::{ConnectionPoint, HorizontalAlign, Note, NoteStyle, Shadow, VerticalAlign};

use kurbo::{Affine, Point, Rect, Size, Vec2};
use peniko::Color;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use uuid::Uuid;

/// Unique identifier for shapes.
pub type ShapeId = Uuid;

/// Serializable color representation (RGBA8).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SerializableColor {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl SerializableColor {
    pub const fn new(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    pub const fn black() -> Self {
        Self::new(0, 0, 0, 255)
    }

    pub const fn white() -> Self {
        Self::new(255, 255, 255, 255)
    }

    pub const fn transparent() -> Self {
        Self::new(0, 0, 0, 0)
    }
}

impl From<Color> for SerializableColor {
    fn from(color: Color) -> Self {
        let rgba = color.to_rgba8();
        Self {
            r: rgba.r,
            g: rgba.g,
            b: rgba.b,
            a: rgba.a,
        }
    }
}

impl From<SerializableColor> for Color {
    fn from(color: SerializableColor) -> Self {
        Color::from_rgba8(color.r, color.g, color.b, color.a)
    }
}

fn default_visible() -> bool {
    true
}

/// Fields shared by every shape variant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShapeCommon {
    pub id: ShapeId,
    /// Top-left corner in world coordinates (before rotation).
    pub position: Point,
    pub size: Size,
    /// Stacking order; higher is drawn later and hit first.
    #[serde(default)]
    pub z_index: i32,
    /// Rotation angle in radians around the center.
    #[serde(default)]
    pub rotation: f64,
    #[serde(default)]
    pub locked: bool,
    #[serde(default = "default_visible")]
    pub visible: bool,
}

impl ShapeCommon {
    /// Create common fields with a fresh id.
    pub fn new(position: Point, size: Size) -> Self {
        Self {
            id: Uuid::new_v4(),
            position,
            size,
            z_index: 0,
            rotation: 0.0,
            locked: false,
            visible: true,
        }
    }

    /// The unrotated rectangle.
    pub fn rect(&self) -> Rect {
        Rect::from_origin_size(self.position, self.size)
    }

    pub fn center(&self) -> Point {
        self.rect().center()
    }

    /// Axis-aligned bounds, accounting for rotation.
    pub fn bounds(&self) -> Rect {
        rotated_bounds(self.rect(), self.rotation)
    }
}

/// Discriminant of a [`Shape`] variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ShapeKind {
    Note,
    Connector,
}

/// Enum wrapper for all shape types.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Shape {
    Note(Note),
    Connector(Connector),
}

impl Shape {
    pub fn id(&self) -> ShapeId {
        self.common().id
    }

    pub fn kind(&self) -> ShapeKind {
        match self {
            Shape::Note(_) => ShapeKind::Note,
            Shape::Connector(_) => ShapeKind::Connector,
        }
    }

    pub fn common(&self) -> &ShapeCommon {
        match self {
            Shape::Note(n) => &n.base,
            Shape::Connector(c) => &c.base,
        }
    }

    pub fn common_mut(&mut self) -> &mut ShapeCommon {
        match self {
            Shape::Note(n) => &mut n.base,
            Shape::Connector(c) => &mut c.base,
        }
    }

    pub fn z_index(&self) -> i32 {
        self.common().z_index
    }

    pub fn is_visible(&self) -> bool {
        self.common().visible
    }

    pub fn is_locked(&self) -> bool {
        self.common().locked
    }

    pub fn rotation(&self) -> f64 {
        self.common().rotation
    }

    pub fn as_note(&self) -> Option<&Note> {
        match self {
            Shape::Note(n) => Some(n),
            _ => None,
        }
    }

    pub fn as_connector(&self) -> Option<&Connector> {
        match self {
            Shape::Connector(c) => Some(c),
            _ => None,
        }
    }

    /// World-space bounding box.
    ///
    /// Connectors derive their bounds from the shapes they reference and
    /// return `None` when an endpoint is dangling.
    pub fn bounds(&self, index: &ShapeIndex<'_>) -> Option<Rect> {
        match self {
            Shape::Note(n) => Some(n.bounds()),
            Shape::Connector(c) => c.resolve(index).map(|path| path.bounds()),
        }
    }

    /// Whether this shape depends on the shape `id` (a connector endpoint).
    pub fn references(&self, id: ShapeId) -> bool {
        match self {
            Shape::Note(_) => false,
            Shape::Connector(c) => c.source.shape_id == id || c.target.shape_id == id,
        }
    }

    /// Translate the shape by a world-space delta.
    pub fn translate(&mut self, delta: Vec2) {
        match self {
            Shape::Note(n) => n.base.position += delta,
            Shape::Connector(c) => {
                for p in &mut c.control_points {
                    *p += delta;
                }
            }
        }
    }
}

/// Id lookup over a shape slice, built once per event or frame.
#[derive(Debug, Clone, Default)]
pub struct ShapeIndex<'a> {
    by_id: HashMap<ShapeId, &'a Shape>,
}

impl<'a> ShapeIndex<'a> {
    pub fn new(shapes: &'a [Shape]) -> Self {
        Self {
            by_id: shapes.iter().map(|s| (s.id(), s)).collect(),
        }
    }

    pub fn get(&self, id: ShapeId) -> Option<&'a Shape> {
        self.by_id.get(&id).copied()
    }

    pub fn note(&self, id: ShapeId) -> Option<&'a Note> {
        self.get(id).and_then(Shape::as_note)
    }

    pub fn contains(&self, id: ShapeId) -> bool {
        self.by_id.contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.by_id.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_id.is_empty()
    }
}

/// Distance from a point to a line segment (a→b).
pub fn point_to_segment_dist(point: Point, a: Point, b: Point) -> f64 {
    let seg = b - a;
    let pv = point - a;
    let len_sq = seg.hypot2();
    if len_sq < f64::EPSILON {
        return pv.hypot();
    }
    let t = (pv.dot(seg) / len_sq).clamp(0.0, 1.0);
    let proj = a + seg * t;
    (point - proj).hypot()
}

/// Minimum distance from a point to a polyline (sequence of connected segments).
pub fn point_to_polyline_dist(point: Point, points: &[Point]) -> f64 {
    match points {
        [] => f64::INFINITY,
        [single] => (point - *single).hypot(),
        _ => points
            .windows(2)
            .map(|w| point_to_segment_dist(point, w[0], w[1]))
            .fold(f64::INFINITY, f64::min),
    }
}

/// Distance from a point to an axis-aligned rectangle (0 if inside).
pub fn point_to_rect_dist(point: Point, rect: Rect) -> f64 {
    let dx = (rect.x0 - point.x).max(0.0).max(point.x - rect.x1);
    let dy = (rect.y0 - point.y).max(0.0).max(point.y - rect.y1);
    dx.hypot(dy)
}

/// Whether `point` lies in `rect` rotated by `rotation` radians around its center,
/// inflated by `tolerance`.
pub fn point_in_rotated_rect(point: Point, rect: Rect, rotation: f64, tolerance: f64) -> bool {
    let local = if rotation.abs() < f64::EPSILON {
        point
    } else {
        // Undo the rotation so the test is axis-aligned
        Affine::rotate_about(-rotation, rect.center()) * point
    };
    rect.inflate(tolerance, tolerance).contains(local)
}

/// Axis-aligned bounding box of `rect` rotated around its center.
pub fn rotated_bounds(rect: Rect, rotation: f64) -> Rect {
    if rotation.abs() < 0.001 {
        return rect;
    }
    let rot = Affine::rotate_about(rotation, rect.center());
    let corners = [
        rot * Point::new(rect.x0, rect.y0),
        rot * Point::new(rect.x1, rect.y0),
        rot * Point::new(rect.x1, rect.y1),
        rot * Point::new(rect.x0, rect.y1),
    ];
    let min_x = corners.iter().map(|p| p.x).fold(f64::INFINITY, f64::min);
    let max_x = corners.iter().map(|p| p.x).fold(f64::NEG_INFINITY, f64::max);
    let min_y = corners.iter().map(|p| p.y).fold(f64::INFINITY, f64::min);
    let max_y = corners.iter().map(|p| p.y).fold(f64::NEG_INFINITY, f64::max);
    Rect::new(min_x, min_y, max_x, max_y)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f64::consts::FRAC_PI_4;

    #[test]
    fn test_point_to_segment_dist() {
        let a = Point::new(0.0, 0.0);
        let b = Point::new(10.0, 0.0);
        assert!((point_to_segment_dist(Point::new(5.0, 3.0), a, b) - 3.0).abs() < 1e-12);
        // Projection clamped to the endpoints
        assert!((point_to_segment_dist(Point::new(-3.0, 4.0), a, b) - 5.0).abs() < 1e-12);
        assert!((point_to_segment_dist(Point::new(13.0, 4.0), a, b) - 5.0).abs() < 1e-12);
        // Degenerate segment
        assert!((point_to_segment_dist(Point::new(3.0, 4.0), a, a) - 5.0).abs() < 1e-12);
    }

    #[test]
    fn test_point_to_polyline_dist_takes_minimum() {
        let pts = [
            Point::new(0.0, 0.0),
            Point::new(10.0, 0.0),
            Point::new(10.0, 10.0),
        ];
        assert!((point_to_polyline_dist(Point::new(12.0, 5.0), &pts) - 2.0).abs() < 1e-12);
        assert!(point_to_polyline_dist(Point::ZERO, &[]).is_infinite());
    }

    #[test]
    fn test_point_to_rect_dist() {
        let rect = Rect::new(0.0, 0.0, 10.0, 10.0);
        assert_eq!(point_to_rect_dist(Point::new(5.0, 5.0), rect), 0.0);
        assert!((point_to_rect_dist(Point::new(13.0, 14.0), rect) - 5.0).abs() < 1e-12);
        assert!((point_to_rect_dist(Point::new(-2.0, 5.0), rect) - 2.0).abs() < 1e-12);
    }

    #[test]
    fn test_point_in_rotated_rect() {
        let rect = Rect::new(-10.0, -1.0, 10.0, 1.0);
        // A thin horizontal bar rotated 45 degrees no longer covers (9, 0)
        assert!(point_in_rotated_rect(Point::new(9.0, 0.0), rect, 0.0, 0.0));
        assert!(!point_in_rotated_rect(Point::new(9.0, 0.0), rect, FRAC_PI_4, 0.0));
        // But it covers a point along the diagonal
        assert!(point_in_rotated_rect(Point::new(5.0, 5.0), rect, FRAC_PI_4, 0.0));
    }

    #[test]
    fn test_rotated_bounds_grow() {
        let rect = Rect::new(0.0, 0.0, 10.0, 10.0);
        let bounds = rotated_bounds(rect, FRAC_PI_4);
        let diag = 10.0 * std::f64::consts::SQRT_2;
        assert!((bounds.width() - diag).abs() < 1e-9);
        assert!((bounds.center().x - 5.0).abs() < 1e-9);
    }

    #[test]
    fn test_shape_index_lookup() {
        let a = Shape::Note(Note::new(Point::ZERO, Size::new(10.0, 10.0)));
        let b = Shape::Note(Note::new(Point::new(50.0, 0.0), Size::new(10.0, 10.0)));
        let c = Shape::Connector(Connector::between(a.id(), "right", b.id(), "left"));
        let shapes = vec![a.clone(), b, c.clone()];
        let index = ShapeIndex::new(&shapes);
        assert_eq!(index.len(), 3);
        assert!(index.note(a.id()).is_some());
        assert!(index.note(c.id()).is_none());
        assert!(c.references(a.id()));
        assert!(!a.references(c.id()));
    }
}
