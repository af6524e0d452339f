//! Connector shape: a curve between connection points of two notes.

use super::{SerializableColor, ShapeCommon, ShapeId, ShapeIndex, point_to_polyline_dist};
use kurbo::{BezPath, CubicBez, ParamCurve, Point, QuadBez, Rect, Size, Vec2};
use serde::{Deserialize, Serialize};

/// Number of samples used when flattening curves for hit testing.
const CURVE_SAMPLES: usize = 24;

/// One end of a connector: a shape id plus the name of its connection point.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Endpoint {
    pub shape_id: ShapeId,
    pub point: String,
}

impl Endpoint {
    pub fn new(shape_id: ShapeId, point: impl Into<String>) -> Self {
        Self {
            shape_id,
            point: point.into(),
        }
    }
}

/// How the connector path interpolates its control points.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum CurveKind {
    /// Polyline through every control point.
    #[default]
    Straight,
    /// Quadratic bezier using the first control point.
    Quadratic,
    /// Cubic bezier using the first two control points.
    Cubic,
}

/// Glyph drawn at a connector end.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ArrowHead {
    #[default]
    None,
    Triangle,
    Circle,
    Diamond,
}

/// Style properties for connectors.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConnectorStyle {
    pub stroke_color: SerializableColor,
    pub stroke_width: f64,
    pub head_size: f64,
    pub label_color: SerializableColor,
    pub label_background: SerializableColor,
    pub label_font_size: f64,
}

impl Default for ConnectorStyle {
    fn default() -> Self {
        Self {
            stroke_color: SerializableColor::new(55, 65, 81, 255),
            stroke_width: 2.0,
            head_size: 10.0,
            label_color: SerializableColor::black(),
            label_background: SerializableColor::white(),
            label_font_size: 12.0,
        }
    }
}

/// A connector between two notes.
///
/// `base.position`/`base.size` are informational; geometry is always derived
/// from the referenced connection points via [`Connector::resolve`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Connector {
    #[serde(flatten)]
    pub base: ShapeCommon,
    pub source: Endpoint,
    pub target: Endpoint,
    /// Control points in world coordinates, ordered from source to target.
    #[serde(default)]
    pub control_points: Vec<Point>,
    #[serde(default)]
    pub curve: CurveKind,
    #[serde(default)]
    pub start_head: ArrowHead,
    #[serde(default)]
    pub end_head: ArrowHead,
    #[serde(default)]
    pub label: Option<String>,
    #[serde(default)]
    pub style: ConnectorStyle,
}

impl Connector {
    /// Create a straight connector with a triangle head at the target.
    pub fn between(
        source: ShapeId,
        source_point: &str,
        target: ShapeId,
        target_point: &str,
    ) -> Self {
        Self {
            base: ShapeCommon::new(Point::ZERO, Size::ZERO),
            source: Endpoint::new(source, source_point),
            target: Endpoint::new(target, target_point),
            control_points: Vec::new(),
            curve: CurveKind::default(),
            start_head: ArrowHead::None,
            end_head: ArrowHead::Triangle,
            label: None,
            style: ConnectorStyle::default(),
        }
    }

    /// Resolve endpoints against the current shape set.
    ///
    /// Returns `None` if either endpoint references a missing shape, a shape
    /// that is not a note, or an unknown connection point.
    pub fn resolve(&self, index: &ShapeIndex<'_>) -> Option<ConnectorPath> {
        let start = index
            .note(self.source.shape_id)?
            .connection_point(&self.source.point)?;
        let end = index
            .note(self.target.shape_id)?
            .connection_point(&self.target.point)?;
        Some(ConnectorPath {
            start,
            end,
            control_points: self.control_points.clone(),
            curve: self.curve,
        })
    }

    /// Refresh the informational position/size from resolved geometry.
    pub fn refresh_bounds(&mut self, index: &ShapeIndex<'_>) {
        if let Some(path) = self.resolve(index) {
            let bounds = path.bounds();
            self.base.position = bounds.origin();
            self.base.size = bounds.size();
        }
    }
}

/// Resolved connector geometry in world coordinates.
#[derive(Debug, Clone, PartialEq)]
pub struct ConnectorPath {
    pub start: Point,
    pub end: Point,
    pub control_points: Vec<Point>,
    pub curve: CurveKind,
}

impl ConnectorPath {
    /// The curve as a bezier path for rendering.
    pub fn to_bez_path(&self) -> BezPath {
        let mut path = BezPath::new();
        path.move_to(self.start);
        match (self.curve, self.control_points.as_slice()) {
            (CurveKind::Quadratic, [c, ..]) => path.quad_to(*c, self.end),
            (CurveKind::Cubic, [c1, c2, ..]) => path.curve_to(*c1, *c2, self.end),
            (CurveKind::Cubic, [c]) => path.quad_to(*c, self.end),
            _ => {
                for p in &self.control_points {
                    path.line_to(*p);
                }
                path.line_to(self.end);
            }
        }
        path
    }

    /// The curve flattened into a polyline for distance tests.
    pub fn polyline(&self) -> Vec<Point> {
        match (self.curve, self.control_points.as_slice()) {
            (CurveKind::Quadratic, [c, ..]) | (CurveKind::Cubic, [c]) => {
                let quad = QuadBez::new(self.start, *c, self.end);
                sample(|t| quad.eval(t))
            }
            (CurveKind::Cubic, [c1, c2, ..]) => {
                let cubic = CubicBez::new(self.start, *c1, *c2, self.end);
                sample(|t| cubic.eval(t))
            }
            _ => {
                let mut pts = Vec::with_capacity(self.control_points.len() + 2);
                pts.push(self.start);
                pts.extend(self.control_points.iter().copied());
                pts.push(self.end);
                pts
            }
        }
    }

    /// Minimum distance from `point` to the curve.
    pub fn distance_to(&self, point: Point) -> f64 {
        point_to_polyline_dist(point, &self.polyline())
    }

    /// Bounding box of the flattened curve.
    pub fn bounds(&self) -> Rect {
        let pts = self.polyline();
        let mut rect = Rect::from_points(self.start, self.start);
        for p in pts {
            rect = rect.union_pt(p);
        }
        rect
    }

    /// Unit direction leaving the start point (towards the first interior point).
    pub fn start_direction(&self) -> Vec2 {
        let pts = self.polyline();
        direction(pts[1.min(pts.len() - 1)], self.start)
    }

    /// Unit direction arriving at the end point.
    pub fn end_direction(&self) -> Vec2 {
        let pts = self.polyline();
        let before = pts[pts.len().saturating_sub(2)];
        direction(before, self.end)
    }

    /// Point halfway along the flattened curve (by arc length).
    pub fn midpoint(&self) -> Point {
        let pts = self.polyline();
        let total: f64 = pts.windows(2).map(|w| (w[1] - w[0]).hypot()).sum();
        if total < f64::EPSILON {
            return self.start;
        }
        let mut remaining = total / 2.0;
        for w in pts.windows(2) {
            let len = (w[1] - w[0]).hypot();
            if len >= remaining {
                return w[0] + (w[1] - w[0]) * (remaining / len);
            }
            remaining -= len;
        }
        self.end
    }
}

fn sample(eval: impl Fn(f64) -> Point) -> Vec<Point> {
    (0..=CURVE_SAMPLES)
        .map(|i| eval(i as f64 / CURVE_SAMPLES as f64))
        .collect()
}

/// Unit vector pointing from `from` to `to` (x axis when degenerate).
fn direction(from: Point, to: Point) -> Vec2 {
    let v = to - from;
    let len = v.hypot();
    if len < f64::EPSILON {
        Vec2::new(1.0, 0.0)
    } else {
        v / len
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shapes::{Note, Shape};

    fn two_notes() -> (Shape, Shape) {
        let a = Shape::Note(Note::new(Point::new(0.0, 0.0), Size::new(100.0, 100.0)));
        let b = Shape::Note(Note::new(Point::new(300.0, 0.0), Size::new(100.0, 100.0)));
        (a, b)
    }

    #[test]
    fn test_resolve_straight() {
        let (a, b) = two_notes();
        let conn = Connector::between(a.id(), "right", b.id(), "left");
        let shapes = vec![a, b];
        let index = ShapeIndex::new(&shapes);
        let path = conn.resolve(&index).unwrap();
        assert_eq!(path.start, Point::new(100.0, 50.0));
        assert_eq!(path.end, Point::new(300.0, 50.0));
        assert!((path.distance_to(Point::new(200.0, 53.0)) - 3.0).abs() < 1e-9);
        assert_eq!(path.end_direction(), Vec2::new(1.0, 0.0));
        assert_eq!(path.midpoint(), Point::new(200.0, 50.0));
    }

    #[test]
    fn test_resolve_dangling() {
        let (a, b) = two_notes();
        let conn = Connector::between(a.id(), "right", b.id(), "left");
        let shapes = vec![a];
        let index = ShapeIndex::new(&shapes);
        assert!(conn.resolve(&index).is_none());
    }

    #[test]
    fn test_unknown_connection_point_is_unresolved() {
        let (a, b) = two_notes();
        let conn = Connector::between(a.id(), "north-east", b.id(), "left");
        let shapes = vec![a, b];
        assert!(conn.resolve(&ShapeIndex::new(&shapes)).is_none());
    }

    #[test]
    fn test_quadratic_bounds_include_bulge() {
        let path = ConnectorPath {
            start: Point::new(0.0, 0.0),
            end: Point::new(100.0, 0.0),
            control_points: vec![Point::new(50.0, 100.0)],
            curve: CurveKind::Quadratic,
        };
        let bounds = path.bounds();
        // Apex of the quadratic is at half the control point height
        assert!((bounds.y1 - 50.0).abs() < 1e-9);
        assert!(path.distance_to(Point::new(50.0, 50.0)) < 1e-9);
    }

    #[test]
    fn test_polyline_through_control_points() {
        let path = ConnectorPath {
            start: Point::new(0.0, 0.0),
            end: Point::new(100.0, 100.0),
            control_points: vec![Point::new(100.0, 0.0)],
            curve: CurveKind::Straight,
        };
        assert_eq!(path.polyline().len(), 3);
        assert!(path.distance_to(Point::new(100.0, 50.0)) < 1e-9);
        assert_eq!(path.start_direction(), Vec2::new(-1.0, 0.0));
    }
}
