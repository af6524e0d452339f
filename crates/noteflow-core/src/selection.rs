//! Selection and manipulation handle system.

use crate::shapes::{Note, Shape};
use kurbo::{Affine, Point, Rect, Vec2};
use serde::{Deserialize, Serialize};

/// Handle size in screen pixels.
pub const HANDLE_SIZE: f64 = 8.0;
/// Distance from the top edge to the rotation handle (in world units).
pub const ROTATE_HANDLE_OFFSET: f64 = 25.0;
/// Smallest width/height a resize can produce.
pub const MIN_SHAPE_SIZE: f64 = 1.0;

/// Type of selection handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum HandleKind {
    /// Corner handle (resizes both axes).
    Corner(Corner),
    /// Edge midpoint handle (resizes one axis).
    Edge(Edge),
    /// Rotation handle (positioned above the top edge).
    Rotate,
}

/// Corner positions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Corner {
    TopLeft,
    TopRight,
    BottomLeft,
    BottomRight,
}

/// Edge positions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Edge {
    Top,
    Right,
    Bottom,
    Left,
}

impl HandleKind {
    /// The 8 resize handles in drawing order.
    pub const RESIZE: [HandleKind; 8] = [
        HandleKind::Corner(Corner::TopLeft),
        HandleKind::Edge(Edge::Top),
        HandleKind::Corner(Corner::TopRight),
        HandleKind::Edge(Edge::Right),
        HandleKind::Corner(Corner::BottomRight),
        HandleKind::Edge(Edge::Bottom),
        HandleKind::Corner(Corner::BottomLeft),
        HandleKind::Edge(Edge::Left),
    ];

    pub fn is_resize(&self) -> bool {
        !matches!(self, HandleKind::Rotate)
    }

    /// Offset from the rect center in units of half width/height.
    fn unit_offset(&self) -> (f64, f64) {
        match self {
            HandleKind::Corner(Corner::TopLeft) => (-1.0, -1.0),
            HandleKind::Corner(Corner::TopRight) => (1.0, -1.0),
            HandleKind::Corner(Corner::BottomLeft) => (-1.0, 1.0),
            HandleKind::Corner(Corner::BottomRight) => (1.0, 1.0),
            HandleKind::Edge(Edge::Top) => (0.0, -1.0),
            HandleKind::Edge(Edge::Right) => (1.0, 0.0),
            HandleKind::Edge(Edge::Bottom) => (0.0, 1.0),
            HandleKind::Edge(Edge::Left) => (-1.0, 0.0),
            HandleKind::Rotate => (0.0, -1.0),
        }
    }
}

/// A selection handle with its position and type.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Handle {
    /// Position in world coordinates.
    pub position: Point,
    pub kind: HandleKind,
}

impl Handle {
    pub fn new(position: Point, kind: HandleKind) -> Self {
        Self { position, kind }
    }

    /// Check if a point (in world coordinates) hits this handle.
    /// `tolerance` should be adjusted for zoom.
    pub fn hit_test(&self, point: Point, tolerance: f64) -> bool {
        (point - self.position).hypot2() <= tolerance * tolerance
    }
}

/// Get the selection handles for a shape.
///
/// Notes get the 8 resize handles plus a rotation handle. Connectors follow
/// the notes they are attached to and have no handles of their own.
pub fn get_handles(shape: &Shape) -> Vec<Handle> {
    match shape {
        Shape::Note(note) => rect_handles(note.rect(), note.base.rotation),
        Shape::Connector(_) => Vec::new(),
    }
}

/// Resize and rotate handles around `rect`, rotated by `rotation` about its center.
pub fn rect_handles(rect: Rect, rotation: f64) -> Vec<Handle> {
    let center = rect.center();
    let half_w = rect.width() / 2.0;
    let half_h = rect.height() / 2.0;
    let rot = Affine::rotate_about(rotation, center);

    let mut handles: Vec<Handle> = HandleKind::RESIZE
        .iter()
        .map(|kind| {
            let (ux, uy) = kind.unit_offset();
            let local = Point::new(center.x + ux * half_w, center.y + uy * half_h);
            Handle::new(rot * local, *kind)
        })
        .collect();
    let rotate = Point::new(center.x, center.y - half_h - ROTATE_HANDLE_OFFSET);
    handles.push(Handle::new(rot * rotate, HandleKind::Rotate));
    handles
}

/// Find which handle (if any) is hit at the given point.
pub fn hit_test_handles(shape: &Shape, point: Point, tolerance: f64) -> Option<HandleKind> {
    get_handles(shape)
        .into_iter()
        .find(|h| h.hit_test(point, tolerance))
        .map(|h| h.kind)
}

/// Resize a rectangle by dragging one of its handles by `delta`.
///
/// Edges flipped past each other are normalized, and both dimensions are
/// kept at least [`MIN_SHAPE_SIZE`].
pub fn resize_rect(rect: Rect, handle: HandleKind, delta: Vec2, keep_aspect_ratio: bool) -> Rect {
    let (mut x0, mut y0, mut x1, mut y1) = (rect.x0, rect.y0, rect.x1, rect.y1);
    match handle {
        HandleKind::Corner(Corner::TopLeft) => {
            x0 += delta.x;
            y0 += delta.y;
        }
        HandleKind::Corner(Corner::TopRight) => {
            x1 += delta.x;
            y0 += delta.y;
        }
        HandleKind::Corner(Corner::BottomLeft) => {
            x0 += delta.x;
            y1 += delta.y;
        }
        HandleKind::Corner(Corner::BottomRight) => {
            x1 += delta.x;
            y1 += delta.y;
        }
        HandleKind::Edge(Edge::Top) => y0 += delta.y,
        HandleKind::Edge(Edge::Right) => x1 += delta.x,
        HandleKind::Edge(Edge::Bottom) => y1 += delta.y,
        HandleKind::Edge(Edge::Left) => x0 += delta.x,
        HandleKind::Rotate => return rect,
    }

    let (x0, x1) = if x0 < x1 { (x0, x1) } else { (x1, x0) };
    let (y0, y1) = if y0 < y1 { (y0, y1) } else { (y1, y0) };
    let mut width = (x1 - x0).max(MIN_SHAPE_SIZE);
    let mut height = (y1 - y0).max(MIN_SHAPE_SIZE);

    if keep_aspect_ratio && matches!(handle, HandleKind::Corner(_)) {
        let aspect = rect.width() / rect.height().max(0.1);
        let size = width.max(height * aspect);
        width = size;
        height = size / aspect;
    }

    Rect::from_origin_size(Point::new(x0, y0), (width, height))
}

/// Apply a handle drag to a note.
///
/// `delta` is in world space; for rotated notes it is projected into the
/// note's local frame first.
pub fn apply_resize(note: &mut Note, handle: HandleKind, delta: Vec2, keep_aspect_ratio: bool) {
    let local_delta = Affine::rotate(-note.base.rotation) * delta.to_point();
    let rect = resize_rect(note.rect(), handle, local_delta.to_vec2(), keep_aspect_ratio);
    note.base.position = rect.origin();
    note.base.size = rect.size();
}

/// Rotation angle (radians) that points the rotation handle at `cursor`.
///
/// 0 means the handle is straight above `center`. With `snap_to_15deg` the
/// angle snaps to 15 degree increments.
pub fn rotation_towards(center: Point, cursor: Point, snap_to_15deg: bool) -> f64 {
    let d = cursor - center;
    let mut angle = d.y.atan2(d.x) + std::f64::consts::FRAC_PI_2;
    if snap_to_15deg {
        let snap = std::f64::consts::PI / 12.0;
        angle = (angle / snap).round() * snap;
    }
    angle
}

#[cfg(test)]
mod tests {
    use super::*;
    use kurbo::Size;
    use std::f64::consts::FRAC_PI_2;

    fn note_shape() -> Shape {
        Shape::Note(Note::new(Point::new(0.0, 0.0), Size::new(100.0, 50.0)))
    }

    #[test]
    fn test_note_handles() {
        let handles = get_handles(&note_shape());
        // 4 corners + 4 edges + 1 rotation handle
        assert_eq!(handles.len(), 9);
        assert_eq!(handles[0].position, Point::new(0.0, 0.0));
        assert_eq!(handles[1].position, Point::new(50.0, 0.0));
        assert_eq!(handles[4].position, Point::new(100.0, 50.0));
        assert!(matches!(handles[8].kind, HandleKind::Rotate));
        assert_eq!(handles[8].position, Point::new(50.0, -ROTATE_HANDLE_OFFSET));
    }

    #[test]
    fn test_handles_follow_rotation() {
        let handles = rect_handles(Rect::new(0.0, 0.0, 100.0, 100.0), FRAC_PI_2);
        let top = handles
            .iter()
            .find(|h| h.kind == HandleKind::Edge(Edge::Top))
            .unwrap();
        assert!((top.position.x - 100.0).abs() < 1e-9);
        assert!((top.position.y - 50.0).abs() < 1e-9);
    }

    #[test]
    fn test_handle_hit_test() {
        let handle = Handle::new(Point::new(50.0, 50.0), HandleKind::Rotate);
        assert!(handle.hit_test(Point::new(50.0, 50.0), 10.0));
        assert!(handle.hit_test(Point::new(55.0, 55.0), 10.0));
        assert!(!handle.hit_test(Point::new(70.0, 70.0), 10.0));
    }

    #[test]
    fn test_hit_test_handles() {
        let shape = note_shape();
        assert_eq!(
            hit_test_handles(&shape, Point::new(101.0, 51.0), 4.0),
            Some(HandleKind::Corner(Corner::BottomRight))
        );
        assert_eq!(hit_test_handles(&shape, Point::new(50.0, 25.0), 4.0), None);
    }

    #[test]
    fn test_corner_resize() {
        let rect = Rect::new(0.0, 0.0, 100.0, 100.0);
        let r = resize_rect(
            rect,
            HandleKind::Corner(Corner::BottomRight),
            Vec2::new(50.0, 50.0),
            false,
        );
        assert_eq!(r, Rect::new(0.0, 0.0, 150.0, 150.0));
    }

    #[test]
    fn test_edge_resize_only_changes_one_axis() {
        let rect = Rect::new(0.0, 0.0, 100.0, 100.0);
        let r = resize_rect(rect, HandleKind::Edge(Edge::Left), Vec2::new(20.0, 99.0), false);
        assert_eq!(r, Rect::new(20.0, 0.0, 100.0, 100.0));
    }

    #[test]
    fn test_resize_flip_is_normalized() {
        let rect = Rect::new(0.0, 0.0, 100.0, 100.0);
        let r = resize_rect(rect, HandleKind::Edge(Edge::Right), Vec2::new(-150.0, 0.0), false);
        assert_eq!(r, Rect::new(-50.0, 0.0, 0.0, 100.0));
    }

    #[test]
    fn test_aspect_ratio_resize() {
        let rect = Rect::new(0.0, 0.0, 100.0, 50.0);
        let r = resize_rect(
            rect,
            HandleKind::Corner(Corner::BottomRight),
            Vec2::new(100.0, 100.0),
            true,
        );
        assert!((r.width() / r.height() - 2.0).abs() < 1e-9);
    }

    #[test]
    fn test_apply_resize_rotated_note() {
        let mut note = Note::new(Point::new(0.0, 0.0), Size::new(100.0, 100.0));
        note.base.rotation = FRAC_PI_2;
        // Local +x points down in world space after a 90 degree rotation
        apply_resize(&mut note, HandleKind::Edge(Edge::Right), Vec2::new(0.0, 20.0), false);
        assert!((note.base.size.width - 120.0).abs() < 1e-9);
        assert!((note.base.size.height - 100.0).abs() < 1e-9);
    }

    #[test]
    fn test_rotation_towards() {
        let c = Point::new(0.0, 0.0);
        assert!(rotation_towards(c, Point::new(0.0, -10.0), false).abs() < 1e-9);
        assert!((rotation_towards(c, Point::new(10.0, 0.0), false) - FRAC_PI_2).abs() < 1e-9);
        let snapped = rotation_towards(c, Point::new(10.0, -0.5), true);
        assert!((snapped - FRAC_PI_2).abs() < 1e-9);
    }
}
