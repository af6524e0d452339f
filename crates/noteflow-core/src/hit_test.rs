//! Spatial queries against the shape collection.
//!
//! Candidates are ordered topmost first: z-index descending, then bounding
//! box area ascending so the more specific shape wins a tie. Each candidate
//! is probed for a connection point, then a handle (selected shapes only),
//! then its body. The first candidate with any hit ends the search.

use crate::interaction::InteractionConfig;
use crate::selection::{HandleKind, hit_test_handles};
use crate::shapes::{Shape, ShapeId, ShapeIndex, ShapeKind};
use kurbo::{Point, Rect};
use std::cmp::Ordering;
use std::collections::HashSet;

/// Tolerances for a hit test, in world units.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HitTestOptions {
    /// Slack around bodies and connector paths.
    pub tolerance: f64,
    /// Extra radius granted to connection points on top of `tolerance`.
    pub connection_bonus: f64,
    /// Radius of a handle's hit circle.
    pub handle_radius: f64,
    pub include_hidden: bool,
    pub include_locked: bool,
}

impl Default for HitTestOptions {
    fn default() -> Self {
        Self {
            tolerance: 4.0,
            connection_bonus: 4.0,
            handle_radius: 6.0,
            include_hidden: false,
            include_locked: false,
        }
    }
}

impl HitTestOptions {
    /// Convert the screen-pixel tolerances of `config` to world units at `zoom`.
    pub fn for_zoom(config: &InteractionConfig, zoom: f64) -> Self {
        let zoom = if zoom > 0.0 { zoom } else { 1.0 };
        Self {
            tolerance: config.hit_tolerance / zoom,
            connection_bonus: config.connection_point_bonus / zoom,
            handle_radius: config.handle_size / zoom,
            include_hidden: false,
            include_locked: false,
        }
    }
}

/// Which part of a shape was hit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HitTarget {
    Body,
    Handle(HandleKind),
    ConnectionPoint { index: usize, name: String },
}

/// The best match of a point query.
#[derive(Debug, Clone, PartialEq)]
pub struct HitResult {
    pub shape_id: ShapeId,
    pub kind: ShapeKind,
    pub target: HitTarget,
}

impl HitResult {
    pub fn is_handle(&self) -> Option<HandleKind> {
        match self.target {
            HitTarget::Handle(kind) => Some(kind),
            _ => None,
        }
    }
}

fn eligible(shape: &Shape, options: &HitTestOptions) -> bool {
    (options.include_hidden || shape.is_visible()) && (options.include_locked || !shape.is_locked())
}

/// Shapes eligible for hit testing with their bounds, topmost first.
///
/// Connectors with a dangling endpoint have no geometry and are skipped.
fn ordered_candidates<'a>(
    shapes: &'a [Shape],
    index: &ShapeIndex<'a>,
    options: &HitTestOptions,
) -> Vec<(&'a Shape, Rect)> {
    let mut candidates: Vec<(&Shape, Rect)> = shapes
        .iter()
        .filter(|s| eligible(s, options))
        .filter_map(|s| s.bounds(index).map(|b| (s, b)))
        .collect();
    candidates.sort_by(|(a, ab), (b, bb)| {
        b.z_index()
            .cmp(&a.z_index())
            .then_with(|| ab.area().partial_cmp(&bb.area()).unwrap_or(Ordering::Equal))
    });
    candidates
}

/// Probe a single shape in priority order.
fn probe(
    shape: &Shape,
    point: Point,
    index: &ShapeIndex<'_>,
    selected: bool,
    options: &HitTestOptions,
) -> Option<HitTarget> {
    if let Shape::Note(note) = shape {
        let radius = options.tolerance + options.connection_bonus;
        let hit = note
            .connection_points_world()
            .into_iter()
            .find(|(_, _, pos)| (point - *pos).hypot2() <= radius * radius);
        if let Some((index, cp, _)) = hit {
            return Some(HitTarget::ConnectionPoint {
                index,
                name: cp.name.clone(),
            });
        }
    }

    if selected {
        if let Some(kind) = hit_test_handles(shape, point, options.handle_radius + options.tolerance) {
            return Some(HitTarget::Handle(kind));
        }
    }

    let body = match shape {
        Shape::Note(note) => note.contains(point, options.tolerance),
        Shape::Connector(conn) => {
            let width = conn.style.stroke_width / 2.0;
            conn.resolve(index)
                .is_some_and(|path| path.distance_to(point) <= options.tolerance + width)
        }
    };
    body.then_some(HitTarget::Body)
}

/// Find the topmost interactive target at a world point.
pub fn hit_test_at_world(
    point: Point,
    shapes: &[Shape],
    selection: &HashSet<ShapeId>,
    options: &HitTestOptions,
) -> Option<HitResult> {
    if !(point.x.is_finite() && point.y.is_finite()) {
        return None;
    }
    let index = ShapeIndex::new(shapes);
    ordered_candidates(shapes, &index, options)
        .into_iter()
        .find_map(|(shape, bounds)| {
            // Cheap reject before the precise probes
            let reach = options.tolerance + options.connection_bonus + options.handle_radius;
            let reach = if selection.contains(&shape.id()) {
                reach + crate::selection::ROTATE_HANDLE_OFFSET
            } else {
                reach
            };
            if !bounds.inflate(reach, reach).contains(point) {
                return None;
            }
            probe(shape, point, &index, selection.contains(&shape.id()), options).map(|target| {
                HitResult {
                    shape_id: shape.id(),
                    kind: shape.kind(),
                    target,
                }
            })
        })
}

/// Every shape whose bounding box overlaps `rect` with positive area.
///
/// Used for marquee selection: partially covered shapes are included, and
/// shapes that merely touch the rectangle's edge are not. Results are in
/// document order.
pub fn hit_test_rectangle(rect: Rect, shapes: &[Shape], options: &HitTestOptions) -> Vec<ShapeId> {
    let rect = rect.abs();
    let index = ShapeIndex::new(shapes);
    shapes
        .iter()
        .filter(|s| eligible(s, options))
        .filter(|s| {
            s.bounds(&index)
                .is_some_and(|b| rect.intersect(b).area() > 0.0)
        })
        .map(Shape::id)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::selection::Corner;
    use crate::shapes::{Connector, Note};
    use kurbo::Size;

    fn note(x: f64, y: f64, w: f64, h: f64, z: i32) -> Shape {
        Shape::Note(Note::new(Point::new(x, y), Size::new(w, h)).with_z_index(z))
    }

    fn ids(v: &[&Shape]) -> Vec<ShapeId> {
        v.iter().map(|s| s.id()).collect()
    }

    #[test]
    fn test_higher_z_wins() {
        let low = note(0.0, 0.0, 200.0, 200.0, 0);
        let high = note(50.0, 50.0, 200.0, 200.0, 5);
        let shapes = vec![high.clone(), low];
        let hit = hit_test_at_world(
            Point::new(120.0, 120.0),
            &shapes,
            &HashSet::new(),
            &HitTestOptions::default(),
        )
        .unwrap();
        assert_eq!(hit.shape_id, high.id());
        assert_eq!(hit.target, HitTarget::Body);
    }

    #[test]
    fn test_smaller_wins_at_equal_z() {
        let big = note(0.0, 0.0, 400.0, 400.0, 1);
        let small = note(100.0, 100.0, 100.0, 100.0, 1);
        let shapes = vec![big, small.clone()];
        let hit = hit_test_at_world(
            Point::new(150.0, 150.0),
            &shapes,
            &HashSet::new(),
            &HitTestOptions::default(),
        )
        .unwrap();
        assert_eq!(hit.shape_id, small.id());
    }

    #[test]
    fn test_connection_point_beats_body() {
        let a = note(0.0, 0.0, 100.0, 100.0, 0);
        let shapes = vec![a.clone()];
        let hit = hit_test_at_world(
            Point::new(97.0, 52.0),
            &shapes,
            &HashSet::new(),
            &HitTestOptions::default(),
        )
        .unwrap();
        assert_eq!(
            hit.target,
            HitTarget::ConnectionPoint {
                index: 1,
                name: "right".into()
            }
        );
    }

    #[test]
    fn test_handles_only_when_selected() {
        let a = note(0.0, 0.0, 100.0, 100.0, 0);
        let shapes = vec![a.clone()];
        let opts = HitTestOptions::default();
        let p = Point::new(101.0, 101.0);

        let unselected = hit_test_at_world(p, &shapes, &HashSet::new(), &opts).unwrap();
        assert_eq!(unselected.target, HitTarget::Body);

        let selected: HashSet<ShapeId> = [a.id()].into_iter().collect();
        let hit = hit_test_at_world(p, &shapes, &selected, &opts).unwrap();
        assert_eq!(hit.target, HitTarget::Handle(HandleKind::Corner(Corner::BottomRight)));
    }

    #[test]
    fn test_hidden_and_locked_skipped() {
        let mut hidden = note(0.0, 0.0, 100.0, 100.0, 5);
        hidden.common_mut().visible = false;
        let mut locked = note(0.0, 0.0, 100.0, 100.0, 4);
        locked.common_mut().locked = true;
        let base = note(0.0, 0.0, 100.0, 100.0, 0);
        let shapes = vec![hidden.clone(), locked.clone(), base.clone()];
        let p = Point::new(40.0, 40.0);

        let hit = hit_test_at_world(p, &shapes, &HashSet::new(), &HitTestOptions::default());
        assert_eq!(hit.unwrap().shape_id, base.id());

        let opts = HitTestOptions {
            include_hidden: true,
            include_locked: true,
            ..Default::default()
        };
        let hit = hit_test_at_world(p, &shapes, &HashSet::new(), &opts);
        assert_eq!(hit.unwrap().shape_id, hidden.id());
    }

    #[test]
    fn test_connector_near_path() {
        let a = note(0.0, 0.0, 100.0, 100.0, 0);
        let b = note(300.0, 0.0, 100.0, 100.0, 0);
        let c = Shape::Connector(Connector::between(a.id(), "right", b.id(), "left"));
        let shapes = vec![a, b, c.clone()];
        let opts = HitTestOptions::default();

        let hit = hit_test_at_world(Point::new(200.0, 53.0), &shapes, &HashSet::new(), &opts);
        assert_eq!(hit.unwrap().shape_id, c.id());
        assert!(
            hit_test_at_world(Point::new(200.0, 70.0), &shapes, &HashSet::new(), &opts).is_none()
        );
    }

    #[test]
    fn test_miss_returns_none() {
        let shapes = vec![note(0.0, 0.0, 10.0, 10.0, 0)];
        let hit = hit_test_at_world(
            Point::new(500.0, 500.0),
            &shapes,
            &HashSet::new(),
            &HitTestOptions::default(),
        );
        assert!(hit.is_none());
        let nan = hit_test_at_world(
            Point::new(f64::NAN, 0.0),
            &shapes,
            &HashSet::new(),
            &HitTestOptions::default(),
        );
        assert!(nan.is_none());
    }

    #[test]
    fn test_marquee_is_overlap_based() {
        let x = note(10.0, 10.0, 50.0, 50.0, 0);
        let y = note(100.0, 100.0, 50.0, 50.0, 0);
        let z = note(180.0, 180.0, 50.0, 50.0, 0);
        let outside = note(400.0, 400.0, 50.0, 50.0, 0);
        let touching = note(200.0, 0.0, 20.0, 20.0, 0);
        let shapes = vec![x.clone(), y.clone(), z.clone(), outside, touching];

        // Contains x and y fully, covers part of z, touches `touching` only at its edge
        let hits = hit_test_rectangle(
            Rect::new(0.0, 0.0, 200.0, 200.0),
            &shapes,
            &HitTestOptions::default(),
        );
        assert_eq!(hits, ids(&[&x, &y, &z]));

        // A marquee that only partially covers z still selects it; one that
        // stops short of z selects exactly x and y
        let hits = hit_test_rectangle(
            Rect::new(175.0, 0.0, 0.0, 175.0),
            &shapes,
            &HitTestOptions::default(),
        );
        assert_eq!(hits, ids(&[&x, &y]));
    }

    #[test]
    fn test_options_scale_with_zoom() {
        let config = InteractionConfig::default();
        let at_2x = HitTestOptions::for_zoom(&config, 2.0);
        assert!((at_2x.tolerance - config.hit_tolerance / 2.0).abs() < 1e-12);
    }
}
