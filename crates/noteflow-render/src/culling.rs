//! Viewport culling.

use kurbo::Rect;
use noteflow_core::{Shape, ShapeIndex, Viewport};

/// Shapes that survive culling, plus what was dropped.
#[derive(Debug, Default)]
pub struct CullResult<'a> {
    /// Visible shapes sorted by z-index, document order breaking ties.
    pub visible: Vec<&'a Shape>,
    /// Hidden or entirely outside the cull area.
    pub culled: usize,
    /// Connectors whose endpoints no longer resolve.
    pub unresolved: usize,
}

/// World-space area to draw: the visible area grown by `margin` screen px.
pub fn cull_area(viewport: &Viewport, margin: f64) -> Rect {
    let world_margin = margin.max(0.0) / viewport.zoom();
    viewport.visible_area().inflate(world_margin, world_margin)
}

/// Inclusive overlap so zero-width shapes (a vertical connector) still count.
fn touches(a: Rect, b: Rect) -> bool {
    a.x0 <= b.x1 && a.x1 >= b.x0 && a.y0 <= b.y1 && a.y1 >= b.y0
}

/// Select the shapes whose bounds touch `area`.
pub fn cull<'a>(shapes: &'a [Shape], index: &ShapeIndex<'a>, area: Rect) -> CullResult<'a> {
    let mut result = CullResult::default();
    for shape in shapes {
        if !shape.is_visible() {
            result.culled += 1;
            continue;
        }
        match shape.bounds(index) {
            Some(bounds) if touches(bounds, area) => result.visible.push(shape),
            Some(_) => result.culled += 1,
            None => {
                log::debug!("Skipping connector {} with a dangling endpoint", shape.id());
                result.unresolved += 1;
            }
        }
    }
    result.visible.sort_by_key(|s| s.z_index());
    result
}
