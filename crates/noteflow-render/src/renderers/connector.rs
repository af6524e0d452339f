use super::ShapeContext;
use crate::error::{RenderError, RenderResult};
use crate::surface::{Surface, TextRun};
use crate::text::LINE_HEIGHT;
use kurbo::{BezPath, Circle, Point, Rect, Shape as KurboShape, Stroke, Vec2};
use noteflow_core::shapes::{ArrowHead, Connector};
use peniko::Color;

/// Padding around a connector label (world units).
const LABEL_PADDING: f64 = 4.0;

/// Outline of an arrowhead with its tip at `tip`, pointing along `direction`.
///
/// `direction` must be a unit vector. Returns `None` for [`ArrowHead::None`].
pub fn arrow_head_path(head: ArrowHead, tip: Point, direction: Vec2, size: f64) -> Option<BezPath> {
    let back = -direction;
    let side = Vec2::new(-direction.y, direction.x);
    let path = match head {
        ArrowHead::None => return None,
        ArrowHead::Triangle => {
            let base = tip + back * size;
            let mut path = BezPath::new();
            path.move_to(tip);
            path.line_to(base + side * (size / 2.0));
            path.line_to(base - side * (size / 2.0));
            path.close_path();
            path
        }
        ArrowHead::Circle => Circle::new(tip + back * (size / 2.0), size / 2.0).to_path(0.1),
        ArrowHead::Diamond => {
            let mid = tip + back * (size / 2.0);
            let mut path = BezPath::new();
            path.move_to(tip);
            path.line_to(mid + side * (size / 3.0));
            path.line_to(tip + back * size);
            path.line_to(mid - side * (size / 3.0));
            path.close_path();
            path
        }
    };
    Some(path)
}

/// Draw a connector: curve, arrowheads, then the optional label plate.
pub fn render_connector(connector: &Connector, ctx: &ShapeContext<'_>, surface: &mut dyn Surface) -> RenderResult<()> {
    let path = connector
        .resolve(ctx.index)
        .ok_or(RenderError::MissingEndpoint(connector.base.id))?;
    let style = &connector.style;
    let color: Color = style.stroke_color.into();

    surface.stroke(&path.to_bez_path(), ctx.transform, &Stroke::new(style.stroke_width), color);

    if !ctx.lod.decorations() {
        return Ok(());
    }

    let heads = [
        (connector.start_head, path.start, path.start_direction()),
        (connector.end_head, path.end, path.end_direction()),
    ];
    for (head, tip, direction) in heads {
        if let Some(glyph) = arrow_head_path(head, tip, direction, style.head_size) {
            surface.fill(&glyph, ctx.transform, color);
        }
    }

    if let Some(label) = connector.label.as_deref().filter(|l| !l.trim().is_empty()) {
        let font_size = style.label_font_size;
        let width = surface.measure_text(label, font_size);
        let height = font_size * LINE_HEIGHT;
        let mid = path.midpoint();
        let origin = Point::new(mid.x - width / 2.0, mid.y - height / 2.0);
        let plate = Rect::from_origin_size(origin, (width, height)).inflate(LABEL_PADDING, LABEL_PADDING);
        surface.fill(&plate.to_path(0.1), ctx.transform, style.label_background.into());
        surface.text(
            &TextRun {
                text: label.to_string(),
                origin,
                font_size,
                color: style.label_color.into(),
            },
            ctx.transform,
        );
    }
    Ok(())
}
