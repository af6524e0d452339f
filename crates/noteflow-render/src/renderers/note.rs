use super::ShapeContext;
use crate::surface::{Surface, TextRun};
use crate::text::layout_text;
use kurbo::{Affine, Circle, Rect, RoundedRect, Shape as KurboShape, Stroke, Vec2};
use noteflow_core::Note;
use peniko::Color;

/// Connection point marker radius (screen px).
const CONNECTION_POINT_RADIUS: f64 = 4.0;

/// Body of the note in note-local world space (rotation lives in the transform).
fn body_path(rect: Rect, radius: f64, rounded: bool) -> kurbo::BezPath {
    if rounded && radius > 0.0 {
        RoundedRect::from_rect(rect, radius).to_path(0.1)
    } else {
        rect.to_path(0.1)
    }
}

/// Draw a note: shadow, body, border, wrapped text, then connection points.
pub fn render_note(note: &Note, ctx: &ShapeContext<'_>, surface: &mut dyn Surface) {
    let rect = note.rect();
    let style = &note.style;
    let transform = ctx.transform * Affine::rotate_about(note.base.rotation, rect.center());
    let rounded = ctx.lod.rounded_corners();

    if let Some(shadow) = style.shadow.filter(|_| ctx.lod.shadows()) {
        let path = body_path(rect + shadow.offset, style.corner_radius, rounded);
        surface.fill(&path, transform, shadow.color.into());
    }

    let body = body_path(rect, style.corner_radius, rounded);
    surface.fill(&body, transform, style.fill.into());

    if let Some(border) = style.border_color.filter(|_| style.border_width > 0.0) {
        surface.stroke(&body, transform, &Stroke::new(style.border_width), border.into());
    }

    if ctx.lod.text() && !note.text.is_empty() {
        let area = rect.inset(-style.padding);
        let font_size = style.font_size;
        let lines = layout_text(
            &note.text,
            area,
            font_size,
            style.h_align,
            style.v_align,
            &mut |s| surface.measure_text(s, font_size),
        );
        let color: Color = style.text_color.into();
        for line in lines {
            let run = TextRun {
                text: line.text,
                origin: line.origin,
                font_size,
                color,
            };
            surface.text(&run, transform);
        }
    }

    if ctx.lod.connection_points() && ctx.zoom >= ctx.config.connection_point_zoom {
        let radius = ctx.screen_len(CONNECTION_POINT_RADIUS);
        let stroke = Stroke::new(ctx.screen_len(1.0));
        for cp in &note.connection_points {
            let center = rect.origin() + Vec2::new(cp.anchor.x * rect.width(), cp.anchor.y * rect.height());
            let marker = Circle::new(center, radius).to_path(0.1);
            surface.fill(&marker, transform, Color::WHITE);
            surface.stroke(&marker, transform, &stroke, ctx.config.selection_color);
        }
    }
}
