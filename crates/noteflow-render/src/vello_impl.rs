//! Vello backend.

use crate::surface::{Surface, TextRun, approximate_text_width};
use kurbo::{Affine, BezPath, Rect, Size, Stroke};
use parley::layout::PositionedLayoutItem;
use parley::{FontContext, Layout, LayoutContext, StyleProperty};
use peniko::{Brush, Color, Fill};
use vello::Scene;

/// [`Surface`] that encodes into a [`vello::Scene`].
///
/// Text is shaped with parley against the fonts registered through
/// [`VelloSurface::register_font`]. Without fonts, text runs fall back to a
/// placeholder box.
pub struct VelloSurface {
    scene: Scene,
    size: Size,
    /// Font context for text rendering (cached to avoid re-registering fonts).
    font_cx: FontContext,
    layout_cx: LayoutContext<Brush>,
    font_family: Option<String>,
}

impl VelloSurface {
    pub fn new(size: Size) -> Self {
        Self {
            scene: Scene::new(),
            size,
            font_cx: FontContext::new(),
            layout_cx: LayoutContext::new(),
            font_family: None,
        }
    }

    /// Register font data. The first family found becomes the default.
    pub fn register_font(&mut self, data: Vec<u8>) {
        let families = self
            .font_cx
            .collection
            .register_fonts(vello::peniko::Blob::new(std::sync::Arc::new(data)), None);
        if self.font_family.is_none() {
            self.font_family = families
                .first()
                .and_then(|(id, _)| self.font_cx.collection.family_name(*id))
                .map(str::to_string);
            log::debug!("Default font family: {:?}", self.font_family);
        }
    }

    pub fn set_size(&mut self, size: Size) {
        self.size = size;
    }

    /// Get the built scene for rendering.
    pub fn scene(&self) -> &Scene {
        &self.scene
    }

    /// Take ownership of the scene (resets internal scene).
    pub fn take_scene(&mut self) -> Scene {
        std::mem::take(&mut self.scene)
    }

    fn layout(&mut self, text: &str, font_size: f64, brush: Brush) -> Layout<Brush> {
        let mut builder = self.layout_cx.ranged_builder(&mut self.font_cx, text, 1.0, false);
        builder.push_default(StyleProperty::FontSize(font_size as f32));
        builder.push_default(StyleProperty::Brush(brush));
        if let Some(family) = &self.font_family {
            builder.push_default(StyleProperty::FontStack(parley::FontStack::Single(
                parley::FontFamily::Named(family.clone().into()),
            )));
        }
        let mut layout = builder.build(text);
        layout.break_all_lines(None);
        layout.align(None, parley::Alignment::Start, parley::AlignmentOptions::default());
        layout
    }
}

impl Surface for VelloSurface {
    fn size(&self) -> Size {
        self.size
    }

    fn clear(&mut self, color: Color) {
        self.scene.reset();
        if color.components[3] > 0.0 {
            let rect = Rect::from_origin_size(kurbo::Point::ZERO, self.size);
            self.scene.fill(Fill::NonZero, Affine::IDENTITY, color, None, &rect);
        }
    }

    fn fill(&mut self, path: &BezPath, transform: Affine, color: Color) {
        self.scene.fill(Fill::NonZero, transform, color, None, path);
    }

    fn stroke(&mut self, path: &BezPath, transform: Affine, stroke: &Stroke, color: Color) {
        self.scene.stroke(stroke, transform, color, None, path);
    }

    fn text(&mut self, run: &TextRun, transform: Affine) {
        if run.text.is_empty() {
            return;
        }
        let brush = Brush::Solid(run.color);
        let layout = self.layout(&run.text, run.font_size, brush.clone());
        let text_transform = transform * Affine::translate(run.origin.to_vec2());
        let mut glyph_count = 0;

        for line in layout.lines() {
            for item in line.items() {
                let PositionedLayoutItem::GlyphRun(glyph_run) = item else {
                    continue;
                };
                let mut x = glyph_run.offset();
                let y = glyph_run.baseline();
                let run = glyph_run.run();
                let font = run.font();
                let font_size = run.font_size();
                let synthesis = run.synthesis();
                let glyph_xform = synthesis
                    .skew()
                    .map(|angle| Affine::skew(angle.to_radians().tan() as f64, 0.0));

                let glyphs: Vec<vello::Glyph> = glyph_run
                    .glyphs()
                    .map(|glyph| {
                        let gx = x + glyph.x;
                        let gy = y - glyph.y;
                        x += glyph.advance;
                        vello::Glyph {
                            id: glyph.id,
                            x: gx,
                            y: gy,
                        }
                    })
                    .collect();
                glyph_count += glyphs.len();

                if !glyphs.is_empty() {
                    self.scene
                        .draw_glyphs(font)
                        .brush(&brush)
                        .hint(true)
                        .transform(text_transform)
                        .glyph_transform(glyph_xform)
                        .font_size(font_size)
                        .normalized_coords(run.normalized_coords())
                        .draw(Fill::NonZero, glyphs.into_iter());
                }
            }
        }

        // No usable font: mark where the text would be.
        if glyph_count == 0 {
            let width = approximate_text_width(&run.text, run.font_size).max(run.font_size);
            let rect = Rect::from_origin_size(run.origin, (width, run.font_size * 1.2));
            self.scene
                .fill(Fill::NonZero, transform, run.color.multiply_alpha(0.25), None, &rect);
        }
    }

    fn push_layer(&mut self, opacity: f32, clip: Rect) {
        self.scene
            .push_layer(peniko::Mix::Normal, opacity, Affine::IDENTITY, &clip);
    }

    fn pop_layer(&mut self) {
        self.scene.pop_layer();
    }

    fn measure_text(&mut self, text: &str, font_size: f64) -> f64 {
        if self.font_family.is_none() {
            return approximate_text_width(text, font_size);
        }
        let layout = self.layout(text, font_size, Brush::Solid(Color::BLACK));
        f64::from(layout.width())
    }
}
