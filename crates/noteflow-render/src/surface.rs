//! Drawing surface abstraction.
//!
//! The engine emits a small set of primitives through [`Surface`]. Backends
//! (Vello, a recorder, a host's own canvas) decide how to rasterize them.

use kurbo::{Affine, BezPath, Point, Rect, Size, Stroke};
use peniko::Color;

/// Average glyph advance in em, used when a surface has no text shaper.
const APPROX_ADVANCE_EM: f64 = 0.55;

/// One line of text positioned by its top-left corner.
#[derive(Debug, Clone, PartialEq)]
pub struct TextRun {
    pub text: String,
    pub origin: Point,
    pub font_size: f64,
    pub color: Color,
}

/// A render target.
pub trait Surface {
    /// Surface size in logical pixels.
    fn size(&self) -> Size;

    /// Discard previous content and fill with `color`.
    fn clear(&mut self, color: Color);

    fn fill(&mut self, path: &BezPath, transform: Affine, color: Color);

    fn stroke(&mut self, path: &BezPath, transform: Affine, stroke: &Stroke, color: Color);

    fn text(&mut self, run: &TextRun, transform: Affine);

    /// Start a group composited with `opacity`, clipped to `clip` (screen space).
    fn push_layer(&mut self, opacity: f32, clip: Rect);

    fn pop_layer(&mut self);

    /// Advance width of `text` at `font_size`, in the units of `font_size`.
    fn measure_text(&mut self, text: &str, font_size: f64) -> f64 {
        approximate_text_width(text, font_size)
    }
}

/// Width estimate from the character count.
pub fn approximate_text_width(text: &str, font_size: f64) -> f64 {
    text.chars().count() as f64 * font_size * APPROX_ADVANCE_EM
}

/// A recorded surface call.
#[derive(Debug, Clone)]
pub enum DrawCommand {
    Clear(Color),
    Fill {
        path: BezPath,
        transform: Affine,
        color: Color,
    },
    Stroke {
        path: BezPath,
        transform: Affine,
        stroke: Stroke,
        color: Color,
    },
    Text {
        run: TextRun,
        transform: Affine,
    },
    PushLayer {
        opacity: f32,
        clip: Rect,
    },
    PopLayer,
}

impl DrawCommand {
    /// Issue this command against `surface`.
    pub fn replay(&self, surface: &mut dyn Surface) {
        match self {
            DrawCommand::Clear(color) => surface.clear(*color),
            DrawCommand::Fill {
                path,
                transform,
                color,
            } => surface.fill(path, *transform, *color),
            DrawCommand::Stroke {
                path,
                transform,
                stroke,
                color,
            } => surface.stroke(path, *transform, stroke, *color),
            DrawCommand::Text { run, transform } => surface.text(run, *transform),
            DrawCommand::PushLayer { opacity, clip } => surface.push_layer(*opacity, *clip),
            DrawCommand::PopLayer => surface.pop_layer(),
        }
    }
}

/// Replay a recorded command list in order.
pub fn replay(commands: &[DrawCommand], surface: &mut dyn Surface) {
    for command in commands {
        command.replay(surface);
    }
}

/// Headless surface that records every call.
///
/// Used to capture cacheable layers and as a test double.
#[derive(Debug, Clone, Default)]
pub struct RecordingSurface {
    size: Size,
    commands: Vec<DrawCommand>,
}

impl RecordingSurface {
    pub fn new(size: Size) -> Self {
        Self {
            size,
            commands: Vec::new(),
        }
    }

    pub fn commands(&self) -> &[DrawCommand] {
        &self.commands
    }

    pub fn into_commands(self) -> Vec<DrawCommand> {
        self.commands
    }

    pub fn set_size(&mut self, size: Size) {
        self.size = size;
    }

    /// Text of every recorded run, in draw order.
    pub fn texts(&self) -> Vec<&str> {
        self.commands
            .iter()
            .filter_map(|c| match c {
                DrawCommand::Text { run, .. } => Some(run.text.as_str()),
                _ => None,
            })
            .collect()
    }

    pub fn fill_count(&self) -> usize {
        self.commands
            .iter()
            .filter(|c| matches!(c, DrawCommand::Fill { .. }))
            .count()
    }

    pub fn stroke_count(&self) -> usize {
        self.commands
            .iter()
            .filter(|c| matches!(c, DrawCommand::Stroke { .. }))
            .count()
    }
}

impl Surface for RecordingSurface {
    fn size(&self) -> Size {
        self.size
    }

    fn clear(&mut self, color: Color) {
        self.commands.clear();
        self.commands.push(DrawCommand::Clear(color));
    }

    fn fill(&mut self, path: &BezPath, transform: Affine, color: Color) {
        self.commands.push(DrawCommand::Fill {
            path: path.clone(),
            transform,
            color,
        });
    }

    fn stroke(&mut self, path: &BezPath, transform: Affine, stroke: &Stroke, color: Color) {
        self.commands.push(DrawCommand::Stroke {
            path: path.clone(),
            transform,
            stroke: stroke.clone(),
            color,
        });
    }

    fn text(&mut self, run: &TextRun, transform: Affine) {
        self.commands.push(DrawCommand::Text {
            run: run.clone(),
            transform,
        });
    }

    fn push_layer(&mut self, opacity: f32, clip: Rect) {
        self.commands.push(DrawCommand::PushLayer { opacity, clip });
    }

    fn pop_layer(&mut self) {
        self.commands.push(DrawCommand::PopLayer);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kurbo::Shape as _;

    #[test]
    fn test_clear_discards_previous_commands() {
        let mut surface = RecordingSurface::new(Size::new(100.0, 100.0));
        let path = Rect::new(0.0, 0.0, 10.0, 10.0).to_path(0.1);
        surface.fill(&path, Affine::IDENTITY, Color::BLACK);
        surface.clear(Color::WHITE);
        assert_eq!(surface.commands().len(), 1);
        assert!(matches!(surface.commands()[0], DrawCommand::Clear(_)));
    }

    #[test]
    fn test_replay_preserves_order() {
        let mut source = RecordingSurface::new(Size::new(100.0, 100.0));
        let path = Rect::new(0.0, 0.0, 10.0, 10.0).to_path(0.1);
        source.push_layer(0.5, Rect::new(0.0, 0.0, 100.0, 100.0));
        source.fill(&path, Affine::IDENTITY, Color::BLACK);
        source.text(
            &TextRun {
                text: "hi".into(),
                origin: Point::ZERO,
                font_size: 12.0,
                color: Color::BLACK,
            },
            Affine::IDENTITY,
        );
        source.pop_layer();

        let mut target = RecordingSurface::new(Size::new(100.0, 100.0));
        replay(source.commands(), &mut target);
        assert_eq!(target.commands().len(), 4);
        assert_eq!(target.texts(), vec!["hi"]);
        assert!(matches!(target.commands()[3], DrawCommand::PopLayer));
    }

    #[test]
    fn test_approximate_width() {
        assert!((approximate_text_width("abcd", 10.0) - 22.0).abs() < 1e-9);
        assert_eq!(approximate_text_width("", 10.0), 0.0);
    }
}
