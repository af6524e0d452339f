//! Per-shape renderers.

mod connector;
mod note;

pub use connector::{arrow_head_path, render_connector};
pub use note::render_note;

use crate::config::RenderConfig;
use crate::error::RenderResult;
use crate::lod::LevelOfDetail;
use crate::surface::Surface;
use kurbo::Affine;
use noteflow_core::{Shape, ShapeIndex};

/// Frame-wide state every shape renderer needs.
pub struct ShapeContext<'a> {
    /// World to screen.
    pub transform: Affine,
    pub zoom: f64,
    pub lod: LevelOfDetail,
    pub config: &'a RenderConfig,
    pub index: &'a ShapeIndex<'a>,
}

impl ShapeContext<'_> {
    /// Convert a length in screen px to world units.
    pub fn screen_len(&self, px: f64) -> f64 {
        px / self.zoom
    }
}

/// Draw one shape with the renderer for its variant.
pub fn render_shape(shape: &Shape, ctx: &ShapeContext<'_>, surface: &mut dyn Surface) -> RenderResult<()> {
    match shape {
        Shape::Note(note) => {
            render_note(note, ctx, surface);
            Ok(())
        }
        Shape::Connector(connector) => render_connector(connector, ctx, surface),
    }
}
