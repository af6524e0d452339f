//! Render engine configuration.

use crate::lod::LodThresholds;
use peniko::Color;

/// Grid display style.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum GridStyle {
    /// No grid (plain background).
    None,
    /// Full grid lines.
    #[default]
    Lines,
    /// Only corner crosses (+).
    CrossPlus,
    /// Only corner dots (.).
    Dots,
}

impl GridStyle {
    /// Cycle to the next grid style.
    pub fn next(self) -> Self {
        match self {
            GridStyle::None => GridStyle::Lines,
            GridStyle::Lines => GridStyle::CrossPlus,
            GridStyle::CrossPlus => GridStyle::Dots,
            GridStyle::Dots => GridStyle::None,
        }
    }

    /// Get display name for this grid style.
    pub fn name(self) -> &'static str {
        match self {
            GridStyle::None => "None",
            GridStyle::Lines => "Lines",
            GridStyle::CrossPlus => "Crosses",
            GridStyle::Dots => "Dots",
        }
    }
}

/// Tunables for [`RenderEngine`](crate::RenderEngine).
///
/// Lengths suffixed with "screen px" are divided by the zoom before use so
/// they keep a constant on-screen size.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderConfig {
    /// Extra screen px around the visible area in which shapes are still drawn.
    pub cull_margin: f64,
    pub lod: LodThresholds,
    /// Minimum zoom at which note connection points are drawn.
    pub connection_point_zoom: f64,
    /// Grid spacing in world units.
    pub grid_size: f64,
    pub grid_style: GridStyle,
    /// Cached layers are redrawn once zoom moves further than this.
    pub cache_zoom_epsilon: f64,
    /// Cached layers are redrawn once the offset moves further than this (screen px).
    pub cache_offset_epsilon: f64,
    /// Number of frames kept for rolling metrics.
    pub metrics_window: usize,
    /// Dirty regions beyond this count collapse into a full repaint.
    pub max_dirty_regions: usize,
    /// Handle edge length (screen px).
    pub handle_size: f64,
    pub background_color: Color,
    pub grid_color: Color,
    pub selection_color: Color,
    pub marquee_fill: Color,
    pub tooltip_background: Color,
    pub tooltip_text: Color,
    pub tooltip_font_size: f64,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            cull_margin: 100.0,
            lod: LodThresholds::default(),
            connection_point_zoom: 0.75,
            grid_size: 20.0,
            grid_style: GridStyle::default(),
            cache_zoom_epsilon: 0.01,
            cache_offset_epsilon: 1.0,
            metrics_window: 60,
            max_dirty_regions: 32,
            handle_size: 8.0,
            background_color: Color::WHITE,
            grid_color: Color::from_rgba8(200, 200, 200, 100),
            selection_color: Color::from_rgba8(59, 130, 246, 255),
            marquee_fill: Color::from_rgba8(59, 130, 246, 30),
            tooltip_background: Color::from_rgba8(33, 33, 33, 230),
            tooltip_text: Color::WHITE,
            tooltip_font_size: 12.0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_grid_style_cycles() {
        let mut style = GridStyle::None;
        for _ in 0..4 {
            style = style.next();
        }
        assert_eq!(style, GridStyle::None);
        assert_eq!(GridStyle::CrossPlus.name(), "Crosses");
    }
}
