//! The per-frame render pipeline.
//!
//! Each frame clears the surface, culls the shape collection against the
//! viewport and then walks [`LayerKind::ORDER`]. Background and grid are
//! replayed from [`LayerCache`] while the viewport stays within the cache
//! epsilons. Everything else is drawn fresh.

use crate::config::{GridStyle, RenderConfig};
use crate::culling;
use crate::dirty::{DirtyPriority, DirtyRegions};
use crate::error::{RenderError, RenderResult};
use crate::layers::{LayerCache, LayerKind, LayerStack, ViewportFingerprint};
use crate::lod::LevelOfDetail;
use crate::metrics::RenderMetrics;
use crate::renderers::{ShapeContext, render_shape};
use crate::scheduler::FrameScheduler;
use crate::surface::{RecordingSurface, Surface, TextRun, replay};
use crate::text::LINE_HEIGHT;
use kurbo::{Affine, BezPath, Circle, Point, Rect, Shape as KurboShape, Stroke, Vec2};
use noteflow_core::selection::{Edge, get_handles};
use noteflow_core::{HandleKind, Instant, InteractionOrchestrator, Shape, ShapeId, ShapeIndex, ShapeKind, Viewport};
use peniko::Color;
use std::collections::HashSet;

/// Grid lines closer than this on screen are thinned out by doubling the step.
const MIN_GRID_SPACING: f64 = 8.0;
/// Tooltip offset from its anchor (screen px).
const TOOLTIP_OFFSET: f64 = 12.0;
const TOOLTIP_PADDING: f64 = 6.0;

/// Text shown next to the pointer, in screen space.
#[derive(Debug, Clone, PartialEq)]
pub struct Tooltip {
    pub text: String,
    pub anchor: Point,
}

/// Transient UI state drawn above the shapes.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Overlay {
    /// Marquee rectangle in world space.
    pub marquee: Option<Rect>,
    pub hovered: Option<ShapeId>,
    pub tooltip: Option<Tooltip>,
}

/// Summary of one rendered frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameStats {
    pub rendered_count: usize,
    /// Hidden shapes plus shapes outside the cull area.
    pub culled_count: usize,
    /// Shapes that could not be drawn (dangling connectors, renderer errors).
    pub skipped_count: usize,
    /// Layers replayed from the cache.
    pub cache_hits: usize,
    /// Dirty regions that were pending when the frame started.
    pub dirty_regions: usize,
    pub lod: LevelOfDetail,
    pub frame_ms: f64,
}

/// Renders shapes, selection and overlay onto a [`Surface`].
#[derive(Debug)]
pub struct RenderEngine {
    config: RenderConfig,
    layers: LayerStack,
    cache: LayerCache,
    dirty: DirtyRegions,
    metrics: RenderMetrics,
    scheduler: FrameScheduler,
    overlay: Overlay,
    visible: Vec<ShapeId>,
}

impl Default for RenderEngine {
    fn default() -> Self {
        Self::new(RenderConfig::default())
    }
}

fn elapsed_ms(since: Instant) -> f64 {
    since.elapsed().as_secs_f64() * 1000.0
}

impl RenderEngine {
    pub fn new(config: RenderConfig) -> Self {
        Self {
            cache: LayerCache::new(config.cache_zoom_epsilon, config.cache_offset_epsilon),
            dirty: DirtyRegions::new(config.max_dirty_regions),
            metrics: RenderMetrics::new(config.metrics_window),
            layers: LayerStack::default(),
            scheduler: FrameScheduler::new(),
            overlay: Overlay::default(),
            visible: Vec::new(),
            config,
        }
    }

    pub fn config(&self) -> &RenderConfig {
        &self.config
    }

    /// Replace the configuration. Cached layers and metrics start over.
    pub fn set_config(&mut self, config: RenderConfig) {
        self.cache = LayerCache::new(config.cache_zoom_epsilon, config.cache_offset_epsilon);
        self.dirty = DirtyRegions::new(config.max_dirty_regions);
        self.metrics = RenderMetrics::new(config.metrics_window);
        self.config = config;
        self.invalidate_all();
    }

    pub fn layers(&self) -> &LayerStack {
        &self.layers
    }

    pub fn set_layer_visible(&mut self, kind: LayerKind, visible: bool) {
        self.layers.set_visible(kind, visible);
        self.scheduler.request_frame();
    }

    pub fn set_layer_opacity(&mut self, kind: LayerKind, opacity: f32) {
        self.layers.set_opacity(kind, opacity);
        self.scheduler.request_frame();
    }

    pub fn overlay(&self) -> &Overlay {
        &self.overlay
    }

    pub fn set_overlay(&mut self, overlay: Overlay) {
        if self.overlay != overlay {
            self.overlay = overlay;
            self.scheduler.request_frame();
        }
    }

    /// Mirror the hover target and marquee of the interaction layer.
    pub fn sync_interaction(&mut self, interaction: &InteractionOrchestrator) {
        let overlay = Overlay {
            marquee: interaction.marquee(),
            hovered: interaction.hovered(),
            tooltip: self.overlay.tooltip.clone(),
        };
        self.set_overlay(overlay);
    }

    /// Register a changed screen-space area and request a frame.
    pub fn invalidate(&mut self, rect: Rect, priority: DirtyPriority, ids: &[ShapeId]) {
        self.dirty.mark(rect, priority, ids);
        self.scheduler.request_frame();
    }

    /// Mark the current on-screen bounds of `ids` as dirty.
    pub fn invalidate_shapes(&mut self, viewport: &Viewport, shapes: &[Shape], ids: &[ShapeId]) {
        let index = ShapeIndex::new(shapes);
        let bounds = shapes
            .iter()
            .filter(|s| ids.contains(&s.id()))
            .filter_map(|s| s.bounds(&index))
            .reduce(|a, b| a.union(b));
        match bounds {
            Some(world) => self.invalidate(viewport.world_rect_to_screen(world), DirtyPriority::Normal, ids),
            None => self.invalidate_all(),
        }
    }

    pub fn invalidate_all(&mut self) {
        self.cache.invalidate_all();
        self.dirty.mark_all();
        self.scheduler.request_frame();
    }

    pub fn dirty(&self) -> &DirtyRegions {
        &self.dirty
    }

    pub fn metrics(&self) -> &RenderMetrics {
        &self.metrics
    }

    pub fn cache(&self) -> &LayerCache {
        &self.cache
    }

    pub fn scheduler(&self) -> &FrameScheduler {
        &self.scheduler
    }

    /// Ask for a frame on the next display refresh.
    pub fn request_frame(&mut self) -> bool {
        self.scheduler.request_frame()
    }

    /// Ids drawn by the last frame, in paint order.
    pub fn visible(&self) -> &[ShapeId] {
        &self.visible
    }

    /// Display-refresh entry point: renders only if a frame was requested.
    pub fn frame(
        &mut self,
        surface: &mut dyn Surface,
        viewport: &Viewport,
        shapes: &[Shape],
        selection: &HashSet<ShapeId>,
    ) -> RenderResult<Option<FrameStats>> {
        if !self.scheduler.begin_frame() {
            return Ok(None);
        }
        let result = self.render(surface, viewport, shapes, selection);
        self.scheduler.end_frame(Instant::now());
        result.map(Some)
    }

    /// Draw one full frame.
    pub fn render(
        &mut self,
        surface: &mut dyn Surface,
        viewport: &Viewport,
        shapes: &[Shape],
        selection: &HashSet<ShapeId>,
    ) -> RenderResult<FrameStats> {
        let started = Instant::now();
        check_viewport(viewport)?;

        let RenderEngine {
            config,
            layers,
            cache,
            dirty,
            metrics,
            overlay,
            visible,
            ..
        } = self;
        let config: &RenderConfig = config;

        surface.clear(Color::TRANSPARENT);
        visible.clear();

        let index = ShapeIndex::new(shapes);
        let culled = culling::cull(shapes, &index, culling::cull_area(viewport, config.cull_margin));
        let lod = LevelOfDetail::for_zoom(viewport.zoom(), &config.lod);
        let ctx = ShapeContext {
            transform: viewport.transform(),
            zoom: viewport.zoom(),
            lod,
            config,
            index: &index,
        };
        let fingerprint = ViewportFingerprint::of(viewport);
        let screen = Rect::from_origin_size(Point::ZERO, viewport.size());

        let mut stats = FrameStats {
            rendered_count: 0,
            culled_count: culled.culled,
            skipped_count: culled.unresolved,
            cache_hits: 0,
            dirty_regions: dirty.regions().len(),
            lod,
            frame_ms: 0.0,
        };

        for (kind, settings) in layers.iter() {
            if !settings.is_drawn() {
                continue;
            }
            if settings.is_blended() {
                surface.push_layer(settings.opacity, screen);
            }
            match kind {
                LayerKind::Background | LayerKind::Grid => match cache.lookup(kind, &fingerprint) {
                    Some(commands) => {
                        replay(commands, surface);
                        stats.cache_hits += 1;
                    }
                    None => {
                        let mut recorder = RecordingSurface::new(surface.size());
                        draw_static_layer(kind, config, viewport, &mut recorder);
                        replay(recorder.commands(), surface);
                        cache.store(kind, fingerprint, recorder.into_commands());
                    }
                },
                LayerKind::Connectors | LayerKind::Shapes => {
                    let wanted = if kind == LayerKind::Connectors {
                        ShapeKind::Connector
                    } else {
                        ShapeKind::Note
                    };
                    for shape in culled.visible.iter().filter(|s| s.kind() == wanted) {
                        let shape_started = Instant::now();
                        match render_shape(shape, &ctx, surface) {
                            Ok(()) => {
                                stats.rendered_count += 1;
                                visible.push(shape.id());
                            }
                            Err(err) => {
                                log::warn!("Skipping shape {}: {err}", shape.id());
                                stats.skipped_count += 1;
                            }
                        }
                        metrics.record_element(wanted, elapsed_ms(shape_started));
                    }
                }
                LayerKind::Selection => {
                    draw_selection(&culled.visible, selection, overlay.hovered, &ctx, surface);
                }
                LayerKind::Handles => draw_handles(&culled.visible, selection, &ctx, surface),
                LayerKind::Overlay => draw_overlay(overlay, &ctx, surface),
                LayerKind::Tooltip => draw_tooltip(overlay, config, surface),
            }
            if settings.is_blended() {
                surface.pop_layer();
            }
        }

        dirty.clear();
        stats.frame_ms = elapsed_ms(started);
        metrics.record_frame(started, stats.frame_ms);
        log::trace!(
            "Frame: {} drawn, {} culled, {} skipped in {:.2}ms",
            stats.rendered_count,
            stats.culled_count,
            stats.skipped_count,
            stats.frame_ms
        );
        Ok(stats)
    }
}

fn check_viewport(viewport: &Viewport) -> RenderResult<()> {
    let zoom = viewport.zoom();
    let offset = viewport.offset();
    let size = viewport.size();
    if !(zoom.is_finite() && zoom > 0.0) {
        return Err(RenderError::InvalidViewport(format!("zoom {zoom}")));
    }
    if !(offset.x.is_finite() && offset.y.is_finite()) {
        return Err(RenderError::InvalidViewport(format!("offset {offset:?}")));
    }
    if !(size.width.is_finite() && size.height.is_finite()) || size.width < 0.0 || size.height < 0.0 {
        return Err(RenderError::InvalidViewport(format!("size {size:?}")));
    }
    Ok(())
}

/// Grid spacing in world units, doubled until lines are far enough apart on screen.
fn grid_step(grid_size: f64, zoom: f64) -> Option<f64> {
    if !(grid_size.is_finite() && grid_size > 0.0) {
        return None;
    }
    let mut step = grid_size;
    while step * zoom < MIN_GRID_SPACING {
        step *= 2.0;
    }
    Some(step)
}

/// Screen coordinates of the grid lines covering `start..=end` (world units).
fn grid_positions(start: f64, end: f64, step: f64, to_screen: impl Fn(f64) -> f64) -> Vec<f64> {
    let first = (start / step).floor() * step;
    let mut positions = Vec::new();
    let mut value = first;
    while value <= end {
        positions.push(to_screen(value));
        value += step;
    }
    positions
}

/// Background and grid, drawn in screen space.
fn draw_static_layer(kind: LayerKind, config: &RenderConfig, viewport: &Viewport, surface: &mut dyn Surface) {
    let size = viewport.size();
    let screen = Rect::from_origin_size(Point::ZERO, size);
    match kind {
        LayerKind::Background => {
            surface.fill(&screen.to_path(0.1), Affine::IDENTITY, config.background_color);
        }
        LayerKind::Grid => {
            let Some(step) = grid_step(config.grid_size, viewport.zoom()) else {
                return;
            };
            let area = viewport.visible_area();
            let zoom = viewport.zoom();
            let offset = viewport.offset();
            let xs = grid_positions(area.x0, area.x1, step, |x| x * zoom + offset.x);
            let ys = grid_positions(area.y0, area.y1, step, |y| y * zoom + offset.y);
            let mut path = BezPath::new();
            match config.grid_style {
                GridStyle::None => return,
                GridStyle::Lines => {
                    for &x in &xs {
                        path.move_to((x, 0.0));
                        path.line_to((x, size.height));
                    }
                    for &y in &ys {
                        path.move_to((0.0, y));
                        path.line_to((size.width, y));
                    }
                    surface.stroke(&path, Affine::IDENTITY, &Stroke::new(0.5), config.grid_color);
                }
                GridStyle::CrossPlus => {
                    let arm = 3.0;
                    for &x in &xs {
                        for &y in &ys {
                            path.move_to((x - arm, y));
                            path.line_to((x + arm, y));
                            path.move_to((x, y - arm));
                            path.line_to((x, y + arm));
                        }
                    }
                    surface.stroke(&path, Affine::IDENTITY, &Stroke::new(1.0), config.grid_color);
                }
                GridStyle::Dots => {
                    for &x in &xs {
                        for &y in &ys {
                            path.extend(Circle::new((x, y), 1.0).path_elements(0.1));
                        }
                    }
                    surface.fill(&path, Affine::IDENTITY, config.grid_color);
                }
            }
        }
        _ => {}
    }
}

/// Outlines for selected shapes, and a lighter one for the hovered shape.
fn draw_selection(
    visible: &[&Shape],
    selection: &HashSet<ShapeId>,
    hovered: Option<ShapeId>,
    ctx: &ShapeContext<'_>,
    surface: &mut dyn Surface,
) {
    let color = ctx.config.selection_color;
    for shape in visible {
        let id = shape.id();
        let selected = selection.contains(&id);
        if !selected && hovered != Some(id) {
            continue;
        }
        let (width, color) = if selected {
            (ctx.screen_len(1.5), color)
        } else {
            (ctx.screen_len(1.0), color.multiply_alpha(0.6))
        };
        match shape {
            Shape::Note(note) => {
                let rect = note.rect();
                let transform = ctx.transform * Affine::rotate_about(note.base.rotation, rect.center());
                let dash = ctx.screen_len(4.0);
                let stroke = if selected {
                    Stroke::new(width).with_dashes(0.0, [dash, dash])
                } else {
                    Stroke::new(width)
                };
                surface.stroke(&rect.to_path(0.1), transform, &stroke, color);
            }
            Shape::Connector(connector) => {
                let Some(path) = connector.resolve(ctx.index) else {
                    continue;
                };
                let halo = Stroke::new(connector.style.stroke_width + ctx.screen_len(4.0));
                surface.stroke(&path.to_bez_path(), ctx.transform, &halo, color.multiply_alpha(0.35));
            }
        }
    }
}

/// Resize and rotate handles for selected shapes.
fn draw_handles(visible: &[&Shape], selection: &HashSet<ShapeId>, ctx: &ShapeContext<'_>, surface: &mut dyn Surface) {
    let size = ctx.screen_len(ctx.config.handle_size);
    let stroke = Stroke::new(ctx.screen_len(1.5));
    let color = ctx.config.selection_color;
    for shape in visible.iter().filter(|s| selection.contains(&s.id())) {
        let handles = get_handles(shape);
        let top = handles.iter().find(|h| h.kind == HandleKind::Edge(Edge::Top));
        let rotate = handles.iter().find(|h| h.kind == HandleKind::Rotate);
        if let (Some(top), Some(rotate)) = (top, rotate) {
            let mut stem = BezPath::new();
            stem.move_to(top.position);
            stem.line_to(rotate.position);
            surface.stroke(&stem, ctx.transform, &Stroke::new(ctx.screen_len(1.0)), color);
        }
        for handle in &handles {
            let path = match handle.kind {
                HandleKind::Rotate => Circle::new(handle.position, size / 2.0).to_path(0.1),
                HandleKind::Corner(_) | HandleKind::Edge(_) => {
                    Rect::from_center_size(handle.position, (size, size)).to_path(0.1)
                }
            };
            surface.fill(&path, ctx.transform, Color::WHITE);
            surface.stroke(&path, ctx.transform, &stroke, color);
        }
    }
}

fn draw_overlay(overlay: &Overlay, ctx: &ShapeContext<'_>, surface: &mut dyn Surface) {
    let Some(marquee) = overlay.marquee else {
        return;
    };
    let path = marquee.abs().to_path(0.1);
    surface.fill(&path, ctx.transform, ctx.config.marquee_fill);
    surface.stroke(&path, ctx.transform, &Stroke::new(ctx.screen_len(1.0)), ctx.config.selection_color);
}

fn draw_tooltip(overlay: &Overlay, config: &RenderConfig, surface: &mut dyn Surface) {
    let Some(tooltip) = overlay.tooltip.as_ref().filter(|t| !t.text.is_empty()) else {
        return;
    };
    let font_size = config.tooltip_font_size;
    let width = surface.measure_text(&tooltip.text, font_size);
    let origin = tooltip.anchor + Vec2::new(TOOLTIP_OFFSET, TOOLTIP_OFFSET);
    let plate = Rect::from_origin_size(origin, (width, font_size * LINE_HEIGHT))
        .inflate(TOOLTIP_PADDING, TOOLTIP_PADDING);
    surface.fill(&plate.to_path(0.1), Affine::IDENTITY, config.tooltip_background);
    surface.text(
        &TextRun {
            text: tooltip.text.clone(),
            origin,
            font_size,
            color: config.tooltip_text,
        },
        Affine::IDENTITY,
    );
}
