//! Viewport module for pan/zoom transforms.

use crate::error::{CanvasError, CanvasResult, ensure_finite};
use crate::input::Instant;
use kurbo::{Affine, Point, Rect, Size, Vec2};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Zoom limits and pan constraints applied to a [`Viewport`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ViewportConfig {
    /// Minimum allowed zoom level.
    pub min_zoom: f64,
    /// Maximum allowed zoom level.
    pub max_zoom: f64,
    /// Maximum length of the offset vector (None = unconstrained).
    pub max_pan_distance: Option<f64>,
    /// Multiplicative zoom step for one wheel notch.
    pub wheel_zoom_step: f64,
}

impl Default for ViewportConfig {
    fn default() -> Self {
        Self {
            min_zoom: 0.1,
            max_zoom: 10.0,
            max_pan_distance: None,
            wheel_zoom_step: 1.1,
        }
    }
}

/// Partial viewport update reported to the document collaborator.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ViewportPatch {
    pub zoom: Option<f64>,
    pub offset: Option<Vec2>,
    pub size: Option<Size>,
}

/// Viewport manages the world-to-screen mapping of the canvas.
///
/// `world = (screen - offset) / zoom`. The visible area is derived from the
/// other fields and recomputed on every mutation, so the fields are private.
/// Persist a viewport through [`Viewport::to_patch`]; it is rebuilt with
/// [`Viewport::apply_patch`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Viewport {
    zoom: f64,
    min_zoom: f64,
    max_zoom: f64,
    offset: Vec2,
    size: Size,
    visible_area: Rect,
    max_pan_distance: Option<f64>,
}

impl Default for Viewport {
    fn default() -> Self {
        Self::new(Size::new(800.0, 600.0))
    }
}

impl Viewport {
    /// Create a viewport of the given screen size with default limits.
    pub fn new(size: Size) -> Self {
        Self::with_limits(&ViewportConfig::default(), size)
    }

    /// Create a viewport using the limits from `config`.
    ///
    /// Fails with [`CanvasError::InvalidViewport`] when the zoom limits are
    /// not a finite positive range, the pan limit is negative or not finite,
    /// or the size is negative or not finite.
    pub fn from_config(config: &ViewportConfig, size: Size) -> CanvasResult<Self> {
        let (min, max) = (config.min_zoom, config.max_zoom);
        if !(min.is_finite() && max.is_finite() && min > 0.0 && min <= max) {
            return Err(CanvasError::InvalidViewport(format!(
                "zoom limits [{min}, {max}] are not a positive range"
            )));
        }
        if let Some(pan) = config.max_pan_distance.filter(|p| !(p.is_finite() && *p >= 0.0)) {
            return Err(CanvasError::InvalidViewport(format!(
                "max_pan_distance must be a non-negative number, got {pan}"
            )));
        }
        if !(size.width.is_finite() && size.height.is_finite())
            || size.width < 0.0
            || size.height < 0.0
        {
            return Err(CanvasError::InvalidViewport(format!(
                "size must be finite and not negative, got {size:?}"
            )));
        }
        Ok(Self::with_limits(config, size))
    }

    fn with_limits(config: &ViewportConfig, size: Size) -> Self {
        let mut viewport = Self {
            zoom: 1.0_f64.clamp(config.min_zoom, config.max_zoom),
            min_zoom: config.min_zoom,
            max_zoom: config.max_zoom,
            offset: Vec2::ZERO,
            size,
            visible_area: Rect::ZERO,
            max_pan_distance: config.max_pan_distance,
        };
        viewport.update_visible_area();
        viewport
    }

    pub fn zoom(&self) -> f64 {
        self.zoom
    }

    pub fn min_zoom(&self) -> f64 {
        self.min_zoom
    }

    pub fn max_zoom(&self) -> f64 {
        self.max_zoom
    }

    pub fn offset(&self) -> Vec2 {
        self.offset
    }

    pub fn size(&self) -> Size {
        self.size
    }

    /// The world-space rectangle currently shown on screen.
    pub fn visible_area(&self) -> Rect {
        self.visible_area
    }

    pub fn max_pan_distance(&self) -> Option<f64> {
        self.max_pan_distance
    }

    /// Get the affine transform for rendering (world to screen).
    pub fn transform(&self) -> Affine {
        Affine::translate(self.offset) * Affine::scale(self.zoom)
    }

    /// Get the inverse transform for input handling (screen to world).
    pub fn inverse_transform(&self) -> Affine {
        Affine::scale(1.0 / self.zoom) * Affine::translate(-self.offset)
    }

    /// Convert a screen point to world coordinates.
    pub fn screen_to_world(&self, screen_point: Point) -> Point {
        Point::new(
            (screen_point.x - self.offset.x) / self.zoom,
            (screen_point.y - self.offset.y) / self.zoom,
        )
    }

    /// Convert a world point to screen coordinates.
    pub fn world_to_screen(&self, world_point: Point) -> Point {
        Point::new(
            world_point.x * self.zoom + self.offset.x,
            world_point.y * self.zoom + self.offset.y,
        )
    }

    /// Convert a screen-space vector (a drag delta) to world units.
    pub fn screen_delta_to_world(&self, delta: Vec2) -> Vec2 {
        delta / self.zoom
    }

    /// Convert a world rectangle to screen coordinates.
    pub fn world_rect_to_screen(&self, rect: Rect) -> Rect {
        Rect::from_points(
            self.world_to_screen(Point::new(rect.x0, rect.y0)),
            self.world_to_screen(Point::new(rect.x1, rect.y1)),
        )
    }

    /// Convert a screen rectangle to world coordinates.
    pub fn screen_rect_to_world(&self, rect: Rect) -> Rect {
        Rect::from_points(
            self.screen_to_world(Point::new(rect.x0, rect.y0)),
            self.screen_to_world(Point::new(rect.x1, rect.y1)),
        )
    }

    /// Change the zoom limits; the current zoom is clamped into the new range.
    pub fn set_zoom_limits(&mut self, min_zoom: f64, max_zoom: f64) -> CanvasResult<()> {
        ensure_finite("zoom limits", &[min_zoom, max_zoom])?;
        if min_zoom <= 0.0 || min_zoom > max_zoom {
            return Err(CanvasError::InvalidViewport(format!(
                "zoom limits [{min_zoom}, {max_zoom}] are not a positive range"
            )));
        }
        self.min_zoom = min_zoom;
        self.max_zoom = max_zoom;
        self.zoom = self.zoom.clamp(min_zoom, max_zoom);
        self.update_visible_area();
        Ok(())
    }

    /// Constrain the length of the offset vector. `None` removes the constraint.
    pub fn set_max_pan_distance(&mut self, max: Option<f64>) -> CanvasResult<()> {
        if let Some(max) = max {
            ensure_finite("max pan distance", &[max])?;
        }
        self.max_pan_distance = max.map(|m| m.max(0.0));
        self.offset = self.constrain_offset(self.offset);
        self.update_visible_area();
        Ok(())
    }

    /// Resize the screen surface.
    pub fn set_size(&mut self, size: Size) -> CanvasResult<()> {
        ensure_finite("size", &[size.width, size.height])?;
        if size.width < 0.0 || size.height < 0.0 {
            return Err(CanvasError::InvalidViewport(format!(
                "size must not be negative, got {size:?}"
            )));
        }
        self.size = size;
        self.update_visible_area();
        Ok(())
    }

    /// Set zoom without moving the offset.
    pub fn set_zoom(&mut self, zoom: f64) -> CanvasResult<()> {
        ensure_finite("zoom", &[zoom])?;
        self.zoom = zoom.clamp(self.min_zoom, self.max_zoom);
        self.update_visible_area();
        Ok(())
    }

    /// Set zoom and offset together (used by animation frames).
    pub fn set_transform(&mut self, zoom: f64, offset: Vec2) -> CanvasResult<()> {
        ensure_finite("transform", &[zoom, offset.x, offset.y])?;
        self.zoom = zoom.clamp(self.min_zoom, self.max_zoom);
        self.offset = self.constrain_offset(offset);
        self.update_visible_area();
        Ok(())
    }

    /// Zoom to `new_zoom`, keeping the world point under `screen_center` fixed.
    pub fn zoom_at_point(&mut self, new_zoom: f64, screen_center: Point) -> CanvasResult<()> {
        ensure_finite("zoom", &[new_zoom, screen_center.x, screen_center.y])?;
        let new_zoom = new_zoom.clamp(self.min_zoom, self.max_zoom);

        // World point under the center at the old zoom
        let world_point = self.screen_to_world(screen_center);

        self.zoom = new_zoom;
        let offset = Vec2::new(
            screen_center.x - world_point.x * new_zoom,
            screen_center.y - world_point.y * new_zoom,
        );
        self.offset = self.constrain_offset(offset);
        self.update_visible_area();
        Ok(())
    }

    /// Multiply the zoom by `factor`, keeping `screen_center` fixed.
    pub fn zoom_by(&mut self, factor: f64, screen_center: Point) -> CanvasResult<()> {
        ensure_finite("zoom factor", &[factor])?;
        if factor <= 0.0 {
            return Err(CanvasError::InvalidCoordinate(format!(
                "zoom factor must be positive, got {factor}"
            )));
        }
        self.zoom_at_point(self.zoom * factor, screen_center)
    }

    /// Pan the viewport by a delta in screen coordinates.
    pub fn pan_by(&mut self, delta: Vec2) -> CanvasResult<()> {
        ensure_finite("pan delta", &[delta.x, delta.y])?;
        self.offset = self.constrain_offset(self.offset + delta);
        self.update_visible_area();
        Ok(())
    }

    /// Move the viewport to an absolute offset.
    pub fn pan_to(&mut self, offset: Vec2) -> CanvasResult<()> {
        ensure_finite("pan offset", &[offset.x, offset.y])?;
        self.offset = self.constrain_offset(offset);
        self.update_visible_area();
        Ok(())
    }

    /// Fit the viewport to show `bounds` with `padding` screen pixels on each side.
    pub fn zoom_to_fit_bounds(&mut self, bounds: Rect, padding: f64) -> CanvasResult<()> {
        let target = self.fitted(bounds, padding)?;
        *self = target;
        Ok(())
    }

    /// Compute the viewport that [`zoom_to_fit_bounds`](Self::zoom_to_fit_bounds)
    /// would produce, without changing `self`.
    pub fn fitted(&self, bounds: Rect, padding: f64) -> CanvasResult<Viewport> {
        ensure_finite(
            "fit bounds",
            &[bounds.x0, bounds.y0, bounds.x1, bounds.y1, padding],
        )?;
        let mut target = self.clone();
        let bounds = bounds.abs();

        let available = Size::new(
            (self.size.width - padding * 2.0).max(1.0),
            (self.size.height - padding * 2.0).max(1.0),
        );

        if bounds.width() > f64::EPSILON && bounds.height() > f64::EPSILON {
            let scale_x = available.width / bounds.width();
            let scale_y = available.height / bounds.height();
            target.zoom = scale_x.min(scale_y).clamp(self.min_zoom, self.max_zoom);
        } else if bounds.width() > f64::EPSILON {
            target.zoom = (available.width / bounds.width()).clamp(self.min_zoom, self.max_zoom);
        } else if bounds.height() > f64::EPSILON {
            target.zoom = (available.height / bounds.height()).clamp(self.min_zoom, self.max_zoom);
        }

        // Center the bounds in the viewport
        let bounds_center = bounds.center();
        let viewport_center = Point::new(self.size.width / 2.0, self.size.height / 2.0);
        let offset = Vec2::new(
            viewport_center.x - bounds_center.x * target.zoom,
            viewport_center.y - bounds_center.y * target.zoom,
        );
        target.offset = target.constrain_offset(offset);
        target.update_visible_area();
        Ok(target)
    }

    /// Apply a partial update. Nothing changes if any field is invalid.
    pub fn apply_patch(&mut self, patch: &ViewportPatch) -> CanvasResult<()> {
        let mut next = self.clone();
        if let Some(size) = patch.size {
            next.set_size(size)?;
        }
        if let Some(zoom) = patch.zoom {
            next.set_zoom(zoom)?;
        }
        if let Some(offset) = patch.offset {
            next.pan_to(offset)?;
        }
        *self = next;
        Ok(())
    }

    /// Describe `self` as a full patch.
    pub fn to_patch(&self) -> ViewportPatch {
        ViewportPatch {
            zoom: Some(self.zoom),
            offset: Some(self.offset),
            size: Some(self.size),
        }
    }

    fn constrain_offset(&self, offset: Vec2) -> Vec2 {
        match self.max_pan_distance {
            Some(max) => {
                let len = offset.hypot();
                if len > max && len > 0.0 {
                    offset * (max / len)
                } else {
                    offset
                }
            }
            None => offset,
        }
    }

    fn update_visible_area(&mut self) {
        let x = -self.offset.x / self.zoom;
        let y = -self.offset.y / self.zoom;
        self.visible_area = Rect::new(
            x,
            y,
            x + self.size.width / self.zoom,
            y + self.size.height / self.zoom,
        );
    }
}

/// Easing curve for viewport animations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Easing {
    Linear,
    EaseIn,
    EaseOut,
    #[default]
    EaseInOut,
}

impl Easing {
    /// Map linear progress `t` in [0, 1] to eased progress.
    pub fn apply(self, t: f64) -> f64 {
        let t = t.clamp(0.0, 1.0);
        match self {
            Easing::Linear => t,
            Easing::EaseIn => t * t,
            Easing::EaseOut => t * (2.0 - t),
            Easing::EaseInOut => {
                if t < 0.5 {
                    2.0 * t * t
                } else {
                    -1.0 + (4.0 - 2.0 * t) * t
                }
            }
        }
    }
}

/// Whether an animation step finished the animation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnimationStatus {
    Running,
    Finished,
}

/// Interpolates a viewport's zoom and offset over time.
///
/// Drive it with [`step`](Self::step) once per display frame. Dropping the
/// animation cancels it and leaves the viewport at its last interpolated value.
#[derive(Debug, Clone)]
pub struct ViewportAnimation {
    from_zoom: f64,
    to_zoom: f64,
    from_offset: Vec2,
    to_offset: Vec2,
    start: Instant,
    duration: Duration,
    easing: Easing,
}

impl ViewportAnimation {
    /// Animate from the current state of `from` to `to`.
    pub fn new(
        from: &Viewport,
        to: &Viewport,
        start: Instant,
        duration: Duration,
        easing: Easing,
    ) -> CanvasResult<Self> {
        ensure_finite("animation target", &[to.zoom, to.offset.x, to.offset.y])?;
        Ok(Self {
            from_zoom: from.zoom,
            to_zoom: to.zoom,
            from_offset: from.offset,
            to_offset: to.offset,
            start,
            duration,
            easing,
        })
    }

    /// Eased progress in [0, 1] at `now`.
    pub fn progress(&self, now: Instant) -> f64 {
        if self.duration.is_zero() {
            return 1.0;
        }
        let elapsed = now.saturating_duration_since(self.start).as_secs_f64();
        self.easing
            .apply(elapsed / self.duration.as_secs_f64())
    }

    /// Write the interpolated state at `now` into `viewport`.
    pub fn step(&self, viewport: &mut Viewport, now: Instant) -> CanvasResult<AnimationStatus> {
        let t = self.progress(now);
        let zoom = self.from_zoom + (self.to_zoom - self.from_zoom) * t;
        let offset = self.from_offset + (self.to_offset - self.from_offset) * t;
        viewport.set_transform(zoom, offset)?;

        let done = self.duration.is_zero()
            || now.saturating_duration_since(self.start) >= self.duration;
        Ok(if done {
            AnimationStatus::Finished
        } else {
            AnimationStatus::Running
        })
    }
}
