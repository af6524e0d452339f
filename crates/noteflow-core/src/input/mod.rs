//! Event normalization: raw platform input to canonical canvas events.
//!
//! Raw events carry physical pixel coordinates in the host window's client
//! space. The normalizer subtracts the cached surface origin and divides by
//! the device pixel ratio, producing logical screen coordinates relative to
//! the surface's top-left corner. Those are the coordinates the
//! [`Viewport`] works in.

#[cfg(feature = "winit")]
pub mod winit;

use crate::error::{CanvasError, CanvasResult, ensure_finite};
use crate::viewport::Viewport;
use kurbo::{Point, Rect, Size, Vec2};
use serde::{Deserialize, Serialize};

#[cfg(target_arch = "wasm32")]
pub use web_time::Instant;
#[cfg(not(target_arch = "wasm32"))]
pub use std::time::Instant;

/// Logical pixels scrolled per wheel "line".
pub const WHEEL_LINE_HEIGHT: f64 = 20.0;

/// Mouse button identifiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MouseButton {
    Left,
    Right,
    Middle,
    Other(u16),
}

/// Modifier keys state.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Modifiers {
    pub shift: bool,
    pub ctrl: bool,
    pub alt: bool,
    pub meta: bool,
}

impl Modifiers {
    pub const NONE: Modifiers = Modifiers {
        shift: false,
        ctrl: false,
        alt: false,
        meta: false,
    };

    /// Ctrl on most platforms, Cmd on macOS.
    pub fn command(&self) -> bool {
        self.ctrl || self.meta
    }

    /// Whether a click should toggle membership instead of replacing the selection.
    pub fn toggles_selection(&self) -> bool {
        self.shift || self.command()
    }
}

/// Identity of a pointer contact.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum PointerId {
    Mouse,
    Pen,
    Touch(u64),
}

/// Device class that produced a pointer event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PointerKind {
    Mouse,
    Touch,
    Pen,
}

/// Lifecycle phase of a pointer event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PointerPhase {
    Down,
    Move,
    Up,
    Cancel,
}

/// Logical key identifiers the canvas reacts to.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Key {
    Delete,
    Backspace,
    Escape,
    Enter,
    Tab,
    Space,
    ArrowUp,
    ArrowDown,
    ArrowLeft,
    ArrowRight,
    /// A printable character, lowercased for letters.
    Character(String),
    Other(String),
}

impl Key {
    /// Build a key from a DOM-style name ("Delete", "Escape", "a", ...).
    pub fn from_name(name: &str) -> Key {
        match name {
            "Delete" => Key::Delete,
            "Backspace" => Key::Backspace,
            "Escape" | "Esc" => Key::Escape,
            "Enter" | "Return" => Key::Enter,
            "Tab" => Key::Tab,
            " " | "Space" => Key::Space,
            "ArrowUp" => Key::ArrowUp,
            "ArrowDown" => Key::ArrowDown,
            "ArrowLeft" => Key::ArrowLeft,
            "ArrowRight" => Key::ArrowRight,
            s if s.chars().count() == 1 => Key::Character(s.to_lowercase()),
            s => Key::Other(s.to_string()),
        }
    }

    pub fn is_char(&self, c: char) -> bool {
        matches!(self, Key::Character(s) if s.chars().eq(c.to_lowercase()))
    }
}

/// One touch contact as reported by the platform.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RawTouch {
    pub id: u64,
    /// Physical pixels in client space.
    pub position: Point,
    /// Normalized force in `[0, 1]`, if the device reports it.
    pub force: Option<f64>,
}

/// Wheel delta in the unit the platform reported.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum WheelDelta {
    /// Physical pixels.
    Pixels(Vec2),
    /// Lines (converted with [`WHEEL_LINE_HEIGHT`]).
    Lines(Vec2),
}

/// Library-agnostic raw input, as delivered by a platform binding.
#[derive(Debug, Clone, PartialEq)]
pub enum RawInputEvent {
    Mouse {
        phase: PointerPhase,
        position: Point,
        button: Option<MouseButton>,
        modifiers: Modifiers,
        timestamp: Instant,
    },
    /// `touches` lists the contacts that changed in this event.
    Touch {
        phase: PointerPhase,
        touches: Vec<RawTouch>,
        modifiers: Modifiers,
        timestamp: Instant,
    },
    Pen {
        phase: PointerPhase,
        position: Point,
        pressure: f64,
        button: Option<MouseButton>,
        modifiers: Modifiers,
        timestamp: Instant,
    },
    Wheel {
        position: Point,
        delta: WheelDelta,
        modifiers: Modifiers,
        timestamp: Instant,
    },
    Key {
        key: Key,
        pressed: bool,
        modifiers: Modifiers,
        timestamp: Instant,
    },
    /// The surface changed size or moved to a display with another pixel ratio.
    /// `bounds` is in physical pixels of client space.
    Resize {
        bounds: Rect,
        scale_factor: f64,
        timestamp: Instant,
    },
    /// The page scrolled, moving the surface within client space.
    Scroll { bounds: Rect, timestamp: Instant },
    /// The window lost focus.
    Blur { timestamp: Instant },
}

impl RawInputEvent {
    pub fn timestamp(&self) -> Instant {
        match self {
            RawInputEvent::Mouse { timestamp, .. }
            | RawInputEvent::Touch { timestamp, .. }
            | RawInputEvent::Pen { timestamp, .. }
            | RawInputEvent::Wheel { timestamp, .. }
            | RawInputEvent::Key { timestamp, .. }
            | RawInputEvent::Resize { timestamp, .. }
            | RawInputEvent::Scroll { timestamp, .. }
            | RawInputEvent::Blur { timestamp } => *timestamp,
        }
    }
}

/// Canonical pointer event.
#[derive(Debug, Clone, PartialEq)]
pub struct PointerEvent {
    pub phase: PointerPhase,
    pub kind: PointerKind,
    pub pointer_id: PointerId,
    /// Logical pixels relative to the surface origin.
    pub position: Point,
    pub world_position: Point,
    pub button: Option<MouseButton>,
    pub modifiers: Modifiers,
    pub pressure: Option<f64>,
    pub timestamp: Instant,
}

/// Canonical wheel event.
#[derive(Debug, Clone, PartialEq)]
pub struct WheelEvent {
    pub position: Point,
    pub world_position: Point,
    /// Scroll amount in logical pixels.
    pub delta: Vec2,
    pub modifiers: Modifiers,
    pub timestamp: Instant,
}

/// Canonical keyboard event.
#[derive(Debug, Clone, PartialEq)]
pub struct KeyEvent {
    pub key: Key,
    pub pressed: bool,
    pub modifiers: Modifiers,
    pub timestamp: Instant,
}

/// Canonical surface resize.
#[derive(Debug, Clone, PartialEq)]
pub struct ResizeEvent {
    /// New logical size of the surface.
    pub size: Size,
    pub scale_factor: f64,
    pub timestamp: Instant,
}

/// The single event shape consumed by the dispatcher and orchestrator.
#[derive(Debug, Clone, PartialEq)]
pub enum CanvasEvent {
    Pointer(PointerEvent),
    Wheel(WheelEvent),
    Key(KeyEvent),
    Resize(ResizeEvent),
    Blur { timestamp: Instant },
}

impl CanvasEvent {
    pub fn timestamp(&self) -> Instant {
        match self {
            CanvasEvent::Pointer(e) => e.timestamp,
            CanvasEvent::Wheel(e) => e.timestamp,
            CanvasEvent::Key(e) => e.timestamp,
            CanvasEvent::Resize(e) => e.timestamp,
            CanvasEvent::Blur { timestamp } => *timestamp,
        }
    }

    pub fn as_pointer(&self) -> Option<&PointerEvent> {
        match self {
            CanvasEvent::Pointer(e) => Some(e),
            _ => None,
        }
    }

    pub fn modifiers(&self) -> Modifiers {
        match self {
            CanvasEvent::Pointer(e) => e.modifiers,
            CanvasEvent::Wheel(e) => e.modifiers,
            CanvasEvent::Key(e) => e.modifiers,
            CanvasEvent::Resize(_) | CanvasEvent::Blur { .. } => Modifiers::NONE,
        }
    }
}

/// Converts [`RawInputEvent`]s into [`CanvasEvent`]s.
///
/// Caches the surface bounds (physical pixels, client space) and the device
/// pixel ratio; both are refreshed by `Resize` and `Scroll` raw events.
#[derive(Debug, Clone, PartialEq)]
pub struct EventNormalizer {
    bounds: Rect,
    scale_factor: f64,
}

impl EventNormalizer {
    pub fn new(bounds: Rect, scale_factor: f64) -> CanvasResult<Self> {
        let mut normalizer = Self {
            bounds: Rect::ZERO,
            scale_factor: 1.0,
        };
        normalizer.set_surface(bounds, scale_factor)?;
        Ok(normalizer)
    }

    /// A surface at the client origin with a 1:1 pixel ratio.
    pub fn with_size(size: Size) -> Self {
        Self {
            bounds: Rect::from_origin_size(Point::ZERO, size),
            scale_factor: 1.0,
        }
    }

    pub fn bounds(&self) -> Rect {
        self.bounds
    }

    pub fn scale_factor(&self) -> f64 {
        self.scale_factor
    }

    /// Logical size of the surface.
    pub fn surface_size(&self) -> Size {
        Size::new(
            self.bounds.width() / self.scale_factor,
            self.bounds.height() / self.scale_factor,
        )
    }

    /// Replace the cached surface geometry.
    pub fn set_surface(&mut self, bounds: Rect, scale_factor: f64) -> CanvasResult<()> {
        ensure_finite("surface bounds", &[bounds.x0, bounds.y0, bounds.x1, bounds.y1])?;
        if !(scale_factor.is_finite() && scale_factor > 0.0) {
            return Err(CanvasError::InvalidCoordinate(format!(
                "device pixel ratio must be positive, got {scale_factor}"
            )));
        }
        self.bounds = bounds.abs();
        self.scale_factor = scale_factor;
        Ok(())
    }

    /// Convert client-space physical pixels to surface-relative logical pixels.
    pub fn to_screen(&self, client: Point) -> Point {
        let rel = client - self.bounds.origin();
        (rel / self.scale_factor).to_point()
    }

    /// Screen and world position of a client-space point.
    fn locate(&self, client: Point, viewport: &Viewport) -> CanvasResult<(Point, Point)> {
        ensure_finite("pointer position", &[client.x, client.y])?;
        let screen = self.to_screen(client);
        Ok((screen, viewport.screen_to_world(screen)))
    }

    /// Normalize one raw event.
    ///
    /// Touch events expand into one canonical event per contact. Surface
    /// scroll only refreshes the cache and yields no events. A raw event
    /// containing a non-finite coordinate is rejected as a whole.
    pub fn normalize(
        &mut self,
        raw: &RawInputEvent,
        viewport: &Viewport,
    ) -> CanvasResult<Vec<CanvasEvent>> {
        match raw {
            RawInputEvent::Mouse {
                phase,
                position,
                button,
                modifiers,
                timestamp,
            } => {
                let (position, world_position) = self.locate(*position, viewport)?;
                Ok(vec![CanvasEvent::Pointer(PointerEvent {
                    phase: *phase,
                    kind: PointerKind::Mouse,
                    pointer_id: PointerId::Mouse,
                    position,
                    world_position,
                    button: *button,
                    modifiers: *modifiers,
                    pressure: None,
                    timestamp: *timestamp,
                })])
            }
            RawInputEvent::Pen {
                phase,
                position,
                pressure,
                button,
                modifiers,
                timestamp,
            } => {
                ensure_finite("pen pressure", &[*pressure])?;
                let (position, world_position) = self.locate(*position, viewport)?;
                Ok(vec![CanvasEvent::Pointer(PointerEvent {
                    phase: *phase,
                    kind: PointerKind::Pen,
                    pointer_id: PointerId::Pen,
                    position,
                    world_position,
                    button: *button,
                    modifiers: *modifiers,
                    pressure: Some(pressure.clamp(0.0, 1.0)),
                    timestamp: *timestamp,
                })])
            }
            RawInputEvent::Touch {
                phase,
                touches,
                modifiers,
                timestamp,
            } => touches
                .iter()
                .map(|t| {
                    let (position, world_position) = self.locate(t.position, viewport)?;
                    Ok(CanvasEvent::Pointer(PointerEvent {
                        phase: *phase,
                        kind: PointerKind::Touch,
                        pointer_id: PointerId::Touch(t.id),
                        position,
                        world_position,
                        button: Some(MouseButton::Left),
                        modifiers: *modifiers,
                        pressure: t.force.filter(|f| f.is_finite()),
                        timestamp: *timestamp,
                    }))
                })
                .collect(),
            RawInputEvent::Wheel {
                position,
                delta,
                modifiers,
                timestamp,
            } => {
                ensure_finite("wheel position", &[position.x, position.y])?;
                let delta = match delta {
                    WheelDelta::Pixels(d) => *d / self.scale_factor,
                    WheelDelta::Lines(d) => *d * WHEEL_LINE_HEIGHT,
                };
                ensure_finite("wheel delta", &[delta.x, delta.y])?;
                let position = self.to_screen(*position);
                Ok(vec![CanvasEvent::Wheel(WheelEvent {
                    position,
                    world_position: viewport.screen_to_world(position),
                    delta,
                    modifiers: *modifiers,
                    timestamp: *timestamp,
                })])
            }
            RawInputEvent::Key {
                key,
                pressed,
                modifiers,
                timestamp,
            } => Ok(vec![CanvasEvent::Key(KeyEvent {
                key: key.clone(),
                pressed: *pressed,
                modifiers: *modifiers,
                timestamp: *timestamp,
            })]),
            RawInputEvent::Resize {
                bounds,
                scale_factor,
                timestamp,
            } => {
                self.set_surface(*bounds, *scale_factor)?;
                Ok(vec![CanvasEvent::Resize(ResizeEvent {
                    size: self.surface_size(),
                    scale_factor: self.scale_factor,
                    timestamp: *timestamp,
                })])
            }
            RawInputEvent::Scroll { bounds, .. } => {
                self.set_surface(*bounds, self.scale_factor)?;
                Ok(Vec::new())
            }
            RawInputEvent::Blur { timestamp } => Ok(vec![CanvasEvent::Blur {
                timestamp: *timestamp,
            }]),
        }
    }
}
