//! Conversion from `winit` window events to [`RawInputEvent`]s.

use super::{
    Instant, Key, Modifiers, MouseButton, PointerPhase, RawInputEvent, RawTouch, WheelDelta,
};
use kurbo::{Point, Rect, Vec2};
use ::winit::event::{ElementState, MouseScrollDelta, TouchPhase, WindowEvent};
use ::winit::keyboard::{Key as WinitKey, ModifiersState, NamedKey};

/// Tracks the cursor, modifiers and surface state winit reports separately.
#[derive(Debug, Clone)]
pub struct WinitInputAdapter {
    cursor: Point,
    modifiers: Modifiers,
    size: (u32, u32),
    scale_factor: f64,
}

impl WinitInputAdapter {
    pub fn new(width: u32, height: u32, scale_factor: f64) -> Self {
        Self {
            cursor: Point::ZERO,
            modifiers: Modifiers::default(),
            size: (width, height),
            scale_factor,
        }
    }

    fn bounds(&self) -> Rect {
        Rect::new(0.0, 0.0, self.size.0 as f64, self.size.1 as f64)
    }

    /// Convert one window event. Events the canvas ignores return `None`.
    pub fn convert(&mut self, event: &WindowEvent, timestamp: Instant) -> Option<RawInputEvent> {
        match event {
            WindowEvent::ModifiersChanged(m) => {
                self.modifiers = modifiers_from_state(m.state());
                None
            }
            WindowEvent::CursorMoved { position, .. } => {
                self.cursor = Point::new(position.x, position.y);
                Some(RawInputEvent::Mouse {
                    phase: PointerPhase::Move,
                    position: self.cursor,
                    button: None,
                    modifiers: self.modifiers,
                    timestamp,
                })
            }
            WindowEvent::MouseInput { state, button, .. } => Some(RawInputEvent::Mouse {
                phase: match state {
                    ElementState::Pressed => PointerPhase::Down,
                    ElementState::Released => PointerPhase::Up,
                },
                position: self.cursor,
                button: Some(mouse_button(*button)),
                modifiers: self.modifiers,
                timestamp,
            }),
            WindowEvent::MouseWheel { delta, .. } => Some(RawInputEvent::Wheel {
                position: self.cursor,
                // winit reports positive y for scrolling up; the canvas pans content down
                delta: match delta {
                    MouseScrollDelta::LineDelta(x, y) => {
                        WheelDelta::Lines(Vec2::new(-*x as f64, -*y as f64))
                    }
                    MouseScrollDelta::PixelDelta(pos) => WheelDelta::Pixels(Vec2::new(-pos.x, -pos.y)),
                },
                modifiers: self.modifiers,
                timestamp,
            }),
            WindowEvent::Touch(touch) => Some(RawInputEvent::Touch {
                phase: match touch.phase {
                    TouchPhase::Started => PointerPhase::Down,
                    TouchPhase::Moved => PointerPhase::Move,
                    TouchPhase::Ended => PointerPhase::Up,
                    TouchPhase::Cancelled => PointerPhase::Cancel,
                },
                touches: vec![RawTouch {
                    id: touch.id,
                    position: Point::new(touch.location.x, touch.location.y),
                    force: touch.force.map(|f| f.normalized()),
                }],
                modifiers: self.modifiers,
                timestamp,
            }),
            WindowEvent::KeyboardInput { event, .. } => Some(RawInputEvent::Key {
                key: key_from_winit(&event.logical_key)?,
                pressed: event.state == ElementState::Pressed,
                modifiers: self.modifiers,
                timestamp,
            }),
            WindowEvent::Resized(size) => {
                self.size = (size.width, size.height);
                Some(RawInputEvent::Resize {
                    bounds: self.bounds(),
                    scale_factor: self.scale_factor,
                    timestamp,
                })
            }
            WindowEvent::ScaleFactorChanged { scale_factor, .. } => {
                self.scale_factor = *scale_factor;
                Some(RawInputEvent::Resize {
                    bounds: self.bounds(),
                    scale_factor: self.scale_factor,
                    timestamp,
                })
            }
            WindowEvent::Focused(false) => Some(RawInputEvent::Blur { timestamp }),
            _ => None,
        }
    }
}

pub fn modifiers_from_state(state: ModifiersState) -> Modifiers {
    Modifiers {
        shift: state.shift_key(),
        ctrl: state.control_key(),
        alt: state.alt_key(),
        meta: state.super_key(),
    }
}

pub fn mouse_button(button: ::winit::event::MouseButton) -> MouseButton {
    match button {
        ::winit::event::MouseButton::Left => MouseButton::Left,
        ::winit::event::MouseButton::Right => MouseButton::Right,
        ::winit::event::MouseButton::Middle => MouseButton::Middle,
        ::winit::event::MouseButton::Back => MouseButton::Other(3),
        ::winit::event::MouseButton::Forward => MouseButton::Other(4),
        ::winit::event::MouseButton::Other(n) => MouseButton::Other(n),
    }
}

pub fn key_from_winit(key: &WinitKey) -> Option<Key> {
    match key {
        WinitKey::Named(named) => Some(match named {
            NamedKey::Delete => Key::Delete,
            NamedKey::Backspace => Key::Backspace,
            NamedKey::Escape => Key::Escape,
            NamedKey::Enter => Key::Enter,
            NamedKey::Tab => Key::Tab,
            NamedKey::Space => Key::Space,
            NamedKey::ArrowUp => Key::ArrowUp,
            NamedKey::ArrowDown => Key::ArrowDown,
            NamedKey::ArrowLeft => Key::ArrowLeft,
            NamedKey::ArrowRight => Key::ArrowRight,
            other => Key::Other(format!("{other:?}")),
        }),
        WinitKey::Character(c) => Some(Key::from_name(c.as_str())),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_modifiers_from_state() {
        let m = modifiers_from_state(ModifiersState::SHIFT | ModifiersState::SUPER);
        assert!(m.shift && m.meta);
        assert!(!m.ctrl && !m.alt);
    }

    #[test]
    fn test_key_mapping() {
        assert_eq!(key_from_winit(&WinitKey::Named(NamedKey::Delete)), Some(Key::Delete));
        assert_eq!(
            key_from_winit(&WinitKey::Character("A".into())),
            Some(Key::Character("a".into()))
        );
    }

    #[test]
    fn test_focus_loss_is_blur() {
        let mut adapter = WinitInputAdapter::new(800, 600, 1.0);
        let now = Instant::now();
        assert_eq!(
            adapter.convert(&WindowEvent::Focused(false), now),
            Some(RawInputEvent::Blur { timestamp: now })
        );
        assert_eq!(adapter.convert(&WindowEvent::Focused(true), now), None);
    }
}
