//! Interaction orchestration.
//!
//! [`InteractionOrchestrator`] turns canonical events, hit results and
//! recognized gestures into selection requests, drag deltas and viewport
//! changes. It never mutates the document: every change is reported to a
//! [`DocumentHost`], and notable moments are announced to an
//! [`InteractionObserver`].

use crate::gesture::{Gesture, GestureKind, GestureState};
use crate::hit_test::{HitResult, HitTarget, HitTestOptions, hit_test_rectangle};
use crate::input::{
    CanvasEvent, Key, KeyEvent, Modifiers, MouseButton, PointerEvent, PointerId, PointerKind,
    PointerPhase, WHEEL_LINE_HEIGHT, WheelEvent,
};
use crate::selection::{HandleKind, apply_resize, rotation_towards};
use crate::shapes::{Shape, ShapeId, ShapeKind};
use crate::viewport::{Viewport, ViewportPatch};
use kurbo::{Point, Rect, Vec2};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Arrow-key nudge distance in world units.
const NUDGE_STEP: f64 = 1.0;
/// Arrow-key nudge distance with shift held.
const NUDGE_STEP_LARGE: f64 = 10.0;

/// Thresholds for pointer interaction. Distances are logical screen pixels.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InteractionConfig {
    /// Movement before a press becomes a drag.
    pub drag_threshold: f64,
    /// Slack around shape bodies and connector paths.
    pub hit_tolerance: f64,
    /// Extra radius for connection points.
    pub connection_point_bonus: f64,
    /// Radius of a handle's hit circle.
    pub handle_size: f64,
    /// Whether pressing on empty canvas starts a marquee.
    pub marquee_enabled: bool,
}

impl Default for InteractionConfig {
    fn default() -> Self {
        Self {
            drag_threshold: 3.0,
            hit_tolerance: 4.0,
            connection_point_bonus: 4.0,
            handle_size: 6.0,
            marquee_enabled: true,
        }
    }
}

/// Top-level interaction state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum InteractionState {
    #[default]
    Idle,
    Hovering,
    Dragging,
    Selecting,
    Gesturing,
    Editing,
}

/// Active pointer tool.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Tool {
    #[default]
    Select,
    Pan,
}

/// What a drag manipulates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DragKind {
    /// Translate the target shapes.
    Move,
    /// Resize the target through one of its handles.
    Resize(HandleKind),
    /// Rotate the target through its rotation handle.
    Rotate,
    /// Pan the viewport.
    Pan,
}

/// Snapshot of an in-flight drag.
#[derive(Debug, Clone, PartialEq)]
pub struct DragDescriptor {
    pub kind: DragKind,
    pub targets: Vec<ShapeId>,
    pub start_world: Point,
    pub current_world: Point,
    /// Cumulative world-space delta since the drag started.
    pub delta: Vec2,
}

/// The document/undo collaborator.
///
/// The orchestrator only reads shapes and selection; everything else is a
/// request the host is free to apply, batch or reject.
pub trait DocumentHost {
    fn shapes(&self) -> &[Shape];
    fn selection(&self) -> HashSet<ShapeId>;
    /// Translate `ids` by a world-space delta since the previous call.
    fn apply_drag(&mut self, ids: &[ShapeId], delta: Vec2);
    /// Set the unrotated rectangle and rotation of one shape.
    fn apply_transform(&mut self, id: ShapeId, rect: Rect, rotation: f64);
    fn apply_viewport(&mut self, patch: &ViewportPatch);
    fn request_delete(&mut self, ids: &[ShapeId]);
    fn request_selection_change(&mut self, ids: &[ShapeId]);
}

/// Notifications for the host UI. Every method defaults to a no-op.
pub trait InteractionObserver {
    fn on_element_hover(&mut self, _id: Option<ShapeId>) {}
    fn on_element_select(&mut self, _ids: &[ShapeId]) {}
    fn on_element_edit_start(&mut self, _id: Option<ShapeId>) {}
    fn on_element_drag(&mut self, _ids: &[ShapeId], _delta: Vec2) {}
    fn on_viewport_change(&mut self, _viewport: &Viewport) {}
    fn on_interaction_state_change(&mut self, _state: InteractionState) {}
    /// Every recognized gesture, including ones the orchestrator ignores.
    fn on_gesture(&mut self, _gesture: &Gesture) {}
}

impl InteractionObserver for () {}

/// Mutable collaborators for one event.
pub struct InteractionContext<'a> {
    pub viewport: &'a mut Viewport,
    pub document: &'a mut dyn DocumentHost,
    pub observer: &'a mut dyn InteractionObserver,
}

impl InteractionContext<'_> {
    fn viewport_changed(&mut self) {
        self.document.apply_viewport(&self.viewport.to_patch());
        self.observer.on_viewport_change(self.viewport);
    }

    fn change_selection(&mut self, ids: &[ShapeId]) {
        self.document.request_selection_change(ids);
        self.observer.on_element_select(ids);
    }

    /// Selection in document order.
    fn ordered_selection(&self) -> Vec<ShapeId> {
        let selection = self.document.selection();
        self.document
            .shapes()
            .iter()
            .map(Shape::id)
            .filter(|id| selection.contains(id))
            .collect()
    }
}

/// Precomputed per-event inputs: the hit under the pointer and the gestures
/// the recognizer produced for the same event.
#[derive(Debug, Clone, Default)]
pub struct InputFrame {
    pub hit: Option<HitResult>,
    pub gestures: Vec<Gesture>,
    /// Whether the recognizer still has a multi-pointer gesture running.
    pub multi_pointer_active: bool,
}

#[derive(Debug, Clone, PartialEq)]
enum PressIntent {
    Shape { id: ShapeId, was_selected: bool },
    Handle { id: ShapeId, handle: HandleKind },
    Marquee,
    Pan,
}

/// A pressed pointer that has not necessarily moved yet.
#[derive(Debug, Clone)]
struct Press {
    pointer: PointerId,
    start_screen: Point,
    start_world: Point,
    last_screen: Point,
    last_world: Point,
    modifiers: Modifiers,
    intent: PressIntent,
}

impl Press {
    fn travelled(&self) -> f64 {
        (self.last_screen - self.start_screen).hypot()
    }
}

#[derive(Debug, Clone)]
struct ActiveDrag {
    descriptor: DragDescriptor,
    /// Original geometry of the single resize/rotate target.
    origin: Option<Shape>,
}

/// Baselines for translating gestures into viewport calls.
#[derive(Debug, Clone, Copy, Default)]
struct GestureBaseline {
    pinch_zoom: f64,
    pan_applied: Vec2,
}

/// Drives the interaction state machine.
#[derive(Debug, Clone)]
pub struct InteractionOrchestrator {
    config: InteractionConfig,
    wheel_zoom_step: f64,
    state: InteractionState,
    tool: Tool,
    hovered: Option<ShapeId>,
    press: Option<Press>,
    drag: Option<ActiveDrag>,
    editing: Option<ShapeId>,
    baseline: GestureBaseline,
}

impl Default for InteractionOrchestrator {
    fn default() -> Self {
        Self::new(InteractionConfig::default(), 1.1)
    }
}

impl InteractionOrchestrator {
    pub fn new(config: InteractionConfig, wheel_zoom_step: f64) -> Self {
        Self {
            config,
            wheel_zoom_step,
            state: InteractionState::Idle,
            tool: Tool::Select,
            hovered: None,
            press: None,
            drag: None,
            editing: None,
            baseline: GestureBaseline::default(),
        }
    }

    pub fn config(&self) -> &InteractionConfig {
        &self.config
    }

    pub fn state(&self) -> InteractionState {
        self.state
    }

    pub fn tool(&self) -> Tool {
        self.tool
    }

    pub fn set_tool(&mut self, tool: Tool) {
        self.tool = tool;
    }

    pub fn hovered(&self) -> Option<ShapeId> {
        self.hovered
    }

    pub fn editing(&self) -> Option<ShapeId> {
        self.editing
    }

    pub fn drag(&self) -> Option<&DragDescriptor> {
        self.drag.as_ref().map(|d| &d.descriptor)
    }

    /// The marquee rectangle in world space while selecting.
    pub fn marquee(&self) -> Option<Rect> {
        match (&self.state, &self.press) {
            (InteractionState::Selecting, Some(press)) => {
                Some(Rect::from_points(press.start_world, press.last_world))
            }
            _ => None,
        }
    }

    fn set_state(&mut self, state: InteractionState, observer: &mut dyn InteractionObserver) {
        if self.state != state {
            log::debug!("Interaction state {:?} -> {:?}", self.state, state);
            self.state = state;
            observer.on_interaction_state_change(state);
        }
    }

    fn set_hovered(&mut self, id: Option<ShapeId>, observer: &mut dyn InteractionObserver) {
        if self.hovered != id {
            self.hovered = id;
            observer.on_element_hover(id);
        }
    }

    /// Handle one canonical event.
    pub fn handle_event(
        &mut self,
        event: &CanvasEvent,
        frame: &InputFrame,
        ctx: &mut InteractionContext<'_>,
    ) {
        match event {
            CanvasEvent::Pointer(e) => {
                for gesture in &frame.gestures {
                    self.handle_gesture(gesture, ctx);
                }
                if self.state == InteractionState::Gesturing {
                    if !frame.multi_pointer_active {
                        self.set_state(InteractionState::Idle, ctx.observer);
                    }
                    return;
                }
                self.handle_pointer(e, frame, ctx);
            }
            CanvasEvent::Wheel(e) => self.handle_wheel(e, ctx),
            CanvasEvent::Key(e) if e.pressed => self.handle_key(e, ctx),
            CanvasEvent::Key(_) => {}
            CanvasEvent::Resize(e) => match ctx.viewport.set_size(e.size) {
                Ok(()) => ctx.viewport_changed(),
                Err(err) => log::warn!("Ignoring resize: {err}"),
            },
            CanvasEvent::Blur { .. } => self.interrupt(ctx),
        }
    }

    /// Translate a gesture into viewport changes.
    ///
    /// Only multi-pointer gestures drive the viewport; the rest are only
    /// forwarded to the observer.
    pub fn handle_gesture(&mut self, gesture: &Gesture, ctx: &mut InteractionContext<'_>) {
        ctx.observer.on_gesture(gesture);
        if !gesture.is_multi_pointer() {
            return;
        }
        match gesture.state {
            GestureState::Began | GestureState::Changed => {
                if self.state != InteractionState::Gesturing {
                    self.abort(ctx);
                    self.baseline = GestureBaseline {
                        pinch_zoom: ctx.viewport.zoom(),
                        pan_applied: Vec2::ZERO,
                    };
                    self.set_state(InteractionState::Gesturing, ctx.observer);
                }
                let result = match gesture.kind {
                    GestureKind::Pan => {
                        let step = gesture.delta - self.baseline.pan_applied;
                        self.baseline.pan_applied = gesture.delta;
                        ctx.viewport.pan_by(step)
                    }
                    GestureKind::Pinch => {
                        if gesture.state == GestureState::Began {
                            self.baseline.pinch_zoom = ctx.viewport.zoom();
                        }
                        let scale = gesture.scale.unwrap_or(1.0);
                        ctx.viewport
                            .zoom_at_point(self.baseline.pinch_zoom * scale, gesture.center)
                    }
                    _ => return,
                };
                match result {
                    Ok(()) => ctx.viewport_changed(),
                    Err(err) => log::warn!("Ignoring {:?} gesture: {err}", gesture.kind),
                }
            }
            GestureState::Ended | GestureState::Cancelled => {
                if gesture.kind == GestureKind::Pan {
                    self.baseline.pan_applied = Vec2::ZERO;
                }
            }
            GestureState::Possible => {}
        }
    }

    fn handle_pointer(
        &mut self,
        event: &PointerEvent,
        frame: &InputFrame,
        ctx: &mut InteractionContext<'_>,
    ) {
        match event.phase {
            PointerPhase::Down => self.pointer_down(event, frame, ctx),
            PointerPhase::Move => self.pointer_move(event, frame, ctx),
            PointerPhase::Up => self.pointer_up(event, ctx),
            PointerPhase::Cancel => {
                if self.press.as_ref().is_some_and(|p| p.pointer == event.pointer_id) {
                    self.abort(ctx);
                    self.set_state(InteractionState::Idle, ctx.observer);
                }
            }
        }
    }

    fn pointer_down(
        &mut self,
        event: &PointerEvent,
        frame: &InputFrame,
        ctx: &mut InteractionContext<'_>,
    ) {
        if let Some(press) = &self.press {
            // A second contact turns the press into a potential gesture
            if press.pointer != event.pointer_id {
                log::debug!("Second pointer down, abandoning press");
            }
            self.abort(ctx);
            self.set_state(InteractionState::Idle, ctx.observer);
            return;
        }

        let double_tap = frame
            .gestures
            .iter()
            .any(|g| g.kind == GestureKind::DoubleTap);

        if let Some(editing) = self.editing {
            let on_editing = frame
                .hit
                .as_ref()
                .is_some_and(|h| h.shape_id == editing && !matches!(h.target, HitTarget::Handle(_)));
            if on_editing {
                return;
            }
            self.finish_editing(ctx);
        }

        let middle = event.button == Some(MouseButton::Middle);
        let primary = match event.kind {
            PointerKind::Mouse => event.button == Some(MouseButton::Left),
            PointerKind::Touch | PointerKind::Pen => {
                matches!(event.button, None | Some(MouseButton::Left))
            }
        };
        if !primary && !middle {
            return;
        }

        let intent = if middle || self.tool == Tool::Pan {
            PressIntent::Pan
        } else {
            match &frame.hit {
                Some(hit) if double_tap && hit.kind == ShapeKind::Note && hit.is_handle().is_none() => {
                    self.start_editing(hit.shape_id, ctx);
                    return;
                }
                Some(HitResult {
                    shape_id,
                    target: HitTarget::Handle(handle),
                    ..
                }) => PressIntent::Handle {
                    id: *shape_id,
                    handle: *handle,
                },
                Some(hit) => {
                    let was_selected = ctx.document.selection().contains(&hit.shape_id);
                    if !was_selected && !event.modifiers.toggles_selection() {
                        ctx.change_selection(&[hit.shape_id]);
                    }
                    PressIntent::Shape {
                        id: hit.shape_id,
                        was_selected,
                    }
                }
                None if self.config.marquee_enabled => PressIntent::Marquee,
                None => {
                    if !event.modifiers.toggles_selection() && !ctx.document.selection().is_empty() {
                        ctx.change_selection(&[]);
                    }
                    return;
                }
            }
        };

        let is_marquee = intent == PressIntent::Marquee;
        self.press = Some(Press {
            pointer: event.pointer_id,
            start_screen: event.position,
            start_world: event.world_position,
            last_screen: event.position,
            last_world: event.world_position,
            modifiers: event.modifiers,
            intent,
        });
        self.set_hovered(None, ctx.observer);
        if is_marquee {
            self.set_state(InteractionState::Selecting, ctx.observer);
        }
    }

    fn pointer_move(
        &mut self,
        event: &PointerEvent,
        frame: &InputFrame,
        ctx: &mut InteractionContext<'_>,
    ) {
        let Some(press) = self.press.as_mut() else {
            if matches!(event.kind, PointerKind::Mouse | PointerKind::Pen)
                && self.state != InteractionState::Editing
            {
                let hovered = frame.hit.as_ref().map(|h| h.shape_id);
                self.set_hovered(hovered, ctx.observer);
                let state = if hovered.is_some() {
                    InteractionState::Hovering
                } else {
                    InteractionState::Idle
                };
                self.set_state(state, ctx.observer);
            }
            return;
        };
        if press.pointer != event.pointer_id {
            log::trace!("Ignoring move of {:?} during press", event.pointer_id);
            return;
        }

        let screen_step = event.position - press.last_screen;
        let world_step = event.world_position - press.last_world;
        press.last_screen = event.position;
        press.last_world = event.world_position;

        if self.state == InteractionState::Selecting {
            return;
        }
        if self.drag.is_none() {
            if press.travelled() <= self.config.drag_threshold {
                return;
            }
            self.begin_drag(ctx);
            // The first frame covers everything since the press
            let Some(press) = &self.press else { return };
            let (screen, world) = (
                press.last_screen - press.start_screen,
                press.last_world - press.start_world,
            );
            self.update_drag(screen, world, event.modifiers, ctx);
            return;
        }
        self.update_drag(screen_step, world_step, event.modifiers, ctx);
    }

    fn begin_drag(&mut self, ctx: &mut InteractionContext<'_>) {
        let Some(press) = &self.press else { return };
        let (kind, targets, origin) = match &press.intent {
            PressIntent::Pan => (DragKind::Pan, Vec::new(), None),
            PressIntent::Marquee => return,
            PressIntent::Handle { id, handle } => {
                let origin = ctx.document.shapes().iter().find(|s| s.id() == *id).cloned();
                let kind = if *handle == HandleKind::Rotate {
                    DragKind::Rotate
                } else {
                    DragKind::Resize(*handle)
                };
                (kind, vec![*id], origin)
            }
            PressIntent::Shape { id, was_selected } => {
                let targets = if *was_selected {
                    ctx.ordered_selection()
                } else if press.modifiers.toggles_selection() {
                    let mut ids = ctx.ordered_selection();
                    ids.push(*id);
                    ctx.change_selection(&ids);
                    ids
                } else {
                    vec![*id]
                };
                (DragKind::Move, targets, None)
            }
        };
        self.drag = Some(ActiveDrag {
            descriptor: DragDescriptor {
                kind,
                targets,
                start_world: press.start_world,
                current_world: press.start_world,
                delta: Vec2::ZERO,
            },
            origin,
        });
        self.set_state(InteractionState::Dragging, ctx.observer);
    }

    fn update_drag(
        &mut self,
        screen_step: Vec2,
        world_step: Vec2,
        modifiers: Modifiers,
        ctx: &mut InteractionContext<'_>,
    ) {
        let Some(drag) = self.drag.as_mut() else { return };
        let d = &mut drag.descriptor;
        d.current_world += world_step;
        d.delta = d.current_world - d.start_world;

        match d.kind {
            DragKind::Move => {
                if world_step != Vec2::ZERO && !d.targets.is_empty() {
                    ctx.document.apply_drag(&d.targets, world_step);
                    ctx.observer.on_element_drag(&d.targets, world_step);
                }
            }
            DragKind::Pan => match ctx.viewport.pan_by(screen_step) {
                Ok(()) => ctx.viewport_changed(),
                Err(err) => log::warn!("Ignoring pan step: {err}"),
            },
            DragKind::Resize(handle) => {
                if let Some(Shape::Note(origin)) = &drag.origin {
                    let mut note = origin.clone();
                    apply_resize(&mut note, handle, d.delta, modifiers.shift);
                    ctx.document
                        .apply_transform(note.base.id, note.rect(), note.base.rotation);
                }
            }
            DragKind::Rotate => {
                if let Some(Shape::Note(origin)) = &drag.origin {
                    let angle = rotation_towards(origin.base.center(), d.current_world, modifiers.shift);
                    ctx.document.apply_transform(origin.base.id, origin.rect(), angle);
                }
            }
        }
    }

    fn pointer_up(&mut self, event: &PointerEvent, ctx: &mut InteractionContext<'_>) {
        let Some(press) = self.press.take_if(|p| p.pointer == event.pointer_id) else {
            return;
        };

        if self.drag.take().is_some() {
            self.set_state(InteractionState::Idle, ctx.observer);
            return;
        }

        let toggle = press.modifiers.toggles_selection();
        let clicked = press.travelled() <= self.config.drag_threshold;
        match press.intent {
            PressIntent::Marquee if clicked => {
                if !toggle && !ctx.document.selection().is_empty() {
                    ctx.change_selection(&[]);
                }
            }
            PressIntent::Marquee => {
                let rect = Rect::from_points(press.start_world, press.last_world);
                let options = HitTestOptions::for_zoom(&self.config, ctx.viewport.zoom());
                let hits = hit_test_rectangle(rect, ctx.document.shapes(), &options);
                let ids = if toggle {
                    let mut ids = ctx.ordered_selection();
                    for id in hits {
                        if !ids.contains(&id) {
                            ids.push(id);
                        }
                    }
                    ids
                } else {
                    hits
                };
                ctx.change_selection(&ids);
            }
            PressIntent::Shape { id, was_selected } => {
                let ids = if toggle {
                    let mut ids = ctx.ordered_selection();
                    if was_selected {
                        ids.retain(|s| *s != id);
                    } else {
                        ids.push(id);
                    }
                    Some(ids)
                } else if was_selected {
                    Some(vec![id])
                } else {
                    None
                };
                if let Some(ids) = ids {
                    ctx.change_selection(&ids);
                }
            }
            PressIntent::Handle { .. } | PressIntent::Pan => {}
        }
        self.set_state(InteractionState::Idle, ctx.observer);
    }

    fn handle_wheel(&mut self, event: &WheelEvent, ctx: &mut InteractionContext<'_>) {
        let result = if event.modifiers.command() {
            let factor = self.wheel_zoom_step.powf(-event.delta.y / WHEEL_LINE_HEIGHT);
            ctx.viewport.zoom_by(factor, event.position)
        } else if event.modifiers.shift && event.delta.x == 0.0 {
            ctx.viewport.pan_by(Vec2::new(-event.delta.y, 0.0))
        } else {
            ctx.viewport.pan_by(-event.delta)
        };
        match result {
            Ok(()) => ctx.viewport_changed(),
            Err(err) => log::warn!("Ignoring wheel event: {err}"),
        }
    }

    fn handle_key(&mut self, event: &KeyEvent, ctx: &mut InteractionContext<'_>) {
        if self.state == InteractionState::Editing {
            if matches!(event.key, Key::Escape | Key::Enter) {
                self.finish_editing(ctx);
            }
            return;
        }

        match &event.key {
            Key::Delete | Key::Backspace => {
                if self.press.is_some() {
                    return;
                }
                let ids = ctx.ordered_selection();
                if !ids.is_empty() {
                    log::debug!("Requesting deletion of {} shapes", ids.len());
                    ctx.document.request_delete(&ids);
                }
            }
            Key::Escape => {
                let in_flight = self.press.is_some() || self.state == InteractionState::Gesturing;
                self.abort(ctx);
                if !in_flight && !ctx.document.selection().is_empty() {
                    ctx.change_selection(&[]);
                }
                self.set_state(InteractionState::Idle, ctx.observer);
            }
            Key::Enter => {
                let ids = ctx.ordered_selection();
                if let [id] = ids.as_slice() {
                    let is_note = ctx
                        .document
                        .shapes()
                        .iter()
                        .any(|s| s.id() == *id && s.kind() == ShapeKind::Note);
                    if is_note && self.press.is_none() {
                        self.start_editing(*id, ctx);
                    }
                }
            }
            key if key.is_char('a') && event.modifiers.command() => {
                let ids: Vec<ShapeId> = ctx.document.shapes().iter().map(Shape::id).collect();
                ctx.change_selection(&ids);
            }
            Key::ArrowUp | Key::ArrowDown | Key::ArrowLeft | Key::ArrowRight => {
                if self.press.is_some() {
                    return;
                }
                let step = if event.modifiers.shift {
                    NUDGE_STEP_LARGE
                } else {
                    NUDGE_STEP
                };
                let delta = match event.key {
                    Key::ArrowUp => Vec2::new(0.0, -step),
                    Key::ArrowDown => Vec2::new(0.0, step),
                    Key::ArrowLeft => Vec2::new(-step, 0.0),
                    _ => Vec2::new(step, 0.0),
                };
                let ids = ctx.ordered_selection();
                if !ids.is_empty() {
                    ctx.document.apply_drag(&ids, delta);
                    ctx.observer.on_element_drag(&ids, delta);
                }
            }
            _ => {}
        }
    }

    fn start_editing(&mut self, id: ShapeId, ctx: &mut InteractionContext<'_>) {
        self.abort(ctx);
        if !ctx.document.selection().contains(&id) {
            ctx.change_selection(&[id]);
        }
        self.editing = Some(id);
        ctx.observer.on_element_edit_start(Some(id));
        self.set_state(InteractionState::Editing, ctx.observer);
    }

    fn finish_editing(&mut self, ctx: &mut InteractionContext<'_>) {
        self.abort(ctx);
        if self.editing.take().is_some() {
            ctx.observer.on_element_edit_start(None);
        }
        self.set_state(InteractionState::Idle, ctx.observer);
    }

    /// Cancel any in-flight press or drag, reverting what it applied.
    ///
    /// Moves are undone with the inverse delta; resizes and rotations are
    /// restored to the geometry captured when the drag began. Viewport pans
    /// are kept.
    pub fn abort(&mut self, ctx: &mut InteractionContext<'_>) {
        self.press = None;
        let Some(drag) = self.drag.take() else { return };
        let d = &drag.descriptor;
        log::debug!("Cancelling {:?} drag", d.kind);
        match (d.kind, &drag.origin) {
            (DragKind::Move, _) if d.delta != Vec2::ZERO => {
                ctx.document.apply_drag(&d.targets, -d.delta);
                ctx.observer.on_element_drag(&d.targets, -d.delta);
            }
            (DragKind::Resize(_) | DragKind::Rotate, Some(origin)) => {
                let common = origin.common();
                ctx.document
                    .apply_transform(common.id, common.rect(), common.rotation);
            }
            _ => {}
        }
    }

    /// Hard interrupt: drop every transient state and return to idle.
    pub fn interrupt(&mut self, ctx: &mut InteractionContext<'_>) {
        self.abort(ctx);
        if self.editing.take().is_some() {
            ctx.observer.on_element_edit_start(None);
        }
        self.set_hovered(None, ctx.observer);
        self.baseline = GestureBaseline::default();
        self.set_state(InteractionState::Idle, ctx.observer);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::CanvasDocument;
    use crate::hit_test::hit_test_at_world;
    use crate::input::Instant;
    use crate::shapes::Note;
    use kurbo::Size;

    #[derive(Default)]
    struct Recorder {
        states: Vec<InteractionState>,
        drags: Vec<Vec2>,
        selections: Vec<Vec<ShapeId>>,
        edits: Vec<Option<ShapeId>>,
    }

    impl InteractionObserver for Recorder {
        fn on_element_select(&mut self, ids: &[ShapeId]) {
            self.selections.push(ids.to_vec());
        }
        fn on_element_edit_start(&mut self, id: Option<ShapeId>) {
            self.edits.push(id);
        }
        fn on_element_drag(&mut self, _ids: &[ShapeId], delta: Vec2) {
            self.drags.push(delta);
        }
        fn on_interaction_state_change(&mut self, state: InteractionState) {
            self.states.push(state);
        }
    }

    struct Harness {
        orchestrator: InteractionOrchestrator,
        viewport: Viewport,
        document: CanvasDocument,
        observer: Recorder,
        notes: Vec<ShapeId>,
    }

    impl Harness {
        fn new() -> Self {
            let mut document = CanvasDocument::new();
            let a = document.add_shape(Shape::Note(Note::new(Point::new(0.0, 0.0), Size::new(100.0, 100.0))));
            let b = document.add_shape(Shape::Note(Note::new(Point::new(200.0, 0.0), Size::new(100.0, 100.0))));
            Self {
                orchestrator: InteractionOrchestrator::default(),
                viewport: Viewport::new(Size::new(800.0, 600.0)),
                document,
                observer: Recorder::default(),
                notes: vec![a, b],
            }
        }

        fn pointer(&mut self, phase: PointerPhase, x: f64, y: f64, modifiers: Modifiers) {
            let position = Point::new(x, y);
            let world = self.viewport.screen_to_world(position);
            let options = HitTestOptions::for_zoom(self.orchestrator.config(), self.viewport.zoom());
            let hit = hit_test_at_world(world, self.document.shapes(), &self.document.selection(), &options);
            let event = CanvasEvent::Pointer(PointerEvent {
                phase,
                kind: PointerKind::Mouse,
                pointer_id: PointerId::Mouse,
                position,
                world_position: world,
                button: Some(MouseButton::Left),
                modifiers,
                pressure: None,
                timestamp: Instant::now(),
            });
            let frame = InputFrame {
                hit,
                ..Default::default()
            };
            self.send(&event, &frame);
        }

        fn key(&mut self, key: Key, modifiers: Modifiers) {
            let event = CanvasEvent::Key(KeyEvent {
                key,
                pressed: true,
                modifiers,
                timestamp: Instant::now(),
            });
            self.send(&event, &InputFrame::default());
        }

        fn send(&mut self, event: &CanvasEvent, frame: &InputFrame) {
            let mut ctx = InteractionContext {
                viewport: &mut self.viewport,
                document: &mut self.document,
                observer: &mut self.observer,
            };
            self.orchestrator.handle_event(event, frame, &mut ctx);
        }

        fn click(&mut self, x: f64, y: f64, modifiers: Modifiers) {
            self.pointer(PointerPhase::Down, x, y, modifiers);
            self.pointer(PointerPhase::Up, x, y, modifiers);
        }

        fn selected(&self) -> HashSet<ShapeId> {
            self.document.selection()
        }
    }

    fn shift() -> Modifiers {
        Modifiers {
            shift: true,
            ..Modifiers::NONE
        }
    }

    #[test]
    fn test_click_replaces_selection() {
        let mut h = Harness::new();
        h.click(50.0, 50.0, Modifiers::NONE);
        assert_eq!(h.selected(), HashSet::from([h.notes[0]]));
        h.click(250.0, 50.0, Modifiers::NONE);
        assert_eq!(h.selected(), HashSet::from([h.notes[1]]));
        assert_eq!(h.orchestrator.state(), InteractionState::Idle);
    }

    #[test]
    fn test_modifier_click_toggles() {
        let mut h = Harness::new();
        h.click(50.0, 50.0, Modifiers::NONE);
        h.click(250.0, 50.0, shift());
        assert_eq!(h.selected().len(), 2);
        h.click(50.0, 50.0, shift());
        assert_eq!(h.selected(), HashSet::from([h.notes[1]]));
    }

    #[test]
    fn test_click_empty_clears_selection() {
        let mut h = Harness::new();
        h.click(50.0, 50.0, Modifiers::NONE);
        h.click(500.0, 500.0, Modifiers::NONE);
        assert!(h.selected().is_empty());
    }

    #[test]
    fn test_drag_reports_world_delta() {
        let mut h = Harness::new();
        h.pointer(PointerPhase::Down, 50.0, 50.0, Modifiers::NONE);
        h.pointer(PointerPhase::Move, 90.0, 50.0, Modifiers::NONE);
        assert_eq!(h.orchestrator.state(), InteractionState::Dragging);
        assert_eq!(h.orchestrator.drag().unwrap().delta, Vec2::new(40.0, 0.0));
        h.pointer(PointerPhase::Up, 90.0, 50.0, Modifiers::NONE);

        assert_eq!(h.observer.drags, vec![Vec2::new(40.0, 0.0)]);
        let moved = h.document.shape(h.notes[0]).unwrap();
        assert_eq!(moved.common().position, Point::new(40.0, 0.0));
        assert_eq!(h.orchestrator.state(), InteractionState::Idle);
    }

    #[test]
    fn test_small_motion_is_a_click() {
        let mut h = Harness::new();
        h.pointer(PointerPhase::Down, 50.0, 50.0, Modifiers::NONE);
        h.pointer(PointerPhase::Move, 52.0, 50.0, Modifiers::NONE);
        h.pointer(PointerPhase::Up, 52.0, 50.0, Modifiers::NONE);
        assert!(h.observer.drags.is_empty());
        assert!(!h.observer.states.contains(&InteractionState::Dragging));
    }

    #[test]
    fn test_drag_moves_whole_selection() {
        let mut h = Harness::new();
        h.click(50.0, 50.0, Modifiers::NONE);
        h.click(250.0, 50.0, shift());
        h.pointer(PointerPhase::Down, 50.0, 50.0, Modifiers::NONE);
        h.pointer(PointerPhase::Move, 50.0, 80.0, Modifiers::NONE);
        h.pointer(PointerPhase::Up, 50.0, 80.0, Modifiers::NONE);
        assert_eq!(h.document.shape(h.notes[1]).unwrap().common().position, Point::new(200.0, 30.0));
        assert_eq!(h.selected().len(), 2);
    }

    #[test]
    fn test_escape_reverts_drag() {
        let mut h = Harness::new();
        h.pointer(PointerPhase::Down, 50.0, 50.0, Modifiers::NONE);
        h.pointer(PointerPhase::Move, 80.0, 50.0, Modifiers::NONE);
        h.key(Key::Escape, Modifiers::NONE);
        assert_eq!(h.document.shape(h.notes[0]).unwrap().common().position, Point::ZERO);
        assert_eq!(h.orchestrator.state(), InteractionState::Idle);
        assert!(h.orchestrator.drag().is_none());
    }

    #[test]
    fn test_marquee_selects_overlapping() {
        let mut h = Harness::new();
        h.pointer(PointerPhase::Down, -10.0, -10.0, Modifiers::NONE);
        assert_eq!(h.orchestrator.state(), InteractionState::Selecting);
        h.pointer(PointerPhase::Move, 220.0, 40.0, Modifiers::NONE);
        assert!(h.orchestrator.marquee().is_some());
        h.pointer(PointerPhase::Up, 220.0, 40.0, Modifiers::NONE);
        assert_eq!(h.selected(), HashSet::from([h.notes[0], h.notes[1]]));
        assert_eq!(h.orchestrator.state(), InteractionState::Idle);
    }

    #[test]
    fn test_marquee_with_modifier_unions() {
        let mut h = Harness::new();
        h.click(250.0, 50.0, Modifiers::NONE);
        h.pointer(PointerPhase::Down, -10.0, -10.0, shift());
        h.pointer(PointerPhase::Move, 20.0, 20.0, shift());
        h.pointer(PointerPhase::Up, 20.0, 20.0, shift());
        assert_eq!(h.selected(), HashSet::from([h.notes[0], h.notes[1]]));
    }

    #[test]
    fn test_hover_transitions() {
        let mut h = Harness::new();
        let event = |x: f64| PointerEvent {
            phase: PointerPhase::Move,
            kind: PointerKind::Mouse,
            pointer_id: PointerId::Mouse,
            position: Point::new(x, 50.0),
            world_position: Point::new(x, 50.0),
            button: None,
            modifiers: Modifiers::NONE,
            pressure: None,
            timestamp: Instant::now(),
        };
        let hit = HitResult {
            shape_id: h.notes[0],
            kind: ShapeKind::Note,
            target: HitTarget::Body,
        };
        h.send(
            &CanvasEvent::Pointer(event(50.0)),
            &InputFrame {
                hit: Some(hit),
                ..Default::default()
            },
        );
        assert_eq!(h.orchestrator.state(), InteractionState::Hovering);
        assert_eq!(h.orchestrator.hovered(), Some(h.notes[0]));
        h.send(&CanvasEvent::Pointer(event(500.0)), &InputFrame::default());
        assert_eq!(h.orchestrator.state(), InteractionState::Idle);
        assert_eq!(h.orchestrator.hovered(), None);
    }

    #[test]
    fn test_delete_is_requested() {
        let mut h = Harness::new();
        h.click(50.0, 50.0, Modifiers::NONE);
        h.key(Key::Delete, Modifiers::NONE);
        assert!(h.document.shape(h.notes[0]).is_none());
        assert_eq!(h.document.len(), 1);
    }

    #[test]
    fn test_select_all() {
        let mut h = Harness::new();
        let ctrl = Modifiers {
            ctrl: true,
            ..Modifiers::NONE
        };
        h.key(Key::Character("a".into()), ctrl);
        assert_eq!(h.selected().len(), 2);
        h.key(Key::Escape, Modifiers::NONE);
        assert!(h.selected().is_empty());
    }

    #[test]
    fn test_select_all_includes_locked_and_hidden() {
        let mut h = Harness::new();
        let (locked, hidden) = (h.notes[0], h.notes[1]);
        h.document.shape_mut(locked).unwrap().common_mut().locked = true;
        h.document.shape_mut(hidden).unwrap().common_mut().visible = false;
        let ctrl = Modifiers {
            ctrl: true,
            ..Modifiers::NONE
        };
        h.key(Key::Character("a".into()), ctrl);
        let selected = h.selected();
        assert_eq!(selected.len(), 2);
        assert!(selected.contains(&locked) && selected.contains(&hidden));
        assert_eq!(h.observer.selections.last().map(Vec::len), Some(2));
    }

    #[test]
    fn test_double_tap_enters_editing() {
        let mut h = Harness::new();
        let world = Point::new(50.0, 50.0);
        let down = CanvasEvent::Pointer(PointerEvent {
            phase: PointerPhase::Down,
            kind: PointerKind::Mouse,
            pointer_id: PointerId::Mouse,
            position: world,
            world_position: world,
            button: Some(MouseButton::Left),
            modifiers: Modifiers::NONE,
            pressure: None,
            timestamp: Instant::now(),
        });
        let frame = InputFrame {
            hit: Some(HitResult {
                shape_id: h.notes[0],
                kind: ShapeKind::Note,
                target: HitTarget::Body,
            }),
            gestures: vec![Gesture {
                kind: GestureKind::DoubleTap,
                state: GestureState::Ended,
                center: world,
                delta: Vec2::ZERO,
                scale: None,
                rotation: None,
                pointers: vec![PointerId::Mouse],
            }],
            multi_pointer_active: false,
        };
        h.send(&down, &frame);
        assert_eq!(h.orchestrator.state(), InteractionState::Editing);
        assert_eq!(h.orchestrator.editing(), Some(h.notes[0]));

        h.key(Key::Enter, Modifiers::NONE);
        assert_eq!(h.orchestrator.state(), InteractionState::Idle);
        assert_eq!(h.observer.edits, vec![Some(h.notes[0]), None]);
    }

    #[test]
    fn test_blur_interrupts_drag() {
        let mut h = Harness::new();
        h.pointer(PointerPhase::Down, 50.0, 50.0, Modifiers::NONE);
        h.pointer(PointerPhase::Move, 80.0, 60.0, Modifiers::NONE);
        h.send(
            &CanvasEvent::Blur {
                timestamp: Instant::now(),
            },
            &InputFrame::default(),
        );
        assert_eq!(h.orchestrator.state(), InteractionState::Idle);
        assert_eq!(h.document.shape(h.notes[0]).unwrap().common().position, Point::ZERO);
    }

    #[test]
    fn test_resize_handle_drag() {
        let mut h = Harness::new();
        h.click(50.0, 50.0, Modifiers::NONE);
        // Bottom-right corner of the first note
        h.pointer(PointerPhase::Down, 100.0, 100.0, Modifiers::NONE);
        h.pointer(PointerPhase::Move, 120.0, 130.0, Modifiers::NONE);
        assert_eq!(
            h.orchestrator.drag().unwrap().kind,
            DragKind::Resize(HandleKind::Corner(crate::selection::Corner::BottomRight))
        );
        h.pointer(PointerPhase::Up, 120.0, 130.0, Modifiers::NONE);
        let note = h.document.shape(h.notes[0]).unwrap();
        assert_eq!(note.common().size, Size::new(120.0, 130.0));
    }

    #[test]
    fn test_wheel_zoom_and_pan() {
        let mut h = Harness::new();
        let wheel = |delta: Vec2, modifiers: Modifiers| {
            CanvasEvent::Wheel(WheelEvent {
                position: Point::new(400.0, 300.0),
                world_position: Point::new(400.0, 300.0),
                delta,
                modifiers,
                timestamp: Instant::now(),
            })
        };
        let ctrl = Modifiers {
            ctrl: true,
            ..Modifiers::NONE
        };
        h.send(&wheel(Vec2::new(0.0, -WHEEL_LINE_HEIGHT), ctrl), &InputFrame::default());
        assert!((h.viewport.zoom() - 1.1).abs() < 1e-9);
        assert_eq!(h.document.viewport_patch().zoom, Some(h.viewport.zoom()));

        let before = h.viewport.offset();
        h.send(&wheel(Vec2::new(0.0, 30.0), Modifiers::NONE), &InputFrame::default());
        assert_eq!(h.viewport.offset(), before - Vec2::new(0.0, 30.0));
    }

    #[test]
    fn test_pan_tool_drags_viewport() {
        let mut h = Harness::new();
        h.orchestrator.set_tool(Tool::Pan);
        h.pointer(PointerPhase::Down, 50.0, 50.0, Modifiers::NONE);
        h.pointer(PointerPhase::Move, 100.0, 70.0, Modifiers::NONE);
        h.pointer(PointerPhase::Up, 100.0, 70.0, Modifiers::NONE);
        assert_eq!(h.viewport.offset(), Vec2::new(50.0, 20.0));
        assert_eq!(h.document.shape(h.notes[0]).unwrap().common().position, Point::ZERO);
    }

    #[test]
    fn test_multi_pointer_gesture_zooms() {
        let mut h = Harness::new();
        let pinch = |state, scale| Gesture {
            kind: GestureKind::Pinch,
            state,
            center: Point::new(400.0, 300.0),
            delta: Vec2::ZERO,
            scale: Some(scale),
            rotation: None,
            pointers: vec![PointerId::Touch(1), PointerId::Touch(2)],
        };
        let mut vp = h.viewport.clone();
        let mut ctx = InteractionContext {
            viewport: &mut vp,
            document: &mut h.document,
            observer: &mut h.observer,
        };
        h.orchestrator.handle_gesture(&pinch(GestureState::Began, 1.2), &mut ctx);
        h.orchestrator.handle_gesture(&pinch(GestureState::Changed, 1.5), &mut ctx);
        assert_eq!(h.orchestrator.state(), InteractionState::Gesturing);
        assert!((vp.zoom() - 1.5).abs() < 1e-9);
    }
}
