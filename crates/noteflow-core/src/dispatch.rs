//! Event dispatch: throttling, debouncing and a typed handler registry.
//!
//! [`EventDispatcher`] sits between the normalizer and the interaction
//! pipeline:
//!
//! - [`ingest`](EventDispatcher::ingest) normalizes a raw event and applies
//!   the pointer-move throttle (coalesced to the latest value per pointer)
//!   and the resize debounce, returning the events ready to process now.
//! - [`poll`](EventDispatcher::poll) releases throttled moves and debounced
//!   resizes whose deadlines have passed.
//! - [`dispatch`](EventDispatcher::dispatch) runs the registered handlers for
//!   an event, highest priority first.
//!
//! # Propagation
//!
//! A handler returning [`Propagation::Prevent`] marks the event prevented.
//! Lower-priority handlers still run unless the preventing handler was
//! registered with `capture`. Passive handlers cannot prevent. A handler
//! error is logged and does not abort the pass.

use crate::error::{CanvasError, CanvasResult};
use crate::input::{
    CanvasEvent, EventNormalizer, Instant, KeyEvent, PointerEvent, PointerId, PointerPhase,
    RawInputEvent, ResizeEvent, WheelEvent,
};
use crate::timer::Timer;
use crate::viewport::Viewport;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::time::Duration;

/// Throttle and debounce intervals.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DispatchConfig {
    /// Minimum spacing of delivered pointer moves per pointer (0 disables).
    pub pointer_move_throttle_ms: u64,
    /// Quiet period after the last resize before it is delivered (0 disables).
    pub resize_debounce_ms: u64,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            pointer_move_throttle_ms: 16,
            resize_debounce_ms: 100,
        }
    }
}

/// Canonical event types handlers register for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum EventKind {
    PointerDown,
    PointerMove,
    PointerUp,
    PointerCancel,
    Wheel,
    KeyDown,
    KeyUp,
    Resize,
    Blur,
}

impl EventKind {
    pub fn of_pointer(phase: PointerPhase) -> Self {
        match phase {
            PointerPhase::Down => EventKind::PointerDown,
            PointerPhase::Move => EventKind::PointerMove,
            PointerPhase::Up => EventKind::PointerUp,
            PointerPhase::Cancel => EventKind::PointerCancel,
        }
    }

    fn is_pointer(&self) -> bool {
        matches!(
            self,
            EventKind::PointerDown
                | EventKind::PointerMove
                | EventKind::PointerUp
                | EventKind::PointerCancel
        )
    }
}

impl CanvasEvent {
    pub fn kind(&self) -> EventKind {
        match self {
            CanvasEvent::Pointer(e) => EventKind::of_pointer(e.phase),
            CanvasEvent::Wheel(_) => EventKind::Wheel,
            CanvasEvent::Key(e) if e.pressed => EventKind::KeyDown,
            CanvasEvent::Key(_) => EventKind::KeyUp,
            CanvasEvent::Resize(_) => EventKind::Resize,
            CanvasEvent::Blur { .. } => EventKind::Blur,
        }
    }
}

/// Handler verdict.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Propagation {
    #[default]
    Continue,
    Prevent,
}

pub type HandlerResult = Result<Propagation, CanvasError>;

type PointerFn = Box<dyn FnMut(&PointerEvent) -> HandlerResult>;
type WheelFn = Box<dyn FnMut(&WheelEvent) -> HandlerResult>;
type KeyFn = Box<dyn FnMut(&KeyEvent) -> HandlerResult>;
type ResizeFn = Box<dyn FnMut(&ResizeEvent) -> HandlerResult>;
type BlurFn = Box<dyn FnMut() -> HandlerResult>;

/// A handler with a signature fixed by the event family it serves.
pub enum Handler {
    Pointer(PointerFn),
    Wheel(WheelFn),
    Key(KeyFn),
    Resize(ResizeFn),
    Blur(BlurFn),
}

impl Handler {
    pub fn pointer(f: impl FnMut(&PointerEvent) -> HandlerResult + 'static) -> Self {
        Handler::Pointer(Box::new(f))
    }

    pub fn wheel(f: impl FnMut(&WheelEvent) -> HandlerResult + 'static) -> Self {
        Handler::Wheel(Box::new(f))
    }

    pub fn key(f: impl FnMut(&KeyEvent) -> HandlerResult + 'static) -> Self {
        Handler::Key(Box::new(f))
    }

    pub fn resize(f: impl FnMut(&ResizeEvent) -> HandlerResult + 'static) -> Self {
        Handler::Resize(Box::new(f))
    }

    pub fn blur(f: impl FnMut() -> HandlerResult + 'static) -> Self {
        Handler::Blur(Box::new(f))
    }

    fn accepts(&self, kind: EventKind) -> bool {
        match self {
            Handler::Pointer(_) => kind.is_pointer(),
            Handler::Wheel(_) => kind == EventKind::Wheel,
            Handler::Key(_) => matches!(kind, EventKind::KeyDown | EventKind::KeyUp),
            Handler::Resize(_) => kind == EventKind::Resize,
            Handler::Blur(_) => kind == EventKind::Blur,
        }
    }

    fn call(&mut self, event: &CanvasEvent) -> HandlerResult {
        match (self, event) {
            (Handler::Pointer(f), CanvasEvent::Pointer(e)) => f(e),
            (Handler::Wheel(f), CanvasEvent::Wheel(e)) => f(e),
            (Handler::Key(f), CanvasEvent::Key(e)) => f(e),
            (Handler::Resize(f), CanvasEvent::Resize(e)) => f(e),
            (Handler::Blur(f), CanvasEvent::Blur { .. }) => f(),
            _ => Ok(Propagation::Continue),
        }
    }
}

impl std::fmt::Debug for Handler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let family = match self {
            Handler::Pointer(_) => "Pointer",
            Handler::Wheel(_) => "Wheel",
            Handler::Key(_) => "Key",
            Handler::Resize(_) => "Resize",
            Handler::Blur(_) => "Blur",
        };
        write!(f, "Handler::{family}")
    }
}

/// Stable handler identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct HandlerId(pub u64);

/// Registration options.
#[derive(Default)]
pub struct HandlerOptions {
    /// Explicit id; registration fails if it is already taken.
    pub id: Option<HandlerId>,
    /// Higher runs first. Equal priorities run in registration order.
    pub priority: i32,
    /// Skip the handler when this returns false.
    pub condition: Option<Box<dyn Fn(&CanvasEvent) -> bool>>,
    /// A prevent from this handler also stops lower-priority handlers.
    pub capture: bool,
    /// Unregister after the first invocation.
    pub once: bool,
    /// The handler observes only; its prevent is ignored.
    pub passive: bool,
}

impl HandlerOptions {
    pub fn with_priority(priority: i32) -> Self {
        Self {
            priority,
            ..Default::default()
        }
    }

    pub fn id(mut self, id: HandlerId) -> Self {
        self.id = Some(id);
        self
    }

    pub fn when(mut self, condition: impl Fn(&CanvasEvent) -> bool + 'static) -> Self {
        self.condition = Some(Box::new(condition));
        self
    }

    pub fn capture(mut self) -> Self {
        self.capture = true;
        self
    }

    pub fn once(mut self) -> Self {
        self.once = true;
        self
    }

    pub fn passive(mut self) -> Self {
        self.passive = true;
        self
    }
}

struct Registration {
    handler: Handler,
    options: HandlerOptions,
    seq: u64,
}

#[derive(Default)]
struct Bucket {
    entries: HashMap<HandlerId, Registration>,
    order: Vec<HandlerId>,
    dirty: bool,
}

impl Bucket {
    fn ordered(&mut self) -> Vec<HandlerId> {
        if self.dirty {
            let entries = &self.entries;
            let mut order: Vec<HandlerId> = entries.keys().copied().collect();
            order.sort_by_key(|id| {
                let r = &entries[id];
                (std::cmp::Reverse(r.options.priority), r.seq)
            });
            self.order = order;
            self.dirty = false;
        }
        self.order.clone()
    }
}

/// Result of one dispatch pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DispatchOutcome {
    /// Some non-passive handler returned [`Propagation::Prevent`].
    pub prevented: bool,
    /// A capture handler prevented, so later handlers were skipped.
    pub stopped: bool,
    /// Number of handlers invoked.
    pub invoked: usize,
    /// Number of handlers that returned an error.
    pub failed: usize,
}

/// Routes canonical events to registered handlers and shapes the event rate.
pub struct EventDispatcher {
    config: DispatchConfig,
    normalizer: EventNormalizer,
    buckets: HashMap<EventKind, Bucket>,
    index: HashMap<HandlerId, EventKind>,
    next_id: u64,
    next_seq: u64,
    /// Last delivered move per pointer.
    last_move: HashMap<PointerId, Instant>,
    /// Coalesced moves waiting for their throttle window to end.
    throttled: BTreeMap<PointerId, Timer<PointerEvent>>,
    debounced_resize: Timer<ResizeEvent>,
}

impl std::fmt::Debug for EventDispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventDispatcher")
            .field("handlers", &self.index.len())
            .field("buckets", &self.buckets.len())
            .field("throttled", &self.throttled.len())
            .field("resize_pending", &self.debounced_resize.is_armed())
            .finish()
    }
}

impl EventDispatcher {
    pub fn new(config: DispatchConfig, normalizer: EventNormalizer) -> Self {
        Self {
            config,
            normalizer,
            buckets: HashMap::new(),
            index: HashMap::new(),
            next_id: 1,
            next_seq: 0,
            last_move: HashMap::new(),
            throttled: BTreeMap::new(),
            debounced_resize: Timer::new(),
        }
    }

    pub fn config(&self) -> &DispatchConfig {
        &self.config
    }

    pub fn normalizer(&self) -> &EventNormalizer {
        &self.normalizer
    }

    pub fn normalizer_mut(&mut self) -> &mut EventNormalizer {
        &mut self.normalizer
    }

    fn throttle_interval(&self) -> Duration {
        Duration::from_millis(self.config.pointer_move_throttle_ms)
    }

    fn debounce_interval(&self) -> Duration {
        Duration::from_millis(self.config.resize_debounce_ms)
    }

    // -----------------------------------------------------------------------
    // Registry
    // -----------------------------------------------------------------------

    /// Register `handler` for `kind`.
    ///
    /// Fails with [`CanvasError::HandlerRegistrationConflict`] when the
    /// explicit id is taken, or when the handler's signature cannot receive
    /// events of `kind`.
    pub fn register(
        &mut self,
        kind: EventKind,
        handler: Handler,
        options: HandlerOptions,
    ) -> CanvasResult<HandlerId> {
        let id = match options.id {
            Some(id) => id,
            None => {
                while self.index.contains_key(&HandlerId(self.next_id)) {
                    self.next_id += 1;
                }
                HandlerId(self.next_id)
            }
        };
        if self.index.contains_key(&id) {
            return Err(CanvasError::HandlerRegistrationConflict(id.0));
        }
        if !handler.accepts(kind) {
            log::warn!("{handler:?} cannot receive {kind:?} events");
            return Err(CanvasError::HandlerRegistrationConflict(id.0));
        }
        if options.id.is_none() {
            self.next_id += 1;
        }

        let seq = self.next_seq;
        self.next_seq += 1;
        let bucket = self.buckets.entry(kind).or_default();
        bucket.entries.insert(
            id,
            Registration {
                handler,
                options,
                seq,
            },
        );
        bucket.dirty = true;
        self.index.insert(id, kind);
        log::debug!("Registered handler {} for {kind:?}", id.0);
        Ok(id)
    }

    /// Remove a handler. Returns false if the id was unknown.
    pub fn unregister(&mut self, id: HandlerId) -> bool {
        let Some(kind) = self.index.remove(&id) else {
            return false;
        };
        if let Some(bucket) = self.buckets.get_mut(&kind) {
            bucket.entries.remove(&id);
            bucket.dirty = true;
            if bucket.entries.is_empty() {
                self.buckets.remove(&kind);
            }
        }
        true
    }

    pub fn handler_count(&self, kind: EventKind) -> usize {
        self.buckets.get(&kind).map_or(0, |b| b.entries.len())
    }

    /// Whether a bucket is allocated for `kind`.
    pub fn has_bucket(&self, kind: EventKind) -> bool {
        self.buckets.contains_key(&kind)
    }

    /// Run the handlers registered for the event's kind.
    pub fn dispatch(&mut self, event: &CanvasEvent) -> DispatchOutcome {
        let kind = event.kind();
        let mut outcome = DispatchOutcome::default();
        let Some(bucket) = self.buckets.get_mut(&kind) else {
            return outcome;
        };

        let mut finished = Vec::new();
        for id in bucket.ordered() {
            let Some(reg) = bucket.entries.get_mut(&id) else {
                continue;
            };
            if let Some(condition) = &reg.options.condition {
                if !condition(event) {
                    continue;
                }
            }
            outcome.invoked += 1;
            if reg.options.once {
                finished.push(id);
            }
            match reg.handler.call(event) {
                Ok(Propagation::Prevent) if reg.options.passive => {
                    log::debug!("Passive handler {} tried to prevent {kind:?}", id.0);
                }
                Ok(Propagation::Prevent) => {
                    outcome.prevented = true;
                    if reg.options.capture {
                        outcome.stopped = true;
                        break;
                    }
                }
                Ok(Propagation::Continue) => {}
                Err(e) => {
                    outcome.failed += 1;
                    log::warn!("Handler {} failed on {kind:?}: {e}", id.0);
                }
            }
        }

        for id in finished {
            self.unregister(id);
        }
        outcome
    }

    // -----------------------------------------------------------------------
    // Rate shaping
    // -----------------------------------------------------------------------

    /// Normalize a raw event and return the canonical events ready now.
    ///
    /// Pointer moves inside a pointer's throttle window are held back and
    /// coalesced; any other event for that pointer flushes the held move
    /// first so ordering is preserved. Resizes are held until the debounce
    /// period passes without another resize. Blur drops everything pending.
    pub fn ingest(
        &mut self,
        raw: &RawInputEvent,
        viewport: &Viewport,
        now: Instant,
    ) -> CanvasResult<Vec<CanvasEvent>> {
        let events = self.normalizer.normalize(raw, viewport)?;
        let mut ready = Vec::with_capacity(events.len());
        for event in events {
            self.shape(event, viewport, now, &mut ready);
        }
        Ok(ready)
    }

    fn shape(
        &mut self,
        event: CanvasEvent,
        viewport: &Viewport,
        now: Instant,
        ready: &mut Vec<CanvasEvent>,
    ) {
        match event {
            CanvasEvent::Pointer(e) if e.phase == PointerPhase::Move => {
                let interval = self.throttle_interval();
                let within_window = self
                    .last_move
                    .get(&e.pointer_id)
                    .is_some_and(|last| now.saturating_duration_since(*last) < interval);
                if within_window {
                    let deadline = self.last_move[&e.pointer_id] + interval;
                    log::trace!("Coalescing move of {:?}", e.pointer_id);
                    self.throttled
                        .entry(e.pointer_id)
                        .or_default()
                        .coalesce(deadline, e);
                } else {
                    // A fresh move supersedes any held one
                    self.throttled.remove(&e.pointer_id);
                    self.last_move.insert(e.pointer_id, now);
                    ready.push(CanvasEvent::Pointer(e));
                }
            }
            CanvasEvent::Pointer(e) => {
                if let Some(held) = self.throttled.remove(&e.pointer_id).and_then(|mut t| t.cancel())
                {
                    ready.push(CanvasEvent::Pointer(refresh(held, viewport)));
                }
                if matches!(e.phase, PointerPhase::Up | PointerPhase::Cancel) {
                    self.last_move.remove(&e.pointer_id);
                }
                ready.push(CanvasEvent::Pointer(e));
            }
            CanvasEvent::Resize(e) if self.config.resize_debounce_ms > 0 => {
                let deadline = now + self.debounce_interval();
                self.debounced_resize.arm(deadline, e);
            }
            CanvasEvent::Blur { .. } => {
                self.cancel_pending();
                ready.push(event);
            }
            other => ready.push(other),
        }
    }

    /// Release throttled moves and the debounced resize that are due.
    ///
    /// Held moves get their world position recomputed against `viewport`.
    pub fn poll(&mut self, viewport: &Viewport, now: Instant) -> Vec<CanvasEvent> {
        let mut ready = Vec::new();
        let mut drained = Vec::new();
        for (id, timer) in self.throttled.iter_mut() {
            if let Some(e) = timer.fire(now) {
                ready.push(CanvasEvent::Pointer(refresh(e, viewport)));
                drained.push(*id);
            }
        }
        for id in drained {
            self.throttled.remove(&id);
            self.last_move.insert(id, now);
        }
        if let Some(resize) = self.debounced_resize.fire(now) {
            ready.push(CanvasEvent::Resize(resize));
        }
        ready
    }

    /// Earliest deadline among pending throttle and debounce timers.
    pub fn next_deadline(&self) -> Option<Instant> {
        self.throttled
            .values()
            .filter_map(Timer::deadline)
            .chain(self.debounced_resize.deadline())
            .min()
    }

    /// Drop every held move and resize.
    pub fn cancel_pending(&mut self) {
        if !self.throttled.is_empty() || self.debounced_resize.is_armed() {
            log::debug!("Cancelling pending dispatcher timers");
        }
        self.throttled.clear();
        self.last_move.clear();
        self.debounced_resize.cancel();
    }
}

/// Recompute the world position of a held pointer event.
fn refresh(mut event: PointerEvent, viewport: &Viewport) -> PointerEvent {
    event.world_position = viewport.screen_to_world(event.position);
    event
}
