//! The canvas core facade.
//!
//! [`CanvasCore`] owns the viewport and wires the input pipeline together:
//! raw event → normalizer and rate shaping ([`EventDispatcher`]) → registered
//! handlers → hit test and gesture recognition → [`InteractionOrchestrator`].
//! Hosts call [`handle_raw_event`](CanvasCore::handle_raw_event) from their
//! event loop and [`tick`](CanvasCore::tick) once per display frame.

use crate::config::CanvasConfig;
use crate::dispatch::{EventDispatcher, EventKind};
use crate::error::CanvasResult;
use crate::gesture::{Gesture, GestureRecognizer};
use crate::hit_test::{HitTestOptions, hit_test_at_world};
use crate::input::{
    CanvasEvent, EventNormalizer, Instant, Key, PointerEvent, PointerPhase, RawInputEvent,
};
use crate::interaction::{
    DocumentHost, InputFrame, InteractionContext, InteractionObserver, InteractionOrchestrator,
    InteractionState, Tool,
};
use crate::viewport::{AnimationStatus, Easing, Viewport, ViewportAnimation};
use kurbo::{Rect, Size};
use std::time::Duration;

/// Input pipeline and viewport state of one canvas surface.
#[derive(Debug)]
pub struct CanvasCore {
    config: CanvasConfig,
    viewport: Viewport,
    dispatcher: EventDispatcher,
    gestures: GestureRecognizer,
    interaction: InteractionOrchestrator,
    animation: Option<ViewportAnimation>,
}

impl CanvasCore {
    /// Create a core for a surface of `size` logical pixels at scale factor 1.
    pub fn new(config: CanvasConfig, size: Size) -> CanvasResult<Self> {
        config.validate()?;
        let viewport = Viewport::from_config(&config.viewport, size)?;
        let normalizer = EventNormalizer::new(Rect::from_origin_size((0.0, 0.0), size), 1.0)?;
        Ok(Self {
            dispatcher: EventDispatcher::new(config.dispatch.clone(), normalizer),
            gestures: GestureRecognizer::new(config.gesture.clone()),
            interaction: InteractionOrchestrator::new(
                config.interaction.clone(),
                config.viewport.wheel_zoom_step,
            ),
            viewport,
            animation: None,
            config,
        })
    }

    pub fn config(&self) -> &CanvasConfig {
        &self.config
    }

    pub fn viewport(&self) -> &Viewport {
        &self.viewport
    }

    /// Direct viewport access for programmatic navigation.
    ///
    /// Changes made here are not reported to the document.
    pub fn viewport_mut(&mut self) -> &mut Viewport {
        &mut self.viewport
    }

    /// The handler registry.
    pub fn dispatcher(&self) -> &EventDispatcher {
        &self.dispatcher
    }

    pub fn dispatcher_mut(&mut self) -> &mut EventDispatcher {
        &mut self.dispatcher
    }

    pub fn gestures(&self) -> &GestureRecognizer {
        &self.gestures
    }

    pub fn interaction(&self) -> &InteractionOrchestrator {
        &self.interaction
    }

    pub fn state(&self) -> InteractionState {
        self.interaction.state()
    }

    pub fn set_tool(&mut self, tool: Tool) {
        self.interaction.set_tool(tool);
    }

    pub fn is_animating(&self) -> bool {
        self.animation.is_some()
    }

    /// Feed one raw platform event through the pipeline.
    ///
    /// Fails only when the raw event itself is malformed; nothing is changed
    /// in that case.
    pub fn handle_raw_event(
        &mut self,
        raw: &RawInputEvent,
        now: Instant,
        document: &mut dyn DocumentHost,
        observer: &mut dyn InteractionObserver,
    ) -> CanvasResult<()> {
        let events = self.dispatcher.ingest(raw, &self.viewport, now)?;
        for event in events {
            self.process(&event, document, observer);
        }
        Ok(())
    }

    /// Advance timers and animations.
    ///
    /// Releases throttled and debounced events, fires a due long press and
    /// steps the viewport animation. Returns true while another frame is
    /// needed for the animation.
    pub fn tick(
        &mut self,
        now: Instant,
        document: &mut dyn DocumentHost,
        observer: &mut dyn InteractionObserver,
    ) -> bool {
        for event in self.dispatcher.poll(&self.viewport, now) {
            self.process(&event, document, observer);
        }

        if let Some(gesture) = self.gestures.poll(now) {
            let mut ctx = InteractionContext {
                viewport: &mut self.viewport,
                document: &mut *document,
                observer: &mut *observer,
            };
            self.interaction.handle_gesture(&gesture, &mut ctx);
        }

        let Some(animation) = &self.animation else {
            return false;
        };
        let status = animation.step(&mut self.viewport, now);
        document.apply_viewport(&self.viewport.to_patch());
        observer.on_viewport_change(&self.viewport);
        match status {
            Ok(AnimationStatus::Running) => true,
            Ok(AnimationStatus::Finished) => {
                self.animation = None;
                false
            }
            Err(e) => {
                log::warn!("Stopping viewport animation: {e}");
                self.animation = None;
                false
            }
        }
    }

    /// Earliest pending timer deadline, for hosts that sleep between events.
    pub fn next_deadline(&self) -> Option<Instant> {
        [self.dispatcher.next_deadline(), self.gestures.next_deadline()]
            .into_iter()
            .flatten()
            .min()
    }

    /// Animate the viewport so `bounds` fits with `padding` screen pixels.
    pub fn animate_to_fit(
        &mut self,
        bounds: Rect,
        padding: f64,
        now: Instant,
        duration: Duration,
    ) -> CanvasResult<()> {
        let target = self.viewport.fitted(bounds, padding)?;
        self.animate_to(&target, now, duration, Easing::EaseInOut)
    }

    /// Animate the viewport towards `target`'s zoom and offset.
    pub fn animate_to(
        &mut self,
        target: &Viewport,
        now: Instant,
        duration: Duration,
        easing: Easing,
    ) -> CanvasResult<()> {
        self.animation = Some(ViewportAnimation::new(
            &self.viewport,
            target,
            now,
            duration,
            easing,
        )?);
        Ok(())
    }

    pub fn cancel_animation(&mut self) {
        self.animation = None;
    }

    fn process(
        &mut self,
        event: &CanvasEvent,
        document: &mut dyn DocumentHost,
        observer: &mut dyn InteractionObserver,
    ) {
        let outcome = self.dispatcher.dispatch(event);
        if outcome.prevented {
            log::trace!("{:?} prevented by a handler", event.kind());
            let released = event
                .as_pointer()
                .filter(|p| matches!(p.phase, PointerPhase::Up | PointerPhase::Cancel));
            if let Some(pointer) = released {
                self.release_prevented(pointer, document, observer);
            }
            return;
        }

        let mut frame = InputFrame::default();
        match event {
            CanvasEvent::Pointer(p) => {
                if event.kind() == EventKind::PointerDown {
                    self.animation = None;
                }
                frame.gestures = self.gestures.process(p);
                frame.multi_pointer_active = self.gestures.is_multi_pointer_active();
                let options =
                    HitTestOptions::for_zoom(&self.config.interaction, self.viewport.zoom());
                frame.hit = hit_test_at_world(
                    p.world_position,
                    document.shapes(),
                    &document.selection(),
                    &options,
                );
            }
            CanvasEvent::Wheel(_) => self.animation = None,
            CanvasEvent::Key(k) if k.pressed && k.key == Key::Escape => {
                frame.gestures = self.gestures.cancel_all();
            }
            CanvasEvent::Blur { .. } => {
                let cancelled: Vec<Gesture> = self.gestures.cancel_all();
                log::debug!("Blur cancelled {} gestures", cancelled.len());
                self.animation = None;
            }
            _ => {}
        }

        let mut ctx = InteractionContext {
            viewport: &mut self.viewport,
            document,
            observer,
        };
        if !matches!(event, CanvasEvent::Pointer(_)) {
            for gesture in &frame.gestures {
                ctx.observer.on_gesture(gesture);
            }
        }
        self.interaction.handle_event(event, &frame, &mut ctx);
    }

    /// A blocked release still ends the contact. It is replayed as a cancel
    /// so the recognizer forgets the pointer and its long-press timer, and
    /// the orchestrator drops the press without clicking.
    fn release_prevented(
        &mut self,
        pointer: &PointerEvent,
        document: &mut dyn DocumentHost,
        observer: &mut dyn InteractionObserver,
    ) {
        let cancel = PointerEvent {
            phase: PointerPhase::Cancel,
            ..pointer.clone()
        };
        let frame = InputFrame {
            gestures: self.gestures.process(&cancel),
            multi_pointer_active: self.gestures.is_multi_pointer_active(),
            ..InputFrame::default()
        };
        let mut ctx = InteractionContext {
            viewport: &mut self.viewport,
            document,
            observer,
        };
        self.interaction
            .handle_event(&CanvasEvent::Pointer(cancel), &frame, &mut ctx);
    }
}
