//! Gesture recognition over concurrently tracked pointers.
//!
//! [`GestureRecognizer`] consumes canonical pointer events (screen space) and
//! emits [`Gesture`]s with begin/change/end semantics.
//!
//! # Recognized gestures
//!
//! - **Tap / DoubleTap**: a pointer-down within the double-tap window and
//!   distance of the previous one emits `DoubleTap`; otherwise it is recorded
//!   for the next comparison. A release that never moved past the long-press
//!   slop and produced no other gesture emits `Tap`.
//! - **LongPress**: armed on a single pointer-down, fired by [`poll`]
//!   once the deadline passes while the pointer has stayed within the slop.
//! - **Pan**: one pointer past the pan threshold (delta from its start), or
//!   two pointers whose center moved past it (delta from the initial center).
//! - **Pinch / Rotate**: two pointers; reported once the scale or angle
//!   change exceeds its threshold. Both can be active at once.
//!
//! # Invariants
//!
//! 1. At most one active gesture per [`GestureKind`]; updates to an active
//!    gesture are `Changed` events for the same instance.
//! 2. Removing a pointer ends every active gesture that includes it.
//! 3. After [`reset`](GestureRecognizer::reset) or
//!    [`cancel_all`](GestureRecognizer::cancel_all) no pointer, gesture or
//!    timer survives.
//!
//! [`poll`]: GestureRecognizer::poll

use crate::error::{CanvasError, CanvasResult};
use crate::input::{Instant, PointerEvent, PointerId, PointerPhase};
use crate::timer::Timer;
use kurbo::{Point, Vec2};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::f64::consts::{PI, TAU};
use std::time::Duration;

/// Thresholds and timeouts for gesture recognition.
///
/// Distances are in logical screen pixels, angles in radians.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GestureConfig {
    /// Time window for double-tap detection (default: 300ms).
    pub double_tap_ms: u64,
    /// Max distance between the two taps of a double-tap (default: 10px).
    pub double_tap_distance: f64,
    /// Hold duration before a long press fires (default: 500ms).
    pub long_press_ms: u64,
    /// Movement tolerated during a long press or tap (default: 8px).
    pub long_press_slop: f64,
    /// Distance before a pan begins (default: 8px).
    pub pan_threshold: f64,
    /// Minimum `|scale - 1|` before a pinch is reported (default: 0.02).
    pub pinch_threshold: f64,
    /// Minimum angle change before a rotation is reported (default: ~3 degrees).
    pub rotation_threshold: f64,
}

impl Default for GestureConfig {
    fn default() -> Self {
        Self {
            double_tap_ms: 300,
            double_tap_distance: 10.0,
            long_press_ms: 500,
            long_press_slop: 8.0,
            pan_threshold: 8.0,
            pinch_threshold: 0.02,
            rotation_threshold: 0.05,
        }
    }
}

impl GestureConfig {
    pub fn double_tap_window(&self) -> Duration {
        Duration::from_millis(self.double_tap_ms)
    }

    pub fn long_press_duration(&self) -> Duration {
        Duration::from_millis(self.long_press_ms)
    }
}

/// Gesture type. Also the identity of an active gesture.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum GestureKind {
    Tap,
    DoubleTap,
    LongPress,
    Pan,
    Pinch,
    Rotate,
}

/// Lifecycle state of a gesture.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GestureState {
    Possible,
    Began,
    Changed,
    Ended,
    Cancelled,
}

impl GestureState {
    pub fn is_active(&self) -> bool {
        matches!(self, GestureState::Began | GestureState::Changed)
    }
}

/// A recognized gesture. Emitted, never stored by consumers.
#[derive(Debug, Clone, PartialEq)]
pub struct Gesture {
    pub kind: GestureKind,
    pub state: GestureState,
    /// Screen-space center of the participating pointers.
    pub center: Point,
    /// Cumulative translation since the gesture's baseline.
    pub delta: Vec2,
    /// Distance ratio against the baseline (pinch only).
    pub scale: Option<f64>,
    /// Angle change against the baseline in radians (rotate only).
    pub rotation: Option<f64>,
    pub pointers: Vec<PointerId>,
}

impl Gesture {
    /// A gesture that begins and ends in the same event.
    fn discrete(kind: GestureKind, center: Point, pointer: PointerId) -> Self {
        Self {
            kind,
            state: GestureState::Ended,
            center,
            delta: Vec2::ZERO,
            scale: None,
            rotation: None,
            pointers: vec![pointer],
        }
    }

    pub fn is_multi_pointer(&self) -> bool {
        self.pointers.len() >= 2
    }
}

/// State of one active contact.
#[derive(Debug, Clone, PartialEq)]
pub struct TrackedPointer {
    pub id: PointerId,
    pub start: Point,
    pub start_time: Instant,
    pub position: Point,
    pub last_time: Instant,
    /// Instantaneous velocity in px/s.
    pub velocity: Vec2,
    /// Path length travelled since `start`.
    pub travel: f64,
}

impl TrackedPointer {
    fn new(id: PointerId, position: Point, now: Instant) -> Self {
        Self {
            id,
            start: position,
            start_time: now,
            position,
            last_time: now,
            velocity: Vec2::ZERO,
            travel: 0.0,
        }
    }

    /// Straight-line distance from the start position.
    pub fn displacement(&self) -> f64 {
        (self.position - self.start).hypot()
    }

    fn update(&mut self, position: Point, now: Instant) {
        let step = position - self.position;
        let dt = now.saturating_duration_since(self.last_time).as_secs_f64();
        if dt > 0.0 {
            self.velocity = step / dt;
        }
        self.travel += step.hypot();
        self.position = position;
        self.last_time = now;
    }

    fn rebase(&mut self, now: Instant) {
        self.start = self.position;
        self.start_time = now;
        self.travel = 0.0;
    }
}

/// Geometry of the two-pointer set captured when it formed.
#[derive(Debug, Clone, Copy)]
struct TwoPointerBaseline {
    ids: [PointerId; 2],
    distance: f64,
    angle: f64,
    center: Point,
}

/// Wrap an angle into `(-PI, PI]`.
fn normalize_angle(angle: f64) -> f64 {
    let a = angle.rem_euclid(TAU);
    if a > PI { a - TAU } else { a }
}

/// Stateful multi-pointer gesture recognizer.
///
/// Feed pointer events through [`process`](GestureRecognizer::process) (or
/// the individual `pointer_*` methods) and call
/// [`poll`](GestureRecognizer::poll) from the frame tick for long presses.
#[derive(Debug, Clone)]
pub struct GestureRecognizer {
    config: GestureConfig,
    pointers: BTreeMap<PointerId, TrackedPointer>,
    active: HashMap<GestureKind, Gesture>,
    baseline: Option<TwoPointerBaseline>,
    long_press: Timer<PointerId>,
    last_tap: Option<(Point, Instant)>,
    tap_candidate: bool,
}

impl Default for GestureRecognizer {
    fn default() -> Self {
        Self::new(GestureConfig::default())
    }
}

impl GestureRecognizer {
    pub fn new(config: GestureConfig) -> Self {
        Self {
            config,
            pointers: BTreeMap::new(),
            active: HashMap::new(),
            baseline: None,
            long_press: Timer::new(),
            last_tap: None,
            tap_candidate: false,
        }
    }

    pub fn config(&self) -> &GestureConfig {
        &self.config
    }

    pub fn set_config(&mut self, config: GestureConfig) {
        self.config = config;
    }

    pub fn pointer_count(&self) -> usize {
        self.pointers.len()
    }

    pub fn pointer(&self, id: PointerId) -> Option<&TrackedPointer> {
        self.pointers.get(&id)
    }

    /// Currently active gestures, in kind order.
    pub fn active_gestures(&self) -> Vec<&Gesture> {
        let mut gestures: Vec<&Gesture> = self.active.values().collect();
        gestures.sort_by_key(|g| g.kind);
        gestures
    }

    /// Whether any active gesture involves two or more pointers.
    pub fn is_multi_pointer_active(&self) -> bool {
        self.active.values().any(Gesture::is_multi_pointer)
    }

    /// Deadline of the armed long-press timer, if any.
    pub fn next_deadline(&self) -> Option<Instant> {
        self.long_press.deadline()
    }

    /// Route a canonical pointer event. Stale pointer ids are dropped.
    pub fn process(&mut self, event: &PointerEvent) -> Vec<Gesture> {
        let now = event.timestamp;
        let result = match event.phase {
            PointerPhase::Down => Ok(self.pointer_down(event.pointer_id, event.position, now)),
            PointerPhase::Move => self.pointer_move(event.pointer_id, event.position, now),
            PointerPhase::Up => self.pointer_up(event.pointer_id, event.position, now),
            PointerPhase::Cancel => self.pointer_cancel(event.pointer_id, now),
        };
        result.unwrap_or_else(|e| {
            log::trace!("Dropping gesture update: {e}");
            Vec::new()
        })
    }

    /// A new contact.
    pub fn pointer_down(&mut self, id: PointerId, position: Point, now: Instant) -> Vec<Gesture> {
        let mut out = Vec::new();
        if self.pointers.contains_key(&id) {
            log::trace!("Pointer {id:?} pressed again without release, restarting it");
        }
        self.pointers
            .insert(id, TrackedPointer::new(id, position, now));

        match self.pointers.len() {
            1 => {
                self.tap_candidate = true;
                match self.last_tap.take() {
                    Some((pos, at))
                        if now.saturating_duration_since(at) <= self.config.double_tap_window()
                            && (position - pos).hypot() <= self.config.double_tap_distance =>
                    {
                        self.tap_candidate = false;
                        out.push(Gesture::discrete(GestureKind::DoubleTap, position, id));
                    }
                    _ => self.last_tap = Some((position, now)),
                }
                self.long_press.arm(now + self.config.long_press_duration(), id);
            }
            2 => {
                // A second contact ends single-pointer recognition
                self.long_press.cancel();
                self.last_tap = None;
                self.tap_candidate = false;
                self.end_matching(|g| !g.is_multi_pointer(), GestureState::Ended, &mut out);
                self.capture_baseline();
            }
            _ => {}
        }
        out
    }

    /// A contact moved.
    pub fn pointer_move(
        &mut self,
        id: PointerId,
        position: Point,
        now: Instant,
    ) -> CanvasResult<Vec<Gesture>> {
        let pointer = self
            .pointers
            .get_mut(&id)
            .ok_or_else(|| CanvasError::StaleReference(format!("pointer {id:?}")))?;
        pointer.update(position, now);
        let (start, current, displacement, travel) = (
            pointer.start,
            pointer.position,
            pointer.displacement(),
            pointer.travel,
        );

        let mut out = Vec::new();
        if self.pointers.len() == 1 {
            if travel > self.config.long_press_slop {
                self.long_press.cancel();
                self.tap_candidate = false;
            }
            if self.active.contains_key(&GestureKind::Pan) || displacement > self.config.pan_threshold
            {
                out.push(self.upsert(GestureKind::Pan, current, current - start, None, None, vec![id]));
            }
        } else if self.baseline.is_some_and(|b| b.ids.contains(&id)) {
            self.update_two_pointer(&mut out);
        }
        Ok(out)
    }

    /// A contact lifted.
    pub fn pointer_up(
        &mut self,
        id: PointerId,
        position: Point,
        now: Instant,
    ) -> CanvasResult<Vec<Gesture>> {
        self.pointers
            .get_mut(&id)
            .ok_or_else(|| CanvasError::StaleReference(format!("pointer {id:?}")))?
            .update(position, now);
        self.remove_pointer(id, GestureState::Ended, now)
    }

    /// The platform cancelled a contact.
    pub fn pointer_cancel(&mut self, id: PointerId, now: Instant) -> CanvasResult<Vec<Gesture>> {
        self.remove_pointer(id, GestureState::Cancelled, now)
    }

    /// Fire the long press if its deadline has passed.
    pub fn poll(&mut self, now: Instant) -> Option<Gesture> {
        let pointer_id = self.long_press.fire(now)?;
        let pointer = self.pointers.get(&pointer_id)?;
        if self.pointers.len() != 1 || pointer.travel > self.config.long_press_slop {
            return None;
        }
        let position = pointer.position;
        self.tap_candidate = false;
        Some(self.upsert(
            GestureKind::LongPress,
            position,
            Vec2::ZERO,
            None,
            None,
            vec![pointer_id],
        ))
    }

    /// Cancel every active gesture and forget all pointers and timers.
    pub fn cancel_all(&mut self) -> Vec<Gesture> {
        let mut out = Vec::new();
        self.end_matching(|_| true, GestureState::Cancelled, &mut out);
        self.reset();
        out
    }

    /// Return to the initial idle state without emitting anything.
    pub fn reset(&mut self) {
        self.pointers.clear();
        self.active.clear();
        self.baseline = None;
        self.long_press.cancel();
        self.last_tap = None;
        self.tap_candidate = false;
    }

    // -----------------------------------------------------------------------
    // Internals
    // -----------------------------------------------------------------------

    fn remove_pointer(
        &mut self,
        id: PointerId,
        state: GestureState,
        now: Instant,
    ) -> CanvasResult<Vec<Gesture>> {
        let removed = self
            .pointers
            .remove(&id)
            .ok_or_else(|| CanvasError::StaleReference(format!("pointer {id:?}")))?;
        if self.long_press.payload() == Some(&id) {
            self.long_press.cancel();
        }

        let mut out = Vec::new();
        self.end_matching(|g| g.pointers.contains(&id), state, &mut out);

        if self.pointers.is_empty()
            && state == GestureState::Ended
            && self.tap_candidate
            && out.is_empty()
            && removed.displacement() <= self.config.long_press_slop
        {
            out.push(Gesture::discrete(GestureKind::Tap, removed.position, id));
        }

        match self.pointers.len() {
            0 => {
                self.baseline = None;
                self.tap_candidate = false;
            }
            1 => {
                self.baseline = None;
                self.tap_candidate = false;
                for p in self.pointers.values_mut() {
                    p.rebase(now);
                }
            }
            _ => {
                if self.baseline.is_some_and(|b| b.ids.contains(&id)) {
                    self.capture_baseline();
                }
            }
        }
        Ok(out)
    }

    /// Move matching active gestures to `state` and append them to `out`.
    fn end_matching(
        &mut self,
        matches: impl Fn(&Gesture) -> bool,
        state: GestureState,
        out: &mut Vec<Gesture>,
    ) {
        let mut kinds: Vec<GestureKind> = self
            .active
            .values()
            .filter(|g| matches(g))
            .map(|g| g.kind)
            .collect();
        kinds.sort();
        for kind in kinds {
            if let Some(mut g) = self.active.remove(&kind) {
                g.state = state;
                out.push(g);
            }
        }
    }

    /// Begin or update the active gesture of `kind`.
    fn upsert(
        &mut self,
        kind: GestureKind,
        center: Point,
        delta: Vec2,
        scale: Option<f64>,
        rotation: Option<f64>,
        pointers: Vec<PointerId>,
    ) -> Gesture {
        let gesture = self.active.entry(kind).or_insert_with(|| Gesture {
            kind,
            state: GestureState::Possible,
            center,
            delta,
            scale,
            rotation,
            pointers: pointers.clone(),
        });
        gesture.state = if gesture.state == GestureState::Possible {
            GestureState::Began
        } else {
            GestureState::Changed
        };
        gesture.center = center;
        gesture.delta = delta;
        gesture.scale = scale;
        gesture.rotation = rotation;
        gesture.pointers = pointers;
        gesture.clone()
    }

    /// The first two tracked pointers.
    fn pair(&self) -> Option<(&TrackedPointer, &TrackedPointer)> {
        let mut it = self.pointers.values();
        Some((it.next()?, it.next()?))
    }

    fn capture_baseline(&mut self) {
        self.baseline = self.pair().map(|(a, b)| {
            let v = b.position - a.position;
            TwoPointerBaseline {
                ids: [a.id, b.id],
                distance: v.hypot(),
                angle: v.atan2(),
                center: a.position.midpoint(b.position),
            }
        });
        if let Some(b) = &self.baseline {
            log::debug!(
                "Two-pointer baseline: distance {:.1}, angle {:.3}",
                b.distance,
                b.angle
            );
        }
    }

    fn update_two_pointer(&mut self, out: &mut Vec<Gesture>) {
        let Some(baseline) = self.baseline else {
            return;
        };
        let (Some(a), Some(b)) = (
            self.pointers.get(&baseline.ids[0]),
            self.pointers.get(&baseline.ids[1]),
        ) else {
            return;
        };
        let v = b.position - a.position;
        let center = a.position.midpoint(b.position);
        let delta = center - baseline.center;
        let ids = baseline.ids.to_vec();

        if self.active.contains_key(&GestureKind::Pan) || delta.hypot() > self.config.pan_threshold {
            out.push(self.upsert(GestureKind::Pan, center, delta, None, None, ids.clone()));
        }

        if baseline.distance > f64::EPSILON {
            let scale = v.hypot() / baseline.distance;
            if self.active.contains_key(&GestureKind::Pinch)
                || (scale - 1.0).abs() > self.config.pinch_threshold
            {
                out.push(self.upsert(GestureKind::Pinch, center, delta, Some(scale), None, ids.clone()));
            }
        }

        let rotation = normalize_angle(v.atan2() - baseline.angle);
        if self.active.contains_key(&GestureKind::Rotate)
            || rotation.abs() > self.config.rotation_threshold
        {
            out.push(self.upsert(GestureKind::Rotate, center, delta, None, Some(rotation), ids));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f64::consts::FRAC_PI_2;

    const A: PointerId = PointerId::Touch(1);
    const B: PointerId = PointerId::Touch(2);

    fn ms(base: Instant, millis: u64) -> Instant {
        base + Duration::from_millis(millis)
    }

    fn kinds(gestures: &[Gesture]) -> Vec<(GestureKind, GestureState)> {
        gestures.iter().map(|g| (g.kind, g.state)).collect()
    }

    #[test]
    fn single_tap() {
        let mut r = GestureRecognizer::default();
        let t0 = Instant::now();
        assert!(r.pointer_down(A, Point::new(10.0, 10.0), t0).is_empty());
        let out = r.pointer_up(A, Point::new(11.0, 10.0), ms(t0, 80)).unwrap();
        assert_eq!(kinds(&out), vec![(GestureKind::Tap, GestureState::Ended)]);
        assert_eq!(r.pointer_count(), 0);
    }

    #[test]
    fn double_tap_is_distinct_kind() {
        let mut r = GestureRecognizer::default();
        let t0 = Instant::now();
        r.pointer_down(A, Point::new(10.0, 10.0), t0);
        r.pointer_up(A, Point::new(10.0, 10.0), ms(t0, 50)).unwrap();
        let out = r.pointer_down(A, Point::new(14.0, 12.0), ms(t0, 200));
        assert_eq!(kinds(&out), vec![(GestureKind::DoubleTap, GestureState::Ended)]);
        // The second release is not reported as another tap
        assert!(r.pointer_up(A, Point::new(14.0, 12.0), ms(t0, 250)).unwrap().is_empty());
    }

    #[test]
    fn double_tap_outside_window_is_single() {
        let mut r = GestureRecognizer::default();
        let t0 = Instant::now();
        r.pointer_down(A, Point::new(10.0, 10.0), t0);
        r.pointer_up(A, Point::new(10.0, 10.0), ms(t0, 50)).unwrap();
        assert!(r.pointer_down(A, Point::new(10.0, 10.0), ms(t0, 400)).is_empty());
    }

    #[test]
    fn double_tap_too_far_is_single() {
        let mut r = GestureRecognizer::default();
        let t0 = Instant::now();
        r.pointer_down(A, Point::new(10.0, 10.0), t0);
        r.pointer_up(A, Point::new(10.0, 10.0), ms(t0, 50)).unwrap();
        assert!(r.pointer_down(A, Point::new(60.0, 10.0), ms(t0, 100)).is_empty());
    }

    #[test]
    fn long_press_fires_after_deadline() {
        let mut r = GestureRecognizer::default();
        let t0 = Instant::now();
        r.pointer_down(A, Point::new(10.0, 10.0), t0);
        assert_eq!(r.next_deadline(), Some(ms(t0, 500)));
        assert!(r.poll(ms(t0, 499)).is_none());
        let g = r.poll(ms(t0, 500)).unwrap();
        assert_eq!((g.kind, g.state), (GestureKind::LongPress, GestureState::Began));
        // Not repeated
        assert!(r.poll(ms(t0, 900)).is_none());
        let out = r.pointer_up(A, Point::new(10.0, 10.0), ms(t0, 950)).unwrap();
        assert_eq!(kinds(&out), vec![(GestureKind::LongPress, GestureState::Ended)]);
    }

    #[test]
    fn movement_cancels_long_press() {
        let mut r = GestureRecognizer::default();
        let t0 = Instant::now();
        r.pointer_down(A, Point::new(10.0, 10.0), t0);
        r.pointer_move(A, Point::new(30.0, 10.0), ms(t0, 100)).unwrap();
        assert!(r.next_deadline().is_none());
        assert!(r.poll(ms(t0, 600)).is_none());
    }

    #[test]
    fn wandering_pointer_cancels_long_press() {
        let mut r = GestureRecognizer::default();
        let t0 = Instant::now();
        r.pointer_down(A, Point::new(10.0, 10.0), t0);
        r.pointer_move(A, Point::new(16.0, 10.0), ms(t0, 100)).unwrap();
        r.pointer_move(A, Point::new(10.0, 10.0), ms(t0, 200)).unwrap();
        assert!(r.pointer(A).unwrap().displacement() < 1.0);
        assert!(r.next_deadline().is_none());
        assert!(r.poll(ms(t0, 600)).is_none());
        let out = r.pointer_up(A, Point::new(10.0, 10.0), ms(t0, 650)).unwrap();
        assert!(out.iter().all(|g| g.kind != GestureKind::LongPress));
    }

    #[test]
    fn release_cancels_long_press() {
        let mut r = GestureRecognizer::default();
        let t0 = Instant::now();
        r.pointer_down(A, Point::new(10.0, 10.0), t0);
        r.pointer_up(A, Point::new(10.0, 10.0), ms(t0, 100)).unwrap();
        assert!(r.poll(ms(t0, 600)).is_none());
    }

    #[test]
    fn pan_begins_after_threshold() {
        let mut r = GestureRecognizer::default();
        let t0 = Instant::now();
        r.pointer_down(A, Point::new(0.0, 0.0), t0);
        assert!(r.pointer_move(A, Point::new(5.0, 0.0), ms(t0, 16)).unwrap().is_empty());

        let out = r.pointer_move(A, Point::new(20.0, 0.0), ms(t0, 32)).unwrap();
        assert_eq!(kinds(&out), vec![(GestureKind::Pan, GestureState::Began)]);
        assert_eq!(out[0].delta, Vec2::new(20.0, 0.0));

        let out = r.pointer_move(A, Point::new(25.0, 5.0), ms(t0, 48)).unwrap();
        assert_eq!(kinds(&out), vec![(GestureKind::Pan, GestureState::Changed)]);
        // Delta is cumulative from the start position
        assert_eq!(out[0].delta, Vec2::new(25.0, 5.0));

        let out = r.pointer_up(A, Point::new(25.0, 5.0), ms(t0, 64)).unwrap();
        assert_eq!(kinds(&out), vec![(GestureKind::Pan, GestureState::Ended)]);
    }

    #[test]
    fn pinch_reports_scale() {
        let mut r = GestureRecognizer::default();
        let t0 = Instant::now();
        r.pointer_down(A, Point::new(100.0, 100.0), t0);
        r.pointer_down(B, Point::new(200.0, 100.0), ms(t0, 10));
        // Move both pointers apart symmetrically: distance 100 -> 150
        r.pointer_move(A, Point::new(75.0, 100.0), ms(t0, 20)).unwrap();
        let out = r.pointer_move(B, Point::new(225.0, 100.0), ms(t0, 30)).unwrap();
        let pinch = out.iter().find(|g| g.kind == GestureKind::Pinch).unwrap();
        assert!((pinch.scale.unwrap() - 1.5).abs() < 1e-9);
        assert_eq!(pinch.state, GestureState::Changed);
        assert_eq!(pinch.pointers, vec![A, B]);
        // Symmetric motion brings the center back to where it started
        assert!(
            out.iter()
                .filter(|g| g.kind == GestureKind::Pan)
                .all(|g| g.delta == Vec2::ZERO)
        );
        assert!(r.is_multi_pointer_active());
    }

    #[test]
    fn pinch_below_threshold_not_reported() {
        let mut r = GestureRecognizer::default();
        let t0 = Instant::now();
        r.pointer_down(A, Point::new(100.0, 100.0), t0);
        r.pointer_down(B, Point::new(200.0, 100.0), t0);
        let out = r.pointer_move(B, Point::new(201.0, 100.0), ms(t0, 16)).unwrap();
        assert!(out.is_empty());
    }

    #[test]
    fn rotate_and_pinch_concurrently() {
        let mut r = GestureRecognizer::default();
        let t0 = Instant::now();
        r.pointer_down(A, Point::new(0.0, 0.0), t0);
        r.pointer_down(B, Point::new(100.0, 0.0), t0);
        // B swings to straight below A and twice as far
        let out = r.pointer_move(B, Point::new(0.0, 200.0), ms(t0, 16)).unwrap();
        let pinch = out.iter().find(|g| g.kind == GestureKind::Pinch).unwrap();
        let rotate = out.iter().find(|g| g.kind == GestureKind::Rotate).unwrap();
        assert_eq!(pinch.state, GestureState::Began);
        assert!((pinch.scale.unwrap() - 2.0).abs() < 1e-9);
        assert!((rotate.rotation.unwrap() - FRAC_PI_2).abs() < 1e-9);
    }

    #[test]
    fn lifting_a_pointer_ends_shared_gestures() {
        let mut r = GestureRecognizer::default();
        let t0 = Instant::now();
        r.pointer_down(A, Point::new(100.0, 100.0), t0);
        r.pointer_down(B, Point::new(200.0, 100.0), t0);
        r.pointer_move(B, Point::new(300.0, 100.0), ms(t0, 16)).unwrap();
        let out = r.pointer_up(B, Point::new(300.0, 100.0), ms(t0, 32)).unwrap();
        assert!(out.iter().all(|g| g.state == GestureState::Ended));
        assert!(out.iter().any(|g| g.kind == GestureKind::Pinch));
        assert!(r.active_gestures().is_empty());

        // The remaining pointer is rebased, so it doesn't jump into a pan
        let out = r.pointer_move(A, Point::new(104.0, 100.0), ms(t0, 48)).unwrap();
        assert!(out.is_empty());
        // And lifting it is not a tap
        assert!(r.pointer_up(A, Point::new(104.0, 100.0), ms(t0, 64)).unwrap().is_empty());
    }

    #[test]
    fn second_pointer_ends_single_pan() {
        let mut r = GestureRecognizer::default();
        let t0 = Instant::now();
        r.pointer_down(A, Point::new(0.0, 0.0), t0);
        r.pointer_move(A, Point::new(50.0, 0.0), ms(t0, 16)).unwrap();
        let out = r.pointer_down(B, Point::new(200.0, 0.0), ms(t0, 32));
        assert_eq!(kinds(&out), vec![(GestureKind::Pan, GestureState::Ended)]);
    }

    #[test]
    fn stale_pointer_is_rejected() {
        let mut r = GestureRecognizer::default();
        let t0 = Instant::now();
        assert!(matches!(
            r.pointer_move(A, Point::ZERO, t0),
            Err(CanvasError::StaleReference(_))
        ));
        assert!(r.pointer_up(B, Point::ZERO, t0).is_err());
    }

    #[test]
    fn cancel_reports_cancelled() {
        let mut r = GestureRecognizer::default();
        let t0 = Instant::now();
        r.pointer_down(A, Point::new(0.0, 0.0), t0);
        r.pointer_move(A, Point::new(50.0, 0.0), ms(t0, 16)).unwrap();
        let out = r.pointer_cancel(A, ms(t0, 32)).unwrap();
        assert_eq!(kinds(&out), vec![(GestureKind::Pan, GestureState::Cancelled)]);
    }

    #[test]
    fn cancel_all_clears_everything() {
        let mut r = GestureRecognizer::default();
        let t0 = Instant::now();
        r.pointer_down(A, Point::new(0.0, 0.0), t0);
        r.pointer_down(B, Point::new(100.0, 0.0), t0);
        r.pointer_move(B, Point::new(300.0, 0.0), ms(t0, 16)).unwrap();
        let out = r.cancel_all();
        assert!(!out.is_empty());
        assert!(out.iter().all(|g| g.state == GestureState::Cancelled));
        assert_eq!(r.pointer_count(), 0);
        assert!(r.next_deadline().is_none());
    }

    #[test]
    fn velocity_is_tracked() {
        let mut r = GestureRecognizer::default();
        let t0 = Instant::now();
        r.pointer_down(A, Point::new(0.0, 0.0), t0);
        r.pointer_move(A, Point::new(10.0, 0.0), ms(t0, 100)).unwrap();
        let p = r.pointer(A).unwrap();
        assert!((p.velocity.x - 100.0).abs() < 1e-6);
        // Same timestamp keeps the previous velocity rather than dividing by zero
        r.pointer_move(A, Point::new(20.0, 0.0), ms(t0, 100)).unwrap();
        assert!((r.pointer(A).unwrap().velocity.x - 100.0).abs() < 1e-6);
        assert!((r.pointer(A).unwrap().travel - 20.0).abs() < 1e-9);
    }

    #[test]
    fn normalize_angle_wraps() {
        assert!((normalize_angle(3.0 * PI / 2.0) + FRAC_PI_2).abs() < 1e-12);
        assert!((normalize_angle(-3.0 * PI / 2.0) - FRAC_PI_2).abs() < 1e-12);
    }
}
