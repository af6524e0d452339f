//! Rolling render performance metrics.

use noteflow_core::{Instant, ShapeKind};
use std::collections::{HashMap, VecDeque};

#[derive(Debug, Clone, Copy)]
struct FrameSample {
    started: Instant,
    frame_ms: f64,
}

/// Frame rate and timing averaged over the last `window` frames.
#[derive(Debug, Clone)]
pub struct RenderMetrics {
    window: usize,
    frames: VecDeque<FrameSample>,
    elements: HashMap<ShapeKind, VecDeque<f64>>,
    total_frames: u64,
}

impl RenderMetrics {
    pub fn new(window: usize) -> Self {
        Self {
            window: window.max(2),
            frames: VecDeque::new(),
            elements: HashMap::new(),
            total_frames: 0,
        }
    }

    pub fn record_frame(&mut self, started: Instant, frame_ms: f64) {
        if self.frames.len() == self.window {
            self.frames.pop_front();
        }
        self.frames.push_back(FrameSample { started, frame_ms });
        self.total_frames += 1;
    }

    /// Record how long one shape took to draw.
    pub fn record_element(&mut self, kind: ShapeKind, ms: f64) {
        let samples = self.elements.entry(kind).or_default();
        if samples.len() == self.window {
            samples.pop_front();
        }
        samples.push_back(ms);
    }

    /// Frames per second between the oldest and newest frame in the window.
    pub fn fps(&self) -> Option<f64> {
        let first = self.frames.front()?;
        let last = self.frames.back()?;
        let span = last.started.duration_since(first.started).as_secs_f64();
        if self.frames.len() < 2 || span <= 0.0 {
            return None;
        }
        Some((self.frames.len() - 1) as f64 / span)
    }

    pub fn mean_frame_ms(&self) -> Option<f64> {
        mean(self.frames.iter().map(|f| f.frame_ms))
    }

    pub fn mean_element_ms(&self, kind: ShapeKind) -> Option<f64> {
        self.elements.get(&kind).and_then(|s| mean(s.iter().copied()))
    }

    pub fn last_frame_ms(&self) -> Option<f64> {
        self.frames.back().map(|f| f.frame_ms)
    }

    pub fn total_frames(&self) -> u64 {
        self.total_frames
    }

    pub fn reset(&mut self) {
        self.frames.clear();
        self.elements.clear();
    }
}

fn mean(values: impl Iterator<Item = f64>) -> Option<f64> {
    let (sum, count) = values.fold((0.0, 0usize), |(s, c), v| (s + v, c + 1));
    (count > 0).then(|| sum / count as f64)
}
