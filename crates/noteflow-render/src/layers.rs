//! Layer stack and the cache for static layers.

use crate::surface::DrawCommand;
use kurbo::{Size, Vec2};
use noteflow_core::Viewport;
use std::collections::HashMap;

/// Render layers, back to front.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum LayerKind {
    Background,
    Grid,
    Connectors,
    Shapes,
    Selection,
    Handles,
    Overlay,
    Tooltip,
}

impl LayerKind {
    /// Draw order.
    pub const ORDER: [LayerKind; 8] = [
        LayerKind::Background,
        LayerKind::Grid,
        LayerKind::Connectors,
        LayerKind::Shapes,
        LayerKind::Selection,
        LayerKind::Handles,
        LayerKind::Overlay,
        LayerKind::Tooltip,
    ];

    /// Layers whose content depends only on the viewport and configuration.
    pub fn is_cacheable(self) -> bool {
        matches!(self, LayerKind::Background | LayerKind::Grid)
    }

    fn index(self) -> usize {
        self as usize
    }
}

/// Visibility and blending of one layer.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LayerSettings {
    pub visible: bool,
    /// Group opacity in `0.0..=1.0`.
    pub opacity: f32,
}

impl Default for LayerSettings {
    fn default() -> Self {
        Self {
            visible: true,
            opacity: 1.0,
        }
    }
}

impl LayerSettings {
    /// Whether the layer contributes anything to the frame.
    pub fn is_drawn(&self) -> bool {
        self.visible && self.opacity > 0.0
    }

    /// Whether the layer needs its own compositing group.
    pub fn is_blended(&self) -> bool {
        self.opacity < 1.0
    }
}

/// Per-layer settings in draw order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LayerStack {
    settings: [LayerSettings; 8],
}

impl LayerStack {
    pub fn settings(&self, kind: LayerKind) -> LayerSettings {
        self.settings[kind.index()]
    }

    pub fn set_visible(&mut self, kind: LayerKind, visible: bool) {
        self.settings[kind.index()].visible = visible;
    }

    /// Set a layer's opacity, clamped to `0.0..=1.0`. NaN is ignored.
    pub fn set_opacity(&mut self, kind: LayerKind, opacity: f32) {
        if opacity.is_nan() {
            log::warn!("Ignoring NaN opacity for {kind:?} layer");
            return;
        }
        self.settings[kind.index()].opacity = opacity.clamp(0.0, 1.0);
    }

    /// Layers in draw order with their settings.
    pub fn iter(&self) -> impl Iterator<Item = (LayerKind, LayerSettings)> + '_ {
        LayerKind::ORDER.iter().map(|&kind| (kind, self.settings(kind)))
    }
}

/// The parts of a viewport a cached layer depends on.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ViewportFingerprint {
    pub zoom: f64,
    pub offset: Vec2,
    pub size: Size,
}

impl ViewportFingerprint {
    pub fn of(viewport: &Viewport) -> Self {
        Self {
            zoom: viewport.zoom(),
            offset: viewport.offset(),
            size: viewport.size(),
        }
    }

    /// Whether `other` is close enough for cached content to be reused.
    pub fn matches(&self, other: &Self, zoom_epsilon: f64, offset_epsilon: f64) -> bool {
        self.size == other.size
            && (self.zoom - other.zoom).abs() <= zoom_epsilon
            && (self.offset.x - other.offset.x).abs() <= offset_epsilon
            && (self.offset.y - other.offset.y).abs() <= offset_epsilon
    }
}

#[derive(Debug, Clone)]
struct CacheEntry {
    fingerprint: ViewportFingerprint,
    commands: Vec<DrawCommand>,
}

/// Recorded draw commands of cacheable layers, keyed by viewport fingerprint.
#[derive(Debug, Clone)]
pub struct LayerCache {
    entries: HashMap<LayerKind, CacheEntry>,
    zoom_epsilon: f64,
    offset_epsilon: f64,
    hits: u64,
    misses: u64,
}

impl LayerCache {
    pub fn new(zoom_epsilon: f64, offset_epsilon: f64) -> Self {
        Self {
            entries: HashMap::new(),
            zoom_epsilon,
            offset_epsilon,
            hits: 0,
            misses: 0,
        }
    }

    /// Cached commands for `kind` if they were recorded for a matching viewport.
    pub fn lookup(&mut self, kind: LayerKind, fingerprint: &ViewportFingerprint) -> Option<&[DrawCommand]> {
        let fresh = self.entries.get(&kind).is_some_and(|entry| {
            entry
                .fingerprint
                .matches(fingerprint, self.zoom_epsilon, self.offset_epsilon)
        });
        if fresh {
            self.hits += 1;
            self.entries.get(&kind).map(|entry| entry.commands.as_slice())
        } else {
            self.misses += 1;
            None
        }
    }

    pub fn store(&mut self, kind: LayerKind, fingerprint: ViewportFingerprint, commands: Vec<DrawCommand>) {
        self.entries.insert(
            kind,
            CacheEntry {
                fingerprint,
                commands,
            },
        );
    }

    /// Drop one layer's entry. Returns whether there was one.
    pub fn invalidate(&mut self, kind: LayerKind) -> bool {
        let removed = self.entries.remove(&kind).is_some();
        if removed {
            log::debug!("Invalidated cached {kind:?} layer");
        }
        removed
    }

    pub fn invalidate_all(&mut self) {
        if !self.entries.is_empty() {
            log::debug!("Invalidated {} cached layers", self.entries.len());
        }
        self.entries.clear();
    }

    pub fn hits(&self) -> u64 {
        self.hits
    }

    pub fn misses(&self) -> u64 {
        self.misses
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use peniko::Color;

    fn fingerprint(zoom: f64, x: f64) -> ViewportFingerprint {
        ViewportFingerprint {
            zoom,
            offset: Vec2::new(x, 0.0),
            size: Size::new(800.0, 600.0),
        }
    }

    #[test]
    fn test_order_is_back_to_front() {
        assert_eq!(LayerKind::ORDER[0], LayerKind::Background);
        assert_eq!(LayerKind::ORDER[7], LayerKind::Tooltip);
        assert!(LayerKind::ORDER.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn test_layer_settings() {
        let mut stack = LayerStack::default();
        stack.set_opacity(LayerKind::Grid, 2.0);
        assert_eq!(stack.settings(LayerKind::Grid).opacity, 1.0);
        stack.set_opacity(LayerKind::Grid, 0.5);
        assert!(stack.settings(LayerKind::Grid).is_blended());
        stack.set_opacity(LayerKind::Grid, f32::NAN);
        assert_eq!(stack.settings(LayerKind::Grid).opacity, 0.5);
        stack.set_visible(LayerKind::Handles, false);
        assert!(!stack.settings(LayerKind::Handles).is_drawn());
        assert_eq!(stack.iter().filter(|(_, s)| s.is_drawn()).count(), 7);
    }

    #[test]
    fn test_fingerprint_epsilons() {
        let base = fingerprint(1.0, 0.0);
        assert!(base.matches(&fingerprint(1.005, 0.5), 0.01, 1.0));
        assert!(!base.matches(&fingerprint(1.02, 0.0), 0.01, 1.0));
        assert!(!base.matches(&fingerprint(1.0, 1.5), 0.01, 1.0));
        let mut resized = base;
        resized.size = Size::new(801.0, 600.0);
        assert!(!base.matches(&resized, 0.01, 1.0));
    }

    #[test]
    fn test_cache_hit_and_miss() {
        let mut cache = LayerCache::new(0.01, 1.0);
        let fp = fingerprint(1.0, 0.0);
        assert!(cache.lookup(LayerKind::Grid, &fp).is_none());
        cache.store(LayerKind::Grid, fp, vec![DrawCommand::Clear(Color::WHITE)]);
        assert_eq!(cache.lookup(LayerKind::Grid, &fingerprint(1.0, 0.5)).map(<[_]>::len), Some(1));
        assert!(cache.lookup(LayerKind::Grid, &fingerprint(1.5, 0.0)).is_none());
        assert_eq!((cache.hits(), cache.misses()), (1, 2));
        assert!(cache.invalidate(LayerKind::Grid));
        assert!(cache.is_empty());
    }
}
