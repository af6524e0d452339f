//! Dirty-region tracking.
//!
//! Regions are advisory. The engine always produces a correct frame with a
//! full repaint; hosts can read [`DirtyRegions::union_rect`] to bound their
//! own presentation work.

use kurbo::Rect;
use noteflow_core::ShapeId;

/// How urgently a region should be repainted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
pub enum DirtyPriority {
    Low,
    #[default]
    Normal,
    High,
}

/// A screen-space rectangle that needs to be re-rendered.
#[derive(Debug, Clone, PartialEq)]
pub struct DirtyRegion {
    pub rect: Rect,
    pub priority: DirtyPriority,
    pub element_ids: Vec<ShapeId>,
}

/// Accumulated dirty regions for the next frame.
///
/// Overlapping regions are merged. Past `max_regions` the tracker degrades
/// to a single full-surface repaint.
#[derive(Debug, Clone)]
pub struct DirtyRegions {
    regions: Vec<DirtyRegion>,
    full: bool,
    max_regions: usize,
}

impl DirtyRegions {
    pub fn new(max_regions: usize) -> Self {
        Self {
            regions: Vec::new(),
            full: false,
            max_regions: max_regions.max(1),
        }
    }

    /// Record a changed area. Empty or non-finite rects are ignored.
    pub fn mark(&mut self, rect: Rect, priority: DirtyPriority, element_ids: &[ShapeId]) {
        if self.full {
            return;
        }
        let finite = [rect.x0, rect.y0, rect.x1, rect.y1].iter().all(|v| v.is_finite());
        if !finite || rect.area() <= 0.0 {
            log::trace!("Ignoring degenerate dirty rect {rect:?}");
            return;
        }
        let mut region = DirtyRegion {
            rect,
            priority,
            element_ids: element_ids.to_vec(),
        };
        // Absorb every region the new one overlaps, repeating as it grows.
        loop {
            let Some(pos) = self
                .regions
                .iter()
                .position(|r| r.rect.intersect(region.rect).area() > 0.0)
            else {
                break;
            };
            let other = self.regions.swap_remove(pos);
            region.rect = region.rect.union(other.rect);
            region.priority = region.priority.max(other.priority);
            for id in other.element_ids {
                if !region.element_ids.contains(&id) {
                    region.element_ids.push(id);
                }
            }
        }
        self.regions.push(region);
        if self.regions.len() > self.max_regions {
            log::debug!("More than {} dirty regions, repainting everything", self.max_regions);
            self.mark_all();
        }
    }

    /// Flag the whole surface.
    pub fn mark_all(&mut self) {
        self.full = true;
        self.regions.clear();
    }

    pub fn is_full(&self) -> bool {
        self.full
    }

    pub fn is_empty(&self) -> bool {
        !self.full && self.regions.is_empty()
    }

    pub fn regions(&self) -> &[DirtyRegion] {
        &self.regions
    }

    /// Union of all dirty rects, or `None` when nothing or everything is dirty.
    pub fn union_rect(&self) -> Option<Rect> {
        let mut it = self.regions.iter().map(|r| r.rect);
        let first = it.next()?;
        Some(it.fold(first, |acc, r| acc.union(r)))
    }

    pub fn clear(&mut self) {
        self.regions.clear();
        self.full = false;
    }
}
