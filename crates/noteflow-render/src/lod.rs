//! Zoom-dependent level of detail.
//!
//! LOD only changes how much of a shape is painted. Hit testing and the
//! model never look at it.

/// Zoom levels below which detail is dropped.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LodThresholds {
    /// Below this zoom shadows and connection points are skipped.
    pub reduced_below: f64,
    /// Below this zoom shapes are drawn as flat fills only.
    pub minimal_below: f64,
}

impl Default for LodThresholds {
    fn default() -> Self {
        Self {
            reduced_below: 0.5,
            minimal_below: 0.25,
        }
    }
}

/// Rendering fidelity for one frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum LevelOfDetail {
    Minimal,
    Reduced,
    Full,
}

impl LevelOfDetail {
    pub fn for_zoom(zoom: f64, thresholds: &LodThresholds) -> Self {
        if zoom < thresholds.minimal_below {
            LevelOfDetail::Minimal
        } else if zoom < thresholds.reduced_below {
            LevelOfDetail::Reduced
        } else {
            LevelOfDetail::Full
        }
    }

    pub fn shadows(self) -> bool {
        self == LevelOfDetail::Full
    }

    pub fn connection_points(self) -> bool {
        self == LevelOfDetail::Full
    }

    pub fn text(self) -> bool {
        self > LevelOfDetail::Minimal
    }

    pub fn rounded_corners(self) -> bool {
        self > LevelOfDetail::Minimal
    }

    /// Arrowheads and connector labels.
    pub fn decorations(self) -> bool {
        self > LevelOfDetail::Minimal
    }
}
