//! NoteFlow Render Library
//!
//! Layered, culled and cached rendering of the NoteFlow canvas onto a
//! [`Surface`]. The default backend encodes into a Vello scene.

pub mod config;
pub mod culling;
pub mod dirty;
pub mod engine;
pub mod error;
pub mod layers;
pub mod lod;
pub mod metrics;
pub mod renderers;
pub mod scheduler;
pub mod surface;
pub mod text;

#[cfg(feature = "vello-renderer")]
mod vello_impl;

pub use config::{GridStyle, RenderConfig};
pub use dirty::{DirtyPriority, DirtyRegion, DirtyRegions};
pub use engine::{FrameStats, Overlay, RenderEngine, Tooltip};
pub use error::{RenderError, RenderResult};
pub use layers::{LayerCache, LayerKind, LayerSettings, LayerStack, ViewportFingerprint};
pub use lod::{LevelOfDetail, LodThresholds};
pub use metrics::RenderMetrics;
pub use scheduler::FrameScheduler;
pub use surface::{DrawCommand, RecordingSurface, Surface, TextRun};

#[cfg(feature = "vello-renderer")]
pub use vello_impl::VelloSurface;
