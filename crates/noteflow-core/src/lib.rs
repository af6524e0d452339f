//! NoteFlow Core Library
//!
//! Platform-agnostic interaction core for the NoteFlow diagram canvas:
//! viewport math, input normalization, hit testing, gesture recognition,
//! event dispatch and the interaction state machine.

pub mod canvas;
pub mod config;
pub mod dispatch;
pub mod document;
pub mod error;
pub mod gesture;
pub mod hit_test;
pub mod input;
pub mod interaction;
pub mod selection;
pub mod shapes;
pub mod timer;
pub mod viewport;

pub use canvas::CanvasCore;
pub use config::CanvasConfig;
pub use dispatch::{
    DispatchConfig, DispatchOutcome, EventDispatcher, EventKind, Handler, HandlerId,
    HandlerOptions, Propagation,
};
pub use document::CanvasDocument;
pub use error::{CanvasError, CanvasResult};
pub use gesture::{Gesture, GestureConfig, GestureKind, GestureRecognizer, GestureState};
pub use hit_test::{HitResult, HitTarget, HitTestOptions, hit_test_at_world, hit_test_rectangle};
pub use input::{CanvasEvent, EventNormalizer, Instant, RawInputEvent};
pub use interaction::{
    DocumentHost, DragDescriptor, DragKind, InteractionConfig, InteractionObserver,
    InteractionOrchestrator, InteractionState, Tool,
};
pub use selection::{Handle, HandleKind, get_handles};
pub use shapes::{Connector, Note, Shape, ShapeId, ShapeIndex, ShapeKind};
pub use viewport::{Easing, Viewport, ViewportAnimation, ViewportConfig, ViewportPatch};
