//! In-memory reference document.
//!
//! [`CanvasDocument`] is a minimal [`DocumentHost`]: it applies every request
//! immediately, keeps a snapshot undo history and cascades deletions to the
//! connectors that reference a removed note. Real hosts usually back the
//! trait with their own store.

use crate::interaction::DocumentHost;
use crate::shapes::{Shape, ShapeId, ShapeIndex};
use crate::viewport::ViewportPatch;
use kurbo::{Rect, Vec2};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use uuid::Uuid;

/// Maximum number of undo states to keep.
const MAX_UNDO_HISTORY: usize = 50;

/// A snapshot of document state for undo/redo.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct DocumentSnapshot {
    shapes: Vec<Shape>,
}

/// Shapes in document order (back to front), plus selection and the last
/// viewport reported by the interaction layer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CanvasDocument {
    /// Unique document identifier.
    pub id: String,
    /// Document name.
    pub name: String,
    shapes: Vec<Shape>,
    #[serde(skip)]
    selection: HashSet<ShapeId>,
    #[serde(default)]
    viewport: ViewportPatch,
    #[serde(skip)]
    undo_stack: Vec<DocumentSnapshot>,
    #[serde(skip)]
    redo_stack: Vec<DocumentSnapshot>,
}

impl Default for CanvasDocument {
    fn default() -> Self {
        Self::new()
    }
}

impl CanvasDocument {
    /// Create a new empty document.
    pub fn new() -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            name: "Untitled".to_string(),
            shapes: Vec::new(),
            selection: HashSet::new(),
            viewport: ViewportPatch::default(),
            undo_stack: Vec::new(),
            redo_stack: Vec::new(),
        }
    }

    fn snapshot(&self) -> DocumentSnapshot {
        DocumentSnapshot {
            shapes: self.shapes.clone(),
        }
    }

    /// Push current state to undo stack (call before making changes).
    pub fn push_undo(&mut self) {
        let snapshot = self.snapshot();
        self.undo_stack.push(snapshot);
        self.redo_stack.clear();
        if self.undo_stack.len() > MAX_UNDO_HISTORY {
            self.undo_stack.remove(0);
        }
    }

    /// Undo the last change. Returns false if there was nothing to undo.
    pub fn undo(&mut self) -> bool {
        let Some(snapshot) = self.undo_stack.pop() else {
            return false;
        };
        let current = self.snapshot();
        self.redo_stack.push(current);
        self.restore(snapshot);
        true
    }

    /// Redo the last undone change. Returns false if there was nothing to redo.
    pub fn redo(&mut self) -> bool {
        let Some(snapshot) = self.redo_stack.pop() else {
            return false;
        };
        let current = self.snapshot();
        self.undo_stack.push(current);
        self.restore(snapshot);
        true
    }

    fn restore(&mut self, snapshot: DocumentSnapshot) {
        self.shapes = snapshot.shapes;
        let ids: HashSet<ShapeId> = self.shapes.iter().map(Shape::id).collect();
        self.selection.retain(|id| ids.contains(id));
    }

    pub fn can_undo(&self) -> bool {
        !self.undo_stack.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !self.redo_stack.is_empty()
    }

    /// Add a shape on top of the document and return its id.
    pub fn add_shape(&mut self, mut shape: Shape) -> ShapeId {
        let id = shape.id();
        if let Shape::Connector(connector) = &mut shape {
            connector.refresh_bounds(&ShapeIndex::new(&self.shapes));
        }
        self.shapes.push(shape);
        id
    }

    /// Remove a shape and every connector attached to it.
    ///
    /// Returns the removed shapes, the requested one first.
    pub fn remove_shape(&mut self, id: ShapeId) -> Vec<Shape> {
        let Some(pos) = self.shapes.iter().position(|s| s.id() == id) else {
            return Vec::new();
        };
        let mut removed = vec![self.shapes.remove(pos)];
        let (dependents, kept): (Vec<Shape>, Vec<Shape>) = std::mem::take(&mut self.shapes)
            .into_iter()
            .partition(|s| s.references(id));
        self.shapes = kept;
        if !dependents.is_empty() {
            log::debug!("Removing {} connectors attached to {id}", dependents.len());
        }
        removed.extend(dependents);
        for shape in &removed {
            self.selection.remove(&shape.id());
        }
        removed
    }

    pub fn clear(&mut self) {
        self.shapes.clear();
        self.selection.clear();
    }

    pub fn shape(&self, id: ShapeId) -> Option<&Shape> {
        self.shapes.iter().find(|s| s.id() == id)
    }

    pub fn shape_mut(&mut self, id: ShapeId) -> Option<&mut Shape> {
        self.shapes.iter_mut().find(|s| s.id() == id)
    }

    /// Raise a shape above every other shape.
    ///
    /// Hit testing and culling order by z-index first, so the shape gets a
    /// z-index one above the current maximum as well as the last slot.
    pub fn bring_to_front(&mut self, id: ShapeId) {
        let top = self
            .shapes
            .iter()
            .filter(|s| s.id() != id)
            .map(|s| s.z_index())
            .max();
        if let Some(pos) = self.shapes.iter().position(|s| s.id() == id) {
            let mut shape = self.shapes.remove(pos);
            if let Some(top) = top {
                shape.common_mut().z_index = top.saturating_add(1);
            }
            self.shapes.push(shape);
        }
    }

    /// Lower a shape below every other shape.
    pub fn send_to_back(&mut self, id: ShapeId) {
        let bottom = self
            .shapes
            .iter()
            .filter(|s| s.id() != id)
            .map(|s| s.z_index())
            .min();
        if let Some(pos) = self.shapes.iter().position(|s| s.id() == id) {
            let mut shape = self.shapes.remove(pos);
            if let Some(bottom) = bottom {
                shape.common_mut().z_index = bottom.saturating_sub(1);
            }
            self.shapes.insert(0, shape);
        }
    }

    /// Union of all resolvable shape bounds.
    pub fn bounds(&self) -> Option<Rect> {
        let index = ShapeIndex::new(&self.shapes);
        self.shapes
            .iter()
            .filter_map(|s| s.bounds(&index))
            .reduce(|a, b| a.union(b))
    }

    /// Last viewport reported through [`DocumentHost::apply_viewport`].
    pub fn viewport_patch(&self) -> ViewportPatch {
        self.viewport
    }

    pub fn is_empty(&self) -> bool {
        self.shapes.is_empty()
    }

    pub fn len(&self) -> usize {
        self.shapes.len()
    }

    /// Recompute connector bounds after their endpoints moved.
    fn refresh_connectors(&mut self) {
        let index = ShapeIndex::new(&self.shapes);
        let refreshed: Vec<(usize, Rect)> = self
            .shapes
            .iter()
            .enumerate()
            .filter_map(|(i, s)| {
                let path = s.as_connector()?.resolve(&index)?;
                Some((i, path.bounds()))
            })
            .collect();
        for (i, bounds) in refreshed {
            let common = self.shapes[i].common_mut();
            common.position = bounds.origin();
            common.size = bounds.size();
        }
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}

impl DocumentHost for CanvasDocument {
    fn shapes(&self) -> &[Shape] {
        &self.shapes
    }

    fn selection(&self) -> HashSet<ShapeId> {
        self.selection.clone()
    }

    fn apply_drag(&mut self, ids: &[ShapeId], delta: Vec2) {
        for shape in self.shapes.iter_mut() {
            if ids.contains(&shape.id()) && !shape.is_locked() {
                shape.translate(delta);
            }
        }
        self.refresh_connectors();
    }

    fn apply_transform(&mut self, id: ShapeId, rect: Rect, rotation: f64) {
        let Some(Shape::Note(note)) = self.shape_mut(id) else {
            log::debug!("Ignoring transform of non-note {id}");
            return;
        };
        note.base.position = rect.origin();
        note.base.size = rect.size();
        note.base.rotation = rotation;
        self.refresh_connectors();
    }

    fn apply_viewport(&mut self, patch: &ViewportPatch) {
        self.viewport = *patch;
    }

    fn request_delete(&mut self, ids: &[ShapeId]) {
        if ids.is_empty() {
            return;
        }
        self.push_undo();
        for &id in ids {
            self.remove_shape(id);
        }
    }

    fn request_selection_change(&mut self, ids: &[ShapeId]) {
        self.selection = ids
            .iter()
            .copied()
            .filter(|id| self.shapes.iter().any(|s| s.id() == *id))
            .collect();
    }
}
