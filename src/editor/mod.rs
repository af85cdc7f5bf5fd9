//! The interaction state machine.
//!
//! The [`Editor`] consumes pointer events in canvas coordinates, resolves
//! them with the hit-test engine and the live [`ViewTransform`], mutates the
//! [`AnnotationStore`] and queues [`EditorEvent`]s for the application to
//! route. Geometry is always mutated in image space.
//!
//! While a gesture is active the editor is the only writer of the store;
//! list actions ([`Editor::delete_at`], [`Editor::clear`]) finish the gesture
//! before touching it.

mod pointer;
mod session;


pub use session::Session;

use crate::message::{CommitReason, EditorEvent, Tool};
use crate::model::AnnotationId;
use crate::store::AnnotationStore;
use crate::view_math::ViewTransform;

/// Everything a pointer handler needs besides the editor itself.
pub struct EditContext<'a> {
    /// Annotations of the current image.
    pub store: &'a mut AnnotationStore,
    /// Transform for this frame, None while the image is unavailable.
    pub transform: Option<ViewTransform>,
    /// Class assigned to newly drawn shapes. Drawing without one produces nothing.
    pub active_class: Option<&'a str>,
}

/// Editing mode, selection and the outbound event queue.
#[derive(Debug, Default)]
pub struct Editor {
    tool: Tool,
    session: Session,
    selected: Option<AnnotationId>,
    events: Vec<EditorEvent>,
}

impl Editor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn tool(&self) -> Tool {
        self.tool
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn selected(&self) -> Option<AnnotationId> {
        self.selected
    }

    /// Drain queued events, oldest first.
    pub fn take_events(&mut self) -> Vec<EditorEvent> {
        std::mem::take(&mut self.events)
    }

    fn emit(&mut self, event: EditorEvent) {
        self.events.push(event);
    }

    fn set_selected(&mut self, id: Option<AnnotationId>) {
        if self.selected != id {
            log::debug!("Selection: {:?} -> {:?}", self.selected, id);
            self.selected = id;
            self.emit(EditorEvent::ListChanged);
        }
    }

    /// Switch tools. Any draft is discarded; a drag in progress is committed.
    pub fn set_tool(&mut self, tool: Tool, store: &AnnotationStore) {
        self.finish_gesture(store);
        if self.tool != tool {
            log::info!("Tool: {} -> {}", self.tool.name(), tool.name());
        }
        self.tool = tool;
        self.emit(EditorEvent::Redraw);
    }

    /// End whatever gesture is active: drafts are dropped, drags are committed.
    pub fn finish_gesture(&mut self, store: &AnnotationStore) {
        let session = std::mem::take(&mut self.session);
        match session {
            Session::Idle => {}
            Session::DrawingRect { .. } | Session::DrawingPolygon { .. } => {
                log::debug!("Discarded {} draft", session.name());
                self.emit(EditorEvent::Redraw);
            }
            Session::Resizing { annotation_id, .. } => {
                self.commit_if_present(store, annotation_id, CommitReason::Resized(annotation_id));
            }
            Session::Moving { annotation_id, .. } => {
                self.commit_if_present(store, annotation_id, CommitReason::Moved(annotation_id));
            }
        }
    }

    /// Forget the session and selection, e.g. when another image is opened.
    pub fn reset(&mut self) {
        if !self.session.is_idle() {
            log::debug!("Reset dropped {} session", self.session.name());
        }
        self.session = Session::Idle;
        self.selected = None;
        self.emit(EditorEvent::ListChanged);
        self.emit(EditorEvent::Redraw);
    }

    /// Select an annotation from the list (or clear the selection).
    ///
    /// Unknown ids clear the selection.
    pub fn select(&mut self, id: Option<AnnotationId>, store: &AnnotationStore) {
        self.finish_gesture(store);
        let id = id.filter(|id| store.get(*id).is_some());
        self.set_selected(id);
        self.emit(EditorEvent::Redraw);
    }

    /// Delete the annotation at a list index. Returns false if the index is out of range.
    pub fn delete_at(&mut self, index: usize, store: &mut AnnotationStore) -> bool {
        self.finish_gesture(store);
        let Some(removed) = store.remove_at(index) else {
            log::warn!("Delete: no annotation at index {}", index);
            return false;
        };
        log::info!("Deleted annotation {} ({} left)", removed.id, store.len());
        if self.selected == Some(removed.id) {
            self.selected = None;
        }
        self.emit(EditorEvent::ListChanged);
        self.emit(EditorEvent::Redraw);
        self.emit(EditorEvent::Commit(CommitReason::Deleted(removed.id)));
        true
    }

    /// Remove every annotation of the image. Returns false if there was nothing to clear.
    pub fn clear(&mut self, store: &mut AnnotationStore) -> bool {
        self.finish_gesture(store);
        if store.is_empty() {
            return false;
        }
        log::info!("Cleared {} annotations", store.len());
        store.clear();
        self.selected = None;
        self.emit(EditorEvent::ListChanged);
        self.emit(EditorEvent::Redraw);
        self.emit(EditorEvent::Commit(CommitReason::Cleared));
        true
    }

    fn commit_if_present(&mut self, store: &AnnotationStore, id: AnnotationId, reason: CommitReason) {
        if store.get(id).is_some() {
            log::info!("Commit: {:?}", reason);
            self.emit(EditorEvent::Commit(reason));
        } else {
            log::debug!("Commit skipped, annotation {} no longer exists", id);
        }
        self.emit(EditorEvent::ListChanged);
        self.emit(EditorEvent::Redraw);
    }
}
