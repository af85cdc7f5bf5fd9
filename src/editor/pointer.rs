//! Pointer event handlers.

use super::{EditContext, Editor, Session};
use crate::constants::MIN_POLYGON_VERTICES;
use crate::hit_test::{self, HitTarget};
use crate::message::{CommitReason, EditorEvent, Tool};
use crate::model::{Annotation, Point, is_drawable_rectangle};
use crate::store::AnnotationStore;
use crate::view_math::ViewTransform;

impl Editor {
    /// Handle a pointer press at a canvas position.
    pub fn pointer_down(&mut self, screen: Point, ctx: &mut EditContext<'_>) {
        let Some(transform) = ctx.transform else {
            log::trace!("pointer_down ignored, no valid transform");
            return;
        };

        match std::mem::take(&mut self.session) {
            Session::DrawingPolygon { mut vertices, .. } => {
                let p = transform.to_image(screen);
                vertices.push(p);
                log::trace!("Polygon vertex {} at ({:.1}, {:.1})", vertices.len(), p.x, p.y);
                self.session = Session::DrawingPolygon {
                    vertices,
                    cursor: Some(p),
                };
                self.emit(EditorEvent::Redraw);
            }
            Session::Idle => self.begin_gesture(screen, &transform, ctx.store),
            stale => {
                // A press without a matching release: close the old gesture first
                log::debug!("pointer_down while {}, finishing it", stale.name());
                self.session = stale;
                self.finish_gesture(ctx.store);
                self.begin_gesture(screen, &transform, ctx.store);
            }
        }
    }

    fn begin_gesture(&mut self, screen: Point, transform: &ViewTransform, store: &AnnotationStore) {
        match hit_test::resolve(screen, store.as_slice(), transform) {
            HitTarget::Handle(hit) => {
                log::debug!("Resize {:?} handle of annotation {}", hit.handle, hit.annotation_id);
                self.set_selected(Some(hit.annotation_id));
                self.session = Session::Resizing {
                    annotation_id: hit.annotation_id,
                    handle: hit.handle,
                    last: screen,
                };
            }
            HitTarget::Body(id) => {
                log::debug!("Move annotation {}", id);
                self.set_selected(Some(id));
                self.session = Session::Moving {
                    annotation_id: id,
                    last: screen,
                };
            }
            HitTarget::Empty => {
                self.set_selected(None);
                let p = transform.to_image(screen);
                self.session = match self.tool {
                    Tool::Rect => Session::DrawingRect { start: p, current: p },
                    Tool::Polygon => Session::DrawingPolygon {
                        vertices: vec![p],
                        cursor: Some(p),
                    },
                    Tool::Move => Session::Idle,
                };
            }
        }
        self.emit(EditorEvent::Redraw);
    }

    /// Handle pointer motion. Drags mutate the store incrementally.
    pub fn pointer_move(&mut self, screen: Point, ctx: &mut EditContext<'_>) {
        let Some(transform) = ctx.transform else {
            return;
        };

        let (redraw, list_changed) = match &mut self.session {
            Session::Idle => (false, false),
            Session::DrawingRect { current, .. } => {
                *current = transform.to_image(screen);
                (true, false)
            }
            Session::DrawingPolygon { cursor, .. } => {
                *cursor = Some(transform.to_image(screen));
                (true, false)
            }
            Session::Resizing {
                annotation_id,
                handle,
                last,
            } => {
                let (dx, dy) = transform.delta_to_image(screen.x - last.x, screen.y - last.y);
                *last = screen;
                match ctx.store.get_mut(*annotation_id) {
                    Some(ann) => {
                        ann.resize(*handle, dx, dy);
                        (true, true)
                    }
                    None => {
                        log::debug!("Resize target {} is gone", annotation_id);
                        (false, false)
                    }
                }
            }
            Session::Moving { annotation_id, last } => {
                let (dx, dy) = transform.delta_to_image(screen.x - last.x, screen.y - last.y);
                *last = screen;
                match ctx.store.get_mut(*annotation_id) {
                    Some(ann) => {
                        ann.translate(dx, dy);
                        (true, true)
                    }
                    None => {
                        log::debug!("Move target {} is gone", annotation_id);
                        (false, false)
                    }
                }
            }
        };

        if redraw {
            self.emit(EditorEvent::Redraw);
        }
        if list_changed {
            self.emit(EditorEvent::ListChanged);
        }
    }

    /// Handle a pointer release.
    pub fn pointer_up(&mut self, screen: Point, ctx: &mut EditContext<'_>) {
        match std::mem::take(&mut self.session) {
            Session::DrawingRect { start, current } => {
                let end = ctx.transform.map_or(current, |t| t.to_image(screen));
                self.finish_rectangle(start, end, ctx);
                self.emit(EditorEvent::Redraw);
            }
            Session::Resizing { annotation_id, .. } => {
                self.commit_if_present(ctx.store, annotation_id, CommitReason::Resized(annotation_id));
            }
            Session::Moving { annotation_id, .. } => {
                self.commit_if_present(ctx.store, annotation_id, CommitReason::Moved(annotation_id));
            }
            // Polygons are finished by double-click only
            session @ Session::DrawingPolygon { .. } => self.session = session,
            Session::Idle => {}
        }
    }

    fn finish_rectangle(&mut self, start: Point, end: Point, ctx: &mut EditContext<'_>) {
        if !is_drawable_rectangle(start, end) {
            log::debug!(
                "Rectangle discarded, too small ({:.1} x {:.1})",
                (end.x - start.x).abs(),
                (end.y - start.y).abs()
            );
            return;
        }
        let Some(class_name) = ctx.active_class else {
            log::debug!("Rectangle discarded, no class selected");
            return;
        };
        let id = ctx.store.next_id();
        ctx.store.push(Annotation::rectangle(id, class_name, start, end));
        log::info!("Created rectangle {} ({})", id, class_name);
        self.emit(EditorEvent::ListChanged);
        self.emit(EditorEvent::Commit(CommitReason::Created(id)));
    }

    /// Handle a double-click: closes the polygon being drawn.
    ///
    /// The presses that make up the double-click have already appended their
    /// vertices, so consecutive duplicates are collapsed before counting.
    pub fn double_click(&mut self, _screen: Point, ctx: &mut EditContext<'_>) {
        if !matches!(self.session, Session::DrawingPolygon { .. }) {
            return;
        }
        let Session::DrawingPolygon { vertices: raw, cursor } = std::mem::take(&mut self.session) else {
            return;
        };

        // Counted on a collapsed copy; a rejected draft keeps its presses
        let mut vertices = raw.clone();
        vertices.dedup();
        if vertices.len() < MIN_POLYGON_VERTICES {
            log::debug!("Polygon needs {} vertices, has {}", MIN_POLYGON_VERTICES, vertices.len());
            self.session = Session::DrawingPolygon { vertices: raw, cursor };
            return;
        }

        match ctx.active_class {
            Some(class_name) => {
                let id = ctx.store.next_id();
                let count = vertices.len();
                ctx.store.push(Annotation::polygon(id, class_name, vertices));
                log::info!("Created polygon {} ({}, {} vertices)", id, class_name, count);
                self.emit(EditorEvent::ListChanged);
                self.emit(EditorEvent::Commit(CommitReason::Created(id)));
            }
            None => log::debug!("Polygon discarded, no class selected"),
        }
        self.emit(EditorEvent::Redraw);
    }

    /// The pointer left the canvas. Drafts are cancelled, drags are committed.
    pub fn pointer_leave(&mut self, store: &AnnotationStore) {
        if !self.session.is_idle() {
            log::debug!("Pointer left canvas during {}", self.session.name());
        }
        self.finish_gesture(store);
    }
}
