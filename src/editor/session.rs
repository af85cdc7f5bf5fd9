//! Interaction session state.
//!
//! One tagged union holds everything a gesture needs. Handlers take the
//! current value out of the editor, match on it and put back the next state,
//! so no partial state from one mode can leak into another.

use crate::model::{AnnotationId, Point, ResizeHandle};

/// The editor's current interaction mode and its draft data.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Session {
    /// Waiting for a pointer-down.
    #[default]
    Idle,
    /// Dragging out a rectangle; both corners are image coordinates.
    DrawingRect { start: Point, current: Point },
    /// Placing polygon vertices (image coordinates) with a live cursor.
    DrawingPolygon {
        vertices: Vec<Point>,
        cursor: Option<Point>,
    },
    /// Dragging a resize handle. `last` is the previous pointer position in screen space.
    Resizing {
        annotation_id: AnnotationId,
        handle: ResizeHandle,
        last: Point,
    },
    /// Dragging a whole annotation. `last` is in screen space.
    Moving {
        annotation_id: AnnotationId,
        last: Point,
    },
}

impl Session {
    /// Short name for logging.
    pub fn name(&self) -> &'static str {
        match self {
            Session::Idle => "Idle",
            Session::DrawingRect { .. } => "DrawingRect",
            Session::DrawingPolygon { .. } => "DrawingPolygon",
            Session::Resizing { .. } => "Resizing",
            Session::Moving { .. } => "Moving",
        }
    }

    pub fn is_idle(&self) -> bool {
        matches!(self, Session::Idle)
    }

    /// An existing annotation is being resized or moved.
    pub fn is_dragging(&self) -> bool {
        matches!(self, Session::Resizing { .. } | Session::Moving { .. })
    }

    /// Placed polygon vertices, if drawing a polygon.
    pub fn polygon_vertices(&self) -> Option<&[Point]> {
        match self {
            Session::DrawingPolygon { vertices, .. } => Some(vertices),
            _ => None,
        }
    }
}
