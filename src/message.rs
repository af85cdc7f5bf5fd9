//! Events flowing out of the editor.
//!
//! The editor never talks to persistence or the host UI directly. Each
//! mutation pushes one or more [`EditorEvent`]s onto an outbound queue; the
//! application drains it and routes redraws, list refreshes and saves to
//! their own consumers.

use crate::model::AnnotationId;

/// Why the store was committed to persistence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommitReason {
    Created(AnnotationId),
    Resized(AnnotationId),
    Moved(AnnotationId),
    Deleted(AnnotationId),
    Cleared,
}

/// Outbound notifications from the editor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditorEvent {
    /// Canvas needs to be repainted. Never throttled.
    Redraw,
    /// The annotation list (selection or contents) changed. Coalesced by the consumer.
    ListChanged,
    /// A gesture or list action completed; the whole store must be saved.
    Commit(CommitReason),
}

/// Tool selected in the toolbar.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Tool {
    /// Draw rectangles by dragging
    #[default]
    Rect,
    /// Draw polygons by clicking vertices, finish with a double-click
    Polygon,
    /// Only select, move and resize
    Move,
}

impl Tool {
    /// Get the display name for this tool.
    pub fn name(&self) -> &'static str {
        match self {
            Tool::Rect => "Rectangle",
            Tool::Polygon => "Polygon",
            Tool::Move => "Move",
        }
    }

    /// Get all available tools.
    pub fn all() -> &'static [Tool] {
        &[Tool::Rect, Tool::Polygon, Tool::Move]
    }

    /// Look up a tool by display name, case-insensitive. `rect` is accepted too.
    pub fn from_name(name: &str) -> Option<Tool> {
        if name.eq_ignore_ascii_case("rect") {
            return Some(Tool::Rect);
        }
        Tool::all().iter().copied().find(|t| t.name().eq_ignore_ascii_case(name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tool_from_name() {
        assert_eq!(Tool::from_name("rect"), Some(Tool::Rect));
        assert_eq!(Tool::from_name("Rectangle"), Some(Tool::Rect));
        assert_eq!(Tool::from_name("POLYGON"), Some(Tool::Polygon));
        assert_eq!(Tool::from_name("move"), Some(Tool::Move));
        assert_eq!(Tool::from_name("lasso"), None);
    }
}
