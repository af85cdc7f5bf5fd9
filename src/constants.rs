//! Global constants for the annotation editor.

use std::time::Duration;

/// Pixels reserved around the fitted image inside the viewport.
pub const FIT_MARGIN: f32 = 20.0;

/// Screen-space distance within which a pointer grabs a resize handle.
pub const HANDLE_HIT_RADIUS: f32 = 8.0;

/// Radius of the resize handle circles drawn on the selected rectangle.
pub const HANDLE_DRAW_RADIUS: f32 = 6.0;

/// A drawn rectangle must be strictly larger than this (image pixels) on both axes.
pub const MIN_RECT_SIZE: f32 = 5.0;

/// Minimum number of vertices required for a valid polygon.
pub const MIN_POLYGON_VERTICES: usize = 3;

/// Radius of the vertex dots drawn on an in-progress shape.
pub const DRAFT_VERTEX_RADIUS: f32 = 4.0;

/// Class labels are drawn this many pixels above the first point.
pub const LABEL_OFFSET: f32 = 5.0;

/// Class label text size.
pub const LABEL_SIZE: f32 = 14.0;

/// Alpha used for annotation fills (0x40).
pub const FILL_ALPHA: u8 = 0x40;

/// Stroke widths for committed annotations.
pub mod stroke {
    pub const NORMAL: f32 = 2.0;
    pub const SELECTED: f32 = 3.0;
    pub const DRAFT: f32 = 2.0;
    pub const HANDLE: f32 = 1.0;
}

/// Color used for annotations whose class no longer exists, for selection and drafts.
pub const DEFAULT_CLASS_COLOR: &str = "#ff0000";

/// Class created when a dataset has no class list yet.
pub const DEFAULT_CLASS_NAME: &str = "person";

/// Color of [`DEFAULT_CLASS_NAME`].
pub const DEFAULT_CLASS_SWATCH: &str = "#3aa757";

/// Coalescing window for the secondary annotation-list refresh.
pub const LIST_REFRESH_INTERVAL: Duration = Duration::from_millis(100);
