//! Annotation geometry and the in-place mutations applied by the editor.
//!
//! All coordinates are image pixels. Rectangles are stored as four corners in
//! the fixed order top-left, top-right, bottom-right, bottom-left so that
//! `points[0]` and `points[2]` are always the min/max diagonal.

use serde::{Deserialize, Serialize};

use crate::constants::{MIN_POLYGON_VERTICES, MIN_RECT_SIZE};

/// Unique identifier for an annotation.
pub type AnnotationId = u64;

/// A 2D point. Serialized as `[x, y]`.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(from = "[f32; 2]", into = "[f32; 2]")]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

impl Point {
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    /// Calculate distance to another point.
    pub fn distance_to(&self, other: &Point) -> f32 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        (dx * dx + dy * dy).sqrt()
    }

    /// Midpoint between two points.
    pub fn midpoint(&self, other: &Point) -> Point {
        Point::new((self.x + other.x) / 2.0, (self.y + other.y) / 2.0)
    }
}

impl From<[f32; 2]> for Point {
    fn from([x, y]: [f32; 2]) -> Self {
        Self { x, y }
    }
}

impl From<Point> for [f32; 2] {
    fn from(p: Point) -> Self {
        [p.x, p.y]
    }
}

/// Annotation variant tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AnnotationKind {
    Rectangle,
    Polygon,
}

impl AnnotationKind {
    /// Get the display name for this kind.
    pub fn name(&self) -> &'static str {
        match self {
            AnnotationKind::Rectangle => "rectangle",
            AnnotationKind::Polygon => "polygon",
        }
    }
}

/// One of the eight resize handles of a rectangle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResizeHandle {
    Nw,
    N,
    Ne,
    E,
    Se,
    S,
    Sw,
    W,
}

/// Which rectangle edges a handle drags.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Edges {
    pub left: bool,
    pub top: bool,
    pub right: bool,
    pub bottom: bool,
}

impl ResizeHandle {
    /// All handles in hit-test and draw order.
    pub const ALL: [ResizeHandle; 8] = [
        ResizeHandle::Nw,
        ResizeHandle::N,
        ResizeHandle::Ne,
        ResizeHandle::E,
        ResizeHandle::Se,
        ResizeHandle::S,
        ResizeHandle::Sw,
        ResizeHandle::W,
    ];

    /// Edges moved by this handle.
    pub fn edges(&self) -> Edges {
        let (left, top, right, bottom) = match self {
            ResizeHandle::Nw => (true, true, false, false),
            ResizeHandle::N => (false, true, false, false),
            ResizeHandle::Ne => (false, true, true, false),
            ResizeHandle::E => (false, false, true, false),
            ResizeHandle::Se => (false, false, true, true),
            ResizeHandle::S => (false, false, false, true),
            ResizeHandle::Sw => (true, false, false, true),
            ResizeHandle::W => (true, false, false, false),
        };
        Edges {
            left,
            top,
            right,
            bottom,
        }
    }

    /// Position of this handle on the rectangle spanned by `min`/`max`.
    pub fn position(&self, min: Point, max: Point) -> Point {
        let mid = min.midpoint(&max);
        match self {
            ResizeHandle::Nw => min,
            ResizeHandle::N => Point::new(mid.x, min.y),
            ResizeHandle::Ne => Point::new(max.x, min.y),
            ResizeHandle::E => Point::new(max.x, mid.y),
            ResizeHandle::Se => max,
            ResizeHandle::S => Point::new(mid.x, max.y),
            ResizeHandle::Sw => Point::new(min.x, max.y),
            ResizeHandle::W => Point::new(min.x, mid.y),
        }
    }
}

/// Corners of a rectangle in storage order, normalized so that the first is the minimum.
pub fn rectangle_corners(a: Point, b: Point) -> Vec<Point> {
    let (x1, x2) = (a.x.min(b.x), a.x.max(b.x));
    let (y1, y2) = (a.y.min(b.y), a.y.max(b.y));
    vec![
        Point::new(x1, y1),
        Point::new(x2, y1),
        Point::new(x2, y2),
        Point::new(x1, y2),
    ]
}

/// Whether a drag from `a` to `b` is large enough to become a rectangle.
pub fn is_drawable_rectangle(a: Point, b: Point) -> bool {
    (b.x - a.x).abs() > MIN_RECT_SIZE && (b.y - a.y).abs() > MIN_RECT_SIZE
}

/// A single labeled shape on an image.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Annotation {
    /// Unique identifier, monotonic by creation time.
    pub id: AnnotationId,
    /// Name of the class. Bound by name only: renaming or deleting the class
    /// leaves this value untouched.
    #[serde(rename = "class")]
    pub class_name: String,
    /// Image-space points.
    pub points: Vec<Point>,
    /// Rectangle or polygon.
    #[serde(rename = "type")]
    pub kind: AnnotationKind,
}

impl Annotation {
    /// Create a rectangle from two opposite corners in any order.
    pub fn rectangle(id: AnnotationId, class_name: impl Into<String>, a: Point, b: Point) -> Self {
        Self {
            id,
            class_name: class_name.into(),
            points: rectangle_corners(a, b),
            kind: AnnotationKind::Rectangle,
        }
    }

    /// Create a polygon from its vertices in click order.
    pub fn polygon(id: AnnotationId, class_name: impl Into<String>, vertices: Vec<Point>) -> Self {
        Self {
            id,
            class_name: class_name.into(),
            points: vertices,
            kind: AnnotationKind::Polygon,
        }
    }

    /// Whether this is a rectangle with its full set of corners.
    pub fn is_rectangle(&self) -> bool {
        self.kind == AnnotationKind::Rectangle && self.points.len() >= 4
    }

    /// Diagonal corners (`points[0]`, `points[2]`) of a rectangle.
    pub fn diagonal(&self) -> Option<(Point, Point)> {
        if !self.is_rectangle() {
            return None;
        }
        Some((self.points[0], self.points[2]))
    }

    /// Whether the geometry satisfies the invariants of its kind.
    pub fn is_valid(&self) -> bool {
        match self.kind {
            AnnotationKind::Rectangle => {
                self.points.len() == 4
                    && self.points[0].x <= self.points[2].x
                    && self.points[0].y <= self.points[2].y
            }
            AnnotationKind::Polygon => self.points.len() >= MIN_POLYGON_VERTICES,
        }
    }

    /// Translate every point by an image-space delta.
    pub fn translate(&mut self, dx: f32, dy: f32) {
        for p in &mut self.points {
            p.x += dx;
            p.y += dy;
        }
    }

    /// Move the edges selected by `handle` by an image-space delta.
    ///
    /// The stored diagonal is re-normalized afterwards, so dragging an edge
    /// past its opposite swaps them instead of inverting the rectangle.
    /// Returns false (and does nothing) for polygons.
    pub fn resize(&mut self, handle: ResizeHandle, dx: f32, dy: f32) -> bool {
        let Some((min, max)) = self.diagonal() else {
            return false;
        };
        let (mut x1, mut y1, mut x2, mut y2) = (min.x, min.y, max.x, max.y);

        let edges = handle.edges();
        if edges.left {
            x1 += dx;
        }
        if edges.right {
            x2 += dx;
        }
        if edges.top {
            y1 += dy;
        }
        if edges.bottom {
            y2 += dy;
        }

        self.points = rectangle_corners(Point::new(x1, y1), Point::new(x2, y2));
        true
    }
}
