//! Zoom-to-fit mathematics.
//!
//! Maps between image pixel coordinates and canvas coordinates. The
//! transform is derived from the live viewport size and the image's natural
//! size on every frame and is never cached, so resizing the viewport needs no
//! explicit invalidation.

use crate::model::Point;

/// Width/height pair in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Size {
    pub width: f32,
    pub height: f32,
}

impl Size {
    pub fn new(width: f32, height: f32) -> Self {
        Self { width, height }
    }

    /// Both dimensions are finite and strictly positive.
    pub fn is_positive(&self) -> bool {
        self.width.is_finite() && self.height.is_finite() && self.width > 0.0 && self.height > 0.0
    }
}

/// Uniform scale plus centering offset from image space to canvas space.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ViewTransform {
    pub ratio: f32,
    pub offset_x: f32,
    pub offset_y: f32,
}

impl ViewTransform {
    /// Create a transform. Returns None unless `ratio` is finite and positive.
    pub fn new(ratio: f32, offset_x: f32, offset_y: f32) -> Option<Self> {
        if !(ratio.is_finite() && ratio > 0.0 && offset_x.is_finite() && offset_y.is_finite()) {
            return None;
        }
        Some(Self {
            ratio,
            offset_x,
            offset_y,
        })
    }

    /// Identity transform (ratio 1, no offset).
    pub fn identity() -> Self {
        Self {
            ratio: 1.0,
            offset_x: 0.0,
            offset_y: 0.0,
        }
    }

    /// Fit `image` inside `viewport` minus `margin`, centered.
    ///
    /// Returns None for zero-sized images or viewports too small to hold
    /// anything; callers skip drawing and hit-testing for that frame.
    pub fn fit(image: Size, viewport: Size, margin: f32) -> Option<Self> {
        if !image.is_positive() || !viewport.is_positive() {
            return None;
        }
        let max_width = viewport.width - margin;
        let max_height = viewport.height - margin;
        let ratio = (max_width / image.width).min(max_height / image.height);
        let offset_x = (viewport.width - image.width * ratio) / 2.0;
        let offset_y = (viewport.height - image.height * ratio) / 2.0;
        Self::new(ratio, offset_x, offset_y)
    }

    /// Image space to canvas space.
    pub fn to_screen(&self, p: Point) -> Point {
        Point::new(p.x * self.ratio + self.offset_x, p.y * self.ratio + self.offset_y)
    }

    /// Canvas space to image space.
    pub fn to_image(&self, p: Point) -> Point {
        Point::new(
            (p.x - self.offset_x) / self.ratio,
            (p.y - self.offset_y) / self.ratio,
        )
    }

    /// Convert a canvas-space delta to image space.
    pub fn delta_to_image(&self, dx: f32, dy: f32) -> (f32, f32) {
        (dx / self.ratio, dy / self.ratio)
    }

    /// Canvas rectangle `(origin, size)` covered by an image of the given size.
    pub fn image_rect(&self, image: Size) -> (Point, Size) {
        (
            Point::new(self.offset_x, self.offset_y),
            Size::new(image.width * self.ratio, image.height * self.ratio),
        )
    }
}

/// Free-function form of [`ViewTransform::to_screen`].
pub fn to_screen(p: Point, ratio: f32, offset_x: f32, offset_y: f32) -> Point {
    Point::new(p.x * ratio + offset_x, p.y * ratio + offset_y)
}

/// Free-function form of [`ViewTransform::to_image`].
pub fn to_image(p: Point, ratio: f32, offset_x: f32, offset_y: f32) -> Point {
    Point::new((p.x - offset_x) / ratio, (p.y - offset_y) / ratio)
}

/// Free-function form of [`ViewTransform::fit`].
pub fn compute_fit(image: Size, viewport: Size, margin: f32) -> Option<ViewTransform> {
    ViewTransform::fit(image, viewport, margin)
}
