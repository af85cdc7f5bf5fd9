//! Display-list renderer.
//!
//! Rendering is a pure read of the editor state: [`render`] turns a
//! [`FrameInput`] into a [`Frame`] of [`DrawCommand`]s in canvas coordinates
//! that the host paints in order. Nothing is cached between frames, so it is
//! safe to call after every mutation and on every viewport resize.

use crate::color_utils::{Color, class_color};
use crate::constants::{
    DRAFT_VERTEX_RADIUS, FILL_ALPHA, HANDLE_DRAW_RADIUS, LABEL_OFFSET, LABEL_SIZE, stroke,
};
use crate::editor::Session;
use crate::hit_test::handle_positions;
use crate::model::{Annotation, AnnotationId, AnnotationKind, ClassList, Point, rectangle_corners};
use crate::view_math::{Size, ViewTransform};

/// Outline style.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Stroke {
    pub color: Color,
    pub width: f32,
}

impl Stroke {
    pub fn new(color: Color, width: f32) -> Self {
        Self { color, width }
    }
}

/// A single drawing primitive in canvas coordinates.
#[derive(Debug, Clone, PartialEq)]
pub enum DrawCommand {
    /// Clear the whole canvas.
    Clear { width: f32, height: f32 },
    /// Draw the named image scaled into `origin`/`size`.
    Image {
        name: String,
        origin: Point,
        size: Size,
    },
    /// Polyline through `points`, closed back to the first point if `closed`.
    Path {
        points: Vec<Point>,
        closed: bool,
        fill: Option<Color>,
        stroke: Option<Stroke>,
    },
    Circle {
        center: Point,
        radius: f32,
        fill: Option<Color>,
        stroke: Option<Stroke>,
    },
    Text {
        text: String,
        position: Point,
        color: Color,
        size: f32,
    },
}

/// Everything the renderer reads for one frame.
pub struct FrameInput<'a> {
    /// Live canvas size.
    pub viewport: Size,
    /// Fit margin in canvas pixels.
    pub margin: f32,
    /// Current image name and natural size, None until known.
    pub image: Option<(&'a str, Size)>,
    pub annotations: &'a [Annotation],
    pub classes: &'a ClassList,
    pub selected: Option<AnnotationId>,
    pub session: &'a Session,
}

/// Output of one render pass.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Frame {
    pub commands: Vec<DrawCommand>,
    /// Transform used for this frame, None if only the clear was drawn.
    pub transform: Option<ViewTransform>,
}

impl Frame {
    /// Number of commands of a kind, for diagnostics.
    pub fn count(&self, pred: impl Fn(&DrawCommand) -> bool) -> usize {
        self.commands.iter().filter(|c| pred(c)).count()
    }
}

/// Accumulates draw commands for a frame.
#[derive(Debug, Default)]
pub struct Renderer {
    draw_commands: Vec<DrawCommand>,
}

impl Renderer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn clear(&mut self, size: Size) {
        self.draw_commands.push(DrawCommand::Clear {
            width: size.width,
            height: size.height,
        });
    }

    pub fn draw_image(&mut self, name: &str, origin: Point, size: Size) {
        self.draw_commands.push(DrawCommand::Image {
            name: name.to_string(),
            origin,
            size,
        });
    }

    pub fn draw_path(&mut self, points: Vec<Point>, closed: bool, fill: Option<Color>, stroke: Option<Stroke>) {
        self.draw_commands.push(DrawCommand::Path {
            points,
            closed,
            fill,
            stroke,
        });
    }

    pub fn draw_circle(&mut self, center: Point, radius: f32, fill: Option<Color>, stroke: Option<Stroke>) {
        self.draw_commands.push(DrawCommand::Circle {
            center,
            radius,
            fill,
            stroke,
        });
    }

    /// Draw text.
    pub fn draw_text(&mut self, text: &str, position: Point, color: Color, size: f32) {
        self.draw_commands.push(DrawCommand::Text {
            text: text.to_string(),
            position,
            color,
            size,
        });
    }

    /// Take the accumulated commands.
    pub fn finish(&mut self) -> Vec<DrawCommand> {
        std::mem::take(&mut self.draw_commands)
    }

    fn draw_annotation(&mut self, ann: &Annotation, color: Color, selected: bool, t: &ViewTransform) {
        let Some(first) = ann.points.first() else {
            return;
        };
        let points: Vec<Point> = ann.points.iter().map(|p| t.to_screen(*p)).collect();
        let closed = ann.kind == AnnotationKind::Rectangle || points.len() > 2;
        let fill = closed.then(|| color.with_alpha(FILL_ALPHA));
        let outline = if selected {
            Stroke::new(Color::RED, stroke::SELECTED)
        } else {
            Stroke::new(color, stroke::NORMAL)
        };
        self.draw_path(points, closed, fill, Some(outline));

        let anchor = t.to_screen(*first);
        self.draw_text(
            &ann.class_name,
            Point::new(anchor.x, anchor.y - LABEL_OFFSET),
            outline.color,
            LABEL_SIZE,
        );

        if !selected {
            return;
        }
        if let Some(handles) = handle_positions(ann, t) {
            for (_, center) in handles {
                self.draw_circle(
                    center,
                    HANDLE_DRAW_RADIUS,
                    Some(Color::WHITE),
                    Some(Stroke::new(Color::RED, stroke::HANDLE)),
                );
            }
        }
    }

    fn draw_draft(&mut self, session: &Session, t: &ViewTransform) {
        let draft_stroke = Some(Stroke::new(Color::RED, stroke::DRAFT));
        match session {
            Session::DrawingRect { start, current } => {
                let corners = rectangle_corners(*start, *current)
                    .into_iter()
                    .map(|p| t.to_screen(p))
                    .collect();
                self.draw_path(corners, true, None, draft_stroke);
                for p in [start, current] {
                    self.draw_circle(t.to_screen(*p), DRAFT_VERTEX_RADIUS, Some(Color::RED), None);
                }
            }
            Session::DrawingPolygon { vertices, cursor } => {
                let mut points: Vec<Point> = vertices.iter().map(|p| t.to_screen(*p)).collect();
                // Live segment from the last vertex to the pointer
                if let Some(cursor) = cursor {
                    points.push(t.to_screen(*cursor));
                }
                self.draw_path(points, false, None, draft_stroke);
                for v in vertices {
                    self.draw_circle(t.to_screen(*v), DRAFT_VERTEX_RADIUS, Some(Color::RED), None);
                }
            }
            _ => {}
        }
    }
}

/// Build the display list for one frame.
///
/// If the image size is unknown or the transform would be degenerate, the
/// frame holds only the clear command.
pub fn render(input: &FrameInput<'_>) -> Frame {
    let mut renderer = Renderer::new();
    renderer.clear(input.viewport);

    let Some((name, image_size)) = input.image else {
        return Frame {
            commands: renderer.finish(),
            transform: None,
        };
    };
    let Some(t) = ViewTransform::fit(image_size, input.viewport, input.margin) else {
        log::trace!("Skipping frame, no valid transform for {}", name);
        return Frame {
            commands: renderer.finish(),
            transform: None,
        };
    };

    let (origin, size) = t.image_rect(image_size);
    renderer.draw_image(name, origin, size);

    for ann in input.annotations {
        let color = class_color(input.classes.color_of(&ann.class_name));
        renderer.draw_annotation(ann, color, input.selected == Some(ann.id), &t);
    }
    renderer.draw_draft(input.session, &t);

    Frame {
        commands: renderer.finish(),
        transform: Some(t),
    }
}
