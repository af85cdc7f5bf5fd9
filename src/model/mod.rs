//! Data models for the annotation editor.

mod annotation;
mod class;
mod image;

pub use annotation::{
    Annotation, AnnotationId, AnnotationKind, Edges, Point, ResizeHandle, is_drawable_rectangle,
    rectangle_corners,
};
pub use class::{ClassEntry, ClassError, ClassList, default_classes};
pub use image::{ImageEntry, ImageList};
