//! labelcanvas - rectangle and polygon image annotation editor
//!
//! A headless editor core: pointer input in canvas coordinates goes in,
//! annotation edits, save requests and draw-command frames come out. A host
//! (desktop shell, web canvas or the bundled replay binary) drives an
//! [`App`] and paints its [`Frame`]s.

pub mod app;
pub mod color_utils;
pub mod config;
pub mod constants;
pub mod editor;
pub mod hit_test;
pub mod image_cache;
pub mod keybindings;
pub mod list_sync;
pub mod message;
pub mod model;
pub mod persistence;
pub mod render;
pub mod store;
pub mod view_math;

pub use app::{App, Direction, Notification, TickOutcome};
pub use config::AppConfig;
pub use editor::{EditContext, Editor, Session};
pub use keybindings::{KeyBindings, KeyPress};
pub use message::{CommitReason, EditorEvent, Tool};
pub use model::{Annotation, AnnotationId, AnnotationKind, ClassEntry, ImageEntry, Point};
pub use persistence::{AnnotationBackend, FolderBackend, MemoryBackend, PersistenceError};
pub use render::{DrawCommand, Frame};
pub use store::AnnotationStore;
pub use view_math::{Size, ViewTransform};
