//! Persistence: storage backends and the worker thread that drives them.

mod backend;
mod bridge;
mod error;

pub use backend::{
    ANNOTATIONS_DIR, ANNOTATIONS_FILE, AnnotationBackend, CLASSES_FILE, FailureFlags, FolderBackend,
    MemoryBackend,
};
pub use bridge::{BridgeRequest, BridgeResponse, PersistenceBridge};
pub use error::PersistenceError;
