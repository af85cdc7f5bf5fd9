//! Storage backends for images, annotations and classes.
//!
//! The editor treats storage as an external collaborator: everything goes
//! through [`AnnotationBackend`], which the persistence bridge drives from
//! its worker thread. Saves are whole-image replacements.

use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use serde_json::Value;

use super::error::PersistenceError;
use crate::image_cache::is_image_file;
use crate::model::{Annotation, AnnotationKind, ClassEntry, ImageEntry, default_classes, rectangle_corners};

/// Directory inside a dataset that holds the JSON stores.
pub const ANNOTATIONS_DIR: &str = "annotations";
/// Image name to annotation list map.
pub const ANNOTATIONS_FILE: &str = "annotations.json";
/// Class list.
pub const CLASSES_FILE: &str = "classes.json";

/// Contract for the external store the editor loads from and saves to.
pub trait AnnotationBackend: Send {
    /// All images, in display/navigation order.
    fn list_images(&mut self) -> Result<Vec<ImageEntry>, PersistenceError>;

    /// Annotations of one image; empty if none were saved.
    fn load_annotations(&mut self, image: &str) -> Result<Vec<Annotation>, PersistenceError>;

    /// Replace the annotations of one image.
    fn save_annotations(&mut self, image: &str, annotations: &[Annotation]) -> Result<(), PersistenceError>;

    fn load_classes(&mut self) -> Result<Vec<ClassEntry>, PersistenceError>;

    /// Replace the class list.
    fn save_classes(&mut self, classes: &[ClassEntry]) -> Result<(), PersistenceError>;

    /// Encoded bytes of an image.
    fn load_image(&mut self, image: &str) -> Result<Vec<u8>, PersistenceError>;
}

/// A dataset folder: images at the top level, JSON stores under `annotations/`.
#[derive(Debug, Clone)]
pub struct FolderBackend {
    root: PathBuf,
}

impl FolderBackend {
    /// Open a dataset folder, creating the annotation directory if needed.
    pub fn open(root: impl Into<PathBuf>) -> Result<Self, PersistenceError> {
        let root = root.into();
        if !root.is_dir() {
            return Err(PersistenceError::Io(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                format!("Dataset folder {:?} does not exist", root),
            )));
        }
        fs::create_dir_all(root.join(ANNOTATIONS_DIR))?;
        log::info!("Opened dataset folder {:?}", root);
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn annotations_path(&self) -> PathBuf {
        self.root.join(ANNOTATIONS_DIR).join(ANNOTATIONS_FILE)
    }

    fn classes_path(&self) -> PathBuf {
        self.root.join(ANNOTATIONS_DIR).join(CLASSES_FILE)
    }

    /// Read the whole annotation map. Missing, empty or corrupt files read as empty.
    ///
    /// Entries are kept as raw JSON so one malformed image entry does not
    /// take down every other image.
    fn read_annotation_map(&self) -> BTreeMap<String, Value> {
        let path = self.annotations_path();
        let json = match fs::read_to_string(&path) {
            Ok(json) => json,
            Err(e) => {
                if e.kind() != std::io::ErrorKind::NotFound {
                    log::warn!("Failed to read {:?}: {}", path, e);
                }
                return BTreeMap::new();
            }
        };
        if json.trim().is_empty() {
            return BTreeMap::new();
        }
        serde_json::from_str(&json).unwrap_or_else(|e| {
            log::warn!("Annotation file {:?} is invalid, treating as empty: {}", path, e);
            BTreeMap::new()
        })
    }

    fn write_json(path: &Path, value: &impl serde::Serialize) -> Result<(), PersistenceError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(value)?;
        fs::write(path, json)?;
        Ok(())
    }

    fn image_path(&self, image: &str) -> Result<PathBuf, PersistenceError> {
        // Image names are bare file names inside the dataset root
        let path = self.root.join(image);
        let is_plain_name = Path::new(image).file_name().is_some_and(|n| n == image);
        if !is_plain_name || !path.is_file() {
            return Err(PersistenceError::image_not_found(path));
        }
        Ok(path)
    }
}

/// Decode the stored list of one image entry by entry.
///
/// Entries without a numeric id (older files use UUID strings, imports
/// write none) get ids above the highest numeric one. Rectangles with
/// swapped corners are re-normalised. Entries that still do not decode are
/// skipped with a warning instead of failing the whole image.
fn parse_annotation_entries(image: &str, value: Value) -> Vec<Annotation> {
    let Value::Array(entries) = value else {
        log::warn!("Annotations of {} are not a list, ignoring them", image);
        return Vec::new();
    };

    let mut next_id = entries
        .iter()
        .filter_map(|e| e.get("id").and_then(Value::as_u64))
        .max()
        .unwrap_or(0);
    let mut annotations = Vec::with_capacity(entries.len());
    for (index, mut entry) in entries.into_iter().enumerate() {
        if let Value::Object(fields) = &mut entry {
            if !fields.get("id").is_some_and(Value::is_u64) {
                next_id += 1;
                log::debug!("Annotation {} of {} has no numeric id, using {}", index, image, next_id);
                fields.insert("id".to_string(), Value::from(next_id));
            }
        }
        let mut annotation = match serde_json::from_value::<Annotation>(entry) {
            Ok(annotation) => annotation,
            Err(e) => {
                log::warn!("Skipping annotation {} of {}: {}", index, image, e);
                continue;
            }
        };
        if annotation.kind == AnnotationKind::Rectangle && annotation.points.len() == 4 {
            annotation.points = rectangle_corners(annotation.points[0], annotation.points[2]);
        }
        if !annotation.is_valid() {
            log::warn!(
                "Skipping annotation {} of {}: {} with {} points",
                index,
                image,
                annotation.kind.name(),
                annotation.points.len()
            );
            continue;
        }
        annotations.push(annotation);
    }
    annotations
}

/// Sort key: creation time, falling back to modification time.
fn file_time(path: &Path) -> Option<SystemTime> {
    let meta = fs::metadata(path).ok()?;
    meta.created().or_else(|_| meta.modified()).ok()
}

impl AnnotationBackend for FolderBackend {
    fn list_images(&mut self) -> Result<Vec<ImageEntry>, PersistenceError> {
        let annotations = self.read_annotation_map();

        let mut files: Vec<(Option<SystemTime>, String)> = Vec::new();
        for entry in fs::read_dir(&self.root)? {
            let entry = entry?;
            let Ok(name) = entry.file_name().into_string() else {
                continue;
            };
            if !is_image_file(&name) || !entry.path().is_file() {
                continue;
            }
            files.push((file_time(&entry.path()), name));
        }
        // Oldest first, ties broken by name
        files.sort();

        let images = files
            .into_iter()
            .map(|(_, name)| {
                let (width, height) = image::image_dimensions(self.root.join(&name)).unwrap_or_else(|e| {
                    log::debug!("Could not read dimensions of {}: {}", name, e);
                    (0, 0)
                });
                let count = annotations
                    .get(&name)
                    .and_then(Value::as_array)
                    .map_or(0, Vec::len);
                let mut entry = ImageEntry::new(name).with_dimensions(width, height);
                entry.annotation_count = count;
                entry
            })
            .collect::<Vec<_>>();

        log::debug!("Listed {} images in {:?}", images.len(), self.root);
        Ok(images)
    }

    fn load_annotations(&mut self, image: &str) -> Result<Vec<Annotation>, PersistenceError> {
        match self.read_annotation_map().remove(image) {
            Some(value) => Ok(parse_annotation_entries(image, value)),
            None => Ok(Vec::new()),
        }
    }

    fn save_annotations(&mut self, image: &str, annotations: &[Annotation]) -> Result<(), PersistenceError> {
        let mut map = self.read_annotation_map();
        map.insert(image.to_string(), serde_json::to_value(annotations)?);
        Self::write_json(&self.annotations_path(), &map)?;
        log::debug!("Saved {} annotations for {}", annotations.len(), image);
        Ok(())
    }

    fn load_classes(&mut self) -> Result<Vec<ClassEntry>, PersistenceError> {
        let path = self.classes_path();
        if !path.exists() {
            let defaults = default_classes();
            Self::write_json(&path, &defaults)?;
            log::info!("Created default class list at {:?}", path);
            return Ok(defaults);
        }
        let json = fs::read_to_string(&path)?;
        Ok(serde_json::from_str(&json)?)
    }

    fn save_classes(&mut self, classes: &[ClassEntry]) -> Result<(), PersistenceError> {
        Self::write_json(&self.classes_path(), &classes)?;
        log::debug!("Saved {} classes", classes.len());
        Ok(())
    }

    fn load_image(&mut self, image: &str) -> Result<Vec<u8>, PersistenceError> {
        let path = self.image_path(image)?;
        Ok(fs::read(path)?)
    }
}

/// Which [`MemoryBackend`] operations should fail.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FailureFlags {
    pub list_images: bool,
    pub load_annotations: bool,
    pub save_annotations: bool,
    pub load_classes: bool,
    pub save_classes: bool,
    pub load_image: bool,
}

impl FailureFlags {
    /// Every operation fails.
    pub fn all() -> Self {
        Self {
            list_images: true,
            load_annotations: true,
            save_annotations: true,
            load_classes: true,
            save_classes: true,
            load_image: true,
        }
    }
}

/// In-memory backend, mainly for tests and demos.
#[derive(Debug, Clone)]
pub struct MemoryBackend {
    /// Image name, encoded bytes; list order is insertion order.
    images: Vec<(String, Vec<u8>)>,
    annotations: HashMap<String, Vec<Annotation>>,
    classes: Vec<ClassEntry>,
    fail: FailureFlags,
}

impl Default for MemoryBackend {
    fn default() -> Self {
        Self {
            images: Vec::new(),
            annotations: HashMap::new(),
            classes: default_classes(),
            fail: FailureFlags::default(),
        }
    }
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an image with its encoded bytes.
    pub fn with_image(mut self, name: impl Into<String>, bytes: Vec<u8>) -> Self {
        self.images.push((name.into(), bytes));
        self
    }

    pub fn with_annotations(mut self, image: impl Into<String>, annotations: Vec<Annotation>) -> Self {
        self.annotations.insert(image.into(), annotations);
        self
    }

    pub fn with_classes(mut self, classes: Vec<ClassEntry>) -> Self {
        self.classes = classes;
        self
    }

    pub fn with_failures(mut self, fail: FailureFlags) -> Self {
        self.fail = fail;
        self
    }

    pub fn set_failures(&mut self, fail: FailureFlags) {
        self.fail = fail;
    }

    /// Stored annotations of an image.
    pub fn annotations(&self, image: &str) -> Option<&[Annotation]> {
        self.annotations.get(image).map(Vec::as_slice)
    }

    pub fn classes(&self) -> &[ClassEntry] {
        &self.classes
    }

    fn check(failing: bool, op: &str) -> Result<(), PersistenceError> {
        if failing {
            log::debug!("Injecting failure into {}", op);
            return Err(PersistenceError::Injected(op.to_string()));
        }
        Ok(())
    }
}

impl AnnotationBackend for MemoryBackend {
    fn list_images(&mut self) -> Result<Vec<ImageEntry>, PersistenceError> {
        Self::check(self.fail.list_images, "list_images")?;
        Ok(self
            .images
            .iter()
            .map(|(name, bytes)| {
                let (width, height) = crate::image_cache::decode_dimensions(bytes).unwrap_or((0, 0));
                let mut entry = ImageEntry::new(name.clone()).with_dimensions(width, height);
                entry.annotation_count = self.annotations.get(name).map_or(0, Vec::len);
                entry
            })
            .collect())
    }

    fn load_annotations(&mut self, image: &str) -> Result<Vec<Annotation>, PersistenceError> {
        Self::check(self.fail.load_annotations, "load_annotations")?;
        Ok(self.annotations.get(image).cloned().unwrap_or_default())
    }

    fn save_annotations(&mut self, image: &str, annotations: &[Annotation]) -> Result<(), PersistenceError> {
        Self::check(self.fail.save_annotations, "save_annotations")?;
        self.annotations.insert(image.to_string(), annotations.to_vec());
        Ok(())
    }

    fn load_classes(&mut self) -> Result<Vec<ClassEntry>, PersistenceError> {
        Self::check(self.fail.load_classes, "load_classes")?;
        Ok(self.classes.clone())
    }

    fn save_classes(&mut self, classes: &[ClassEntry]) -> Result<(), PersistenceError> {
        Self::check(self.fail.save_classes, "save_classes")?;
        self.classes = classes.to_vec();
        Ok(())
    }

    fn load_image(&mut self, image: &str) -> Result<Vec<u8>, PersistenceError> {
        Self::check(self.fail.load_image, "load_image")?;
        self.images
            .iter()
            .find(|(name, _)| name == image)
            .map(|(_, bytes)| bytes.clone())
            .ok_or_else(|| PersistenceError::image_not_found(image))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::image_cache::blank_png;
    use crate::model::Point;

    /// Fresh, empty directory under the system temp dir.
    fn temp_dataset(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("labelcanvas-{}-{}", name, std::process::id()));
        let _ = fs::remove_dir_all(&dir);
        fs::create_dir_all(&dir).unwrap();
        dir
    }

    fn sample_annotations() -> Vec<Annotation> {
        vec![
            Annotation::rectangle(1, "person", Point::new(1.0, 2.0), Point::new(30.0, 40.0)),
            Annotation::polygon(
                2,
                "car",
                vec![Point::new(0.0, 0.0), Point::new(10.0, 0.0), Point::new(5.0, 10.0)],
            ),
        ]
    }

    #[test]
    fn test_folder_save_load_idempotent() {
        let dir = temp_dataset("roundtrip");
        let mut backend = FolderBackend::open(&dir).unwrap();
        let anns = sample_annotations();
        backend.save_annotations("a.png", &anns).unwrap();
        assert_eq!(backend.load_annotations("a.png").unwrap(), anns);
        assert!(backend.load_annotations("other.png").unwrap().is_empty());

        // Saving another image keeps the first one
        backend.save_annotations("b.png", &anns[..1]).unwrap();
        assert_eq!(backend.load_annotations("a.png").unwrap(), anns);
        fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn test_folder_lists_images_with_counts() {
        let dir = temp_dataset("list");
        fs::write(dir.join("a.png"), blank_png(20, 10).unwrap()).unwrap();
        fs::write(dir.join("notes.txt"), "hello").unwrap();
        fs::write(dir.join("broken.jpg"), [0u8, 1, 2]).unwrap();
        let mut backend = FolderBackend::open(&dir).unwrap();
        backend.save_annotations("a.png", &sample_annotations()).unwrap();

        let mut images = backend.list_images().unwrap();
        images.sort_by(|a, b| a.name.cmp(&b.name));
        assert_eq!(images.len(), 2);
        assert_eq!(images[0].name, "a.png");
        assert_eq!((images[0].width, images[0].height), (20, 10));
        assert_eq!(images[0].annotation_count, 2);
        assert_eq!((images[1].width, images[1].height), (0, 0));
        assert_eq!(images[1].annotation_count, 0);
        fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn test_folder_corrupt_annotation_file_reads_empty() {
        let dir = temp_dataset("corrupt");
        let mut backend = FolderBackend::open(&dir).unwrap();
        fs::write(dir.join(ANNOTATIONS_DIR).join(ANNOTATIONS_FILE), "{not json").unwrap();
        assert!(backend.load_annotations("a.png").unwrap().is_empty());

        // Saving recovers the file
        backend.save_annotations("a.png", &sample_annotations()).unwrap();
        assert_eq!(backend.load_annotations("a.png").unwrap().len(), 2);
        fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn test_folder_keeps_readable_entries_of_a_damaged_list() {
        let dir = temp_dataset("entries");
        let mut backend = FolderBackend::open(&dir).unwrap();
        let stored = r##"{"a.png": [
            {"id": 7, "class": "person", "type": "rectangle", "points": [[1, 2], [30, 2], [30, 40], [1, 40]]},
            {"id": "0f8e-uuid", "class": "car", "type": "rectangle", "points": [[50, 60], [10, 60], [10, 20], [50, 20]], "confidence": 0.9},
            {"class": "tree", "color": "#00ff00", "type": "polygon", "points": [[0, 0], [10, 0], [5, 10]]},
            {"id": 9, "class": "road", "type": "line", "points": [[0, 0], [10, 10]]},
            {"id": 10, "class": "bad", "type": "polygon", "points": [[0, 0], [1, 1]]}
        ]}"##;
        fs::write(dir.join(ANNOTATIONS_DIR).join(ANNOTATIONS_FILE), stored).unwrap();

        let loaded = backend.load_annotations("a.png").unwrap();
        assert_eq!(loaded.len(), 3);
        assert_eq!(loaded[0].id, 7);
        // Fresh ids start above the highest numeric one, even a skipped entry's
        assert_eq!((loaded[1].id, loaded[2].id), (11, 12));
        assert_eq!(loaded[1].class_name, "car");
        assert_eq!(loaded[1].points[0], Point::new(10.0, 20.0));
        assert!(loaded[1].is_valid());
        assert_eq!(loaded[2].kind, AnnotationKind::Polygon);
        fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn test_folder_default_classes() {
        let dir = temp_dataset("classes");
        let mut backend = FolderBackend::open(&dir).unwrap();
        assert_eq!(backend.load_classes().unwrap(), default_classes());
        assert!(dir.join(ANNOTATIONS_DIR).join(CLASSES_FILE).exists());

        let classes = vec![ClassEntry::new("dog", "#123456")];
        backend.save_classes(&classes).unwrap();
        assert_eq!(backend.load_classes().unwrap(), classes);
        fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn test_folder_rejects_missing_and_escaping_images() {
        let dir = temp_dataset("image");
        let mut backend = FolderBackend::open(&dir).unwrap();
        assert!(matches!(
            backend.load_image("missing.png"),
            Err(PersistenceError::ImageNotFound { .. })
        ));
        assert!(matches!(
            backend.load_image("../secret.png"),
            Err(PersistenceError::ImageNotFound { .. })
        ));
        fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn test_memory_backend_round_trip_and_failures() {
        let mut backend = MemoryBackend::new().with_image("a.png", blank_png(4, 4).unwrap());
        let anns = sample_annotations();
        backend.save_annotations("a.png", &anns).unwrap();
        assert_eq!(backend.load_annotations("a.png").unwrap(), anns);
        assert_eq!(backend.list_images().unwrap()[0].annotation_count, 2);

        backend.set_failures(FailureFlags {
            save_annotations: true,
            ..Default::default()
        });
        assert!(matches!(
            backend.save_annotations("a.png", &[]),
            Err(PersistenceError::Injected(_))
        ));
        // Failed save leaves the stored list untouched
        assert_eq!(backend.annotations("a.png").map(<[_]>::len), Some(2));
    }
}
