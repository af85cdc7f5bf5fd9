//! In-memory annotation store for the currently open image.
//!
//! The store is an ordered list: list order is creation order, which is also
//! the hit-test priority. It is the unit of save and load.

use web_time::{SystemTime, UNIX_EPOCH};

use crate::model::{Annotation, AnnotationId};

/// Ordered annotations of one image.
#[derive(Debug, Clone, Default)]
pub struct AnnotationStore {
    /// Name of the image these annotations belong to.
    image: Option<String>,
    /// All annotations, in creation order.
    annotations: Vec<Annotation>,
    /// Highest id handed out or loaded so far.
    last_id: AnnotationId,
}

impl AnnotationStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Image the store currently holds annotations for.
    pub fn image(&self) -> Option<&str> {
        self.image.as_deref()
    }

    /// Discard everything and associate the store with another image (or none).
    pub fn reset(&mut self, image: Option<String>) {
        self.image = image;
        self.annotations.clear();
    }

    /// Replace the contents wholesale with a loaded list.
    pub fn load(&mut self, image: impl Into<String>, annotations: Vec<Annotation>) {
        self.image = Some(image.into());
        if let Some(max) = annotations.iter().map(|a| a.id).max() {
            self.last_id = self.last_id.max(max);
        }
        self.annotations = annotations;
        log::debug!(
            "Store loaded {} annotations for {:?}",
            self.annotations.len(),
            self.image
        );
    }

    /// Allocate a new annotation id.
    ///
    /// Ids are wall-clock milliseconds, bumped past every id seen so far so
    /// they stay unique and monotonic even within the same millisecond.
    pub fn next_id(&mut self) -> AnnotationId {
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis() as AnnotationId)
            .unwrap_or(0);
        let id = now.max(self.last_id + 1);
        self.last_id = id;
        id
    }

    /// Append an annotation and return its id.
    pub fn push(&mut self, annotation: Annotation) -> AnnotationId {
        let id = annotation.id;
        self.last_id = self.last_id.max(id);
        self.annotations.push(annotation);
        id
    }

    /// Get an annotation by ID.
    pub fn get(&self, id: AnnotationId) -> Option<&Annotation> {
        self.annotations.iter().find(|a| a.id == id)
    }

    /// Get a mutable reference to an annotation by ID.
    pub fn get_mut(&mut self, id: AnnotationId) -> Option<&mut Annotation> {
        self.annotations.iter_mut().find(|a| a.id == id)
    }

    /// Position of an annotation in list order.
    pub fn index_of(&self, id: AnnotationId) -> Option<usize> {
        self.annotations.iter().position(|a| a.id == id)
    }

    /// Remove an annotation by ID.
    pub fn remove(&mut self, id: AnnotationId) -> Option<Annotation> {
        let index = self.index_of(id)?;
        Some(self.annotations.remove(index))
    }

    /// Remove the annotation at a list index.
    pub fn remove_at(&mut self, index: usize) -> Option<Annotation> {
        if index < self.annotations.len() {
            Some(self.annotations.remove(index))
        } else {
            None
        }
    }

    /// Clear all annotations.
    pub fn clear(&mut self) {
        self.annotations.clear();
    }

    pub fn as_slice(&self) -> &[Annotation] {
        &self.annotations
    }

    pub fn iter(&self) -> impl Iterator<Item = &Annotation> {
        self.annotations.iter()
    }

    pub fn len(&self) -> usize {
        self.annotations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.annotations.is_empty()
    }

    /// Copy of the list, as sent to persistence.
    pub fn snapshot(&self) -> Vec<Annotation> {
        self.annotations.clone()
    }

    /// Export annotations to a JSON array.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(&self.annotations)
    }

    /// Parse a JSON array of annotations.
    pub fn from_json(json: &str) -> Result<Vec<Annotation>, serde_json::Error> {
        serde_json::from_str(json)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Point;

    fn rect(id: AnnotationId) -> Annotation {
        Annotation::rectangle(id, "car", Point::new(0.0, 0.0), Point::new(10.0, 10.0))
    }

    #[test]
    fn test_ids_are_unique_and_increasing() {
        let mut store = AnnotationStore::new();
        let a = store.next_id();
        let b = store.next_id();
        let c = store.next_id();
        assert!(a < b && b < c);
    }

    #[test]
    fn test_next_id_exceeds_loaded_ids() {
        let mut store = AnnotationStore::new();
        let future = AnnotationId::MAX / 2;
        store.load("a.png", vec![rect(future)]);
        assert!(store.next_id() > future);
    }

    #[test]
    fn test_order_and_removal() {
        let mut store = AnnotationStore::new();
        store.push(rect(1));
        store.push(rect(2));
        store.push(rect(3));
        assert_eq!(store.index_of(2), Some(1));

        assert_eq!(store.remove(2).map(|a| a.id), Some(2));
        assert_eq!(store.iter().map(|a| a.id).collect::<Vec<_>>(), vec![1, 3]);
        assert!(store.remove(2).is_none());

        assert_eq!(store.remove_at(0).map(|a| a.id), Some(1));
        assert!(store.remove_at(5).is_none());
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_load_replaces_previous_image() {
        let mut store = AnnotationStore::new();
        store.load("a.png", vec![rect(1), rect(2)]);
        store.load("b.png", vec![rect(7)]);
        assert_eq!(store.image(), Some("b.png"));
        assert_eq!(store.len(), 1);

        store.reset(Some("c.png".to_string()));
        assert!(store.is_empty());
        assert_eq!(store.image(), Some("c.png"));
    }

    #[test]
    fn test_json_round_trip() {
        let mut store = AnnotationStore::new();
        store.push(rect(1));
        store.push(Annotation::polygon(
            2,
            "tree",
            vec![Point::new(0.0, 0.0), Point::new(10.0, 0.0), Point::new(5.0, 10.0)],
        ));
        let json = store.to_json().expect("Failed to export JSON");
        let parsed = AnnotationStore::from_json(&json).expect("Failed to import JSON");
        assert_eq!(parsed, store.snapshot());
    }
}
