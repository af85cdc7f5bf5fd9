//! Annotation classes and the editable class list.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::color_utils::is_valid_hex;
use crate::constants::{DEFAULT_CLASS_COLOR, DEFAULT_CLASS_NAME, DEFAULT_CLASS_SWATCH};

/// An annotation class with a name and color.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassEntry {
    /// Display name, unique within a [`ClassList`].
    pub name: String,
    /// `#rrggbb` color used for strokes, fills and list swatches.
    pub color: String,
}

impl ClassEntry {
    /// Create a new class with the given name and color.
    pub fn new(name: &str, color: &str) -> Self {
        Self {
            name: name.to_string(),
            color: color.to_string(),
        }
    }
}

/// Classes used when a dataset has none stored yet.
pub fn default_classes() -> Vec<ClassEntry> {
    vec![ClassEntry::new(DEFAULT_CLASS_NAME, DEFAULT_CLASS_SWATCH)]
}

/// Errors from editing the class list.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ClassError {
    #[error("Class name must not be empty")]
    EmptyName,

    #[error("Class '{0}' already exists")]
    DuplicateName(String),

    #[error("No class at index {0}")]
    IndexOutOfRange(usize),

    #[error("Invalid color '{0}', expected #rrggbb")]
    InvalidColor(String),
}

/// Ordered class list plus the class new annotations are drawn with.
#[derive(Debug, Clone, Default)]
pub struct ClassList {
    classes: Vec<ClassEntry>,
    active: Option<String>,
}

impl ClassList {
    pub fn new(classes: Vec<ClassEntry>) -> Self {
        let mut list = Self::default();
        list.replace(classes);
        list
    }

    /// Replace all classes, keeping the active class if it still exists.
    pub fn replace(&mut self, classes: Vec<ClassEntry>) {
        self.classes = classes;
        self.ensure_active();
    }

    fn ensure_active(&mut self) {
        let still_present = self
            .active
            .as_deref()
            .is_some_and(|name| self.classes.iter().any(|c| c.name == name));
        if !still_present {
            self.active = self.classes.first().map(|c| c.name.clone());
        }
    }

    pub fn as_slice(&self) -> &[ClassEntry] {
        &self.classes
    }

    pub fn len(&self) -> usize {
        self.classes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.classes.is_empty()
    }

    pub fn get(&self, name: &str) -> Option<&ClassEntry> {
        self.classes.iter().find(|c| c.name == name)
    }

    /// Color for a class name, falling back to the default for unknown names.
    pub fn color_of(&self, name: &str) -> &str {
        self.get(name)
            .map(|c| c.color.as_str())
            .unwrap_or(DEFAULT_CLASS_COLOR)
    }

    /// The class new annotations are assigned to.
    pub fn active(&self) -> Option<&ClassEntry> {
        self.active.as_deref().and_then(|name| self.get(name))
    }

    /// Make a class active. Returns false if no class has that name.
    pub fn select(&mut self, name: &str) -> bool {
        if self.get(name).is_none() {
            return false;
        }
        self.active = Some(name.to_string());
        true
    }

    /// Clear the active class so draw gestures produce nothing.
    pub fn deselect(&mut self) {
        self.active = None;
    }

    /// Append a class. The name is trimmed and must be unique.
    pub fn add(&mut self, name: &str, color: &str) -> Result<(), ClassError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(ClassError::EmptyName);
        }
        if self.get(name).is_some() {
            return Err(ClassError::DuplicateName(name.to_string()));
        }
        if !is_valid_hex(color) {
            return Err(ClassError::InvalidColor(color.to_string()));
        }
        self.classes.push(ClassEntry::new(name, color));
        self.ensure_active();
        Ok(())
    }

    /// Rename and/or recolor the class at `index`.
    ///
    /// Annotations referencing the old name are not updated.
    pub fn edit(&mut self, index: usize, name: &str, color: &str) -> Result<(), ClassError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(ClassError::EmptyName);
        }
        if index >= self.classes.len() {
            return Err(ClassError::IndexOutOfRange(index));
        }
        let clash = self
            .classes
            .iter()
            .enumerate()
            .any(|(i, c)| i != index && c.name == name);
        if clash {
            return Err(ClassError::DuplicateName(name.to_string()));
        }
        if !is_valid_hex(color) {
            return Err(ClassError::InvalidColor(color.to_string()));
        }

        let was_active = self.active.as_deref() == Some(self.classes[index].name.as_str());
        self.classes[index] = ClassEntry::new(name, color);
        if was_active {
            self.active = Some(name.to_string());
        }
        Ok(())
    }

    /// Remove the class at `index`, returning it.
    pub fn remove(&mut self, index: usize) -> Result<ClassEntry, ClassError> {
        if index >= self.classes.len() {
            return Err(ClassError::IndexOutOfRange(index));
        }
        let removed = self.classes.remove(index);
        self.ensure_active();
        Ok(removed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn two_classes() -> ClassList {
        ClassList::new(vec![
            ClassEntry::new("person", "#3aa757"),
            ClassEntry::new("car", "#0000ff"),
        ])
    }

    #[test]
    fn test_first_class_active_by_default() {
        let list = two_classes();
        assert_eq!(list.active().map(|c| c.name.as_str()), Some("person"));
        assert!(ClassList::new(Vec::new()).active().is_none());
    }

    #[test]
    fn test_add_rejects_empty_and_duplicate() {
        let mut list = two_classes();
        assert_eq!(list.add("   ", "#ffffff"), Err(ClassError::EmptyName));
        assert_eq!(
            list.add(" car ", "#ffffff"),
            Err(ClassError::DuplicateName("car".to_string()))
        );
        list.add(" bike ", "#ffffff").unwrap();
        assert_eq!(list.len(), 3);
        assert!(list.get("bike").is_some());
    }

    #[test]
    fn test_edit_checks_other_names_only() {
        let mut list = two_classes();
        // Keeping the same name while changing color is allowed
        list.edit(1, "car", "#123456").unwrap();
        assert_eq!(list.color_of("car"), "#123456");
        assert_eq!(
            list.edit(1, "person", "#123456"),
            Err(ClassError::DuplicateName("person".to_string()))
        );
        assert_eq!(list.edit(7, "x", "#000000"), Err(ClassError::IndexOutOfRange(7)));
    }

    #[test]
    fn test_add_and_edit_reject_invalid_colors() {
        let mut list = two_classes();
        for bad in ["red", "00ff00", "#00ff0080", "#0f0", ""] {
            assert_eq!(list.add("bike", bad), Err(ClassError::InvalidColor(bad.to_string())));
            assert_eq!(list.edit(1, "car", bad), Err(ClassError::InvalidColor(bad.to_string())));
        }
        assert_eq!(list.len(), 2);
        assert_eq!(list.color_of("car"), "#0000ff");
        assert!(list.add("bike", "#00FF00").is_ok());
    }

    #[test]
    fn test_rename_keeps_active_and_orphans_old_name() {
        let mut list = two_classes();
        list.edit(0, "pedestrian", "#00ff00").unwrap();
        assert_eq!(list.active().map(|c| c.name.as_str()), Some("pedestrian"));
        assert_eq!(list.color_of("person"), DEFAULT_CLASS_COLOR);
    }

    #[test]
    fn test_remove_active_falls_back_to_first() {
        let mut list = two_classes();
        assert!(list.select("car"));
        list.remove(1).unwrap();
        assert_eq!(list.active().map(|c| c.name.as_str()), Some("person"));
        list.remove(0).unwrap();
        assert!(list.active().is_none());
        assert!(!list.select("car"));
    }
}
