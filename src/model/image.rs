//! Image list entries.

use serde::{Deserialize, Serialize};

/// One image of the dataset, as shown in the image list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageEntry {
    /// Identifier used for every per-image request.
    pub name: String,
    #[serde(default)]
    pub width: u32,
    #[serde(default)]
    pub height: u32,
    /// Number of stored annotations for the image.
    #[serde(default)]
    pub annotation_count: usize,
}

impl ImageEntry {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            width: 0,
            height: 0,
            annotation_count: 0,
        }
    }

    pub fn with_dimensions(mut self, width: u32, height: u32) -> Self {
        self.width = width;
        self.height = height;
        self
    }
}

/// Wire wrapper for the image list: `{"images": [...]}`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ImageList {
    pub images: Vec<ImageEntry>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_image_list_wire_form() {
        let json = r#"{"images": [
            {"name": "a.png", "width": 640, "height": 480, "annotation_count": 2},
            {"name": "b.jpg"}
        ]}"#;
        let list: ImageList = serde_json::from_str(json).unwrap();
        assert_eq!(list.images.len(), 2);
        let expected = ImageEntry {
            annotation_count: 2,
            ..ImageEntry::new("a.png").with_dimensions(640, 480)
        };
        assert_eq!(list.images[0], expected);
        assert_eq!(list.images[1], ImageEntry::new("b.jpg"));

        let back = serde_json::to_value(&list).unwrap();
        assert_eq!(back["images"][0]["annotation_count"], 2);
    }
}
