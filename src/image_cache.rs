//! Image cache keyed by image name.
//!
//! The editor only needs an image's natural size to build its transform; the
//! encoded bytes are kept alongside so the host can paint them. Entries go
//! `Pending` when bytes are requested from the persistence bridge and
//! `Ready` or `Failed` once the response is decoded.

use std::collections::HashMap;
use std::io::Cursor;
use std::sync::Arc;

use image::{ImageReader, ImageResult};

use crate::view_math::Size;

/// Supported image file extensions.
pub const IMAGE_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "gif", "bmp"];

/// Check if a filename has a supported image extension.
pub fn is_image_file(filename: &str) -> bool {
    let lower = filename.to_lowercase();
    IMAGE_EXTENSIONS
        .iter()
        .any(|ext| lower.rsplit_once('.').is_some_and(|(_, e)| e == *ext))
}

/// Read the natural dimensions from encoded image bytes without decoding pixels.
pub fn decode_dimensions(bytes: &[u8]) -> ImageResult<(u32, u32)> {
    let reader = ImageReader::new(Cursor::new(bytes)).with_guessed_format()?;
    reader.into_dimensions()
}

/// Load state of one image.
#[derive(Debug, Clone)]
pub enum ImageState {
    /// Bytes requested, not yet received
    Pending,
    /// Header decoded
    Ready {
        width: u32,
        height: u32,
        bytes: Arc<[u8]>,
    },
    /// Fetch or decode failed
    Failed(String),
}

impl ImageState {
    /// Natural size if the image is ready and non-empty.
    pub fn size(&self) -> Option<Size> {
        match self {
            ImageState::Ready { width, height, .. } if *width > 0 && *height > 0 => {
                Some(Size::new(*width as f32, *height as f32))
            }
            _ => None,
        }
    }
}

/// Loaded images, by name.
#[derive(Debug, Default)]
pub struct ImageCache {
    entries: HashMap<String, ImageState>,
}

impl ImageCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark an image as requested. Returns false if it is already pending or ready,
    /// in which case no new request should be sent. Failed entries are retried.
    pub fn request(&mut self, name: &str) -> bool {
        match self.entries.get(name) {
            Some(ImageState::Pending | ImageState::Ready { .. }) => false,
            _ => {
                self.entries.insert(name.to_string(), ImageState::Pending);
                true
            }
        }
    }

    /// Store fetched bytes, decoding the natural size.
    pub fn insert_bytes(&mut self, name: &str, bytes: Vec<u8>) -> ImageResult<Size> {
        match decode_dimensions(&bytes) {
            Ok((width, height)) => {
                log::debug!("Image {} is {}x{}", name, width, height);
                self.entries.insert(
                    name.to_string(),
                    ImageState::Ready {
                        width,
                        height,
                        bytes: bytes.into(),
                    },
                );
                Ok(Size::new(width as f32, height as f32))
            }
            Err(e) => {
                log::warn!("Failed to decode {}: {}", name, e);
                self.entries.insert(name.to_string(), ImageState::Failed(e.to_string()));
                Err(e)
            }
        }
    }

    /// Record a failed fetch.
    pub fn mark_failed(&mut self, name: &str, reason: impl Into<String>) {
        self.entries.insert(name.to_string(), ImageState::Failed(reason.into()));
    }

    pub fn get(&self, name: &str) -> Option<&ImageState> {
        self.entries.get(name)
    }

    /// Natural size of a ready image.
    pub fn size_of(&self, name: &str) -> Option<Size> {
        self.entries.get(name).and_then(ImageState::size)
    }

    /// Encoded bytes of a ready image, for the host to paint.
    pub fn bytes(&self, name: &str) -> Option<Arc<[u8]>> {
        match self.entries.get(name) {
            Some(ImageState::Ready { bytes, .. }) => Some(Arc::clone(bytes)),
            _ => None,
        }
    }

    /// Keep only the named images.
    pub fn retain(&mut self, keep: impl Fn(&str) -> bool) {
        self.entries.retain(|name, _| keep(name));
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Encode a blank PNG of the given size. Used by tests and demo datasets.
pub fn blank_png(width: u32, height: u32) -> ImageResult<Vec<u8>> {
    let img = image::RgbImage::new(width, height);
    let mut out = Cursor::new(Vec::new());
    img.write_to(&mut out, image::ImageFormat::Png)?;
    Ok(out.into_inner())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_image_file() {
        assert!(is_image_file("photo.JPG"));
        assert!(is_image_file("a.b.png"));
        assert!(!is_image_file("notes.txt"));
        assert!(!is_image_file("png"));
        assert!(!is_image_file("photo.webp"));
    }

    #[test]
    fn test_insert_decodes_size() {
        let mut cache = ImageCache::new();
        assert!(cache.request("a.png"));
        assert!(!cache.request("a.png"));
        assert!(cache.size_of("a.png").is_none());

        let bytes = blank_png(40, 30).unwrap();
        let size = cache.insert_bytes("a.png", bytes).unwrap();
        assert_eq!(size, Size::new(40.0, 30.0));
        assert_eq!(cache.size_of("a.png"), Some(size));
        assert!(cache.bytes("a.png").is_some());
        assert!(!cache.request("a.png"));
    }

    #[test]
    fn test_garbage_bytes_fail_and_can_retry() {
        let mut cache = ImageCache::new();
        cache.request("bad.png");
        assert!(cache.insert_bytes("bad.png", vec![1, 2, 3, 4]).is_err());
        assert!(matches!(cache.get("bad.png"), Some(ImageState::Failed(_))));
        assert!(cache.size_of("bad.png").is_none());
        assert!(cache.request("bad.png"));
    }

    #[test]
    fn test_retain() {
        let mut cache = ImageCache::new();
        cache.request("a.png");
        cache.request("b.png");
        cache.retain(|name| name == "b.png");
        assert_eq!(cache.len(), 1);
        assert!(cache.get("b.png").is_some());
    }
}
