use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;
use std::sync::OnceLock;

use crate::coco::Coord;

// Image extensions the visualizer picks up from a folder
pub const IMG_FORMATS: &[&str] = &["jpg", "jpeg", "png"];

// Precomputed HashSet of image extensions for fast lookup
pub static IMAGE_EXTENSIONS_SET: OnceLock<HashSet<String>> = OnceLock::new();

/// Get the image extensions set
pub fn get_image_extensions_set() -> &'static HashSet<String> {
    IMAGE_EXTENSIONS_SET.get_or_init(|| IMG_FORMATS.iter().map(|ext| ext.to_lowercase()).collect())
}

/// True when the file name ends in one of [`IMG_FORMATS`], ignoring case.
pub fn has_image_extension(path: &Path) -> bool {
    path.extension()
        .map(|ext| get_image_extensions_set().contains(&ext.to_string_lossy().to_lowercase()))
        .unwrap_or(false)
}

// Corner-point rectangle as stored in BDD100K label files
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq)]
pub struct Box2d {
    pub x1: Coord,
    pub y1: Coord,
    pub x2: Coord,
    pub y2: Coord,
}

// A single labeled object inside a frame
#[derive(Debug, Serialize, Deserialize, Clone, Default)]
pub struct Label {
    pub category: Option<String>,
    pub box2d: Option<Box2d>,
}

// One entry of a BDD100K detection label file, describing one image
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Frame {
    pub name: String,
    #[serde(default)]
    pub labels: Option<Vec<Label>>,
}

impl Frame {
    /// Labels of this frame; an absent or null list reads as empty.
    pub fn labels(&self) -> &[Label] {
        self.labels.as_deref().unwrap_or_default()
    }
}
