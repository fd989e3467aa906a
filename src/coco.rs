//! COCO format data structures and utilities
//!
//! This module holds the COCO detection model written by the converter and
//! read back by the visualizer, the fixed BDD100K category table and the
//! writer that assigns image and annotation ids.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::ops::{Mul, Sub};

/// Resolution recorded for every image. BDD100K frames are all 1280x720 and
/// the converter does not open the images to check.
pub const IMAGE_WIDTH: u32 = 1280;
pub const IMAGE_HEIGHT: u32 = 720;

/// A label coordinate kept the way it was written: integer corners stay
/// integers through width, height and area, anything else is a float.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Coord {
    Int(i64),
    Float(f64),
}

impl Coord {
    pub fn as_f64(self) -> f64 {
        match self {
            Coord::Int(v) => v as f64,
            Coord::Float(v) => v,
        }
    }

    fn combine(
        self,
        rhs: Coord,
        int_op: fn(i64, i64) -> Option<i64>,
        float_op: fn(f64, f64) -> f64,
    ) -> Coord {
        match (self, rhs) {
            (Coord::Int(a), Coord::Int(b)) => int_op(a, b)
                .map(Coord::Int)
                .unwrap_or_else(|| Coord::Float(float_op(a as f64, b as f64))),
            (a, b) => Coord::Float(float_op(a.as_f64(), b.as_f64())),
        }
    }
}

impl Default for Coord {
    fn default() -> Self {
        Coord::Int(0)
    }
}

impl From<i64> for Coord {
    fn from(v: i64) -> Self {
        Coord::Int(v)
    }
}

impl From<f64> for Coord {
    fn from(v: f64) -> Self {
        Coord::Float(v)
    }
}

impl Sub for Coord {
    type Output = Coord;

    fn sub(self, rhs: Coord) -> Coord {
        self.combine(rhs, i64::checked_sub, |a, b| a - b)
    }
}

impl Mul for Coord {
    type Output = Coord;

    fn mul(self, rhs: Coord) -> Coord {
        self.combine(rhs, i64::checked_mul, |a, b| a * b)
    }
}

/// COCO category information
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
    pub id: u32,
    pub name: String,
}

/// COCO image information
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Image {
    pub id: u32,
    pub file_name: String,
    #[serde(default)]
    pub width: u32,
    #[serde(default)]
    pub height: u32,
}

impl Image {
    pub fn new(id: u32, file_name: String, width: u32, height: u32) -> Self {
        Self {
            id,
            file_name,
            width,
            height,
        }
    }
}

/// COCO annotation information
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Annotation {
    pub id: u32,
    pub image_id: u32,
    pub category_id: u32,
    pub bbox: [Coord; 4], // [x, y, width, height]
    #[serde(default)]
    pub area: Coord,
    #[serde(default)]
    pub iscrowd: u32,
    #[serde(default)]
    pub segmentation: Vec<Vec<f64>>,
}

impl Annotation {
    /// Detection-only annotation: area from the box, not crowd, no outline.
    pub fn new(id: u32, image_id: u32, category_id: u32, bbox: [Coord; 4]) -> Self {
        Self {
            id,
            image_id,
            category_id,
            bbox,
            area: bbox[2] * bbox[3],
            iscrowd: 0,
            segmentation: Vec::new(),
        }
    }
}

/// Complete COCO dataset structure
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CocoFile {
    pub images: Vec<Image>,
    pub annotations: Vec<Annotation>,
    pub categories: Vec<Category>,
}

const BDD100K_CATEGORIES: &[&str] = &[
    "pedestrian",
    "rider",
    "car",
    "truck",
    "bus",
    "train",
    "motorcycle",
    "bicycle",
    "traffic light",
    "traffic sign",
];

/// Fixed, ordered category list with 1-based ids.
#[derive(Debug, Clone)]
pub struct CategoryTable {
    categories: Vec<Category>,
    by_name: HashMap<String, u32>,
}

impl CategoryTable {
    /// Build a table from names in id order; the first name gets id 1.
    pub fn from_names<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let categories: Vec<Category> = names
            .into_iter()
            .enumerate()
            .map(|(idx, name)| Category {
                id: (idx + 1) as u32,
                name: name.into(),
            })
            .collect();
        let by_name = categories
            .iter()
            .map(|c| (c.name.clone(), c.id))
            .collect();
        Self {
            categories,
            by_name,
        }
    }

    /// The ten BDD100K detection classes.
    pub fn bdd100k() -> Self {
        Self::from_names(BDD100K_CATEGORIES.iter().copied())
    }

    /// Look up a raw label category, lowercased and trimmed first.
    pub fn lookup(&self, raw: &str) -> Option<u32> {
        self.by_name.get(&raw.trim().to_lowercase()).copied()
    }

    pub fn categories(&self) -> &[Category] {
        &self.categories
    }
}

/// Writer for COCO format datasets
///
/// Ids are handed out densely from 1 in the order records are added.
pub struct CocoWriter {
    next_image_id: u32,
    next_annotation_id: u32,
    coco: CocoFile,
}

impl CocoWriter {
    /// Create a new COCO writer over the given category table
    pub fn new(table: &CategoryTable) -> Self {
        Self {
            next_image_id: 1,
            next_annotation_id: 1,
            coco: CocoFile {
                images: Vec::new(),
                annotations: Vec::new(),
                categories: table.categories().to_vec(),
            },
        }
    }

    /// Add an image to the COCO dataset
    pub fn add_image(&mut self, file_name: String) -> u32 {
        let image_id = self.next_image_id;
        self.next_image_id += 1;
        self.coco
            .images
            .push(Image::new(image_id, file_name, IMAGE_WIDTH, IMAGE_HEIGHT));
        image_id
    }

    /// Add an annotation to the COCO dataset
    pub fn add_annotation(&mut self, image_id: u32, category_id: u32, bbox: [Coord; 4]) -> u32 {
        let annotation_id = self.next_annotation_id;
        self.next_annotation_id += 1;
        self.coco
            .annotations
            .push(Annotation::new(annotation_id, image_id, category_id, bbox));
        annotation_id
    }

    /// Hand over the completed dataset
    pub fn finish(self) -> CocoFile {
        self.coco
    }
}

/// Convert a two-corner rectangle to `[x, y, width, height]`.
///
/// Corner order is taken as given; swapped corners yield negative extents.
pub fn bbox_from_corners(x1: Coord, y1: Coord, x2: Coord, y2: Coord) -> [Coord; 4] {
    [x1, y1, x2 - x1, y2 - y1]
}
