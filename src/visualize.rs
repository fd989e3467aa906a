//! Ground-truth visualization
//!
//! Draws the boxes of a COCO annotation file onto the matching images of a
//! folder and writes the annotated copies to a save folder.

use ab_glyph::FontVec;
use image::codecs::jpeg::JpegEncoder;
use image::{Rgb, RgbImage};
use imageproc::drawing::{draw_hollow_rect_mut, draw_text_mut};
use imageproc::rect::Rect;
use log::{debug, info, warn};
use std::collections::HashMap;
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use crate::coco::{Annotation, CocoFile, Coord, Image};
use crate::error::{Error, Result};
use crate::progress::ProgressObserver;
use crate::types::has_image_extension;
use crate::utils::create_output_directory;

pub const BOX_COLOR: Rgb<u8> = Rgb([0, 255, 0]);
pub const BOX_THICKNESS: i32 = 2;
pub const LABEL_SCALE: f32 = 16.0;
/// Distance between the label baseline and the top edge of its box
pub const LABEL_OFFSET: i32 = 5;
pub const UNKNOWN_CATEGORY: &str = "N/A";
pub const JPEG_QUALITY: u8 = 95;

// Common system locations tried when no font is given explicitly
pub const FONT_PATHS: &[&str] = &[
    "/usr/share/fonts/truetype/dejavu/DejaVuSans.ttf",
    "/usr/share/fonts/TTF/DejaVuSans.ttf",
    "/usr/share/fonts/truetype/liberation/LiberationSans-Regular.ttf",
    "/System/Library/Fonts/Supplemental/Arial.ttf",
    "/Library/Fonts/Arial.ttf",
    "C:\\Windows\\Fonts\\arial.ttf",
];

/// Lookup tables built once from an annotation file.
pub struct AnnotationIndex<'a> {
    images_by_file: HashMap<&'a str, &'a Image>,
    annotations_by_image: HashMap<u32, Vec<&'a Annotation>>,
    category_names: HashMap<u32, &'a str>,
}

impl<'a> AnnotationIndex<'a> {
    pub fn new(coco: &'a CocoFile) -> Self {
        let images_by_file = coco
            .images
            .iter()
            .map(|img| (img.file_name.as_str(), img))
            .collect();

        let mut annotations_by_image: HashMap<u32, Vec<&Annotation>> = HashMap::new();
        for ann in &coco.annotations {
            annotations_by_image
                .entry(ann.image_id)
                .or_default()
                .push(ann);
        }

        let category_names = coco
            .categories
            .iter()
            .map(|c| (c.id, c.name.as_str()))
            .collect();

        Self {
            images_by_file,
            annotations_by_image,
            category_names,
        }
    }

    pub fn image(&self, file_name: &str) -> Option<&'a Image> {
        self.images_by_file.get(file_name).copied()
    }

    /// Annotations of an image in file order; empty when it has none.
    pub fn annotations(&self, image_id: u32) -> &[&'a Annotation] {
        self.annotations_by_image
            .get(&image_id)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    pub fn category_name(&self, category_id: u32) -> &'a str {
        self.category_names
            .get(&category_id)
            .copied()
            .unwrap_or(UNKNOWN_CATEGORY)
    }
}

/// Pixel rectangle covering `(x, y)` to `(x + w, y + h)` inclusive, with the
/// COCO box truncated to integers.
///
/// Edges outside the canvas are pulled in to just past its border, far enough
/// that the thickness ring stays off-canvas, so arbitrarily large boxes never
/// overflow pixel arithmetic.
pub fn bbox_to_rect(bbox: &[Coord; 4], (canvas_width, canvas_height): (u32, u32)) -> Rect {
    let truncate = |c: Coord| match c {
        Coord::Int(v) => v,
        Coord::Float(v) => v as i64,
    };
    let (x, y) = (truncate(bbox[0]), truncate(bbox[1]));
    let (x2, y2) = (x.saturating_add(truncate(bbox[2])), y.saturating_add(truncate(bbox[3])));

    let margin = i64::from(BOX_THICKNESS);
    let clip_x = |v: i64| v.clamp(-margin, i64::from(canvas_width) - 1 + margin);
    let clip_y = |v: i64| v.clamp(-margin, i64::from(canvas_height) - 1 + margin);
    let (left, right) = (clip_x(x.min(x2)), clip_x(x.max(x2)));
    let (top, bottom) = (clip_y(y.min(y2)), clip_y(y.max(y2)));

    Rect::at(left as i32, top as i32).of_size((right - left + 1) as u32, (bottom - top + 1) as u32)
}

/// Draw every annotation box and its category name onto `image`.
pub fn draw_annotations(
    image: &mut RgbImage,
    annotations: &[&Annotation],
    index: &AnnotationIndex,
    font: Option<&FontVec>,
) {
    for ann in annotations {
        let rect = bbox_to_rect(&ann.bbox, image.dimensions());

        // Thickness grows outwards from the nominal outline
        for t in 0..BOX_THICKNESS {
            let thick_rect = Rect::at(rect.left() - t, rect.top() - t)
                .of_size(rect.width() + (2 * t) as u32, rect.height() + (2 * t) as u32);
            draw_hollow_rect_mut(image, thick_rect, BOX_COLOR);
        }

        if let Some(font) = font {
            // Label sits above the box, following it when the box is clipped
            let label_y = rect.top() - LABEL_OFFSET - LABEL_SCALE as i32;
            draw_text_mut(
                image,
                BOX_COLOR,
                rect.left(),
                label_y,
                LABEL_SCALE,
                font,
                index.category_name(ann.category_id),
            );
        }
    }
}

/// Image files directly inside `dir` with an accepted extension, sorted by
/// name.
pub fn collect_image_files(dir: &Path) -> Result<Vec<PathBuf>> {
    let to_error = |source| Error::ReadDir {
        path: dir.to_path_buf(),
        source,
    };

    let mut files = Vec::new();
    for entry in fs::read_dir(dir).map_err(to_error)? {
        let path = entry.map_err(to_error)?.path();
        if path.is_file() && has_image_extension(&path) {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

/// Load the font used for category labels.
///
/// An explicit path wins; otherwise common system fonts are tried in turn.
pub fn load_font(explicit: Option<&Path>) -> Option<FontVec> {
    if let Some(path) = explicit {
        match fs::read(path).map(FontVec::try_from_vec) {
            Ok(Ok(font)) => return Some(font),
            Ok(Err(e)) => warn!("Invalid font file {}: {}", path.display(), e),
            Err(e) => warn!("Failed to read font {}: {}", path.display(), e),
        }
    }

    for path in FONT_PATHS {
        if let Ok(data) = fs::read(path) {
            if let Ok(font) = FontVec::try_from_vec(data) {
                debug!("Using label font {}", path);
                return Some(font);
            }
        }
    }
    None
}

// Struct to hold visualization statistics
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct VisualizeStats {
    pub total_files: usize,
    pub written: usize,
    pub skipped_unindexed: usize,
    pub failed_loads: usize,
}

impl VisualizeStats {
    pub fn print_summary(&self, save_folder: &Path) {
        info!("=== Visualization Summary ===");
        info!("Image files found: {}", self.total_files);
        info!("Annotated images written: {}", self.written);
        info!(
            "Skipped (not in annotation file): {}",
            self.skipped_unindexed
        );
        if self.failed_loads > 0 {
            warn!("Failed to load: {}", self.failed_loads);
        }
        info!(
            "Visualization complete! Result images saved to '{}'",
            save_folder.display()
        );
    }
}

/// Write an annotated copy of every image in `image_folder` that appears in
/// `coco` to `save_folder`, under the same file name.
///
/// Images missing from the annotation file are skipped. Images that fail to
/// load are warned about and skipped. Failing to save is fatal.
pub fn visualize_folder(
    image_folder: &Path,
    coco: &CocoFile,
    save_folder: &Path,
    font: Option<&FontVec>,
    observer: &dyn ProgressObserver,
) -> Result<VisualizeStats> {
    let index = AnnotationIndex::new(coco);
    let image_files = collect_image_files(image_folder)?;
    create_output_directory(save_folder)?;

    let mut stats = VisualizeStats {
        total_files: image_files.len(),
        ..Default::default()
    };
    observer.start(image_files.len() as u64);

    for image_path in &image_files {
        let result = visualize_one(image_path, &index, save_folder, font, &mut stats);
        observer.advance();
        result?;
    }

    observer.finish();
    Ok(stats)
}

fn visualize_one(
    image_path: &Path,
    index: &AnnotationIndex,
    save_folder: &Path,
    font: Option<&FontVec>,
    stats: &mut VisualizeStats,
) -> Result<()> {
    let Some(file_name) = image_path.file_name().and_then(|s| s.to_str()) else {
        stats.skipped_unindexed += 1;
        return Ok(());
    };
    let Some(record) = index.image(file_name) else {
        debug!("No image record for {}", file_name);
        stats.skipped_unindexed += 1;
        return Ok(());
    };

    let mut image = match image::open(image_path) {
        Ok(img) => img.to_rgb8(),
        Err(e) => {
            warn!("Failed to load image '{}': {}", image_path.display(), e);
            stats.failed_loads += 1;
            return Ok(());
        }
    };

    draw_annotations(&mut image, index.annotations(record.id), index, font);

    save_image(&image, &save_folder.join(file_name))?;
    stats.written += 1;
    Ok(())
}

/// Save in the format the extension implies; JPEGs at [`JPEG_QUALITY`].
pub fn save_image(image: &RgbImage, path: &Path) -> Result<()> {
    let to_save_error = |source| Error::SaveImage {
        path: path.to_path_buf(),
        source,
    };

    let is_jpeg = path
        .extension()
        .map(|ext| matches!(ext.to_string_lossy().to_lowercase().as_str(), "jpg" | "jpeg"))
        .unwrap_or(false);
    if !is_jpeg {
        return image.save(path).map_err(to_save_error);
    }

    let to_write_error = |source| Error::Write {
        path: path.to_path_buf(),
        source,
    };
    let mut writer = BufWriter::new(File::create(path).map_err(to_write_error)?);
    let encoder = JpegEncoder::new_with_quality(&mut writer, JPEG_QUALITY);
    image.write_with_encoder(encoder).map_err(to_save_error)?;
    writer.flush().map_err(to_write_error)
}
