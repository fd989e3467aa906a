use log::{debug, info};
use std::path::{Path, PathBuf};

use crate::coco::{bbox_from_corners, CategoryTable, CocoFile, CocoWriter};
use crate::error::Result;
use crate::progress::ProgressObserver;
use crate::types::Frame;
use crate::utils::{read_json, write_json_atomic};

/// Convert BDD100K frames into a COCO dataset.
///
/// Every frame becomes one image record, in input order. A label becomes an
/// annotation only if its category is in `table` and it carries a `box2d`.
pub fn convert_frames(
    frames: &[Frame],
    table: &CategoryTable,
    observer: &dyn ProgressObserver,
) -> CocoFile {
    let mut writer = CocoWriter::new(table);
    observer.start(frames.len() as u64);

    for frame in frames {
        let image_id = writer.add_image(frame.name.clone());

        for label in frame.labels() {
            let Some(category_id) = label.category.as_deref().and_then(|c| table.lookup(c)) else {
                debug!(
                    "Skipping label with unknown category {:?} in {}",
                    label.category, frame.name
                );
                continue;
            };
            let Some(b) = label.box2d else {
                debug!("Skipping label without box2d in {}", frame.name);
                continue;
            };
            writer.add_annotation(
                image_id,
                category_id,
                bbox_from_corners(b.x1, b.y1, b.x2, b.y2),
            );
        }

        observer.advance();
    }

    observer.finish();
    writer.finish()
}

/// Annotation count per category, in table order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CategoryCount {
    pub id: u32,
    pub name: String,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CategoryCounts(pub Vec<CategoryCount>);

impl CategoryCounts {
    /// Count emitted annotations per category. Every table entry appears,
    /// unused ones with a zero count.
    pub fn tally(coco: &CocoFile, table: &CategoryTable) -> Self {
        let mut counts: Vec<CategoryCount> = table
            .categories()
            .iter()
            .map(|c| CategoryCount {
                id: c.id,
                name: c.name.clone(),
                count: 0,
            })
            .collect();

        for ann in &coco.annotations {
            if let Some(entry) = counts.iter_mut().find(|c| c.id == ann.category_id) {
                entry.count += 1;
            }
        }
        Self(counts)
    }

    pub fn total(&self) -> usize {
        self.0.iter().map(|c| c.count).sum()
    }
}

/// Outcome of converting one label file
#[derive(Debug, Clone)]
pub struct ConversionSummary {
    pub input: PathBuf,
    pub output: PathBuf,
    pub num_images: usize,
    pub counts: CategoryCounts,
}

impl ConversionSummary {
    pub fn print_summary(&self) {
        info!(
            "[{}] Total images: {}",
            self.input.display(),
            self.num_images
        );
        info!("Annotations per category:");
        for c in &self.counts.0 {
            info!("  {} (id: {}): {}", c.name, c.id, c.count);
        }
        info!("Total annotations: {}", self.counts.total());
        info!(
            "Conversion complete! COCO annotation file saved to '{}'",
            self.output.display()
        );
    }
}

/// Convert a BDD100K label file into a COCO annotation file.
///
/// Malformed input aborts before anything is written.
pub fn convert_file(
    input: &Path,
    output: &Path,
    table: &CategoryTable,
    observer: &dyn ProgressObserver,
) -> Result<ConversionSummary> {
    info!("Reading labels from {}", input.display());
    let frames: Vec<Frame> = read_json(input)?;

    let coco = convert_frames(&frames, table, observer);
    write_json_atomic(output, &coco)?;

    Ok(ConversionSummary {
        input: input.to_path_buf(),
        output: output.to_path_buf(),
        num_images: coco.images.len(),
        counts: CategoryCounts::tally(&coco, table),
    })
}
