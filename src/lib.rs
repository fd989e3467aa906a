//! BDD100K to COCO format converter
//!
//! This library converts BDD100K detection label files to COCO annotation
//! files and draws COCO ground truth onto images for manual inspection.

pub mod coco;
pub mod config;
pub mod conversion;
pub mod error;
pub mod progress;
pub mod types;
pub mod utils;
pub mod visualize;

// Re-export commonly used types and functions
pub use coco::{CategoryTable, CocoFile, CocoWriter};
pub use config::{ConvertArgs, Split, VisualizeArgs};
pub use conversion::{convert_file, convert_frames, CategoryCounts, ConversionSummary};
pub use error::{Error, Result};
pub use progress::{create_progress_bar, NoProgress, ProgressObserver};
pub use types::{Box2d, Frame, Label};
pub use visualize::{visualize_folder, AnnotationIndex, VisualizeStats};
