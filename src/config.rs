use clap::Parser;
use std::path::PathBuf;

/// Command-line arguments for converting BDD100K detection labels to COCO format.
#[derive(Parser, Debug, Clone)]
#[command(version, long_about = None)]
pub struct ConvertArgs {
    /// Directory holding the det_<split>.json label files
    #[arg(long = "labels_dir", default_value = "/dataset/bdd100k/labels/det_20")]
    pub labels_dir: PathBuf,

    /// Directory the COCO annotation files are written to
    #[arg(long = "output_dir", default_value = "/dataset/bdd100k/coco_labels/det_20")]
    pub output_dir: PathBuf,

    /// Dataset splits to convert, in order
    #[arg(value_delimiter = ',', default_values = ["train", "val"])]
    pub splits: Vec<String>,
}

impl ConvertArgs {
    pub fn splits(&self) -> Vec<Split> {
        self.splits
            .iter()
            .map(|name| Split::new(name, &self.labels_dir, &self.output_dir))
            .collect()
    }
}

/// Command-line arguments for drawing COCO ground truth onto an image folder.
#[derive(Parser, Debug, Clone)]
#[command(version, long_about = None)]
pub struct VisualizeArgs {
    /// Folder with the images to annotate
    #[arg(long = "image_folder", default_value = "/dataset/bdd100k/images/100k/val")]
    pub image_folder: PathBuf,

    /// COCO annotation file
    #[arg(
        long = "ann",
        default_value = "/dataset/bdd100k/coco_labels/det_20/bdd100k_det20_val_coco.json"
    )]
    pub ann: PathBuf,

    /// Folder the annotated images are saved to
    #[arg(
        long = "save_folder",
        default_value = "/workspace/RT-DETR-WS/results/det20_val_img"
    )]
    pub save_folder: PathBuf,

    /// TrueType font for category labels; common system fonts are tried otherwise
    #[arg(long = "font")]
    pub font: Option<PathBuf>,
}

/// One dataset split and the files it is read from and written to
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Split {
    pub name: String,
    pub input_path: PathBuf,
    pub output_path: PathBuf,
}

impl Split {
    pub fn new(name: &str, labels_dir: &std::path::Path, output_dir: &std::path::Path) -> Self {
        Self {
            name: name.to_string(),
            input_path: labels_dir.join(format!("det_{}.json", name)),
            output_path: output_dir.join(format!("bdd100k_det20_{}_coco.json", name)),
        }
    }
}
