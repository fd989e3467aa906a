use clap::Parser;
use log::{error, info, warn};

use bdd2coco::utils::read_json;
use bdd2coco::visualize::load_font;
use bdd2coco::{create_progress_bar, visualize_folder, CocoFile, VisualizeArgs};

fn main() {
    // Initialize the logger
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = VisualizeArgs::parse();

    let coco: CocoFile = match read_json(&args.ann) {
        Ok(coco) => coco,
        Err(e) => {
            error!("Failed to load annotations: {}", e);
            std::process::exit(1);
        }
    };
    info!(
        "Loaded {} images and {} annotations from {}",
        coco.images.len(),
        coco.annotations.len(),
        args.ann.display()
    );

    let font = load_font(args.font.as_deref());
    if font.is_none() {
        warn!("No usable font found; drawing boxes without category labels");
    }

    let pb = create_progress_bar("Visualizing images");
    match visualize_folder(
        &args.image_folder,
        &coco,
        &args.save_folder,
        font.as_ref(),
        &pb,
    ) {
        Ok(stats) => stats.print_summary(&args.save_folder),
        Err(e) => {
            pb.abandon();
            error!("Visualization stopped: {}", e);
            std::process::exit(1);
        }
    }
}
