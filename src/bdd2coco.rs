use clap::Parser;
use log::{error, info};

use bdd2coco::{convert_file, create_progress_bar, CategoryTable, ConvertArgs};

fn main() {
    // Initialize the logger
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = ConvertArgs::parse();

    let table = CategoryTable::bdd100k();

    for split in args.splits() {
        info!("=== Processing {} split ===", split.name.to_uppercase());

        let pb = create_progress_bar(&split.name);
        match convert_file(&split.input_path, &split.output_path, &table, &pb) {
            Ok(summary) => summary.print_summary(),
            Err(e) => {
                pb.abandon();
                error!("Failed to convert {} split: {}", split.name, e);
                std::process::exit(1);
            }
        }
    }
}
