use bdd2coco::coco::{
    bbox_from_corners, CategoryTable, CocoFile, Coord, IMAGE_HEIGHT, IMAGE_WIDTH,
};
use bdd2coco::config::{ConvertArgs, Split};
use bdd2coco::conversion::{convert_file, convert_frames, CategoryCounts};
use bdd2coco::progress::{NoProgress, ProgressObserver};
use bdd2coco::types::{has_image_extension, Frame};
use bdd2coco::utils::{read_json, to_writer_pretty4};
use bdd2coco::visualize::AnnotationIndex;
use bdd2coco::Error;
use clap::Parser;
use std::cell::Cell;
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

fn parse_frames(json: &str) -> Vec<Frame> {
    serde_json::from_str(json).unwrap()
}

fn convert_json(json: &str) -> CocoFile {
    convert_frames(&parse_frames(json), &CategoryTable::bdd100k(), &NoProgress)
}

fn count_of(counts: &CategoryCounts, id: u32) -> Option<usize> {
    counts.0.iter().find(|c| c.id == id).map(|c| c.count)
}

fn ints(values: [i64; 4]) -> [Coord; 4] {
    values.map(Coord::Int)
}

#[test]
fn test_category_table() {
    let table = CategoryTable::bdd100k();
    assert_eq!(table.categories().len(), 10);
    assert_eq!(table.lookup("pedestrian"), Some(1));
    assert_eq!(table.lookup("Car "), Some(3));
    assert_eq!(table.lookup("  TRAFFIC LIGHT"), Some(9));
    assert_eq!(table.lookup("traffic sign"), Some(10));
    assert_eq!(table.lookup("trailer"), None);
    assert_eq!(table.lookup("trafficlight"), None);
    assert_eq!(table.categories()[6].name, "motorcycle");
}

#[test]
fn test_bbox_from_corners() {
    let [x1, y1, x2, y2] = ints([10, 20, 50, 60]);
    assert_eq!(bbox_from_corners(x1, y1, x2, y2), ints([10, 20, 40, 40]));

    // A float corner turns only the extent it takes part in into a float
    assert_eq!(
        bbox_from_corners(Coord::Float(1.5), Coord::Int(2), Coord::Int(4), Coord::Int(5)),
        [Coord::Float(1.5), Coord::Int(2), Coord::Float(2.5), Coord::Int(3)]
    );
}

#[test]
fn test_single_car_scenario() {
    let coco = convert_json(
        r#"[{"name":"a.jpg","labels":[{"category":"Car ","box2d":{"x1":10,"y1":20,"x2":50,"y2":60}}]}]"#,
    );

    assert_eq!(coco.images.len(), 1);
    let image = &coco.images[0];
    assert_eq!(image.id, 1);
    assert_eq!(image.file_name, "a.jpg");
    assert_eq!(image.width, IMAGE_WIDTH);
    assert_eq!(image.height, IMAGE_HEIGHT);

    assert_eq!(coco.annotations.len(), 1);
    let ann = &coco.annotations[0];
    assert_eq!(ann.id, 1);
    assert_eq!(ann.image_id, 1);
    assert_eq!(ann.category_id, 3);
    assert_eq!(ann.bbox, ints([10, 20, 40, 40]));
    assert_eq!(ann.area, Coord::Int(1600));
    assert_eq!(ann.iscrowd, 0);
    assert!(ann.segmentation.is_empty());

    assert_eq!(coco.categories.len(), 10);
    assert_eq!(coco.categories[0].name, "pedestrian");
}

#[test]
fn test_skips_labels_but_never_images() {
    let coco = convert_json(
        r#"[
            {"name": "a.jpg", "labels": [
                {"category": "car", "box2d": {"x1": 0, "y1": 0, "x2": 10, "y2": 10}},
                {"category": "drivable area", "poly2d": []},
                {"category": "lane", "box2d": {"x1": 0, "y1": 0, "x2": 1, "y2": 1}},
                {"category": "bus"}
            ]},
            {"name": "b.jpg"},
            {"name": "c.jpg", "labels": null},
            {"name": "d.jpg", "labels": [{"box2d": {"x1": 0, "y1": 0, "x2": 2, "y2": 2}}]},
            {"name": "e.jpg", "labels": [
                {"category": "Rider", "box2d": {"x1": 5, "y1": 5, "x2": 8, "y2": 9}}
            ]}
        ]"#,
    );

    assert_eq!(coco.images.len(), 5);
    let names: Vec<_> = coco.images.iter().map(|i| i.file_name.as_str()).collect();
    assert_eq!(names, ["a.jpg", "b.jpg", "c.jpg", "d.jpg", "e.jpg"]);

    assert_eq!(coco.annotations.len(), 2);
    assert_eq!(coco.annotations[0].image_id, 1);
    assert_eq!(coco.annotations[0].category_id, 3);
    assert_eq!(coco.annotations[1].id, 2);
    assert_eq!(coco.annotations[1].image_id, 5);
    assert_eq!(coco.annotations[1].category_id, 2);
    assert_eq!(coco.annotations[1].area, Coord::Int(12));
}

#[test]
fn test_ids_are_dense_and_invariants_hold() {
    let mut frames = String::from("[");
    for i in 0..20 {
        if i > 0 {
            frames.push(',');
        }
        let category = ["car", "truck", "unknown", "traffic sign"][i % 4];
        frames.push_str(&format!(
            r#"{{"name": "img{i}.jpg", "labels": [
                {{"category": "{category}", "box2d": {{"x1": {i}, "y1": 1.5, "x2": {x2}, "y2": 7.25}}}},
                {{"category": "pedestrian", "box2d": {{"x1": 3, "y1": 4, "x2": 9, "y2": 12}}}}
            ]}}"#,
            x2 = i * 2 + 3
        ));
    }
    frames.push(']');

    let table = CategoryTable::bdd100k();
    let coco = convert_json(&frames);

    assert_eq!(coco.images.len(), 20);
    for (idx, image) in coco.images.iter().enumerate() {
        assert_eq!(image.id as usize, idx + 1);
    }

    // one in four frames carries an unknown category
    assert_eq!(coco.annotations.len(), 35);
    let valid_ids: HashSet<u32> = table.categories().iter().map(|c| c.id).collect();
    for (idx, ann) in coco.annotations.iter().enumerate() {
        assert_eq!(ann.id as usize, idx + 1);
        assert!(valid_ids.contains(&ann.category_id));
        assert_eq!(ann.area, ann.bbox[2] * ann.bbox[3]);
        assert!(ann.area.as_f64() >= 0.0);
    }
}

#[test]
fn test_category_counts() {
    let coco = convert_json(
        r#"[
            {"name": "a.jpg", "labels": [
                {"category": "car", "box2d": {"x1": 0, "y1": 0, "x2": 10, "y2": 10}},
                {"category": "car", "box2d": {"x1": 0, "y1": 0, "x2": 5, "y2": 5}},
                {"category": "bicycle", "box2d": {"x1": 0, "y1": 0, "x2": 5, "y2": 5}},
                {"category": "train"}
            ]}
        ]"#,
    );

    let counts = CategoryCounts::tally(&coco, &CategoryTable::bdd100k());
    assert_eq!(counts.0.len(), 10);
    assert_eq!(count_of(&counts, 3), Some(2));
    assert_eq!(count_of(&counts, 8), Some(1));
    assert_eq!(count_of(&counts, 6), Some(0));
    assert_eq!(counts.total(), 3);
    assert_eq!(counts.0[0].name, "pedestrian");
}

struct CountingObserver {
    len: Cell<u64>,
    advanced: Cell<u64>,
    finished: Cell<bool>,
}

impl ProgressObserver for CountingObserver {
    fn start(&self, len: u64) {
        self.len.set(len);
    }

    fn advance(&self) {
        self.advanced.set(self.advanced.get() + 1);
    }

    fn finish(&self) {
        self.finished.set(true);
    }
}

#[test]
fn test_observer_does_not_affect_output() {
    let json = r#"[{"name": "a.jpg"}, {"name": "b.jpg", "labels": [
        {"category": "bus", "box2d": {"x1": 1, "y1": 1, "x2": 2, "y2": 2}}]}]"#;
    let observer = CountingObserver {
        len: Cell::new(0),
        advanced: Cell::new(0),
        finished: Cell::new(false),
    };

    let observed = convert_frames(&parse_frames(json), &CategoryTable::bdd100k(), &observer);
    assert_eq!(observer.len.get(), 2);
    assert_eq!(observer.advanced.get(), 2);
    assert!(observer.finished.get());
    assert_eq!(observed, convert_json(json));
}

#[test]
fn test_convert_file_writes_pretty_coco() {
    let temp_dir = tempfile::tempdir().unwrap();
    let input = temp_dir.path().join("det_val.json");
    let output = temp_dir.path().join("coco").join("val_coco.json");
    fs::write(
        &input,
        r#"[{"name":"a.jpg","attributes":{"weather":"clear"},"labels":[
            {"id":"0","category":"Car ","attributes":{"occluded":false},
             "box2d":{"x1":10,"y1":20,"x2":50,"y2":60}}]}]"#,
    )
    .unwrap();

    let summary = convert_file(&input, &output, &CategoryTable::bdd100k(), &NoProgress).unwrap();
    assert_eq!(summary.num_images, 1);
    assert_eq!(count_of(&summary.counts, 3), Some(1));
    assert_eq!(summary.output, output);
    assert!(!temp_dir.path().join("coco").join("val_coco.json.tmp").exists());

    let content = fs::read_to_string(&output).unwrap();
    assert!(content.starts_with("{\n    \"images\": [\n        {\n"));
    assert!(content.contains("\n    \"categories\": ["));

    let value: serde_json::Value = serde_json::from_str(&content).unwrap();
    let ann = &value["annotations"][0];
    assert_eq!(ann["id"], 1);
    assert_eq!(ann["image_id"], 1);
    assert_eq!(ann["category_id"], 3);
    assert_eq!(ann["area"], 1600);
    assert_eq!(ann["iscrowd"], 0);
    assert_eq!(ann["segmentation"], serde_json::json!([]));
    assert_eq!(ann["bbox"], serde_json::json!([10, 20, 40, 40]));
    assert!(content.contains("\"area\": 1600,"));
    assert_eq!(value["images"][0]["file_name"], "a.jpg");
    assert_eq!(value["images"][0]["width"], 1280);
    assert_eq!(value["images"][0]["height"], 720);
    assert_eq!(value["categories"][9]["name"], "traffic sign");

    // The written file reads back as the same model
    let reread: CocoFile = read_json(&output).unwrap();
    assert_eq!(reread.annotations.len(), 1);
}

#[test]
fn test_malformed_input_writes_nothing() {
    let temp_dir = tempfile::tempdir().unwrap();
    let output = temp_dir.path().join("out.json");

    let truncated = temp_dir.path().join("truncated.json");
    fs::write(&truncated, r#"[{"name": "a.jpg", "labels": ["#).unwrap();
    let err = convert_file(&truncated, &output, &CategoryTable::bdd100k(), &NoProgress)
        .unwrap_err();
    assert!(matches!(err, Error::Parse { .. }));

    // A box2d missing a corner is malformed, not a skippable label
    let partial_box = temp_dir.path().join("partial.json");
    fs::write(
        &partial_box,
        r#"[{"name": "a.jpg", "labels": [{"category": "car", "box2d": {"x1": 1, "y1": 2}}]}]"#,
    )
    .unwrap();
    let err = convert_file(&partial_box, &output, &CategoryTable::bdd100k(), &NoProgress)
        .unwrap_err();
    assert!(matches!(err, Error::Parse { .. }));

    let missing = temp_dir.path().join("missing.json");
    let err =
        convert_file(&missing, &output, &CategoryTable::bdd100k(), &NoProgress).unwrap_err();
    assert!(matches!(err, Error::Read { .. }));

    assert!(!output.exists());
}

#[test]
fn test_failed_write_leaves_no_output() {
    let temp_dir = tempfile::tempdir().unwrap();
    let input = temp_dir.path().join("det_train.json");
    fs::write(&input, r#"[{"name": "a.jpg"}]"#).unwrap();

    // The output path is an existing directory, so the final rename fails
    let output = temp_dir.path().join("taken");
    fs::create_dir(&output).unwrap();
    fs::write(output.join("keep.txt"), "x").unwrap();

    let err =
        convert_file(&input, &output, &CategoryTable::bdd100k(), &NoProgress).unwrap_err();
    assert!(matches!(err, Error::Write { .. }));
    assert!(output.is_dir());
    assert!(!temp_dir.path().join("taken.tmp").exists());
}

#[test]
fn test_pretty_print_uses_four_spaces() {
    let mut buf = Vec::new();
    to_writer_pretty4(&mut buf, &serde_json::json!({"a": [1]})).unwrap();
    assert_eq!(String::from_utf8(buf).unwrap(), "{\n    \"a\": [\n        1\n    ]\n}");
}

#[test]
fn test_has_image_extension() {
    assert!(has_image_extension(Path::new("a.jpg")));
    assert!(has_image_extension(Path::new("b.JPEG")));
    assert!(has_image_extension(Path::new("dir/c.Png")));
    assert!(!has_image_extension(Path::new("d.bmp")));
    assert!(!has_image_extension(Path::new("labels.json")));
    assert!(!has_image_extension(Path::new("jpg")));
}

#[test]
fn test_convert_args_defaults() {
    let args = ConvertArgs::parse_from(["bdd2coco"]);
    let splits = args.splits();
    assert_eq!(splits.len(), 2);
    assert_eq!(
        splits[0],
        Split {
            name: "train".to_string(),
            input_path: PathBuf::from("/dataset/bdd100k/labels/det_20/det_train.json"),
            output_path: PathBuf::from(
                "/dataset/bdd100k/coco_labels/det_20/bdd100k_det20_train_coco.json"
            ),
        }
    );
    assert_eq!(splits[1].name, "val");

    let args = ConvertArgs::parse_from(["bdd2coco", "--labels_dir", "/tmp/in", "val"]);
    let splits = args.splits();
    assert_eq!(splits.len(), 1);
    assert_eq!(splits[0].input_path, PathBuf::from("/tmp/in/det_val.json"));
}

#[test]
fn test_float_corners_stay_floats() {
    let temp_dir = tempfile::tempdir().unwrap();
    let input = temp_dir.path().join("det_val.json");
    let output = temp_dir.path().join("val_coco.json");
    fs::write(
        &input,
        r#"[{"name": "b.jpg", "labels": [
            {"category": "truck", "box2d": {"x1": 1125.902264, "y1": 133.184488, "x2": 1156.978645, "y2": 210.875445}},
            {"category": "bus", "box2d": {"x1": 10.0, "y1": 20, "x2": 50.0, "y2": 60}}
        ]}]"#,
    )
    .unwrap();

    convert_file(&input, &output, &CategoryTable::bdd100k(), &NoProgress).unwrap();
    let content = fs::read_to_string(&output).unwrap();
    let value: serde_json::Value = serde_json::from_str(&content).unwrap();

    let truck = &value["annotations"][0];
    assert_eq!(truck["bbox"][0].as_f64(), Some(1125.902264));
    let width = truck["bbox"][2].as_f64().unwrap();
    assert!((width - (1156.978645 - 1125.902264)).abs() < 1e-9);

    // Float-written corners keep their float form, integer ones stay integers
    let bus = &value["annotations"][1];
    assert!(bus["bbox"][0].is_f64());
    assert!(bus["bbox"][1].is_u64());
    assert!(bus["bbox"][2].is_f64());
    assert!(bus["bbox"][3].is_u64());
    assert_eq!(bus["area"].as_f64(), Some(1600.0));
    assert!(content.contains("\"area\": 1600.0,"));

    // The visualizer reads either number form back
    let reread: CocoFile = read_json(&output).unwrap();
    let index = AnnotationIndex::new(&reread);
    let anns = index.annotations(1);
    assert_eq!(anns[1].bbox[1], Coord::Int(20));
    assert_eq!(anns[1].bbox[0], Coord::Float(10.0));
}
