//! CLI Integration Tests
//!
//! Drives the `streak` commands through their library entry points with
//! scene and config files in temporary directories.

use std::path::PathBuf;

use clap::Parser;
use streak_cli::{load_config, load_stage, run, CliArgs, Command};
use tempfile::TempDir;

const SCENE: &str = r##"{
    "attrs": {"width": 200, "height": 100},
    "className": "Stage",
    "children": [
        {
            "attrs": {"id": "background"},
            "className": "Layer",
            "children": [
                {"attrs": {"width": 200, "height": 100, "fill": "#eeeeee", "listening": false}, "className": "Rect"}
            ]
        },
        {
            "attrs": {"id": "main"},
            "className": "Layer",
            "children": [
                {"attrs": {"id": "box", "name": "button primary", "x": 10, "y": 10, "width": 50, "height": 50, "fill": "red"}, "className": "Rect"},
                {
                    "attrs": {"name": "ring-group"},
                    "className": "Group",
                    "children": [
                        {"attrs": {"x": 150, "y": 50, "radius": 20, "fill": "blue"}, "className": "Circle"}
                    ]
                }
            ]
        }
    ]
}"##;

const PNG_MAGIC: [u8; 8] = [0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A];

fn write_scene(dir: &TempDir) -> PathBuf {
    let path = dir.path().join("scene.json");
    std::fs::write(&path, SCENE).expect("write scene");
    path
}

fn parse(args: &[&str]) -> CliArgs {
    CliArgs::try_parse_from(args).expect("parse args")
}

// ============================================================================
// Argument parsing
// ============================================================================

#[test]
fn test_parse_render_command() {
    let args = parse(&["streak", "render", "a.json", "--out", "a.png", "--layer", "1"]);
    match args.command {
        Command::Render { scene, out, layer } => {
            assert_eq!(scene, PathBuf::from("a.json"));
            assert_eq!(out, PathBuf::from("a.png"));
            assert_eq!(layer, Some(1));
        }
        other => panic!("unexpected command {other:?}"),
    }
}

#[test]
fn test_parse_global_pixel_ratio() {
    let args = parse(&["streak", "tree", "a.json", "--pixel-ratio", "2"]);
    assert_eq!(args.pixel_ratio, Some(2.0));
}

#[test]
fn test_parse_requires_out_for_render() {
    assert!(CliArgs::try_parse_from(["streak", "render", "a.json"]).is_err());
}

// ============================================================================
// Render
// ============================================================================

#[test]
fn test_render_writes_valid_png() {
    let dir = TempDir::new().expect("tempdir");
    let scene = write_scene(&dir);
    let out = dir.path().join("out.png");
    let args = parse(&[
        "streak",
        "render",
        scene.to_str().expect("utf8"),
        "--out",
        out.to_str().expect("utf8"),
    ]);
    let message = run(&args).expect("render");
    assert!(message.starts_with("wrote "));
    let bytes = std::fs::read(&out).expect("read png");
    assert_eq!(&bytes[..8], &PNG_MAGIC);
}

#[test]
fn test_render_single_layer_and_bad_index() {
    let dir = TempDir::new().expect("tempdir");
    let scene = write_scene(&dir);
    let stage = load_stage(&scene, load_config(None, None).expect("config")).expect("stage");
    let png = streak_cli::render(&stage, Some(1)).expect("layer render");
    assert_eq!(&png[..8], &PNG_MAGIC);
    let err = streak_cli::render(&stage, Some(5)).expect_err("out of range");
    assert!(err.to_string().contains("out of range"));
}

#[test]
fn test_missing_scene_reports_path() {
    let dir = TempDir::new().expect("tempdir");
    let missing = dir.path().join("missing.json");
    let err = load_stage(&missing, load_config(None, None).expect("config"))
        .expect_err("missing file");
    assert!(err.to_string().contains("missing.json"));
}

// ============================================================================
// Pick
// ============================================================================

#[test]
fn test_pick_reports_topmost_shape() {
    let dir = TempDir::new().expect("tempdir");
    let scene = write_scene(&dir);
    let path = scene.to_str().expect("utf8");

    let hit = run(&parse(&["streak", "pick", path, "--x", "20", "--y", "20"])).expect("pick");
    assert_eq!(hit, "Rect #box .button .primary");

    let miss = run(&parse(&["streak", "pick", path, "--x", "100", "--y", "90"])).expect("pick");
    assert_eq!(miss, "no hit");
}

#[test]
fn test_pick_with_selector_and_json() {
    let dir = TempDir::new().expect("tempdir");
    let scene = write_scene(&dir);
    let path = scene.to_str().expect("utf8");

    let group = run(&parse(&[
        "streak",
        "pick",
        path,
        "--x",
        "150",
        "--y",
        "50",
        "--selector",
        ".ring-group",
    ]))
    .expect("pick");
    assert_eq!(group, "Group .ring-group");

    let json = run(&parse(&[
        "streak", "pick", path, "--x", "20", "--y", "20", "--json",
    ]))
    .expect("pick");
    let value: serde_json::Value = serde_json::from_str(&json).expect("json");
    assert_eq!(value["className"], "Rect");
    assert_eq!(value["id"], "box");
}

#[test]
fn test_pick_with_pixel_ratio_from_config_file() {
    let dir = TempDir::new().expect("tempdir");
    let scene = write_scene(&dir);
    let config = dir.path().join("engine.json");
    std::fs::write(&config, r#"{"pixelRatio": 3, "showWarnings": false}"#).expect("config");

    let loaded = load_config(Some(&config), None).expect("config");
    assert!((loaded.pixel_ratio - 3.0).abs() < f64::EPSILON);
    assert!(!loaded.show_warnings);
    let overridden = load_config(Some(&config), Some(2.0)).expect("config");
    assert!((overridden.pixel_ratio - 2.0).abs() < f64::EPSILON);

    let hit = run(&parse(&[
        "streak",
        "--config",
        config.to_str().expect("utf8"),
        "pick",
        scene.to_str().expect("utf8"),
        "--x",
        "59.5",
        "--y",
        "59.5",
    ]))
    .expect("pick");
    assert_eq!(hit, "Rect #box .button .primary");
}

// ============================================================================
// Tree
// ============================================================================

#[test]
fn test_tree_outline() {
    let dir = TempDir::new().expect("tempdir");
    let scene = write_scene(&dir);
    let outline = run(&parse(&["streak", "tree", scene.to_str().expect("utf8")])).expect("tree");
    let expected = "\
Stage
  Layer #background
    Rect
  Layer #main
    Rect #box .button .primary
    Group .ring-group
      Circle
";
    assert_eq!(outline, expected);
}
