use std::fs;
use std::path::Path;
use std::process::{Command, Output};

use image::{Rgba, RgbaImage};
use tempfile::TempDir;

fn pixelsort(config_dir: &Path, args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_pixelsort"))
        .args(args)
        .env("PIXELSORT_CONFIG_DIR", config_dir)
        .env("RUST_LOG", "warn")
        .output()
        .expect("spawn pixelsort")
}

fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).into_owned()
}

#[test]
fn inspect_prints_sorted_summary() {
    let root = TempDir::new().unwrap();
    let path = root.path().join("pair.png");
    let mut img = RgbaImage::new(2, 1);
    img.put_pixel(0, 0, Rgba([255, 0, 0, 255]));
    img.put_pixel(1, 0, Rgba([0, 0, 0, 255]));
    img.save(&path).unwrap();

    let output = pixelsort(root.path(), &["inspect", path.to_str().unwrap()]);
    assert!(output.status.success(), "stderr: {}", String::from_utf8_lossy(&output.stderr));
    let text = stdout(&output);
    assert!(text.contains("dimensions: 2x1"), "{text}");
    assert!(text.contains("samples: 2"), "{text}");
    assert!(text.contains("brightness: 0.000 .. 76.245"), "{text}");
    assert!(text.contains("darkest first: 2 1"), "{text}");
}

#[test]
fn inspect_reports_unreadable_image() {
    let root = TempDir::new().unwrap();
    let path = root.path().join("broken.png");
    fs::write(&path, b"not a png").unwrap();

    let output = pixelsort(root.path(), &["inspect", path.to_str().unwrap()]);
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("failed to decode image"));
}

#[test]
fn config_prints_defaults_without_a_file() {
    let root = TempDir::new().unwrap();
    let output = pixelsort(root.path(), &["config"]);
    assert!(output.status.success());
    let text = stdout(&output);
    let parsed = sortconfig::ViewerConfig::from_toml_str(&text).unwrap();
    assert_eq!(parsed, sortconfig::ViewerConfig::default());
}

#[test]
fn config_merges_file_and_overrides() {
    let root = TempDir::new().unwrap();
    fs::write(
        root.path().join("config.toml"),
        "version = 1\n[render]\nantialias = 4\n[phase]\ngain = 2.0\n",
    )
    .unwrap();

    let output = pixelsort(
        root.path(),
        &["config", "--size", "320x240", "--phase-offset", "-0.25"],
    );
    assert!(output.status.success(), "stderr: {}", String::from_utf8_lossy(&output.stderr));
    let parsed = sortconfig::ViewerConfig::from_toml_str(&stdout(&output)).unwrap();
    assert_eq!(parsed.render.antialias, sortconfig::AntialiasSetting::Samples4);
    assert_eq!(parsed.window_size(), Some((320, 240)));
    assert_eq!(parsed.phase.gain, 2.0);
    assert_eq!(parsed.phase.offset, -0.25);
}

#[test]
fn invalid_config_file_is_reported() {
    let root = TempDir::new().unwrap();
    fs::write(root.path().join("config.toml"), "version = 9\n").unwrap();

    let output = pixelsort(root.path(), &["config"]);
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("unsupported config version"));
}

#[test]
fn viewer_requires_an_image() {
    let root = TempDir::new().unwrap();
    let output = pixelsort(root.path(), &[]);
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("no IMAGE given"));
}
