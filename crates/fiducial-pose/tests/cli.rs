#![cfg(all(feature = "cli", feature = "image"))]

use assert_cmd::Command;
use fiducial_pose::aruco::builtins::aruco_original_code;
use fiducial_pose::aruco::render::render_marker;
use predicates::prelude::*;
use std::path::{Path, PathBuf};

fn write_marker_png(dir: &Path, name: &str, id: u32) -> PathBuf {
    let gray = render_marker(aruco_original_code(id), 640, 480, 250.0, 170.0, 20.0);
    let img = image::GrayImage::from_raw(640, 480, gray.data).unwrap();
    let path = dir.join(name);
    img.save(&path).unwrap();
    path
}

fn write_config(dir: &Path) -> PathBuf {
    let path = dir.join("cfg.json");
    std::fs::write(
        &path,
        r#"{ "markers": { "3": "0.1_0_0_0_0_0_0" }, "frame_id": "bench" }"#,
    )
    .unwrap();
    path
}

#[test]
fn prints_pose_for_known_marker() {
    let dir = tempfile::tempdir().unwrap();
    let png = write_marker_png(dir.path(), "marker.png", 3);
    let cfg = write_config(dir.path());

    Command::cargo_bin("fiducial-pose")
        .unwrap()
        .args(["--log-level", "off", "--config"])
        .arg(&cfg)
        .arg(&png)
        .assert()
        .success()
        .stdout(predicate::str::contains(r#""outcome":"located""#))
        .stdout(predicate::str::contains(r#""frame_id":"bench""#))
        .stdout(predicate::str::contains(r#""visible":true"#));
}

#[test]
fn unreadable_image_does_not_stop_the_run() {
    let dir = tempfile::tempdir().unwrap();
    let png = write_marker_png(dir.path(), "unknown.png", 9);
    let cfg = write_config(dir.path());
    let missing = dir.path().join("missing.png");

    let assert = Command::cargo_bin("fiducial-pose")
        .unwrap()
        .args(["--log-level", "off", "--config"])
        .arg(&cfg)
        .arg(&missing)
        .arg(&png)
        .assert()
        .success();

    let out = String::from_utf8(assert.get_output().stdout.clone()).unwrap();
    let lines: Vec<&str> = out.lines().collect();
    assert_eq!(lines.len(), 2);
    assert!(lines[0].contains(r#""error""#));
    assert!(lines[1].contains(r#""outcome":"not_visible""#));
    assert!(lines[1].contains(r#""visible":false"#));
}

#[test]
fn unknown_log_level_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let png = write_marker_png(dir.path(), "marker.png", 3);

    Command::cargo_bin("fiducial-pose")
        .unwrap()
        .args(["--log-level", "loud"])
        .arg(&png)
        .assert()
        .failure()
        .stderr(predicate::str::contains("unknown log level"));
}

#[test]
fn log_level_controls_stderr() {
    let dir = tempfile::tempdir().unwrap();
    let png = write_marker_png(dir.path(), "marker.png", 3);
    let cfg = write_config(dir.path());
    let run = |level: &str| {
        let assert = Command::cargo_bin("fiducial-pose")
            .unwrap()
            .env_remove("RUST_LOG")
            .args(["--log-level", level, "--config"])
            .arg(&cfg)
            .arg(&png)
            .assert()
            .success();
        String::from_utf8(assert.get_output().stderr.clone()).unwrap()
    };

    assert!(run("off").is_empty());
    assert!(run("debug").contains("marker candidates"));
}

#[test]
fn requires_an_image() {
    Command::cargo_bin("fiducial-pose")
        .unwrap()
        .assert()
        .failure()
        .stderr(predicate::str::contains("IMAGES"));
}
