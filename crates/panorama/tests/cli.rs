#![cfg(feature = "cli")]

use std::path::Path;

use assert_cmd::Command;
use predicates::prelude::*;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Noisy grey scene with random coloured rectangles.
fn scene(width: u32, height: u32, seed: u64) -> image::RgbImage {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut img = image::RgbImage::from_fn(width, height, |_, _| {
        let g = rng.random_range(90u8..110);
        image::Rgb([g, g, g])
    });
    for _ in 0..700 {
        let (w, h) = (rng.random_range(6..30u32), rng.random_range(6..30u32));
        let (x0, y0) = (rng.random_range(0..width - w), rng.random_range(0..height - h));
        let colour = image::Rgb([rng.random(), rng.random(), rng.random()]);
        for y in y0..y0 + h {
            for x in x0..x0 + w {
                img.put_pixel(x, y, colour);
            }
        }
    }
    img
}

fn write_job(dir: &Path) -> std::path::PathBuf {
    let full = scene(780, 240, 11);
    let mut paths = Vec::new();
    for (i, x0) in [0u32, 240, 480].into_iter().enumerate() {
        let tile = image::imageops::crop_imm(&full, x0, 0, 300, 240).to_image();
        let path = dir.join(format!("shot_{i}.png"));
        tile.save(&path).expect("save tile");
        paths.push(path);
    }
    let config = serde_json::json!({
        "image_paths": paths,
        "output_path": dir.join("pano.png"),
        "report_path": dir.join("report.json"),
    });
    let config_path = dir.join("stitch.json");
    std::fs::write(&config_path, config.to_string()).expect("write config");
    config_path
}

#[test]
fn stitch_then_locate() {
    let dir = tempfile::tempdir().expect("tempdir");
    let config_path = write_job(dir.path());

    Command::cargo_bin("panorama")
        .expect("binary")
        .arg("stitch")
        .arg(&config_path)
        .assert()
        .success()
        .stdout(predicate::str::contains("stitched 3 images"));
    assert!(dir.path().join("pano.png").exists());

    let report = dir.path().join("report.json");
    Command::cargo_bin("panorama")
        .expect("binary")
        .args(["locate"])
        .arg(&report)
        .args(["390", "120"])
        .assert()
        .success()
        .stdout(predicate::str::contains("source 1").and(predicate::str::contains("shot_1.png")));

    Command::cargo_bin("panorama")
        .expect("binary")
        .arg("locate")
        .arg(&report)
        .args(["-5", "120"])
        .assert()
        .success()
        .stdout(predicate::str::contains("not found"));
}

#[test]
fn missing_config_fails() {
    let dir = tempfile::tempdir().expect("tempdir");
    Command::cargo_bin("panorama")
        .expect("binary")
        .arg("stitch")
        .arg(dir.path().join("absent.json"))
        .assert()
        .failure()
        .stderr(predicate::str::contains("error"));
}
