use assert_cmd::prelude::*;
use predicates::str::contains;
use std::io::Write;
use std::process::Command;
use tempfile::NamedTempFile;

fn write_obj() -> NamedTempFile {
    let contents = "\
v 0 0 0
v 1 0 0
v 0 1 0
f 1 2 3
";
    let mut tmp = tempfile::Builder::new()
        .suffix(".obj")
        .tempfile()
        .expect("temp obj");
    tmp.write_all(contents.as_bytes()).expect("write obj");
    tmp
}

#[test]
fn headless_cube_prints_the_pass_transcript() {
    let mut cmd = Command::cargo_bin("umbra-viewer").expect("binary exists");
    cmd.arg("--headless").arg("--frames").arg("3");
    cmd.assert()
        .success()
        .stdout(contains("Scene 'cube': 2 lights, 1 drawables"))
        .stdout(contains("frame 0: 2 shadow depth passes, 1 camera pass"))
        .stdout(contains("frame 2: 2 shadow depth passes, 1 camera pass"))
        .stdout(contains("final camera position: (150.0, 0.0, 0.0)"));
}

#[test]
fn headless_orbit_scene_advances_the_camera() {
    let mut cmd = Command::cargo_bin("umbra-viewer").expect("binary exists");
    cmd.arg("--scene")
        .arg("orbit")
        .arg("--headless")
        .arg("--frames")
        .arg("1");
    cmd.assert()
        .success()
        .stdout(contains("Scene 'orbit': 2 lights, 2 drawables"))
        .stdout(contains("frame 0: 2 shadow depth passes, 1 camera pass"));
}

#[test]
fn model_scene_loads_an_obj_file() {
    let obj = write_obj();
    let mut cmd = Command::cargo_bin("umbra-viewer").expect("binary exists");
    cmd.arg("--scene")
        .arg("model")
        .arg("--model")
        .arg(obj.path())
        .arg("--headless")
        .arg("--frames")
        .arg("1");
    cmd.assert()
        .success()
        .stdout(contains("Scene 'model': 2 lights, 2 drawables"));
}

#[test]
fn unknown_scene_is_rejected() {
    let mut cmd = Command::cargo_bin("umbra-viewer").expect("binary exists");
    cmd.arg("--scene").arg("teapot");
    cmd.assert()
        .failure()
        .stderr(contains("Unknown scene: teapot"));
}

#[test]
fn unknown_argument_prints_usage() {
    let mut cmd = Command::cargo_bin("umbra-viewer").expect("binary exists");
    cmd.arg("--bogus");
    cmd.assert().failure().stderr(contains("Usage: umbra-viewer"));
}
