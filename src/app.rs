//! Headless frame simulation.
//!
//! Runs the same sequencer plan the GPU renderer executes, without a window
//! or a device, and prints one line per frame. Used by `--headless` and as
//! the fallback when a window cannot be created.

use glam::Vec3;

use crate::orbit::OrbitCamera;
use crate::scene::{light_pass_info, CameraMode, Scene};
use crate::sequencer::{run_frame, FramePass, PassDriver};

/// Counts draw calls per pass kind; the pairing itself is enforced by
/// `run_frame`.
#[derive(Default)]
struct CountingDriver {
    camera_draws: usize,
}

impl PassDriver for CountingDriver {
    fn begin_shadow_depth_pass(&mut self, _light: usize, _face: usize) {}
    fn end_shadow_depth_pass(&mut self, _light: usize, _face: usize) {}
    fn begin_camera_pass(&mut self) {}
    fn end_camera_pass(&mut self) {}

    fn draw_scene(&mut self, pass: FramePass) {
        if pass == FramePass::Camera {
            self.camera_draws += 1;
        }
    }
}

/// Simulates `frames` frames of the scene and prints a transcript.
pub fn run_headless(scene: &Scene, frames: u32) {
    println!("{}", scene.summary());

    let mut orbit = match scene.camera {
        CameraMode::Orbit { initial } => Some(initial),
        CameraMode::Fixed { .. } => None,
    };

    // Headless mode assumes shadow support so the transcript reflects the
    // full pass sequence.
    let lights = light_pass_info(&scene.lights, true);
    for frame in 0..frames {
        if let Some(orbit) = orbit.as_mut() {
            orbit.update();
        }
        let mut driver = CountingDriver::default();
        let stats = run_frame(&lights, &mut driver);
        println!(
            "frame {frame}: {} shadow depth passes, {} camera pass",
            stats.shadow_passes, driver.camera_draws
        );
    }

    let position = final_camera_position(scene, orbit.as_ref());
    println!(
        "final camera position: ({:.1}, {:.1}, {:.1})",
        position.x, position.y, position.z
    );
}

fn final_camera_position(scene: &Scene, orbit: Option<&OrbitCamera>) -> Vec3 {
    match (scene.camera, orbit) {
        (CameraMode::Fixed { position, .. }, _) => position,
        (CameraMode::Orbit { .. }, Some(orbit)) => orbit.position(),
        (CameraMode::Orbit { initial }, None) => initial.position(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fixed_camera_position_is_reported_verbatim() {
        let scene = Scene::spinning_cube();
        let position = final_camera_position(&scene, None);
        assert_eq!(position, Vec3::new(150.0, 0.0, 0.0));
    }

    #[test]
    fn orbit_camera_reports_the_advanced_pose() {
        let scene = Scene::orbit_cube();
        let mut orbit = match scene.camera {
            CameraMode::Orbit { initial } => initial,
            CameraMode::Fixed { .. } => unreachable!(),
        };
        orbit.update();
        let position = final_camera_position(&scene, Some(&orbit));
        assert!((position.length() - 600.0).abs() < 1e-2);
    }
}
