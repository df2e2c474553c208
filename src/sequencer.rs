//! Per-frame pass planning.
//!
//! A frame is a fixed sequence: for every light that wants one, a depth-only
//! pass from the light's point of view (several for multi-face lights), then
//! exactly one lit camera pass. `plan_frame` produces the sequence as data so
//! the renderer and the headless runner execute the exact same ordering, and
//! `run_frame` walks it through a [`PassDriver`] with begin/end calls that are
//! paired on every path.

/// Per-light queries the planner needs. Lights answer for themselves whether
/// a depth pass is worth recording this frame.
pub trait ShadowLight {
    /// True when the light is enabled, casts shadows, and the platform
    /// supports them.
    fn should_render_shadow_depth_pass(&self) -> bool;

    /// Number of depth passes the light needs. One for directional and spot
    /// lights; six for an omnidirectional light without single-pass support.
    fn shadow_depth_pass_count(&self) -> usize {
        1
    }
}

/// One entry of a frame plan.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FramePass {
    /// Depth-only pass for `light`, rendering shadow map face `face`.
    ShadowDepth { light: usize, face: usize },
    /// The single lit camera-relative pass.
    Camera,
}

/// Sink for the planned passes. The scene is drawn exactly once between each
/// begin/end pair.
pub trait PassDriver {
    fn begin_shadow_depth_pass(&mut self, light: usize, face: usize);
    fn end_shadow_depth_pass(&mut self, light: usize, face: usize);
    fn begin_camera_pass(&mut self);
    fn end_camera_pass(&mut self);
    fn draw_scene(&mut self, pass: FramePass);
}

/// Summary of a sequenced frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FrameStats {
    pub shadow_passes: usize,
    pub lights_skipped: usize,
}

/// Builds the pass list for one frame. Shadow passes for a light are
/// contiguous and precede the camera pass; lights that decline a depth pass
/// contribute nothing.
pub fn plan_frame<L: ShadowLight>(lights: &[L]) -> Vec<FramePass> {
    let mut plan = Vec::new();
    for (index, light) in lights.iter().enumerate() {
        if !light.should_render_shadow_depth_pass() {
            continue;
        }
        for face in 0..light.shadow_depth_pass_count() {
            plan.push(FramePass::ShadowDepth { light: index, face });
        }
    }
    plan.push(FramePass::Camera);
    plan
}

/// Executes one frame against the driver.
pub fn run_frame<L: ShadowLight, D: PassDriver>(lights: &[L], driver: &mut D) -> FrameStats {
    let mut stats = FrameStats {
        lights_skipped: lights
            .iter()
            .filter(|light| !light.should_render_shadow_depth_pass())
            .count(),
        ..FrameStats::default()
    };
    for pass in plan_frame(lights) {
        match pass {
            FramePass::ShadowDepth { light, face } => {
                driver.begin_shadow_depth_pass(light, face);
                driver.draw_scene(pass);
                driver.end_shadow_depth_pass(light, face);
                stats.shadow_passes += 1;
            }
            FramePass::Camera => {
                driver.begin_camera_pass();
                driver.draw_scene(pass);
                driver.end_camera_pass();
            }
        }
    }
    stats
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FakeLight {
        casts: bool,
        faces: usize,
    }

    impl ShadowLight for FakeLight {
        fn should_render_shadow_depth_pass(&self) -> bool {
            self.casts
        }

        fn shadow_depth_pass_count(&self) -> usize {
            self.faces
        }
    }

    #[derive(Debug, Clone, PartialEq, Eq)]
    enum Call {
        BeginShadow(usize, usize),
        EndShadow(usize, usize),
        BeginCamera,
        EndCamera,
        Draw(FramePass),
    }

    #[derive(Default)]
    struct Recorder {
        calls: Vec<Call>,
    }

    impl PassDriver for Recorder {
        fn begin_shadow_depth_pass(&mut self, light: usize, face: usize) {
            self.calls.push(Call::BeginShadow(light, face));
        }

        fn end_shadow_depth_pass(&mut self, light: usize, face: usize) {
            self.calls.push(Call::EndShadow(light, face));
        }

        fn begin_camera_pass(&mut self) {
            self.calls.push(Call::BeginCamera);
        }

        fn end_camera_pass(&mut self) {
            self.calls.push(Call::EndCamera);
        }

        fn draw_scene(&mut self, pass: FramePass) {
            self.calls.push(Call::Draw(pass));
        }
    }

    #[test]
    fn plan_ends_with_single_camera_pass() {
        let lights = [
            FakeLight { casts: true, faces: 1 },
            FakeLight { casts: true, faces: 1 },
        ];
        let plan = plan_frame(&lights);
        assert_eq!(plan.len(), 3);
        assert_eq!(plan.last(), Some(&FramePass::Camera));
        assert_eq!(
            plan.iter().filter(|p| **p == FramePass::Camera).count(),
            1
        );
    }

    #[test]
    fn declined_lights_contribute_no_passes() {
        let lights = [
            FakeLight { casts: false, faces: 1 },
            FakeLight { casts: true, faces: 1 },
        ];
        let plan = plan_frame(&lights);
        assert_eq!(
            plan,
            vec![
                FramePass::ShadowDepth { light: 1, face: 0 },
                FramePass::Camera
            ]
        );
    }

    #[test]
    fn no_lights_still_renders_the_camera_pass() {
        let lights: [FakeLight; 0] = [];
        assert_eq!(plan_frame(&lights), vec![FramePass::Camera]);
    }

    #[test]
    fn every_begin_is_paired_before_the_next_light() {
        let lights = [
            FakeLight { casts: true, faces: 1 },
            FakeLight { casts: false, faces: 1 },
            FakeLight { casts: true, faces: 6 },
        ];
        let mut recorder = Recorder::default();
        let stats = run_frame(&lights, &mut recorder);
        assert_eq!(stats.shadow_passes, 7);
        assert_eq!(stats.lights_skipped, 1);

        let mut open: Option<(usize, usize)> = None;
        let mut camera_open = false;
        for call in &recorder.calls {
            match call {
                Call::BeginShadow(light, face) => {
                    assert!(open.is_none(), "nested shadow pass");
                    assert!(!camera_open, "shadow pass inside camera pass");
                    open = Some((*light, *face));
                }
                Call::EndShadow(light, face) => {
                    assert_eq!(open.take(), Some((*light, *face)), "unpaired end");
                }
                Call::BeginCamera => {
                    assert!(open.is_none(), "camera pass before shadow pass closed");
                    camera_open = true;
                }
                Call::EndCamera => {
                    assert!(camera_open);
                    camera_open = false;
                }
                Call::Draw(_) => {
                    assert!(open.is_some() || camera_open, "draw outside any pass");
                }
            }
        }
        assert!(open.is_none());
        assert!(!camera_open);
    }

    #[test]
    fn six_face_light_records_six_paired_passes() {
        let lights = [FakeLight { casts: true, faces: 6 }];
        let mut recorder = Recorder::default();
        run_frame(&lights, &mut recorder);
        for face in 0..6 {
            assert!(recorder.calls.contains(&Call::BeginShadow(0, face)));
            assert!(recorder.calls.contains(&Call::EndShadow(0, face)));
        }
    }

    #[test]
    fn scene_is_drawn_once_per_pass() {
        let lights = [FakeLight { casts: true, faces: 2 }];
        let mut recorder = Recorder::default();
        run_frame(&lights, &mut recorder);
        let draws = recorder
            .calls
            .iter()
            .filter(|call| matches!(call, Call::Draw(_)))
            .count();
        assert_eq!(draws, 3);
    }
}
