use glam::{Mat4, Vec2, Vec3};
use serde::{Deserialize, Serialize};

use crate::render::CameraParams;

/// Degrees removed from longitude on every idle update.
pub const IDLE_ROTATE_STEP: f32 = 0.1;
/// Pixels-to-degrees factor applied to drag deltas.
pub const DRAG_SCALE: f32 = 0.5;
/// Orbit distance gained per scroll line.
pub const SCROLL_SCALE: f32 = 10.0;

const LAT_LIMIT: f32 = 89.0;
const RADIUS_MIN: f32 = 50.0;
const RADIUS_MAX: f32 = 1000.0;

/// Interaction state of the controller.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum OrbitMode {
    /// No button held; the camera drifts slowly around the target.
    Idle,
    /// Left button held; deltas from the captured position steer the camera.
    Dragging { last: Vec2 },
}

/// Camera whose position is derived from spherical coordinates around the
/// origin. Longitude and latitude are degrees, radius is world units.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct OrbitCamera {
    pub longitude: f32,
    pub latitude: f32,
    pub radius: f32,
    pub mode: OrbitMode,
}

impl Default for OrbitCamera {
    fn default() -> Self {
        Self::new(0.0, 15.0, 600.0)
    }
}

impl OrbitCamera {
    pub fn new(longitude: f32, latitude: f32, radius: f32) -> Self {
        Self {
            longitude,
            latitude: latitude.clamp(-LAT_LIMIT, LAT_LIMIT),
            radius: radius.clamp(RADIUS_MIN, RADIUS_MAX),
            mode: OrbitMode::Idle,
        }
    }

    /// Per-frame update. Only the idle state rotates; a drag in progress
    /// pins the camera to the mouse.
    pub fn update(&mut self) {
        if let OrbitMode::Idle = self.mode {
            self.longitude -= IDLE_ROTATE_STEP;
        }
    }

    pub fn mouse_pressed(&mut self, position: Vec2) {
        self.mode = OrbitMode::Dragging { last: position };
    }

    pub fn mouse_released(&mut self) {
        self.mode = OrbitMode::Idle;
    }

    /// Applies the drag delta since the last captured position. Horizontal
    /// motion turns the camera the opposite way (grab-the-world feel),
    /// vertical motion tilts it, clamped to +/-89 degrees so the pole is
    /// never crossed.
    pub fn mouse_dragged(&mut self, position: Vec2) {
        let OrbitMode::Dragging { last } = self.mode else {
            return;
        };
        let delta = position - last;
        self.longitude -= DRAG_SCALE * delta.x;
        self.latitude = (self.latitude + DRAG_SCALE * delta.y).clamp(-LAT_LIMIT, LAT_LIMIT);
        self.mode = OrbitMode::Dragging { last: position };
    }

    /// Zooms by scroll lines. winit reports scroll-up as a positive line
    /// delta, so scrolling up moves the camera closer; the radius stays
    /// within [50, 1000] regardless of input.
    pub fn mouse_scrolled(&mut self, scroll_y: f32) {
        self.radius = (self.radius - scroll_y * SCROLL_SCALE).clamp(RADIUS_MIN, RADIUS_MAX);
    }

    /// Current camera position from the spherical coordinates. Latitude 0,
    /// longitude 0 sits on the +X axis; positive latitude rises toward +Y.
    pub fn position(&self) -> Vec3 {
        let lon = self.longitude.to_radians();
        let lat = self.latitude.to_radians();
        Vec3::new(
            self.radius * lat.cos() * lon.cos(),
            self.radius * lat.sin(),
            self.radius * lat.cos() * lon.sin(),
        )
    }

    /// View/projection for the current pose, aimed at the origin.
    pub fn camera_params(&self, aspect: f32) -> CameraParams {
        let position = self.position();
        let view = Mat4::look_at_rh(position, Vec3::ZERO, Vec3::Y);
        let projection = Mat4::perspective_rh(60.0f32.to_radians(), aspect.max(0.01), 1.0, 5000.0);
        CameraParams {
            view_proj: projection * view,
            position,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn idle_update_decrements_longitude() {
        let mut orbit = OrbitCamera::new(10.0, 0.0, 300.0);
        orbit.update();
        orbit.update();
        assert!((orbit.longitude - (10.0 - 2.0 * IDLE_ROTATE_STEP)).abs() < 1e-5);
    }

    #[test]
    fn dragging_suppresses_idle_rotation() {
        let mut orbit = OrbitCamera::new(10.0, 0.0, 300.0);
        orbit.mouse_pressed(Vec2::new(100.0, 100.0));
        orbit.update();
        assert_eq!(orbit.longitude, 10.0);
        orbit.mouse_released();
        orbit.update();
        assert!(orbit.longitude < 10.0);
    }

    #[test]
    fn drag_applies_half_pixel_deltas() {
        let mut orbit = OrbitCamera::new(0.0, 0.0, 300.0);
        orbit.mouse_pressed(Vec2::new(100.0, 100.0));
        orbit.mouse_dragged(Vec2::new(80.0, 130.0));
        assert!((orbit.longitude - 10.0).abs() < 1e-5);
        assert!((orbit.latitude - 15.0).abs() < 1e-5);
    }

    #[test]
    fn drag_without_press_is_ignored() {
        let mut orbit = OrbitCamera::new(0.0, 0.0, 300.0);
        orbit.mouse_dragged(Vec2::new(500.0, 500.0));
        assert_eq!(orbit.longitude, 0.0);
        assert_eq!(orbit.latitude, 0.0);
    }

    #[test]
    fn latitude_clamps_at_poles() {
        let mut orbit = OrbitCamera::new(0.0, 0.0, 300.0);
        orbit.mouse_pressed(Vec2::ZERO);
        orbit.mouse_dragged(Vec2::new(0.0, 10_000.0));
        assert_eq!(orbit.latitude, 89.0);
        orbit.mouse_dragged(Vec2::new(0.0, -20_000.0));
        assert_eq!(orbit.latitude, -89.0);
    }

    #[test]
    fn scroll_zooms_out_and_in() {
        let mut orbit = OrbitCamera::new(0.0, 0.0, 300.0);
        orbit.mouse_scrolled(-5.0);
        assert_eq!(orbit.radius, 350.0);
        orbit.mouse_scrolled(5.0);
        orbit.mouse_scrolled(5.0);
        assert_eq!(orbit.radius, 250.0);
    }

    #[test]
    fn radius_clamps_to_limits() {
        let mut orbit = OrbitCamera::new(0.0, 0.0, 60.0);
        orbit.mouse_scrolled(100.0);
        assert_eq!(orbit.radius, 50.0);
        orbit.mouse_scrolled(-500.0);
        assert_eq!(orbit.radius, 1000.0);
    }

    #[test]
    fn position_magnitude_equals_radius() {
        for (lon, lat, radius) in [
            (0.0, 0.0, 150.0),
            (45.0, 30.0, 300.0),
            (-120.0, -89.0, 1000.0),
            (720.0, 89.0, 50.0),
        ] {
            let orbit = OrbitCamera::new(lon, lat, radius);
            assert!((orbit.position().length() - radius).abs() < radius * 1e-5);
        }
    }

    #[test]
    fn zero_latitude_sits_on_the_equator() {
        let orbit = OrbitCamera::new(0.0, 0.0, 150.0);
        let position = orbit.position();
        assert!((position - Vec3::new(150.0, 0.0, 0.0)).length() < 1e-3);
    }
}
