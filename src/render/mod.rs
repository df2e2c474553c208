mod renderer;
mod shaders;
pub mod shadow;

pub use renderer::{DebugToggles, Renderer};

use glam::{Mat4, Vec3};

/// Number of light slots the pipelines are sized for.
pub const MAX_LIGHTS: usize = 4;

/// Camera parameters consumed by the renderer's uniform buffer.
#[derive(Clone, Debug)]
pub struct CameraParams {
    pub view_proj: Mat4,
    pub position: Vec3,
}

/// View/projection for a fixed camera pose.
pub fn fixed_camera(position: Vec3, target: Vec3, aspect: f32) -> CameraParams {
    let view = Mat4::look_at_rh(position, target, Vec3::Y);
    let projection = Mat4::perspective_rh(60.0f32.to_radians(), aspect.max(0.01), 1.0, 5000.0);
    CameraParams {
        view_proj: projection * view,
        position,
    }
}
