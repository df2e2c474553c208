use std::path::Path;

use glam::{Mat4, Quat, Vec3};
use log::warn;
use serde::{Deserialize, Serialize};

use crate::mesh::{self, Mesh};
use crate::model;
use crate::orbit::OrbitCamera;
use crate::sequencer::ShadowLight;

/// Kind of light source.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum LightKind {
    /// Direction-only source approximating an infinitely distant light.
    Directional,
    /// Cone light with a full angle in degrees and a falloff concentration.
    Spot { cone_deg: f32, concentration: f32 },
}

/// Per-light shadow parameters. Scene-wide defaults come from
/// [`ShadowConfig`] and are stamped onto every light at construction;
/// near/far clip and strength stay per light.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ShadowParams {
    pub enabled: bool,
    pub strength: f32,
    pub bias: f32,
    pub normal_bias: f32,
    pub sample_radius: f32,
    pub near_clip: f32,
    pub far_clip: f32,
}

impl Default for ShadowParams {
    fn default() -> Self {
        Self {
            enabled: true,
            strength: 1.0,
            bias: 0.007,
            normal_bias: -4.0,
            sample_radius: 10.0,
            near_clip: 100.0,
            far_clip: 2000.0,
        }
    }
}

/// Shadow-map filtering quality.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ShadowFilter {
    Hard,
    Pcf,
    PcfHigh,
}

/// Scene-wide shadow configuration, applied to each light record when the
/// scene is built rather than held as mutable global state.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ShadowConfig {
    pub enabled: bool,
    pub bias: f32,
    pub normal_bias: f32,
    pub sample_radius: f32,
    pub resolution: u32,
    pub filter: ShadowFilter,
}

impl Default for ShadowConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            bias: 0.007,
            normal_bias: -4.0,
            sample_radius: 10.0,
            resolution: 1024,
            filter: ShadowFilter::PcfHigh,
        }
    }
}

/// A light record. Built once at setup and immutable for the rest of the
/// run; the renderer refers to lights by index.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Light {
    pub kind: LightKind,
    pub position: Vec3,
    pub target: Vec3,
    pub diffuse: Vec3,
    pub specular: Vec3,
    pub ambient: Vec3,
    pub enabled: bool,
    pub shadow: ShadowParams,
}

impl Light {
    pub fn directional(position: Vec3, target: Vec3) -> Self {
        Self {
            kind: LightKind::Directional,
            position,
            target,
            diffuse: Vec3::ONE,
            specular: Vec3::ONE,
            ambient: Vec3::ZERO,
            enabled: true,
            shadow: ShadowParams::default(),
        }
    }

    pub fn spot(position: Vec3, target: Vec3, cone_deg: f32, concentration: f32) -> Self {
        Self {
            kind: LightKind::Spot {
                cone_deg,
                concentration,
            },
            position,
            target,
            diffuse: Vec3::ONE,
            specular: Vec3::ONE,
            ambient: Vec3::ZERO,
            enabled: true,
            shadow: ShadowParams::default(),
        }
    }

    /// Stamps the scene-wide shadow settings onto this light, keeping its
    /// own near/far clip and strength.
    pub fn apply_shadow_config(&mut self, config: &ShadowConfig) {
        self.shadow.enabled = config.enabled;
        self.shadow.bias = config.bias;
        self.shadow.normal_bias = config.normal_bias;
        self.shadow.sample_radius = config.sample_radius;
    }

    /// Whether a depth pre-pass should be recorded for this light.
    pub fn should_render_shadow_depth_pass(&self, shadows_supported: bool) -> bool {
        self.enabled && self.shadow.enabled && shadows_supported
    }

    /// Directional and spot lights render their shadow map in one pass.
    pub fn shadow_depth_pass_count(&self) -> usize {
        1
    }

    pub fn direction(&self) -> Vec3 {
        (self.target - self.position).normalize_or_zero()
    }
}

/// Pass eligibility snapshot handed to the sequencer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LightPassInfo {
    pub casts: bool,
    pub faces: usize,
}

impl ShadowLight for LightPassInfo {
    fn should_render_shadow_depth_pass(&self) -> bool {
        self.casts
    }

    fn shadow_depth_pass_count(&self) -> usize {
        self.faces
    }
}

/// Snapshots the per-light pass decisions for one frame.
pub fn light_pass_info(lights: &[Light], shadows_supported: bool) -> Vec<LightPassInfo> {
    lights
        .iter()
        .map(|light| LightPassInfo {
            casts: light.should_render_shadow_depth_pass(shadows_supported),
            faces: light.shadow_depth_pass_count(),
        })
        .collect()
}

/// Phong material, bound around each draw.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Material {
    pub ambient: Vec3,
    pub diffuse: Vec3,
    pub specular: Vec3,
    pub shininess: f32,
}

impl Default for Material {
    fn default() -> Self {
        Self {
            ambient: Vec3::splat(0.2),
            diffuse: Vec3::splat(0.8),
            specular: Vec3::ONE,
            shininess: 60.0,
        }
    }
}

/// Geometry a drawable renders with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MeshKind {
    /// Procedural subdivided cube.
    Cube,
    /// Inward-facing background box.
    Background,
    /// Externally loaded model.
    Model,
}

/// One object in the scene. Draw order across drawables is fixed:
/// foreground first, background last.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Drawable {
    pub mesh: MeshKind,
    pub material: usize,
    pub translation: Vec3,
    pub scale: Vec3,
    /// Continuous rotation in revolutions per second around Z then X.
    pub spin_z: f32,
    pub spin_x: f32,
}

impl Drawable {
    /// Model matrix at the given elapsed time.
    pub fn model_matrix(&self, elapsed: f32) -> Mat4 {
        let z_deg = wrap_degrees(elapsed * self.spin_z * 360.0);
        let x_deg = wrap_degrees(elapsed * self.spin_x * 360.0);
        Mat4::from_translation(self.translation)
            * Mat4::from_rotation_z(z_deg.to_radians())
            * Mat4::from_rotation_x(x_deg.to_radians())
            * Mat4::from_scale(self.scale)
    }
}

/// Wraps an angle in degrees into [0, 360).
pub fn wrap_degrees(degrees: f32) -> f32 {
    degrees.rem_euclid(360.0)
}

/// How the view transform is produced each frame.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum CameraMode {
    Fixed { position: Vec3, target: Vec3 },
    Orbit { initial: OrbitCamera },
}

/// The selectable demo scenes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScenePreset {
    Cube,
    Orbit,
    Model,
}

impl ScenePreset {
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "cube" => Some(Self::Cube),
            "orbit" => Some(Self::Orbit),
            "model" => Some(Self::Model),
            _ => None,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Cube => "cube",
            Self::Orbit => "orbit",
            Self::Model => "model",
        }
    }
}

/// Everything built once at setup: lights, materials, drawables, camera
/// mode, and the shadow configuration shared by the render pipelines.
#[derive(Debug, Clone)]
pub struct Scene {
    pub name: &'static str,
    pub lights: Vec<Light>,
    pub materials: Vec<Material>,
    pub drawables: Vec<Drawable>,
    pub camera: CameraMode,
    pub shadow_config: ShadowConfig,
    /// Loaded model geometry for [`MeshKind::Model`] drawables.
    pub model_mesh: Option<Mesh>,
}

impl Scene {
    /// Builds the named preset. `model_path` is only consulted by the
    /// `model` preset.
    pub fn preset(preset: ScenePreset, model_path: Option<&Path>) -> Self {
        match preset {
            ScenePreset::Cube => Self::spinning_cube(),
            ScenePreset::Orbit => Self::orbit_cube(),
            ScenePreset::Model => Self::orbit_model(model_path),
        }
    }

    /// Variant 1: fixed camera watching a spinning cube under a directional
    /// light and a spotlight.
    pub fn spinning_cube() -> Self {
        let shadow_config = ShadowConfig::default();
        Self {
            name: "cube",
            lights: demo_lights(&shadow_config),
            materials: vec![Material::default()],
            drawables: vec![spinning_cube_drawable(0)],
            camera: CameraMode::Fixed {
                position: Vec3::new(150.0, 0.0, 0.0),
                target: Vec3::ZERO,
            },
            shadow_config,
            model_mesh: None,
        }
    }

    /// Variant 2: the same cube inside an inward-facing room, orbit camera.
    pub fn orbit_cube() -> Self {
        let shadow_config = ShadowConfig::default();
        Self {
            name: "orbit",
            lights: demo_lights(&shadow_config),
            materials: vec![Material::default(), background_material()],
            drawables: vec![spinning_cube_drawable(0), background_drawable(1)],
            camera: CameraMode::Orbit {
                initial: OrbitCamera::new(0.0, 15.0, 600.0),
            },
            shadow_config,
            model_mesh: None,
        }
    }

    /// Variant 3: a loaded model in the room, orbit camera. Falls back to
    /// the procedural cube when the model cannot be loaded.
    pub fn orbit_model(model_path: Option<&Path>) -> Self {
        let shadow_config = ShadowConfig::default();
        let model_mesh = model_path.and_then(|path| match model::load_model(path) {
            Ok(mesh) => Some(mesh),
            Err(err) => {
                warn!("falling back to the cube: {err}");
                None
            }
        });
        let foreground = if model_mesh.is_some() {
            Drawable {
                mesh: MeshKind::Model,
                material: 0,
                translation: Vec3::new(0.0, -60.0, 0.0),
                scale: Vec3::splat(100.0),
                spin_z: 0.02,
                spin_x: 0.0,
            }
        } else {
            spinning_cube_drawable(0)
        };
        Self {
            name: "model",
            lights: demo_lights(&shadow_config),
            materials: vec![Material::default(), background_material()],
            drawables: vec![foreground, background_drawable(1)],
            camera: CameraMode::Orbit {
                initial: OrbitCamera::new(0.0, 15.0, 600.0),
            },
            shadow_config,
            model_mesh,
        }
    }

    /// Resolves the geometry for a drawable.
    pub fn mesh_for(&self, kind: MeshKind) -> Mesh {
        match kind {
            MeshKind::Cube => mesh::subdivided_box(1.0, 1.0, 1.0, 24),
            MeshKind::Background => mesh::subdivided_box(1.0, 1.0, 1.0, 4).inverted(),
            MeshKind::Model => self
                .model_mesh
                .clone()
                .unwrap_or_else(|| mesh::subdivided_box(1.0, 1.0, 1.0, 24)),
        }
    }

    pub fn summary(&self) -> String {
        format!(
            "Scene '{}': {} lights, {} drawables",
            self.name,
            self.lights.len(),
            self.drawables.len()
        )
    }
}

fn demo_lights(config: &ShadowConfig) -> Vec<Light> {
    let mut area = Light::directional(Vec3::new(500.0, 500.0, 500.0), Vec3::ZERO);
    area.shadow.strength = 1.0;
    area.shadow.near_clip = 100.0;
    area.shadow.far_clip = 2000.0;

    let spot_position = Vec3::new(210.0, 330.0, 750.0);
    // Aim 30 degrees down, then 20 degrees around Y.
    let orientation = Quat::from_axis_angle(Vec3::Y, 20.0f32.to_radians())
        * Quat::from_axis_angle(Vec3::X, (-30.0f32).to_radians());
    let spot_target = spot_position + orientation * (Vec3::NEG_Z * 500.0);
    let mut spot = Light::spot(spot_position, spot_target, 60.0, 20.0);
    spot.ambient = Vec3::splat(0.4);
    spot.shadow.strength = 0.6;
    spot.shadow.near_clip = 200.0;
    spot.shadow.far_clip = 2000.0;

    let mut lights = vec![area, spot];
    for light in &mut lights {
        light.apply_shadow_config(config);
    }
    lights
}

fn background_material() -> Material {
    Material {
        ambient: Vec3::splat(0.15),
        diffuse: Vec3::splat(0.45),
        specular: Vec3::splat(0.1),
        shininess: 8.0,
    }
}

fn spinning_cube_drawable(material: usize) -> Drawable {
    Drawable {
        mesh: MeshKind::Cube,
        material,
        translation: Vec3::ZERO,
        scale: Vec3::splat(50.0),
        spin_z: 0.04,
        spin_x: 0.06,
    }
}

fn background_drawable(material: usize) -> Drawable {
    Drawable {
        mesh: MeshKind::Background,
        material,
        translation: Vec3::ZERO,
        scale: Vec3::splat(2400.0),
        spin_z: 0.0,
        spin_x: 0.0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shadow_config_is_applied_to_every_light() {
        let scene = Scene::spinning_cube();
        for light in &scene.lights {
            assert_eq!(light.shadow.bias, scene.shadow_config.bias);
            assert_eq!(light.shadow.normal_bias, scene.shadow_config.normal_bias);
            assert_eq!(light.shadow.sample_radius, scene.shadow_config.sample_radius);
            assert!(light.shadow.enabled);
        }
        // Per-light settings survive the stamp.
        assert_eq!(scene.lights[0].shadow.strength, 1.0);
        assert_eq!(scene.lights[1].shadow.strength, 0.6);
        assert_eq!(scene.lights[1].shadow.near_clip, 200.0);
    }

    #[test]
    fn depth_pass_requires_enabled_light_and_support() {
        let mut light = Light::directional(Vec3::ONE, Vec3::ZERO);
        assert!(light.should_render_shadow_depth_pass(true));
        assert!(!light.should_render_shadow_depth_pass(false));
        light.enabled = false;
        assert!(!light.should_render_shadow_depth_pass(true));
        light.enabled = true;
        light.shadow.enabled = false;
        assert!(!light.should_render_shadow_depth_pass(true));
    }

    #[test]
    fn pass_info_mirrors_light_state() {
        let scene = Scene::spinning_cube();
        let info = light_pass_info(&scene.lights, true);
        assert_eq!(info.len(), 2);
        assert!(info.iter().all(|i| i.casts && i.faces == 1));
        let info = light_pass_info(&scene.lights, false);
        assert!(info.iter().all(|i| !i.casts));
    }

    #[test]
    fn presets_have_the_documented_shape() {
        let cube = Scene::spinning_cube();
        assert_eq!(cube.lights.len(), 2);
        assert_eq!(cube.drawables.len(), 1);
        assert!(matches!(cube.camera, CameraMode::Fixed { .. }));

        let orbit = Scene::orbit_cube();
        assert_eq!(orbit.drawables.len(), 2);
        assert!(matches!(orbit.camera, CameraMode::Orbit { .. }));
        assert_eq!(orbit.drawables[1].mesh, MeshKind::Background);
    }

    #[test]
    fn model_preset_falls_back_to_the_cube() {
        let scene = Scene::orbit_model(Some(Path::new("/missing/model.obj")));
        assert!(scene.model_mesh.is_none());
        assert_eq!(scene.drawables[0].mesh, MeshKind::Cube);
    }

    #[test]
    fn spot_light_aims_down_and_forward() {
        let scene = Scene::spinning_cube();
        let direction = scene.lights[1].direction();
        assert!(direction.y < 0.0);
        assert!(direction.z < 0.0);
    }

    #[test]
    fn wrap_degrees_stays_in_range() {
        assert_eq!(wrap_degrees(0.0), 0.0);
        assert_eq!(wrap_degrees(360.0), 0.0);
        assert!((wrap_degrees(725.0) - 5.0).abs() < 1e-4);
        assert!((wrap_degrees(-30.0) - 330.0).abs() < 1e-4);
    }

    #[test]
    fn drawable_spin_advances_with_time() {
        let drawable = spinning_cube_drawable(0);
        let a = drawable.model_matrix(0.0);
        let b = drawable.model_matrix(1.0);
        assert_ne!(a, b);
        // Scale survives the rotation.
        let scaled = b.transform_vector3(Vec3::X).length();
        assert!((scaled - 50.0).abs() < 1e-2);
    }
}
