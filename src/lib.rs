//! Shadow-mapped demo viewer.
//!
//! The crate exposes the scene description, the orbit camera controller,
//! and the per-frame pass sequencer as plain testable modules; the wgpu
//! renderer in [`render`] and the windowed event loop in the binary sit on
//! top of them. The headless runner in [`app`] drives the same sequencer
//! without a GPU.

pub mod app;
pub mod input;
pub mod mesh;
pub mod model;
pub mod orbit;
pub mod render;
pub mod scene;
pub mod sequencer;

pub use model::{load_model, ModelError};
pub use orbit::{OrbitCamera, OrbitMode};
pub use render::{CameraParams, DebugToggles, Renderer};
pub use scene::{CameraMode, Light, LightKind, Scene, ScenePreset, ShadowConfig, ShadowFilter};
pub use sequencer::{plan_frame, run_frame, FramePass, FrameStats, PassDriver, ShadowLight};
