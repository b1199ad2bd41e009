//! Real-time volumetric clouds: tileable noise volumes, a ray-marched density
//! field with single-light scattering, and temporal accumulation, all driven
//! through a small frame-loop trait.

pub mod animation;
pub mod api;
pub mod buffer;
pub mod camera;
pub mod compute;
pub mod density;
pub mod frame;
pub mod lighting;
pub mod march;
pub mod noise;
pub mod params;
pub mod permutation;
pub mod reprojection;
pub mod scene;
pub mod settings;
pub mod volume;

pub use animation::{AnimationDriver, AnimationParams};
pub use api::{CloudError, CloudResult};
pub use buffer::ColorBuffer;
pub use camera::{Camera, CameraMode, CameraSettings};
pub use compute::{ComputeDevice, DispatchGrid, RayonDevice};
pub use density::{CloudBox, DensityField, DensityFieldParams, VolumeBindings};
pub use frame::{run_frame, FrameInput, FrameRenderer};
pub use lighting::LightingParams;
pub use march::{MarchUniforms, RayMarcher, RenderParams};
pub use noise::NoiseSampler;
pub use params::{ParamKind, ParameterSink};
pub use permutation::PermutationTable;
pub use reprojection::{CompositeUniforms, ReprojectionParams, ReprojectionState};
pub use scene::{CloudScene, SceneStats};
pub use settings::CloudSettings;
pub use volume::{NoiseVolume, VolumeGenerator, VolumeParams};
