use std::fs;
use std::path::Path;

use ron::ser::PrettyConfig;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::animation::AnimationParams;
use crate::api::CloudError;
use crate::camera::CameraSettings;
use crate::density::DensityFieldParams;
use crate::lighting::LightingParams;
use crate::march::RenderParams;
use crate::reprojection::ReprojectionParams;
use crate::volume::VolumeParams;

/// Every live-tunable parameter of the cloud renderer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CloudSettings {
    pub shape: VolumeParams,
    pub detail: VolumeParams,
    pub density: DensityFieldParams,
    pub lighting: LightingParams,
    pub animation: AnimationParams,
    pub reprojection: ReprojectionParams,
    pub render: RenderParams,
    pub camera: CameraSettings,
}

impl Default for CloudSettings {
    fn default() -> Self {
        Self {
            shape: VolumeParams::shape(),
            detail: VolumeParams::detail(),
            density: DensityFieldParams::default(),
            lighting: LightingParams::default(),
            animation: AnimationParams::default(),
            reprojection: ReprojectionParams::default(),
            render: RenderParams::default(),
            camera: CameraSettings::default(),
        }
    }
}

impl CloudSettings {
    /// Rejects values the renderer cannot run with, naming the offending field.
    pub fn validate(&self) -> Result<(), CloudError> {
        self.shape.validate("shape")?;
        self.detail.validate("detail")?;
        self.density.validate()?;
        self.lighting.validate()?;
        self.reprojection.validate()?;
        self.render.validate()?;
        self.camera.validate()?;
        Ok(())
    }

    /// Clamps every group into range. Returns whether anything changed.
    pub fn sanitize(&mut self) -> bool {
        let before = self.clone();
        self.shape = self.shape.sanitized();
        self.detail = self.detail.sanitized();
        self.density = self.density.sanitized();
        self.lighting = self.lighting.sanitized();
        self.reprojection = self.reprojection.sanitized();
        self.render = self.render.sanitized();
        self.camera = self.camera.sanitized();
        let changed = *self != before;
        if changed {
            warn!("cloud settings clamped into range");
        }
        changed
    }

    /// Whether switching from `previous` requires regenerating the noise volumes.
    pub fn needs_regeneration(&self, previous: &CloudSettings) -> bool {
        self.shape != previous.shape || self.detail != previous.detail
    }

    pub fn from_ron(text: &str) -> Result<Self, CloudError> {
        let settings: CloudSettings = ron::from_str(text)?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn to_ron(&self) -> Result<String, CloudError> {
        Ok(ron::ser::to_string_pretty(self, PrettyConfig::default())?)
    }

    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, CloudError> {
        let path = path.as_ref();
        let settings = Self::from_ron(&fs::read_to_string(path)?)?;
        info!(path = %path.display(), "cloud settings loaded");
        Ok(settings)
    }

    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<(), CloudError> {
        let path = path.as_ref();
        if let Some(dir) = path.parent() {
            if !dir.as_os_str().is_empty() {
                fs::create_dir_all(dir)?;
            }
        }
        fs::write(path, self.to_ron()?)?;
        info!(path = %path.display(), "cloud settings saved");
        Ok(())
    }

    /// Loads `path`, writing the defaults there when it does not exist yet and
    /// falling back to them when it cannot be used.
    pub fn load_or_init<P: AsRef<Path>>(path: P) -> Self {
        let path = path.as_ref();
        if !path.exists() {
            let defaults = Self::default();
            if let Err(err) = defaults.save(path) {
                warn!(path = %path.display(), %err, "could not write default cloud settings");
            }
            return defaults;
        }
        match Self::load(path) {
            Ok(settings) => settings,
            Err(err) => {
                warn!(path = %path.display(), %err, "ignoring cloud settings, using defaults");
                Self::default()
            }
        }
    }
}
