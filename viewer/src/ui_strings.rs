use bevy::prelude::*;
use serde::{Deserialize, Serialize};

pub const UI_STRINGS_PATH: &str = "ui_strings.json";

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(default)]
pub struct UiStrings {
    pub app: AppStrings,
    pub overlay: OverlayStrings,
    pub stats: StatsStrings,
    pub noise: NoiseStrings,
    pub density: DensityStrings,
    pub lighting: LightingStrings,
    pub animation: AnimationStrings,
    pub render: RenderStrings,
    pub camera: CameraStrings,
}

#[derive(Debug, Serialize, Deserialize, Clone, Default)]
#[serde(default)]
pub struct AppStrings {
    pub window_title: String,
    pub controls_hint: String,
}

#[derive(Debug, Serialize, Deserialize, Clone, Default)]
#[serde(default)]
pub struct OverlayStrings {
    pub title: String,
    pub save: String,
    pub reset: String,
    pub screenshot: String,
    pub regenerate: String,
}

#[derive(Debug, Serialize, Deserialize, Clone, Default)]
#[serde(default)]
pub struct StatsStrings {
    pub title: String,
    pub fps: String,
    pub render_size: String,
    pub reproj_idx: String,
    pub history: String,
    pub generations: String,
    pub last_generation: String,
    pub threads: String,
}

#[derive(Debug, Serialize, Deserialize, Clone, Default)]
#[serde(default)]
pub struct NoiseStrings {
    pub shape: String,
    pub detail: String,
    pub seed: String,
    pub size: String,
    pub frequency: String,
    pub octaves: String,
    pub tuning: String,
}

#[derive(Debug, Serialize, Deserialize, Clone, Default)]
#[serde(default)]
pub struct DensityStrings {
    pub title: String,
    pub box_center: String,
    pub side_length: String,
    pub height: String,
    pub coverage: String,
    pub density: String,
    pub density_eps: String,
    pub detail_weight: String,
    pub shape_scale: String,
    pub detail_scale: String,
}

#[derive(Debug, Serialize, Deserialize, Clone, Default)]
#[serde(default)]
pub struct LightingStrings {
    pub title: String,
    pub light_position: String,
    pub light_color: String,
    pub light_intensity: String,
    pub lightmarch_steps: String,
    pub cloud_absorption: String,
    pub sun_absorption: String,
    pub min_light_energy: String,
    pub in_scatter: String,
    pub out_scatter: String,
    pub ivo: String,
    pub sci: String,
    pub sce: String,
}

#[derive(Debug, Serialize, Deserialize, Clone, Default)]
#[serde(default)]
pub struct AnimationStrings {
    pub title: String,
    pub shape_speed: String,
    pub detail_speed: String,
    pub paused: String,
}

#[derive(Debug, Serialize, Deserialize, Clone, Default)]
#[serde(default)]
pub struct RenderStrings {
    pub title: String,
    pub march_steps: String,
    pub resolution_divisor: String,
    pub background: String,
    pub reprojection: String,
    pub history_blend: String,
}

#[derive(Debug, Serialize, Deserialize, Clone, Default)]
#[serde(default)]
pub struct CameraStrings {
    pub title: String,
    pub mode: String,
    pub orbit: String,
    pub free_fly: String,
    pub fov: String,
    pub move_speed: String,
}

impl Default for UiStrings {
    fn default() -> Self {
        Self {
            app: AppStrings {
                window_title: "Clouds".to_string(),
                controls_hint: "Right drag to look, WASD/QE to fly, scroll to zoom, Tab switches camera, F12 saves a screenshot".to_string(),
            },
            overlay: OverlayStrings {
                title: "Clouds".to_string(),
                save: "Save settings".to_string(),
                reset: "Reset".to_string(),
                screenshot: "Screenshot".to_string(),
                regenerate: "Regenerate".to_string(),
            },
            stats: StatsStrings {
                title: "Stats".to_string(),
                fps: "FPS".to_string(),
                render_size: "Render size".to_string(),
                reproj_idx: "Reprojection index".to_string(),
                history: "History valid".to_string(),
                generations: "Volume generations".to_string(),
                last_generation: "Last generation".to_string(),
                threads: "Compute threads".to_string(),
            },
            noise: NoiseStrings {
                shape: "Shape noise".to_string(),
                detail: "Detail noise".to_string(),
                seed: "Seed".to_string(),
                size: "Grid size".to_string(),
                frequency: "Frequency".to_string(),
                octaves: "Octaves".to_string(),
                tuning: "Channel weights".to_string(),
            },
            density: DensityStrings {
                title: "Density".to_string(),
                box_center: "Box center".to_string(),
                side_length: "Box side".to_string(),
                height: "Box height".to_string(),
                coverage: "Coverage".to_string(),
                density: "Density".to_string(),
                density_eps: "Density epsilon".to_string(),
                detail_weight: "Detail erosion".to_string(),
                shape_scale: "Shape scale".to_string(),
                detail_scale: "Detail scale".to_string(),
            },
            lighting: LightingStrings {
                title: "Lighting".to_string(),
                light_position: "Light position".to_string(),
                light_color: "Light color".to_string(),
                light_intensity: "Intensity".to_string(),
                lightmarch_steps: "Light march steps".to_string(),
                cloud_absorption: "Cloud absorption".to_string(),
                sun_absorption: "Sun absorption".to_string(),
                min_light_energy: "Min light energy".to_string(),
                in_scatter: "In scatter".to_string(),
                out_scatter: "Out scatter".to_string(),
                ivo: "In/out balance".to_string(),
                sci: "Silver intensity".to_string(),
                sce: "Silver exponent".to_string(),
            },
            animation: AnimationStrings {
                title: "Animation".to_string(),
                shape_speed: "Shape speed".to_string(),
                detail_speed: "Detail speed".to_string(),
                paused: "Paused".to_string(),
            },
            render: RenderStrings {
                title: "Render".to_string(),
                march_steps: "March steps".to_string(),
                resolution_divisor: "Resolution divisor".to_string(),
                background: "Background".to_string(),
                reprojection: "Temporal reprojection".to_string(),
                history_blend: "History weight".to_string(),
            },
            camera: CameraStrings {
                title: "Camera".to_string(),
                mode: "Mode".to_string(),
                orbit: "Orbit".to_string(),
                free_fly: "Free fly".to_string(),
                fov: "Field of view".to_string(),
                move_speed: "Move speed".to_string(),
            },
        }
    }
}

pub fn load_from_file(path: &str) -> anyhow::Result<UiStrings> {
    let s = std::fs::read_to_string(path)?;
    let ui: UiStrings = serde_json::from_str(&s)?;
    Ok(ui)
}

/// English defaults unless an override file is present and readable.
pub fn load_or_default(path: &str) -> UiStrings {
    if !std::path::Path::new(path).exists() {
        return UiStrings::default();
    }
    load_from_file(path).unwrap_or_else(|e| {
        warn!("Failed to load UI strings from {path}: {e}, using defaults");
        UiStrings::default()
    })
}
