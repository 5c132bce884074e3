use crate::error::{SceneError, SceneResult};
use crate::utils::math::Color;
use crate::world::wind::WindField;
use directories::ProjectDirs;
use glam::Vec3;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

const CONFIG_FILE: &str = "settings.toml";

// =============================================================================
// Scene Configuration
// =============================================================================

/// Heightfield terrain shape and biome band colors
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TerrainSettings {
    /// Grid segments per edge; the mesh has `(n + 1)²` vertices
    pub vertices_per_edge: u32,
    pub width: f32,
    pub height_scale: f32,
    pub height_bias: f32,
    pub color_low: Color,
    pub color_mid: Color,
    pub color_high: Color,
    /// Normalized height where sand turns to grass. Not checked against `threshold_high`.
    pub threshold_mid: f32,
    /// Normalized height where grass turns to rock
    pub threshold_high: f32,
    /// Trees scattered on the mid band after every build
    pub tree_count: usize,
}

impl Default for TerrainSettings {
    fn default() -> Self {
        Self {
            vertices_per_edge: 1024,
            width: 1000.0,
            height_scale: 75.0,
            height_bias: -10.0,
            color_low: Color::from_hex(0xc8b37a),
            color_mid: Color::from_hex(0x1b4910),
            color_high: Color::from_hex(0x2d2b2b),
            threshold_mid: 0.25,
            threshold_high: 0.5,
            tree_count: 300,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WaterSettings {
    pub color: Color,
    pub elevation: f32,
    pub size: f32,
    /// Added to the water animation clock every frame
    pub time_step: f32,
    pub distortion: f32,
    pub wave_size: f32,
    pub alpha: f32,
    /// Current animation clock, mirrored from the water surface each frame
    #[serde(skip)]
    pub time: f32,
}

impl Default for WaterSettings {
    fn default() -> Self {
        Self {
            color: Color::from_hex(0x2f2ade),
            elevation: 2.0,
            size: 1000.0,
            time_step: 2.0 / 60.0,
            distortion: 30.5,
            wave_size: 5.0,
            alpha: 0.9,
            time: 0.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RainSettings {
    pub count: usize,
    pub size: f32,
    pub color: Color,
    pub enabled: bool,
}

impl Default for RainSettings {
    fn default() -> Self {
        Self {
            count: 60_000,
            size: 0.4,
            color: Color::from_hex(0xaaaaaa),
            enabled: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LavaSettings {
    pub fire_radius: f32,
    pub fire_height: f32,
    pub fire_particle_count: usize,
    /// Center of the fire column; the clickable lava disk sits 4 units below
    pub position: Vec3,
    pub surface_radius: f32,
    pub light_intensity: f32,
    pub light_range: f32,
    /// Lava light level held after each ejection
    pub flash_intensity: f32,
    pub flash_seconds: f32,
}

impl Default for LavaSettings {
    fn default() -> Self {
        Self {
            fire_radius: 11.0,
            fire_height: 40.0,
            fire_particle_count: 30_000,
            position: Vec3::new(-174.0, 62.0, 88.0),
            surface_radius: 13.0,
            light_intensity: 5.0,
            light_range: 200.0,
            flash_intensity: 50.0,
            flash_seconds: 2.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LightingSettings {
    pub sun_orbit_radius: f32,
    pub day_color: Color,
    pub night_color: Color,
    pub ambient_intensity: f32,
    pub lightning_intensity: f32,
    pub lightning_range: f32,
    pub lightning_enabled: bool,
}

impl Default for LightingSettings {
    fn default() -> Self {
        Self {
            sun_orbit_radius: 350.0,
            day_color: Color::from_hex(0xf0f8ff),
            night_color: Color::from_hex(0x809fff),
            ambient_intensity: 0.5,
            lightning_intensity: 50.0,
            lightning_range: 1500.0,
            lightning_enabled: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CameraSettings {
    pub fov: f32,
    pub near: f32,
    pub far: f32,
    pub position: Vec3,
}

impl Default for CameraSettings {
    fn default() -> Self {
        Self {
            fov: 75.0,
            near: 0.1,
            far: 2500.0,
            position: Vec3::new(0.0, 160.0, 400.0),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PhysicsSettings {
    pub gravity: Vec3,
    pub plane_restitution: f32,
    /// Fixed simulation step in seconds
    pub fixed_step: f32,
    pub max_substeps: u32,
}

impl Default for PhysicsSettings {
    fn default() -> Self {
        Self {
            gravity: Vec3::new(0.0, -10.0, 0.0),
            plane_restitution: 0.6,
            fixed_step: 1.0 / 60.0,
            max_substeps: 10,
        }
    }
}

/// Values only the tweak panel edits
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PanelSettings {
    /// Multiplier applied to the wall clock in milliseconds to drive the sun
    pub orbit_speed: f32,
    pub show_helpers: bool,
}

impl Default for PanelSettings {
    fn default() -> Self {
        Self {
            orbit_speed: 0.00002,
            show_helpers: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AssetSettings {
    /// Directory the relative asset paths below are resolved against
    pub root: PathBuf,
    pub height_map: PathBuf,
    pub tree_prefab: PathBuf,
    pub cloud_prefab: PathBuf,
    pub cloud_count: usize,
}

impl Default for AssetSettings {
    fn default() -> Self {
        Self {
            root: PathBuf::from("assets"),
            height_map: PathBuf::from("image6.png"),
            tree_prefab: PathBuf::from("tree.json"),
            cloud_prefab: PathBuf::from("cloud.json"),
            cloud_count: 13,
        }
    }
}

impl AssetSettings {
    pub fn resolve(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.root.join(path)
        }
    }
}

/// Complete scene configuration
///
/// Each subsystem receives its own section at construction and keeps a
/// working copy; nothing reads this struct globally.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct SceneSettings {
    pub terrain: TerrainSettings,
    pub water: WaterSettings,
    pub wind: WindField,
    pub rain: RainSettings,
    pub lava: LavaSettings,
    pub lighting: LightingSettings,
    pub camera: CameraSettings,
    pub physics: PhysicsSettings,
    pub panel: PanelSettings,
    pub assets: AssetSettings,
    /// Seed for every random source; OS entropy when absent
    pub seed: Option<u64>,
}

// Configuration file management
pub fn default_settings_path() -> Option<PathBuf> {
    ProjectDirs::from("org", "stormvale", "stormvale")
        .map(|proj| proj.config_dir().join(CONFIG_FILE))
}

pub fn save_settings(settings: &SceneSettings, path: &Path) -> SceneResult<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let toml = toml::to_string_pretty(settings)
        .map_err(|e| SceneError::Config { reason: e.to_string() })?;
    fs::write(path, toml)?;
    info!("Saved settings to {:?}", path);
    Ok(())
}

pub fn load_settings(path: &Path) -> SceneResult<SceneSettings> {
    let data = fs::read_to_string(path)?;
    toml::from_str::<SceneSettings>(&data).map_err(|e| SceneError::Config {
        reason: format!("{:?}: {}", path, e),
    })
}

/// Load from `path` (or the platform config directory), falling back to defaults
pub fn load_or_default(path: Option<&Path>) -> SceneSettings {
    let path = match path.map(Path::to_path_buf).or_else(default_settings_path) {
        Some(path) => path,
        None => return SceneSettings::default(),
    };

    if !path.exists() {
        info!("No settings file at {:?}, using defaults", path);
        return SceneSettings::default();
    }

    match load_settings(&path) {
        Ok(settings) => {
            info!("Loaded settings from {:?}", path);
            settings
        }
        Err(e) => {
            warn!("Ignoring unreadable settings: {}", e);
            SceneSettings::default()
        }
    }
}
