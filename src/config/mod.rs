pub mod settings;
pub mod concurrency;

// Re-export commonly used types
pub use settings::{
    SceneSettings, TerrainSettings, WaterSettings, RainSettings, LavaSettings,
    LightingSettings, CameraSettings, PhysicsSettings, PanelSettings, AssetSettings,
    default_settings_path, save_settings, load_settings, load_or_default,
};
pub use concurrency::{ConcurrencyManager, ThreadPoolConfig};
