// Stormvale: procedural outdoor scene core
// Heightfield terrain, biome scatter and wind-driven simulation

pub mod utils;
pub mod error;
pub mod config;
pub mod app;

pub mod rendering;
pub mod assets;
pub mod world;
pub mod ui;

// Re-export commonly used types for convenience
pub use app::{FrameClock, FrameTime, SceneApp, SetupFailure};
pub use config::{load_or_default, SceneSettings};
pub use error::{SceneError, SceneResult};
pub use rendering::scene::{SceneGraph, SceneNode, SceneSink};

// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
pub const APP_NAME: &str = env!("CARGO_PKG_NAME");
