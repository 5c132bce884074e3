pub mod light;
pub mod lightning;
pub mod picking;
pub mod scene;

pub use light::{LightingRig, SunState, Updatable};
pub use picking::Ray;
