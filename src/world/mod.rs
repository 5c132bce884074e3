pub mod events;
pub mod heightfield;
pub mod lava;
pub mod physics;
pub mod rain;
pub mod scatter;
pub mod sway;
pub mod terrain;
pub mod water;
pub mod wind;

pub use heightfield::HeightField;
pub use terrain::{Band, TerrainManager, TerrainMesh};
pub use wind::WindField;
