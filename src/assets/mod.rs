pub mod cache;
pub mod manager;
pub mod mesh;
pub mod texture;

pub use cache::AssetCache;
pub use manager::{AssetEvent, AssetLoader, AssetManager, AssetSlot, LoadedAsset};
pub use mesh::{parse_prefab, PrefabLoader};
pub use texture::HeightMapLoader;
