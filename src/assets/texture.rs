use crate::error::{SceneError, SceneResult};
use crate::world::heightfield::HeightField;
use async_trait::async_trait;
use std::path::Path;
use std::sync::Arc;
use tracing::{error, info};

/// Reads a raster from disk and decodes it into a [`HeightField`]
#[derive(Debug, Default, Clone, Copy)]
pub struct HeightMapLoader;

impl HeightMapLoader {
    pub fn new() -> Self {
        Self
    }

    pub fn from_bytes(bytes: &[u8]) -> SceneResult<HeightField> {
        let img = image::load_from_memory(bytes)?;
        HeightField::from_image(&img)
    }
}

#[async_trait]
impl super::manager::AssetLoader<Arc<HeightField>> for HeightMapLoader {
    async fn load(&self, path: &Path) -> SceneResult<Arc<HeightField>> {
        let bytes = tokio::fs::read(path).await.map_err(|e| SceneError::AssetLoad {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        let decoded = tokio::task::spawn_blocking(move || Self::from_bytes(&bytes))
            .await
            .map_err(|e| SceneError::AssetLoad {
                path: path.to_path_buf(),
                reason: format!("decode task failed: {}", e),
            })?;

        match decoded {
            Ok(field) => {
                info!("Loaded height map {:?}: {}x{}", path, field.width(), field.height());
                Ok(Arc::new(field))
            }
            Err(e) => {
                error!("Failed to decode height map {:?}: {}", path, e);
                Err(e)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{GrayImage, ImageFormat, Luma};
    use std::io::Cursor;

    #[test]
    fn test_decode_png_bytes() {
        let gray = GrayImage::from_pixel(3, 2, Luma([255]));
        let mut bytes = Vec::new();
        gray.write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png).unwrap();

        let field = HeightMapLoader::from_bytes(&bytes).unwrap();
        assert_eq!((field.width(), field.height()), (3, 2));
        assert_eq!(field.sample(0.5, 0.5), 1.0);
    }

    #[test]
    fn test_garbage_is_image_error() {
        assert!(matches!(
            HeightMapLoader::from_bytes(b"not an image"),
            Err(SceneError::Image(_))
        ));
    }
}
