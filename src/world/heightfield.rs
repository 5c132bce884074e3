use crate::error::{SceneError, SceneResult};
use image::{DynamicImage, RgbaImage};
use std::path::PathBuf;

/// Height samples decoded once from a raster
///
/// Only the red channel is kept; the source is assumed single-channel or
/// channel-redundant. Rows are stored top to bottom as in the image.
#[derive(Debug, Clone, PartialEq)]
pub struct HeightField {
    width: u32,
    height: u32,
    samples: Vec<u8>,
}

impl HeightField {
    pub fn from_image(image: &DynamicImage) -> SceneResult<Self> {
        Self::from_rgba(&image.to_rgba8())
    }

    pub fn from_rgba(image: &RgbaImage) -> SceneResult<Self> {
        let (width, height) = image.dimensions();
        let samples = image.pixels().map(|p| p.0[0]).collect();
        Self::from_red_channel(width, height, samples)
    }

    pub fn from_red_channel(width: u32, height: u32, samples: Vec<u8>) -> SceneResult<Self> {
        if width == 0 || height == 0 {
            return Err(SceneError::AssetLoad {
                path: PathBuf::from("<height field>"),
                reason: format!("empty raster {}x{}", width, height),
            });
        }
        let expected = width as usize * height as usize;
        if samples.len() != expected {
            return Err(SceneError::AssetLoad {
                path: PathBuf::from("<height field>"),
                reason: format!("expected {} samples, got {}", expected, samples.len()),
            });
        }
        Ok(Self { width, height, samples })
    }

    /// Uniform raster, mostly useful for tests and placeholder terrain
    pub fn uniform(width: u32, height: u32, value: u8) -> SceneResult<Self> {
        Self::from_red_channel(width, height, vec![value; width as usize * height as usize])
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// Pixel addressed by a texture coordinate
    ///
    /// V is flipped: image rows grow downward while the terrain's forward
    /// axis grows the other way.
    pub fn pixel_at(&self, u: f32, v: f32) -> (u32, u32) {
        let u = u.clamp(0.0, 1.0);
        let v = v.clamp(0.0, 1.0);
        let x = (u * (self.width - 1) as f32).floor() as u32;
        let y = ((1.0 - v) * (self.height - 1) as f32).floor() as u32;
        (x.min(self.width - 1), y.min(self.height - 1))
    }

    /// Normalized height in [0, 1] at `(u, v)`
    pub fn sample(&self, u: f32, v: f32) -> f32 {
        let (x, y) = self.pixel_at(u, v);
        let index = y as usize * self.width as usize + x as usize;
        self.samples[index] as f32 / 255.0
    }
}
