use serde::{Deserialize, Serialize};

/// Shared wind state read by rain and tree sway every frame
///
/// Written only by the tweak panel. Values are not validated beyond the
/// panel's slider ranges.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WindField {
    pub x: f32,
    pub z: f32,
    pub speed: f32,
}

impl Default for WindField {
    fn default() -> Self {
        Self {
            x: 0.3,
            z: 0.1,
            speed: 1.0,
        }
    }
}

impl WindField {
    pub fn new(x: f32, z: f32, speed: f32) -> Self {
        Self { x, z, speed }
    }

    pub fn calm() -> Self {
        Self::new(0.0, 0.0, 0.0)
    }

    /// Horizontal displacement applied per frame to anything carried by the wind
    pub fn drift(&self) -> (f32, f32) {
        (self.x * self.speed, self.z * self.speed)
    }
}
