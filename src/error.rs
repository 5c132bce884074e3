//! Error types shared by the scene core
//!
//! Only setup-time operations return errors. Per-frame ticks never fail; a
//! subsystem whose setup failed simply stays disabled.

use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SceneError {
    #[error("Failed to load asset {path:?}: {reason}")]
    AssetLoad { path: PathBuf, reason: String },

    #[error("Failed to decode image: {0}")]
    Image(#[from] image::ImageError),

    #[error("Malformed prefab {path:?}: {reason}")]
    Prefab { path: PathBuf, reason: String },

    #[error("Backend unavailable: {backend}")]
    BackendUnavailable { backend: &'static str },

    #[error("Configuration error: {reason}")]
    Config { reason: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{what} is not ready yet")]
    NotReady { what: &'static str },
}

pub type SceneResult<T> = Result<T, SceneError>;

impl SceneError {
    /// Whether the error only disables a feature rather than indicating a bug
    pub fn is_degraded_mode(&self) -> bool {
        matches!(
            self,
            SceneError::AssetLoad { .. }
                | SceneError::Image(_)
                | SceneError::Prefab { .. }
                | SceneError::BackendUnavailable { .. }
        )
    }

    /// Level a setup failure is reported at. Only a missing optional
    /// backend is a warning; asset and config failures are errors.
    pub fn report_level(&self) -> tracing::Level {
        match self {
            SceneError::BackendUnavailable { .. } => tracing::Level::WARN,
            _ => tracing::Level::ERROR,
        }
    }
}
